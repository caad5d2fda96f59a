use std::any::TypeId;

use crate::error::{VtxError, VtxResult};
use crate::sql::ast::{Expr, Query, Statement};
use crate::sql::lower::Lowering;
use sqlparser::ast as sp;
use sqlparser::dialect::{Dialect, GenericDialect};
use sqlparser::parser::{Parser, ParserError};
use sqlparser::tokenizer::Token;

/// 대입 연산자 표기 (lowering이 `Expr::Assign`으로 변환)
pub(crate) const ASSIGN_OP: &str = ":=";

/// `:=`는 OR보다 약하게 묶인다
const ASSIGN_PRECEDENCE: u8 = 1;

/// GenericDialect에 세션 변수 대입 `@v := expr`을 더한 방언
///
/// 나머지 문법은 GenericDialect와 같다 (`dialect()`도 GenericDialect로 보고).
#[derive(Debug, Default)]
pub struct VtxDialect {
    base: GenericDialect,
}

impl Dialect for VtxDialect {
    fn dialect(&self) -> TypeId {
        TypeId::of::<GenericDialect>()
    }

    fn is_delimited_identifier_start(&self, ch: char) -> bool {
        self.base.is_delimited_identifier_start(ch)
    }

    fn is_identifier_start(&self, ch: char) -> bool {
        self.base.is_identifier_start(ch)
    }

    fn is_identifier_part(&self, ch: char) -> bool {
        self.base.is_identifier_part(ch)
    }

    fn supports_unicode_string_literal(&self) -> bool {
        self.base.supports_unicode_string_literal()
    }

    fn supports_group_by_expr(&self) -> bool {
        self.base.supports_group_by_expr()
    }

    fn supports_connect_by(&self) -> bool {
        self.base.supports_connect_by()
    }

    fn supports_match_recognize(&self) -> bool {
        self.base.supports_match_recognize()
    }

    fn supports_start_transaction_modifier(&self) -> bool {
        self.base.supports_start_transaction_modifier()
    }

    fn supports_window_function_null_treatment_arg(&self) -> bool {
        self.base.supports_window_function_null_treatment_arg()
    }

    fn supports_dictionary_syntax(&self) -> bool {
        self.base.supports_dictionary_syntax()
    }

    fn supports_window_clause_named_window_reference(&self) -> bool {
        self.base.supports_window_clause_named_window_reference()
    }

    fn supports_parenthesized_set_variables(&self) -> bool {
        self.base.supports_parenthesized_set_variables()
    }

    fn supports_select_wildcard_except(&self) -> bool {
        self.base.supports_select_wildcard_except()
    }

    fn support_map_literal_syntax(&self) -> bool {
        self.base.support_map_literal_syntax()
    }

    fn allow_extract_custom(&self) -> bool {
        self.base.allow_extract_custom()
    }

    fn allow_extract_single_quotes(&self) -> bool {
        self.base.allow_extract_single_quotes()
    }

    fn supports_create_index_with_clause(&self) -> bool {
        self.base.supports_create_index_with_clause()
    }

    fn supports_explain_with_utility_options(&self) -> bool {
        self.base.supports_explain_with_utility_options()
    }

    fn supports_limit_comma(&self) -> bool {
        self.base.supports_limit_comma()
    }

    fn supports_asc_desc_in_column_definition(&self) -> bool {
        self.base.supports_asc_desc_in_column_definition()
    }

    fn supports_try_convert(&self) -> bool {
        self.base.supports_try_convert()
    }

    fn get_next_precedence(&self, parser: &Parser) -> Option<Result<u8, ParserError>> {
        if parser.peek_token().token == Token::Assignment {
            return Some(Ok(ASSIGN_PRECEDENCE));
        }
        None
    }

    fn parse_infix(&self, parser: &mut Parser, expr: &sp::Expr, _precedence: u8) -> Option<Result<sp::Expr, ParserError>> {
        if parser.peek_token().token != Token::Assignment {
            return None;
        }
        parser.next_token();
        // 오른쪽 결합: `@a := @b := 1`
        let value = parser.parse_subexpr(ASSIGN_PRECEDENCE - 1);
        Some(value.map(|right| sp::Expr::BinaryOp {
            left: Box::new(expr.clone()),
            op: sp::BinaryOperator::Custom(ASSIGN_OP.to_string()),
            right: Box::new(right),
        }))
    }
}

/// SQL 파서: sqlparser-rs
pub struct SqlParser {
    dialect: VtxDialect,
}

impl SqlParser {
    /// 새 SQL 파서 생성
    pub fn new() -> Self {
        Self {
            dialect: VtxDialect::default(),
        }
    }

    /// SQL 문자열을 sqlparser AST로 파싱
    pub fn parse(&self, sql: &str) -> VtxResult<Vec<sp::Statement>> {
        Parser::parse_sql(&self.dialect, sql).map_err(|e| VtxError::SqlParse {
            message: e.to_string(),
            sql: sql.to_string(),
        })
    }

    /// 단일 문장을 엔진 AST로 파싱 (바인딩 전)
    pub fn parse_statement(&self, sql: &str) -> VtxResult<Statement> {
        let mut statements = self.parse(sql)?;
        if statements.len() != 1 {
            return Err(VtxError::SqlNotSupported {
                feature: format!("{} statements in one request", statements.len()),
                hint: "translate one statement at a time".to_string(),
            });
        }
        let stmt = statements.remove(0);
        Lowering::new().statement(&stmt)
    }

    /// 뷰 본문 등 질의만 허용되는 위치의 파싱
    pub fn parse_query(&self, sql: &str) -> VtxResult<Query> {
        match self.parse_statement(sql)? {
            Statement::Query(query) => Ok(query),
            other => Err(VtxError::SqlNotSupported {
                feature: format!("{} as a query body", other.kind()),
                hint: "view bodies must be SELECT statements".to_string(),
            }),
        }
    }

    /// 단독 표현식 파싱
    pub fn parse_expr(&self, text: &str) -> VtxResult<Expr> {
        let parsed = Parser::new(&self.dialect)
            .try_with_sql(text)
            .and_then(|mut parser| parser.parse_expr())
            .map_err(|e| VtxError::SqlParse {
                message: e.to_string(),
                sql: text.to_string(),
            })?;
        Lowering::new().expr(&parsed)
    }
}

impl Default for SqlParser {
    fn default() -> Self {
        Self::new()
    }
}
