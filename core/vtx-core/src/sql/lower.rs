//! sqlparser AST → 엔진 AST 변환
//!
//! 이름은 아직 바인딩되지 않은 상태(`spec_id == None`)로 생성되고,
//! 스펙 식별자는 모두 `SpecId(0)`이다. 바인더가 식별자와 타입을 채운다.

use crate::error::{VtxError, VtxResult};
use crate::sql::ast::*;
use crate::sql::parser::ASSIGN_OP;
use crate::types::Value;
use sqlparser::ast as sp;

/// 집계 함수 이름
const AGGREGATES: &[&str] = &[
    "count",
    "sum",
    "avg",
    "min",
    "max",
    "stddev",
    "variance",
    "group_concat",
];

fn unsupported(feature: impl Into<String>, hint: &str) -> VtxError {
    VtxError::SqlNotSupported {
        feature: feature.into(),
        hint: hint.to_string(),
    }
}

/// SQL BinaryOperator → 엔진 BinaryOp 변환
pub fn convert_binary_op(op: &sp::BinaryOperator) -> VtxResult<BinaryOp> {
    match op {
        sp::BinaryOperator::Plus => Ok(BinaryOp::Plus),
        sp::BinaryOperator::Minus => Ok(BinaryOp::Minus),
        sp::BinaryOperator::Multiply => Ok(BinaryOp::Multiply),
        sp::BinaryOperator::Divide => Ok(BinaryOp::Divide),
        sp::BinaryOperator::Modulo => Ok(BinaryOp::Modulo),
        sp::BinaryOperator::StringConcat => Ok(BinaryOp::Concat),
        sp::BinaryOperator::Eq => Ok(BinaryOp::Eq),
        sp::BinaryOperator::NotEq => Ok(BinaryOp::NotEq),
        sp::BinaryOperator::Lt => Ok(BinaryOp::Lt),
        sp::BinaryOperator::LtEq => Ok(BinaryOp::LtEq),
        sp::BinaryOperator::Gt => Ok(BinaryOp::Gt),
        sp::BinaryOperator::GtEq => Ok(BinaryOp::GtEq),
        sp::BinaryOperator::And => Ok(BinaryOp::And),
        sp::BinaryOperator::Or => Ok(BinaryOp::Or),
        _ => Err(unsupported(
            format!("binary operator {op}"),
            "arithmetic, comparison, ||, AND and OR are supported",
        )),
    }
}

/// 객체 이름의 마지막 부분 (소문자)
fn object_name(name: &sp::ObjectName) -> String {
    name.0
        .last()
        .map(|ident| ident.value.to_lowercase())
        .unwrap_or_default()
}

/// 한정 이름 `a.b` → NameRef, `a` → NameRef
fn qualified_name(name: &sp::ObjectName) -> NameRef {
    let parts: Vec<String> = name.0.iter().map(|i| i.value.to_lowercase()).collect();
    match parts.as_slice() {
        [qualifier, attr] => NameRef {
            resolved: Some(qualifier.clone()),
            ..NameRef::new(attr.clone())
        },
        _ => NameRef::new(parts.last().cloned().unwrap_or_default()),
    }
}

/// AST 변환기
#[derive(Debug, Default)]
pub struct Lowering {
    derived_seq: usize,
}

impl Lowering {
    pub fn new() -> Self {
        Self::default()
    }

    /// SQL Statement → 엔진 Statement
    pub fn statement(&mut self, stmt: &sp::Statement) -> VtxResult<Statement> {
        match stmt {
            sp::Statement::Query(query) => Ok(Statement::Query(self.query(query)?)),
            sp::Statement::Insert(insert) => self.insert(insert),
            sp::Statement::Update {
                table,
                assignments,
                from,
                selection,
                ..
            } => {
                if from.is_some() {
                    return Err(unsupported(
                        "UPDATE ... FROM",
                        "list joined classes in the UPDATE target instead",
                    ));
                }
                let mut specs = Vec::new();
                self.table_with_joins(table, &mut specs)?;
                let where_clause = match selection {
                    Some(e) => self.expr(e)?.into_conjuncts(),
                    None => Vec::new(),
                };
                Ok(Statement::Update(Update {
                    specs,
                    assignments: self.assignments(assignments)?,
                    where_clause,
                    check_where: Vec::new(),
                    hints: Hints::default(),
                    using_index: Vec::new(),
                }))
            }
            sp::Statement::Delete(delete) => {
                let tables = match &delete.from {
                    sp::FromTable::WithFromKeyword(t) => t,
                    sp::FromTable::WithoutKeyword(t) => t,
                };
                let mut specs = Vec::new();
                for table in tables {
                    self.table_with_joins(table, &mut specs)?;
                }
                let where_clause = match &delete.selection {
                    Some(e) => self.expr(e)?.into_conjuncts(),
                    None => Vec::new(),
                };
                Ok(Statement::Delete(Delete {
                    specs,
                    where_clause,
                    hints: Hints::default(),
                    using_index: Vec::new(),
                }))
            }
            sp::Statement::Merge {
                table,
                source,
                on,
                clauses,
                ..
            } => self.merge(table, source, on, clauses),
            other => {
                let text = other.to_string();
                let verb = text.split_whitespace().next().unwrap_or("statement");
                Err(unsupported(
                    format!("{verb} statement"),
                    "only SELECT, INSERT, UPDATE, DELETE and MERGE are translated",
                ))
            }
        }
    }

    /// SELECT / 집합 연산 질의
    pub fn query(&mut self, query: &sp::Query) -> VtxResult<Query> {
        if query.with.is_some() {
            return Err(unsupported("WITH clause", "inline the common table expression"));
        }
        if query.offset.is_some() {
            return Err(unsupported("OFFSET", "use LIMIT only"));
        }
        let mut result = self.set_expr(&query.body)?;
        if let Some(order_by) = &query.order_by {
            for ob in &order_by.exprs {
                let key = match &ob.expr {
                    sp::Expr::Value(sp::Value::Number(n, _)) => {
                        let pos = n.parse::<usize>().map_err(|_| VtxError::SqlParse {
                            message: format!("invalid ORDER BY position: {n}"),
                            sql: query.to_string(),
                        })?;
                        SortKey::Position(pos)
                    }
                    e => SortKey::Expr(self.expr(e)?),
                };
                result.order_by.push(OrderBy {
                    key,
                    asc: ob.asc.unwrap_or(true),
                });
            }
        }
        if let Some(limit) = &query.limit {
            result.limit = Some(self.expr(limit)?);
        }
        Ok(result)
    }

    fn set_expr(&mut self, body: &sp::SetExpr) -> VtxResult<Query> {
        match body {
            sp::SetExpr::Select(select) => self.select(select),
            sp::SetExpr::Query(query) => self.query(query),
            sp::SetExpr::SetOperation {
                op,
                set_quantifier,
                left,
                right,
            } => {
                let op = match op {
                    sp::SetOperator::Union => SetOperator::Union,
                    sp::SetOperator::Except => SetOperator::Difference,
                    sp::SetOperator::Intersect => SetOperator::Intersection,
                    #[allow(unreachable_patterns)]
                    _ => return Err(unsupported(format!("set operator {op}"), "use UNION, EXCEPT or INTERSECT")),
                };
                let distinct = !matches!(set_quantifier, sp::SetQuantifier::All);
                Ok(Query::set_op(
                    op,
                    self.set_expr(left)?,
                    self.set_expr(right)?,
                    distinct,
                ))
            }
            _ => Err(unsupported(
                "query body",
                "only SELECT and set operations over SELECT are supported",
            )),
        }
    }

    fn select(&mut self, s: &sp::Select) -> VtxResult<Query> {
        if s.connect_by.is_some() {
            return Err(unsupported(
                "CONNECT BY",
                "hierarchical queries are accepted through the AST only",
            ));
        }
        let mut select = Select::default();

        for item in &s.projection {
            match item {
                sp::SelectItem::UnnamedExpr(e) => select.list.push(Column::new(self.expr(e)?)),
                sp::SelectItem::ExprWithAlias { expr, alias } => select
                    .list
                    .push(Column::aliased(self.expr(expr)?, alias.value.to_lowercase())),
                sp::SelectItem::Wildcard(_) => select.list.push(Column::new(Expr::Star(None))),
                sp::SelectItem::QualifiedWildcard(name, _) => select
                    .list
                    .push(Column::new(Expr::Star(Some(object_name(name))))),
            }
        }

        for table in &s.from {
            self.table_with_joins(table, &mut select.from)?;
        }

        if let Some(e) = &s.selection {
            select.where_clause = self.expr(e)?.into_conjuncts();
        }

        match &s.group_by {
            sp::GroupByExpr::Expressions(exprs, _) => {
                for e in exprs {
                    select.group_by.push(self.expr(e)?);
                }
            }
            sp::GroupByExpr::All(_) => {
                return Err(unsupported("GROUP BY ALL", "list the grouping columns"));
            }
        }

        if let Some(e) = &s.having {
            select.having = self.expr(e)?.into_conjuncts();
        }

        let mut query = Query::from_select(select);
        query.distinct = s.distinct.is_some();
        Ok(query)
    }

    fn table_with_joins(
        &mut self,
        table: &sp::TableWithJoins,
        out: &mut Vec<EntitySpec>,
    ) -> VtxResult<()> {
        out.push(self.table_factor(&table.relation)?);
        for join in &table.joins {
            let mut spec = self.table_factor(&join.relation)?;
            let (join_type, constraint) = match &join.join_operator {
                sp::JoinOperator::Inner(c) => (JoinType::Inner, Some(c)),
                sp::JoinOperator::LeftOuter(c) => (JoinType::LeftOuter, Some(c)),
                sp::JoinOperator::RightOuter(c) => (JoinType::RightOuter, Some(c)),
                sp::JoinOperator::CrossJoin => (JoinType::None, None),
                other => {
                    return Err(unsupported(
                        format!("join {other:?}"),
                        "use INNER, LEFT OUTER, RIGHT OUTER or CROSS joins",
                    ));
                }
            };
            spec.join_type = join_type;
            if let Some(constraint) = constraint {
                spec.on_cond = match constraint {
                    sp::JoinConstraint::On(e) => self.expr(e)?.into_conjuncts(),
                    sp::JoinConstraint::None => Vec::new(),
                    _ => {
                        return Err(unsupported(
                            "USING / NATURAL join",
                            "spell out the join condition with ON",
                        ));
                    }
                };
            }
            out.push(spec);
        }
        Ok(())
    }

    fn table_factor(&mut self, factor: &sp::TableFactor) -> VtxResult<EntitySpec> {
        match factor {
            sp::TableFactor::Table { name, alias, .. } => {
                let class = object_name(name);
                let range_var = alias
                    .as_ref()
                    .map(|a| a.name.value.to_lowercase())
                    .unwrap_or_else(|| class.clone());
                Ok(EntitySpec::new_class(SpecId(0), class.as_str(), range_var))
            }
            sp::TableFactor::Derived {
                subquery, alias, ..
            } => {
                let mut query = self.query(subquery)?;
                query.is_subquery = true;
                let range_var = match alias {
                    Some(a) => a.name.value.to_lowercase(),
                    None => {
                        self.derived_seq += 1;
                        format!("derived{}", self.derived_seq)
                    }
                };
                let mut spec = EntitySpec::new_derived(SpecId(0), query, range_var);
                // `d (a, b)`: 파생 컬럼 이름은 별칭 목록이 우선
                if let Some(a) = alias {
                    spec.as_attr_list = a
                        .columns
                        .iter()
                        .map(|c| NameRef::new(c.value.to_lowercase()))
                        .collect();
                }
                Ok(spec)
            }
            _ => Err(unsupported(
                "table factor",
                "only classes and derived tables may appear in FROM",
            )),
        }
    }

    fn assignments(&mut self, items: &[sp::Assignment]) -> VtxResult<Vec<Assignment>> {
        let mut out = Vec::with_capacity(items.len());
        for item in items {
            let target = match &item.target {
                sp::AssignmentTarget::ColumnName(name) => qualified_name(name),
                _ => {
                    return Err(unsupported(
                        "tuple assignment",
                        "assign one column at a time",
                    ));
                }
            };
            out.push(Assignment {
                target,
                value: self.expr(&item.value)?,
            });
        }
        Ok(out)
    }

    fn insert(&mut self, insert: &sp::Insert) -> VtxResult<Statement> {
        let class = object_name(&insert.table_name);
        let spec = EntitySpec::new_class(SpecId(0), class.as_str(), class.clone());
        let columns = insert
            .columns
            .iter()
            .map(|c| NameRef::new(c.value.to_lowercase()))
            .collect();

        let source = match &insert.source {
            None => InsertSource::DefaultValues,
            Some(query) => match query.body.as_ref() {
                sp::SetExpr::Values(values) => {
                    let mut rows = Vec::with_capacity(values.rows.len());
                    for row in &values.rows {
                        let mut exprs = Vec::with_capacity(row.len());
                        for e in row {
                            exprs.push(self.expr(e)?);
                        }
                        rows.push(exprs);
                    }
                    InsertSource::Values(rows)
                }
                _ => {
                    let mut sub = self.query(query)?;
                    sub.is_subquery = true;
                    InsertSource::Query(Box::new(sub))
                }
            },
        };

        let on_duplicate = match &insert.on {
            None => Vec::new(),
            Some(sp::OnInsert::DuplicateKeyUpdate(items)) => self.assignments(items)?,
            Some(_) => {
                return Err(unsupported(
                    "ON CONFLICT",
                    "use ON DUPLICATE KEY UPDATE",
                ));
            }
        };

        Ok(Statement::Insert(Insert {
            spec,
            columns,
            source,
            on_duplicate,
            is_replace: insert.replace_into,
            check_where: Vec::new(),
        }))
    }

    fn merge(
        &mut self,
        table: &sp::TableFactor,
        source: &sp::TableFactor,
        on: &sp::Expr,
        clauses: &[sp::MergeClause],
    ) -> VtxResult<Statement> {
        let target = self.table_factor(table)?;
        let source = self.table_factor(source)?;
        let on = self.expr(on)?.into_conjuncts();
        let mut update: Option<MergeUpdate> = None;
        let mut insert = None;

        for clause in clauses {
            let predicate = match &clause.predicate {
                Some(p) => self.expr(p)?.into_conjuncts(),
                None => Vec::new(),
            };
            match (&clause.clause_kind, &clause.action) {
                (sp::MergeClauseKind::Matched, sp::MergeAction::Update { assignments }) => {
                    let assignments = self.assignments(assignments)?;
                    let up = update.get_or_insert_with(|| MergeUpdate {
                        assignments: Vec::new(),
                        where_clause: Vec::new(),
                        delete: false,
                    });
                    up.assignments = assignments;
                    up.where_clause = predicate;
                }
                (sp::MergeClauseKind::Matched, sp::MergeAction::Delete) => {
                    let up = update.get_or_insert_with(|| MergeUpdate {
                        assignments: Vec::new(),
                        where_clause: Vec::new(),
                        delete: false,
                    });
                    up.delete = true;
                    if up.assignments.is_empty() {
                        up.where_clause = predicate;
                    }
                }
                (
                    sp::MergeClauseKind::NotMatched | sp::MergeClauseKind::NotMatchedByTarget,
                    sp::MergeAction::Insert(ins),
                ) => {
                    let row = match &ins.kind {
                        sp::MergeInsertKind::Values(values) if values.rows.len() == 1 => &values.rows[0],
                        _ => {
                            return Err(unsupported(
                                "MERGE INSERT ROW",
                                "supply one VALUES row",
                            ));
                        }
                    };
                    let mut values = Vec::with_capacity(row.len());
                    for e in row {
                        values.push(self.expr(e)?);
                    }
                    insert = Some(MergeInsert {
                        columns: ins
                            .columns
                            .iter()
                            .map(|c| NameRef::new(c.value.to_lowercase()))
                            .collect(),
                        values,
                        where_clause: predicate,
                    });
                }
                _ => {
                    return Err(unsupported(
                        "MERGE clause",
                        "use WHEN MATCHED UPDATE/DELETE and WHEN NOT MATCHED INSERT",
                    ));
                }
            }
        }

        Ok(Statement::Merge(Merge {
            target,
            source,
            on,
            update,
            insert,
            check_where: Vec::new(),
        }))
    }

    fn identifier(&self, raw: &str) -> Expr {
        if let Some(variable) = raw.strip_prefix('@') {
            return Expr::Variable(variable.to_lowercase());
        }
        let name = raw.to_lowercase();
        if name == "rownum" {
            return Expr::Pseudo(PseudoColumn::Rownum);
        }
        Expr::Name(NameRef::new(name))
    }

    /// `a.b` → 한정 이름, `a.b.c...` → 경로 탐색
    fn compound(&self, parts: &[sp::Ident]) -> Expr {
        let parts: Vec<String> = parts.iter().map(|p| p.value.to_lowercase()).collect();
        match parts.as_slice() {
            [] => Expr::null(),
            [single] => Expr::Name(NameRef::new(single.clone())),
            [qualifier, attr, rest @ ..] => {
                let mut expr = Expr::Name(NameRef {
                    resolved: Some(qualifier.clone()),
                    ..NameRef::new(attr.clone())
                });
                for part in rest {
                    expr = Expr::Dot {
                        left: Box::new(expr),
                        right: NameRef::new(part.clone()),
                    };
                }
                expr
            }
        }
    }

    fn value(&self, value: &sp::Value) -> VtxResult<Expr> {
        let v = match value {
            sp::Value::Number(n, _) => match n.parse::<i64>() {
                Ok(i) => Value::Int(i),
                Err(_) => Value::Float(n.parse::<f64>().map_err(|_| VtxError::SqlParse {
                    message: format!("invalid number: {n}"),
                    sql: n.clone(),
                })?),
            },
            sp::Value::SingleQuotedString(s) => Value::Text(s.clone()),
            sp::Value::Boolean(b) => Value::Bool(*b),
            sp::Value::Null => Value::Null,
            other => {
                return Err(unsupported(
                    format!("literal {other}"),
                    "use numbers, quoted strings, booleans or NULL",
                ));
            }
        };
        Ok(Expr::Value(v))
    }

    fn subquery(&mut self, query: &sp::Query) -> VtxResult<Box<Query>> {
        let mut q = self.query(query)?;
        q.is_subquery = true;
        Ok(Box::new(q))
    }

    /// SQL Expr → 엔진 Expr 변환
    pub fn expr(&mut self, expr: &sp::Expr) -> VtxResult<Expr> {
        match expr {
            sp::Expr::Identifier(ident) => Ok(self.identifier(&ident.value)),
            sp::Expr::CompoundIdentifier(parts) => Ok(self.compound(parts)),
            sp::Expr::Value(value) => self.value(value),
            sp::Expr::BinaryOp { left, op, right } => {
                if matches!(op, sp::BinaryOperator::Custom(text) if text == ASSIGN_OP) {
                    let variable = match self.expr(left)? {
                        Expr::Variable(v) => v,
                        _ => {
                            return Err(unsupported(
                                "assignment target",
                                "only session variables (@v) can be assigned",
                            ));
                        }
                    };
                    return Ok(Expr::Assign {
                        variable,
                        value: Box::new(self.expr(right)?),
                    });
                }
                let op = convert_binary_op(op)?;
                Ok(Expr::binary(op, self.expr(left)?, self.expr(right)?))
            }
            sp::Expr::UnaryOp { op, expr } => {
                let inner = self.expr(expr)?;
                match op {
                    sp::UnaryOperator::Not => Ok(Expr::Unary {
                        op: UnaryOp::Not,
                        expr: Box::new(inner),
                    }),
                    sp::UnaryOperator::Minus => Ok(Expr::Unary {
                        op: UnaryOp::Minus,
                        expr: Box::new(inner),
                    }),
                    sp::UnaryOperator::Plus => Ok(inner),
                    _ => Err(unsupported(format!("unary operator {op}"), "use NOT or -")),
                }
            }
            sp::Expr::IsNull(e) => Ok(Expr::Unary {
                op: UnaryOp::IsNull,
                expr: Box::new(self.expr(e)?),
            }),
            sp::Expr::IsNotNull(e) => Ok(Expr::Unary {
                op: UnaryOp::IsNotNull,
                expr: Box::new(self.expr(e)?),
            }),
            sp::Expr::Nested(e) => Ok(Expr::Nested(Box::new(self.expr(e)?))),
            sp::Expr::Like {
                negated,
                expr,
                pattern,
                ..
            } => {
                let like = Expr::binary(BinaryOp::Like, self.expr(expr)?, self.expr(pattern)?);
                Ok(if *negated {
                    Expr::Unary {
                        op: UnaryOp::Not,
                        expr: Box::new(like),
                    }
                } else {
                    like
                })
            }
            sp::Expr::Function(func) => self.function(func),
            sp::Expr::Subquery(q) => Ok(Expr::Subquery(self.subquery(q)?)),
            sp::Expr::Exists { subquery, negated } => {
                let exists = Expr::Exists(self.subquery(subquery)?);
                Ok(if *negated {
                    Expr::Unary {
                        op: UnaryOp::Not,
                        expr: Box::new(exists),
                    }
                } else {
                    exists
                })
            }
            sp::Expr::InSubquery {
                expr,
                subquery,
                negated,
            } => Ok(Expr::InSubquery {
                expr: Box::new(self.expr(expr)?),
                query: self.subquery(subquery)?,
                negated: *negated,
            }),
            sp::Expr::InList {
                expr,
                list,
                negated,
            } => {
                let lhs = self.expr(expr)?;
                let mut items = Vec::with_capacity(list.len());
                for e in list {
                    items.push(self.expr(e)?);
                }
                Ok(Expr::InList {
                    expr: Box::new(lhs),
                    list: items,
                    negated: *negated,
                })
            }
            sp::Expr::Between {
                expr,
                negated,
                low,
                high,
            } => Ok(Expr::Between {
                expr: Box::new(self.expr(expr)?),
                low: Box::new(self.expr(low)?),
                high: Box::new(self.expr(high)?),
                negated: *negated,
            }),
            other => Err(unsupported(
                format!("expression {other}"),
                "see the supported expression list in the crate docs",
            )),
        }
    }

    fn function(&mut self, func: &sp::Function) -> VtxResult<Expr> {
        let name = object_name(&func.name);
        let mut args = Vec::new();
        let mut star = false;
        let mut distinct = false;
        match &func.args {
            sp::FunctionArguments::None => {}
            sp::FunctionArguments::List(list) => {
                distinct = matches!(
                    list.duplicate_treatment,
                    Some(sp::DuplicateTreatment::Distinct)
                );
                for arg in &list.args {
                    match arg {
                        sp::FunctionArg::Unnamed(sp::FunctionArgExpr::Expr(e)) => {
                            args.push(self.expr(e)?)
                        }
                        sp::FunctionArg::Unnamed(sp::FunctionArgExpr::Wildcard) => star = true,
                        other => {
                            return Err(unsupported(
                                format!("function argument {other}"),
                                "use positional arguments",
                            ));
                        }
                    }
                }
            }
            sp::FunctionArguments::Subquery(_) => {
                return Err(unsupported(
                    "subquery as function argument list",
                    "pass the subquery as an ordinary argument",
                ));
            }
        }

        // rv.method(args): 인스턴스 메서드 호출
        if let [qualifier, _] = func.name.0.as_slice() {
            return Ok(Expr::Method(MethodCall {
                name: NameRef::new(name).with_meta(NameMeta::Method),
                target: Some(Box::new(Expr::Name(NameRef::new(
                    qualifier.value.to_lowercase(),
                )))),
                args,
                class_method: false,
            }));
        }

        match name.as_str() {
            "inst_num" => return Ok(Expr::Pseudo(PseudoColumn::InstNum)),
            "orderby_num" => return Ok(Expr::Pseudo(PseudoColumn::OrderbyNum)),
            "groupby_num" => return Ok(Expr::Pseudo(PseudoColumn::GroupbyNum)),
            "rownum" => return Ok(Expr::Pseudo(PseudoColumn::Rownum)),
            _ => {}
        }

        let over = match &func.over {
            None => None,
            Some(sp::WindowType::WindowSpec(spec)) => {
                let mut window = Window::default();
                for e in &spec.partition_by {
                    window.partition_by.push(self.expr(e)?);
                }
                for ob in &spec.order_by {
                    window.order_by.push(self.expr(&ob.expr)?);
                }
                Some(Box::new(window))
            }
            Some(_) => {
                return Err(unsupported("named window", "write the window inline"));
            }
        };
        let kind = if over.is_some() {
            FunctionKind::Analytic
        } else if AGGREGATES.contains(&name.as_str()) {
            FunctionKind::Aggregate
        } else {
            FunctionKind::Scalar
        };
        Ok(Expr::Function(FunctionCall {
            name,
            args,
            kind,
            distinct,
            star,
            over,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_binary_op() {
        assert_eq!(
            convert_binary_op(&sp::BinaryOperator::Plus).unwrap(),
            BinaryOp::Plus
        );
        assert_eq!(
            convert_binary_op(&sp::BinaryOperator::StringConcat).unwrap(),
            BinaryOp::Concat
        );
        assert!(convert_binary_op(&sp::BinaryOperator::BitwiseXor).is_err());
    }

    #[test]
    fn test_compound_identifier_to_path() {
        let lowering = Lowering::new();
        let parts = vec![
            sp::Ident::new("E"),
            sp::Ident::new("Dept"),
            sp::Ident::new("Name"),
        ];
        match lowering.compound(&parts) {
            Expr::Dot { left, right } => {
                assert_eq!(right.name, "name");
                let base = left.as_name().unwrap();
                assert_eq!(base.name, "dept");
                assert_eq!(base.resolved.as_deref(), Some("e"));
            }
            other => panic!("Expected Dot, got: {:?}", other),
        }
    }

    #[test]
    fn test_session_variable_identifier() {
        let lowering = Lowering::new();
        assert_eq!(lowering.identifier("@Cnt"), Expr::Variable("cnt".into()));
        assert_eq!(lowering.identifier("ROWNUM"), Expr::Pseudo(PseudoColumn::Rownum));
    }
}
