//! 번역 컨텍스트
//!
//! 세션(파서 인스턴스) 하나의 번역 상태. 뷰 정의 캐시, 진행 중 뷰 스택,
//! 스펙 식별자 발급기를 명시적으로 들고 다닌다. 전역 상태는 없다.

use super::QueryNormalizer;
use super::view_cache::ViewDefinition;
use crate::catalog::{Privilege, SchemaProvider};
use crate::config::{FeatureFlags, RewriteFeature, TranslatorConfig};
use crate::error::{VtxError, VtxResult};
use crate::sql::ast::*;
use crate::sql::{Binder, SqlParser};
use crate::types::ClassId;
use ahash::{AHashMap, AHashSet};
use smallvec::SmallVec;
use std::fmt;
use std::sync::Arc;

/// 뷰 번역기
pub struct ViewTranslator<'a> {
    pub(crate) schema: &'a dyn SchemaProvider,
    pub(crate) config: TranslatorConfig,
    pub(crate) flags: FeatureFlags,
    /// 현재 요청자 (뷰 본문 컴파일 중에는 뷰 소유자)
    pub(crate) user: String,
    pub(crate) ids: IdGenerator,
    pub(crate) cache: AHashMap<ClassId, Arc<ViewDefinition>>,
    /// 컴파일 중인 뷰 (순환 감지)
    pub(crate) in_progress: SmallVec<[ClassId; 8]>,
    pub(crate) parser: SqlParser,
    pub(crate) normalizer: QueryNormalizer,
    /// 갱신 불가 뷰의 OID 표식으로 쓰인 뷰 이름
    pub(crate) markers: AHashSet<String>,
}

impl<'a> ViewTranslator<'a> {
    pub fn new(schema: &'a dyn SchemaProvider) -> Self {
        Self::with_config(schema, TranslatorConfig::default())
    }

    pub fn with_config(schema: &'a dyn SchemaProvider, config: TranslatorConfig) -> Self {
        let flags = config.feature_flags();
        let user = config.default_user.clone();
        Self {
            schema,
            config,
            flags,
            user,
            ids: IdGenerator::new(),
            cache: AHashMap::new(),
            in_progress: SmallVec::new(),
            parser: SqlParser::new(),
            normalizer: QueryNormalizer::new(),
            markers: AHashSet::new(),
        }
    }

    /// 요청자 지정
    pub fn as_user(mut self, user: &str) -> Self {
        self.user = user.to_lowercase();
        self
    }

    pub fn with_normalizer(mut self, normalizer: QueryNormalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn config(&self) -> &TranslatorConfig {
        &self.config
    }

    pub fn flags(&self) -> &FeatureFlags {
        &self.flags
    }

    /// 캐시된 뷰 정의 개수
    pub fn cached_views(&self) -> usize {
        self.cache.len()
    }

    /// SQL 파싱 + 바인딩
    pub fn prepare(&mut self, sql: &str) -> VtxResult<Statement> {
        let mut stmt = self.parser.parse_statement(sql)?;
        Binder::new(self.schema, &mut self.ids).bind_statement(&mut stmt)?;
        Ok(stmt)
    }

    /// SQL 파싱 + 바인딩 + 번역
    pub fn translate_sql(&mut self, sql: &str) -> VtxResult<TranslatedStatement> {
        let stmt = self.prepare(sql)?;
        self.translate(stmt)
    }

    pub(crate) fn feature(&self, feature: RewriteFeature) -> bool {
        self.flags.is_enabled(feature)
    }

    pub(crate) fn is_virtual(&self, class: &ClassId) -> bool {
        self.schema.is_virtual(class)
    }

    /// 후보 클래스 중 가상 클래스가 있는 (파생 테이블이 아닌) 스펙
    pub(crate) fn has_virtual(&self, spec: &EntitySpec) -> bool {
        !spec.is_derived() && spec.entities.iter().any(|c| self.is_virtual(c))
    }

    /// 실제 클래스에 대한 요청자 권한 검사
    pub(crate) fn check_privilege(&self, class: &ClassId, what_for: Privilege) -> VtxResult<()> {
        let granted = self.schema.privileges(&self.user, class);
        if granted.contains(what_for) {
            return Ok(());
        }
        tracing::warn!(user = %self.user, class = %class, required = %what_for, "translation rejected");
        Err(VtxError::AuthorizationDenied {
            privilege: what_for.to_string(),
            class: class.to_string(),
        })
    }

    /// 요청자를 잠시 바꿔 실행 (뷰 본문은 소유자 권한으로 번역)
    pub(crate) fn run_as<T>(
        &mut self,
        user: &str,
        f: impl FnOnce(&mut Self) -> VtxResult<T>,
    ) -> VtxResult<T> {
        let saved = std::mem::replace(&mut self.user, user.to_lowercase());
        let result = f(self);
        self.user = saved;
        result
    }
}

// ─── Statement helpers ───────────────────────────────────

pub(crate) fn spec_at(stmt: &Statement, idx: usize) -> Option<&EntitySpec> {
    stmt.specs().get(idx).copied()
}

pub(crate) fn spec_at_mut(stmt: &mut Statement, idx: usize) -> Option<&mut EntitySpec> {
    match stmt {
        Statement::Query(q) => q.as_select_mut()?.from.get_mut(idx),
        Statement::Update(u) => u.specs.get_mut(idx),
        Statement::Delete(d) => d.specs.get_mut(idx),
        Statement::Insert(i) => (idx == 0).then_some(&mut i.spec),
        Statement::Merge(m) => match idx {
            0 => Some(&mut m.target),
            1 => Some(&mut m.source),
            _ => None,
        },
    }
}

/// 최상위 스펙 전체 (경로 스펙 포함 검색용)
pub(crate) fn root_specs_mut(stmt: &mut Statement) -> Vec<&mut EntitySpec> {
    match stmt {
        Statement::Query(q) => match q.as_select_mut() {
            Some(select) => select.from.iter_mut().collect(),
            None => Vec::new(),
        },
        Statement::Update(u) => u.specs.iter_mut().collect(),
        Statement::Delete(d) => d.specs.iter_mut().collect(),
        Statement::Insert(i) => vec![&mut i.spec],
        Statement::Merge(m) => vec![&mut m.target, &mut m.source],
    }
}

/// `idx` 스펙을 새 스펙 목록으로 교체
///
/// 단일 대상 문장(INSERT, MERGE)은 정확히 하나의 스펙만 받는다.
pub(crate) fn splice_spec(stmt: &mut Statement, idx: usize, specs: Vec<EntitySpec>) -> VtxResult<()> {
    let list = match stmt {
        Statement::Query(q) => match q.as_select_mut() {
            Some(select) => &mut select.from,
            None => return Err(VtxError::structural("spec splice on a set operation")),
        },
        Statement::Update(u) => &mut u.specs,
        Statement::Delete(d) => &mut d.specs,
        Statement::Insert(_) | Statement::Merge(_) => {
            let class = spec_at(stmt, idx)
                .map(|s| s.range_var.clone())
                .unwrap_or_default();
            let mut specs = specs;
            if specs.len() != 1 {
                return Err(VtxError::NotUpdatable { class });
            }
            let single = specs.remove(0);
            let slot = spec_at_mut(stmt, idx)
                .ok_or_else(|| VtxError::structural(format!("no spec at position {idx}")))?;
            *slot = single;
            return Ok(());
        }
    };
    if idx >= list.len() {
        return Err(VtxError::structural(format!("no spec at position {idx}")));
    }
    list.splice(idx..=idx, specs);
    Ok(())
}

/// 문장의 WHERE 결합 조건
pub(crate) fn where_mut(stmt: &mut Statement) -> Option<&mut Vec<Expr>> {
    match stmt {
        Statement::Query(q) => q.as_select_mut().map(|s| &mut s.where_clause),
        Statement::Update(u) => Some(&mut u.where_clause),
        Statement::Delete(d) => Some(&mut d.where_clause),
        Statement::Merge(m) => m.update.as_mut().map(|up| &mut up.where_clause),
        Statement::Insert(_) => None,
    }
}

/// 문장의 힌트와 USING INDEX 목록
pub(crate) fn hints_mut(stmt: &mut Statement) -> Option<(&mut Hints, &mut Vec<NameRef>)> {
    match stmt {
        Statement::Query(q) => q
            .as_select_mut()
            .map(|s| (&mut s.hints, &mut s.using_index)),
        Statement::Update(u) => Some((&mut u.hints, &mut u.using_index)),
        Statement::Delete(d) => Some((&mut d.hints, &mut d.using_index)),
        Statement::Insert(_) | Statement::Merge(_) => None,
    }
}

pub(crate) fn into_query(stmt: Statement) -> VtxResult<Query> {
    match stmt {
        Statement::Query(q) => Ok(q),
        other => Err(VtxError::structural(format!(
            "expected a query, found {}",
            other.kind()
        ))),
    }
}

// ─── Result ──────────────────────────────────────────────

/// 번역 결과: 읽기는 문장 하나, 쓰기는 실제 클래스 분기마다 하나
#[derive(Debug, Clone, PartialEq)]
pub struct TranslatedStatement {
    statements: Vec<Statement>,
}

impl TranslatedStatement {
    pub(crate) fn new(statements: Vec<Statement>) -> Self {
        Self { statements }
    }

    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }

    pub fn into_statements(self) -> Vec<Statement> {
        self.statements
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    pub fn first(&self) -> Option<&Statement> {
        self.statements.first()
    }

    /// 읽기 번역 결과의 질의
    pub fn query(&self) -> Option<&Query> {
        match self.statements.as_slice() {
            [Statement::Query(q)] => Some(q),
            _ => None,
        }
    }
}

impl fmt::Display for TranslatedStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, stmt) in self.statements.iter().enumerate() {
            if i > 0 {
                f.write_str(";\n")?;
            }
            write!(f, "{stmt}")?;
        }
        Ok(())
    }
}
