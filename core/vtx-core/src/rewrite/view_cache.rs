//! 뷰 정의 캐시
//!
//! 뷰 본문 문자열을 파싱, 바인딩, 재귀 번역해 두고 세션 동안 재사용한다.
//! 진행 중인 뷰 스택으로 순환 정의를 감지한다.

use super::context::ViewTranslator;
use super::invert::{invert, value_placeholder};
use super::updatable::{Updatability, classify};
use crate::catalog::{CheckOptionKind, ClassInfo, Privilege};
use crate::error::{VtxError, VtxResult};
use crate::sql::Binder;
use crate::sql::ast::*;
use crate::types::{ClassId, DataType};
use std::sync::Arc;

/// 컴파일된 뷰 정의
#[derive(Debug, Clone)]
pub struct ViewDefinition {
    pub class: ClassId,
    pub owner: String,
    /// 식별자(OID) 자리표시자 + 선언된 속성
    pub attributes: Vec<NameRef>,
    /// 읽기 형태: 저장된 본문마다 하나 (집합 연산 가능)
    pub for_select: Vec<Query>,
    /// 갱신 형태: UNION ALL을 펼친 SELECT 분기
    pub for_update: Vec<Query>,
    /// 부분 갱신 형태 (UPDATE 전용)
    pub for_partial_update: Vec<Query>,
    /// 쓰기 분기별, 속성별 역변환 (실제 컬럼, 값 템플릿)
    pub inverted_for_update: Vec<Vec<Option<(NameRef, Expr)>>>,
    /// 소유자 기준 질의 권한
    pub authorization: Privilege,
    pub updatability: Updatability,
    pub check_option: CheckOptionKind,
}

impl ViewDefinition {
    /// 쓰기에 쓸 분기 (갱신 형태가 없으면 부분 갱신 형태)
    pub fn write_branches(&self) -> &[Query] {
        if self.for_update.is_empty() {
            &self.for_partial_update
        } else {
            &self.for_update
        }
    }

    /// 속성 위치 (0 = 식별자)
    pub fn attribute_position(&self, name: &str) -> Option<usize> {
        self.attributes
            .iter()
            .position(|a| !a.is_oid() && a.name.eq_ignore_ascii_case(name))
    }

    /// 분기의 `pos`번째 노출 컬럼 정의식
    pub fn column_of<'q>(branch: &'q Query, pos: usize) -> Option<&'q Expr> {
        branch.as_select()?.list.iter().filter(|c| !c.hidden).nth(pos).map(|c| &c.expr)
    }

    /// 읽기 분기 중 하나라도 집합 연산인지
    pub fn has_set_operation(&self) -> bool {
        self.for_select.iter().any(|q| !q.is_select())
    }
}

/// 뷰 속성 자리표시자 목록
fn attribute_placeholders(info: &ClassInfo) -> Vec<NameRef> {
    let mut attrs = Vec::with_capacity(info.attributes.len() + 1);
    attrs.push(
        NameRef::new("")
            .with_meta(NameMeta::Oid)
            .with_type(DataType::Object(info.id.clone())),
    );
    attrs.extend(info.attributes.iter().map(|a| {
        let name = NameRef::new(a.name.to_lowercase()).with_type(a.domain.clone());
        if a.shared {
            name.with_meta(NameMeta::Shared)
        } else {
            name
        }
    }));
    attrs
}

/// 모든 SELECT 분기의 노출 컬럼 수가 선언된 속성 수와 같은지
fn check_arity(query: &Query, info: &ClassInfo) -> VtxResult<()> {
    match &query.body {
        QueryBody::SetOp { left, right, .. } => {
            check_arity(left, info)?;
            check_arity(right, info)
        }
        QueryBody::Select(select) => {
            let visible = select.list.iter().filter(|c| !c.hidden).count();
            let declared = info.attributes.len();
            if visible == declared {
                return Ok(());
            }
            let side = if visible > declared { "more" } else { "fewer" };
            Err(VtxError::ArityMismatch {
                view: info.id.to_string(),
                detail: format!(
                    "query spec has {side} columns than attributes ({visible} vs {declared})"
                ),
            })
        }
    }
}

/// 각 SELECT 분기 맨 앞에 첫 FROM 스펙의 식별자 컬럼 추가
fn prepend_identity(query: &mut Query) {
    query.for_each_select_mut(&mut |select| {
        let identity = match select.from.first() {
            Some(spec) if !spec.is_derived() => Expr::Name(NameRef::oid(
                spec.id,
                spec.range_var.clone(),
                spec.first_entity().cloned(),
            )),
            _ => Expr::null(),
        };
        select.list.insert(0, Column::new(identity));
    });
    for ob in &mut query.order_by {
        if let SortKey::Position(p) = &mut ob.key {
            *p += 1;
        }
    }
}

/// UNION ALL 분기를 펼친다
fn flatten_union_all(query: &Query, out: &mut Vec<Query>) {
    match &query.body {
        QueryBody::SetOp {
            op: SetOperator::Union,
            left,
            right,
        } if !query.distinct => {
            flatten_union_all(left, out);
            flatten_union_all(right, out);
        }
        _ => out.push(query.clone()),
    }
}

/// 갱신 불가 뷰 표식: 뷰 이름을 담은 시퀀스
pub(crate) fn marker_for(view: &ClassId) -> Expr {
    Expr::Sequence(vec![Expr::text(view.as_str())])
}

impl ViewTranslator<'_> {
    /// 요청 권한을 검사한 뒤 뷰 정의 반환
    pub(crate) fn get_view(&mut self, class: &ClassId, what_for: Privilege) -> VtxResult<Arc<ViewDefinition>> {
        let def = self.view_definition(class)?;
        self.authorize_view(&def, what_for)?;
        Ok(def)
    }

    /// 뷰 권한(요청자 권한 AND 소유자 기준 질의 권한) 검사
    pub(crate) fn authorize_view(&self, def: &ViewDefinition, what_for: Privilege) -> VtxResult<()> {
        let grants = if def.owner.eq_ignore_ascii_case(&self.user) {
            Privilege::ALL
        } else {
            self.schema.privileges(&self.user, &def.class)
        };
        if (grants & def.authorization).contains(what_for) {
            return Ok(());
        }
        tracing::warn!(user = %self.user, view = %def.class, required = %what_for, "view access rejected");
        Err(VtxError::AuthorizationDenied {
            privilege: what_for.to_string(),
            class: def.class.to_string(),
        })
    }

    /// 캐시된 정의 또는 새로 컴파일한 정의 (권한 검사 없음)
    pub(crate) fn view_definition(&mut self, class: &ClassId) -> VtxResult<Arc<ViewDefinition>> {
        if let Some(def) = self.cache.get(class) {
            return Ok(Arc::clone(def));
        }
        if self.in_progress.contains(class) || self.in_progress.len() >= self.config.max_view_depth {
            tracing::warn!(view = %class, depth = self.in_progress.len(), "cyclic view definition");
            return Err(VtxError::CyclicViewDefinition {
                class: class.to_string(),
            });
        }

        self.in_progress.push(class.clone());
        let compiled = self.compile_view(class);
        self.in_progress.pop();

        let def = Arc::new(compiled?);
        tracing::debug!(
            view = %class,
            branches = def.for_select.len(),
            updatability = %def.updatability,
            authorization = %def.authorization,
            "view compiled"
        );
        self.cache.insert(class.clone(), Arc::clone(&def));
        Ok(def)
    }

    fn compile_view(&mut self, class: &ClassId) -> VtxResult<ViewDefinition> {
        let info = self
            .schema
            .class(class)
            .ok_or_else(|| VtxError::ClassNotFound(class.to_string()))?;
        if !info.is_virtual() {
            return Err(VtxError::structural(format!("'{class}' is not a virtual class")));
        }
        let owner = info.owner.clone();
        let check_option = info.check_option;
        let sources = info.query_specs.clone();
        let attributes = attribute_placeholders(info);

        let (for_select, authorization) = self.run_as(&owner, |t| {
            let mut bodies = Vec::with_capacity(sources.len());
            for sql in &sources {
                bodies.push(t.compile_branch(info, sql)?);
            }
            let authorization = bodies
                .iter()
                .fold(Privilege::ALL, |acc, q| acc & t.query_authorization(q));
            Ok((bodies, authorization))
        })?;

        let updatability = if for_select.is_empty() {
            Updatability::NotUpdatable
        } else {
            for_select
                .iter()
                .map(|q| classify(q, self.schema))
                .min()
                .unwrap_or(Updatability::NotUpdatable)
        };

        let mut flat = Vec::new();
        for body in &for_select {
            flatten_union_all(body, &mut flat);
        }
        let (for_update, for_partial_update) = match updatability {
            Updatability::Updatable => (flat, Vec::new()),
            Updatability::PartiallyUpdatable => (Vec::new(), flat),
            Updatability::NotUpdatable => (Vec::new(), Vec::new()),
        };

        let mut def = ViewDefinition {
            class: class.clone(),
            owner,
            attributes,
            for_select,
            for_update,
            for_partial_update,
            inverted_for_update: Vec::new(),
            authorization,
            updatability,
            check_option,
        };
        def.inverted_for_update = def
            .write_branches()
            .iter()
            .map(|branch| {
                (0..def.attributes.len())
                    .map(|pos| {
                        if pos == 0 {
                            return None;
                        }
                        ViewDefinition::column_of(branch, pos)
                            .and_then(|e| invert(e, value_placeholder()))
                    })
                    .collect()
            })
            .collect();

        if updatability == Updatability::NotUpdatable {
            let marker = marker_for(class);
            for body in &mut def.for_select {
                body.for_each_select_mut(&mut |select| {
                    if let Some(first) = select.list.first_mut() {
                        first.expr = marker.clone();
                    }
                });
            }
            self.markers.insert(class.to_string());
        }
        Ok(def)
    }

    /// 저장된 본문 하나: 파싱, 바인딩, 검사 옵션, 재귀 번역, 식별자 컬럼
    fn compile_branch(&mut self, info: &ClassInfo, sql: &str) -> VtxResult<Query> {
        let mut query = self.parser.parse_query(sql)?;
        Binder::new(self.schema, &mut self.ids).bind_query(&mut query)?;
        query.is_view_spec = true;
        check_arity(&query, info)?;

        if info.check_option == CheckOptionKind::Local {
            query.for_each_select_mut(&mut |select| {
                select.check_where = select.where_clause.clone();
            });
        }

        let mut query = self.translate_query(query)?;
        query.is_view_spec = true;
        prepend_identity(&mut query);

        if info.check_option == CheckOptionKind::Cascaded {
            query.for_each_select_mut(&mut |select| {
                select.check_where = select.where_clause.clone();
            });
        }
        Ok(query)
    }

    /// 현재 사용자(뷰 소유자) 기준 질의 권한
    pub(crate) fn query_authorization(&self, query: &Query) -> Privilege {
        match &query.body {
            QueryBody::SetOp {
                op: SetOperator::Union,
                left,
                right,
            } => self.query_authorization(left) & self.query_authorization(right),
            QueryBody::SetOp { .. } => Privilege::SELECT,
            QueryBody::Select(select) if select.from.is_empty() => Privilege::SELECT,
            // 조인은 모든 스펙의 권한 AND (부분 갱신은 갱신 분기 선택에서 제한)
            QueryBody::Select(select) => select.from.iter().fold(Privilege::ALL, |acc, spec| {
                let spec_grants = match &spec.derived {
                    Some(body) => self.query_authorization(body),
                    None => spec.entities.iter().fold(Privilege::ALL, |grants, class| {
                        grants & self.schema.privileges(&self.user, class)
                    }),
                };
                acc & spec_grants
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{ClassBuilder, InMemoryCatalog};

    fn catalog() -> InMemoryCatalog {
        InMemoryCatalog::new()
            .with_class(
                ClassBuilder::real("emp")
                    .owner("alice")
                    .attr("id", DataType::Integer)
                    .attr("name", DataType::Varchar)
                    .attr("dept", DataType::Integer)
                    .attr("sal", DataType::Integer),
            )
            .with_class(
                ClassBuilder::view("v_emp")
                    .owner("alice")
                    .attr("id", DataType::Integer)
                    .attr("name", DataType::Varchar)
                    .query("SELECT id, name FROM emp WHERE dept = 1")
                    .check_option(CheckOptionKind::Cascaded),
            )
            .with_class(
                ClassBuilder::view("v_pay")
                    .owner("alice")
                    .attr("id", DataType::Integer)
                    .attr("pay", DataType::Integer)
                    .query("SELECT id, sal * 12 FROM emp")
                    .query("SELECT id, sal + 100 FROM emp WHERE dept = 2"),
            )
            .with_class(
                ClassBuilder::view("v_g")
                    .owner("alice")
                    .attr("id", DataType::Integer)
                    .attr("s", DataType::Integer)
                    .query("SELECT id, SUM(sal) AS s FROM emp GROUP BY id"),
            )
            .with_class(
                ClassBuilder::view("v_bad")
                    .owner("alice")
                    .attr("id", DataType::Integer)
                    .query("SELECT id, name FROM emp"),
            )
            .with_class(
                ClassBuilder::view("v_a")
                    .owner("alice")
                    .attr("id", DataType::Integer)
                    .query("SELECT id FROM v_b"),
            )
            .with_class(
                ClassBuilder::view("v_b")
                    .owner("alice")
                    .attr("id", DataType::Integer)
                    .query("SELECT id FROM v_a"),
            )
            .with_grant("bob", "v_emp", Privilege::SELECT)
    }

    #[test]
    fn test_compile_simple_view() {
        let catalog = catalog();
        let mut t = ViewTranslator::new(&catalog);
        let def = t.view_definition(&ClassId::new("v_emp")).unwrap();

        assert_eq!(def.attributes.len(), 3);
        assert!(def.attributes[0].is_oid());
        assert_eq!(def.updatability, Updatability::Updatable);
        assert_eq!(def.authorization, Privilege::ALL);
        assert_eq!(def.for_update.len(), 1);

        let select = def.for_select[0].as_select().unwrap();
        assert_eq!(select.list.len(), 3);
        assert!(select.list[0].expr.as_name().unwrap().is_oid());
        // CASCADED: 번역된 WHERE가 검사 술어
        assert_eq!(select.check_where, select.where_clause);

        // 역변환: 단순 컬럼은 그대로
        let (real, template) = def.inverted_for_update[0][2].clone().unwrap();
        assert_eq!(real.name, "name");
        assert_eq!(template, value_placeholder());
    }

    #[test]
    fn test_definition_is_memoized() {
        let catalog = catalog();
        let mut t = ViewTranslator::new(&catalog);
        let first = t.view_definition(&ClassId::new("v_emp")).unwrap();
        let second = t.view_definition(&ClassId::new("v_emp")).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(t.cached_views(), 1);
    }

    #[test]
    fn test_multiple_query_specs_flatten() {
        let catalog = catalog();
        let mut t = ViewTranslator::new(&catalog);
        let def = t.view_definition(&ClassId::new("v_pay")).unwrap();
        assert_eq!(def.for_select.len(), 2);
        assert_eq!(def.for_update.len(), 2);

        let (real, template) = def.inverted_for_update[1][2].clone().unwrap();
        assert_eq!(real.name, "sal");
        assert_eq!(template.to_string(), "? - 100");
    }

    #[test]
    fn test_grouped_view_is_marked() {
        let catalog = catalog();
        let mut t = ViewTranslator::new(&catalog);
        let def = t.view_definition(&ClassId::new("v_g")).unwrap();
        assert_eq!(def.updatability, Updatability::NotUpdatable);
        assert!(def.write_branches().is_empty());
        let first = &def.for_select[0].as_select().unwrap().list[0].expr;
        assert_eq!(*first, marker_for(&ClassId::new("v_g")));
        assert!(t.markers.contains("v_g"));
    }

    #[test]
    fn test_arity_mismatch() {
        let catalog = catalog();
        let mut t = ViewTranslator::new(&catalog);
        match t.view_definition(&ClassId::new("v_bad")) {
            Err(VtxError::ArityMismatch { view, detail }) => {
                assert_eq!(view, "v_bad");
                assert!(detail.contains("more columns"));
            }
            other => panic!("Expected ArityMismatch, got: {:?}", other),
        }
    }

    #[test]
    fn test_cycle_detected() {
        let catalog = catalog();
        let mut t = ViewTranslator::new(&catalog);
        match t.view_definition(&ClassId::new("v_a")) {
            Err(VtxError::CyclicViewDefinition { .. }) => {}
            other => panic!("Expected CyclicViewDefinition, got: {:?}", other),
        }
        // 실패 후에도 진행 중 스택은 비어 있다
        assert!(t.in_progress.is_empty());
        assert_eq!(t.user(), "dba");
    }

    #[test]
    fn test_join_view_authorization_ands_every_class() {
        let catalog = catalog()
            .with_class(
                ClassBuilder::real("dept")
                    .owner("alice")
                    .attr("id", DataType::Integer)
                    .attr("title", DataType::Varchar),
            )
            .with_class(
                ClassBuilder::view("v_ed")
                    .owner("carol")
                    .attr("name", DataType::Varchar)
                    .attr("title", DataType::Varchar)
                    .query("SELECT e.name, d.title FROM emp e, dept d WHERE e.dept = d.id"),
            )
            .with_grant("carol", "emp", Privilege::SELECT | Privilege::UPDATE)
            .with_grant("carol", "dept", Privilege::ALL);
        let mut t = ViewTranslator::new(&catalog).as_user("carol");
        let def = t.view_definition(&ClassId::new("v_ed")).unwrap();

        assert_eq!(def.updatability, Updatability::PartiallyUpdatable);
        assert_eq!(def.authorization, Privilege::SELECT | Privilege::UPDATE);
        assert!(t.authorize_view(&def, Privilege::UPDATE).is_ok());
        match t.authorize_view(&def, Privilege::DELETE) {
            Err(VtxError::AuthorizationDenied { privilege, class }) => {
                assert_eq!(privilege, "DELETE");
                assert_eq!(class, "v_ed");
            }
            other => panic!("Expected AuthorizationDenied, got: {:?}", other),
        }
    }

    #[test]
    fn test_requester_authorization() {
        let catalog = catalog();
        let mut t = ViewTranslator::new(&catalog).as_user("bob");
        let view = ClassId::new("v_emp");
        assert!(t.get_view(&view, Privilege::SELECT).is_ok());
        match t.get_view(&view, Privilege::UPDATE) {
            Err(VtxError::AuthorizationDenied { privilege, class }) => {
                assert_eq!(privilege, "UPDATE");
                assert_eq!(class, "v_emp");
            }
            other => panic!("Expected AuthorizationDenied, got: {:?}", other),
        }

        let mut owner = ViewTranslator::new(&catalog).as_user("alice");
        assert!(owner.get_view(&view, Privilege::ALL).is_ok());
    }
}
