//! 이름 치환 (lambda)
//!
//! 자리표시자 이름 목록을 같은 위치의 표현식 목록으로 바꾼다. 치환 값은
//! 매번 깊은 복사되고, 하위 질의를 포함하면 스펙 식별자를 재발급한다.
//!
//! - 더 큰 표현식 안에 들어가는 복합 표현식은 괄호로 감싼다
//! - `query.attr` 경로는 질의의 첫 컬럼으로 밀어 넣는다
//! - 공유 속성 치환은 SELECT마다 클래스 단위 스펙을 새로 만든다

use super::correlation::bump_nested_queries;
use super::registry::{regenerate_if_ambiguous, reset_ids};
use crate::sql::ast::visit::{VisitorMut, Walk, Walkable, expr_contains};
use crate::sql::ast::*;
use crate::types::{ClassId, Value};
use ahash::AHashMap;

/// 한 스펙에 대한 이름 치환기
pub struct Substitution<'g> {
    spec_id: SpecId,
    names: Vec<NameRef>,
    replacements: Vec<Expr>,
    ids: &'g mut IdGenerator,
    /// 메서드/힌트/인덱스 이름이 옮겨갈 스펙
    retarget: Option<(SpecId, String)>,
    /// 공유 속성 치환 값의 스펙 → 클래스
    shared_classes: AHashMap<SpecId, ClassId>,
    frames: Vec<Vec<EntitySpec>>,
    depth: u32,
    /// 표현식 안 하위 질의 깊이 (치환 값의 상관 깊이 보정)
    query_depth: u32,
    saved_depths: Vec<(u32, bool)>,
}

fn has_query(expr: &Expr) -> bool {
    expr_contains(expr, |e| {
        matches!(e, Expr::Subquery(_) | Expr::Exists(_) | Expr::InSubquery { .. })
    })
}

fn parenthesize(expr: Expr, nested: bool) -> Expr {
    if nested && expr.is_compound() {
        Expr::Nested(Box::new(expr))
    } else {
        expr
    }
}

/// 질의의 모든 분기 첫 컬럼에 `.attr` 적용
fn push_dot_in_query(query: &mut Query, right: &NameRef) {
    query.for_each_select_mut(&mut |select| {
        if let Some(first) = select.list.first_mut() {
            let left = std::mem::replace(&mut first.expr, Expr::null());
            first.expr = Expr::Dot {
                left: Box::new(left),
                right: right.clone(),
            };
        }
    });
}

impl<'g> Substitution<'g> {
    /// `spec_id`에 바인딩된 `names[i]`를 `replacements[i]`로 치환
    pub fn new(
        spec_id: SpecId,
        names: Vec<NameRef>,
        replacements: Vec<Expr>,
        ids: &'g mut IdGenerator,
    ) -> Self {
        Self {
            spec_id,
            names,
            replacements,
            ids,
            retarget: None,
            shared_classes: AHashMap::new(),
            frames: Vec::new(),
            depth: 0,
            query_depth: 0,
            saved_depths: Vec::new(),
        }
    }

    pub fn retarget(mut self, id: SpecId, range_var: impl Into<String>) -> Self {
        self.retarget = Some((id, range_var.into()));
        self
    }

    pub fn shared_classes(mut self, classes: AHashMap<SpecId, ClassId>) -> Self {
        self.shared_classes = classes;
        self
    }

    pub fn apply<T: Walkable + ?Sized>(&mut self, tree: &mut T) {
        let _ = tree.walk_mut(self);
    }

    fn position(&self, name: &NameRef) -> Option<usize> {
        if name.spec_id != Some(self.spec_id) {
            return None;
        }
        if matches!(
            name.meta,
            NameMeta::Method | NameMeta::HintName | NameMeta::IndexName | NameMeta::Parameter
        ) {
            return None;
        }
        self.names.iter().position(|p| p.same_name(name))
    }

    fn replacement(&mut self, index: usize, nested: bool) -> Expr {
        let mut expr = self.replacements[index].clone();
        if let Expr::Name(n) = &mut expr {
            if n.meta == NameMeta::Shared {
                self.bind_shared(n);
            }
        }
        if has_query(&expr) {
            reset_ids(&mut expr, self.ids);
            bump_nested_queries(&mut expr, self.query_depth, 1);
        }
        parenthesize(expr, nested)
    }

    /// 공유 속성은 현재 SELECT의 클래스 단위 스펙에 바인딩
    fn bind_shared(&mut self, name: &mut NameRef) {
        let Some(class) = name.spec_id.and_then(|id| self.shared_classes.get(&id)).cloned() else {
            return;
        };
        let Some(frame) = self.frames.last_mut() else {
            return;
        };
        let (id, rv) = match frame.iter().find(|s| s.first_entity() == Some(&class)) {
            Some(spec) => (spec.id, spec.range_var.clone()),
            None => {
                let spec = EntitySpec::new_class(self.ids.next_id(), class.clone(), class.as_str());
                let found = (spec.id, spec.range_var.clone());
                frame.push(spec);
                found
            }
        };
        name.spec_id = Some(id);
        name.resolved = Some(rv);
    }
}

impl VisitorMut for Substitution<'_> {
    fn enter_expr(&mut self, expr: &mut Expr) -> Walk {
        self.depth += 1;
        let nested = self.depth > 1;
        match expr {
            Expr::Name(n) => {
                if let Some(i) = self.position(n) {
                    *expr = self.replacement(i, nested);
                    return Walk::Skip;
                }
            }
            Expr::Dot { right, .. } => {
                if let Some(i) = self.position(right) {
                    match self.replacement(i, false) {
                        Expr::Name(n) => *right = n,
                        other => {
                            *expr = parenthesize(other, nested);
                            return Walk::Skip;
                        }
                    }
                }
            }
            _ => {}
        }
        Walk::Continue
    }

    fn leave_expr(&mut self, expr: &mut Expr) {
        self.depth = self.depth.saturating_sub(1);
        if !matches!(expr, Expr::Dot { .. }) {
            return;
        }
        let Expr::Dot { left, right } = std::mem::replace(expr, Expr::null()) else {
            return;
        };
        *expr = match *left {
            Expr::Subquery(mut query) => {
                push_dot_in_query(&mut query, &right);
                Expr::Subquery(query)
            }
            Expr::Name(oid) if oid.is_oid() => Expr::Name(NameRef {
                name: right.name,
                resolved: oid.resolved,
                spec_id: oid.spec_id,
                meta: NameMeta::Normal,
                data_type: right.data_type,
            }),
            Expr::Value(Value::Null) => Expr::null(),
            other => Expr::Dot {
                left: Box::new(other),
                right,
            },
        };
    }

    fn visit_name(&mut self, name: &mut NameRef) -> Walk {
        let movable = matches!(
            name.meta,
            NameMeta::Method | NameMeta::HintName | NameMeta::IndexName
        );
        if movable && name.spec_id == Some(self.spec_id) {
            if let Some((id, rv)) = &self.retarget {
                name.spec_id = Some(*id);
                name.resolved = Some(rv.clone());
            }
        }
        Walk::Continue
    }

    fn visit_spec_column(&mut self, _name: &mut NameRef) -> Walk {
        Walk::Continue
    }

    fn enter_query(&mut self, _query: &mut Query) -> Walk {
        let nested = self.depth > 0;
        if nested {
            self.query_depth += 1;
        }
        self.saved_depths.push((self.depth, nested));
        self.depth = 0;
        Walk::Continue
    }

    fn leave_query(&mut self, _query: &mut Query) {
        let (depth, nested) = self.saved_depths.pop().unwrap_or((0, false));
        if nested {
            self.query_depth = self.query_depth.saturating_sub(1);
        }
        self.depth = depth;
    }

    fn enter_select(&mut self, _select: &mut Select) -> Walk {
        self.frames.push(Vec::new());
        Walk::Continue
    }

    fn leave_select(&mut self, select: &mut Select) {
        let frame = self.frames.pop().unwrap_or_default();
        if !frame.is_empty() {
            select.from.extend(frame);
            regenerate_if_ambiguous(select);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(spec: u64, rv: &str, attr: &str) -> Expr {
        Expr::Name(NameRef::bound(attr, SpecId(spec), rv))
    }

    fn placeholders() -> Vec<NameRef> {
        vec![
            NameRef::oid(SpecId(1), "v", None),
            NameRef::bound("id", SpecId(1), "v"),
            NameRef::bound("total", SpecId(1), "v"),
        ]
    }

    fn replacements() -> Vec<Expr> {
        vec![
            Expr::Name(NameRef::oid(SpecId(7), "e", None)),
            name(7, "e", "id"),
            Expr::binary(BinaryOp::Plus, name(7, "e", "sal"), name(7, "e", "bonus")),
        ]
    }

    #[test]
    fn test_substitute_names_and_parenthesize() {
        let mut ids = IdGenerator::new();
        let mut select = Select {
            list: vec![Column::new(name(1, "v", "total")), Column::new(name(1, "v", "id"))],
            from: vec![EntitySpec::new_class(SpecId(7), "emp", "e")],
            where_clause: vec![Expr::binary(
                BinaryOp::Gt,
                name(1, "v", "total"),
                Expr::int(100),
            )],
            ..Default::default()
        };
        Substitution::new(SpecId(1), placeholders(), replacements(), &mut ids).apply(&mut select);

        assert_eq!(select.list[0].expr.to_string(), "e.sal + e.bonus");
        assert_eq!(select.list[1].expr.to_string(), "e.id");
        assert_eq!(select.where_clause[0].to_string(), "(e.sal + e.bonus) > 100");
    }

    #[test]
    fn test_substitute_oid_placeholder() {
        let mut ids = IdGenerator::new();
        let mut expr = Expr::Name(NameRef::oid(SpecId(1), "v", None));
        Substitution::new(SpecId(1), placeholders(), replacements(), &mut ids).apply(&mut expr);
        assert!(expr.as_name().unwrap().is_oid());
        assert_eq!(expr.as_name().unwrap().spec_id, Some(SpecId(7)));
    }

    #[test]
    fn test_substitute_ignores_other_specs() {
        let mut ids = IdGenerator::new();
        let mut expr = name(2, "w", "id");
        Substitution::new(SpecId(1), placeholders(), replacements(), &mut ids).apply(&mut expr);
        assert_eq!(expr, name(2, "w", "id"));
    }

    #[test]
    fn test_substitute_query_replacement_gets_fresh_ids() {
        let inner = Select {
            list: vec![Column::new(name(9, "d", "name"))],
            from: vec![EntitySpec::new_class(SpecId(9), "dept", "d")],
            ..Default::default()
        };
        let sub = Expr::Subquery(Box::new(Query::from_select(inner)));
        let mut ids = IdGenerator::new();
        for _ in 0..20 {
            ids.next_id();
        }
        let mut list = vec![name(1, "v", "id"), name(1, "v", "id")];
        Substitution::new(
            SpecId(1),
            vec![NameRef::bound("id", SpecId(1), "v")],
            vec![sub],
            &mut ids,
        )
        .apply(list.as_mut_slice());

        let spec_of = |e: &Expr| match e {
            Expr::Subquery(q) => q.as_select().unwrap().from[0].id,
            other => panic!("Expected subquery, got: {:?}", other),
        };
        assert_ne!(spec_of(&list[0]), spec_of(&list[1]));
        assert_ne!(spec_of(&list[0]), SpecId(9));
    }

    #[test]
    fn test_dot_on_null_and_query() {
        let mut ids = IdGenerator::new();
        let right = NameRef::new("name");
        let mut expr = Expr::Dot {
            left: Box::new(name(1, "v", "id")),
            right: right.clone(),
        };
        Substitution::new(
            SpecId(1),
            vec![NameRef::bound("id", SpecId(1), "v")],
            vec![Expr::null()],
            &mut ids,
        )
        .apply(&mut expr);
        assert!(expr.is_null_value());

        let inner = Select {
            list: vec![Column::new(name(9, "d", "mgr"))],
            from: vec![EntitySpec::new_class(SpecId(9), "dept", "d")],
            ..Default::default()
        };
        let mut expr = Expr::Dot {
            left: Box::new(name(1, "v", "id")),
            right,
        };
        Substitution::new(
            SpecId(1),
            vec![NameRef::bound("id", SpecId(1), "v")],
            vec![Expr::Subquery(Box::new(Query::from_select(inner)))],
            &mut ids,
        )
        .apply(&mut expr);
        match &expr {
            Expr::Subquery(q) => {
                assert_eq!(q.as_select().unwrap().list[0].expr.to_string(), "d.mgr.name")
            }
            other => panic!("Expected subquery, got: {:?}", other),
        }
    }

    #[test]
    fn test_method_names_are_retargeted() {
        let mut ids = IdGenerator::new();
        let mut expr = Expr::Method(MethodCall {
            name: NameRef::bound("cnt", SpecId(1), "v").with_meta(NameMeta::Method),
            target: None,
            args: vec![],
            class_method: true,
        });
        Substitution::new(SpecId(1), placeholders(), replacements(), &mut ids)
            .retarget(SpecId(7), "e")
            .apply(&mut expr);
        match &expr {
            Expr::Method(m) => {
                assert_eq!(m.name.spec_id, Some(SpecId(7)));
                assert_eq!(m.name.resolved.as_deref(), Some("e"));
            }
            other => panic!("Expected method, got: {:?}", other),
        }
    }

    #[test]
    fn test_shared_attribute_gets_class_spec() {
        let mut ids = IdGenerator::new();
        for _ in 0..30 {
            ids.next_id();
        }
        let mut select = Select {
            list: vec![Column::new(name(1, "v", "rate")), Column::new(name(1, "v", "rate"))],
            from: vec![EntitySpec::new_class(SpecId(7), "emp", "e")],
            ..Default::default()
        };
        let shared = Expr::Name(NameRef::bound("rate", SpecId(7), "e").with_meta(NameMeta::Shared));
        let mut classes = AHashMap::new();
        classes.insert(SpecId(7), ClassId::new("emp"));
        Substitution::new(
            SpecId(1),
            vec![NameRef::bound("rate", SpecId(1), "v")],
            vec![shared],
            &mut ids,
        )
        .shared_classes(classes)
        .apply(&mut select);

        // 같은 클래스는 SELECT 안에서 한 번만 추가
        assert_eq!(select.from.len(), 2);
        let added = &select.from[1];
        assert_eq!(added.first_entity().unwrap().as_str(), "emp");
        assert_eq!(select.list[0].expr.as_name().unwrap().spec_id, Some(added.id));
        assert_eq!(select.list[1].expr.to_string(), format!("{}.rate", added.range_var));
    }
}
