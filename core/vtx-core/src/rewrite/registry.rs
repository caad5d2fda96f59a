//! 스펙 식별자 레지스트리
//!
//! 트리를 복사하면 스펙 식별자도 복사되므로, 치환된 부분 트리는 항상
//! 새 식별자를 받아야 한다. 이 모듈은 식별자 재발급, 이름 재바인딩,
//! 범위 변수 충돌 해소, 참조 속성 계산, 경로 스펙 정리를 담당한다.

use crate::sql::ast::visit::{Visitor, VisitorMut, Walk, Walkable, for_each_name};
use crate::sql::ast::*;
use ahash::{AHashMap, AHashSet};

/// 이전 식별자 → 새 식별자
pub type SpecMap = AHashMap<SpecId, SpecId>;

// ─── Renumbering ─────────────────────────────────────────

/// SELECT 스코프 단위 식별자 재발급
///
/// 같은 식별자가 집합 연산의 두 분기에 동시에 나타나도 각 분기의 이름은
/// 자기 스코프(안쪽부터)의 스펙으로만 해석된다.
struct Renumber<'g> {
    ids: &'g mut IdGenerator,
    scopes: Vec<SpecMap>,
}

impl Renumber<'_> {
    fn renumber(&mut self, spec: &mut EntitySpec) {
        let new = self.ids.next_id();
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(spec.id, new);
        }
        spec.id = new;
        for path in &mut spec.path_entities {
            self.renumber(path);
        }
    }

    fn lookup(&self, id: SpecId) -> Option<SpecId> {
        self.scopes.iter().rev().find_map(|s| s.get(&id).copied())
    }
}

impl VisitorMut for Renumber<'_> {
    fn enter_select(&mut self, select: &mut Select) -> Walk {
        self.scopes.push(SpecMap::new());
        for spec in &mut select.from {
            self.renumber(spec);
        }
        Walk::Continue
    }

    fn leave_select(&mut self, _select: &mut Select) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    fn visit_name(&mut self, name: &mut NameRef) -> Walk {
        if let Some(new) = name.spec_id.and_then(|id| self.lookup(id)) {
            name.spec_id = Some(new);
        }
        Walk::Continue
    }
}

/// 질의/표현식 트리의 모든 스펙에 새 식별자를 발급하고 이름을 따라 갱신
///
/// 트리 밖의 스펙을 가리키는 (상관) 이름은 그대로 둔다.
pub fn reset_ids<T: Walkable + ?Sized>(tree: &mut T, ids: &mut IdGenerator) {
    let mut renumber = Renumber {
        ids,
        scopes: vec![SpecMap::new()],
    };
    let _ = tree.walk_mut(&mut renumber);
}

/// 문장 단위 재발급: DML 대상 스펙과 검사 옵션 식별자까지 갱신
pub fn reset_statement_ids(stmt: &mut Statement, ids: &mut IdGenerator) {
    let mut renumber = Renumber {
        ids,
        scopes: vec![SpecMap::new()],
    };
    match stmt {
        Statement::Query(_) => {}
        Statement::Update(u) => u.specs.iter_mut().for_each(|s| renumber.renumber(s)),
        Statement::Insert(i) => renumber.renumber(&mut i.spec),
        Statement::Delete(d) => d.specs.iter_mut().for_each(|s| renumber.renumber(s)),
        Statement::Merge(m) => {
            renumber.renumber(&mut m.target);
            renumber.renumber(&mut m.source);
        }
    }
    let _ = stmt.walk_mut(&mut renumber);

    let base = renumber.scopes.swap_remove(0);
    let checks = match stmt {
        Statement::Update(u) => &mut u.check_where,
        Statement::Merge(m) => &mut m.check_where,
        _ => return,
    };
    for check in checks {
        if let Some(new) = base.get(&check.spec_id) {
            check.spec_id = *new;
        }
    }
}

// ─── Rebinding ───────────────────────────────────────────

struct Rebind<'a> {
    from: SpecId,
    to: SpecId,
    resolved: Option<&'a str>,
}

impl VisitorMut for Rebind<'_> {
    fn visit_name(&mut self, name: &mut NameRef) -> Walk {
        if name.spec_id == Some(self.from) {
            name.spec_id = Some(self.to);
            if let Some(rv) = self.resolved {
                name.resolved = Some(rv.to_string());
            }
        }
        Walk::Continue
    }
}

/// `from`에 바인딩된 이름을 `to`로 옮기고, 주어지면 한정자도 변경
pub fn rebind<T: Walkable + ?Sized>(tree: &mut T, from: SpecId, to: SpecId, resolved: Option<&str>) {
    let _ = tree.walk_mut(&mut Rebind { from, to, resolved });
}

/// 스펙에 바인딩된 이름의 출력 한정자를 범위 변수로 변경
pub fn rename_resolved<T: Walkable + ?Sized>(tree: &mut T, id: SpecId, range_var: &str) {
    rebind(tree, id, id, Some(range_var));
}

/// 트리 안의 스펙 하나에 새 식별자를 주고 그 스펙의 이름을 모두 갱신
pub fn assign_fresh_identity<T: Walkable + ?Sized>(
    tree: &mut T,
    old: SpecId,
    ids: &mut IdGenerator,
) -> Option<SpecId> {
    struct Relabel {
        old: SpecId,
        new: SpecId,
        range_var: Option<String>,
    }
    impl VisitorMut for Relabel {
        fn enter_spec(&mut self, spec: &mut EntitySpec) -> Walk {
            if spec.id == self.old && self.range_var.is_none() {
                spec.id = self.new;
                self.range_var = Some(spec.range_var.clone());
                return Walk::Stop;
            }
            Walk::Continue
        }
    }

    let mut relabel = Relabel {
        old,
        new: ids.next_id(),
        range_var: None,
    };
    let _ = tree.walk_mut(&mut relabel);
    let range_var = relabel.range_var?;
    rebind(tree, old, relabel.new, Some(&range_var));
    Some(relabel.new)
}

// ─── Range variables ─────────────────────────────────────

fn collect_range_vars(specs: &[EntitySpec], out: &mut Vec<String>) {
    for spec in specs {
        out.push(spec.range_var.to_lowercase());
        collect_range_vars(&spec.path_entities, out);
    }
}

fn dedupe_range_vars(
    specs: &mut [EntitySpec],
    taken: &[String],
    seen: &mut Vec<String>,
    renamed: &mut Vec<(SpecId, String)>,
) {
    for spec in specs {
        let lower = spec.range_var.to_lowercase();
        if seen.contains(&lower) {
            let base = spec.range_var.clone();
            let candidate = (1..).map(|i| format!("{base}_{i}")).find(|c| {
                let c = c.to_lowercase();
                !taken.contains(&c) && !seen.contains(&c)
            });
            let fresh = candidate.unwrap_or(base);
            tracing::debug!(spec = %spec.id, from = %spec.range_var, to = %fresh, "range variable regenerated");
            spec.range_var = fresh.clone();
            renamed.push((spec.id, fresh));
        }
        seen.push(spec.range_var.to_lowercase());
        dedupe_range_vars(&mut spec.path_entities, taken, seen, renamed);
    }
}

/// FROM 목록(경로 스펙 포함)에서 겹치는 범위 변수를 `rv_1`, `rv_2` … 로 바꾼다
///
/// 앞선 스펙이 이름을 유지한다. 바뀐 (식별자, 새 이름) 목록을 반환.
pub fn unique_range_vars(specs: &mut [EntitySpec]) -> Vec<(SpecId, String)> {
    let mut taken = Vec::new();
    collect_range_vars(specs, &mut taken);
    let mut renamed = Vec::new();
    dedupe_range_vars(specs, &taken, &mut Vec::new(), &mut renamed);
    renamed
}

/// SELECT의 FROM 목록 충돌을 해소하고 이름 한정자를 따라 변경
pub fn regenerate_if_ambiguous(select: &mut Select) {
    let renamed = unique_range_vars(&mut select.from);
    for (id, rv) in renamed {
        rename_resolved(select, id, &rv);
    }
}

/// DML 문장의 대상 스펙 목록에 대해 [`regenerate_if_ambiguous`]
pub fn regenerate_statement_range_vars(stmt: &mut Statement) {
    let renamed = match stmt {
        Statement::Query(q) => {
            if let Some(select) = q.as_select_mut() {
                regenerate_if_ambiguous(select);
            }
            return;
        }
        Statement::Update(u) => unique_range_vars(&mut u.specs),
        Statement::Delete(d) => unique_range_vars(&mut d.specs),
        Statement::Insert(_) | Statement::Merge(_) => return,
    };
    for (id, rv) in renamed {
        rename_resolved(stmt, id, &rv);
    }
}

// ─── References ──────────────────────────────────────────

/// 스펙에 바인딩되어 문장에서 실제로 참조되는 속성 (이름 기준 중복 제거)
///
/// 메서드/힌트/인덱스 이름과 스펙 자신의 컬럼 목록은 제외한다.
pub fn compute_referenced_attributes<T: Walkable + ?Sized>(tree: &T, id: SpecId) -> Vec<NameRef> {
    struct Collect {
        id: SpecId,
        found: Vec<NameRef>,
    }
    impl Visitor for Collect {
        fn visit_name(&mut self, name: &NameRef) -> Walk {
            let counted = !matches!(
                name.meta,
                NameMeta::Method | NameMeta::HintName | NameMeta::IndexName | NameMeta::Parameter
            );
            if counted
                && name.spec_id == Some(self.id)
                && !self.found.iter().any(|f| f.same_name(name))
            {
                self.found.push(name.clone());
            }
            Walk::Continue
        }

        fn visit_spec_column(&mut self, _name: &NameRef) -> Walk {
            Walk::Continue
        }
    }

    let mut collect = Collect {
        id,
        found: Vec::new(),
    };
    let _ = tree.walk(&mut collect);
    collect.found
}

/// 경로 조인 항을 제외하고 이름이 가리키는 스펙 식별자
fn live_spec_ids<T: Walkable + ?Sized>(tree: &T) -> AHashSet<SpecId> {
    #[derive(Default)]
    struct Count {
        total: AHashMap<SpecId, usize>,
        in_path_terms: AHashMap<SpecId, usize>,
    }
    impl Visitor for Count {
        fn visit_name(&mut self, name: &NameRef) -> Walk {
            if let Some(id) = name.spec_id {
                *self.total.entry(id).or_default() += 1;
            }
            Walk::Continue
        }

        fn visit_spec_column(&mut self, _name: &NameRef) -> Walk {
            Walk::Continue
        }

        fn enter_spec(&mut self, spec: &EntitySpec) -> Walk {
            for path in &spec.path_entities {
                if let Some(term) = &path.path_conjunct {
                    for_each_name(term, |n| {
                        if let Some(id) = n.spec_id {
                            *self.in_path_terms.entry(id).or_default() += 1;
                        }
                    });
                }
            }
            Walk::Continue
        }
    }

    let mut count = Count::default();
    let _ = tree.walk(&mut count);
    count
        .total
        .into_iter()
        .filter(|(id, n)| *n > count.in_path_terms.get(id).copied().unwrap_or(0))
        .map(|(id, _)| id)
        .collect()
}

fn prune_paths(spec: &mut EntitySpec, live: &AHashSet<SpecId>) {
    spec.path_entities.retain_mut(|path| {
        prune_paths(path, live);
        let keep = live.contains(&path.id) || !path.path_entities.is_empty();
        if !keep {
            tracing::debug!(path = %path.id, range_var = %path.range_var, "unreferenced path spec pruned");
        }
        keep
    });
}

/// `root` 아래에서 더 이상 참조되지 않는 경로 스펙 제거 (살아남은 하위까지 재귀)
pub fn prune_unreferenced_paths<T: Walkable + ?Sized>(tree: &mut T, root: SpecId) {
    struct Prune {
        root: SpecId,
        live: AHashSet<SpecId>,
    }
    impl VisitorMut for Prune {
        fn enter_spec(&mut self, spec: &mut EntitySpec) -> Walk {
            if spec.id == self.root {
                prune_paths(spec, &self.live);
                return Walk::Stop;
            }
            Walk::Continue
        }
    }

    let live = live_spec_ids(tree);
    let _ = tree.walk_mut(&mut Prune { root, live });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::ast::visit::for_each_statement_name_mut;

    fn name(spec: u64, rv: &str, attr: &str) -> Expr {
        Expr::Name(NameRef::bound(attr, SpecId(spec), rv))
    }

    fn select_over(spec: u64, rv: &str) -> Select {
        Select {
            list: vec![Column::new(name(spec, rv, "id"))],
            from: vec![EntitySpec::new_class(SpecId(spec), "emp", rv)],
            where_clause: vec![Expr::equals(name(spec, rv, "dept"), Expr::int(1))],
            ..Default::default()
        }
    }

    fn ids_from(start: u64) -> IdGenerator {
        let mut ids = IdGenerator::new();
        for _ in 1..start {
            ids.next_id();
        }
        ids
    }

    // ── Renumbering ──

    #[test]
    fn test_reset_ids_follows_names() {
        let mut query = Query::from_select(select_over(1, "e"));
        let mut ids = ids_from(10);
        reset_ids(&mut query, &mut ids);

        let select = query.as_select().unwrap();
        let id = select.from[0].id;
        assert_eq!(id, SpecId(10));
        assert_eq!(select.list[0].expr.as_name().unwrap().spec_id, Some(id));
    }

    #[test]
    fn test_reset_ids_separates_union_arms() {
        // 두 분기가 같은 식별자를 가진 복사본
        let arm = Query::from_select(select_over(1, "e"));
        let mut query = Query::set_op(SetOperator::Union, arm.clone(), arm, false);
        let mut ids = ids_from(5);
        reset_ids(&mut query, &mut ids);

        let QueryBody::SetOp { left, right, .. } = &query.body else {
            panic!("Expected set operation");
        };
        let (l, r) = (left.as_select().unwrap(), right.as_select().unwrap());
        assert_ne!(l.from[0].id, r.from[0].id);
        assert_eq!(l.list[0].expr.as_name().unwrap().spec_id, Some(l.from[0].id));
        assert_eq!(r.list[0].expr.as_name().unwrap().spec_id, Some(r.from[0].id));
    }

    #[test]
    fn test_reset_ids_keeps_outer_correlation() {
        let mut inner = select_over(2, "d");
        inner.where_clause.push(Expr::equals(name(2, "d", "id"), name(1, "e", "dept")));
        let mut sub = Query::from_select(inner);
        sub.correlation_level = 1;

        let mut outer = select_over(1, "e");
        outer.where_clause.push(Expr::Exists(Box::new(sub)));
        let mut query = Query::from_select(outer);
        let mut ids = ids_from(20);
        reset_ids(&mut query, &mut ids);

        let outer = query.as_select().unwrap();
        let outer_id = outer.from[0].id;
        let Expr::Exists(sub) = &outer.where_clause[1] else {
            panic!("Expected EXISTS");
        };
        let Expr::Binary { right, .. } = &sub.as_select().unwrap().where_clause[1] else {
            panic!("Expected comparison");
        };
        assert_eq!(right.as_name().unwrap().spec_id, Some(outer_id));
    }

    #[test]
    fn test_reset_statement_ids_remaps_checks() {
        let mut stmt = Statement::Update(Update {
            specs: vec![EntitySpec::new_class(SpecId(3), "emp", "e")],
            assignments: vec![Assignment {
                target: NameRef::bound("name", SpecId(3), "e"),
                value: Expr::text("x"),
            }],
            where_clause: vec![],
            check_where: vec![CheckOption {
                spec_id: SpecId(3),
                predicate: vec![Expr::equals(name(3, "e", "dept"), Expr::int(1))],
            }],
            hints: Hints::default(),
            using_index: vec![],
        });
        let mut ids = ids_from(40);
        reset_statement_ids(&mut stmt, &mut ids);

        let Statement::Update(u) = &stmt else {
            panic!("Expected Update");
        };
        assert_eq!(u.specs[0].id, SpecId(40));
        assert_eq!(u.check_where[0].spec_id, SpecId(40));
        assert_eq!(u.assignments[0].target.spec_id, Some(SpecId(40)));
        let mut all_bound = true;
        for_each_statement_name_mut(&mut stmt, |n| all_bound &= n.spec_id == Some(SpecId(40)));
        assert!(all_bound);
    }

    #[test]
    fn test_assign_fresh_identity() {
        let mut select = select_over(1, "e");
        let mut ids = ids_from(7);
        let new = assign_fresh_identity(&mut select, SpecId(1), &mut ids).unwrap();
        assert_eq!(select.from[0].id, new);
        assert_eq!(select.where_clause[0].to_string(), "e.dept = 1");
        assert!(assign_fresh_identity(&mut select, SpecId(99), &mut ids).is_none());
    }

    // ── Range variables ──

    #[test]
    fn test_regenerate_if_ambiguous() {
        let mut select = select_over(1, "e");
        select.from.push(EntitySpec::new_class(SpecId(2), "dept", "e"));
        select.from.push(EntitySpec::new_class(SpecId(3), "mgr", "e_1"));
        select.list.push(Column::new(name(2, "e", "name")));
        regenerate_if_ambiguous(&mut select);

        assert_eq!(select.from[0].range_var, "e");
        assert_eq!(select.from[1].range_var, "e_2");
        assert_eq!(select.from[2].range_var, "e_1");
        assert_eq!(select.list[1].expr.to_string(), "e_2.name");
    }

    // ── References ──

    #[test]
    fn test_compute_referenced_attributes_dedupes() {
        let mut select = select_over(1, "e");
        select.list.push(Column::new(name(1, "e", "ID")));
        select.hints.flags = HintFlags::ORDERED;
        select
            .hints
            .ordered
            .push(NameRef::bound("", SpecId(1), "e").with_meta(NameMeta::HintName));
        let attrs = compute_referenced_attributes(&select, SpecId(1));
        let names: Vec<_> = attrs.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["id", "dept"]);

        // 재계산해도 같은 결과
        assert_eq!(compute_referenced_attributes(&select, SpecId(1)), attrs);
    }

    #[test]
    fn test_prune_unreferenced_paths() {
        let mut root = EntitySpec::new_class(SpecId(1), "emp", "e");
        let mut used = EntitySpec::new_class(SpecId(2), "dept", "d");
        used.path_conjunct = Some(Expr::equals(
            name(1, "e", "dept_ref"),
            Expr::Name(NameRef::oid(SpecId(2), "d", None)),
        ));
        let mut unused = EntitySpec::new_class(SpecId(3), "mgr", "m");
        unused.path_conjunct = Some(Expr::equals(
            name(1, "e", "mgr_ref"),
            Expr::Name(NameRef::oid(SpecId(3), "m", None)),
        ));
        root.path_entities = vec![used, unused];

        let mut select = Select {
            list: vec![Column::new(name(2, "d", "name"))],
            from: vec![root],
            ..Default::default()
        };
        prune_unreferenced_paths(&mut select, SpecId(1));
        let paths: Vec<_> = select.from[0].path_entities.iter().map(|p| p.id).collect();
        assert_eq!(paths, vec![SpecId(2)]);
    }
}
