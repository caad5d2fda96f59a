//! 문장 번역 드라이버
//!
//! 하위 질의를 먼저 번역(후위)한 뒤 현재 단계의 가상 스펙을 확장한다.
//! 스펙 하나는 뷰 분기마다 인라인 치환되거나 파생 테이블로 감싸지고,
//! 분기 결과는 UNION ALL로 합쳐진다.

use super::PassContext;
use super::context::{
    TranslatedStatement, ViewTranslator, hints_mut, into_query, spec_at, spec_at_mut, splice_spec,
    where_mut,
};
use super::correlation::{set_op_bump_correlation, union_bump_correlation};
use super::decision::needs_derived;
use super::invert::{instantiate, invert, value_placeholder};
use super::lambda::Substitution;
use super::registry::{
    compute_referenced_attributes, regenerate_statement_range_vars, rename_resolved, reset_ids,
    reset_statement_ids,
};
use super::updatable::Updatability;
use super::view_cache::ViewDefinition;
use crate::catalog::Privilege;
use crate::config::RewriteFeature;
use crate::error::{VtxError, VtxResult};
use crate::sql::ast::visit::{Visitor, VisitorMut, Walk, Walkable};
use crate::sql::ast::*;
use crate::types::{ClassId, Value};
use ahash::AHashMap;

pub(crate) fn empty_query() -> Query {
    Query::from_select(Select::default())
}

/// 트리의 하위 질의마다 `f` 적용 (더 깊은 질의는 `f`가 처리)
pub(crate) fn visit_child_queries<T: Walkable + ?Sized>(
    tree: &mut T,
    skip_root: bool,
    f: &mut dyn FnMut(&mut Query) -> VtxResult<()>,
) -> VtxResult<()> {
    struct Children<'f> {
        f: &'f mut dyn FnMut(&mut Query) -> VtxResult<()>,
        skip_root: bool,
        error: Option<VtxError>,
    }
    impl VisitorMut for Children<'_> {
        fn enter_query(&mut self, query: &mut Query) -> Walk {
            if self.skip_root {
                self.skip_root = false;
                return Walk::Continue;
            }
            match (self.f)(query) {
                Ok(()) => Walk::Skip,
                Err(e) => {
                    self.error = Some(e);
                    Walk::Stop
                }
            }
        }
    }

    let mut children = Children {
        f,
        skip_root,
        error: None,
    };
    let _ = tree.walk_mut(&mut children);
    match children.error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

/// 갱신 불가 뷰 표식이 남아 있으면 그 뷰 이름
fn find_marker(stmt: &Statement, markers: &ahash::AHashSet<String>) -> Option<String> {
    struct Find<'m> {
        markers: &'m ahash::AHashSet<String>,
        found: Option<String>,
    }
    impl Visitor for Find<'_> {
        fn enter_expr(&mut self, expr: &Expr) -> Walk {
            if let Expr::Sequence(items) = expr {
                if let [Expr::Value(Value::Text(name))] = items.as_slice() {
                    if self.markers.contains(name) {
                        self.found = Some(name.clone());
                        return Walk::Stop;
                    }
                }
            }
            Walk::Continue
        }
    }
    if markers.is_empty() {
        return None;
    }
    let mut find = Find {
        markers,
        found: None,
    };
    let _ = stmt.walk(&mut find);
    find.found
}

fn visible_exprs(select: &Select) -> Vec<Expr> {
    select
        .list
        .iter()
        .filter(|c| !c.hidden)
        .map(|c| c.expr.clone())
        .collect()
}

fn arity_error(def: &ViewDefinition, columns: usize) -> VtxError {
    let attrs = def.attributes.len();
    let side = if columns > attrs { "more" } else { "fewer" };
    VtxError::ArityMismatch {
        view: def.class.to_string(),
        detail: format!("query spec has {side} columns than attributes ({columns} vs {attrs})"),
    }
}

/// 뷰 컬럼 대입을 실제 컬럼 대입으로
fn invert_column(
    def: &ViewDefinition,
    columns: &[Expr],
    target: &NameRef,
    value: Expr,
) -> VtxResult<(NameRef, Expr)> {
    let pos = def
        .attribute_position(&target.name)
        .ok_or_else(|| VtxError::AttributeNotFound {
            class: def.class.to_string(),
            attribute: target.name.clone(),
        })?;
    let expr = columns
        .get(pos)
        .ok_or_else(|| VtxError::structural(format!("no column for attribute '{}'", target.name)))?;
    invert(expr, value).ok_or_else(|| VtxError::NotInvertible {
        view: def.class.to_string(),
        attribute: target.name.clone(),
    })
}

fn invert_assignments(
    items: &mut [Assignment],
    spec_id: SpecId,
    def: &ViewDefinition,
    columns: &[Expr],
) -> VtxResult<()> {
    for item in items.iter_mut().filter(|a| a.target.spec_id == Some(spec_id)) {
        let (real, value) = invert_column(def, columns, &item.target, item.value.clone())?;
        item.target = real;
        item.value = value;
    }
    Ok(())
}

/// 삽입 컬럼 역변환: 실제 컬럼 목록과 값 템플릿
fn invert_insert_columns(
    names: &[NameRef],
    def: &ViewDefinition,
    columns: &[Expr],
) -> VtxResult<(Vec<NameRef>, Vec<Expr>)> {
    let mut reals = Vec::with_capacity(names.len());
    let mut templates = Vec::with_capacity(names.len());
    for name in names {
        let (real, template) = invert_column(def, columns, name, value_placeholder())?;
        reals.push(real);
        templates.push(template);
    }
    Ok((reals, templates))
}

/// 쓰기 대상 중 정의식을 역변환할 수 없는 뷰 컬럼
fn non_invertible_target(stmt: &Statement, spec_id: SpecId, def: &ViewDefinition) -> Option<VtxError> {
    let targets: Vec<&NameRef> = match stmt {
        Statement::Update(u) => u
            .assignments
            .iter()
            .map(|a| &a.target)
            .filter(|t| t.spec_id == Some(spec_id))
            .collect(),
        Statement::Insert(i) if i.spec.id == spec_id => i.columns.iter().collect(),
        _ => return None,
    };
    let columns = visible_exprs(def.for_select.first()?.leading_select());
    targets.into_iter().find_map(|target| {
        let expr = columns.get(def.attribute_position(&target.name)?)?;
        match invert(expr, value_placeholder()) {
            Some(_) => None,
            None => Some(VtxError::NotInvertible {
                view: def.class.to_string(),
                attribute: target.name.clone(),
            }),
        }
    })
}

fn fill_row(row: &mut [Expr], templates: &[Expr]) {
    for (value, template) in row.iter_mut().zip(templates) {
        let filled = instantiate(template, value);
        *value = filled;
    }
}

/// 쓰기 문장의 뷰 컬럼 대상을 실제 컬럼으로 역변환
fn invert_writes(stmt: &mut Statement, spec_id: SpecId, def: &ViewDefinition, columns: &[Expr]) -> VtxResult<()> {
    match stmt {
        Statement::Update(u) => invert_assignments(&mut u.assignments, spec_id, def, columns),
        Statement::Insert(ins) => {
            if ins.spec.id != spec_id {
                return Ok(());
            }
            let (reals, templates) = invert_insert_columns(&ins.columns, def, columns)?;
            ins.columns = reals;
            match &mut ins.source {
                InsertSource::Values(rows) => {
                    for row in rows {
                        fill_row(row, &templates);
                    }
                }
                InsertSource::Query(query) => query.for_each_select_mut(&mut |select| {
                    for (column, template) in select.list.iter_mut().filter(|c| !c.hidden).zip(&templates) {
                        column.expr = instantiate(template, &column.expr);
                    }
                }),
                InsertSource::DefaultValues => {}
            }
            invert_assignments(&mut ins.on_duplicate, spec_id, def, columns)
        }
        Statement::Merge(m) => {
            if m.target.id != spec_id {
                return Ok(());
            }
            if let Some(update) = &mut m.update {
                invert_assignments(&mut update.assignments, spec_id, def, columns)?;
            }
            if let Some(insert) = &mut m.insert {
                let (reals, templates) = invert_insert_columns(&insert.columns, def, columns)?;
                insert.columns = reals;
                fill_row(&mut insert.values, &templates);
            }
            Ok(())
        }
        Statement::Query(_) | Statement::Delete(_) => Ok(()),
    }
}

/// 분기 ORDER BY를 외부 SELECT 리스트 위치로 옮긴다
fn carry_order_by(outer: &mut Select, branch_list: &[Column], order_by: &[OrderBy]) -> Vec<OrderBy> {
    let mut carried = Vec::with_capacity(order_by.len());
    for ob in order_by {
        let expr = match &ob.key {
            SortKey::Position(p) => match branch_list.get(p.saturating_sub(1)) {
                Some(c) => c.expr.clone(),
                None => continue,
            },
            SortKey::Expr(e) => e.clone(),
        };
        let pos = match outer.list.iter().position(|c| c.expr == expr) {
            Some(p) => p,
            None => {
                outer.list.push(Column {
                    expr,
                    alias: None,
                    hidden: true,
                });
                outer.list.len() - 1
            }
        };
        carried.push(OrderBy {
            key: SortKey::Position(pos + 1),
            asc: ob.asc,
        });
    }
    carried
}

impl ViewTranslator<'_> {
    /// 문장 번역: 가상 클래스가 없는 동등한 문장(들)
    pub fn translate(&mut self, stmt: Statement) -> VtxResult<TranslatedStatement> {
        let kind = stmt.kind();
        let mut results = match stmt {
            Statement::Query(query) => vec![Statement::Query(self.translate_query(query)?)],
            Statement::Update(update) => self.translate_update(update)?,
            Statement::Insert(insert) => self.translate_insert(insert)?,
            Statement::Delete(delete) => self.translate_delete(delete)?,
            Statement::Merge(merge) => self.translate_merge(merge)?,
        };

        for stmt in &results {
            if let Some(view) = find_marker(stmt, &self.markers) {
                tracing::warn!(view = %view, "identity of a non-updatable view selected");
                return Err(VtxError::NotUpdatable { class: view });
            }
        }
        for stmt in &mut results {
            reset_statement_ids(stmt, &mut self.ids);
        }
        if self.feature(RewriteFeature::TraceRewrites) {
            for stmt in &results {
                tracing::debug!(kind, sql = %stmt, "statement translated");
            }
        }
        Ok(TranslatedStatement::new(results))
    }

    /// 질의 번역: 전위 결정 패스 후 후위 번역
    pub(crate) fn translate_query(&mut self, mut query: Query) -> VtxResult<Query> {
        self.check_rewrite_select(&mut query)?;
        self.translate_query_tree(query)
    }

    pub(crate) fn translate_query_tree(&mut self, mut query: Query) -> VtxResult<Query> {
        visit_child_queries(&mut query, true, &mut |child| {
            let taken = std::mem::replace(child, empty_query());
            *child = self.translate_query_tree(taken)?;
            Ok(())
        })?;
        let query = self.translate_select_level(query)?;
        self.finish_level(query)
    }

    /// 쓰기 문장 안의 질의들을 읽기로 번역
    pub(crate) fn translate_nested_reads(&mut self, stmt: &mut Statement) -> VtxResult<()> {
        visit_child_queries(stmt, false, &mut |child| {
            let taken = std::mem::replace(child, empty_query());
            *child = self.translate_query(taken)?;
            Ok(())
        })
    }

    /// 현재 단계 SELECT의 가상 스펙 확장
    fn translate_select_level(&mut self, mut query: Query) -> VtxResult<Query> {
        if !query.is_select() {
            return Ok(query);
        }
        let order_by = std::mem::take(&mut query.order_by);
        let orderby_for = query.orderby_for.take();
        let limit = query.limit.take();
        let distinct = query.distinct;
        let carry_order = order_by.is_empty();

        let parts = self.expand_statement(Statement::Query(query), Privilege::SELECT, carry_order)?;
        let mut result = self.union_all(parts)?;

        if result.order_by.is_empty() {
            result.order_by = order_by;
        }
        if result.orderby_for.is_none() {
            result.orderby_for = orderby_for;
        }
        if result.limit.is_none() {
            result.limit = limit;
        }
        if distinct {
            result.distinct = true;
        }
        Ok(result)
    }

    /// 경로 번역 + 정규화 패스
    pub(crate) fn finish_level(&mut self, query: Query) -> VtxResult<Query> {
        if !query.is_select() {
            return Ok(query);
        }
        let mut stmt = Statement::Query(query);
        self.translate_paths(&mut stmt)?;
        let query = into_query(stmt)?;
        let mut cx = PassContext {
            schema: self.schema,
            ids: &mut self.ids,
        };
        self.normalizer.normalize(query, &mut cx)
    }

    fn union_all(&mut self, parts: Vec<Statement>) -> VtxResult<Query> {
        let mut queries = parts.into_iter();
        let first = match queries.next() {
            Some(stmt) => into_query(stmt)?,
            None => return Err(VtxError::structural("query translates to nothing")),
        };
        queries.try_fold(first, |acc, stmt| Ok(union_bump_correlation(acc, into_query(stmt)?)))
    }

    /// 가상 후보가 있는 스펙이 없어질 때까지 확장
    pub(crate) fn expand_statement(
        &mut self,
        stmt: Statement,
        what_for: Privilege,
        carry_order: bool,
    ) -> VtxResult<Vec<Statement>> {
        let next = stmt.specs().iter().position(|s| self.has_virtual(s));
        let Some(idx) = next else {
            return Ok(vec![stmt]);
        };
        let parts = self.translate_spec(stmt, idx, what_for, carry_order)?;
        let mut out = Vec::with_capacity(parts.len());
        for part in parts {
            out.extend(self.expand_statement(part, what_for, carry_order)?);
        }
        Ok(out)
    }

    /// 스펙 하나를 후보 클래스별로 번역
    fn translate_spec(
        &mut self,
        stmt: Statement,
        idx: usize,
        what_for: Privilege,
        carry_order: bool,
    ) -> VtxResult<Vec<Statement>> {
        let spec = spec_at(&stmt, idx)
            .cloned()
            .ok_or_else(|| VtxError::structural(format!("no spec at position {idx}")))?;
        let (virtuals, reals): (Vec<ClassId>, Vec<ClassId>) =
            spec.entities.iter().cloned().partition(|c| self.is_virtual(c));

        let mut out = Vec::new();
        if !reals.is_empty() {
            for class in &reals {
                self.check_privilege(class, what_for)?;
            }
            let mut copy = stmt.clone();
            if let Some(target) = spec_at_mut(&mut copy, idx) {
                target.entities = reals.into_iter().collect();
            }
            reset_statement_ids(&mut copy, &mut self.ids);
            out.push(copy);
        }

        for class in virtuals {
            // 갱신 가능성 먼저, 권한은 그 다음
            let def = self.view_definition(&class)?;
            let branches = self.branches_for(&stmt, spec.id, &def)?.to_vec();
            self.authorize_view(&def, what_for)?;
            tracing::trace!(view = %class, spec = %spec.id, branches = branches.len(), "substituting view");
            for branch in &branches {
                out.extend(self.substitute_query(&stmt, idx, &def, branch, carry_order)?);
            }
        }

        if out.is_empty() && matches!(stmt, Statement::Query(_)) {
            return Err(VtxError::structural(format!(
                "spec '{}' translates to nothing",
                spec.range_var
            )));
        }
        Ok(out)
    }

    /// 문장 종류에 맞는 뷰 형태
    fn branches_for<'d>(&self, stmt: &Statement, spec_id: SpecId, def: &'d ViewDefinition) -> VtxResult<&'d [Query]> {
        let not_updatable = || {
            non_invertible_target(stmt, spec_id, def).unwrap_or_else(|| VtxError::NotUpdatable {
                class: def.class.to_string(),
            })
        };
        match stmt {
            Statement::Query(_) => Ok(&def.for_select),
            Statement::Update(_) => match def.updatability {
                Updatability::Updatable => Ok(&def.for_update),
                Updatability::PartiallyUpdatable => Ok(&def.for_partial_update),
                Updatability::NotUpdatable => Err(not_updatable()),
            },
            Statement::Insert(_) | Statement::Delete(_) | Statement::Merge(_) => {
                if def.updatability.is_updatable() {
                    Ok(&def.for_update)
                } else {
                    Err(not_updatable())
                }
            }
        }
    }

    /// 분기 하나를 문장 복사본에 적용
    fn substitute_query(
        &mut self,
        stmt: &Statement,
        idx: usize,
        def: &ViewDefinition,
        branch: &Query,
        carry_order: bool,
    ) -> VtxResult<Vec<Statement>> {
        if let QueryBody::SetOp { op, left, right } = &branch.body {
            if matches!(stmt, Statement::Query(q) if q.has_aggregate()) {
                return Err(VtxError::structural(format!(
                    "aggregate over set-operation view '{}'",
                    def.class
                )));
            }
            let l = self.substitute_query(stmt, idx, def, left, carry_order)?;
            let r = self.substitute_query(stmt, idx, def, right, carry_order)?;
            if !matches!(stmt, Statement::Query(_)) {
                let mut both = l;
                both.extend(r);
                return Ok(both);
            }
            let l = if l.is_empty() { None } else { Some(self.union_all(l)?) };
            let r = if r.is_empty() { None } else { Some(self.union_all(r)?) };
            let combined = match (l, r, op) {
                (Some(l), Some(r), _) => Some(set_op_bump_correlation(*op, l, r, branch.distinct)),
                (Some(l), None, SetOperator::Union | SetOperator::Difference) => Some(l),
                (None, Some(r), SetOperator::Union) => Some(r),
                _ => None,
            };
            return Ok(combined.map(Statement::Query).into_iter().collect());
        }

        let mut copy = stmt.clone();
        reset_statement_ids(&mut copy, &mut self.ids);
        let derived = match &copy {
            Statement::Query(q) => needs_derived(q, idx, branch, def),
            _ => false,
        };
        if derived {
            self.wrap_spec_as_derived(&mut copy, idx, Some((def, branch)))?;
            return Ok(vec![copy]);
        }
        if self.class_lambda(&mut copy, idx, def, branch, carry_order)? {
            Ok(vec![copy])
        } else {
            Ok(Vec::new())
        }
    }

    /// 분기 인라인 치환: FROM 없는 분기로 쓰기 대상이 사라지면 `false`
    pub(crate) fn class_lambda(
        &mut self,
        stmt: &mut Statement,
        idx: usize,
        def: &ViewDefinition,
        branch: &Query,
        carry_order: bool,
    ) -> VtxResult<bool> {
        let spec = spec_at(stmt, idx)
            .cloned()
            .ok_or_else(|| VtxError::structural(format!("no spec at position {idx}")))?;

        let mut branch = branch.clone();
        reset_ids(&mut branch, &mut self.ids);
        let first_id = branch.leading_select().from.first().map(|s| s.id);
        if let Some(first) = first_id {
            if let Some(select) = branch.as_select_mut() {
                select.from[0].range_var = spec.range_var.clone();
            }
            rename_resolved(&mut branch, first, &spec.range_var);
        }

        let QueryBody::Select(body) = branch.body else {
            return Err(VtxError::structural("set-operation branch reached inline substitution"));
        };
        let mut body = *body;
        let replacements = visible_exprs(&body);
        if replacements.len() != def.attributes.len() {
            return Err(arity_error(def, replacements.len()));
        }

        invert_writes(stmt, spec.id, def, &replacements)?;

        let shared: AHashMap<SpecId, ClassId> = body
            .from
            .iter()
            .filter_map(|s| s.first_entity().map(|c| (s.id, c.clone())))
            .collect();
        Substitution::new(spec.id, def.attributes.clone(), replacements, &mut self.ids)
            .retarget(first_id.unwrap_or(spec.id), spec.range_var.clone())
            .shared_classes(shared)
            .apply(stmt);

        // 치환 후의 스펙 (ON 조건, 경로 조인 항이 바뀌어 있다)
        let current = spec_at(stmt, idx)
            .cloned()
            .ok_or_else(|| VtxError::structural(format!("no spec at position {idx}")))?;
        let mut new_specs = std::mem::take(&mut body.from);
        let spliced = new_specs.len();
        if let Some(first) = new_specs.first_mut() {
            first.join_type = current.join_type;
            first.on_cond.extend(current.on_cond);
            for path in current.path_entities {
                let parent = path
                    .path_join_left()
                    .and_then(Expr::as_name)
                    .and_then(|n| n.spec_id);
                match parent.and_then(|id| find_spec_mut(&mut new_specs, id)) {
                    Some(owner) => owner.path_entities.push(path),
                    None => {
                        return Err(VtxError::structural(format!(
                            "path spec '{}' has no compatible parent in view '{}'",
                            path.range_var, def.class
                        )));
                    }
                }
            }
        } else if !matches!(stmt, Statement::Query(_)) {
            return Ok(false);
        }
        splice_spec(stmt, idx, new_specs)?;

        let branch_where = std::mem::take(&mut body.where_clause);
        if !matches!(stmt, Statement::Insert(_)) {
            if let Some(terms) = where_mut(stmt) {
                terms.splice(0..0, branch_where);
            }
        }

        let checks = std::mem::take(&mut body.check_where);
        if !checks.is_empty() {
            let check_spec = first_id.unwrap_or(spec.id);
            match stmt {
                Statement::Update(u) => u.check_where.push(CheckOption {
                    spec_id: check_spec,
                    predicate: checks,
                }),
                Statement::Insert(i) => i.check_where.extend(checks),
                Statement::Merge(m) => m.check_where.push(CheckOption {
                    spec_id: check_spec,
                    predicate: checks,
                }),
                Statement::Query(_) | Statement::Delete(_) => {}
            }
        }

        if let Statement::Query(q) = stmt {
            let vspec = q.vspec_as_derived;
            let grouped = !body.group_by.is_empty() || !body.having.is_empty() || body.is_hierarchical();
            if grouped && !vspec {
                return Err(VtxError::structural(format!(
                    "grouped branch of '{}' inlined outside a derived table",
                    def.class
                )));
            }
            if vspec {
                if q.orderby_for.is_none() {
                    q.orderby_for = branch.orderby_for.take();
                }
                if q.limit.is_none() {
                    q.limit = branch.limit.take();
                }
                q.distinct |= branch.distinct;
            }
            let unordered = q.order_by.is_empty();
            let mut carried = None;
            if let Some(select) = q.as_select_mut() {
                select.group_by.append(&mut body.group_by);
                select.having.append(&mut body.having);
                select.connect_by.append(&mut body.connect_by);
                select.start_with.append(&mut body.start_with);
                select.after_cb_filter.append(&mut body.after_cb_filter);
                let only_view = select.from.len() == spliced;
                if carry_order && only_view && unordered && !branch.order_by.is_empty() {
                    carried = Some(carry_order_by(select, &body.list, &branch.order_by));
                }
            }
            if let Some(order_by) = carried {
                q.order_by = order_by;
            }
        }

        if let Some((hints, using_index)) = hints_mut(stmt) {
            hints.merge(&body.hints);
            using_index.append(&mut body.using_index);
        }
        regenerate_statement_range_vars(stmt);
        Ok(true)
    }

    /// 스펙을 파생 테이블로 감싼다: 분기가 주어지면 내부에 인라인
    pub(crate) fn wrap_spec_as_derived(
        &mut self,
        stmt: &mut Statement,
        idx: usize,
        branch: Option<(&ViewDefinition, &Query)>,
    ) -> VtxResult<()> {
        let spec = spec_at(stmt, idx)
            .cloned()
            .ok_or_else(|| VtxError::structural(format!("no spec at position {idx}")))?;
        let distinct = matches!(stmt, Statement::Query(q) if q.distinct);
        let mut refs = compute_referenced_attributes(&*stmt, spec.id);
        if refs.is_empty() || distinct {
            let oid = refs.iter().find(|n| n.is_oid()).cloned();
            refs = self.declared_attributes(&spec);
            refs.extend(oid);
        }

        let inner_id = self.ids.next_id();
        let mut inner_spec = EntitySpec::new_class(inner_id, ClassId::new(""), spec.range_var.clone());
        inner_spec.entities = spec.entities.clone();
        let list = refs
            .iter()
            .map(|n| {
                Column::new(Expr::Name(NameRef {
                    spec_id: Some(inner_id),
                    resolved: Some(spec.range_var.clone()),
                    ..n.clone()
                }))
            })
            .collect();
        let mut inner = Query::from_select(Select {
            list,
            from: vec![inner_spec],
            ..Default::default()
        });
        inner.vspec_as_derived = true;
        inner.is_subquery = true;
        inner.oids_included = refs.iter().any(NameRef::is_oid);

        if let Some((def, branch)) = branch {
            let mut inner_stmt = Statement::Query(inner);
            self.class_lambda(&mut inner_stmt, 0, def, branch, true)?;
            inner = self.finish_level(into_query(inner_stmt)?)?;
            inner.vspec_as_derived = true;
            inner.is_subquery = true;
        }

        let target = spec_at_mut(stmt, idx)
            .ok_or_else(|| VtxError::structural(format!("no spec at position {idx}")))?;
        target.entities.clear();
        target.derived = Some(Box::new(inner));
        target.as_attr_list = refs
            .into_iter()
            .map(|n| NameRef {
                spec_id: Some(spec.id),
                resolved: Some(spec.range_var.clone()),
                ..n
            })
            .collect();
        tracing::debug!(spec = %spec.id, range_var = %spec.range_var, "view spec wrapped as derived table");

        if let Statement::Query(q) = stmt {
            self.copy_push_terms(q, idx);
        }
        Ok(())
    }

    /// 스펙 클래스의 선언된 (인스턴스) 속성
    fn declared_attributes(&self, spec: &EntitySpec) -> Vec<NameRef> {
        let Some(info) = spec.first_entity().and_then(|c| self.schema.class(c)) else {
            return Vec::new();
        };
        info.attributes
            .iter()
            .filter(|a| !a.shared)
            .map(|a| {
                NameRef::bound(a.name.to_lowercase(), spec.id, spec.range_var.clone())
                    .with_type(a.domain.clone())
            })
            .collect()
    }
}
