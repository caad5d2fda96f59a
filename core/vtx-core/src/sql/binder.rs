//! 이름 바인더
//!
//! 변환된 AST의 이름을 FROM 스펙과 스키마에 대해 해석한다.
//!
//! - 스펙마다 새 식별자를 발급하고 후보 클래스(클래스 + 하위 클래스)를 기록
//! - `*` 확장, 이름 타입 지정 (객체 도메인 포함)
//! - 메서드 호출/공유 속성 표시
//! - `spec.objattr.attr` 탐색을 경로 하위 스펙으로 변환
//! - 하위 질의 상관 깊이 계산
//! - ORDER BY 전용 항목을 숨은 SELECT 컬럼으로 추가

use crate::catalog::SchemaProvider;
use crate::error::{VtxError, VtxResult};
use crate::sql::ast::*;
use crate::types::{ClassId, DataType};

/// 스코프 항목의 컬럼 출처
#[derive(Debug, Clone)]
enum Source {
    Class(ClassId),
    Derived(Vec<NameRef>),
}

#[derive(Debug, Clone)]
struct ScopeEntry {
    id: SpecId,
    range_var: String,
    source: Source,
    /// 경로 하위 스펙 (한정 없는 이름 해석에서 제외)
    is_path: bool,
}

/// 바인딩 후 부모 스펙에 붙일 경로 스펙
#[derive(Debug)]
struct PendingPath {
    parent: SpecId,
    spec: EntitySpec,
}

/// SELECT 하나(또는 DML 문장 하나)의 이름 스코프
#[derive(Debug, Default)]
struct Scope {
    entries: Vec<ScopeEntry>,
    paths: Vec<PendingPath>,
    correlation: u32,
}

/// 이름 바인더
pub struct Binder<'a> {
    schema: &'a dyn SchemaProvider,
    ids: &'a mut IdGenerator,
    scopes: Vec<Scope>,
}

fn unsupported(feature: impl Into<String>, hint: &str) -> VtxError {
    VtxError::SqlNotSupported {
        feature: feature.into(),
        hint: hint.to_string(),
    }
}

/// 보류된 경로 스펙을 부모에 연결 (생성 순서 = 부모 먼저)
fn attach_paths(specs: &mut [EntitySpec], paths: Vec<PendingPath>) -> VtxResult<()> {
    for pending in paths {
        let parent = find_spec_mut(specs, pending.parent).ok_or_else(|| {
            VtxError::structural(format!("path parent {} not found", pending.parent))
        })?;
        parent.path_entities.push(pending.spec);
    }
    Ok(())
}

/// 파생 테이블 본문의 노출 컬럼
fn derived_columns(query: &Query, id: SpecId, range_var: &str) -> Vec<NameRef> {
    query
        .leading_select()
        .list
        .iter()
        .filter(|c| !c.hidden)
        .enumerate()
        .map(|(i, c)| {
            let name = c
                .output_name()
                .map(str::to_string)
                .unwrap_or_else(|| format!("col_{}", i + 1));
            let data_type = match c.expr.strip_nested() {
                Expr::Name(n) => n.data_type.clone(),
                _ => DataType::Unknown,
            };
            NameRef::bound(name, id, range_var).with_type(data_type)
        })
        .collect()
}

impl<'a> Binder<'a> {
    pub fn new(schema: &'a dyn SchemaProvider, ids: &'a mut IdGenerator) -> Self {
        Self {
            schema,
            ids,
            scopes: Vec::new(),
        }
    }

    // ── Statements ──

    pub fn bind_statement(&mut self, stmt: &mut Statement) -> VtxResult<()> {
        match stmt {
            Statement::Query(query) => {
                self.bind_query(query)?;
                Ok(())
            }
            Statement::Update(update) => {
                self.scopes.push(Scope::default());
                let result = self.bind_update(update);
                let scope = self.scopes.pop().unwrap_or_default();
                result?;
                attach_paths(&mut update.specs, scope.paths)
            }
            Statement::Insert(insert) => {
                self.scopes.push(Scope::default());
                let result = self.bind_insert(insert);
                let scope = self.scopes.pop().unwrap_or_default();
                result?;
                attach_paths(std::slice::from_mut(&mut insert.spec), scope.paths)
            }
            Statement::Delete(delete) => {
                self.scopes.push(Scope::default());
                let result = self.bind_delete(delete);
                let scope = self.scopes.pop().unwrap_or_default();
                result?;
                attach_paths(&mut delete.specs, scope.paths)
            }
            Statement::Merge(merge) => {
                self.scopes.push(Scope::default());
                let result = self.bind_merge(merge);
                let scope = self.scopes.pop().unwrap_or_default();
                result?;
                let mut specs = [merge.target.clone(), merge.source.clone()];
                attach_paths(&mut specs, scope.paths)?;
                let [target, source] = specs;
                merge.target = target;
                merge.source = source;
                Ok(())
            }
        }
    }

    fn bind_update(&mut self, update: &mut Update) -> VtxResult<()> {
        for spec in &mut update.specs {
            self.bind_spec(spec)?;
            self.push_entry(spec);
        }
        for spec in &mut update.specs {
            self.bind_exprs(&mut spec.on_cond)?;
        }
        self.bind_assignments(&mut update.assignments, None)?;
        self.bind_exprs(&mut update.where_clause)?;
        for check in &mut update.check_where {
            self.bind_exprs(&mut check.predicate)?;
        }
        self.bind_hints(&mut update.hints)?;
        self.bind_index_names(&mut update.using_index)
    }

    fn bind_insert(&mut self, insert: &mut Insert) -> VtxResult<()> {
        if insert.spec.is_derived() {
            return Err(unsupported("INSERT into a derived table", "insert into a class or view"));
        }
        self.bind_spec(&mut insert.spec)?;

        // VALUES/하위 질의는 대상 스펙이 보이기 전에 바인딩
        match &mut insert.source {
            InsertSource::Values(rows) => {
                for row in rows.iter_mut() {
                    self.bind_exprs(row)?;
                }
            }
            InsertSource::Query(query) => {
                query.is_subquery = true;
                self.bind_query(query)?;
            }
            InsertSource::DefaultValues => {}
        }

        self.push_entry(&insert.spec);
        let entry = self.entry_of(insert.spec.id)?;
        if insert.columns.is_empty() {
            insert.columns = self.all_attributes(&entry)?;
        } else {
            for column in &mut insert.columns {
                *column = self.attribute_of(&entry, &column.name)?;
            }
        }

        let width = insert.columns.len();
        let class = insert.spec.range_var.clone();
        match &insert.source {
            InsertSource::Values(rows) => {
                if let Some(row) = rows.iter().find(|r| r.len() != width) {
                    return Err(VtxError::ArityMismatch {
                        view: class,
                        detail: format!("VALUES row has {} values for {} columns", row.len(), width),
                    });
                }
            }
            InsertSource::Query(query) => {
                let visible = query.leading_select().list.iter().filter(|c| !c.hidden).count();
                if visible != width {
                    return Err(VtxError::ArityMismatch {
                        view: class,
                        detail: format!("query yields {visible} columns for {width} columns"),
                    });
                }
            }
            InsertSource::DefaultValues => {}
        }

        self.bind_assignments(&mut insert.on_duplicate, Some(insert.spec.id))?;
        self.bind_exprs(&mut insert.check_where)
    }

    fn bind_delete(&mut self, delete: &mut Delete) -> VtxResult<()> {
        for spec in &mut delete.specs {
            self.bind_spec(spec)?;
            self.push_entry(spec);
        }
        for spec in &mut delete.specs {
            self.bind_exprs(&mut spec.on_cond)?;
        }
        self.bind_exprs(&mut delete.where_clause)?;
        self.bind_hints(&mut delete.hints)?;
        self.bind_index_names(&mut delete.using_index)
    }

    fn bind_merge(&mut self, merge: &mut Merge) -> VtxResult<()> {
        self.bind_spec(&mut merge.target)?;
        self.push_entry(&merge.target);
        self.bind_spec(&mut merge.source)?;
        self.push_entry(&merge.source);
        self.bind_exprs(&mut merge.on)?;

        let target = merge.target.id;
        if let Some(update) = &mut merge.update {
            self.bind_assignments(&mut update.assignments, Some(target))?;
            self.bind_exprs(&mut update.where_clause)?;
        }
        if let Some(insert) = &mut merge.insert {
            let entry = self.entry_of(target)?;
            if insert.columns.is_empty() {
                insert.columns = self.all_attributes(&entry)?;
            } else {
                for column in &mut insert.columns {
                    *column = self.attribute_of(&entry, &column.name)?;
                }
            }
            if insert.columns.len() != insert.values.len() {
                return Err(VtxError::ArityMismatch {
                    view: merge.target.range_var.clone(),
                    detail: format!(
                        "INSERT clause has {} values for {} columns",
                        insert.values.len(),
                        insert.columns.len()
                    ),
                });
            }
            self.bind_exprs(&mut insert.values)?;
            self.bind_exprs(&mut insert.where_clause)?;
        }
        for check in &mut merge.check_where {
            self.bind_exprs(&mut check.predicate)?;
        }
        Ok(())
    }

    /// 대입 대상은 `only` 스펙(지정 시) 또는 현재 스코프에서 해석
    fn bind_assignments(&mut self, items: &mut [Assignment], only: Option<SpecId>) -> VtxResult<()> {
        for item in items {
            item.target = match only {
                Some(id) => {
                    let entry = self.entry_of(id)?;
                    self.attribute_of(&entry, &item.target.name)?
                }
                None => match self.resolve(&item.target)? {
                    Expr::Name(n) => n,
                    _ => {
                        return Err(unsupported(
                            "path expression as assignment target",
                            "assign an attribute of a FROM class",
                        ));
                    }
                },
            };
            self.bind_expr(&mut item.value)?;
        }
        Ok(())
    }

    // ── Queries ──

    /// 질의를 바인딩하고 상관 깊이를 반환
    pub fn bind_query(&mut self, query: &mut Query) -> VtxResult<u32> {
        let level = match &mut query.body {
            QueryBody::Select(select) => {
                self.scopes.push(Scope::default());
                let result = self.bind_select_query(
                    select,
                    &mut query.order_by,
                    &mut query.orderby_for,
                    &mut query.limit,
                );
                let scope = self.scopes.pop().unwrap_or_default();
                result?;
                attach_paths(&mut select.from, scope.paths)?;
                scope.correlation
            }
            QueryBody::SetOp { left, right, .. } => {
                let l = self.bind_query(left)?;
                let r = self.bind_query(right)?;
                let leading = left.leading_select();
                for ob in &mut query.order_by {
                    if let SortKey::Expr(e) = &ob.key {
                        let pos = match e {
                            Expr::Name(n) if n.resolved.is_none() => leading
                                .list
                                .iter()
                                .position(|c| c.output_name().is_some_and(|o| o.eq_ignore_ascii_case(&n.name))),
                            _ => None,
                        };
                        match pos {
                            Some(p) => ob.key = SortKey::Position(p + 1),
                            None => {
                                return Err(unsupported(
                                    format!("ORDER BY {e} on a set operation"),
                                    "order set operations by column position or output name",
                                ));
                            }
                        }
                    }
                }
                if let Some(e) = &mut query.limit {
                    self.bind_expr(e)?;
                }
                l.max(r)
            }
        };
        query.correlation_level = level;
        Ok(level)
    }

    fn bind_select_query(
        &mut self,
        select: &mut Select,
        order_by: &mut [OrderBy],
        orderby_for: &mut Option<Expr>,
        limit: &mut Option<Expr>,
    ) -> VtxResult<()> {
        self.bind_select(select)?;

        for ob in order_by.iter_mut() {
            let SortKey::Expr(e) = &mut ob.key else {
                continue;
            };
            let by_alias = match e {
                Expr::Name(n) if n.resolved.is_none() && n.spec_id.is_none() => {
                    select.list.iter().position(|c| {
                        !c.hidden
                            && c.alias
                                .as_deref()
                                .is_some_and(|a| a.eq_ignore_ascii_case(&n.name))
                    })
                }
                _ => None,
            };
            let pos = match by_alias {
                Some(p) => p,
                None => {
                    self.bind_expr(e)?;
                    match select.list.iter().position(|c| c.expr == *e) {
                        Some(p) => p,
                        None => {
                            select.list.push(Column {
                                expr: e.clone(),
                                alias: None,
                                hidden: true,
                            });
                            select.list.len() - 1
                        }
                    }
                }
            };
            ob.key = SortKey::Position(pos + 1);
        }

        if let Some(e) = orderby_for {
            self.bind_expr(e)?;
        }
        if let Some(e) = limit {
            self.bind_expr(e)?;
        }
        Ok(())
    }

    fn bind_select(&mut self, select: &mut Select) -> VtxResult<()> {
        for spec in &mut select.from {
            self.bind_spec(spec)?;
            self.push_entry(spec);
        }
        for spec in &mut select.from {
            self.bind_exprs(&mut spec.on_cond)?;
        }

        let mut list = Vec::with_capacity(select.list.len());
        for column in std::mem::take(&mut select.list) {
            let Column { mut expr, alias, hidden } = column;
            if let Expr::Star(target) = &expr {
                list.extend(self.expand_star(target.as_deref())?);
                continue;
            }
            self.bind_expr(&mut expr)?;
            list.push(Column { expr, alias, hidden });
        }
        select.list = list;

        self.bind_exprs(&mut select.where_clause)?;
        self.bind_exprs(&mut select.group_by)?;
        self.bind_exprs(&mut select.having)?;
        self.bind_exprs(&mut select.connect_by)?;
        self.bind_exprs(&mut select.start_with)?;
        self.bind_exprs(&mut select.after_cb_filter)?;
        self.bind_exprs(&mut select.check_where)?;
        self.bind_hints(&mut select.hints)?;
        self.bind_index_names(&mut select.using_index)
    }

    /// 스펙 식별자 발급, 후보 클래스 기록, 파생 본문 바인딩
    fn bind_spec(&mut self, spec: &mut EntitySpec) -> VtxResult<()> {
        spec.id = self.ids.next_id();
        if let Some(query) = spec.derived.as_mut() {
            query.is_subquery = true;
            self.bind_query(query)?;
            let columns = derived_columns(query, spec.id, &spec.range_var);
            if spec.as_attr_list.is_empty() {
                spec.as_attr_list = columns;
            } else if spec.as_attr_list.len() != columns.len() {
                return Err(VtxError::structural(format!(
                    "derived table '{}' has {} columns but {} column names",
                    spec.range_var,
                    columns.len(),
                    spec.as_attr_list.len()
                )));
            } else {
                for (name, column) in spec.as_attr_list.iter_mut().zip(columns) {
                    name.spec_id = Some(spec.id);
                    name.resolved = Some(spec.range_var.clone());
                    name.data_type = column.data_type;
                }
            }
            return Ok(());
        }
        let class = spec
            .first_entity()
            .cloned()
            .ok_or_else(|| VtxError::structural("class spec without a class"))?;
        if self.schema.class(&class).is_none() {
            return Err(VtxError::ClassNotFound(class.to_string()));
        }
        spec.entities.truncate(1);
        spec.entities.extend(self.schema.subclasses(&class));
        Ok(())
    }

    fn push_entry(&mut self, spec: &EntitySpec) {
        let source = match spec.first_entity() {
            Some(class) if !spec.is_derived() => Source::Class(class.clone()),
            _ => Source::Derived(spec.as_attr_list.clone()),
        };
        if let Some(scope) = self.scopes.last_mut() {
            scope.entries.push(ScopeEntry {
                id: spec.id,
                range_var: spec.range_var.clone(),
                source,
                is_path: false,
            });
        }
    }

    fn entry_of(&self, id: SpecId) -> VtxResult<ScopeEntry> {
        self.scopes
            .iter()
            .rev()
            .flat_map(|s| s.entries.iter())
            .find(|e| e.id == id)
            .cloned()
            .ok_or_else(|| VtxError::structural(format!("spec {id} is not in scope")))
    }

    fn expand_star(&self, target: Option<&str>) -> VtxResult<Vec<Column>> {
        let scope = self
            .scopes
            .last()
            .ok_or_else(|| VtxError::structural("'*' outside a query"))?;
        let mut columns = Vec::new();
        let mut matched = false;
        for entry in scope.entries.iter().filter(|e| !e.is_path) {
            if target.is_some_and(|t| !t.eq_ignore_ascii_case(&entry.range_var)) {
                continue;
            }
            matched = true;
            columns.extend(self.all_attributes(entry)?.into_iter().map(|n| Column::new(Expr::Name(n))));
        }
        if let (Some(t), false) = (target, matched) {
            return Err(VtxError::AttributeNotFound {
                class: t.to_string(),
                attribute: "*".to_string(),
            });
        }
        Ok(columns)
    }

    // ── Names ──

    fn lookup_attr(&self, entry: &ScopeEntry, name: &str) -> Option<NameRef> {
        match &entry.source {
            Source::Class(class) => {
                let attr = self.schema.class(class)?.attribute(name)?;
                let bound = NameRef::bound(attr.name.to_lowercase(), entry.id, entry.range_var.clone())
                    .with_type(attr.domain.clone());
                Some(if attr.shared {
                    bound.with_meta(NameMeta::Shared)
                } else {
                    bound
                })
            }
            Source::Derived(columns) => columns
                .iter()
                .find(|c| !c.is_oid() && c.name.eq_ignore_ascii_case(name))
                .map(|c| {
                    NameRef::bound(c.name.clone(), entry.id, entry.range_var.clone())
                        .with_type(c.data_type.clone())
                }),
        }
    }

    fn attribute_of(&self, entry: &ScopeEntry, name: &str) -> VtxResult<NameRef> {
        self.lookup_attr(entry, name)
            .ok_or_else(|| VtxError::AttributeNotFound {
                class: self.entry_label(entry),
                attribute: name.to_string(),
            })
    }

    /// 항목의 모든 (인스턴스) 속성
    fn all_attributes(&self, entry: &ScopeEntry) -> VtxResult<Vec<NameRef>> {
        match &entry.source {
            Source::Class(class) => {
                let info = self
                    .schema
                    .class(class)
                    .ok_or_else(|| VtxError::ClassNotFound(class.to_string()))?;
                Ok(info
                    .attributes
                    .iter()
                    .filter(|a| !a.shared)
                    .filter_map(|a| self.lookup_attr(entry, &a.name))
                    .collect())
            }
            Source::Derived(columns) => Ok(columns
                .iter()
                .filter(|c| !c.is_oid())
                .filter_map(|c| self.lookup_attr(entry, &c.name))
                .collect()),
        }
    }

    fn entry_label(&self, entry: &ScopeEntry) -> String {
        match &entry.source {
            Source::Class(class) => class.to_string(),
            Source::Derived(_) => entry.range_var.clone(),
        }
    }

    fn oid_of(entry: &ScopeEntry) -> NameRef {
        let class = match &entry.source {
            Source::Class(class) => Some(class.clone()),
            Source::Derived(_) => None,
        };
        NameRef::oid(entry.id, entry.range_var.clone(), class)
    }

    /// 바깥 스코프 참조 → 중간 스코프들의 상관 깊이 갱신
    fn note_correlation(&mut self, distance: usize) {
        let Some(top) = self.scopes.len().checked_sub(1) else {
            return;
        };
        for k in 0..distance.min(top + 1) {
            let scope = &mut self.scopes[top - k];
            scope.correlation = scope.correlation.max((distance - k) as u32);
        }
    }

    /// 이름 해석: 한정 이름, 한정 없는 속성, 범위 변수(OID) 순
    fn resolve(&mut self, name: &NameRef) -> VtxResult<Expr> {
        if let Some(qualifier) = &name.resolved {
            let mut hit = None;
            for (distance, scope) in self.scopes.iter().rev().enumerate() {
                if let Some(entry) = scope
                    .entries
                    .iter()
                    .find(|e| e.range_var.eq_ignore_ascii_case(qualifier))
                {
                    hit = Some((distance, entry.clone()));
                    break;
                }
            }
            if let Some((distance, entry)) = hit {
                let found = self.attribute_of(&entry, &name.name)?;
                self.note_correlation(distance);
                return Ok(Expr::Name(found));
            }

            // 한정자가 객체 속성이면 경로 탐색
            if let Ok(Expr::Name(base)) = self.resolve(&NameRef::new(qualifier.clone())) {
                if base.data_type.object_class().is_some() && !base.is_oid() {
                    return self.bind_dot(Expr::Name(base), &NameRef::new(name.name.clone()));
                }
            }
            return Err(VtxError::AttributeNotFound {
                class: qualifier.clone(),
                attribute: name.name.clone(),
            });
        }

        let mut hit = None;
        'scopes: for (distance, scope) in self.scopes.iter().rev().enumerate() {
            for entry in scope.entries.iter().filter(|e| !e.is_path) {
                if let Some(found) = self.lookup_attr(entry, &name.name) {
                    hit = Some((distance, found));
                    break 'scopes;
                }
            }
        }
        if hit.is_none() {
            'rv: for (distance, scope) in self.scopes.iter().rev().enumerate() {
                for entry in &scope.entries {
                    if entry.range_var.eq_ignore_ascii_case(&name.name) {
                        hit = Some((distance, Self::oid_of(entry)));
                        break 'rv;
                    }
                }
            }
        }
        match hit {
            Some((distance, found)) => {
                self.note_correlation(distance);
                Ok(Expr::Name(found))
            }
            None => {
                let class = self
                    .scopes
                    .last()
                    .and_then(|s| s.entries.first())
                    .map(|e| self.entry_label(e))
                    .unwrap_or_default();
                Err(VtxError::AttributeNotFound {
                    class,
                    attribute: name.name.clone(),
                })
            }
        }
    }

    fn unique_range_var(&self, base: &str) -> String {
        let taken = |candidate: &str| {
            self.scopes
                .iter()
                .flat_map(|s| s.entries.iter())
                .any(|e| e.range_var.eq_ignore_ascii_case(candidate))
        };
        if !taken(base) {
            return base.to_string();
        }
        (1..)
            .map(|i| format!("{base}_{i}"))
            .find(|candidate| !taken(candidate))
            .unwrap_or_else(|| base.to_string())
    }

    /// `base.right`: base는 객체 도메인 속성. 경로 스펙을 만들거나 재사용
    fn bind_dot(&mut self, base: Expr, right: &NameRef) -> VtxResult<Expr> {
        let base = match base {
            Expr::Name(n) => n,
            other => {
                return Err(VtxError::structural(format!(
                    "path navigation needs an attribute on its left, found {other}"
                )));
            }
        };
        let class = base.data_type.object_class().cloned().ok_or_else(|| {
            VtxError::structural(format!("'{}' is not an object-valued attribute", base.name))
        })?;
        let parent = base
            .spec_id
            .ok_or_else(|| VtxError::structural(format!("unbound path base '{}'", base.name)))?;
        let entry = self.path_entry(&base, parent, &class)?;
        Ok(Expr::Name(self.attribute_of(&entry, &right.name)?))
    }

    fn path_entry(&mut self, base: &NameRef, parent: SpecId, class: &ClassId) -> VtxResult<ScopeEntry> {
        let index = self
            .scopes
            .iter()
            .rposition(|s| s.entries.iter().any(|e| e.id == parent))
            .ok_or_else(|| VtxError::structural(format!("path parent {parent} not in scope")))?;

        let existing = self.scopes[index].paths.iter().find(|p| {
            p.parent == parent
                && p
                    .spec
                    .path_join_left()
                    .and_then(Expr::as_name)
                    .is_some_and(|left| left.same_target(base))
        });
        if let Some(path) = existing {
            let id = path.spec.id;
            return self.entry_of(id);
        }

        if self.schema.class(class).is_none() {
            return Err(VtxError::ClassNotFound(class.to_string()));
        }
        let id = self.ids.next_id();
        let range_var = self.unique_range_var(&base.name);
        let mut spec = EntitySpec::new_class(id, class.clone(), range_var.clone());
        spec.entities.extend(self.schema.subclasses(class));
        spec.path_conjunct = Some(Expr::equals(
            Expr::Name(base.clone()),
            Expr::Name(NameRef::oid(id, range_var.clone(), Some(class.clone()))),
        ));
        let entry = ScopeEntry {
            id,
            range_var,
            source: Source::Class(class.clone()),
            is_path: true,
        };
        let scope = &mut self.scopes[index];
        scope.entries.push(entry.clone());
        scope.paths.push(PendingPath { parent, spec });
        Ok(entry)
    }

    fn bind_hints(&mut self, hints: &mut Hints) -> VtxResult<()> {
        for name in hints.names_mut() {
            if name.spec_id.is_some() {
                continue;
            }
            let target = if name.name.is_empty() {
                name.resolved.clone().unwrap_or_default()
            } else {
                name.name.clone()
            };
            let entry = self
                .scopes
                .last()
                .and_then(|s| s.entries.iter().find(|e| e.range_var.eq_ignore_ascii_case(&target)))
                .cloned()
                .ok_or_else(|| VtxError::AttributeNotFound {
                    class: "hint".to_string(),
                    attribute: target.clone(),
                })?;
            *name = NameRef::bound("", entry.id, entry.range_var).with_meta(NameMeta::HintName);
        }
        Ok(())
    }

    fn bind_index_names(&mut self, names: &mut [NameRef]) -> VtxResult<()> {
        for name in names {
            if name.spec_id.is_some() {
                continue;
            }
            let qualifier = name.resolved.clone().unwrap_or_default();
            if let Some(entry) = self
                .scopes
                .last()
                .and_then(|s| s.entries.iter().find(|e| e.range_var.eq_ignore_ascii_case(&qualifier)))
            {
                name.spec_id = Some(entry.id);
            }
            name.meta = NameMeta::IndexName;
        }
        Ok(())
    }

    // ── Expressions ──

    fn bind_exprs(&mut self, exprs: &mut [Expr]) -> VtxResult<()> {
        for e in exprs {
            self.bind_expr(e)?;
        }
        Ok(())
    }

    pub fn bind_expr(&mut self, expr: &mut Expr) -> VtxResult<()> {
        match expr {
            Expr::Name(n) => {
                if n.spec_id.is_none() && n.meta != NameMeta::Parameter {
                    let name = n.clone();
                    *expr = self.resolve(&name)?;
                }
            }
            Expr::Value(_) | Expr::Pseudo(_) | Expr::Variable(_) => {}
            Expr::Star(_) => {
                return Err(unsupported("'*' outside the select list", "list the columns"));
            }
            Expr::Binary { left, right, .. } => {
                self.bind_expr(left)?;
                self.bind_expr(right)?;
            }
            Expr::Unary { expr: inner, .. } | Expr::Nested(inner) => self.bind_expr(inner)?,
            Expr::Function(f) => {
                self.bind_exprs(&mut f.args)?;
                if let Some(window) = &mut f.over {
                    self.bind_exprs(&mut window.partition_by)?;
                    self.bind_exprs(&mut window.order_by)?;
                }
                if f.kind == FunctionKind::Scalar {
                    let method = self.as_method(f);
                    if let Some(method) = method {
                        *expr = method;
                    }
                }
            }
            Expr::Method(m) => {
                if let Some(target) = &mut m.target {
                    self.bind_expr(target)?;
                }
                self.bind_exprs(&mut m.args)?;
                if m.name.spec_id.is_none() {
                    if let Some(Expr::Name(target)) = m.target.as_deref() {
                        m.name.spec_id = target.spec_id;
                        m.name.resolved = target.resolved.clone();
                        let is_class_method = target
                            .data_type
                            .object_class()
                            .and_then(|c| self.schema.class(c))
                            .is_some_and(|c| {
                                !c.has_method(&m.name.name) && c.has_class_method(&m.name.name)
                            });
                        if is_class_method {
                            m.class_method = true;
                            m.target = None;
                        }
                    }
                }
                m.name.meta = NameMeta::Method;
            }
            Expr::Dot { left, right } => {
                let right = right.clone();
                self.bind_expr(left)?;
                let base = std::mem::replace(left.as_mut(), Expr::null());
                *expr = self.bind_dot(base, &right)?;
            }
            Expr::Subquery(query) | Expr::Exists(query) => {
                query.is_subquery = true;
                self.bind_query(query)?;
            }
            Expr::InSubquery { expr: lhs, query, .. } => {
                self.bind_expr(lhs)?;
                query.is_subquery = true;
                self.bind_query(query)?;
            }
            Expr::InList { expr: lhs, list, .. } => {
                self.bind_expr(lhs)?;
                self.bind_exprs(list)?;
            }
            Expr::Between {
                expr: lhs, low, high, ..
            } => {
                self.bind_expr(lhs)?;
                self.bind_expr(low)?;
                self.bind_expr(high)?;
            }
            Expr::Assign { value, .. } => self.bind_expr(value)?,
            Expr::Sequence(items) => self.bind_exprs(items)?,
        }
        Ok(())
    }

    /// 스칼라 함수 호출이 메서드 호출인지 판정
    fn as_method(&self, f: &FunctionCall) -> Option<Expr> {
        if let Some(Expr::Name(target)) = f.args.first() {
            let is_method = target
                .data_type
                .object_class()
                .and_then(|c| self.schema.class(c))
                .is_some_and(|c| c.has_method(&f.name));
            if is_method {
                return Some(Expr::Method(MethodCall {
                    name: NameRef {
                        name: f.name.clone(),
                        resolved: target.resolved.clone(),
                        spec_id: target.spec_id,
                        meta: NameMeta::Method,
                        data_type: DataType::Unknown,
                    },
                    target: Some(Box::new(f.args[0].clone())),
                    args: f.args[1..].to_vec(),
                    class_method: false,
                }));
            }
        }
        for scope in self.scopes.iter().rev() {
            for entry in &scope.entries {
                let Source::Class(class) = &entry.source else {
                    continue;
                };
                if self
                    .schema
                    .class(class)
                    .is_some_and(|c| c.has_class_method(&f.name))
                {
                    return Some(Expr::Method(MethodCall {
                        name: NameRef::bound(f.name.clone(), entry.id, entry.range_var.clone())
                            .with_meta(NameMeta::Method),
                        target: None,
                        args: f.args.clone(),
                        class_method: true,
                    }));
                }
            }
        }
        None
    }
}
