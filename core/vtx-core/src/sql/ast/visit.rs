//! AST 순회기
//!
//! 전위(`enter_*`)/후위(`leave_*`) 훅을 가진 방문자. 전위 훅이
//! [`Walk::Skip`]을 반환하면 자식은 건너뛰되 후위 훅은 호출되고,
//! [`Walk::Stop`]은 전체 순회를 중단한다.

use super::*;
use std::ops::ControlFlow;

type Flow = ControlFlow<()>;

/// 전위 훅의 순회 지시
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Walk {
    Continue,
    Skip,
    Stop,
}

/// 가변 방문자
pub trait VisitorMut {
    fn enter_expr(&mut self, _expr: &mut Expr) -> Walk {
        Walk::Continue
    }
    fn leave_expr(&mut self, _expr: &mut Expr) {}
    fn visit_name(&mut self, _name: &mut NameRef) -> Walk {
        Walk::Continue
    }
    /// 스펙의 노출/참조 컬럼 목록 (`as_attr_list`, `referenced_attrs`)
    fn visit_spec_column(&mut self, name: &mut NameRef) -> Walk {
        self.visit_name(name)
    }
    fn enter_query(&mut self, _query: &mut Query) -> Walk {
        Walk::Continue
    }
    fn leave_query(&mut self, _query: &mut Query) {}
    fn enter_select(&mut self, _select: &mut Select) -> Walk {
        Walk::Continue
    }
    fn leave_select(&mut self, _select: &mut Select) {}
    fn enter_spec(&mut self, _spec: &mut EntitySpec) -> Walk {
        Walk::Continue
    }
    fn leave_spec(&mut self, _spec: &mut EntitySpec) {}
}

/// 읽기 전용 방문자
pub trait Visitor {
    fn enter_expr(&mut self, _expr: &Expr) -> Walk {
        Walk::Continue
    }
    fn leave_expr(&mut self, _expr: &Expr) {}
    fn visit_name(&mut self, _name: &NameRef) -> Walk {
        Walk::Continue
    }
    fn visit_spec_column(&mut self, name: &NameRef) -> Walk {
        self.visit_name(name)
    }
    fn enter_query(&mut self, _query: &Query) -> Walk {
        Walk::Continue
    }
    fn leave_query(&mut self, _query: &Query) {}
    fn enter_select(&mut self, _select: &Select) -> Walk {
        Walk::Continue
    }
    fn leave_select(&mut self, _select: &Select) {}
    fn enter_spec(&mut self, _spec: &EntitySpec) -> Walk {
        Walk::Continue
    }
    fn leave_spec(&mut self, _spec: &EntitySpec) {}
}

fn flow(walk: Walk) -> Option<Flow> {
    match walk {
        Walk::Continue => None,
        Walk::Skip => Some(ControlFlow::Continue(())),
        Walk::Stop => Some(ControlFlow::Break(())),
    }
}

fn name_flow(walk: Walk) -> Flow {
    if walk == Walk::Stop {
        ControlFlow::Break(())
    } else {
        ControlFlow::Continue(())
    }
}

// ─── Mutable walk ────────────────────────────────────────

pub fn walk_expr_mut<V: VisitorMut + ?Sized>(v: &mut V, expr: &mut Expr) -> Flow {
    match v.enter_expr(expr) {
        Walk::Stop => return ControlFlow::Break(()),
        Walk::Skip => {
            v.leave_expr(expr);
            return ControlFlow::Continue(());
        }
        Walk::Continue => {}
    }
    match expr {
        Expr::Name(n) => name_flow(v.visit_name(n))?,
        Expr::Value(_) | Expr::Pseudo(_) | Expr::Variable(_) | Expr::Star(_) => {}
        Expr::Binary { left, right, .. } => {
            walk_expr_mut(v, left)?;
            walk_expr_mut(v, right)?;
        }
        Expr::Unary { expr: inner, .. } | Expr::Nested(inner) => walk_expr_mut(v, inner)?,
        Expr::Function(f) => {
            for arg in &mut f.args {
                walk_expr_mut(v, arg)?;
            }
            if let Some(window) = &mut f.over {
                for e in window.partition_by.iter_mut().chain(window.order_by.iter_mut()) {
                    walk_expr_mut(v, e)?;
                }
            }
        }
        Expr::Method(m) => {
            name_flow(v.visit_name(&mut m.name))?;
            if let Some(target) = &mut m.target {
                walk_expr_mut(v, target)?;
            }
            for arg in &mut m.args {
                walk_expr_mut(v, arg)?;
            }
        }
        Expr::Dot { left, right } => {
            walk_expr_mut(v, left)?;
            name_flow(v.visit_name(right))?;
        }
        Expr::Subquery(q) | Expr::Exists(q) => walk_query_mut(v, q)?,
        Expr::InSubquery { expr: lhs, query, .. } => {
            walk_expr_mut(v, lhs)?;
            walk_query_mut(v, query)?;
        }
        Expr::InList { expr: lhs, list, .. } => {
            walk_expr_mut(v, lhs)?;
            for e in list {
                walk_expr_mut(v, e)?;
            }
        }
        Expr::Between {
            expr: lhs, low, high, ..
        } => {
            walk_expr_mut(v, lhs)?;
            walk_expr_mut(v, low)?;
            walk_expr_mut(v, high)?;
        }
        Expr::Assign { value, .. } => walk_expr_mut(v, value)?,
        Expr::Sequence(items) => {
            for e in items {
                walk_expr_mut(v, e)?;
            }
        }
    }
    v.leave_expr(expr);
    ControlFlow::Continue(())
}

pub fn walk_exprs_mut<V: VisitorMut + ?Sized>(v: &mut V, exprs: &mut [Expr]) -> Flow {
    for e in exprs {
        walk_expr_mut(v, e)?;
    }
    ControlFlow::Continue(())
}

fn walk_names_mut<V: VisitorMut + ?Sized>(v: &mut V, names: &mut [NameRef]) -> Flow {
    for n in names {
        name_flow(v.visit_name(n))?;
    }
    ControlFlow::Continue(())
}

fn walk_hints_mut<V: VisitorMut + ?Sized>(v: &mut V, hints: &mut Hints) -> Flow {
    for n in hints.names_mut() {
        name_flow(v.visit_name(n))?;
    }
    ControlFlow::Continue(())
}

pub fn walk_query_mut<V: VisitorMut + ?Sized>(v: &mut V, query: &mut Query) -> Flow {
    if let Some(f) = flow(v.enter_query(query)) {
        if f.is_continue() {
            v.leave_query(query);
        }
        return f;
    }
    match &mut query.body {
        QueryBody::Select(select) => walk_select_mut(v, select)?,
        QueryBody::SetOp { left, right, .. } => {
            walk_query_mut(v, left)?;
            walk_query_mut(v, right)?;
        }
    }
    for ob in &mut query.order_by {
        if let SortKey::Expr(e) = &mut ob.key {
            walk_expr_mut(v, e)?;
        }
    }
    if let Some(e) = &mut query.orderby_for {
        walk_expr_mut(v, e)?;
    }
    if let Some(e) = &mut query.limit {
        walk_expr_mut(v, e)?;
    }
    v.leave_query(query);
    ControlFlow::Continue(())
}

pub fn walk_select_mut<V: VisitorMut + ?Sized>(v: &mut V, select: &mut Select) -> Flow {
    if let Some(f) = flow(v.enter_select(select)) {
        if f.is_continue() {
            v.leave_select(select);
        }
        return f;
    }
    for col in &mut select.list {
        walk_expr_mut(v, &mut col.expr)?;
    }
    for spec in &mut select.from {
        walk_spec_mut(v, spec)?;
    }
    walk_exprs_mut(v, &mut select.where_clause)?;
    walk_exprs_mut(v, &mut select.group_by)?;
    walk_exprs_mut(v, &mut select.having)?;
    walk_exprs_mut(v, &mut select.connect_by)?;
    walk_exprs_mut(v, &mut select.start_with)?;
    walk_exprs_mut(v, &mut select.after_cb_filter)?;
    walk_exprs_mut(v, &mut select.check_where)?;
    walk_hints_mut(v, &mut select.hints)?;
    walk_names_mut(v, &mut select.using_index)?;
    v.leave_select(select);
    ControlFlow::Continue(())
}

pub fn walk_spec_mut<V: VisitorMut + ?Sized>(v: &mut V, spec: &mut EntitySpec) -> Flow {
    if let Some(f) = flow(v.enter_spec(spec)) {
        if f.is_continue() {
            v.leave_spec(spec);
        }
        return f;
    }
    if let Some(q) = &mut spec.derived {
        walk_query_mut(v, q)?;
    }
    for path in &mut spec.path_entities {
        walk_spec_mut(v, path)?;
    }
    if let Some(e) = &mut spec.path_conjunct {
        walk_expr_mut(v, e)?;
    }
    walk_exprs_mut(v, &mut spec.on_cond)?;
    for n in spec.as_attr_list.iter_mut().chain(spec.referenced_attrs.iter_mut()) {
        name_flow(v.visit_spec_column(n))?;
    }
    v.leave_spec(spec);
    ControlFlow::Continue(())
}

fn walk_assignments_mut<V: VisitorMut + ?Sized>(v: &mut V, items: &mut [Assignment]) -> Flow {
    for a in items {
        name_flow(v.visit_name(&mut a.target))?;
        walk_expr_mut(v, &mut a.value)?;
    }
    ControlFlow::Continue(())
}

fn walk_checks_mut<V: VisitorMut + ?Sized>(v: &mut V, checks: &mut [CheckOption]) -> Flow {
    for c in checks {
        walk_exprs_mut(v, &mut c.predicate)?;
    }
    ControlFlow::Continue(())
}

pub fn walk_statement_mut<V: VisitorMut + ?Sized>(v: &mut V, stmt: &mut Statement) -> Flow {
    match stmt {
        Statement::Query(q) => walk_query_mut(v, q),
        Statement::Update(u) => {
            for spec in &mut u.specs {
                walk_spec_mut(v, spec)?;
            }
            walk_assignments_mut(v, &mut u.assignments)?;
            walk_exprs_mut(v, &mut u.where_clause)?;
            walk_checks_mut(v, &mut u.check_where)?;
            walk_hints_mut(v, &mut u.hints)?;
            walk_names_mut(v, &mut u.using_index)
        }
        Statement::Insert(i) => {
            walk_spec_mut(v, &mut i.spec)?;
            walk_names_mut(v, &mut i.columns)?;
            match &mut i.source {
                InsertSource::Values(rows) => {
                    for row in rows {
                        walk_exprs_mut(v, row)?;
                    }
                }
                InsertSource::DefaultValues => {}
                InsertSource::Query(q) => walk_query_mut(v, q)?,
            }
            walk_assignments_mut(v, &mut i.on_duplicate)?;
            walk_exprs_mut(v, &mut i.check_where)
        }
        Statement::Delete(d) => {
            for spec in &mut d.specs {
                walk_spec_mut(v, spec)?;
            }
            walk_exprs_mut(v, &mut d.where_clause)?;
            walk_hints_mut(v, &mut d.hints)?;
            walk_names_mut(v, &mut d.using_index)
        }
        Statement::Merge(m) => {
            walk_spec_mut(v, &mut m.target)?;
            walk_spec_mut(v, &mut m.source)?;
            walk_exprs_mut(v, &mut m.on)?;
            if let Some(up) = &mut m.update {
                walk_assignments_mut(v, &mut up.assignments)?;
                walk_exprs_mut(v, &mut up.where_clause)?;
            }
            if let Some(ins) = &mut m.insert {
                walk_names_mut(v, &mut ins.columns)?;
                walk_exprs_mut(v, &mut ins.values)?;
                walk_exprs_mut(v, &mut ins.where_clause)?;
            }
            walk_checks_mut(v, &mut m.check_where)
        }
    }
}

// ─── Read-only walk ──────────────────────────────────────

pub fn walk_expr<V: Visitor + ?Sized>(v: &mut V, expr: &Expr) -> Flow {
    match v.enter_expr(expr) {
        Walk::Stop => return ControlFlow::Break(()),
        Walk::Skip => {
            v.leave_expr(expr);
            return ControlFlow::Continue(());
        }
        Walk::Continue => {}
    }
    match expr {
        Expr::Name(n) => name_flow(v.visit_name(n))?,
        Expr::Value(_) | Expr::Pseudo(_) | Expr::Variable(_) | Expr::Star(_) => {}
        Expr::Binary { left, right, .. } => {
            walk_expr(v, left)?;
            walk_expr(v, right)?;
        }
        Expr::Unary { expr: inner, .. } | Expr::Nested(inner) => walk_expr(v, inner)?,
        Expr::Function(f) => {
            walk_exprs(v, &f.args)?;
            if let Some(window) = &f.over {
                walk_exprs(v, &window.partition_by)?;
                walk_exprs(v, &window.order_by)?;
            }
        }
        Expr::Method(m) => {
            name_flow(v.visit_name(&m.name))?;
            if let Some(target) = &m.target {
                walk_expr(v, target)?;
            }
            walk_exprs(v, &m.args)?;
        }
        Expr::Dot { left, right } => {
            walk_expr(v, left)?;
            name_flow(v.visit_name(right))?;
        }
        Expr::Subquery(q) | Expr::Exists(q) => walk_query(v, q)?,
        Expr::InSubquery { expr: lhs, query, .. } => {
            walk_expr(v, lhs)?;
            walk_query(v, query)?;
        }
        Expr::InList { expr: lhs, list, .. } => {
            walk_expr(v, lhs)?;
            walk_exprs(v, list)?;
        }
        Expr::Between {
            expr: lhs, low, high, ..
        } => {
            walk_expr(v, lhs)?;
            walk_expr(v, low)?;
            walk_expr(v, high)?;
        }
        Expr::Assign { value, .. } => walk_expr(v, value)?,
        Expr::Sequence(items) => walk_exprs(v, items)?,
    }
    v.leave_expr(expr);
    ControlFlow::Continue(())
}

pub fn walk_exprs<V: Visitor + ?Sized>(v: &mut V, exprs: &[Expr]) -> Flow {
    for e in exprs {
        walk_expr(v, e)?;
    }
    ControlFlow::Continue(())
}

fn walk_names<V: Visitor + ?Sized>(v: &mut V, names: &[NameRef]) -> Flow {
    for n in names {
        name_flow(v.visit_name(n))?;
    }
    ControlFlow::Continue(())
}

pub fn walk_query<V: Visitor + ?Sized>(v: &mut V, query: &Query) -> Flow {
    if let Some(f) = flow(v.enter_query(query)) {
        if f.is_continue() {
            v.leave_query(query);
        }
        return f;
    }
    match &query.body {
        QueryBody::Select(select) => walk_select(v, select)?,
        QueryBody::SetOp { left, right, .. } => {
            walk_query(v, left)?;
            walk_query(v, right)?;
        }
    }
    for ob in &query.order_by {
        if let SortKey::Expr(e) = &ob.key {
            walk_expr(v, e)?;
        }
    }
    if let Some(e) = &query.orderby_for {
        walk_expr(v, e)?;
    }
    if let Some(e) = &query.limit {
        walk_expr(v, e)?;
    }
    v.leave_query(query);
    ControlFlow::Continue(())
}

pub fn walk_select<V: Visitor + ?Sized>(v: &mut V, select: &Select) -> Flow {
    if let Some(f) = flow(v.enter_select(select)) {
        if f.is_continue() {
            v.leave_select(select);
        }
        return f;
    }
    for col in &select.list {
        walk_expr(v, &col.expr)?;
    }
    for spec in &select.from {
        walk_spec(v, spec)?;
    }
    walk_exprs(v, &select.where_clause)?;
    walk_exprs(v, &select.group_by)?;
    walk_exprs(v, &select.having)?;
    walk_exprs(v, &select.connect_by)?;
    walk_exprs(v, &select.start_with)?;
    walk_exprs(v, &select.after_cb_filter)?;
    walk_exprs(v, &select.check_where)?;
    for n in select.hints.names() {
        name_flow(v.visit_name(n))?;
    }
    walk_names(v, &select.using_index)?;
    v.leave_select(select);
    ControlFlow::Continue(())
}

pub fn walk_spec<V: Visitor + ?Sized>(v: &mut V, spec: &EntitySpec) -> Flow {
    if let Some(f) = flow(v.enter_spec(spec)) {
        if f.is_continue() {
            v.leave_spec(spec);
        }
        return f;
    }
    if let Some(q) = &spec.derived {
        walk_query(v, q)?;
    }
    for path in &spec.path_entities {
        walk_spec(v, path)?;
    }
    if let Some(e) = &spec.path_conjunct {
        walk_expr(v, e)?;
    }
    walk_exprs(v, &spec.on_cond)?;
    for n in spec.as_attr_list.iter().chain(spec.referenced_attrs.iter()) {
        name_flow(v.visit_spec_column(n))?;
    }
    v.leave_spec(spec);
    ControlFlow::Continue(())
}

fn walk_assignments<V: Visitor + ?Sized>(v: &mut V, items: &[Assignment]) -> Flow {
    for a in items {
        name_flow(v.visit_name(&a.target))?;
        walk_expr(v, &a.value)?;
    }
    ControlFlow::Continue(())
}

pub fn walk_statement<V: Visitor + ?Sized>(v: &mut V, stmt: &Statement) -> Flow {
    match stmt {
        Statement::Query(q) => walk_query(v, q),
        Statement::Update(u) => {
            for spec in &u.specs {
                walk_spec(v, spec)?;
            }
            walk_assignments(v, &u.assignments)?;
            walk_exprs(v, &u.where_clause)?;
            for c in &u.check_where {
                walk_exprs(v, &c.predicate)?;
            }
            for n in u.hints.names() {
                name_flow(v.visit_name(n))?;
            }
            walk_names(v, &u.using_index)
        }
        Statement::Insert(i) => {
            walk_spec(v, &i.spec)?;
            walk_names(v, &i.columns)?;
            match &i.source {
                InsertSource::Values(rows) => {
                    for row in rows {
                        walk_exprs(v, row)?;
                    }
                }
                InsertSource::DefaultValues => {}
                InsertSource::Query(q) => walk_query(v, q)?,
            }
            walk_assignments(v, &i.on_duplicate)?;
            walk_exprs(v, &i.check_where)
        }
        Statement::Delete(d) => {
            for spec in &d.specs {
                walk_spec(v, spec)?;
            }
            walk_exprs(v, &d.where_clause)?;
            for n in d.hints.names() {
                name_flow(v.visit_name(n))?;
            }
            walk_names(v, &d.using_index)
        }
        Statement::Merge(m) => {
            walk_spec(v, &m.target)?;
            walk_spec(v, &m.source)?;
            walk_exprs(v, &m.on)?;
            if let Some(up) = &m.update {
                walk_assignments(v, &up.assignments)?;
                walk_exprs(v, &up.where_clause)?;
            }
            if let Some(ins) = &m.insert {
                walk_names(v, &ins.columns)?;
                walk_exprs(v, &ins.values)?;
                walk_exprs(v, &ins.where_clause)?;
            }
            for c in &m.check_where {
                walk_exprs(v, &c.predicate)?;
            }
            ControlFlow::Continue(())
        }
    }
}

// ─── Walkable ────────────────────────────────────────────

/// 방문자로 순회할 수 있는 트리 노드
pub trait Walkable {
    fn walk<V: Visitor + ?Sized>(&self, v: &mut V) -> Flow;
    fn walk_mut<V: VisitorMut + ?Sized>(&mut self, v: &mut V) -> Flow;
}

impl Walkable for Expr {
    fn walk<V: Visitor + ?Sized>(&self, v: &mut V) -> Flow {
        walk_expr(v, self)
    }
    fn walk_mut<V: VisitorMut + ?Sized>(&mut self, v: &mut V) -> Flow {
        walk_expr_mut(v, self)
    }
}

impl Walkable for [Expr] {
    fn walk<V: Visitor + ?Sized>(&self, v: &mut V) -> Flow {
        walk_exprs(v, self)
    }
    fn walk_mut<V: VisitorMut + ?Sized>(&mut self, v: &mut V) -> Flow {
        walk_exprs_mut(v, self)
    }
}

impl Walkable for Query {
    fn walk<V: Visitor + ?Sized>(&self, v: &mut V) -> Flow {
        walk_query(v, self)
    }
    fn walk_mut<V: VisitorMut + ?Sized>(&mut self, v: &mut V) -> Flow {
        walk_query_mut(v, self)
    }
}

impl Walkable for Select {
    fn walk<V: Visitor + ?Sized>(&self, v: &mut V) -> Flow {
        walk_select(v, self)
    }
    fn walk_mut<V: VisitorMut + ?Sized>(&mut self, v: &mut V) -> Flow {
        walk_select_mut(v, self)
    }
}

impl Walkable for EntitySpec {
    fn walk<V: Visitor + ?Sized>(&self, v: &mut V) -> Flow {
        walk_spec(v, self)
    }
    fn walk_mut<V: VisitorMut + ?Sized>(&mut self, v: &mut V) -> Flow {
        walk_spec_mut(v, self)
    }
}

impl Walkable for Statement {
    fn walk<V: Visitor + ?Sized>(&self, v: &mut V) -> Flow {
        walk_statement(v, self)
    }
    fn walk_mut<V: VisitorMut + ?Sized>(&mut self, v: &mut V) -> Flow {
        walk_statement_mut(v, self)
    }
}

// ─── Predicates over expressions ─────────────────────────

/// 하위 질의 안으로 내려가지 않는 표현식 검색
struct Finder<F: FnMut(&Expr) -> bool> {
    pred: F,
    found: bool,
}

impl<F: FnMut(&Expr) -> bool> Visitor for Finder<F> {
    fn enter_expr(&mut self, expr: &Expr) -> Walk {
        if (self.pred)(expr) {
            self.found = true;
            return Walk::Stop;
        }
        Walk::Continue
    }

    fn enter_query(&mut self, _query: &Query) -> Walk {
        Walk::Skip
    }
}

/// 하위 질의를 제외하고 조건을 만족하는 노드가 있는지
pub fn expr_contains(expr: &Expr, pred: impl FnMut(&Expr) -> bool) -> bool {
    let mut finder = Finder { pred, found: false };
    let _ = walk_expr(&mut finder, expr);
    finder.found
}

pub fn is_aggregate_node(expr: &Expr) -> bool {
    matches!(
        expr,
        Expr::Function(FunctionCall {
            kind: FunctionKind::Aggregate,
            ..
        }) | Expr::Pseudo(PseudoColumn::GroupbyNum)
    )
}

pub fn contains_aggregate(expr: &Expr) -> bool {
    expr_contains(expr, is_aggregate_node)
}

pub fn contains_analytic(expr: &Expr) -> bool {
    expr_contains(expr, |e| {
        matches!(
            e,
            Expr::Function(FunctionCall {
                kind: FunctionKind::Analytic,
                ..
            })
        )
    })
}

/// 하위 질의/메서드/행 번호 의사 컬럼 포함 여부 (술어 이동 불가 판정)
pub fn contains_unpushable(expr: &Expr) -> bool {
    struct Unpushable {
        found: bool,
    }
    impl Visitor for Unpushable {
        fn enter_expr(&mut self, expr: &Expr) -> Walk {
            if matches!(
                expr,
                Expr::Subquery(_)
                    | Expr::Exists(_)
                    | Expr::InSubquery { .. }
                    | Expr::Method(_)
                    | Expr::Pseudo(_)
            ) {
                self.found = true;
                return Walk::Stop;
            }
            Walk::Continue
        }
    }
    let mut v = Unpushable { found: false };
    let _ = walk_expr(&mut v, expr);
    v.found
}

/// 표현식이 참조하는 모든 이름에 대해 수행 (하위 질의 포함)
pub fn for_each_name(expr: &Expr, f: impl FnMut(&NameRef)) {
    struct Names<F: FnMut(&NameRef)>(F);
    impl<F: FnMut(&NameRef)> Visitor for Names<F> {
        fn visit_name(&mut self, name: &NameRef) -> Walk {
            (self.0)(name);
            Walk::Continue
        }
    }
    let _ = walk_expr(&mut Names(f), expr);
}

/// 표현식이 참조하는 모든 이름을 변경 (하위 질의 포함)
pub fn for_each_name_mut(expr: &mut Expr, f: impl FnMut(&mut NameRef)) {
    struct Names<F: FnMut(&mut NameRef)>(F);
    impl<F: FnMut(&mut NameRef)> VisitorMut for Names<F> {
        fn visit_name(&mut self, name: &mut NameRef) -> Walk {
            (self.0)(name);
            Walk::Continue
        }
    }
    let _ = walk_expr_mut(&mut Names(f), expr);
}

/// 문장 전체의 이름을 변경
pub fn for_each_statement_name_mut(stmt: &mut Statement, f: impl FnMut(&mut NameRef)) {
    struct Names<F: FnMut(&mut NameRef)>(F);
    impl<F: FnMut(&mut NameRef)> VisitorMut for Names<F> {
        fn visit_name(&mut self, name: &mut NameRef) -> Walk {
            (self.0)(name);
            Walk::Continue
        }
    }
    let _ = walk_statement_mut(&mut Names(f), stmt);
}
