//! 번역 엔진 AST
//!
//! 파서/바인더가 생성하고 재작성 단계가 변형하는 문장 트리.
//! 노드는 소유 트리(Box/Vec)로 표현되고, 이름 참조는 스펙을 식별자
//! ([`SpecId`])로만 약하게 가리킨다. 트리를 복사하면 식별자도 함께
//! 복사되므로, 치환 후에는 레지스트리가 새 식별자를 재발급한다.

mod display;
pub mod visit;

use crate::types::{ClassId, DataType, Value};
use smallvec::SmallVec;
use std::fmt;

pub use visit::{Visitor, VisitorMut, Walk, Walkable};

/// FROM 스펙 식별자: 세션 내 단조 증가 카운터로 발급
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SpecId(pub u64);

impl fmt::Display for SpecId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// 스펙 식별자 발급기
#[derive(Debug, Clone, Default)]
pub struct IdGenerator {
    next: u64,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self { next: 1 }
    }

    pub fn next_id(&mut self) -> SpecId {
        if self.next == 0 {
            self.next = 1;
        }
        let id = SpecId(self.next);
        self.next += 1;
        id
    }

    /// 지금까지 발급된 식별자 개수
    pub fn issued(&self) -> u64 {
        self.next.saturating_sub(1)
    }
}

// ─── Names ───────────────────────────────────────────────

/// 이름 참조의 의미 범주
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NameMeta {
    #[default]
    Normal,
    /// 메서드 이름
    Method,
    /// 힌트 인자로 쓰인 스펙 이름
    HintName,
    /// USING INDEX 인덱스 이름
    IndexName,
    /// 클래스 이름 자체
    Class,
    /// 공유 속성
    Shared,
    /// 인스턴스 식별자 (OID) 자리표시자
    Oid,
    /// 값 자리표시자 (역변환 템플릿)
    Parameter,
}

/// 속성/컬럼 이름 참조
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NameRef {
    pub name: String,
    /// 출력용 한정자 (범위 변수 또는 클래스 이름)
    pub resolved: Option<String>,
    /// 바인딩된 스펙 (약한 참조)
    pub spec_id: Option<SpecId>,
    pub meta: NameMeta,
    pub data_type: DataType,
}

impl NameRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// 스펙에 바인딩된 이름
    pub fn bound(name: impl Into<String>, spec_id: SpecId, resolved: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            resolved: Some(resolved.into()),
            spec_id: Some(spec_id),
            ..Default::default()
        }
    }

    /// 스펙의 OID 자리표시자
    pub fn oid(spec_id: SpecId, resolved: impl Into<String>, class: Option<ClassId>) -> Self {
        Self {
            name: String::new(),
            resolved: Some(resolved.into()),
            spec_id: Some(spec_id),
            meta: NameMeta::Oid,
            data_type: class.map(DataType::Object).unwrap_or_default(),
        }
    }

    pub fn with_type(mut self, data_type: DataType) -> Self {
        self.data_type = data_type;
        self
    }

    pub fn with_meta(mut self, meta: NameMeta) -> Self {
        self.meta = meta;
        self
    }

    pub fn is_oid(&self) -> bool {
        self.meta == NameMeta::Oid
    }

    pub fn is_method(&self) -> bool {
        self.meta == NameMeta::Method
    }

    /// 같은 스펙의 같은 속성을 가리키는지 (대소문자 무시)
    pub fn same_target(&self, other: &NameRef) -> bool {
        self.spec_id == other.spec_id
            && self.is_oid() == other.is_oid()
            && self.name.eq_ignore_ascii_case(&other.name)
    }

    /// 이름만 비교 (대소문자 무시)
    pub fn same_name(&self, other: &NameRef) -> bool {
        self.is_oid() == other.is_oid() && self.name.eq_ignore_ascii_case(&other.name)
    }
}

// ─── Expressions ─────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Plus,
    Minus,
    Multiply,
    Divide,
    Modulo,
    Concat,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    And,
    Or,
    Like,
}

impl BinaryOp {
    pub fn is_arithmetic(&self) -> bool {
        matches!(
            self,
            BinaryOp::Plus | BinaryOp::Minus | BinaryOp::Multiply | BinaryOp::Divide | BinaryOp::Modulo
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Minus,
    IsNull,
    IsNotNull,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionKind {
    Scalar,
    Aggregate,
    Analytic,
}

/// 분석 함수 윈도우
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Window {
    pub partition_by: Vec<Expr>,
    pub order_by: Vec<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCall {
    pub name: String,
    pub args: Vec<Expr>,
    pub kind: FunctionKind,
    pub distinct: bool,
    /// `count(*)`
    pub star: bool,
    pub over: Option<Box<Window>>,
}

impl FunctionCall {
    pub fn is_count_star(&self) -> bool {
        self.star && self.name.eq_ignore_ascii_case("count")
    }
}

/// 메서드 호출: 인스턴스 메서드는 대상 표현식을 가진다
#[derive(Debug, Clone, PartialEq)]
pub struct MethodCall {
    pub name: NameRef,
    pub target: Option<Box<Expr>>,
    pub args: Vec<Expr>,
    pub class_method: bool,
}

/// 행 번호 계열 의사 컬럼
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PseudoColumn {
    Rownum,
    InstNum,
    OrderbyNum,
    GroupbyNum,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Name(NameRef),
    Value(Value),
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        expr: Box<Expr>,
    },
    Function(FunctionCall),
    Method(MethodCall),
    /// 경로 탐색 `left.right`
    Dot {
        left: Box<Expr>,
        right: NameRef,
    },
    Subquery(Box<Query>),
    Exists(Box<Query>),
    InSubquery {
        expr: Box<Expr>,
        query: Box<Query>,
        negated: bool,
    },
    InList {
        expr: Box<Expr>,
        list: Vec<Expr>,
        negated: bool,
    },
    Between {
        expr: Box<Expr>,
        low: Box<Expr>,
        high: Box<Expr>,
        negated: bool,
    },
    /// 괄호: 치환 시 연산자 우선순위 보존
    Nested(Box<Expr>),
    Pseudo(PseudoColumn),
    /// 세션 변수 대입 `@v := expr`
    Assign {
        variable: String,
        value: Box<Expr>,
    },
    Variable(String),
    Sequence(Vec<Expr>),
    /// `*` 또는 `spec.*` (바인딩 전)
    Star(Option<String>),
}

impl Expr {
    pub fn name(name: NameRef) -> Self {
        Expr::Name(name)
    }

    pub fn int(v: i64) -> Self {
        Expr::Value(Value::Int(v))
    }

    pub fn text(s: impl Into<String>) -> Self {
        Expr::Value(Value::Text(s.into()))
    }

    pub fn null() -> Self {
        Expr::Value(Value::Null)
    }

    pub fn binary(op: BinaryOp, left: Expr, right: Expr) -> Self {
        Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn equals(left: Expr, right: Expr) -> Self {
        Expr::binary(BinaryOp::Eq, left, right)
    }

    pub fn as_name(&self) -> Option<&NameRef> {
        match self {
            Expr::Name(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_name_mut(&mut self) -> Option<&mut NameRef> {
        match self {
            Expr::Name(n) => Some(n),
            _ => None,
        }
    }

    pub fn is_null_value(&self) -> bool {
        matches!(self, Expr::Value(Value::Null))
    }

    pub fn is_constant(&self) -> bool {
        match self {
            Expr::Value(_) => true,
            Expr::Nested(inner) => inner.is_constant(),
            Expr::Unary {
                op: UnaryOp::Minus,
                expr,
            } => expr.is_constant(),
            _ => false,
        }
    }

    /// 단일 노드가 아닌 (괄호가 필요할 수 있는) 표현식
    pub fn is_compound(&self) -> bool {
        matches!(
            self,
            Expr::Binary { .. } | Expr::Unary { .. } | Expr::Between { .. } | Expr::InList { .. }
        )
    }

    pub fn is_query(&self) -> bool {
        matches!(self, Expr::Subquery(_))
    }

    /// 괄호를 모두 벗긴 표현식
    pub fn strip_nested(&self) -> &Expr {
        match self {
            Expr::Nested(inner) => inner.strip_nested(),
            other => other,
        }
    }

    /// 결합 조건 리스트를 AND 트리로
    pub fn and_all(conjuncts: Vec<Expr>) -> Option<Expr> {
        conjuncts
            .into_iter()
            .reduce(|acc, term| Expr::binary(BinaryOp::And, acc, term))
    }

    /// AND 트리를 결합 조건 리스트로 (CNF 최상위)
    pub fn into_conjuncts(self) -> Vec<Expr> {
        let mut out = Vec::new();
        fn split(expr: Expr, out: &mut Vec<Expr>) {
            match expr {
                Expr::Binary {
                    op: BinaryOp::And,
                    left,
                    right,
                } => {
                    split(*left, out);
                    split(*right, out);
                }
                Expr::Nested(inner)
                    if matches!(
                        inner.as_ref(),
                        Expr::Binary {
                            op: BinaryOp::And,
                            ..
                        }
                    ) =>
                {
                    split(*inner, out)
                }
                other => out.push(other),
            }
        }
        split(self, &mut out);
        out
    }
}

// ─── Queries ─────────────────────────────────────────────

/// SELECT 리스트 항목
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub expr: Expr,
    pub alias: Option<String>,
    /// 정렬에만 필요한 숨은 컬럼
    pub hidden: bool,
}

impl Column {
    pub fn new(expr: Expr) -> Self {
        Self {
            expr,
            alias: None,
            hidden: false,
        }
    }

    pub fn aliased(expr: Expr, alias: impl Into<String>) -> Self {
        Self {
            expr,
            alias: Some(alias.into()),
            hidden: false,
        }
    }

    /// 외부에 노출되는 컬럼 이름
    pub fn output_name(&self) -> Option<&str> {
        if let Some(alias) = &self.alias {
            return Some(alias);
        }
        match self.expr.strip_nested() {
            Expr::Name(n) if !n.is_oid() => Some(&n.name),
            Expr::Dot { right, .. } => Some(&right.name),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SortKey {
    /// SELECT 리스트 위치 (1부터)
    Position(usize),
    Expr(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    pub key: SortKey,
    pub asc: bool,
}

impl OrderBy {
    pub fn position(pos: usize) -> Self {
        Self {
            key: SortKey::Position(pos),
            asc: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOperator {
    Union,
    Difference,
    Intersection,
}

#[derive(Debug, Clone, PartialEq)]
pub enum QueryBody {
    Select(Box<Select>),
    SetOp {
        op: SetOperator,
        left: Box<Query>,
        right: Box<Query>,
    },
}

/// SELECT 또는 집합 연산 질의
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub body: QueryBody,
    /// SELECT DISTINCT / UNION (ALL 아님)
    pub distinct: bool,
    pub order_by: Vec<OrderBy>,
    /// `ORDER BY ... FOR orderby_num() ...`
    pub orderby_for: Option<Expr>,
    pub limit: Option<Expr>,
    /// 바깥 질의 기준 상관 깊이 (0 = 비상관)
    pub correlation_level: u32,
    pub is_subquery: bool,
    /// 뷰 스펙을 감싼 파생 질의
    pub vspec_as_derived: bool,
    /// 재작성기가 생성한 OID 포함 파생 질의
    pub oids_included: bool,
    /// 뷰 정의 본문
    pub is_view_spec: bool,
}

impl Query {
    pub fn from_select(select: Select) -> Self {
        Self::with_body(QueryBody::Select(Box::new(select)))
    }

    pub fn set_op(op: SetOperator, left: Query, right: Query, distinct: bool) -> Self {
        let mut query = Self::with_body(QueryBody::SetOp {
            op,
            left: Box::new(left),
            right: Box::new(right),
        });
        query.distinct = distinct;
        query
    }

    fn with_body(body: QueryBody) -> Self {
        Self {
            body,
            distinct: false,
            order_by: Vec::new(),
            orderby_for: None,
            limit: None,
            correlation_level: 0,
            is_subquery: false,
            vspec_as_derived: false,
            oids_included: false,
            is_view_spec: false,
        }
    }

    pub fn as_select(&self) -> Option<&Select> {
        match &self.body {
            QueryBody::Select(s) => Some(s),
            QueryBody::SetOp { .. } => None,
        }
    }

    pub fn as_select_mut(&mut self) -> Option<&mut Select> {
        match &mut self.body {
            QueryBody::Select(s) => Some(s),
            QueryBody::SetOp { .. } => None,
        }
    }

    pub fn is_select(&self) -> bool {
        matches!(self.body, QueryBody::Select(_))
    }

    /// 첫 SELECT 분기의 리스트 (집합 연산이면 왼쪽 끝)
    pub fn leading_select(&self) -> &Select {
        match &self.body {
            QueryBody::Select(s) => s,
            QueryBody::SetOp { left, .. } => left.leading_select(),
        }
    }

    /// 모든 SELECT 분기에 대해 수행
    pub fn for_each_select_mut(&mut self, f: &mut dyn FnMut(&mut Select)) {
        match &mut self.body {
            QueryBody::Select(s) => f(s),
            QueryBody::SetOp { left, right, .. } => {
                left.for_each_select_mut(f);
                right.for_each_select_mut(f);
            }
        }
    }

    /// 집계 질의인지: GROUP BY/HAVING 또는 SELECT 리스트의 집계 함수
    pub fn has_aggregate(&self) -> bool {
        match &self.body {
            QueryBody::Select(s) => s.has_aggregate(),
            QueryBody::SetOp { .. } => false,
        }
    }

    pub fn has_analytic(&self) -> bool {
        match &self.body {
            QueryBody::Select(s) => s.list.iter().any(|c| visit::contains_analytic(&c.expr)),
            QueryBody::SetOp { left, right, .. } => left.has_analytic() || right.has_analytic(),
        }
    }
}

/// 최적화기 힌트 플래그
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HintFlags(u8);

impl HintFlags {
    pub const NONE: HintFlags = HintFlags(0);
    pub const ORDERED: HintFlags = HintFlags(1);
    pub const USE_NL: HintFlags = HintFlags(1 << 1);
    pub const USE_IDX: HintFlags = HintFlags(1 << 2);
    pub const USE_MERGE: HintFlags = HintFlags(1 << 3);

    pub fn contains(self, other: HintFlags) -> bool {
        self.0 & other.0 == other.0 && other.0 != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl std::ops::BitOr for HintFlags {
    type Output = HintFlags;
    fn bitor(self, rhs: Self) -> Self::Output {
        HintFlags(self.0 | rhs.0)
    }
}

impl std::ops::BitOrAssign for HintFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// 조인 순서/방식 힌트
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Hints {
    pub flags: HintFlags,
    pub ordered: Vec<NameRef>,
    pub use_nl: Vec<NameRef>,
    pub use_idx: Vec<NameRef>,
    pub use_merge: Vec<NameRef>,
}

impl Hints {
    /// 다른 힌트 집합을 병합
    pub fn merge(&mut self, other: &Hints) {
        self.flags |= other.flags;
        self.ordered.extend(other.ordered.iter().cloned());
        self.use_nl.extend(other.use_nl.iter().cloned());
        self.use_idx.extend(other.use_idx.iter().cloned());
        self.use_merge.extend(other.use_merge.iter().cloned());
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }

    pub fn names_mut(&mut self) -> impl Iterator<Item = &mut NameRef> {
        self.ordered
            .iter_mut()
            .chain(self.use_nl.iter_mut())
            .chain(self.use_idx.iter_mut())
            .chain(self.use_merge.iter_mut())
    }

    pub fn names(&self) -> impl Iterator<Item = &NameRef> {
        self.ordered
            .iter()
            .chain(self.use_nl.iter())
            .chain(self.use_idx.iter())
            .chain(self.use_merge.iter())
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Select {
    pub list: Vec<Column>,
    pub from: Vec<EntitySpec>,
    /// WHERE 결합 조건 (CNF)
    pub where_clause: Vec<Expr>,
    pub group_by: Vec<Expr>,
    pub having: Vec<Expr>,
    pub connect_by: Vec<Expr>,
    pub start_with: Vec<Expr>,
    pub after_cb_filter: Vec<Expr>,
    /// WITH CHECK OPTION 술어
    pub check_where: Vec<Expr>,
    pub hints: Hints,
    pub using_index: Vec<NameRef>,
}

impl Select {
    pub fn has_aggregate(&self) -> bool {
        !self.group_by.is_empty()
            || !self.having.is_empty()
            || self.list.iter().any(|c| visit::contains_aggregate(&c.expr))
    }

    pub fn is_hierarchical(&self) -> bool {
        !self.connect_by.is_empty()
    }

    pub fn has_outer_join(&self) -> bool {
        self.from.iter().any(|s| s.join_type.is_outer())
    }

    pub fn spec(&self, id: SpecId) -> Option<&EntitySpec> {
        self.from.iter().find(|s| s.id == id)
    }
}

// ─── Entity specs ────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JoinType {
    #[default]
    None,
    Inner,
    LeftOuter,
    RightOuter,
}

impl JoinType {
    pub fn is_outer(&self) -> bool {
        matches!(self, JoinType::LeftOuter | JoinType::RightOuter)
    }
}

/// 경로 스펙의 조인 성격
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PathKind {
    /// 참조가 NULL이어도 부모 행 유지
    #[default]
    Outer,
    Inner,
}

/// FROM 리스트 테이블 참조
#[derive(Debug, Clone, PartialEq)]
pub struct EntitySpec {
    pub id: SpecId,
    pub range_var: String,
    /// 후보 클래스 (평탄화된 클래스 + 하위 클래스)
    pub entities: SmallVec<[ClassId; 2]>,
    /// 파생 테이블 본문
    pub derived: Option<Box<Query>>,
    /// 바깥에 노출되는 컬럼 (파생 테이블)
    pub as_attr_list: Vec<NameRef>,
    /// 문장에서 참조된 속성 (요청 시 계산)
    pub referenced_attrs: Vec<NameRef>,
    /// 경로 하위 스펙
    pub path_entities: Vec<EntitySpec>,
    /// 부모와의 경로 조인 항 `parent.attr = this.oid`
    pub path_conjunct: Option<Expr>,
    pub path_kind: PathKind,
    pub join_type: JoinType,
    pub on_cond: Vec<Expr>,
}

impl EntitySpec {
    /// 클래스 스펙
    pub fn new_class(id: SpecId, class: impl Into<ClassId>, range_var: impl Into<String>) -> Self {
        let mut entities = SmallVec::new();
        entities.push(class.into());
        Self {
            id,
            range_var: range_var.into(),
            entities,
            derived: None,
            as_attr_list: Vec::new(),
            referenced_attrs: Vec::new(),
            path_entities: Vec::new(),
            path_conjunct: None,
            path_kind: PathKind::Outer,
            join_type: JoinType::None,
            on_cond: Vec::new(),
        }
    }

    /// 파생 테이블 스펙
    pub fn new_derived(id: SpecId, query: Query, range_var: impl Into<String>) -> Self {
        let mut spec = Self::new_class(id, ClassId::new(""), range_var);
        spec.entities.clear();
        spec.derived = Some(Box::new(query));
        spec
    }

    pub fn is_derived(&self) -> bool {
        self.derived.is_some()
    }

    pub fn first_entity(&self) -> Option<&ClassId> {
        self.entities.first()
    }

    /// 경로 조인 항의 왼쪽(부모 속성)
    pub fn path_join_left(&self) -> Option<&Expr> {
        match self.path_conjunct.as_ref()? {
            Expr::Binary { left, .. } => Some(left),
            _ => None,
        }
    }

    pub fn path_join_left_mut(&mut self) -> Option<&mut Expr> {
        match self.path_conjunct.as_mut()? {
            Expr::Binary { left, .. } => Some(left),
            _ => None,
        }
    }
}

/// 스펙 목록(경로 하위 스펙 포함)에서 식별자로 검색
pub fn find_spec(specs: &[EntitySpec], id: SpecId) -> Option<&EntitySpec> {
    for spec in specs {
        if spec.id == id {
            return Some(spec);
        }
        if let Some(found) = find_spec(&spec.path_entities, id) {
            return Some(found);
        }
    }
    None
}

pub fn find_spec_mut(specs: &mut [EntitySpec], id: SpecId) -> Option<&mut EntitySpec> {
    for spec in specs {
        if spec.id == id {
            return Some(spec);
        }
        if let Some(found) = find_spec_mut(&mut spec.path_entities, id) {
            return Some(found);
        }
    }
    None
}

// ─── Statements ──────────────────────────────────────────

/// UPDATE SET 항목 / ON DUPLICATE KEY UPDATE 항목
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub target: NameRef,
    pub value: Expr,
}

/// 스펙별 WITH CHECK OPTION 술어
#[derive(Debug, Clone, PartialEq)]
pub struct CheckOption {
    pub spec_id: SpecId,
    pub predicate: Vec<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Update {
    pub specs: Vec<EntitySpec>,
    pub assignments: Vec<Assignment>,
    pub where_clause: Vec<Expr>,
    pub check_where: Vec<CheckOption>,
    pub hints: Hints,
    pub using_index: Vec<NameRef>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum InsertSource {
    Values(Vec<Vec<Expr>>),
    DefaultValues,
    Query(Box<Query>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Insert {
    pub spec: EntitySpec,
    pub columns: Vec<NameRef>,
    pub source: InsertSource,
    pub on_duplicate: Vec<Assignment>,
    pub is_replace: bool,
    pub check_where: Vec<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Delete {
    pub specs: Vec<EntitySpec>,
    pub where_clause: Vec<Expr>,
    pub hints: Hints,
    pub using_index: Vec<NameRef>,
}

/// MERGE WHEN MATCHED THEN UPDATE [DELETE WHERE]
#[derive(Debug, Clone, PartialEq)]
pub struct MergeUpdate {
    pub assignments: Vec<Assignment>,
    pub where_clause: Vec<Expr>,
    /// WHEN MATCHED THEN DELETE (조건 포함)
    pub delete: bool,
}

/// MERGE WHEN NOT MATCHED THEN INSERT
#[derive(Debug, Clone, PartialEq)]
pub struct MergeInsert {
    pub columns: Vec<NameRef>,
    pub values: Vec<Expr>,
    pub where_clause: Vec<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Merge {
    pub target: EntitySpec,
    pub source: EntitySpec,
    pub on: Vec<Expr>,
    pub update: Option<MergeUpdate>,
    pub insert: Option<MergeInsert>,
    pub check_where: Vec<CheckOption>,
}

/// 번역 가능한 문장
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Query(Query),
    Update(Update),
    Insert(Insert),
    Delete(Delete),
    Merge(Merge),
}

impl Statement {
    pub fn kind(&self) -> &'static str {
        match self {
            Statement::Query(q) if q.is_select() => "SELECT",
            Statement::Query(_) => "SET OPERATION",
            Statement::Update(_) => "UPDATE",
            Statement::Insert(_) => "INSERT",
            Statement::Delete(_) => "DELETE",
            Statement::Merge(_) => "MERGE",
        }
    }

    pub fn as_query(&self) -> Option<&Query> {
        match self {
            Statement::Query(q) => Some(q),
            _ => None,
        }
    }

    /// 문장의 최상위 스펙 목록
    pub fn specs(&self) -> Vec<&EntitySpec> {
        match self {
            Statement::Query(q) => match &q.body {
                QueryBody::Select(s) => s.from.iter().collect(),
                QueryBody::SetOp { .. } => Vec::new(),
            },
            Statement::Update(u) => u.specs.iter().collect(),
            Statement::Insert(i) => vec![&i.spec],
            Statement::Delete(d) => d.specs.iter().collect(),
            Statement::Merge(m) => vec![&m.target, &m.source],
        }
    }
}

#[cfg(test)]
mod tests;
