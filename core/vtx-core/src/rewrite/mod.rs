//! 뷰 재작성 엔진
//!
//! 가상 클래스(뷰)를 참조하는 문장을 실제 클래스만 참조하는 동등한 문장으로
//! 바꾼다. [`ViewTranslator`]가 진입점이며, 하위 모듈은 다음을 담당한다.
//!
//! - `registry`: 스펙 식별자 재발급, 범위 변수 충돌 해소, 참조 속성 계산
//! - `lambda`: 자리표시자 이름 → 표현식 치환
//! - `updatable`, `invert`: 갱신 가능성 분류와 쓰기 역변환
//! - `view_cache`: 뷰 본문 컴파일/캐시, 순환 감지, 권한 계산
//! - `decision`, `copy_push`: 인라인/파생 테이블 결정과 술어 복사
//! - `translate`, `dml`, `paths`: 문장 종류별 번역과 경로 확장
//! - `aggregate`, `order_dependent`: SELECT 단위 정규화 패스

mod aggregate;
mod api;
mod context;
mod copy_push;
pub mod correlation;
mod decision;
mod dml;
pub mod invert;
pub mod lambda;
mod order_dependent;
mod paths;
pub mod registry;
mod translate;
pub mod updatable;
mod view_cache;


use crate::catalog::SchemaProvider;
use crate::error::VtxResult;
use crate::sql::ast::{IdGenerator, Query};

pub use aggregate::AggregateHoistPass;
pub use context::{TranslatedStatement, ViewTranslator};
pub use order_dependent::OrderDependentPass;
pub use updatable::Updatability;
pub use view_cache::ViewDefinition;

/// 정규화 패스가 공유하는 번역 상태
pub struct PassContext<'c> {
    pub schema: &'c dyn SchemaProvider,
    pub ids: &'c mut IdGenerator,
}

/// SELECT 단위 재작성 패스 트레이트
///
/// 패스는 질의 한 단계에만 적용된다. 하위 질의는 번역기가 후위 순회로
/// 먼저 처리한다.
pub trait RewritePass: Send + Sync {
    /// 패스 이름
    fn name(&self) -> &str;

    /// 질의에 패스 적용
    fn apply(&self, query: Query, cx: &mut PassContext<'_>) -> VtxResult<Query>;
}

/// 정규화 패스 목록
pub struct QueryNormalizer {
    passes: Vec<Box<dyn RewritePass>>,
}

impl QueryNormalizer {
    /// 기본 패스(집계 분리, 순서 의존 표현식 분리)로 생성
    pub fn new() -> Self {
        Self {
            passes: vec![Box::new(AggregateHoistPass), Box::new(OrderDependentPass)],
        }
    }

    /// 빈 패스 목록
    pub fn empty() -> Self {
        Self { passes: Vec::new() }
    }

    pub fn with_pass(mut self, pass: Box<dyn RewritePass>) -> Self {
        self.passes.push(pass);
        self
    }

    pub fn pass_names(&self) -> Vec<&str> {
        self.passes.iter().map(|p| p.name()).collect()
    }

    /// 모든 패스를 순서대로 적용
    pub fn normalize(&self, query: Query, cx: &mut PassContext<'_>) -> VtxResult<Query> {
        let mut normalized = query;
        for pass in &self.passes {
            normalized = pass.apply(normalized, cx)?;
        }
        Ok(normalized)
    }
}

impl Default for QueryNormalizer {
    fn default() -> Self {
        Self::new()
    }
}
