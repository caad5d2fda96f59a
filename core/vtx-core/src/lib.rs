//! # VTX - View Translation Engine
//!
//! VTX는 가상 클래스(뷰)를 참조하는 SQL 문장을 실제 클래스만 참조하는
//! 동등한 문장으로 재작성하는 엔진입니다. 조회는 뷰 본문을 인라인하거나
//! 파생 테이블로 감싸고, 쓰기(UPDATE/INSERT/DELETE/MERGE)는 뷰 컬럼 정의를
//! 역변환해 실제 컬럼에 대한 쓰기로 바꿉니다.
//!
//! ## 주요 특징
//!
//! - **인라인 / 파생 테이블 결정**: 집계, DISTINCT, 외부 조인, 계층 질의 뷰는 파생 테이블로
//! - **쓰기 역변환**: `sal * 12` 같은 선형 컬럼에 대한 대입을 실제 컬럼 값으로
//! - **갱신 가능성 분류**: Updatable / PartiallyUpdatable / NotUpdatable
//! - **권한 검사**: 뷰 소유자 기준 권한 마스크와 요청자 권한
//! - **순환 감지**: 진행 중인 뷰 스택으로 순환 정의 거부
//! - **경로 표현식**: `e.dept.name`이 뷰를 지나면 실제 클래스로 확장
//!
//! ## 빠른 시작
//!
//! ```rust
//! use vtx_core::catalog::{ClassBuilder, InMemoryCatalog};
//! use vtx_core::types::DataType;
//! use vtx_core::ViewTranslator;
//!
//! # fn main() -> vtx_core::VtxResult<()> {
//! let catalog = InMemoryCatalog::new()
//!     .with_class(
//!         ClassBuilder::real("emp")
//!             .attr("id", DataType::Integer)
//!             .attr("name", DataType::Varchar)
//!             .attr("dept", DataType::Integer),
//!     )
//!     .with_class(
//!         ClassBuilder::view("v_emp")
//!             .attr("id", DataType::Integer)
//!             .attr("name", DataType::Varchar)
//!             .query("SELECT id, name FROM emp WHERE dept = 1"),
//!     );
//!
//! let mut translator = ViewTranslator::new(&catalog);
//! let out = translator.translate_sql("SELECT name FROM v_emp WHERE id > 10")?;
//! assert!(out.to_string().contains("FROM emp"));
//! # Ok(())
//! # }
//! ```
//!
//! ## 번역 파이프라인
//!
//! ```text
//! SQL 문자열 → SqlParser → AST → Binder → ViewTranslator
//!          → (인라인 | 파생 테이블 | 역변환) → 정규화 패스 → 실제 클래스 문장
//! ```
//!
//! ## 모듈 구조
//!
//! - [`catalog`]: 스키마 제공자 경계와 메모리 카탈로그
//! - [`sql`]: 파서, AST, 바인더
//! - [`rewrite`]: 뷰 번역 엔진 ([`ViewTranslator`])
//! - [`eval`]: 실제 객체에 대한 표현식 평가
//! - [`config`]: 번역기 설정과 기능 플래그

pub mod catalog;
pub mod config;
pub mod error;
pub mod eval;
pub mod rewrite;
pub mod sql;
pub mod types;

// Logging utilities
pub mod logging;

// Re-export commonly used types
pub use catalog::{InMemoryCatalog, ObjectRow, Privilege, SchemaProvider};
pub use config::{FeatureFlags, RewriteFeature, TranslatorConfig};
pub use error::{VtxError, VtxResult};
pub use rewrite::{TranslatedStatement, Updatability, ViewTranslator};
pub use types::{ClassId, DataType, Value};
