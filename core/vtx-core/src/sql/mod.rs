//! SQL 프런트엔드
//!
//! 파서(sqlparser-rs 래퍼) → AST 변환 → 바인더. 번역 엔진은 바인딩된
//! 엔진 AST만 다룬다.

pub mod ast;
pub mod binder;
pub mod lower;
pub mod parser;

pub use binder::Binder;
pub use parser::SqlParser;
