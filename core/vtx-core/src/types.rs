//! 도메인 타입과 값
//!
//! 카탈로그, AST, 평가기가 공유하는 기본 타입.

use serde::{Deserialize, Serialize};
use std::fmt;

/// 클래스 식별자: 대소문자를 구분하지 않으므로 소문자로 정규화
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct ClassId(String);

impl ClassId {
    pub fn new(name: impl AsRef<str>) -> Self {
        ClassId(name.as_ref().to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for ClassId {
    fn from(value: String) -> Self {
        ClassId::new(value)
    }
}

impl From<&str> for ClassId {
    fn from(value: &str) -> Self {
        ClassId::new(value)
    }
}

impl From<ClassId> for String {
    fn from(value: ClassId) -> Self {
        value.0
    }
}

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 속성/표현식의 도메인
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DataType {
    Integer,
    Double,
    Varchar,
    Boolean,
    /// 다른 클래스 인스턴스에 대한 참조
    Object(ClassId),
    Sequence,
    #[default]
    Unknown,
}

impl DataType {
    pub fn object_class(&self) -> Option<&ClassId> {
        match self {
            DataType::Object(class) => Some(class),
            _ => None,
        }
    }
}

/// 리터럴 값
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Int(i64),
    Float(f64),
    Text(String),
    Bool(bool),
    Null,
    /// 인스턴스 식별자 (OID)
    Object { class: ClassId, oid: u64 },
    Sequence(Vec<Value>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn data_type(&self) -> DataType {
        match self {
            Value::Int(_) => DataType::Integer,
            Value::Float(_) => DataType::Double,
            Value::Text(_) => DataType::Varchar,
            Value::Bool(_) => DataType::Boolean,
            Value::Null => DataType::Unknown,
            Value::Object { class, .. } => DataType::Object(class.clone()),
            Value::Sequence(_) => DataType::Sequence,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v:?}"),
            Value::Text(s) => write!(f, "'{}'", s.replace('\'', "''")),
            Value::Bool(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            Value::Null => write!(f, "NULL"),
            Value::Object { class, oid } => write!(f, "@{class}|{oid}"),
            Value::Sequence(items) => {
                write!(f, "{{")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "}}")
            }
        }
    }
}
