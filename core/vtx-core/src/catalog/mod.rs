//! 스키마 카탈로그 경계
//!
//! 번역 엔진은 [`SchemaProvider`]를 통해서만 클래스 정의, 뷰 본문 문자열,
//! 권한 정보를 얻는다. [`InMemoryCatalog`]는 테스트와 임베딩용 구현이다.

mod memory;
mod privilege;

pub use memory::{ClassBuilder, InMemoryCatalog};
pub use privilege::Privilege;

use crate::types::{ClassId, DataType, Value};
use ahash::AHashMap;
use serde::{Deserialize, Serialize};

/// 클래스 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ClassKind {
    /// 실제 저장소를 가진 클래스
    #[default]
    Real,
    /// 저장된 질의로 정의된 가상 클래스(뷰)
    Virtual,
}

/// WITH CHECK OPTION 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CheckOptionKind {
    #[default]
    None,
    Local,
    Cascaded,
}

/// 속성 정의
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeInfo {
    pub name: String,
    pub domain: DataType,
    /// 공유 속성 (클래스 단위로 하나의 값)
    #[serde(default)]
    pub shared: bool,
}

impl AttributeInfo {
    pub fn new(name: impl Into<String>, domain: DataType) -> Self {
        Self {
            name: name.into(),
            domain,
            shared: false,
        }
    }
}

/// 클래스 정의
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassInfo {
    pub id: ClassId,
    #[serde(default)]
    pub kind: ClassKind,
    pub owner: String,
    #[serde(default)]
    pub attributes: Vec<AttributeInfo>,
    /// 인스턴스 메서드 이름
    #[serde(default)]
    pub methods: Vec<String>,
    /// 클래스 메서드 이름
    #[serde(default)]
    pub class_methods: Vec<String>,
    /// 뷰 본문: UNION 분기마다 하나의 SELECT 문자열
    #[serde(default)]
    pub query_specs: Vec<String>,
    #[serde(default)]
    pub check_option: CheckOptionKind,
    /// OID 재사용 클래스 (뷰를 통한 갱신 불가)
    #[serde(default)]
    pub reuse_oid: bool,
    /// 시스템 클래스
    #[serde(default)]
    pub system: bool,
    #[serde(default)]
    pub superclasses: Vec<ClassId>,
}

impl ClassInfo {
    pub fn is_virtual(&self) -> bool {
        self.kind == ClassKind::Virtual
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeInfo> {
        self.attributes
            .iter()
            .find(|a| a.name.eq_ignore_ascii_case(name))
    }

    pub fn has_method(&self, name: &str) -> bool {
        self.methods.iter().any(|m| m.eq_ignore_ascii_case(name))
    }

    pub fn has_class_method(&self, name: &str) -> bool {
        self.class_methods.iter().any(|m| m.eq_ignore_ascii_case(name))
    }
}

/// 스키마 관리자 경계
pub trait SchemaProvider {
    /// 클래스 정의 조회
    fn class(&self, id: &ClassId) -> Option<&ClassInfo>;

    /// 사용자가 클래스에 대해 가진 권한
    fn privileges(&self, user: &str, class: &ClassId) -> Privilege;

    /// `sub`가 `sup`의 (직간접) 하위 클래스인지
    fn is_subclass_of(&self, _sub: &ClassId, _sup: &ClassId) -> bool {
        false
    }

    /// 클래스와 모든 하위 클래스 (FROM 절 후보 목록)
    fn subclasses(&self, _class: &ClassId) -> Vec<ClassId> {
        Vec::new()
    }

    fn is_virtual(&self, id: &ClassId) -> bool {
        self.class(id).is_some_and(ClassInfo::is_virtual)
    }
}

/// 실제 클래스의 인스턴스 한 행
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectRow {
    pub class: ClassId,
    pub oid: u64,
    pub values: AHashMap<String, Value>,
}

impl ObjectRow {
    pub fn new(class: impl Into<ClassId>, oid: u64) -> Self {
        Self {
            class: class.into(),
            oid,
            values: AHashMap::new(),
        }
    }

    pub fn with(mut self, attr: &str, value: Value) -> Self {
        self.values.insert(attr.to_lowercase(), value);
        self
    }

    pub fn get(&self, attr: &str) -> Option<&Value> {
        self.values.get(&attr.to_lowercase())
    }

    pub fn identity(&self) -> Value {
        Value::Object {
            class: self.class.clone(),
            oid: self.oid,
        }
    }
}
