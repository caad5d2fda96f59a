//! 인메모리 카탈로그: 테스트와 임베딩용 SchemaProvider 구현

use super::{
    AttributeInfo, CheckOptionKind, ClassInfo, ClassKind, Privilege, SchemaProvider,
};
use crate::error::{VtxError, VtxResult};
use crate::types::{ClassId, DataType};
use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// DBA는 모든 클래스에 대해 모든 권한을 가진다
pub const DBA_USER: &str = "dba";

/// 인메모리 스키마 카탈로그
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    classes: AHashMap<ClassId, ClassInfo>,
    grants: AHashMap<(String, ClassId), Privilege>,
}

/// JSON 직렬화용 스냅샷
#[derive(Debug, Serialize, Deserialize)]
struct CatalogSnapshot {
    classes: Vec<ClassInfo>,
    #[serde(default)]
    grants: Vec<GrantEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GrantEntry {
    user: String,
    class: ClassId,
    privilege: Privilege,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// 클래스 추가 (같은 이름이 있으면 교체)
    pub fn with_class(mut self, builder: ClassBuilder) -> Self {
        self.add_class(builder.build());
        self
    }

    pub fn add_class(&mut self, class: ClassInfo) {
        self.classes.insert(class.id.clone(), class);
    }

    /// 권한 부여 (누적)
    pub fn with_grant(mut self, user: &str, class: &str, privilege: Privilege) -> Self {
        self.grant(user, class, privilege);
        self
    }

    pub fn grant(&mut self, user: &str, class: &str, privilege: Privilege) {
        let key = (user.to_lowercase(), ClassId::new(class));
        *self.grants.entry(key).or_default() |= privilege;
    }

    pub fn class_count(&self) -> usize {
        self.classes.len()
    }

    /// JSON 문자열에서 로드
    pub fn from_json(json: &str) -> VtxResult<Self> {
        let snapshot: CatalogSnapshot = serde_json::from_str(json)?;
        let mut catalog = Self::new();
        for class in snapshot.classes {
            catalog.add_class(class);
        }
        for entry in snapshot.grants {
            catalog.grant(&entry.user, entry.class.as_str(), entry.privilege);
        }
        Ok(catalog)
    }

    /// JSON 문자열로 변환 (클래스 이름순)
    pub fn to_json(&self) -> VtxResult<String> {
        let mut classes: Vec<ClassInfo> = self.classes.values().cloned().collect();
        classes.sort_by(|a, b| a.id.cmp(&b.id));
        let mut grants: Vec<GrantEntry> = self
            .grants
            .iter()
            .map(|((user, class), privilege)| GrantEntry {
                user: user.clone(),
                class: class.clone(),
                privilege: *privilege,
            })
            .collect();
        grants.sort_by(|a, b| (&a.user, &a.class).cmp(&(&b.user, &b.class)));
        Ok(serde_json::to_string_pretty(&CatalogSnapshot { classes, grants })?)
    }

    pub fn load_from_file(path: impl AsRef<Path>) -> VtxResult<Self> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn save_to_file(&self, path: impl AsRef<Path>) -> VtxResult<()> {
        fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// 조회 실패를 오류로 변환
    pub fn require(&self, id: &ClassId) -> VtxResult<&ClassInfo> {
        self.classes
            .get(id)
            .ok_or_else(|| VtxError::ClassNotFound(id.to_string()))
    }
}

impl SchemaProvider for InMemoryCatalog {
    fn class(&self, id: &ClassId) -> Option<&ClassInfo> {
        self.classes.get(id)
    }

    fn privileges(&self, user: &str, class: &ClassId) -> Privilege {
        if user.eq_ignore_ascii_case(DBA_USER) {
            return Privilege::ALL;
        }
        if let Some(info) = self.classes.get(class) {
            if info.owner.eq_ignore_ascii_case(user) {
                return Privilege::ALL;
            }
        }
        self.grants
            .get(&(user.to_lowercase(), class.clone()))
            .copied()
            .unwrap_or(Privilege::NONE)
    }

    fn is_subclass_of(&self, sub: &ClassId, sup: &ClassId) -> bool {
        let mut stack = vec![sub.clone()];
        let mut guard = 0usize;
        while let Some(current) = stack.pop() {
            guard += 1;
            if guard > self.classes.len() + 1 {
                break;
            }
            if let Some(info) = self.classes.get(&current) {
                for parent in &info.superclasses {
                    if parent == sup {
                        return true;
                    }
                    stack.push(parent.clone());
                }
            }
        }
        false
    }

    fn subclasses(&self, class: &ClassId) -> Vec<ClassId> {
        let mut subs: Vec<ClassId> = self
            .classes
            .keys()
            .filter(|candidate| *candidate != class && self.is_subclass_of(candidate, class))
            .cloned()
            .collect();
        subs.sort();
        subs
    }
}

/// 클래스 정의 빌더
#[derive(Debug, Clone)]
pub struct ClassBuilder {
    info: ClassInfo,
}

impl ClassBuilder {
    fn new(name: &str, kind: ClassKind) -> Self {
        Self {
            info: ClassInfo {
                id: ClassId::new(name),
                kind,
                owner: DBA_USER.to_string(),
                attributes: Vec::new(),
                methods: Vec::new(),
                class_methods: Vec::new(),
                query_specs: Vec::new(),
                check_option: CheckOptionKind::None,
                reuse_oid: false,
                system: false,
                superclasses: Vec::new(),
            },
        }
    }

    /// 실제 클래스
    pub fn real(name: &str) -> Self {
        Self::new(name, ClassKind::Real)
    }

    /// 가상 클래스(뷰)
    pub fn view(name: &str) -> Self {
        Self::new(name, ClassKind::Virtual)
    }

    pub fn owner(mut self, owner: &str) -> Self {
        self.info.owner = owner.to_lowercase();
        self
    }

    pub fn attr(mut self, name: &str, domain: DataType) -> Self {
        self.info.attributes.push(AttributeInfo::new(name, domain));
        self
    }

    pub fn shared_attr(mut self, name: &str, domain: DataType) -> Self {
        let mut attr = AttributeInfo::new(name, domain);
        attr.shared = true;
        self.info.attributes.push(attr);
        self
    }

    pub fn method(mut self, name: &str) -> Self {
        self.info.methods.push(name.to_string());
        self
    }

    pub fn class_method(mut self, name: &str) -> Self {
        self.info.class_methods.push(name.to_string());
        self
    }

    /// 뷰 본문 분기 추가
    pub fn query(mut self, sql: &str) -> Self {
        self.info.query_specs.push(sql.to_string());
        self
    }

    pub fn check_option(mut self, kind: CheckOptionKind) -> Self {
        self.info.check_option = kind;
        self
    }

    pub fn reuse_oid(mut self) -> Self {
        self.info.reuse_oid = true;
        self
    }

    pub fn system(mut self) -> Self {
        self.info.system = true;
        self
    }

    pub fn superclass(mut self, name: &str) -> Self {
        self.info.superclasses.push(ClassId::new(name));
        self
    }

    pub fn build(self) -> ClassInfo {
        self.info
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> InMemoryCatalog {
        InMemoryCatalog::new()
            .with_class(
                ClassBuilder::real("emp")
                    .owner("alice")
                    .attr("id", DataType::Integer)
                    .attr("name", DataType::Varchar),
            )
            .with_class(ClassBuilder::real("manager").superclass("emp"))
            .with_class(
                ClassBuilder::view("v_emp")
                    .owner("alice")
                    .attr("id", DataType::Integer)
                    .query("SELECT id FROM emp"),
            )
            .with_grant("bob", "v_emp", Privilege::SELECT)
    }

    #[test]
    fn test_privileges_owner_and_grants() {
        let catalog = sample();
        let emp = ClassId::new("emp");
        assert_eq!(catalog.privileges("alice", &emp), Privilege::ALL);
        assert_eq!(catalog.privileges("dba", &emp), Privilege::ALL);
        assert_eq!(catalog.privileges("bob", &emp), Privilege::NONE);
        assert_eq!(
            catalog.privileges("BOB", &ClassId::new("v_emp")),
            Privilege::SELECT
        );
    }

    #[test]
    fn test_subclasses() {
        let catalog = sample();
        let emp = ClassId::new("emp");
        assert!(catalog.is_subclass_of(&ClassId::new("manager"), &emp));
        assert_eq!(catalog.subclasses(&emp), vec![ClassId::new("manager")]);
        assert!(catalog.subclasses(&ClassId::new("manager")).is_empty());
    }

    #[test]
    fn test_json_roundtrip() {
        let catalog = sample();
        let json = catalog.to_json().unwrap();
        let loaded = InMemoryCatalog::from_json(&json).unwrap();
        assert_eq!(loaded.class_count(), 3);
        assert!(loaded.is_virtual(&ClassId::new("v_emp")));
        assert_eq!(
            loaded.privileges("bob", &ClassId::new("v_emp")),
            Privilege::SELECT
        );
    }

    #[test]
    fn test_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        sample().save_to_file(&path).unwrap();
        let loaded = InMemoryCatalog::load_from_file(&path).unwrap();
        assert!(loaded.require(&ClassId::new("emp")).is_ok());
        assert!(matches!(
            loaded.require(&ClassId::new("nope")),
            Err(VtxError::ClassNotFound(_))
        ));
    }
}
