//! 번역기 설정
//!
//! JSON 파일로 저장/로드할 수 있는 세션 단위 설정과 재작성 Feature Flag.

mod feature_flags;

pub use feature_flags::{FeatureFlags, RewriteFeature};

use crate::error::VtxResult;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// 진행 중 뷰 스택의 기본 한도
pub const DEFAULT_MAX_VIEW_DEPTH: usize = 300;

/// 번역기 설정
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslatorConfig {
    /// 동시에 컴파일 중일 수 있는 뷰의 최대 개수 (순환 감지 스택 한도)
    pub max_view_depth: usize,

    /// 요청자 미지정 시 사용하는 사용자
    pub default_user: String,

    /// Feature 이름 → 활성 여부
    pub features: HashMap<String, bool>,
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            max_view_depth: DEFAULT_MAX_VIEW_DEPTH,
            default_user: "dba".to_string(),
            features: FeatureFlags::with_defaults().to_map(),
        }
    }
}

impl TranslatorConfig {
    /// JSON 파일에서 로드
    pub fn load_from_file(path: impl AsRef<Path>) -> VtxResult<Self> {
        let json = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    /// JSON 파일로 저장
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> VtxResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// 설정의 Feature 맵에 환경 변수 오버라이드를 적용한 Flag 집합
    pub fn feature_flags(&self) -> FeatureFlags {
        let flags = FeatureFlags::new();
        flags.apply_map(&self.features);
        flags.load_from_env();
        flags
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TranslatorConfig::default();
        assert_eq!(config.max_view_depth, 300);
        assert_eq!(config.default_user, "dba");
        assert_eq!(config.features.get("copy_push_terms"), Some(&true));
    }

    #[test]
    fn test_config_roundtrip_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vtx.json");

        let mut config = TranslatorConfig::default();
        config.max_view_depth = 16;
        config.default_user = "alice".to_string();
        config.save_to_file(&path).unwrap();

        let loaded = TranslatorConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: TranslatorConfig = serde_json::from_str(r#"{"max_view_depth": 8}"#).unwrap();
        assert_eq!(config.max_view_depth, 8);
        assert_eq!(config.default_user, "dba");
    }

    #[test]
    fn test_feature_flags_from_config() {
        let mut config = TranslatorConfig::default();
        config.features.insert("copy_push_terms".to_string(), false);
        let flags = config.feature_flags();
        assert!(!flags.is_enabled(RewriteFeature::CopyPushTerms));
    }
}
