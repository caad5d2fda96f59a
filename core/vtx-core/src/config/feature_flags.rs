// 재작성 Feature Flag
//
// 결과 의미에 영향을 주지 않는 재작성 단계만 플래그로 제어한다.

use crate::error::VtxResult;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

/// 재작성 Feature 정의
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RewriteFeature {
    /// 외부 WHERE 항을 파생 테이블 내부로 복사
    CopyPushTerms,

    /// 재작성된 SQL을 debug 레벨로 기록
    TraceRewrites,
}

impl RewriteFeature {
    pub const ALL: [RewriteFeature; 2] = [RewriteFeature::CopyPushTerms, RewriteFeature::TraceRewrites];

    /// Feature를 문자열로 변환
    pub fn as_str(&self) -> &'static str {
        match self {
            RewriteFeature::CopyPushTerms => "copy_push_terms",
            RewriteFeature::TraceRewrites => "trace_rewrites",
        }
    }

    /// 문자열에서 Feature 파싱
    pub fn parse_feature(s: &str) -> Option<Self> {
        match s {
            "copy_push_terms" => Some(RewriteFeature::CopyPushTerms),
            "trace_rewrites" => Some(RewriteFeature::TraceRewrites),
            _ => None,
        }
    }

    /// 환경 변수 이름
    pub fn env_var_name(&self) -> String {
        format!("VTX_FEATURE_{}", self.as_str().to_uppercase())
    }
}

/// Feature Flag 관리자
///
/// 세션 간에 공유될 수 있으므로 잠금으로 보호한다.
#[derive(Clone)]
pub struct FeatureFlags {
    /// Feature 상태 (Feature → enabled)
    flags: Arc<RwLock<HashMap<RewriteFeature, bool>>>,

    /// 영속성 파일 경로
    persistence_path: Option<PathBuf>,
}

impl FeatureFlags {
    /// 빈 Feature Flag 관리자 생성 (모두 비활성)
    pub fn new() -> Self {
        Self {
            flags: Arc::new(RwLock::new(HashMap::new())),
            persistence_path: None,
        }
    }

    /// 기본 Feature 구성: CopyPushTerms 활성
    pub fn with_defaults() -> Self {
        let flags = Self::new();
        flags.enable(RewriteFeature::CopyPushTerms);
        flags
    }

    /// 영속성 경로 설정
    pub fn with_persistence(mut self, path: PathBuf) -> Self {
        self.persistence_path = Some(path);
        self
    }

    /// Feature 활성화
    pub fn enable(&self, feature: RewriteFeature) {
        self.flags.write().insert(feature, true);
    }

    /// Feature 비활성화
    pub fn disable(&self, feature: RewriteFeature) {
        self.flags.write().insert(feature, false);
    }

    /// Feature 토글
    pub fn toggle(&self, feature: RewriteFeature, enabled: bool) {
        self.flags.write().insert(feature, enabled);
    }

    /// Feature 활성화 여부 확인
    pub fn is_enabled(&self, feature: RewriteFeature) -> bool {
        self.flags.read().get(&feature).copied().unwrap_or(false)
    }

    /// 환경 변수에서 로드
    pub fn load_from_env(&self) {
        for feature in &RewriteFeature::ALL {
            if let Ok(value) = env::var(feature.env_var_name()) {
                let enabled = value.to_lowercase() == "true" || value == "1";
                self.toggle(*feature, enabled);
            }
        }
    }

    /// 이름 → 상태 맵 적용 (알 수 없는 이름은 무시)
    pub fn apply_map(&self, map: &HashMap<String, bool>) {
        let mut flags = self.flags.write();
        for (key, value) in map {
            if let Some(feature) = RewriteFeature::parse_feature(key) {
                flags.insert(feature, *value);
            }
        }
    }

    /// 파일에서 로드
    pub fn load_from_file(&self) -> VtxResult<()> {
        if let Some(path) = self.persistence_path.as_ref().filter(|p| p.exists()) {
            let json = fs::read_to_string(path)?;
            let loaded: HashMap<String, bool> = serde_json::from_str(&json)?;
            self.apply_map(&loaded);
        }
        Ok(())
    }

    /// 파일에 저장
    pub fn save_to_file(&self) -> VtxResult<()> {
        if let Some(path) = &self.persistence_path {
            let json = serde_json::to_string_pretty(&self.to_map())?;

            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }

            fs::write(path, json)?;
        }
        Ok(())
    }

    /// 이름 → 상태 맵으로 변환
    pub fn to_map(&self) -> HashMap<String, bool> {
        self.flags
            .read()
            .iter()
            .map(|(k, v)| (k.as_str().to_string(), *v))
            .collect()
    }

    /// 모든 Feature 초기화
    pub fn reset(&self) {
        self.flags.write().clear();
    }
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl std::fmt::Debug for FeatureFlags {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map().entries(self.to_map()).finish()
    }
}
