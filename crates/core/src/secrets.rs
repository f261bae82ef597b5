//! 시크릿/configmap 스냅샷
//!
//! 컴파일러는 클러스터를 읽지 않으므로 호출자가 참조 자료를 미리 모아
//! 전달합니다. 시크릿 값은 불변 바이트 버퍼로 보관하며,
//! 없는 키는 빈 문자열로 읽힙니다.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::{LogFwdError, SpecError};

/// 시크릿 하나의 키-값 스냅샷
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Secret {
    data: HashMap<String, Bytes>,
}

impl Secret {
    pub fn new() -> Self {
        Self::default()
    }

    /// 키-값을 추가한 시크릿을 반환합니다.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Bytes>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Bytes>) {
        self.data.insert(key.into(), value.into());
    }

    /// 키가 존재하는지 확인합니다.
    pub fn has(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    /// 키가 존재하고 값이 비어 있지 않은지 확인합니다.
    pub fn has_value(&self, key: &str) -> bool {
        self.data.get(key).is_some_and(|v| !v.is_empty())
    }

    /// 원시 바이트 값
    pub fn bytes(&self, key: &str) -> Option<&Bytes> {
        self.data.get(key)
    }

    /// UTF-8 문자열 값 (없거나 디코딩 불가능하면 빈 문자열)
    pub fn get(&self, key: &str) -> String {
        self.data
            .get(key)
            .map(|v| String::from_utf8_lossy(v).into_owned())
            .unwrap_or_default()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.data.keys().map(String::as_str)
    }
}

impl<K: Into<String>, V: Into<Bytes>> FromIterator<(K, V)> for Secret {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            data: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// 시크릿 이름 → 스냅샷
pub type Secrets = HashMap<String, Secret>;

/// configmap 이름 → 키-값
pub type ConfigMaps = HashMap<String, BTreeMap<String, String>>;

/// 파일에서 읽는 참조 자료 묶음
///
/// ```yaml
/// secrets:
///   es-secret:
///     username: elastic
/// configMaps:
///   ca-bundle:
///     ca.crt: "..."
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceBundle {
    #[serde(default)]
    pub secrets: BTreeMap<String, BTreeMap<String, String>>,
    #[serde(default)]
    pub config_maps: BTreeMap<String, BTreeMap<String, String>>,
}

impl ReferenceBundle {
    pub fn parse_yaml(yaml: &str) -> Result<Self, LogFwdError> {
        serde_yaml::from_str(yaml).map_err(|e| {
            SpecError::ParseFailed {
                format: "yaml".to_owned(),
                reason: e.to_string(),
            }
            .into()
        })
    }

    pub fn parse_json(json: &str) -> Result<Self, LogFwdError> {
        serde_json::from_str(json).map_err(|e| {
            SpecError::ParseFailed {
                format: "json".to_owned(),
                reason: e.to_string(),
            }
            .into()
        })
    }

    /// 파일에서 로드합니다. `.json` 확장자는 JSON, 그 외는 YAML입니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, LogFwdError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                LogFwdError::Spec(SpecError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                LogFwdError::Io(e)
            }
        })?;
        if path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
        {
            Self::parse_json(&content)
        } else {
            Self::parse_yaml(&content)
        }
    }

    /// 시크릿 스냅샷 맵으로 변환합니다.
    pub fn secrets(&self) -> Secrets {
        self.secrets
            .iter()
            .map(|(name, data)| {
                let secret = data
                    .iter()
                    .map(|(k, v)| (k.clone(), Bytes::from(v.clone())))
                    .collect();
                (name.clone(), secret)
            })
            .collect()
    }

    pub fn config_maps(&self) -> ConfigMaps {
        self.config_maps
            .iter()
            .map(|(name, data)| (name.clone(), data.clone()))
            .collect()
    }
}
