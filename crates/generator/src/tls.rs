//! TLS/인증 참조 해석
//!
//! 출력마다 유효 TLS 프로파일을 고르고(출력 → 포워더 → 클러스터 순서),
//! 시크릿/configmap 참조를 수집기 파드 안의 파일 경로로 바꿉니다.

use logfwd_core::forwarder::{ForwarderSpec, OutputSpec};
use logfwd_core::options::{CompileOptions, TlsProfile, TlsVersion};
use logfwd_core::secrets::{ConfigMaps, Secret, Secrets};

use crate::error::GeneratorError;

/// 서비스 어카운트 토큰
pub const SA_TOKEN_PATH: &str = "/var/run/secrets/kubernetes.io/serviceaccount/token";
/// 서비스 CA 번들
pub const SERVICE_CA_PATH: &str = "/var/run/secrets/kubernetes.io/serviceaccount/service-ca.crt";
/// 출력별 시크릿 마운트 디렉토리
pub const SECRETS_DIR: &str = "/var/run/ocp-collector/secrets";
/// 출력별 configmap 마운트 디렉토리
pub const CONFIG_MAPS_DIR: &str = "/var/run/ocp-collector/config";
/// 메트릭 엔드포인트 서빙 인증서 디렉토리
pub const METRICS_TLS_DIR: &str = "/etc/collector/metrics";

/// 관례적인 시크릿 키 이름
pub mod keys {
    pub const TLS_CRT: &str = "tls.crt";
    pub const TLS_KEY: &str = "tls.key";
    pub const CA_BUNDLE: &str = "ca-bundle.crt";
    pub const PASSPHRASE: &str = "passphrase";
    pub const USERNAME: &str = "username";
    pub const PASSWORD: &str = "password";
    pub const TOKEN: &str = "token";
    pub const SHARED_KEY: &str = "shared_key";
    pub const HEC_TOKEN: &str = "hecToken";
    pub const SASL_ENABLE: &str = "sasl.enable";
    pub const SASL_MECHANISMS: &str = "sasl.mechanisms";
    pub const AWS_ACCESS_KEY_ID: &str = "aws_access_key_id";
    pub const AWS_SECRET_ACCESS_KEY: &str = "aws_secret_access_key";
    pub const AWS_ROLE_ARN: &str = "role_arn";
    pub const AWS_CREDENTIALS: &str = "credentials";
    pub const GOOGLE_APPLICATION_CREDENTIALS: &str = "google-application-credentials.json";
}

/// 시크릿 키의 마운트 경로
pub fn secret_path(secret: &str, key: &str) -> String {
    format!("{SECRETS_DIR}/{secret}/{key}")
}

/// configmap 키의 마운트 경로
pub fn config_map_path(config_map: &str, key: &str) -> String {
    format!("{CONFIG_MAPS_DIR}/{config_map}/{key}")
}

/// 출력의 유효 TLS 프로파일
///
/// 출력 프로파일 → 포워더 프로파일 → 클러스터 프로파일 순서로 고릅니다.
pub fn effective_profile<'a>(
    output: &'a OutputSpec,
    spec: &'a ForwarderSpec,
    options: &'a CompileOptions,
) -> Option<&'a TlsProfile> {
    output
        .tls_profile()
        .or(spec.tls_security_profile.as_ref())
        .or(options.cluster_tls_profile.as_ref())
}

/// Ruby 계열 플러그인이 쓰는 버전 토큰 (`TLSv1_2`)
pub fn ruby_tls_version(version: TlsVersion) -> &'static str {
    match version {
        TlsVersion::Tls10 => "TLSv1",
        TlsVersion::Tls11 => "TLSv1_1",
        TlsVersion::Tls12 => "TLSv1_2",
        TlsVersion::Tls13 => "TLSv1_3",
    }
}

/// Ruby 계열 서버 `<transport tls>`가 쓰는 버전 토큰 (`TLS1_2`)
pub fn transport_tls_version(version: TlsVersion) -> &'static str {
    match version {
        TlsVersion::Tls10 => "TLS1_0",
        TlsVersion::Tls11 => "TLS1_1",
        TlsVersion::Tls12 => "TLS1_2",
        TlsVersion::Tls13 => "TLS1_3",
    }
}

/// 출력이 참조하는 시크릿을 찾습니다.
///
/// 참조가 있는데 시크릿이 없으면 `MissingReference`입니다.
pub fn output_secret<'a>(
    output: &OutputSpec,
    secrets: &'a Secrets,
) -> Result<Option<&'a Secret>, GeneratorError> {
    match output.secret_name() {
        None => Ok(None),
        Some(name) => secrets
            .get(name)
            .map(Some)
            .ok_or_else(|| GeneratorError::missing_secret(name, "")),
    }
}

/// 필수 시크릿 키 값을 읽습니다.
pub fn required_secret_value(
    output: &OutputSpec,
    secret: Option<&Secret>,
    key: &str,
) -> Result<String, GeneratorError> {
    let name = output.secret_name().unwrap_or_default();
    match secret {
        Some(s) if s.has_value(key) => Ok(s.get(key)),
        _ => Err(GeneratorError::missing_secret(name, key)),
    }
}

/// 해석이 끝난 출력 TLS 설정
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedTls {
    /// 유효 프로파일
    pub profile: Option<TlsProfile>,
    /// 인증서 검증 생략
    pub insecure: bool,
    /// 클라이언트 인증서 경로
    pub cert_file: Option<String>,
    /// 클라이언트 키 경로
    pub key_file: Option<String>,
    /// CA 번들 경로
    pub ca_file: Option<String>,
    /// 키 암호 (시크릿 값)
    pub key_pass: Option<String>,
}

impl ResolvedTls {
    /// 출력할 내용이 하나도 없는지 여부
    pub fn is_empty(&self) -> bool {
        self.profile.is_none()
            && !self.insecure
            && self.cert_file.is_none()
            && self.key_file.is_none()
            && self.ca_file.is_none()
            && self.key_pass.is_none()
    }

    /// 클라이언트 인증서와 키가 모두 있는지 여부
    pub fn has_client_cert(&self) -> bool {
        self.cert_file.is_some() && self.key_file.is_some()
    }
}

/// 출력 TLS 설정을 해석합니다.
pub fn resolve(
    output: &OutputSpec,
    secret: Option<&Secret>,
    config_maps: &ConfigMaps,
    spec: &ForwarderSpec,
    options: &CompileOptions,
) -> Result<ResolvedTls, GeneratorError> {
    let mut resolved = ResolvedTls {
        profile: effective_profile(output, spec, options).cloned(),
        insecure: output.insecure_skip_verify(),
        ..ResolvedTls::default()
    };

    if let (Some(name), Some(secret)) = (output.secret_name(), secret) {
        if secret.has(keys::TLS_CRT) && secret.has(keys::TLS_KEY) {
            resolved.cert_file = Some(secret_path(name, keys::TLS_CRT));
            resolved.key_file = Some(secret_path(name, keys::TLS_KEY));
        }
        if secret.has(keys::CA_BUNDLE) {
            resolved.ca_file = Some(secret_path(name, keys::CA_BUNDLE));
        }
        if secret.has_value(keys::PASSPHRASE) {
            resolved.key_pass = Some(secret.get(keys::PASSPHRASE));
        }
    }

    if let Some(ca) = output.tls.as_ref().and_then(|t| t.ca.as_ref()) {
        let data = config_maps
            .get(&ca.name)
            .ok_or_else(|| GeneratorError::missing_config_map(&ca.name, ""))?;
        if !data.contains_key(&ca.key) {
            return Err(GeneratorError::missing_config_map(&ca.name, &ca.key));
        }
        resolved.ca_file = Some(config_map_path(&ca.name, &ca.key));
    }

    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use logfwd_core::forwarder::{ConfigMapKeyRef, OutputTls, OutputType, SecretRef};

    use super::*;

    fn profile(version: TlsVersion, cipher: &str) -> TlsProfile {
        TlsProfile {
            min_tls_version: version,
            ciphers: vec![cipher.to_owned()],
        }
    }

    fn output_with_profile(p: Option<TlsProfile>) -> OutputSpec {
        let mut out = OutputSpec::new("es", OutputType::Elasticsearch, "https://es:9200");
        out.tls = Some(OutputTls {
            security_profile: p,
            ..OutputTls::default()
        });
        out
    }

    #[test]
    fn output_profile_wins_over_forwarder_and_cluster() {
        let output = output_with_profile(Some(profile(TlsVersion::Tls13, "A")));
        let spec = ForwarderSpec {
            tls_security_profile: Some(profile(TlsVersion::Tls12, "B")),
            ..ForwarderSpec::default()
        };
        let options = CompileOptions {
            cluster_tls_profile: Some(profile(TlsVersion::Tls11, "C")),
            ..CompileOptions::default()
        };
        let p = effective_profile(&output, &spec, &options).unwrap();
        assert_eq!(p.ciphers, vec!["A"]);
    }

    #[test]
    fn forwarder_profile_wins_over_cluster() {
        let output = output_with_profile(None);
        let spec = ForwarderSpec {
            tls_security_profile: Some(profile(TlsVersion::Tls12, "B")),
            ..ForwarderSpec::default()
        };
        let options = CompileOptions {
            cluster_tls_profile: Some(profile(TlsVersion::Tls11, "C")),
            ..CompileOptions::default()
        };
        let p = effective_profile(&output, &spec, &options).unwrap();
        assert_eq!(p.ciphers, vec!["B"]);
    }

    #[test]
    fn no_profile_anywhere_is_none() {
        let output = output_with_profile(None);
        let spec = ForwarderSpec::default();
        let options = CompileOptions::default();
        assert!(effective_profile(&output, &spec, &options).is_none());
    }

    #[test]
    fn resolve_maps_secret_keys_to_paths() {
        let mut output = OutputSpec::new("es", OutputType::Elasticsearch, "https://es:9200");
        output.secret = Some(SecretRef {
            name: "es-secret".to_owned(),
        });
        let secret = Secret::new()
            .with("tls.crt", "c")
            .with("tls.key", "k")
            .with("ca-bundle.crt", "ca")
            .with("passphrase", "pw");
        let resolved = resolve(
            &output,
            Some(&secret),
            &ConfigMaps::new(),
            &ForwarderSpec::default(),
            &CompileOptions::default(),
        )
        .unwrap();
        assert_eq!(
            resolved.cert_file.as_deref(),
            Some("/var/run/ocp-collector/secrets/es-secret/tls.crt")
        );
        assert_eq!(
            resolved.ca_file.as_deref(),
            Some("/var/run/ocp-collector/secrets/es-secret/ca-bundle.crt")
        );
        assert_eq!(resolved.key_pass.as_deref(), Some("pw"));
        assert!(resolved.has_client_cert());
    }

    #[test]
    fn missing_config_map_ca_is_missing_reference() {
        let mut output = OutputSpec::new("es", OutputType::Elasticsearch, "https://es:9200");
        output.tls = Some(OutputTls {
            ca: Some(ConfigMapKeyRef {
                name: "trusted-ca".to_owned(),
                key: "ca.crt".to_owned(),
            }),
            ..OutputTls::default()
        });
        let mut config_maps = ConfigMaps::new();
        config_maps.insert("trusted-ca".to_owned(), BTreeMap::new());
        let err = resolve(
            &output,
            None,
            &config_maps,
            &ForwarderSpec::default(),
            &CompileOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, GeneratorError::MissingReference { ref key, .. } if key == "ca.crt"));
    }

    #[test]
    fn referenced_but_absent_secret_is_missing_reference() {
        let mut output = OutputSpec::new("es", OutputType::Elasticsearch, "https://es:9200");
        output.secret = Some(SecretRef {
            name: "gone".to_owned(),
        });
        let err = output_secret(&output, &Secrets::new()).unwrap_err();
        assert!(matches!(err, GeneratorError::MissingReference { ref name, .. } if name == "gone"));
    }

    #[test]
    fn ruby_version_tokens() {
        assert_eq!(ruby_tls_version(TlsVersion::Tls12), "TLSv1_2");
        assert_eq!(ruby_tls_version(TlsVersion::Tls13), "TLSv1_3");
        assert_eq!(transport_tls_version(TlsVersion::Tls12), "TLS1_2");
    }
}
