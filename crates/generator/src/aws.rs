//! CloudWatch IAM 역할 자격 증명 파일
//!
//! 역할 기반 인증을 쓰는 CloudWatch 출력마다 WebIdentity 레코드를 모으고,
//! 출력 순서대로 `[profile <name>]` 섹션을 가진 AWS 자격 증명 파일을 만듭니다.
//! 수집기 설정은 이 파일을 `auth.credentials_file` + `auth.profile`로 참조합니다.

use std::fmt::Write as _;
use std::sync::LazyLock;

use logfwd_core::forwarder::{ForwarderSpec, OutputSpec, OutputType};
use logfwd_core::options::CompileOptions;
use logfwd_core::secrets::{Secret, Secrets};
use regex::Regex;
use tracing::debug;

use crate::tls::{keys, secret_path};

/// 프로젝션된 서비스 어카운트 토큰
pub const PROJECTED_TOKEN_PATH: &str = "/var/run/ocp-collector/serviceaccount/token";
/// 수집기 파드 안의 자격 증명 파일 경로
pub const CREDENTIALS_PATH: &str = "/var/run/ocp-collector/aws/credentials";
/// AWS 세션 이름 최대 길이
const MAX_SESSION_NAME: usize = 64;

static ROLE_ARN: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"(arn:aws(?:[^:]*)?:(?:iam|sts)::\d{12}:role/\S+)\s?").ok()
});

/// 역할 기반 출력 하나의 자격 증명
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebIdentity {
    /// 프로파일 이름 (출력 이름)
    pub name: String,
    pub role_arn: String,
    pub web_identity_token_file: String,
    /// 교차 계정 역할
    pub assume_role_arn: Option<String>,
    pub external_id: Option<String>,
    pub session_name: Option<String>,
}

impl WebIdentity {
    fn same_identity(&self, other: &WebIdentity) -> bool {
        self.role_arn == other.role_arn
            && self.web_identity_token_file == other.web_identity_token_file
    }
}

/// 문자열에서 유효한 역할 ARN을 찾습니다.
pub fn find_role_arn(text: &str) -> Option<String> {
    ROLE_ARN
        .as_ref()?
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_owned())
}

/// 시크릿에서 역할 ARN을 읽습니다 (`credentials` 키가 `role_arn`보다 우선).
pub fn role_arn_from_secret(secret: &Secret) -> Option<String> {
    let mut text = secret.get(keys::AWS_CREDENTIALS);
    if text.is_empty() {
        text = secret.get(keys::AWS_ROLE_ARN);
    }
    find_role_arn(&text)
}

/// 역할 기반 인증을 쓰는 출력인지 판단합니다.
pub fn is_role_auth(output: &OutputSpec, secret: Option<&Secret>) -> bool {
    output.kind == OutputType::Cloudwatch && secret.and_then(role_arn_from_secret).is_some()
}

fn session_name(options: &CompileOptions, output: &str) -> String {
    let full = format!("{}-{}-{output}", options.namespace, options.forwarder_name);
    full.chars().take(MAX_SESSION_NAME).collect()
}

/// 출력 순서대로 WebIdentity 레코드를 모읍니다.
pub fn gather_web_identities(
    spec: &ForwarderSpec,
    secrets: &Secrets,
    options: &CompileOptions,
) -> Vec<WebIdentity> {
    let mut identities = Vec::new();
    for output in spec.outputs.iter().filter(|o| o.kind == OutputType::Cloudwatch) {
        let Some(secret_name) = output.secret_name() else {
            continue;
        };
        let Some(secret) = secrets.get(secret_name) else {
            continue;
        };
        let Some(role_arn) = role_arn_from_secret(secret) else {
            continue;
        };
        let token_file = if secret.has(keys::TOKEN) {
            secret_path(secret_name, keys::TOKEN)
        } else {
            PROJECTED_TOKEN_PATH.to_owned()
        };

        let assume = output.cloudwatch.as_ref().and_then(|c| c.assume_role.as_ref());
        let identity = WebIdentity {
            name: output.name.clone(),
            role_arn,
            web_identity_token_file: token_file,
            assume_role_arn: assume.and_then(|a| find_role_arn(&a.role_arn)),
            external_id: assume.and_then(|a| a.external_id.clone()),
            session_name: assume.map(|_| session_name(options, &output.name)),
        };
        debug!(output = %identity.name, assume_role = identity.assume_role_arn.is_some(), "gathered aws web identity");
        identities.push(identity);
    }
    identities
}

/// 자격 증명 파일을 렌더링합니다. 역할 기반 출력이 없으면 `None`입니다.
///
/// 교차 계정 역할을 가진 프로파일은 같은 웹 ID를 쓰는 앞선 프로파일을
/// `source_profile`로 연결하고, 그런 프로파일이 없으면 `<name>-source`
/// 프로파일을 바로 앞에 추가합니다.
pub fn render_credentials(identities: &[WebIdentity]) -> Option<String> {
    if identities.is_empty() {
        return None;
    }
    let mut sections: Vec<String> = Vec::new();
    let mut plain: Vec<&WebIdentity> = Vec::new();

    for identity in identities {
        match identity.assume_role_arn.as_deref() {
            None => {
                sections.push(web_identity_profile(&identity.name, identity));
                plain.push(identity);
            }
            Some(assume_arn) => {
                let source = match plain.iter().find(|p| p.same_identity(identity)) {
                    Some(p) => p.name.clone(),
                    None => {
                        let name = format!("{}-source", identity.name);
                        sections.push(web_identity_profile(&name, identity));
                        name
                    }
                };
                let mut s = String::new();
                let _ = writeln!(s, "[profile {}]", identity.name);
                let _ = writeln!(s, "source_profile = {source}");
                let _ = writeln!(s, "role_arn = {assume_arn}");
                if let Some(id) = identity.external_id.as_deref() {
                    let _ = writeln!(s, "external_id = {id}");
                }
                if let Some(session) = identity.session_name.as_deref() {
                    let _ = writeln!(s, "role_session_name = {session}");
                }
                sections.push(s);
            }
        }
    }
    Some(sections.join("\n"))
}

fn web_identity_profile(name: &str, identity: &WebIdentity) -> String {
    format!(
        "[profile {name}]\nrole_arn = {}\nweb_identity_token_file = {}\n",
        identity.role_arn, identity.web_identity_token_file
    )
}

#[cfg(test)]
mod tests {
    use logfwd_core::forwarder::{AssumeRole, CloudwatchOptions, SecretRef};

    use super::*;

    const ROLE: &str = "arn:aws:iam::123456789012:role/foo";

    fn cw_output(name: &str, secret: &str, assume: Option<AssumeRole>) -> OutputSpec {
        let mut out = OutputSpec::new(name, OutputType::Cloudwatch, "");
        out.secret = Some(SecretRef {
            name: secret.to_owned(),
        });
        out.cloudwatch = Some(CloudwatchOptions {
            region: "us-east-1".to_owned(),
            assume_role: assume,
            ..CloudwatchOptions::default()
        });
        out
    }

    #[test]
    fn find_role_arn_extracts_from_credentials_text() {
        let text = format!("[default]\nrole_arn = {ROLE}\nweb_identity_token_file = /x");
        assert_eq!(find_role_arn(&text).as_deref(), Some(ROLE));
        assert!(find_role_arn("not an arn").is_none());
    }

    #[test]
    fn access_key_output_is_not_role_auth() {
        let mut secrets = Secrets::new();
        secrets.insert(
            "cw".to_owned(),
            Secret::new()
                .with("aws_access_key_id", "id")
                .with("aws_secret_access_key", "key"),
        );
        let spec = ForwarderSpec {
            outputs: vec![cw_output("cw", "cw", None)],
            ..ForwarderSpec::default()
        };
        assert!(gather_web_identities(&spec, &secrets, &CompileOptions::default()).is_empty());
        assert!(render_credentials(&[]).is_none());
    }

    #[test]
    fn token_from_secret_overrides_projected_token() {
        let mut secrets = Secrets::new();
        secrets.insert(
            "cw".to_owned(),
            Secret::new().with("role_arn", ROLE).with("token", "t"),
        );
        let spec = ForwarderSpec {
            outputs: vec![cw_output("cw", "cw", None)],
            ..ForwarderSpec::default()
        };
        let ids = gather_web_identities(&spec, &secrets, &CompileOptions::default());
        assert_eq!(
            ids[0].web_identity_token_file,
            "/var/run/ocp-collector/secrets/cw/token"
        );
    }

    #[test]
    fn profiles_follow_output_order() {
        let mut secrets = Secrets::new();
        secrets.insert("a".to_owned(), Secret::new().with("role_arn", ROLE));
        secrets.insert(
            "b".to_owned(),
            Secret::new().with("role_arn", "arn:aws:iam::123456789012:role/bar"),
        );
        let spec = ForwarderSpec {
            outputs: vec![cw_output("zeta", "a", None), cw_output("alpha", "b", None)],
            ..ForwarderSpec::default()
        };
        let ids = gather_web_identities(&spec, &secrets, &CompileOptions::default());
        let text = render_credentials(&ids).unwrap();
        let zeta = text.find("[profile zeta]").unwrap();
        let alpha = text.find("[profile alpha]").unwrap();
        assert!(zeta < alpha);
        assert!(text.contains(&format!("web_identity_token_file = {PROJECTED_TOKEN_PATH}")));
    }

    #[test]
    fn assume_role_without_matching_identity_adds_source_profile() {
        let ids = vec![WebIdentity {
            name: "cw".to_owned(),
            role_arn: ROLE.to_owned(),
            web_identity_token_file: PROJECTED_TOKEN_PATH.to_owned(),
            assume_role_arn: Some("arn:aws:iam::987654321098:role/cross".to_owned()),
            external_id: Some("ext".to_owned()),
            session_name: Some("ns-collector-cw".to_owned()),
        }];
        let text = render_credentials(&ids).unwrap();
        assert!(text.starts_with("[profile cw-source]\n"));
        assert!(text.contains("[profile cw]\nsource_profile = cw-source\n"));
        assert!(text.contains("external_id = ext\n"));
        assert!(text.contains("role_session_name = ns-collector-cw\n"));
    }

    #[test]
    fn session_name_is_truncated() {
        let options = CompileOptions {
            namespace: "n".repeat(60),
            ..CompileOptions::default()
        };
        assert_eq!(session_name(&options, "out").len(), MAX_SESSION_NAME);
    }
}
