//! Vector 출력 패스
//!
//! 파이프라인 끝 컴포넌트를 모아 출력별 서브그래프(전처리 remap + 싱크)를
//! 만듭니다. 속도 제한이 있는 출력은 모든 입력을 하나의 throttle로 묶어
//! 싱크 앞에 둡니다. TLS, 버퍼, 재시도, 배치, 압축, 인증 하위 테이블은
//! 이 모듈의 공통 도우미가 채웁니다.

pub mod azure_monitor;
pub mod cloudwatch;
pub mod elasticsearch;
pub mod gcl;
pub mod http;
pub mod kafka;
pub mod loki;
pub mod splunk;
pub mod syslog;

use std::collections::BTreeMap;

use logfwd_core::forwarder::{DeliveryMode, ForwarderSpec, OutputSpec, OutputType};
use logfwd_core::options::CompileOptions;
use logfwd_core::secrets::{ConfigMaps, Secret, Secrets};
use tracing::debug;

use crate::Warning;
use crate::engine::BoxedElement;
pub use crate::endpoint::{url_authority, url_path};
use crate::error::GeneratorError;
use crate::naming::make_id;
use crate::tls::{self, ResolvedTls, keys};
use crate::vector::elements::{Component, Throttle};

/// 디스크 버퍼 최대 크기 (바이트)
pub const DISK_BUFFER_MAX_SIZE: i64 = 268_435_488;

/// `kubernetes.labels` / `namespace_labels` 키의 `.`과 `/`를 `_`로 바꾸고
/// 단조 증가 `openshift.sequence`를 붙입니다.
pub const DEDOT_LABELS: &str = r#".openshift.sequence = to_unix_timestamp(now(), unit: "nanoseconds")
if is_object(.kubernetes.namespace_labels) {
  .kubernetes.namespace_labels = map_keys(object!(.kubernetes.namespace_labels)) -> |key| { replace(key, r'[\./]', "_") }
}
if is_object(.kubernetes.labels) {
  .kubernetes.labels = map_keys(object!(.kubernetes.labels)) -> |key| { replace(key, r'[\./]', "_") }
}"#;

/// 출력 싱크 ID (`output_<name>`)
///
/// 내장 컴포넌트 ID와 겹치지 않도록 항상 `output_` 접두어를 붙입니다.
pub fn sink_id(output_name: &str) -> String {
    make_id(&["output", output_name])
}

/// 출력 하나를 렌더링하는 동안 쓰는 문맥
pub struct OutputContext<'a> {
    pub output: &'a OutputSpec,
    pub spec: &'a ForwarderSpec,
    pub secret: Option<&'a Secret>,
    pub config_maps: &'a ConfigMaps,
    pub options: &'a CompileOptions,
    /// 싱크 컴포넌트 ID
    pub id: String,
    /// 첫 컴포넌트가 소비할 입력 (throttle 적용 후)
    pub inputs: Vec<String>,
    pub warnings: Vec<Warning>,
}

impl OutputContext<'_> {
    /// `<id>_<suffix>` 형태의 보조 컴포넌트 ID
    pub fn sub_id(&self, suffix: &str) -> String {
        make_id(&[&self.id, suffix])
    }

    /// 시크릿 키 값 (없거나 비어 있으면 None)
    pub fn secret_value(&self, key: &str) -> Option<String> {
        self.secret
            .filter(|s| s.has_value(key))
            .map(|s| s.get(key))
    }

    /// 필수 시크릿 키 값
    pub fn required_secret(&self, key: &str) -> Result<String, GeneratorError> {
        tls::required_secret_value(self.output, self.secret, key)
    }

    pub fn tls(&self) -> Result<ResolvedTls, GeneratorError> {
        tls::resolve(
            self.output,
            self.secret,
            self.config_maps,
            self.spec,
            self.options,
        )
    }

    /// 지원하지 않는 필드 경고를 남깁니다.
    pub fn warn(&mut self, field: &str, message: impl Into<String>) {
        self.warnings
            .push(Warning::new(&self.output.name, field, message));
    }
}

/// 수량 표기 (`10M`, `512Ki`, `1024`)를 바이트 수로 바꿉니다.
pub fn parse_quantity(quantity: &str) -> Option<u64> {
    let q = quantity.trim();
    let split = q
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(q.len());
    let (digits, suffix) = q.split_at(split);
    let value: u64 = digits.parse().ok()?;
    let multiplier: u64 = match suffix {
        "" => 1,
        "K" | "k" => 1_000,
        "M" => 1_000_000,
        "G" => 1_000_000_000,
        "T" => 1_000_000_000_000,
        "Ki" => 1 << 10,
        "Mi" => 1 << 20,
        "Gi" => 1 << 30,
        "Ti" => 1 << 40,
        _ => return None,
    };
    value.checked_mul(multiplier)
}

fn to_i64(output: &OutputSpec, field: &str, value: u64) -> Result<i64, GeneratorError> {
    i64::try_from(value)
        .map_err(|_| GeneratorError::invalid(&output.name, format!("{field} is out of range")))
}

/// `[tls]` 하위 테이블
///
/// URL이 보안 스킴이거나 비어 있을 때만 채웁니다. `enable`이면 보안 URL에
/// `enabled = true`를 추가합니다 (소켓 계열 싱크).
pub fn add_tls(
    sink: &mut Component,
    ctx: &OutputContext<'_>,
    enable: bool,
) -> Result<(), GeneratorError> {
    let output = ctx.output;
    if !(output.url.is_empty() || output.is_secure_url()) {
        return Ok(());
    }
    let resolved = ctx.tls()?;
    if resolved.is_empty() && !(enable && output.is_secure_url()) {
        return Ok(());
    }
    let table = sink.table("tls");
    if enable && output.is_secure_url() {
        table.boolean("enabled", true);
    }
    if let Some(profile) = &resolved.profile {
        table.string("min_tls_version", profile.min_tls_version.token());
        if !profile.ciphers.is_empty() {
            table.string("ciphersuites", &profile.cipher_list(","));
        }
    }
    if resolved.insecure {
        table
            .boolean("verify_certificate", false)
            .boolean("verify_hostname", false);
    }
    table
        .opt_string("key_file", resolved.key_file.as_deref())
        .opt_string("crt_file", resolved.cert_file.as_deref())
        .opt_string("ca_file", resolved.ca_file.as_deref())
        .opt_string("key_pass", resolved.key_pass.as_deref());
    Ok(())
}

/// 전달 모드 → `[buffer]`
pub fn add_buffer(sink: &mut Component, output: &OutputSpec) {
    match output.delivery() {
        Some(DeliveryMode::AtLeastOnce) => {
            sink.table("buffer")
                .string("type", "disk")
                .string("when_full", "block")
                .int("max_size", DISK_BUFFER_MAX_SIZE);
        }
        Some(DeliveryMode::AtMostOnce) => {
            sink.table("buffer")
                .string("type", "memory")
                .string("when_full", "drop_newest");
        }
        None => {}
    }
}

/// 재시도 기간 → `[request]`
pub fn add_retry(sink: &mut Component, output: &OutputSpec) -> Result<(), GeneratorError> {
    let Some(tuning) = output.tuning.as_ref() else {
        return Ok(());
    };
    if let Some(min) = tuning.min_retry_duration {
        let min = to_i64(output, "minRetryDuration", min)?;
        sink.table("request").int("retry_initial_backoff_secs", min);
    }
    if let Some(max) = tuning.max_retry_duration {
        let max = to_i64(output, "maxRetryDuration", max)?;
        sink.table("request").int("retry_max_duration_secs", max);
    }
    Ok(())
}

/// `maxWrite` → `[batch] max_bytes`
pub fn add_batch(sink: &mut Component, output: &OutputSpec) -> Result<(), GeneratorError> {
    let Some(max_write) = output.tuning.as_ref().and_then(|t| t.max_write.as_deref()) else {
        return Ok(());
    };
    let bytes = parse_quantity(max_write).ok_or_else(|| {
        GeneratorError::invalid(&output.name, format!("invalid maxWrite quantity '{max_write}'"))
    })?;
    let bytes = to_i64(output, "maxWrite", bytes)?;
    sink.table("batch").int("max_bytes", bytes);
    Ok(())
}

/// 압축 방식 (`none`이면 생략)
pub fn add_compression(sink: &mut Component, output: &OutputSpec) {
    if let Some(compression) = output.compression() {
        sink.main().string("compression", compression);
    }
}

/// 버퍼, 재시도, 배치, 압축을 한 번에 적용합니다.
pub fn add_tuning(sink: &mut Component, output: &OutputSpec) -> Result<(), GeneratorError> {
    add_compression(sink, output);
    add_buffer(sink, output);
    add_retry(sink, output)?;
    add_batch(sink, output)
}

/// `username`/`password` → basic, `token` → bearer
pub fn add_http_auth(sink: &mut Component, ctx: &OutputContext<'_>) {
    if let (Some(user), Some(password)) = (
        ctx.secret_value(keys::USERNAME),
        ctx.secret_value(keys::PASSWORD),
    ) {
        sink.table("auth")
            .string("strategy", "basic")
            .string("user", &user)
            .string("password", &password);
    } else if let Some(token) = ctx.secret_value(keys::TOKEN) {
        add_bearer(sink, &token);
    }
}

pub fn add_bearer(sink: &mut Component, token: &str) {
    sink.table("auth")
        .string("strategy", "bearer")
        .string("token", token);
}

/// `healthcheck.enabled = false`
pub fn disable_healthcheck(sink: &mut Component) {
    sink.main().boolean("healthcheck.enabled", false);
}

/// 출력 이름 → 그 출력을 참조하는 파이프라인 끝 컴포넌트 (정렬)
fn output_inputs(
    spec: &ForwarderSpec,
    terminals: &BTreeMap<String, String>,
) -> BTreeMap<String, Vec<String>> {
    let mut by_output: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for pipeline in &spec.pipelines {
        let Some(terminal) = terminals.get(&pipeline.name) else {
            continue;
        };
        for output_ref in &pipeline.output_refs {
            let inputs = by_output.entry(output_ref.clone()).or_default();
            if !inputs.contains(terminal) {
                inputs.push(terminal.clone());
            }
        }
    }
    for inputs in by_output.values_mut() {
        inputs.sort();
    }
    by_output
}

fn render_output(ctx: &mut OutputContext<'_>) -> Result<Vec<BoxedElement>, GeneratorError> {
    match ctx.output.kind {
        OutputType::Elasticsearch => elasticsearch::render(ctx),
        OutputType::Loki => loki::render(ctx),
        OutputType::LokiStack => loki::render_stack(ctx),
        OutputType::Kafka => kafka::render(ctx),
        OutputType::Cloudwatch => cloudwatch::render(ctx),
        OutputType::Splunk => splunk::render(ctx),
        OutputType::Syslog => syslog::render(ctx),
        OutputType::Http => http::render(ctx),
        OutputType::AzureMonitor => azure_monitor::render(ctx),
        OutputType::GoogleCloudLogging => gcl::render(ctx),
        OutputType::FluentdForward => Err(GeneratorError::invalid(
            &ctx.output.name,
            "fluentdForward is not supported by the vector collector",
        )),
    }
}

/// 출력 섹션 엘리먼트
///
/// 어떤 파이프라인도 참조하지 않는 출력은 건너뜁니다.
pub fn outputs(
    spec: &ForwarderSpec,
    terminals: &BTreeMap<String, String>,
    secrets: &Secrets,
    config_maps: &ConfigMaps,
    options: &CompileOptions,
    warnings: &mut Vec<Warning>,
) -> Result<Vec<BoxedElement>, GeneratorError> {
    let mut by_output = output_inputs(spec, terminals);
    let mut elements: Vec<BoxedElement> = Vec::new();

    for output in &spec.outputs {
        let Some(mut inputs) = by_output.remove(&output.name) else {
            debug!(output = %output.name, "output not referenced by any pipeline, skipping");
            continue;
        };
        let id = sink_id(&output.name);

        if let Some(threshold) = output.max_records_per_second() {
            let throttle_id = make_id(&["sink", "throttle", &output.name]);
            elements.push(Box::new(Throttle {
                id: throttle_id.clone(),
                inputs,
                window_secs: 1,
                threshold,
            }));
            inputs = vec![throttle_id];
        }

        let mut ctx = OutputContext {
            output,
            spec,
            secret: tls::output_secret(output, secrets)?,
            config_maps,
            options,
            id,
            inputs,
            warnings: Vec::new(),
        };
        elements.extend(render_output(&mut ctx)?);
        warnings.append(&mut ctx.warnings);
    }
    Ok(elements)
}
