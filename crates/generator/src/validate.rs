//! 출력/파이프라인 의미 규칙 검사
//!
//! 스키마로 표현할 수 없는 규칙을 컴파일 전에 검사하고,
//! 위반 시 문제가 된 이름과 함께 `InvalidSpec`을 반환합니다.

use std::sync::LazyLock;

use logfwd_core::error::SpecError;
use logfwd_core::forwarder::{ForwarderSpec, OutputSpec, OutputType, SourceType};
use logfwd_core::options::{CompileOptions, Target};
use regex::Regex;

use crate::endpoint;
use crate::error::GeneratorError;

/// `segment ("." segment)*`, `segment = [A-Za-z0-9_]+ | "[^"]*"`
static INDEX_KEY: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r#"^(?:[A-Za-z0-9_]+|"[^"]*")(?:\.(?:[A-Za-z0-9_]+|"[^"]*"))*$"#).ok()
});

static AZURE_LOG_TYPE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_]{1,100}$").ok());

/// Splunk `indexKey` 문법 검사
pub fn is_valid_index_key(key: &str) -> bool {
    INDEX_KEY.as_ref().is_some_and(|re| re.is_match(key))
}

/// Azure Monitor `logType` 문법 검사
pub fn is_valid_azure_log_type(log_type: &str) -> bool {
    AZURE_LOG_TYPE.as_ref().is_some_and(|re| re.is_match(log_type))
}

/// 컴파일 전 전체 검사
pub fn validate(
    spec: &ForwarderSpec,
    target: Target,
    options: &CompileOptions,
) -> Result<(), GeneratorError> {
    spec.check_references().map_err(spec_error)?;

    for output in &spec.outputs {
        validate_output(output)?;
        validate_output_for_target(output, target)?;
    }

    for pipeline in &spec.pipelines {
        if target == Target::Fluentd && !pipeline.filter_refs.is_empty() {
            return Err(GeneratorError::invalid(
                &pipeline.name,
                "filters are not supported by the fluentd collector",
            ));
        }
        if options.annotation_collector_as_deployment {
            for input_ref in &pipeline.input_refs {
                if spec.source_type_of(input_ref) != Some(SourceType::Receiver) {
                    return Err(GeneratorError::invalid(
                        &pipeline.name,
                        format!(
                            "input '{input_ref}' is node-local and cannot be collected by a deployment"
                        ),
                    ));
                }
            }
        }
    }
    Ok(())
}

/// 출력 하나에 대한 타입별 규칙
pub fn validate_output(output: &OutputSpec) -> Result<(), GeneratorError> {
    let name = output.name.as_str();
    let kind = output.kind;

    if output.compression().is_some() && !kind.supports_compression() {
        return Err(GeneratorError::invalid(
            name,
            format!("compression is not supported for output type {kind}"),
        ));
    }

    let retry_set = output
        .tuning
        .as_ref()
        .is_some_and(|t| t.min_retry_duration.is_some() || t.max_retry_duration.is_some());
    if retry_set && !kind.supports_retry() {
        return Err(GeneratorError::invalid(
            name,
            format!("retry duration tuning is not supported for output type {kind}"),
        ));
    }

    if !output.url.is_empty() && !endpoint::is_valid_endpoint(&output.url) {
        return Err(GeneratorError::invalid(
            name,
            format!("url '{}' is not a valid endpoint", output.url),
        ));
    }

    match kind {
        OutputType::Splunk => validate_splunk(output),
        OutputType::AzureMonitor => validate_azure_monitor(output),
        OutputType::GoogleCloudLogging => validate_google_cloud_logging(output),
        OutputType::Cloudwatch => {
            let region = output.cloudwatch.as_ref().map(|c| c.region.trim());
            if region.is_none_or(str::is_empty) {
                return Err(GeneratorError::invalid(name, "cloudwatch region is required"));
            }
            Ok(())
        }
        OutputType::LokiStack => {
            let target = output.loki_stack.as_ref().map(|l| l.target.name.trim());
            if target.is_none_or(str::is_empty) {
                return Err(GeneratorError::invalid(name, "lokiStack target name is required"));
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

fn validate_splunk(output: &OutputSpec) -> Result<(), GeneratorError> {
    let Some(splunk) = output.splunk.as_ref() else {
        return Ok(());
    };
    if splunk.index_key.is_some() && splunk.index_name.is_some() {
        return Err(GeneratorError::invalid(
            &output.name,
            "indexKey and indexName are mutually exclusive",
        ));
    }
    if let Some(key) = splunk.index_key.as_deref() {
        if !is_valid_index_key(key) {
            return Err(GeneratorError::invalid(
                &output.name,
                format!("indexKey '{key}' is not a valid record path"),
            ));
        }
    }
    Ok(())
}

fn validate_azure_monitor(output: &OutputSpec) -> Result<(), GeneratorError> {
    let (customer_id, log_type) = output
        .azure_monitor
        .as_ref()
        .map(|a| (a.customer_id.as_str(), a.log_type.as_str()))
        .unwrap_or_default();
    if customer_id.is_empty() {
        return Err(GeneratorError::invalid(&output.name, "customerId is required"));
    }
    if log_type.is_empty() {
        return Err(GeneratorError::invalid(&output.name, "logType is required"));
    }
    if !is_valid_azure_log_type(log_type) {
        return Err(GeneratorError::invalid(
            &output.name,
            format!("logType '{log_type}' must match [A-Za-z0-9_]{{1,100}}"),
        ));
    }
    Ok(())
}

fn validate_google_cloud_logging(output: &OutputSpec) -> Result<(), GeneratorError> {
    let gcl = output.google_cloud_logging.clone().unwrap_or_default();
    if gcl.parent_ids().len() != 1 {
        return Err(GeneratorError::invalid(
            &output.name,
            "exactly one of billingAccountId, organizationId, folderId or projectId must be set",
        ));
    }
    if gcl.log_id.trim().is_empty() {
        return Err(GeneratorError::invalid(&output.name, "logId is required"));
    }
    Ok(())
}

fn validate_output_for_target(output: &OutputSpec, target: Target) -> Result<(), GeneratorError> {
    let unsupported = match target {
        Target::Vector => matches!(output.kind, OutputType::FluentdForward),
        Target::Fluentd => matches!(
            output.kind,
            OutputType::Splunk | OutputType::AzureMonitor | OutputType::GoogleCloudLogging
        ),
    };
    if unsupported {
        return Err(GeneratorError::invalid(
            &output.name,
            format!(
                "output type {} is not supported by the {target} collector",
                output.kind
            ),
        ));
    }
    Ok(())
}

fn spec_error(err: SpecError) -> GeneratorError {
    let name = match &err {
        SpecError::DuplicateName { name, .. } => name.clone(),
        SpecError::UnknownReference { pipeline, .. } => pipeline.clone(),
        SpecError::FileNotFound { path } => path.clone(),
        SpecError::ParseFailed { format, .. } => format.clone(),
    };
    GeneratorError::invalid(name, err.to_string())
}
