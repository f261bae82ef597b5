//! Integration tests for `logfwd generate`, `logfwd validate` and `logfwd config`.
//!
//! Each test writes real spec, reference and config files into a temp dir
//! and drives the command handlers through the library crate.

use std::fs;
use std::path::{Path, PathBuf};

use serial_test::serial;
use tempfile::TempDir;

use logfwd_cli::cli::{ConfigAction, ConfigArgs, GenerateArgs, OutputFormat, TargetArg, ValidateArgs};
use logfwd_cli::commands::{self, load_config};
use logfwd_cli::error::CliError;
use logfwd_cli::output::OutputWriter;
use logfwd_core::config::LogFwdConfig;

const LOKI_SPEC: &str = r#"
outputs:
  - name: loki-1
    type: loki
    url: http://loki:3100
pipelines:
  - name: p1
    inputRefs: [application]
    outputRefs: [loki-1]
"#;

const CLOUDWATCH_SPEC: &str = r#"
outputs:
  - name: cw
    type: cloudwatch
    secret:
      name: cw-secret
    cloudwatch:
      region: us-east-1
      groupBy: logType
pipelines:
  - name: all-to-cw
    inputRefs: [application]
    outputRefs: [cw]
"#;

const CLOUDWATCH_REFS: &str = r#"
secrets:
  cw-secret:
    role_arn: arn:aws:iam::123456789012:role/logger
"#;

fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).expect("should write file");
    path
}

fn text() -> OutputWriter {
    OutputWriter::new(OutputFormat::Text)
}

fn generate_args(spec: &Path, target: TargetArg, out: &Path) -> GenerateArgs {
    GenerateArgs {
        spec: spec.to_path_buf(),
        target: Some(target),
        secrets: None,
        out: Some(out.to_path_buf()),
        credentials_out: None,
    }
}

#[tokio::test]
async fn test_generate_writes_vector_config() {
    // Given: a minimal Loki forwarder
    let dir = TempDir::new().expect("should create temp dir");
    let spec = write(&dir, "clf.yaml", LOKI_SPEC);
    let out = dir.path().join("out").join("vector.toml");

    // When: generating with --out in a directory that does not exist yet
    let args = generate_args(&spec, TargetArg::Vector, &out);
    commands::generate::execute(args, &LogFwdConfig::default(), &text())
        .await
        .expect("generate should succeed");

    // Then: the file parses as TOML and holds the sink
    let conf = fs::read_to_string(&out).expect("output file should exist");
    let value: toml::Value = toml::from_str(&conf).expect("vector config should be TOML");
    assert!(value["sinks"].get("output_loki_1").is_some(), "loki sink should be rendered");
    assert!(value["sources"].get("raw_container_logs").is_some());
}

#[tokio::test]
async fn test_generate_writes_fluentd_config() {
    let dir = TempDir::new().expect("should create temp dir");
    let spec = write(&dir, "clf.yaml", LOKI_SPEC);
    let out = dir.path().join("fluent.conf");

    let args = generate_args(&spec, TargetArg::Fluentd, &out);
    commands::generate::execute(args, &LogFwdConfig::default(), &text())
        .await
        .expect("generate should succeed");

    let conf = fs::read_to_string(&out).expect("output file should exist");
    assert!(conf.contains("<label @P1>"), "pipeline label should be rendered");
    assert!(conf.contains("<label @LOKI_1>"), "output label should be rendered");
}

#[tokio::test]
async fn test_generate_reads_json_spec() {
    // Given: the same forwarder as JSON
    let dir = TempDir::new().expect("should create temp dir");
    let spec = write(
        &dir,
        "clf.json",
        r#"{"outputs":[{"name":"h","type":"http","url":"http://collector:8080"}],
            "pipelines":[{"name":"p","inputRefs":["application"],"outputRefs":["h"]}]}"#,
    );
    let out = dir.path().join("vector.toml");

    let args = generate_args(&spec, TargetArg::Vector, &out);
    commands::generate::execute(args, &LogFwdConfig::default(), &text())
        .await
        .expect("json spec should compile");

    let conf = fs::read_to_string(&out).expect("output file should exist");
    assert!(conf.contains("[sinks.output_h]"));
}

#[tokio::test]
async fn test_generate_writes_credentials_file() {
    // Given: a role-based CloudWatch output and its secret
    let dir = TempDir::new().expect("should create temp dir");
    let spec = write(&dir, "clf.yaml", CLOUDWATCH_SPEC);
    let refs = write(&dir, "refs.yaml", CLOUDWATCH_REFS);
    let out = dir.path().join("vector.toml");
    let credentials = dir.path().join("credentials");

    // When: generating with --credentials-out
    let args = GenerateArgs {
        secrets: Some(refs),
        credentials_out: Some(credentials.clone()),
        ..generate_args(&spec, TargetArg::Vector, &out)
    };
    commands::generate::execute(args, &LogFwdConfig::default(), &text())
        .await
        .expect("generate should succeed");

    // Then: the profile for the output is written
    let written = fs::read_to_string(&credentials).expect("credentials file should exist");
    assert!(written.contains("[profile cw]"), "got: {written}");
    assert!(written.contains("role_arn = arn:aws:iam::123456789012:role/logger"));
}

#[tokio::test]
async fn test_generate_skips_credentials_without_role_outputs() {
    let dir = TempDir::new().expect("should create temp dir");
    let spec = write(&dir, "clf.yaml", LOKI_SPEC);
    let out = dir.path().join("vector.toml");
    let credentials = dir.path().join("credentials");

    let args = GenerateArgs {
        credentials_out: Some(credentials.clone()),
        ..generate_args(&spec, TargetArg::Vector, &out)
    };
    commands::generate::execute(args, &LogFwdConfig::default(), &text())
        .await
        .expect("generate should succeed");

    assert!(!credentials.exists(), "no credentials file without role outputs");
}

#[tokio::test]
async fn test_generate_missing_secret_is_a_spec_error() {
    // Given: a Splunk output whose secret is not supplied
    let dir = TempDir::new().expect("should create temp dir");
    let spec = write(
        &dir,
        "clf.yaml",
        r#"
outputs:
  - name: hec
    type: splunk
    url: https://hec.example.com:8088
    secret:
      name: hec-secret
pipelines:
  - name: p
    inputRefs: [application]
    outputRefs: [hec]
"#,
    );
    let out = dir.path().join("vector.toml");

    // When: generating
    let args = generate_args(&spec, TargetArg::Vector, &out);
    let err = commands::generate::execute(args, &LogFwdConfig::default(), &text())
        .await
        .expect_err("missing secret should fail");

    // Then: exit code 3 and nothing written
    assert!(matches!(err, CliError::Spec(_)), "got: {err:?}");
    assert_eq!(err.exit_code(), 3);
    assert!(!out.exists(), "no partial output on failure");
}

#[tokio::test]
async fn test_generate_missing_spec_file() {
    let dir = TempDir::new().expect("should create temp dir");
    let out = dir.path().join("vector.toml");

    let args = generate_args(&dir.path().join("absent.yaml"), TargetArg::Vector, &out);
    let err = commands::generate::execute(args, &LogFwdConfig::default(), &text())
        .await
        .expect_err("missing spec should fail");

    assert_eq!(err.exit_code(), 3, "spec file not found maps to a spec error");
}

#[tokio::test]
async fn test_validate_unknown_output_reference() {
    // Given: a pipeline that names an undefined output
    let dir = TempDir::new().expect("should create temp dir");
    let spec = write(
        &dir,
        "clf.yaml",
        r#"
pipelines:
  - name: p
    inputRefs: [application]
    outputRefs: [nowhere]
"#,
    );

    // When: validating
    let args = ValidateArgs {
        spec,
        target: Some(TargetArg::Vector),
        secrets: None,
    };
    let err = commands::validate::execute(args, &LogFwdConfig::default(), &text())
        .await
        .expect_err("unknown reference should fail");

    // Then: reported as a spec error
    assert_eq!(err.exit_code(), 3);
    assert!(err.to_string().contains("nowhere"), "got: {err}");
}

#[tokio::test]
async fn test_validate_is_target_specific() {
    // Given: a Splunk output, which only the vector dialect supports
    let dir = TempDir::new().expect("should create temp dir");
    let spec = write(
        &dir,
        "clf.yaml",
        r#"
outputs:
  - name: hec
    type: splunk
    url: https://hec.example.com:8088
    secret:
      name: hec-secret
pipelines:
  - name: p
    inputRefs: [application]
    outputRefs: [hec]
"#,
    );
    let refs = write(
        &dir,
        "refs.yaml",
        "secrets:\n  hec-secret:\n    hecToken: token-value\n",
    );

    let vector = ValidateArgs {
        spec: spec.clone(),
        target: Some(TargetArg::Vector),
        secrets: Some(refs.clone()),
    };
    commands::validate::execute(vector, &LogFwdConfig::default(), &text())
        .await
        .expect("vector should accept splunk");

    let fluentd = ValidateArgs {
        spec,
        target: Some(TargetArg::Fluentd),
        secrets: Some(refs),
    };
    let err = commands::validate::execute(fluentd, &LogFwdConfig::default(), &text())
        .await
        .expect_err("fluentd should reject splunk");
    assert!(matches!(err, CliError::Spec(_)), "got: {err:?}");
}

#[tokio::test]
async fn test_validate_uses_configured_target() {
    // Given: a config that selects fluentd and a splunk spec
    let dir = TempDir::new().expect("should create temp dir");
    let spec = write(
        &dir,
        "clf.yaml",
        r#"
outputs:
  - name: hec
    type: splunk
    url: https://hec.example.com:8088
pipelines:
  - name: p
    inputRefs: [application]
    outputRefs: [hec]
"#,
    );
    let config = LogFwdConfig::parse("[generator]\ntarget = \"fluentd\"\n").expect("config parses");

    // When: validating without --target
    let args = ValidateArgs {
        spec,
        target: None,
        secrets: None,
    };
    let result = commands::validate::execute(args, &config, &text()).await;

    // Then: the fluentd rules apply
    assert!(result.is_err(), "configured fluentd target should reject splunk");
}

#[tokio::test]
#[serial]
async fn test_config_validate_valid_file() {
    let dir = TempDir::new().expect("should create temp dir");
    let config_path = write(
        &dir,
        "logfwd.toml",
        r#"
[general]
log_level = "debug"
log_format = "json"

[generator]
target = "fluentd"
vector_log_level = "info"
"#,
    );

    let args = ConfigArgs {
        action: ConfigAction::Validate,
    };
    commands::config::execute(args, &config_path, &text())
        .await
        .expect("valid config should pass");
}

#[tokio::test]
#[serial]
async fn test_config_validate_invalid_target() {
    let dir = TempDir::new().expect("should create temp dir");
    let config_path = write(&dir, "logfwd.toml", "[generator]\ntarget = \"logstash\"\n");

    let args = ConfigArgs {
        action: ConfigAction::Validate,
    };
    let err = commands::config::execute(args, &config_path, &text())
        .await
        .expect_err("unknown target should be invalid");
    assert_eq!(err.exit_code(), 2, "config errors exit with 2");
}

#[tokio::test]
#[serial]
async fn test_config_validate_missing_file() {
    let args = ConfigArgs {
        action: ConfigAction::Validate,
    };
    let err = commands::config::execute(args, Path::new("/nonexistent/logfwd.toml"), &text())
        .await
        .expect_err("missing file should be invalid");
    assert_eq!(err.exit_code(), 2);
}

#[tokio::test]
#[serial]
async fn test_config_show_unknown_section() {
    let dir = TempDir::new().expect("should create temp dir");
    let config_path = write(&dir, "logfwd.toml", "");

    let args = ConfigArgs {
        action: ConfigAction::Show {
            section: Some("pipelines".to_owned()),
        },
    };
    let err = commands::config::execute(args, &config_path, &text())
        .await
        .expect_err("unknown section should fail");
    assert!(matches!(err, CliError::Command(_)));
    assert!(err.to_string().contains("general, generator"));
}

#[tokio::test]
#[serial]
async fn test_load_config_missing_file_uses_defaults() {
    // Given: no config file and no overrides
    // SAFETY: serialized with the other env-mutating tests
    unsafe { std::env::remove_var("LOGFWD_GENERATOR_TARGET") };

    // When: loading
    let config = load_config(Path::new("/nonexistent/logfwd.toml"))
        .await
        .expect("defaults should load");

    // Then: built-in defaults apply
    assert_eq!(config.generator.target, "vector");
    assert_eq!(config.general.log_level, "info");
}

#[tokio::test]
#[serial]
async fn test_load_config_env_override_without_file() {
    // SAFETY: serialized with the other env-mutating tests
    unsafe { std::env::set_var("LOGFWD_GENERATOR_TARGET", "fluentd") };

    let result = load_config(Path::new("/nonexistent/logfwd.toml")).await;

    unsafe { std::env::remove_var("LOGFWD_GENERATOR_TARGET") };

    let config = result.expect("defaults with override should load");
    assert_eq!(config.generator.target, "fluentd");
}

#[tokio::test]
#[serial]
async fn test_load_config_rejects_invalid_env_override() {
    // SAFETY: serialized with the other env-mutating tests
    unsafe { std::env::set_var("LOGFWD_GENERATOR_TARGET", "logstash") };

    let result = load_config(Path::new("/nonexistent/logfwd.toml")).await;

    unsafe { std::env::remove_var("LOGFWD_GENERATOR_TARGET") };

    let err = result.expect_err("invalid override should be rejected");
    assert_eq!(err.exit_code(), 2);
}
