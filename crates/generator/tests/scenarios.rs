//! 통합 테스트 -- 대표 포워더 구성의 전체 컴파일 흐름 검증
//!
//! 각 시나리오는 YAML 스펙을 두 방언으로 컴파일하고, Vector 출력은 TOML로
//! 다시 파싱해 컴포넌트 그래프를 확인합니다.

use logfwd_core::forwarder::ForwarderSpec;
use logfwd_core::options::{CompileOptions, Target};
use logfwd_core::secrets::{ConfigMaps, Secret, Secrets};
use logfwd_generator::{Generated, compile};

fn compile_yaml(target: Target, yaml: &str, secrets: &Secrets) -> Generated {
    let spec = ForwarderSpec::parse_yaml(yaml).expect("spec should parse");
    compile(
        target,
        &spec,
        secrets,
        &ConfigMaps::new(),
        &CompileOptions::default(),
    )
    .expect("spec should compile")
}

fn vector(yaml: &str) -> toml::Value {
    let generated = compile_yaml(Target::Vector, yaml, &Secrets::new());
    toml::from_str(&generated.conf).expect("vector config should be valid TOML")
}

fn fluentd(yaml: &str) -> String {
    compile_yaml(Target::Fluentd, yaml, &Secrets::new()).conf
}

fn inputs(value: &toml::Value) -> Vec<&str> {
    value["inputs"]
        .as_array()
        .expect("inputs array")
        .iter()
        .filter_map(toml::Value::as_str)
        .collect()
}

/// `<label NAME>` 부터 닫는 `</label>`까지
fn label_body<'a>(conf: &'a str, name: &str) -> &'a str {
    let open = format!("<label {name}>\n");
    let start = conf.find(&open).unwrap_or_else(|| panic!("label {name} missing"));
    let end = conf[start..].find("\n</label>").expect("label should close") + start;
    &conf[start..end]
}

const MINIMAL: &str = r#"
outputs:
  - name: loki-1
    type: loki
    url: http://loki:3100
pipelines:
  - name: p1
    inputRefs: [application]
    outputRefs: [loki-1]
"#;

/// 최소 포워더는 컨테이너 소스와 싱크 하나만 만든다
#[test]
fn test_minimum_forwarder_vector() {
    let conf = vector(MINIMAL);

    let sources = conf["sources"].as_table().expect("sources table");
    let mut ids: Vec<&str> = sources.keys().map(String::as_str).collect();
    ids.sort_unstable();
    assert_eq!(ids, vec!["internal_metrics", "raw_container_logs"]);
    assert_eq!(
        sources["raw_container_logs"]["type"].as_str(),
        Some("kubernetes_logs")
    );

    let transforms = conf["transforms"].as_table().expect("transforms table");
    assert_eq!(inputs(&transforms["pipeline_p1"]), vec!["application"]);
    assert!(!transforms.contains_key("infrastructure"));
    assert!(!transforms.contains_key("audit"));

    let sinks = conf["sinks"].as_table().expect("sinks table");
    let mut sink_ids: Vec<&str> = sinks.keys().map(String::as_str).collect();
    sink_ids.sort_unstable();
    assert_eq!(sink_ids, vec!["output_loki_1", "prometheus_output"]);
    assert_eq!(sinks["output_loki_1"]["endpoint"].as_str(), Some("http://loki:3100"));
    assert!(sinks["output_loki_1"].get("tls").is_none());
}

/// Fluentd 방언은 파이프라인 레이블 `@P1` 하나와 tail 소스만 가진다
#[test]
fn test_minimum_forwarder_fluentd() {
    let conf = fluentd(MINIMAL);

    assert_eq!(conf.matches("<label @P1>").count(), 1);
    assert!(conf.contains("@type tail"));
    assert!(!conf.contains("@type systemd"));
    assert!(!conf.contains("<label @_INFRASTRUCTURE>"));
    assert!(label_body(&conf, "@P1").contains("@label @LOKI_1"));
    assert!(label_body(&conf, "@LOKI_1").contains("@type loki"));
}

const AUDIT_FILTER: &str = r#"
filters:
  - name: policy
    type: kubeAPIAudit
    kubeAPIAudit:
      rules:
        - level: RequestResponse
          users: ["*apiserver"]
        - level: None
          verbs: [get]
        - level: Metadata
outputs:
  - name: loki-audit
    type: loki
    url: http://loki:3100
pipelines:
  - name: audit-p
    inputRefs: [audit]
    outputRefs: [loki-audit]
    filterRefs: [policy]
"#;

/// 감사 필터는 응답 코드 강등 뒤에 규칙을 순서대로 적용한다
#[test]
fn test_audit_filter_rule_order() {
    let conf = vector(AUDIT_FILTER);
    let transforms = conf["transforms"].as_table().expect("transforms table");

    let filter = &transforms["pipeline_audit_p_policy"];
    assert_eq!(inputs(filter), vec!["pipeline_audit_p"]);
    let vrl = filter["source"].as_str().expect("filter source");

    let codes = vrl.find("if includes([404, 409, 422, 429], code)").expect("code coercion");
    let users = vrl
        .find(r#"match(user, r'^(?:.*apiserver)$') { level = "RequestResponse" }"#)
        .expect("user rule");
    let verbs = vrl
        .find(r#"includes(["get"], verb) { level = "None" }"#)
        .expect("verb rule");
    let default = vrl
        .find(r#"if level == null { level = "Metadata" }"#)
        .expect("default rule");
    assert!(codes < users && users < verbs && verbs < default);

    let sources = conf["sources"].as_table().expect("sources table");
    for id in [
        "raw_host_audit_logs",
        "raw_k8s_audit_logs",
        "raw_openshift_audit_logs",
        "raw_ovn_audit_logs",
    ] {
        assert!(sources.contains_key(id), "{id} missing");
    }
    assert!(!sources.contains_key("raw_container_logs"));

    let sink = &conf["sinks"]["output_loki_audit"];
    assert_eq!(sink["type"].as_str(), Some("loki"));
}

/// Fluentd 방언은 API 감사 필터를 거부한다
#[test]
fn test_audit_filter_rejected_by_fluentd() {
    let spec = ForwarderSpec::parse_yaml(AUDIT_FILTER).expect("spec should parse");
    let result = compile(
        Target::Fluentd,
        &spec,
        &Secrets::new(),
        &ConfigMaps::new(),
        &CompileOptions::default(),
    );
    assert!(result.is_err_and(|e| e.is_user_error()));
}

const SHARED_INPUT: &str = r#"
outputs:
  - name: o1
    type: loki
    url: http://loki-a:3100
  - name: o2
    type: http
    url: http://collector:8080
  - name: o3
    type: loki
    url: http://loki-b:3100
pipelines:
  - name: p1
    inputRefs: [application]
    outputRefs: [o1]
  - name: p2
    inputRefs: [application]
    outputRefs: [o2]
  - name: p3
    inputRefs: [application]
    outputRefs: [o3]
"#;

/// 공유 입력은 세 저장소를 가진 깊은 복사 하나로 나뉜다
#[test]
fn test_shared_input_deep_copy() {
    let conf = fluentd(SHARED_INPUT);
    let lane = label_body(&conf, "@_APPLICATION");

    assert_eq!(lane.matches("@type copy").count(), 1);
    assert!(lane.contains("@type copy\n    copy_mode deep\n"));
    assert_eq!(lane.matches("<store>").count(), 3);
    for target in ["@P1", "@P2", "@P3"] {
        assert!(lane.contains(&format!("@label {target}\n")), "{target} missing");
    }

    let vector = vector(SHARED_INPUT);
    let transforms = vector["transforms"].as_table().expect("transforms table");
    for id in ["pipeline_p1", "pipeline_p2", "pipeline_p3"] {
        assert_eq!(inputs(&transforms[id]), vec!["application"]);
    }
}

const CLOUDWATCH_ROLES: &str = r#"
outputs:
  - name: cw-primary
    type: cloudwatch
    secret:
      name: cw-secret
    cloudwatch:
      region: us-east-1
      groupBy: logType
  - name: cw-cross
    type: cloudwatch
    secret:
      name: cw-secret
    cloudwatch:
      region: us-east-1
      groupBy: namespaceName
      assumeRole:
        roleARN: arn:aws:iam::987654321098:role/cross
        externalID: unique-external-id
pipelines:
  - name: all-to-cw
    inputRefs: [application, infrastructure]
    outputRefs: [cw-primary, cw-cross]
"#;

fn role_secrets() -> Secrets {
    let mut secrets = Secrets::new();
    secrets.insert(
        "cw-secret".to_owned(),
        Secret::new().with("role_arn", "arn:aws:iam::123456789012:role/logger"),
    );
    secrets
}

/// 두 역할 출력은 스펙 순서대로 프로파일을 만들고 두 번째가 첫 번째에 연결된다
#[test]
fn test_cloudwatch_two_role_profiles() {
    for target in [Target::Vector, Target::Fluentd] {
        let generated = compile_yaml(target, CLOUDWATCH_ROLES, &role_secrets());
        let credentials = generated.aws_credentials.expect("credentials rendered");

        assert_eq!(credentials.matches("[profile ").count(), 2);
        let primary = credentials.find("[profile cw-primary]").expect("primary profile");
        let cross = credentials.find("[profile cw-cross]").expect("cross profile");
        assert!(primary < cross);

        assert!(credentials.contains(
            "[profile cw-primary]\nrole_arn = arn:aws:iam::123456789012:role/logger\n\
             web_identity_token_file = /var/run/ocp-collector/serviceaccount/token\n"
        ));
        assert!(credentials.contains(
            "[profile cw-cross]\nsource_profile = cw-primary\n\
             role_arn = arn:aws:iam::987654321098:role/cross\n\
             external_id = unique-external-id\n"
        ));
    }
}

/// 역할 인증 출력이 없으면 자격 증명 파일도 없다
#[test]
fn test_no_role_outputs_render_no_credentials() {
    let generated = compile_yaml(Target::Vector, MINIMAL, &Secrets::new());
    assert!(generated.aws_credentials.is_none());
}

const RATE_LIMITED: &str = r#"
outputs:
  - name: loki-1
    type: loki
    url: http://loki:3100
    limit:
      maxRecordsPerSecond: 100
    tuning:
      delivery: atLeastOnce
pipelines:
  - name: p1
    inputRefs: [application]
    outputRefs: [loki-1]
"#;

/// 속도 제한 throttle이 싱크 앞에 오고 버퍼는 디스크 큐를 쓴다
#[test]
fn test_rate_limit_and_at_least_once_vector() {
    let conf = vector(RATE_LIMITED);
    let transforms = conf["transforms"].as_table().expect("transforms table");

    let throttle = &transforms["sink_throttle_loki_1"];
    assert_eq!(throttle["type"].as_str(), Some("throttle"));
    assert_eq!(throttle["threshold"].as_integer(), Some(100));
    assert_eq!(throttle["window_secs"].as_integer(), Some(1));
    assert_eq!(inputs(throttle), vec!["pipeline_p1"]);
    assert_eq!(inputs(&transforms["output_loki_1_remap"]), vec!["sink_throttle_loki_1"]);

    let buffer = &conf["sinks"]["output_loki_1"]["buffer"];
    assert_eq!(buffer["type"].as_str(), Some("disk"));
    assert_eq!(buffer["when_full"].as_str(), Some("block"));
    assert_eq!(buffer["max_size"].as_integer(), Some(268_435_488));
}

/// Fluentd 출력 레이블은 throttle 필터로 시작하고 파일 버퍼를 쓴다
#[test]
fn test_rate_limit_and_at_least_once_fluentd() {
    let conf = fluentd(RATE_LIMITED);
    let label = label_body(&conf, "@LOKI_1");

    let throttle = label.find("@type throttle").expect("throttle filter");
    let store = label.find("@type loki").expect("loki store");
    assert!(throttle < store);
    assert!(label.contains("group_bucket_limit 100\n"));
    assert!(label.contains("group_bucket_period_s 1\n"));
    assert!(label.contains("<buffer>\n      @type file\n"));
}

const NAMESPACE_INPUT: &str = r#"
inputs:
  - name: myapp
    application:
      namespaces: [myapp1, myapp2]
outputs:
  - name: o-x
    type: loki
    url: http://loki-x:3100
  - name: o-y
    type: loki
    url: http://loki-y:3100
pipelines:
  - name: pX
    inputRefs: [myapp]
    outputRefs: [o-x]
  - name: pY
    inputRefs: [application]
    outputRefs: [o-y]
"#;

/// 네임스페이스 선택 입력은 경로로 나뉘고 나머지는 application_all로 간다
#[test]
fn test_namespace_selected_input_vector() {
    let conf = vector(NAMESPACE_INPUT);
    let transforms = conf["transforms"].as_table().expect("transforms table");

    let route = &transforms["route_application_logs"];
    assert_eq!(route["type"].as_str(), Some("route"));
    assert_eq!(inputs(route), vec!["application"]);

    let selected = r#"((.kubernetes.namespace_name == "myapp1") || (.kubernetes.namespace_name == "myapp2"))"#;
    assert_eq!(route["route"]["myapp"].as_str(), Some(selected));
    assert_eq!(
        route["route"]["application_all"].as_str(),
        Some(format!("(!({selected}))").as_str())
    );

    assert_eq!(
        inputs(&transforms["pipeline_px"]),
        vec!["route_application_logs.myapp"]
    );
    assert_eq!(
        inputs(&transforms["pipeline_py"]),
        vec!["route_application_logs.application_all"]
    );
}

/// Fluentd 방언은 label_router로 선택 레인과 나머지 레인을 나눈다
#[test]
fn test_namespace_selected_input_fluentd() {
    let conf = fluentd(NAMESPACE_INPUT);

    let lane = label_body(&conf, "@_APPLICATION");
    assert!(lane.contains("@type label_router"));
    let routed = lane.find("@label @_INPUT_MYAPP").expect("selected route");
    let rest = lane.find("@label @_APPLICATION_ALL").expect("unclaimed route");
    assert!(routed < rest);
    assert!(lane.contains("<match>\n        namespaces myapp1, myapp2\n"));
    assert!(lane.contains("<exclude>\n        namespaces myapp1, myapp2\n"));

    assert!(label_body(&conf, "@_INPUT_MYAPP").contains("@label @PX\n"));
    assert!(label_body(&conf, "@_APPLICATION_ALL").contains("@label @PY\n"));
}

const GOOGLE_CLOUD_LOGGING: &str = r#"
outputs:
  - name: gcl-1
    type: googleCloudLogging
    secret:
      name: gcl-secret
    googleCloudLogging:
      billingAccountId: billing-1
      logId: vector-1
pipelines:
  - name: p1
    inputRefs: [application]
    outputRefs: [gcl-1]
"#;

/// Google Cloud Logging 출력은 Vector에서 dedot 뒤 stackdriver 싱크가 된다
#[test]
fn test_google_cloud_logging_vector() {
    let mut secrets = Secrets::new();
    secrets.insert(
        "gcl-secret".to_owned(),
        Secret::new().with("google-application-credentials.json", "dummy-credentials"),
    );
    let generated = compile_yaml(Target::Vector, GOOGLE_CLOUD_LOGGING, &secrets);
    let value: toml::Value = toml::from_str(&generated.conf).expect("valid TOML");

    let sink = &value["sinks"]["output_gcl_1"];
    assert_eq!(sink["type"].as_str(), Some("gcp_stackdriver_logs"));
    assert_eq!(inputs(sink), vec!["output_gcl_1_dedot"]);
    assert_eq!(
        sink["credentials_path"].as_str(),
        Some("/var/run/ocp-collector/secrets/gcl-secret/google-application-credentials.json")
    );
    assert_eq!(inputs(&value["transforms"]["output_gcl_1_dedot"]), vec!["pipeline_p1"]);
}

/// Fluentd 방언은 Google Cloud Logging 출력을 거부한다
#[test]
fn test_google_cloud_logging_rejected_by_fluentd() {
    let spec = ForwarderSpec::parse_yaml(GOOGLE_CLOUD_LOGGING).expect("spec should parse");
    let err = compile(
        Target::Fluentd,
        &spec,
        &Secrets::new(),
        &ConfigMaps::new(),
        &CompileOptions::default(),
    )
    .expect_err("fluentd has no google cloud logging output");
    assert!(err.to_string().contains("googleCloudLogging"));
}
