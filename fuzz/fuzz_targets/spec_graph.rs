#![no_main]

use std::collections::BTreeSet;

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use logfwd_core::forwarder::{
    ApplicationInput, ForwarderSpec, InputSpec, LimitSpec, OutputSpec, OutputType, PipelineSpec,
};
use logfwd_core::options::{CompileOptions, Target};
use logfwd_core::secrets::{ConfigMaps, Secrets};
use logfwd_generator::compile;

/// 퍼저용 구조적 입력 (파이프라인 그래프)
#[derive(Arbitrary, Debug)]
struct FuzzInput {
    /// 네임스페이스 셀렉터 입력 (최대 4개로 제한)
    selectors: Vec<Vec<u8>>,
    outputs: Vec<FuzzOutput>,
    pipelines: Vec<FuzzPipeline>,
}

#[derive(Arbitrary, Debug)]
struct FuzzOutput {
    kind: FuzzKind,
    limit: Option<u16>,
}

#[derive(Arbitrary, Debug)]
enum FuzzKind {
    Loki,
    Http,
    Elasticsearch,
}

#[derive(Arbitrary, Debug)]
struct FuzzPipeline {
    /// 입력 인덱스 (0..3은 내장 입력, 나머지는 셀렉터 입력)
    inputs: Vec<u8>,
    /// 출력 인덱스
    outputs: Vec<u8>,
    /// 사용자 레이블 값
    label: Option<String>,
}

impl FuzzKind {
    fn output_type(&self) -> OutputType {
        match self {
            Self::Loki => OutputType::Loki,
            Self::Http => OutputType::Http,
            Self::Elasticsearch => OutputType::Elasticsearch,
        }
    }
}

const BUILTIN: [&str; 3] = ["application", "infrastructure", "audit"];

fn build(input: &FuzzInput) -> Option<ForwarderSpec> {
    let inputs: Vec<InputSpec> = input
        .selectors
        .iter()
        .take(4)
        .enumerate()
        .map(|(i, namespaces)| InputSpec {
            name: format!("sel-{i}"),
            application: Some(ApplicationInput {
                namespaces: namespaces.iter().take(4).map(|n| format!("ns-{n}")).collect(),
                selector: None,
            }),
            ..InputSpec::default()
        })
        .collect();

    let outputs: Vec<OutputSpec> = input
        .outputs
        .iter()
        .take(6)
        .enumerate()
        .map(|(i, o)| {
            let mut out = OutputSpec::new(
                format!("out-{i}"),
                o.kind.output_type(),
                format!("http://backend-{i}:8080"),
            );
            out.limit = o.limit.filter(|l| *l > 0).map(|l| LimitSpec {
                max_records_per_second: u64::from(l),
            });
            out
        })
        .collect();
    if outputs.is_empty() {
        return None;
    }

    let input_names: Vec<String> = BUILTIN
        .iter()
        .map(|s| (*s).to_owned())
        .chain(inputs.iter().map(|i| i.name.clone()))
        .collect();

    let pipelines: Vec<PipelineSpec> = input
        .pipelines
        .iter()
        .take(8)
        .enumerate()
        .map(|(i, p)| {
            let mut input_refs: Vec<String> = p
                .inputs
                .iter()
                .take(4)
                .map(|idx| input_names[usize::from(*idx) % input_names.len()].clone())
                .collect();
            let mut seen = BTreeSet::new();
            input_refs.retain(|r| seen.insert(r.clone()));
            let mut output_refs: Vec<String> = p
                .outputs
                .iter()
                .take(4)
                .map(|idx| outputs[usize::from(*idx) % outputs.len()].name.clone())
                .collect();
            let mut seen = BTreeSet::new();
            output_refs.retain(|r| seen.insert(r.clone()));
            let mut pipeline = PipelineSpec {
                name: format!("p-{i}"),
                input_refs,
                output_refs,
                ..PipelineSpec::default()
            };
            if let Some(value) = &p.label {
                pipeline.labels.insert("fuzz".to_owned(), value.clone());
            }
            pipeline
        })
        .filter(|p| !p.input_refs.is_empty() && !p.output_refs.is_empty())
        .collect();
    if pipelines.is_empty() {
        return None;
    }

    Some(ForwarderSpec {
        inputs,
        outputs,
        pipelines,
        ..ForwarderSpec::default()
    })
}

fuzz_target!(|input: FuzzInput| {
    let Some(spec) = build(&input) else {
        return;
    };
    let secrets = Secrets::new();
    let config_maps = ConfigMaps::new();
    let options = CompileOptions::default();

    // 구조적으로 유효한 그래프는 항상 컴파일되어야 함
    let vector = compile(Target::Vector, &spec, &secrets, &config_maps, &options)
        .expect("valid graph should compile to vector");
    let parsed: Result<toml::Value, _> = toml::from_str(&vector.conf);
    assert!(parsed.is_ok(), "vector output must be valid TOML");

    let fluentd = compile(Target::Fluentd, &spec, &secrets, &config_maps, &options)
        .expect("valid graph should compile to fluentd");
    let opened = fluentd.conf.lines().filter(|l| l.starts_with("<label ")).count();
    let closed = fluentd.conf.lines().filter(|l| *l == "</label>").count();
    assert_eq!(opened, closed, "every label block must close");
});
