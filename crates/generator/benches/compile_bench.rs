//! 컴파일 벤치마크
//!
//! 최소 포워더와 다중 파이프라인 포워더를 두 방언으로 컴파일하는 시간을 측정합니다.

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use logfwd_core::forwarder::{ForwarderSpec, OutputSpec, OutputType, PipelineSpec};
use logfwd_core::options::{CompileOptions, Target};
use logfwd_core::secrets::{ConfigMaps, Secrets};
use logfwd_generator::compile;

fn pipeline(name: &str, inputs: &[&str], outputs: &[&str]) -> PipelineSpec {
    PipelineSpec {
        name: name.to_owned(),
        input_refs: inputs.iter().map(|s| (*s).to_owned()).collect(),
        output_refs: outputs.iter().map(|s| (*s).to_owned()).collect(),
        ..PipelineSpec::default()
    }
}

fn minimal() -> ForwarderSpec {
    ForwarderSpec {
        outputs: vec![OutputSpec::new("loki-1", OutputType::Loki, "http://loki:3100")],
        pipelines: vec![pipeline("p1", &["application"], &["loki-1"])],
        ..ForwarderSpec::default()
    }
}

/// 출력 `n`개, 출력마다 파이프라인 하나 (입력은 세 기본 타입을 돌아가며 사용)
fn wide(n: usize) -> ForwarderSpec {
    let inputs = ["application", "infrastructure", "audit"];
    let mut spec = ForwarderSpec::default();
    for i in 0..n {
        let output = format!("out-{i}");
        let kind = if i % 2 == 0 { OutputType::Loki } else { OutputType::Http };
        spec.outputs
            .push(OutputSpec::new(output.as_str(), kind, format!("http://backend-{i}:8080")));
        let mut p = pipeline(&format!("p-{i}"), &[inputs[i % inputs.len()]], &[&output]);
        p.labels.insert("index".to_owned(), i.to_string());
        spec.pipelines.push(p);
    }
    spec
}

fn bench_minimal(c: &mut Criterion) {
    let spec = minimal();
    let secrets = Secrets::new();
    let config_maps = ConfigMaps::new();
    let options = CompileOptions::default();

    let mut group = c.benchmark_group("compile_minimal");
    group.throughput(Throughput::Elements(1));
    for target in [Target::Vector, Target::Fluentd] {
        group.bench_function(target.as_str(), |b| {
            b.iter(|| compile(target, black_box(&spec), &secrets, &config_maps, &options).unwrap())
        });
    }
    group.finish();
}

fn bench_wide(c: &mut Criterion) {
    let secrets = Secrets::new();
    let config_maps = ConfigMaps::new();
    let options = CompileOptions::default();

    let mut group = c.benchmark_group("compile_wide");
    for n in [4usize, 16, 64] {
        let spec = wide(n);
        group.throughput(Throughput::Elements(n as u64));
        for target in [Target::Vector, Target::Fluentd] {
            group.bench_with_input(BenchmarkId::new(target.as_str(), n), &spec, |b, spec| {
                b.iter(|| compile(target, black_box(spec), &secrets, &config_maps, &options).unwrap())
            });
        }
    }
    group.finish();
}

criterion_group!(benches, bench_minimal, bench_wide);
criterion_main!(benches);
