#![no_main]

use libfuzzer_sys::fuzz_target;
use logfwd_core::forwarder::ForwarderSpec;
use logfwd_core::options::{CompileOptions, Target};
use logfwd_core::secrets::{ConfigMaps, Secrets};
use logfwd_generator::compile;

fuzz_target!(|data: &[u8]| {
    // YAML 파서는 &str을 받으므로 UTF-8 변환 필요
    let Ok(yaml_str) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(spec) = ForwarderSpec::parse_yaml(yaml_str) else {
        return;
    };

    let secrets = Secrets::new();
    let config_maps = ConfigMaps::new();
    let options = CompileOptions::default();
    for target in [Target::Vector, Target::Fluentd] {
        let first = compile(target, &spec, &secrets, &config_maps, &options);
        let second = compile(target, &spec, &secrets, &config_maps, &options);
        // 같은 입력은 같은 결과
        assert_eq!(first, second);
    }
});
