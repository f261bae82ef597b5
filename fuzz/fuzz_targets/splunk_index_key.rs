#![no_main]

use libfuzzer_sys::fuzz_target;
use logfwd_generator::validate::is_valid_index_key;

fuzz_target!(|data: &[u8]| {
    if let Ok(key) = std::str::from_utf8(data) {
        if is_valid_index_key(key) {
            // 유효한 키는 비어 있지 않고 점으로 시작하거나 끝나지 않음
            assert!(!key.is_empty());
            assert!(!key.starts_with('.') && !key.ends_with('.'));
        }
    }
});
