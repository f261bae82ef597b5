//! 파일 버퍼 블록
//!
//! 전역 `tuning.buffer` 값이 기본값을 덮어쓰고, 출력별 재시도 기간은
//! `retry_wait` / `retry_max_interval`로 옮겨집니다.

use logfwd_core::forwarder::{FlushMode, OutputType};

use crate::fluentd::DATA_DIR;
use crate::fluentd::elements::{Block, from_env, quoted};
use crate::fluentd::outputs::OutputContext;

const FLUSH_THREAD_COUNT: &str = "2";
const FLUSH_INTERVAL: &str = "1s";
const FORWARD_FLUSH_INTERVAL: &str = "5s";
const RETRY_TYPE: &str = "exponential_backoff";
const RETRY_WAIT: &str = "1s";
const RETRY_MAX_INTERVAL: &str = "60s";
const RETRY_TIMEOUT: &str = "60m";
const QUEUE_LIMIT: &str = "32";
const TOTAL_LIMIT_SIZE: &str = "8589934592";
const CHUNK_LIMIT_SIZE: &str = "8m";
const OVERFLOW_ACTION: &str = "block";

/// `<buffer keys>` 블록
///
/// `store_id`가 파일 경로를 정합니다 (`/var/lib/fluentd/<store_id>`).
pub fn buffer(ctx: &OutputContext<'_>, keys: &[&str], store_id: &str) -> Block {
    let tuning = ctx.spec.tuning.buffer.as_ref();
    let output_tuning = ctx.output.tuning.as_ref();

    let mut block = Block::new("buffer");
    if !keys.is_empty() {
        block = block.arg(keys.join(","));
    }
    let flush_mode = tuning
        .and_then(|t| t.flush_mode)
        .unwrap_or(FlushMode::Interval);
    block = block
        .param("@type", "file")
        .param("path", quoted(&format!("{DATA_DIR}/{store_id}")))
        .param("flush_mode", flush_mode.as_str());
    if flush_mode == FlushMode::Interval {
        let default_interval = if ctx.output.kind == OutputType::FluentdForward {
            FORWARD_FLUSH_INTERVAL
        } else {
            FLUSH_INTERVAL
        };
        let interval = tuning
            .and_then(|t| t.flush_interval.clone())
            .unwrap_or_else(|| default_interval.to_owned());
        block.push_param("flush_interval", interval);
    }

    let retry_wait = output_tuning
        .and_then(|t| t.min_retry_duration)
        .map(|s| format!("{s}s"))
        .or_else(|| tuning.and_then(|t| t.retry_wait.clone()))
        .unwrap_or_else(|| RETRY_WAIT.to_owned());
    let retry_max_interval = output_tuning
        .and_then(|t| t.max_retry_duration)
        .map(|s| format!("{s}s"))
        .or_else(|| tuning.and_then(|t| t.retry_max_interval.clone()))
        .unwrap_or_else(|| RETRY_MAX_INTERVAL.to_owned());

    block
        .param(
            "flush_thread_count",
            tuning
                .and_then(|t| t.flush_thread_count)
                .filter(|n| *n > 0)
                .map_or_else(|| FLUSH_THREAD_COUNT.to_owned(), |n| n.to_string()),
        )
        .param(
            "retry_type",
            tuning
                .and_then(|t| t.retry_type)
                .map_or(RETRY_TYPE, |r| r.as_str()),
        )
        .param("retry_wait", retry_wait)
        .param("retry_max_interval", retry_max_interval)
        .param(
            "retry_timeout",
            tuning
                .and_then(|t| t.retry_timeout.clone())
                .unwrap_or_else(|| RETRY_TIMEOUT.to_owned()),
        )
        .param("queued_chunks_limit_size", from_env("BUFFER_QUEUE_LIMIT", QUEUE_LIMIT))
        .param(
            "total_limit_size",
            tuning
                .and_then(|t| t.total_limit_size.clone())
                .unwrap_or_else(|| from_env("TOTAL_LIMIT_SIZE_PER_BUFFER", TOTAL_LIMIT_SIZE)),
        )
        .param(
            "chunk_limit_size",
            tuning
                .and_then(|t| t.chunk_limit_size.clone())
                .unwrap_or_else(|| from_env("BUFFER_SIZE_LIMIT", CHUNK_LIMIT_SIZE)),
        )
        .param(
            "overflow_action",
            tuning
                .and_then(|t| t.overflow_action)
                .map_or(OVERFLOW_ACTION, |o| o.as_str()),
        )
        .param("disable_chunk_backup", "true")
}
