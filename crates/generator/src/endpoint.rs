//! 엔드포인트 URL 분해
//!
//! 출력 URL은 `url::Url`로 파싱합니다. 스킴 없는 `host:port` 형식은
//! `tcp://`를 붙여 authority로 읽습니다.

use url::{Host, Url};

fn parse(url: &str) -> Option<Url> {
    if url.contains("://") {
        Url::parse(url).ok()
    } else {
        Url::parse(&format!("tcp://{url}")).ok()
    }
}

/// 호스트가 있는 URL인지 여부
pub fn is_valid_endpoint(url: &str) -> bool {
    parse(url)
        .as_ref()
        .and_then(Url::host_str)
        .is_some_and(|h| !h.is_empty())
}

/// URL의 `host[:port]` 부분 (사용자 정보 제외)
pub fn url_authority(url: &str) -> String {
    let Some(parsed) = parse(url) else {
        return String::new();
    };
    let Some(host) = parsed.host_str() else {
        return String::new();
    };
    match parsed.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_owned(),
    }
}

/// URL 경로 (앞의 `/` 제외)
pub fn url_path(url: &str) -> String {
    parse(url)
        .map(|u| u.path().trim_start_matches('/').to_owned())
        .unwrap_or_default()
}

/// 호스트 이름 (IPv6 주소는 대괄호 제외)
pub fn url_host(url: &str) -> String {
    match parse(url).as_ref().and_then(Url::host) {
        Some(Host::Ipv6(addr)) => addr.to_string(),
        Some(host) => host.to_string(),
        None => String::new(),
    }
}

/// 명시된 포트 (없으면 None)
pub fn url_port(url: &str) -> Option<u16> {
    parse(url)?.port()
}
