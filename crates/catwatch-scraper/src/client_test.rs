use super::*;

#[test]
fn page_origin_strips_path() {
    let origin = page_origin("https://www.sheinindia.in/c/sverse-5939-37961").unwrap();
    assert_eq!(origin, "https://www.sheinindia.in");
}

#[test]
fn page_origin_keeps_explicit_port() {
    let origin = page_origin("http://127.0.0.1:8080/c/shoes").unwrap();
    assert_eq!(origin, "http://127.0.0.1:8080");
}

#[test]
fn page_origin_rejects_relative_url() {
    let err = page_origin("/c/sverse-5939-37961").unwrap_err();
    assert!(matches!(err, ScraperError::InvalidUrl { .. }));
}

#[test]
fn page_origin_rejects_hostless_url() {
    let err = page_origin("mailto:someone@example.com").unwrap_err();
    assert!(
        matches!(err, ScraperError::InvalidUrl { ref reason, .. } if reason.contains("no host"))
    );
}
