use std::collections::HashMap;
use std::env::VarError;
use std::io::Write;

use super::*;

fn lookup_from_map<'a>(
    map: &'a HashMap<&'a str, &'a str>,
) -> impl Fn(&str) -> Result<String, VarError> + 'a {
    move |key| {
        map.get(key)
            .map(|v| (*v).to_string())
            .ok_or(VarError::NotPresent)
    }
}

/// Returns a map with the Twilio credentials populated.
fn full_env<'a>() -> HashMap<&'a str, &'a str> {
    let mut m = HashMap::new();
    m.insert("TWILIO_ACCOUNT_SID", "AC123");
    m.insert("TWILIO_AUTH_TOKEN", "secret-token");
    m.insert("TWILIO_WHATSAPP_FROM", "whatsapp:+14155238886");
    m.insert("TWILIO_WHATSAPP_TO", "whatsapp:+919900000000");
    m
}

#[test]
fn build_app_config_fails_without_account_sid() {
    let map: HashMap<&str, &str> = HashMap::new();
    let result = build_app_config(&FileConfig::default(), lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::MissingKey(ref v)) if v == "TWILIO_ACCOUNT_SID"),
        "expected MissingKey(TWILIO_ACCOUNT_SID), got: {result:?}"
    );
}

#[test]
fn build_app_config_treats_blank_env_as_missing() {
    let mut map = full_env();
    map.insert("TWILIO_WHATSAPP_TO", "   ");
    let result = build_app_config(&FileConfig::default(), lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::MissingKey(ref v)) if v == "TWILIO_WHATSAPP_TO"),
        "expected MissingKey(TWILIO_WHATSAPP_TO), got: {result:?}"
    );
}

#[test]
fn build_app_config_applies_defaults() {
    let map = full_env();
    let cfg = build_app_config(&FileConfig::default(), lookup_from_map(&map)).unwrap();
    assert_eq!(cfg.url, DEFAULT_URL);
    assert_eq!(cfg.check_interval_seconds, 300);
    assert_eq!(cfg.storage_path, PathBuf::from("product_counts.json"));
    assert_eq!(
        cfg.products_storage_path,
        PathBuf::from("tracked_products.json")
    );
    assert_eq!(cfg.product_origin, DEFAULT_PRODUCT_ORIGIN);
    assert_eq!(cfg.max_products_per_message, 5);
    assert!(cfg.count_visible_products);
    assert_eq!(cfg.request_timeout_secs, 30);
    assert_eq!(cfg.user_agent, DEFAULT_USER_AGENT);
    assert_eq!(cfg.log_level, "info");
    assert_eq!(cfg.twilio.account_sid, "AC123");
}

#[test]
fn file_values_fill_in_when_env_is_absent() {
    let map: HashMap<&str, &str> = HashMap::new();
    let file = FileConfig {
        url: Some("https://example.com/c/shoes-1-2".to_string()),
        check_interval_seconds: Some(60),
        storage_path: Some(PathBuf::from("state/counts.json")),
        twilio_account_sid: Some("ACfile".to_string()),
        twilio_auth_token: Some("file-token".to_string()),
        twilio_whatsapp_from: Some("whatsapp:+1".to_string()),
        twilio_whatsapp_to: Some("whatsapp:+2".to_string()),
        ..FileConfig::default()
    };
    let cfg = build_app_config(&file, lookup_from_map(&map)).unwrap();
    assert_eq!(cfg.url, "https://example.com/c/shoes-1-2");
    assert_eq!(cfg.check_interval_seconds, 60);
    assert_eq!(cfg.storage_path, PathBuf::from("state/counts.json"));
    assert_eq!(cfg.twilio.account_sid, "ACfile");
}

#[test]
fn env_overrides_file_values() {
    let mut map = full_env();
    map.insert("CATWATCH_CHECK_INTERVAL_SECONDS", "90");
    let file = FileConfig {
        check_interval_seconds: Some(60),
        twilio_account_sid: Some("ACfile".to_string()),
        ..FileConfig::default()
    };
    let cfg = build_app_config(&file, lookup_from_map(&map)).unwrap();
    assert_eq!(cfg.check_interval_seconds, 90);
    assert_eq!(cfg.twilio.account_sid, "AC123");
}

#[test]
fn invalid_interval_is_rejected() {
    let mut map = full_env();
    map.insert("CATWATCH_CHECK_INTERVAL_SECONDS", "soon");
    let result = build_app_config(&FileConfig::default(), lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidValue { ref key, .. }) if key == "CATWATCH_CHECK_INTERVAL_SECONDS"),
        "expected InvalidValue(CATWATCH_CHECK_INTERVAL_SECONDS), got: {result:?}"
    );
}

#[test]
fn zero_interval_is_rejected() {
    let mut map = full_env();
    map.insert("CATWATCH_CHECK_INTERVAL_SECONDS", "0");
    let result = build_app_config(&FileConfig::default(), lookup_from_map(&map));
    assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
}

#[test]
fn count_visible_products_parses_booleans() {
    let mut map = full_env();
    map.insert("CATWATCH_COUNT_VISIBLE_PRODUCTS", "no");
    let cfg = build_app_config(&FileConfig::default(), lookup_from_map(&map)).unwrap();
    assert!(!cfg.count_visible_products);

    map.insert("CATWATCH_COUNT_VISIBLE_PRODUCTS", "maybe");
    let result = build_app_config(&FileConfig::default(), lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidValue { ref key, .. }) if key == "CATWATCH_COUNT_VISIBLE_PRODUCTS")
    );
}

#[test]
fn product_origin_trailing_slash_is_trimmed() {
    let mut map = full_env();
    map.insert("CATWATCH_PRODUCT_ORIGIN", "https://shop.example.com/");
    let cfg = build_app_config(&FileConfig::default(), lookup_from_map(&map)).unwrap();
    assert_eq!(cfg.product_origin, "https://shop.example.com");
}

#[test]
fn debug_output_redacts_auth_token() {
    let map = full_env();
    let cfg = build_app_config(&FileConfig::default(), lookup_from_map(&map)).unwrap();
    let rendered = format!("{cfg:?}");
    assert!(!rendered.contains("secret-token"));
    assert!(rendered.contains("[redacted]"));
}

#[test]
fn load_file_config_missing_file_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    let file = load_file_config(&dir.path().join("absent.json")).unwrap();
    assert!(file.url.is_none());
    assert!(file.twilio_account_sid.is_none());
}

#[test]
fn load_file_config_accepts_json() {
    let mut tmp = tempfile::NamedTempFile::new().unwrap();
    write!(
        tmp,
        r#"{{
  "url": "https://www.sheinindia.in/c/sverse-5939-37961",
  "check_interval_seconds": 120,
  "storage_path": "product_counts.json",
  "twilio_account_sid": "ACjson",
  "twilio_auth_token": "tok",
  "twilio_whatsapp_from": "whatsapp:+14155238886",
  "twilio_whatsapp_to": "whatsapp:+919900000000"
}}"#
    )
    .unwrap();

    let file = load_file_config(tmp.path()).unwrap();
    assert_eq!(file.check_interval_seconds, Some(120));
    assert_eq!(file.twilio_account_sid.as_deref(), Some("ACjson"));
}

#[test]
fn load_file_config_rejects_malformed_file() {
    let mut tmp = tempfile::NamedTempFile::new().unwrap();
    write!(tmp, "check_interval_seconds: [not, a, number]").unwrap();
    let err = load_file_config(tmp.path()).unwrap_err();
    assert!(matches!(err, ConfigError::FileParse { .. }));
}
