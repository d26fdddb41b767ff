use super::*;

#[test]
fn endpoint_includes_account_sid() {
    let url = messages_endpoint("https://api.twilio.com", "AC123").unwrap();
    assert_eq!(
        url.as_str(),
        "https://api.twilio.com/2010-04-01/Accounts/AC123/Messages.json"
    );
}

#[test]
fn endpoint_strips_trailing_slash_and_keeps_prefix() {
    let url = messages_endpoint("http://127.0.0.1:8080/mock/", "AC123").unwrap();
    assert_eq!(
        url.as_str(),
        "http://127.0.0.1:8080/mock/2010-04-01/Accounts/AC123/Messages.json"
    );
}

#[test]
fn endpoint_rejects_garbage_base() {
    let err = messages_endpoint("not a url", "AC123").unwrap_err();
    assert!(matches!(err, NotifyError::InvalidBaseUrl { .. }));
}
