//! Response parsing tests.

use testscribe_error::ProviderErrorKind;
use testscribe_models::{extract_json, parse_annotation};

const BODY: &str = r#"{"scenario": "Checks login", "why_needed": "Auth regressions", "key_assertions": ["status == 200", "token is set"]}"#;

#[test]
fn test_fenced_and_bare_json_agree() {
    let bare = parse_annotation(BODY).unwrap();
    let json_fence = parse_annotation(&format!("```json\n{}\n```", BODY)).unwrap();
    let plain_fence = parse_annotation(&format!("```\n{}\n```", BODY)).unwrap();
    let prose = parse_annotation(&format!("Sure.\n\n{}\n\nAnything else?", BODY)).unwrap();

    assert_eq!(bare, json_fence);
    assert_eq!(bare, plain_fence);
    assert_eq!(bare, prose);
    assert_eq!(bare.key_assertions().len(), 2);
}

#[test]
fn test_first_valid_fence_wins() {
    let text = format!(
        "```json\n{{not json}}\n```\n```json\n{}\n```",
        BODY
    );
    assert_eq!(extract_json(&text), Some(BODY));
}

#[test]
fn test_no_json_is_unparseable() {
    let err = parse_annotation("The test checks the login flow.").unwrap_err();
    assert_eq!(
        err.kind,
        ProviderErrorKind::UnparseableResponse("no JSON object found in response".to_string())
    );
}

#[test]
fn test_non_list_assertions_rejected() {
    for value in [r#""status == 200""#, "42", "null", r#"{"a": 1}"#] {
        let text = format!(
            r#"{{"scenario": "s", "why_needed": "w", "key_assertions": {}}}"#,
            value
        );
        let err = parse_annotation(&text).unwrap_err();
        assert_eq!(
            err.kind,
            ProviderErrorKind::InvalidResponse("key_assertions must be a list".to_string()),
            "value {value} should be rejected"
        );
    }
}

#[test]
fn test_nested_values_become_json_text() {
    let text = r#"{"scenario": {"kind": "login"}, "why_needed": true, "key_assertions": [["a", "b"]]}"#;
    let annotation = parse_annotation(text).unwrap();
    assert_eq!(annotation.scenario(), r#"{"kind":"login"}"#);
    assert_eq!(annotation.why_needed(), "true");
    assert_eq!(annotation.key_assertions(), &vec![r#"["a","b"]"#.to_string()]);
}

#[test]
fn test_errors_are_not_retryable() {
    use testscribe_error::RetryableError;

    let err = parse_annotation("nothing here").unwrap_err();
    assert!(!err.is_retryable());
}
