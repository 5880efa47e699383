//! Extraction and validation of annotation JSON from free-form responses.

use serde_json::{Map, Value};
use testscribe_core::Annotation;
use testscribe_error::{ProviderError, ProviderErrorKind};
use tracing::debug;

/// Body of every fenced code block in `text`, in order.
fn fenced_blocks(text: &str) -> Vec<&str> {
    let mut blocks = Vec::new();
    let mut rest = text;

    while let Some(open) = rest.find("```") {
        let after_fence = &rest[open + 3..];
        // Skip the info string (`json`, `python`, ...) up to the end of the line.
        let body_start = after_fence.find('\n').map_or(after_fence.len(), |idx| idx + 1);
        let body = &after_fence[body_start..];
        match body.find("```") {
            Some(close) => {
                blocks.push(&body[..close]);
                rest = &body[close + 3..];
            }
            None => break,
        }
    }
    blocks
}

/// Locate the JSON object inside a model response.
///
/// Fenced blocks whose body parses as a JSON object win; otherwise the text
/// between the first `{` and the last `}` is returned.
///
/// # Examples
///
/// ```
/// use testscribe_models::extract_json;
///
/// let fenced = "Here you go:\n```json\n{\"a\": 1}\n```";
/// assert_eq!(extract_json(fenced), Some("{\"a\": 1}"));
///
/// let raw = "Sure! {\"a\": 1} Hope that helps.";
/// assert_eq!(extract_json(raw), Some("{\"a\": 1}"));
///
/// assert_eq!(extract_json("no json here"), None);
/// ```
pub fn extract_json(text: &str) -> Option<&str> {
    for block in fenced_blocks(text) {
        let candidate = block.trim();
        if candidate.starts_with('{')
            && serde_json::from_str::<Map<String, Value>>(candidate).is_ok()
        {
            return Some(candidate);
        }
    }

    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

fn coerce_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other if !is_truthy(other) => String::new(),
        other => other.to_string(),
    }
}

fn invalid(message: impl Into<String>) -> ProviderError {
    ProviderError::new(ProviderErrorKind::InvalidResponse(message.into()))
}

/// Parse a model response into an [`Annotation`].
///
/// `scenario` and `why_needed` are coerced to strings; `key_assertions` must
/// be a list, and its empty entries are dropped.
///
/// # Errors
///
/// [`ProviderErrorKind::UnparseableResponse`] when no JSON object can be
/// decoded, [`ProviderErrorKind::InvalidResponse`] when the object has the
/// wrong shape. Neither is worth retrying.
///
/// # Examples
///
/// ```
/// use testscribe_models::parse_annotation;
///
/// let text = r#"{"scenario": "Adds", "why_needed": "Math", "key_assertions": ["a == 1", ""]}"#;
/// let annotation = parse_annotation(text).unwrap();
/// assert_eq!(annotation.key_assertions(), &vec!["a == 1".to_string()]);
/// assert_eq!(*annotation.confidence(), Some(0.8));
///
/// let bad = r#"{"scenario": "Adds", "why_needed": "Math", "key_assertions": "a == 1"}"#;
/// assert!(parse_annotation(bad).is_err());
/// ```
pub fn parse_annotation(text: &str) -> Result<Annotation, ProviderError> {
    let json = extract_json(text).ok_or_else(|| {
        ProviderError::new(ProviderErrorKind::UnparseableResponse(
            "no JSON object found in response".to_string(),
        ))
    })?;

    let value: Value = serde_json::from_str(json).map_err(|e| {
        ProviderError::new(ProviderErrorKind::UnparseableResponse(e.to_string()))
    })?;
    let Value::Object(object) = value else {
        return Err(invalid("expected a JSON object"));
    };

    let field = |name: &str| {
        object
            .get(name)
            .ok_or_else(|| invalid(format!("missing field '{}'", name)))
    };

    let scenario = coerce_text(field("scenario")?);
    let why_needed = coerce_text(field("why_needed")?);
    let Value::Array(items) = field("key_assertions")? else {
        return Err(invalid("key_assertions must be a list"));
    };

    let key_assertions: Vec<String> = items
        .iter()
        .filter(|item| is_truthy(item))
        .map(coerce_text)
        .collect();

    debug!(assertions = key_assertions.len(), "Parsed annotation");
    Ok(Annotation::new(scenario, why_needed, key_assertions))
}
