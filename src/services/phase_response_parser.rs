//! Lenient extraction of structured results from LLM output.
//!
//! Models are asked for a single JSON value but routinely wrap it in prose
//! or code fences and drift in field naming. Parsing never fails: output
//! nothing can be extracted from degrades to an empty, final result so a
//! misbehaving model cannot keep the phase loop spinning.

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::domain::models::{PhaseResult, ResourceRequest};

/// Accepted field names for a request's resource type, in priority order.
const RESOURCE_TYPE_ALIASES: &[&str] = &["resource_type", "type", "resource"];

/// Accepted field names for a request's resource id, in priority order.
const RESOURCE_ID_ALIASES: &[&str] = &["resource_id", "name", "identifier", "id"];

/// Wire shape of a resource request before alias resolution.
#[derive(Debug)]
struct RawResourceRequest {
    resource_type: Option<String>,
    resource_id: Option<String>,
    reason: String,
}

impl RawResourceRequest {
    fn from_value(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        Some(Self {
            resource_type: first_string(object, RESOURCE_TYPE_ALIASES),
            resource_id: first_string(object, RESOURCE_ID_ALIASES),
            reason: object
                .get("reason")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        })
    }

    fn resolve(self) -> Option<ResourceRequest> {
        Some(ResourceRequest {
            resource_type: self.resource_type?,
            resource_id: self.resource_id?,
            reason: self.reason,
        })
    }
}

/// First alias holding a non-empty string or a number.
fn first_string(object: &Map<String, Value>, aliases: &[&str]) -> Option<String> {
    aliases.iter().find_map(|alias| match object.get(*alias)? {
        Value::String(s) => Some(s.trim()).filter(|s| !s.is_empty()).map(ToString::to_string),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// Array stored under `key`; missing, null or mistyped fields read as empty.
fn array_field<'a>(object: &'a Map<String, Value>, key: &str) -> &'a [Value] {
    object
        .get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

/// Parse the outermost `{...}` span of `raw` as a JSON object.
fn parse_object(raw: &str) -> Result<Map<String, Value>, String> {
    let span = outer_span(raw, '{', '}').ok_or_else(|| "no JSON object".to_string())?;
    match serde_json::from_str::<Value>(span) {
        Ok(Value::Object(object)) => Ok(object),
        Ok(_) => Err("JSON span is not an object".to_string()),
        Err(e) => Err(e.to_string()),
    }
}

/// Slice from the first `open` to the last `close`, inclusive.
fn outer_span(raw: &str, open: char, close: char) -> Option<&str> {
    let start = raw.find(open)?;
    let end = raw.rfind(close)?;
    if end <= start {
        return None;
    }
    Some(&raw[start..=end])
}

/// Parse a multi-phase response into a [`PhaseResult`].
///
/// Once a JSON object is found each field is read on its own: findings
/// pass through verbatim and a mistyped field falls back to its default
/// without discarding the rest.
pub fn parse_phase_response(raw: &str, phase_number: usize) -> PhaseResult {
    let object = match parse_object(raw) {
        Ok(object) => object,
        Err(error) => {
            warn!(phase_number, %error, "unparseable phase response");
            return PhaseResult::exhausted(phase_number);
        }
    };

    let findings = array_field(&object, "findings")
        .iter()
        .filter(|value| value.is_object())
        .cloned()
        .collect();

    let resource_requests = array_field(&object, "resource_requests")
        .iter()
        .filter_map(|value| {
            let resolved = RawResourceRequest::from_value(value).and_then(RawResourceRequest::resolve);
            if resolved.is_none() {
                debug!(request = %value, "dropping resource request without type or id");
            }
            resolved
        })
        .collect();

    PhaseResult {
        phase_number,
        findings,
        resource_requests,
        final_determination: object
            .get("final_determination")
            .and_then(Value::as_bool)
            .unwrap_or(false),
    }
}

/// Parse a single-phase response into raw finding mappings.
///
/// Accepts a JSON array of findings, or an object carrying a `findings`
/// array. Anything else yields no findings.
pub fn parse_findings_array(raw: &str) -> Vec<Value> {
    if let Some(span) = outer_span(raw, '[', ']') {
        if let Ok(Value::Array(items)) = serde_json::from_str::<Value>(span) {
            return items.into_iter().filter(Value::is_object).collect();
        }
    }

    if let Ok(object) = parse_object(raw) {
        return array_field(&object, "findings")
            .iter()
            .filter(|value| value.is_object())
            .cloned()
            .collect();
    }

    warn!("no findings array in single-phase response");
    Vec::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_non_json_is_fail_safe() {
        let result = parse_phase_response("This is not JSON at all", 1);
        assert!(result.findings.is_empty());
        assert!(result.resource_requests.is_empty());
        assert!(result.final_determination);
        assert_eq!(result.phase_number, 1);
    }

    #[test]
    fn test_broken_json_is_fail_safe() {
        let result = parse_phase_response("Here you go: {\"findings\": [ oops }", 2);
        assert!(result.final_determination);
        assert!(result.findings.is_empty());
    }

    #[test]
    fn test_alias_resolution() {
        let raw = r#"{"resource_requests": [{"type": "skill", "name": "testing", "reason": "x"}]}"#;
        let result = parse_phase_response(raw, 1);

        assert_eq!(
            result.resource_requests,
            vec![ResourceRequest::new("skill", "testing", "x")]
        );
        assert!(!result.final_determination);
    }

    #[test]
    fn test_all_aliases_accepted() {
        let raw = r#"{"resource_requests": [
            {"resource": "agent", "identifier": "reviewer"},
            {"resource_type": "command", "id": "deploy"}
        ]}"#;
        let result = parse_phase_response(raw, 1);

        assert_eq!(result.resource_requests[0].key(), "agent:reviewer");
        assert_eq!(result.resource_requests[1].key(), "command:deploy");
    }

    #[test]
    fn test_canonical_names_take_priority_over_aliases() {
        let raw = r#"{"resource_requests": [
            {"resource_type": "command", "type": "skill", "resource_id": "a", "name": "b"}
        ]}"#;
        let result = parse_phase_response(raw, 1);
        assert_eq!(result.resource_requests[0].key(), "command:a");
    }

    #[test]
    fn test_incomplete_requests_dropped_silently() {
        let raw = r#"{"resource_requests": [
            {"type": "skill"},
            {"name": "orphan"},
            "not an object",
            {"type": "command", "name": "test"}
        ]}"#;
        let result = parse_phase_response(raw, 1);
        assert_eq!(result.resource_requests, vec![ResourceRequest::new("command", "test", "")]);
    }

    #[test]
    fn test_prose_wrapped_object_and_findings_passthrough() {
        let raw = r#"Sure! ```json
{"findings": [{"observed_behavior": "o", "expected_behavior": "e", "turn_number": 3}, 42],
 "final_determination": true}
``` Hope that helps."#;
        let result = parse_phase_response(raw, 3);

        assert_eq!(result.phase_number, 3);
        assert!(result.final_determination);
        assert_eq!(
            result.findings,
            vec![json!({"observed_behavior": "o", "expected_behavior": "e", "turn_number": 3})]
        );
    }

    #[test]
    fn test_null_and_mistyped_fields_keep_valid_findings() {
        let raw = r#"{"findings":[{"observed_behavior":"o","expected_behavior":"e"}],
                     "resource_requests":null,"final_determination":false}"#;
        let result = parse_phase_response(raw, 2);
        assert_eq!(result.findings.len(), 1);
        assert!(result.resource_requests.is_empty());
        assert!(!result.final_determination);

        let raw = r#"{"findings":[{"observed_behavior":"o","expected_behavior":"e"}],
                     "resource_requests":{"type":"command","id":"test"},
                     "final_determination":"true"}"#;
        let result = parse_phase_response(raw, 2);
        assert_eq!(result.findings.len(), 1);
        assert!(result.resource_requests.is_empty());
        assert!(!result.final_determination);

        let raw = r#"{"findings":null,"resource_requests":[{"type":"skill","id":"testing"}]}"#;
        let result = parse_phase_response(raw, 2);
        assert!(result.findings.is_empty());
        assert_eq!(result.resource_requests[0].key(), "skill:testing");
    }

    #[test]
    fn test_numeric_ids_are_stringified() {
        let raw = r#"{"resource_requests":[{"type":"command","id":5},{"type":"command","id":true}]}"#;
        let result = parse_phase_response(raw, 1);
        assert_eq!(result.resource_requests, vec![ResourceRequest::new("command", "5", "")]);
    }

    #[test]
    fn test_final_determination_defaults_false() {
        let result = parse_phase_response("{}", 1);
        assert!(!result.final_determination);
    }

    #[test]
    fn test_findings_array_variants() {
        let array = r#"Result: [{"observed_behavior": "o", "expected_behavior": "e"}]"#;
        assert_eq!(parse_findings_array(array).len(), 1);

        let object = r#"{"findings": [{"observed_behavior": "o", "expected_behavior": "e"}]}"#;
        assert_eq!(parse_findings_array(object).len(), 1);

        assert!(parse_findings_array("[]").is_empty());
        assert!(parse_findings_array("nothing here").is_empty());
    }
}
