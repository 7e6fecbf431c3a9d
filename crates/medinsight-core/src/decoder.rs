//! Answer decoding
//!
//! Turns whatever the inference backend sent back into the text shown in the
//! chat log. Parsing is total: every field is pulled out as optional with a
//! default, so a malformed body degrades to empty content instead of an error.

use serde_json::Value;

/// Shown when the backend answered but neither summary part had content
pub const NO_RESPONSE: &str = "No response received from backend.";

/// A cited source attached to an answer
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resource {
    pub name: String,
    pub snippet: String,
}

/// The `answer` object of a `/ask` response, after lenient extraction
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnswerPayload {
    pub concise: String,
    pub context: String,
    pub resources: Vec<Resource>,
}

impl AnswerPayload {
    /// Read the inner `answer` object. Anything that is not an object yields
    /// an empty payload.
    pub fn from_value(value: &Value) -> Self {
        let resources = match value.get("resources") {
            Some(Value::Array(items)) => items.iter().map(Resource::from_value).collect(),
            _ => Vec::new(),
        };

        Self {
            concise: string_field(value, "concise"),
            context: string_field(value, "context"),
            resources,
        }
    }

    /// Read a full response body of the form `{"answer": {...}}`
    pub fn from_response(body: &Value) -> Self {
        body.get("answer")
            .map(Self::from_value)
            .unwrap_or_default()
    }
}

impl Resource {
    fn from_value(value: &Value) -> Self {
        Self {
            name: string_field(value, "name"),
            snippet: string_field(value, "snippet"),
        }
    }
}

/// `value[key]` if it is a string, otherwise empty. `Value::get` already
/// returns `None` for non-objects, which covers arrays, numbers and null.
fn string_field(value: &Value, key: &str) -> String {
    value
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// Compose the display string for one answer
pub fn decode(payload: &AnswerPayload) -> String {
    if payload.concise.is_empty() && payload.context.is_empty() {
        return NO_RESPONSE.to_string();
    }

    let mut text = format!(
        "**Concise:** {}\n\n**Context:** {}",
        payload.concise, payload.context
    );

    if !payload.resources.is_empty() {
        text.push_str("\n\n**Sources:**\n");
        let lines: Vec<String> = payload
            .resources
            .iter()
            .enumerate()
            .map(|(i, r)| format!("{}. {}: {}", i + 1, r.name, r.snippet))
            .collect();
        text.push_str(&lines.join("\n"));
    }

    text
}

/// Decode a raw response body straight to display text
pub fn decode_response(body: &Value) -> String {
    decode(&AnswerPayload::from_response(body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_full_answer_in_order() {
        let body = json!({
            "answer": {
                "concise": "Take rest",
                "context": "Viral infections resolve in 7-10 days",
                "resources": [{"name": "WHO", "snippet": "Guidelines on viral illness"}]
            }
        });
        let text = decode_response(&body);

        let concise = text.find("Take rest").unwrap();
        let context = text.find("Viral infections resolve in 7-10 days").unwrap();
        let source = text.find("1. WHO: Guidelines on viral illness").unwrap();
        assert!(concise < context);
        assert!(context < source);
    }

    #[test]
    fn test_decode_empty_answer_is_sentinel() {
        let body = json!({"answer": {"concise": "", "context": "", "resources": []}});
        assert_eq!(decode_response(&body), NO_RESPONSE);
    }

    #[test]
    fn test_both_labels_present_when_one_part_empty() {
        let payload = AnswerPayload {
            concise: "Drink water".to_string(),
            ..Default::default()
        };
        let text = decode(&payload);
        assert_eq!(text, "**Concise:** Drink water\n\n**Context:** ");
    }

    #[test]
    fn test_sources_section_omitted_when_no_resources() {
        let body = json!({"answer": {"concise": "a", "context": "b"}});
        let text = decode_response(&body);
        assert!(!text.contains("Sources"));
    }

    #[test]
    fn test_sources_are_numbered_from_one() {
        let body = json!({"answer": {
            "concise": "a",
            "context": "b",
            "resources": [
                {"name": "WHO", "snippet": "one"},
                {"name": "CDC"},
                {"snippet": "orphan"}
            ]
        }});
        let text = decode_response(&body);
        assert!(text.ends_with("**Sources:**\n1. WHO: one\n2. CDC: \n3. : orphan"));
    }

    #[test]
    fn test_decode_never_fails_on_odd_shapes() {
        let inputs = vec![
            Value::Null,
            json!(42),
            json!("answer"),
            json!([1, 2, 3]),
            json!({}),
            json!({"answer": null}),
            json!({"answer": "plain string"}),
            json!({"answer": {"concise": 5, "context": ["x"]}}),
            json!({"answer": {"concise": "a", "resources": "not a list"}}),
            json!({"answer": {"concise": "a", "resources": [null, 7, "x", {"name": 3}]}}),
        ];

        for input in inputs {
            let text = decode_response(&input);
            assert!(!text.is_empty(), "empty output for {input}");
        }
    }

    #[test]
    fn test_wrong_typed_fields_become_empty() {
        let payload = AnswerPayload::from_response(&json!({
            "answer": {"concise": 5, "context": "ok", "resources": [null, {"name": true, "snippet": "s"}]}
        }));
        assert_eq!(payload.concise, "");
        assert_eq!(payload.context, "ok");
        assert_eq!(
            payload.resources,
            vec![
                Resource::default(),
                Resource { name: String::new(), snippet: "s".to_string() }
            ]
        );
    }
}
