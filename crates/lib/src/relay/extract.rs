//! Reply extraction from the webhook's JSON response.
//!
//! Two shapes are recognized: an array whose first element is an object (n8n "respond
//! with all items"), and a single object. Candidate locations are tried in order and the
//! first truthy value wins; absent and empty values are treated the same.

use serde_json::Value;

/// Where to look for the reply inside a recognized object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Candidate {
    /// Top-level key.
    Key(&'static str),
    /// Key inside the top-level `body` object.
    BodyKey(&'static str),
}

/// Rules for the array shape, applied to the first element.
const ARRAY_RULES: &[Candidate] = &[Candidate::Key("output")];

/// Rules for the object shape, in precedence order.
const OBJECT_RULES: &[Candidate] = &[
    Candidate::Key("reply"),
    Candidate::Key("output"),
    Candidate::BodyKey("reply"),
    Candidate::BodyKey("output"),
];

impl Candidate {
    fn lookup<'a>(&self, obj: &'a serde_json::Map<String, Value>) -> Option<&'a Value> {
        match self {
            Candidate::Key(k) => obj.get(*k),
            Candidate::BodyKey(k) => match obj.get("body") {
                Some(Value::Object(body)) => body.get(*k),
                _ => None,
            },
        }
    }
}

/// Extract the reply text, or None when the response has no usable value.
pub fn extract_reply(value: &Value) -> Option<String> {
    let (obj, rules) = match value {
        Value::Array(items) => match items.first() {
            Some(Value::Object(first)) => (first, ARRAY_RULES),
            _ => return None,
        },
        Value::Object(obj) => (obj, OBJECT_RULES),
        _ => return None,
    };
    rules
        .iter()
        .filter_map(|c| c.lookup(obj))
        .find_map(reply_text)
}

/// Text for a truthy value; None for null, false, zero, empty strings and empty containers.
fn reply_text(value: &Value) -> Option<String> {
    match value {
        Value::Null | Value::Bool(false) => None,
        Value::Bool(true) => Some("true".to_string()),
        Value::Number(n) => {
            if n.as_f64() == Some(0.0) {
                None
            } else {
                Some(n.to_string())
            }
        }
        Value::String(s) => {
            if s.is_empty() {
                None
            } else {
                Some(s.clone())
            }
        }
        Value::Array(a) if a.is_empty() => None,
        Value::Object(o) if o.is_empty() => None,
        other => Some(other.to_string()),
    }
}
