use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

/// Keys that change between renders of the same visa option.
const VOLATILE_KEYS: &[&str] = &["checklist", "raw_message"];
/// Keys compared case- and whitespace-insensitively.
const NORMALISED_KEYS: &[&str] = &["visa_type", "country"];

/// SHA-256 hex digest identifying a visa option for checklist caching.
///
/// The option is canonicalised first: volatile keys are removed (also from a
/// nested `details` object), `visa_type`/`country` are trimmed and
/// lowercased, and the JSON is serialised with sorted keys.
pub fn checklist_cache_key(option: &Map<String, Value>) -> String {
    let canonical = canonicalise(option);
    let mut hasher = Sha256::new();
    hasher.update(Value::Object(canonical).to_string().as_bytes());
    hex::encode(hasher.finalize())
}

fn canonicalise(option: &Map<String, Value>) -> Map<String, Value> {
    let mut map = option.clone();
    for key in VOLATILE_KEYS {
        map.remove(*key);
    }
    for key in NORMALISED_KEYS {
        if let Some(Value::String(s)) = map.get_mut(*key) {
            *s = s.trim().to_lowercase();
        }
    }
    if let Some(Value::Object(details)) = map.get("details") {
        let details = canonicalise(details);
        map.insert("details".to_string(), Value::Object(details));
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn key(value: Value) -> String {
        checklist_cache_key(value.as_object().unwrap())
    }

    #[test]
    fn test_key_is_hex_sha256() {
        let k = key(json!({"visa_type": "H-1B"}));
        assert_eq!(k.len(), 64);
        assert!(k.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_key_ignores_case_whitespace_and_key_order() {
        let a = key(json!({"visa_type": " Skilled Worker ", "country": "UK", "reasoning": "r"}));
        let b = key(json!({"reasoning": "r", "country": "uk", "visa_type": "skilled worker"}));
        assert_eq!(a, b);
    }

    #[test]
    fn test_key_ignores_volatile_fields() {
        let a = key(json!({"visa_type": "O-1", "checklist": [{"title": "x"}], "raw_message": "..."}));
        let b = key(json!({"visa_type": "O-1"}));
        assert_eq!(a, b);

        let c = key(json!({"visa_type": "O-1", "details": {"checklist": [], "country": "USA"}}));
        let d = key(json!({"visa_type": "O-1", "details": {"country": "usa"}}));
        assert_eq!(c, d);
    }

    #[test]
    fn test_key_differs_for_different_options() {
        assert_ne!(
            key(json!({"visa_type": "O-1"})),
            key(json!({"visa_type": "EB-1"}))
        );
        assert_ne!(
            key(json!({"visa_type": "O-1", "estimated_costs": "$5,000"})),
            key(json!({"visa_type": "O-1", "estimated_costs": "$6,000"}))
        );
    }
}
