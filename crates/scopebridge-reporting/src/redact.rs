//! PII redaction for headers and decoded body fields

use scopebridge_core::{Headers, RedactionRuleSet, RuleNode};
use serde_json::Value;

/// Drop stripped headers and mask PII headers, preserving order
///
/// A header listed in both sets is dropped.
pub fn redact_headers(headers: &Headers, rules: &RedactionRuleSet) -> Headers {
    headers
        .iter()
        .filter_map(|(name, value)| {
            let lower = name.to_ascii_lowercase();
            if rules.strip_headers.contains(&lower) {
                None
            } else if rules.pii_headers.contains(&lower) {
                Some((name, rules.replacement_text.as_str()))
            } else {
                Some((name, value))
            }
        })
        .collect()
}

/// Replace the values selected by `rules` in place
///
/// Keys missing at a level, null values and non-object parents are skipped.
pub fn redact_body_fields(body: &mut Value, rules: &[RuleNode], replacement: &str) {
    let Value::Object(map) = body else {
        return;
    };

    for rule in rules {
        match rule {
            RuleNode::Leaf(field) => {
                if let Some(value) = map.get_mut(field) {
                    if !value.is_null() {
                        *value = Value::String(replacement.to_string());
                    }
                }
            }
            RuleNode::Branch(field, children) => {
                if let Some(nested) = map.get_mut(field) {
                    redact_body_fields(nested, children, replacement);
                }
            }
        }
    }
}
