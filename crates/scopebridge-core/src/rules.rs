//! Redaction rules
//!
//! Body field rules are a tree. In settings files a rule list mixes plain field
//! names and single-key maps that descend into a nested object:
//!
//! ```yaml
//! pii_body_fields:
//!   account/login:
//!     - email
//!     - password
//!     - profile:
//!         - phone
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// One node of a body field redaction tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleNode {
    /// Redact the value stored under this key
    Leaf(String),
    /// Descend into the object stored under this key
    Branch(String, Vec<RuleNode>),
}

impl RuleNode {
    pub fn leaf(field: impl Into<String>) -> Self {
        RuleNode::Leaf(field.into())
    }

    pub fn branch(field: impl Into<String>, children: Vec<RuleNode>) -> Self {
        RuleNode::Branch(field.into(), children)
    }

    pub fn field(&self) -> &str {
        match self {
            RuleNode::Leaf(field) | RuleNode::Branch(field, _) => field,
        }
    }

    /// Reject empty field names anywhere in the tree
    pub fn validate(&self) -> Result<(), String> {
        if self.field().is_empty() {
            return Err("field name must not be empty".to_string());
        }
        if let RuleNode::Branch(field, children) = self {
            if children.is_empty() {
                return Err(format!("branch '{}' has no child rules", field));
            }
            for child in children {
                child.validate()?;
            }
        }
        Ok(())
    }
}

impl Serialize for RuleNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            RuleNode::Leaf(field) => serializer.serialize_str(field),
            RuleNode::Branch(field, children) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry(field, children)?;
                map.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for RuleNode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct RuleNodeVisitor;

        impl<'de> Visitor<'de> for RuleNodeVisitor {
            type Value = RuleNode;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a field name or a single-key map of field name to child rules")
            }

            fn visit_str<E: serde::de::Error>(self, value: &str) -> Result<RuleNode, E> {
                Ok(RuleNode::Leaf(value.to_string()))
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<RuleNode, A::Error> {
                let Some((field, children)) = access.next_entry::<String, Vec<RuleNode>>()? else {
                    return Err(serde::de::Error::custom("empty rule map"));
                };
                if access.next_key::<String>()?.is_some() {
                    return Err(serde::de::Error::custom(format!(
                        "rule map for '{}' must contain exactly one key",
                        field
                    )));
                }
                Ok(RuleNode::Branch(field, children))
            }
        }

        deserializer.deserialize_any(RuleNodeVisitor)
    }
}

/// Header and body redaction configuration, read-only at request time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedactionRuleSet {
    /// Lower-cased header names removed from reports
    pub strip_headers: BTreeSet<String>,
    /// Lower-cased header names whose values are masked
    pub pii_headers: BTreeSet<String>,
    pub pii_body_fields_by_route: BTreeMap<String, Vec<RuleNode>>,
    pub replacement_text: String,
}

impl RedactionRuleSet {
    pub fn new(
        strip_headers: impl IntoIterator<Item = impl AsRef<str>>,
        pii_headers: impl IntoIterator<Item = impl AsRef<str>>,
        replacement_text: impl Into<String>,
    ) -> Self {
        Self {
            strip_headers: strip_headers
                .into_iter()
                .map(|h| h.as_ref().to_ascii_lowercase())
                .collect(),
            pii_headers: pii_headers
                .into_iter()
                .map(|h| h.as_ref().to_ascii_lowercase())
                .collect(),
            pii_body_fields_by_route: BTreeMap::new(),
            replacement_text: replacement_text.into(),
        }
    }

    pub fn with_route_rules(mut self, route: impl Into<String>, rules: Vec<RuleNode>) -> Self {
        self.pii_body_fields_by_route.insert(route.into(), rules);
        self
    }

    pub fn body_rules_for(&self, route: &str) -> Option<&[RuleNode]> {
        self.pii_body_fields_by_route.get(route).map(Vec::as_slice)
    }
}
