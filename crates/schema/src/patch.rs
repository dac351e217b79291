//! Partial collection updates.
//!
//! A patch names only the attributes it changes. In JSON form a key that is
//! absent leaves the attribute alone, `null` clears a rule, and a string
//! replaces it:
//!
//! ```json
//! { "createRule": "@request.auth.id ~ owner.id ", "viewRule": null }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::collection::RuleKind;
use crate::error::SchemaError;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Map<String, Value>", into = "Map<String, Value>")]
pub struct CollectionPatch {
    name: Option<String>,
    rules: BTreeMap<RuleKind, Option<String>>,
}

impl CollectionPatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rename the collection
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set (`Some`) or clear (`None`) one rule
    pub fn with_rule(mut self, kind: RuleKind, rule: Option<&str>) -> Self {
        self.rules.insert(kind, rule.map(str::to_string));
        self
    }

    /// Rules named by the patch, in [`RuleKind`] order
    pub fn rules(&self) -> impl Iterator<Item = (RuleKind, Option<&str>)> + '_ {
        self.rules.iter().map(|(kind, rule)| (*kind, rule.as_deref()))
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.rules.is_empty()
    }
}

impl TryFrom<Map<String, Value>> for CollectionPatch {
    type Error = SchemaError;

    fn try_from(map: Map<String, Value>) -> Result<Self, Self::Error> {
        let mut patch = CollectionPatch::new();

        for (key, value) in map {
            if key == "name" {
                match value {
                    Value::String(name) => patch.name = Some(name),
                    other => {
                        return Err(SchemaError::InvalidPatch(format!(
                            "'name' must be a string, got {}",
                            other
                        )))
                    }
                }
                continue;
            }

            let kind = RuleKind::from_key(&key).ok_or_else(|| {
                SchemaError::InvalidPatch(format!("unknown attribute '{}'", key))
            })?;
            let rule = match value {
                Value::Null => None,
                Value::String(rule) => Some(rule),
                other => {
                    return Err(SchemaError::InvalidPatch(format!(
                        "'{}' must be a string or null, got {}",
                        key, other
                    )))
                }
            };
            patch.rules.insert(kind, rule);
        }

        Ok(patch)
    }
}

impl From<CollectionPatch> for Map<String, Value> {
    fn from(patch: CollectionPatch) -> Self {
        let mut map = Map::new();
        if let Some(name) = patch.name {
            map.insert("name".to_string(), Value::String(name));
        }
        for (kind, rule) in patch.rules {
            map.insert(
                kind.key().to_string(),
                rule.map(Value::String).unwrap_or(Value::Null),
            );
        }
        map
    }
}
