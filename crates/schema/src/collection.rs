use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fmt;

use crate::error::{SchemaError, SchemaResult};
use crate::field::FieldList;
use crate::patch::CollectionPatch;

/// The five access rules a collection carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RuleKind {
    List,
    View,
    Create,
    Update,
    Delete,
}

impl RuleKind {
    pub const ALL: [RuleKind; 5] = [
        RuleKind::List,
        RuleKind::View,
        RuleKind::Create,
        RuleKind::Update,
        RuleKind::Delete,
    ];

    /// Attribute name in the collection document
    pub fn key(&self) -> &'static str {
        match self {
            RuleKind::List => "listRule",
            RuleKind::View => "viewRule",
            RuleKind::Create => "createRule",
            RuleKind::Update => "updateRule",
            RuleKind::Delete => "deleteRule",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.key() == key)
    }
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// A collection document.
///
/// Rules are opaque strings. `None` (stored as `null`) and `Some("")` are
/// different rules and both survive a load/save cycle unchanged, as does
/// whitespace inside the rule text. Attributes the runner does not model
/// are carried in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Collection {
    pub id: String,
    pub name: String,
    #[serde(rename = "type", default = "default_collection_type")]
    pub collection_type: String,
    #[serde(default)]
    pub fields: FieldList,
    #[serde(default)]
    pub list_rule: Option<String>,
    #[serde(default)]
    pub view_rule: Option<String>,
    #[serde(default)]
    pub create_rule: Option<String>,
    #[serde(default)]
    pub update_rule: Option<String>,
    #[serde(default)]
    pub delete_rule: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_collection_type() -> String {
    "base".to_string()
}

impl Collection {
    /// Create a base collection with no fields and every rule unset
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            collection_type: default_collection_type(),
            fields: FieldList::new(),
            list_rule: None,
            view_rule: None,
            create_rule: None,
            update_rule: None,
            delete_rule: None,
            extra: Map::new(),
        }
    }

    pub fn rule(&self, kind: RuleKind) -> Option<&str> {
        match kind {
            RuleKind::List => self.list_rule.as_deref(),
            RuleKind::View => self.view_rule.as_deref(),
            RuleKind::Create => self.create_rule.as_deref(),
            RuleKind::Update => self.update_rule.as_deref(),
            RuleKind::Delete => self.delete_rule.as_deref(),
        }
    }

    pub fn set_rule(&mut self, kind: RuleKind, rule: Option<String>) {
        let slot = match kind {
            RuleKind::List => &mut self.list_rule,
            RuleKind::View => &mut self.view_rule,
            RuleKind::Create => &mut self.create_rule,
            RuleKind::Update => &mut self.update_rule,
            RuleKind::Delete => &mut self.delete_rule,
        };
        *slot = rule;
    }

    /// Builder form of [`Collection::set_rule`]
    pub fn with_rule(mut self, kind: RuleKind, rule: Option<&str>) -> Self {
        self.set_rule(kind, rule.map(str::to_string));
        self
    }

    /// Merge a patch: only the attributes named in the patch change.
    pub fn set_rules(&mut self, patch: &CollectionPatch) {
        if let Some(name) = patch.name() {
            self.name = name.to_string();
        }
        for (kind, rule) in patch.rules() {
            self.set_rule(kind, rule.map(str::to_string));
        }
    }

    /// Whether `name_or_id` addresses this collection
    pub fn matches(&self, name_or_id: &str) -> bool {
        self.id == name_or_id || self.name.eq_ignore_ascii_case(name_or_id)
    }

    /// Check the constraints a save must satisfy
    pub fn validate(&self) -> SchemaResult<()> {
        if self.id.trim().is_empty() {
            return Err(SchemaError::validation(&self.name, "collection id cannot be empty"));
        }
        if self.name.trim().is_empty() {
            return Err(SchemaError::validation(&self.id, "collection name cannot be empty"));
        }

        let mut ids = HashSet::new();
        let mut names = HashSet::new();
        for field in &self.fields {
            if field.id.trim().is_empty() {
                return Err(SchemaError::validation(
                    &self.name,
                    format!("field '{}' has an empty id", field.name),
                ));
            }
            if field.name.trim().is_empty() {
                return Err(SchemaError::validation(
                    &self.name,
                    format!("field '{}' has an empty name", field.id),
                ));
            }
            if !ids.insert(field.id.as_str()) {
                return Err(SchemaError::validation(
                    &self.name,
                    format!("duplicate field id '{}'", field.id),
                ));
            }
            if !names.insert(field.name.to_lowercase()) {
                return Err(SchemaError::validation(
                    &self.name,
                    format!("duplicate field name '{}'", field.name),
                ));
            }
        }

        Ok(())
    }
}
