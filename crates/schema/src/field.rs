//! Field definitions and the ordered field list of a collection.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A single field definition.
///
/// Type-specific settings (`collectionId`, `maxSelect`, `cascadeDelete`, ...)
/// are kept verbatim in `options`; the runner never interprets them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: String,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default)]
    pub presentable: bool,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub system: bool,
    #[serde(flatten)]
    pub options: Map<String, Value>,
}

impl Field {
    /// Create a field with default flags and no options
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        field_type: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            field_type: field_type.into(),
            hidden: false,
            presentable: false,
            required: false,
            system: false,
            options: Map::new(),
        }
    }

    /// Set a type-specific option
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// Mark the field as required
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

/// Ordered list of fields. Position matters: it is the order the host platform presents.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldList(Vec<Field>);

impl FieldList {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Insert `field` at `index`.
    ///
    /// An index past the end appends. A field already present with the same
    /// id is removed first, so the call both replaces and moves it.
    pub fn add_at(&mut self, index: usize, field: Field) {
        if let Some(existing) = self.0.iter().position(|f| f.id == field.id) {
            self.0.remove(existing);
        }
        let index = index.min(self.0.len());
        self.0.insert(index, field);
    }

    /// Append a field (same replace semantics as [`FieldList::add_at`])
    pub fn add(&mut self, field: Field) {
        self.add_at(usize::MAX, field);
    }

    /// Remove the field with this id, returning it if it was present
    pub fn remove_by_id(&mut self, id: &str) -> Option<Field> {
        let position = self.0.iter().position(|f| f.id == id)?;
        Some(self.0.remove(position))
    }

    pub fn get_by_id(&self, id: &str) -> Option<&Field> {
        self.0.iter().find(|f| f.id == id)
    }

    pub fn get_by_name(&self, name: &str) -> Option<&Field> {
        self.0.iter().find(|f| f.name == name)
    }

    /// Field ids in list order
    pub fn ids(&self) -> Vec<&str> {
        self.0.iter().map(|f| f.id.as_str()).collect()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Field> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<Field>> for FieldList {
    fn from(fields: Vec<Field>) -> Self {
        Self(fields)
    }
}

impl<'a> IntoIterator for &'a FieldList {
    type Item = &'a Field;
    type IntoIter = std::slice::Iter<'a, Field>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn list() -> FieldList {
        FieldList::from(vec![
            Field::new("text1", "title", "text"),
            Field::new("text2", "body", "text"),
            Field::new("bool1", "done", "bool"),
        ])
    }

    #[test]
    fn test_add_at_inserts_at_position() {
        let mut fields = list();
        fields.add_at(1, Field::new("relation1", "project", "relation"));
        assert_eq!(fields.ids(), vec!["text1", "relation1", "text2", "bool1"]);
    }

    #[test]
    fn test_add_at_clamps_index() {
        let mut fields = list();
        fields.add_at(6, Field::new("relation1", "columnId", "relation"));
        assert_eq!(fields.ids(), vec!["text1", "text2", "bool1", "relation1"]);
    }

    #[test]
    fn test_add_at_replaces_existing_id() {
        let mut fields = list();
        fields.add_at(0, Field::new("bool1", "completed", "bool"));
        assert_eq!(fields.len(), 3);
        assert_eq!(fields.ids(), vec!["bool1", "text1", "text2"]);
        assert_eq!(fields.get_by_id("bool1").unwrap().name, "completed");
    }

    #[test]
    fn test_remove_by_id() {
        let mut fields = list();
        let removed = fields.remove_by_id("text2").unwrap();
        assert_eq!(removed.name, "body");
        assert!(fields.remove_by_id("text2").is_none());
        assert_eq!(fields.ids(), vec!["text1", "bool1"]);
    }

    #[test]
    fn test_options_are_preserved() {
        let raw = json!({
            "cascadeDelete": false,
            "collectionId": "pbc_1276319826",
            "hidden": false,
            "id": "relation3906829402",
            "maxSelect": 1,
            "minSelect": 0,
            "name": "columnId",
            "presentable": false,
            "required": false,
            "system": false,
            "type": "relation"
        });

        let field: Field = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(field.field_type, "relation");
        assert_eq!(field.options["collectionId"], json!("pbc_1276319826"));
        assert_eq!(serde_json::to_value(&field).unwrap(), raw);
    }
}
