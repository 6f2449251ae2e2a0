use std::collections::BTreeMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// The JSON Schema draft emitted by the reflector.
pub const VERSION: &str = "http://json-schema.org/draft-04/schema#";

/// Prefix of every `$ref` pointer into the root `definitions` map.
pub const DEFINITIONS_PREFIX: &str = "#/definitions/";

/// Named schema fragments, referenced by `$ref`.
///
/// Sorted by name so the emitted document does not depend on the order in
/// which traversal discovered the types.
pub type Definitions = BTreeMap<String, Schema>;

/// A JSON Schema `type` keyword value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaType {
    String,
    Number,
    Integer,
    Boolean,
    Array,
    Object,
    Null,
}

/// `additionalProperties` can be a boolean or a schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AdditionalProperties {
    Bool(bool),
    Schema(Box<Schema>),
}

/// One JSON Schema fragment (draft-04 validation keywords plus the
/// hyper-schema `media` block).
///
/// Every keyword is omitted from the serialized form when it is unset or empty.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Schema {
    #[serde(rename = "$schema", skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(rename = "$ref", skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,

    // Numeric constraints
    #[serde(rename = "multipleOf", skip_serializing_if = "Option::is_none")]
    pub multiple_of: Option<serde_json::Number>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum: Option<serde_json::Number>,
    #[serde(rename = "exclusiveMaximum", default, skip_serializing_if = "is_false")]
    pub exclusive_maximum: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum: Option<serde_json::Number>,
    #[serde(rename = "exclusiveMinimum", default, skip_serializing_if = "is_false")]
    pub exclusive_minimum: bool,

    // String constraints
    #[serde(rename = "maxLength", skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u64>,
    #[serde(rename = "minLength", skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,

    // Array constraints
    #[serde(rename = "additionalItems", skip_serializing_if = "Option::is_none")]
    pub additional_items: Option<Box<Schema>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<Schema>>,
    #[serde(rename = "maxItems", skip_serializing_if = "Option::is_none")]
    pub max_items: Option<u64>,
    #[serde(rename = "minItems", skip_serializing_if = "Option::is_none")]
    pub min_items: Option<u64>,
    #[serde(rename = "uniqueItems", default, skip_serializing_if = "is_false")]
    pub unique_items: bool,

    // Object shape
    #[serde(rename = "maxProperties", skip_serializing_if = "Option::is_none")]
    pub max_properties: Option<u64>,
    #[serde(rename = "minProperties", skip_serializing_if = "Option::is_none")]
    pub min_properties: Option<u64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub properties: IndexMap<String, Schema>,
    #[serde(
        rename = "patternProperties",
        default,
        skip_serializing_if = "IndexMap::is_empty"
    )]
    pub pattern_properties: IndexMap<String, Schema>,
    #[serde(
        rename = "additionalProperties",
        skip_serializing_if = "Option::is_none"
    )]
    pub additional_properties: Option<AdditionalProperties>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub dependencies: IndexMap<String, Schema>,

    #[serde(rename = "enum", default, skip_serializing_if = "Vec::is_empty")]
    pub enum_values: Vec<serde_json::Value>,

    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub schema_type: Option<SchemaType>,

    // Composition
    #[serde(rename = "allOf", default, skip_serializing_if = "Vec::is_empty")]
    pub all_of: Vec<Schema>,
    #[serde(rename = "anyOf", default, skip_serializing_if = "Vec::is_empty")]
    pub any_of: Vec<Schema>,
    #[serde(rename = "oneOf", default, skip_serializing_if = "Vec::is_empty")]
    pub one_of: Vec<Schema>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub not: Option<Box<Schema>>,

    // Metadata
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "default", skip_serializing_if = "Option::is_none")]
    pub default_value: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub examples: Vec<serde_json::Value>,

    // Hyper-schema
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media: Option<Box<Schema>>,
    #[serde(rename = "binaryEncoding", skip_serializing_if = "Option::is_none")]
    pub binary_encoding: Option<String>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl Schema {
    /// A bare `{"type": ...}` node.
    pub fn typed(schema_type: SchemaType) -> Self {
        Self {
            schema_type: Some(schema_type),
            ..Self::default()
        }
    }

    /// A `$ref` node pointing at `#/definitions/{name}`.
    pub fn reference_to(name: &str) -> Self {
        Self {
            version: Some(VERSION.to_string()),
            reference: Some(format!("{DEFINITIONS_PREFIX}{name}")),
            ..Self::default()
        }
    }

    /// An object node with no properties yet.
    pub fn empty_object(additional_properties: bool) -> Self {
        Self {
            schema_type: Some(SchemaType::Object),
            additional_properties: Some(AdditionalProperties::Bool(additional_properties)),
            ..Self::default()
        }
    }

    /// A string node fixed to a single literal, used for discriminator fields.
    pub fn const_string(value: &str) -> Self {
        Self {
            schema_type: Some(SchemaType::String),
            default_value: Some(serde_json::Value::String(value.to_string())),
            enum_values: vec![serde_json::Value::String(value.to_string())],
            ..Self::default()
        }
    }

    /// The definition name this node refers to, if it is a local `$ref`.
    pub fn definition_name(&self) -> Option<&str> {
        self.reference
            .as_deref()
            .and_then(|r| r.strip_prefix(DEFINITIONS_PREFIX))
    }

    /// Add `name` to `required` unless it is already listed.
    pub fn require(&mut self, name: &str) {
        if !self.required.iter().any(|r| r == name) {
            self.required.push(name.to_string());
        }
    }

    /// Whether this node, or any node nested in it, references `name`.
    pub fn references(&self, name: &str) -> bool {
        let mut found = false;
        collect_refs(self, &mut |target| found |= target == name);
        found
    }
}

/// A complete schema document: the root node plus its definitions.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RootSchema {
    #[serde(flatten)]
    pub schema: Schema,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub definitions: Definitions,
}

impl RootSchema {
    /// Whether any node in the document references the definition `name`.
    pub fn references(&self, name: &str) -> bool {
        self.schema.references(name) || self.definitions.values().any(|d| d.references(name))
    }

    /// Every `$ref` target in the document that has no matching definition.
    pub fn dangling_references(&self) -> Vec<String> {
        let mut dangling = Vec::new();
        collect_refs(&self.schema, &mut |name| {
            if !self.definitions.contains_key(name) {
                dangling.push(name.to_string());
            }
        });
        for def in self.definitions.values() {
            collect_refs(def, &mut |name| {
                if !self.definitions.contains_key(name) {
                    dangling.push(name.to_string());
                }
            });
        }
        dangling.sort();
        dangling.dedup();
        dangling
    }
}

fn collect_refs(schema: &Schema, f: &mut dyn FnMut(&str)) {
    if let Some(name) = schema.definition_name() {
        f(name);
    }
    for boxed in [
        &schema.additional_items,
        &schema.items,
        &schema.not,
        &schema.media,
    ]
    .into_iter()
    .flatten()
    {
        collect_refs(boxed, f);
    }
    if let Some(AdditionalProperties::Schema(s)) = &schema.additional_properties {
        collect_refs(s, f);
    }
    for s in schema
        .properties
        .values()
        .chain(schema.pattern_properties.values())
        .chain(schema.dependencies.values())
        .chain(schema.all_of.iter())
        .chain(schema.any_of.iter())
        .chain(schema.one_of.iter())
    {
        collect_refs(s, f);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_keywords_are_omitted() {
        let schema = Schema::typed(SchemaType::String);
        assert_eq!(serde_json::to_value(&schema).unwrap(), json!({"type": "string"}));
    }

    #[test]
    fn reference_carries_version() {
        let schema = Schema::reference_to("User");
        assert_eq!(
            serde_json::to_value(&schema).unwrap(),
            json!({
                "$schema": VERSION,
                "$ref": "#/definitions/User",
            })
        );
        assert_eq!(schema.definition_name(), Some("User"));
    }

    #[test]
    fn closed_object_serializes_false() {
        let schema = Schema::empty_object(false);
        assert_eq!(
            serde_json::to_value(&schema).unwrap(),
            json!({"type": "object", "additionalProperties": false})
        );
    }

    #[test]
    fn require_deduplicates() {
        let mut schema = Schema::empty_object(false);
        schema.require("id");
        schema.require("id");
        assert_eq!(schema.required, vec!["id".to_string()]);
    }

    #[test]
    fn root_flattens_definitions() {
        let mut root = RootSchema {
            schema: Schema::reference_to("User"),
            definitions: Definitions::new(),
        };
        assert_eq!(root.dangling_references(), vec!["User".to_string()]);

        root.definitions
            .insert("User".to_string(), Schema::empty_object(false));
        assert!(root.dangling_references().is_empty());
        assert!(root.references("User"));

        let value = serde_json::to_value(&root).unwrap();
        assert_eq!(value["$ref"], "#/definitions/User");
        assert_eq!(value["definitions"]["User"]["type"], "object");
    }

    #[test]
    fn finds_nested_references() {
        let mut outer = Schema::typed(SchemaType::Array);
        outer.items = Some(Box::new(Schema::reference_to("Pet")));
        assert!(outer.references("Pet"));
        assert!(!outer.references("Owner"));
    }
}
