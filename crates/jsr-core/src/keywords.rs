use serde_json::Value;

use crate::schema::{Schema, SchemaType};
use crate::tags::{FieldAnnotation, KeywordOptions, parse_number};

/// Overlay a field's description and keyword constraints onto the node built
/// for its type. Kind-specific keywords only apply when the node's `type`
/// matches.
pub fn apply_field_keywords(schema: &mut Schema, annotation: &FieldAnnotation) {
    if let Some(description) = &annotation.description {
        schema.description = Some(description.clone());
    }
    let kw = &annotation.keywords;
    apply_generic(schema, kw);
    match schema.schema_type {
        Some(SchemaType::String) => apply_string(schema, kw),
        Some(SchemaType::Number | SchemaType::Integer) => apply_numeric(schema, kw),
        Some(SchemaType::Array) => apply_array(schema, kw),
        _ => {}
    }
}

fn apply_generic(schema: &mut Schema, kw: &KeywordOptions) {
    if let Some(title) = &kw.title {
        schema.title = Some(title.clone());
    }
    if let Some(description) = &kw.description {
        schema.description = Some(description.clone());
    }
}

fn apply_string(schema: &mut Schema, kw: &KeywordOptions) {
    if kw.min_length.is_some() {
        schema.min_length = kw.min_length;
    }
    if kw.max_length.is_some() {
        schema.max_length = kw.max_length;
    }
    if let Some(pattern) = &kw.pattern {
        schema.pattern = Some(pattern.clone());
    }
    if let Some(format) = &kw.format {
        schema.format = Some(format.clone());
    }
    if let Some(default) = kw.defaults.last() {
        schema.default_value = Some(Value::String(default.clone()));
    }
    schema
        .examples
        .extend(kw.examples.iter().cloned().map(Value::String));
}

fn apply_numeric(schema: &mut Schema, kw: &KeywordOptions) {
    if kw.multiple_of.is_some() {
        schema.multiple_of = kw.multiple_of.clone();
    }
    if kw.minimum.is_some() {
        schema.minimum = kw.minimum.clone();
    }
    if kw.maximum.is_some() {
        schema.maximum = kw.maximum.clone();
    }
    schema.exclusive_minimum |= kw.exclusive_minimum;
    schema.exclusive_maximum |= kw.exclusive_maximum;
    if let Some(default) = kw.defaults.last() {
        let number = parse_number(default).unwrap_or_else(|| 0i64.into());
        schema.default_value = Some(Value::Number(number));
    }
    schema.examples.extend(
        kw.examples
            .iter()
            .filter_map(|e| parse_number(e))
            .map(Value::Number),
    );
}

fn apply_array(schema: &mut Schema, kw: &KeywordOptions) {
    if kw.min_items.is_some() {
        schema.min_items = kw.min_items;
    }
    if kw.max_items.is_some() {
        schema.max_items = kw.max_items;
    }
    schema.unique_items |= kw.unique_items;
    if !kw.defaults.is_empty() {
        let values = kw.defaults.iter().cloned().map(Value::String).collect();
        schema.default_value = Some(Value::Array(values));
    }
}
