//! Per-field metadata parsing.
//!
//! A field carries raw tag strings keyed by namespace. The serialization
//! namespace (`json`, falling back to `yaml`) decides the property name and
//! default optionality; the schema namespace (`jsonschema`) carries the
//! ignore/required flags and `key=value` keyword constraints.

use crate::types::FieldDesc;

/// Primary serialization namespace.
pub const JSON_TAG: &str = "json";
/// Fallback serialization namespace, used when a field has no `json` tag.
pub const YAML_TAG: &str = "yaml";
/// Schema keyword namespace.
pub const SCHEMA_TAG: &str = "jsonschema";
/// Free-text description namespace.
pub const DESCRIPTION_TAG: &str = "jsonschema_description";

const IGNORE: &str = "-";
const OMIT_EMPTY: &str = "omitempty";
const INLINE: &str = "inline";
const REQUIRED: &str = "required";

/// String formats accepted by the `format=` keyword.
pub const ALLOWED_FORMATS: &[&str] = &["date-time", "email", "hostname", "ipv4", "ipv6", "uri"];

/// A parsed serialization tag: `name,option,option`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SerializationTag {
    pub name: String,
    pub options: Vec<String>,
}

impl SerializationTag {
    pub fn parse(raw: &str) -> Self {
        let mut parts = raw.split(',');
        let name = parts.next().unwrap_or_default().to_string();
        let options = parts.map(str::to_string).collect();
        Self { name, options }
    }

    pub fn is_ignored(&self) -> bool {
        self.name == IGNORE
    }

    pub fn has_option(&self, option: &str) -> bool {
        self.options.iter().any(|o| o == option)
    }

    pub fn omit_empty(&self) -> bool {
        self.has_option(OMIT_EMPTY)
    }

    pub fn inline(&self) -> bool {
        self.has_option(INLINE)
    }
}

/// A parsed schema tag: `required,minLength=1,example=a,example=b`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SchemaTag {
    pub ignored: bool,
    pub required: bool,
    pub keywords: KeywordOptions,
}

/// Keyword constraints collected from a schema tag.
///
/// Lengths and bounds are parsed eagerly; a value that does not parse leaves
/// the keyword unset. `default` and `example` are kept raw because their
/// interpretation depends on the kind of the node they end up on.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct KeywordOptions {
    pub title: Option<String>,
    pub description: Option<String>,

    pub min_length: Option<u64>,
    pub max_length: Option<u64>,
    pub pattern: Option<String>,
    pub format: Option<String>,

    pub multiple_of: Option<serde_json::Number>,
    pub minimum: Option<serde_json::Number>,
    pub maximum: Option<serde_json::Number>,
    pub exclusive_minimum: bool,
    pub exclusive_maximum: bool,

    pub min_items: Option<u64>,
    pub max_items: Option<u64>,
    pub unique_items: bool,

    pub defaults: Vec<String>,
    pub examples: Vec<String>,
}

impl SchemaTag {
    pub fn parse(raw: &str) -> Self {
        let mut tag = SchemaTag::default();
        if raw.is_empty() {
            return tag;
        }
        for (i, entry) in raw.split(',').enumerate() {
            if i == 0 && entry == IGNORE {
                tag.ignored = true;
                continue;
            }
            match entry.split_once('=') {
                Some((key, value)) => tag.keywords.set(key, value),
                None if entry == REQUIRED => tag.required = true,
                None => tag.keywords.set_flag(entry),
            }
        }
        tag
    }
}

impl KeywordOptions {
    fn set(&mut self, key: &str, value: &str) {
        match key {
            "title" => self.title = Some(value.to_string()),
            "description" => self.description = Some(value.to_string()),
            "minLength" => self.min_length = value.parse().ok(),
            "maxLength" => self.max_length = value.parse().ok(),
            "pattern" => self.pattern = Some(value.to_string()),
            "format" => {
                if ALLOWED_FORMATS.contains(&value) {
                    self.format = Some(value.to_string());
                }
            }
            "multipleOf" => self.multiple_of = parse_number(value),
            "minimum" => self.minimum = parse_number(value),
            "maximum" => self.maximum = parse_number(value),
            "exclusiveMinimum" => self.exclusive_minimum = parse_flag(value),
            "exclusiveMaximum" => self.exclusive_maximum = parse_flag(value),
            "minItems" => self.min_items = value.parse().ok(),
            "maxItems" => self.max_items = value.parse().ok(),
            "uniqueItems" => self.unique_items = true,
            "default" => self.defaults.push(value.to_string()),
            "example" => self.examples.push(value.to_string()),
            _ => log::trace!("ignoring unknown schema keyword {key}"),
        }
    }

    fn set_flag(&mut self, key: &str) {
        if key == "uniqueItems" {
            self.unique_items = true;
        }
    }
}

/// Parse an integer or decimal literal.
pub fn parse_number(value: &str) -> Option<serde_json::Number> {
    if let Ok(i) = value.parse::<i64>() {
        return Some(i.into());
    }
    value
        .parse::<f64>()
        .ok()
        .and_then(serde_json::Number::from_f64)
}

fn parse_flag(value: &str) -> bool {
    matches!(value, "1" | "t" | "T" | "true" | "TRUE" | "True")
}

/// How a single record field surfaces in its owner's schema.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FieldAnnotation {
    /// Property name; empty means "splice into the owner" for embedded fields.
    pub name: String,
    pub required: bool,
    pub inline: bool,
    pub description: Option<String>,
    pub keywords: KeywordOptions,
}

/// Resolve a field's tags. Returns `None` when the field is excluded from the
/// schema entirely.
pub fn annotate(field: &FieldDesc, required_from_schema_tags: bool) -> Option<FieldAnnotation> {
    if !field.exported && !field.embedded {
        return None;
    }

    let primary = field
        .tags
        .get(JSON_TAG)
        .or_else(|| field.tags.get(YAML_TAG));
    let serialization = SerializationTag::parse(primary.map(String::as_str).unwrap_or_default());
    if serialization.is_ignored() {
        return None;
    }

    let schema = SchemaTag::parse(field.tags.get(SCHEMA_TAG).map(String::as_str).unwrap_or_default());
    if schema.ignored {
        return None;
    }

    let name = if field.embedded && primary.is_none() {
        String::new()
    } else if serialization.name.is_empty() {
        field.name.clone()
    } else {
        serialization.name.clone()
    };

    let required = if required_from_schema_tags {
        schema.required
    } else {
        !serialization.omit_empty()
    };

    Some(FieldAnnotation {
        name,
        required,
        inline: serialization.inline(),
        description: field
            .tags
            .get(DESCRIPTION_TAG)
            .filter(|d| !d.is_empty())
            .cloned(),
        keywords: schema.keywords,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{TypeKind, TypeRef};

    fn field(name: &str) -> FieldDesc {
        FieldDesc::new(name, TypeKind::String)
    }

    #[test]
    fn serialization_tag_splits_name_and_options() {
        let tag = SerializationTag::parse("friends,omitempty");
        assert_eq!(tag.name, "friends");
        assert!(tag.omit_empty());
        assert!(!tag.inline());

        let tag = SerializationTag::parse(",inline");
        assert_eq!(tag.name, "");
        assert!(tag.inline());
    }

    #[test]
    fn schema_tag_parses_keywords() {
        let tag = SchemaTag::parse(
            "required,minLength=1,maxLength=20,pattern=.*,title=the name,example=joe,example=lucy,default=alex",
        );
        assert!(tag.required);
        assert!(!tag.ignored);
        let kw = tag.keywords;
        assert_eq!(kw.min_length, Some(1));
        assert_eq!(kw.max_length, Some(20));
        assert_eq!(kw.pattern.as_deref(), Some(".*"));
        assert_eq!(kw.title.as_deref(), Some("the name"));
        assert_eq!(kw.examples, vec!["joe", "lucy"]);
        assert_eq!(kw.defaults, vec!["alex"]);
    }

    #[test]
    fn schema_tag_ignore_sentinel() {
        let tag = SchemaTag::parse("-,required");
        assert!(tag.ignored);
        // only the leading entry is the sentinel
        assert!(!SchemaTag::parse("required,-").ignored);
    }

    #[test]
    fn malformed_values_leave_keywords_unset() {
        let kw = SchemaTag::parse("minLength=abc,minimum=x,exclusiveMaximum=maybe,format=phone").keywords;
        assert_eq!(kw.min_length, None);
        assert_eq!(kw.minimum, None);
        assert!(!kw.exclusive_maximum);
        assert_eq!(kw.format, None);
    }

    #[test]
    fn numeric_bounds_accept_decimals() {
        let kw = SchemaTag::parse("minimum=18,maximum=0.5,exclusiveMinimum=true").keywords;
        assert_eq!(kw.minimum, Some(serde_json::Number::from(18i64)));
        assert_eq!(kw.maximum, serde_json::Number::from_f64(0.5));
        assert!(kw.exclusive_minimum);
    }

    #[test]
    fn unique_items_needs_no_value() {
        assert!(SchemaTag::parse("uniqueItems").keywords.unique_items);
        assert!(SchemaTag::parse("uniqueItems=true").keywords.unique_items);
    }

    #[test]
    fn untagged_field_uses_declared_name_and_is_required() {
        let ann = annotate(&field("TestFlag"), false).unwrap();
        assert_eq!(ann.name, "TestFlag");
        assert!(ann.required);
        assert!(!ann.inline);
    }

    #[test]
    fn omitempty_makes_field_optional() {
        let ann = annotate(&field("Tags").tag(JSON_TAG, "tags,omitempty"), false).unwrap();
        assert_eq!(ann.name, "tags");
        assert!(!ann.required);
    }

    #[test]
    fn yaml_tag_is_the_fallback() {
        let ann = annotate(&field("Prop").tag(YAML_TAG, "prop_yaml,omitempty"), false).unwrap();
        assert_eq!(ann.name, "prop_yaml");
        assert!(!ann.required);

        let both = field("Prop")
            .tag(JSON_TAG, "prop_json")
            .tag(YAML_TAG, "prop_yaml");
        assert_eq!(annotate(&both, false).unwrap().name, "prop_json");
    }

    #[test]
    fn required_from_schema_tags_flips_policy() {
        let plain = field("Id").tag(JSON_TAG, "id");
        assert!(!annotate(&plain, true).unwrap().required);

        let tagged = field("Id").tag(JSON_TAG, "id,omitempty").tag(SCHEMA_TAG, "required");
        assert!(annotate(&tagged, true).unwrap().required);
        assert!(!annotate(&tagged, false).unwrap().required);
    }

    #[test]
    fn excluded_fields() {
        assert!(annotate(&field("Counter").tag(JSON_TAG, "-"), false).is_none());
        assert!(annotate(&field("Secret").tag(SCHEMA_TAG, "-,required"), false).is_none());
        assert!(annotate(&field("private").unexported().tag(JSON_TAG, "p"), false).is_none());
    }

    #[test]
    fn embedded_without_tag_flattens() {
        let embedded = FieldDesc::embed(TypeRef::named("Base"));
        let ann = annotate(&embedded, false).unwrap();
        assert_eq!(ann.name, "");

        // embedded types keep their members even when the type itself is private
        let private = FieldDesc::embed(TypeRef::named("base")).unexported();
        assert_eq!(annotate(&private, false).unwrap().name, "");

        let tagged = FieldDesc::embed(TypeRef::named("Base")).tag(JSON_TAG, ",omitempty");
        assert_eq!(annotate(&tagged, false).unwrap().name, "Base");

        let inline = FieldDesc::embed(TypeRef::named("Base")).tag(JSON_TAG, ",inline");
        assert!(annotate(&inline, false).unwrap().inline);
    }

    #[test]
    fn description_tag_is_carried() {
        let f = field("Friends").tag(DESCRIPTION_TAG, "list of IDs, omitted when empty");
        assert_eq!(
            annotate(&f, false).unwrap().description.as_deref(),
            Some("list of IDs, omitted when empty")
        );
    }
}
