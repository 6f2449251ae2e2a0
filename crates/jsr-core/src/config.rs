use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::types::TypeRef;

/// Options controlling a reflection run.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ReflectOptions {
    /// Emit `additionalProperties: true` on every record that is not forced
    /// closed.
    pub allow_additional_properties: bool,
    /// Require fields tagged `jsonschema:"required"` instead of every field
    /// not tagged `omitempty`.
    pub required_from_schema_tags: bool,
    /// Inline the root record instead of emitting a `$ref` to its definition.
    pub expanded_root: bool,
    /// Types rendered as open objects without descending into their fields.
    pub ignored_types: Vec<TypeRef>,
}

/// Top-level project configuration loaded from `.jsr.yaml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct JsrConfig {
    /// Path to the type catalog (YAML or JSON).
    pub catalog: String,
    /// Name of the root type in the catalog.
    pub root: Option<String>,
    /// Where to write the schema; stdout when unset.
    pub output: Option<String>,
    pub pretty: bool,
    pub options: ReflectOptions,
}

impl Default for JsrConfig {
    fn default() -> Self {
        Self {
            catalog: "types.yaml".to_string(),
            root: None,
            output: None,
            pretty: true,
            options: ReflectOptions::default(),
        }
    }
}

/// Default config file name.
pub const CONFIG_FILE_NAME: &str = ".jsr.yaml";

/// Load config from a YAML file. Returns `None` if the file doesn't exist.
pub fn load_config(path: &Path) -> Result<Option<JsrConfig>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;
    let config: JsrConfig =
        serde_yaml_ng::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;
    Ok(Some(config))
}

/// Generate the default config file content.
pub fn default_config_content() -> &'static str {
    r#"# jsr configuration
catalog: types.yaml     # type catalog (YAML or JSON)
# root: User            # root type or builtin keyword; can also be passed with --root
# output: schema.json   # defaults to stdout
pretty: true

options:
  allow_additional_properties: false
  required_from_schema_tags: false   # require `jsonschema:"required"` fields instead of non-omitempty ones
  expanded_root: false               # inline the root type instead of a $ref
  ignored_types: []
    # - LegacyBlob
"#
}

/// Starter type catalog written next to the config by `jsr init`, matching
/// the default `catalog` path.
pub fn default_catalog_content() -> &'static str {
    r#"# Types reflected by `jsr generate --root <Name>`.
types:
  User:
    kind: record
    fields:
      - name: Name
        type: string
        tags:
          json: name
          jsonschema: "required,minLength=1"
      - name: Email
        type: string
        tags:
          json: email,omitempty
          jsonschema: format=email
      - name: Roles
        type: { kind: seq, items: Role }
        tags:
          json: roles,omitempty
  Role:
    kind: string

enums:
  - type: Role
    values: [admin, member]
"#
}
