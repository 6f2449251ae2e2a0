use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),

    #[error("failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("type catalog has unresolved references: {}", .0.join(", "))]
    DanglingReferences(Vec<String>),
}

#[derive(Debug, Error, PartialEq)]
pub enum RegistrationError {
    #[error("value ({value}) is not {type_name} type")]
    EnumValueMismatch { value: String, type_name: String },

    #[error("base type {0} should be an interface")]
    NotAnInterface(String),

    #[error("type {type_name} should implement {base}")]
    DoesNotImplement { type_name: String, base: String },

    #[error("unknown type reference: {0}")]
    UnknownType(String),
}

#[derive(Debug, Error)]
pub enum ReflectError {
    #[error("unsupported type {type_name} of kind {kind}")]
    UnsupportedKind { type_name: String, kind: &'static str },

    #[error("unknown type reference: {0}")]
    UnknownType(String),

    #[error("type {0} refers only to itself and describes no value")]
    Cycle(String),

    #[error("registration error: {0}")]
    Registration(#[from] RegistrationError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: String,
        source: serde_yaml_ng::Error,
    },
}
