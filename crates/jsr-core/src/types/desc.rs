use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Method a type must expose to be encoded as a self-describing wire enum
/// (accepted as either its string name or its integer value).
pub const WIRE_ENUM_METHOD: &str = "EnumDescriptor";

/// A reference to a type: a named catalog entry, or an anonymous type
/// described in place.
///
/// Two references denote the same type exactly when they compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "TypeRefRepr", into = "TypeRefRepr")]
pub enum TypeRef {
    Named(String),
    Inline(Box<TypeDesc>),
}

/// Wire form of a `TypeRef`: builtin keywords and catalog names are written
/// as plain strings, anonymous composite types as maps.
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum TypeRefRepr {
    Name(String),
    Desc(Box<TypeDesc>),
}

impl From<TypeRefRepr> for TypeRef {
    fn from(repr: TypeRefRepr) -> Self {
        match repr {
            TypeRefRepr::Name(name) => TypeRef::parse(name),
            TypeRefRepr::Desc(desc) => TypeRef::Inline(desc),
        }
    }
}

impl From<TypeRef> for TypeRefRepr {
    fn from(ty: TypeRef) -> Self {
        match ty {
            TypeRef::Named(name) => TypeRefRepr::Name(name),
            TypeRef::Inline(desc) => match desc.keyword() {
                Some(keyword) => TypeRefRepr::Name(keyword.to_string()),
                None => TypeRefRepr::Desc(desc),
            },
        }
    }
}

impl From<TypeKind> for TypeRef {
    fn from(kind: TypeKind) -> Self {
        TypeRef::Inline(Box::new(TypeDesc::new(kind)))
    }
}

impl From<TypeDesc> for TypeRef {
    fn from(desc: TypeDesc) -> Self {
        TypeRef::Inline(Box::new(desc))
    }
}

impl TypeRef {
    pub fn named(name: impl Into<String>) -> Self {
        TypeRef::Named(name.into())
    }

    /// A builtin keyword (`string`, `bytes`, ...) as its anonymous type,
    /// anything else as a catalog name.
    pub fn parse(name: impl Into<String>) -> Self {
        let name = name.into();
        match TypeDesc::builtin(&name) {
            Some(desc) => TypeRef::Inline(Box::new(desc)),
            None => TypeRef::Named(name),
        }
    }

    /// `Vec<u8>`-like byte buffers.
    pub fn bytes() -> Self {
        TypeKind::Seq {
            items: TypeKind::U8.into(),
        }
        .into()
    }

    pub fn seq(items: impl Into<TypeRef>) -> Self {
        TypeKind::Seq {
            items: items.into(),
        }
        .into()
    }

    pub fn array(items: impl Into<TypeRef>, len: u64) -> Self {
        TypeKind::Array {
            items: items.into(),
            len,
        }
        .into()
    }

    pub fn map(key: impl Into<TypeRef>, value: impl Into<TypeRef>) -> Self {
        TypeKind::Map {
            key: key.into(),
            value: value.into(),
        }
        .into()
    }

    pub fn optional(inner: impl Into<TypeRef>) -> Self {
        TypeKind::Optional {
            inner: inner.into(),
        }
        .into()
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRef::Named(name) => write!(f, "{name}"),
            TypeRef::Inline(desc) => write!(f, "{desc}"),
        }
    }
}

/// The structural description of one type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDesc {
    #[serde(flatten)]
    pub kind: TypeKind,

    /// Method set, checked against interface requirements.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub methods: Vec<String>,
}

impl TypeDesc {
    pub fn new(kind: TypeKind) -> Self {
        Self {
            kind,
            methods: Vec::new(),
        }
    }

    pub fn record(fields: Vec<FieldDesc>) -> Self {
        Self::new(TypeKind::Record { fields })
    }

    pub fn interface(requires: &[&str]) -> Self {
        Self::new(TypeKind::Interface {
            requires: requires.iter().map(|m| m.to_string()).collect(),
        })
    }

    pub fn with_methods(mut self, methods: &[&str]) -> Self {
        self.methods.extend(methods.iter().map(|m| m.to_string()));
        self
    }

    /// Look up a builtin anonymous type by keyword.
    pub fn builtin(keyword: &str) -> Option<Self> {
        let kind = match keyword {
            "bool" => TypeKind::Bool,
            "i8" => TypeKind::I8,
            "i16" => TypeKind::I16,
            "i32" => TypeKind::I32,
            "i64" => TypeKind::I64,
            "isize" => TypeKind::Isize,
            "u8" => TypeKind::U8,
            "u16" => TypeKind::U16,
            "u32" => TypeKind::U32,
            "u64" => TypeKind::U64,
            "usize" => TypeKind::Usize,
            "f32" => TypeKind::F32,
            "f64" => TypeKind::F64,
            "string" => TypeKind::String,
            "date_time" => TypeKind::DateTime,
            "uri" => TypeKind::Uri,
            "ip_addr" => TypeKind::IpAddr,
            "bytes" => TypeKind::Seq {
                items: TypeKind::U8.into(),
            },
            _ => return None,
        };
        Some(Self::new(kind))
    }

    /// The builtin keyword naming this description, if it is one.
    pub fn keyword(&self) -> Option<&'static str> {
        if !self.methods.is_empty() {
            return None;
        }
        if self.is_bytes() {
            return Some("bytes");
        }
        if self.kind.is_scalar() {
            Some(self.kind.name())
        } else {
            None
        }
    }

    /// A sequence of `u8`, encoded as a base64 string.
    pub fn is_bytes(&self) -> bool {
        match &self.kind {
            TypeKind::Seq {
                items: TypeRef::Inline(items),
            } => items.kind == TypeKind::U8,
            _ => false,
        }
    }
}

impl fmt::Display for TypeDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            TypeKind::Seq { items } if !self.is_bytes() => write!(f, "[{items}]"),
            TypeKind::Array { items, len } => write!(f, "[{items}; {len}]"),
            TypeKind::Map { key, value } => write!(f, "map<{key}, {value}>"),
            TypeKind::Optional { inner } => write!(f, "optional<{inner}>"),
            _ => match self.keyword() {
                Some(keyword) => write!(f, "{keyword}"),
                None => write!(f, "<anonymous {}>", self.kind.name()),
            },
        }
    }
}

/// The closed set of kinds a type description can have.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TypeKind {
    Bool,
    I8,
    I16,
    I32,
    I64,
    Isize,
    U8,
    U16,
    U32,
    U64,
    Usize,
    F32,
    F64,
    String,
    DateTime,
    Uri,
    IpAddr,
    Record {
        #[serde(default)]
        fields: Vec<FieldDesc>,
    },
    Map {
        key: TypeRef,
        value: TypeRef,
    },
    Seq {
        items: TypeRef,
    },
    Array {
        items: TypeRef,
        len: u64,
    },
    /// A capability type, satisfied by any type whose method set covers
    /// `requires`.
    Interface {
        #[serde(default)]
        requires: Vec<String>,
    },
    Optional {
        inner: TypeRef,
    },
    Tuple {
        #[serde(default)]
        items: Vec<TypeRef>,
    },
    Function,
    Complex,
}

impl TypeKind {
    pub fn name(&self) -> &'static str {
        match self {
            TypeKind::Bool => "bool",
            TypeKind::I8 => "i8",
            TypeKind::I16 => "i16",
            TypeKind::I32 => "i32",
            TypeKind::I64 => "i64",
            TypeKind::Isize => "isize",
            TypeKind::U8 => "u8",
            TypeKind::U16 => "u16",
            TypeKind::U32 => "u32",
            TypeKind::U64 => "u64",
            TypeKind::Usize => "usize",
            TypeKind::F32 => "f32",
            TypeKind::F64 => "f64",
            TypeKind::String => "string",
            TypeKind::DateTime => "date_time",
            TypeKind::Uri => "uri",
            TypeKind::IpAddr => "ip_addr",
            TypeKind::Record { .. } => "record",
            TypeKind::Map { .. } => "map",
            TypeKind::Seq { .. } => "seq",
            TypeKind::Array { .. } => "array",
            TypeKind::Interface { .. } => "interface",
            TypeKind::Optional { .. } => "optional",
            TypeKind::Tuple { .. } => "tuple",
            TypeKind::Function => "function",
            TypeKind::Complex => "complex",
        }
    }

    fn is_scalar(&self) -> bool {
        self.is_integer()
            || self.is_float()
            || matches!(
                self,
                TypeKind::Bool
                    | TypeKind::String
                    | TypeKind::DateTime
                    | TypeKind::Uri
                    | TypeKind::IpAddr
            )
    }

    pub fn is_integer(&self) -> bool {
        self.is_signed() || self.is_unsigned()
    }

    pub fn is_signed(&self) -> bool {
        matches!(
            self,
            TypeKind::I8 | TypeKind::I16 | TypeKind::I32 | TypeKind::I64 | TypeKind::Isize
        )
    }

    pub fn is_unsigned(&self) -> bool {
        matches!(
            self,
            TypeKind::U8 | TypeKind::U16 | TypeKind::U32 | TypeKind::U64 | TypeKind::Usize
        )
    }

    pub fn is_float(&self) -> bool {
        matches!(self, TypeKind::F32 | TypeKind::F64)
    }
}

/// A field declared on a record type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDesc {
    /// Declared field name.
    pub name: String,

    #[serde(rename = "type")]
    pub ty: TypeRef,

    /// Anonymous field whose members are promoted into the owner.
    #[serde(default, skip_serializing_if = "is_false")]
    pub embedded: bool,

    /// Whether the field can be read from outside its defining module.
    #[serde(default = "default_exported", skip_serializing_if = "is_true")]
    pub exported: bool,

    /// Metadata strings keyed by namespace (`json`, `yaml`, `jsonschema`, ...).
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub tags: IndexMap<String, String>,
}

fn default_exported() -> bool {
    true
}

fn is_false(value: &bool) -> bool {
    !*value
}

fn is_true(value: &bool) -> bool {
    *value
}

impl FieldDesc {
    pub fn new(name: impl Into<String>, ty: impl Into<TypeRef>) -> Self {
        Self {
            name: name.into(),
            ty: ty.into(),
            embedded: false,
            exported: true,
            tags: IndexMap::new(),
        }
    }

    /// An embedded field, named after its type.
    pub fn embed(ty: impl Into<TypeRef>) -> Self {
        let ty = ty.into();
        let name = match &ty {
            TypeRef::Named(name) => name.clone(),
            TypeRef::Inline(desc) => desc.to_string(),
        };
        Self {
            embedded: true,
            ..Self::new(name, ty)
        }
    }

    pub fn tag(mut self, namespace: &str, value: &str) -> Self {
        self.tags.insert(namespace.to_string(), value.to_string());
        self
    }

    pub fn unexported(mut self) -> Self {
        self.exported = false;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_keywords_deserialize_inline() {
        let ty: TypeRef = serde_yaml_ng::from_str("string").unwrap();
        assert_eq!(ty, TypeRef::from(TypeKind::String));

        let ty: TypeRef = serde_yaml_ng::from_str("bytes").unwrap();
        assert_eq!(ty, TypeRef::bytes());

        let ty: TypeRef = serde_yaml_ng::from_str("User").unwrap();
        assert_eq!(ty, TypeRef::named("User"));
    }

    #[test]
    fn parse_maps_keywords_like_deserialization() {
        assert_eq!(TypeRef::parse("string"), TypeRef::from(TypeKind::String));
        assert_eq!(TypeRef::parse("date_time"), TypeRef::from(TypeKind::DateTime));
        assert_eq!(TypeRef::parse("TestUser"), TypeRef::named("TestUser"));
        let parsed: TypeRef = serde_yaml_ng::from_str("u16").unwrap();
        assert_eq!(TypeRef::parse("u16"), parsed);
    }

    #[test]
    fn composite_types_deserialize_as_maps() {
        let yaml = r#"
kind: map
key: string
value:
  kind: seq
  items: Pet
"#;
        let ty: TypeRef = serde_yaml_ng::from_str(yaml).unwrap();
        assert_eq!(ty, TypeRef::map(TypeKind::String, TypeRef::seq(TypeRef::named("Pet"))));
    }

    #[test]
    fn record_fields_default_to_exported() {
        let yaml = r#"
kind: record
fields:
  - name: Name
    type: string
    tags:
      json: name
  - name: secret
    type: string
    exported: false
"#;
        let desc: TypeDesc = serde_yaml_ng::from_str(yaml).unwrap();
        let TypeKind::Record { fields } = &desc.kind else {
            panic!("expected record");
        };
        assert!(fields[0].exported);
        assert!(!fields[0].embedded);
        assert_eq!(fields[0].tags["json"], "name");
        assert!(!fields[1].exported);
    }

    #[test]
    fn keyword_round_trips_through_serialization() {
        let value = serde_json::to_value(TypeRef::bytes()).unwrap();
        assert_eq!(value, serde_json::json!("bytes"));

        let value = serde_json::to_value(TypeRef::seq(TypeKind::I32)).unwrap();
        assert_eq!(value, serde_json::json!({"kind": "seq", "items": "i32"}));
    }

    #[test]
    fn display_names_anonymous_types() {
        assert_eq!(TypeRef::seq(TypeKind::I32).to_string(), "[i32]");
        assert_eq!(TypeRef::array(TypeKind::U8, 4).to_string(), "[u8; 4]");
        assert_eq!(TypeRef::from(TypeKind::Function).to_string(), "<anonymous function>");
    }
}
