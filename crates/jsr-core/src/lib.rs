pub mod config;
pub mod error;
pub mod keywords;
pub mod reflect;
pub mod registry;
pub mod schema;
pub mod tags;
pub mod types;

pub use reflect::{Reflector, TypeMapper, reflect};
pub use schema::{Definitions, RootSchema, Schema, SchemaType};
pub use types::{FieldDesc, TypeCatalog, TypeDesc, TypeKind, TypeRef};
