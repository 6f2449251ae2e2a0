pub mod catalog;
pub mod desc;

pub use catalog::{Resolved, TypeCatalog};
pub use desc::{FieldDesc, TypeDesc, TypeKind, TypeRef, WIRE_ENUM_METHOD};
