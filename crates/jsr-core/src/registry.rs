use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::RegistrationError;
use crate::types::{TypeCatalog, TypeKind, TypeRef};

/// A type whose values are restricted to a fixed list of literals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumType {
    #[serde(rename = "type")]
    pub ty: TypeRef,
    pub values: Vec<serde_json::Value>,
}

/// An interface whose concrete variant is selected by the literal value of
/// `field`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscriminatorType {
    pub base: TypeRef,
    pub field: String,
    /// Discriminator literal → concrete type.
    pub variants: IndexMap<String, TypeRef>,
}

/// Append-only enum registrations, looked up by type identity.
#[derive(Debug, Clone, Default)]
pub struct EnumRegistry {
    entries: Vec<EnumType>,
}

impl EnumRegistry {
    /// Register `values` for `ty`. Every value must be a literal of the
    /// type's own kind.
    pub fn register(
        &mut self,
        catalog: &TypeCatalog,
        ty: TypeRef,
        values: Vec<serde_json::Value>,
    ) -> Result<(), RegistrationError> {
        let resolved = catalog
            .resolve(&ty)
            .ok_or_else(|| RegistrationError::UnknownType(ty.to_string()))?;
        for value in &values {
            if !value_matches_kind(value, &resolved.desc.kind) {
                return Err(RegistrationError::EnumValueMismatch {
                    value: value.to_string(),
                    type_name: ty.to_string(),
                });
            }
        }
        log::debug!("registered enum {ty} with {} values", values.len());
        self.entries.push(EnumType { ty, values });
        Ok(())
    }

    pub fn get(&self, ty: &TypeRef) -> Option<&EnumType> {
        self.entries.iter().find(|e| &e.ty == ty)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Append-only discriminated-union registrations, looked up by base type.
#[derive(Debug, Clone, Default)]
pub struct DiscriminatorRegistry {
    entries: Vec<DiscriminatorType>,
}

impl DiscriminatorRegistry {
    /// Register `variants` as the implementations of the interface `base`,
    /// told apart by the value of `field`.
    pub fn register(
        &mut self,
        catalog: &TypeCatalog,
        base: TypeRef,
        field: &str,
        variants: IndexMap<String, TypeRef>,
    ) -> Result<(), RegistrationError> {
        let resolved = catalog
            .resolve(&base)
            .ok_or_else(|| RegistrationError::UnknownType(base.to_string()))?;
        let TypeKind::Interface { requires } = &resolved.desc.kind else {
            return Err(RegistrationError::NotAnInterface(base.to_string()));
        };
        for ty in variants.values() {
            if catalog.resolve(ty).is_none() {
                return Err(RegistrationError::UnknownType(ty.to_string()));
            }
            if !catalog.satisfies(ty, requires) {
                return Err(RegistrationError::DoesNotImplement {
                    type_name: ty.to_string(),
                    base: base.to_string(),
                });
            }
        }
        log::debug!(
            "registered discriminator {base}.{field} with {} variants",
            variants.len()
        );
        self.entries.push(DiscriminatorType {
            base,
            field: field.to_string(),
            variants,
        });
        Ok(())
    }

    pub fn get(&self, base: &TypeRef) -> Option<&DiscriminatorType> {
        self.entries.iter().find(|d| &d.base == base)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn value_matches_kind(value: &serde_json::Value, kind: &TypeKind) -> bool {
    use serde_json::Value;

    match (value, kind) {
        (Value::String(_), TypeKind::String) => true,
        (Value::Bool(_), TypeKind::Bool) => true,
        (Value::Number(n), k) if k.is_signed() => n.as_i64().is_some_and(|v| fits_signed(v, k)),
        (Value::Number(n), k) if k.is_unsigned() => {
            n.as_u64().is_some_and(|v| fits_unsigned(v, k))
        }
        (Value::Number(_), k) => k.is_float(),
        _ => false,
    }
}

fn fits_signed(v: i64, kind: &TypeKind) -> bool {
    match kind {
        TypeKind::I8 => i8::try_from(v).is_ok(),
        TypeKind::I16 => i16::try_from(v).is_ok(),
        TypeKind::I32 => i32::try_from(v).is_ok(),
        _ => true,
    }
}

fn fits_unsigned(v: u64, kind: &TypeKind) -> bool {
    match kind {
        TypeKind::U8 => u8::try_from(v).is_ok(),
        TypeKind::U16 => u16::try_from(v).is_ok(),
        TypeKind::U32 => u32::try_from(v).is_ok(),
        _ => true,
    }
}
