use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::desc::{TypeDesc, TypeKind, TypeRef};
use crate::error::CatalogError;
use crate::registry::{DiscriminatorType, EnumType};

/// The universe of named types a reflection run can refer to, plus optional
/// enum and discriminator registrations shipped alongside them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TypeCatalog {
    pub types: IndexMap<String, TypeDesc>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub enums: Vec<EnumType>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub discriminators: Vec<DiscriminatorType>,
}

/// A type reference resolved against a catalog.
#[derive(Debug, Clone, Copy)]
pub struct Resolved<'a> {
    /// Declared name, empty for anonymous types.
    pub name: &'a str,
    pub desc: &'a TypeDesc,
}

impl Resolved<'_> {
    pub fn is_named(&self) -> bool {
        !self.name.is_empty()
    }
}

impl TypeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a catalog from YAML.
    pub fn from_yaml(input: &str) -> Result<Self, CatalogError> {
        Ok(serde_yaml_ng::from_str(input)?)
    }

    /// Parse a catalog from JSON.
    pub fn from_json(input: &str) -> Result<Self, CatalogError> {
        Ok(serde_json::from_str(input)?)
    }

    /// Add or replace a named type.
    pub fn declare(&mut self, name: impl Into<String>, desc: TypeDesc) -> &mut Self {
        self.types.insert(name.into(), desc);
        self
    }

    pub fn resolve<'a>(&'a self, ty: &'a TypeRef) -> Option<Resolved<'a>> {
        match ty {
            TypeRef::Named(name) => self
                .types
                .get_key_value(name)
                .map(|(name, desc)| Resolved { name, desc }),
            TypeRef::Inline(desc) => Some(Resolved { name: "", desc }),
        }
    }

    /// Whether `ty` exposes every method in `requires`. An optional reference
    /// also exposes the methods of the type it points to.
    pub fn satisfies(&self, ty: &TypeRef, requires: &[String]) -> bool {
        let Some(resolved) = self.resolve(ty) else {
            return false;
        };
        let inner = match &resolved.desc.kind {
            TypeKind::Optional { inner } => self.resolve(inner),
            _ => None,
        };
        requires.iter().all(|method| {
            resolved.desc.methods.contains(method)
                || inner.is_some_and(|i| i.desc.methods.contains(method))
        })
    }

    /// Check that every named reference in the catalog is declared.
    pub fn validate(&self) -> Result<(), CatalogError> {
        let mut missing = Vec::new();
        for desc in self.types.values() {
            self.collect_missing_in_desc(desc, &mut missing);
        }
        for e in &self.enums {
            self.collect_missing(&e.ty, &mut missing);
        }
        for d in &self.discriminators {
            self.collect_missing(&d.base, &mut missing);
            for variant in d.variants.values() {
                self.collect_missing(variant, &mut missing);
            }
        }
        if missing.is_empty() {
            return Ok(());
        }
        missing.sort();
        missing.dedup();
        Err(CatalogError::DanglingReferences(missing))
    }

    fn collect_missing(&self, ty: &TypeRef, missing: &mut Vec<String>) {
        match ty {
            TypeRef::Named(name) => {
                if !self.types.contains_key(name) {
                    missing.push(name.clone());
                }
            }
            TypeRef::Inline(desc) => self.collect_missing_in_desc(desc, missing),
        }
    }

    fn collect_missing_in_desc(&self, desc: &TypeDesc, missing: &mut Vec<String>) {
        match &desc.kind {
            TypeKind::Record { fields } => {
                for field in fields {
                    self.collect_missing(&field.ty, missing);
                }
            }
            TypeKind::Map { key, value } => {
                self.collect_missing(key, missing);
                self.collect_missing(value, missing);
            }
            TypeKind::Seq { items } | TypeKind::Array { items, .. } => {
                self.collect_missing(items, missing);
            }
            TypeKind::Optional { inner } => self.collect_missing(inner, missing),
            TypeKind::Tuple { items } => {
                for item in items {
                    self.collect_missing(item, missing);
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FieldDesc;

    const PETS: &str = r#"
types:
  Pet:
    kind: record
    fields:
      - name: Name
        type: string
        tags:
          json: name
      - name: Owner
        type:
          kind: optional
          inner: Owner
  Owner:
    kind: record
    methods: [Describe]
  Describable:
    kind: interface
    requires: [Describe]
enums:
  - type: Status
    values: [active, retired]
"#;

    #[test]
    fn parses_yaml_catalog() {
        let catalog = TypeCatalog::from_yaml(PETS).unwrap();
        assert_eq!(catalog.types.len(), 3);
        assert_eq!(catalog.enums.len(), 1);

        let pet = TypeRef::named("Pet");
        let resolved = catalog.resolve(&pet).unwrap();
        assert_eq!(resolved.name, "Pet");
        assert!(resolved.is_named());
    }

    #[test]
    fn anonymous_types_resolve_without_name() {
        let catalog = TypeCatalog::new();
        let ty = TypeRef::from(TypeKind::String);
        let resolved = catalog.resolve(&ty).unwrap();
        assert!(!resolved.is_named());
        assert!(catalog.resolve(&TypeRef::named("Missing")).is_none());
    }

    #[test]
    fn validate_reports_dangling_names() {
        let catalog = TypeCatalog::from_yaml(PETS).unwrap();
        match catalog.validate() {
            Err(CatalogError::DanglingReferences(names)) => {
                assert_eq!(names, vec!["Status".to_string()]);
            }
            other => panic!("expected dangling references, got {other:?}"),
        }
    }

    #[test]
    fn satisfies_checks_method_sets() {
        let catalog = TypeCatalog::from_yaml(PETS).unwrap();
        let requires = vec!["Describe".to_string()];
        assert!(catalog.satisfies(&TypeRef::named("Owner"), &requires));
        assert!(catalog.satisfies(&TypeRef::optional(TypeRef::named("Owner")), &requires));
        assert!(!catalog.satisfies(&TypeRef::named("Pet"), &requires));
        assert!(catalog.satisfies(&TypeRef::named("Pet"), &[]));
    }

    #[test]
    fn declare_builds_catalog_in_code() {
        let mut catalog = TypeCatalog::new();
        catalog
            .declare(
                "User",
                TypeDesc::record(vec![FieldDesc::new("Name", TypeKind::String)]),
            )
            .declare("Users", TypeDesc::new(TypeKind::Seq { items: TypeRef::named("User") }));
        assert!(catalog.validate().is_ok());
    }
}
