mod traverse;

use traverse::Walk;

use indexmap::IndexMap;

use crate::config::ReflectOptions;
use crate::error::{ReflectError, RegistrationError};
use crate::registry::{DiscriminatorRegistry, EnumRegistry};
use crate::schema::{RootSchema, Schema, VERSION};
use crate::types::{Resolved, TypeCatalog, TypeDesc, TypeKind, TypeRef};

/// User hook consulted before the builtin dispatch. Returning `Some` replaces
/// the schema the reflector would have produced for that type.
pub type TypeMapper = Box<dyn Fn(&TypeRef, &TypeDesc) -> Option<Schema>>;

/// Reflects type descriptions from a catalog into JSON Schema documents.
///
/// Registrations are append-only and must be complete before the first call
/// to [`Reflector::reflect`]; reflection itself only reads the reflector.
pub struct Reflector<'a> {
    catalog: &'a TypeCatalog,
    options: ReflectOptions,
    type_mapper: Option<TypeMapper>,
    enums: EnumRegistry,
    discriminators: DiscriminatorRegistry,
}

impl<'a> Reflector<'a> {
    pub fn new(catalog: &'a TypeCatalog) -> Self {
        Self {
            catalog,
            options: ReflectOptions::default(),
            type_mapper: None,
            enums: EnumRegistry::default(),
            discriminators: DiscriminatorRegistry::default(),
        }
    }

    pub fn with_options(mut self, options: ReflectOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_type_mapper(
        mut self,
        mapper: impl Fn(&TypeRef, &TypeDesc) -> Option<Schema> + 'static,
    ) -> Self {
        self.type_mapper = Some(Box::new(mapper));
        self
    }

    pub fn options(&self) -> &ReflectOptions {
        &self.options
    }

    /// Restrict `ty` to the literal `values`; the first value becomes the
    /// schema default.
    pub fn register_enum(
        &mut self,
        ty: TypeRef,
        values: Vec<serde_json::Value>,
    ) -> Result<(), RegistrationError> {
        self.enums.register(self.catalog, ty, values)
    }

    /// Describe the interface `base` as a union of `variants`, selected by the
    /// literal value of `field`.
    pub fn register_discriminator(
        &mut self,
        base: TypeRef,
        field: &str,
        variants: IndexMap<String, TypeRef>,
    ) -> Result<(), RegistrationError> {
        self.discriminators
            .register(self.catalog, base, field, variants)
    }

    /// Register every enum and discriminator declared in the catalog itself.
    pub fn register_from_catalog(&mut self) -> Result<(), RegistrationError> {
        for e in &self.catalog.enums {
            self.enums
                .register(self.catalog, e.ty.clone(), e.values.clone())?;
        }
        for d in &self.catalog.discriminators {
            self.discriminators.register(
                self.catalog,
                d.base.clone(),
                &d.field,
                d.variants.clone(),
            )?;
        }
        Ok(())
    }

    /// Build the schema document for `root`.
    pub fn reflect(&self, root: &TypeRef) -> Result<RootSchema, ReflectError> {
        log::debug!("reflecting {root}");
        let mut walk = Walk::default();

        if !self.options.expanded_root {
            let schema = self.reflect_type(&mut walk, root)?;
            return Ok(RootSchema {
                schema,
                definitions: walk.defs,
            });
        }

        let resolved = self.resolve(root)?;
        let mut schema = Schema::empty_object(self.options.allow_additional_properties);
        schema.version = Some(VERSION.to_string());
        if let Some(record) = self.record_desc(resolved)? {
            self.fill_record(&mut schema, &mut walk, record)?;
        }

        let mut document = RootSchema {
            schema,
            definitions: walk.defs,
        };
        // A self-referential root still needs its definition for the `$ref`
        // inside it to resolve.
        if resolved.is_named() && !document.references(resolved.name) {
            document.definitions.remove(resolved.name);
        }
        Ok(document)
    }

    fn resolve<'t>(&'t self, ty: &'t TypeRef) -> Result<Resolved<'t>, ReflectError> {
        self.catalog
            .resolve(ty)
            .ok_or_else(|| ReflectError::UnknownType(ty.to_string()))
    }

    /// The record behind `resolved`, looking through optional references.
    fn record_desc<'t>(
        &'t self,
        resolved: Resolved<'t>,
    ) -> Result<Option<&'t TypeDesc>, ReflectError> {
        match &resolved.desc.kind {
            TypeKind::Record { .. } => Ok(Some(resolved.desc)),
            TypeKind::Optional { inner } => {
                let inner = self.resolve(inner)?;
                self.record_desc(inner)
            }
            _ => Ok(None),
        }
    }

    fn is_ignored(&self, ty: &TypeRef) -> bool {
        self.options.ignored_types.contains(ty)
    }
}

/// Reflect `root` with default options, applying the catalog's own enum and
/// discriminator declarations.
pub fn reflect(catalog: &TypeCatalog, root: &TypeRef) -> Result<RootSchema, ReflectError> {
    let mut reflector = Reflector::new(catalog);
    reflector.register_from_catalog()?;
    reflector.reflect(root)
}
