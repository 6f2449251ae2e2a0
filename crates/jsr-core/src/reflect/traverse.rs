use super::Reflector;
use crate::error::ReflectError;
use crate::keywords::apply_field_keywords;
use crate::registry::DiscriminatorType;
use crate::schema::{AdditionalProperties, Definitions, Schema, SchemaType};
use crate::tags::annotate;
use crate::types::{Resolved, TypeDesc, TypeKind, TypeRef, WIRE_ENUM_METHOD};

/// State threaded through one reflection run.
#[derive(Debug, Default)]
pub(super) struct Walk {
    pub(super) defs: Definitions,
    /// Named container types currently being expanded, innermost last.
    expanding: Vec<String>,
}

impl Reflector<'_> {
    /// Produce the schema node for one use site of `ty`, registering named
    /// records and interfaces in the walk's definitions and returning
    /// references to them.
    pub(super) fn reflect_type(&self, walk: &mut Walk, ty: &TypeRef) -> Result<Schema, ReflectError> {
        let resolved = self.resolve(ty)?;
        if resolved.is_named() && walk.defs.contains_key(resolved.name) {
            return Ok(Schema::reference_to(resolved.name));
        }
        let desc = resolved.desc;

        // Wire enums decode from either their name or their number.
        if self
            .catalog
            .satisfies(ty, &[WIRE_ENUM_METHOD.to_string()])
        {
            return Ok(Schema {
                one_of: vec![
                    Schema::typed(SchemaType::String),
                    Schema::typed(SchemaType::Integer),
                ],
                ..Schema::default()
            });
        }

        if let Some(e) = self.enums.get(ty) {
            log::debug!("emitting enum for {ty}");
            return Ok(Schema {
                default_value: e.values.first().cloned(),
                enum_values: e.values.clone(),
                ..Schema::default()
            });
        }

        if let Some(mapper) = &self.type_mapper {
            if let Some(schema) = mapper(ty, desc) {
                return Ok(schema);
            }
        }

        if resolved.is_named() && is_container(&desc.kind) {
            return self.reflect_named_container(walk, ty, resolved);
        }
        self.reflect_kind(walk, ty, resolved)
    }

    fn reflect_kind(
        &self,
        walk: &mut Walk,
        ty: &TypeRef,
        resolved: Resolved<'_>,
    ) -> Result<Schema, ReflectError> {
        let desc = resolved.desc;
        match &desc.kind {
            TypeKind::DateTime => Ok(formatted_string("date-time")),
            TypeKind::Uri => Ok(formatted_string("uri")),
            TypeKind::IpAddr => Ok(formatted_string("ipv4")),
            TypeKind::Record { .. } => self.reflect_record(walk, ty, resolved),
            TypeKind::Map { value, .. } => {
                let value = self.reflect_type(walk, value)?;
                Ok(Schema {
                    schema_type: Some(SchemaType::Object),
                    additional_properties: Some(AdditionalProperties::Schema(Box::new(value))),
                    ..Schema::default()
                })
            }
            TypeKind::Seq { .. } if desc.is_bytes() => Ok(Schema {
                schema_type: Some(SchemaType::String),
                media: Some(Box::new(Schema {
                    binary_encoding: Some("base64".to_string()),
                    ..Schema::default()
                })),
                ..Schema::default()
            }),
            TypeKind::Seq { items } => Ok(Schema {
                schema_type: Some(SchemaType::Array),
                items: Some(Box::new(self.reflect_type(walk, items)?)),
                ..Schema::default()
            }),
            TypeKind::Array { items, len } => Ok(Schema {
                schema_type: Some(SchemaType::Array),
                items: Some(Box::new(self.reflect_type(walk, items)?)),
                min_items: Some(*len),
                max_items: Some(*len),
                ..Schema::default()
            }),
            TypeKind::Interface { .. } => self.reflect_interface(walk, ty, resolved),
            kind if kind.is_integer() => Ok(Schema::typed(SchemaType::Integer)),
            kind if kind.is_float() => Ok(Schema::typed(SchemaType::Number)),
            TypeKind::Bool => Ok(Schema::typed(SchemaType::Boolean)),
            TypeKind::String => Ok(Schema::typed(SchemaType::String)),
            TypeKind::Optional { inner } => self.reflect_type(walk, inner),
            kind => Err(ReflectError::UnsupportedKind {
                type_name: ty.to_string(),
                kind: kind.name(),
            }),
        }
    }

    /// Named containers stay inline unless they lead back to themselves, in
    /// which case they are registered so the cycle can end in a `$ref`.
    fn reflect_named_container(
        &self,
        walk: &mut Walk,
        ty: &TypeRef,
        resolved: Resolved<'_>,
    ) -> Result<Schema, ReflectError> {
        let name = resolved.name;
        if walk.expanding.iter().any(|n| n == name) {
            log::debug!("{name} refers back to itself, emitting a reference");
            walk.defs.insert(name.to_string(), Schema::default());
            return Ok(Schema::reference_to(name));
        }

        walk.expanding.push(name.to_string());
        let node = self.reflect_kind(walk, ty, resolved);
        walk.expanding.pop();
        let node = node?;

        if !walk.defs.contains_key(name) {
            return Ok(node);
        }
        // `Node = optional<Node>` and friends describe no value at all.
        if node.definition_name() == Some(name) {
            return Err(ReflectError::Cycle(name.to_string()));
        }
        Ok(register(&mut walk.defs, name, node))
    }

    fn reflect_record(
        &self,
        walk: &mut Walk,
        ty: &TypeRef,
        resolved: Resolved<'_>,
    ) -> Result<Schema, ReflectError> {
        let ignored = self.is_ignored(ty);
        let mut node = Schema::empty_object(self.options.allow_additional_properties || ignored);

        if !resolved.is_named() {
            if !ignored {
                self.fill_record(&mut node, walk, resolved.desc)?;
            }
            return Ok(node);
        }

        // Claim the name first so fields that lead back here get a `$ref`.
        walk.defs.insert(resolved.name.to_string(), Schema::default());
        if !ignored {
            self.fill_record(&mut node, walk, resolved.desc)?;
        }
        Ok(register(&mut walk.defs, resolved.name, node))
    }

    /// Add the fields of `record` to `node`. A single inlined field becomes
    /// the node's own `oneOf`.
    pub(super) fn fill_record(
        &self,
        node: &mut Schema,
        walk: &mut Walk,
        record: &TypeDesc,
    ) -> Result<(), ReflectError> {
        self.reflect_fields(node, walk, record, &[])?;
        if node.all_of.len() == 1 && node.one_of.is_empty() {
            node.one_of = std::mem::take(&mut node.all_of);
        }
        Ok(())
    }

    fn reflect_fields(
        &self,
        node: &mut Schema,
        walk: &mut Walk,
        record: &TypeDesc,
        embedding: &[&str],
    ) -> Result<(), ReflectError> {
        let TypeKind::Record { fields } = &record.kind else {
            return Ok(());
        };

        for field in fields {
            let Some(annotation) = annotate(field, self.options.required_from_schema_tags) else {
                log::trace!("skipping field {}", field.name);
                continue;
            };

            if annotation.inline {
                let inlined = self.reflect_type(walk, &field.ty)?;
                node.all_of.push(inlined);
                continue;
            }

            if annotation.name.is_empty() {
                if field.embedded {
                    self.flatten_embedded(node, walk, &field.ty, embedding)?;
                }
                continue;
            }

            let mut property = self.reflect_type(walk, &field.ty)?;
            apply_field_keywords(&mut property, &annotation);
            node.properties.insert(annotation.name.clone(), property);
            if annotation.required {
                node.require(&annotation.name);
            }
        }
        Ok(())
    }

    /// Splice the members of an embedded record directly into `node`.
    fn flatten_embedded(
        &self,
        node: &mut Schema,
        walk: &mut Walk,
        ty: &TypeRef,
        embedding: &[&str],
    ) -> Result<(), ReflectError> {
        let resolved = self.resolve(ty)?;
        let Some(record) = self.record_desc(resolved)? else {
            return Ok(());
        };
        let name = ty.to_string();
        if embedding.contains(&name.as_str()) {
            log::debug!("{name} embeds itself, not flattening again");
            return Ok(());
        }
        let mut chain = embedding.to_vec();
        chain.push(&name);
        self.reflect_fields(node, walk, record, &chain)
    }

    fn reflect_interface(
        &self,
        walk: &mut Walk,
        ty: &TypeRef,
        resolved: Resolved<'_>,
    ) -> Result<Schema, ReflectError> {
        if resolved.is_named() {
            walk.defs.insert(resolved.name.to_string(), Schema::default());
        }

        let node = match self.discriminators.get(ty) {
            Some(discriminator) => self.discriminated_union(walk, discriminator)?,
            None => {
                log::debug!("{ty} has no discriminator, emitting an open object");
                Schema {
                    schema_type: Some(SchemaType::Object),
                    additional_properties: Some(AdditionalProperties::Bool(true)),
                    ..Schema::default()
                }
            }
        };

        if resolved.is_named() {
            Ok(register(&mut walk.defs, resolved.name, node))
        } else {
            Ok(node)
        }
    }

    fn discriminated_union(
        &self,
        walk: &mut Walk,
        discriminator: &DiscriminatorType,
    ) -> Result<Schema, ReflectError> {
        log::debug!(
            "building union for {} over {} variants",
            discriminator.base,
            discriminator.variants.len()
        );
        let mut branches = Vec::with_capacity(discriminator.variants.len());
        for (literal, concrete) in &discriminator.variants {
            let mut branch = self.reflect_variant(walk, concrete, &discriminator.field, literal)?;
            branch.title = Some(literal.clone());
            branches.push(branch);
        }
        branches.sort_by(|a, b| a.reference.cmp(&b.reference));

        Ok(Schema {
            one_of: branches,
            additional_properties: Some(AdditionalProperties::Bool(false)),
            ..Schema::default()
        })
    }

    /// Register the concrete type of one union branch under
    /// `Type@field:literal`, with the discriminator field pinned to `literal`.
    fn reflect_variant(
        &self,
        walk: &mut Walk,
        concrete: &TypeRef,
        field: &str,
        literal: &str,
    ) -> Result<Schema, ReflectError> {
        let resolved = self.resolve(concrete)?;
        let name = format!("{concrete}@{field}:{literal}");

        let ignored = self.is_ignored(concrete);
        let mut node = Schema::empty_object(self.options.allow_additional_properties || ignored);
        node.properties
            .insert(field.to_string(), Schema::const_string(literal));
        node.require(field);
        if !ignored {
            if let Some(record) = self.record_desc(resolved)? {
                self.fill_record(&mut node, walk, record)?;
            }
        }
        Ok(register(&mut walk.defs, &name, node))
    }
}

fn is_container(kind: &TypeKind) -> bool {
    matches!(
        kind,
        TypeKind::Map { .. } | TypeKind::Seq { .. } | TypeKind::Array { .. } | TypeKind::Optional { .. }
    )
}

fn formatted_string(format: &str) -> Schema {
    Schema {
        schema_type: Some(SchemaType::String),
        format: Some(format.to_string()),
        ..Schema::default()
    }
}

fn register(defs: &mut Definitions, name: &str, node: Schema) -> Schema {
    log::debug!("registering definition {name}");
    defs.insert(name.to_string(), node);
    Schema::reference_to(name)
}
