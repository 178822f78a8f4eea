//! Type registry
//!
//! Built once through [`TypeRegistryBuilder`] and immutable afterwards, so a
//! registry can be shared across threads behind an `Arc` without locking.
//! Building derives every registered type's linked-data context and fails
//! fast on a conflict.

use serde_json::{Map, Value};
use std::any::{type_name, TypeId};
use std::collections::HashMap;
use tracing::{debug, trace};

use representation::{
    Annotation, ArrayContainer, AtomicContainer, AudioSignal, EmissorError, ImageSignal, Index,
    LdContext, LdDeclaration, LinkedDataConfig, Mention, MultiIndex, Result, Scenario,
    ScenarioContext, Sequence, TemporalContainer, TemporalRuler, TextSignal, VideoSignal,
    AtomicRuler, TYPE_KEY,
};

use crate::schema::{Field, FieldKind, Structured};

/// Reserved linked-data keys written into every structured record
pub const LD_CONTEXT_KEY: &str = "@context";
pub const LD_TYPE_KEY: &str = "@type";

/// Schema of one registered type
#[derive(Debug, Clone)]
pub struct RecordSchema {
    /// Wire discriminator
    pub tag: &'static str,
    /// Rust type name, for diagnostics
    pub type_name: &'static str,
    pub context: LdContext,
    pub fields: Vec<Field>,
}

impl RecordSchema {
    /// Linked-data type name written as `@type`
    pub fn ld_type(&self) -> &str {
        self.context.type_name()
    }
}

struct PendingSchema {
    tag: &'static str,
    type_name: &'static str,
    declaration: LdDeclaration,
    fields: Vec<Field>,
}

/// Collects types before the registry is frozen
#[derive(Default)]
pub struct TypeRegistryBuilder {
    linked_data: LinkedDataConfig,
    pending: HashMap<TypeId, PendingSchema>,
    order: Vec<TypeId>,
}

impl TypeRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Namespace and separator for declarations that do not set their own
    pub fn linked_data(mut self, config: LinkedDataConfig) -> Self {
        self.linked_data = config;
        self
    }

    /// Register `T` and every record type reachable from its fields
    pub fn register<T: Structured>(mut self) -> Self {
        self.insert::<T>();
        self
    }

    /// Register the scenario model: scenarios, all signal kinds, containers,
    /// rulers and every annotation value type
    pub fn register_emissor_types(self) -> Self {
        self.register::<Scenario>()
            .register::<ScenarioContext>()
            .register::<TextSignal>()
            .register::<ImageSignal>()
            .register::<AudioSignal>()
            .register::<VideoSignal>()
            .register::<Mention>()
            .register::<Annotation>()
            .register::<Index>()
            .register::<MultiIndex>()
            .register::<TemporalRuler>()
            .register::<AtomicRuler>()
            .register::<TemporalContainer>()
            .register::<ArrayContainer>()
            .register::<Sequence<String>>()
            .register::<Sequence<char>>()
            .register::<Sequence<i64>>()
            .register::<Sequence<f64>>()
            .register::<AtomicContainer<String>>()
            .register::<AtomicContainer<i64>>()
    }

    pub(crate) fn insert<T: Structured>(&mut self) {
        let type_id = TypeId::of::<T>();
        if self.pending.contains_key(&type_id) {
            return;
        }

        let fields = T::fields();
        self.pending.insert(
            type_id,
            PendingSchema {
                tag: T::TYPE_TAG,
                type_name: type_name::<T>(),
                declaration: T::ld_declaration(),
                fields: fields.clone(),
            },
        );
        self.order.push(type_id);
        trace!(tag = T::TYPE_TAG, "registered type");

        for field in &fields {
            self.insert_nested(&field.kind);
        }
    }

    fn insert_nested(&mut self, kind: &FieldKind) {
        match kind {
            FieldKind::Plain => {}
            FieldKind::Record(record) => (record.register)(self),
            FieldKind::List(inner) | FieldKind::Optional(inner) => self.insert_nested(inner),
            FieldKind::Any(any) => {
                for candidate in any.candidates() {
                    (candidate.register)(self);
                }
            }
        }
    }

    /// Derive all contexts and freeze the registry.
    ///
    /// # Errors
    /// `SchemaConflict` for the first type whose context cannot be merged
    pub fn build(mut self) -> Result<TypeRegistry> {
        let mut schemas = HashMap::with_capacity(self.order.len());
        let mut by_tag = HashMap::new();

        for type_id in &self.order {
            let Some(pending) = self.pending.remove(type_id) else {
                continue;
            };
            let context = pending.declaration.derive_context_with(
                &self.linked_data.namespace,
                &self.linked_data.separator,
            )?;

            by_tag.entry(pending.tag).or_insert(*type_id);
            schemas.insert(
                *type_id,
                RecordSchema {
                    tag: pending.tag,
                    type_name: pending.type_name,
                    context,
                    fields: pending.fields,
                },
            );
        }

        debug!(types = schemas.len(), "type registry built");
        Ok(TypeRegistry { schemas, by_tag })
    }
}

/// Immutable map from registered types to their schemas
#[derive(Debug)]
pub struct TypeRegistry {
    schemas: HashMap<TypeId, RecordSchema>,
    by_tag: HashMap<&'static str, TypeId>,
}

impl TypeRegistry {
    pub fn builder() -> TypeRegistryBuilder {
        TypeRegistryBuilder::new()
    }

    /// Registry of the scenario model under the default namespace
    pub fn emissor() -> Result<Self> {
        Self::builder().register_emissor_types().build()
    }

    /// Schema of `T`.
    ///
    /// # Errors
    /// `UnsupportedType` if `T` was not registered
    pub fn schema_of<T: Structured>(&self) -> Result<&RecordSchema> {
        self.schemas.get(&TypeId::of::<T>()).ok_or_else(|| {
            EmissorError::unsupported(type_name::<T>(), "type is not registered")
        })
    }

    pub fn context_of<T: Structured>(&self) -> Result<&LdContext> {
        self.schema_of::<T>().map(|schema| &schema.context)
    }

    pub fn schema_by_tag(&self, tag: &str) -> Option<&RecordSchema> {
        self.by_tag.get(tag).and_then(|id| self.schemas.get(id))
    }

    pub fn contains<T: Structured>(&self) -> bool {
        self.schemas.contains_key(&TypeId::of::<T>())
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    /// Write `@context` and `@type` into `value` and every structured record
    /// nested in it
    pub fn decorate(&self, value: &mut Value, schema: &RecordSchema) {
        let Value::Object(map) = value else {
            return;
        };

        for field in &schema.fields {
            if let Some(child) = map.get_mut(field.name) {
                self.decorate_field(child, &field.kind);
            }
        }

        insert_linked_data(map, schema);
    }

    fn decorate_field(&self, value: &mut Value, kind: &FieldKind) {
        match kind {
            FieldKind::Plain => {}
            FieldKind::Record(record) => {
                if let Some(schema) = self.schemas.get(&record.type_id) {
                    self.decorate(value, schema);
                }
            }
            FieldKind::List(inner) => {
                if let Value::Array(items) = value {
                    for item in items {
                        self.decorate_field(item, inner);
                    }
                }
            }
            FieldKind::Optional(inner) => {
                if !value.is_null() {
                    self.decorate_field(value, inner);
                }
            }
            FieldKind::Any(_) => {
                if let Value::Array(items) = value {
                    for item in items {
                        self.decorate_field(item, kind);
                    }
                    return;
                }

                let schema = value
                    .get(TYPE_KEY)
                    .and_then(Value::as_str)
                    .and_then(|tag| self.schema_by_tag(tag));
                if let Some(schema) = schema {
                    self.decorate(value, schema);
                }
            }
        }
    }
}

fn insert_linked_data(map: &mut Map<String, Value>, schema: &RecordSchema) {
    map.insert(LD_CONTEXT_KEY.to_string(), schema.context.to_value());
    map.insert(
        LD_TYPE_KEY.to_string(),
        Value::String(schema.ld_type().to_string()),
    );
}
