//! Linked-data context derivation
//!
//! Each structured type declares its own properties and its ancestors through
//! an [`LdDeclaration`]. The derived [`LdContext`] maps every property name to
//! an IRI: the declaration's own properties resolve under its namespace, and
//! each ancestor contributes only the properties it declares itself, resolved
//! under the ancestor's namespace. Two different IRIs for the same name are a
//! [`EmissorError::SchemaConflict`].
//!
//! Namespaces ending in `/` or `#` are used as prefixes; any other namespace is
//! treated as a base URI and joined with the declaration's separator.
//!
//! ```
//! use representation::ld::{LdDeclaration, LdProperty};
//!
//! let parent = LdDeclaration::new("TestParent")
//!     .namespace("http://example.org")
//!     .field("parent_property");
//! let child = LdDeclaration::new("TestChild")
//!     .namespace("http://example.org")
//!     .field("child_property")
//!     .extends(parent);
//!
//! let context = child.derive_context("https://emissor.org").unwrap();
//! assert_eq!(context.iri("parent_property"), Some("http://example.org#parent_property"));
//! assert_eq!(context.iri("child_property"), Some("http://example.org#child_property"));
//! assert_eq!(context.iri("id"), Some("@id"));
//! ```

use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use crate::{EmissorError, Result};

/// Default namespace of the data model types
pub const EMISSOR_NAMESPACE: &str = "https://emissor.org";

/// Default separator between a base URI and a term name
pub const DEFAULT_SEPARATOR: &str = "#";

/// Reserved term for the identifier property
const ID_KEYWORD: &str = "@id";

/// Linked-data information attached to one property
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LdProperty {
    pub name: String,
    /// Term used in place of the property name when resolving the IRI
    pub alias: Option<String>,
    /// Namespace override; `Some("")` uses the alias as the IRI verbatim
    pub prefix: Option<String>,
    /// JSON-LD `@type` of the property value
    pub value_type: Option<String>,
    /// Leave the property out of the context
    pub ignore: bool,
}

impl LdProperty {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            alias: None,
            prefix: None,
            value_type: None,
            ignore: false,
        }
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    pub fn value_type(mut self, value_type: impl Into<String>) -> Self {
        self.value_type = Some(value_type.into());
        self
    }

    /// The property value is itself an IRI (`"@type": "@id"`)
    pub fn id_ref(self) -> Self {
        self.value_type(ID_KEYWORD)
    }

    pub fn ignored(mut self) -> Self {
        self.ignore = true;
        self
    }

    fn resolve(&self, namespace: &str, separator: &str) -> ContextTerm {
        let term = self.alias.as_deref().unwrap_or(&self.name);
        let iri = match self.prefix.as_deref() {
            Some("") => term.to_string(),
            Some(prefix) => resolve_name(prefix, separator, term),
            None => resolve_name(namespace, separator, term),
        };

        match &self.value_type {
            Some(value_type) => ContextTerm::Typed {
                id: iri,
                value_type: value_type.clone(),
            },
            None => ContextTerm::Iri(iri),
        }
    }
}

/// Linked-data declaration of one structured type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LdDeclaration {
    type_name: String,
    namespace: Option<String>,
    separator: Option<String>,
    properties: Vec<LdProperty>,
    parents: Vec<LdDeclaration>,
}

impl LdDeclaration {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            namespace: None,
            separator: None,
            properties: Vec::new(),
            parents: Vec::new(),
        }
    }

    /// Namespace of this declaration; without one the default namespace passed
    /// to [`derive_context`](Self::derive_context) applies
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = Some(separator.into());
        self
    }

    /// Declare a plain property
    pub fn field(self, name: impl Into<String>) -> Self {
        self.property(LdProperty::new(name))
    }

    pub fn property(mut self, property: LdProperty) -> Self {
        self.properties.push(property);
        self
    }

    /// Add an ancestor whose own properties are merged into the context
    pub fn extends(mut self, parent: LdDeclaration) -> Self {
        self.parents.push(parent);
        self
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn properties(&self) -> &[LdProperty] {
        &self.properties
    }

    pub fn parents(&self) -> &[LdDeclaration] {
        &self.parents
    }

    /// Derive the context of this type.
    ///
    /// # Errors
    /// `SchemaConflict` listing every name that resolves to two different terms
    pub fn derive_context(&self, default_namespace: &str) -> Result<LdContext> {
        self.derive_context_with(default_namespace, DEFAULT_SEPARATOR)
    }

    /// Same as [`derive_context`](Self::derive_context), with a default
    /// separator for declarations that do not set one
    pub fn derive_context_with(
        &self,
        default_namespace: &str,
        default_separator: &str,
    ) -> Result<LdContext> {
        let namespace = self.namespace.as_deref().unwrap_or(default_namespace);
        let separator = self.separator.as_deref().unwrap_or(default_separator);
        let mut merge = ContextMerge::default();

        merge.insert(
            &self.type_name,
            ContextTerm::Iri(resolve_name(namespace, separator, &self.type_name)),
        );
        merge.insert("id", ContextTerm::Iri(ID_KEYWORD.to_string()));

        let mut stack: Vec<&LdDeclaration> = vec![self];
        while let Some(declaration) = stack.pop() {
            let own_namespace = declaration.namespace.as_deref().unwrap_or(default_namespace);
            let own_separator = declaration.separator.as_deref().unwrap_or(default_separator);
            for property in declaration.own_properties() {
                merge.insert(&property.name, property.resolve(own_namespace, own_separator));
            }
            stack.extend(declaration.parents.iter().rev());
        }

        if !merge.conflicts.is_empty() {
            return Err(EmissorError::SchemaConflict {
                type_name: self.type_name.clone(),
                conflicts: merge.conflicts,
            });
        }

        Ok(LdContext {
            type_name: self.type_name.clone(),
            terms: merge.terms,
        })
    }

    fn own_properties(&self) -> impl Iterator<Item = &LdProperty> {
        self.properties
            .iter()
            .filter(|p| !p.ignore && p.name != "id" && starts_alphabetic(&p.name))
    }
}

#[derive(Default)]
struct ContextMerge {
    terms: BTreeMap<String, ContextTerm>,
    conflicts: Vec<String>,
}

impl ContextMerge {
    fn insert(&mut self, name: &str, term: ContextTerm) {
        match self.terms.entry(name.to_string()) {
            Entry::Vacant(slot) => {
                slot.insert(term);
            }
            Entry::Occupied(existing) if *existing.get() != term => {
                self.conflicts
                    .push(format!("{name}: {} != {}", existing.get(), term));
            }
            Entry::Occupied(_) => {}
        }
    }
}

/// Context entry of one term
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ContextTerm {
    Iri(String),
    Typed {
        #[serde(rename = "@id")]
        id: String,
        #[serde(rename = "@type")]
        value_type: String,
    },
}

impl ContextTerm {
    pub fn iri(&self) -> &str {
        match self {
            ContextTerm::Iri(iri) => iri,
            ContextTerm::Typed { id, .. } => id,
        }
    }
}

impl std::fmt::Display for ContextTerm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContextTerm::Iri(iri) => write!(f, "{iri}"),
            ContextTerm::Typed { id, value_type } => write!(f, "{id} (@type {value_type})"),
        }
    }
}

/// Derived context of one type, serialized as the `@context` term map
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LdContext {
    type_name: String,
    terms: BTreeMap<String, ContextTerm>,
}

impl LdContext {
    /// Linked-data type name, written as `@type`
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn get(&self, name: &str) -> Option<&ContextTerm> {
        self.terms.get(name)
    }

    /// IRI of a term, ignoring its value type
    pub fn iri(&self, name: &str) -> Option<&str> {
        self.terms.get(name).map(ContextTerm::iri)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.terms.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ContextTerm)> {
        self.terms.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// The `@context` JSON object
    pub fn to_value(&self) -> Value {
        Value::Object(
            self.terms
                .iter()
                .map(|(name, term)| {
                    let term = match term {
                        ContextTerm::Iri(iri) => Value::String(iri.clone()),
                        ContextTerm::Typed { id, value_type } => serde_json::json!({
                            "@id": id,
                            "@type": value_type,
                        }),
                    };
                    (name.clone(), term)
                })
                .collect(),
        )
    }
}

impl Serialize for LdContext {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.terms.serialize(serializer)
    }
}

/// Types carrying a linked-data declaration
pub trait LinkedDataType {
    fn ld_declaration() -> LdDeclaration;

    /// Context under the default emissor namespace
    fn ld_context() -> Result<LdContext> {
        Self::ld_declaration().derive_context(EMISSOR_NAMESPACE)
    }
}

fn resolve_name(namespace: &str, separator: &str, name: &str) -> String {
    if namespace.ends_with('/') || namespace.ends_with('#') {
        format!("{namespace}{name}")
    } else {
        format!("{namespace}{separator}{name}")
    }
}

fn starts_alphabetic(name: &str) -> bool {
    name.chars().next().is_some_and(char::is_alphabetic)
}
