//! The normalized, per-subgraph type model produced by schema ingest (§3, §4.1): a mapping from
//! type name to a [`TypeDef`] describing its kind, fields, and federation annotations, with the
//! federation directives themselves stripped out of the user-visible GraphQL schema and recorded
//! in this side table instead.

pub mod field_set;

use apollo_compiler::validation::Valid;
use apollo_compiler::Name;
use apollo_compiler::Schema;
use indexmap::IndexMap;

pub use field_set::FieldSet;
pub use field_set::FieldSetSelection;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Object,
    Interface,
    Union,
    Enum,
    Scalar,
    Input,
}

impl TypeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TypeKind::Object => "object",
            TypeKind::Interface => "interface",
            TypeKind::Union => "union",
            TypeKind::Enum => "enum",
            TypeKind::Scalar => "scalar",
            TypeKind::Input => "input",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgumentDef {
    pub name: Name,
    pub type_ref: String,
}

/// A field declaration plus its federation annotations (§3): whether it's `@external`, and any
/// `@requires`/`@provides` field sets.
#[derive(Debug, Clone)]
pub struct FieldDef {
    pub name: Name,
    pub type_ref: String,
    pub arguments: Vec<ArgumentDef>,
    pub external: bool,
    pub requires: Option<FieldSet>,
    pub provides: Option<FieldSet>,
}

/// A type declaration in one subgraph's normalized model. Object types additionally carry zero
/// or more `@key` declarations and an `is_extension` flag (§3).
#[derive(Debug, Clone)]
pub struct TypeDef {
    pub name: Name,
    pub kind: TypeKind,
    pub fields: IndexMap<Name, FieldDef>,
    pub keys: Vec<FieldSet>,
    pub is_extension: bool,
    /// Member type names, populated only for `TypeKind::Union`.
    pub union_members: Vec<Name>,
    /// Value names, populated only for `TypeKind::Enum`.
    pub enum_values: Vec<Name>,
}

impl TypeDef {
    pub fn is_entity(&self) -> bool {
        self.kind == TypeKind::Object && !self.keys.is_empty()
    }
}

/// A subgraph's validated, federation-annotation-free GraphQL schema, plus the normalized type
/// model extracted from it. The underlying `Valid<Schema>` no longer mentions `@key`/`@external`/
/// `@requires`/`@provides`/`@extends` in its directive applications (§4.1): those were consumed
/// while building `types` and are not re-emitted to callers that just want a plain GraphQL
/// schema.
pub struct FederationSchema {
    schema: Valid<Schema>,
    pub types: IndexMap<Name, TypeDef>,
}

impl FederationSchema {
    pub fn new(schema: Valid<Schema>, types: IndexMap<Name, TypeDef>) -> Self {
        FederationSchema { schema, types }
    }

    pub fn schema(&self) -> &Valid<Schema> {
        &self.schema
    }

    pub fn get_type(&self, name: &str) -> Option<&TypeDef> {
        self.types.get(name)
    }
}
