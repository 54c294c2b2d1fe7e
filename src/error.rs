//! Error types for the composition, supergraph, and query-planning core.
//!
//! The core distinguishes two error shapes: a [`SingleFederationError`] for one failure (used
//! for ingest-time and plan-time errors, where the first failure is fatal) and an aggregated
//! [`FederationError`] that composition uses to report every validation failure it finds in one
//! pass, rather than stopping at the first one.

use apollo_compiler::Name;
use serde::Serialize;

/// Create an internal error, for conditions that indicate a bug in composition (or an
/// externally-mangled supergraph) rather than a problem with user input.
#[macro_export]
macro_rules! internal_error {
    ( $( $arg:tt )+ ) => {
        $crate::error::FederationError::internal(format!( $( $arg )+ ))
    }
}

/// Stable, machine-readable error codes. These are the codes referenced throughout the
/// specification (`SCHEMA_*` ingest errors, the composition validation table, and the planner
/// error codes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum_macros::Display, strum_macros::AsRefStr)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    Internal,
    InvalidGraphql,
    UnsupportedFeature,
    UnknownFederationDirective,
    KeyOnNonObject,
    KeyFieldsMissingOnBase,
    KeyFieldsSelectInvalidType,
    RequiresOnNonEntityField,
    ProvidesOnNonEntityField,
    ExternalUnused,
    ExternalTypeMismatch,
    ExternalMissingOnBase,
    ProvidesFieldsMissingExternal,
    ProvidesNotOnEntity,
    RequiresFieldsMissingExternal,
    ValueTypeNoEntity,
    ValueTypeUnionTypesIdentical,
    ValueTypeKindMismatch,
    FieldTypeMismatch,
    FieldArgumentMismatch,
    NoEntityOwner,
    MultipleEntityOwners,
    NoResolver,
    UnsatisfiableRequires,
    SubscriptionMultipleSubgraphs,
}

/// One composition, ingest, or planning failure.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SingleFederationError {
    #[error("An internal error has occurred in graphfed-core, please report this bug.\n\nDetails: {message}")]
    Internal { message: String },

    #[error("Invalid GraphQL: {message}")]
    InvalidGraphql { message: String },

    #[error("Unsupported @core feature or version: {message}")]
    UnsupportedFeature { message: String },

    #[error("Unknown federation directive \"@{name}\"")]
    UnknownFederationDirective { name: Name },

    #[error("\"@key\" cannot be used on non-object type \"{type_name}\"")]
    KeyOnNonObject { type_name: Name },

    #[error("On type \"{type_name}\", key field \"{field_name}\" is not defined")]
    KeyFieldsMissingOnBase { type_name: Name, field_name: Name },

    #[error(
        "On type \"{type_name}\", key field \"{field_name}\" selects a {kind} field, which is not allowed in a key"
    )]
    KeyFieldsSelectInvalidType {
        type_name: Name,
        field_name: Name,
        kind: &'static str,
    },

    #[error("\"@requires\" cannot be used on field \"{coordinate}\" as it is not part of an entity type")]
    RequiresOnNonEntityField { coordinate: String },

    #[error("\"@provides\" cannot be used on field \"{coordinate}\" as it is not part of an entity type")]
    ProvidesOnNonEntityField { coordinate: String },

    #[error(
        "Field \"{coordinate}\" is marked @external but is not used in any @key, @requires, or @provides in subgraph \"{subgraph}\""
    )]
    ExternalUnused { coordinate: String, subgraph: String },

    #[error(
        "Field \"{coordinate}\" is marked @external in subgraph \"{subgraph}\" but its type does not match the owning subgraph's declaration"
    )]
    ExternalTypeMismatch { coordinate: String, subgraph: String },

    #[error(
        "Field \"{coordinate}\" is marked @external in subgraph \"{subgraph}\" but is not defined by the owning subgraph"
    )]
    ExternalMissingOnBase { coordinate: String, subgraph: String },

    #[error(
        "On field \"{coordinate}\", for @provides(fields: \"{field_set}\"): field \"{missing_field}\" is not marked @external in subgraph \"{subgraph}\""
    )]
    ProvidesFieldsMissingExternal {
        coordinate: String,
        field_set: String,
        missing_field: String,
        subgraph: String,
    },

    #[error("On field \"{coordinate}\", @provides can only be used on a field whose return type is an entity")]
    ProvidesNotOnEntity { coordinate: String },

    #[error(
        "On field \"{coordinate}\", for @requires(fields: \"{field_set}\"): field \"{missing_field}\" is not marked @external in subgraph \"{subgraph}\""
    )]
    RequiresFieldsMissingExternal {
        coordinate: String,
        field_set: String,
        missing_field: String,
        subgraph: String,
    },

    #[error("Type \"{type_name}\" is a value type (no subgraph declares a @key) but is declared with @key in subgraph \"{subgraph}\"")]
    ValueTypeNoEntity { type_name: Name, subgraph: String },

    #[error("Union \"{type_name}\" has inconsistent member sets across subgraphs")]
    ValueTypeUnionTypesIdentical { type_name: Name },

    #[error("Type \"{type_name}\" is declared with a different kind in subgraph \"{subgraph}\" than in others")]
    ValueTypeKindMismatch { type_name: Name, subgraph: String },

    #[error("Field \"{coordinate}\" has a different type in subgraph \"{subgraph}\" ({found}) than its declared type ({expected})")]
    FieldTypeMismatch {
        coordinate: String,
        subgraph: String,
        found: String,
        expected: String,
    },

    #[error("Field \"{coordinate}\" has a different argument signature in subgraph \"{subgraph}\"")]
    FieldArgumentMismatch { coordinate: String, subgraph: String },

    #[error("Entity type \"{type_name}\" has no owning subgraph: every subgraph declares it with `extend`")]
    NoEntityOwner { type_name: Name },

    #[error("Entity type \"{type_name}\" is declared non-extended (owned) in more than one subgraph: {subgraphs}")]
    MultipleEntityOwners { type_name: Name, subgraphs: String },

    #[error("Field \"{coordinate}\" is not resolvable by any subgraph (composition bug on an already-composed supergraph)")]
    NoResolver { coordinate: String },

    #[error("@requires(fields: \"{field_set}\") on \"{coordinate}\" cannot be satisfied: it is not reachable from any ancestor fetch")]
    UnsatisfiableRequires { coordinate: String, field_set: String },

    #[error("Subscription operations are only supported when every root field resolves in a single subgraph")]
    SubscriptionMultipleSubgraphs,
}

impl SingleFederationError {
    pub fn code(&self) -> ErrorCode {
        use SingleFederationError::*;
        match self {
            Internal { .. } => ErrorCode::Internal,
            InvalidGraphql { .. } => ErrorCode::InvalidGraphql,
            UnsupportedFeature { .. } => ErrorCode::UnsupportedFeature,
            UnknownFederationDirective { .. } => ErrorCode::UnknownFederationDirective,
            KeyOnNonObject { .. } => ErrorCode::KeyOnNonObject,
            KeyFieldsMissingOnBase { .. } => ErrorCode::KeyFieldsMissingOnBase,
            KeyFieldsSelectInvalidType { .. } => ErrorCode::KeyFieldsSelectInvalidType,
            RequiresOnNonEntityField { .. } => ErrorCode::RequiresOnNonEntityField,
            ProvidesOnNonEntityField { .. } => ErrorCode::ProvidesOnNonEntityField,
            ExternalUnused { .. } => ErrorCode::ExternalUnused,
            ExternalTypeMismatch { .. } => ErrorCode::ExternalTypeMismatch,
            ExternalMissingOnBase { .. } => ErrorCode::ExternalMissingOnBase,
            ProvidesFieldsMissingExternal { .. } => ErrorCode::ProvidesFieldsMissingExternal,
            ProvidesNotOnEntity { .. } => ErrorCode::ProvidesNotOnEntity,
            RequiresFieldsMissingExternal { .. } => ErrorCode::RequiresFieldsMissingExternal,
            ValueTypeNoEntity { .. } => ErrorCode::ValueTypeNoEntity,
            ValueTypeUnionTypesIdentical { .. } => ErrorCode::ValueTypeUnionTypesIdentical,
            ValueTypeKindMismatch { .. } => ErrorCode::ValueTypeKindMismatch,
            FieldTypeMismatch { .. } => ErrorCode::FieldTypeMismatch,
            FieldArgumentMismatch { .. } => ErrorCode::FieldArgumentMismatch,
            NoEntityOwner { .. } => ErrorCode::NoEntityOwner,
            MultipleEntityOwners { .. } => ErrorCode::MultipleEntityOwners,
            NoResolver { .. } => ErrorCode::NoResolver,
            UnsatisfiableRequires { .. } => ErrorCode::UnsatisfiableRequires,
            SubscriptionMultipleSubgraphs => ErrorCode::SubscriptionMultipleSubgraphs,
        }
    }

    /// Best-effort source location; most of our errors arise after merging, where a single
    /// subgraph-local location would be misleading, so callers generally report without one.
    pub fn locations(&self) -> Vec<SourceLocation> {
        Vec::new()
    }
}

/// `{ line, column }`, 1-indexed, matching the shape GraphQL error responses use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
}

/// The external error record shape from §6: `{ code, message, locations?, extensions? }`.
#[derive(Debug, Clone, Serialize)]
pub struct GraphQLError {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub locations: Vec<SourceLocation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extensions: Option<serde_json::Value>,
}

impl From<&SingleFederationError> for GraphQLError {
    fn from(err: &SingleFederationError) -> Self {
        GraphQLError {
            code: err.code().to_string(),
            message: err.to_string(),
            locations: err.locations(),
            extensions: None,
        }
    }
}

/// Either one fatal error (ingest or planning) or an aggregate of every composition validation
/// failure found in a single pass. The composer always runs every validation pass and returns
/// the whole list rather than stopping at the first error, per §4.2 and §7.
#[derive(Debug, Clone, thiserror::Error)]
pub enum FederationError {
    #[error("{0}")]
    Single(#[from] SingleFederationError),
    #[error("composition failed with {} error(s)", .0.len())]
    Aggregate(Vec<SingleFederationError>),
}

impl FederationError {
    pub fn internal(message: impl Into<String>) -> Self {
        SingleFederationError::Internal {
            message: message.into(),
        }
        .into()
    }

    pub fn aggregate(errors: Vec<SingleFederationError>) -> Self {
        match <[SingleFederationError; 1]>::try_from(errors) {
            Ok([single]) => FederationError::Single(single),
            Err(errors) => FederationError::Aggregate(errors),
        }
    }

    /// Flattens to the external error-record shape from §6.
    pub fn into_graphql_errors(self) -> Vec<GraphQLError> {
        match self {
            FederationError::Single(err) => vec![GraphQLError::from(&err)],
            FederationError::Aggregate(errors) => errors.iter().map(GraphQLError::from).collect(),
        }
    }

    pub fn errors(&self) -> Vec<&SingleFederationError> {
        match self {
            FederationError::Single(err) => vec![err],
            FederationError::Aggregate(errors) => errors.iter().collect(),
        }
    }
}

/// Formats an apollo-compiler validation failure (`WithErrors<T>`/`DiagnosticList`-shaped
/// `Display`) into a single [`SingleFederationError::InvalidGraphql`], mirroring how
/// `apollo-federation` re-wraps apollo-compiler's own diagnostics rather than re-deriving them.
pub(crate) fn invalid_graphql(err: impl std::fmt::Display) -> FederationError {
    SingleFederationError::InvalidGraphql {
        message: err.to_string(),
    }
    .into()
}
