//! A `FieldSet` is a parsed selection set with no root operation type, used as the argument of
//! `@key`, `@requires`, and `@provides` (§3, §9). Per the design notes, we don't write a bespoke
//! parser for this: we reuse `apollo-compiler`'s own selection-set parser
//! (`apollo_compiler::executable::FieldSet::parse_and_validate`), the same way the operation
//! parser is reused for client operations, and convert the result into an owned representation
//! that's easy to store in join metadata and compare for equality.

use std::fmt;

use apollo_compiler::executable::FieldSet as CompilerFieldSet;
use apollo_compiler::executable::Selection as CompilerSelection;
use apollo_compiler::validation::Valid;
use apollo_compiler::Name;
use apollo_compiler::Schema;

use crate::error::invalid_graphql;
use crate::error::FederationError;

/// One selection inside a [`FieldSet`]: either a plain field (optionally with a nested
/// sub-selection) or an inline fragment narrowing to a concrete type (used when the fieldset's
/// parent type is an interface or union).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldSetSelection {
    Field {
        name: Name,
        selection: Option<FieldSet>,
    },
    InlineFragment {
        type_condition: Name,
        selection: FieldSet,
    },
}

/// A parsed selection set, e.g. the value of `@key(fields: "upc")` or
/// `@key(fields: "organization { id }")`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct FieldSet {
    pub selections: Vec<FieldSetSelection>,
}

impl fmt::Display for FieldSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{ ")?;
        for selection in &self.selections {
            match selection {
                FieldSetSelection::Field { name, selection } => {
                    write!(f, "{name}")?;
                    if let Some(selection) = selection {
                        write!(f, " {selection}")?;
                    }
                }
                FieldSetSelection::InlineFragment {
                    type_condition,
                    selection,
                } => {
                    write!(f, "... on {type_condition} {selection}")?;
                }
            }
            write!(f, " ")?;
        }
        write!(f, "}}")
    }
}

impl FieldSet {
    /// The top-level field names this field set selects directly (ignoring any nested
    /// sub-selections and inline fragments' own top-level fields, which are flattened in too,
    /// since a `@key` on an interface/union may need to look through a type condition).
    pub fn top_level_field_names(&self) -> Vec<&Name> {
        let mut names = Vec::new();
        for selection in &self.selections {
            match selection {
                FieldSetSelection::Field { name, .. } => names.push(name),
                FieldSetSelection::InlineFragment { selection, .. } => {
                    names.extend(selection.top_level_field_names());
                }
            }
        }
        names
    }

    /// Every field name reachable anywhere in this field set (used to check a key's fields are
    /// each marked `@external`/defined, per §4.1/§4.2).
    pub fn all_field_names(&self) -> Vec<&Name> {
        let mut names = Vec::new();
        for selection in &self.selections {
            match selection {
                FieldSetSelection::Field { name, selection } => {
                    names.push(name);
                    if let Some(selection) = selection {
                        names.extend(selection.all_field_names());
                    }
                }
                FieldSetSelection::InlineFragment { selection, .. } => {
                    names.extend(selection.all_field_names());
                }
            }
        }
        names
    }

    /// Renders this field set's selections without the outer braces `Display` wraps them in,
    /// e.g. `upc` or `organization { id }` — the shape a `fields:` argument or a `_entities`
    /// representation selection expects.
    pub fn selection_text(&self) -> String {
        let rendered = self.to_string();
        rendered
            .strip_prefix("{ ")
            .and_then(|s| s.strip_suffix(" }"))
            .unwrap_or(&rendered)
            .to_string()
    }

    fn from_compiler(selection_set: &apollo_compiler::executable::SelectionSet) -> Result<Self, FederationError> {
        let mut selections = Vec::with_capacity(selection_set.selections.len());
        for selection in &selection_set.selections {
            match selection {
                CompilerSelection::Field(field) => {
                    let nested = if field.selection_set.selections.is_empty() {
                        None
                    } else {
                        Some(Self::from_compiler(&field.selection_set)?)
                    };
                    selections.push(FieldSetSelection::Field {
                        name: field.name.clone(),
                        selection: nested,
                    });
                }
                CompilerSelection::InlineFragment(inline) => {
                    let Some(type_condition) = &inline.type_condition else {
                        return Err(FederationError::internal(
                            "field set selection used an inline fragment with no type condition",
                        ));
                    };
                    selections.push(FieldSetSelection::InlineFragment {
                        type_condition: type_condition.clone(),
                        selection: Self::from_compiler(&inline.selection_set)?,
                    });
                }
                CompilerSelection::FragmentSpread(_) => {
                    return Err(FederationError::internal(
                        "field set selection unexpectedly contained a named fragment spread",
                    ));
                }
            }
        }
        Ok(FieldSet { selections })
    }
}

/// Parses a `fields:` argument string (e.g. `"upc"`, `"organization { id }"`) against
/// `parent_type_name` in `schema`, reusing `apollo-compiler`'s selection-set parser.
pub fn parse_field_set(
    schema: &Valid<Schema>,
    parent_type_name: Name,
    value: &str,
) -> Result<FieldSet, FederationError> {
    let field_set = CompilerFieldSet::parse_and_validate(schema, parent_type_name, value, "field_set.graphql")
        .map_err(invalid_graphql)?;
    FieldSet::from_compiler(&field_set.selection_set)
}
