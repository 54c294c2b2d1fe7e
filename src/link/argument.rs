//! Small helpers for pulling typed argument values out of a directive application, grounded on
//! the same pattern `apollo-federation`'s `link::argument` module uses: each directive argument
//! kind gets an `_optional_` accessor and a `_required_` accessor that turns a missing required
//! argument into an [`FederationError::internal`] (the GraphQL validator is assumed to have
//! already rejected a genuinely malformed directive application before this code ever runs).

use apollo_compiler::ast::Value;
use apollo_compiler::schema::Directive;
use apollo_compiler::Node;

use crate::error::FederationError;

pub(crate) fn directive_optional_string_argument(
    application: &Node<Directive>,
    name: &str,
) -> Result<Option<String>, FederationError> {
    match application.arguments.iter().find(|a| a.name == name) {
        Some(a) => match &*a.value {
            Value::String(s) => Ok(Some(s.as_str().to_string())),
            Value::Null => Ok(None),
            _ => Err(FederationError::internal(format!(
                "Argument \"{name}\" of directive \"@{}\" must be a string.",
                application.name
            ))),
        },
        None => Ok(None),
    }
}

pub(crate) fn directive_required_string_argument(
    application: &Node<Directive>,
    name: &str,
) -> Result<String, FederationError> {
    directive_optional_string_argument(application, name)?.ok_or_else(|| {
        FederationError::internal(format!(
            "Required argument \"{name}\" of directive \"@{}\" was not present.",
            application.name
        ))
    })
}

/// `fields:` arguments of `@key`/`@requires`/`@provides` are always strings containing a
/// (possibly brace-less) selection set; parsing that selection happens one layer up, in
/// `schema::field_set`, which is the single place that should invoke the selection-set parser
/// (§9 design notes: reuse the operation parser, don't write a bespoke one).
pub(crate) fn directive_fields_argument(
    application: &Node<Directive>,
    name: &str,
) -> Result<String, FederationError> {
    directive_required_string_argument(application, name)
}
