//! Expression building.
//!
//! Conditions, key conditions, projections and updates are described as
//! values and rendered into DynamoDB expression strings together with their
//! placeholder maps. Rendering walks the parts in a fixed order (key
//! condition, filter, projection, update) so the same input always yields the
//! same strings:
//!
//! - every distinct attribute name gets one `#nK` alias, shared by all parts;
//! - every value gets its own `:vK` alias.
//!
//! Two ways in:
//!
//! - the fluent path: [`key`] / [`name`] builders combined with `and`, `or`
//!   and `not`, handed to an [`ExpressionBuilder`];
//! - the map path: [`key_condition_from`] / [`filter_from`] turn an ordered
//!   map of attribute values into an AND of equalities.

mod condition;
mod simple;
mod update;

use std::collections::HashMap;

use ddbkit_model::AttributeValue;
use ddbkit_model::types::{ExpressionAttributeNames, ExpressionAttributeValues};

pub use condition::{Comparator, Condition, KeyBuilder, KeyCondition, NameBuilder, key, name};
pub use simple::{filter_from, key_condition_from};
pub use update::UpdateBuilder;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors produced while rendering an expression.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExpressionError {
    /// Nothing was added to the builder.
    #[error("expression builder is empty")]
    Unset,
    /// An update builder without actions.
    #[error("update expression has no actions")]
    EmptyUpdate,
    /// A projection without attribute names.
    #[error("projection has no attribute names")]
    EmptyProjection,
    /// An `AND`/`OR` with nothing to combine.
    #[error("{0} needs at least one operand")]
    EmptyOperands(&'static str),
    /// An attribute name that is the empty string.
    #[error("attribute name must not be empty")]
    EmptyName,
}

// ---------------------------------------------------------------------------
// Placeholder allocation
// ---------------------------------------------------------------------------

/// Placeholder maps shared by all parts of one expression.
#[derive(Debug, Default)]
pub(crate) struct Aliases {
    names: ExpressionAttributeNames,
    by_name: HashMap<String, String>,
    values: ExpressionAttributeValues,
}

impl Aliases {
    /// Alias for an attribute name, reusing the existing one if any.
    pub(crate) fn name(&mut self, name: &str) -> Result<String, ExpressionError> {
        if name.is_empty() {
            return Err(ExpressionError::EmptyName);
        }
        if let Some(alias) = self.by_name.get(name) {
            return Ok(alias.clone());
        }
        let alias = format!("#n{}", self.by_name.len());
        self.by_name.insert(name.to_owned(), alias.clone());
        self.names.insert(alias.clone(), name.to_owned());
        Ok(alias)
    }

    /// Fresh alias for a value.
    pub(crate) fn value(&mut self, value: &AttributeValue) -> String {
        let alias = format!(":v{}", self.values.len());
        self.values.insert(alias.clone(), value.clone());
        alias
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Collects the parts of one request's expressions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExpressionBuilder {
    key_condition: Option<KeyCondition>,
    filter: Option<Condition>,
    projection: Option<Vec<String>>,
    update: Option<UpdateBuilder>,
}

impl ExpressionBuilder {
    /// An empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the key condition.
    #[must_use]
    pub fn with_key_condition(mut self, condition: KeyCondition) -> Self {
        self.key_condition = Some(condition);
        self
    }

    /// Set the filter condition.
    #[must_use]
    pub fn with_filter(mut self, condition: Condition) -> Self {
        self.filter = Some(condition);
        self
    }

    /// Set the projected attribute names.
    #[must_use]
    pub fn with_projection<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.projection = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// Set the update actions.
    #[must_use]
    pub fn with_update(mut self, update: UpdateBuilder) -> Self {
        self.update = Some(update);
        self
    }

    /// Render all parts into one [`Expression`].
    pub fn build(self) -> Result<Expression, ExpressionError> {
        if self.key_condition.is_none()
            && self.filter.is_none()
            && self.projection.is_none()
            && self.update.is_none()
        {
            return Err(ExpressionError::Unset);
        }

        let mut aliases = Aliases::default();
        let key_condition = self
            .key_condition
            .map(|c| c.render(&mut aliases))
            .transpose()?;
        let filter = self.filter.map(|c| c.render(&mut aliases)).transpose()?;
        let projection = self
            .projection
            .map(|names| render_projection(&names, &mut aliases))
            .transpose()?;
        let update = self.update.map(|u| u.render(&mut aliases)).transpose()?;

        Ok(Expression {
            key_condition,
            filter,
            projection,
            update,
            names: aliases.names,
            values: aliases.values,
        })
    }
}

fn render_projection(names: &[String], aliases: &mut Aliases) -> Result<String, ExpressionError> {
    if names.is_empty() {
        return Err(ExpressionError::EmptyProjection);
    }
    let parts = names
        .iter()
        .map(|n| aliases.name(n))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(parts.join(", "))
}

// ---------------------------------------------------------------------------
// Rendered expression
// ---------------------------------------------------------------------------

/// Rendered expression strings plus the placeholder maps they reference.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Expression {
    key_condition: Option<String>,
    filter: Option<String>,
    projection: Option<String>,
    update: Option<String>,
    names: ExpressionAttributeNames,
    values: ExpressionAttributeValues,
}

impl Expression {
    /// The key condition expression.
    #[must_use]
    pub fn key_condition(&self) -> Option<&str> {
        self.key_condition.as_deref()
    }

    /// The filter expression.
    #[must_use]
    pub fn filter(&self) -> Option<&str> {
        self.filter.as_deref()
    }

    /// The projection expression.
    #[must_use]
    pub fn projection(&self) -> Option<&str> {
        self.projection.as_deref()
    }

    /// The update expression.
    #[must_use]
    pub fn update(&self) -> Option<&str> {
        self.update.as_deref()
    }

    /// `#alias` to attribute name.
    #[must_use]
    pub fn names(&self) -> &ExpressionAttributeNames {
        &self.names
    }

    /// `:alias` to value.
    #[must_use]
    pub fn values(&self) -> &ExpressionAttributeValues {
        &self.values
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_reject_empty_builder() {
        assert_eq!(ExpressionBuilder::new().build(), Err(ExpressionError::Unset));
    }

    #[test]
    fn test_should_share_name_aliases_across_parts() {
        let expr = ExpressionBuilder::new()
            .with_key_condition(key("Group").equal("g1"))
            .with_filter(name("Group").not_equal("g2"))
            .with_projection(["Group", "ID"])
            .build()
            .unwrap();

        assert_eq!(expr.key_condition(), Some("#n0 = :v0"));
        assert_eq!(expr.filter(), Some("#n0 <> :v1"));
        assert_eq!(expr.projection(), Some("#n0, #n1"));
        assert_eq!(expr.update(), None);
        assert_eq!(expr.names().len(), 2);
        assert_eq!(expr.names().get("#n1").map(String::as_str), Some("ID"));
        assert_eq!(expr.values().len(), 2);
    }

    #[test]
    fn test_should_reject_empty_projection() {
        let err = ExpressionBuilder::new()
            .with_projection(Vec::<String>::new())
            .build()
            .unwrap_err();
        assert_eq!(err, ExpressionError::EmptyProjection);
    }

    #[test]
    fn test_should_reject_empty_attribute_name() {
        let err = ExpressionBuilder::new()
            .with_filter(name("").equal(1))
            .build()
            .unwrap_err();
        assert_eq!(err, ExpressionError::EmptyName);
    }

    #[test]
    fn test_should_render_update_after_conditions() {
        let expr = ExpressionBuilder::new()
            .with_update(UpdateBuilder::new().set("Name", "x").add("Count", 1))
            .build()
            .unwrap();
        assert_eq!(expr.update(), Some("SET #n0 = :v0 ADD #n1 :v1"));
        assert_eq!(expr.values().get(":v1"), Some(&AttributeValue::N("1".to_owned())));
    }
}
