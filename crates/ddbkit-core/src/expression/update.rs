//! Update expression composition.

use ddbkit_model::AttributeValue;

use super::{Aliases, ExpressionError};

#[derive(Debug, Clone, PartialEq)]
enum Action {
    Set(String, AttributeValue),
    Remove(String),
    Add(String, AttributeValue),
    Delete(String, AttributeValue),
}

/// Accumulates update actions.
///
/// Rendering groups actions by verb in the order `SET`, `REMOVE`, `ADD`,
/// `DELETE`; within a verb, actions keep the order they were added in.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateBuilder {
    actions: Vec<Action>,
}

impl UpdateBuilder {
    /// An update with no actions.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// `SET name = value`
    #[must_use]
    pub fn set(mut self, name: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.actions.push(Action::Set(name.into(), value.into()));
        self
    }

    /// `REMOVE name`
    #[must_use]
    pub fn remove(mut self, name: impl Into<String>) -> Self {
        self.actions.push(Action::Remove(name.into()));
        self
    }

    /// `ADD name value`: numeric increment, or set union.
    #[must_use]
    pub fn add(mut self, name: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.actions.push(Action::Add(name.into(), value.into()));
        self
    }

    /// `DELETE name value`: set difference.
    #[must_use]
    pub fn delete(mut self, name: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.actions.push(Action::Delete(name.into(), value.into()));
        self
    }

    /// Returns `true` if no action was added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub(crate) fn render(&self, aliases: &mut Aliases) -> Result<String, ExpressionError> {
        if self.actions.is_empty() {
            return Err(ExpressionError::EmptyUpdate);
        }

        let mut set = Vec::new();
        let mut remove = Vec::new();
        let mut add = Vec::new();
        let mut delete = Vec::new();
        for action in &self.actions {
            match action {
                Action::Set(name, value) => {
                    let n = aliases.name(name)?;
                    set.push(format!("{n} = {}", aliases.value(value)));
                }
                Action::Remove(name) => remove.push(aliases.name(name)?),
                Action::Add(name, value) => {
                    let n = aliases.name(name)?;
                    add.push(format!("{n} {}", aliases.value(value)));
                }
                Action::Delete(name, value) => {
                    let n = aliases.name(name)?;
                    delete.push(format!("{n} {}", aliases.value(value)));
                }
            }
        }

        let clauses: Vec<String> = [
            ("SET", set),
            ("REMOVE", remove),
            ("ADD", add),
            ("DELETE", delete),
        ]
        .into_iter()
        .filter(|(_, parts)| !parts.is_empty())
        .map(|(verb, parts)| format!("{verb} {}", parts.join(", ")))
        .collect();
        Ok(clauses.join(" "))
    }
}
