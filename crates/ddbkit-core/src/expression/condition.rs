//! Condition and key-condition values and their fluent builders.

use std::fmt;

use ddbkit_model::AttributeValue;

use super::{Aliases, ExpressionError};

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Comparator {
    /// `=`
    Equal,
    /// `<>`
    NotEqual,
    /// `<`
    LessThan,
    /// `<=`
    LessThanEqual,
    /// `>`
    GreaterThan,
    /// `>=`
    GreaterThanEqual,
}

impl Comparator {
    /// The operator symbol.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Equal => "=",
            Self::NotEqual => "<>",
            Self::LessThan => "<",
            Self::LessThanEqual => "<=",
            Self::GreaterThan => ">",
            Self::GreaterThanEqual => ">=",
        }
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Filter / condition expressions
// ---------------------------------------------------------------------------

/// A filter or condition expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// `name op value`
    Compare {
        /// Attribute name.
        name: String,
        /// Operator.
        op: Comparator,
        /// Right-hand value.
        value: AttributeValue,
    },
    /// `name BETWEEN low AND high`, inclusive.
    Between {
        /// Attribute name.
        name: String,
        /// Lower bound.
        low: AttributeValue,
        /// Upper bound.
        high: AttributeValue,
    },
    /// `begins_with(name, prefix)`
    BeginsWith {
        /// Attribute name.
        name: String,
        /// Prefix.
        prefix: AttributeValue,
    },
    /// `contains(name, operand)`: substring or set membership.
    Contains {
        /// Attribute name.
        name: String,
        /// Substring or member.
        operand: AttributeValue,
    },
    /// `attribute_exists(name)`
    AttributeExists(String),
    /// `attribute_not_exists(name)`
    AttributeNotExists(String),
    /// All operands hold.
    And(Vec<Condition>),
    /// At least one operand holds.
    Or(Vec<Condition>),
    /// The operand does not hold.
    Not(Box<Condition>),
}

impl Condition {
    /// Conjoin with `other`. Chained calls produce one flat `And`.
    #[must_use]
    pub fn and(self, other: Condition) -> Self {
        match self {
            Self::And(mut operands) => {
                operands.push(other);
                Self::And(operands)
            }
            first => Self::And(vec![first, other]),
        }
    }

    /// Disjoin with `other`. Chained calls produce one flat `Or`.
    #[must_use]
    pub fn or(self, other: Condition) -> Self {
        match self {
            Self::Or(mut operands) => {
                operands.push(other);
                Self::Or(operands)
            }
            first => Self::Or(vec![first, other]),
        }
    }

    /// Negate.
    #[must_use]
    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Self {
        Self::Not(Box::new(self))
    }

    pub(crate) fn render(&self, aliases: &mut Aliases) -> Result<String, ExpressionError> {
        Ok(match self {
            Self::Compare { name, op, value } => {
                let n = aliases.name(name)?;
                format!("{n} {op} {}", aliases.value(value))
            }
            Self::Between { name, low, high } => {
                let n = aliases.name(name)?;
                let lo = aliases.value(low);
                format!("{n} BETWEEN {lo} AND {}", aliases.value(high))
            }
            Self::BeginsWith { name, prefix } => {
                let n = aliases.name(name)?;
                format!("begins_with({n}, {})", aliases.value(prefix))
            }
            Self::Contains { name, operand } => {
                let n = aliases.name(name)?;
                format!("contains({n}, {})", aliases.value(operand))
            }
            Self::AttributeExists(name) => format!("attribute_exists({})", aliases.name(name)?),
            Self::AttributeNotExists(name) => {
                format!("attribute_not_exists({})", aliases.name(name)?)
            }
            Self::And(operands) => render_joined(operands, "AND", aliases, Self::render)?,
            Self::Or(operands) => render_joined(operands, "OR", aliases, Self::render)?,
            Self::Not(inner) => format!("NOT ({})", inner.render(aliases)?),
        })
    }
}

/// Start a condition on attribute `name`.
pub fn name(name: impl Into<String>) -> NameBuilder {
    NameBuilder { name: name.into() }
}

/// Fluent builder for a [`Condition`] on one attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameBuilder {
    name: String,
}

impl NameBuilder {
    fn compare(self, op: Comparator, value: impl Into<AttributeValue>) -> Condition {
        Condition::Compare {
            name: self.name,
            op,
            value: value.into(),
        }
    }

    /// `name = value`
    #[must_use]
    pub fn equal(self, value: impl Into<AttributeValue>) -> Condition {
        self.compare(Comparator::Equal, value)
    }

    /// `name <> value`
    #[must_use]
    pub fn not_equal(self, value: impl Into<AttributeValue>) -> Condition {
        self.compare(Comparator::NotEqual, value)
    }

    /// `name < value`
    #[must_use]
    pub fn less_than(self, value: impl Into<AttributeValue>) -> Condition {
        self.compare(Comparator::LessThan, value)
    }

    /// `name <= value`
    #[must_use]
    pub fn less_than_equal(self, value: impl Into<AttributeValue>) -> Condition {
        self.compare(Comparator::LessThanEqual, value)
    }

    /// `name > value`
    #[must_use]
    pub fn greater_than(self, value: impl Into<AttributeValue>) -> Condition {
        self.compare(Comparator::GreaterThan, value)
    }

    /// `name >= value`
    #[must_use]
    pub fn greater_than_equal(self, value: impl Into<AttributeValue>) -> Condition {
        self.compare(Comparator::GreaterThanEqual, value)
    }

    /// `name BETWEEN low AND high`
    #[must_use]
    pub fn between(
        self,
        low: impl Into<AttributeValue>,
        high: impl Into<AttributeValue>,
    ) -> Condition {
        Condition::Between {
            name: self.name,
            low: low.into(),
            high: high.into(),
        }
    }

    /// `begins_with(name, prefix)`
    #[must_use]
    pub fn begins_with(self, prefix: impl Into<String>) -> Condition {
        Condition::BeginsWith {
            name: self.name,
            prefix: AttributeValue::S(prefix.into()),
        }
    }

    /// `contains(name, operand)`
    #[must_use]
    pub fn contains(self, operand: impl Into<AttributeValue>) -> Condition {
        Condition::Contains {
            name: self.name,
            operand: operand.into(),
        }
    }

    /// `attribute_exists(name)`
    #[must_use]
    pub fn attribute_exists(self) -> Condition {
        Condition::AttributeExists(self.name)
    }

    /// `attribute_not_exists(name)`
    #[must_use]
    pub fn attribute_not_exists(self) -> Condition {
        Condition::AttributeNotExists(self.name)
    }
}

// ---------------------------------------------------------------------------
// Key conditions
// ---------------------------------------------------------------------------

/// A key condition: equality on the partition key, optionally conjoined with
/// one sort key condition. The store enforces that shape.
#[derive(Debug, Clone, PartialEq)]
pub enum KeyCondition {
    /// `name op value`
    Compare {
        /// Key attribute name.
        name: String,
        /// Operator; never `<>`.
        op: Comparator,
        /// Right-hand value.
        value: AttributeValue,
    },
    /// `name BETWEEN low AND high`
    Between {
        /// Key attribute name.
        name: String,
        /// Lower bound.
        low: AttributeValue,
        /// Upper bound.
        high: AttributeValue,
    },
    /// `begins_with(name, prefix)`
    BeginsWith {
        /// Key attribute name.
        name: String,
        /// Prefix.
        prefix: AttributeValue,
    },
    /// All operands hold.
    And(Vec<KeyCondition>),
}

impl KeyCondition {
    /// Conjoin with `other`. Chained calls produce one flat `And`.
    #[must_use]
    pub fn and(self, other: KeyCondition) -> Self {
        match self {
            Self::And(mut operands) => {
                operands.push(other);
                Self::And(operands)
            }
            first => Self::And(vec![first, other]),
        }
    }

    pub(crate) fn render(&self, aliases: &mut Aliases) -> Result<String, ExpressionError> {
        Ok(match self {
            Self::Compare { name, op, value } => {
                let n = aliases.name(name)?;
                format!("{n} {op} {}", aliases.value(value))
            }
            Self::Between { name, low, high } => {
                let n = aliases.name(name)?;
                let lo = aliases.value(low);
                format!("{n} BETWEEN {lo} AND {}", aliases.value(high))
            }
            Self::BeginsWith { name, prefix } => {
                let n = aliases.name(name)?;
                format!("begins_with({n}, {})", aliases.value(prefix))
            }
            Self::And(operands) => render_joined(operands, "AND", aliases, Self::render)?,
        })
    }
}

/// Start a key condition on key attribute `name`.
pub fn key(name: impl Into<String>) -> KeyBuilder {
    KeyBuilder { name: name.into() }
}

/// Fluent builder for a [`KeyCondition`] on one key attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyBuilder {
    name: String,
}

impl KeyBuilder {
    fn compare(self, op: Comparator, value: impl Into<AttributeValue>) -> KeyCondition {
        KeyCondition::Compare {
            name: self.name,
            op,
            value: value.into(),
        }
    }

    /// `key = value`
    #[must_use]
    pub fn equal(self, value: impl Into<AttributeValue>) -> KeyCondition {
        self.compare(Comparator::Equal, value)
    }

    /// `key < value`
    #[must_use]
    pub fn less_than(self, value: impl Into<AttributeValue>) -> KeyCondition {
        self.compare(Comparator::LessThan, value)
    }

    /// `key <= value`
    #[must_use]
    pub fn less_than_equal(self, value: impl Into<AttributeValue>) -> KeyCondition {
        self.compare(Comparator::LessThanEqual, value)
    }

    /// `key > value`
    #[must_use]
    pub fn greater_than(self, value: impl Into<AttributeValue>) -> KeyCondition {
        self.compare(Comparator::GreaterThan, value)
    }

    /// `key >= value`
    #[must_use]
    pub fn greater_than_equal(self, value: impl Into<AttributeValue>) -> KeyCondition {
        self.compare(Comparator::GreaterThanEqual, value)
    }

    /// `key BETWEEN low AND high`
    #[must_use]
    pub fn between(
        self,
        low: impl Into<AttributeValue>,
        high: impl Into<AttributeValue>,
    ) -> KeyCondition {
        KeyCondition::Between {
            name: self.name,
            low: low.into(),
            high: high.into(),
        }
    }

    /// `begins_with(key, prefix)`
    #[must_use]
    pub fn begins_with(self, prefix: impl Into<String>) -> KeyCondition {
        KeyCondition::BeginsWith {
            name: self.name,
            prefix: AttributeValue::S(prefix.into()),
        }
    }
}

/// Render `operands` joined by `keyword`, each wrapped in parentheses. A
/// single operand renders bare.
fn render_joined<T>(
    operands: &[T],
    keyword: &'static str,
    aliases: &mut Aliases,
    render: fn(&T, &mut Aliases) -> Result<String, ExpressionError>,
) -> Result<String, ExpressionError> {
    match operands {
        [] => Err(ExpressionError::EmptyOperands(keyword)),
        [only] => render(only, aliases),
        many => {
            let parts = many
                .iter()
                .map(|op| render(op, aliases).map(|s| format!("({s})")))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(parts.join(&format!(" {keyword} ")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render_condition(c: &Condition) -> (String, Aliases) {
        let mut aliases = Aliases::default();
        let s = c.render(&mut aliases).unwrap();
        (s, aliases)
    }

    #[test]
    fn test_should_render_comparisons() {
        let (s, _) = render_condition(&name("Age").greater_than_equal(18));
        assert_eq!(s, "#n0 >= :v0");
        let (s, _) = render_condition(&name("Age").between(1, 9));
        assert_eq!(s, "#n0 BETWEEN :v0 AND :v1");
    }

    #[test]
    fn test_should_render_functions() {
        let (s, aliases) = render_condition(&name("Title").begins_with("Re:"));
        assert_eq!(s, "begins_with(#n0, :v0)");
        assert_eq!(aliases.values.get(":v0"), Some(&AttributeValue::S("Re:".to_owned())));

        let (s, _) = render_condition(&name("Tags").contains("x"));
        assert_eq!(s, "contains(#n0, :v0)");

        let (s, _) = render_condition(&name("Deleted").attribute_not_exists());
        assert_eq!(s, "attribute_not_exists(#n0)");
    }

    #[test]
    fn test_should_flatten_chained_conjunctions() {
        let c = name("A")
            .equal(1)
            .and(name("B").equal(2))
            .and(name("C").equal(3));
        assert!(matches!(&c, Condition::And(ops) if ops.len() == 3));
        let (s, _) = render_condition(&c);
        assert_eq!(s, "(#n0 = :v0) AND (#n1 = :v1) AND (#n2 = :v2)");
    }

    #[test]
    fn test_should_nest_or_and_not() {
        let c = name("A")
            .equal(1)
            .or(name("A").equal(2))
            .and(name("B").attribute_exists().not());
        let (s, aliases) = render_condition(&c);
        assert_eq!(
            s,
            "((#n0 = :v0) OR (#n0 = :v1)) AND (NOT (attribute_exists(#n1)))"
        );
        assert_eq!(aliases.names.len(), 2);
    }

    #[test]
    fn test_should_reject_empty_conjunction() {
        let mut aliases = Aliases::default();
        let err = Condition::And(Vec::new()).render(&mut aliases).unwrap_err();
        assert_eq!(err, ExpressionError::EmptyOperands("AND"));
    }

    #[test]
    fn test_should_render_key_range_condition() {
        let c = key("Group").equal("g").and(key("Seq").between(10, 20));
        let mut aliases = Aliases::default();
        assert_eq!(
            c.render(&mut aliases).unwrap(),
            "(#n0 = :v0) AND (#n1 BETWEEN :v1 AND :v2)"
        );

        let c = key("Group").equal("g").and(key("Slug").begins_with("ab"));
        let mut aliases = Aliases::default();
        assert_eq!(
            c.render(&mut aliases).unwrap(),
            "(#n0 = :v0) AND (begins_with(#n1, :v1))"
        );
    }
}
