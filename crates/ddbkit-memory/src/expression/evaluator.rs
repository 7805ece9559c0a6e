//! Expression evaluation against a single item.

use std::collections::HashMap;

use ddbkit_model::{AttributeValue, Item};

use super::ast::{CompareOp, Expr, FunctionName, LogicalOp, Operand, UpdateExpr};
use super::parser::ExpressionError;

/// Binds an item to a request's name and value placeholder maps.
#[derive(Debug)]
pub struct EvalContext<'a> {
    /// The item being evaluated.
    pub item: &'a Item,
    /// `#name` to attribute name.
    pub names: &'a HashMap<String, String>,
    /// `:value` to attribute value.
    pub values: &'a HashMap<String, AttributeValue>,
}

// ---------------------------------------------------------------------------
// Conditions
// ---------------------------------------------------------------------------

impl EvalContext<'_> {
    /// Evaluate a condition to a boolean.
    pub fn evaluate(&self, expr: &Expr) -> Result<bool, ExpressionError> {
        match expr {
            Expr::Compare { left, op, right } => {
                let (Some(l), Some(r)) = (self.resolve_operand(left)?, self.resolve_operand(right)?)
                else {
                    return Ok(false);
                };
                compare_values(&l, &r, *op)
            }
            Expr::Between { value, low, high } => {
                let (Some(v), Some(lo), Some(hi)) = (
                    self.resolve_operand(value)?,
                    self.resolve_operand(low)?,
                    self.resolve_operand(high)?,
                ) else {
                    return Ok(false);
                };
                Ok(compare_values(&v, &lo, CompareOp::Ge)?
                    && compare_values(&v, &hi, CompareOp::Le)?)
            }
            Expr::Logical { op, left, right } => match op {
                LogicalOp::And => Ok(self.evaluate(left)? && self.evaluate(right)?),
                LogicalOp::Or => Ok(self.evaluate(left)? || self.evaluate(right)?),
            },
            Expr::Not(inner) => self.evaluate(inner).map(|v| !v),
            Expr::Function { name, args } => self.eval_function(*name, args),
        }
    }

    fn eval_function(&self, name: FunctionName, args: &[Operand]) -> Result<bool, ExpressionError> {
        let attr = match args.first() {
            Some(Operand::Name(n)) => self.item.get(&self.resolve_name(n)?),
            _ => {
                return Err(ExpressionError::InvalidOperand {
                    operation: name.to_string(),
                    message: "first argument must be an attribute name".to_owned(),
                });
            }
        };

        match name {
            FunctionName::AttributeExists => Ok(attr.is_some()),
            FunctionName::AttributeNotExists => Ok(attr.is_none()),
            FunctionName::BeginsWith => {
                let prefix = self.second_argument(name, args)?;
                match (attr, prefix) {
                    (Some(AttributeValue::S(s)), AttributeValue::S(p)) => Ok(s.starts_with(&p)),
                    (Some(AttributeValue::B(b)), AttributeValue::B(p)) => Ok(b.starts_with(&p)),
                    (_, AttributeValue::S(_) | AttributeValue::B(_)) => Ok(false),
                    _ => Err(ExpressionError::TypeMismatch {
                        message: "begins_with prefix must be a string or binary".to_owned(),
                    }),
                }
            }
            FunctionName::Contains => {
                let search = self.second_argument(name, args)?;
                let Some(attr) = attr else {
                    return Ok(false);
                };
                Ok(match (attr, &search) {
                    (AttributeValue::S(s), AttributeValue::S(sub)) => s.contains(sub.as_str()),
                    (AttributeValue::Ss(set), AttributeValue::S(v))
                    | (AttributeValue::Ns(set), AttributeValue::N(v)) => set.contains(v),
                    (AttributeValue::Bs(set), AttributeValue::B(v)) => set.contains(v),
                    (AttributeValue::L(list), _) => list.contains(&search),
                    _ => false,
                })
            }
        }
    }

    fn second_argument(
        &self,
        name: FunctionName,
        args: &[Operand],
    ) -> Result<AttributeValue, ExpressionError> {
        let operand = args.get(1).ok_or_else(|| ExpressionError::InvalidOperand {
            operation: name.to_string(),
            message: "missing second argument".to_owned(),
        })?;
        self.resolve_operand(operand)?
            .ok_or_else(|| ExpressionError::InvalidOperand {
                operation: name.to_string(),
                message: "second argument resolved to nothing".to_owned(),
            })
    }
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

impl EvalContext<'_> {
    /// Resolve an operand; attribute references to missing attributes give
    /// `None`.
    pub fn resolve_operand(
        &self,
        operand: &Operand,
    ) -> Result<Option<AttributeValue>, ExpressionError> {
        match operand {
            Operand::Name(name) => Ok(self.item.get(&self.resolve_name(name)?).cloned()),
            Operand::Value(name) => self
                .values
                .get(name)
                .cloned()
                .map(Some)
                .ok_or_else(|| ExpressionError::UnresolvedValue { name: name.clone() }),
        }
    }

    /// Resolve a `#placeholder` through the name map; literal names pass
    /// through.
    pub fn resolve_name(&self, name: &str) -> Result<String, ExpressionError> {
        resolve_name(name, self.names)
    }
}

/// Resolve a `#placeholder` through `names`; literal names pass through.
#[allow(clippy::implicit_hasher)]
pub fn resolve_name(
    name: &str,
    names: &HashMap<String, String>,
) -> Result<String, ExpressionError> {
    if name.starts_with('#') {
        names
            .get(name)
            .cloned()
            .ok_or_else(|| ExpressionError::UnresolvedName {
                name: name.to_owned(),
            })
    } else {
        Ok(name.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Updates
// ---------------------------------------------------------------------------

impl EvalContext<'_> {
    /// Apply an update to a copy of the item. Clauses run in the order SET,
    /// REMOVE, ADD, DELETE.
    pub fn apply_update(&self, update: &UpdateExpr) -> Result<Item, ExpressionError> {
        let mut result = self.item.clone();

        for (name, operand) in &update.set_actions {
            let value = self.required(operand, "SET")?;
            result.insert(self.resolve_name(name)?, value);
        }
        for name in &update.remove_names {
            result.remove(&self.resolve_name(name)?);
        }
        for (name, operand) in &update.add_actions {
            let value = self.required(operand, "ADD")?;
            let name = self.resolve_name(name)?;
            let merged = match result.get(&name) {
                None => match value {
                    AttributeValue::N(_)
                    | AttributeValue::Ss(_)
                    | AttributeValue::Ns(_)
                    | AttributeValue::Bs(_) => value,
                    _ => {
                        return Err(ExpressionError::TypeMismatch {
                            message: "ADD requires a number or set value".to_owned(),
                        });
                    }
                },
                Some(existing) => add_values(existing, &value)?,
            };
            result.insert(name, merged);
        }
        for (name, operand) in &update.delete_actions {
            let value = self.required(operand, "DELETE")?;
            let name = self.resolve_name(name)?;
            let Some(existing) = result.get(&name) else {
                continue;
            };
            match delete_values(existing, &value)? {
                Some(remaining) => result.insert(name, remaining),
                None => result.remove(&name),
            };
        }

        Ok(result)
    }

    fn required(
        &self,
        operand: &Operand,
        operation: &str,
    ) -> Result<AttributeValue, ExpressionError> {
        self.resolve_operand(operand)?
            .ok_or_else(|| ExpressionError::InvalidOperand {
                operation: operation.to_owned(),
                message: "operand resolved to nothing".to_owned(),
            })
    }

    /// Keep only the referenced top-level attributes.
    pub fn apply_projection(&self, names: &[String]) -> Result<Item, ExpressionError> {
        let mut result = Item::new();
        for name in names {
            let name = self.resolve_name(name)?;
            if let Some(value) = self.item.get(&name) {
                result.insert(name, value.clone());
            }
        }
        Ok(result)
    }
}

// ---------------------------------------------------------------------------
// Value helpers
// ---------------------------------------------------------------------------

/// Compare two values. Values of different types are only ever unequal.
fn compare_values(
    left: &AttributeValue,
    right: &AttributeValue,
    op: CompareOp,
) -> Result<bool, ExpressionError> {
    match (left, right) {
        (AttributeValue::S(a), AttributeValue::S(b)) => Ok(compare_ord(a, b, op)),
        (AttributeValue::N(a), AttributeValue::N(b)) => {
            let (a, b) = (parse_number(a)?, parse_number(b)?);
            Ok(match op {
                CompareOp::Eq => (a - b).abs() < f64::EPSILON,
                CompareOp::Ne => (a - b).abs() >= f64::EPSILON,
                CompareOp::Lt => a < b,
                CompareOp::Le => a <= b,
                CompareOp::Gt => a > b,
                CompareOp::Ge => a >= b,
            })
        }
        (AttributeValue::B(a), AttributeValue::B(b)) => Ok(compare_ord(a, b, op)),
        (AttributeValue::Bool(a), AttributeValue::Bool(b)) => Ok(compare_ord(a, b, op)),
        (a, b) if a.type_descriptor() == b.type_descriptor() => match op {
            CompareOp::Eq => Ok(a == b),
            CompareOp::Ne => Ok(a != b),
            _ => Err(ExpressionError::TypeMismatch {
                message: format!("{op} is not defined for {}", a.type_descriptor()),
            }),
        },
        _ => Ok(op == CompareOp::Ne),
    }
}

fn compare_ord<T: Ord>(a: &T, b: &T, op: CompareOp) -> bool {
    match op {
        CompareOp::Eq => a == b,
        CompareOp::Ne => a != b,
        CompareOp::Lt => a < b,
        CompareOp::Le => a <= b,
        CompareOp::Gt => a > b,
        CompareOp::Ge => a >= b,
    }
}

fn parse_number(s: &str) -> Result<f64, ExpressionError> {
    s.parse::<f64>().map_err(|_| ExpressionError::TypeMismatch {
        message: format!("'{s}' is not a valid number"),
    })
}

/// `ADD` onto an existing value: numeric sum or set union.
fn add_values(
    existing: &AttributeValue,
    value: &AttributeValue,
) -> Result<AttributeValue, ExpressionError> {
    match (existing, value) {
        (AttributeValue::N(a), AttributeValue::N(b)) => Ok(AttributeValue::N(add_numbers(a, b)?)),
        (AttributeValue::Ss(a), AttributeValue::Ss(b)) => Ok(AttributeValue::Ss(union(a, b))),
        (AttributeValue::Ns(a), AttributeValue::Ns(b)) => Ok(AttributeValue::Ns(union(a, b))),
        (AttributeValue::Bs(a), AttributeValue::Bs(b)) => Ok(AttributeValue::Bs(union(a, b))),
        _ => Err(ExpressionError::TypeMismatch {
            message: format!(
                "cannot ADD {} to {}",
                value.type_descriptor(),
                existing.type_descriptor()
            ),
        }),
    }
}

/// `DELETE` from an existing set. `None` when the set becomes empty.
fn delete_values(
    existing: &AttributeValue,
    value: &AttributeValue,
) -> Result<Option<AttributeValue>, ExpressionError> {
    let remaining = match (existing, value) {
        (AttributeValue::Ss(a), AttributeValue::Ss(b)) => AttributeValue::Ss(difference(a, b)),
        (AttributeValue::Ns(a), AttributeValue::Ns(b)) => AttributeValue::Ns(difference(a, b)),
        (AttributeValue::Bs(a), AttributeValue::Bs(b)) => AttributeValue::Bs(difference(a, b)),
        _ => {
            return Err(ExpressionError::TypeMismatch {
                message: "DELETE requires a set value matching the existing attribute type"
                    .to_owned(),
            });
        }
    };
    let empty = match &remaining {
        AttributeValue::Ss(v) | AttributeValue::Ns(v) => v.is_empty(),
        AttributeValue::Bs(v) => v.is_empty(),
        _ => false,
    };
    Ok((!empty).then_some(remaining))
}

fn union<T: Clone + PartialEq>(a: &[T], b: &[T]) -> Vec<T> {
    let mut merged = a.to_vec();
    for v in b {
        if !merged.contains(v) {
            merged.push(v.clone());
        }
    }
    merged
}

fn difference<T: Clone + PartialEq>(a: &[T], b: &[T]) -> Vec<T> {
    a.iter().filter(|v| !b.contains(v)).cloned().collect()
}

/// Integer addition when both sides are integers, float otherwise.
fn add_numbers(a: &str, b: &str) -> Result<String, ExpressionError> {
    if let (Ok(x), Ok(y)) = (a.parse::<i64>(), b.parse::<i64>()) {
        if let Some(sum) = x.checked_add(y) {
            return Ok(sum.to_string());
        }
    }
    Ok(format_number(parse_number(a)? + parse_number(b)?))
}

/// Prefer integer rendering when the value is integral.
fn format_number(v: f64) -> String {
    // Integral and well inside i64 range, so the cast is exact.
    #[allow(clippy::float_cmp, clippy::cast_possible_truncation)]
    if v == v.trunc() && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        v.to_string()
    }
}
