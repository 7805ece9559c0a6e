//! DynamoDB expression parsing and evaluation.
//!
//! 1. **Lexing**: tokenize the expression string.
//! 2. **Parsing**: build an AST by recursive descent.
//! 3. **Evaluation**: evaluate conditions, apply updates, or project
//!    attributes against one item.

pub mod ast;
pub mod evaluator;
pub mod parser;

pub use ast::{CompareOp, Expr, FunctionName, LogicalOp, Operand, UpdateExpr};
pub use evaluator::{EvalContext, resolve_name};
pub use parser::{ExpressionError, parse_condition, parse_projection, parse_update};
