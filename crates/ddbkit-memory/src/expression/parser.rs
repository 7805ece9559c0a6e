//! Lexer and recursive-descent parser.
//!
//! Keywords and function names match case-insensitively. Document paths
//! (`a.b`, `a[0]`) are not part of the grammar.

use std::fmt;
use std::iter::Peekable;
use std::str::Chars;

use super::ast::{CompareOp, Expr, FunctionName, LogicalOp, Operand, UpdateExpr};

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors produced while parsing or evaluating an expression.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExpressionError {
    /// An unexpected token was encountered.
    #[error("Unexpected token: expected {expected}, found {found}")]
    UnexpectedToken {
        /// What was expected.
        expected: String,
        /// What was found.
        found: String,
    },
    /// A `#placeholder` has no entry in the name map.
    #[error("Unresolved expression attribute name: {name}")]
    UnresolvedName {
        /// The unresolved placeholder.
        name: String,
    },
    /// A `:placeholder` has no entry in the value map.
    #[error("Unresolved expression attribute value: {name}")]
    UnresolvedValue {
        /// The unresolved placeholder.
        name: String,
    },
    /// An operand cannot be used where it appears.
    #[error("Invalid operand for {operation}: {message}")]
    InvalidOperand {
        /// The operation that failed.
        operation: String,
        /// Explanation.
        message: String,
    },
    /// Operand types do not fit the operation.
    #[error("Type mismatch: {message}")]
    TypeMismatch {
        /// Explanation.
        message: String,
    },
}

// ---------------------------------------------------------------------------
// Tokens
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Identifier(String),
    ExprAttrName(String),
    ExprAttrValue(String),
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Comma,
    LParen,
    RParen,
    And,
    Or,
    Not,
    Between,
    Set,
    Remove,
    Add,
    Delete,
    Function(FunctionName),
    Eof,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Identifier(s) => write!(f, "identifier '{s}'"),
            Self::ExprAttrName(s) | Self::ExprAttrValue(s) => f.write_str(s),
            Self::Eq => f.write_str("'='"),
            Self::Ne => f.write_str("'<>'"),
            Self::Lt => f.write_str("'<'"),
            Self::Le => f.write_str("'<='"),
            Self::Gt => f.write_str("'>'"),
            Self::Ge => f.write_str("'>='"),
            Self::Comma => f.write_str("','"),
            Self::LParen => f.write_str("'('"),
            Self::RParen => f.write_str("')'"),
            Self::And => f.write_str("AND"),
            Self::Or => f.write_str("OR"),
            Self::Not => f.write_str("NOT"),
            Self::Between => f.write_str("BETWEEN"),
            Self::Set => f.write_str("SET"),
            Self::Remove => f.write_str("REMOVE"),
            Self::Add => f.write_str("ADD"),
            Self::Delete => f.write_str("DELETE"),
            Self::Function(name) => write!(f, "{name}"),
            Self::Eof => f.write_str("EOF"),
        }
    }
}

// ---------------------------------------------------------------------------
// Lexer
// ---------------------------------------------------------------------------

struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
}

impl<'a> Lexer<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            chars: input.chars().peekable(),
        }
    }

    fn tokenize(&mut self) -> Result<Vec<Token>, ExpressionError> {
        let mut tokens = Vec::new();
        loop {
            let tok = self.next_token()?;
            let done = tok == Token::Eof;
            tokens.push(tok);
            if done {
                return Ok(tokens);
            }
        }
    }

    fn next_token(&mut self) -> Result<Token, ExpressionError> {
        while self.chars.peek().is_some_and(char::is_ascii_whitespace) {
            self.chars.next();
        }

        let Some(&ch) = self.chars.peek() else {
            return Ok(Token::Eof);
        };

        match ch {
            '#' => self.read_placeholder('#').map(Token::ExprAttrName),
            ':' => self.read_placeholder(':').map(Token::ExprAttrValue),
            '<' => {
                self.chars.next();
                Ok(match self.chars.peek() {
                    Some('=') => {
                        self.chars.next();
                        Token::Le
                    }
                    Some('>') => {
                        self.chars.next();
                        Token::Ne
                    }
                    _ => Token::Lt,
                })
            }
            '>' => {
                self.chars.next();
                if self.chars.peek() == Some(&'=') {
                    self.chars.next();
                    Ok(Token::Ge)
                } else {
                    Ok(Token::Gt)
                }
            }
            '=' | ',' | '(' | ')' => {
                self.chars.next();
                Ok(match ch {
                    '=' => Token::Eq,
                    ',' => Token::Comma,
                    '(' => Token::LParen,
                    _ => Token::RParen,
                })
            }
            c if is_ident_start(c) => Ok(self.read_identifier_or_keyword()),
            _ => Err(ExpressionError::UnexpectedToken {
                expected: "valid token".to_owned(),
                found: format!("'{ch}'"),
            }),
        }
    }

    fn read_placeholder(&mut self, sigil: char) -> Result<String, ExpressionError> {
        self.chars.next();
        let name = self.read_ident_chars();
        if name.is_empty() {
            return Err(ExpressionError::UnexpectedToken {
                expected: format!("name after '{sigil}'"),
                found: "empty".to_owned(),
            });
        }
        Ok(format!("{sigil}{name}"))
    }

    fn read_ident_chars(&mut self) -> String {
        let mut s = String::new();
        while let Some(&c) = self.chars.peek() {
            if !is_ident_continue(c) {
                break;
            }
            s.push(c);
            self.chars.next();
        }
        s
    }

    fn read_identifier_or_keyword(&mut self) -> Token {
        let ident = self.read_ident_chars();
        match ident.to_ascii_lowercase().as_str() {
            "and" => Token::And,
            "or" => Token::Or,
            "not" => Token::Not,
            "between" => Token::Between,
            "set" => Token::Set,
            "remove" => Token::Remove,
            "add" => Token::Add,
            "delete" => Token::Delete,
            "attribute_exists" => Token::Function(FunctionName::AttributeExists),
            "attribute_not_exists" => Token::Function(FunctionName::AttributeNotExists),
            "begins_with" => Token::Function(FunctionName::BeginsWith),
            "contains" => Token::Function(FunctionName::Contains),
            _ => Token::Identifier(ident),
        }
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    fn peek(&self) -> &Token {
        self.tokens.get(self.pos).unwrap_or(&Token::Eof)
    }

    fn advance(&mut self) -> Token {
        let tok = self.tokens.get(self.pos).cloned().unwrap_or(Token::Eof);
        self.pos += 1;
        tok
    }

    fn expect(&mut self, expected: &Token) -> Result<(), ExpressionError> {
        let tok = self.advance();
        if &tok == expected {
            Ok(())
        } else {
            Err(ExpressionError::UnexpectedToken {
                expected: expected.to_string(),
                found: tok.to_string(),
            })
        }
    }

    fn at_end(&self) -> bool {
        matches!(self.peek(), Token::Eof)
    }

    fn expect_end(&self) -> Result<(), ExpressionError> {
        if self.at_end() {
            Ok(())
        } else {
            Err(ExpressionError::UnexpectedToken {
                expected: "end of expression".to_owned(),
                found: self.peek().to_string(),
            })
        }
    }

    /// Comma-separated list of `item`.
    fn parse_list<T>(
        &mut self,
        mut item: impl FnMut(&mut Self) -> Result<T, ExpressionError>,
    ) -> Result<Vec<T>, ExpressionError> {
        let mut items = vec![item(self)?];
        while matches!(self.peek(), Token::Comma) {
            self.advance();
            items.push(item(self)?);
        }
        Ok(items)
    }
}

// ---------------------------------------------------------------------------
// Conditions (precedence: OR < AND < NOT < primary)
// ---------------------------------------------------------------------------

impl Parser {
    fn parse_or_expr(&mut self) -> Result<Expr, ExpressionError> {
        let mut left = self.parse_and_expr()?;
        while matches!(self.peek(), Token::Or) {
            self.advance();
            let right = self.parse_and_expr()?;
            left = Expr::Logical {
                op: LogicalOp::Or,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_and_expr(&mut self) -> Result<Expr, ExpressionError> {
        let mut left = self.parse_not_expr()?;
        while matches!(self.peek(), Token::And) {
            self.advance();
            let right = self.parse_not_expr()?;
            left = Expr::Logical {
                op: LogicalOp::And,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_not_expr(&mut self) -> Result<Expr, ExpressionError> {
        if matches!(self.peek(), Token::Not) {
            self.advance();
            return Ok(Expr::Not(Box::new(self.parse_not_expr()?)));
        }
        self.parse_primary_expr()
    }

    fn parse_primary_expr(&mut self) -> Result<Expr, ExpressionError> {
        match self.peek().clone() {
            Token::LParen => {
                self.advance();
                let expr = self.parse_or_expr()?;
                self.expect(&Token::RParen)?;
                Ok(expr)
            }
            Token::Function(name) => {
                self.advance();
                self.expect(&Token::LParen)?;
                let args = self.parse_list(Self::parse_operand)?;
                self.expect(&Token::RParen)?;
                let arity = match name {
                    FunctionName::AttributeExists | FunctionName::AttributeNotExists => 1,
                    FunctionName::BeginsWith | FunctionName::Contains => 2,
                };
                if args.len() != arity {
                    return Err(ExpressionError::InvalidOperand {
                        operation: name.to_string(),
                        message: format!("expected {arity} arguments, got {}", args.len()),
                    });
                }
                Ok(Expr::Function { name, args })
            }
            _ => {
                let left = self.parse_operand()?;
                self.parse_postfix_expr(left)
            }
        }
    }

    fn parse_postfix_expr(&mut self, left: Operand) -> Result<Expr, ExpressionError> {
        let op = match self.advance() {
            Token::Eq => CompareOp::Eq,
            Token::Ne => CompareOp::Ne,
            Token::Lt => CompareOp::Lt,
            Token::Le => CompareOp::Le,
            Token::Gt => CompareOp::Gt,
            Token::Ge => CompareOp::Ge,
            Token::Between => {
                let low = self.parse_operand()?;
                self.expect(&Token::And)?;
                let high = self.parse_operand()?;
                return Ok(Expr::Between {
                    value: left,
                    low,
                    high,
                });
            }
            other => {
                return Err(ExpressionError::UnexpectedToken {
                    expected: "comparison operator or BETWEEN".to_owned(),
                    found: other.to_string(),
                });
            }
        };
        let right = self.parse_operand()?;
        Ok(Expr::Compare { left, op, right })
    }

    fn parse_operand(&mut self) -> Result<Operand, ExpressionError> {
        match self.advance() {
            Token::ExprAttrValue(name) => Ok(Operand::Value(name)),
            Token::Identifier(name) | Token::ExprAttrName(name) => Ok(Operand::Name(name)),
            other => Err(ExpressionError::UnexpectedToken {
                expected: "attribute name, #name or :value".to_owned(),
                found: other.to_string(),
            }),
        }
    }

    fn parse_name(&mut self) -> Result<String, ExpressionError> {
        match self.advance() {
            Token::Identifier(name) | Token::ExprAttrName(name) => Ok(name),
            other => Err(ExpressionError::UnexpectedToken {
                expected: "attribute name or #name".to_owned(),
                found: other.to_string(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Updates
// ---------------------------------------------------------------------------

impl Parser {
    fn parse_update_expr(&mut self) -> Result<UpdateExpr, ExpressionError> {
        let mut update = UpdateExpr::default();
        while !self.at_end() {
            match self.advance() {
                Token::Set => {
                    let actions = self.parse_list(|p| {
                        let name = p.parse_name()?;
                        p.expect(&Token::Eq)?;
                        Ok((name, p.parse_operand()?))
                    })?;
                    update.set_actions.extend(actions);
                }
                Token::Remove => {
                    let names = self.parse_list(Self::parse_name)?;
                    update.remove_names.extend(names);
                }
                Token::Add => {
                    let actions = self.parse_list(|p| Ok((p.parse_name()?, p.parse_operand()?)))?;
                    update.add_actions.extend(actions);
                }
                Token::Delete => {
                    let actions = self.parse_list(|p| Ok((p.parse_name()?, p.parse_operand()?)))?;
                    update.delete_actions.extend(actions);
                }
                other => {
                    return Err(ExpressionError::UnexpectedToken {
                        expected: "SET, REMOVE, ADD, or DELETE".to_owned(),
                        found: other.to_string(),
                    });
                }
            }
        }
        Ok(update)
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Parse a condition, filter, or key-condition expression.
pub fn parse_condition(input: &str) -> Result<Expr, ExpressionError> {
    let mut parser = Parser::new(Lexer::new(input).tokenize()?);
    let expr = parser.parse_or_expr()?;
    parser.expect_end()?;
    Ok(expr)
}

/// Parse an update expression.
pub fn parse_update(input: &str) -> Result<UpdateExpr, ExpressionError> {
    let mut parser = Parser::new(Lexer::new(input).tokenize()?);
    let update = parser.parse_update_expr()?;
    if update.is_empty() {
        return Err(ExpressionError::UnexpectedToken {
            expected: "SET, REMOVE, ADD, or DELETE".to_owned(),
            found: "empty update expression".to_owned(),
        });
    }
    Ok(update)
}

/// Parse a projection expression into attribute references.
pub fn parse_projection(input: &str) -> Result<Vec<String>, ExpressionError> {
    let mut parser = Parser::new(Lexer::new(input).tokenize()?);
    let names = parser.parse_list(Parser::parse_name)?;
    parser.expect_end()?;
    Ok(names)
}
