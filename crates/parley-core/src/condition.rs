//! Boolean conditions over declared variables
//!
//! Conditions are written in configuration as strings such as
//! `"Alerted && !TargetIsAbove"` and compiled once at load time against the
//! variable declarations. Supported operators, lowest precedence first:
//! `||` / `or`, `^` / `xor`, `&&` / `and`, `!` / `not`, plus parentheses
//! and the literals `true` and `false`.

use crate::error::{Error, Result};
use crate::identity::VariableId;
use crate::variables::{VariableDeclarations, Variables};
use serde::{Deserialize, Serialize};

/// A compiled boolean expression
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Condition {
    /// A constant
    Literal(bool),
    /// Read a variable
    Variable(VariableId),
    /// Logical NOT
    Not(Box<Condition>),
    /// Logical AND (all must be true)
    And(Vec<Condition>),
    /// Logical OR (at least one must be true)
    Or(Vec<Condition>),
    /// Exclusive OR
    Xor(Box<Condition>, Box<Condition>),
}

impl Condition {
    /// Compile a condition string against the declared variables
    pub fn parse(source: &str, decls: &VariableDeclarations) -> Result<Condition> {
        let tokens = tokenize(source)?;
        if tokens.is_empty() {
            return Err(Error::Condition("empty condition".to_string()));
        }

        let mut parser = Parser {
            tokens: &tokens,
            pos: 0,
            decls,
        };
        let condition = parser.or()?;
        if parser.pos != tokens.len() {
            return Err(Error::Condition(format!(
                "unexpected '{}' in '{}'",
                tokens[parser.pos], source
            )));
        }
        Ok(condition)
    }

    /// Evaluate against the current variable values
    pub fn eval(&self, vars: &Variables) -> bool {
        match self {
            Condition::Literal(b) => *b,
            Condition::Variable(id) => vars.get(*id),
            Condition::Not(c) => !c.eval(vars),
            Condition::And(cs) => cs.iter().all(|c| c.eval(vars)),
            Condition::Or(cs) => cs.iter().any(|c| c.eval(vars)),
            Condition::Xor(a, b) => a.eval(vars) != b.eval(vars),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    And,
    Or,
    Xor,
    Not,
    Open,
    Close,
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Ident(name) => write!(f, "{}", name),
            Token::And => write!(f, "&&"),
            Token::Or => write!(f, "||"),
            Token::Xor => write!(f, "^"),
            Token::Not => write!(f, "!"),
            Token::Open => write!(f, "("),
            Token::Close => write!(f, ")"),
        }
    }
}

fn tokenize(source: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = source.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '(' => {
                chars.next();
                tokens.push(Token::Open);
            }
            ')' => {
                chars.next();
                tokens.push(Token::Close);
            }
            '!' => {
                chars.next();
                tokens.push(Token::Not);
            }
            '^' => {
                chars.next();
                tokens.push(Token::Xor);
            }
            '&' | '|' => {
                chars.next();
                // Doubled and single forms are equivalent
                if chars.peek() == Some(&c) {
                    chars.next();
                }
                tokens.push(if c == '&' { Token::And } else { Token::Or });
            }
            c if c.is_alphanumeric() || c == '_' => {
                let mut word = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_alphanumeric() || c == '_' {
                        word.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let token = match word.to_ascii_lowercase().as_str() {
                    "and" => Token::And,
                    "or" => Token::Or,
                    "xor" => Token::Xor,
                    "not" => Token::Not,
                    _ => Token::Ident(word),
                };
                tokens.push(token);
            }
            other => {
                return Err(Error::Condition(format!(
                    "unexpected character '{}' in '{}'",
                    other, source
                )));
            }
        }
    }

    Ok(tokens)
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    decls: &'a VariableDeclarations,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn or(&mut self) -> Result<Condition> {
        let mut terms = vec![self.xor()?];
        while self.eat(&Token::Or) {
            terms.push(self.xor()?);
        }
        Ok(if terms.len() == 1 {
            terms.remove(0)
        } else {
            Condition::Or(terms)
        })
    }

    fn xor(&mut self) -> Result<Condition> {
        let mut lhs = self.and()?;
        while self.eat(&Token::Xor) {
            let rhs = self.and()?;
            lhs = Condition::Xor(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn and(&mut self) -> Result<Condition> {
        let mut terms = vec![self.unary()?];
        while self.eat(&Token::And) {
            terms.push(self.unary()?);
        }
        Ok(if terms.len() == 1 {
            terms.remove(0)
        } else {
            Condition::And(terms)
        })
    }

    fn unary(&mut self) -> Result<Condition> {
        if self.eat(&Token::Not) {
            return Ok(Condition::Not(Box::new(self.unary()?)));
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<Condition> {
        match self.tokens.get(self.pos).cloned() {
            Some(Token::Open) => {
                self.pos += 1;
                let inner = self.or()?;
                if !self.eat(&Token::Close) {
                    return Err(Error::Condition("missing ')'".to_string()));
                }
                Ok(inner)
            }
            Some(Token::Ident(name)) => {
                self.pos += 1;
                if name.eq_ignore_ascii_case("true") {
                    return Ok(Condition::Literal(true));
                }
                if name.eq_ignore_ascii_case("false") {
                    return Ok(Condition::Literal(false));
                }
                self.decls
                    .id_of(&name)
                    .map(Condition::Variable)
                    .ok_or(Error::UnknownVariable(name))
            }
            Some(other) => Err(Error::Condition(format!("unexpected '{}'", other))),
            None => Err(Error::Condition("unexpected end of condition".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variables::VariableDecl;

    fn decls() -> VariableDeclarations {
        let mut decls = VariableDeclarations::new();
        decls.declare(VariableDecl::new("Alerted", false)).unwrap();
        decls.declare(VariableDecl::new("Hidden", false)).unwrap();
        decls
    }

    #[test]
    fn test_parse_and_eval() {
        let decls = decls();
        let cond = Condition::parse("Alerted && !Hidden", &decls).unwrap();

        let mut vars = decls.defaults();
        assert!(!cond.eval(&vars));

        vars.set_named("Alerted", true);
        assert!(cond.eval(&vars));

        vars.set_named("Hidden", true);
        assert!(!cond.eval(&vars));
    }

    #[test]
    fn test_precedence() {
        let decls = decls();
        // and binds tighter than or
        let cond = Condition::parse("Alerted or Hidden and false", &decls).unwrap();
        let mut vars = decls.defaults();
        vars.set_named("Alerted", true);
        assert!(cond.eval(&vars));

        let cond = Condition::parse("(Alerted || Hidden) && false", &decls).unwrap();
        assert!(!cond.eval(&vars));
    }

    #[test]
    fn test_xor() {
        let decls = decls();
        let cond = Condition::parse("Alerted ^ Hidden", &decls).unwrap();
        let mut vars = decls.defaults();
        assert!(!cond.eval(&vars));
        vars.set_named("Hidden", true);
        assert!(cond.eval(&vars));
    }

    #[test]
    fn test_builtin_variables() {
        let decls = VariableDeclarations::new();
        let cond = Condition::parse("TargetIsAbove || TargetIsBelow", &decls).unwrap();
        assert!(!cond.eval(&decls.defaults()));
    }

    #[test]
    fn test_errors() {
        let decls = decls();
        assert!(matches!(
            Condition::parse("Unknown", &decls),
            Err(Error::UnknownVariable(_))
        ));
        assert!(matches!(
            Condition::parse("", &decls),
            Err(Error::Condition(_))
        ));
        assert!(matches!(
            Condition::parse("(Alerted", &decls),
            Err(Error::Condition(_))
        ));
        assert!(matches!(
            Condition::parse("Alerted Hidden", &decls),
            Err(Error::Condition(_))
        ));
        assert!(matches!(
            Condition::parse("Alerted + Hidden", &decls),
            Err(Error::Condition(_))
        ));
    }
}
