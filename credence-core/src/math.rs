//! Literal math claims.
//!
//! Statements may carry an expression such as `24.28 > 22.5` or
//! `0.3 * 1200 == 360`. Each is evaluated numerically with a small
//! recursive-descent parser; a comparison that does not hold is reported as a
//! failed math claim, independently of any credence.

use serde::Serialize;
use tracing::debug;

use crate::graph::ArgumentGraph;
use crate::report::MathClaimResult;

/// Relative tolerance for `==` and `!=`.
const EQ_TOLERANCE: f64 = 1e-9;

/// Result of evaluating a math claim.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MathOutcome {
    /// The comparison holds.
    Holds { lhs: f64, rhs: f64 },
    /// The comparison is false.
    Failed { lhs: f64, rhs: f64, operator: String },
    /// The expression evaluated to a number rather than a truth value.
    NotComparison { value: f64 },
    /// The expression could not be evaluated.
    Error { message: String },
}

impl MathOutcome {
    pub fn is_failure(&self) -> bool {
        !matches!(self, MathOutcome::Holds { .. })
    }
}

impl std::fmt::Display for MathOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MathOutcome::Holds { .. } => write!(f, "holds"),
            MathOutcome::Failed { lhs, rhs, operator } => {
                write!(f, "is false ({lhs} {operator} {rhs})")
            }
            MathOutcome::NotComparison { value } => {
                write!(f, "= {value:.4} (not a boolean comparison)")
            }
            MathOutcome::Error { message } => write!(f, "raised {message}"),
        }
    }
}

/// Evaluate every statement's math expression, in declaration order.
pub fn check_claims(graph: &ArgumentGraph) -> Vec<MathClaimResult> {
    graph
        .node_indices()
        .filter_map(|idx| {
            let node = graph.node(idx);
            let expression = node.math.as_ref()?;
            let outcome = evaluate_claim(expression);
            debug!(title = %node.title, expression = %expression, outcome = %outcome, "Evaluated math claim");
            Some(MathClaimResult {
                title: node.title.clone(),
                expression: expression.clone(),
                outcome,
            })
        })
        .collect()
}

/// Evaluate a claim: an arithmetic expression, optionally followed by one
/// comparison and a second expression.
pub fn evaluate_claim(input: &str) -> MathOutcome {
    match parse_claim(input) {
        Ok((lhs, None)) => MathOutcome::NotComparison { value: lhs },
        Ok((lhs, Some((op, rhs)))) => {
            if op.holds(lhs, rhs) {
                MathOutcome::Holds { lhs, rhs }
            } else {
                MathOutcome::Failed {
                    lhs,
                    rhs,
                    operator: op.symbol().to_string(),
                }
            }
        }
        Err(message) => MathOutcome::Error { message },
    }
}

/// Evaluate a purely arithmetic expression.
pub fn eval_expression(input: &str) -> Result<f64, String> {
    let tokens = tokenize(input)?;
    let mut pos = 0;
    let result = parse_expr(&tokens, &mut pos)?;
    if pos < tokens.len() {
        return Err(format!(
            "Unexpected token at position {}: {:?}",
            pos, tokens[pos]
        ));
    }
    Ok(result)
}

fn parse_claim(input: &str) -> Result<(f64, Option<(CmpOp, f64)>), String> {
    let tokens = tokenize(input)?;
    let mut pos = 0;
    let lhs = parse_expr(&tokens, &mut pos)?;
    let comparison = match tokens.get(pos) {
        None => None,
        Some(Token::Cmp(op)) => {
            let op = *op;
            pos += 1;
            let rhs = parse_expr(&tokens, &mut pos)?;
            Some((op, rhs))
        }
        Some(other) => return Err(format!("Unexpected token: {:?}", other)),
    };
    if pos < tokens.len() {
        return Err(format!(
            "Unexpected token at position {}: {:?}",
            pos, tokens[pos]
        ));
    }
    Ok((lhs, comparison))
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum CmpOp {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

impl CmpOp {
    fn holds(self, lhs: f64, rhs: f64) -> bool {
        let close = (lhs - rhs).abs() <= EQ_TOLERANCE * lhs.abs().max(rhs.abs()).max(1.0);
        match self {
            CmpOp::Lt => lhs < rhs,
            CmpOp::Le => lhs <= rhs || close,
            CmpOp::Gt => lhs > rhs,
            CmpOp::Ge => lhs >= rhs || close,
            CmpOp::Eq => close,
            CmpOp::Ne => !close,
        }
    }

    fn symbol(self) -> &'static str {
        match self {
            CmpOp::Lt => "<",
            CmpOp::Le => "<=",
            CmpOp::Gt => ">",
            CmpOp::Ge => ">=",
            CmpOp::Eq => "==",
            CmpOp::Ne => "!=",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    LParen,
    RParen,
    Cmp(CmpOp),
}

fn tokenize(input: &str) -> Result<Vec<Token>, String> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let ch = chars[i];
        match ch {
            ' ' | '\t' | '\n' => i += 1,
            '0'..='9' | '.' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                // Exponent only when digits follow.
                if i < chars.len() && (chars[i] == 'e' || chars[i] == 'E') {
                    let mut j = i + 1;
                    if j < chars.len() && (chars[j] == '+' || chars[j] == '-') {
                        j += 1;
                    }
                    if j < chars.len() && chars[j].is_ascii_digit() {
                        while j < chars.len() && chars[j].is_ascii_digit() {
                            j += 1;
                        }
                        i = j;
                    }
                }
                let num_str: String = chars[start..i].iter().collect();
                let mut num: f64 = num_str
                    .parse()
                    .map_err(|_| format!("Invalid number: {}", num_str))?;
                if i < chars.len() && chars[i] == '%' {
                    num /= 100.0;
                    i += 1;
                }
                tokens.push(Token::Number(num));
            }
            'a'..='z' | 'A'..='Z' | '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                tokens.push(Token::Ident(chars[start..i].iter().collect()));
            }
            '+' => {
                tokens.push(Token::Plus);
                i += 1;
            }
            '-' => {
                tokens.push(Token::Minus);
                i += 1;
            }
            '*' => {
                if chars.get(i + 1) == Some(&'*') {
                    tokens.push(Token::Caret);
                    i += 2;
                } else {
                    tokens.push(Token::Star);
                    i += 1;
                }
            }
            '/' => {
                tokens.push(Token::Slash);
                i += 1;
            }
            '^' => {
                tokens.push(Token::Caret);
                i += 1;
            }
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            '<' | '>' | '=' | '!' => {
                let next_is_eq = chars.get(i + 1) == Some(&'=');
                let op = match (ch, next_is_eq) {
                    ('<', true) => CmpOp::Le,
                    ('<', false) => CmpOp::Lt,
                    ('>', true) => CmpOp::Ge,
                    ('>', false) => CmpOp::Gt,
                    ('=', _) => CmpOp::Eq,
                    ('!', true) => CmpOp::Ne,
                    _ => return Err(format!("Unexpected character: '{}'", ch)),
                };
                tokens.push(Token::Cmp(op));
                i += if next_is_eq { 2 } else { 1 };
            }
            _ => {
                return Err(format!("Unexpected character: '{}'", ch));
            }
        }
    }

    Ok(tokens)
}

// expr = term (('+' | '-') term)*
fn parse_expr(tokens: &[Token], pos: &mut usize) -> Result<f64, String> {
    let mut left = parse_term(tokens, pos)?;
    while *pos < tokens.len() {
        match tokens[*pos] {
            Token::Plus => {
                *pos += 1;
                left += parse_term(tokens, pos)?;
            }
            Token::Minus => {
                *pos += 1;
                left -= parse_term(tokens, pos)?;
            }
            _ => break,
        }
    }
    Ok(left)
}

// term = unary (('*' | '/') unary)*
fn parse_term(tokens: &[Token], pos: &mut usize) -> Result<f64, String> {
    let mut left = parse_unary(tokens, pos)?;
    while *pos < tokens.len() {
        match tokens[*pos] {
            Token::Star => {
                *pos += 1;
                left *= parse_unary(tokens, pos)?;
            }
            Token::Slash => {
                *pos += 1;
                let right = parse_unary(tokens, pos)?;
                if right == 0.0 {
                    return Err("Division by zero".to_string());
                }
                left /= right;
            }
            _ => break,
        }
    }
    Ok(left)
}

// unary = ('-' | '+') unary | power
fn parse_unary(tokens: &[Token], pos: &mut usize) -> Result<f64, String> {
    match tokens.get(*pos) {
        Some(Token::Minus) => {
            *pos += 1;
            Ok(-parse_unary(tokens, pos)?)
        }
        Some(Token::Plus) => {
            *pos += 1;
            parse_unary(tokens, pos)
        }
        _ => parse_power(tokens, pos),
    }
}

// power = primary ('^' unary)?   (right associative)
fn parse_power(tokens: &[Token], pos: &mut usize) -> Result<f64, String> {
    let base = parse_primary(tokens, pos)?;
    if matches!(tokens.get(*pos), Some(Token::Caret)) {
        *pos += 1;
        let exponent = parse_unary(tokens, pos)?;
        return Ok(base.powf(exponent));
    }
    Ok(base)
}

// primary = NUMBER | CONST | FUNC '(' expr ')' | '(' expr ')'
fn parse_primary(tokens: &[Token], pos: &mut usize) -> Result<f64, String> {
    let Some(token) = tokens.get(*pos) else {
        return Err("Unexpected end of expression".to_string());
    };
    match token {
        Token::Number(n) => {
            *pos += 1;
            Ok(*n)
        }
        Token::LParen => {
            *pos += 1;
            let val = parse_expr(tokens, pos)?;
            expect_rparen(tokens, pos)?;
            Ok(val)
        }
        Token::Ident(name) => {
            *pos += 1;
            match name.as_str() {
                "pi" => return Ok(std::f64::consts::PI),
                "e" => return Ok(std::f64::consts::E),
                _ => {}
            }
            if !matches!(tokens.get(*pos), Some(Token::LParen)) {
                return Err(format!("Unknown identifier: {}", name));
            }
            *pos += 1;
            let arg = parse_expr(tokens, pos)?;
            expect_rparen(tokens, pos)?;
            apply_function(name, arg)
        }
        other => Err(format!("Unexpected token: {:?}", other)),
    }
}

fn expect_rparen(tokens: &[Token], pos: &mut usize) -> Result<(), String> {
    match tokens.get(*pos) {
        Some(Token::RParen) => {
            *pos += 1;
            Ok(())
        }
        Some(_) => Err("Expected closing parenthesis".to_string()),
        None => Err("Missing closing parenthesis".to_string()),
    }
}

fn apply_function(name: &str, arg: f64) -> Result<f64, String> {
    match name {
        "sqrt" if arg < 0.0 => Err(format!("sqrt of negative number {}", arg)),
        "sqrt" => Ok(arg.sqrt()),
        "ln" | "log" if arg <= 0.0 => Err(format!("{} of non-positive number {}", name, arg)),
        "ln" => Ok(arg.ln()),
        "log" => Ok(arg.log10()),
        "exp" => Ok(arg.exp()),
        "abs" => Ok(arg.abs()),
        _ => Err(format!("Unknown function: {}", name)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Document, StatementDecl};

    #[test]
    fn test_eval_arithmetic() {
        assert_eq!(eval_expression("2 + 3 * (4 - 1)").unwrap(), 11.0);
        assert_eq!(eval_expression("-2 * -3").unwrap(), 6.0);
        assert_eq!(eval_expression("-(2 + 3)").unwrap(), -5.0);
        assert_eq!(eval_expression("2 ^ 3 ^ 2").unwrap(), 512.0);
        assert_eq!(eval_expression("2 ** 10").unwrap(), 1024.0);
        assert_eq!(eval_expression("-2 ^ 2").unwrap(), -4.0);
        assert!((eval_expression("1.5e3 / 3").unwrap() - 500.0).abs() < 1e-12);
        assert!((eval_expression("25% * 80").unwrap() - 20.0).abs() < 1e-12);
    }

    #[test]
    fn test_eval_functions_and_constants() {
        assert_eq!(eval_expression("sqrt(16)").unwrap(), 4.0);
        assert!((eval_expression("ln(e)").unwrap() - 1.0).abs() < 1e-12);
        assert!((eval_expression("log(1000)").unwrap() - 3.0).abs() < 1e-12);
        assert_eq!(eval_expression("abs(-3)").unwrap(), 3.0);
        assert!((eval_expression("2 * pi").unwrap() - std::f64::consts::TAU).abs() < 1e-12);
    }

    #[test]
    fn test_eval_errors() {
        assert!(eval_expression("1 / 0").is_err());
        assert!(eval_expression("(1 + 2").is_err());
        assert!(eval_expression("foo(2)").is_err());
        assert!(eval_expression("x + 1").is_err());
        assert!(eval_expression("1 $ 2").is_err());
        assert!(eval_expression("").is_err());
    }

    #[test]
    fn test_claim_holds() {
        assert!(matches!(
            evaluate_claim("24.28 > 22.535"),
            MathOutcome::Holds { .. }
        ));
        assert!(matches!(
            evaluate_claim("0.1 + 0.2 == 0.3"),
            MathOutcome::Holds { .. }
        ));
        assert!(matches!(
            evaluate_claim("0.3 * 1200 = 360"),
            MathOutcome::Holds { .. }
        ));
        assert!(matches!(evaluate_claim("3 >= 3"), MathOutcome::Holds { .. }));
        assert!(matches!(evaluate_claim("2 != 3"), MathOutcome::Holds { .. }));
    }

    #[test]
    fn test_claim_fails() {
        assert_eq!(
            evaluate_claim("22.5 > 24.28"),
            MathOutcome::Failed {
                lhs: 22.5,
                rhs: 24.28,
                operator: ">".into(),
            }
        );
        assert!(evaluate_claim("1 < 1").is_failure());
    }

    #[test]
    fn test_claim_without_comparison() {
        assert_eq!(
            evaluate_claim("2 * 21"),
            MathOutcome::NotComparison { value: 42.0 }
        );
    }

    #[test]
    fn test_chained_comparison_is_error() {
        assert!(matches!(
            evaluate_claim("1 < 2 < 3"),
            MathOutcome::Error { .. }
        ));
    }

    #[test]
    fn test_check_claims_over_graph() {
        let doc = Document::new()
            .with_statement(StatementDecl::new("Ratio").math("24.28 > 22.535"))
            .with_statement(StatementDecl::new("Plain").credence(0.5))
            .with_statement(StatementDecl::new("Wrong").math("2 + 2 == 5"));
        let (graph, _) = ArgumentGraph::build(&doc);
        let results = check_claims(&graph);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].title, "Ratio");
        assert!(!results[0].failed());
        assert_eq!(results[1].title, "Wrong");
        assert!(results[1].failed());
    }
}
