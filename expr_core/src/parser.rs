//! Pratt parser producing the expression tree

use crate::error::{EvalError, EvalResult};
use crate::lexer::{tokenize, Spanned, Token};

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Plus,
    Not,
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Or,
    And,
    Eq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
}

impl BinaryOp {
    /// Left and right binding power; right < left means right associative
    fn binding_power(self) -> (u8, u8) {
        match self {
            BinaryOp::Or => (2, 3),
            BinaryOp::And => (4, 5),
            BinaryOp::Eq
            | BinaryOp::NotEq
            | BinaryOp::Lt
            | BinaryOp::Le
            | BinaryOp::Gt
            | BinaryOp::Ge => (6, 7),
            BinaryOp::Add | BinaryOp::Sub => (8, 9),
            BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => (10, 11),
            BinaryOp::Pow => (14, 13),
        }
    }
}

const TERNARY_BP: u8 = 1;
const PREFIX_BP: u8 = 12;
/// Right operand of an implicit multiplication (`2x^2` is `2 * x^2`)
const IMPLICIT_MUL_BP: u8 = 13;

/// Deepest expression the parser accepts
///
/// Bounds both parser recursion (brackets, operands, arguments) and the
/// height of the resulting tree, so evaluating a parsed tree stays within
/// a fixed amount of stack.
pub const MAX_NESTING: usize = 128;

/// Expression tree
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Bool(bool),
    Str(String),
    Ident(String),
    /// Matrix literal; a single row without `;` may hold nested vectors
    Matrix(Vec<Vec<Expr>>),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Conditional {
        condition: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
    Call {
        name: String,
        args: Vec<Expr>,
    },
    Index {
        target: Box<Expr>,
        indices: Vec<Expr>,
    },
    Factorial(Box<Expr>),
}

/// Parses a complete expression
pub fn parse(source: &str) -> EvalResult<Expr> {
    let tokens = tokenize(source)?;
    if tokens.is_empty() {
        return Err(EvalError::EmptyExpression);
    }
    let mut parser = Parser {
        tokens,
        cursor: 0,
        end: source.len(),
        depth: 0,
    };
    let (expr, _) = parser.parse_bp(0)?;
    match parser.peek() {
        None => Ok(expr),
        Some(spanned) => Err(EvalError::parse(
            spanned.pos,
            format!("unexpected trailing token {:?}", spanned.token),
        )),
    }
}

/// A parsed subtree and its height
type Node = (Expr, usize);

struct Parser {
    tokens: Vec<Spanned>,
    cursor: usize,
    end: usize,
    /// Active `parse_bp` frames
    depth: usize,
}

fn is_keyword(ident: &str) -> bool {
    matches!(ident, "and" | "or" | "not" | "mod")
}

/// Height of a node built over children of height `below`
fn grow(below: usize) -> EvalResult<usize> {
    let height = below + 1;
    if height > MAX_NESTING {
        return Err(EvalError::NestingTooDeep(MAX_NESTING));
    }
    Ok(height)
}

impl Parser {
    fn peek(&self) -> Option<&Spanned> {
        self.tokens.get(self.cursor)
    }

    fn peek_token(&self) -> Option<&Token> {
        self.peek().map(|s| &s.token)
    }

    fn position(&self) -> usize {
        self.peek().map(|s| s.pos).unwrap_or(self.end)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.cursor).map(|s| s.token.clone());
        if token.is_some() {
            self.cursor += 1;
        }
        token
    }

    fn expect(&mut self, expected: Token, what: &str) -> EvalResult<()> {
        if self.peek_token() == Some(&expected) {
            self.cursor += 1;
            Ok(())
        } else {
            Err(EvalError::parse(self.position(), format!("expected {}", what)))
        }
    }

    fn peek_infix(&self) -> Option<BinaryOp> {
        let op = match self.peek_token()? {
            Token::OrOr => BinaryOp::Or,
            Token::AndAnd => BinaryOp::And,
            Token::EqEq => BinaryOp::Eq,
            Token::NotEq => BinaryOp::NotEq,
            Token::Lt => BinaryOp::Lt,
            Token::Le => BinaryOp::Le,
            Token::Gt => BinaryOp::Gt,
            Token::Ge => BinaryOp::Ge,
            Token::Plus => BinaryOp::Add,
            Token::Minus => BinaryOp::Sub,
            Token::Star => BinaryOp::Mul,
            Token::Slash => BinaryOp::Div,
            Token::Percent => BinaryOp::Mod,
            Token::Caret => BinaryOp::Pow,
            Token::Ident(word) => match word.as_str() {
                "or" => BinaryOp::Or,
                "and" => BinaryOp::And,
                "mod" => BinaryOp::Mod,
                _ => return None,
            },
            _ => return None,
        };
        Some(op)
    }

    /// All parser recursion passes through here
    fn parse_bp(&mut self, min_bp: u8) -> EvalResult<Node> {
        if self.depth >= MAX_NESTING {
            return Err(EvalError::NestingTooDeep(MAX_NESTING));
        }
        self.depth += 1;
        let result = self.parse_operators(min_bp);
        self.depth -= 1;
        result
    }

    fn parse_operators(&mut self, min_bp: u8) -> EvalResult<Node> {
        let (mut lhs, mut height) = self.parse_prefix()?;

        loop {
            if self.peek_token() == Some(&Token::Question) {
                if TERNARY_BP < min_bp {
                    break;
                }
                self.cursor += 1;
                let (then, then_height) = self.parse_bp(0)?;
                self.expect(Token::Colon, "':' in conditional")?;
                let (otherwise, otherwise_height) = self.parse_bp(TERNARY_BP)?;
                height = grow(height.max(then_height).max(otherwise_height))?;
                lhs = Expr::Conditional {
                    condition: Box::new(lhs),
                    then: Box::new(then),
                    otherwise: Box::new(otherwise),
                };
                continue;
            }

            let Some(op) = self.peek_infix() else {
                break;
            };
            let (l_bp, r_bp) = op.binding_power();
            if l_bp < min_bp {
                break;
            }
            self.cursor += 1;
            let (rhs, rhs_height) = self.parse_bp(r_bp)?;
            height = grow(height.max(rhs_height))?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }

        Ok((lhs, height))
    }

    fn parse_prefix(&mut self) -> EvalResult<Node> {
        let op = match self.peek_token() {
            Some(Token::Minus) => Some(UnaryOp::Neg),
            Some(Token::Plus) => Some(UnaryOp::Plus),
            Some(Token::Bang) => Some(UnaryOp::Not),
            Some(Token::Ident(word)) if word == "not" => Some(UnaryOp::Not),
            _ => None,
        };
        match op {
            Some(op) => {
                self.cursor += 1;
                let (operand, height) = self.parse_bp(PREFIX_BP)?;
                let expr = Expr::Unary {
                    op,
                    operand: Box::new(operand),
                };
                Ok((expr, grow(height)?))
            }
            None => self.parse_postfix(),
        }
    }

    fn parse_postfix(&mut self) -> EvalResult<Node> {
        let (mut expr, mut height) = self.parse_primary()?;

        if matches!(expr, Expr::Number(_)) && self.starts_implicit_operand() {
            let (rhs, rhs_height) = self.parse_bp(IMPLICIT_MUL_BP)?;
            expr = Expr::Binary {
                op: BinaryOp::Mul,
                lhs: Box::new(expr),
                rhs: Box::new(rhs),
            };
            return Ok((expr, grow(rhs_height)?));
        }

        loop {
            match self.peek_token() {
                Some(Token::LParen) => {
                    let Expr::Ident(name) = &expr else {
                        break;
                    };
                    let name = name.clone();
                    self.cursor += 1;
                    let (args, args_height) =
                        self.parse_list(Token::RParen, "')' after arguments")?;
                    height = grow(args_height)?;
                    expr = Expr::Call { name, args };
                }
                Some(Token::LBracket) => {
                    self.cursor += 1;
                    let (indices, indices_height) =
                        self.parse_list(Token::RBracket, "']' after index")?;
                    if indices.is_empty() {
                        return Err(EvalError::parse(self.position(), "empty index"));
                    }
                    height = grow(height.max(indices_height))?;
                    expr = Expr::Index {
                        target: Box::new(expr),
                        indices,
                    };
                }
                Some(Token::Bang) => {
                    self.cursor += 1;
                    height = grow(height)?;
                    expr = Expr::Factorial(Box::new(expr));
                }
                _ => break,
            }
        }

        Ok((expr, height))
    }

    fn starts_implicit_operand(&self) -> bool {
        match self.peek_token() {
            Some(Token::Ident(word)) => !is_keyword(word),
            Some(Token::LParen) => true,
            _ => false,
        }
    }

    /// Comma-separated expressions up to `close`, which is consumed
    ///
    /// Returns the items and the tallest item's height.
    fn parse_list(&mut self, close: Token, what: &str) -> EvalResult<(Vec<Expr>, usize)> {
        let mut items = Vec::new();
        let mut height = 0;
        if self.peek_token() == Some(&close) {
            self.cursor += 1;
            return Ok((items, height));
        }
        loop {
            let (item, item_height) = self.parse_bp(0)?;
            items.push(item);
            height = height.max(item_height);
            if self.peek_token() == Some(&Token::Comma) {
                self.cursor += 1;
                continue;
            }
            self.expect(close, what)?;
            return Ok((items, height));
        }
    }

    fn parse_primary(&mut self) -> EvalResult<Node> {
        let pos = self.position();
        match self.advance() {
            Some(Token::Number(n)) => Ok((Expr::Number(n), 1)),
            Some(Token::Str(s)) => Ok((Expr::Str(s), 1)),
            Some(Token::Ident(word)) => match word.as_str() {
                "true" => Ok((Expr::Bool(true), 1)),
                "false" => Ok((Expr::Bool(false), 1)),
                w if is_keyword(w) => {
                    Err(EvalError::parse(pos, format!("unexpected keyword '{}'", w)))
                }
                _ => Ok((Expr::Ident(word), 1)),
            },
            Some(Token::LParen) => {
                let inner = self.parse_bp(0)?;
                self.expect(Token::RParen, "')'")?;
                Ok(inner)
            }
            Some(Token::LBracket) => self.parse_matrix(),
            Some(other) => Err(EvalError::parse(pos, format!("unexpected token {:?}", other))),
            None => Err(EvalError::parse(pos, "unexpected end of expression")),
        }
    }

    /// Parses after an opening `[`: rows separated by `;`, items by `,`
    fn parse_matrix(&mut self) -> EvalResult<Node> {
        let mut rows = vec![Vec::new()];
        let mut height = 0;
        if self.peek_token() == Some(&Token::RBracket) {
            self.cursor += 1;
            return Ok((Expr::Matrix(rows), 1));
        }
        loop {
            let (item, item_height) = self.parse_bp(0)?;
            height = height.max(item_height);
            if let Some(row) = rows.last_mut() {
                row.push(item);
            }
            match self.advance() {
                Some(Token::Comma) => {}
                Some(Token::Semicolon) => rows.push(Vec::new()),
                Some(Token::RBracket) => return Ok((Expr::Matrix(rows), grow(height)?)),
                _ => {
                    return Err(EvalError::parse(
                        self.position(),
                        "expected ',', ';' or ']' in matrix",
                    ))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn num(n: f64) -> Box<Expr> {
        Box::new(Expr::Number(n))
    }

    fn ident(name: &str) -> Box<Expr> {
        Box::new(Expr::Ident(name.to_string()))
    }

    #[test]
    fn test_precedence() {
        assert_eq!(
            parse("1 + 2 * 3").unwrap(),
            Expr::Binary {
                op: BinaryOp::Add,
                lhs: num(1.0),
                rhs: Box::new(Expr::Binary {
                    op: BinaryOp::Mul,
                    lhs: num(2.0),
                    rhs: num(3.0),
                }),
            }
        );
    }

    #[test]
    fn test_power_is_right_associative() {
        assert_eq!(
            parse("2 ^ 3 ^ 2").unwrap(),
            Expr::Binary {
                op: BinaryOp::Pow,
                lhs: num(2.0),
                rhs: Box::new(Expr::Binary {
                    op: BinaryOp::Pow,
                    lhs: num(3.0),
                    rhs: num(2.0),
                }),
            }
        );
    }

    #[test]
    fn test_negation_binds_looser_than_power() {
        assert_eq!(
            parse("-2^2").unwrap(),
            Expr::Unary {
                op: UnaryOp::Neg,
                operand: Box::new(Expr::Binary {
                    op: BinaryOp::Pow,
                    lhs: num(2.0),
                    rhs: num(2.0),
                }),
            }
        );
    }

    #[test]
    fn test_implicit_multiplication() {
        assert_eq!(
            parse("2x").unwrap(),
            Expr::Binary {
                op: BinaryOp::Mul,
                lhs: num(2.0),
                rhs: ident("x"),
            }
        );
        // 1/2x divides by the product
        assert_eq!(
            parse("1/2x").unwrap(),
            Expr::Binary {
                op: BinaryOp::Div,
                lhs: num(1.0),
                rhs: Box::new(Expr::Binary {
                    op: BinaryOp::Mul,
                    lhs: num(2.0),
                    rhs: ident("x"),
                }),
            }
        );
    }

    #[test]
    fn test_call_and_index() {
        assert_eq!(
            parse("f(1, x)[2]").unwrap(),
            Expr::Index {
                target: Box::new(Expr::Call {
                    name: "f".to_string(),
                    args: vec![Expr::Number(1.0), Expr::Ident("x".to_string())],
                }),
                indices: vec![Expr::Number(2.0)],
            }
        );
    }

    #[test]
    fn test_matrix_literal_rows() {
        assert_eq!(
            parse("[1, 2; 3, 4]").unwrap(),
            Expr::Matrix(vec![
                vec![Expr::Number(1.0), Expr::Number(2.0)],
                vec![Expr::Number(3.0), Expr::Number(4.0)],
            ])
        );
    }

    #[test]
    fn test_keywords() {
        assert_eq!(
            parse("a and not b").unwrap(),
            Expr::Binary {
                op: BinaryOp::And,
                lhs: ident("a"),
                rhs: Box::new(Expr::Unary {
                    op: UnaryOp::Not,
                    operand: ident("b"),
                }),
            }
        );
    }

    #[test]
    fn test_conditional() {
        assert!(matches!(
            parse("x > 1 ? 10 : 20").unwrap(),
            Expr::Conditional { .. }
        ));
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(parse(""), Err(EvalError::EmptyExpression));
        assert!(matches!(parse("1 +"), Err(EvalError::Parse { .. })));
        assert!(matches!(parse("(1"), Err(EvalError::Parse { .. })));
        assert!(matches!(parse("1 2"), Err(EvalError::Parse { .. })));
    }

    #[test]
    fn test_nesting_limit() {
        let depth = 10_000;
        let deep = format!("{}1{}", "(".repeat(depth), ")".repeat(depth));
        assert_eq!(parse(&deep), Err(EvalError::NestingTooDeep(MAX_NESTING)));

        let brackets = format!("{}1{}", "[".repeat(depth), "]".repeat(depth));
        assert_eq!(parse(&brackets), Err(EvalError::NestingTooDeep(MAX_NESTING)));

        let negations = format!("{}1", "-".repeat(depth));
        assert_eq!(parse(&negations), Err(EvalError::NestingTooDeep(MAX_NESTING)));

        let shallow = format!("{}1{}", "(".repeat(100), ")".repeat(100));
        assert_eq!(parse(&shallow).unwrap(), Expr::Number(1.0));
    }

    #[test]
    fn test_long_chains_are_bounded() {
        // Left-associative chains grow the tree without recursing
        let sum = vec!["1"; 5_000].join(" + ");
        assert_eq!(parse(&sum), Err(EvalError::NestingTooDeep(MAX_NESTING)));

        let factorials = format!("3{}", "!".repeat(5_000));
        assert_eq!(parse(&factorials), Err(EvalError::NestingTooDeep(MAX_NESTING)));

        let short = vec!["1"; 50].join(" + ");
        assert!(parse(&short).is_ok());
    }
}
