//! Expression tokenizer

use crate::error::{EvalError, EvalResult};

/// A lexical token
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Number(f64),
    Ident(String),
    Str(String),
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Caret,
    Bang,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Semicolon,
    Question,
    Colon,
    EqEq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    AndAnd,
    OrOr,
}

/// Token with its byte offset in the source
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub pos: usize,
}

/// Returns true for characters that may start an identifier
pub fn is_ident_start(ch: char) -> bool {
    ch.is_ascii_alphabetic() || ch == '_'
}

/// Returns true for characters that may continue an identifier
pub fn is_ident_continue(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_'
}

/// Words the parser gives meaning to; they cannot be bound as names
pub const RESERVED_WORDS: &[&str] = &["and", "false", "mod", "not", "or", "true"];

pub fn is_reserved(word: &str) -> bool {
    RESERVED_WORDS.contains(&word)
}

/// Splits an expression into tokens
pub fn tokenize(source: &str) -> EvalResult<Vec<Spanned>> {
    let chars: Vec<(usize, char)> = source.char_indices().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let (pos, ch) = chars[i];
        let next = chars.get(i + 1).map(|(_, c)| *c);

        if ch.is_whitespace() {
            i += 1;
            continue;
        }

        if ch.is_ascii_digit() || (ch == '.' && next.is_some_and(|c| c.is_ascii_digit())) {
            let (token, consumed) = lex_number(source, &chars[i..])?;
            tokens.push(Spanned { token, pos });
            i += consumed;
            continue;
        }

        if is_ident_start(ch) {
            let start = i;
            while i < chars.len() && is_ident_continue(chars[i].1) {
                i += 1;
            }
            let ident: String = chars[start..i].iter().map(|(_, c)| *c).collect();
            tokens.push(Spanned {
                token: Token::Ident(ident),
                pos,
            });
            continue;
        }

        if ch == '"' {
            let mut text = String::new();
            i += 1;
            loop {
                match chars.get(i) {
                    None => return Err(EvalError::UnterminatedString(pos)),
                    Some((_, '"')) => break,
                    Some((_, '\\')) => {
                        match chars.get(i + 1).map(|(_, c)| *c) {
                            Some('n') => text.push('\n'),
                            Some('t') => text.push('\t'),
                            Some(other) => text.push(other),
                            None => return Err(EvalError::UnterminatedString(pos)),
                        }
                        i += 2;
                    }
                    Some((_, c)) => {
                        text.push(*c);
                        i += 1;
                    }
                }
            }
            i += 1;
            tokens.push(Spanned {
                token: Token::Str(text),
                pos,
            });
            continue;
        }

        let (token, width) = match (ch, next) {
            ('=', Some('=')) => (Token::EqEq, 2),
            ('!', Some('=')) => (Token::NotEq, 2),
            ('<', Some('=')) => (Token::Le, 2),
            ('>', Some('=')) => (Token::Ge, 2),
            ('&', Some('&')) => (Token::AndAnd, 2),
            ('|', Some('|')) => (Token::OrOr, 2),
            ('+', _) => (Token::Plus, 1),
            ('-', _) => (Token::Minus, 1),
            ('*', _) => (Token::Star, 1),
            ('/', _) => (Token::Slash, 1),
            ('%', _) => (Token::Percent, 1),
            ('^', _) => (Token::Caret, 1),
            ('!', _) => (Token::Bang, 1),
            ('(', _) => (Token::LParen, 1),
            (')', _) => (Token::RParen, 1),
            ('[', _) => (Token::LBracket, 1),
            (']', _) => (Token::RBracket, 1),
            (',', _) => (Token::Comma, 1),
            (';', _) => (Token::Semicolon, 1),
            ('?', _) => (Token::Question, 1),
            (':', _) => (Token::Colon, 1),
            ('<', _) => (Token::Lt, 1),
            ('>', _) => (Token::Gt, 1),
            _ => return Err(EvalError::UnexpectedChar { ch, pos }),
        };
        tokens.push(Spanned { token, pos });
        i += width;
    }

    Ok(tokens)
}

/// Lexes a number starting at `chars[0]`; returns the token and the number
/// of chars consumed
fn lex_number(source: &str, chars: &[(usize, char)]) -> EvalResult<(Token, usize)> {
    let digit_at = |idx: usize| chars.get(idx).is_some_and(|(_, c)| c.is_ascii_digit());
    let mut i = 0;

    while digit_at(i) {
        i += 1;
    }
    if chars.get(i).is_some_and(|(_, c)| *c == '.') {
        i += 1;
        while digit_at(i) {
            i += 1;
        }
    }
    // An exponent needs digits after it; otherwise `2e` is 2 times the constant e
    if chars.get(i).is_some_and(|(_, c)| *c == 'e' || *c == 'E') {
        let sign = chars.get(i + 1).is_some_and(|(_, c)| *c == '+' || *c == '-');
        let first_digit = if sign { i + 2 } else { i + 1 };
        if digit_at(first_digit) {
            i = first_digit;
            while digit_at(i) {
                i += 1;
            }
        }
    }

    let start = chars[0].0;
    let end = chars.get(i).map(|(p, _)| *p).unwrap_or(source.len());
    let text = &source[start..end];
    let value: f64 = text
        .parse()
        .map_err(|_| EvalError::InvalidNumber(text.to_string()))?;
    Ok((Token::Number(value), i))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<Token> {
        tokenize(source)
            .unwrap()
            .into_iter()
            .map(|s| s.token)
            .collect()
    }

    #[test]
    fn test_numbers() {
        assert_eq!(kinds("42"), vec![Token::Number(42.0)]);
        assert_eq!(kinds("1.5e3"), vec![Token::Number(1500.0)]);
        assert_eq!(kinds(".5"), vec![Token::Number(0.5)]);
        assert_eq!(kinds("2.5e-1"), vec![Token::Number(0.25)]);
    }

    #[test]
    fn test_number_followed_by_constant_e() {
        assert_eq!(
            kinds("2e"),
            vec![Token::Number(2.0), Token::Ident("e".to_string())]
        );
    }

    #[test]
    fn test_operators() {
        assert_eq!(
            kinds("a >= b != c && !d"),
            vec![
                Token::Ident("a".to_string()),
                Token::Ge,
                Token::Ident("b".to_string()),
                Token::NotEq,
                Token::Ident("c".to_string()),
                Token::AndAnd,
                Token::Bang,
                Token::Ident("d".to_string()),
            ]
        );
    }

    #[test]
    fn test_string_literal() {
        assert_eq!(
            kinds(r#""a=>b" "q\"x""#),
            vec![Token::Str("a=>b".to_string()), Token::Str("q\"x".to_string())]
        );
    }

    #[test]
    fn test_unterminated_string() {
        assert_eq!(tokenize("\"abc"), Err(EvalError::UnterminatedString(0)));
    }

    #[test]
    fn test_single_equals_is_rejected() {
        assert_eq!(
            tokenize("a = 1"),
            Err(EvalError::UnexpectedChar { ch: '=', pos: 2 })
        );
    }

    #[test]
    fn test_positions() {
        let tokens = tokenize("x + 10").unwrap();
        assert_eq!(tokens[0].pos, 0);
        assert_eq!(tokens[1].pos, 2);
        assert_eq!(tokens[2].pos, 4);
    }
}
