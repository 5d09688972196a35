use crate::errors::{QueryError, Result};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    Ident(String),
    Integer(i64),
    Str(String),
    Param(String),
    Comma,
    Dot,
    LParen,
    RParen,
    Minus,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Token {
    /// Case-insensitive keyword match
    pub(crate) fn is_keyword(&self, keyword: &str) -> bool {
        matches!(self, Token::Ident(s) if s.eq_ignore_ascii_case(keyword))
    }
}

/// A token and the byte offset it starts at
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Spanned {
    pub token: Token,
    pub pos: usize,
}

fn syntax(position: usize, reason: impl Into<String>) -> QueryError {
    QueryError::Syntax {
        position,
        reason: reason.into(),
    }
}

pub(crate) fn tokenize(text: &str) -> Result<Vec<Spanned>> {
    let mut tokens = Vec::new();
    let mut chars = text.char_indices().peekable();

    while let Some(&(pos, c)) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }

        let token = if c.is_ascii_alphabetic() || c == '_' {
            let mut ident = String::new();
            while let Some(&(_, c)) = chars.peek() {
                if !(c.is_ascii_alphanumeric() || c == '_') {
                    break;
                }
                ident.push(c);
                chars.next();
            }
            Token::Ident(ident)
        } else if c.is_ascii_digit() {
            let mut digits = String::new();
            while let Some(&(_, c)) = chars.peek() {
                if !c.is_ascii_digit() {
                    break;
                }
                digits.push(c);
                chars.next();
            }
            let value = digits
                .parse::<i64>()
                .map_err(|_| syntax(pos, format!("integer {} out of range", digits)))?;
            Token::Integer(value)
        } else if c == '\'' {
            chars.next();
            let mut s = String::new();
            loop {
                match chars.next() {
                    Some((_, '\'')) => {
                        if matches!(chars.peek(), Some((_, '\''))) {
                            s.push('\'');
                            chars.next();
                        } else {
                            break;
                        }
                    }
                    Some((_, c)) => s.push(c),
                    None => return Err(syntax(pos, "unterminated string literal").into()),
                }
            }
            Token::Str(s)
        } else if c == ':' {
            chars.next();
            let mut name = String::new();
            while let Some(&(_, c)) = chars.peek() {
                if !(c.is_ascii_alphanumeric() || c == '_') {
                    break;
                }
                name.push(c);
                chars.next();
            }
            if name.is_empty() {
                return Err(syntax(pos, "expected parameter name after ':'").into());
            }
            Token::Param(name)
        } else {
            chars.next();
            match c {
                ',' => Token::Comma,
                '.' => Token::Dot,
                '(' => Token::LParen,
                ')' => Token::RParen,
                '-' => Token::Minus,
                '=' => Token::Eq,
                '!' if matches!(chars.peek(), Some((_, '='))) => {
                    chars.next();
                    Token::Ne
                }
                '<' => match chars.peek() {
                    Some((_, '=')) => {
                        chars.next();
                        Token::Le
                    }
                    Some((_, '>')) => {
                        chars.next();
                        Token::Ne
                    }
                    _ => Token::Lt,
                },
                '>' => match chars.peek() {
                    Some((_, '=')) => {
                        chars.next();
                        Token::Ge
                    }
                    _ => Token::Gt,
                },
                other => {
                    return Err(syntax(pos, format!("unexpected character '{}'", other)).into())
                }
            }
        };
        tokens.push(Spanned { token, pos });
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(text: &str) -> Vec<Token> {
        tokenize(text).unwrap().into_iter().map(|s| s.token).collect()
    }

    #[test]
    fn test_operators() {
        assert_eq!(
            kinds("<> != <= >= < > ="),
            vec![Token::Ne, Token::Ne, Token::Le, Token::Ge, Token::Lt, Token::Gt, Token::Eq]
        );
    }

    #[test]
    fn test_string_with_doubled_quote() {
        assert_eq!(kinds("'o''neil'"), vec![Token::Str("o'neil".to_string())]);
    }

    #[test]
    fn test_param_and_path() {
        assert_eq!(
            kinds("m.username = :name"),
            vec![
                Token::Ident("m".to_string()),
                Token::Dot,
                Token::Ident("username".to_string()),
                Token::Eq,
                Token::Param("name".to_string()),
            ]
        );
    }

    #[test]
    fn test_positions() {
        let tokens = tokenize("select  m").unwrap();
        assert_eq!(tokens[1].pos, 8);
    }

    #[test]
    fn test_unterminated_string() {
        let err = tokenize("where m.username = 'abc").unwrap_err();
        assert_eq!(err.kind(), crate::errors::ExErrorKind::InvalidQuery);
    }

    #[test]
    fn test_keywords_are_case_insensitive() {
        let tokens = kinds("SeLeCt");
        assert!(tokens[0].is_keyword("select"));
    }
}
