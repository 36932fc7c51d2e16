use super::FilterError;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Ident(String),
    Str(String),
    Number(f64),
    True,
    False,
    None,
    And,
    Or,
    Not,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Minus,
    LParen,
    RParen,
    Eof,
}

pub fn tokenize(input: &str) -> Result<Vec<Token>, FilterError> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = input.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if c.is_whitespace() {
            i += 1;
            continue;
        }

        if c == '"' || c == '\'' {
            let quote = c;
            let start = i;
            i += 1;
            let mut literal = String::new();
            loop {
                match chars.get(i) {
                    None => return Err(FilterError::UnterminatedString(start)),
                    Some(&ch) if ch == quote => break,
                    Some(&'\\') => {
                        let escaped = chars
                            .get(i + 1)
                            .ok_or(FilterError::UnterminatedString(start))?;
                        literal.push(match escaped {
                            'n' => '\n',
                            't' => '\t',
                            other => *other,
                        });
                        i += 2;
                    }
                    Some(&ch) => {
                        literal.push(ch);
                        i += 1;
                    }
                }
            }
            i += 1;
            tokens.push(Token::Str(literal));
            continue;
        }

        if c.is_ascii_digit() || (c == '.' && chars.get(i + 1).is_some_and(|d| d.is_ascii_digit())) {
            let start = i;
            while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.' || chars[i] == '_') {
                i += 1;
            }
            let raw: String = chars[start..i].iter().filter(|c| **c != '_').collect();
            let number = raw
                .parse::<f64>()
                .map_err(|_| FilterError::InvalidNumber(raw.clone()))?;
            tokens.push(Token::Number(number));
            continue;
        }

        if c.is_alphabetic() || c == '_' {
            let start = i;
            while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            let ident: String = chars[start..i].iter().collect();
            let token = match ident.as_str() {
                "and" => Token::And,
                "or" => Token::Or,
                "not" => Token::Not,
                "True" | "true" => Token::True,
                "False" | "false" => Token::False,
                "None" | "none" | "null" => Token::None,
                _ => Token::Ident(ident),
            };
            tokens.push(token);
            continue;
        }

        let next = chars.get(i + 1).copied();
        let (token, width) = match (c, next) {
            ('=', Some('=')) => (Token::Eq, 2),
            ('!', Some('=')) => (Token::Ne, 2),
            ('<', Some('=')) => (Token::Le, 2),
            ('>', Some('=')) => (Token::Ge, 2),
            ('<', _) => (Token::Lt, 1),
            ('>', _) => (Token::Gt, 1),
            ('-', _) => (Token::Minus, 1),
            ('(', _) => (Token::LParen, 1),
            (')', _) => (Token::RParen, 1),
            _ => return Err(FilterError::UnexpectedChar { ch: c, pos: i }),
        };
        tokens.push(token);
        i += width;
    }

    tokens.push(Token::Eof);
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_comparison() {
        let tokens = tokenize("_email == \"ok@test.com\"").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Ident("_email".into()),
                Token::Eq,
                Token::Str("ok@test.com".into()),
                Token::Eof
            ]
        );
    }

    #[test]
    fn test_tokenize_keywords_and_numbers() {
        let tokens = tokenize("not in_liquidation and revenue >= 1_000.5").unwrap();
        assert_eq!(tokens[0], Token::Not);
        assert_eq!(tokens[1], Token::Ident("in_liquidation".into()));
        assert_eq!(tokens[2], Token::And);
        assert_eq!(tokens[4], Token::Ge);
        assert_eq!(tokens[5], Token::Number(1000.5));
    }

    #[test]
    fn test_tokenize_escapes() {
        let tokens = tokenize(r#"'it\'s'"#).unwrap();
        assert_eq!(tokens[0], Token::Str("it's".into()));
    }

    #[test]
    fn test_tokenize_errors() {
        assert!(matches!(
            tokenize("email = 'x'"),
            Err(FilterError::UnexpectedChar { ch: '=', .. })
        ));
        assert!(matches!(
            tokenize("name == 'open"),
            Err(FilterError::UnterminatedString(8))
        ));
        assert!(matches!(tokenize("1.2.3"), Err(FilterError::InvalidNumber(_))));
        assert!(tokenize("__import__('os')").is_ok());
    }
}
