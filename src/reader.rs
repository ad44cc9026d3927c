// ABOUTME: Reader module turning token streams into Value ASTs (code is data)

use crate::error::{Error, Result};
use crate::lexer::Token;
use crate::value::{Map, MapKey, Value};

/// Parse exactly one top-level form; unconsumed tokens are a parse error.
pub fn parse(tokens: &[Token]) -> Result<Value> {
    if tokens.is_empty() {
        return Err(Error::Parse(
            "Unexpected end of input: No tokens to parse".to_string(),
        ));
    }

    let mut reader = Reader { tokens, pos: 0 };
    let form = reader.parse_form()?;

    if reader.pos < tokens.len() {
        let extra: Vec<String> = tokens[reader.pos..]
            .iter()
            .map(Token::describe)
            .collect();
        return Err(Error::Parse(format!(
            "Unexpected tokens at end of input: {}",
            extra.join(" ")
        )));
    }

    Ok(form)
}

/// Parse every top-level form until the tokens are exhausted. The CLI and
/// the module loader drive whole files through this.
pub fn parse_all(tokens: &[Token]) -> Result<Vec<Value>> {
    let mut reader = Reader { tokens, pos: 0 };
    let mut forms = Vec::new();

    while reader.pos < tokens.len() {
        forms.push(reader.parse_form()?);
    }

    Ok(forms)
}

struct Reader<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<&'a Token> {
        let token = self.tokens.get(self.pos);
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn parse_form(&mut self) -> Result<Value> {
        let token = self.peek().ok_or_else(|| {
            Error::Parse("Unexpected end of input while parsing form".to_string())
        })?;

        match token {
            Token::LParen => self.parse_list(),
            Token::LBracket => self.parse_vector(),
            Token::LBrace => self.parse_map(),
            Token::Quote => {
                self.advance();
                if self.peek().is_none() {
                    return Err(Error::Parse(
                        "'quote' shorthand ' must be followed by an expression".to_string(),
                    ));
                }
                let quoted = self.parse_form()?;
                Ok(Value::List(vec![
                    Value::Symbol("quote".to_string()),
                    quoted,
                ]))
            }
            _ => self.parse_atom(),
        }
    }

    fn parse_atom(&mut self) -> Result<Value> {
        // parse_form has already peeked, so the token exists
        let token = self.advance().ok_or_else(|| {
            Error::Parse("Unexpected end of input while parsing form".to_string())
        })?;

        match token {
            Token::Number(v) => Ok(v.clone()),
            Token::Str(s) => Ok(Value::Str(s.clone())),
            Token::Bool(b) => Ok(Value::Bool(*b)),
            Token::Nil => Ok(Value::Nil),
            Token::Symbol(s) => Ok(Value::Symbol(s.clone())),
            other => Err(Error::Parse(format!(
                "Unexpected token during parsing: {}",
                other.describe()
            ))),
        }
    }

    fn parse_list(&mut self) -> Result<Value> {
        self.advance(); // consume '('
        let mut items = Vec::new();

        loop {
            match self.peek() {
                Some(Token::RParen) => {
                    self.advance();
                    return Ok(Value::List(items));
                }
                Some(_) => items.push(self.parse_form()?),
                None => {
                    return Err(Error::Parse(
                        "Unexpected end of input: missing ')' while parsing list".to_string(),
                    ))
                }
            }
        }
    }

    fn parse_vector(&mut self) -> Result<Value> {
        self.advance(); // consume '['
        let mut items = Vec::new();

        loop {
            match self.peek() {
                Some(Token::RBracket) => {
                    self.advance();
                    return Ok(Value::Vector(items));
                }
                Some(_) => items.push(self.parse_form()?),
                None => {
                    return Err(Error::Parse(
                        "Unexpected end of input: missing ']' while parsing vector".to_string(),
                    ))
                }
            }
        }
    }

    fn parse_map(&mut self) -> Result<Value> {
        self.advance(); // consume '{'
        let mut map = Map::new_literal();

        loop {
            match self.peek() {
                Some(Token::RBrace) => {
                    self.advance();
                    return Ok(Value::Map(map));
                }
                Some(token) => {
                    // Keys are restricted to atoms the lexer can classify
                    if !matches!(
                        token,
                        Token::Symbol(_)
                            | Token::Str(_)
                            | Token::Number(_)
                            | Token::Bool(_)
                            | Token::Nil
                    ) {
                        return Err(Error::Parse(format!(
                            "Map key must be a symbol, string, number, boolean, or nil, got {}",
                            token.describe()
                        )));
                    }

                    let key_form = self.parse_form()?;
                    let key = MapKey::try_from(&key_form)
                        .map_err(|_| Error::Parse("Map key is not hashable".to_string()))?;

                    match self.peek() {
                        Some(Token::RBrace) => {
                            return Err(Error::Parse(format!(
                                "Map literals require an even number of forms \
                                 (key-value pairs), missing value for key: {}",
                                key_form.repr()
                            )))
                        }
                        Some(_) => {
                            let value = self.parse_form()?;
                            map.insert(key, value);
                        }
                        None => {
                            return Err(Error::Parse(format!(
                                "Unexpected end of input: map literal requires a value for key: {}",
                                key_form.repr()
                            )))
                        }
                    }
                }
                None => {
                    return Err(Error::Parse(
                        "Unexpected end of input: missing '}' while parsing map".to_string(),
                    ))
                }
            }
        }
    }
}
