// ABOUTME: Lexer module turning LisPy source text into a token stream

use nom::{
    branch::alt,
    bytes::complete::{tag, tag_no_case, take_while},
    character::complete::{char, digit1, one_of},
    combinator::{opt, recognize, value},
    IResult, Parser,
};

use crate::error::{Error, Result};
use crate::value::Value;

/// A lexical token. Numbers are classified `Int` vs `Float` here so the
/// reader never re-parses text.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Number(Value),
    Str(String),
    Bool(bool),
    Nil,
    Symbol(String),
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Quote,
}

impl Token {
    /// Delimiter spelling used in reader error messages
    pub fn describe(&self) -> String {
        match self {
            Token::Number(v) => v.repr(),
            Token::Str(s) => format!("\"{}\"", s),
            Token::Bool(b) => b.to_string(),
            Token::Nil => "nil".to_string(),
            Token::Symbol(s) => s.clone(),
            Token::LParen => "(".to_string(),
            Token::RParen => ")".to_string(),
            Token::LBracket => "[".to_string(),
            Token::RBracket => "]".to_string(),
            Token::LBrace => "{".to_string(),
            Token::RBrace => "}".to_string(),
            Token::Quote => "'".to_string(),
        }
    }
}

/// Characters that may start a symbol; continuation additionally allows
/// digits. Operator names, keywords (`:foo`), and predicate names (`even?`)
/// are all plain symbols.
const SYMBOL_START: &str = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ_+-*/<=>?!.:";

/// Skip whitespace, commas (treated as whitespace), and `;` line comments
fn skip_trivia(mut input: &str) -> &str {
    loop {
        let trimmed = input.trim_start_matches(|c: char| c.is_whitespace() || c == ',');
        match trimmed.strip_prefix(';') {
            Some(comment) => {
                input = match comment.find('\n') {
                    Some(pos) => &comment[pos + 1..],
                    None => "",
                };
            }
            None => return trimmed,
        }
    }
}

/// Parse a number: optional sign, digits, optional fraction.
/// Handles: 42, -42, +42, 3.14, -3.14, .5, -.5
fn lex_number(input: &str) -> IResult<&str, Token> {
    recognize((
        opt(one_of("+-")),
        alt((
            recognize((digit1, opt((char('.'), digit1)))),
            recognize((char('.'), digit1)),
        )),
    ))
    .map(|num: &str| {
        if num.contains('.') {
            Token::Number(Value::Float(num.parse().unwrap_or(f64::NAN)))
        } else {
            match num.parse::<i64>() {
                Ok(n) => Token::Number(Value::Int(n)),
                // Magnitude beyond i64: degrade to a float
                Err(_) => Token::Number(Value::Float(num.parse().unwrap_or(f64::NAN))),
            }
        }
    })
    .parse(input)
}

/// Succeed only when the next character cannot continue a word, so `true`
/// and `nil` match whole-word (`truex` stays a symbol)
fn word_boundary(input: &str) -> IResult<&str, ()> {
    match input.chars().next() {
        Some(c) if c.is_alphanumeric() || c == '_' => Err(nom::Err::Error(
            nom::error::Error::new(input, nom::error::ErrorKind::Not),
        )),
        _ => Ok((input, ())),
    }
}

/// Parse a boolean: true/false, case-insensitive, whole-word
fn lex_boolean(input: &str) -> IResult<&str, Token> {
    let (input, token) = alt((
        value(Token::Bool(true), tag_no_case("true")),
        value(Token::Bool(false), tag_no_case("false")),
    ))
    .parse(input)?;
    let (input, _) = word_boundary(input)?;
    Ok((input, token))
}

/// Parse nil, whole-word and case-sensitive
fn lex_nil(input: &str) -> IResult<&str, Token> {
    let (input, token) = value(Token::Nil, tag("nil")).parse(input)?;
    let (input, _) = word_boundary(input)?;
    Ok((input, token))
}

/// Parse a symbol
fn lex_symbol(input: &str) -> IResult<&str, Token> {
    let (input, first) = one_of(SYMBOL_START)(input)?;
    let (input, rest) = take_while::<_, _, nom::error::Error<_>>(|c: char| {
        SYMBOL_START.contains(c) || c.is_ascii_digit()
    })(input)?;

    let mut symbol = String::with_capacity(1 + rest.len());
    symbol.push(first);
    symbol.push_str(rest);

    Ok((input, Token::Symbol(symbol)))
}

/// All token alternatives except strings, which need their own escape errors
fn lex_simple(input: &str) -> IResult<&str, Token> {
    alt((
        lex_number,
        lex_boolean,
        lex_nil,
        value(Token::LParen, char('(')),
        value(Token::RParen, char(')')),
        value(Token::LBracket, char('[')),
        value(Token::RBracket, char(']')),
        value(Token::LBrace, char('{')),
        value(Token::RBrace, char('}')),
        value(Token::Quote, char('\'')),
        lex_symbol,
    ))
    .parse(input)
}

/// Parse a double-quoted string. Recognized escapes are exactly
/// `\n`, `\t`, `\"`, `\\`; any other escape is a lexer error.
fn lex_string(input: &str) -> Result<(&str, String)> {
    let mut result = String::new();
    let mut iter = input[1..].char_indices();

    while let Some((i, c)) = iter.next() {
        match c {
            '"' => return Ok((&input[1 + i + 1..], result)),
            '\\' => match iter.next() {
                Some((_, 'n')) => result.push('\n'),
                Some((_, 't')) => result.push('\t'),
                Some((_, '"')) => result.push('"'),
                Some((_, '\\')) => result.push('\\'),
                Some((_, other)) => {
                    return Err(Error::Lexer(format!("Invalid escape sequence: \\{}", other)))
                }
                None => {
                    return Err(Error::Lexer(
                        "Unterminated escape sequence at end of string".to_string(),
                    ))
                }
            },
            other => result.push(other),
        }
    }

    Err(Error::Lexer("Unterminated string literal".to_string()))
}

/// Tokenize a whole source text
pub fn tokenize(source: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut rest = skip_trivia(source);

    while !rest.is_empty() {
        if rest.starts_with('"') {
            let (remaining, s) = lex_string(rest)?;
            tokens.push(Token::Str(s));
            rest = remaining;
        } else {
            match lex_simple(rest) {
                Ok((remaining, token)) => {
                    tokens.push(token);
                    rest = remaining;
                }
                Err(_) => {
                    let position = source.len() - rest.len();
                    let c = rest.chars().next().unwrap_or('\0');
                    return Err(Error::Lexer(format!(
                        "Unexpected character '{}' at position {}",
                        c, position
                    )));
                }
            }
        }
        rest = skip_trivia(rest);
    }

    Ok(tokens)
}
