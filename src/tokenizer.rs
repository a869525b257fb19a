//! Lexical analysis: turns WACC source text into a vector of tokens.
//!
//! Multi-character punctuators are matched before single-character ones.
//! Comments run from `#` to the end of the line and are dropped here, as is
//! whitespace.

use crate::error::{CompileError, CompileResult};

/// Kinds of tokens recognised by the front-end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
  Punctuator,
  Keyword,
  Ident,
  Num,
  Char,
  Str,
  Eof,
}

pub const KEYWORDS: &[&str] = &[
  "begin", "end", "is", "skip", "read", "free", "return", "exit", "print", "println", "if",
  "then", "else", "fi", "while", "do", "done", "call", "fst", "snd", "newpair", "null", "true",
  "false", "int", "bool", "char", "string", "pair", "len", "ord", "chr",
];

const PUNCTUATORS: &[&str] = &[
  "==", "!=", "<=", ">=", "&&", "||", "+", "-", "*", "/", "%", "(", ")", "[", "]", ",", ";", "=",
  "<", ">", "!",
];

/// Thin wrapper for lexical information needed by later stages.
#[derive(Debug, Clone)]
pub struct Token {
  pub kind: TokenKind,
  pub value: Option<i64>,
  /// Decoded contents of a character or string literal.
  pub literal: Option<String>,
  pub loc: usize,
  pub len: usize,
}

impl Token {
  pub fn new(kind: TokenKind, loc: usize, len: usize) -> Self {
    Self {
      kind,
      value: None,
      literal: None,
      loc,
      len,
    }
  }
}

/// Lex the input into a flat vector of tokens terminated by an `Eof` marker.
pub fn tokenize(input: &str) -> CompileResult<Vec<Token>> {
  let mut tokens = Vec::new();
  let bytes = input.as_bytes();
  let mut i = 0;

  while i < bytes.len() {
    let c = bytes[i];
    if c.is_ascii_whitespace() {
      i += 1;
      continue;
    }

    if c == b'#' {
      while i < bytes.len() && bytes[i] != b'\n' {
        i += 1;
      }
      continue;
    }

    if c.is_ascii_digit() {
      let start = i;
      while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
      }
      let value = input[start..i].parse::<i64>().map_err(|err| {
        CompileError::at(input, start, format!("invalid integer literal: {err}"))
      })?;
      let mut token = Token::new(TokenKind::Num, start, i - start);
      token.value = Some(value);
      tokens.push(token);
      continue;
    }

    if c.is_ascii_alphabetic() || c == b'_' {
      let start = i;
      while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
        i += 1;
      }
      let kind = if KEYWORDS.contains(&&input[start..i]) {
        TokenKind::Keyword
      } else {
        TokenKind::Ident
      };
      tokens.push(Token::new(kind, start, i - start));
      continue;
    }

    if c == b'\'' || c == b'"' {
      let (token, end) = read_quoted(input, i)?;
      tokens.push(token);
      i = end;
      continue;
    }

    if let Some(op) = PUNCTUATORS
      .iter()
      .find(|op| input[i..].starts_with(**op))
    {
      tokens.push(Token::new(TokenKind::Punctuator, i, op.len()));
      i += op.len();
      continue;
    }

    let invalid_char = input[i..].chars().next().unwrap_or('\0');
    return Err(CompileError::at(
      input,
      i,
      format!("invalid token: '{invalid_char}'"),
    ));
  }

  tokens.push(Token::new(TokenKind::Eof, input.len(), 0));
  Ok(tokens)
}

/// Read a character or string literal starting at the opening quote. Returns
/// the token and the offset just past the closing quote.
fn read_quoted(input: &str, start: usize) -> CompileResult<(Token, usize)> {
  let quote = input.as_bytes()[start] as char;
  let mut decoded = String::new();
  let mut chars = input[start + 1..].char_indices();

  let end = loop {
    let Some((offset, c)) = chars.next() else {
      return Err(CompileError::at(input, start, "unterminated literal"));
    };
    let at = start + 1 + offset;
    match c {
      c if c == quote => break at + 1,
      '\\' => {
        let Some((_, escaped)) = chars.next() else {
          return Err(CompileError::at(input, at, "unterminated escape sequence"));
        };
        decoded.push(unescape(escaped).ok_or_else(|| {
          CompileError::at(input, at, format!("unknown escape sequence '\\{escaped}'"))
        })?);
      }
      '\n' => return Err(CompileError::at(input, at, "newline inside literal")),
      '\'' | '"' => {
        return Err(CompileError::at(input, at, format!("unescaped {c} inside literal")));
      }
      c if !c.is_ascii() => {
        return Err(CompileError::at(input, at, format!("non-ASCII character '{c}'")));
      }
      c => decoded.push(c),
    }
  };

  let kind = if quote == '\'' {
    if decoded.chars().count() != 1 {
      return Err(CompileError::at(
        input,
        start,
        "character literal must contain exactly one character",
      ));
    }
    TokenKind::Char
  } else {
    TokenKind::Str
  };
  let mut token = Token::new(kind, start, end - start);
  token.literal = Some(decoded);
  Ok((token, end))
}

fn unescape(c: char) -> Option<char> {
  Some(match c {
    '0' => '\0',
    'b' => '\u{8}',
    't' => '\t',
    'n' => '\n',
    'f' => '\u{c}',
    'r' => '\r',
    '"' => '"',
    '\'' => '\'',
    '\\' => '\\',
    _ => return None,
  })
}

/// Return the slice from the source that produced this token.
pub fn token_text<'a>(token: &Token, source: &'a str) -> &'a str {
  let end = token.loc + token.len;
  &source[token.loc..end]
}

/// Human-friendly description used in diagnostics.
pub fn describe_token(token: Option<&Token>, source: &str) -> String {
  match token {
    Some(t) => match t.kind {
      TokenKind::Eof => "EOF".to_string(),
      _ => token_text(t, source).to_string(),
    },
    None => "EOF".to_string(),
  }
}
