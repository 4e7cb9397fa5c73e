//! # Template Parser
//!
//! Hand-written lexer and recursive-descent parser for the mapping template
//! language. Output is an immutable [`Template`] tree.

use super::MappingError;
use std::fmt;

/// A parsed mapping template
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    pub nodes: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Literal text copied verbatim
    Text(String),
    /// `{{ expr }}`
    Action(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// `.`
    Root,
    /// `<target>.name`
    Field { target: Box<Expr>, name: String },
    /// `index <target> <key>...`
    Index { target: Box<Expr>, keys: Vec<Expr> },
    Literal(Literal),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Literal {
    Str(String),
    Int(i64),
}

impl Expr {
    fn fmt_operand(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index { .. } => write!(f, "({self})"),
            _ => write!(f, "{self}"),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Root => f.write_str("."),
            Self::Field { target, name } => match target.as_ref() {
                Self::Root => write!(f, ".{name}"),
                Self::Field { .. } => write!(f, "{target}.{name}"),
                _ => write!(f, "({target}).{name}"),
            },
            Self::Index { target, keys } => {
                f.write_str("index ")?;
                target.fmt_operand(f)?;
                for key in keys {
                    f.write_str(" ")?;
                    key.fmt_operand(f)?;
                }
                Ok(())
            }
            Self::Literal(Literal::Str(s)) => write!(f, "{s:?}"),
            Self::Literal(Literal::Int(i)) => write!(f, "{i}"),
        }
    }
}

impl std::str::FromStr for Template {
    type Err = MappingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Template {
    /// Parse template source
    pub fn parse(src: &str) -> Result<Self, MappingError> {
        let mut nodes = Vec::new();
        let mut pos = 0;
        let mut trim_next = false;

        while let Some(rel) = src[pos..].find("{{") {
            let open = pos + rel;
            let mut text = &src[pos..open];
            if trim_next {
                text = text.trim_start();
            }

            let mut action_start = open + 2;
            let after = &src[action_start..];
            if after.starts_with('-') && after[1..].starts_with(|c: char| c.is_ascii_whitespace()) {
                text = text.trim_end();
                action_start += 1;
            }
            push_text(&mut nodes, text);

            if src[action_start..].trim_start().starts_with("/*") {
                let (end, trim) = skip_comment(src, action_start)?;
                pos = end;
                trim_next = trim;
                continue;
            }

            let (tokens, end, trim) = lex_action(src, action_start)?;
            let expr = Parser::new(tokens, open).action()?;
            nodes.push(Node::Action(expr));
            pos = end;
            trim_next = trim;
        }

        let mut text = &src[pos..];
        if trim_next {
            text = text.trim_start();
        }
        push_text(&mut nodes, text);
        Ok(Self { nodes })
    }
}

fn push_text(nodes: &mut Vec<Node>, text: &str) {
    if !text.is_empty() {
        nodes.push(Node::Text(text.to_string()));
    }
}

fn parse_error(offset: usize, message: impl Into<String>) -> MappingError {
    MappingError::Parse {
        offset,
        message: message.into(),
    }
}

/// `{{/* ... */}}`, returns the offset after the closing braces
fn skip_comment(src: &str, start: usize) -> Result<(usize, bool), MappingError> {
    let body = &src[start..];
    let close = body
        .find("*/")
        .ok_or_else(|| parse_error(start, "unclosed comment"))?;
    let rest = &body[close + 2..];
    if rest.starts_with("}}") {
        Ok((start + close + 4, false))
    } else if rest.starts_with(" -}}") {
        Ok((start + close + 6, true))
    } else {
        Err(parse_error(start + close + 2, "comment ends before closing delimiter"))
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Dot,
    Field(String),
    Ident(String),
    Str(String),
    Int(i64),
    LParen,
    RParen,
}

#[derive(Debug)]
struct Spanned {
    token: Token,
    offset: usize,
    /// Whitespace precedes the token
    spaced: bool,
}

fn ident_len(s: &str) -> usize {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        _ => return 0,
    }
    s.char_indices()
        .find(|(_, c)| !(c.is_alphanumeric() || *c == '_'))
        .map_or(s.len(), |(i, _)| i)
}

/// Lex one action up to its closing delimiter
///
/// Returns the tokens, the offset after `}}` and whether the right side trims.
fn lex_action(src: &str, start: usize) -> Result<(Vec<Spanned>, usize, bool), MappingError> {
    let bytes = src.as_bytes();
    let mut tokens = Vec::new();
    let mut pos = start;

    loop {
        let ws_start = pos;
        while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
            pos += 1;
        }
        let spaced = pos > ws_start;
        let rest = &src[pos..];
        if rest.is_empty() {
            return Err(parse_error(start, "unclosed action"));
        }
        if rest.starts_with("}}") {
            return Ok((tokens, pos + 2, false));
        }
        if spaced && rest.starts_with("-}}") {
            return Ok((tokens, pos + 3, true));
        }

        let offset = pos;
        let token = match bytes[pos] {
            b'(' => {
                pos += 1;
                Token::LParen
            }
            b')' => {
                pos += 1;
                Token::RParen
            }
            b'.' => {
                let len = ident_len(&rest[1..]);
                pos += 1 + len;
                if len == 0 {
                    Token::Dot
                } else {
                    Token::Field(rest[1..=len].to_string())
                }
            }
            b'"' => {
                let (value, used) = lex_quoted(rest, offset)?;
                pos += used;
                Token::Str(value)
            }
            b'`' => {
                let close = rest[1..]
                    .find('`')
                    .ok_or_else(|| parse_error(offset, "unterminated raw string"))?;
                pos += close + 2;
                Token::Str(rest[1..=close].to_string())
            }
            b'-' | b'0'..=b'9' => {
                let len = rest[1..]
                    .find(|c: char| !c.is_ascii_digit())
                    .map_or(rest.len(), |i| i + 1);
                let value = rest[..len]
                    .parse::<i64>()
                    .map_err(|e| parse_error(offset, format!("bad number '{}': {e}", &rest[..len])))?;
                pos += len;
                Token::Int(value)
            }
            _ => {
                let len = ident_len(rest);
                if len == 0 {
                    let c = rest.chars().next().unwrap_or_default();
                    return Err(parse_error(offset, format!("unexpected character '{c}'")));
                }
                pos += len;
                Token::Ident(rest[..len].to_string())
            }
        };
        tokens.push(Spanned {
            token,
            offset,
            spaced,
        });
    }
}

/// Lex a double-quoted string, returning its value and byte length
fn lex_quoted(rest: &str, offset: usize) -> Result<(String, usize), MappingError> {
    let mut value = String::new();
    let mut chars = rest.char_indices().skip(1);
    while let Some((i, c)) = chars.next() {
        match c {
            '"' => return Ok((value, i + 1)),
            '\\' => {
                let (_, escaped) = chars
                    .next()
                    .ok_or_else(|| parse_error(offset, "unterminated quoted string"))?;
                value.push(match escaped {
                    'n' => '\n',
                    't' => '\t',
                    'r' => '\r',
                    '0' => '\0',
                    '"' | '\\' | '\'' => escaped,
                    other => {
                        return Err(parse_error(offset + i, format!("unknown escape '\\{other}'")))
                    }
                });
            }
            '\n' => return Err(parse_error(offset, "newline in quoted string")),
            _ => value.push(c),
        }
    }
    Err(parse_error(offset, "unterminated quoted string"))
}

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
    /// Offset of the action's opening delimiter
    open: usize,
}

impl Parser {
    fn new(tokens: Vec<Spanned>, open: usize) -> Self {
        Self {
            tokens,
            pos: 0,
            open,
        }
    }

    fn peek(&self) -> Option<&Spanned> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<&Spanned> {
        let token = self.tokens.get(self.pos);
        self.pos += 1;
        token
    }

    fn current_offset(&self) -> usize {
        self.peek().map_or(self.open, |t| t.offset)
    }

    fn action(mut self) -> Result<Expr, MappingError> {
        if self.tokens.is_empty() {
            return Err(parse_error(self.open, "missing value for action"));
        }
        let expr = self.command()?;
        match self.peek() {
            None => Ok(expr),
            Some(extra) => Err(parse_error(
                extra.offset,
                format!("unexpected {:?} after expression", extra.token),
            )),
        }
    }

    fn command(&mut self) -> Result<Expr, MappingError> {
        match self.peek().map(|t| &t.token) {
            Some(Token::Ident(name)) if name == "index" => {
                self.pos += 1;
                let mut operands = Vec::new();
                while self.at_operand() {
                    operands.push(self.operand()?);
                }
                if operands.is_empty() {
                    return Err(parse_error(self.current_offset(), "index needs arguments"));
                }
                // A literal first argument means the target was omitted
                let target = if matches!(operands[0], Expr::Literal(_)) {
                    Expr::Root
                } else {
                    operands.remove(0)
                };
                Ok(Expr::Index {
                    target: Box::new(target),
                    keys: operands,
                })
            }
            Some(Token::Ident(name)) => Err(parse_error(
                self.current_offset(),
                format!("function \"{name}\" not defined"),
            )),
            _ => self.operand(),
        }
    }

    fn at_operand(&self) -> bool {
        matches!(
            self.peek().map(|t| &t.token),
            Some(Token::Dot | Token::Field(_) | Token::Str(_) | Token::Int(_) | Token::LParen)
        )
    }

    fn operand(&mut self) -> Result<Expr, MappingError> {
        let offset = self.current_offset();
        let token = self.next().map(|t| t.token.clone());
        let mut expr = match token {
            Some(Token::Dot) => Expr::Root,
            Some(Token::Field(name)) => Expr::Field {
                target: Box::new(Expr::Root),
                name,
            },
            Some(Token::Str(s)) => Expr::Literal(Literal::Str(s)),
            Some(Token::Int(i)) => Expr::Literal(Literal::Int(i)),
            Some(Token::LParen) => {
                let inner = self.command()?;
                match self.next().map(|t| &t.token) {
                    Some(Token::RParen) => inner,
                    _ => return Err(parse_error(offset, "unclosed left paren")),
                }
            }
            Some(other) => return Err(parse_error(offset, format!("unexpected {other:?}"))),
            None => return Err(parse_error(offset, "unexpected end of action")),
        };

        // `.a.b` chains are lexed as adjacent field tokens
        while let Some(Spanned {
            token: Token::Field(name),
            spaced: false,
            ..
        }) = self.peek()
        {
            expr = Expr::Field {
                target: Box::new(expr),
                name: name.clone(),
            };
            self.pos += 1;
        }
        Ok(expr)
    }
}
