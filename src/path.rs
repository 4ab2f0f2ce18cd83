use std::borrow::Cow;
use std::fmt;

use crate::error::{PathError, SyntaxFault};
use crate::value::{Key, Namespace, Value};

#[derive(Clone, Debug, PartialEq)]
pub enum PathSegment {
    Attr(String),
    Item(Key),
}

/// A parsed `name.attr[0]['key']` expression.
#[derive(Clone, Debug, PartialEq)]
pub struct PathExpr {
    pub root: String,
    pub segments: Vec<PathSegment>,
}

pub fn resolve<'a>(path: &str, namespace: &'a Namespace) -> Result<Cow<'a, Value>, PathError> {
    PathExpr::parse(path)?.evaluate(namespace)
}

impl PathExpr {
    pub fn parse(path: &str) -> Result<Self, PathError> {
        let mut cursor = Cursor::new(path);
        cursor.skip_whitespace();
        let root = cursor
            .read_ident()
            .ok_or(PathError::Syntax(SyntaxFault::InvalidStart))?;
        let mut segments = Vec::new();
        loop {
            cursor.skip_whitespace();
            let Some(ch) = cursor.peek() else {
                break;
            };
            match ch {
                '.' => {
                    cursor.bump();
                    cursor.skip_whitespace();
                    let ident = cursor.read_ident().ok_or(SyntaxFault::InvalidAttribute)?;
                    segments.push(PathSegment::Attr(ident));
                }
                '[' => {
                    cursor.bump();
                    cursor.skip_whitespace();
                    let key = match cursor.peek() {
                        None => return Err(SyntaxFault::MissingBracket.into()),
                        Some(quote @ ('\'' | '"')) => {
                            cursor.bump();
                            Key::Str(cursor.read_quoted(quote)?)
                        }
                        Some(_) => Key::Int(cursor.read_int()?),
                    };
                    cursor.skip_whitespace();
                    if cursor.peek() != Some(']') {
                        return Err(SyntaxFault::MissingBracket.into());
                    }
                    cursor.bump();
                    segments.push(PathSegment::Item(key));
                }
                _ => return Err(SyntaxFault::InvalidCharacter.into()),
            }
        }
        Ok(Self { root, segments })
    }

    pub fn evaluate<'a>(&self, namespace: &'a Namespace) -> Result<Cow<'a, Value>, PathError> {
        let mut current = namespace
            .get(&self.root)
            .map(Cow::Borrowed)
            .ok_or(PathError::NameNotFound)?;
        for segment in &self.segments {
            current = step(current, segment).map_err(PathError::Lookup)?;
        }
        Ok(current)
    }

    pub fn with_attr(&self, name: impl Into<String>) -> Self {
        let mut child = self.clone();
        child.segments.push(PathSegment::Attr(name.into()));
        child
    }

    pub fn with_key(&self, key: Key) -> Self {
        let mut child = self.clone();
        child.segments.push(PathSegment::Item(key));
        child
    }
}

impl fmt::Display for PathExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.root)?;
        for segment in &self.segments {
            match segment {
                PathSegment::Attr(name) => write!(f, ".{name}")?,
                PathSegment::Item(Key::Int(index)) => write!(f, "[{index}]")?,
                PathSegment::Item(Key::Str(key)) => {
                    let escaped = key.replace('\\', "\\\\").replace('\'', "\\'");
                    write!(f, "['{escaped}']")?
                }
            }
        }
        Ok(())
    }
}

fn step<'a>(current: Cow<'a, Value>, segment: &PathSegment) -> Result<Cow<'a, Value>, String> {
    match current {
        Cow::Borrowed(value) => apply(value, segment),
        Cow::Owned(value) => apply(&value, segment).map(|next| Cow::Owned(next.into_owned())),
    }
}

fn apply<'v>(value: &'v Value, segment: &PathSegment) -> Result<Cow<'v, Value>, String> {
    match segment {
        PathSegment::Attr(name) => value.attr(name),
        PathSegment::Item(key) => value.item(key),
    }
}

struct Cursor {
    chars: Vec<char>,
    pos: usize,
}

impl Cursor {
    fn new(text: &str) -> Self {
        Self {
            chars: text.chars().collect(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) {
        self.pos += 1;
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn read_ident(&mut self) -> Option<String> {
        let start = self.pos;
        match self.peek() {
            Some(ch) if ch.is_ascii_alphabetic() || ch == '_' => self.pos += 1,
            _ => return None,
        }
        while self
            .peek()
            .is_some_and(|ch| ch.is_ascii_alphanumeric() || ch == '_')
        {
            self.pos += 1;
        }
        Some(self.chars[start..self.pos].iter().collect())
    }

    /// Reads up to the closing `quote`; the opening quote is already consumed.
    fn read_quoted(&mut self, quote: char) -> Result<String, SyntaxFault> {
        let mut buf = String::new();
        while let Some(ch) = self.peek() {
            if ch == '\\' {
                if let Some(escaped) = self.chars.get(self.pos + 1) {
                    buf.push(*escaped);
                    self.pos += 2;
                    continue;
                }
            }
            if ch == quote {
                self.bump();
                return Ok(buf);
            }
            buf.push(ch);
            self.bump();
        }
        Err(SyntaxFault::UnterminatedKey)
    }

    fn read_int(&mut self) -> Result<i64, SyntaxFault> {
        let start = self.pos;
        if self.peek() == Some('-') {
            self.bump();
        }
        let digits_start = self.pos;
        while self.peek().is_some_and(|ch| ch.is_ascii_digit()) {
            self.bump();
        }
        if self.pos == digits_start {
            return Err(SyntaxFault::InvalidIndex);
        }
        let literal: String = self.chars[start..self.pos].iter().collect();
        literal.parse().map_err(|_| SyntaxFault::InvalidIndex)
    }
}
