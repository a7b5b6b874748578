//! String form of tag trees ("SNBT").
//!
//! The parser is lenient and accepts every dialect a supported host has
//! ever produced (index-prefixed list elements, either quote character,
//! trailing commas, typed arrays). The writer emits exactly one dialect,
//! chosen per host revision, so `parse(write(t)) == t` for every dialect.

use crate::error::NbtError;
use crate::nbt::{Compound, Tag};

/// How a host revision prints tag trees.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnbtDialect {
    /// `[0:a,1:b]` lists, double-quoted strings.
    IndexedLists,
    /// `[a,b]` lists, double-quoted strings.
    Plain,
    /// Plain lists; a string whose first quote character is `"` is wrapped
    /// in single quotes instead.
    SmartQuotes,
}

// ---------------------------------------------------------------------------
// Writer
// ---------------------------------------------------------------------------

pub fn write(tag: &Tag, dialect: SnbtDialect) -> String {
    let mut out = String::new();
    write_tag(&mut out, tag, dialect);
    out
}

pub fn write_compound(compound: &Compound, dialect: SnbtDialect) -> String {
    let mut out = String::new();
    write_compound_into(&mut out, compound, dialect);
    out
}

fn write_tag(out: &mut String, tag: &Tag, dialect: SnbtDialect) {
    use std::fmt::Write as _;

    // write! into a String cannot fail.
    let _ = match tag {
        Tag::Byte(v) => write!(out, "{}b", v),
        Tag::Short(v) => write!(out, "{}s", v),
        Tag::Int(v) => write!(out, "{}", v),
        Tag::Long(v) => write!(out, "{}L", v),
        Tag::Float(v) => write!(out, "{}f", v),
        Tag::Double(v) => write!(out, "{}d", v),
        Tag::String(s) => {
            write_quoted(out, s, dialect);
            Ok(())
        }
        Tag::Compound(c) => {
            write_compound_into(out, c, dialect);
            Ok(())
        }
        Tag::List(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                if dialect == SnbtDialect::IndexedLists {
                    let _ = write!(out, "{}:", i);
                }
                write_tag(out, item, dialect);
            }
            out.push(']');
            Ok(())
        }
        Tag::ByteArray(values) => write_array(out, 'B', values.iter().map(|v| format!("{}b", v))),
        Tag::IntArray(values) => write_array(out, 'I', values.iter().map(|v| v.to_string())),
        Tag::LongArray(values) => write_array(out, 'L', values.iter().map(|v| format!("{}L", v))),
    };
}

fn write_array(
    out: &mut String,
    prefix: char,
    items: impl Iterator<Item = String>,
) -> std::fmt::Result {
    out.push('[');
    out.push(prefix);
    out.push(';');
    for (i, item) in items.enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(&item);
    }
    out.push(']');
    Ok(())
}

fn write_compound_into(out: &mut String, compound: &Compound, dialect: SnbtDialect) {
    out.push('{');
    for (i, (key, value)) in compound.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        if is_bare_key(key) {
            out.push_str(key);
        } else {
            write_quoted(out, key, dialect);
        }
        out.push(':');
        write_tag(out, value, dialect);
    }
    out.push('}');
}

fn is_bare_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'_' | b'-' | b'.' | b'+')
}

fn is_bare_key(key: &str) -> bool {
    !key.is_empty() && key.bytes().all(is_bare_char)
}

fn write_quoted(out: &mut String, s: &str, dialect: SnbtDialect) {
    let mut quote = match dialect {
        SnbtDialect::SmartQuotes => None,
        SnbtDialect::IndexedLists | SnbtDialect::Plain => Some('"'),
    };
    let mut body = String::with_capacity(s.len());
    for c in s.chars() {
        if c == '\\' {
            body.push('\\');
        } else if c == '"' || c == '\'' {
            if quote.is_none() {
                quote = Some(if c == '"' { '\'' } else { '"' });
            }
            if quote == Some(c) {
                body.push('\\');
            }
        }
        body.push(c);
    }
    let q = quote.unwrap_or('"');
    out.push(q);
    out.push_str(&body);
    out.push(q);
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

/// Parse a single tag value; the whole input must be consumed.
pub fn parse(input: &str) -> Result<Tag, NbtError> {
    let mut reader = Reader {
        src: input,
        pos: 0,
        depth: 0,
    };
    let tag = reader.value()?;
    reader.skip_ws();
    if reader.pos < input.len() {
        return Err(NbtError::TrailingData {
            position: reader.pos,
        });
    }
    Ok(tag)
}

/// Parse an input that must be a compound.
pub fn parse_compound(input: &str) -> Result<Compound, NbtError> {
    match parse(input)? {
        Tag::Compound(c) => Ok(c),
        other => Err(NbtError::NotACompound(other.kind())),
    }
}

/// Deepest compound/list nesting the host accepts.
pub const MAX_DEPTH: usize = 512;

struct Reader<'a> {
    src: &'a str,
    pos: usize,
    depth: usize,
}

impl<'a> Reader<'a> {
    fn peek(&self) -> Option<u8> {
        self.src.as_bytes().get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.src.as_bytes().get(self.pos + offset).copied()
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(b' ' | b'\t' | b'\n' | b'\r')) {
            self.pos += 1;
        }
    }

    fn unexpected(&self, expected: &'static str) -> NbtError {
        match self.src[self.pos..].chars().next() {
            Some(found) => NbtError::UnexpectedChar {
                found,
                position: self.pos,
                expected,
            },
            None => NbtError::UnexpectedEnd { expected },
        }
    }

    fn expect(&mut self, byte: u8, expected: &'static str) -> Result<(), NbtError> {
        self.skip_ws();
        if self.peek() == Some(byte) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.unexpected(expected))
        }
    }

    fn value(&mut self) -> Result<Tag, NbtError> {
        self.skip_ws();
        match self.peek() {
            Some(b'{') => self.nested(|r| r.compound().map(Tag::Compound)),
            Some(b'[') => self.nested(Self::list_or_array),
            Some(b'"' | b'\'') => self.quoted().map(Tag::String),
            Some(_) => {
                let literal = self.bare();
                if literal.is_empty() {
                    return Err(self.unexpected("value"));
                }
                Ok(classify_literal(literal))
            }
            None => Err(NbtError::UnexpectedEnd { expected: "value" }),
        }
    }

    fn nested(
        &mut self,
        read: impl FnOnce(&mut Self) -> Result<Tag, NbtError>,
    ) -> Result<Tag, NbtError> {
        if self.depth >= MAX_DEPTH {
            return Err(NbtError::TooDeep {
                position: self.pos,
                limit: MAX_DEPTH,
            });
        }
        self.depth += 1;
        let tag = read(self);
        self.depth -= 1;
        tag
    }

    fn compound(&mut self) -> Result<Compound, NbtError> {
        self.expect(b'{', "'{'")?;
        let mut compound = Compound::new();
        loop {
            self.skip_ws();
            if self.peek() == Some(b'}') {
                self.pos += 1;
                return Ok(compound);
            }
            let key = match self.peek() {
                Some(b'"' | b'\'') => self.quoted()?,
                _ => {
                    let key = self.bare();
                    if key.is_empty() {
                        return Err(self.unexpected("key"));
                    }
                    key.to_string()
                }
            };
            self.expect(b':', "':'")?;
            let value = self.value()?;
            compound.insert(key, value);

            self.skip_ws();
            match self.peek() {
                Some(b',') => self.pos += 1,
                Some(b'}') => {
                    self.pos += 1;
                    return Ok(compound);
                }
                _ => return Err(self.unexpected("',' or '}'")),
            }
        }
    }

    fn list_or_array(&mut self) -> Result<Tag, NbtError> {
        let start = self.pos;
        self.expect(b'[', "'['")?;
        if let (Some(kind @ (b'B' | b'I' | b'L')), Some(b';')) = (self.peek(), self.peek_at(1)) {
            self.pos += 2;
            return self.typed_array(kind);
        }

        let mut items: Vec<Tag> = Vec::new();
        loop {
            self.skip_ws();
            if self.peek() == Some(b']') {
                self.pos += 1;
                break;
            }
            self.skip_list_index();
            let item = self.value()?;
            if let Some(first) = items.first() {
                if first.kind() != item.kind() {
                    return Err(NbtError::MixedList { position: start });
                }
            }
            items.push(item);

            self.skip_ws();
            match self.peek() {
                Some(b',') => self.pos += 1,
                Some(b']') => {
                    self.pos += 1;
                    break;
                }
                _ => return Err(self.unexpected("',' or ']'")),
            }
        }
        Ok(Tag::List(items))
    }

    /// Legacy hosts print list elements as `index:value`.
    fn skip_list_index(&mut self) {
        let mut end = self.pos;
        while self.src.as_bytes().get(end).is_some_and(u8::is_ascii_digit) {
            end += 1;
        }
        if end > self.pos && self.src.as_bytes().get(end) == Some(&b':') {
            self.pos = end + 1;
        }
    }

    fn typed_array(&mut self, kind: u8) -> Result<Tag, NbtError> {
        let mut literals = Vec::new();
        loop {
            self.skip_ws();
            if self.peek() == Some(b']') {
                self.pos += 1;
                break;
            }
            let literal = self.bare();
            if literal.is_empty() {
                return Err(self.unexpected("array element"));
            }
            literals.push(literal);
            self.skip_ws();
            match self.peek() {
                Some(b',') => self.pos += 1,
                Some(b']') => {
                    self.pos += 1;
                    break;
                }
                _ => return Err(self.unexpected("',' or ']'")),
            }
        }

        let invalid = |kind: &'static str, literal: &str| NbtError::InvalidArrayElement {
            kind,
            literal: literal.to_string(),
        };
        match kind {
            b'B' => literals
                .iter()
                .map(|l| {
                    strip_suffix(l, 'b')
                        .parse::<i8>()
                        .map_err(|_| invalid("byte", l))
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Tag::ByteArray),
            b'I' => literals
                .iter()
                .map(|l| l.parse::<i32>().map_err(|_| invalid("int", l)))
                .collect::<Result<Vec<_>, _>>()
                .map(Tag::IntArray),
            _ => literals
                .iter()
                .map(|l| {
                    strip_suffix(l, 'l')
                        .parse::<i64>()
                        .map_err(|_| invalid("long", l))
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Tag::LongArray),
        }
    }

    fn bare(&mut self) -> &'a str {
        let start = self.pos;
        while self.peek().is_some_and(is_bare_char) {
            self.pos += 1;
        }
        &self.src[start..self.pos]
    }

    fn quoted(&mut self) -> Result<String, NbtError> {
        let quote = match self.peek() {
            Some(q @ (b'"' | b'\'')) => q as char,
            _ => return Err(self.unexpected("quote")),
        };
        self.pos += 1;
        let mut out = String::new();
        let mut chars = self.src[self.pos..].char_indices();
        while let Some((offset, c)) = chars.next() {
            if c == '\\' {
                match chars.next() {
                    Some((_, escaped)) => out.push(escaped),
                    None => break,
                }
            } else if c == quote {
                self.pos += offset + 1;
                return Ok(out);
            } else {
                out.push(c);
            }
        }
        self.pos = self.src.len();
        Err(NbtError::UnexpectedEnd {
            expected: "closing quote",
        })
    }
}

fn strip_suffix(literal: &str, suffix: char) -> &str {
    literal
        .strip_suffix(suffix)
        .or_else(|| literal.strip_suffix(suffix.to_ascii_uppercase()))
        .unwrap_or(literal)
}

fn looks_numeric(s: &str) -> bool {
    s.bytes().any(|b| b.is_ascii_digit())
        && s.bytes()
            .all(|b| b.is_ascii_digit() || matches!(b, b'+' | b'-' | b'.' | b'e' | b'E'))
}

fn looks_integral(s: &str) -> bool {
    let digits = s.strip_prefix(|c| c == '+' || c == '-').unwrap_or(s);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

/// Turn an unquoted literal into a typed tag. Anything that does not parse
/// as a number of its suffix's type stays a string, as hosts do.
fn classify_literal(literal: &str) -> Tag {
    match literal {
        "true" => return Tag::Byte(1),
        "false" => return Tag::Byte(0),
        _ => {}
    }

    let (body, suffix) = match literal.char_indices().last() {
        Some((i, c)) if c.is_ascii_alphabetic() => (&literal[..i], Some(c.to_ascii_lowercase())),
        _ => (literal, None),
    };

    let parsed = match suffix {
        Some('b') if looks_integral(body) => body.parse().ok().map(Tag::Byte),
        Some('s') if looks_integral(body) => body.parse().ok().map(Tag::Short),
        Some('l') if looks_integral(body) => body.parse().ok().map(Tag::Long),
        Some('f') if looks_numeric(body) => body.parse().ok().map(Tag::Float),
        Some('d') if looks_numeric(body) => body.parse().ok().map(Tag::Double),
        None if looks_integral(body) => body.parse().ok().map(Tag::Int),
        None if looks_numeric(body) && body.contains('.') => body.parse().ok().map(Tag::Double),
        _ => None,
    };
    parsed.unwrap_or_else(|| Tag::String(literal.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literals_follow_suffixes() {
        assert_eq!(classify_literal("3b"), Tag::Byte(3));
        assert_eq!(classify_literal("-7s"), Tag::Short(-7));
        assert_eq!(classify_literal("42"), Tag::Int(42));
        assert_eq!(classify_literal("9L"), Tag::Long(9));
        assert_eq!(classify_literal("1.5f"), Tag::Float(1.5));
        assert_eq!(classify_literal("2d"), Tag::Double(2.0));
        assert_eq!(classify_literal("0.25"), Tag::Double(0.25));
        assert_eq!(classify_literal("true"), Tag::Byte(1));
    }

    #[test]
    fn non_numbers_stay_strings() {
        assert_eq!(classify_literal("beef"), Tag::from("beef"));
        assert_eq!(classify_literal("300b"), Tag::from("300b"));
        assert_eq!(classify_literal("99999999999"), Tag::from("99999999999"));
        assert_eq!(classify_literal("1.2.3"), Tag::from("1.2.3"));
    }

    #[test]
    fn smart_quotes_pick_the_other_quote() {
        let mut out = String::new();
        write_quoted(&mut out, "say \"hi\"", SnbtDialect::SmartQuotes);
        assert_eq!(out, "'say \"hi\"'");

        let mut out = String::new();
        write_quoted(&mut out, "it's \"x\"", SnbtDialect::SmartQuotes);
        assert_eq!(out, "\"it's \\\"x\\\"\"");
    }
}
