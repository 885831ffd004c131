//! Lenient scanner for XML start tags.
//!
//! Report parsers only need element names and attributes, so this yields the
//! start (and self-closing) tags of a document in order and skips end tags,
//! comments, processing instructions, declarations and CDATA sections.
//! Tag and attribute names compare case-insensitively.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MarkupError {
    #[error("unterminated {0}")]
    Unterminated(&'static str),

    #[error("malformed attribute in <{0}>")]
    BadAttribute(String),

    #[error("unknown entity '&{0};'")]
    UnknownEntity(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag<'a> {
    pub name: &'a str,
    attrs: Vec<(&'a str, String)>,
}

impl Tag<'_> {
    pub fn is(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }

    /// Decoded value of attribute `name`
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

pub fn start_tags(text: &str) -> Result<Vec<Tag<'_>>, MarkupError> {
    let mut tags = Vec::new();
    let mut rest = text;

    while let Some(lt) = rest.find('<') {
        rest = &rest[lt..];

        let skipped = [
            ("<!--", "-->", "comment"),
            ("<![CDATA[", "]]>", "CDATA section"),
            ("<?", "?>", "processing instruction"),
            ("<!", ">", "declaration"),
            ("</", ">", "end tag"),
        ]
        .into_iter()
        .find(|(open, _, _)| rest.starts_with(open));
        if let Some((_, close, what)) = skipped {
            let end = rest.find(close).ok_or(MarkupError::Unterminated(what))?;
            rest = &rest[end + close.len()..];
            continue;
        }

        // A '<' that cannot open a tag is plain text
        if !rest[1..].starts_with(|c: char| c.is_alphabetic() || c == '_' || c == ':') {
            rest = &rest[1..];
            continue;
        }

        let end = tag_end(rest).ok_or(MarkupError::Unterminated("start tag"))?;
        let inner = rest[1..end].trim_end();
        rest = &rest[end + 1..];

        let inner = inner.strip_suffix('/').unwrap_or(inner);
        let name_end = inner.find(char::is_whitespace).unwrap_or(inner.len());
        let name = &inner[..name_end];
        let attrs = parse_attrs(name, &inner[name_end..])?;
        tags.push(Tag { name, attrs });
    }

    Ok(tags)
}

/// Index of the `>` closing the tag at the start of `s`, ignoring quoted text.
fn tag_end(s: &str) -> Option<usize> {
    let mut quote = None;
    for (i, c) in s.char_indices() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if c == '"' || c == '\'' => quote = Some(c),
            None if c == '>' => return Some(i),
            None => {}
        }
    }
    None
}

fn parse_attrs<'a>(tag: &str, mut s: &'a str) -> Result<Vec<(&'a str, String)>, MarkupError> {
    let bad = || MarkupError::BadAttribute(tag.to_string());
    let mut attrs = Vec::new();

    loop {
        s = s.trim_start();
        if s.is_empty() {
            return Ok(attrs);
        }

        let key_end = s.find(|c: char| c == '=' || c.is_whitespace()).unwrap_or(s.len());
        let key = &s[..key_end];
        if key.is_empty() {
            return Err(bad());
        }
        s = s[key_end..].trim_start();

        let Some(after) = s.strip_prefix('=') else {
            // Valueless attribute
            attrs.push((key, String::new()));
            continue;
        };
        let after = after.trim_start();
        let quote = after.chars().next().filter(|c| *c == '"' || *c == '\'').ok_or_else(bad)?;
        let body = &after[1..];
        let close = body.find(quote).ok_or_else(bad)?;
        attrs.push((key, decode_entities(&body[..close])?));
        s = &body[close + 1..];
    }
}

fn decode_entities(raw: &str) -> Result<String, MarkupError> {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;

    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp + 1..];
        let semi = tail.find(';').ok_or(MarkupError::Unterminated("entity"))?;
        let entity = &tail[..semi];
        let decoded = match entity {
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            _ => entity
                .strip_prefix("#x")
                .or_else(|| entity.strip_prefix("#X"))
                .map(|hex| u32::from_str_radix(hex, 16))
                .or_else(|| entity.strip_prefix('#').map(str::parse::<u32>))
                .and_then(|code| code.ok())
                .and_then(char::from_u32),
        };
        out.push(decoded.ok_or_else(|| MarkupError::UnknownEntity(entity.to_string()))?);
        rest = &tail[semi + 1..];
    }

    out.push_str(rest);
    Ok(out)
}
