//! XML parsing.

use crate::element::Element;
use crate::error::{XmlError, XmlResult};

/// Parses a document into its root element.
///
/// Accepts an optional `<?xml?>` declaration, comments, and a doctype;
/// namespaces, CDATA, and processing instructions beyond the declaration are
/// outside what the legacy protocol emits and are rejected as malformed.
pub fn from_xml(input: &str) -> XmlResult<Element> {
    let mut decoder = Decoder {
        input: input.as_bytes(),
        pos: 0,
    };
    decoder.skip_prolog()?;
    if decoder.at_end() {
        return Err(XmlError::NoRootElement);
    }
    let root = decoder.parse_element()?;
    decoder.skip_misc()?;
    if !decoder.at_end() {
        return Err(XmlError::malformed("content after root element"));
    }
    Ok(root)
}

struct Decoder<'a> {
    input: &'a [u8],
    pos: usize,
}

impl Decoder<'_> {
    fn at_end(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn starts_with(&self, prefix: &str) -> bool {
        self.input[self.pos..].starts_with(prefix.as_bytes())
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(b' ' | b'\t' | b'\r' | b'\n')) {
            self.pos += 1;
        }
    }

    /// Skips everything before the root element.
    fn skip_prolog(&mut self) -> XmlResult<()> {
        loop {
            self.skip_whitespace();
            if self.starts_with("<?") {
                self.skip_until("?>")?;
            } else if self.starts_with("<!--") {
                self.skip_until("-->")?;
            } else if self.starts_with("<!") {
                self.skip_until(">")?;
            } else {
                return Ok(());
            }
        }
    }

    /// Skips whitespace and comments after the root element.
    fn skip_misc(&mut self) -> XmlResult<()> {
        loop {
            self.skip_whitespace();
            if self.starts_with("<!--") {
                self.skip_until("-->")?;
            } else {
                return Ok(());
            }
        }
    }

    fn skip_until(&mut self, terminator: &str) -> XmlResult<()> {
        let remaining = &self.input[self.pos..];
        let found = remaining
            .windows(terminator.len())
            .position(|w| w == terminator.as_bytes())
            .ok_or(XmlError::UnexpectedEof)?;
        self.pos += found + terminator.len();
        Ok(())
    }

    fn expect(&mut self, byte: u8) -> XmlResult<()> {
        match self.peek() {
            Some(b) if b == byte => {
                self.pos += 1;
                Ok(())
            }
            Some(b) => Err(XmlError::malformed(format!(
                "expected '{}', found '{}'",
                byte as char, b as char
            ))),
            None => Err(XmlError::UnexpectedEof),
        }
    }

    fn parse_name(&mut self) -> XmlResult<String> {
        let start = self.pos;
        while let Some(b) = self.peek() {
            if b.is_ascii_alphanumeric() || matches!(b, b'_' | b'-' | b'.' | b':') {
                self.pos += 1;
            } else {
                break;
            }
        }
        if self.pos == start {
            return Err(XmlError::malformed("expected a name"));
        }
        Ok(String::from_utf8_lossy(&self.input[start..self.pos]).into_owned())
    }

    fn parse_element(&mut self) -> XmlResult<Element> {
        self.expect(b'<')?;
        let name = self.parse_name()?;
        let mut element = Element::new(name);

        // Attributes.
        loop {
            self.skip_whitespace();
            match self.peek() {
                Some(b'>') => {
                    self.pos += 1;
                    break;
                }
                Some(b'/') => {
                    self.pos += 1;
                    self.expect(b'>')?;
                    return Ok(element);
                }
                Some(_) => {
                    let attr_name = self.parse_name()?;
                    self.skip_whitespace();
                    self.expect(b'=')?;
                    self.skip_whitespace();
                    let value = self.parse_attribute_value()?;
                    element.attributes.push((attr_name, value));
                }
                None => return Err(XmlError::UnexpectedEof),
            }
        }

        // Content.
        loop {
            if self.starts_with("<!--") {
                self.skip_until("-->")?;
            } else if self.starts_with("</") {
                self.pos += 2;
                let closing = self.parse_name()?;
                if closing != element.name {
                    return Err(XmlError::MismatchedTag {
                        expected: element.name,
                        found: closing,
                    });
                }
                self.skip_whitespace();
                self.expect(b'>')?;
                return Ok(element);
            } else if self.peek() == Some(b'<') {
                element.children.push(self.parse_element()?);
            } else if self.at_end() {
                return Err(XmlError::UnexpectedEof);
            } else {
                let text = self.parse_text()?;
                let trimmed = text.trim();
                if !trimmed.is_empty() {
                    element.text.push_str(trimmed);
                }
            }
        }
    }

    fn parse_attribute_value(&mut self) -> XmlResult<String> {
        let quote = match self.peek() {
            Some(q @ (b'"' | b'\'')) => q,
            Some(_) => return Err(XmlError::malformed("attribute value must be quoted")),
            None => return Err(XmlError::UnexpectedEof),
        };
        self.pos += 1;
        let start = self.pos;
        while let Some(b) = self.peek() {
            if b == quote {
                let raw = String::from_utf8_lossy(&self.input[start..self.pos]).into_owned();
                self.pos += 1;
                return unescape(&raw);
            }
            self.pos += 1;
        }
        Err(XmlError::UnexpectedEof)
    }

    fn parse_text(&mut self) -> XmlResult<String> {
        let start = self.pos;
        while let Some(b) = self.peek() {
            if b == b'<' {
                break;
            }
            self.pos += 1;
        }
        unescape(&String::from_utf8_lossy(&self.input[start..self.pos]))
    }
}

/// Resolves the predefined entities and numeric character references.
fn unescape(raw: &str) -> XmlResult<String> {
    if !raw.contains('&') {
        return Ok(raw.to_string());
    }
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp + 1..];
        let semi = tail.find(';').ok_or(XmlError::UnexpectedEof)?;
        let entity = &tail[..semi];
        match entity {
            "amp" => out.push('&'),
            "lt" => out.push('<'),
            "gt" => out.push('>'),
            "quot" => out.push('"'),
            "apos" => out.push('\''),
            _ if entity.starts_with("#x") || entity.starts_with("#X") => {
                let code = u32::from_str_radix(&entity[2..], 16).map_err(|_| {
                    XmlError::UnknownEntity {
                        entity: entity.to_string(),
                    }
                })?;
                out.push(char::from_u32(code).ok_or_else(|| XmlError::UnknownEntity {
                    entity: entity.to_string(),
                })?);
            }
            _ if entity.starts_with('#') => {
                let code: u32 = entity[1..].parse().map_err(|_| XmlError::UnknownEntity {
                    entity: entity.to_string(),
                })?;
                out.push(char::from_u32(code).ok_or_else(|| XmlError::UnknownEntity {
                    entity: entity.to_string(),
                })?);
            }
            _ => {
                return Err(XmlError::UnknownEntity {
                    entity: entity.to_string(),
                })
            }
        }
        rest = &tail[semi + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn self_closing_root() {
        let el = from_xml("<osm/>").unwrap();
        assert_eq!(el.name, "osm");
        assert!(el.children.is_empty());
    }

    #[test]
    fn declaration_and_nesting() {
        let doc = r#"<?xml version="1.0"?>
            <osm>
                <changeset>
                    <tag k="comment" v="first edit"/>
                </changeset>
            </osm>"#;
        let el = from_xml(doc).unwrap();
        assert_eq!(el.name, "osm");
        let changeset = el.first_child("changeset").unwrap();
        let tag = changeset.first_child("tag").unwrap();
        assert_eq!(tag.attr("k"), Some("comment"));
        assert_eq!(tag.attr("v"), Some("first edit"));
    }

    #[test]
    fn entities_in_attributes_and_text() {
        let el = from_xml("<a name=\"x &amp; y\">1 &lt; 2</a>").unwrap();
        assert_eq!(el.attr("name"), Some("x & y"));
        assert_eq!(el.text, "1 < 2");
    }

    #[test]
    fn numeric_character_references() {
        let el = from_xml("<a v=\"&#65;&#x42;\"/>").unwrap();
        assert_eq!(el.attr("v"), Some("AB"));
    }

    #[test]
    fn mismatched_closing_tag() {
        let err = from_xml("<a><b></a></a>").unwrap_err();
        assert_eq!(
            err,
            XmlError::MismatchedTag {
                expected: "b".into(),
                found: "a".into()
            }
        );
    }

    #[test]
    fn truncated_document() {
        assert_eq!(from_xml("<a><b/>").unwrap_err(), XmlError::UnexpectedEof);
    }

    #[test]
    fn empty_input() {
        assert_eq!(from_xml("  ").unwrap_err(), XmlError::NoRootElement);
    }

    #[test]
    fn unknown_entity_rejected() {
        let err = from_xml("<a>&nbsp;</a>").unwrap_err();
        assert_eq!(
            err,
            XmlError::UnknownEntity {
                entity: "nbsp".into()
            }
        );
    }

    #[test]
    fn comments_are_skipped() {
        let el = from_xml("<!-- head --><a><!-- inner --><b/></a><!-- tail -->").unwrap();
        assert_eq!(el.children.len(), 1);
    }

    #[test]
    fn single_quoted_attributes() {
        let el = from_xml("<a v='ok'/>").unwrap();
        assert_eq!(el.attr("v"), Some("ok"));
    }
}
