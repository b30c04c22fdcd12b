//! XML serialization.

use crate::element::Element;

/// Serializes an element tree without an XML declaration.
#[must_use]
pub fn to_xml(root: &Element) -> String {
    let mut out = String::new();
    write_element(&mut out, root);
    out
}

/// Serializes an element tree with a leading `<?xml?>` declaration.
#[must_use]
pub fn to_xml_document(root: &Element) -> String {
    let mut out = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>");
    write_element(&mut out, root);
    out
}

fn write_element(out: &mut String, element: &Element) {
    out.push('<');
    out.push_str(&element.name);
    for (name, value) in &element.attributes {
        out.push(' ');
        out.push_str(name);
        out.push_str("=\"");
        escape_into(out, value);
        out.push('"');
    }

    if element.children.is_empty() && element.text.is_empty() {
        out.push_str("/>");
        return;
    }

    out.push('>');
    escape_into(out, &element.text);
    for child in &element.children {
        write_element(out, child);
    }
    out.push_str("</");
    out.push_str(&element.name);
    out.push('>');
}

/// Escapes the five predefined entities.
fn escape_into(out: &mut String, raw: &str) {
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            other => out.push(other),
        }
    }
}
