//! Minimal lenient XML element reader.
//!
//! Reads just enough XML for the phyloXML subset: nested elements,
//! attributes, text content and the five predefined entities. Prologs,
//! comments, doctypes and processing instructions are skipped. Malformed
//! or truncated input yields whatever partial element tree was built —
//! the phyloXML parser treats "nothing usable" as its no-data signal, so
//! this reader never fails either.

use crate::parser::CharScanner;

// =#========================================================================#=
// XML ELEMENT
// =#========================================================================#=
/// One parsed XML element: name, attributes, child elements and
/// (concatenated) text content.
#[derive(Debug, Clone, Default)]
pub(crate) struct XmlElement {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlElement>,
    pub text: String,
}

impl XmlElement {
    /// Returns the value of an attribute, if present.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(attr, _)| attr == name)
            .map(|(_, value)| value.as_str())
    }

    /// Returns the first child element with the given name.
    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Iterates over all child elements with the given name.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlElement> {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Returns the trimmed text content of the first child element with
    /// the given name.
    pub fn child_text(&self, name: &str) -> Option<&str> {
        self.child(name).map(|c| c.text.trim())
    }

    /// Returns the first element with the given name in this element's
    /// subtree (depth-first), including the element itself.
    pub fn find(&self, name: &str) -> Option<&XmlElement> {
        if self.name == name {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(name))
    }
}

// ============================================================================
// Parsing
// ============================================================================
/// Parses a document and returns its root element, or `None` if no
/// element could be read at all.
pub(crate) fn parse_document(input: &str) -> Option<XmlElement> {
    let mut scanner = CharScanner::new(input);
    skip_misc(&mut scanner);
    parse_element(&mut scanner)
}

/// Skips whitespace, prologs, comments and doctype declarations.
fn skip_misc(scanner: &mut CharScanner) {
    loop {
        scanner.skip_whitespace();
        if scanner.starts_with("<?") {
            scanner.consume_through("?>");
        } else if scanner.starts_with("<!--") {
            scanner.consume_through("-->");
        } else if scanner.starts_with("<!") {
            scanner.consume_through(">");
        } else {
            break;
        }
    }
}

/// Parses one element starting at `<`.
fn parse_element(scanner: &mut CharScanner) -> Option<XmlElement> {
    if !scanner.consume_if('<') {
        return None;
    }
    let name = read_name(scanner);
    if name.is_empty() {
        return None;
    }
    let mut element = XmlElement {
        name,
        ..XmlElement::default()
    };

    // Attributes up to '>' or '/>'
    loop {
        scanner.skip_whitespace();
        match scanner.peek() {
            Some('/') => {
                scanner.next();
                scanner.consume_if('>');
                return Some(element);
            }
            Some('>') => {
                scanner.next();
                break;
            }
            Some(_) => {
                let attr = read_name(scanner);
                if attr.is_empty() {
                    scanner.next();
                    continue;
                }
                scanner.skip_whitespace();
                let value = if scanner.consume_if('=') {
                    scanner.skip_whitespace();
                    match scanner.peek() {
                        Some(quote @ ('"' | '\'')) => {
                            scanner.next();
                            let v = scanner.take_until(quote);
                            scanner.next();
                            v
                        }
                        _ => read_name(scanner),
                    }
                } else {
                    String::new()
                };
                element.attributes.push((attr, decode_entities(&value)));
            }
            None => return Some(element),
        }
    }

    // Content up to the closing tag
    loop {
        match scanner.peek() {
            None => break,
            Some('<') => {
                if scanner.starts_with("</") {
                    // Lenient: any close tag ends the current element.
                    scanner.consume_through(">");
                    break;
                } else if scanner.starts_with("<!--") {
                    scanner.consume_through("-->");
                } else if scanner.starts_with("<?") || scanner.starts_with("<!") {
                    scanner.consume_through(">");
                } else if let Some(child) = parse_element(scanner) {
                    element.children.push(child);
                } else {
                    scanner.next();
                }
            }
            Some(_) => {
                let text = scanner.take_until('<');
                element.text.push_str(&decode_entities(&text));
            }
        }
    }
    Some(element)
}

/// Collects an XML name (letters, digits, `_`, `-`, `.`, `:`).
fn read_name(scanner: &mut CharScanner) -> String {
    scanner.take_while(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | ':'))
}

/// Decodes the five predefined entities. `&amp;` last, so entity-encoded
/// ampersand sequences are not double-decoded.
fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
