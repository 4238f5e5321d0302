//! XML document traits and element helpers shared by every codec.
//!
//! Documents implement [`ToXml`] and, where they can be read back,
//! [`FromXml`]. This keeps the codecs behind one interface for generic code
//! (the pipeline writes any document the same way), while each codec retains
//! its own element layout.

use std::io::{Read, Write};
use std::str::FromStr;

use xmltree::{Element, EmitterConfig, XMLNode};

use crate::{FormatError, Warning};

/// A value that can be written as an XML document.
pub trait ToXml {
    /// Build the root element.
    fn to_element(&self) -> Result<Element, FormatError>;

    /// Serialize the whole document, declaration included.
    fn write_xml<W: Write>(&self, writer: W) -> Result<(), FormatError> {
        write_document(&self.to_element()?, writer)
    }

    /// Serialize into an in-memory string.
    fn to_xml_string(&self) -> Result<String, FormatError> {
        let mut buf = Vec::new();
        self.write_xml(&mut buf)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}

/// A value that can be read back from an XML document.
pub trait FromXml: Sized {
    /// Expected root element name.
    const ROOT: &'static str;

    /// Decode from a parsed root element.
    ///
    /// Recoverable inconsistencies are pushed onto `warnings`; only documents
    /// with nothing usable return `Err`.
    fn from_element(root: &Element, warnings: &mut Vec<Warning>) -> Result<Self, FormatError>;

    fn read_xml<R: Read>(reader: R, warnings: &mut Vec<Warning>) -> Result<Self, FormatError> {
        let root = parse_document(reader, Self::ROOT)?;
        Self::from_element(&root, warnings)
    }
}

/// Write `root` with four-space indentation and an XML declaration.
pub fn write_document<W: Write>(root: &Element, writer: W) -> Result<(), FormatError> {
    let config = EmitterConfig::new()
        .perform_indent(true)
        .indent_string("    ");
    root.write_with_config(writer, config)?;
    Ok(())
}

/// Parse a document and check the root element's name.
pub fn parse_document<R: Read>(reader: R, expected: &'static str) -> Result<Element, FormatError> {
    let root = Element::parse(reader)?;
    if root.name != expected {
        return Err(FormatError::UnexpectedRoot {
            expected,
            found: root.name,
        });
    }
    Ok(root)
}

// ============================================================================
// Element helpers
// ============================================================================

/// Builder and accessor shortcuts on [`Element`].
pub trait ElementExt {
    fn with_attr(self, key: &str, value: impl ToString) -> Self;
    fn with_child(self, child: Element) -> Self;
    fn with_text(self, text: impl Into<String>) -> Self;
    fn push_child(&mut self, child: Element);

    /// Child elements, skipping text and comments.
    fn elements(&self) -> impl Iterator<Item = &Element>;
    fn elements_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element>;

    fn attr_opt(&self, key: &str) -> Option<&str>;
    fn attr(&self, key: &'static str) -> Result<&str, FormatError>;
    fn attr_parse<T: FromStr>(&self, key: &'static str) -> Result<T, FormatError>;
    fn attr_parse_or<T: FromStr>(&self, key: &'static str, default: T) -> Result<T, FormatError>;
}

impl ElementExt for Element {
    fn with_attr(mut self, key: &str, value: impl ToString) -> Self {
        self.attributes.insert(key.to_string(), value.to_string());
        self
    }

    fn with_child(mut self, child: Element) -> Self {
        self.children.push(XMLNode::Element(child));
        self
    }

    fn with_text(mut self, text: impl Into<String>) -> Self {
        self.children.push(XMLNode::Text(text.into()));
        self
    }

    fn push_child(&mut self, child: Element) {
        self.children.push(XMLNode::Element(child));
    }

    fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(XMLNode::as_element)
    }

    fn elements_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> {
        self.elements().filter(move |e| e.name == name)
    }

    fn attr_opt(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    fn attr(&self, key: &'static str) -> Result<&str, FormatError> {
        self.attr_opt(key).ok_or_else(|| FormatError::MissingAttribute {
            element: self.name.clone(),
            attribute: key,
        })
    }

    fn attr_parse<T: FromStr>(&self, key: &'static str) -> Result<T, FormatError> {
        let raw = self.attr(key)?;
        raw.trim().parse().map_err(|_| FormatError::InvalidAttribute {
            element: self.name.clone(),
            attribute: key,
            value: raw.to_string(),
        })
    }

    fn attr_parse_or<T: FromStr>(&self, key: &'static str, default: T) -> Result<T, FormatError> {
        match self.attr_opt(key) {
            Some(_) => self.attr_parse(key),
            None => Ok(default),
        }
    }
}

/// Shorthand for `Element::new`.
pub fn element(name: &str) -> Element {
    Element::new(name)
}

// ============================================================================
// Number formatting
// ============================================================================

/// Geometry values: rounded to 7 decimals, shortest representation.
pub fn fmt_rounded(x: f32) -> String {
    let r = (x as f64 * 1e7).round() / 1e7;
    if r == 0.0 {
        return "0".to_string();
    }
    format!("{}", r)
}

/// Skeleton and physics values: six fixed decimals.
pub fn fmt_fixed(x: f32) -> String {
    format!("{:.6}", x)
}

/// Colour components: six significant digits, trailing zeros trimmed.
pub fn fmt_general(x: f32) -> String {
    let x = x as f64;
    if x == 0.0 {
        return "0".to_string();
    }
    if !x.is_finite() {
        return format!("{}", x);
    }

    let sci = format!("{:.5e}", x);
    let (mantissa, exp) = match sci.split_once('e') {
        Some((m, e)) => (m, e.parse::<i32>().unwrap_or(0)),
        None => return sci,
    };

    if !(-4..6).contains(&exp) {
        let sign = if exp < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", trim_fraction(mantissa), sign, exp.abs())
    } else {
        let decimals = (5 - exp) as usize;
        trim_fraction(&format!("{:.*}", decimals, x)).to_string()
    }
}

fn trim_fraction(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}

/// Space-separated fixed-point triple.
pub fn fmt_fixed3(v: glam::Vec3) -> String {
    format!("{} {} {}", fmt_fixed(v.x), fmt_fixed(v.y), fmt_fixed(v.z))
}
