//! Element tree written in exclusive canonical XML form.
//!
//! The writer emits only what exclusive C14N would: explicit end tags,
//! attributes sorted by name, and each namespace declaration on the first
//! element that visibly uses the prefix within the output subtree.
//! Whitespace is never inserted between elements.

use crate::types::{MD_NS, SAMLP_NS, SAML_NS, XMLDSIG_NS};

/// Namespaces an element can belong to. Each has one fixed prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    /// `saml:` assertion namespace.
    Assertion,
    /// `samlp:` protocol namespace.
    Protocol,
    /// `ds:` XML-DSig namespace.
    XmlDsig,
    /// `md:` metadata namespace.
    Metadata,
}

impl Namespace {
    /// Prefix bound to this namespace.
    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Assertion => "saml",
            Self::Protocol => "samlp",
            Self::XmlDsig => "ds",
            Self::Metadata => "md",
        }
    }

    /// Namespace URI.
    #[must_use]
    pub const fn uri(self) -> &'static str {
        match self {
            Self::Assertion => SAML_NS,
            Self::Protocol => SAMLP_NS,
            Self::XmlDsig => XMLDSIG_NS,
            Self::Metadata => MD_NS,
        }
    }
}

/// Child of an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlNode {
    /// Nested element.
    Element(XmlElement),
    /// Character data.
    Text(String),
}

/// A namespaced element with unprefixed attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlElement {
    namespace: Namespace,
    name: &'static str,
    attributes: Vec<(&'static str, String)>,
    children: Vec<XmlNode>,
}

impl XmlElement {
    /// Creates an empty element.
    #[must_use]
    pub const fn new(namespace: Namespace, name: &'static str) -> Self {
        Self {
            namespace,
            name,
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Sets an attribute, replacing any previous value.
    #[must_use]
    pub fn attr(mut self, name: &'static str, value: impl Into<String>) -> Self {
        let value = value.into();
        match self.attributes.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((name, value)),
        }
        self
    }

    /// Sets an attribute when a value is present.
    #[must_use]
    pub fn attr_opt(self, name: &'static str, value: Option<impl Into<String>>) -> Self {
        match value {
            Some(value) => self.attr(name, value),
            None => self,
        }
    }

    /// Appends a child element.
    #[must_use]
    pub fn child(mut self, child: Self) -> Self {
        self.children.push(XmlNode::Element(child));
        self
    }

    /// Appends character data.
    #[must_use]
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.children.push(XmlNode::Text(text.into()));
        self
    }

    /// Inserts a child element at `index`.
    pub fn insert_child(&mut self, index: usize, child: Self) {
        let index = index.min(self.children.len());
        self.children.insert(index, XmlNode::Element(child));
    }

    /// Local name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Namespace.
    #[must_use]
    pub const fn namespace(&self) -> Namespace {
        self.namespace
    }

    /// Returns an attribute value.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Index of the first child element with the given name.
    #[must_use]
    pub fn position_of(&self, namespace: Namespace, name: &str) -> Option<usize> {
        self.children.iter().position(|node| {
            matches!(node, XmlNode::Element(e) if e.namespace == namespace && e.name == name)
        })
    }

    /// Iterates over child elements.
    pub fn child_elements(&self) -> impl Iterator<Item = &Self> {
        self.children.iter().filter_map(|node| match node {
            XmlNode::Element(e) => Some(e),
            XmlNode::Text(_) => None,
        })
    }

    /// Serializes this element as the apex of a canonical subtree.
    #[must_use]
    pub fn to_canonical_string(&self) -> String {
        let mut out = String::new();
        let mut in_scope = Vec::new();
        self.write_canonical(&mut out, &mut in_scope);
        out
    }

    /// Serializes this element as a standalone document with an XML declaration.
    #[must_use]
    pub fn to_document(&self) -> String {
        let mut out = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        let mut in_scope = Vec::new();
        self.write_canonical(&mut out, &mut in_scope);
        out
    }

    fn write_canonical(&self, out: &mut String, in_scope: &mut Vec<Namespace>) {
        let prefix = self.namespace.prefix();
        let declares = !in_scope.contains(&self.namespace);

        out.push('<');
        out.push_str(prefix);
        out.push(':');
        out.push_str(self.name);

        if declares {
            out.push_str(" xmlns:");
            out.push_str(prefix);
            out.push_str("=\"");
            escape_attribute(self.namespace.uri(), out);
            out.push('"');
            in_scope.push(self.namespace);
        }

        let mut attributes: Vec<&(&'static str, String)> = self.attributes.iter().collect();
        attributes.sort_by(|a, b| a.0.cmp(b.0));
        for (name, value) in attributes {
            out.push(' ');
            out.push_str(name);
            out.push_str("=\"");
            escape_attribute(value, out);
            out.push('"');
        }
        out.push('>');

        for child in &self.children {
            match child {
                XmlNode::Element(e) => e.write_canonical(out, in_scope),
                XmlNode::Text(t) => escape_text(t, out),
            }
        }

        out.push_str("</");
        out.push_str(prefix);
        out.push(':');
        out.push_str(self.name);
        out.push('>');

        if declares {
            in_scope.pop();
        }
    }
}

/// Escapes character data as C14N does.
pub fn escape_text(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\r' => out.push_str("&#xD;"),
            _ => out.push(c),
        }
    }
}

/// Escapes an attribute value as C14N does.
pub fn escape_attribute(value: &str, out: &mut String) {
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '"' => out.push_str("&quot;"),
            '\t' => out.push_str("&#x9;"),
            '\n' => out.push_str("&#xA;"),
            '\r' => out.push_str("&#xD;"),
            _ => out.push(c),
        }
    }
}
