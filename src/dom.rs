//! Parsed XML trees.
//!
//! [`XmlDocument`] owns a libxml2 document; [`XmlNode`] is a borrowed, copyable
//! handle into it that can serve as an XPath context node. Nodes never outlive the
//! document they were taken from.

use std::fmt;
use std::io::Write;
use std::marker::PhantomData;
use std::path::Path;
use std::str::FromStr;

use libc::{c_char, c_int};
use serde::Serialize;
use url::Url;

use crate::error::{ConformanceError, LibXml2Error, Result};
use crate::libxml2::{self as ffi, ErrorCapture};

/// Parser settings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseOptions {
    /// Process XInclude directives without leaving `xml:base` fixups or
    /// include marker nodes behind.
    pub xinclude: bool,
}

impl ParseOptions {
    pub fn with_xinclude() -> Self {
        Self { xinclude: true }
    }

    fn flags(&self) -> c_int {
        if self.xinclude {
            ffi::XML_PARSE_XINCLUDE | ffi::XML_PARSE_NOBASEFIX | ffi::XML_PARSE_NOXINCNODE
        } else {
            0
        }
    }
}

/// An owned, parsed XML document
pub struct XmlDocument {
    ptr: *mut ffi::XmlDoc,
    base_uri: Option<String>,
}

// A document is only ever touched by the thread that currently owns it.
unsafe impl Send for XmlDocument {}

impl XmlDocument {
    /// Parse XML text that has no base URI.
    pub fn parse_str(text: &str) -> Result<Self> {
        Self::parse_bytes(text.as_bytes(), None, ParseOptions::default())
    }

    /// Parse raw bytes. The base URI, if given, anchors relative references
    /// (XInclude `href`s among them) and is reported by [`base_uri`](Self::base_uri).
    pub fn parse_bytes(bytes: &[u8], base_uri: Option<&str>, options: ParseOptions) -> Result<Self> {
        let size = c_int::try_from(bytes.len())
            .map_err(|_| LibXml2Error::InputTooLarge { size: bytes.len() })?;
        let c_base = base_uri.map(ffi::to_c_string).transpose()?;
        let uri_label = base_uri.unwrap_or("<memory>").to_string();

        let capture = ErrorCapture::start();
        let ptr = unsafe {
            ffi::xmlReadMemory(
                bytes.as_ptr() as *const c_char,
                size,
                c_base.as_ref().map_or(std::ptr::null(), |c| c.as_ptr()),
                std::ptr::null(),
                options.flags(),
            )
        };

        if ptr.is_null() {
            let collector = capture.finish();
            return Err(ConformanceError::XmlParse {
                uri: uri_label,
                details: failure_details(&collector.report()),
            });
        }

        let document = XmlDocument {
            ptr,
            base_uri: base_uri.map(str::to_string),
        };

        if options.xinclude {
            let substitutions = unsafe { ffi::xmlXIncludeProcessFlags(ptr, options.flags()) };
            if substitutions < 0 {
                let collector = capture.finish();
                return Err(ConformanceError::XmlParse {
                    uri: uri_label,
                    details: failure_details(&collector.report()),
                });
            }
            log::debug!("{}: {} XInclude substitution(s)", uri_label, substitutions);
        }

        let collector = capture.finish();
        for warning in collector.records() {
            log::debug!("{}: {}", uri_label, warning);
        }
        Ok(document)
    }

    /// Parse a local file, using its `file:` URL as base URI.
    pub fn parse_file(path: &Path, options: ParseOptions) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        let absolute = std::fs::canonicalize(path)?;
        let base = Url::from_file_path(&absolute).map_err(|_| {
            ConformanceError::InvalidArgument(format!(
                "Cannot express {} as a file URI",
                absolute.display()
            ))
        })?;
        Self::parse_bytes(&bytes, Some(base.as_str()), options)
    }

    /// The URI the document was resolved from, if any
    pub fn base_uri(&self) -> Option<&str> {
        self.base_uri.as_deref()
    }

    /// The document node itself
    pub fn as_node(&self) -> XmlNode<'_> {
        XmlNode {
            ptr: self.ptr as *mut ffi::XmlNode,
            _doc: PhantomData,
        }
    }

    pub fn root_element(&self) -> Option<XmlNode<'_>> {
        let root = unsafe { ffi::xmlDocGetRootElement(self.ptr) };
        unsafe { XmlNode::from_raw(root) }
    }

    /// Serialize without an XML declaration.
    pub fn to_xml_string(&self) -> Result<String> {
        self.as_node().to_xml_string()
    }

    pub(crate) fn as_ptr(&self) -> *mut ffi::XmlDoc {
        self.ptr
    }
}

impl Drop for XmlDocument {
    fn drop(&mut self) {
        if !self.ptr.is_null() {
            unsafe { ffi::xmlFreeDoc(self.ptr) };
        }
    }
}

impl fmt::Debug for XmlDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("XmlDocument")
            .field("base_uri", &self.base_uri)
            .field("root", &self.root_element().map(|r| r.node_name()))
            .finish()
    }
}

fn failure_details(report: &str) -> String {
    if report.is_empty() {
        "document could not be parsed".to_string()
    } else {
        report.to_string()
    }
}

/// Kind of a tree node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeKind {
    Element,
    Attribute,
    Text,
    CData,
    ProcessingInstruction,
    Comment,
    Document,
    Namespace,
    Other(i32),
}

impl NodeKind {
    pub(crate) fn from_raw(node_type: c_int) -> Self {
        match node_type {
            ffi::XML_ELEMENT_NODE => NodeKind::Element,
            ffi::XML_ATTRIBUTE_NODE => NodeKind::Attribute,
            ffi::XML_TEXT_NODE => NodeKind::Text,
            ffi::XML_CDATA_SECTION_NODE => NodeKind::CData,
            ffi::XML_PI_NODE => NodeKind::ProcessingInstruction,
            ffi::XML_COMMENT_NODE => NodeKind::Comment,
            ffi::XML_DOCUMENT_NODE => NodeKind::Document,
            ffi::XML_NAMESPACE_DECL => NodeKind::Namespace,
            other => NodeKind::Other(other),
        }
    }

    fn has_namespace(&self) -> bool {
        matches!(self, NodeKind::Element | NodeKind::Attribute)
    }
}

/// Namespace name plus local part.
///
/// An empty namespace name means "no namespace". Displayed in Clark notation
/// (`{uri}local`), and parsed from it too.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct QualifiedName {
    namespace_uri: String,
    local_name: String,
}

impl QualifiedName {
    pub fn new(namespace_uri: impl Into<String>, local_name: impl Into<String>) -> Self {
        Self {
            namespace_uri: namespace_uri.into(),
            local_name: local_name.into(),
        }
    }

    /// A name in no namespace
    pub fn local(local_name: impl Into<String>) -> Self {
        Self::new("", local_name)
    }

    pub fn namespace_uri(&self) -> &str {
        &self.namespace_uri
    }

    pub fn local_name(&self) -> &str {
        &self.local_name
    }

    /// Match with `*` allowed in either component
    pub fn matches(&self, namespace_uri: &str, local_name: &str) -> bool {
        (self.namespace_uri == "*" || self.namespace_uri == namespace_uri)
            && (self.local_name == "*" || self.local_name == local_name)
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace_uri.is_empty() {
            f.write_str(&self.local_name)
        } else {
            write!(f, "{{{}}}{}", self.namespace_uri, self.local_name)
        }
    }
}

impl FromStr for QualifiedName {
    type Err = ConformanceError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || ConformanceError::InvalidArgument(format!("Invalid qualified name: {}", s));
        match s.strip_prefix('{') {
            Some(rest) => {
                let (uri, local) = rest.split_once('}').ok_or_else(invalid)?;
                if local.is_empty() {
                    return Err(invalid());
                }
                Ok(QualifiedName::new(uri, local))
            }
            None if !s.is_empty() && !s.contains('}') => Ok(QualifiedName::local(s)),
            None => Err(invalid()),
        }
    }
}

/// Borrowed handle to a node inside an [`XmlDocument`]
#[derive(Clone, Copy)]
pub struct XmlNode<'a> {
    ptr: *mut ffi::XmlNode,
    _doc: PhantomData<&'a XmlDocument>,
}

impl<'a> XmlNode<'a> {
    /// Wrap a raw tree pointer.
    ///
    /// # Safety
    ///
    /// `ptr` must be null or point into a document that outlives `'a`. Namespace
    /// declaration records are not tree nodes and are rejected.
    pub(crate) unsafe fn from_raw(ptr: *mut ffi::XmlNode) -> Option<Self> {
        if ptr.is_null() {
            return None;
        }
        let node_type = unsafe { (*ptr).node_type };
        if node_type == ffi::XML_NAMESPACE_DECL {
            return None;
        }
        Some(XmlNode {
            ptr,
            _doc: PhantomData,
        })
    }

    pub(crate) fn as_ptr(&self) -> *mut ffi::XmlNode {
        self.ptr
    }

    fn raw(&self) -> &ffi::XmlNode {
        unsafe { &*self.ptr }
    }

    pub fn kind(&self) -> NodeKind {
        NodeKind::from_raw(self.raw().node_type)
    }

    pub(crate) fn doc_ptr(&self) -> *mut ffi::XmlDoc {
        match self.kind() {
            NodeKind::Document => self.ptr as *mut ffi::XmlDoc,
            _ => self.raw().doc,
        }
    }

    /// Local part of an element, attribute or processing-instruction target
    pub fn local_name(&self) -> Option<String> {
        match self.kind() {
            NodeKind::Element | NodeKind::Attribute | NodeKind::ProcessingInstruction => unsafe {
                ffi::borrowed_string(self.raw().name)
            },
            _ => None,
        }
    }

    pub fn namespace_uri(&self) -> Option<String> {
        if !self.kind().has_namespace() || self.raw().ns.is_null() {
            return None;
        }
        unsafe { ffi::borrowed_string((*self.raw().ns).href) }
    }

    pub fn prefix(&self) -> Option<String> {
        if !self.kind().has_namespace() || self.raw().ns.is_null() {
            return None;
        }
        unsafe { ffi::borrowed_string((*self.raw().ns).prefix) }
    }

    /// DOM-style node name: `prefix:local` for elements and attributes, `#text`,
    /// `#document` and friends otherwise
    pub fn node_name(&self) -> String {
        match self.kind() {
            NodeKind::Element | NodeKind::Attribute => {
                let local = self.local_name().unwrap_or_default();
                match self.prefix() {
                    Some(prefix) => format!("{}:{}", prefix, local),
                    None => local,
                }
            }
            NodeKind::ProcessingInstruction => self.local_name().unwrap_or_default(),
            NodeKind::Text => "#text".to_string(),
            NodeKind::CData => "#cdata-section".to_string(),
            NodeKind::Comment => "#comment".to_string(),
            NodeKind::Document => "#document".to_string(),
            NodeKind::Namespace | NodeKind::Other(_) => "#node".to_string(),
        }
    }

    /// Expanded name; nodes without a name get an empty local part
    pub fn qualified_name(&self) -> QualifiedName {
        QualifiedName::new(
            self.namespace_uri().unwrap_or_default(),
            self.local_name().unwrap_or_default(),
        )
    }

    /// XPath string value of the node
    pub fn text_content(&self) -> String {
        unsafe { ffi::owned_string(ffi::xmlNodeGetContent(self.ptr)) }.unwrap_or_default()
    }

    /// Attribute value by name, ignoring namespaces
    pub fn attribute(&self, name: &str) -> Option<String> {
        if self.kind() != NodeKind::Element {
            return None;
        }
        let c_name = ffi::to_c_string(name).ok()?;
        unsafe { ffi::owned_string(ffi::xmlGetProp(self.ptr, c_name.as_ptr() as *const ffi::XmlChar)) }
    }

    /// Attribute nodes of an element, in document order
    pub fn attributes(&self) -> Siblings<'a> {
        let first = if self.kind() == NodeKind::Element {
            self.raw().properties as *mut ffi::XmlNode
        } else {
            std::ptr::null_mut()
        };
        Siblings {
            next: first,
            _doc: PhantomData,
        }
    }

    pub fn parent(&self) -> Option<XmlNode<'a>> {
        unsafe { XmlNode::from_raw(self.raw().parent) }
    }

    pub fn children(&self) -> Siblings<'a> {
        let first = match self.kind() {
            NodeKind::Element | NodeKind::Document | NodeKind::Attribute => self.raw().children,
            _ => std::ptr::null_mut(),
        };
        Siblings {
            next: first,
            _doc: PhantomData,
        }
    }

    pub fn child_elements(&self) -> impl Iterator<Item = XmlNode<'a>> + use<'a> {
        self.children().filter(|n| n.kind() == NodeKind::Element)
    }

    /// Count elements matching `name` in this subtree, this node included.
    pub fn count_descendants(&self, name: &QualifiedName) -> usize {
        let own = usize::from(
            self.kind() == NodeKind::Element
                && name.matches(
                    &self.namespace_uri().unwrap_or_default(),
                    &self.local_name().unwrap_or_default(),
                ),
        );
        own + self
            .child_elements()
            .map(|child| child.count_descendants(name))
            .sum::<usize>()
    }

    /// Line in the source document, when known
    pub fn line(&self) -> Option<u32> {
        let line = unsafe { ffi::xmlGetLineNo(self.ptr) };
        u32::try_from(line).ok().filter(|l| *l > 0)
    }

    /// XPath-style location path, e.g. `/root/a[2]`
    pub fn path(&self) -> Option<String> {
        unsafe { ffi::owned_string(ffi::xmlGetNodePath(self.ptr)) }
    }

    /// Serialize the node as indented UTF-8 markup without an XML declaration.
    pub fn to_xml_string(&self) -> Result<String> {
        if self.kind() == NodeKind::Document {
            let parts = self
                .children()
                .map(|child| child.dump())
                .collect::<Result<Vec<_>>>()?;
            return Ok(parts.join("\n"));
        }
        self.dump()
    }

    /// Write the serialized node to `writer`.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        let markup = self.to_xml_string()?;
        writer.write_all(markup.as_bytes())?;
        writer.flush()?;
        Ok(())
    }

    fn dump(&self) -> Result<String> {
        let buffer = unsafe { ffi::xmlBufferCreate() };
        if buffer.is_null() {
            return Err(LibXml2Error::BufferAllocationFailed.into());
        }
        let written = unsafe { ffi::xmlNodeDump(buffer, self.doc_ptr(), self.ptr, 0, 1) };
        let markup = unsafe { ffi::borrowed_string(ffi::xmlBufferContent(buffer)) };
        unsafe { ffi::xmlBufferFree(buffer) };

        if written < 0 {
            return Err(ConformanceError::Xml(format!(
                "Failed to serialize node {}",
                self.node_name()
            )));
        }
        Ok(markup.unwrap_or_default())
    }

    /// Structural equality: names, namespaces, attributes and children, ignoring
    /// whitespace-only text and comments.
    pub fn is_equivalent_to(&self, other: &XmlNode<'_>) -> bool {
        if self.kind() != other.kind() {
            return false;
        }
        match self.kind() {
            NodeKind::Text | NodeKind::CData => {
                return self.text_content().trim() == other.text_content().trim();
            }
            NodeKind::Attribute => {
                return self.qualified_name() == other.qualified_name()
                    && self.text_content() == other.text_content();
            }
            _ => {}
        }
        if self.qualified_name() != other.qualified_name() {
            return false;
        }

        let mut own_attrs: Vec<(QualifiedName, String)> = self
            .attributes()
            .map(|a| (a.qualified_name(), a.text_content()))
            .collect();
        let mut other_attrs: Vec<(QualifiedName, String)> = other
            .attributes()
            .map(|a| (a.qualified_name(), a.text_content()))
            .collect();
        own_attrs.sort();
        other_attrs.sort();
        if own_attrs != other_attrs {
            return false;
        }

        let own_children: Vec<_> = self.children().filter(is_significant).collect();
        let other_children: Vec<_> = other.children().filter(is_significant).collect();
        own_children.len() == other_children.len()
            && own_children
                .iter()
                .zip(other_children.iter())
                .all(|(a, b)| a.is_equivalent_to(b))
    }
}

fn is_significant(node: &XmlNode<'_>) -> bool {
    match node.kind() {
        NodeKind::Comment => false,
        NodeKind::Text => !node.text_content().trim().is_empty(),
        _ => true,
    }
}

impl fmt::Debug for XmlNode<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("XmlNode")
            .field("kind", &self.kind())
            .field("name", &self.node_name())
            .field("namespace", &self.namespace_uri())
            .finish()
    }
}

/// Iterator over a sibling chain (children or attributes)
pub struct Siblings<'a> {
    next: *mut ffi::XmlNode,
    _doc: PhantomData<&'a XmlDocument>,
}

impl<'a> Iterator for Siblings<'a> {
    type Item = XmlNode<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let current = unsafe { XmlNode::from_raw(self.next) }?;
        self.next = current.raw().next;
        Some(current)
    }
}
