//! XPath evaluation against parsed documents.
//!
//! Two modes are offered:
//!
//! - [`evaluate_boolean`] coerces the result to a boolean and evaluates against a
//!   node the caller already holds. A `false` result is a normal outcome.
//! - [`evaluate_values`] returns the full result (nodes or an atomic value) for a
//!   node, XML text or file. An empty-string prefix in the bindings declares the
//!   default element namespace.
//!
//! Compile and evaluation failures surface as [`ConformanceError::Evaluation`].

use std::fmt;
use std::path::Path;

use serde::Serialize;

use crate::dom::{NodeKind, ParseOptions, QualifiedName, XmlDocument, XmlNode};
use crate::error::{ConformanceError, LibXml2Error, Result};
use crate::libxml2::{self as ffi, ErrorCapture};
use crate::messages::{self, MessageCatalog, MessageKey};
use crate::namespaces::NamespaceBindings;

/// Prefix substituted for the default element namespace in value mode
const DEFAULT_NS_PREFIX: &str = "_default";

/// Input for value-mode evaluation
#[derive(Debug, Clone, Copy)]
pub enum XmlSource<'a> {
    /// An already parsed node; used as the context item
    Node(XmlNode<'a>),
    /// XML text; the document node is the context item
    Text(&'a str),
    /// A local XML file; the document node is the context item
    File(&'a Path),
}

/// One node in a value-mode result
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeItem {
    pub kind: NodeKind,
    pub name: Option<QualifiedName>,
    /// XPath string value
    pub value: String,
    /// Serialized markup, without XML declaration
    pub markup: String,
}

/// One item of a value-mode result
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum XPathItem {
    Node(NodeItem),
    String(String),
    Number(f64),
    Boolean(bool),
}

impl XPathItem {
    /// String value following XPath 1.0 `string()` rules
    pub fn string_value(&self) -> String {
        match self {
            XPathItem::Node(node) => node.value.clone(),
            XPathItem::String(s) => s.clone(),
            XPathItem::Number(n) => format_number(*n),
            XPathItem::Boolean(b) => b.to_string(),
        }
    }
}

impl fmt::Display for XPathItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            XPathItem::Node(node) if !node.markup.is_empty() => f.write_str(&node.markup),
            other => f.write_str(&other.string_value()),
        }
    }
}

fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else if n == n.trunc() && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

/// Evaluate `expr` against `context` and coerce the result to a boolean.
///
/// A missing context node is a caller defect and yields `InvalidArgument`.
/// Bindings with an empty prefix are ignored here; boolean mode has no default
/// element namespace.
pub fn evaluate_boolean(
    expr: &str,
    context: Option<XmlNode<'_>>,
    bindings: &NamespaceBindings,
) -> Result<bool> {
    let context =
        context.ok_or_else(|| ConformanceError::InvalidArgument("Context node is null.".to_string()))?;

    if log::log_enabled!(log::Level::Debug) {
        match context.to_xml_string() {
            Ok(markup) => log::debug!("Evaluating \"{}\" against context node:\n{}", expr, markup),
            Err(e) => log::warn!("Failed to serialize node {}: {}", context.node_name(), e),
        }
    }

    let xpath = XPathContext::for_node(context)?;
    for (prefix, uri) in bindings.prefix_declarations() {
        if !prefix.is_empty() {
            xpath.register_namespace(prefix, uri)?;
        }
    }

    let capture = ErrorCapture::start();
    let outcome = xpath.compile(expr).and_then(|compiled| {
        let value = unsafe { ffi::xmlXPathCompiledEvalToBoolean(compiled.ptr, xpath.ptr) };
        if value < 0 { None } else { Some(value != 0) }
    });
    let collector = capture.finish();

    match outcome {
        Some(result) => {
            log::debug!("XPath result: {}", result);
            Ok(result)
        }
        None => {
            let error = evaluation_error(expr, &collector.report());
            log::warn!("{}", error);
            Err(error)
        }
    }
}

/// Evaluate `expr` and return every result item.
///
/// Node sets come back in document order; atomic results as a single item.
pub fn evaluate_values(
    source: XmlSource<'_>,
    expr: &str,
    bindings: &NamespaceBindings,
) -> Result<Vec<XPathItem>> {
    match source {
        XmlSource::Node(node) => evaluate_on(node, expr, bindings),
        XmlSource::Text(text) => {
            let doc = XmlDocument::parse_str(text)?;
            evaluate_on(doc.as_node(), expr, bindings)
        }
        XmlSource::File(path) => {
            let doc = XmlDocument::parse_file(path, ParseOptions::default())?;
            evaluate_on(doc.as_node(), expr, bindings)
        }
    }
}

fn evaluate_on(
    context: XmlNode<'_>,
    expr: &str,
    bindings: &NamespaceBindings,
) -> Result<Vec<XPathItem>> {
    let xpath = XPathContext::for_node(context)?;
    let mut default_prefix = None;
    for (prefix, uri) in bindings.prefix_declarations() {
        if prefix.is_empty() {
            let generated = unused_prefix(bindings);
            xpath.register_namespace(&generated, uri)?;
            default_prefix = Some(generated);
        } else {
            xpath.register_namespace(prefix, uri)?;
        }
    }

    let effective = match &default_prefix {
        Some(prefix) => qualify_element_names(expr, prefix),
        None => expr.to_string(),
    };
    log::debug!("Evaluating value expression \"{}\"", effective);

    let capture = ErrorCapture::start();
    let object = xpath.compile(&effective).and_then(|compiled| {
        let ptr = unsafe { ffi::xmlXPathCompiledEval(compiled.ptr, xpath.ptr) };
        XPathObject::from_raw(ptr)
    });
    let collector = capture.finish();

    let Some(object) = object else {
        let error = evaluation_error(expr, &collector.report());
        log::warn!("{}", error);
        return Err(error);
    };
    let items = object.items()?;
    log::debug!("XPath returned {} item(s)", items.len());
    Ok(items)
}

fn evaluation_error(expr: &str, report: &str) -> ConformanceError {
    evaluation_error_in(messages::global(), expr, report)
}

fn evaluation_error_in(catalog: &MessageCatalog, expr: &str, report: &str) -> ConformanceError {
    let message = catalog.format(MessageKey::XPathError, &[&expr]);
    ConformanceError::Evaluation {
        expression: expr.to_string(),
        details: if report.is_empty() {
            message
        } else {
            format!("{}\n{}", message, report)
        },
    }
}

fn unused_prefix(bindings: &NamespaceBindings) -> String {
    let taken = |candidate: &str| bindings.iter().any(|(_, p)| p == candidate);
    let mut candidate = DEFAULT_NS_PREFIX.to_string();
    let mut n = 0;
    while taken(&candidate) {
        n += 1;
        candidate = format!("{}{}", DEFAULT_NS_PREFIX, n);
    }
    candidate
}

/// Owned `xmlXPathContext`
struct XPathContext {
    ptr: *mut ffi::XmlXPathContext,
}

impl XPathContext {
    fn for_node(node: XmlNode<'_>) -> Result<Self> {
        ffi::init();
        let ptr = unsafe { ffi::xmlXPathNewContext(node.doc_ptr()) };
        if ptr.is_null() {
            return Err(LibXml2Error::XPathContextCreationFailed.into());
        }
        let context = XPathContext { ptr };
        if unsafe { ffi::xmlXPathSetContextNode(node.as_ptr(), ptr) } != 0 {
            return Err(LibXml2Error::XPathContextCreationFailed.into());
        }
        Ok(context)
    }

    fn register_namespace(&self, prefix: &str, uri: &str) -> Result<()> {
        let c_prefix = ffi::to_c_string(prefix)?;
        let c_uri = ffi::to_c_string(uri)?;
        let status = unsafe {
            ffi::xmlXPathRegisterNs(
                self.ptr,
                c_prefix.as_ptr() as *const ffi::XmlChar,
                c_uri.as_ptr() as *const ffi::XmlChar,
            )
        };
        if status != 0 {
            return Err(LibXml2Error::MemoryAllocation.into());
        }
        Ok(())
    }

    /// Compile; `None` when the expression is malformed.
    fn compile(&self, expr: &str) -> Option<CompiledExpression> {
        let c_expr = ffi::to_c_string(expr).ok()?;
        let ptr =
            unsafe { ffi::xmlXPathCtxtCompile(self.ptr, c_expr.as_ptr() as *const ffi::XmlChar) };
        (!ptr.is_null()).then_some(CompiledExpression { ptr })
    }
}

impl Drop for XPathContext {
    fn drop(&mut self) {
        unsafe { ffi::xmlXPathFreeContext(self.ptr) };
    }
}

/// Owned `xmlXPathCompExpr`
struct CompiledExpression {
    ptr: *mut ffi::XmlXPathCompExpr,
}

impl Drop for CompiledExpression {
    fn drop(&mut self) {
        unsafe { ffi::xmlXPathFreeCompExpr(self.ptr) };
    }
}

/// Owned `xmlXPathObject`
struct XPathObject {
    ptr: *mut ffi::XmlXPathObject,
}

impl XPathObject {
    fn from_raw(ptr: *mut ffi::XmlXPathObject) -> Option<Self> {
        (!ptr.is_null()).then_some(XPathObject { ptr })
    }

    fn items(&self) -> Result<Vec<XPathItem>> {
        let object = unsafe { &*self.ptr };
        match object.object_type {
            ffi::XPATH_NODESET => {
                if object.nodesetval.is_null() {
                    return Ok(Vec::new());
                }
                let set = unsafe { &*object.nodesetval };
                let count = usize::try_from(set.node_nr).unwrap_or(0);
                if count == 0 || set.node_tab.is_null() {
                    return Ok(Vec::new());
                }
                let nodes = unsafe { std::slice::from_raw_parts(set.node_tab, count) };
                nodes
                    .iter()
                    .map(|&raw| node_item(raw).map(XPathItem::Node))
                    .collect()
            }
            ffi::XPATH_BOOLEAN => Ok(vec![XPathItem::Boolean(object.boolval != 0)]),
            ffi::XPATH_NUMBER => Ok(vec![XPathItem::Number(object.floatval)]),
            ffi::XPATH_STRING => Ok(vec![XPathItem::String(
                unsafe { ffi::borrowed_string(object.stringval) }.unwrap_or_default(),
            )]),
            other => Err(ConformanceError::Xml(format!(
                "Unsupported XPath result type {}",
                other
            ))),
        }
    }
}

impl Drop for XPathObject {
    fn drop(&mut self) {
        unsafe { ffi::xmlXPathFreeObject(self.ptr) };
    }
}

fn node_item(raw: *mut ffi::XmlNode) -> Result<NodeItem> {
    if raw.is_null() {
        return Err(ConformanceError::Xml("Null node in XPath result".to_string()));
    }
    if unsafe { (*raw).node_type } == ffi::XML_NAMESPACE_DECL {
        // Namespace nodes in a node set are xmlNs records, not tree nodes
        let ns = unsafe { &*(raw as *const ffi::XmlNs) };
        let prefix = unsafe { ffi::borrowed_string(ns.prefix) };
        let href = unsafe { ffi::borrowed_string(ns.href) }.unwrap_or_default();
        let markup = match &prefix {
            Some(p) => format!("xmlns:{}=\"{}\"", p, href),
            None => format!("xmlns=\"{}\"", href),
        };
        return Ok(NodeItem {
            kind: NodeKind::Namespace,
            name: Some(QualifiedName::local(prefix.unwrap_or_default())),
            value: href,
            markup,
        });
    }

    let node = unsafe { XmlNode::from_raw(raw) }
        .ok_or_else(|| ConformanceError::Xml("Unreadable node in XPath result".to_string()))?;
    let name = match node.kind() {
        NodeKind::Element | NodeKind::Attribute | NodeKind::ProcessingInstruction => {
            Some(node.qualified_name())
        }
        _ => None,
    };
    let markup = match node.to_xml_string() {
        Ok(markup) => markup.trim().to_string(),
        Err(e) => {
            log::warn!("Failed to serialize node {}: {}", node.node_name(), e);
            String::new()
        }
    };
    Ok(NodeItem {
        kind: node.kind(),
        name,
        value: node.text_content(),
        markup,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TokenKind {
    Literal,
    Number,
    Variable,
    Name,
    Star,
    At,
    DoubleColon,
    LeftParen,
    RightParen,
    LeftBracket,
    RightBracket,
    Comma,
    Dot,
    Operator,
}

#[derive(Debug, Clone, Copy)]
struct Token {
    kind: TokenKind,
    start: usize,
    end: usize,
}

/// Splits an XPath 1.0 expression into spans; just enough lexing to find name tests.
struct Lexer<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    fn new(input: &'a str) -> Self {
        Lexer { input, pos: 0 }
    }

    fn remaining(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.remaining().chars().next()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.remaining().chars().nth(offset)
    }

    fn advance(&mut self, n: usize) {
        self.pos = (self.pos + n).min(self.input.len());
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.advance(c.len_utf8());
            } else {
                break;
            }
        }
    }

    fn next_token(&mut self) -> Option<Token> {
        self.skip_whitespace();
        let c = self.peek()?;
        let start = self.pos;

        let kind = match c {
            '"' | '\'' => {
                self.advance(1);
                while let Some(ch) = self.peek() {
                    self.advance(ch.len_utf8());
                    if ch == c {
                        break;
                    }
                }
                TokenKind::Literal
            }
            '0'..='9' => {
                self.read_number();
                TokenKind::Number
            }
            '.' if self.peek_at(1).is_some_and(|d| d.is_ascii_digit()) => {
                self.read_number();
                TokenKind::Number
            }
            '.' => {
                self.advance(1);
                if self.peek() == Some('.') {
                    self.advance(1);
                }
                TokenKind::Dot
            }
            '$' => {
                self.advance(1);
                self.read_qname();
                TokenKind::Variable
            }
            '@' => {
                self.advance(1);
                TokenKind::At
            }
            '*' => {
                self.advance(1);
                TokenKind::Star
            }
            '(' => {
                self.advance(1);
                TokenKind::LeftParen
            }
            ')' => {
                self.advance(1);
                TokenKind::RightParen
            }
            '[' => {
                self.advance(1);
                TokenKind::LeftBracket
            }
            ']' => {
                self.advance(1);
                TokenKind::RightBracket
            }
            ',' => {
                self.advance(1);
                TokenKind::Comma
            }
            ':' if self.peek_at(1) == Some(':') => {
                self.advance(2);
                TokenKind::DoubleColon
            }
            '/' | '!' | '<' | '>' => {
                self.advance(1);
                if matches!(self.peek(), Some('/') | Some('=')) {
                    self.advance(1);
                }
                TokenKind::Operator
            }
            _ if is_name_start_char(c) => {
                self.read_qname();
                TokenKind::Name
            }
            _ => {
                self.advance(c.len_utf8());
                TokenKind::Operator
            }
        };

        Some(Token {
            kind,
            start,
            end: self.pos,
        })
    }

    fn read_number(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() || c == '.' {
                self.advance(1);
            } else {
                break;
            }
        }
    }

    fn read_ncname(&mut self) {
        while let Some(c) = self.peek() {
            if is_name_char(c) {
                self.advance(c.len_utf8());
            } else {
                break;
            }
        }
    }

    /// NCName, `prefix:local` or `prefix:*`
    fn read_qname(&mut self) {
        self.read_ncname();
        if self.peek() == Some(':') && self.peek_at(1) != Some(':') {
            match self.peek_at(1) {
                Some('*') => self.advance(2),
                Some(c) if is_name_start_char(c) => {
                    self.advance(1);
                    self.read_ncname();
                }
                _ => {}
            }
        }
    }

    /// What follows the current position, ignoring whitespace
    fn lookahead(&self) -> &'a str {
        self.remaining().trim_start()
    }
}

fn is_name_start_char(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '-' || c == '.'
}

/// Prefix every unprefixed element name test in `expr` with `prefix`.
///
/// Function names, node-type tests, axis names, operator names, attribute and
/// namespace-axis tests, variables and literals are left alone.
pub fn qualify_element_names(expr: &str, prefix: &str) -> String {
    let mut lexer = Lexer::new(expr);
    let mut output = String::with_capacity(expr.len() + 16);
    let mut copied = 0;
    let mut previous: Option<TokenKind> = None;
    let mut last_axis: Option<&str> = None;

    while let Some(token) = lexer.next_token() {
        let text = &expr[token.start..token.end];
        // XPath 1.0 section 3.7: after an operand, `*` multiplies and a name is an operator
        let operator_position = matches!(
            previous,
            Some(
                TokenKind::Literal
                    | TokenKind::Number
                    | TokenKind::Variable
                    | TokenKind::Name
                    | TokenKind::Star
                    | TokenKind::RightParen
                    | TokenKind::RightBracket
                    | TokenKind::Dot
            )
        );

        let kind = match token.kind {
            TokenKind::Star if operator_position => TokenKind::Operator,
            TokenKind::Name if operator_position => TokenKind::Operator,
            TokenKind::Name => {
                let ahead = lexer.lookahead();
                if ahead.starts_with("::") {
                    last_axis = Some(text);
                } else if !ahead.starts_with('(') && !text.contains(':') {
                    let attribute_like = previous == Some(TokenKind::At)
                        || (previous == Some(TokenKind::DoubleColon)
                            && matches!(last_axis, Some("attribute") | Some("namespace")));
                    if !attribute_like {
                        output.push_str(&expr[copied..token.start]);
                        output.push_str(prefix);
                        output.push(':');
                        copied = token.start;
                    }
                }
                TokenKind::Name
            }
            other => other,
        };
        previous = Some(kind);
    }

    output.push_str(&expr[copied..]);
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"<wfs:FeatureCollection xmlns:wfs="http://www.opengis.net/wfs/2.0" xmlns:gml="http://www.opengis.net/gml/3.2" numberMatched="2">
  <wfs:member><gml:Point gml:id="p1"><gml:pos>1 2</gml:pos></gml:Point></wfs:member>
  <wfs:member><gml:Point gml:id="p2"><gml:pos>3 4</gml:pos></gml:Point></wfs:member>
</wfs:FeatureCollection>"#;

    fn bindings() -> NamespaceBindings {
        [
            ("http://www.opengis.net/wfs/2.0", "wfs"),
            ("http://www.opengis.net/gml/3.2", "gml"),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_boolean_true_and_false_are_not_errors() {
        let doc = XmlDocument::parse_str(DOC).unwrap();
        let ns = NamespaceBindings::new();
        assert!(evaluate_boolean("1=1", Some(doc.as_node()), &ns).unwrap());
        assert!(!evaluate_boolean("1=2", Some(doc.as_node()), &ns).unwrap());
    }

    #[test]
    fn test_boolean_with_prefixes() {
        let doc = XmlDocument::parse_str(DOC).unwrap();
        let root = doc.root_element();
        assert!(evaluate_boolean("count(wfs:member) = 2", root, &bindings()).unwrap());
        assert!(evaluate_boolean("//gml:Point[@gml:id='p2']", root, &bindings()).unwrap());
        assert!(!evaluate_boolean("//gml:LineString", root, &bindings()).unwrap());
    }

    #[test]
    fn test_boolean_missing_context_is_usage_error() {
        let err = evaluate_boolean("true()", None, &NamespaceBindings::new()).unwrap_err();
        assert!(err.is_usage_error());
    }

    #[test]
    fn test_boolean_malformed_expression_is_evaluation_error() {
        let doc = XmlDocument::parse_str(DOC).unwrap();
        let err = evaluate_boolean("//wfs:member[", doc.root_element(), &bindings()).unwrap_err();
        match err {
            ConformanceError::Evaluation { expression, .. } => {
                assert_eq!(expression, "//wfs:member[")
            }
            other => panic!("Expected Evaluation error, got {:?}", other),
        }
    }

    #[test]
    fn test_evaluation_error_text_comes_from_catalog() {
        for locale in messages::SUPPORTED_LOCALES {
            let catalog = MessageCatalog::for_locale(locale).unwrap();
            let err = evaluation_error_in(&catalog, "count(", "");
            assert_eq!(err.to_string(), catalog.format(MessageKey::XPathError, &[&"count("]));
        }

        let de = MessageCatalog::for_locale("de").unwrap();
        let err = evaluation_error_in(&de, "count(", "Invalid expression");
        assert_eq!(
            err.to_string(),
            "XPath-Ausdruck konnte nicht ausgewertet werden:\ncount(\nInvalid expression"
        );

        let en = MessageCatalog::for_locale("en").unwrap();
        assert!(evaluation_error_in(&en, "count(", "")
            .to_string()
            .starts_with("Failed to evaluate XPath expression:\ncount("));
    }

    #[test]
    fn test_malformed_expression_reports_catalog_message() {
        let doc = XmlDocument::parse_str(DOC).unwrap();
        let err = evaluate_boolean("count(", doc.root_element(), &bindings()).unwrap_err();
        assert!(matches!(err, ConformanceError::Evaluation { .. }));
        assert!(err
            .to_string()
            .starts_with(&messages::format(MessageKey::XPathError, &[&"count("])));
    }

    #[test]
    fn test_boolean_unbound_prefix_is_evaluation_error() {
        let doc = XmlDocument::parse_str(DOC).unwrap();
        let err = evaluate_boolean("//ows:Title", doc.root_element(), &bindings()).unwrap_err();
        assert!(err.is_infrastructure_failure());
    }

    #[test]
    fn test_values_node_set() {
        let items = evaluate_values(XmlSource::Text(DOC), "//gml:pos", &bindings()).unwrap();
        assert_eq!(items.len(), 2);
        match &items[0] {
            XPathItem::Node(node) => {
                assert_eq!(node.kind, NodeKind::Element);
                assert_eq!(node.value, "1 2");
                assert_eq!(
                    node.name,
                    Some(QualifiedName::new("http://www.opengis.net/gml/3.2", "pos"))
                );
                assert!(node.markup.contains("gml:pos"));
            }
            other => panic!("Expected node, got {:?}", other),
        }
    }

    #[test]
    fn test_values_atomic_results() {
        let doc = XmlDocument::parse_str(DOC).unwrap();
        let source = XmlSource::Node(doc.root_element().unwrap());
        let ns = bindings();

        assert_eq!(
            evaluate_values(source, "count(wfs:member)", &ns).unwrap(),
            vec![XPathItem::Number(2.0)]
        );
        assert_eq!(
            evaluate_values(source, "string(@numberMatched)", &ns).unwrap(),
            vec![XPathItem::String("2".to_string())]
        );
        assert_eq!(
            evaluate_values(source, "boolean(wfs:member)", &ns).unwrap(),
            vec![XPathItem::Boolean(true)]
        );
    }

    #[test]
    fn test_values_attribute_nodes() {
        let items = evaluate_values(XmlSource::Text(DOC), "//gml:Point/@gml:id", &bindings()).unwrap();
        let values: Vec<String> = items.iter().map(XPathItem::string_value).collect();
        assert_eq!(values, vec!["p1", "p2"]);
    }

    #[test]
    fn test_values_default_namespace() {
        let xml = r#"<Capabilities xmlns="http://www.opengis.net/wms"><Service><Title>Demo</Title></Service></Capabilities>"#;
        let ns: NamespaceBindings = [("http://www.opengis.net/wms", "")].into_iter().collect();

        let items = evaluate_values(XmlSource::Text(xml), "/Capabilities/Service/Title", &ns).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].string_value(), "Demo");

        // Without the default namespace the unprefixed path matches nothing
        let none = evaluate_values(XmlSource::Text(xml), "/Capabilities", &NamespaceBindings::new())
            .unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn test_values_malformed_expression() {
        let err = evaluate_values(XmlSource::Text(DOC), "count(", &bindings()).unwrap_err();
        assert!(matches!(err, ConformanceError::Evaluation { .. }));
    }

    #[test]
    fn test_values_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fc.xml");
        std::fs::write(&path, DOC).unwrap();

        let items = evaluate_values(XmlSource::File(&path), "count(//gml:Point)", &bindings()).unwrap();
        assert_eq!(items, vec![XPathItem::Number(2.0)]);
    }

    #[test]
    fn test_qualify_simple_paths() {
        assert_eq!(qualify_element_names("/a/b", "d"), "/d:a/d:b");
        assert_eq!(qualify_element_names("//item[@id='x']", "d"), "//d:item[@id='x']");
        assert_eq!(qualify_element_names("x:a/b", "d"), "x:a/d:b");
    }

    #[test]
    fn test_qualify_skips_functions_axes_and_literals() {
        assert_eq!(
            qualify_element_names("count(child::a) > 1", "d"),
            "count(child::d:a) > 1"
        );
        assert_eq!(
            qualify_element_names("a[text() = 'b c']", "d"),
            "d:a[text() = 'b c']"
        );
        assert_eq!(qualify_element_names("attribute::id", "d"), "attribute::id");
        assert_eq!(qualify_element_names("$var/a", "d"), "$var/d:a");
    }

    #[test]
    fn test_qualify_respects_operator_position() {
        assert_eq!(
            qualify_element_names("a and b or c div 2", "d"),
            "d:a and d:b or d:c div 2"
        );
        assert_eq!(qualify_element_names("a * 2", "d"), "d:a * 2");
        assert_eq!(qualify_element_names("*/a", "d"), "*/d:a");
        assert_eq!(qualify_element_names("a mod b", "d"), "d:a mod d:b");
    }

    #[test]
    fn test_number_formatting() {
        assert_eq!(XPathItem::Number(2.0).string_value(), "2");
        assert_eq!(XPathItem::Number(2.5).string_value(), "2.5");
        assert_eq!(XPathItem::Number(f64::NAN).string_value(), "NaN");
        assert_eq!(XPathItem::Number(f64::NEG_INFINITY).string_value(), "-Infinity");
    }
}
