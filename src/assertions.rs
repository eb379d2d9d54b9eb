//! Conformance assertions over XML and HTTP artifacts.
//!
//! Every check returns `Ok(())` when the expectation holds. An unmet expectation
//! is [`ConformanceError::AssertionFailed`] with a localized message, an unmet
//! precondition in [`verify_xpath`] is [`ConformanceError::Skipped`], and anything
//! that prevented the check from running is passed through unchanged.

use url::Url;

use crate::dom::{QualifiedName, XmlDocument, XmlNode};
use crate::error::{ConformanceError, Result};
use crate::http_client::{HttpTransport, ResponseHeaders};
use crate::messages::{self, MessageKey};
use crate::namespaces::NamespaceBindings;
use crate::schema::{CompiledSchema, SchemaValidationService};
use crate::schematron::RuleValidationService;
use crate::xpath;

fn failure(message: impl Into<String>) -> ConformanceError {
    ConformanceError::AssertionFailed(message.into())
}

/// Assert that `node` has the expected local name and namespace name.
///
/// The local name is compared first; each mismatch has its own message.
pub fn assert_qualified_name(node: &XmlNode<'_>, expected: &QualifiedName) -> Result<()> {
    let local_name = node.local_name().unwrap_or_default();
    if local_name != expected.local_name() {
        return Err(failure(format!(
            "{} Expected [{}] but found [{}].",
            messages::get(MessageKey::LocalName),
            expected.local_name(),
            local_name
        )));
    }

    let namespace_uri = node.namespace_uri().unwrap_or_default();
    if namespace_uri != expected.namespace_uri() {
        return Err(failure(format!(
            "{} Expected [{}] but found [{}].",
            messages::get(MessageKey::NamespaceName),
            expected.namespace_uri(),
            namespace_uri
        )));
    }
    Ok(())
}

/// Evaluate an XPath 1.0 expression against `context` as a boolean.
///
/// `false` is a normal result. A missing context or a malformed expression is
/// an error.
pub fn check_xpath(
    expr: &str,
    context: Option<XmlNode<'_>>,
    bindings: &NamespaceBindings,
) -> Result<bool> {
    xpath::evaluate_boolean(expr, context, bindings)
}

/// Assert that an XPath 1.0 expression holds for `context`.
pub fn assert_xpath(
    expr: &str,
    context: Option<XmlNode<'_>>,
    bindings: &NamespaceBindings,
) -> Result<()> {
    if check_xpath(expr, context, bindings)? {
        return Ok(());
    }
    let node_name = context.map(|node| node.node_name()).unwrap_or_default();
    Err(failure(messages::format(
        MessageKey::XPathResult,
        &[&node_name, &expr],
    )))
}

/// Like [`assert_xpath`], but a `false` result skips the test with
/// `skip_message` instead of failing it.
pub fn verify_xpath(
    expr: &str,
    context: Option<XmlNode<'_>>,
    bindings: &NamespaceBindings,
    skip_message: &str,
) -> Result<()> {
    if check_xpath(expr, context, bindings)? {
        Ok(())
    } else {
        Err(ConformanceError::Skipped(skip_message.to_string()))
    }
}

/// Assert that `document` is valid against `schema`.
pub fn assert_schema_valid(schema: &CompiledSchema, document: &XmlDocument) -> Result<()> {
    SchemaValidationService::validate(schema, document)
}

/// Assert that `document` violates none of the rules in the Schematron schema
/// at `schema_location` (file path or absolute URI).
pub fn assert_schematron_valid(schema_location: &str, document: &XmlDocument) -> Result<()> {
    RuleValidationService::validate(schema_location, document)
}

/// Assert the number of elements named `element_name` below `node`.
pub fn assert_descendant_element_count(
    node: XmlNode<'_>,
    element_name: &QualifiedName,
    expected_count: usize,
) -> Result<()> {
    let actual = node.count_descendants(element_name);
    if actual != expected_count {
        return Err(failure(format!(
            "Unexpected number of {} descendant elements. Expected [{}] but found [{}].",
            element_name, expected_count, actual
        )));
    }
    Ok(())
}

/// Assert that `actual` is one of `expected`. Order and duplicates in
/// `expected` do not matter.
pub fn assert_status_code(actual: u16, expected: &[u16]) -> Result<()> {
    let mut codes = expected.to_vec();
    codes.sort_unstable();
    if codes.binary_search(&actual).is_ok() {
        return Ok(());
    }
    Err(failure(format!(
        "Expected status code(s) {:?} but received {}.",
        codes, actual
    )))
}

/// Assert that some `Content-Type` value contains `expected` (so parameters
/// such as `charset` are tolerated).
pub fn assert_content_type(headers: &ResponseHeaders, expected: &str) -> Result<()> {
    let content_types = headers.content_types();
    if content_types.iter().any(|value| value.contains(expected)) {
        return Ok(());
    }
    Err(failure(format!(
        "Expected content type {} but received {}",
        expected,
        content_types.join(", ")
    )))
}

/// Schemes [`assert_url`] accepts
pub const URL_SCHEMES: [&str; 4] = ["http", "https", "file", "ftp"];

/// Assert that `url` is a well-formed absolute URL with one of [`URL_SCHEMES`].
pub fn assert_url(url: Option<&str>) -> Result<()> {
    match url.map(Url::parse) {
        Some(Ok(parsed)) if URL_SCHEMES.contains(&parsed.scheme()) => Ok(()),
        _ => Err(failure(format!("Invalid URL: {}", url.unwrap_or("null")))),
    }
}

/// Assert that a GET on `uri` answers with status 200.
///
/// A missing or malformed URI fails without any request being made. The
/// request has no timeout.
pub fn assert_uri_is_resolvable(transport: &dyn HttpTransport, uri: Option<&str>) -> Result<()> {
    let uri = uri.ok_or_else(|| failure("Invalid URI null: no URI given"))?;
    let url = Url::parse(uri).map_err(|e| failure(format!("Invalid URI {}: {}", uri, e)))?;
    let response = transport.get(&url)?;
    assert_status_code(response.status, &[200])
}
