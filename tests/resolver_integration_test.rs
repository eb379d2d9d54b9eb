//! URI resolution, XInclude merging and dereferencing to local files.

mod common;

use std::sync::Arc;

use common::fixtures::*;
use common::mocks::{MockTransport, response};
use ets_core::error::ConformanceError;
use ets_core::namespaces::NamespaceBindings;
use ets_core::resolver::{ResourceResolver, resolve_relative_uri, to_absolute_uri};
use ets_core::xpath;

const CATALOG_NS: &str = "urn:example:catalog";

fn resolver_with(transport: MockTransport) -> ResourceResolver {
    ResourceResolver::with_transport(Arc::new(transport))
}

fn offline() -> ResourceResolver {
    let mut transport = MockTransport::new();
    transport.expect_get().never();
    resolver_with(transport)
}

#[test]
fn test_xinclude_content_is_merged_without_base_fixup() {
    let doc = offline()
        .resolve_as_document(&fixture_uri("xinclude/main.xml"))
        .unwrap();

    let mut ns = NamespaceBindings::new();
    ns.add_binding(CATALOG_NS, "cat");
    assert!(xpath::evaluate_boolean("/cat:catalog/cat:entry[@code = 'BH']", doc.root_element(), &ns).unwrap());
    assert!(!xpath::evaluate_boolean("//@xml:base", doc.root_element(), &ns).unwrap());

    let markup = doc.to_xml_string().unwrap();
    assert!(!markup.contains("xi:include"));
    assert!(markup.contains("Borehole"));
}

#[test]
fn test_remote_xinclude_goes_through_injected_transport() {
    let mut transport = MockTransport::new();
    transport
        .expect_get()
        .withf(|url| url.as_str() == "http://example.org/catalog/remote-part.xml")
        .times(1)
        .returning(|_| {
            Ok(response(
                200,
                Some("application/xml"),
                b"<entry xmlns=\"urn:example:catalog\" code=\"EF\"><name>Environmental monitoring facilities</name></entry>",
            ))
        });

    let doc = resolver_with(transport)
        .resolve_as_document(&fixture_uri("xinclude/remote.xml"))
        .unwrap();

    let mut ns = NamespaceBindings::new();
    ns.add_binding(CATALOG_NS, "cat");
    assert!(xpath::evaluate_boolean("/cat:catalog/cat:entry[@code = 'EF']", doc.root_element(), &ns).unwrap());
}

#[test]
fn test_failed_include_is_parse_error() {
    let err = offline()
        .resolve_as_document(&fixture_uri("xinclude/broken.xml"))
        .unwrap_err();
    assert!(matches!(err, ConformanceError::XmlParse { .. }));
    assert!(err.is_infrastructure_failure());
}

#[test]
fn test_response_without_entity_fails_assertion() {
    let mut transport = MockTransport::new();
    transport
        .expect_get()
        .times(1)
        .returning(|_| Ok(response(200, Some("application/xml"), b"")));

    let err = resolver_with(transport)
        .resolve_as_document("http://example.org/wfs?request=DescribeFeatureType")
        .unwrap_err();
    assert!(err.is_assertion_failure());
    assert!(err.to_string().contains("request=DescribeFeatureType"));
}

#[test]
fn test_document_keeps_resolved_uri_as_base() {
    let uri = fixture_uri(VALID_ORDER);
    let doc = offline().resolve_as_document(&uri).unwrap();
    assert_eq!(doc.base_uri(), Some(uri.as_str()));
}

#[test]
fn test_relative_uri_is_rejected() {
    let err = offline().resolve_as_document("xml/order-valid.xml").unwrap_err();
    assert!(err.is_usage_error());
    assert!(err.to_string().contains("Absolute URI is required"));
}

#[test]
fn test_http_document_is_fetched_once() {
    let mut transport = MockTransport::new();
    transport
        .expect_get()
        .withf(|url| url.as_str() == "http://example.org/wfs?request=GetCapabilities")
        .times(1)
        .returning(|_| {
            Ok(response(
                200,
                Some("application/xml"),
                b"<Capabilities xmlns=\"urn:example:ows\" version=\"2.0\"/>",
            ))
        });

    let doc = resolver_with(transport)
        .resolve_as_document("http://example.org/wfs?request=GetCapabilities")
        .unwrap();
    let root = doc.root_element().unwrap();
    assert_eq!(root.local_name().as_deref(), Some("Capabilities"));
    assert_eq!(root.attribute("version").as_deref(), Some("2.0"));
}

#[test]
fn test_http_error_status_is_not_parsed() {
    let mut transport = MockTransport::new();
    transport
        .expect_get()
        .times(1)
        .returning(|_| Ok(response(404, Some("text/html"), b"<html>gone</html>")));

    let err = resolver_with(transport)
        .resolve_as_document("http://example.org/missing.xml")
        .unwrap_err();
    assert!(matches!(err, ConformanceError::HttpStatus { status: 404, .. }));
}

#[test]
fn test_file_uri_dereference_makes_no_request() {
    let resource = offline().dereference(&fixture_uri(VALID_ORDER)).unwrap();
    assert!(!resource.is_temporary());
    assert_eq!(resource.path(), fixture(VALID_ORDER).as_path());
}

#[test]
fn test_http_dereference_writes_temporary_xml_file() {
    let body: &'static [u8] = b"<gml:Point xmlns:gml=\"http://www.opengis.net/gml/3.2\"/>";
    let mut transport = MockTransport::new();
    transport
        .expect_get()
        .times(1)
        .returning(move |_| Ok(response(200, Some("application/gml+xml; version=3.2"), body)));

    let resource = resolver_with(transport)
        .dereference("http://example.org/features/1")
        .unwrap();
    assert!(resource.is_temporary());

    let file_name = resource.path().file_name().unwrap().to_string_lossy().into_owned();
    assert!(file_name.starts_with("entity-"));
    assert!(file_name.ends_with(".xml"));
    assert_eq!(std::fs::read(resource.path()).unwrap(), body);

    let path = resource.path().to_path_buf();
    drop(resource);
    assert!(!path.exists());
}

#[test]
fn test_non_xml_dereference_has_no_suffix_and_can_be_kept() {
    let mut transport = MockTransport::new();
    transport
        .expect_get()
        .times(1)
        .returning(|_| Ok(response(200, Some("application/json"), b"{}")));

    let resource = resolver_with(transport)
        .dereference("https://example.org/items.json")
        .unwrap();
    assert!(!resource.path().to_string_lossy().ends_with(".xml"));

    let kept = resource.keep().unwrap();
    assert!(kept.exists());
    std::fs::remove_file(kept).unwrap();
}

#[test]
fn test_empty_body_yields_empty_file() {
    let mut transport = MockTransport::new();
    transport
        .expect_get()
        .times(1)
        .returning(|_| Ok(response(204, None, b"")));

    let resource = resolver_with(transport)
        .dereference("http://example.org/empty")
        .unwrap();
    assert_eq!(std::fs::metadata(resource.path()).unwrap().len(), 0);
}

#[test]
fn test_relative_resolution() {
    assert_eq!(
        resolve_relative_uri("http://example.org/a/b/c.xml", "../d.xsd").unwrap(),
        "http://example.org/a/d.xsd"
    );
    assert_eq!(
        resolve_relative_uri("http://example.org/a/b.xml", "http://other.org/x").unwrap(),
        "http://other.org/x"
    );
    assert!(resolve_relative_uri("a/b.xml", "c.xml").unwrap_err().is_usage_error());
}

#[test]
fn test_paths_become_file_uris() {
    let uri = to_absolute_uri(&fixture_str(VALID_ORDER)).unwrap();
    assert_eq!(uri.scheme(), "file");
    assert_eq!(uri.to_file_path().unwrap(), fixture(VALID_ORDER));

    let http = to_absolute_uri("http://example.org/x.xml").unwrap();
    assert_eq!(http.as_str(), "http://example.org/x.xml");
}

#[test]
fn test_serialized_document_round_trips() {
    let doc = offline().resolve_as_document(&fixture_uri(VALID_ORDER)).unwrap();
    let markup = doc.to_xml_string().unwrap();
    let reparsed = ets_core::dom::XmlDocument::parse_str(&markup).unwrap();
    let original = doc.root_element().unwrap();
    assert!(original.is_equivalent_to(&reparsed.root_element().unwrap()));
}
