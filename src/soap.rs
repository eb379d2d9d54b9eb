//! SOAP envelope construction for request payloads.

use std::fmt;
use std::io::Read;

use crate::dom::{ParseOptions, XmlDocument};
use crate::error::{ConformanceError, Result};

pub const SOAP_11_NAMESPACE: &str = "http://schemas.xmlsoap.org/soap/envelope/";
pub const SOAP_12_NAMESPACE: &str = "http://www.w3.org/2003/05/soap-envelope";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SoapVersion {
    #[default]
    Soap11,
    Soap12,
}

impl SoapVersion {
    pub fn namespace(&self) -> &'static str {
        match self {
            SoapVersion::Soap11 => SOAP_11_NAMESPACE,
            SoapVersion::Soap12 => SOAP_12_NAMESPACE,
        }
    }

    fn prefix(&self) -> &'static str {
        match self {
            SoapVersion::Soap11 => "SOAP-ENV",
            SoapVersion::Soap12 => "env",
        }
    }
}

impl fmt::Display for SoapVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SoapVersion::Soap11 => write!(f, "SOAP 1.1"),
            SoapVersion::Soap12 => write!(f, "SOAP 1.2"),
        }
    }
}

/// Parse a request payload from a stream.
pub fn read_payload<R: Read>(mut reader: R) -> Result<XmlDocument> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Err(ConformanceError::InvalidArgument(
            "Payload stream must not be empty".to_string(),
        ));
    }
    XmlDocument::parse_bytes(&bytes, None, ParseOptions::default())
}

/// Wrap the root element of `payload` as the single child of `Envelope/Body`.
///
/// An empty `Header` precedes the `Body`. The payload document is left untouched; the envelope is a new document.
pub fn wrap_in_envelope(payload: &XmlDocument, version: SoapVersion) -> Result<XmlDocument> {
    let root = payload.root_element().ok_or_else(|| {
        ConformanceError::InvalidArgument("Payload has no root element".to_string())
    })?;
    let body = root.to_xml_string()?;
    let prefix = version.prefix();
    let envelope = format!(
        "<{p}:Envelope xmlns:{p}=\"{ns}\"><{p}:Header/><{p}:Body>{body}</{p}:Body></{p}:Envelope>",
        p = prefix,
        ns = version.namespace(),
        body = body
    );
    log::debug!("Wrapped {} payload in {} envelope", root.node_name(), version);
    XmlDocument::parse_bytes(envelope.as_bytes(), payload.base_uri(), ParseOptions::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::QualifiedName;

    const REQUEST: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<wfs:GetCapabilities xmlns:wfs="http://www.opengis.net/wfs/2.0" service="WFS">
  <wfs:AcceptVersions/>
</wfs:GetCapabilities>"#;

    #[test]
    fn test_read_payload() {
        let doc = read_payload(REQUEST.as_bytes()).unwrap();
        assert_eq!(
            doc.root_element().unwrap().local_name().as_deref(),
            Some("GetCapabilities")
        );
    }

    #[test]
    fn test_empty_payload_is_rejected() {
        assert!(read_payload(&b""[..]).unwrap_err().is_usage_error());
        assert!(read_payload(&b"  \n"[..]).unwrap_err().is_usage_error());
    }

    #[test]
    fn test_default_envelope_is_soap_11() {
        let payload = read_payload(REQUEST.as_bytes()).unwrap();
        let envelope = wrap_in_envelope(&payload, SoapVersion::default()).unwrap();

        let root = envelope.root_element().unwrap();
        assert_eq!(root.namespace_uri().as_deref(), Some(SOAP_11_NAMESPACE));
        assert_eq!(root.local_name().as_deref(), Some("Envelope"));
        assert!(
            envelope
                .as_node()
                .count_descendants(&QualifiedName::new("*", "GetCapabilities"))
                > 0
        );
    }

    #[test]
    fn test_soap_12_envelope() {
        let payload = read_payload(REQUEST.as_bytes()).unwrap();
        let envelope = wrap_in_envelope(&payload, SoapVersion::Soap12).unwrap();

        let body = envelope
            .root_element()
            .unwrap()
            .child_elements()
            .find(|n| n.local_name().as_deref() == Some("Body"))
            .unwrap();
        assert_eq!(body.namespace_uri().as_deref(), Some(SOAP_12_NAMESPACE));
        let request = body.child_elements().next().unwrap();
        assert_eq!(request.namespace_uri().as_deref(), Some("http://www.opengis.net/wfs/2.0"));
        assert_eq!(request.attribute("service").as_deref(), Some("WFS"));
    }

    #[test]
    fn test_envelope_starts_with_empty_header() {
        let payload = read_payload(REQUEST.as_bytes()).unwrap();
        let envelope = wrap_in_envelope(&payload, SoapVersion::Soap11).unwrap();

        let children: Vec<_> = envelope.root_element().unwrap().child_elements().collect();
        assert_eq!(children.len(), 2);
        assert_eq!(children[0].local_name().as_deref(), Some("Header"));
        assert_eq!(children[0].namespace_uri().as_deref(), Some(SOAP_11_NAMESPACE));
        assert_eq!(children[0].child_elements().count(), 0);
        assert_eq!(children[1].local_name().as_deref(), Some("Body"));
    }
}
