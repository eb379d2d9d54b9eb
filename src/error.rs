use thiserror::Error;

use crate::config::ConfigError;
use crate::messages::CatalogError;

/// Main error type for every conformance check.
///
/// Variants fall into four groups that callers must be able to tell apart:
/// - usage errors (`InvalidArgument`): a defect in the calling test code
/// - assertion failures (`AssertionFailed`): the system under test is non-conformant
/// - skips (`Skipped`): a precondition is unmet, the test is not applicable
/// - infrastructure failures (everything else): the check itself could not complete
#[derive(Error, Debug)]
pub enum ConformanceError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Assertion failed: {0}")]
    AssertionFailed(String),

    #[error("Test skipped: {0}")]
    Skipped(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP status error: {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("URI parsing error: {0}")]
    Url(#[from] url::ParseError),

    /// `details` carries the catalog message, which already names the expression
    #[error("{details}")]
    Evaluation { expression: String, details: String },

    #[error("Schema compilation error: {location} - {details}")]
    SchemaCompile { location: String, details: String },

    #[error("XML parsing error: {uri} - {details}")]
    XmlParse { uri: String, details: String },

    #[error("XML processing error: {0}")]
    Xml(String),

    #[error("LibXML2 internal error: {0}")]
    LibXml2(#[from] LibXml2Error),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Message catalog error: {0}")]
    Catalog(#[from] CatalogError),
}

impl ConformanceError {
    /// The system under test did not meet an expectation
    pub fn is_assertion_failure(&self) -> bool {
        matches!(self, ConformanceError::AssertionFailed(_))
    }

    /// A precondition was unmet; maps to a "not applicable" outcome
    pub fn is_skip(&self) -> bool {
        matches!(self, ConformanceError::Skipped(_))
    }

    /// The caller passed something it never should have
    pub fn is_usage_error(&self) -> bool {
        matches!(self, ConformanceError::InvalidArgument(_))
    }

    /// The test tool itself could not complete its check
    pub fn is_infrastructure_failure(&self) -> bool {
        !(self.is_assertion_failure() || self.is_skip() || self.is_usage_error())
    }
}

/// LibXML2-specific error types
#[derive(Error, Debug)]
pub enum LibXml2Error {
    #[error("Schema parsing failed: null pointer returned")]
    SchemaParseFailed,

    #[error("Validation context creation failed")]
    ValidationContextCreationFailed,

    #[error("XPath context creation failed")]
    XPathContextCreationFailed,

    #[error("Serialization buffer allocation failed")]
    BufferAllocationFailed,

    #[error("Memory allocation failed in libxml2")]
    MemoryAllocation,

    #[error("String contains an interior NUL byte: {value}")]
    InteriorNul { value: String },

    #[error("Input of {size} bytes exceeds what libxml2 can address")]
    InputTooLarge { size: usize },
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, ConformanceError>;

/// LibXML2 result type alias
pub type LibXml2Result<T> = std::result::Result<T, LibXml2Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_tiers_are_disjoint() {
        let failure = ConformanceError::AssertionFailed("status".to_string());
        assert!(failure.is_assertion_failure());
        assert!(!failure.is_infrastructure_failure());

        let skip = ConformanceError::Skipped("no capabilities".to_string());
        assert!(skip.is_skip());
        assert!(!skip.is_infrastructure_failure());

        let usage = ConformanceError::InvalidArgument("relative URI".to_string());
        assert!(usage.is_usage_error());
        assert!(!usage.is_infrastructure_failure());

        let infra = ConformanceError::Evaluation {
            expression: "//[".to_string(),
            details: "Invalid expression".to_string(),
        };
        assert!(infra.is_infrastructure_failure());
        assert!(!infra.is_assertion_failure());
    }

    #[test]
    fn test_display_distinguishes_failures_from_infrastructure() {
        let failure = ConformanceError::AssertionFailed("Expected 200".to_string());
        assert!(failure.to_string().starts_with("Assertion failed"));

        let compile = ConformanceError::SchemaCompile {
            location: "http://example.com/rules.sch".to_string(),
            details: "not a schema".to_string(),
        };
        let text = compile.to_string();
        assert!(text.contains("Schema compilation error"));
        assert!(text.contains("http://example.com/rules.sch"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "Access denied");
        let error: ConformanceError = io_error.into();

        match error {
            ConformanceError::Io(_) => (),
            _ => panic!("Expected ConformanceError::Io"),
        }
    }

    #[test]
    fn test_libxml2_error_conversion() {
        let libxml2_error = LibXml2Error::SchemaParseFailed;
        let error: ConformanceError = libxml2_error.into();

        match error {
            ConformanceError::LibXml2(LibXml2Error::SchemaParseFailed) => (),
            _ => panic!("Expected ConformanceError::LibXml2"),
        }
    }

    #[test]
    fn test_error_source_chain() {
        use std::error::Error;

        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let error = ConformanceError::Io(io_error);

        assert!(error.source().is_some());
        assert_eq!(error.source().unwrap().to_string(), "File not found");
    }
}
