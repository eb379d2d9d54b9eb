//! ISO Schematron validation.
//!
//! Rule schemas use the XPath 1.0 query binding and every pattern applies; there
//! is no phase selection. Failed `assert`s are violations. Fired `report`s are
//! kept in the result as notices but are not counted.

use std::path::Path;

use libc::c_void;

use crate::collector::{Severity, ValidationCollector, Violation};
use crate::dom::{ParseOptions, XmlDocument};
use crate::error::{ConformanceError, LibXml2Error, Result};
use crate::libxml2::{self as ffi, ErrorCapture};
use crate::messages::{self, MessageKey};
use crate::resolver::{ResourceResolver, to_absolute_uri};

/// A compiled Schematron schema
#[derive(Debug)]
pub struct RuleSchema {
    ptr: *mut ffi::XmlSchematron,
    location: String,
    // Parsed from a caller-owned tree, which must outlive the schema
    _source: XmlDocument,
}

// A rule schema moves between threads but is never used from two at once.
unsafe impl Send for RuleSchema {}

impl Drop for RuleSchema {
    fn drop(&mut self) {
        if !self.ptr.is_null() {
            unsafe { ffi::xmlSchematronFree(self.ptr) };
        }
    }
}

impl RuleSchema {
    /// Load and compile the rule schema at a file path or absolute URI.
    pub fn from_location(location: &str) -> Result<Self> {
        let uri = to_absolute_uri(location)?;
        let document = ResourceResolver::new()?
            .resolve_as_document(uri.as_str())
            .map_err(|e| ConformanceError::SchemaCompile {
                location: location.to_string(),
                details: e.to_string(),
            })?;
        Self::compile(document, uri.to_string())
    }

    /// Compile rule schema text.
    pub fn from_bytes(bytes: &[u8], base_uri: Option<&str>) -> Result<Self> {
        let location = base_uri.unwrap_or("<memory>").to_string();
        let document = XmlDocument::parse_bytes(bytes, base_uri, ParseOptions::default())
            .map_err(|e| ConformanceError::SchemaCompile {
                location: location.clone(),
                details: e.to_string(),
            })?;
        Self::compile(document, location)
    }

    pub fn from_document(document: XmlDocument) -> Result<Self> {
        let location = document.base_uri().unwrap_or("<memory>").to_string();
        Self::compile(document, location)
    }

    fn compile(document: XmlDocument, location: String) -> Result<Self> {
        let capture = ErrorCapture::start();
        let schema_ptr = unsafe {
            let parser_ctxt = ffi::xmlSchematronNewDocParserCtxt(document.as_ptr());
            if parser_ctxt.is_null() {
                std::ptr::null_mut()
            } else {
                let schema_ptr = ffi::xmlSchematronParse(parser_ctxt);
                ffi::xmlSchematronFreeParserCtxt(parser_ctxt);
                schema_ptr
            }
        };
        let collector = capture.finish();

        if schema_ptr.is_null() {
            let details = if collector.is_empty() {
                "not a usable Schematron schema".to_string()
            } else {
                collector.report()
            };
            return Err(ConformanceError::SchemaCompile { location, details });
        }

        log::debug!("Compiled Schematron schema from {}", location);
        Ok(RuleSchema {
            ptr: schema_ptr,
            location,
            _source: document,
        })
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    /// Run every pattern against `document`.
    pub fn check(&self, document: &XmlDocument) -> Result<RuleValidationResult> {
        let valid_ctxt = unsafe { ffi::xmlSchematronNewValidCtxt(self.ptr, ffi::XML_SCHEMATRON_OUT_ERROR) };
        if valid_ctxt.is_null() {
            return Err(LibXml2Error::ValidationContextCreationFailed.into());
        }

        let mut collector = Box::new(ValidationCollector::new());
        let capture = ErrorCapture::start();
        let code = unsafe {
            ffi::xmlSchematronSetValidStructuredErrors(
                valid_ctxt,
                Some(ffi::structured_error_callback),
                &mut *collector as *mut ValidationCollector as *mut c_void,
            );
            let code = ffi::xmlSchematronValidateDoc(valid_ctxt, document.as_ptr());
            ffi::xmlSchematronFreeValidCtxt(valid_ctxt);
            code
        };
        let side_errors = capture.finish();
        for record in side_errors.records() {
            log::warn!("Schematron evaluation problem: {}", record);
        }

        if code < 0 {
            return Err(ConformanceError::Xml(format!(
                "Schematron validation against {} failed internally",
                self.location
            )));
        }
        if code > 0 && collector.is_empty() {
            collector.record(Violation::new(
                Severity::Error,
                document.base_uri().unwrap_or("<memory>"),
                format!("{} rule violation(s) reported without details", code),
            ));
        }

        let collector = *collector;
        log::debug!(
            "Schematron validation against {}: {} violation(s)",
            self.location,
            collector.violation_count()
        );
        Ok(RuleValidationResult { collector })
    }
}

/// Outcome of one rule validation pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleValidationResult {
    collector: ValidationCollector,
}

impl RuleValidationResult {
    pub fn rule_violation_count(&self) -> usize {
        self.collector.violation_count()
    }

    pub fn rule_violations_detected(&self) -> bool {
        self.collector.has_violations()
    }

    /// Every failed assert and fired report, one per line
    pub fn report(&self) -> String {
        self.collector.report()
    }

    pub fn collector(&self) -> &ValidationCollector {
        &self.collector
    }
}

/// Assertion-level rule validation
pub struct RuleValidationService;

impl RuleValidationService {
    /// Load the rule schema and run it against `document`.
    pub fn run(schema_location: &str, document: &XmlDocument) -> Result<RuleValidationResult> {
        let schema = RuleSchema::from_location(schema_location)?;
        schema.check(document)
    }

    /// Like [`run`](Self::run), then fail if any rule is violated.
    pub fn validate(schema_location: &str, document: &XmlDocument) -> Result<()> {
        let result = Self::run(schema_location, document)?;
        Self::assert_no_violations(&result)
    }

    /// Validate a local file against the rule schema.
    pub fn validate_file(schema_location: &str, path: &Path) -> Result<()> {
        let schema = RuleSchema::from_location(schema_location)?;
        let document =
            XmlDocument::parse_file(path, ParseOptions::default()).map_err(|e| match e {
                ConformanceError::XmlParse { details, .. } => ConformanceError::AssertionFailed(
                    messages::format(MessageKey::XmlError, &[&details]),
                ),
                other => other,
            })?;
        Self::assert_no_violations(&schema.check(&document)?)
    }

    pub fn assert_no_violations(result: &RuleValidationResult) -> Result<()> {
        if result.rule_violations_detected() {
            return Err(ConformanceError::AssertionFailed(messages::format(
                MessageKey::NotSchemaValid,
                &[&result.rule_violation_count(), &result.report()],
            )));
        }
        Ok(())
    }
}
