//! W3C XML Schema validation.
//!
//! A [`CompiledSchema`] is parsed once and shared freely: libxml2 schemas are
//! read-only after parsing, so validation may run on many threads at once, each
//! with its own validation context and [`ValidationCollector`].

use std::marker::PhantomData;
use std::path::Path;
use std::sync::Arc;

use libc::c_void;

use crate::collector::{Severity, ValidationCollector, Violation};
use crate::dom::{ParseOptions, XmlDocument};
use crate::error::{ConformanceError, LibXml2Error, Result};
use crate::libxml2::{self as ffi, ErrorCapture};
use crate::messages::{self, MessageKey};
use crate::resolver::{ResourceResolver, to_absolute_uri};

/// Thread-safe handle to a parsed XML Schema
#[derive(Debug, Clone)]
pub struct CompiledSchema {
    inner: Arc<SchemaInner>,
}

#[derive(Debug)]
struct SchemaInner {
    ptr: *mut ffi::XmlSchema,
    location: String,
    // The schema may point into its source tree, which must outlive it
    _source: XmlDocument,
    _phantom: PhantomData<ffi::XmlSchema>,
}

// Safety: libxml2 xmlSchema structures are read-only once parsed.
// See: http://xmlsoft.org/threads.html
unsafe impl Send for SchemaInner {}
unsafe impl Sync for SchemaInner {}

impl Drop for SchemaInner {
    fn drop(&mut self) {
        if !self.ptr.is_null() {
            unsafe { ffi::xmlSchemaFree(self.ptr) };
            self.ptr = std::ptr::null_mut();
        }
    }
}

impl CompiledSchema {
    /// Compile schema text. `base_uri` anchors relative `xs:include`/`xs:import`
    /// locations.
    pub fn from_bytes(bytes: &[u8], base_uri: Option<&str>) -> Result<Self> {
        let location = base_uri.unwrap_or("<memory>").to_string();
        let document = XmlDocument::parse_bytes(bytes, base_uri, ParseOptions::default()).map_err(
            |e| ConformanceError::SchemaCompile {
                location: location.clone(),
                details: e.to_string(),
            },
        )?;
        Self::compile(document, location)
    }

    /// Compile the schema at a file path or absolute URI.
    pub fn from_location(location: &str) -> Result<Self> {
        Self::from_location_with(location, &ResourceResolver::new()?)
    }

    /// Like [`from_location`](Self::from_location), fetching the schema and
    /// every remote `xs:include`/`xs:import` through `resolver`.
    pub fn from_location_with(location: &str, resolver: &ResourceResolver) -> Result<Self> {
        let uri = to_absolute_uri(location)?;
        let document =
            resolver
                .resolve_as_document(uri.as_str())
                .map_err(|e| ConformanceError::SchemaCompile {
                    location: location.to_string(),
                    details: e.to_string(),
                })?;
        let _scope = resolver.scope();
        Self::compile(document, uri.to_string())
    }

    /// Compile an already parsed schema document.
    pub fn from_document(document: XmlDocument) -> Result<Self> {
        let location = document.base_uri().unwrap_or("<memory>").to_string();
        Self::compile(document, location)
    }

    fn compile(document: XmlDocument, location: String) -> Result<Self> {
        ffi::init();
        let parser_ctxt = unsafe { ffi::xmlSchemaNewDocParserCtxt(document.as_ptr()) };
        if parser_ctxt.is_null() {
            return Err(LibXml2Error::MemoryAllocation.into());
        }

        let mut collector = Box::new(ValidationCollector::new());
        let schema_ptr = unsafe {
            ffi::xmlSchemaSetParserStructuredErrors(
                parser_ctxt,
                Some(ffi::structured_error_callback),
                &mut *collector as *mut ValidationCollector as *mut c_void,
            );
            let schema_ptr = ffi::xmlSchemaParse(parser_ctxt);
            ffi::xmlSchemaFreeParserCtxt(parser_ctxt);
            schema_ptr
        };

        if schema_ptr.is_null() {
            let details = if collector.is_empty() {
                LibXml2Error::SchemaParseFailed.to_string()
            } else {
                collector.report()
            };
            return Err(ConformanceError::SchemaCompile { location, details });
        }

        log::debug!("Compiled XML Schema from {}", location);
        Ok(CompiledSchema {
            inner: Arc::new(SchemaInner {
                ptr: schema_ptr,
                location,
                _source: document,
                _phantom: PhantomData,
            }),
        })
    }

    /// Where the schema was loaded from
    pub fn location(&self) -> &str {
        &self.inner.location
    }

    /// Validate a parsed document, collecting every problem.
    pub fn check(&self, document: &XmlDocument) -> Result<ValidationCollector> {
        let valid_ctxt = ValidContext::new(self)?;
        let mut collector = Box::new(ValidationCollector::new());
        let code = unsafe {
            valid_ctxt.route_errors_to(&mut collector);
            ffi::xmlSchemaValidateDoc(valid_ctxt.ptr, document.as_ptr())
        };
        drop(valid_ctxt);
        finish_validation(code, *collector, document.base_uri().unwrap_or("<memory>"))
    }

    /// Validate a file as a stream, collecting every problem.
    pub fn check_file(&self, path: &Path) -> Result<ValidationCollector> {
        // Missing files are I/O errors, not XML errors
        std::fs::metadata(path)?;
        let path_str = path.to_str().ok_or_else(|| {
            ConformanceError::InvalidArgument(format!("Path is not valid UTF-8: {}", path.display()))
        })?;
        let c_path = ffi::to_c_string(path_str)?;

        let valid_ctxt = ValidContext::new(self)?;
        let mut collector = Box::new(ValidationCollector::new());
        // Well-formedness errors come from the parser, not the validation context
        let capture = ErrorCapture::start();
        let code = unsafe {
            valid_ctxt.route_errors_to(&mut collector);
            ffi::xmlSchemaValidateFile(valid_ctxt.ptr, c_path.as_ptr(), 0)
        };
        let parse_errors = capture.finish();
        drop(valid_ctxt);

        for record in parse_errors.records() {
            collector.record(record.clone());
        }
        finish_validation(code, *collector, path_str)
    }
}

/// Owned `xmlSchemaValidCtxt`
struct ValidContext {
    ptr: *mut ffi::XmlSchemaValidCtxt,
}

impl ValidContext {
    fn new(schema: &CompiledSchema) -> Result<Self> {
        let ptr = unsafe { ffi::xmlSchemaNewValidCtxt(schema.inner.ptr) };
        if ptr.is_null() {
            return Err(LibXml2Error::ValidationContextCreationFailed.into());
        }
        Ok(ValidContext { ptr })
    }

    /// # Safety
    ///
    /// `collector` must stay in place until this context is dropped.
    unsafe fn route_errors_to(&self, collector: &mut Box<ValidationCollector>) {
        unsafe {
            ffi::xmlSchemaSetValidStructuredErrors(
                self.ptr,
                Some(ffi::structured_error_callback),
                &mut **collector as *mut ValidationCollector as *mut c_void,
            );
        }
    }
}

impl Drop for ValidContext {
    fn drop(&mut self) {
        unsafe { ffi::xmlSchemaFreeValidCtxt(self.ptr) };
    }
}

/// Separate processing failures from content violations.
fn finish_validation(code: i32, mut collector: ValidationCollector, source: &str) -> Result<ValidationCollector> {
    if code < 0 || collector.has_fatal_errors() {
        let details = if collector.has_fatal_errors() {
            collector
                .fatal_errors()
                .map(|v| v.to_string())
                .collect::<Vec<_>>()
                .join("\n")
        } else {
            format!("internal validation error (code {})", code)
        };
        return Err(ConformanceError::XmlParse {
            uri: source.to_string(),
            details,
        });
    }
    if code > 0 && !collector.has_violations() {
        collector.record(Violation::new(
            Severity::Error,
            source,
            format!("{} schema violation(s) reported without details", code),
        ));
    }
    log::debug!(
        "Schema validation of {}: {} violation(s)",
        source,
        collector.violation_count()
    );
    Ok(collector)
}

/// Assertion-level schema validation.
///
/// Content violations become an assertion failure carrying the count and the full
/// report. Input that cannot be processed at all fails immediately with the raw
/// error text instead of being counted.
pub struct SchemaValidationService;

impl SchemaValidationService {
    pub fn validate(schema: &CompiledSchema, document: &XmlDocument) -> Result<()> {
        let collector = schema.check(document).map_err(processing_failure)?;
        Self::assert_no_violations(&collector)
    }

    pub fn validate_file(schema: &CompiledSchema, path: &Path) -> Result<()> {
        let collector = schema.check_file(path).map_err(processing_failure)?;
        Self::assert_no_violations(&collector)
    }

    fn assert_no_violations(collector: &ValidationCollector) -> Result<()> {
        if collector.has_violations() {
            return Err(ConformanceError::AssertionFailed(messages::format(
                MessageKey::NotSchemaValid,
                &[&collector.violation_count(), &collector.report()],
            )));
        }
        Ok(())
    }
}

fn processing_failure(error: ConformanceError) -> ConformanceError {
    match error {
        ConformanceError::XmlParse { details, .. } => ConformanceError::AssertionFailed(
            messages::format(MessageKey::XmlError, &[&details]),
        ),
        other => other,
    }
}
