//! LibXML2 FFI Layer
//!
//! Direct bindings to the parts of libxml2 this crate drives: namespace-aware
//! parsing with XInclude, XPath 1.0, W3C XML Schema and ISO Schematron validation,
//! tree serialization, and custom input callbacks for remote resources.
//!
//! ## Thread Safety Strategy
//!
//! - **Initialization**: `xmlInitParser()` is not thread-safe, so it runs exactly once
//!   behind a `std::sync::Once`.
//! - **Error handlers**: libxml2 keeps the structured error handler in thread-local
//!   storage, so [`ErrorCapture`] only ever observes errors raised on its own thread.
//! - **Documents, contexts, collectors**: single-call scoped. Nothing here is shared
//!   between concurrent evaluations.
//!
//! ## Struct layouts
//!
//! Only the public, ABI-stable leading fields of `xmlNode`, `xmlNs`, `xmlNodeSet`,
//! `xmlXPathObject` and `xmlError` are declared. `xmlDoc` and `xmlAttr` share the
//! `xmlNode` prefix up to `ns`, which is all the tree walker reads.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::io::{Cursor, Read};
use std::sync::{Arc, Once, OnceLock};

use libc::{c_char, c_double, c_int, c_long, c_uchar, c_uint, c_ushort, c_void};

use crate::collector::{Severity, ValidationCollector, Violation};
use crate::error::{LibXml2Error, LibXml2Result};
use crate::http_client::{BlockingHttpClient, HttpClientConfig, HttpTransport};

/// Global initialization flag for libxml2
static LIBXML2_INIT: Once = Once::new();

/// Registration flag for the HTTP(S) input callbacks
static HTTP_CALLBACKS: Once = Once::new();

/// Fallback transport for remote references followed outside any [`TransportScope`]
static CALLBACK_TRANSPORT: OnceLock<Option<BlockingHttpClient>> = OnceLock::new();

thread_local! {
    /// Transport installed by the innermost live [`TransportScope`] on this thread
    static ACTIVE_TRANSPORT: RefCell<Option<Arc<dyn HttpTransport>>> = const { RefCell::new(None) };
}

pub type XmlChar = c_uchar;

// Parser options (xmlParserOption)
pub const XML_PARSE_XINCLUDE: c_int = 1 << 10;
pub const XML_PARSE_NOBASEFIX: c_int = 1 << 14;
pub const XML_PARSE_NOXINCNODE: c_int = 1 << 15;

// Element types (xmlElementType)
pub const XML_ELEMENT_NODE: c_int = 1;
pub const XML_ATTRIBUTE_NODE: c_int = 2;
pub const XML_TEXT_NODE: c_int = 3;
pub const XML_CDATA_SECTION_NODE: c_int = 4;
pub const XML_PI_NODE: c_int = 7;
pub const XML_COMMENT_NODE: c_int = 8;
pub const XML_DOCUMENT_NODE: c_int = 9;
pub const XML_NAMESPACE_DECL: c_int = 18;

// XPath object types (xmlXPathObjectType)
pub const XPATH_NODESET: c_int = 1;
pub const XPATH_BOOLEAN: c_int = 2;
pub const XPATH_NUMBER: c_int = 3;
pub const XPATH_STRING: c_int = 4;

// Error levels (xmlErrorLevel)
pub const XML_ERR_WARNING: c_int = 1;
pub const XML_ERR_ERROR: c_int = 2;
pub const XML_ERR_FATAL: c_int = 3;

// Error domains and codes used to classify Schematron output
pub const XML_FROM_SCHEMATRONV: c_int = 28;
pub const XML_SCHEMATRONV_ASSERT: c_int = 4000;
pub const XML_SCHEMATRONV_REPORT: c_int = 4001;

// Schematron validation options (xmlSchematronValidOptions)
pub const XML_SCHEMATRON_OUT_ERROR: c_int = 1 << 3;

/// Opaque libxml2 structures
#[repr(C)]
pub struct XmlDoc {
    _private: [u8; 0],
}

#[repr(C)]
pub struct XmlBuffer {
    _private: [u8; 0],
}

#[repr(C)]
pub struct XmlSchema {
    _private: [u8; 0],
}

#[repr(C)]
pub struct XmlSchemaParserCtxt {
    _private: [u8; 0],
}

#[repr(C)]
pub struct XmlSchemaValidCtxt {
    _private: [u8; 0],
}

#[repr(C)]
pub struct XmlSchematron {
    _private: [u8; 0],
}

#[repr(C)]
pub struct XmlSchematronParserCtxt {
    _private: [u8; 0],
}

#[repr(C)]
pub struct XmlSchematronValidCtxt {
    _private: [u8; 0],
}

#[repr(C)]
pub struct XmlXPathContext {
    _private: [u8; 0],
}

#[repr(C)]
pub struct XmlXPathCompExpr {
    _private: [u8; 0],
}

#[repr(C)]
pub struct XmlNs {
    pub next: *mut XmlNs,
    pub ns_type: c_int,
    pub href: *const XmlChar,
    pub prefix: *const XmlChar,
    pub _private: *mut c_void,
    pub context: *mut XmlDoc,
}

#[repr(C)]
pub struct XmlNode {
    pub _private: *mut c_void,
    pub node_type: c_int,
    pub name: *const XmlChar,
    pub children: *mut XmlNode,
    pub last: *mut XmlNode,
    pub parent: *mut XmlNode,
    pub next: *mut XmlNode,
    pub prev: *mut XmlNode,
    pub doc: *mut XmlDoc,
    pub ns: *mut XmlNs,
    pub content: *mut XmlChar,
    pub properties: *mut c_void,
    pub ns_def: *mut XmlNs,
    pub psvi: *mut c_void,
    pub line: c_ushort,
    pub extra: c_ushort,
}

#[repr(C)]
pub struct XmlNodeSet {
    pub node_nr: c_int,
    pub node_max: c_int,
    pub node_tab: *mut *mut XmlNode,
}

#[repr(C)]
pub struct XmlXPathObject {
    pub object_type: c_int,
    pub nodesetval: *mut XmlNodeSet,
    pub boolval: c_int,
    pub floatval: c_double,
    pub stringval: *mut XmlChar,
    pub user: *mut c_void,
    pub index: c_int,
    pub user2: *mut c_void,
    pub index2: c_int,
}

#[repr(C)]
pub struct XmlError {
    pub domain: c_int,
    pub code: c_int,
    pub message: *const c_char,
    pub level: c_int,
    pub file: *const c_char,
    pub line: c_int,
    pub str1: *const c_char,
    pub str2: *const c_char,
    pub str3: *const c_char,
    pub int1: c_int,
    pub int2: c_int,
    pub ctxt: *mut c_void,
    pub node: *mut c_void,
}

pub type XmlStructuredErrorFunc =
    Option<unsafe extern "C" fn(user_data: *mut c_void, error: *mut XmlError)>;

pub type XmlFreeFunc = Option<unsafe extern "C" fn(mem: *mut c_void)>;

pub type XmlInputMatchCallback = Option<unsafe extern "C" fn(filename: *const c_char) -> c_int>;
pub type XmlInputOpenCallback =
    Option<unsafe extern "C" fn(filename: *const c_char) -> *mut c_void>;
pub type XmlInputReadCallback =
    Option<unsafe extern "C" fn(context: *mut c_void, buffer: *mut c_char, len: c_int) -> c_int>;
pub type XmlInputCloseCallback = Option<unsafe extern "C" fn(context: *mut c_void) -> c_int>;

// External libxml2 FFI declarations
#[cfg_attr(target_os = "windows", link(name = "libxml2"))]
#[cfg_attr(not(target_os = "windows"), link(name = "xml2"))]
unsafe extern "C" {
    #[allow(non_upper_case_globals)]
    pub static xmlFree: XmlFreeFunc;

    pub fn xmlInitParser();
    pub fn xmlInitGlobals();

    pub fn xmlSetStructuredErrorFunc(ctx: *mut c_void, handler: XmlStructuredErrorFunc);
    pub fn xmlRegisterInputCallbacks(
        match_func: XmlInputMatchCallback,
        open_func: XmlInputOpenCallback,
        read_func: XmlInputReadCallback,
        close_func: XmlInputCloseCallback,
    ) -> c_int;

    // Parsing and tree access
    pub fn xmlReadMemory(
        buffer: *const c_char,
        size: c_int,
        url: *const c_char,
        encoding: *const c_char,
        options: c_int,
    ) -> *mut XmlDoc;
    pub fn xmlFreeDoc(doc: *mut XmlDoc);
    pub fn xmlXIncludeProcessFlags(doc: *mut XmlDoc, flags: c_int) -> c_int;
    pub fn xmlDocGetRootElement(doc: *const XmlDoc) -> *mut XmlNode;
    pub fn xmlNodeGetContent(node: *const XmlNode) -> *mut XmlChar;
    pub fn xmlGetProp(node: *const XmlNode, name: *const XmlChar) -> *mut XmlChar;
    pub fn xmlGetNodePath(node: *const XmlNode) -> *mut XmlChar;
    pub fn xmlGetLineNo(node: *const XmlNode) -> c_long;

    // Serialization
    pub fn xmlBufferCreate() -> *mut XmlBuffer;
    pub fn xmlBufferFree(buf: *mut XmlBuffer);
    pub fn xmlBufferContent(buf: *const XmlBuffer) -> *const XmlChar;
    pub fn xmlNodeDump(
        buf: *mut XmlBuffer,
        doc: *mut XmlDoc,
        node: *mut XmlNode,
        level: c_int,
        format: c_int,
    ) -> c_int;

    // XPath
    pub fn xmlXPathNewContext(doc: *mut XmlDoc) -> *mut XmlXPathContext;
    pub fn xmlXPathFreeContext(ctxt: *mut XmlXPathContext);
    pub fn xmlXPathSetContextNode(node: *mut XmlNode, ctxt: *mut XmlXPathContext) -> c_int;
    pub fn xmlXPathRegisterNs(
        ctxt: *mut XmlXPathContext,
        prefix: *const XmlChar,
        ns_uri: *const XmlChar,
    ) -> c_int;
    pub fn xmlXPathCtxtCompile(
        ctxt: *mut XmlXPathContext,
        expr: *const XmlChar,
    ) -> *mut XmlXPathCompExpr;
    pub fn xmlXPathFreeCompExpr(comp: *mut XmlXPathCompExpr);
    pub fn xmlXPathCompiledEval(
        comp: *mut XmlXPathCompExpr,
        ctxt: *mut XmlXPathContext,
    ) -> *mut XmlXPathObject;
    pub fn xmlXPathCompiledEvalToBoolean(
        comp: *mut XmlXPathCompExpr,
        ctxt: *mut XmlXPathContext,
    ) -> c_int;
    pub fn xmlXPathFreeObject(obj: *mut XmlXPathObject);

    // Schema parsing functions
    pub fn xmlSchemaNewMemParserCtxt(
        buffer: *const c_char,
        size: c_int,
    ) -> *mut XmlSchemaParserCtxt;
    pub fn xmlSchemaNewDocParserCtxt(doc: *mut XmlDoc) -> *mut XmlSchemaParserCtxt;
    pub fn xmlSchemaSetParserStructuredErrors(
        ctxt: *mut XmlSchemaParserCtxt,
        serror: XmlStructuredErrorFunc,
        ctx: *mut c_void,
    );
    pub fn xmlSchemaParse(ctxt: *const XmlSchemaParserCtxt) -> *mut XmlSchema;
    pub fn xmlSchemaFreeParserCtxt(ctxt: *mut XmlSchemaParserCtxt);
    pub fn xmlSchemaFree(schema: *mut XmlSchema);

    // Schema validation functions
    pub fn xmlSchemaNewValidCtxt(schema: *const XmlSchema) -> *mut XmlSchemaValidCtxt;
    pub fn xmlSchemaFreeValidCtxt(ctxt: *mut XmlSchemaValidCtxt);
    pub fn xmlSchemaSetValidStructuredErrors(
        ctxt: *mut XmlSchemaValidCtxt,
        serror: XmlStructuredErrorFunc,
        ctx: *mut c_void,
    );
    pub fn xmlSchemaValidateDoc(ctxt: *mut XmlSchemaValidCtxt, doc: *mut XmlDoc) -> c_int;
    pub fn xmlSchemaValidateFile(
        ctxt: *const XmlSchemaValidCtxt,
        file_name: *const c_char,
        options: c_uint,
    ) -> c_int;

    // Schematron
    pub fn xmlSchematronNewMemParserCtxt(
        buffer: *const c_char,
        size: c_int,
    ) -> *mut XmlSchematronParserCtxt;
    pub fn xmlSchematronNewDocParserCtxt(doc: *mut XmlDoc) -> *mut XmlSchematronParserCtxt;
    pub fn xmlSchematronParse(ctxt: *mut XmlSchematronParserCtxt) -> *mut XmlSchematron;
    pub fn xmlSchematronFreeParserCtxt(ctxt: *mut XmlSchematronParserCtxt);
    pub fn xmlSchematronFree(schema: *mut XmlSchematron);
    pub fn xmlSchematronNewValidCtxt(
        schema: *mut XmlSchematron,
        options: c_int,
    ) -> *mut XmlSchematronValidCtxt;
    pub fn xmlSchematronFreeValidCtxt(ctxt: *mut XmlSchematronValidCtxt);
    pub fn xmlSchematronSetValidStructuredErrors(
        ctxt: *mut XmlSchematronValidCtxt,
        serror: XmlStructuredErrorFunc,
        ctx: *mut c_void,
    );
    pub fn xmlSchematronValidateDoc(
        ctxt: *mut XmlSchematronValidCtxt,
        doc: *mut XmlDoc,
    ) -> c_int;
}

/// Initialize libxml2 exactly once and route `http://`/`https://` reads through
/// the crate's blocking HTTP client.
pub fn init() {
    LIBXML2_INIT.call_once(|| unsafe {
        xmlInitParser();
        xmlInitGlobals();
    });
    HTTP_CALLBACKS.call_once(|| unsafe {
        let registered = xmlRegisterInputCallbacks(
            Some(http_match),
            Some(http_open),
            Some(http_read),
            Some(http_close),
        );
        if registered < 0 {
            log::warn!("Failed to register HTTP input callbacks with libxml2");
        }
    });
}

/// Convert a Rust string into a NUL-terminated C string.
pub(crate) fn to_c_string(value: &str) -> LibXml2Result<CString> {
    CString::new(value).map_err(|_| LibXml2Error::InteriorNul {
        value: value.replace('\0', "\\0"),
    })
}

/// Copy a borrowed libxml2 string without taking ownership.
///
/// # Safety
///
/// `ptr` must be null or point to a NUL-terminated string that stays valid for the call.
pub(crate) unsafe fn borrowed_string(ptr: *const XmlChar) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    let c_str = unsafe { CStr::from_ptr(ptr as *const c_char) };
    Some(c_str.to_string_lossy().into_owned())
}

/// Copy a libxml2-allocated string and release it with `xmlFree`.
///
/// # Safety
///
/// `ptr` must be null or a string allocated by libxml2 that the caller owns.
pub(crate) unsafe fn owned_string(ptr: *mut XmlChar) -> Option<String> {
    let value = unsafe { borrowed_string(ptr) };
    if !ptr.is_null() {
        unsafe { free(ptr as *mut c_void) };
    }
    value
}

/// Release memory handed out by libxml2.
///
/// # Safety
///
/// `ptr` must have been allocated by libxml2's allocator and not freed yet.
pub(crate) unsafe fn free(ptr: *mut c_void) {
    match unsafe { xmlFree } {
        Some(free_func) => unsafe { free_func(ptr) },
        None => unsafe { libc::free(ptr) },
    }
}

/// Callback for libxml2 to report errors into a [`ValidationCollector`] (structured)
pub(crate) unsafe extern "C" fn structured_error_callback(
    user_data: *mut c_void,
    error: *mut XmlError,
) {
    if user_data.is_null() || error.is_null() {
        return;
    }
    let collector = unsafe { &mut *(user_data as *mut ValidationCollector) };
    let violation = unsafe { violation_from_error(&*error) };
    collector.record(violation);
}

/// Translate a libxml2 error record into a [`Violation`].
unsafe fn violation_from_error(error: &XmlError) -> Violation {
    let message = if error.message.is_null() {
        "unknown error".to_string()
    } else {
        let c_str = unsafe { CStr::from_ptr(error.message) };
        c_str.to_string_lossy().trim().to_string()
    };

    let severity = match error.level {
        XML_ERR_WARNING => Severity::Warning,
        XML_ERR_FATAL => Severity::Fatal,
        _ if error.domain == XML_FROM_SCHEMATRONV && error.code == XML_SCHEMATRONV_REPORT => {
            Severity::Notice
        }
        _ => Severity::Error,
    };

    let node_path = if error.node.is_null() {
        None
    } else {
        unsafe { owned_string(xmlGetNodePath(error.node as *const XmlNode)) }
    };
    let file = if error.file.is_null() {
        None
    } else {
        let c_str = unsafe { CStr::from_ptr(error.file) };
        Some(c_str.to_string_lossy().into_owned())
    };

    let line = (error.line > 0).then_some(error.line as u32);
    let column = (error.int2 > 0).then_some(error.int2 as u32);

    Violation {
        severity,
        domain: error.domain,
        code: error.code,
        location: Violation::format_location(node_path.as_deref(), file.as_deref(), line, column),
        message,
        line,
    }
}

/// Captures errors libxml2 raises on the current thread through the global
/// structured error handler, restoring the default handler on drop.
pub(crate) struct ErrorCapture {
    collector: Box<ValidationCollector>,
}

impl ErrorCapture {
    pub(crate) fn start() -> Self {
        init();
        let mut collector = Box::new(ValidationCollector::new());
        unsafe {
            xmlSetStructuredErrorFunc(
                &mut *collector as *mut ValidationCollector as *mut c_void,
                Some(structured_error_callback),
            );
        }
        Self { collector }
    }

    /// Stop capturing and hand back everything libxml2 reported.
    pub(crate) fn finish(mut self) -> ValidationCollector {
        unsafe { xmlSetStructuredErrorFunc(std::ptr::null_mut(), None) };
        std::mem::take(&mut *self.collector)
    }
}

impl Drop for ErrorCapture {
    fn drop(&mut self) {
        // Restoring twice after finish() is harmless.
        unsafe { xmlSetStructuredErrorFunc(std::ptr::null_mut(), None) };
    }
}

/// Routes the remote reads libxml2 makes on this thread (XInclude `href`s,
/// `xs:include`/`xs:import` locations) through `transport` until dropped.
/// Scopes nest; dropping one reinstates the transport it replaced.
pub(crate) struct TransportScope {
    previous: Option<Arc<dyn HttpTransport>>,
}

impl TransportScope {
    pub(crate) fn install(transport: Arc<dyn HttpTransport>) -> Self {
        init();
        let previous = ACTIVE_TRANSPORT.with(|slot| slot.replace(Some(transport)));
        Self { previous }
    }
}

impl Drop for TransportScope {
    fn drop(&mut self) {
        let previous = self.previous.take();
        ACTIVE_TRANSPORT.with(|slot| {
            slot.replace(previous);
        });
    }
}

fn scoped_transport() -> Option<Arc<dyn HttpTransport>> {
    ACTIVE_TRANSPORT
        .try_with(|slot| slot.borrow().clone())
        .ok()
        .flatten()
}

fn callback_transport() -> Option<&'static BlockingHttpClient> {
    CALLBACK_TRANSPORT
        .get_or_init(|| match BlockingHttpClient::new(HttpClientConfig::default()) {
            Ok(client) => Some(client),
            Err(err) => {
                log::warn!("HTTP client for libxml2 input callbacks unavailable: {}", err);
                None
            }
        })
        .as_ref()
}

unsafe extern "C" fn http_match(filename: *const c_char) -> c_int {
    if filename.is_null() {
        return 0;
    }
    let name = unsafe { CStr::from_ptr(filename) }.to_string_lossy();
    let lower = name.to_ascii_lowercase();
    (lower.starts_with("http://") || lower.starts_with("https://")) as c_int
}

unsafe extern "C" fn http_open(filename: *const c_char) -> *mut c_void {
    if filename.is_null() {
        return std::ptr::null_mut();
    }
    let name = unsafe { CStr::from_ptr(filename) }
        .to_string_lossy()
        .into_owned();
    let Ok(url) = url::Url::parse(&name) else {
        return std::ptr::null_mut();
    };

    let response = match scoped_transport() {
        Some(transport) => transport.get(&url),
        None => match callback_transport() {
            Some(transport) => transport.get(&url),
            None => return std::ptr::null_mut(),
        },
    };
    let fetched = response.and_then(|mut response| {
        if !(200..300).contains(&response.status) {
            return Err(crate::error::ConformanceError::HttpStatus {
                url: name.clone(),
                status: response.status,
            });
        }
        let mut body = Vec::new();
        response.body.read_to_end(&mut body)?;
        Ok(body)
    });

    match fetched {
        Ok(body) => {
            log::debug!("libxml2 fetched {} bytes from {}", body.len(), name);
            Box::into_raw(Box::new(Cursor::new(body))) as *mut c_void
        }
        Err(err) => {
            log::warn!("libxml2 could not fetch {}: {}", name, err);
            std::ptr::null_mut()
        }
    }
}

unsafe extern "C" fn http_read(context: *mut c_void, buffer: *mut c_char, len: c_int) -> c_int {
    if context.is_null() || buffer.is_null() || len < 0 {
        return -1;
    }
    let cursor = unsafe { &mut *(context as *mut Cursor<Vec<u8>>) };
    let out = unsafe { std::slice::from_raw_parts_mut(buffer as *mut u8, len as usize) };
    match cursor.read(out) {
        Ok(n) => n as c_int,
        Err(_) => -1,
    }
}

unsafe extern "C" fn http_close(context: *mut c_void) -> c_int {
    if !context.is_null() {
        drop(unsafe { Box::from_raw(context as *mut Cursor<Vec<u8>>) });
    }
    0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        init();
        init();
    }

    #[test]
    fn test_to_c_string_rejects_interior_nul() {
        assert!(to_c_string("plain").is_ok());
        match to_c_string("bad\0value") {
            Err(LibXml2Error::InteriorNul { value }) => assert_eq!(value, "bad\\0value"),
            other => panic!("Expected InteriorNul, got {:?}", other),
        }
    }

    #[test]
    fn test_http_match_only_accepts_remote_schemes() {
        let http = CString::new("http://example.com/a.xml").unwrap();
        let https = CString::new("HTTPS://example.com/a.xml").unwrap();
        let file = CString::new("file:///tmp/a.xml").unwrap();
        unsafe {
            assert_eq!(http_match(http.as_ptr()), 1);
            assert_eq!(http_match(https.as_ptr()), 1);
            assert_eq!(http_match(file.as_ptr()), 0);
            assert_eq!(http_match(std::ptr::null()), 0);
        }
    }

    #[test]
    fn test_http_read_drains_cursor() {
        let context = Box::into_raw(Box::new(Cursor::new(b"<a/>".to_vec()))) as *mut c_void;
        let mut buffer = [0 as c_char; 16];
        unsafe {
            assert_eq!(http_read(context, buffer.as_mut_ptr(), 16), 4);
            assert_eq!(http_read(context, buffer.as_mut_ptr(), 16), 0);
            assert_eq!(http_close(context), 0);
        }
    }

    #[test]
    fn test_error_capture_collects_parse_errors() {
        let capture = ErrorCapture::start();
        let data = b"<root><unclosed></root>";
        let doc = unsafe {
            xmlReadMemory(
                data.as_ptr() as *const c_char,
                data.len() as c_int,
                std::ptr::null(),
                std::ptr::null(),
                0,
            )
        };
        let collector = capture.finish();

        assert!(doc.is_null());
        assert!(collector.has_violations());
        assert!(collector.has_fatal_errors());
    }
    struct FixedTransport(&'static [u8]);

    impl HttpTransport for FixedTransport {
        fn get(&self, _url: &url::Url) -> crate::error::Result<crate::http_client::HttpResponse> {
            Ok(crate::http_client::HttpResponse {
                status: 200,
                headers: Default::default(),
                body: Box::new(self.0),
            })
        }
    }

    #[test]
    fn test_transport_scopes_nest_and_restore() {
        assert!(scoped_transport().is_none());
        {
            let _outer = TransportScope::install(Arc::new(FixedTransport(b"<outer/>")));
            let outer = scoped_transport().unwrap();
            {
                let _inner = TransportScope::install(Arc::new(FixedTransport(b"<inner/>")));
                assert!(!Arc::ptr_eq(&outer, &scoped_transport().unwrap()));
            }
            assert!(Arc::ptr_eq(&outer, &scoped_transport().unwrap()));
        }
        assert!(scoped_transport().is_none());
    }

    #[test]
    fn test_http_open_reads_through_scoped_transport() {
        let _scope = TransportScope::install(Arc::new(FixedTransport(b"<part/>")));
        let name = CString::new("http://example.org/part.xml").unwrap();
        let mut buffer = [0 as c_char; 16];
        unsafe {
            let context = http_open(name.as_ptr());
            assert!(!context.is_null());
            assert_eq!(http_read(context, buffer.as_mut_ptr(), 16), 7);
            assert_eq!(http_close(context), 0);
        }
    }
}
