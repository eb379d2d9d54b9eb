//! # ets-core
//!
//! Conformance assertions for executable test suites: namespace-aware XPath
//! checks, W3C XML Schema and Schematron validation with full error
//! accumulation, URI resolution with XInclude, and HTTP status and content-type
//! checks. Failures carry localized messages.
//!
//! ```no_run
//! use ets_core::{NamespaceBindings, ResourceResolver, assertions};
//!
//! # fn main() -> ets_core::Result<()> {
//! let doc = ResourceResolver::new()?
//!     .resolve_as_document("http://example.org/wfs?request=GetCapabilities")?;
//! let mut ns = NamespaceBindings::new();
//! ns.add_binding("http://www.opengis.net/wfs/2.0", "wfs");
//! assertions::assert_xpath("/wfs:WFS_Capabilities", doc.root_element(), &ns)?;
//! # Ok(())
//! # }
//! ```

pub mod assertions;
pub mod cli;
pub mod collector;
pub mod config;
pub mod controller;
pub mod dom;
pub mod error;
pub mod http_client;
pub mod keywords;
pub mod libxml2;
pub mod logging;
pub mod messages;
pub mod namespaces;
pub mod output;
pub mod resolver;
pub mod schema;
pub mod schematron;
pub mod soap;
pub mod xpath;

pub use cli::{Cli, Command, OutputFormat, VerbosityLevel};
pub use collector::{Severity, ValidationCollector, Violation};
pub use config::{ConfigError, ConfigManager, ToolkitConfig};
pub use controller::{
    ArgumentError, ConfigRef, ControllerRegistry, EtsMetadata, ExecutionError, ReportRef,
    TestRunArgs, TestRunController, do_test_run, find_xml_args, results_directory,
};
pub use dom::{NodeKind, ParseOptions, QualifiedName, XmlDocument, XmlNode};
pub use error::{ConformanceError, LibXml2Error, Result};
pub use http_client::{
    BlockingHttpClient, HttpClientConfig, HttpResponse, HttpTransport, ResponseHeaders,
};
pub use keywords::{DfddKeywordMatcher, KeywordMatcher};
pub use messages::{MessageCatalog, MessageKey};
pub use namespaces::NamespaceBindings;
pub use output::{CheckReport, CheckStatus, Output};
pub use resolver::{LocalResource, ResourceResolver, resolve_relative_uri};
pub use schema::{CompiledSchema, SchemaValidationService};
pub use schematron::{RuleSchema, RuleValidationResult, RuleValidationService};
pub use soap::SoapVersion;
pub use xpath::{NodeItem, XPathItem, XmlSource};
