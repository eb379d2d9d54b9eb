//! Resolution of URIs to parsed documents or local files.
//!
//! Every network access is a single blocking GET through an [`HttpTransport`]
//! without timeout or retry. `file:` URIs never touch the network.

use std::fmt;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempPath;
use url::Url;

use crate::dom::{ParseOptions, XmlDocument};
use crate::error::{ConformanceError, Result};
use crate::http_client::{BlockingHttpClient, HttpClientConfig, HttpTransport};
use crate::libxml2::TransportScope;
use crate::messages::{self, MessageKey};

/// Parse `uri`, rejecting anything that is not an absolute URI.
pub fn require_absolute_uri(uri: &str) -> Result<Url> {
    Url::parse(uri.trim()).map_err(|_| {
        ConformanceError::InvalidArgument(format!(
            "Absolute URI is required, but received {}",
            uri
        ))
    })
}

/// Resolve `reference` against `base` (RFC 3986 section 5.2).
pub fn resolve_relative_uri(base: &str, reference: &str) -> Result<String> {
    let base_url = Url::parse(base).map_err(|_| {
        ConformanceError::InvalidArgument(format!("Base URI has no scheme component: {}", base))
    })?;
    Ok(base_url.join(reference)?.to_string())
}

/// Interpret `location` as an absolute URI, or else as a filesystem path.
pub fn to_absolute_uri(location: &str) -> Result<Url> {
    match Url::parse(location) {
        // A one-letter scheme is a Windows drive letter, not a URI
        Ok(url) if url.scheme().len() > 1 => Ok(url),
        _ => {
            let absolute = std::path::absolute(Path::new(location))?;
            Url::from_file_path(&absolute).map_err(|_| {
                ConformanceError::InvalidArgument(format!(
                    "Cannot express {} as a file URI",
                    absolute.display()
                ))
            })
        }
    }
}

/// File produced by [`ResourceResolver::dereference`]
#[derive(Debug)]
pub enum LocalResource {
    /// The URI already named a local file; nothing was copied
    Local(PathBuf),
    /// Downloaded content; the file is deleted when this value is dropped
    Temporary(TempPath),
}

impl LocalResource {
    pub fn path(&self) -> &Path {
        match self {
            LocalResource::Local(path) => path,
            LocalResource::Temporary(temp) => temp,
        }
    }

    pub fn is_temporary(&self) -> bool {
        matches!(self, LocalResource::Temporary(_))
    }

    /// Keep the file past this value's lifetime; the caller now owns cleanup.
    pub fn keep(self) -> Result<PathBuf> {
        match self {
            LocalResource::Local(path) => Ok(path),
            LocalResource::Temporary(temp) => temp.keep().map_err(|e| e.error.into()),
        }
    }
}

impl AsRef<Path> for LocalResource {
    fn as_ref(&self) -> &Path {
        self.path()
    }
}

/// Resolves URIs to XML documents or local byte files
#[derive(Clone)]
pub struct ResourceResolver {
    transport: Arc<dyn HttpTransport>,
}

impl fmt::Debug for ResourceResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceResolver").finish_non_exhaustive()
    }
}

impl ResourceResolver {
    /// Resolver backed by a default blocking HTTP client
    pub fn new() -> Result<Self> {
        Self::with_config(HttpClientConfig::default())
    }

    pub fn with_config(config: HttpClientConfig) -> Result<Self> {
        Ok(Self::with_transport(Arc::new(BlockingHttpClient::new(config)?)))
    }

    pub fn with_transport(transport: Arc<dyn HttpTransport>) -> Self {
        Self { transport }
    }

    /// Fetch and parse `uri` with XInclude processing.
    ///
    /// Entity references are not expanded, and included content carries no
    /// `xml:base` fixup attributes. Remote includes are fetched through this
    /// resolver's transport. The URI becomes the document's base URI.
    ///
    /// A response without any entity body is an assertion failure.
    pub fn resolve_as_document(&self, uri: &str) -> Result<XmlDocument> {
        let url = require_absolute_uri(uri)?;
        let bytes = self.fetch_bytes(&url)?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Err(ConformanceError::AssertionFailed(messages::format(
                MessageKey::MissingXmlEntity,
                &[&url],
            )));
        }
        let _scope = self.scope();
        let document = XmlDocument::parse_bytes(&bytes, Some(url.as_str()), ParseOptions::with_xinclude())?;
        log::debug!("Resolved {} as XML document", url);
        Ok(document)
    }

    /// Make the content identified by `uri` available as a local file.
    ///
    /// `file:` URIs return their own path. Anything else is fetched with one GET
    /// and streamed into a new temporary file named `entity-*`, with an `.xml`
    /// suffix when the declared content type ends in "xml". A response without
    /// a body yields an empty file.
    pub fn dereference(&self, uri: &str) -> Result<LocalResource> {
        let url = require_absolute_uri(uri)?;
        if url.scheme().eq_ignore_ascii_case("file") {
            return file_path(&url).map(LocalResource::Local);
        }

        let mut response = self.transport.get(&url)?;
        let suffix = response
            .headers
            .first("Content-Type")
            .filter(|content_type| declares_xml(content_type))
            .map_or("", |_| ".xml");

        let mut file = tempfile::Builder::new()
            .prefix("entity-")
            .suffix(suffix)
            .tempfile()?;
        let written = io::copy(&mut response.body, &mut file)?;
        file.flush()?;
        let temp_path = file.into_temp_path();
        log::debug!(
            "Wrote {} bytes to file at {}",
            written,
            temp_path.display()
        );
        Ok(LocalResource::Temporary(temp_path))
    }

    /// Make this resolver's transport the one libxml2 uses for remote references
    /// on the current thread while the returned scope lives.
    pub(crate) fn scope(&self) -> TransportScope {
        TransportScope::install(Arc::clone(&self.transport))
    }

    fn fetch_bytes(&self, url: &Url) -> Result<Vec<u8>> {
        match url.scheme() {
            "file" => Ok(std::fs::read(file_path(url)?)?),
            "http" | "https" => {
                let mut response = self.transport.get(url)?;
                if !response.is_success() {
                    return Err(ConformanceError::HttpStatus {
                        url: url.to_string(),
                        status: response.status,
                    });
                }
                let mut bytes = Vec::new();
                response.body.read_to_end(&mut bytes)?;
                Ok(bytes)
            }
            other => Err(ConformanceError::InvalidArgument(format!(
                "Unsupported URI scheme '{}' in {}",
                other, url
            ))),
        }
    }
}

fn file_path(url: &Url) -> Result<PathBuf> {
    url.to_file_path().map_err(|_| {
        ConformanceError::InvalidArgument(format!("Not a local file URI: {}", url))
    })
}

/// `application/gml+xml; subtype=gml/3.2` and `text/xml` declare XML; parameters
/// are ignored.
fn declares_xml(content_type: &str) -> bool {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
        .ends_with("xml")
}
