//! Localized diagnostic messages.
//!
//! Templates are packaged TOML tables (one per locale) keyed by [`MessageKey`].
//! Placeholders are positional: `{0}`, `{1}`, ...

use std::collections::HashMap;
use std::fmt::Display;
use std::sync::OnceLock;

use regex::{Captures, Regex};
use thiserror::Error;

const MESSAGES_EN: &str = include_str!("../resources/messages/messages_en.toml");
const MESSAGES_DE: &str = include_str!("../resources/messages/messages_de.toml");

/// Locale used when nothing else is configured or the requested one is unknown
pub const DEFAULT_LOCALE: &str = "en";

/// Locales with a packaged catalog
pub const SUPPORTED_LOCALES: [&str; 2] = ["en", "de"];

static PLACEHOLDER_REGEX: OnceLock<Regex> = OnceLock::new();

static GLOBAL_CATALOG: OnceLock<MessageCatalog> = OnceLock::new();

fn get_placeholder_regex() -> &'static Regex {
    PLACEHOLDER_REGEX
        .get_or_init(|| Regex::new(r"\{(\d+)\}").expect("Failed to compile placeholder regex"))
}

/// Diagnostic kinds with a message template
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKey {
    MissingXmlEntity,
    LocalName,
    NamespaceName,
    XPathError,
    XPathResult,
    NotSchemaValid,
    XmlError,
}

impl MessageKey {
    pub const ALL: [MessageKey; 7] = [
        MessageKey::MissingXmlEntity,
        MessageKey::LocalName,
        MessageKey::NamespaceName,
        MessageKey::XPathError,
        MessageKey::XPathResult,
        MessageKey::NotSchemaValid,
        MessageKey::XmlError,
    ];

    /// Key as it appears in the catalog files
    pub fn key(&self) -> &'static str {
        match self {
            MessageKey::MissingXmlEntity => "MissingXMLEntity",
            MessageKey::LocalName => "LocalName",
            MessageKey::NamespaceName => "NamespaceName",
            MessageKey::XPathError => "XPathError",
            MessageKey::XPathResult => "XPathResult",
            MessageKey::NotSchemaValid => "NotSchemaValid",
            MessageKey::XmlError => "XMLError",
        }
    }
}

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Unknown message key: {0}")]
    UnknownKey(String),

    #[error("Catalog for locale '{locale}' lacks keys: {keys:?}")]
    MissingKeys { locale: String, keys: Vec<&'static str> },

    #[error("Malformed message catalog: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Message templates for one locale
#[derive(Debug, Clone)]
pub struct MessageCatalog {
    locale: String,
    templates: HashMap<String, String>,
}

impl MessageCatalog {
    /// Load the packaged catalog for `locale`.
    ///
    /// Accepts POSIX-style names such as `de_DE.UTF-8`; unknown languages fall
    /// back to English.
    pub fn for_locale(locale: &str) -> Result<Self, CatalogError> {
        let language = normalize_locale(locale);
        let source = match language.as_str() {
            "de" => MESSAGES_DE,
            "en" => MESSAGES_EN,
            other => {
                log::debug!("No message catalog for '{}', using '{}'", other, DEFAULT_LOCALE);
                return Self::from_toml_str(DEFAULT_LOCALE, MESSAGES_EN);
            }
        };
        Self::from_toml_str(&language, source)
    }

    /// Build a catalog from TOML text; every [`MessageKey`] must be present.
    pub fn from_toml_str(locale: &str, source: &str) -> Result<Self, CatalogError> {
        let templates: HashMap<String, String> = toml::from_str(source)?;
        let missing: Vec<&'static str> = MessageKey::ALL
            .iter()
            .map(MessageKey::key)
            .filter(|key| !templates.contains_key(*key))
            .collect();
        if !missing.is_empty() {
            return Err(CatalogError::MissingKeys {
                locale: locale.to_string(),
                keys: missing,
            });
        }
        Ok(Self {
            locale: locale.to_string(),
            templates,
        })
    }

    pub fn locale(&self) -> &str {
        &self.locale
    }

    /// Template for `key`.
    ///
    /// # Panics
    ///
    /// Every catalog is checked for completeness when it is built, so a missing
    /// key here means the catalog itself is broken.
    pub fn get(&self, key: MessageKey) -> &str {
        self.templates
            .get(key.key())
            .map(String::as_str)
            .expect("message catalog was validated on load")
    }

    /// Template by raw key name
    pub fn lookup(&self, key: &str) -> Result<&str, CatalogError> {
        self.templates
            .get(key)
            .map(String::as_str)
            .ok_or_else(|| CatalogError::UnknownKey(key.to_string()))
    }

    /// Substitute positional arguments into the template for `key`.
    /// Placeholders without a matching argument are left as they are.
    pub fn format(&self, key: MessageKey, args: &[&dyn Display]) -> String {
        substitute(self.get(key), args)
    }
}

fn substitute(template: &str, args: &[&dyn Display]) -> String {
    get_placeholder_regex()
        .replace_all(template, |caps: &Captures| {
            caps[1]
                .parse::<usize>()
                .ok()
                .and_then(|index| args.get(index))
                .map(|arg| arg.to_string())
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

/// Reduce `de_DE.UTF-8`, `de-AT` or `DE` to `de`.
pub fn normalize_locale(locale: &str) -> String {
    locale
        .split(['_', '-', '.', '@'])
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Locale from `LC_ALL`, `LC_MESSAGES` or `LANG`, in that order
pub fn system_locale() -> Option<String> {
    ["LC_ALL", "LC_MESSAGES", "LANG"]
        .iter()
        .filter_map(|var| std::env::var(var).ok())
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty() && value != "C" && value != "POSIX")
}

/// Install the process-wide catalog. The first call wins; later calls return the
/// catalog that is already installed.
pub fn init_global(locale: Option<&str>) -> &'static MessageCatalog {
    GLOBAL_CATALOG.get_or_init(|| load_or_default(locale))
}

/// The process-wide catalog, loaded from the system locale on first use
pub fn global() -> &'static MessageCatalog {
    GLOBAL_CATALOG.get_or_init(|| load_or_default(None))
}

fn load_or_default(locale: Option<&str>) -> MessageCatalog {
    let requested = locale
        .map(str::to_string)
        .or_else(system_locale)
        .unwrap_or_else(|| DEFAULT_LOCALE.to_string());
    match MessageCatalog::for_locale(&requested) {
        Ok(catalog) => catalog,
        Err(e) => {
            log::warn!("Message catalog for '{}' unusable ({}), using English", requested, e);
            MessageCatalog::from_toml_str(DEFAULT_LOCALE, MESSAGES_EN)
                .expect("packaged English catalog is complete")
        }
    }
}

/// Format `key` with the process-wide catalog.
pub fn format(key: MessageKey, args: &[&dyn Display]) -> String {
    global().format(key, args)
}

/// Template for `key` from the process-wide catalog.
pub fn get(key: MessageKey) -> &'static str {
    global().get(key)
}
