use crate::cli::{Cli, OutputFormat};
use crate::controller::EtsMetadata;
use crate::http_client::HttpClientConfig;
use crate::namespaces::NamespaceBindings;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Trait for abstracting environment variable access
pub trait EnvProvider {
    fn get(&self, key: &str) -> Option<String>;
}

/// System environment variable provider for production use
pub struct SystemEnvProvider;

impl EnvProvider for SystemEnvProvider {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlParsing(#[from] toml::de::Error),

    #[error("JSON parsing error: {0}")]
    JsonParsing(#[from] serde_json::Error),

    #[error("Configuration validation error: {0}")]
    Validation(String),

    #[error("Environment variable error: {0}")]
    Environment(String),

    #[error("Unsupported configuration file format: {0}")]
    UnsupportedFormat(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Toolkit configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct ToolkitConfig {
    pub messages: MessagesConfig,
    /// Namespace URI to prefix, pre-loaded into every binding table
    pub namespaces: HashMap<String, String>,
    pub http: HttpConfig,
    pub ets: EtsMetadata,
    pub controller: ControllerConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct MessagesConfig {
    /// Message locale; the system locale is used when unset
    pub locale: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HttpConfig {
    pub user_agent: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct ControllerConfig {
    /// Results directory as a path or `file:` URI; the home directory when unset
    pub output_dir: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct OutputConfig {
    pub format: OutputFormatConfig,
    pub verbose: bool,
    pub quiet: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormatConfig {
    #[default]
    Human,
    Json,
}

impl From<OutputFormat> for OutputFormatConfig {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Human => OutputFormatConfig::Human,
            OutputFormat::Json => OutputFormatConfig::Json,
        }
    }
}

impl From<OutputFormatConfig> for OutputFormat {
    fn from(format: OutputFormatConfig) -> Self {
        match format {
            OutputFormatConfig::Human => OutputFormat::Human,
            OutputFormatConfig::Json => OutputFormat::Json,
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: HttpClientConfig::default().user_agent,
        }
    }
}

impl ToolkitConfig {
    /// Binding table holding the configured namespaces
    pub fn namespace_bindings(&self) -> NamespaceBindings {
        let mut bindings = NamespaceBindings::new();
        bindings.add_all_bindings(Some(&self.namespaces));
        bindings
    }

    pub fn http_client_config(&self) -> HttpClientConfig {
        HttpClientConfig {
            user_agent: self.http.user_agent.clone(),
        }
    }
}

const CONFIG_NAMES: [&str; 4] = [
    "ets-core.toml",
    "ets-core.json",
    ".ets-core.toml",
    ".ets-core.json",
];

/// Configuration manager for loading and merging configurations
pub struct ConfigManager;

impl ConfigManager {
    /// Load configuration with precedence: file -> environment -> CLI
    pub fn load_config(cli: &Cli) -> Result<ToolkitConfig> {
        let mut config = ToolkitConfig::default();

        if let Some(config_path) = &cli.config {
            let file_config = Self::load_from_file(config_path)?;
            config = Self::merge_configs(config, file_config);
        } else if let Some(path) = Self::find_config_file(&std::env::current_dir()?) {
            log::debug!("Using configuration file {}", path.display());
            config = Self::merge_configs(config, Self::load_from_file(&path)?);
        }

        config = Self::apply_environment_overrides(config)?;
        config = Self::merge_with_cli(config, cli);
        Self::validate_config(&config)?;

        Ok(config)
    }

    /// Load configuration from a file (TOML or JSON)
    pub fn load_from_file(path: &Path) -> Result<ToolkitConfig> {
        let content = std::fs::read_to_string(path)?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Ok(toml::from_str(&content)?),
            Some("json") => Ok(serde_json::from_str(&content)?),
            Some(ext) => Err(ConfigError::UnsupportedFormat(ext.to_string())),
            None => {
                // Try to parse as TOML first, then JSON
                if let Ok(config) = toml::from_str::<ToolkitConfig>(&content) {
                    Ok(config)
                } else {
                    Ok(serde_json::from_str(&content)?)
                }
            }
        }
    }

    /// Find a configuration file in `dir`, then in the user config directory
    pub fn find_config_file(dir: &Path) -> Option<PathBuf> {
        let user_dir = dirs::config_dir().map(|d| d.join("ets-core"));
        std::iter::once(dir.to_path_buf())
            .chain(user_dir)
            .flat_map(|base| CONFIG_NAMES.iter().map(move |name| base.join(name)))
            .find(|path| path.is_file())
    }

    /// Apply environment variable overrides using the system environment
    pub fn apply_environment_overrides(config: ToolkitConfig) -> Result<ToolkitConfig> {
        Self::apply_environment_overrides_with(&SystemEnvProvider, config)
    }

    /// Apply environment variable overrides with a custom environment provider
    pub fn apply_environment_overrides_with(
        env: &impl EnvProvider,
        mut config: ToolkitConfig,
    ) -> Result<ToolkitConfig> {
        if let Some(locale) = env.get("ETS_LOCALE") {
            config.messages.locale = Some(locale);
        }

        if let Some(output_dir) = env.get("ETS_OUTPUT_DIR") {
            config.controller.output_dir = Some(output_dir);
        }

        if let Some(user_agent) = env.get("ETS_USER_AGENT") {
            config.http.user_agent = user_agent;
        }

        if let Some(format) = env.get("ETS_FORMAT") {
            config.output.format = match format.to_lowercase().as_str() {
                "human" => OutputFormatConfig::Human,
                "json" => OutputFormatConfig::Json,
                _ => {
                    return Err(ConfigError::Environment(format!(
                        "Invalid ETS_FORMAT value: {}",
                        format
                    )));
                }
            };
        }

        Ok(config)
    }

    /// Merge CLI arguments with configuration (CLI takes precedence)
    pub fn merge_with_cli(mut config: ToolkitConfig, cli: &Cli) -> ToolkitConfig {
        if let Some(locale) = &cli.locale {
            config.messages.locale = Some(locale.clone());
        }
        for (prefix, uri) in &cli.namespaces {
            config.namespaces.insert(uri.clone(), prefix.clone());
        }
        if let Some(format) = cli.format {
            config.output.format = format.into();
        }
        if cli.verbose > 0 {
            config.output.verbose = true;
            config.output.quiet = false;
        }
        if cli.quiet {
            config.output.quiet = true;
            config.output.verbose = false;
        }
        config
    }

    /// Merge two configurations (second takes precedence for values it sets)
    pub fn merge_configs(mut base: ToolkitConfig, override_config: ToolkitConfig) -> ToolkitConfig {
        if override_config.messages.locale.is_some() {
            base.messages.locale = override_config.messages.locale;
        }
        base.namespaces.extend(override_config.namespaces);
        base.http = override_config.http;
        if !override_config.ets.code.is_empty() {
            base.ets = override_config.ets;
        }
        if override_config.controller.output_dir.is_some() {
            base.controller.output_dir = override_config.controller.output_dir;
        }
        base.output = override_config.output;
        base
    }

    /// Validate configuration values
    pub fn validate_config(config: &ToolkitConfig) -> Result<()> {
        if let Some(locale) = &config.messages.locale
            && locale.trim().is_empty()
        {
            return Err(ConfigError::Validation("Locale must not be blank".to_string()));
        }

        if config.http.user_agent.trim().is_empty() {
            return Err(ConfigError::Validation(
                "HTTP user agent must not be empty".to_string(),
            ));
        }

        for (uri, prefix) in &config.namespaces {
            if uri.is_empty() {
                return Err(ConfigError::Validation(format!(
                    "Namespace URI for prefix '{}' is empty",
                    prefix
                )));
            }
            if prefix.contains(':') || prefix.chars().any(char::is_whitespace) {
                return Err(ConfigError::Validation(format!(
                    "Invalid namespace prefix: '{}'",
                    prefix
                )));
            }
        }

        if config.output.verbose && config.output.quiet {
            return Err(ConfigError::Validation(
                "Cannot enable both verbose and quiet modes".to_string(),
            ));
        }

        Ok(())
    }
}
