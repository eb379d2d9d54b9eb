use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Verbosity levels for output
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum VerbosityLevel {
    /// Only show critical errors
    Quiet,
    /// Show standard information
    #[default]
    Normal,
    /// Show detailed information
    Verbose,
    /// Show all available debugging information
    Debug,
}

impl VerbosityLevel {
    /// Maximum log level the stderr logger lets through
    pub fn log_level(&self) -> log::LevelFilter {
        match self {
            VerbosityLevel::Quiet => log::LevelFilter::Error,
            VerbosityLevel::Normal => log::LevelFilter::Warn,
            VerbosityLevel::Verbose => log::LevelFilter::Info,
            VerbosityLevel::Debug => log::LevelFilter::Debug,
        }
    }
}

/// How results are written to stdout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Human,
    Json,
}

/// Conformance assertions over XML and HTTP resources
#[derive(Parser, Debug, Clone)]
#[command(name = "ets-assert")]
#[command(about = "Run conformance assertions against XML documents and HTTP resources")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Configuration file (TOML or JSON)
    #[arg(long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// Namespace binding for XPath expressions
    #[arg(
        long = "ns",
        value_name = "PREFIX=URI",
        value_parser = parse_binding,
        action = clap::ArgAction::Append,
        global = true
    )]
    pub namespaces: Vec<(String, String)>,

    /// Locale for diagnostic messages (en, de)
    #[arg(long = "locale", global = true)]
    pub locale: Option<String>,

    /// Output format
    #[arg(long = "format", value_enum, global = true)]
    pub format: Option<OutputFormat>,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only report errors
    #[arg(
        short = 'q',
        long = "quiet",
        conflicts_with = "verbose",
        global = true
    )]
    pub quiet: bool,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Assert that an XPath 1.0 expression holds for a document
    Xpath {
        /// Boolean XPath expression
        expression: String,
        /// File path or absolute URI of the document
        document: String,
        /// Print the result items instead of asserting truth
        #[arg(long = "values")]
        values: bool,
        /// Skip instead of failing when the expression is false
        #[arg(long = "skip-message")]
        skip_message: Option<String>,
    },
    /// Assert that a document is valid against a W3C XML Schema
    Schema {
        /// File path or absolute URI of the schema
        schema: String,
        /// File path or absolute URI of the document
        document: String,
    },
    /// Assert that a document violates no Schematron rule
    Schematron {
        /// File path or absolute URI of the Schematron schema
        schema: String,
        /// File path or absolute URI of the document
        document: String,
    },
    /// Resolve a URI as XML (with XInclude) and print the merged document
    Resolve {
        uri: String,
    },
    /// Dereference a URI to a local file and print its path
    Fetch {
        uri: String,
        /// Keep the downloaded file instead of deleting it on exit
        #[arg(long = "keep")]
        keep: bool,
    },
    /// Assert that a GET on a URI answers with status 200
    Reachable {
        uri: String,
    },
    /// Read test-run arguments from a properties document
    Args {
        /// Path or file URI; defaults to ~/test-run-props.xml
        location: Option<String>,
    },
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Xpath { .. } => "xpath",
            Command::Schema { .. } => "schema",
            Command::Schematron { .. } => "schematron",
            Command::Resolve { .. } => "resolve",
            Command::Fetch { .. } => "fetch",
            Command::Reachable { .. } => "reachable",
            Command::Args { .. } => "args",
        }
    }
}

fn parse_binding(value: &str) -> Result<(String, String), String> {
    let (prefix, uri) = value
        .split_once('=')
        .ok_or_else(|| format!("expected PREFIX=URI, got '{}'", value))?;
    if prefix.contains(':') {
        return Err(format!("invalid namespace prefix '{}'", prefix));
    }
    if uri.is_empty() {
        return Err(format!("empty namespace URI for prefix '{}'", prefix));
    }
    Ok((prefix.to_string(), uri.to_string()))
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    pub fn verbosity(&self) -> VerbosityLevel {
        if self.quiet {
            VerbosityLevel::Quiet
        } else {
            match self.verbose {
                0 => VerbosityLevel::Normal,
                1 => VerbosityLevel::Verbose,
                _ => VerbosityLevel::Debug,
            }
        }
    }
}
