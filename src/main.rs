use std::process;
use std::time::Instant;

use anyhow::Context;

use ets_core::assertions;
use ets_core::cli::{Cli, Command, VerbosityLevel};
use ets_core::config::{ConfigManager, ToolkitConfig};
use ets_core::controller::{TestRunArgs, find_xml_args};
use ets_core::dom::{ParseOptions, XmlDocument};
use ets_core::error::{ConformanceError, Result};
use ets_core::http_client::BlockingHttpClient;
use ets_core::logging::StderrLogger;
use ets_core::messages;
use ets_core::output::{CheckReport, Output};
use ets_core::resolver::{ResourceResolver, to_absolute_uri};
use ets_core::schema::CompiledSchema;
use ets_core::xpath::{self, XmlSource};

fn main() {
    let cli = Cli::parse_args();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            process::exit(2);
        }
    };

    let verbosity = effective_verbosity(&cli, &config);
    StderrLogger::init(verbosity);
    messages::init_global(config.messages.locale.as_deref());

    let started = Instant::now();
    let result = run(&cli.command, &config);
    let report = CheckReport::from_result(
        cli.command.name(),
        target(&cli.command),
        result,
        started.elapsed(),
    );

    let output = Output::new(verbosity, config.output.format.into());
    let rendered = output.render(&report);
    if !rendered.is_empty() {
        println!("{}", rendered.trim_end());
    }
    process::exit(report.status.exit_code());
}

fn load_config(cli: &Cli) -> anyhow::Result<ToolkitConfig> {
    ConfigManager::load_config(cli).context("Failed to load configuration")
}

fn effective_verbosity(cli: &Cli, config: &ToolkitConfig) -> VerbosityLevel {
    if config.output.quiet {
        VerbosityLevel::Quiet
    } else if cli.verbose >= 2 {
        VerbosityLevel::Debug
    } else if config.output.verbose {
        VerbosityLevel::Verbose
    } else {
        VerbosityLevel::Normal
    }
}

fn target(command: &Command) -> &str {
    match command {
        Command::Xpath { document, .. }
        | Command::Schema { document, .. }
        | Command::Schematron { document, .. } => document,
        Command::Resolve { uri } | Command::Fetch { uri, .. } | Command::Reachable { uri } => uri,
        Command::Args { location } => location.as_deref().unwrap_or("~"),
    }
}

fn load_document(resolver: &ResourceResolver, location: &str) -> Result<XmlDocument> {
    resolver.resolve_as_document(to_absolute_uri(location)?.as_str())
}

fn run(command: &Command, config: &ToolkitConfig) -> Result<Vec<String>> {
    let resolver = ResourceResolver::with_config(config.http_client_config())?;

    match command {
        Command::Xpath {
            expression,
            document,
            values,
            skip_message,
        } => {
            let bindings = config.namespace_bindings();
            let doc = load_document(&resolver, document)?;
            if *values {
                let items = xpath::evaluate_values(XmlSource::Node(doc.as_node()), expression, &bindings)?;
                return Ok(items.iter().map(ToString::to_string).collect());
            }
            match skip_message {
                Some(message) => {
                    assertions::verify_xpath(expression, Some(doc.as_node()), &bindings, message)?
                }
                None => assertions::assert_xpath(expression, Some(doc.as_node()), &bindings)?,
            }
            Ok(Vec::new())
        }
        Command::Schema { schema, document } => {
            let schema = CompiledSchema::from_location_with(schema, &resolver)?;
            let doc = load_document(&resolver, document)?;
            assertions::assert_schema_valid(&schema, &doc)?;
            Ok(Vec::new())
        }
        Command::Schematron { schema, document } => {
            let doc = load_document(&resolver, document)?;
            assertions::assert_schematron_valid(schema, &doc)?;
            Ok(Vec::new())
        }
        Command::Resolve { uri } => {
            let doc = load_document(&resolver, uri)?;
            Ok(vec![doc.to_xml_string()?])
        }
        Command::Fetch { uri, keep } => {
            let resource = resolver.dereference(to_absolute_uri(uri)?.as_str())?;
            let size = std::fs::metadata(resource.path())?.len();
            let path = if *keep {
                resource.keep()?.display().to_string()
            } else {
                resource.path().display().to_string()
            };
            Ok(vec![format!("{} ({} bytes)", path, size)])
        }
        Command::Reachable { uri } => {
            let transport = BlockingHttpClient::new(config.http_client_config())?;
            assertions::assert_uri_is_resolvable(&transport, Some(uri))?;
            Ok(Vec::new())
        }
        Command::Args { location } => {
            let args: Vec<String> = location.iter().cloned().collect();
            let path = find_xml_args(&args, None)
                .map_err(|e| ConformanceError::InvalidArgument(e.to_string()))?;
            let doc = XmlDocument::parse_file(&path, ParseOptions::default())?;
            let run_args = TestRunArgs::from_document(&doc)
                .map_err(|e| ConformanceError::InvalidArgument(e.to_string()))?;
            Ok(run_args
                .iter()
                .map(|(key, value)| format!("{} = {}", key, value))
                .collect())
        }
    }
}
