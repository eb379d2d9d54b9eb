//! Host test-run controller capability.
//!
//! A test suite plugs into a host harness by implementing [`TestRunController`]
//! and registering itself with a [`ControllerRegistry`] under its ETS code. The
//! host hands over test-run arguments as an XML properties document:
//!
//! ```xml
//! <properties version="1.0">
//!   <entry key="iut">http://example.org/wfs?request=GetCapabilities</entry>
//! </properties>
//! ```

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;
use uuid::Uuid;

use crate::dom::XmlDocument;
use crate::error::ConformanceError;

/// Name of the arguments file looked up in the home directory
pub const DEFAULT_ARGS_FILE: &str = "test-run-props.xml";

#[derive(Error, Debug)]
pub enum ArgumentError {
    #[error("Input is not an XML properties document.")]
    NotPropertiesDocument,

    #[error("No test run arguments found.")]
    NoArguments,

    #[error("Missing required test run argument: {0}")]
    Missing(String),

    #[error("Invalid test run argument {key}: {reason}")]
    Invalid { key: String, reason: String },

    #[error("Test run arguments not found at {}", .0.display())]
    NotFound(PathBuf),
}

#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error(transparent)]
    Arguments(#[from] ArgumentError),

    #[error("No controller registered for ETS code '{0}'")]
    UnknownController(String),

    #[error("Test run failed: {0}")]
    Failed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Conformance(#[from] ConformanceError),
}

/// Key/value test-run arguments, ordered by key
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TestRunArgs {
    entries: BTreeMap<String, String>,
}

impl TestRunArgs {
    /// Read the `entry` elements of a `properties` document. The key is the
    /// `key` attribute, the value the element's text content. Later entries
    /// replace earlier ones with the same key.
    pub fn from_document(document: &XmlDocument) -> Result<Self, ArgumentError> {
        let root = document
            .root_element()
            .filter(|root| root.node_name() == "properties")
            .ok_or(ArgumentError::NotPropertiesDocument)?;

        let entries: BTreeMap<String, String> = root
            .child_elements()
            .filter(|child| child.node_name() == "entry")
            .map(|entry| (entry.attribute("key").unwrap_or_default(), entry.text_content()))
            .collect();
        if entries.is_empty() {
            return Err(ArgumentError::NoArguments);
        }
        Ok(Self { entries })
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Value for `key`, which must be present and not blank.
    pub fn require(&self, key: &str) -> Result<&str, ArgumentError> {
        self.get(key)
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| ArgumentError::Missing(key.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for TestRunArgs {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

/// Identity of an executable test suite
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EtsMetadata {
    pub code: String,
    pub version: String,
    pub title: String,
}

/// Where a controller's run configuration lives
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigRef {
    pub location: Url,
}

/// Handle to the results of one test run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportRef {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub location: PathBuf,
}

impl ReportRef {
    /// Report for a run that started at `started_at` and has just finished.
    pub fn finished(started_at: DateTime<Utc>, location: impl Into<PathBuf>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at,
            finished_at: Utc::now(),
            location: location.into(),
        }
    }
}

/// An executable test suite as seen by the host harness
pub trait TestRunController: Send + Sync {
    fn metadata(&self) -> &EtsMetadata;

    fn code(&self) -> &str {
        &self.metadata().code
    }

    fn version(&self) -> &str {
        &self.metadata().version
    }

    fn title(&self) -> &str {
        &self.metadata().title
    }

    /// Suite-specific checks on the arguments; runs before [`execute`](Self::execute).
    fn validate_arguments(&self, args: &TestRunArgs) -> Result<(), ArgumentError>;

    fn locate_configuration(&self) -> ConfigRef;

    fn execute(&self, args: &TestRunArgs) -> Result<ReportRef, ExecutionError>;
}

/// Check the shape of `document`, let the controller validate the arguments,
/// then run the suite.
pub fn do_test_run(
    controller: &dyn TestRunController,
    document: &XmlDocument,
) -> Result<ReportRef, ExecutionError> {
    let args = TestRunArgs::from_document(document)?;
    controller.validate_arguments(&args)?;
    log::info!(
        "Running {} {} using configuration {}",
        controller.code(),
        controller.version(),
        controller.locate_configuration().location
    );
    let report = controller.execute(&args)?;
    log::info!("Results of run {} written to {}", report.run_id, report.location.display());
    Ok(report)
}

/// Locate the test-run arguments file.
///
/// The first command-line argument is taken as a `file:` URI or a path; without
/// one, `test-run-props.xml` in `home` is used. The file must exist.
pub fn find_xml_args(args: &[String], home: Option<&Path>) -> Result<PathBuf, ArgumentError> {
    let candidate = match args.first() {
        Some(arg) if arg.starts_with("file:") => Url::parse(arg)
            .ok()
            .and_then(|url| url.to_file_path().ok())
            .ok_or_else(|| ArgumentError::Invalid {
                key: "args".to_string(),
                reason: format!("not a local file URI: {}", arg),
            })?,
        Some(arg) => PathBuf::from(arg),
        None => home
            .map(Path::to_path_buf)
            .or_else(dirs::home_dir)
            .unwrap_or_default()
            .join(DEFAULT_ARGS_FILE),
    };
    if !candidate.exists() {
        return Err(ArgumentError::NotFound(candidate));
    }
    Ok(candidate)
}

/// Directory for test results, created if missing.
///
/// `output_dir` may be a `file:` URI or a path; without one the home directory
/// is used.
pub fn results_directory(output_dir: Option<&str>) -> Result<PathBuf, ExecutionError> {
    let dir = match output_dir {
        Some(location) if location.starts_with("file:") => Url::parse(location)
            .ok()
            .and_then(|url| url.to_file_path().ok())
            .ok_or_else(|| {
                ExecutionError::Failed(format!("Output directory is not a file URI: {}", location))
            })?,
        Some(location) => PathBuf::from(location),
        None => dirs::home_dir()
            .ok_or_else(|| ExecutionError::Failed("No home directory available".to_string()))?,
    };
    std::fs::create_dir_all(&dir)?;
    let dir = std::path::absolute(dir)?;
    log::info!("Using output directory: {}", dir.display());
    Ok(dir)
}

/// Controllers keyed by ETS code
#[derive(Default)]
pub struct ControllerRegistry {
    controllers: HashMap<String, Box<dyn TestRunController>>,
}

impl ControllerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `controller` under its code, returning any controller it replaces.
    pub fn register(
        &mut self,
        controller: Box<dyn TestRunController>,
    ) -> Option<Box<dyn TestRunController>> {
        let code = controller.code().to_string();
        log::debug!("Registering controller for {}", code);
        self.controllers.insert(code, controller)
    }

    pub fn get(&self, code: &str) -> Option<&dyn TestRunController> {
        self.controllers.get(code).map(Box::as_ref)
    }

    /// Registered codes in sorted order
    pub fn codes(&self) -> Vec<&str> {
        let mut codes: Vec<&str> = self.controllers.keys().map(String::as_str).collect();
        codes.sort_unstable();
        codes
    }

    pub fn is_empty(&self) -> bool {
        self.controllers.is_empty()
    }

    /// Dispatch a test run to the controller registered under `code`.
    pub fn run(&self, code: &str, document: &XmlDocument) -> Result<ReportRef, ExecutionError> {
        let controller = self
            .get(code)
            .ok_or_else(|| ExecutionError::UnknownController(code.to_string()))?;
        do_test_run(controller, document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StubController {
        metadata: EtsMetadata,
        output_dir: PathBuf,
        executions: AtomicUsize,
    }

    impl StubController {
        fn new(output_dir: &Path) -> Self {
            Self {
                metadata: EtsMetadata {
                    code: "ets-stub".to_string(),
                    version: "1.0".to_string(),
                    title: "Stub suite".to_string(),
                },
                output_dir: output_dir.to_path_buf(),
                executions: AtomicUsize::new(0),
            }
        }
    }

    impl TestRunController for StubController {
        fn metadata(&self) -> &EtsMetadata {
            &self.metadata
        }

        fn validate_arguments(&self, args: &TestRunArgs) -> Result<(), ArgumentError> {
            let iut = args.require("iut")?;
            Url::parse(iut).map_err(|e| ArgumentError::Invalid {
                key: "iut".to_string(),
                reason: e.to_string(),
            })?;
            Ok(())
        }

        fn locate_configuration(&self) -> ConfigRef {
            ConfigRef {
                location: Url::parse("file:///etc/ets-stub/testng.xml").unwrap(),
            }
        }

        fn execute(&self, _args: &TestRunArgs) -> Result<ReportRef, ExecutionError> {
            self.executions.fetch_add(1, Ordering::SeqCst);
            Ok(ReportRef::finished(Utc::now(), self.output_dir.join("results.xml")))
        }
    }

    fn properties(body: &str) -> XmlDocument {
        XmlDocument::parse_str(&format!(r#"<properties version="1.0">{}</properties>"#, body)).unwrap()
    }

    #[test]
    fn test_args_from_properties_document() {
        let doc = properties(
            r#"<comment>ignored</comment><entry key="iut">http://example.org/wfs</entry><entry key="lang">de</entry>"#,
        );
        let args = TestRunArgs::from_document(&doc).unwrap();
        assert_eq!(args.len(), 2);
        assert_eq!(args.get("iut"), Some("http://example.org/wfs"));
        assert_eq!(args.iter().map(|(k, _)| k).collect::<Vec<_>>(), ["iut", "lang"]);
    }

    #[test]
    fn test_wrong_root_is_rejected() {
        let doc = XmlDocument::parse_str(r#"<props><entry key="a">b</entry></props>"#).unwrap();
        assert!(matches!(
            TestRunArgs::from_document(&doc),
            Err(ArgumentError::NotPropertiesDocument)
        ));
    }

    #[test]
    fn test_properties_without_entries_are_rejected() {
        assert!(matches!(
            TestRunArgs::from_document(&properties("")),
            Err(ArgumentError::NoArguments)
        ));
    }

    #[test]
    fn test_do_test_run_validates_before_executing() {
        let dir = tempfile::tempdir().unwrap();
        let controller = StubController::new(dir.path());

        let err = do_test_run(&controller, &properties(r#"<entry key="iut">not a url</entry>"#))
            .unwrap_err();
        assert!(matches!(err, ExecutionError::Arguments(ArgumentError::Invalid { .. })));
        assert_eq!(controller.executions.load(Ordering::SeqCst), 0);

        let report =
            do_test_run(&controller, &properties(r#"<entry key="iut">http://example.org/</entry>"#))
                .unwrap();
        assert_eq!(controller.executions.load(Ordering::SeqCst), 1);
        assert!(report.finished_at >= report.started_at);
        assert_eq!(report.location, dir.path().join("results.xml"));
    }

    #[test]
    fn test_registry_dispatch() {
        let dir = tempfile::tempdir().unwrap();
        let mut registry = ControllerRegistry::new();
        assert!(registry.register(Box::new(StubController::new(dir.path()))).is_none());
        assert_eq!(registry.codes(), ["ets-stub"]);
        assert_eq!(registry.get("ets-stub").unwrap().title(), "Stub suite");

        let doc = properties(r#"<entry key="iut">http://example.org/</entry>"#);
        assert!(registry.run("ets-stub", &doc).is_ok());
        assert!(matches!(
            registry.run("ets-other", &doc),
            Err(ExecutionError::UnknownController(_))
        ));
    }

    #[test]
    fn test_find_xml_args() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_ARGS_FILE);
        std::fs::write(&path, "<properties/>").unwrap();

        assert_eq!(find_xml_args(&[], Some(dir.path())).unwrap(), path);

        let as_path = vec![path.to_string_lossy().into_owned()];
        assert_eq!(find_xml_args(&as_path, None).unwrap(), path);

        let as_uri = vec![Url::from_file_path(&path).unwrap().to_string()];
        assert_eq!(find_xml_args(&as_uri, None).unwrap(), path);

        let missing = vec![dir.path().join("none.xml").to_string_lossy().into_owned()];
        assert!(matches!(find_xml_args(&missing, None), Err(ArgumentError::NotFound(_))));
    }

    #[test]
    fn test_results_directory_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("results").join("run");
        let uri = Url::from_file_path(&target).unwrap();

        let created = results_directory(Some(uri.as_str())).unwrap();
        assert!(created.is_dir());
        assert_eq!(created, target);
    }
}
