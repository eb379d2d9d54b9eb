use std::path::PathBuf;

use url::Url;

/// Absolute path of a file under `tests/fixtures`
pub fn fixture(relative: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(relative)
}

/// `file:` URI of a fixture
pub fn fixture_uri(relative: &str) -> String {
    Url::from_file_path(fixture(relative))
        .expect("fixture paths are absolute")
        .to_string()
}

pub fn fixture_str(relative: &str) -> String {
    fixture(relative).to_string_lossy().into_owned()
}

pub const PO_NS: &str = "urn:example:po";
pub const PO_SCHEMA: &str = "schemas/purchase-order.xsd";
pub const PO_RULES: &str = "rules/order-rules.sch";
pub const VALID_ORDER: &str = "xml/order-valid.xml";
pub const INVALID_ORDER: &str = "xml/order-invalid.xml";
pub const MALFORMED_ORDER: &str = "xml/order-malformed.xml";
