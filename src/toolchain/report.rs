//! Test report extraction
//!
//! Each framework's report is read with an explicit, versioned rule. A report that
//! does not match its rule is an error rather than an empty failure list, so a
//! changed report schema cannot make a failing build look green.

use crate::error::{BuildError, BuildResult};
use roxmltree::Document;
use std::fs;
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    /// TestNG 7.x JUnit-style reporter output (`Command line test.xml`)
    TestNg7,
    /// JUnit Platform console launcher legacy XML (`TEST-*.xml`)
    JUnitLegacyXml,
}

impl ReportFormat {
    pub fn framework(&self) -> &'static str {
        match self {
            Self::TestNg7 => "testng",
            Self::JUnitLegacyXml => "junit",
        }
    }

    fn roots(&self) -> &'static [&'static str] {
        match self {
            Self::TestNg7 => &["testsuite", "testsuites", "testng-results"],
            Self::JUnitLegacyXml => &["testsuite", "testsuites"],
        }
    }
}

/// Classes with at least one failing or erroring test case, in report order
///
/// A `testcase` element fails when it has a `failure` or `error` child; it is
/// identified by its `classname` attribute.
pub fn failed_tests(format: ReportFormat, path: &Path) -> BuildResult<Vec<String>> {
    let text = fs::read_to_string(path).map_err(|e| BuildError::io(path, e))?;
    let parse_error = |reason: String| BuildError::ReportParse {
        framework: format.framework().to_string(),
        path: path.to_path_buf(),
        reason,
    };

    let doc = Document::parse(&text).map_err(|e| parse_error(e.to_string()))?;
    let root = doc.root_element();
    let root_name = root.tag_name().name();
    if !format.roots().contains(&root_name) {
        return Err(parse_error(format!(
            "unexpected root element <{}>, expected one of {}",
            root_name,
            format.roots().join(", ")
        )));
    }

    let mut failed: Vec<String> = Vec::new();
    for case in root.descendants().filter(|n| n.has_tag_name("testcase")) {
        let failing = case
            .children()
            .any(|c| c.has_tag_name("failure") || c.has_tag_name("error"));
        if !failing {
            continue;
        }
        let class = case
            .attribute("classname")
            .ok_or_else(|| parse_error("failing testcase without a classname attribute".to_string()))?;
        if !failed.iter().any(|f| f == class) {
            failed.push(class.to_string());
        }
    }
    debug!(report = %path.display(), failed = failed.len(), "Read test report");
    Ok(failed)
}
