//! Test units supplied by the collector.

use derive_getters::Getters;
use serde::{Deserialize, Serialize};

/// How much supporting code accompanies a test's source in the prompt.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ContextMode {
    /// Test source only
    #[default]
    Minimal,
    /// Test source plus the covered lines of each covered file
    Balanced,
    /// Test source plus whole covered files
    Complete,
}

/// A production file exercised by a test, with the lines it covered.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Getters)]
pub struct CoveredFile {
    /// Path relative to the project root
    path: String,
    /// 1-based covered line numbers
    #[serde(default)]
    lines: Vec<u32>,
}

impl CoveredFile {
    /// Create a covered file record.
    pub fn new(path: impl Into<String>, lines: Vec<u32>) -> Self {
        Self {
            path: path.into(),
            lines,
        }
    }
}

/// One supporting snippet sent along with a test's source.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Getters)]
pub struct ContextFile {
    /// Path relative to the project root
    path: String,
    /// Snippet text, already bounded by the assembler
    content: String,
}

impl ContextFile {
    /// Create a context snippet.
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }
}

/// One test case that may receive an annotation.
///
/// Test units are immutable once collected.
///
/// # Examples
///
/// ```
/// use testscribe_core::TestUnitBuilder;
///
/// let test = TestUnitBuilder::default()
///     .nodeid("tests/test_math.py::test_add[1-2]")
///     .source("def test_add(a, b):\n    assert a + b > 0\n")
///     .build()
///     .unwrap();
///
/// assert_eq!(test.base_nodeid(), "tests/test_math.py::test_add");
/// assert_eq!(test.file_path(), "tests/test_math.py");
/// assert_eq!(test.function_name(), "test_add");
/// ```
#[derive(
    Debug, Clone, PartialEq, Serialize, Deserialize, Getters, derive_builder::Builder,
)]
#[builder(setter(into))]
pub struct TestUnit {
    /// Unique pytest node id
    nodeid: String,
    /// Exact source text, when the collector already extracted it
    #[serde(default)]
    #[builder(setter(into, strip_option), default)]
    source: Option<String>,
    /// Pre-assembled supporting snippets
    #[serde(default)]
    #[builder(default)]
    context: Vec<ContextFile>,
    /// Coverage of production files, used by the context assembler
    #[serde(default)]
    #[builder(default)]
    covered_files: Vec<CoveredFile>,
    /// Marked by the test author as not to be sent to an LLM
    #[serde(default)]
    #[builder(default)]
    opt_out: bool,
    /// Per-test override of the configured context mode
    #[serde(default)]
    #[builder(setter(into, strip_option), default)]
    context_mode: Option<ContextMode>,
}

impl TestUnit {
    /// Node id with any parametrization suffix (`[...]`) removed.
    ///
    /// Parametrized variants share one body, so they share one annotation.
    pub fn base_nodeid(&self) -> &str {
        match self.nodeid.find('[') {
            Some(idx) => &self.nodeid[..idx],
            None => &self.nodeid,
        }
    }

    /// File part of the node id.
    pub fn file_path(&self) -> &str {
        self.nodeid.split("::").next().unwrap_or(&self.nodeid)
    }

    /// Test function name, without class prefix or parameters.
    pub fn function_name(&self) -> &str {
        let base = self.base_nodeid();
        base.rsplit("::").next().unwrap_or(base)
    }

    /// Effective context mode given the configured default.
    pub fn effective_context_mode(&self, default: ContextMode) -> ContextMode {
        self.context_mode.unwrap_or(default)
    }
}
