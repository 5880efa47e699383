//! Test source extraction and context selection.
//!
//! [`SourceContextAssembler`] is the filesystem-backed [`ContextAssembler`]:
//! it resolves each test's exact source text and picks the supporting
//! snippets sent along with it, according to the test's context mode.
//!
//! | mode       | context                                         |
//! |------------|-------------------------------------------------|
//! | `minimal`  | none                                            |
//! | `balanced` | covered lines of each covered file (`# L{n}:`)  |
//! | `complete` | whole covered files, optionally optimised       |

use regex::Regex;
use std::path::{Path, PathBuf};
use testscribe_core::{ContextFile, ContextMode, CoveredFile, LlmSettings, TestUnit};
use testscribe_error::{ContextError, ContextErrorKind, ScribeResult};
use testscribe_interface::{AssembledContext, ContextAssembler};
use tracing::{debug, instrument, warn};

fn compile(pattern: &str, source: &str) -> Result<Regex, ContextError> {
    Regex::new(pattern).map_err(|e| {
        ContextError::new(ContextErrorKind::InvalidPattern {
            pattern: source.to_string(),
            reason: e.to_string(),
        })
    })
}

/// Translate a shell-style glob (`*`, `?`) into an anchored regex.
fn glob_to_regex(glob: &str) -> Result<Regex, ContextError> {
    let mut pattern = String::from("^");
    for ch in glob.chars() {
        match ch {
            '*' => pattern.push_str(".*"),
            '?' => pattern.push('.'),
            other => pattern.push_str(&regex::escape(other.encode_utf8(&mut [0; 4]))),
        }
    }
    pattern.push('$');
    compile(&pattern, glob)
}

fn indent_of(line: &str) -> usize {
    line.len() - line.trim_start().len()
}

/// Locate `def name(` or `async def name(` in `text` and return the
/// function with its decorators and indented body.
///
/// # Examples
///
/// ```
/// use testscribe::extract_function;
///
/// let text = "import math\n\n@pytest.mark.slow\ndef test_root():\n    assert math.sqrt(4) == 2\n\n\ndef test_other():\n    pass\n";
/// let source = extract_function(text, "test_root").unwrap();
/// assert_eq!(source, "@pytest.mark.slow\ndef test_root():\n    assert math.sqrt(4) == 2\n");
/// ```
pub fn extract_function(text: &str, name: &str) -> Option<String> {
    let header = Regex::new(&format!(
        r"^\s*(?:async\s+)?def\s+{}\s*\(",
        regex::escape(name)
    ))
    .ok()?;
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.iter().position(|line| header.is_match(line))?;
    let indent = indent_of(lines[start]);

    let mut first = start;
    while first > 0 {
        let above = lines[first - 1];
        if above.trim_start().starts_with('@') && indent_of(above) == indent {
            first -= 1;
        } else {
            break;
        }
    }

    // The signature may span several lines.
    let mut end = start;
    let mut depth = 0i64;
    loop {
        let line = lines.get(end)?;
        depth += line.matches('(').count() as i64 - line.matches(')').count() as i64;
        end += 1;
        if depth <= 0 {
            break;
        }
    }

    while end < lines.len() {
        let line = lines[end];
        if line.trim().is_empty() || indent_of(line) > indent {
            end += 1;
        } else {
            break;
        }
    }
    while end > start + 1 && lines[end - 1].trim().is_empty() {
        end -= 1;
    }

    let mut source = lines[first..end].join("\n");
    source.push('\n');
    Some(source)
}

/// Longest prefix of `text` no longer than `max` bytes, on a char boundary.
fn truncate_to(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut cut = max;
    while !text.is_char_boundary(cut) {
        cut -= 1;
    }
    &text[..cut]
}

/// Docstring, comment and blank-line stripping for context files.
#[derive(Debug, Clone)]
struct SourceOptimizer {
    strip_docstrings: bool,
    strip_comments: bool,
    docstrings: [Regex; 2],
    trailing_comment: Regex,
    blank_runs: Regex,
}

impl SourceOptimizer {
    fn new(strip_docstrings: bool, strip_comments: bool) -> Result<Self, ContextError> {
        Ok(Self {
            strip_docstrings,
            strip_comments,
            docstrings: [
                compile(r#"(?ms)^[ \t]*[rRuU]?""".*?"""[ \t]*\n?"#, "docstring")?,
                compile(r"(?ms)^[ \t]*[rRuU]?'''.*?'''[ \t]*\n?", "docstring")?,
            ],
            trailing_comment: compile(r"\s+#.*$", "comment")?,
            blank_runs: compile(r"\n(?:[ \t]*\n){2,}", "blank lines")?,
        })
    }

    fn is_comment_line(&self, line: &str) -> bool {
        self.strip_comments && line.trim_start().starts_with('#')
    }

    fn strip_line_comment<'a>(&self, line: &'a str) -> std::borrow::Cow<'a, str> {
        if !self.strip_comments || line.contains('"') || line.contains('\'') {
            return line.into();
        }
        self.trailing_comment.replace(line, "")
    }

    fn optimize(&self, text: &str) -> String {
        let mut out = text.to_string();
        if self.strip_docstrings {
            for pattern in &self.docstrings {
                out = pattern.replace_all(&out, "").into_owned();
            }
        }
        if self.strip_comments {
            out = out
                .lines()
                .filter(|line| !self.is_comment_line(line))
                .map(|line| self.strip_line_comment(line))
                .collect::<Vec<_>>()
                .join("\n");
            out.push('\n');
        }
        self.blank_runs.replace_all(&out, "\n\n").into_owned()
    }
}

/// Filesystem-backed context assembler.
///
/// Source supplied by the collector is used verbatim, since its hash keys
/// the cache. Only context files are optimised.
///
/// # Examples
///
/// ```no_run
/// use testscribe::SourceContextAssembler;
/// use testscribe_core::{LlmSettings, TestUnitBuilder};
/// use testscribe_interface::ContextAssembler;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let assembler = SourceContextAssembler::from_settings(".", &LlmSettings::default())?;
/// let test = TestUnitBuilder::default()
///     .nodeid("tests/test_math.py::test_add")
///     .build()?;
/// let assembled = assembler.assemble(&test)?;
/// println!("{}", assembled.source());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct SourceContextAssembler {
    root: PathBuf,
    default_mode: ContextMode,
    max_bytes: usize,
    file_limit: usize,
    exclude: Vec<Regex>,
    optimizer: SourceOptimizer,
}

impl SourceContextAssembler {
    /// Assembler rooted at `root` using the context settings of `settings`.
    ///
    /// # Errors
    ///
    /// Returns a context error when an exclusion glob cannot be compiled.
    pub fn from_settings(root: impl Into<PathBuf>, settings: &LlmSettings) -> ScribeResult<Self> {
        let exclude = settings
            .context_exclude_globs()
            .iter()
            .map(|glob| glob_to_regex(glob))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            root: root.into(),
            default_mode: *settings.context_mode(),
            max_bytes: *settings.context_bytes(),
            file_limit: *settings.context_file_limit(),
            exclude,
            optimizer: SourceOptimizer::new(
                *settings.strip_docstrings(),
                *settings.strip_comments(),
            )?,
        })
    }

    /// Project root paths are resolved against.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// True when `path` matches an exclusion glob, either as a whole, by
    /// file name, or by any trailing run of components.
    pub fn is_excluded(&self, path: &str) -> bool {
        let normalized = path.replace('\\', "/");
        let mut candidates = vec![normalized.as_str()];
        candidates.extend(
            normalized
                .match_indices('/')
                .map(|(idx, _)| &normalized[idx + 1..]),
        );
        candidates
            .iter()
            .any(|candidate| self.exclude.iter().any(|glob| glob.is_match(candidate)))
    }

    fn read(&self, relative: &str) -> Result<String, ContextError> {
        let path = self.root.join(relative);
        std::fs::read_to_string(&path).map_err(|e| {
            ContextError::new(ContextErrorKind::Read {
                path: path.display().to_string(),
                reason: e.to_string(),
            })
        })
    }

    fn source_for(&self, test: &TestUnit) -> Result<String, ContextError> {
        if let Some(source) = test.source() {
            return Ok(source.clone());
        }
        let text = self.read(test.file_path())?;
        extract_function(&text, test.function_name()).ok_or_else(|| {
            ContextError::new(ContextErrorKind::SourceNotFound(test.nodeid().clone()))
        })
    }

    fn covered_lines(&self, text: &str, covered: &CoveredFile) -> String {
        let lines: Vec<&str> = text.lines().collect();
        let mut numbers = covered.lines().clone();
        numbers.sort_unstable();
        numbers.dedup();
        numbers
            .into_iter()
            .filter_map(|n| {
                let line = lines.get((n as usize).checked_sub(1)?)?;
                (!self.optimizer.is_comment_line(line)).then(|| format!("# L{}: {}", n, line))
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn candidates(&self, test: &TestUnit, mode: ContextMode) -> Vec<ContextFile> {
        if !test.context().is_empty() {
            return test.context().clone();
        }
        test.covered_files()
            .iter()
            .filter(|covered| !self.is_excluded(covered.path()))
            .take(self.file_limit)
            .filter_map(|covered| match self.read(covered.path()) {
                Ok(text) => {
                    let content = match mode {
                        ContextMode::Balanced => self.covered_lines(&text, covered),
                        _ => self.optimizer.optimize(&text),
                    };
                    Some(ContextFile::new(covered.path().clone(), content))
                }
                Err(e) => {
                    warn!(path = %covered.path(), error = %e, "Skipping unreadable context file");
                    None
                }
            })
            .collect()
    }

    fn bound(&self, files: Vec<ContextFile>) -> Vec<ContextFile> {
        let mut remaining = self.max_bytes;
        let mut bounded = Vec::new();
        for file in files {
            if remaining == 0 || bounded.len() >= self.file_limit {
                break;
            }
            if self.is_excluded(file.path()) || file.content().trim().is_empty() {
                continue;
            }
            let content = truncate_to(file.content(), remaining);
            remaining -= content.len();
            bounded.push(ContextFile::new(file.path().clone(), content));
        }
        bounded
    }
}

impl ContextAssembler for SourceContextAssembler {
    #[instrument(skip(self, test), fields(nodeid = %test.nodeid()))]
    fn assemble(&self, test: &TestUnit) -> ScribeResult<AssembledContext> {
        let source = self.source_for(test)?;
        let mode = test.effective_context_mode(self.default_mode);
        let context = match mode {
            ContextMode::Minimal => Vec::new(),
            _ => self.bound(self.candidates(test, mode)),
        };
        debug!(
            mode = %mode,
            files = context.len(),
            bytes = context.iter().map(|f| f.content().len()).sum::<usize>(),
            "Assembled context"
        );
        Ok(AssembledContext::new(source, context))
    }
}
