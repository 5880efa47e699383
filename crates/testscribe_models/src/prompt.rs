//! Prompt construction shared by every provider.

use testscribe_core::{ContextFile, TestUnit};

/// Fixed system instruction sent with every annotation request.
pub const SYSTEM_PROMPT: &str = r#"You are a helpful assistant that analyzes Python test code.
Given a test function, provide a structured annotation with:
1. scenario: What the test verifies (1-3 sentences)
2. why_needed: What bug or regression this test prevents (1-3 sentences)
3. key_assertions: The critical checks performed (3-8 bullet points)

Respond ONLY with valid JSON in this exact format:
{
  "scenario": "...",
  "why_needed": "...",
  "key_assertions": ["...", "..."]
}"#;

/// Context snippets embedded per prompt.
pub const MAX_CONTEXT_FILES_IN_PROMPT: usize = 5;

/// Characters kept from each context snippet.
pub const MAX_CONTEXT_CHARS_PER_FILE: usize = 2000;

/// User prompt for one test.
///
/// # Examples
///
/// ```
/// use testscribe_core::{ContextFile, TestUnitBuilder};
/// use testscribe_models::build_prompt;
///
/// let test = TestUnitBuilder::default()
///     .nodeid("tests/test_math.py::test_add")
///     .build()
///     .unwrap();
/// let context = vec![ContextFile::new("src/math.py", "def add(a, b):\n    return a + b")];
///
/// let prompt = build_prompt(&test, "def test_add():\n    assert add(1, 2) == 3", &context);
/// assert!(prompt.starts_with("Test: tests/test_math.py::test_add\n\n```python\n"));
/// assert!(prompt.contains("\nRelevant context:\n\nsrc/math.py:\n```python\n"));
/// ```
pub fn build_prompt(test: &TestUnit, source: &str, context: &[ContextFile]) -> String {
    let mut parts = vec![
        format!("Test: {}", test.nodeid()),
        String::new(),
        "```python".to_string(),
        source.to_string(),
        "```".to_string(),
    ];

    if !context.is_empty() {
        parts.push("\nRelevant context:".to_string());
        for file in context.iter().take(MAX_CONTEXT_FILES_IN_PROMPT) {
            parts.push(format!("\n{}:", file.path()));
            parts.push("```python".to_string());
            parts.push(
                file.content()
                    .chars()
                    .take(MAX_CONTEXT_CHARS_PER_FILE)
                    .collect(),
            );
            parts.push("```".to_string());
        }
    }

    parts.join("\n")
}
