use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use loom::{CompileError, CompileOptions, Dialect};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExpectedWarning {
    /// Substring that must appear in the warning message.
    pub contains: String,

    /// If set, the warning's span must start on this 1-based source line.
    #[serde(default)]
    pub line: Option<usize>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TestConfig {
    /// Human-readable test description.
    #[serde(default)]
    pub description: Option<String>,

    /// Mode of the top-level region. Defaults to the registry default.
    #[serde(default)]
    pub mode: Option<String>,

    /// `modern` or `legacy`.
    #[serde(default)]
    pub dialect: Option<String>,

    /// Expected exact output (trimmed comparison).
    #[serde(default)]
    pub expect_output: Option<String>,

    /// Substrings the output must contain.
    #[serde(default)]
    pub expect_contains: Vec<String>,

    /// Expected compile error: some error message must contain this substring.
    #[serde(default)]
    pub expect_error: Option<String>,

    /// Expected warnings. If present (even empty), warning count and content are checked.
    /// Each entry checks message substring and optionally the source line.
    #[serde(default)]
    pub expect_warnings: Option<Vec<ExpectedWarning>>,
}

impl TestConfig {
    fn options(&self) -> Result<CompileOptions, String> {
        let mut options = CompileOptions::default();
        if let Some(mode) = &self.mode {
            options.root_mode = mode.clone();
        }
        if let Some(name) = &self.dialect {
            options.dialect = Dialect::from_name(name).ok_or_else(|| format!("unknown dialect '{}'", name))?;
        }
        Ok(options)
    }
}

/// Parse a `.test.loom` file into its TOML config and template source.
fn parse_test_file(content: &str) -> Result<(TestConfig, &str), String> {
    let content = content.trim_start_matches('\u{feff}'); // strip BOM

    if !content.starts_with("---") {
        return Err("missing opening --- frontmatter delimiter".into());
    }

    let after_open = &content[3..];
    let after_open = after_open
        .strip_prefix('\n')
        .or_else(|| after_open.strip_prefix("\r\n"))
        .unwrap_or(after_open);

    let close_pos = after_open
        .find("\n---")
        .ok_or("missing closing --- frontmatter delimiter")?;

    let toml_str = after_open[..close_pos].trim_end_matches('\r');
    let rest_start = close_pos + 4; // skip \n---
    let source = after_open[rest_start..]
        .strip_prefix("\r\n")
        .or_else(|| after_open[rest_start..].strip_prefix('\n'))
        .unwrap_or(&after_open[rest_start..]);
    // The file's final newline is not part of the source.
    let source = source
        .strip_suffix('\n')
        .map(|s| s.strip_suffix('\r').unwrap_or(s))
        .unwrap_or(source);

    let config: TestConfig =
        toml::from_str(toml_str).map_err(|e| format!("TOML parse error: {}", e))?;

    Ok((config, source))
}

pub enum TestOutcome {
    Pass,
    Fail(String),
}

pub struct TestResult {
    pub path: PathBuf,
    pub description: Option<String>,
    pub outcome: TestOutcome,
}

fn run_single_test(path: &Path) -> TestResult {
    // 1. Read file
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            return TestResult {
                path: path.to_path_buf(),
                description: None,
                outcome: TestOutcome::Fail(format!("cannot read file: {}", e)),
            };
        }
    };

    // 2. Parse frontmatter
    let (config, source) = match parse_test_file(&content) {
        Ok(pair) => pair,
        Err(e) => {
            return TestResult {
                path: path.to_path_buf(),
                description: None,
                outcome: TestOutcome::Fail(format!("frontmatter error: {}", e)),
            };
        }
    };

    let description = config.description.clone();
    let outcome = match check_test(&config, source) {
        None => TestOutcome::Pass,
        Some(reason) => TestOutcome::Fail(reason),
    };
    TestResult {
        path: path.to_path_buf(),
        description,
        outcome,
    }
}

/// Compile `source` and check it against the expectations. Returns
/// `Some(reason)` on failure.
fn check_test(config: &TestConfig, source: &str) -> Option<String> {
    let options = match config.options() {
        Ok(options) => options,
        Err(e) => return Some(format!("frontmatter error: {}", e)),
    };
    let result = loom::compile(source, 0, &options);

    // Error expectations
    let output = match (&config.expect_error, result) {
        (Some(expected_err), Err(errors)) => {
            if errors.iter().any(|e| e.message.contains(expected_err.as_str())) {
                return None;
            }
            let msgs: Vec<String> = errors.iter().map(|e| e.message.clone()).collect();
            return Some(format!(
                "expected error containing \"{}\", got: {}",
                expected_err,
                msgs.join("; ")
            ));
        }
        (Some(expected_err), Ok(_)) => {
            return Some(format!(
                "expected error containing \"{}\", but compilation succeeded",
                expected_err
            ));
        }
        (None, Err(errors)) => {
            let msgs: Vec<String> = errors.iter().map(|e| e.message.clone()).collect();
            return Some(format!("unexpected compile error: {}", msgs.join("; ")));
        }
        (None, Ok(output)) => output,
    };

    // Output expectations
    if let Some(expected_output) = &config.expect_output {
        let actual_trimmed = output.code.trim();
        let expected_trimmed = expected_output.trim();
        if actual_trimmed != expected_trimmed {
            return Some(format!(
                "output mismatch\n  expected: {}\n  actual:   {}",
                expected_trimmed, actual_trimmed
            ));
        }
    }
    for expected in &config.expect_contains {
        if !output.code.contains(expected.as_str()) {
            return Some(format!(
                "output does not contain \"{}\"\n  actual:   {}",
                expected,
                output.code.trim()
            ));
        }
    }

    // Warning expectations
    if let Some(expected_warnings) = &config.expect_warnings {
        return check_warnings(source, &output.warnings, expected_warnings);
    }
    None
}

/// Convert a byte offset in `source` to a 1-based line number.
fn byte_offset_to_line(source: &str, offset: usize) -> usize {
    source[..offset.min(source.len())]
        .bytes()
        .filter(|&b| b == b'\n')
        .count()
        + 1
}

/// Check that actual warnings match expectations. Returns `Some(reason)` on mismatch.
fn check_warnings(
    source: &str,
    diagnostics: &[CompileError],
    expected: &[ExpectedWarning],
) -> Option<String> {
    let actual_warnings: Vec<&CompileError> =
        diagnostics.iter().filter(|d| d.is_warning()).collect();

    if actual_warnings.len() != expected.len() {
        let actual_msgs: Vec<String> = actual_warnings
            .iter()
            .map(|w| format!("  - {}", w))
            .collect();
        return Some(format!(
            "expected {} warning(s), got {}\n  actual warnings:\n{}",
            expected.len(),
            actual_warnings.len(),
            if actual_msgs.is_empty() {
                "    (none)".to_string()
            } else {
                actual_msgs.join("\n")
            }
        ));
    }

    for (i, (actual, expected)) in actual_warnings.iter().zip(expected.iter()).enumerate() {
        let msg = actual.to_string();

        if !msg.contains(&expected.contains) {
            return Some(format!(
                "warning[{}]: expected message containing \"{}\", got: {}",
                i, expected.contains, msg
            ));
        }

        if let Some(expected_line) = expected.line {
            let actual_line = byte_offset_to_line(source, actual.span.start);
            if actual_line != expected_line {
                return Some(format!(
                    "warning[{}]: expected on line {}, but span is on line {}",
                    i, expected_line, actual_line
                ));
            }
        }
    }

    None
}

/// Discover `.test.loom` files grouped by category (subfolder relative to root).
/// Files directly in `root` get category "" (uncategorized).
/// Returns a BTreeMap so categories are sorted alphabetically.
fn discover_categorized(root: &Path) -> BTreeMap<String, Vec<PathBuf>> {
    let mut categories: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();
    collect_tests(root, root, &mut categories);
    // Sort files within each category
    for files in categories.values_mut() {
        files.sort();
    }
    categories
}

fn collect_tests(dir: &Path, root: &Path, out: &mut BTreeMap<String, Vec<PathBuf>>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_tests(&path, root, out);
        } else if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            if name.ends_with(".test.loom") {
                let category = path
                    .parent()
                    .and_then(|p| p.strip_prefix(root).ok())
                    .map(|p| p.to_string_lossy().replace('\\', "/"))
                    .unwrap_or_default();
                out.entry(category).or_default().push(path);
            }
        }
    }
}

/// List available categories for the given test path.
pub fn list_categories(path: &Path) {
    if path.is_file() {
        eprintln!("(single file, no categories)");
        return;
    }

    let categories = discover_categorized(path);
    if categories.is_empty() {
        eprintln!("no .test.loom files found in {}", path.display());
        return;
    }

    eprintln!("available categories:");
    for (cat, files) in &categories {
        let label = if cat.is_empty() { "(root)" } else { cat.as_str() };
        eprintln!("  {} ({} tests)", label, files.len());
    }
}

fn pass_label(no_color: bool) -> &'static str {
    if no_color { "PASS" } else { "\x1b[32mPASS\x1b[0m" }
}

fn fail_label(no_color: bool) -> &'static str {
    if no_color { "FAIL" } else { "\x1b[31mFAIL\x1b[0m" }
}

fn bold(s: &str, no_color: bool) -> String {
    if no_color {
        s.to_string()
    } else {
        format!("\x1b[1m{}\x1b[0m", s)
    }
}

/// Run all `.test.loom` files under `path` (or a single file).
/// If `categories` is non-empty, only run tests in those categories.
/// Returns exit code: 0 = all pass, 1 = any failure.
pub fn run_tests(path: &Path, no_color: bool, categories: &[String]) -> i32 {
    // Single file: categories do not apply
    if path.is_file() {
        let result = run_single_test(path);
        let label = result
            .description
            .as_deref()
            .unwrap_or_else(|| {
                path.file_stem()
                    .and_then(|s| s.to_str())
                    .unwrap_or("?")
            });
        return match &result.outcome {
            TestOutcome::Pass => {
                eprintln!("  {}  {}", pass_label(no_color), label);
                eprintln!();
                eprintln!("test result: {}. 1 passed, 0 failed", if no_color { "ok" } else { "\x1b[32mok\x1b[0m" });
                0
            }
            TestOutcome::Fail(reason) => {
                eprintln!("  {}  {}", fail_label(no_color), label);
                eprintln!();
                eprintln!("failures:");
                eprintln!();
                eprintln!("  --- {} ---", path.display());
                for line in reason.lines() {
                    eprintln!("  {}", line);
                }
                eprintln!();
                eprintln!("test result: {}. 0 passed, 1 failed (of 1)",
                    if no_color { "FAILED" } else { "\x1b[31mFAILED\x1b[0m" });
                1
            }
        };
    }

    let all_categories = discover_categorized(path);

    if all_categories.is_empty() {
        eprintln!("no .test.loom files found in {}", path.display());
        return 1;
    }

    // Filter categories if specified
    let run_categories: BTreeMap<&str, &Vec<PathBuf>> = if categories.is_empty() {
        all_categories.iter().map(|(k, v)| (k.as_str(), v)).collect()
    } else {
        let mut filtered = BTreeMap::new();
        for requested in categories {
            let req = requested.trim_matches('/');
            let mut found = false;
            for (cat, files) in &all_categories {
                if cat == req || cat.starts_with(&format!("{}/", req)) {
                    filtered.insert(cat.as_str(), files);
                    found = true;
                }
            }
            if !found {
                eprintln!(
                    "warning: category '{}' not found (available: {})",
                    req,
                    all_categories
                        .keys()
                        .map(|k| if k.is_empty() { "(root)" } else { k.as_str() })
                        .collect::<Vec<_>>()
                        .join(", ")
                );
            }
        }
        filtered
    };

    if run_categories.is_empty() {
        eprintln!("no matching categories found");
        return 1;
    }

    let mut passed = 0usize;
    let mut failed = 0usize;
    let mut failures: Vec<TestResult> = Vec::new();

    for (cat, files) in &run_categories {
        // Print category header
        let header = if cat.is_empty() {
            "(root)".to_string()
        } else {
            cat.to_string()
        };
        eprintln!();
        eprintln!("{}", bold(&header, no_color));

        for file in *files {
            let result = run_single_test(file);
            let label = result
                .description
                .as_deref()
                .unwrap_or_else(|| {
                    file.file_stem()
                        .and_then(|s| s.to_str())
                        .unwrap_or("?")
                });

            match &result.outcome {
                TestOutcome::Pass => {
                    passed += 1;
                    eprintln!("  {}  {}", pass_label(no_color), label);
                }
                TestOutcome::Fail(_) => {
                    failed += 1;
                    eprintln!("  {}  {}", fail_label(no_color), label);
                    failures.push(result);
                }
            }
        }
    }

    // Print failure details
    if !failures.is_empty() {
        eprintln!();
        eprintln!("failures:");
        for f in &failures {
            eprintln!();
            eprintln!("  --- {} ---", f.path.display());
            if let TestOutcome::Fail(reason) = &f.outcome {
                for line in reason.lines() {
                    eprintln!("  {}", line);
                }
            }
        }
    }

    // Summary
    eprintln!();
    if failed == 0 {
        if no_color {
            eprintln!("test result: ok. {} passed, 0 failed", passed);
        } else {
            eprintln!("test result: \x1b[32mok\x1b[0m. {} passed, 0 failed", passed);
        }
        0
    } else {
        let total = passed + failed;
        if no_color {
            eprintln!(
                "test result: FAILED. {} passed, {} failed (of {})",
                passed, failed, total
            );
        } else {
            eprintln!(
                "test result: \x1b[31mFAILED\x1b[0m. {} passed, {} failed (of {})",
                passed, failed, total
            );
        }
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frontmatter_and_source() {
        let (config, source) =
            parse_test_file("---\ndescription = \"x\"\nexpect_contains = [\"a\"]\n---\n<p>a</p>\n").unwrap();
        assert_eq!(config.description.as_deref(), Some("x"));
        assert_eq!(config.expect_contains, vec!["a".to_string()]);
        assert_eq!(source, "<p>a</p>");
    }

    #[test]
    fn final_newline_stays_out_of_text() {
        let (config, source) = parse_test_file(
            "---\nmode = \"html\"\nexpect_output = '__rt.chain(__context, [__rt.text, `Hi ${name}`]);'\n---\nHi ${name}\n",
        )
        .unwrap();
        assert_eq!(source, "Hi ${name}");
        assert_eq!(check_test(&config, source), None);

        let (_, source) = parse_test_file("---\nmode = \"html\"\n---\na\r\n").unwrap();
        assert_eq!(source, "a");
    }

    #[test]
    fn missing_delimiters() {
        assert!(parse_test_file("<p>a</p>").is_err());
        assert!(parse_test_file("---\nmode = \"html\"\n").is_err());
    }

    #[test]
    fn unknown_frontmatter_keys_are_rejected() {
        let err = parse_test_file("---\nexpect_outptu = \"\"\n---\n").err().unwrap();
        assert!(err.contains("expect_outptu"), "{}", err);
    }

    #[test]
    fn passing_and_failing_expectations() {
        let (config, source) =
            parse_test_file("---\nexpect_output = \"let a = __tracker.a(x);\"\n---\nlet a = *x;\n").unwrap();
        assert_eq!(check_test(&config, source), None);

        let (config, source) = parse_test_file("---\nexpect_error = \"never closed\"\n---\n<div>\n").unwrap();
        assert_eq!(check_test(&config, source), None);

        let (config, source) = parse_test_file("---\nexpect_error = \"never closed\"\n---\n<div></div>\n").unwrap();
        assert!(check_test(&config, source).is_some());
    }

    #[test]
    fn warning_lines() {
        let (config, source) = parse_test_file(
            "---\nexpect_warnings = [{ contains = \"no effect\", line = 2 }]\n---\nx;\n<p #scope=a></p>\n",
        )
        .unwrap();
        assert_eq!(check_test(&config, source), None);
    }
}
