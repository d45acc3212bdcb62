use std::path::{Path, PathBuf};

use serde::Deserialize;

use loom::{CompileOptions, Dialect, Format};

pub const CONFIG_FILE: &str = "loom.toml";

/// Settings read from `loom.toml`. Every field is optional; command line
/// flags override them.
#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// `modern` or `legacy`.
    #[serde(default)]
    pub dialect: Option<String>,

    /// Mode of the top-level region.
    #[serde(default)]
    pub mode: Option<String>,

    /// Name of the object holding the runtime helpers.
    #[serde(default)]
    pub runtime: Option<String>,

    /// Name of the render context variable.
    #[serde(default)]
    pub context: Option<String>,

    /// Statement tracking in text regions.
    #[serde(default)]
    pub logic: Option<bool>,

    /// Keep whitespace-only text out of chains.
    #[serde(default)]
    pub trimmed: Option<bool>,

    /// `compact` or `indented` stylesheets.
    #[serde(default)]
    pub style_format: Option<String>,

    /// Report text kept literal by fallbacks.
    #[serde(default)]
    pub strict_warnings: Option<bool>,
}

impl Config {
    pub fn load(path: &Path) -> Result<Config, String> {
        let text = std::fs::read_to_string(path).map_err(|e| format!("cannot read '{}': {}", path.display(), e))?;
        toml::from_str(&text).map_err(|e| format!("invalid {}: {}", path.display(), e))
    }

    /// `loom.toml` in the directory of `source`, if there is one.
    pub fn discover(source: &Path) -> Option<PathBuf> {
        let dir = source.parent().unwrap_or(Path::new("."));
        let dir = if dir.as_os_str().is_empty() { Path::new(".") } else { dir };
        let candidate = dir.join(CONFIG_FILE);
        candidate.is_file().then_some(candidate)
    }

    /// Write the file's settings over `options`.
    pub fn apply(&self, options: &mut CompileOptions) -> Result<(), String> {
        if let Some(name) = &self.dialect {
            options.dialect = Dialect::from_name(name).ok_or_else(|| format!("unknown dialect '{}'", name))?;
        }
        if let Some(mode) = &self.mode {
            options.root_mode = mode.clone();
        }
        if let Some(runtime) = &self.runtime {
            options.runtime = runtime.clone();
        }
        if let Some(context) = &self.context {
            options.context = context.clone();
        }
        if let Some(logic) = self.logic {
            options.attributes.logic = logic;
        }
        if let Some(trimmed) = self.trimmed {
            options.attributes.trimmed = trimmed;
        }
        if let Some(format) = &self.style_format {
            options.style_format = match format.as_str() {
                "compact" => Format::Compact,
                "indented" => Format::Indented,
                other => return Err(format!("unknown style format '{}'", other)),
            };
        }
        if let Some(strict) = self.strict_warnings {
            options.warn_fallbacks = strict;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn write_config(dir: &Path, text: &str) -> PathBuf {
        let path = dir.join(CONFIG_FILE);
        let mut file = std::fs::File::create(&path).unwrap();
        write!(file, "{}", text).unwrap();
        path
    }

    #[test]
    fn load_and_apply() {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let path = write_config(
            dir.path(),
            "dialect = \"legacy\"\nmode = \"html\"\nruntime = \"Sactory\"\nlogic = true\nstyle_format = \"indented\"\n",
        );
        let config = Config::load(&path).expect("load failed");
        let mut options = CompileOptions::default();
        config.apply(&mut options).expect("apply failed");
        assert_eq!(options.dialect, Dialect::Legacy);
        assert_eq!(options.root_mode, "html");
        assert_eq!(options.runtime, "Sactory");
        assert!(options.attributes.logic);
        assert_eq!(options.style_format, Format::Indented);
        assert_eq!(options.context, "__context");
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let path = write_config(dir.path(), "dialekt = \"legacy\"\n");
        let err = Config::load(&path).unwrap_err();
        assert!(err.contains("dialekt"), "{}", err);
    }

    #[test]
    fn bad_values_are_reported() {
        let config = Config {
            dialect: Some("es3".to_string()),
            ..Config::default()
        };
        let err = config.apply(&mut CompileOptions::default()).unwrap_err();
        assert_eq!(err, "unknown dialect 'es3'");
    }

    #[test]
    fn discover_next_to_source() {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let source = dir.path().join("page.loom");
        assert_eq!(Config::discover(&source), None);
        let path = write_config(dir.path(), "");
        assert_eq!(Config::discover(&source), Some(path));
    }

    #[test]
    fn empty_file_changes_nothing() {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let path = write_config(dir.path(), "");
        let config = Config::load(&path).expect("load failed");
        assert_eq!(config, Config::default());
    }
}
