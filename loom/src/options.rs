use loom_style::Format;

use crate::attributes::RegionAttributes;

/// Shape of generated functions and string joins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dialect {
    /// Arrow functions and template literals.
    #[default]
    Modern,
    /// `function(){}.bind(this)` and `"" + "a" + (b)` joins.
    Legacy,
}

impl Dialect {
    pub fn from_name(name: &str) -> Option<Dialect> {
        match name {
            "modern" | "es6" => Some(Dialect::Modern),
            "legacy" | "es5" => Some(Dialect::Legacy),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Dialect::Modern => "modern",
            Dialect::Legacy => "legacy",
        }
    }
}

/// Settings for one compilation.
#[derive(Debug, Clone)]
pub struct CompileOptions {
    pub dialect: Dialect,
    /// Object holding the runtime helpers (`<runtime>.chain`, ...).
    pub runtime: String,
    /// Name of the render context variable.
    pub context: String,
    /// Name of the subscription tracker parameter.
    pub tracker: String,
    /// Parameter name used by unit arithmetic and chained reads.
    pub value: String,
    /// Mode of the top-level region.
    pub root_mode: String,
    /// Attributes of the top-level region; nested regions inherit from it.
    pub attributes: RegionAttributes,
    /// Serialization of stylesheets folded at compile time.
    pub style_format: Format,
    /// Report text kept literal by permissive fallbacks (a stray `}`).
    pub warn_fallbacks: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        CompileOptions {
            dialect: Dialect::Modern,
            runtime: "__rt".to_string(),
            context: "__context".to_string(),
            tracker: "__tracker".to_string(),
            value: "__value".to_string(),
            root_mode: "code".to_string(),
            attributes: RegionAttributes::default(),
            style_format: Format::Compact,
            warn_fallbacks: false,
        }
    }
}
