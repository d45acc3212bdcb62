use crate::attributes::RegionAttributes;
use crate::mode::code::CodeMode;
use crate::mode::comment::CommentMode;
use crate::mode::markup::MarkupMode;
use crate::mode::script::ScriptMode;
use crate::mode::stylesheet::StylesheetMode;
use crate::mode::{Mode, Session};
use crate::scanner::ScanOptions;

/// Index of a registered mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ModeId(usize);

pub type Constructor = fn(&RegionAttributes, &mut Session<'_>) -> Box<dyn Mode>;

/// Everything the driver needs to know about a mode before it runs.
#[derive(Clone)]
pub struct ModeSpec {
    /// Names accepted by `#mode` and the root-mode option. The first one
    /// is the canonical name.
    pub aliases: &'static [&'static str],
    /// Constructs the scanner skips while the region is active.
    pub options: ScanOptions,
    /// Element name whose content this mode parses by default.
    pub tag: Option<&'static str>,
    pub description: &'static str,
    pub construct: Constructor,
}

impl ModeSpec {
    pub fn name(&self) -> &'static str {
        self.aliases.first().copied().unwrap_or("")
    }
}

pub struct ModeRegistry {
    modes: Vec<ModeSpec>,
    default: Option<ModeId>,
}

impl Default for ModeRegistry {
    fn default() -> Self {
        ModeRegistry::standard()
    }
}

impl ModeRegistry {
    pub fn new() -> Self {
        ModeRegistry {
            modes: Vec::new(),
            default: None,
        }
    }

    /// The built-in modes, with code as the default.
    pub fn standard() -> Self {
        let mut registry = ModeRegistry::new();
        registry.register(
            ModeSpec {
                aliases: &["code", "javascript", "js"],
                options: ScanOptions::CODE,
                tag: None,
                description: "inline code with reactive shorthands",
                construct: |attributes, _| Box::new(CodeMode::new(attributes)),
            },
            true,
        );
        registry.register(
            ModeSpec {
                aliases: &["html"],
                options: ScanOptions::TEXT,
                tag: None,
                description: "element content: text, markers and child elements",
                construct: |attributes, s| Box::new(MarkupMode::html(attributes, s)),
            },
            false,
        );
        registry.register(
            ModeSpec {
                aliases: &["script"],
                options: ScanOptions::TEXT,
                tag: Some("script"),
                description: "script element content, kept as text",
                construct: |attributes, s| Box::new(ScriptMode::new(attributes, s)),
            },
            false,
        );
        registry.register(
            ModeSpec {
                aliases: &["css"],
                options: ScanOptions {
                    comments: true,
                    strings: true,
                    regex: false,
                    code: false,
                },
                tag: None,
                description: "raw stylesheet text with markers",
                construct: |attributes, s| Box::new(MarkupMode::css(attributes, s)),
            },
            false,
        );
        registry.register(
            ModeSpec {
                aliases: &["ssb", "style"],
                options: ScanOptions::TEXT,
                tag: Some("style"),
                description: "stylesheet builder with nested selectors and unit arithmetic",
                construct: |attributes, s| Box::new(StylesheetMode::new(attributes, s)),
            },
            false,
        );
        registry.register(
            ModeSpec {
                aliases: &["__comment"],
                options: ScanOptions::TEXT,
                tag: None,
                description: "markup comment content",
                construct: |attributes, s| Box::new(CommentMode::new(attributes, s)),
            },
            false,
        );
        registry
    }

    /// Add a mode. Registering a default replaces the previous one.
    pub fn register(&mut self, spec: ModeSpec, is_default: bool) -> ModeId {
        let id = ModeId(self.modes.len());
        self.modes.push(spec);
        if is_default || self.default.is_none() {
            self.default = Some(id);
        }
        id
    }

    pub fn lookup(&self, name: &str) -> Option<ModeId> {
        self.modes
            .iter()
            .position(|spec| spec.aliases.contains(&name))
            .map(ModeId)
    }

    /// The mode claiming an element by tag name.
    pub fn matches_tag(&self, tag: &str) -> Option<ModeId> {
        self.modes
            .iter()
            .position(|spec| spec.tag.is_some_and(|t| t.eq_ignore_ascii_case(tag)))
            .map(ModeId)
    }

    pub fn default_mode(&self) -> Option<ModeId> {
        self.default
    }

    pub fn spec(&self, id: ModeId) -> &ModeSpec {
        &self.modes[id.0]
    }

    pub fn iter(&self) -> impl Iterator<Item = (ModeId, &ModeSpec)> {
        self.modes.iter().enumerate().map(|(i, spec)| (ModeId(i), spec))
    }

    /// Construct a mode for a region starting at the scanner cursor, and
    /// switch the scanner to the mode's options. The caller restores the
    /// previous options when the region ends.
    pub fn start(&self, id: ModeId, attributes: &RegionAttributes, s: &mut Session<'_>) -> Box<dyn Mode> {
        let spec = self.spec(id);
        s.scanner.options = spec.options;
        (spec.construct)(attributes, s)
    }
}
