//! Region parsers and the capabilities they are composed from.
//!
//! A mode owns the parsing of one region. Modes never call each other: the
//! driver asks the active mode to [`Mode::parse`] until it reports that a
//! child region starts, that its own region closes, or that input ends.

pub mod breakpoint;
pub mod chain;
pub mod code;
pub mod comment;
pub mod markup;
pub mod script;
pub mod statement;
pub mod stylesheet;

use crate::attributes::AttributeKey;
use crate::emitter::Emitter;
use crate::error::{CompileError, Result};
use crate::options::CompileOptions;
use crate::scanner::Scanner;

pub use chain::Link;

/// State shared by every region of one compilation: the scanner cursor,
/// the output arena and collected warnings.
pub struct Session<'a> {
    pub scanner: Scanner<'a>,
    pub emitter: Emitter,
    pub options: &'a CompileOptions,
    pub warnings: Vec<CompileError>,
}

impl<'a> Session<'a> {
    pub fn new(source: &'a str, file_id: usize, options: &'a CompileOptions) -> Self {
        Session {
            scanner: Scanner::new(source, file_id),
            emitter: Emitter::new(options),
            options,
            warnings: Vec::new(),
        }
    }

    pub fn file_id(&self) -> usize {
        self.scanner.file_id()
    }

    pub fn warn(&mut self, warning: CompileError) {
        self.warnings.push(warning);
    }
}

/// Outcome of one [`Mode::parse`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Continue,
    /// A tag or comment starts; the scanner is just past `<`.
    Child,
    /// The region's closing tag starts (scanner just past `<`), or the
    /// region's own terminator was consumed.
    Close,
    Eof,
}

/// A rewritten code expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expr {
    pub source: String,
    /// Reads a reactive value through the tracker.
    pub reactive: bool,
}

impl Expr {
    pub fn plain(source: impl Into<String>) -> Self {
        Expr {
            source: source.into(),
            reactive: false,
        }
    }
}

pub trait Mode {
    fn name(&self) -> &'static str;

    fn start(&mut self, _s: &mut Session<'_>) -> Result<()> {
        Ok(())
    }

    fn parse(&mut self, s: &mut Session<'_>) -> Result<Step>;

    /// Called once when the region ends, before its slots are frozen.
    fn end(&mut self, s: &mut Session<'_>) -> Result<()>;

    /// A call emitted after the region's content (e.g. scope cleanup).
    fn chain_after(&self, _s: &Session<'_>) -> Option<String> {
        None
    }

    fn used_attributes(&self) -> &'static [AttributeKey] {
        &[]
    }

    /// Attributes the mode adds to its element, as `(name, source)`.
    fn element_attributes(&self) -> Vec<(String, String)> {
        Vec::new()
    }

    /// Receive the value of a finished value-producing child region.
    fn accept_region(&mut self, s: &mut Session<'_>, link: Link) -> Result<()> {
        chain::emit_links(s, vec![link]);
        Ok(())
    }

    /// The value this region hands to its parent instead of emitting code.
    fn region_value(&mut self, _s: &mut Session<'_>) -> Option<Link> {
        None
    }

    /// Mode for untagged child elements.
    fn child_mode(&self) -> &'static str {
        "html"
    }

    /// Text placed after an element call made from this region.
    fn element_terminator(&self) -> &'static str {
        ";"
    }
}
