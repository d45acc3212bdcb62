use crate::error::Result;
use crate::mode::Session;
use crate::scanner::{Found, Scanner};

/// What follows a `<`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagStart {
    /// `<name`
    Open,
    /// `</`
    Close,
    /// `<!--`
    Comment,
    /// A comparison or shift operator, or plain text.
    None,
}

/// Classify the input after a `<` the scanner has just consumed.
pub fn tag_start(scanner: &Scanner<'_>) -> TagStart {
    let rest = scanner.rest();
    if rest.starts_with("!--") {
        TagStart::Comment
    } else if let Some(after) = rest.strip_prefix('/') {
        if after.starts_with(|c: char| c.is_alphabetic() || c == ':' || c == '>') {
            TagStart::Close
        } else {
            TagStart::None
        }
    } else if rest.starts_with(|c: char| c.is_alphabetic() || c == ':' || c == '_') {
        TagStart::Open
    } else {
        TagStart::None
    }
}

/// The fixed breakpoint set of a mode. Modes that can hold child regions
/// include `<`, the region-entry character; comment bodies end at `-->`
/// and leave it out.
#[derive(Debug, Clone, Copy)]
pub struct Breakpoints {
    base: &'static [char],
}

impl Breakpoints {
    pub const fn new(base: &'static [char]) -> Self {
        Breakpoints { base }
    }

    /// Scan to the next breakpoint of the base set or of `extra`. The text
    /// before it is returned untouched.
    pub fn find(&self, s: &mut Session<'_>, extra: &[char], consume: bool) -> Result<Found> {
        if extra.is_empty() {
            s.scanner.find(self.base, false, consume)
        } else {
            let mut set = self.base.to_vec();
            set.extend_from_slice(extra);
            s.scanner.find(&set, false, consume)
        }
    }

    /// Decide whether the `<` just consumed enters a region. In code, a
    /// region may only start where an expression could.
    pub fn region_entry(&self, s: &Session<'_>, code: bool) -> TagStart {
        if code && !s.scanner.expression_can_start_at(s.scanner.last_match()) {
            return TagStart::None;
        }
        tag_start(&s.scanner)
    }
}
