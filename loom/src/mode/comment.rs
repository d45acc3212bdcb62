use crate::attributes::RegionAttributes;
use crate::error::Result;
use crate::mode::breakpoint::Breakpoints;
use crate::mode::chain::{ChainBuilder, Link, quote, text_marker};
use crate::mode::{Mode, Session, Step};

const BREAKPOINTS: Breakpoints = Breakpoints::new(&['$', '-']);

/// `<!-- ... -->`. The content is not emitted by the region itself: it is
/// handed to the parent as a `comment` chain entry.
pub struct CommentMode {
    chain: ChainBuilder,
}

impl CommentMode {
    pub fn new(attributes: &RegionAttributes, _s: &mut Session<'_>) -> Self {
        let mut attributes = attributes.clone();
        attributes.trimmed = false;
        CommentMode {
            chain: ChainBuilder::new(&attributes, false),
        }
    }
}

impl Mode for CommentMode {
    fn name(&self) -> &'static str {
        "__comment"
    }

    fn parse(&mut self, s: &mut Session<'_>) -> Result<Step> {
        let found = BREAKPOINTS.find(s, &[], true)?;
        self.chain.push_text(&found.pre);
        match found.matched {
            None => Ok(Step::Eof),
            Some('-') if s.scanner.read_sequence("->") => Ok(Step::Close),
            Some('-') => {
                self.chain.push_text("-");
                Ok(Step::Continue)
            }
            Some(marker) => {
                text_marker(s, &mut self.chain, marker, true)?;
                Ok(Step::Continue)
            }
        }
    }

    fn end(&mut self, _s: &mut Session<'_>) -> Result<()> {
        Ok(())
    }

    fn region_value(&mut self, s: &mut Session<'_>) -> Option<Link> {
        let source = self.chain.take_value(s).unwrap_or_else(|| quote(""));
        Some(Link::Grouped { kind: "comment", source })
    }
}
