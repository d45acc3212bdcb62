//! Text regions: element content (`html`) and raw text content (`css`).

use crate::attributes::{AttributeKey, RegionAttributes};
use crate::error::{CompileError, Result};
use crate::mode::breakpoint::{Breakpoints, TagStart};
use crate::mode::chain::{ChainBuilder, Link, text_marker};
use crate::mode::statement::{Closed, StatementTracker};
use crate::mode::{Mode, Session, Step};

const BREAKPOINTS: Breakpoints = Breakpoints::new(&['<', '$', '#', '%', '@']);

pub struct MarkupMode {
    name: &'static str,
    chain: ChainBuilder,
    /// Present when the region tracks `#logic` statements.
    statements: Option<StatementTracker>,
    /// Tags start child elements. Off for raw text content.
    children: bool,
}

impl MarkupMode {
    pub fn html(attributes: &RegionAttributes, s: &mut Session<'_>) -> Self {
        MarkupMode::new("html", attributes, s, true)
    }

    pub fn css(attributes: &RegionAttributes, s: &mut Session<'_>) -> Self {
        MarkupMode::new("css", attributes, s, false)
    }

    fn new(name: &'static str, attributes: &RegionAttributes, s: &mut Session<'_>, children: bool) -> Self {
        MarkupMode {
            name,
            chain: ChainBuilder::new(attributes, children),
            statements: attributes
                .logic
                .then(|| StatementTracker::new(s.scanner.position(), true)),
            children,
        }
    }
}

impl Mode for MarkupMode {
    fn name(&self) -> &'static str {
        self.name
    }

    fn parse(&mut self, s: &mut Session<'_>) -> Result<Step> {
        let mut extra = Vec::new();
        if let Some(statements) = &self.statements {
            statements.extend_breakpoints(&mut extra);
        }
        let found = BREAKPOINTS.find(s, &extra, false)?;
        self.chain.push_text(&found.pre);
        let Some(c) = found.matched else {
            return Ok(Step::Eof);
        };

        if let Some(statements) = self.statements.as_mut().filter(|st| st.handles(c)) {
            let at = s.scanner.position();
            let closed = statements.dispatch(s, &mut self.chain, c)?;
            if closed == Some(Closed::Stray) && s.options.warn_fallbacks {
                s.warn(
                    CompileError::warning("`}` closes nothing and is kept as text", at..at + 1, s.file_id())
                        .with_note("escape it as `\\}` to silence this warning"),
                );
            }
            return Ok(Step::Continue);
        }

        s.scanner.read();
        if c != '<' {
            text_marker(s, &mut self.chain, c, true)?;
            return Ok(Step::Continue);
        }
        match BREAKPOINTS.region_entry(s, false) {
            TagStart::Open if self.children => {
                self.chain.end_chain(s);
                Ok(Step::Child)
            }
            TagStart::Comment if self.children => {
                self.chain.add_current(s);
                Ok(Step::Child)
            }
            TagStart::Close => Ok(Step::Close),
            _ => {
                self.chain.push_text("<");
                Ok(Step::Continue)
            }
        }
    }

    fn end(&mut self, s: &mut Session<'_>) -> Result<()> {
        self.chain.end_chain(s);
        if let Some(statements) = self.statements.as_mut() {
            statements.finish(s)?;
        }
        Ok(())
    }

    fn used_attributes(&self) -> &'static [AttributeKey] {
        &[AttributeKey::Logic, AttributeKey::Trimmed]
    }

    fn accept_region(&mut self, s: &mut Session<'_>, link: Link) -> Result<()> {
        self.chain.push_link(s, link);
        Ok(())
    }
}
