use crate::attributes::{AttributeKey, RegionAttributes};
use crate::error::Result;
use crate::mode::breakpoint::{Breakpoints, TagStart, tag_start};
use crate::mode::chain::{ChainBuilder, text_marker};
use crate::mode::{Mode, Session, Step};

const BREAKPOINTS: Breakpoints = Breakpoints::new(&['<', '$', '%', '@']);

/// Script element content, kept as text. Markers are expanded without
/// subscribing, and with `#scoped` the script runs with its parent
/// element as `this`.
pub struct ScriptMode {
    chain: ChainBuilder,
    /// Class identifying the element of a scoped script.
    scope_class: Option<String>,
}

impl ScriptMode {
    pub fn new(attributes: &RegionAttributes, s: &mut Session<'_>) -> Self {
        let scope_class = attributes
            .scoped
            .then(|| format!("script{}", s.emitter.next_id()));
        let mut attributes = attributes.clone();
        attributes.trimmed = false;
        ScriptMode {
            chain: ChainBuilder::new(&attributes, false),
            scope_class,
        }
    }
}

impl Mode for ScriptMode {
    fn name(&self) -> &'static str {
        "script"
    }

    fn start(&mut self, _s: &mut Session<'_>) -> Result<()> {
        if self.scope_class.is_some() {
            self.chain.push_text("!function(){");
        }
        Ok(())
    }

    fn parse(&mut self, s: &mut Session<'_>) -> Result<Step> {
        let found = BREAKPOINTS.find(s, &[], true)?;
        self.chain.push_text(&found.pre);
        match found.matched {
            None => Ok(Step::Eof),
            Some('<') if tag_start(&s.scanner) == TagStart::Close => Ok(Step::Close),
            Some('<') => {
                self.chain.push_text("<");
                Ok(Step::Continue)
            }
            Some(marker) => {
                text_marker(s, &mut self.chain, marker, false)?;
                Ok(Step::Continue)
            }
        }
    }

    fn end(&mut self, s: &mut Session<'_>) -> Result<()> {
        if let Some(class) = &self.scope_class {
            self.chain.push_text(&format!(
                "}}.call(document.querySelector(\".{}\").parentNode)",
                class
            ));
        }
        self.chain.end_chain(s);
        Ok(())
    }

    fn used_attributes(&self) -> &'static [AttributeKey] {
        &[AttributeKey::Scoped]
    }

    fn element_attributes(&self) -> Vec<(String, String)> {
        match &self.scope_class {
            Some(class) => vec![("class".to_string(), format!("\"{}\"", class))],
            None => Vec::new(),
        }
    }
}
