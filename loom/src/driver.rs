//! The region loop.
//!
//! The driver owns the stack of active regions. It asks the innermost mode
//! to parse until the mode reports a child region, its own closing tag or
//! the end of input, and handles the element syntax between regions:
//!
//! ```text
//! <name attr=value attr="text" attr={expr} #region-attr>...</name>
//! <name ... />
//! <!-- ... -->
//! ```

use std::ops::Range;

use crate::attributes::{RawAttribute, RawValue, RegionAttributes};
use crate::error::{CompileError, ErrorKind, Result};
use crate::mode::chain::{quote, wrap_reactive};
use crate::mode::code::rewrite_expression;
use crate::mode::{Mode, Session, Step};
use crate::options::Dialect;
use crate::registry::{ModeId, ModeRegistry};
use crate::scanner::ScanOptions;

/// Compile the whole input held by the session.
pub fn run(registry: &ModeRegistry, s: &mut Session<'_>) -> std::result::Result<(), Vec<CompileError>> {
    let mut state = DriverState::new(registry);
    if let Err(err) = state.process(s) {
        state.errors.push(err);
    }
    state.finalize()
}

// ---------------------------------------------------------------------------
// Driver state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TagKind {
    Element,
    Comment,
}

#[derive(Debug, Clone)]
struct OpenTag {
    name: String,
    span: Range<usize>,
    kind: TagKind,
}

/// An active region.
struct Frame {
    mode: Box<dyn Mode>,
    attributes: RegionAttributes,
    /// Absent for the root region.
    tag: Option<OpenTag>,
    saved_options: ScanOptions,
    saved_dialect: Dialect,
    /// Start of the region's output.
    mark: usize,
}

/// A parsed start tag.
struct StartTag {
    name: String,
    span: Range<usize>,
    /// `(name, source)` of element attributes.
    attributes: Vec<(String, String)>,
    region: Vec<RawAttribute>,
    self_closing: bool,
}

struct DriverState<'r> {
    registry: &'r ModeRegistry,
    frames: Vec<Frame>,
    errors: Vec<CompileError>,
}

impl<'r> DriverState<'r> {
    fn new(registry: &'r ModeRegistry) -> Self {
        DriverState {
            registry,
            frames: Vec::new(),
            errors: Vec::new(),
        }
    }

    fn process(&mut self, s: &mut Session<'_>) -> Result<()> {
        self.start_root(s)?;
        loop {
            let Some(frame) = self.frames.last_mut() else {
                return Ok(());
            };
            match frame.mode.parse(s)? {
                Step::Continue => {}
                Step::Child => self.open(s)?,
                Step::Close => self.close(s)?,
                Step::Eof => {
                    if let Some(tag) = frame.tag.as_ref() {
                        let what = match tag.kind {
                            TagKind::Element => format!("`<{}>` is never closed", tag.name),
                            TagKind::Comment => "comment is never closed".to_string(),
                        };
                        return Err(CompileError::malformed(what, tag.span.clone(), s.file_id())
                            .with_note("input ended inside this region"));
                    }
                    if let Some(frame) = self.frames.pop() {
                        self.end_frame(s, frame)?;
                    }
                    return Ok(());
                }
            }
        }
    }

    fn finalize(self) -> std::result::Result<(), Vec<CompileError>> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self.errors)
        }
    }

    fn start_root(&mut self, s: &mut Session<'_>) -> Result<()> {
        let name = s.options.root_mode.clone();
        let id = if name.is_empty() {
            self.registry.default_mode()
        } else {
            self.registry.lookup(&name)
        };
        let Some(id) = id else {
            return Err(self.unknown_mode(&name, 0..0, s.file_id()));
        };
        let attributes = s.options.attributes.clone();
        let saved_dialect = s.emitter.dialect();
        if let Some(dialect) = attributes.dialect {
            s.emitter.set_dialect(dialect);
        }
        let saved_options = s.scanner.options;
        let mut mode = self.registry.start(id, &attributes, s);
        let mark = s.emitter.mark();
        mode.start(s)?;
        self.frames.push(Frame {
            mode,
            attributes,
            tag: None,
            saved_options,
            saved_dialect,
            mark,
        });
        Ok(())
    }

    fn unknown_mode(&self, name: &str, span: Range<usize>, file_id: usize) -> CompileError {
        let known: Vec<&str> = self
            .registry
            .iter()
            .filter(|(_, spec)| !spec.name().starts_with("__"))
            .flat_map(|(_, spec)| spec.aliases.iter().copied())
            .collect();
        CompileError::error(ErrorKind::Config, format!("unknown mode `{}`", name), span, file_id)
            .with_note(format!("known modes: {}", known.join(", ")))
    }

    // -----------------------------------------------------------------------
    // Opening regions
    // -----------------------------------------------------------------------

    /// The scanner is just past `<`.
    fn open(&mut self, s: &mut Session<'_>) -> Result<()> {
        let at = s.scanner.position() - 1;
        if s.scanner.read_sequence("!--") {
            let span = at..s.scanner.position();
            let Some(id) = self.registry.lookup("__comment") else {
                return Err(self.unknown_mode("__comment", span, s.file_id()));
            };
            let attributes = self.parent_attributes().inherit();
            return self.push_frame(
                s,
                id,
                attributes,
                OpenTag {
                    name: "!--".to_string(),
                    span,
                    kind: TagKind::Comment,
                },
            );
        }

        let tag = self.read_start_tag(s, at)?;
        let parent = self.parent_attributes();
        let attributes = RegionAttributes::resolve(&tag.region, &parent, s.file_id())?;
        let id = self.choose_mode(s, &tag, &attributes)?;
        let terminator = self.parent_terminator();
        let context = s.emitter.context();

        if tag.self_closing {
            for (key, span) in attributes.leftovers(&[]) {
                s.warn(CompileError::warning(
                    format!("`{}` has no effect on an element without content", key),
                    span,
                    s.file_id(),
                ));
            }
            s.emitter.add(&format!(
                "{}({}, {}, {}){}",
                s.emitter.feature("element"),
                context,
                quote(&tag.name),
                attribute_object(&tag.attributes),
                terminator
            ));
            return Ok(());
        }

        self.push_element(s, id, attributes, tag, context)
    }

    fn push_element(
        &mut self,
        s: &mut Session<'_>,
        id: ModeId,
        attributes: RegionAttributes,
        tag: StartTag,
        context: String,
    ) -> Result<()> {
        let saved_options = s.scanner.options;
        let saved_dialect = s.emitter.dialect();
        if let Some(dialect) = attributes.dialect {
            s.emitter.set_dialect(dialect);
        }
        let mut mode = self.registry.start(id, &attributes, s);
        for (key, span) in attributes.leftovers(mode.used_attributes()) {
            s.warn(CompileError::warning(
                format!("`{}` has no effect in `{}` regions", key, mode.name()),
                span,
                s.file_id(),
            ));
        }

        let mut element_attributes = tag.attributes;
        element_attributes.extend(mode.element_attributes());
        let parameter = s.options.context.clone();
        s.emitter.add(&format!(
            "{}({}, {}, {}, {}",
            s.emitter.feature("element"),
            context,
            quote(&tag.name),
            attribute_object(&element_attributes),
            s.emitter.function_open(&parameter)
        ));
        s.emitter.start_function(&parameter);
        let mark = s.emitter.mark();
        mode.start(s)?;
        self.frames.push(Frame {
            mode,
            attributes,
            tag: Some(OpenTag {
                name: tag.name,
                span: tag.span,
                kind: TagKind::Element,
            }),
            saved_options,
            saved_dialect,
            mark,
        });
        Ok(())
    }

    fn push_frame(&mut self, s: &mut Session<'_>, id: ModeId, attributes: RegionAttributes, tag: OpenTag) -> Result<()> {
        let saved_options = s.scanner.options;
        let saved_dialect = s.emitter.dialect();
        let mut mode = self.registry.start(id, &attributes, s);
        let mark = s.emitter.mark();
        mode.start(s)?;
        self.frames.push(Frame {
            mode,
            attributes,
            tag: Some(tag),
            saved_options,
            saved_dialect,
            mark,
        });
        Ok(())
    }

    fn parent_attributes(&self) -> RegionAttributes {
        self.frames
            .last()
            .map(|frame| frame.attributes.clone())
            .unwrap_or_default()
    }

    fn parent_terminator(&self) -> &'static str {
        self.frames
            .last()
            .map_or(";", |frame| frame.mode.element_terminator())
    }

    /// `#mode`, then a mode claiming the tag, then the parent's child mode.
    fn choose_mode(&self, s: &Session<'_>, tag: &StartTag, attributes: &RegionAttributes) -> Result<ModeId> {
        if let Some(name) = &attributes.mode {
            let span = tag
                .region
                .iter()
                .find(|a| a.name == "mode")
                .map_or(tag.span.clone(), |a| a.span.clone());
            return self
                .registry
                .lookup(name)
                .ok_or_else(|| self.unknown_mode(name, span, s.file_id()));
        }
        if let Some(id) = self.registry.matches_tag(&tag.name) {
            return Ok(id);
        }
        let child = self.frames.last().map_or("html", |frame| frame.mode.child_mode());
        self.registry
            .lookup(child)
            .ok_or_else(|| self.unknown_mode(child, tag.span.clone(), s.file_id()))
    }

    // -----------------------------------------------------------------------
    // Start tags
    // -----------------------------------------------------------------------

    fn read_start_tag(&self, s: &mut Session<'_>, at: usize) -> Result<StartTag> {
        let name = read_tag_name(s);
        let mut tag = StartTag {
            name,
            span: at..s.scanner.position(),
            attributes: Vec::new(),
            region: Vec::new(),
            self_closing: false,
        };
        loop {
            s.scanner.skip_whitespace(false)?;
            if s.scanner.read_sequence("/>") {
                tag.self_closing = true;
                return Ok(tag);
            }
            if s.scanner.read_if('>') {
                return Ok(tag);
            }
            if s.scanner.eof() {
                return Err(CompileError::malformed(
                    format!("start tag `<{}` is never closed", tag.name),
                    tag.span.clone(),
                    s.file_id(),
                ));
            }
            self.read_attribute(s, &mut tag)?;
        }
    }

    fn read_attribute(&self, s: &mut Session<'_>, tag: &mut StartTag) -> Result<()> {
        let start = s.scanner.position();
        let region = s.scanner.read_if('#');
        let name_len = s
            .scanner
            .rest()
            .find(|c: char| c.is_whitespace() || matches!(c, '=' | '>' | '/' | '"' | '\'' | '{'))
            .unwrap_or(s.scanner.rest().len());
        if name_len == 0 {
            let c = s.scanner.peek().unwrap_or(' ');
            return Err(s.scanner.error(
                ErrorKind::UnknownToken,
                format!("unexpected `{}` in start tag", c),
                start..start + c.len_utf8(),
            ));
        }
        let name = s.scanner.rest()[..name_len].to_string();
        s.scanner.read_sequence(&name);

        let value = if s.scanner.read_if('=') {
            match s.scanner.peek() {
                Some('"' | '\'') => {
                    let literal = s.scanner.skip_string()?;
                    RawValue::Text(literal[1..literal.len() - 1].to_string())
                }
                Some('{') => {
                    let enclosed = s.scanner.skip_enclosed_content()?;
                    RawValue::Expression(enclosed[1..enclosed.len() - 1].to_string())
                }
                _ => {
                    let len = s
                        .scanner
                        .rest()
                        .find(|c: char| c.is_whitespace() || c == '>' || c == '/')
                        .unwrap_or(s.scanner.rest().len());
                    let text = s.scanner.rest()[..len].to_string();
                    s.scanner.read_sequence(&text);
                    RawValue::Text(text)
                }
            }
        } else {
            RawValue::Flag
        };
        let span = start..s.scanner.position();

        if region {
            tag.region.push(RawAttribute { name, value, span });
            return Ok(());
        }
        let source = match value {
            RawValue::Flag => quote(""),
            RawValue::Text(text) => quote(&text),
            RawValue::Expression(text) => {
                let base = span.start + name.len() + 2;
                let expr = rewrite_expression(s, &text, base, true)?;
                if expr.reactive {
                    wrap_reactive(&s.emitter, &expr.source)
                } else {
                    expr.source
                }
            }
        };
        tag.attributes.push((name, source));
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Closing regions
    // -----------------------------------------------------------------------

    /// The active mode reported its end: for elements the scanner is just
    /// past the `<` of the closing tag.
    fn close(&mut self, s: &mut Session<'_>) -> Result<()> {
        let at = s.scanner.position().saturating_sub(1);
        let Some(mut frame) = self.frames.pop() else {
            return Ok(());
        };
        let Some(tag) = frame.tag.clone() else {
            let name = read_closing_tag(s)?;
            self.frames.push(frame);
            return Err(CompileError::malformed(
                format!("`</{}>` closes nothing", name),
                at..s.scanner.position(),
                s.file_id(),
            ));
        };

        if tag.kind == TagKind::Element {
            let name = read_closing_tag(s)?;
            if !name.is_empty() && name != tag.name {
                return Err(CompileError::malformed(
                    format!("`</{}>` does not close `<{}>`", name, tag.name),
                    at..s.scanner.position(),
                    s.file_id(),
                )
                .with_note(format!("`<{}>` is opened here", tag.name))
                .with_note(format!("at byte {}", tag.span.start)));
            }
        }

        let value = if tag.kind == TagKind::Comment {
            frame.mode.region_value(s)
        } else {
            None
        };
        self.end_frame(s, frame)?;
        match tag.kind {
            TagKind::Comment => {
                if let (Some(link), Some(parent)) = (value, self.frames.last_mut()) {
                    parent.mode.accept_region(s, link)?;
                }
            }
            TagKind::Element => {
                s.emitter.end_scope();
                let terminator = self.parent_terminator();
                s.emitter.add(")");
                s.emitter.add(terminator);
            }
        }
        Ok(())
    }

    /// End a region: let the mode finish, emit its trailing calls, freeze
    /// its slots and restore the parent's scanner options and dialect.
    fn end_frame(&mut self, s: &mut Session<'_>, mut frame: Frame) -> Result<()> {
        frame.mode.end(s)?;
        if let Some(call) = frame.mode.chain_after(s) {
            s.emitter.add(&format!("{};", call));
        }
        if let Err(errors) = s.emitter.end_region(frame.mark, s.file_id()) {
            self.errors.extend(errors);
        }
        if frame.tag.as_ref().is_some_and(|tag| tag.kind == TagKind::Element) {
            s.emitter.add(s.emitter.function_close());
        }
        s.scanner.options = frame.saved_options;
        s.emitter.set_dialect(frame.saved_dialect);
        Ok(())
    }
}

fn read_tag_name(s: &mut Session<'_>) -> String {
    let len = s
        .scanner
        .rest()
        .find(|c: char| !(c.is_alphanumeric() || matches!(c, ':' | '-' | '_' | '.')))
        .unwrap_or(s.scanner.rest().len());
    let name = s.scanner.rest()[..len].to_string();
    s.scanner.read_sequence(&name);
    name
}

/// Read `/name>` after `<`. Returns the name (empty for `</>`).
fn read_closing_tag(s: &mut Session<'_>) -> Result<String> {
    s.scanner.expect_sequence("/")?;
    let name = read_tag_name(s);
    s.scanner.skip_whitespace(false)?;
    s.scanner.expect_sequence(">")?;
    Ok(name)
}

fn attribute_object(attributes: &[(String, String)]) -> String {
    if attributes.is_empty() {
        return "{}".to_string();
    }
    let entries: Vec<String> = attributes
        .iter()
        .map(|(name, source)| format!("{}: {}", quote(name), source))
        .collect();
    format!("{{{}}}", entries.join(", "))
}
