//! Stylesheet builder regions (`<style>` content).
//!
//! The region is compiled to a builder function receiving the root scope:
//!
//! ```text
//! .a {                    const __s1 = __s0.select(".a");
//!     color: ${c};        __s1.value("color", `${c}`);
//! }
//! ```
//!
//! Statements end with `;`, selectors open scopes with `{`. Control flow
//! lines are kept as code through statement tracking; when any reactive
//! value is read, the builder is wrapped in `coff` so the whole sheet is
//! rebuilt. A region without any runtime value is rendered at compile time
//! instead.

pub mod arith;

use std::mem;
use std::ops::Range;

use loom_style::{Scope, Sheet};

use crate::attributes::{AttributeKey, RegionAttributes};
use crate::emitter::SlotId;
use crate::error::{CompileError, ErrorKind, Result};
use crate::mode::breakpoint::{Breakpoints, TagStart, tag_start};
use crate::mode::chain::{Piece, join, quote, read_marker};
use crate::mode::statement::{Closed, StatementTracker, TextHost};
use crate::mode::{Mode, Session, Step};
use crate::options::Dialect;

const BREAKPOINTS: Breakpoints = Breakpoints::new(&['<', '$', '%', '@', '{', '}', '/', '"', '\'', ';']);

// ---------------------------------------------------------------------------
// Statement buffer
// ---------------------------------------------------------------------------

/// Text of the statement being read.
#[derive(Debug, Default)]
struct StyleBuffer {
    pieces: Vec<Piece>,
    /// Offset of the first significant character.
    start: Option<usize>,
}

impl StyleBuffer {
    fn is_blank(&self) -> bool {
        self.pieces.iter().all(|p| match p {
            Piece::Text(text) => text.trim().is_empty(),
            Piece::Expr(_) => false,
            Piece::Comment(_) => true,
        })
    }

    fn push_significant(&mut self, piece: Piece, at: usize) {
        self.start.get_or_insert(at);
        self.pieces.push(piece);
    }

    fn push_comment(&mut self, comment: String) {
        self.pieces.push(Piece::Comment(comment));
    }

    /// Text since the last line break, if the buffer holds only text.
    fn at_line_start(&self) -> bool {
        let mut text = String::new();
        for piece in &self.pieces {
            match piece {
                Piece::Text(t) => text.push_str(t),
                Piece::Expr(_) => return false,
                Piece::Comment(_) => text.clear(),
            }
        }
        text.rsplit('\n').next().unwrap_or("").trim().is_empty()
    }

    fn take(&mut self) -> (Vec<Piece>, Option<usize>) {
        (mem::take(&mut self.pieces), self.start.take())
    }

    fn preview(&self) -> String {
        let mut out = String::new();
        for piece in &self.pieces {
            match piece {
                Piece::Text(text) => out.push_str(text),
                Piece::Expr(_) => out.push_str("${...}"),
                Piece::Comment(_) => {}
            }
        }
        out.trim().to_string()
    }

    /// Emit buffered whitespace and comments, which are all a blank buffer
    /// holds.
    fn emit_blank(&mut self, s: &mut Session<'_>) {
        let (pieces, _) = self.take();
        for piece in pieces {
            match piece {
                Piece::Text(text) => s.emitter.add(&text),
                Piece::Comment(comment) => s.emitter.add(&comment),
                Piece::Expr(_) => {}
            }
        }
    }
}

impl TextHost for StyleBuffer {
    fn flush(&mut self, s: &mut Session<'_>) -> Result<()> {
        if !self.is_blank() {
            let at = self.start.unwrap_or_else(|| s.scanner.position());
            return Err(unclosed_statement(self, at..s.scanner.position(), s.file_id()));
        }
        self.emit_blank(s);
        Ok(())
    }

    fn trim_end(&mut self) -> String {
        match self.pieces.last_mut() {
            Some(Piece::Text(text)) => {
                let kept = text.trim_end().len();
                text.split_off(kept)
            }
            _ => String::new(),
        }
    }

    fn push_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        if let Some(Piece::Text(last)) = self.pieces.last_mut() {
            last.push_str(text);
        } else {
            self.pieces.push(Piece::Text(text.to_string()));
        }
    }

    fn unescape(&mut self) {
        if let Some(Piece::Text(text)) = self.pieces.last_mut() {
            if text.ends_with('\\') {
                text.pop();
            }
        }
    }

    fn ends_with_escape(&self) -> bool {
        matches!(self.pieces.last(), Some(Piece::Text(text)) if text.ends_with('\\'))
    }
}

fn unclosed_statement(buffer: &StyleBuffer, span: Range<usize>, file_id: usize) -> CompileError {
    CompileError::malformed(
        format!("style statement `{}` is not closed", buffer.preview()),
        span,
        file_id,
    )
    .with_note("end declarations and statements with `;`")
}

// ---------------------------------------------------------------------------
// Mode
// ---------------------------------------------------------------------------

/// An open selector scope.
struct Block {
    var: String,
    /// The same scope in the compile-time sheet.
    style: Scope,
}

pub struct StylesheetMode {
    buffer: StyleBuffer,
    statements: StatementTracker,
    blocks: Vec<Block>,
    root: Block,
    sheet: Sheet,
    /// Nothing in the region needs runtime evaluation so far.
    folds: bool,
    reactive: bool,
    selector: Option<String>,
    scoped: bool,
    mark: usize,
    head: Option<SlotId>,
}

impl StylesheetMode {
    pub fn new(attributes: &RegionAttributes, s: &mut Session<'_>) -> Self {
        let mut sheet = Sheet::new();
        let style = sheet.scope(attributes.scope.as_deref());
        let root = Block {
            var: s.emitter.next_var_name(),
            style,
        };
        StylesheetMode {
            buffer: StyleBuffer::default(),
            statements: StatementTracker::new(s.scanner.position(), false),
            blocks: Vec::new(),
            root,
            sheet,
            folds: !attributes.scoped,
            reactive: false,
            selector: attributes.scope.clone(),
            scoped: attributes.scoped,
            mark: 0,
            head: None,
        }
    }

    fn current(&self) -> &Block {
        self.blocks.last().unwrap_or(&self.root)
    }

    fn push_expr(&mut self, s: &mut Session<'_>, marker: char, at: usize) -> Result<()> {
        if s.scanner.peek() != Some('{') {
            self.buffer.push_significant(Piece::Text(marker.to_string()), at);
            return Ok(());
        }
        if self.buffer.ends_with_escape() {
            self.buffer.unescape();
            self.buffer.push_significant(Piece::Text(marker.to_string()), at);
            return Ok(());
        }
        let expr = read_marker(s, marker, true)?;
        self.reactive |= expr.reactive;
        self.folds = false;
        self.buffer.push_significant(Piece::Expr(expr), at);
        Ok(())
    }

    fn skip_comment(&mut self, s: &mut Session<'_>, at: usize) -> Result<()> {
        if s.scanner.read_if('*') {
            if !s.scanner.rest().contains("*/") {
                return Err(s.scanner.error(
                    ErrorKind::MalformedConstruct,
                    "unterminated block comment",
                    at..at + 2,
                ));
            }
            let body = s.scanner.find_sequence("*/", true);
            self.buffer.push_comment(format!("/*{}*/", body));
        } else if s.scanner.peek() == Some('/') && self.buffer.at_line_start() {
            let line = s.scanner.find_sequence("\n", false);
            self.buffer.push_comment(format!("/{}", line));
        } else {
            self.buffer.push_significant(Piece::Text("/".to_string()), at);
        }
        Ok(())
    }

    /// `selector {` just read.
    fn open_block(&mut self, s: &mut Session<'_>, at: usize) -> Result<()> {
        let (pieces, start) = self.buffer.take();
        let (leading, pieces, comments) = split_statement(pieces);
        s.emitter.add(&leading);
        for comment in &comments {
            s.emitter.add(comment);
        }
        let start = start.unwrap_or(at);
        if pieces.is_empty() {
            return Err(s.scanner.error(ErrorKind::MalformedConstruct, "missing selector before `{`", at..at + 1));
        }
        let Some(selector) = join(&s.emitter, &pieces, false) else {
            return Err(s.scanner.error(ErrorKind::MalformedConstruct, "missing selector before `{`", at..at + 1));
        };
        let parent = self.current().style.clone();
        let style = match static_text(&pieces) {
            Some(text) if self.folds => self.sheet.select(&parent, &text),
            _ => parent,
        };
        let var = s.emitter.next_var_name();
        s.emitter.add(&format!(
            "{} {} = {}.select({});",
            s.emitter.declare(),
            var,
            self.current().var,
            selector
        ));
        self.blocks.push(Block { var, style });
        self.statements.push_block(self.blocks.len() - 1, start..at + 1);
        Ok(())
    }

    /// `;` just read, or a `}` ends the scope of a final statement.
    fn end_statement(&mut self, s: &mut Session<'_>, end: usize) -> Result<()> {
        let (pieces, start) = self.buffer.take();
        let (leading, pieces, comments) = split_statement(pieces);
        s.emitter.add(&leading);
        for comment in &comments {
            s.emitter.add(comment);
        }
        if pieces.is_empty() {
            return Ok(());
        }
        let span = start.unwrap_or(end)..end;
        let var = self.current().var.clone();

        if let [Piece::Expr(expr)] = pieces.as_slice() {
            if let Some(spread) = expr.source.trim_start().strip_prefix("...") {
                self.folds = false;
                s.emitter.add(&format!("{}.spread({});", var, spread.trim()));
                return Ok(());
            }
        }

        let text = static_text(&pieces);
        let first_text = match pieces.first() {
            Some(Piece::Text(text)) => text.as_str(),
            _ => "",
        };
        match split_declaration(&pieces) {
            Some((key, value)) if !first_text.starts_with('@') => {
                let key_source = join(&s.emitter, &key, false).unwrap_or_else(|| quote(""));
                let (value_source, folded) = self.declaration_value(s, &value, span)?;
                if let (true, Some(key), Some(value)) = (self.folds, static_text(&key), folded) {
                    let style = self.current().style.clone();
                    self.sheet.value(&style, &key, &value);
                }
                s.emitter.add(&format!("{}.value({}, {});", var, key_source, value_source));
            }
            _ => {
                let source = join(&s.emitter, &pieces, false).unwrap_or_else(|| quote(""));
                if let (true, Some(text)) = (self.folds, text) {
                    self.sheet.stat(&text);
                }
                s.emitter.add(&format!("{}.stat({});", var, source));
            }
        }
        Ok(())
    }

    /// Source of a declaration value, and its compile-time text when it
    /// has one.
    fn declaration_value(
        &mut self,
        s: &mut Session<'_>,
        value: &[Piece],
        span: Range<usize>,
    ) -> Result<(String, Option<String>)> {
        if let Some(calc) = arith::parse_value(value).filter(arith::needs_rewrite) {
            calc.check_units().map_err(|e| {
                CompileError::error(ErrorKind::UnitMismatch, e.to_string(), span.clone(), s.file_id())
            })?;
            let unwrap = s.emitter.value_name().to_string();
            let source = format!(
                "{}({})",
                s.emitter.feature("cu"),
                s.emitter.arrow(&unwrap, &calc.render(&unwrap))
            );
            let folded = calc
                .evaluate()
                .map_err(|e| CompileError::error(ErrorKind::UnitMismatch, e.to_string(), span, s.file_id()))?
                .map(|q| q.to_string());
            if folded.is_none() {
                self.folds = false;
            }
            return Ok((source, folded));
        }
        let source = join(&s.emitter, value, false).unwrap_or_else(|| quote(""));
        Ok((source, static_text(value)))
    }
}

/// Split leading whitespace and comments off a statement, and trim it.
fn split_statement(pieces: Vec<Piece>) -> (String, Vec<Piece>, Vec<String>) {
    let mut leading = String::new();
    let mut comments = Vec::new();
    let mut body = Vec::new();
    for piece in pieces {
        match piece {
            Piece::Comment(comment) => comments.push(comment),
            Piece::Text(text) if body.is_empty() => {
                let trimmed = text.trim_start();
                if comments.is_empty() {
                    leading.push_str(&text[..text.len() - trimmed.len()]);
                }
                if !trimmed.is_empty() {
                    body.push(Piece::Text(trimmed.to_string()));
                }
            }
            piece => body.push(piece),
        }
    }
    trim_pieces_end(&mut body);
    (leading, body, comments)
}

fn trim_pieces_end(pieces: &mut Vec<Piece>) {
    while let Some(Piece::Text(text)) = pieces.last_mut() {
        let kept = text.trim_end().len();
        text.truncate(kept);
        if !text.is_empty() {
            break;
        }
        pieces.pop();
    }
}

/// `key: value`, split at the first colon outside expressions.
fn split_declaration(pieces: &[Piece]) -> Option<(Vec<Piece>, Vec<Piece>)> {
    for (i, piece) in pieces.iter().enumerate() {
        let Piece::Text(text) = piece else { continue };
        let Some(colon) = text.find(':') else { continue };
        let mut key = pieces[..i].to_vec();
        let before = text[..colon].trim_end();
        if !before.is_empty() {
            key.push(Piece::Text(before.to_string()));
        }
        let mut value = Vec::new();
        let after = text[colon + 1..].trim_start();
        if !after.is_empty() {
            value.push(Piece::Text(after.to_string()));
        }
        value.extend_from_slice(&pieces[i + 1..]);
        if key.is_empty() {
            return None;
        }
        trim_pieces_end(&mut key);
        return Some((key, value));
    }
    None
}

/// The text of pieces without expressions.
fn static_text(pieces: &[Piece]) -> Option<String> {
    let mut out = String::new();
    for piece in pieces {
        match piece {
            Piece::Text(text) => out.push_str(text),
            Piece::Expr(_) => return None,
            Piece::Comment(_) => {}
        }
    }
    Some(out)
}

impl Mode for StylesheetMode {
    fn name(&self) -> &'static str {
        "ssb"
    }

    fn start(&mut self, s: &mut Session<'_>) -> Result<()> {
        self.mark = s.emitter.mark();
        let selector = match (&self.selector, self.scoped) {
            (Some(selector), _) => quote(selector),
            (None, true) => "true".to_string(),
            (None, false) => "null".to_string(),
        };
        s.emitter.add(&format!(
            "{}({}, {}, ",
            s.emitter.feature("cabs"),
            s.emitter.context(),
            selector
        ));
        self.head = Some(s.emitter.add_slot(""));
        Ok(())
    }

    fn parse(&mut self, s: &mut Session<'_>) -> Result<Step> {
        let mut extra = Vec::new();
        self.statements.extend_breakpoints(&mut extra);
        let found = BREAKPOINTS.find(s, &extra, false)?;
        self.buffer.push_text(&found.pre);
        if !found.pre.trim().is_empty() {
            let at = s.scanner.position() - found.pre.trim_start().len();
            self.buffer.start.get_or_insert(at);
        }
        let Some(c) = found.matched else {
            return Ok(Step::Eof);
        };
        let at = s.scanner.position();

        if c == '}' && !self.buffer.is_blank() && !self.buffer.ends_with_escape() {
            self.end_statement(s, at)?;
        }
        if self.statements.handles(c) {
            let recognized = self.statements.recognized();
            match self.statements.dispatch(s, &mut self.buffer, c)? {
                Some(Closed::Block(id)) => self.blocks.truncate(id),
                Some(Closed::Stray) => {
                    if s.options.warn_fallbacks {
                        s.warn(CompileError::warning(
                            "`}` closes nothing and is kept as text",
                            at..at + 1,
                            s.file_id(),
                        ));
                    }
                }
                _ => {}
            }
            if self.statements.recognized() != recognized {
                self.folds = false;
            } else if c != '}' && c != '\n' {
                self.buffer.start.get_or_insert(at);
            }
            return Ok(Step::Continue);
        }

        match c {
            '"' | '\'' => {
                let string = s.scanner.skip_string()?;
                self.buffer.push_significant(Piece::Text(string), at);
                return Ok(Step::Continue);
            }
            _ => {
                s.scanner.read();
            }
        }
        match c {
            '<' if tag_start(&s.scanner) == TagStart::Close => return Ok(Step::Close),
            '$' | '%' | '@' => self.push_expr(s, c, at)?,
            '/' => self.skip_comment(s, at)?,
            '{' => self.open_block(s, at)?,
            ';' => self.end_statement(s, at + 1)?,
            c => self.buffer.push_significant(Piece::Text(c.to_string()), at),
        }
        Ok(Step::Continue)
    }

    fn end(&mut self, s: &mut Session<'_>) -> Result<()> {
        if !self.buffer.is_blank() {
            let at = self.buffer.start.unwrap_or_else(|| s.scanner.position());
            return Err(unclosed_statement(&self.buffer, at..s.scanner.position(), s.file_id()));
        }
        self.buffer.emit_blank(s);
        self.reactive |= self.statements.finish(s)?;

        if self.folds {
            let css = self.sheet.to_css(s.options.style_format);
            let call = format!("{}({}, {});", s.emitter.feature("css"), s.emitter.context(), quote(&css));
            s.emitter.replace_since(self.mark, &call);
            return Ok(());
        }

        let dialect = s.emitter.dialect();
        let params = &self.root.var;
        let mut open = s.emitter.function_open(params);
        let mut close = s.emitter.function_close().to_string();
        if self.reactive {
            open = match dialect {
                Dialect::Modern => format!(
                    "{}({}, {} => {}",
                    s.emitter.feature("coff"),
                    s.emitter.context(),
                    s.emitter.tracker(),
                    open
                ),
                Dialect::Legacy => format!(
                    "{}({}, function({}){{return {}",
                    s.emitter.feature("coff"),
                    s.emitter.context(),
                    s.emitter.tracker(),
                    open
                ),
            };
            close = match dialect {
                Dialect::Modern => format!("{})", close),
                Dialect::Legacy => format!("{}}}.bind(this))", close),
            };
        }
        if let Some(head) = self.head {
            s.emitter.set(head, open);
        }
        s.emitter.add(&format!("{});", close));
        Ok(())
    }

    fn chain_after(&self, s: &Session<'_>) -> Option<String> {
        self.scoped
            .then(|| format!("{}({})", s.emitter.feature("scope"), s.emitter.context()))
    }

    fn used_attributes(&self) -> &'static [AttributeKey] {
        &[AttributeKey::Scope, AttributeKey::Scoped]
    }
}
