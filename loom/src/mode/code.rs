//! Inline code regions.
//!
//! Code passes through unchanged except for a few shorthands:
//!
//! - `$$context` is the render context and `$$on(...)` (and the other
//!   context helpers) receive it as their first argument;
//! - `&` before a function literal, a parenthesized expression or a
//!   variable makes it a computed value, optionally preceded by the `async`
//!   or `defer` modifiers;
//! - `*x` reads a reactive value through the subscription tracker (`*?x`
//!   tolerates non-reactive values, `obj.*prop` reads a member) and `^x`
//!   reads it without subscribing.
//!
//! Recently read code is kept in a lookback buffer and only committed to
//! the emitter at block boundaries, so modifiers and member objects that
//! precede a marker can still be rewritten.

use std::mem;

use crate::attributes::RegionAttributes;
use crate::error::{ErrorKind, Result};
use crate::mode::breakpoint::{Breakpoints, TagStart};
use crate::mode::{Expr, Mode, Session, Step};
use crate::scanner::{ScanOptions, Scanner, is_identifier_char, is_identifier_start};

const BREAKPOINTS: Breakpoints = Breakpoints::new(&['(', ')', '{', '}', '$', '&', '*', '^', '<']);

/// Keywords whose parenthesized head is followed by a block, not a
/// function body.
const CONTROL_KEYWORDS: &[&str] = &["if", "for", "while", "switch", "catch", "with"];

/// Runtime helpers callable as `$$name(...)` with the context prepended.
pub const CONTEXT_HELPERS: &[&str] = &["on", "subscribe", "depend", "rollback", "bind", "unbind", "bindInput"];

pub struct CodeMode {
    /// Reactive reads subscribe through the tracker.
    tracked: bool,
    /// Rescanning a fragment: `<` never starts a region.
    fragment: bool,
    lookback: String,
    depth: usize,
    reactive: bool,
}

impl CodeMode {
    pub fn new(_attributes: &RegionAttributes) -> Self {
        CodeMode {
            tracked: true,
            fragment: false,
            lookback: String::new(),
            depth: 0,
            reactive: false,
        }
    }

    fn fragment(tracked: bool) -> Self {
        CodeMode {
            tracked,
            fragment: true,
            lookback: String::new(),
            depth: 0,
            reactive: false,
        }
    }

    fn commit(&mut self, s: &mut Session<'_>) {
        let text = mem::take(&mut self.lookback);
        s.emitter.add(&text);
    }

    /// Parameters of the function whose body starts at the `{` just read,
    /// or `None` when the brace opens a plain block.
    fn function_params(&self, s: &Session<'_>) -> Option<String> {
        let brace = s.scanner.last_match();
        let before = s.scanner.slice(0..brace).trim_end();
        if before.ends_with("=>") {
            let head = before[..before.len() - 2].trim_end();
            if head.ends_with(')') {
                return s.scanner.last_closed().map(|frame| self.frame_params(s, frame.open, frame.close));
            }
            let start = head
                .rfind(|c: char| !is_identifier_char(c))
                .map(|i| i + 1)
                .unwrap_or(0);
            return Some(head[start..].to_string());
        }
        if !before.ends_with(')') {
            return None;
        }
        let frame = s.scanner.last_closed()?;
        if frame
            .keyword
            .as_deref()
            .is_some_and(|k| CONTROL_KEYWORDS.contains(&k))
        {
            return None;
        }
        Some(self.frame_params(s, frame.open, frame.close))
    }

    fn frame_params(&self, s: &Session<'_>, open: usize, close: Option<usize>) -> String {
        let close = close.unwrap_or(open + 1).saturating_sub(1);
        s.scanner.slice(open + 1..close).to_string()
    }

    fn call_shorthand(&mut self, s: &mut Session<'_>) {
        if !s.scanner.read_if('$') {
            self.lookback.push('$');
            return;
        }
        if s.scanner.starts_with_word("context") {
            s.scanner.read_sequence("context");
            self.lookback.push_str(&s.emitter.context());
            return;
        }
        for name in CONTEXT_HELPERS {
            if s.scanner.starts_with(&format!("{}(", name)) {
                s.scanner.read_sequence(name);
                s.scanner.read();
                s.scanner.push_paren_at(s.scanner.position() - 1);
                let separator = if s.scanner.peek_significant() == Some(')') { "" } else { ", " };
                self.lookback.push_str(&format!(
                    "{}({}{}",
                    s.emitter.feature(name),
                    s.emitter.context(),
                    separator
                ));
                return;
            }
        }
        self.lookback.push_str("$$");
    }

    /// Remove trailing `async`/`defer` words from the lookback.
    fn take_modifiers(&mut self) -> (bool, bool) {
        let (mut is_async, mut is_defer) = (false, false);
        loop {
            let trimmed = self.lookback.trim_end();
            let start = trimmed
                .rfind(|c: char| !is_identifier_char(c))
                .map(|i| i + trimmed[i..].chars().next().map_or(1, char::len_utf8))
                .unwrap_or(0);
            match &trimmed[start..] {
                "async" => is_async = true,
                "defer" => is_defer = true,
                _ => return (is_async, is_defer),
            }
            self.lookback.truncate(start);
        }
    }

    fn reactive_wrap(&mut self, s: &mut Session<'_>) -> Result<()> {
        let at = s.scanner.last_match();
        let modified = matches!(s.scanner.word_before(at), Some("async" | "defer"));
        if !(modified || s.scanner.expression_can_start_at(at)) || s.scanner.peek() == Some('&') {
            self.lookback.push('&');
            if s.scanner.read_if('&') {
                self.lookback.push('&');
            }
            return Ok(());
        }

        let space = s.scanner.skip_whitespace(true)?;
        let Some(next) = s.scanner.peek() else {
            self.lookback.push('&');
            self.lookback.push_str(&space);
            return Ok(());
        };
        let function = s.scanner.starts_with_word("function");
        if !(function || next == '(' || is_identifier_start(next)) {
            self.lookback.push('&');
            self.lookback.push_str(&space);
            return Ok(());
        }

        let (is_async, is_defer) = self.take_modifiers();
        let context = s.emitter.context();
        let tracker = s.emitter.tracker().to_string();
        let coff = s.emitter.feature(if is_defer { "cofd" } else { "coff" });
        let prefix = if is_async { "async " } else { "" };

        let wrapped = if function {
            s.scanner.read_sequence("function");
            let mut head = String::from("function");
            head.push_str(&s.scanner.skip_whitespace(true)?);
            if let Some(name) = s.scanner.read_identifier() {
                head.push_str(&name);
                head.push_str(&s.scanner.skip_whitespace(true)?);
            }
            let params = self.read_group(s, '(', "a parameter list")?;
            let space = s.scanner.skip_whitespace(true)?;
            let body_start = s.scanner.position();
            let body = self.read_group(s, '{', "a function body")?;
            let body = rewrite_expression(s, &body[1..body.len() - 1], body_start + 1, true)?;
            format!(
                "{}({}, {}{}({}){}{{{}}})",
                coff,
                context,
                prefix,
                head,
                with_tracker(&tracker, &params[1..params.len() - 1]),
                space,
                body.source
            )
        } else if next == '(' {
            let start = s.scanner.position();
            let group = s.scanner.skip_enclosed_content()?;
            let inner = &group[1..group.len() - 1];
            if s.scanner.rest().trim_start().starts_with("=>") {
                let before = s.scanner.skip_whitespace(true)?;
                s.scanner.read_sequence("=>");
                let after = s.scanner.skip_whitespace(true)?;
                let body_start = s.scanner.position();
                let body = if s.scanner.peek() == Some('{') {
                    let block = s.scanner.skip_enclosed_content()?;
                    let body = rewrite_expression(s, &block[1..block.len() - 1], body_start + 1, true)?;
                    format!("{{{}}}", body.source)
                } else {
                    let text = s.scanner.read_expression()?;
                    rewrite_expression(s, &text, body_start, true)?.source
                };
                format!(
                    "{}({}, {}({}){}=>{}{})",
                    coff,
                    context,
                    prefix,
                    with_tracker(&tracker, inner),
                    before,
                    after,
                    body
                )
            } else {
                let expr = rewrite_expression(s, inner, start + 1, true)?;
                let body = s.emitter.arrow(&tracker, &format!("({})", expr.source));
                format!("{}({}, {}{})", coff, context, prefix, body)
            }
        } else {
            let start = s.scanner.position();
            let name = s.scanner.read_single_expression(true)?;
            let expr = rewrite_expression(s, &name, start, false)?;
            format!("{}({}, {})", s.emitter.feature("cofv"), context, expr.source)
        };
        self.lookback.push_str(&wrapped);
        Ok(())
    }

    fn read_group(&mut self, s: &mut Session<'_>, open: char, what: &str) -> Result<String> {
        if s.scanner.peek() != Some(open) {
            let at = s.scanner.position();
            return Err(s.scanner.error(
                ErrorKind::UnknownToken,
                format!("expected {} after `&function`", what),
                at..at + 1,
            ));
        }
        s.scanner.skip_enclosed_content()
    }

    /// `*` (tracked) or `^` (untracked) just consumed.
    fn reactive_read(&mut self, s: &mut Session<'_>, tracked_marker: bool) -> Result<()> {
        let marker = if tracked_marker { '*' } else { '^' };
        let at = s.scanner.last_match();
        let spread = self.lookback.ends_with("...");
        let member = self.lookback.ends_with('.') && !spread;
        let prefix = spread || (!member && s.scanner.expression_can_start_at(at));
        let operand = match s.scanner.peek() {
            Some(c) => is_identifier_start(c) || c == '(' || c == '?' || (member && c == '['),
            None => false,
        };
        if !(member || prefix) || !operand {
            self.lookback.push(marker);
            if tracked_marker && s.scanner.read_if('*') {
                self.lookback.push('*');
            }
            return Ok(());
        }

        let safe = s.scanner.read_if('?');
        let name = if member {
            let start = self
                .lookback
                .rfind(|c: char| !(is_identifier_char(c) || c == '.'))
                .map(|i| i + self.lookback[i..].chars().next().map_or(1, char::len_utf8))
                .unwrap_or(0);
            let object = self.lookback.split_off(start);
            if s.scanner.peek() == Some('[') {
                let start = s.scanner.position();
                let subscript = s.scanner.skip_enclosed_content()?;
                let key = rewrite_expression(s, &subscript[1..subscript.len() - 1], start + 1, self.tracked)?;
                self.reactive |= key.reactive;
                format!("{}[{}]", object.trim_end_matches('.'), key.source)
            } else if let Some(property) = s.scanner.read_identifier() {
                format!("{}{}", object, property)
            } else {
                self.lookback.push_str(&object);
                self.lookback.push(marker);
                if safe {
                    self.lookback.push('?');
                }
                return Ok(());
            }
        } else if s.scanner.peek() == Some('(') {
            let start = s.scanner.position();
            let group = s.scanner.skip_enclosed_content()?;
            let inner = rewrite_expression(s, &group[1..group.len() - 1], start + 1, self.tracked)?;
            self.reactive |= inner.reactive;
            format!("({})", inner.source)
        } else if let Some(name) = s.scanner.read_identifier() {
            name
        } else {
            self.lookback.push(marker);
            if safe {
                self.lookback.push('?');
            }
            return Ok(());
        };

        let read = if tracked_marker && self.tracked {
            self.reactive = true;
            let tracker = s.emitter.tracker().to_string();
            let rest = s.scanner.rest();
            if rest.starts_with('.') && !rest.starts_with("..") {
                let start = s.scanner.position();
                let chain = s.scanner.read_single_expression(true)?;
                let value = s.emitter.value_name().to_string();
                let nested = rewrite_expression(
                    s,
                    &format!("{}{}", value, chain),
                    start.saturating_sub(value.len()),
                    true,
                )?;
                let callback = s
                    .emitter
                    .arrow(&format!("{}, {}", tracker, value), &nested.source);
                format!("{}.{}({}, {})", tracker, if safe { "d" } else { "c" }, name, callback)
            } else {
                format!("{}.{}({})", tracker, if safe { "b" } else { "a" }, name)
            }
        } else if safe {
            format!("{}({})", s.emitter.feature("value"), name)
        } else {
            format!("{}.value", name)
        };
        self.lookback.push_str(&read);
        Ok(())
    }
}

fn with_tracker(tracker: &str, params: &str) -> String {
    if params.trim().is_empty() {
        tracker.to_string()
    } else {
        format!("{}, {}", tracker, params)
    }
}

impl Mode for CodeMode {
    fn name(&self) -> &'static str {
        "code"
    }

    fn parse(&mut self, s: &mut Session<'_>) -> Result<Step> {
        let found = BREAKPOINTS.find(s, &[], true)?;
        self.lookback.push_str(&found.pre);
        let Some(c) = found.matched else {
            self.commit(s);
            return Ok(Step::Eof);
        };
        match c {
            '(' => {
                s.scanner.push_paren();
                self.lookback.push('(');
            }
            ')' => {
                s.scanner.pop_paren();
                self.lookback.push(')');
            }
            '{' => {
                let params = self.function_params(s);
                self.lookback.push('{');
                self.commit(s);
                self.depth += 1;
                match params {
                    Some(params) => s.emitter.start_function(&params),
                    None => s.emitter.start_scope(),
                }
            }
            '}' => {
                self.lookback.push('}');
                self.commit(s);
                if self.depth > 0 {
                    self.depth -= 1;
                    s.emitter.end_scope();
                }
            }
            '$' => self.call_shorthand(s),
            '&' => self.reactive_wrap(s)?,
            '*' => self.reactive_read(s, true)?,
            '^' => self.reactive_read(s, false)?,
            _ => {
                if !self.fragment {
                    match BREAKPOINTS.region_entry(s, true) {
                        TagStart::Open | TagStart::Comment => {
                            self.commit(s);
                            return Ok(Step::Child);
                        }
                        TagStart::Close => {
                            self.commit(s);
                            return Ok(Step::Close);
                        }
                        TagStart::None => {}
                    }
                }
                self.lookback.push('<');
            }
        }
        Ok(Step::Continue)
    }

    fn end(&mut self, s: &mut Session<'_>) -> Result<()> {
        self.commit(s);
        Ok(())
    }

    fn element_terminator(&self) -> &'static str {
        ""
    }
}

/// Rewrite a code fragment found inside another construct (a condition,
/// an initializer, an attribute value, a text marker). `base` is the
/// fragment's offset in the document. With `tracked` off, reactive reads
/// use the untracked form.
pub fn rewrite_expression(s: &mut Session<'_>, text: &str, base: usize, tracked: bool) -> Result<Expr> {
    let mut scanner = Scanner::fragment(text, base, s.file_id());
    scanner.options = ScanOptions::CODE;
    let mut sub = Session {
        scanner,
        emitter: s.emitter.fork(),
        options: s.options,
        warnings: Vec::new(),
    };
    let mut mode = CodeMode::fragment(tracked);
    while mode.parse(&mut sub)? != Step::Eof {}
    mode.end(&mut sub)?;
    s.emitter.join(&sub.emitter);
    s.warnings.append(&mut sub.warnings);
    Ok(Expr {
        source: sub.emitter.finish(),
        reactive: mode.reactive,
    })
}
