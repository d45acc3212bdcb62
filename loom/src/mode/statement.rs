//! Control flow written inside text regions.
//!
//! `if`/`else`, `for`, `while`, `switch` and `foreach` blocks found at the
//! start of a line are emitted as code around the text of their bodies.
//! Whether a block must become a reactive re-render wrapper is only known
//! once every branch has been read, so the parts of the output that depend
//! on it are slots, rewritten by [`StatementTracker::finish`] once the
//! region ends.

use std::ops::Range;

use crate::emitter::SlotId;
use crate::error::{ErrorKind, Result};
use crate::mode::code::rewrite_expression;
use crate::mode::{Expr, Session};
use crate::options::Dialect;
use crate::scanner::{ScanOptions, Scanner, is_identifier_char, is_identifier_start};

/// The buffering side of a mode that tracks statements.
pub trait TextHost {
    /// Commit buffered content to the output; a statement boundary follows.
    fn flush(&mut self, s: &mut Session<'_>) -> Result<()>;
    /// Remove and return the trailing whitespace of the buffered text.
    fn trim_end(&mut self) -> String;
    fn push_text(&mut self, text: &str);
    /// Drop a trailing backslash from the buffered text.
    fn unescape(&mut self);
    fn ends_with_escape(&self) -> bool;
}

// ---------------------------------------------------------------------------
// Data
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    If,
    ElseIf,
    Else,
    For,
    While,
    Switch,
    Foreach,
}

impl Keyword {
    pub fn text(self) -> &'static str {
        match self {
            Keyword::If => "if",
            Keyword::ElseIf => "else if",
            Keyword::Else => "else",
            Keyword::For => "for",
            Keyword::While => "while",
            Keyword::Switch => "switch",
            Keyword::Foreach => "foreach",
        }
    }

    fn continuable(self) -> bool {
        matches!(self, Keyword::If | Keyword::ElseIf)
    }
}

/// Keywords recognized at the start of a line, in match priority order.
const KEYWORDS: &[(&str, Form)] = &[
    ("const", Form::Declaration(&['=', ';', '\n'])),
    ("case", Form::Declaration(&[':'])),
    ("let", Form::Declaration(&['=', ';', '\n'])),
    ("var", Form::Declaration(&['=', ';', '\n'])),
    ("break", Form::Declaration(&[';', '\n'])),
    ("default", Form::Declaration(&[':'])),
    ("if", Form::Block(Keyword::If)),
    ("foreach", Form::Block(Keyword::Foreach)),
    ("for", Form::Block(Keyword::For)),
    ("while", Form::Block(Keyword::While)),
    ("switch", Form::Block(Keyword::Switch)),
];

pub const KEYWORD_INITIALS: &[char] = &['c', 'l', 'v', 'b', 'd', 'i', 'f', 'w', 's'];

#[derive(Debug, Clone, Copy)]
enum Form {
    /// Emitted verbatim up to one of the closing characters.
    Declaration(&'static [char]),
    Block(Keyword),
}

enum Head {
    Iterated(Expr),
    Range(Expr, Expr),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Iteration {
    Array,
    Object,
    Range,
}

/// One branch of a statement.
#[derive(Debug, Clone)]
pub struct Part {
    pub keyword: Keyword,
    /// Rewritten condition, absent for `else`.
    pub condition: Option<String>,
    pub reactive: bool,
    pub inline: bool,
    decl_start: SlotId,
    decl: SlotId,
    /// Callback parameter list of a `foreach`.
    params: Option<(SlotId, String)>,
    close: Option<SlotId>,
}

/// A tracked control-flow construct and its branches.
#[derive(Debug, Clone)]
pub struct Statement {
    pub keyword: Keyword,
    pub parts: Vec<Part>,
    pub reactive: bool,
    start: SlotId,
    context: String,
    /// Appended to the close of the last part.
    trailer: String,
    iteration: Option<Iteration>,
    /// Source of the iterated expression as written.
    unparsed: String,
    /// Rewritten iterated expression.
    source: String,
    pub span: Range<usize>,
}

#[derive(Debug)]
enum Open {
    Statement(Statement),
    /// A block owned by the host mode (a stylesheet selector).
    Block(usize, Range<usize>),
}

/// What a closing brace closed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Closed {
    Statement,
    Block(usize),
    /// Nothing was open; the brace was kept as text.
    Stray,
}

// ---------------------------------------------------------------------------
// Tracker
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct StatementTracker {
    open: Vec<Open>,
    closed: Vec<Statement>,
    /// Rewrite reactive statements at region end. When off, reactivity is
    /// only reported to the host.
    rewrite: bool,
    region_start: usize,
    /// Declarations and statements recognized so far.
    recognized: usize,
}

impl StatementTracker {
    pub fn new(region_start: usize, rewrite: bool) -> Self {
        StatementTracker {
            open: Vec::new(),
            closed: Vec::new(),
            rewrite,
            region_start,
            recognized: 0,
        }
    }

    /// Add the characters the tracker reacts to.
    pub fn extend_breakpoints(&self, breakpoints: &mut Vec<char>) {
        breakpoints.extend_from_slice(KEYWORD_INITIALS);
        breakpoints.push('}');
        if self.inline_open() {
            breakpoints.push('\n');
        }
    }

    pub fn handles(&self, c: char) -> bool {
        KEYWORD_INITIALS.contains(&c) || c == '}' || (c == '\n' && self.inline_open())
    }

    fn inline_open(&self) -> bool {
        matches!(
            self.open.last(),
            Some(Open::Statement(st)) if st.parts.last().is_some_and(|p| p.inline)
        )
    }

    pub fn recognized(&self) -> usize {
        self.recognized
    }

    pub fn push_block(&mut self, id: usize, span: Range<usize>) {
        self.open.push(Open::Block(id, span));
    }

    /// Dispatch a breakpoint accepted by [`StatementTracker::handles`]. The
    /// scanner is on the character. Returns what a `}` closed, if anything.
    pub fn dispatch(&mut self, s: &mut Session<'_>, host: &mut dyn TextHost, c: char) -> Result<Option<Closed>> {
        match c {
            '}' => {
                s.scanner.read();
                if host.ends_with_escape() {
                    host.unescape();
                    host.push_text("}");
                    Ok(None)
                } else if self.open.is_empty() {
                    host.push_text("}");
                    Ok(Some(Closed::Stray))
                } else {
                    self.close(s, host, false).map(Some)
                }
            }
            '\n' => {
                s.scanner.read();
                if self.inline_open() {
                    self.close(s, host, true)?;
                } else {
                    host.push_text("\n");
                }
                Ok(None)
            }
            _ => {
                if !self.try_keyword(s, host)? {
                    s.scanner.read();
                    host.push_text(&c.to_string());
                }
                Ok(None)
            }
        }
    }

    /// Whether only whitespace precedes `index` on its line (or since the
    /// region started).
    fn at_line_start(&self, scanner: &Scanner<'_>, index: usize) -> bool {
        let before = scanner.slice(self.region_start.min(index)..index);
        let line = before.rsplit('\n').next().unwrap_or("");
        line.chars().all(char::is_whitespace)
    }

    fn try_keyword(&mut self, s: &mut Session<'_>, host: &mut dyn TextHost) -> Result<bool> {
        let at = s.scanner.position();
        let Some(&(word, form)) = KEYWORDS.iter().find(|(word, _)| s.scanner.starts_with_word(word)) else {
            return Ok(false);
        };
        if at > 0 && host.ends_with_escape() && self.at_line_start(&s.scanner, at - 1) {
            host.unescape();
            s.scanner.read_sequence(word);
            host.push_text(word);
            return Ok(true);
        }
        if !self.at_line_start(&s.scanner, at) {
            return Ok(false);
        }
        match form {
            Form::Declaration(closing) => {
                self.recognized += 1;
                self.declaration(s, host, word, closing)?;
                Ok(true)
            }
            Form::Block(keyword) => {
                let after = s.scanner.rest()[word.len()..].trim_start();
                if !after.starts_with('(') {
                    return Ok(false);
                }
                self.recognized += 1;
                self.open_part(s, host, keyword, None)?;
                Ok(true)
            }
        }
    }

    fn declaration(&mut self, s: &mut Session<'_>, host: &mut dyn TextHost, word: &str, closing: &[char]) -> Result<()> {
        let trimmed = host.trim_end();
        host.flush(s)?;
        s.emitter.add(&trimmed);
        s.scanner.read_sequence(word);
        s.emitter.add(word);
        let found = s.scanner.find(closing, false, false)?;
        s.emitter.add(&found.pre);
        match found.matched {
            Some('=') => {
                s.scanner.read();
                s.emitter.add("=");
                let space = s.scanner.skip_inline_whitespace();
                s.emitter.add(&space);
                let start = s.scanner.position();
                let value = s.scanner.read_expression()?;
                let expr = rewrite_expression(s, &value, start, true)?;
                s.emitter.add(&expr.source);
                if s.scanner.read_if(';') {
                    s.emitter.add(";");
                }
            }
            Some(c) if c != '\n' => {
                s.scanner.read();
                s.emitter.add(&c.to_string());
            }
            _ => {}
        }
        Ok(())
    }

    /// Start a branch. `continued` is the statement a continuation keyword
    /// attaches to; `None` starts a new statement.
    fn open_part(
        &mut self,
        s: &mut Session<'_>,
        host: &mut dyn TextHost,
        keyword: Keyword,
        continued: Option<Statement>,
    ) -> Result<()> {
        let trimmed = host.trim_end();
        host.flush(s)?;
        s.emitter.add(&trimmed);

        let at = s.scanner.position();
        match keyword {
            Keyword::ElseIf => {
                s.scanner.read_sequence("else");
                s.scanner.skip_whitespace(true)?;
                s.scanner.read_sequence("if");
            }
            _ => {
                s.scanner.read_sequence(keyword.text());
            }
        }
        let span = at..s.scanner.position();

        let mut statement = match continued {
            Some(statement) => statement,
            None => Statement {
                keyword,
                parts: Vec::new(),
                reactive: false,
                start: s.emitter.add_slot(""),
                context: s.emitter.context(),
                trailer: String::new(),
                iteration: None,
                unparsed: String::new(),
                source: String::new(),
                span: span.clone(),
            },
        };

        let decl_start = s
            .emitter
            .add_pending_slot(span, format!("`{}` block is never closed", keyword.text()));
        let mut part = Part {
            keyword,
            condition: None,
            reactive: false,
            inline: false,
            decl_start,
            decl: decl_start,
            params: None,
            close: None,
        };

        if keyword == Keyword::Else {
            part.decl = s.emitter.add_slot("else");
        } else {
            let skipped = s.scanner.skip_whitespace(true)?;
            let start = s.scanner.position();
            let enclosed = s.scanner.skip_enclosed_content()?;
            let inner = &enclosed[1..enclosed.len() - 1];
            if keyword == Keyword::Foreach {
                self.foreach_head(s, &mut statement, &mut part, inner, start + 1)?;
            } else {
                let expr = rewrite_expression(s, inner, start + 1, true)?;
                part.reactive = expr.reactive;
                part.decl = s
                    .emitter
                    .add_slot(format!("{}{}({})", keyword.text(), skipped, expr.source));
                part.condition = Some(expr.source);
            }
        }
        statement.reactive |= part.reactive;

        let space = s.scanner.skip_whitespace(true)?;
        s.emitter.add(&space);
        part.inline = !s.scanner.read_if('{');
        s.emitter.add("{");
        statement.parts.push(part);
        self.open.push(Open::Statement(statement));
        Ok(())
    }

    /// Parse `from a to b`, `to b` or `expr [as [key:]binding]` and emit the
    /// iteration call head.
    fn foreach_head(
        &mut self,
        s: &mut Session<'_>,
        statement: &mut Statement,
        part: &mut Part,
        inner: &str,
        base: usize,
    ) -> Result<()> {
        let mut sub = Scanner::fragment(inner, base, s.file_id());
        sub.options = ScanOptions::CODE;
        sub.skip_whitespace(true)?;

        let head = if sub.starts_with_word("from") {
            sub.read_sequence("from");
            sub.skip_whitespace(true)?;
            let from = read_rewritten(s, &mut sub)?;
            sub.skip_whitespace(true)?;
            if !sub.starts_with_word("to") {
                let at = sub.position();
                return Err(sub.error(ErrorKind::UnknownToken, "expected `to` in range", at..at + 1));
            }
            sub.read_sequence("to");
            sub.skip_whitespace(true)?;
            let to = read_rewritten(s, &mut sub)?;
            Head::Range(from, to)
        } else if sub.starts_with_word("to") {
            sub.read_sequence("to");
            sub.skip_whitespace(true)?;
            let to = read_rewritten(s, &mut sub)?;
            Head::Range(Expr::plain("0"), to)
        } else {
            let start = sub.position();
            let unparsed = sub.read_expression()?;
            let expr = rewrite_expression(s, &unparsed, start, true)?;
            statement.unparsed = unparsed;
            Head::Iterated(expr)
        };

        sub.skip_whitespace(true)?;
        let mut binding = String::new();
        if sub.starts_with_word("as") {
            sub.read_sequence("as");
            binding = sub.rest().trim().to_string();
        } else if !sub.eof() {
            let at = sub.position();
            return Err(sub.error(
                ErrorKind::UnknownToken,
                format!("unexpected `{}` in foreach", sub.rest().trim()),
                at..base + inner.len(),
            ));
        }

        let dialect = s.emitter.dialect();
        statement.trailer = match dialect {
            Dialect::Modern => ");".to_string(),
            Dialect::Legacy => ".bind(this));".to_string(),
        };
        let (head, params, iteration) = match head {
            Head::Iterated(expr) => {
                part.reactive = expr.reactive;
                statement.source = expr.source.clone();
                match object_binding(&binding) {
                    Some((key, value)) => (
                        format!("{}({}, ", s.emitter.feature("forEachObject"), expr.source),
                        format!("{}, {}", value, key),
                        Iteration::Object,
                    ),
                    None => (
                        format!("{}({}, ", s.emitter.feature("forEachArray"), expr.source),
                        binding,
                        Iteration::Array,
                    ),
                }
            }
            Head::Range(from, to) => {
                part.reactive = from.reactive || to.reactive;
                (
                    format!("{}({}, {}, ", s.emitter.feature("range"), from.source, to.source),
                    binding,
                    Iteration::Range,
                )
            }
        };
        part.decl = s.emitter.add_slot(head);
        let params_slot = s.emitter.add_slot(callback_head(dialect, &params));
        part.params = Some((params_slot, params));
        statement.iteration = Some(iteration);
        Ok(())
    }

    /// Close the innermost open block at a `}` (or a line break for inline
    /// bodies).
    fn close(&mut self, s: &mut Session<'_>, host: &mut dyn TextHost, inline: bool) -> Result<Closed> {
        let trimmed = host.trim_end();
        host.flush(s)?;
        s.emitter.add(&trimmed);
        let mut statement = match self.open.pop() {
            Some(Open::Statement(statement)) => statement,
            Some(Open::Block(id, _)) => return Ok(Closed::Block(id)),
            None => return Ok(Closed::Stray),
        };
        let Some(part) = statement.parts.last_mut() else {
            return Ok(Closed::Statement);
        };
        s.emitter.set(part.decl_start, "");
        let close = format!("}}{}", statement.trailer);
        part.close = Some(s.emitter.add_slot(close));
        let continuable = part.keyword.continuable();
        if inline {
            host.push_text("\n");
        }

        if continuable {
            let rest = s.scanner.rest().trim_start();
            if starts_with_word(rest, "else") {
                let after = rest["else".len()..].trim_start();
                let keyword = if starts_with_word(after, "if") && after["if".len()..].trim_start().starts_with('(') {
                    Keyword::ElseIf
                } else {
                    Keyword::Else
                };
                let leading = s.scanner.skip_whitespace(false)?;
                host.push_text(&leading);
                self.open_part(s, host, keyword, Some(statement))?;
                return Ok(Closed::Statement);
            }
        }
        self.closed.push(statement);
        Ok(Closed::Statement)
    }

    /// Region end: report unclosed host blocks, then rewrite reactive
    /// statements in close order. Returns whether any closed statement was
    /// reactive.
    pub fn finish(&mut self, s: &mut Session<'_>) -> Result<bool> {
        for open in &self.open {
            if let Open::Block(_, span) = open {
                return Err(crate::error::CompileError::malformed(
                    "block is never closed",
                    span.clone(),
                    s.file_id(),
                ));
            }
        }
        let closed = std::mem::take(&mut self.closed);
        let reactive = closed.iter().any(|st| st.reactive);
        if self.rewrite {
            for statement in closed.iter().filter(|st| st.reactive) {
                rewrite(s, statement);
            }
        }
        Ok(reactive)
    }
}

fn read_rewritten(s: &mut Session<'_>, sub: &mut Scanner<'_>) -> Result<Expr> {
    let start = sub.position();
    let text = sub.read_expression()?;
    rewrite_expression(s, &text, start, true)
}

fn starts_with_word(text: &str, word: &str) -> bool {
    text.starts_with(word) && !text[word.len()..].starts_with(is_identifier_char)
}

/// `key: value` bindings select object iteration. A destructuring pattern
/// on the left is not a key.
fn object_binding(binding: &str) -> Option<(String, String)> {
    let (key, value) = binding.split_once(':')?;
    let key = key.trim();
    if key.is_empty() || key.contains(['{', '[']) || !key.starts_with(is_identifier_start) {
        return None;
    }
    Some((key.to_string(), value.trim().to_string()))
}

fn callback_head(dialect: Dialect, params: &str) -> String {
    match dialect {
        Dialect::Modern => format!("({}) =>", params),
        Dialect::Legacy => format!("function({})", params),
    }
}

// ---------------------------------------------------------------------------
// Reactive rewrite
// ---------------------------------------------------------------------------

fn rewrite(s: &mut Session<'_>, statement: &Statement) {
    let emitter = &mut s.emitter;
    let context = &statement.context;
    let tracker = emitter.tracker().to_string();
    let dialect = emitter.dialect();
    let Some(last_close) = statement.parts.last().and_then(|p| p.close) else {
        return;
    };

    match (&statement.keyword, &statement.iteration) {
        (Keyword::If, _) => {
            let mut conditions = String::new();
            for (i, part) in statement.parts.iter().enumerate() {
                match &part.condition {
                    Some(condition) => conditions.push_str(&format!("{} ? {} : ", condition, i)),
                    None => conditions.push_str(&i.to_string()),
                }
                let arm = match dialect {
                    Dialect::Modern => format!(", {} =>", context),
                    Dialect::Legacy => format!(", function({})", context),
                };
                emitter.set(part.decl_start, arm);
                emitter.set(part.decl, "");
                if let (Dialect::Legacy, Some(close)) = (dialect, part.close) {
                    emitter.set(close, "}.bind(this)");
                }
            }
            if statement.parts.last().is_some_and(|p| p.keyword != Keyword::Else) {
                conditions.push_str("-1");
            }
            let selector = emitter.arrow(&tracker, &conditions);
            emitter.set(
                statement.start,
                format!("{}({}, {}", emitter.feature("bindFlowIfElse"), context, selector),
            );
            emitter.append(last_close, ");");
        }
        (Keyword::Foreach, Some(iteration @ (Iteration::Array | Iteration::Object))) => {
            let part = &statement.parts[0];
            let source = match bare_read(&statement.unparsed) {
                Some(name) => name.to_string(),
                None => crate::mode::chain::wrap_reactive(emitter, &statement.source),
            };
            let feature = if *iteration == Iteration::Object {
                "bindFlowEachObject"
            } else {
                "bindFlowEach"
            };
            emitter.set(
                part.decl,
                format!("{}({}, {}, ", emitter.feature(feature), context, source),
            );
            if let Some((slot, params)) = &part.params {
                let params = if params.is_empty() {
                    context.clone()
                } else {
                    format!("{}, {}", context, params)
                };
                emitter.set(*slot, callback_head(dialect, &params));
            }
        }
        _ => {
            let (open, close) = match dialect {
                Dialect::Modern => (format!("{} => {} => {{", tracker, context), "});"),
                Dialect::Legacy => (
                    format!("function({}){{return function({}){{", tracker, context),
                    "}.bind(this)}.bind(this));",
                ),
            };
            emitter.prepend(
                statement.start,
                &format!("{}({}, {}", emitter.feature("bindFlow"), context, open),
            );
            emitter.append(last_close, close);
        }
    }
}

/// `*name` or `*a.b`: the iterated expression is the reactive value itself.
fn bare_read(unparsed: &str) -> Option<&str> {
    let name = unparsed.trim().strip_prefix('*')?;
    let valid = name.starts_with(is_identifier_start)
        && name.chars().all(|c| is_identifier_char(c) || c == '.')
        && !name.ends_with('.');
    valid.then_some(name)
}
