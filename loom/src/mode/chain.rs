use std::mem;

use crate::attributes::RegionAttributes;
use crate::emitter::Emitter;
use crate::error::Result;
use crate::mode::code::rewrite_expression;
use crate::mode::statement::TextHost;
use crate::mode::{Expr, Session};
use crate::options::Dialect;

/// An uncommitted piece of region content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Piece {
    Text(String),
    Expr(Expr),
    /// Source comment carried through to the output.
    Comment(String),
}

/// A committed chain entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Link {
    /// Emitted verbatim, outside the grouped call.
    Whitespace(String),
    /// `[<kind>, <source>]` inside the grouped call.
    Grouped { kind: &'static str, source: String },
}

/// Buffers text and expressions of a region and flushes them as one
/// grouped runtime call.
#[derive(Debug, Default)]
pub struct ChainBuilder {
    current: Vec<Piece>,
    chain: Vec<Link>,
    trimmed: bool,
    decode_entities: bool,
}

impl ChainBuilder {
    pub fn new(attributes: &RegionAttributes, decode_entities: bool) -> Self {
        ChainBuilder {
            current: Vec::new(),
            chain: Vec::new(),
            trimmed: attributes.trimmed,
            decode_entities,
        }
    }

    pub fn push_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        if let Some(Piece::Text(last)) = self.current.last_mut() {
            last.push_str(text);
        } else {
            self.current.push(Piece::Text(text.to_string()));
        }
    }

    pub fn push_expr(&mut self, expr: Expr) {
        self.current.push(Piece::Expr(expr));
    }

    /// Commit the current pieces, then append a grouped entry after them.
    pub fn push_link(&mut self, s: &Session<'_>, link: Link) {
        self.add_current(s);
        self.chain.push(link);
    }

    pub fn ends_with(&self, c: char) -> bool {
        matches!(self.current.last(), Some(Piece::Text(text)) if text.ends_with(c))
    }

    pub fn add_current(&mut self, s: &Session<'_>) {
        let pieces = mem::take(&mut self.current);
        if let [Piece::Text(text)] = pieces.as_slice() {
            if self.trimmed && text.trim().is_empty() {
                self.chain.push(Link::Whitespace(text.clone()));
                return;
            }
        }
        if let Some(source) = joined_value(&s.emitter, &pieces, self.decode_entities) {
            self.chain.push(Link::Grouped { kind: "text", source });
        }
    }

    pub fn end_chain(&mut self, s: &mut Session<'_>) {
        self.add_current(s);
        let links = mem::take(&mut self.chain);
        emit_links(s, links);
    }

    /// Take the current pieces as one joined value, without emitting.
    pub fn take_value(&mut self, s: &Session<'_>) -> Option<String> {
        let pieces = mem::take(&mut self.current);
        joined_value(&s.emitter, &pieces, self.decode_entities)
    }
}

impl TextHost for ChainBuilder {
    fn flush(&mut self, s: &mut Session<'_>) -> Result<()> {
        self.end_chain(s);
        Ok(())
    }

    fn trim_end(&mut self) -> String {
        match self.current.last_mut() {
            Some(Piece::Text(text)) => {
                let kept = text.trim_end().len();
                text.split_off(kept)
            }
            _ => String::new(),
        }
    }

    fn push_text(&mut self, text: &str) {
        ChainBuilder::push_text(self, text);
    }

    fn unescape(&mut self) {
        if let Some(Piece::Text(text)) = self.current.last_mut() {
            if text.ends_with('\\') {
                text.pop();
            }
        }
    }

    fn ends_with_escape(&self) -> bool {
        self.ends_with('\\')
    }
}

/// Emit committed links: leading and trailing whitespace verbatim around
/// one grouped call.
pub fn emit_links(s: &mut Session<'_>, links: Vec<Link>) {
    let first = links.iter().position(|l| matches!(l, Link::Grouped { .. }));
    let last = links.iter().rposition(|l| matches!(l, Link::Grouped { .. }));
    let (Some(first), Some(last)) = (first, last) else {
        for link in &links {
            if let Link::Whitespace(space) = link {
                s.emitter.add(space);
            }
        }
        return;
    };
    let mut call = format!("{}({}", s.emitter.feature("chain"), s.emitter.context());
    for (i, link) in links.iter().enumerate() {
        match link {
            Link::Whitespace(space) if i < first => s.emitter.add(space),
            Link::Whitespace(space) if i < last => call.push_str(space),
            Link::Whitespace(_) => {}
            Link::Grouped { kind, source } => {
                call.push_str(&format!(", [{}, {}]", s.emitter.chain_feature(kind), source));
            }
        }
    }
    call.push_str(");");
    s.emitter.add(&call);
    for link in &links[last + 1..] {
        if let Link::Whitespace(space) = link {
            s.emitter.add(space);
        }
    }
}

/// Join pieces into one string expression, wrapped in `coff` when an
/// expression among them is reactive. `None` when nothing remains.
pub fn joined_value(emitter: &Emitter, pieces: &[Piece], decode_entities: bool) -> Option<String> {
    let joined = join(emitter, pieces, decode_entities)?;
    let reactive = pieces.iter().any(|p| matches!(p, Piece::Expr(e) if e.reactive));
    Some(if reactive { wrap_reactive(emitter, &joined) } else { joined })
}

/// Join pieces into one string expression.
pub fn join(emitter: &Emitter, pieces: &[Piece], decode_entities: bool) -> Option<String> {
    let pieces: Vec<&Piece> = pieces
        .iter()
        .filter(|p| match p {
            Piece::Text(text) => !text.is_empty(),
            Piece::Expr(_) => true,
            Piece::Comment(_) => false,
        })
        .collect();
    if pieces.is_empty() {
        return None;
    }
    let decode = |text: &str| {
        if decode_entities {
            html_escape::decode_html_entities(text).into_owned()
        } else {
            text.to_string()
        }
    };
    let joined = match emitter.dialect() {
        Dialect::Modern => {
            let mut out = String::from("`");
            for piece in &pieces {
                match piece {
                    Piece::Text(text) => out.push_str(&escape_template(&decode(text))),
                    Piece::Expr(expr) => out.push_str(&format!("${{{}}}", expr.source)),
                    Piece::Comment(_) => {}
                }
            }
            out.push('`');
            out
        }
        Dialect::Legacy => {
            let mut parts = vec!["\"\"".to_string()];
            for piece in &pieces {
                match piece {
                    Piece::Text(text) => parts.push(quote(&decode(text))),
                    Piece::Expr(expr) => parts.push(format!("({})", expr.source)),
                    Piece::Comment(_) => {}
                }
            }
            parts.join(" + ")
        }
    };
    Some(joined)
}

/// `coff(context, tracker => source)`.
pub fn wrap_reactive(emitter: &Emitter, source: &str) -> String {
    format!(
        "{}({}, {})",
        emitter.feature("coff"),
        emitter.context(),
        emitter.arrow(emitter.tracker(), source)
    )
}

pub fn escape_template(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '`' | '$' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// A double-quoted string literal.
pub fn quote(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for c in text.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            c if c.is_control() => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Handle a text marker (`$`, `#`, `%`, `@`) just consumed by the scanner.
/// `${e}` inserts an expression, `#{e}` raw markup, `%{e}` a stringified
/// value and `@{e}` a quoted one. A preceding backslash keeps the marker
/// as text.
pub fn text_marker(s: &mut Session<'_>, chain: &mut ChainBuilder, marker: char, tracked: bool) -> Result<()> {
    if s.scanner.peek() != Some('{') {
        chain.push_text(&marker.to_string());
        return Ok(());
    }
    if chain.ends_with('\\') {
        TextHost::unescape(chain);
        chain.push_text(&marker.to_string());
        return Ok(());
    }
    let expr = read_marker(s, marker, tracked)?;
    if marker == '#' {
        let source = if expr.reactive {
            wrap_reactive(&s.emitter, &expr.source)
        } else {
            expr.source
        };
        chain.push_link(s, Link::Grouped { kind: "html", source });
    } else {
        chain.push_expr(expr);
    }
    Ok(())
}

/// Read the `{...}` of a marker at the cursor and rewrite its content.
pub fn read_marker(s: &mut Session<'_>, marker: char, tracked: bool) -> Result<Expr> {
    let start = s.scanner.position();
    let enclosed = s.scanner.skip_enclosed_content()?;
    let inner = &enclosed[1..enclosed.len() - 1];
    let expr = rewrite_expression(s, inner, start + 1, tracked)?;
    let wrapper = match marker {
        '%' => "stringify",
        '@' => "quote",
        _ => return Ok(expr),
    };
    Ok(Expr {
        source: format!("{}({})", s.emitter.feature(wrapper), expr.source),
        reactive: expr.reactive,
    })
}
