use std::ops::Range;

use crate::error::{CompileError, ErrorKind, Result};

/// Constructs the scanner skips as a unit while searching for breakpoints.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanOptions {
    /// `//` and `/* */` comments.
    pub comments: bool,
    /// Quoted strings and template literals.
    pub strings: bool,
    /// Regular expression literals (only where an expression can start).
    pub regex: bool,
    /// The region holds source code rather than text.
    pub code: bool,
}

impl ScanOptions {
    pub const TEXT: ScanOptions = ScanOptions {
        comments: false,
        strings: false,
        regex: false,
        code: false,
    };

    pub const CODE: ScanOptions = ScanOptions {
        comments: true,
        strings: true,
        regex: true,
        code: true,
    };
}

/// A balanced pair of parentheses seen while scanning code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParenFrame {
    /// Absolute offset of `(`.
    pub open: usize,
    /// Absolute offset just past `)`, once closed.
    pub close: Option<usize>,
    /// Identifier immediately preceding `(`, if any (`if`, `function`, a callee).
    pub keyword: Option<String>,
}

/// Result of [`Scanner::find`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Found {
    pub pre: String,
    pub matched: Option<char>,
}

/// Words after which an expression (and so a new region or a marker) may start.
const EXPRESSION_KEYWORDS: &[&str] = &[
    "return", "typeof", "instanceof", "in", "of", "new", "delete", "void", "throw", "case", "do",
    "else", "await", "yield",
];

/// Words that behave as operators inside an expression.
const OPERATOR_WORDS: &[&str] = &[
    "in", "instanceof", "typeof", "new", "delete", "void", "await", "yield", "function", "async",
];

pub fn is_identifier_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

pub fn is_identifier_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

/// Forward-only cursor over a document, or over a fragment of it being
/// rescanned (`base` maps fragment offsets back to document offsets).
pub struct Scanner<'a> {
    input: &'a str,
    pos: usize,
    base: usize,
    file_id: usize,
    pub options: ScanOptions,
    last_match: usize,
    parens: Vec<ParenFrame>,
    last_closed: Option<ParenFrame>,
}

impl<'a> Scanner<'a> {
    pub fn new(input: &'a str, file_id: usize) -> Self {
        Scanner::fragment(input, 0, file_id)
    }

    pub fn fragment(input: &'a str, base: usize, file_id: usize) -> Self {
        Scanner {
            input,
            pos: 0,
            base,
            file_id,
            options: ScanOptions::CODE,
            last_match: 0,
            parens: Vec::new(),
            last_closed: None,
        }
    }

    pub fn file_id(&self) -> usize {
        self.file_id
    }

    /// Absolute offset of the cursor.
    pub fn position(&self) -> usize {
        self.base + self.pos
    }

    /// Absolute offset of the breakpoint matched by the last [`Scanner::find`].
    pub fn last_match(&self) -> usize {
        self.base + self.last_match
    }

    pub fn error(&self, kind: ErrorKind, message: impl Into<String>, span: Range<usize>) -> CompileError {
        CompileError::error(kind, message, span, self.file_id)
    }

    pub fn eof(&self) -> bool {
        self.pos >= self.input.len()
    }

    pub fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    pub fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    pub fn read(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    pub fn read_if(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.pos += expected.len_utf8();
            true
        } else {
            false
        }
    }

    pub fn starts_with(&self, text: &str) -> bool {
        self.rest().starts_with(text)
    }

    /// `word` at the cursor, not followed by an identifier character.
    pub fn starts_with_word(&self, word: &str) -> bool {
        self.starts_with(word) && !self.rest()[word.len()..].starts_with(is_identifier_char)
    }

    pub fn read_sequence(&mut self, text: &str) -> bool {
        if self.starts_with(text) {
            self.pos += text.len();
            true
        } else {
            false
        }
    }

    pub fn expect_sequence(&mut self, text: &str) -> Result<()> {
        if self.read_sequence(text) {
            Ok(())
        } else {
            let at = self.position();
            Err(self.error(
                ErrorKind::UnknownToken,
                format!("expected `{}`", text),
                at..at + self.peek().map_or(0, char::len_utf8),
            ))
        }
    }

    /// Next non-whitespace character, without consuming anything.
    pub fn peek_significant(&self) -> Option<char> {
        self.rest().chars().find(|c| !c.is_whitespace())
    }

    /// Scan up to the next character in `breakpoints`, skipping strings,
    /// comments and regex literals as whole units according to the active
    /// options. Breakpoints take precedence over those constructs.
    pub fn find(&mut self, breakpoints: &[char], include_match_in_pre: bool, consume: bool) -> Result<Found> {
        let mut pre = String::new();
        loop {
            let Some(c) = self.peek() else {
                return Ok(Found { pre, matched: None });
            };
            if breakpoints.contains(&c) {
                self.last_match = self.pos;
                if consume {
                    self.pos += c.len_utf8();
                }
                if include_match_in_pre {
                    pre.push(c);
                }
                return Ok(Found {
                    pre,
                    matched: Some(c),
                });
            }
            if self.options.strings && matches!(c, '"' | '\'' | '`') {
                pre.push_str(&self.skip_string()?);
                continue;
            }
            if self.options.comments && c == '/' {
                if let Some(comment) = self.skip_comment()? {
                    pre.push_str(&comment);
                    continue;
                }
            }
            if self.options.regex && c == '/' && self.expression_can_start_at(self.position()) {
                if let Some(regex) = self.skip_regex() {
                    pre.push_str(&regex);
                    continue;
                }
            }
            pre.push(c);
            self.pos += c.len_utf8();
        }
    }

    /// Read up to (not including) `terminator`, or to the end of input.
    pub fn find_sequence(&mut self, terminator: &str, consume: bool) -> String {
        match self.rest().find(terminator) {
            Some(index) => {
                let text = self.rest()[..index].to_string();
                self.pos += index;
                if consume {
                    self.pos += terminator.len();
                }
                text
            }
            None => {
                let text = self.rest().to_string();
                self.pos = self.input.len();
                text
            }
        }
    }

    /// Skip whitespace and, when `comments` is set, comments. Returns the
    /// skipped text so it can be preserved.
    pub fn skip_whitespace(&mut self, comments: bool) -> Result<String> {
        let mut skipped = String::new();
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    skipped.push(c);
                    self.pos += c.len_utf8();
                }
                Some('/') if comments => match self.skip_comment()? {
                    Some(comment) => skipped.push_str(&comment),
                    None => return Ok(skipped),
                },
                _ => return Ok(skipped),
            }
        }
    }

    /// Skip horizontal whitespace only.
    pub fn skip_inline_whitespace(&mut self) -> String {
        let len = self
            .rest()
            .find(|c: char| c != ' ' && c != '\t')
            .unwrap_or(self.rest().len());
        let skipped = self.rest()[..len].to_string();
        self.pos += len;
        skipped
    }

    fn skip_comment(&mut self) -> Result<Option<String>> {
        if self.starts_with("//") {
            let len = self.rest().find('\n').unwrap_or(self.rest().len());
            let comment = self.rest()[..len].to_string();
            self.pos += len;
            Ok(Some(comment))
        } else if self.starts_with("/*") {
            let start = self.position();
            match self.rest()[2..].find("*/") {
                Some(index) => {
                    let comment = self.rest()[..index + 4].to_string();
                    self.pos += index + 4;
                    Ok(Some(comment))
                }
                None => Err(self.error(
                    ErrorKind::MalformedConstruct,
                    "unterminated block comment",
                    start..start + 2,
                )),
            }
        } else {
            Ok(None)
        }
    }

    /// Skip a regex literal starting at `/`. Returns `None` (consuming
    /// nothing) when the line ends before the closing slash.
    fn skip_regex(&mut self) -> Option<String> {
        let rest = self.rest();
        let mut chars = rest.char_indices().skip(1);
        let mut in_class = false;
        while let Some((index, c)) = chars.next() {
            match c {
                '\n' => return None,
                '\\' => {
                    chars.next();
                }
                '[' => in_class = true,
                ']' => in_class = false,
                '/' if !in_class => {
                    let mut end = index + 1;
                    end += rest[end..]
                        .find(|c: char| !c.is_ascii_alphabetic())
                        .unwrap_or(rest.len() - end);
                    let regex = rest[..end].to_string();
                    self.pos += end;
                    return Some(regex);
                }
                _ => {}
            }
        }
        None
    }

    /// Read a quoted string (or template literal) at the cursor, quotes included.
    pub fn skip_string(&mut self) -> Result<String> {
        let start = self.pos;
        let Some(quote) = self.read() else {
            return Ok(String::new());
        };
        loop {
            match self.read() {
                None => {
                    let at = self.base + start;
                    return Err(self.error(
                        ErrorKind::MalformedConstruct,
                        "unterminated string literal",
                        at..at + 1,
                    ));
                }
                Some('\\') => {
                    self.read();
                }
                Some('\n') if quote != '`' => {
                    let at = self.base + start;
                    return Err(self.error(
                        ErrorKind::MalformedConstruct,
                        "unterminated string literal",
                        at..self.position(),
                    ));
                }
                Some('$') if quote == '`' && self.peek() == Some('{') => {
                    self.skip_enclosed_content()?;
                }
                Some(c) if c == quote => break,
                Some(_) => {}
            }
        }
        Ok(self.input[start..self.pos].to_string())
    }

    /// Read a balanced bracketed run at the cursor, brackets included.
    /// Strings and comments inside are skipped whole.
    pub fn skip_enclosed_content(&mut self) -> Result<String> {
        let start = self.pos;
        let mut stack: Vec<char> = Vec::new();
        loop {
            let Some(c) = self.peek() else {
                let at = self.base + start;
                return Err(self.error(
                    ErrorKind::MalformedConstruct,
                    format!("unclosed `{}`", stack.first().copied().unwrap_or('(')),
                    at..at + 1,
                ));
            };
            match c {
                '(' | '[' | '{' => {
                    stack.push(c);
                    self.pos += 1;
                }
                ')' | ']' | '}' => {
                    let open = match c {
                        ')' => '(',
                        ']' => '[',
                        _ => '{',
                    };
                    if stack.pop() != Some(open) {
                        let at = self.position();
                        return Err(self.error(
                            ErrorKind::MalformedConstruct,
                            format!("unexpected `{}`", c),
                            at..at + 1,
                        ));
                    }
                    self.pos += 1;
                }
                '"' | '\'' | '`' => {
                    self.skip_string()?;
                }
                '/' => {
                    if self.skip_comment()?.is_none() {
                        self.pos += 1;
                    }
                }
                _ => self.pos += c.len_utf8(),
            }
            if stack.is_empty() {
                return Ok(self.input[start..self.pos].to_string());
            }
        }
    }

    pub fn read_identifier(&mut self) -> Option<String> {
        let rest = self.rest();
        if !rest.starts_with(is_identifier_start) {
            return None;
        }
        let len = rest.find(|c: char| !is_identifier_char(c)).unwrap_or(rest.len());
        self.pos += len;
        Some(rest[..len].to_string())
    }

    /// Read one operand: an identifier, literal or bracketed group, followed
    /// (when `allow_chain`) by member accesses, subscripts and calls.
    pub fn read_single_expression(&mut self, allow_chain: bool) -> Result<String> {
        let start = self.pos;
        match self.peek() {
            Some('(' | '[' | '{') => {
                self.skip_enclosed_content()?;
            }
            Some('"' | '\'' | '`') => {
                self.skip_string()?;
            }
            Some(c) if is_identifier_char(c) || c == '.' => {
                let len = self
                    .rest()
                    .find(|c: char| !is_identifier_char(c) && c != '.')
                    .unwrap_or(self.rest().len());
                self.pos += len;
            }
            _ => {}
        }
        if allow_chain {
            loop {
                if self.starts_with("?.") || self.peek() == Some('.') {
                    self.read_sequence("?");
                    self.read();
                    if self.read_identifier().is_none() && self.peek() == Some('[') {
                        self.skip_enclosed_content()?;
                    }
                } else if matches!(self.peek(), Some('[' | '(')) {
                    self.skip_enclosed_content()?;
                } else {
                    break;
                }
            }
        }
        Ok(self.input[start..self.pos].to_string())
    }

    /// Read an expression up to a top-level `;`, `,`, unmatched closing
    /// bracket, a line break after a complete operand, or an operand
    /// juxtaposed with the previous one (`from 0 to 10` stops before `to`).
    /// Returns the expression text, trimmed.
    pub fn read_expression(&mut self) -> Result<String> {
        let start = self.pos;
        let mut end = self.pos;
        let mut after_operand = false;
        loop {
            let ws_start = self.pos;
            let whitespace = self.skip_whitespace(true)?;
            let Some(c) = self.peek() else { break };
            if after_operand && whitespace.contains('\n') && !matches!(c, '.' | '?') {
                self.pos = ws_start;
                break;
            }
            match c {
                ';' | ',' | ')' | ']' | '}' => break,
                '(' | '[' | '{' => {
                    self.skip_enclosed_content()?;
                    after_operand = true;
                }
                '"' | '\'' | '`' => {
                    self.skip_string()?;
                    after_operand = true;
                }
                '/' if !after_operand => match self.skip_regex() {
                    Some(_) => after_operand = true,
                    None => {
                        self.pos += 1;
                    }
                },
                c if is_identifier_char(c) => {
                    let checkpoint = self.pos;
                    let word = self
                        .read_identifier()
                        .unwrap_or_else(|| self.read_number());
                    let operator = OPERATOR_WORDS.contains(&word.as_str());
                    if after_operand && !whitespace.is_empty() && !operator {
                        // a new operand: the expression ended before it
                        self.pos = checkpoint;
                        break;
                    }
                    after_operand = !operator;
                }
                '+' | '-' if after_operand && self.rest()[1..].starts_with(c) => {
                    self.pos += 2;
                }
                '=' if self.starts_with("=>") => {
                    self.pos += 2;
                    after_operand = false;
                }
                '.' => {
                    self.pos += 1;
                    after_operand = false;
                }
                _ => {
                    self.pos += c.len_utf8();
                    after_operand = false;
                }
            }
            end = self.pos;
        }
        let text = self.input[start..end].trim().to_string();
        if self.pos < end {
            self.pos = end;
        }
        Ok(text)
    }

    fn read_number(&mut self) -> String {
        let rest = self.rest();
        let len = rest
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '.' || c == '_'))
            .unwrap_or(rest.len());
        self.pos += len.max(1);
        rest[..len.max(1)].to_string()
    }

    /// Whether an expression may begin at absolute offset `index`, judged
    /// by the previous significant character or keyword of the input.
    pub fn expression_can_start_at(&self, index: usize) -> bool {
        let local = index.saturating_sub(self.base).min(self.input.len());
        let before = self.input[..local].trim_end();
        let Some(last) = before.chars().next_back() else {
            return true;
        };
        if is_identifier_char(last) {
            let word_start = before
                .rfind(|c: char| !is_identifier_char(c))
                .map(|i| i + before[i..].chars().next().map_or(1, char::len_utf8))
                .unwrap_or(0);
            return EXPRESSION_KEYWORDS.contains(&&before[word_start..]);
        }
        !matches!(last, ')' | ']' | '.' | '"' | '\'' | '`')
    }

    /// The identifier ending right before absolute offset `index`, skipping
    /// whitespace.
    pub fn word_before(&self, index: usize) -> Option<&'a str> {
        let local = index.saturating_sub(self.base).min(self.input.len());
        let input: &'a str = self.input;
        let before = input[..local].trim_end();
        let start = before
            .rfind(|c: char| !is_identifier_char(c))
            .map(|i| i + before[i..].chars().next().map_or(1, char::len_utf8))
            .unwrap_or(0);
        let word = &before[start..];
        if word.is_empty() { None } else { Some(word) }
    }

    pub fn push_paren(&mut self) {
        self.push_paren_at(self.last_match());
    }

    /// Track a `(` at absolute offset `open`.
    pub fn push_paren_at(&mut self, open: usize) {
        let keyword = self.word_before(open).map(str::to_string);
        self.parens.push(ParenFrame {
            open,
            close: None,
            keyword,
        });
    }

    pub fn pop_paren(&mut self) -> Option<&ParenFrame> {
        let mut frame = self.parens.pop()?;
        frame.close = Some(self.position());
        self.last_closed = Some(frame);
        self.last_closed.as_ref()
    }

    pub fn last_closed(&self) -> Option<&ParenFrame> {
        self.last_closed.as_ref()
    }

    /// Source text between absolute offsets.
    pub fn slice(&self, range: Range<usize>) -> &'a str {
        let input: &'a str = self.input;
        let start = range.start.saturating_sub(self.base).min(input.len());
        let end = range.end.saturating_sub(self.base).min(input.len());
        &input[start..end]
    }
}
