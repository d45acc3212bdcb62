use std::ops::Range;

use crate::error::CompileError;
use crate::options::{CompileOptions, Dialect};

/// Stable handle to a slot in the output arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotId(usize);

#[derive(Debug, Clone)]
enum Node {
    Text(String),
    Slot(Slot),
}

#[derive(Debug, Clone)]
struct Slot {
    value: Option<String>,
    frozen: bool,
    /// Source location and message reported if the slot is still pending
    /// when its region ends.
    pending: Option<(Range<usize>, String)>,
}

#[derive(Debug, Clone)]
enum Frame {
    /// A function body. `context` is set when its parameters bind the
    /// render context.
    Function { context: Option<String> },
    Block,
}

/// Append-only output made of literal text and reassignable slots.
/// Slots keep their position; their values are read when the arena is
/// linearized by [`Emitter::finish`].
#[derive(Debug, Clone)]
pub struct Emitter {
    nodes: Vec<Node>,
    slots: Vec<usize>,
    scopes: Vec<Frame>,
    dialect: Dialect,
    runtime: String,
    root_context: String,
    tracker: String,
    value: String,
    next_var: usize,
    next_id: usize,
}

impl Emitter {
    pub fn new(options: &CompileOptions) -> Self {
        Emitter {
            nodes: Vec::new(),
            slots: Vec::new(),
            scopes: Vec::new(),
            dialect: options.dialect,
            runtime: options.runtime.clone(),
            root_context: options.context.clone(),
            tracker: options.tracker.clone(),
            value: options.value.clone(),
            next_var: 0,
            next_id: 0,
        }
    }

    /// An empty emitter sharing naming state, for rescanning a fragment.
    pub fn fork(&self) -> Self {
        Emitter {
            nodes: Vec::new(),
            slots: Vec::new(),
            scopes: self.scopes.clone(),
            dialect: self.dialect,
            runtime: self.runtime.clone(),
            root_context: self.root_context.clone(),
            tracker: self.tracker.clone(),
            value: self.value.clone(),
            next_var: self.next_var,
            next_id: self.next_id,
        }
    }

    /// Take back the naming counters of a finished fork.
    pub fn join(&mut self, fork: &Emitter) {
        self.next_var = self.next_var.max(fork.next_var);
        self.next_id = self.next_id.max(fork.next_id);
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn set_dialect(&mut self, dialect: Dialect) {
        self.dialect = dialect;
    }

    // -----------------------------------------------------------------------
    // Nodes and slots
    // -----------------------------------------------------------------------

    pub fn add(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        if let Some(Node::Text(last)) = self.nodes.last_mut() {
            last.push_str(text);
        } else {
            self.nodes.push(Node::Text(text.to_string()));
        }
    }

    pub fn add_slot(&mut self, initial: impl Into<String>) -> SlotId {
        self.push_slot(Slot {
            value: Some(initial.into()),
            frozen: false,
            pending: None,
        })
    }

    /// A slot with no value yet. It must be assigned before its region ends.
    pub fn add_pending_slot(&mut self, span: Range<usize>, message: impl Into<String>) -> SlotId {
        self.push_slot(Slot {
            value: None,
            frozen: false,
            pending: Some((span, message.into())),
        })
    }

    fn push_slot(&mut self, slot: Slot) -> SlotId {
        let id = SlotId(self.slots.len());
        self.slots.push(self.nodes.len());
        self.nodes.push(Node::Slot(slot));
        id
    }

    fn slot_mut(&mut self, id: SlotId) -> Option<&mut Slot> {
        let index = *self.slots.get(id.0)?;
        match self.nodes.get_mut(index) {
            Some(Node::Slot(slot)) if !slot.frozen => Some(slot),
            _ => None,
        }
    }

    pub fn set(&mut self, id: SlotId, value: impl Into<String>) {
        if let Some(slot) = self.slot_mut(id) {
            slot.value = Some(value.into());
        }
    }

    pub fn append(&mut self, id: SlotId, text: &str) {
        if let Some(slot) = self.slot_mut(id) {
            slot.value.get_or_insert_with(String::new).push_str(text);
        }
    }

    pub fn prepend(&mut self, id: SlotId, text: &str) {
        if let Some(slot) = self.slot_mut(id) {
            let value = slot.value.get_or_insert_with(String::new);
            value.insert_str(0, text);
        }
    }

    /// Position in the arena, for [`Emitter::end_region`] and
    /// [`Emitter::replace_since`]. Text added afterwards starts a new node,
    /// so nothing emitted before the mark is affected by either.
    pub fn mark(&mut self) -> usize {
        let mark = self.nodes.len();
        self.nodes.push(Node::Text(String::new()));
        mark
    }

    /// Freeze every slot created since `mark`. Slots still pending are
    /// reported as malformed constructs; slots an inner region already
    /// froze were reported there.
    pub fn end_region(&mut self, mark: usize, file_id: usize) -> Result<(), Vec<CompileError>> {
        let mut errors = Vec::new();
        for node in self.nodes.iter_mut().skip(mark) {
            if let Node::Slot(slot) = node {
                if slot.frozen {
                    continue;
                }
                if slot.value.is_none() {
                    if let Some((span, message)) = &slot.pending {
                        errors.push(CompileError::malformed(message.clone(), span.clone(), file_id));
                    }
                }
                slot.frozen = true;
            }
        }
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }

    /// Drop everything emitted since `mark` and put `text` in its place.
    pub fn replace_since(&mut self, mark: usize, text: &str) {
        self.nodes.truncate(mark);
        let nodes = self.nodes.len();
        self.slots.retain(|&index| index < nodes);
        self.add(text);
    }

    /// Concatenate every node in insertion order.
    pub fn finish(&self) -> String {
        linearize(&self.nodes)
    }

    // -----------------------------------------------------------------------
    // Lexical scopes
    // -----------------------------------------------------------------------

    /// Enter a function body whose parameter list is `params`.
    pub fn start_function(&mut self, params: &str) {
        let binds = params
            .split(',')
            .map(|p| p.split('=').next().unwrap_or("").trim())
            .any(|p| p == self.root_context);
        self.scopes.push(Frame::Function {
            context: binds.then(|| self.root_context.clone()),
        });
    }

    pub fn start_scope(&mut self) {
        self.scopes.push(Frame::Block);
    }

    pub fn end_scope(&mut self) {
        self.scopes.pop();
    }

    /// The render context visible at the current position.
    pub fn context(&self) -> String {
        self.scopes
            .iter()
            .rev()
            .find_map(|frame| match frame {
                Frame::Function { context } => context.clone(),
                Frame::Block => None,
            })
            .unwrap_or_else(|| self.root_context.clone())
    }

    // -----------------------------------------------------------------------
    // Names
    // -----------------------------------------------------------------------

    /// Resolve a runtime helper name.
    pub fn feature(&self, name: &str) -> String {
        format!("{}.{}", self.runtime, name)
    }

    /// Runtime name of a chain fragment kind (`text`, `html`, `comment`).
    pub fn chain_feature(&self, kind: &str) -> String {
        self.feature(kind)
    }

    pub fn tracker(&self) -> &str {
        &self.tracker
    }

    pub fn value_name(&self) -> &str {
        &self.value
    }

    pub fn next_var_name(&mut self) -> String {
        let name = format!("__s{}", self.next_var);
        self.next_var += 1;
        name
    }

    pub fn next_id(&mut self) -> usize {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    // -----------------------------------------------------------------------
    // Dialect helpers
    // -----------------------------------------------------------------------

    /// A function returning `body`.
    pub fn arrow(&self, params: &str, body: &str) -> String {
        match self.dialect {
            Dialect::Modern => format!("{} => {}", paren_params(params), body),
            Dialect::Legacy => format!("function({}){{return {}}}.bind(this)", params, body),
        }
    }

    /// Opening of a function with a block body; pair with [`Emitter::function_close`].
    pub fn function_open(&self, params: &str) -> String {
        match self.dialect {
            Dialect::Modern => format!("{} => {{", paren_params(params)),
            Dialect::Legacy => format!("function({}){{", params),
        }
    }

    pub fn function_close(&self) -> &'static str {
        match self.dialect {
            Dialect::Modern => "}",
            Dialect::Legacy => "}.bind(this)",
        }
    }

    /// Declaration keyword for generated variables.
    pub fn declare(&self) -> &'static str {
        match self.dialect {
            Dialect::Modern => "const",
            Dialect::Legacy => "var",
        }
    }
}

fn paren_params(params: &str) -> String {
    let simple = !params.is_empty() && params.chars().all(crate::scanner::is_identifier_char);
    if simple {
        params.to_string()
    } else {
        format!("({})", params)
    }
}

fn linearize(nodes: &[Node]) -> String {
    let mut out = String::new();
    for node in nodes {
        match node {
            Node::Text(text) => out.push_str(text),
            Node::Slot(slot) => out.push_str(slot.value.as_deref().unwrap_or("")),
        }
    }
    out
}
