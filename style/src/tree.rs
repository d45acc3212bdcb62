/// A declaration tree built by nested selector scopes.
///
/// Rules nested inside other rules are flattened at selection time: a
/// nested rule is appended next to its parent (or inside the enclosing
/// at-rule), with its selector already combined with the parent's.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Sheet {
    root: Vec<Item>,
    rules: Vec<Rule>,
}

#[derive(Debug, Clone, PartialEq)]
enum Item {
    Rule(usize),
    Declaration { key: String, value: String },
    Statement(String),
}

#[derive(Debug, Clone, PartialEq)]
struct Rule {
    selector: String,
    items: Vec<Item>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tree {
    Root,
    Rule(usize),
}

/// A position in the sheet where declarations and nested rules go.
#[derive(Debug, Clone)]
pub struct Scope {
    /// Where rules selected from this scope are appended.
    sroot: Tree,
    /// Where declarations of this scope are appended.
    tree: Tree,
    selectors: Vec<String>,
    /// Inside `@keyframes`, selectors are not combined with the parents.
    absolute: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    /// `a{b:c;}` with nothing between items.
    #[default]
    Compact,
    /// One item per line, nested blocks indented by two spaces.
    Indented,
}

impl Sheet {
    pub fn new() -> Self {
        Sheet::default()
    }

    /// The top scope, optionally wrapped in a root selector.
    pub fn scope(&mut self, selector: Option<&str>) -> Scope {
        match selector {
            Some(selector) => {
                let rule = self.push_rule(Tree::Root, selector.to_string());
                Scope {
                    sroot: Tree::Root,
                    tree: rule,
                    selectors: vec![selector.to_string()],
                    absolute: false,
                }
            }
            None => Scope {
                sroot: Tree::Root,
                tree: Tree::Root,
                selectors: Vec::new(),
                absolute: false,
            },
        }
    }

    pub fn select(&mut self, scope: &Scope, selector: &str) -> Scope {
        let selector = selector.trim();
        if let Some(at_rule) = selector.strip_prefix('@') {
            let at = self.push_rule(Tree::Root, selector.to_string());
            let tree = if scope.selectors.is_empty() {
                at
            } else {
                self.push_rule(at, scope.selectors.join(", "))
            };
            return Scope {
                sroot: at,
                tree,
                selectors: scope.selectors.clone(),
                absolute: at_rule.starts_with("keyframes"),
            };
        }

        let mut selectors = Vec::new();
        for part in selector.split(',').map(str::trim) {
            if part.contains('&') && !scope.selectors.is_empty() {
                for parent in &scope.selectors {
                    selectors.push(part.replace('&', parent));
                }
            } else if !scope.selectors.is_empty() && !scope.absolute {
                for parent in &scope.selectors {
                    selectors.push(format!("{} {}", parent, part));
                }
            } else {
                selectors.push(part.to_string());
            }
        }
        let tree = self.push_rule(scope.sroot, selectors.join(", "));
        Scope {
            sroot: scope.sroot,
            tree,
            selectors,
            absolute: false,
        }
    }

    /// Add a declaration; a comma-separated key declares each key.
    pub fn value(&mut self, scope: &Scope, key: &str, value: &str) {
        for key in key.split(',').map(str::trim) {
            self.items_mut(scope.tree).push(Item::Declaration {
                key: key.to_string(),
                value: value.to_string(),
            });
        }
    }

    /// Add a verbatim statement (e.g. `@import url(x)`) at the top level.
    pub fn stat(&mut self, statement: &str) {
        self.root.push(Item::Statement(statement.trim().to_string()));
    }

    pub fn to_css(&self, format: Format) -> String {
        let mut out = String::new();
        match format {
            Format::Compact => self.write_compact(&self.root, &mut out),
            Format::Indented => self.write_indented(&self.root, "", &mut out),
        }
        out
    }

    fn push_rule(&mut self, parent: Tree, selector: String) -> Tree {
        let index = self.rules.len();
        self.rules.push(Rule {
            selector,
            items: Vec::new(),
        });
        self.items_mut(parent).push(Item::Rule(index));
        Tree::Rule(index)
    }

    fn items_mut(&mut self, tree: Tree) -> &mut Vec<Item> {
        match tree {
            Tree::Root => &mut self.root,
            Tree::Rule(index) => &mut self.rules[index].items,
        }
    }

    fn write_compact(&self, items: &[Item], out: &mut String) {
        for item in items {
            match item {
                Item::Rule(index) => {
                    let rule = &self.rules[*index];
                    if !rule.items.is_empty() {
                        out.push_str(&rule.selector);
                        out.push('{');
                        self.write_compact(&rule.items, out);
                        out.push('}');
                    }
                }
                Item::Declaration { key, value } => {
                    out.push_str(&format!("{}:{};", key, value));
                }
                Item::Statement(statement) => {
                    out.push_str(&format!("{};", statement));
                }
            }
        }
    }

    fn write_indented(&self, items: &[Item], indent: &str, out: &mut String) {
        for item in items {
            match item {
                Item::Rule(index) => {
                    let rule = &self.rules[*index];
                    if !rule.items.is_empty() {
                        out.push_str(&format!("{}{} {{\n", indent, rule.selector));
                        self.write_indented(&rule.items, &format!("{}  ", indent), out);
                        out.push_str(&format!("{}}}\n", indent));
                    }
                }
                Item::Declaration { key, value } => {
                    out.push_str(&format!("{}{}: {};\n", indent, key, value));
                }
                Item::Statement(statement) => {
                    out.push_str(&format!("{}{};\n", indent, statement));
                }
            }
        }
    }
}
