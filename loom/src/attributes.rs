use std::fmt;
use std::ops::Range;

use crate::error::{CompileError, ErrorKind, Result};
use crate::options::Dialect;

/// Region attributes a mode may consume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeKey {
    /// Statement tracking in text regions.
    Logic,
    /// Whitespace-only text is kept out of chains.
    Trimmed,
    Dialect,
    /// Root selector of a stylesheet region.
    Scope,
    /// Runtime-assigned scope class.
    Scoped,
    /// Explicit mode name.
    Mode,
}

impl AttributeKey {
    pub const ALL: [AttributeKey; 6] = [
        AttributeKey::Logic,
        AttributeKey::Trimmed,
        AttributeKey::Dialect,
        AttributeKey::Scope,
        AttributeKey::Scoped,
        AttributeKey::Mode,
    ];

    pub fn name(self) -> &'static str {
        match self {
            AttributeKey::Logic => "logic",
            AttributeKey::Trimmed => "trimmed",
            AttributeKey::Dialect => "dialect",
            AttributeKey::Scope => "scope",
            AttributeKey::Scoped => "scoped",
            AttributeKey::Mode => "mode",
        }
    }

    pub fn from_name(name: &str) -> Option<AttributeKey> {
        AttributeKey::ALL.into_iter().find(|key| key.name() == name)
    }

    fn inherited(self) -> bool {
        matches!(self, AttributeKey::Logic | AttributeKey::Trimmed | AttributeKey::Dialect)
    }
}

impl fmt::Display for AttributeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.name())
    }
}

/// Value written for a `#name` attribute on a tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawValue {
    /// `#name` with no value.
    Flag,
    /// `#name="text"` or `#name=text`.
    Text(String),
    /// `#name={expr}`; region attributes must be static.
    Expression(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawAttribute {
    pub name: String,
    pub value: RawValue,
    pub span: Range<usize>,
}

/// Validated configuration of one region.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionAttributes {
    pub logic: bool,
    pub trimmed: bool,
    pub dialect: Option<Dialect>,
    pub scope: Option<String>,
    pub scoped: bool,
    pub mode: Option<String>,
    explicit: Vec<(AttributeKey, Range<usize>)>,
}

impl Default for RegionAttributes {
    fn default() -> Self {
        RegionAttributes {
            logic: false,
            trimmed: true,
            dialect: None,
            scope: None,
            scoped: false,
            mode: None,
            explicit: Vec::new(),
        }
    }
}

impl RegionAttributes {
    /// Attributes a child region starts from.
    pub fn inherit(&self) -> RegionAttributes {
        RegionAttributes {
            logic: self.logic,
            trimmed: self.trimmed,
            dialect: self.dialect,
            ..RegionAttributes::default()
        }
    }

    /// Resolve the `#` attributes of a tag on top of the parent's.
    pub fn resolve(raw: &[RawAttribute], parent: &RegionAttributes, file_id: usize) -> Result<RegionAttributes> {
        let mut attributes = parent.inherit();
        for attribute in raw {
            let Some(key) = AttributeKey::from_name(&attribute.name) else {
                let known: Vec<String> = AttributeKey::ALL.iter().map(|k| k.to_string()).collect();
                return Err(CompileError::error(
                    ErrorKind::Config,
                    format!("unknown region attribute `#{}`", attribute.name),
                    attribute.span.clone(),
                    file_id,
                )
                .with_note(format!("known attributes: {}", known.join(", "))));
            };
            attributes.apply(key, attribute, file_id)?;
            attributes.explicit.push((key, attribute.span.clone()));
        }
        Ok(attributes)
    }

    fn apply(&mut self, key: AttributeKey, attribute: &RawAttribute, file_id: usize) -> Result<()> {
        let bad_value = |expected: &str| {
            CompileError::error(
                ErrorKind::UnknownToken,
                format!("invalid value for `{}`: expected {}", key, expected),
                attribute.span.clone(),
                file_id,
            )
        };
        let flag = |value: &RawValue| match value {
            RawValue::Flag => Some(true),
            RawValue::Text(text) if text == "true" => Some(true),
            RawValue::Text(text) if text == "false" => Some(false),
            _ => None,
        };
        let text = match &attribute.value {
            RawValue::Text(text) => Some(text.clone()),
            _ => None,
        };
        match key {
            AttributeKey::Logic => self.logic = flag(&attribute.value).ok_or_else(|| bad_value("a boolean"))?,
            AttributeKey::Trimmed => self.trimmed = flag(&attribute.value).ok_or_else(|| bad_value("a boolean"))?,
            AttributeKey::Scoped => self.scoped = flag(&attribute.value).ok_or_else(|| bad_value("a boolean"))?,
            AttributeKey::Dialect => {
                let dialect = text
                    .as_deref()
                    .and_then(Dialect::from_name)
                    .ok_or_else(|| bad_value("`modern` or `legacy`"))?;
                self.dialect = Some(dialect);
            }
            AttributeKey::Scope => self.scope = Some(text.ok_or_else(|| bad_value("a selector string"))?),
            AttributeKey::Mode => self.mode = Some(text.ok_or_else(|| bad_value("a mode name"))?),
        }
        Ok(())
    }

    /// Attributes written on the tag that `used` does not cover. Inherited
    /// flags and the mode selector never count as leftovers.
    pub fn leftovers(&self, used: &[AttributeKey]) -> Vec<(AttributeKey, Range<usize>)> {
        self.explicit
            .iter()
            .filter(|(key, _)| !used.contains(key) && !key.inherited() && *key != AttributeKey::Mode)
            .cloned()
            .collect()
    }
}
