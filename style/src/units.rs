use std::fmt;

/// Units understood by unit-aware arithmetic.
pub const UNITS: &[&str] = &[
    "px", "%", "rem", "em", "s", "pt", "vh", "vw", "vmin", "vmax", "cm", "mm", "in", "pc", "ex",
    "ch",
];

/// A numeric literal with an optional unit suffix, e.g. `10px` or `1.5`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quantity {
    pub value: f64,
    pub unit: Option<&'static str>,
}

impl Quantity {
    pub fn number(value: f64) -> Self {
        Quantity { value, unit: None }
    }

    /// Parse `text` as a number optionally followed by one of [`UNITS`].
    pub fn parse(text: &str) -> Option<Quantity> {
        let text = text.trim();
        if let Some(value) = parse_number(text) {
            return Some(Quantity::number(value));
        }
        // Longest suffix wins so that `vmin` is not read as `vm` + `in`.
        let mut best: Option<&'static str> = None;
        for unit in UNITS {
            if text.ends_with(unit)
                && best.is_none_or(|b| unit.len() > b.len())
                && parse_number(&text[..text.len() - unit.len()]).is_some()
            {
                best = Some(unit);
            }
        }
        let unit = best?;
        let value = parse_number(&text[..text.len() - unit.len()])?;
        Some(Quantity { value, unit: Some(unit) })
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rounded = (self.value * 10000.0).round() / 10000.0;
        write!(f, "{}{}", rounded, self.unit.unwrap_or(""))
    }
}

/// Accepts `[+-]digits[.digits]` and `[+-].digits`; rejects exponents and words.
fn parse_number(text: &str) -> Option<f64> {
    let digits = text.strip_prefix(['+', '-']).unwrap_or(text);
    if digits.is_empty() || !digits.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }
    if !digits.chars().all(|c| c.is_ascii_digit() || c == '.') || digits.matches('.').count() > 1 {
        return None;
    }
    text.parse::<f64>().ok()
}

/// Two operands of one expression carry different units.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitError {
    pub expected: &'static str,
    pub found: &'static str,
}

impl fmt::Display for UnitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "units '{}' and '{}' are not compatible; use the calc() css function instead",
            self.expected, self.found
        )
    }
}

impl std::error::Error for UnitError {}

/// Unifies the units of every operand seen while evaluating one expression.
#[derive(Debug, Default, Clone)]
pub struct UnitScope {
    unit: Option<&'static str>,
}

impl UnitScope {
    pub fn new() -> Self {
        UnitScope::default()
    }

    /// Record the operand's unit and return its bare numeric value.
    pub fn absorb(&mut self, quantity: Quantity) -> Result<f64, UnitError> {
        if let Some(found) = quantity.unit {
            match self.unit {
                Some(expected) if expected != found => {
                    return Err(UnitError { expected, found });
                }
                _ => self.unit = Some(found),
            }
        }
        Ok(quantity.value)
    }

    pub fn unit(&self) -> Option<&'static str> {
        self.unit
    }

    pub fn finish(&self, value: f64) -> Quantity {
        Quantity { value, unit: self.unit }
    }
}
