use crate::units::{Quantity, UnitError, UnitScope};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalcOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl CalcOp {
    pub fn from_char(c: char) -> Option<CalcOp> {
        match c {
            '+' => Some(CalcOp::Add),
            '-' => Some(CalcOp::Sub),
            '*' => Some(CalcOp::Mul),
            '/' => Some(CalcOp::Div),
            '%' => Some(CalcOp::Rem),
            _ => None,
        }
    }

    pub fn symbol(self) -> char {
        match self {
            CalcOp::Add => '+',
            CalcOp::Sub => '-',
            CalcOp::Mul => '*',
            CalcOp::Div => '/',
            CalcOp::Rem => '%',
        }
    }

    fn apply(self, left: f64, right: f64) -> f64 {
        match self {
            CalcOp::Add => left + right,
            CalcOp::Sub => left - right,
            CalcOp::Mul => left * right,
            CalcOp::Div => left / right,
            CalcOp::Rem => left % right,
        }
    }
}

/// An arithmetic expression over unit-bearing literals and opaque
/// (runtime-evaluated) operands.
#[derive(Debug, Clone, PartialEq)]
pub enum Calc {
    Literal(Quantity),
    /// Source of an operand only known at runtime.
    Dynamic(String),
    Negate(Box<Calc>),
    Group(Box<Calc>),
    Binary {
        op: CalcOp,
        left: Box<Calc>,
        right: Box<Calc>,
    },
}

impl Calc {
    pub fn operator_count(&self) -> usize {
        match self {
            Calc::Literal(_) | Calc::Dynamic(_) => 0,
            Calc::Negate(inner) => 1 + inner.operator_count(),
            Calc::Group(inner) => inner.operator_count(),
            Calc::Binary { left, right, .. } => 1 + left.operator_count() + right.operator_count(),
        }
    }

    pub fn has_dynamic(&self) -> bool {
        match self {
            Calc::Literal(_) => false,
            Calc::Dynamic(_) => true,
            Calc::Negate(inner) | Calc::Group(inner) => inner.has_dynamic(),
            Calc::Binary { left, right, .. } => left.has_dynamic() || right.has_dynamic(),
        }
    }

    pub fn has_unit_literal(&self) -> bool {
        match self {
            Calc::Literal(q) => q.unit.is_some(),
            Calc::Dynamic(_) => false,
            Calc::Negate(inner) | Calc::Group(inner) => inner.has_unit_literal(),
            Calc::Binary { left, right, .. } => left.has_unit_literal() || right.has_unit_literal(),
        }
    }

    /// Unify the units of the literal operands, ignoring dynamic ones.
    pub fn check_units(&self) -> Result<(), UnitError> {
        let mut scope = UnitScope::new();
        self.visit_literals(&mut |q| scope.absorb(q).map(|_| ()))
    }

    fn visit_literals(
        &self,
        f: &mut dyn FnMut(Quantity) -> Result<(), UnitError>,
    ) -> Result<(), UnitError> {
        match self {
            Calc::Literal(q) => f(*q),
            Calc::Dynamic(_) => Ok(()),
            Calc::Negate(inner) | Calc::Group(inner) => inner.visit_literals(f),
            Calc::Binary { left, right, .. } => {
                left.visit_literals(f)?;
                right.visit_literals(f)
            }
        }
    }

    /// Evaluate a fully static expression. Returns `Ok(None)` when an
    /// operand is dynamic or the result is not a finite number.
    pub fn evaluate(&self) -> Result<Option<Quantity>, UnitError> {
        if self.has_dynamic() {
            return Ok(None);
        }
        let mut scope = UnitScope::new();
        let value = self.eval_in(&mut scope)?;
        if !value.is_finite() {
            return Ok(None);
        }
        Ok(Some(scope.finish(value)))
    }

    fn eval_in(&self, scope: &mut UnitScope) -> Result<f64, UnitError> {
        match self {
            Calc::Literal(q) => scope.absorb(*q),
            Calc::Dynamic(_) => Ok(f64::NAN),
            Calc::Negate(inner) => Ok(-inner.eval_in(scope)?),
            Calc::Group(inner) => inner.eval_in(scope),
            Calc::Binary { op, left, right } => {
                let l = left.eval_in(scope)?;
                let r = right.eval_in(scope)?;
                Ok(op.apply(l, r))
            }
        }
    }

    /// Render the body of a unit-arithmetic callback. Unit-bearing literals
    /// and dynamic operands are passed through `unwrap`, which strips and
    /// records their unit at runtime.
    pub fn render(&self, unwrap: &str) -> String {
        match self {
            Calc::Literal(q) if q.unit.is_some() => format!("{}(\"{}\")", unwrap, q),
            Calc::Literal(q) => q.to_string(),
            Calc::Dynamic(source) => format!("{}({})", unwrap, source),
            Calc::Negate(inner) => format!("-{}", inner.render(unwrap)),
            Calc::Group(inner) => format!("({})", inner.render(unwrap)),
            Calc::Binary { op, left, right } => format!(
                "{} {} {}",
                left.render(unwrap),
                op.symbol(),
                right.render(unwrap)
            ),
        }
    }
}
