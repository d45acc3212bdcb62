pub mod calc;
pub mod tree;
pub mod units;

pub use calc::{Calc, CalcOp};
pub use tree::{Format, Scope, Sheet};
pub use units::{Quantity, UnitError, UnitScope};
