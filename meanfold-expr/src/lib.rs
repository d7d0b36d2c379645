pub mod eval;
pub mod expr;

pub use eval::BatchRow;
pub use expr::*;
