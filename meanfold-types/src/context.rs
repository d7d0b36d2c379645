//! Statement-level configuration consumed by the aggregator.

/// Fractional digits kept beyond the output scale while dividing.
pub const DIV_FRAC_INCR: u8 = 4;
/// Largest scale a decimal result may carry.
pub const MAX_DECIMAL_SCALE: u8 = 30;
/// Display width of decimal results.
pub const MAX_DECIMAL_WIDTH: u32 = 65;
/// Display width of floating results.
pub const MAX_REAL_WIDTH: u32 = 23;

/// Domain-wide numeric limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NumericLimits {
    pub div_frac_incr: u8,
    pub max_decimal_scale: u8,
    pub max_decimal_width: u32,
    pub max_real_width: u32,
}

impl Default for NumericLimits {
    fn default() -> Self {
        Self {
            div_frac_incr: DIV_FRAC_INCR,
            max_decimal_scale: MAX_DECIMAL_SCALE,
            max_decimal_width: MAX_DECIMAL_WIDTH,
            max_real_width: MAX_REAL_WIDTH,
        }
    }
}

/// How arithmetic problems found while producing a result are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArithmeticPolicy {
    /// Log a diagnostic and keep the best value computed so far.
    #[default]
    Warn,
    /// Fail the result with `Error::Arithmetic`.
    Strict,
}

/// Per-statement context threaded through aggregation.
///
/// Numeric limits are not part of it: an aggregate fixes them at construction
/// because its output type depends on them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatementContext {
    arithmetic: ArithmeticPolicy,
}

impl StatementContext {
    /// Construct a context with the `Warn` policy.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_arithmetic_policy(mut self, policy: ArithmeticPolicy) -> Self {
        self.arithmetic = policy;
        self
    }

    pub fn arithmetic_policy(&self) -> ArithmeticPolicy {
        self.arithmetic
    }

    /// Shorthand for `arithmetic_policy() == ArithmeticPolicy::Strict`.
    pub fn strict_arithmetic(&self) -> bool {
        self.arithmetic == ArithmeticPolicy::Strict
    }
}
