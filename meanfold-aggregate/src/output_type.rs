//! Result type inference for `AVG`.

use meanfold_types::{FieldType, NumericLimits, TypeKind};

use crate::AggMode;

/// Resolve the output type of `AVG` over an input declared as `input`.
///
/// `input` is the value argument in complete/partial mode and the partial-sum
/// argument in final mode. Exact inputs average to a decimal, everything else to a
/// double. The returned type always carries the binary collation flag.
pub fn resolve_output_type(mode: AggMode, input: FieldType, limits: &NumericLimits) -> FieldType {
    let resolved = if input.kind.is_exact_numeric() {
        match mode {
            AggMode::Final => FieldType::decimal(input.width, input.scale),
            AggMode::Complete | AggMode::Partial => {
                let scale = match input.scale {
                    Some(scale) => scale
                        .saturating_add(limits.div_frac_incr)
                        .min(limits.max_decimal_scale),
                    None => limits.max_decimal_scale,
                };
                FieldType::decimal(limits.max_decimal_width, Some(scale))
            }
        }
    } else {
        FieldType::new(TypeKind::Double)
            .with_width(limits.max_real_width)
            .with_scale(input.scale)
    };
    resolved.with_binary_collation()
}

/// Number of fractional digits the result is rounded to.
pub(crate) fn target_scale(output: &FieldType, limits: &NumericLimits) -> u8 {
    output.scale.unwrap_or(limits.max_decimal_scale)
}
