/// Maps raw sizes and weights into a bounded presentation range.
///
/// Inputs are raised to `exponent` before the linear mapping; the unscaled
/// bounds are stored already exponentiated. A degenerate domain (equal bounds)
/// maps every value to the midpoint of the output range.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScaleRange {
    pub min_unscaled: f64,
    pub max_unscaled: f64,
    pub min_output: f64,
    pub max_output: f64,
    pub exponent: f64,
}

impl ScaleRange {
    /// Fits the unscaled bounds to `values`. An empty set yields a degenerate range.
    pub fn fit(
        values: impl IntoIterator<Item = f64>,
        exponent: f64,
        min_output: f64,
        max_output: f64,
    ) -> Self {
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for value in values {
            min = min.min(value);
            max = max.max(value);
        }

        if !min.is_finite() || !max.is_finite() {
            min = 0.0;
            max = 0.0;
        }

        Self {
            min_unscaled: min.powf(exponent),
            max_unscaled: max.powf(exponent),
            min_output,
            max_output,
            exponent,
        }
    }

    pub fn scale(&self, value: f64) -> f64 {
        rescale(
            value.powf(self.exponent),
            self.min_unscaled,
            self.max_unscaled,
            self.min_output,
            self.max_output,
        )
    }
}

/// Linear map of `value` from `[min_unscaled, max_unscaled]` to `[min_output, max_output]`.
pub fn rescale(
    value: f64,
    min_unscaled: f64,
    max_unscaled: f64,
    min_output: f64,
    max_output: f64,
) -> f64 {
    let span = max_unscaled - min_unscaled;
    if span == 0.0 || !span.is_finite() {
        return (min_output + max_output) / 2.0;
    }

    min_output + (value - min_unscaled) * (max_output - min_output) / span
}
