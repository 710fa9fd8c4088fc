//! Presence checks for optional input values.
//!
//! Input cells may be empty or hold a "missing" marker. These are read as [`None`] and a missing
//! value suppresses every output row that would have used it.

/// Whether an optional value is present and usable.
///
/// Absent values and NaN both count as missing.
pub fn is_present(value: Option<f64>) -> bool {
    value.is_some_and(|v| !v.is_nan())
}

/// Convenience methods for optional numeric inputs
pub trait OptionalValue {
    /// The value, if it is present and not NaN
    fn present(self) -> Option<f64>;
}

impl OptionalValue for Option<f64> {
    fn present(self) -> Option<f64> {
        if is_present(self) { self } else { None }
    }
}
