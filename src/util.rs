/// Returns a [`ConfigurationError::InvalidValue`](crate::error::ConfigurationError::InvalidValue)
/// from the enclosing function if a numerical value is not in the interval `[a,b]`
///
/// NaN is never in the interval.
///
/// ### Example
/// ```ignore
/// let lambda = 2.0;
/// ensure_interval!(lambda, 0.0, 1.0);
/// ```
/// This returns an error with the message "invalid value for \`lambda\`: must be in the interval \[0, 1\], got 2".
#[macro_export]
macro_rules! ensure_interval {
    ($var:ident, $a:expr, $b:expr) => {
        $crate::ensure_interval!(stringify!($var), $var, $a, $b)
    };
    ($field:expr, $var:expr, $a:expr, $b:expr) => {
        if !($var >= $a && $var <= $b) {
            return Err($crate::error::ConfigurationError::InvalidValue {
                field: $field,
                reason: format!("must be in the interval [{}, {}], got {}", $a, $b, $var),
            }
            .into());
        }
    };
}
