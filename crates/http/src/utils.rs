/// Returns early with `$error` unless `$predicate` holds.
///
/// ```ignore
/// ensure!(head_len <= max, ParseError::too_large_header(head_len, max));
/// ```
macro_rules! ensure {
    ($predicate:expr, $error:expr) => {
        if !$predicate {
            return Err($error);
        }
    };
}

pub(crate) use ensure;
