/// Write each value with `f`, placing `separator` between the ones that produced output.
pub fn separated_by<T, F>(
    out: &mut String,
    values: impl IntoIterator<Item = T>,
    mut f: F,
    separator: &str,
) where
    F: FnMut(&mut String, T),
{
    let mut len = out.len();
    for v in values {
        if out.len() > len {
            out.push_str(separator);
        }
        len = out.len();
        f(out, v);
    }
}

/// Cut `value` to at most 497 bytes on a char boundary.
pub fn truncated(value: &str) -> &str {
    if value.len() <= 497 {
        return value.trim_end();
    }
    let end = (0..=497)
        .rev()
        .find(|i| value.is_char_boundary(*i))
        .unwrap_or(0);
    value[..end].trim_end()
}

#[macro_export]
macro_rules! truncate_long {
    ($query:expr) => {
        format_args!(
            "{}{}",
            $crate::truncated(&$query),
            if $query.len() > 497 { "..." } else { "" },
        )
    };
}
