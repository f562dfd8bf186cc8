use std::path::Path;

pub fn simplify_file_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or(path)
        .to_string()
}

/// Identifiers for the lines of a file, used as voter names when the file does
/// not provide any.
pub fn make_default_id_lineno(path: &str) -> impl Fn(usize) -> String {
    let simplified_file_name = simplify_file_name(path);
    move |lineno| format!("{}-{:08}", simplified_file_name, lineno)
}

/// Reads a vote count. Decimal notation is accepted if the value is integral,
/// since spreadsheet exports often write "3.0".
pub fn parse_count(s: &str) -> Option<i64> {
    let s = s.trim();
    if let Ok(x) = s.parse::<i64>() {
        return Some(x);
    }
    s.parse::<f64>().ok().and_then(float_count)
}

/// An integral float within the range of `i64`.
pub fn float_count(f: f64) -> Option<i64> {
    // i64::MAX as f64 is 2^63, which is already out of range.
    if f.is_finite() && f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_ids() {
        let f = make_default_id_lineno("/tmp/votes/final.csv");
        assert_eq!(f(12), "final.csv-00000012");
    }

    #[test]
    fn counts() {
        assert_eq!(parse_count(" 4 "), Some(4));
        assert_eq!(parse_count("-1"), Some(-1));
        assert_eq!(parse_count("3.0"), Some(3));
        assert_eq!(parse_count("3.5"), None);
        assert_eq!(parse_count(""), None);
        assert_eq!(parse_count("9223372036854775807"), Some(i64::MAX));
        assert_eq!(parse_count("1e30"), None);
        assert_eq!(parse_count("-1e30"), None);
        assert_eq!(float_count(-9.223372036854775808e18), Some(i64::MIN));
    }
}
