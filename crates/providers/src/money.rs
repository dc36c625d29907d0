//! Display formatting for dollar amounts and rates.

/// Round to whole dollars with thousands separators, e.g. `$31,560`.
pub(crate) fn fmt_dollars(v: f64) -> String {
    let rounded = v.round() as i64;
    let mut digits = rounded.abs().to_string();
    let mut grouped = String::new();
    while digits.len() > 3 {
        let split = digits.len() - 3;
        grouped = format!(",{}{}", &digits[split..], grouped);
        digits.truncate(split);
    }
    let sign = if rounded < 0 { "-" } else { "" };
    format!("{sign}${digits}{grouped}")
}

/// Whole-percent display, e.g. `32%`.
pub(crate) fn fmt_pct(rate: f64) -> String {
    format!("{:.0}%", rate * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dollars_grouping() {
        assert_eq!(fmt_dollars(0.0), "$0");
        assert_eq!(fmt_dollars(950.0), "$950");
        assert_eq!(fmt_dollars(31_560.0), "$31,560");
        assert_eq!(fmt_dollars(1_234_567.0), "$1,234,567");
        assert_eq!(fmt_dollars(-4_200.0), "-$4,200");
    }

    #[test]
    fn percent_display() {
        assert_eq!(fmt_pct(0.32), "32%");
        assert_eq!(fmt_pct(0.0), "0%");
    }
}
