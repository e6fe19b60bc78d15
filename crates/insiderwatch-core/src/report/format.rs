//! Text helpers shared by the email and chat renderers

use chrono::NaiveDate;

/// Group an integer part with thousands separators, rounding to whole units.
pub fn format_shares(value: f64) -> String {
    let rounded = value.round();
    let digits = format!("{:.0}", rounded.abs());

    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if rounded < 0.0 {
        out.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Share count or `-` when unknown
pub fn format_optional_shares(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), format_shares)
}

/// Acquisition mode, `N/A` when empty
pub fn display_mode(mode: &str) -> &str {
    let mode = mode.trim();
    if mode.is_empty() || mode.eq_ignore_ascii_case("nan") {
        "N/A"
    } else {
        mode
    }
}

/// ISO date or `N/A`
pub fn display_date(date: Option<NaiveDate>) -> String {
    date.map_or_else(|| "N/A".to_string(), |d| d.format("%Y-%m-%d").to_string())
}

/// First `max` characters of `s`
pub fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Escape text for interpolation into HTML
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Escape Telegram legacy Markdown control characters
pub fn escape_markdown(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        if matches!(ch, '_' | '*' | '`' | '[') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0.0, "0")]
    #[case(999.0, "999")]
    #[case(1000.0, "1,000")]
    #[case(1_200_000.0, "1,200,000")]
    #[case(-150_000.0, "-150,000")]
    #[case(12_345.6, "12,346")]
    #[case(-0.4, "0")]
    fn test_format_shares(#[case] value: f64, #[case] expected: &str) {
        assert_eq!(format_shares(value), expected);
    }

    #[test]
    fn test_display_mode_defaults() {
        assert_eq!(display_mode(""), "N/A");
        assert_eq!(display_mode("nan"), "N/A");
        assert_eq!(display_mode(" Market Sale "), "Market Sale");
    }

    #[test]
    fn test_truncate_chars_respects_char_boundaries() {
        assert_eq!(truncate_chars("Zydus Lifesciences", 5), "Zydus");
        assert_eq!(truncate_chars("Café", 3), "Caf");
        assert_eq!(truncate_chars("ab", 10), "ab");
    }

    #[test]
    fn test_escapes() {
        assert_eq!(escape_html("A&B <Ltd>"), "A&amp;B &lt;Ltd&gt;");
        assert_eq!(escape_markdown("ICICI_Pru *Life*"), "ICICI\\_Pru \\*Life\\*");
    }
}
