//! Inline `style` attribute helpers.

use once_cell::sync::Lazy;
use regex::Regex;

/// Hex, functional (`rgb()`, `rgba()`, `hsl()`, `hsla()`) and named colors.
static CSS_COLOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^(?:#(?:[0-9a-f]{3}|[0-9a-f]{4}|[0-9a-f]{6}|[0-9a-f]{8})|(?:rgba?|hsla?)\([0-9.,%\s/]+\)|[a-z]+)$",
    )
    .expect("css color pattern must compile")
});

/// Splits a declaration list into lowercase property names and trimmed values.
/// Later declarations of the same property win when looked up through
/// [`style_value`].
pub fn parse_style(style: &str) -> Vec<(String, String)> {
    style
        .split(';')
        .filter_map(|decl| {
            let (prop, value) = decl.split_once(':')?;
            let prop = prop.trim().to_ascii_lowercase();
            let value = value.trim();
            let value = value
                .strip_suffix("!important")
                .map(str::trim_end)
                .unwrap_or(value);
            if prop.is_empty() || value.is_empty() {
                return None;
            }
            Some((prop, value.to_string()))
        })
        .collect()
}

pub fn style_value(style: &str, prop: &str) -> Option<String> {
    parse_style(style)
        .into_iter()
        .rev()
        .find(|(name, _)| name.eq_ignore_ascii_case(prop))
        .map(|(_, value)| value)
}

/// Trimmed `raw` when it is a single color value that can sit inside a
/// `style` declaration unchanged.
pub fn css_color(raw: &str) -> Option<String> {
    let raw = raw.trim();
    CSS_COLOR.is_match(raw).then(|| raw.to_string())
}

/// Reads a leading run of digits the way browsers read `width="300px"`.
/// Non-positive or non-numeric input yields `None`.
pub fn parse_dimension(raw: &str) -> Option<u32> {
    let raw = raw.trim().strip_prefix('+').unwrap_or(raw.trim());
    let digits: &str = {
        let end = raw
            .char_indices()
            .find(|(_, ch)| !ch.is_ascii_digit())
            .map(|(ix, _)| ix)
            .unwrap_or(raw.len());
        &raw[..end]
    };
    if digits.is_empty() {
        return None;
    }
    let value: u64 = digits.parse().ok()?;
    let value = u32::try_from(value).ok()?;
    (value > 0).then_some(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn style_lookup_is_case_insensitive_and_last_wins() {
        let style = "Color: red; background-color: #fff; color: blue !important";
        assert_eq!(style_value(style, "color").as_deref(), Some("blue"));
        assert_eq!(
            style_value(style, "BACKGROUND-COLOR").as_deref(),
            Some("#fff")
        );
        assert_eq!(style_value(style, "width"), None);
    }

    #[test]
    fn style_skips_malformed_declarations() {
        let parsed = parse_style("width; :10px; height: ; float: left");
        assert_eq!(parsed, vec![("float".to_string(), "left".to_string())]);
    }

    #[test]
    fn css_color_accepts_single_values_only() {
        assert_eq!(css_color(" #FDE68A ").as_deref(), Some("#FDE68A"));
        assert_eq!(css_color("rgb(1, 2, 3)").as_deref(), Some("rgb(1, 2, 3)"));
        assert_eq!(css_color("hsla(10, 50%, 50%, 0.5)").as_deref(), Some("hsla(10, 50%, 50%, 0.5)"));
        assert_eq!(css_color("rebeccapurple").as_deref(), Some("rebeccapurple"));

        assert_eq!(css_color("red;font-size:40px"), None);
        assert_eq!(css_color("red !important"), None);
        assert_eq!(css_color("\"red\""), None);
        assert_eq!(css_color("#12345"), None);
        assert_eq!(css_color("rgb(1,2,3);x:y"), None);
        assert_eq!(css_color(""), None);
    }

    #[test]
    fn dimension_reads_leading_digits() {
        assert_eq!(parse_dimension("300"), Some(300));
        assert_eq!(parse_dimension(" 300px "), Some(300));
        assert_eq!(parse_dimension("12.7"), Some(12));
        assert_eq!(parse_dimension("+40"), Some(40));
    }

    #[test]
    fn dimension_rejects_garbage_and_non_positive() {
        assert_eq!(parse_dimension(""), None);
        assert_eq!(parse_dimension("auto"), None);
        assert_eq!(parse_dimension("0"), None);
        assert_eq!(parse_dimension("-20"), None);
        assert_eq!(parse_dimension("99999999999"), None);
    }
}
