//! Text color selection for colored marker backgrounds.

const DARK_TEXT: &str = "#0F172A";

const LIGHT_TEXT: &str = "#FFFFFF";

/// YIQ brightness from which dark text wins.
const YIQ_THRESHOLD: f64 = 186.0;

/// Pick a readable text color for a `#RRGGBB` background.
///
/// Malformed input falls back to dark text.
pub fn contrasting_text_color(hex: &str) -> &'static str {
    let digits = hex.trim_start_matches('#');
    let channel = |range: std::ops::Range<usize>| {
        digits
            .get(range)
            .and_then(|pair| u8::from_str_radix(pair, 16).ok())
    };
    let (Some(r), Some(g), Some(b)) = (channel(0..2), channel(2..4), channel(4..6)) else {
        return DARK_TEXT;
    };

    let yiq = (f64::from(r) * 299.0 + f64::from(g) * 587.0 + f64::from(b) * 114.0) / 1000.0;
    if yiq >= YIQ_THRESHOLD {
        DARK_TEXT
    } else {
        LIGHT_TEXT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_light_backgrounds_get_dark_text() {
        assert_eq!(contrasting_text_color("#FFFF00"), DARK_TEXT);
        assert_eq!(contrasting_text_color("#F8F9FA"), DARK_TEXT);
    }

    #[test]
    fn test_dark_backgrounds_get_light_text() {
        assert_eq!(contrasting_text_color("#7E0023"), LIGHT_TEXT);
        assert_eq!(contrasting_text_color("#FF0000"), LIGHT_TEXT);
    }

    #[test]
    fn test_malformed_input_defaults_to_dark() {
        assert_eq!(contrasting_text_color(""), DARK_TEXT);
        assert_eq!(contrasting_text_color("#abc"), DARK_TEXT);
        assert_eq!(contrasting_text_color("#zzzzzz"), DARK_TEXT);
    }

    #[test]
    fn test_multibyte_input_defaults_to_dark() {
        assert_eq!(contrasting_text_color("#aé345x"), DARK_TEXT);
        assert_eq!(contrasting_text_color("#00é000"), DARK_TEXT);
        assert_eq!(contrasting_text_color("é"), DARK_TEXT);
    }
}
