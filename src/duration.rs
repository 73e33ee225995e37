// ISO-8601 style flight-duration handling ("PT2H45M").

/// Parses a "PT{H}H{M}M" duration into total minutes. Either component may
/// be absent; malformed or empty input yields 0 rather than an error.
pub fn parse_iso_duration(text: &str) -> u32 {
    let Some(body) = text.strip_prefix("PT") else {
        return 0;
    };

    let mut hours = 0u32;
    let mut minutes = 0u32;
    let mut digits = String::new();
    for ch in body.chars() {
        if ch.is_ascii_digit() {
            digits.push(ch);
        } else {
            let value = digits.parse::<u32>().unwrap_or(0);
            match ch {
                'H' => hours = value,
                'M' => minutes = value,
                _ => {}
            }
            digits.clear();
        }
    }

    hours * 60 + minutes
}

/// Renders total minutes back to the display form, e.g. 165 -> "2h 45m".
pub fn format_minutes(total_minutes: u32) -> String {
    format!("{}h {}m", total_minutes / 60, total_minutes % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("PT2H45M", 165; "hours and minutes")]
    #[test_case("PT3H", 180; "hours only")]
    #[test_case("PT50M", 50; "minutes only")]
    #[test_case("PT0H0M", 0; "zero")]
    #[test_case("", 0; "empty")]
    #[test_case("2H45M", 0; "missing prefix")]
    #[test_case("garbage", 0; "malformed")]
    fn parses_duration_variants(text: &str, expected: u32) {
        assert_eq!(parse_iso_duration(text), expected);
    }

    #[test]
    fn formats_minutes_for_display() {
        assert_eq!(format_minutes(165), "2h 45m");
        assert_eq!(format_minutes(0), "0h 0m");
        assert_eq!(format_minutes(60), "1h 0m");
    }

    #[test_case("PT2H45M")]
    #[test_case("PT1H0M")]
    #[test_case("PT16H5M")]
    fn parse_is_idempotent_under_round_trip(text: &str) {
        let minutes = parse_iso_duration(text);
        let rendered = format!("PT{}H{}M", minutes / 60, minutes % 60);
        assert_eq!(parse_iso_duration(&rendered), minutes);
    }
}
