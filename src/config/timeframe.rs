use std::fmt;
use std::str::FromStr;

use crate::error::AppError;

/// Candle bucket widths supported by the history endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Timeframe {
    M1,
    M5,
    M15,
    H1,
    H4,
    H12,
    D1,
}

impl Timeframe {
    pub const ALL: [Timeframe; 7] = [
        Timeframe::M1,
        Timeframe::M5,
        Timeframe::M15,
        Timeframe::H1,
        Timeframe::H4,
        Timeframe::H12,
        Timeframe::D1,
    ];

    /// Short label used in configuration and as the key in the output document.
    pub fn label(self) -> &'static str {
        match self {
            Timeframe::M1 => "M1",
            Timeframe::M5 => "M5",
            Timeframe::M15 => "M15",
            Timeframe::H1 => "H1",
            Timeframe::H4 => "H4",
            Timeframe::H12 => "H12",
            Timeframe::D1 => "D1",
        }
    }

    /// Token expected by the `timeframe` query parameter.
    pub fn wire_token(self) -> &'static str {
        match self {
            Timeframe::M1 => "OneMinute",
            Timeframe::M5 => "FiveMinutes",
            Timeframe::M15 => "FifteenMinutes",
            Timeframe::H1 => "OneHour",
            Timeframe::H4 => "FourHours",
            Timeframe::H12 => "TwelveHours",
            Timeframe::D1 => "OneDay",
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Timeframe {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        Timeframe::ALL
            .into_iter()
            .find(|tf| tf.label().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| {
                AppError::message(format!(
                    "unknown timeframe `{trimmed}` (expected one of M1, M5, M15, H1, H4, H12, D1)"
                ))
            })
    }
}

/// Parse a comma separated list such as `M1,H1,D1`.
pub fn parse_timeframe_list(value: &str) -> Result<Vec<Timeframe>, AppError> {
    value
        .split(',')
        .filter(|part| !part.trim().is_empty())
        .map(Timeframe::from_str)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_labels_to_wire_tokens() {
        assert_eq!(Timeframe::M15.wire_token(), "FifteenMinutes");
        assert_eq!(Timeframe::H12.wire_token(), "TwelveHours");
        assert_eq!(Timeframe::D1.to_string(), "D1");
    }

    #[test]
    fn parses_labels_case_insensitively() {
        assert_eq!("h4".parse::<Timeframe>().unwrap(), Timeframe::H4);
        assert_eq!(" M5 ".parse::<Timeframe>().unwrap(), Timeframe::M5);
    }

    #[test]
    fn rejects_unknown_label() {
        let err = "W1".parse::<Timeframe>().expect_err("W1 is not supported");
        assert!(err.to_string().contains("unknown timeframe `W1`"));
    }

    #[test]
    fn parses_comma_separated_list() {
        let list = parse_timeframe_list("M1, H1,,D1").unwrap();
        assert_eq!(list, vec![Timeframe::M1, Timeframe::H1, Timeframe::D1]);
        assert!(parse_timeframe_list("M1,X9").is_err());
    }
}
