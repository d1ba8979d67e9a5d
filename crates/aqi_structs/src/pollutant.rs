use serde::{Deserialize, Serialize};

/// Air pollutants reported by the pollution API and used for the AQI.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumIter,
    strum::EnumString,
    strum::IntoStaticStr,
)]
pub enum Pollutant {
    #[serde(rename = "pm2_5")]
    #[strum(serialize = "pm2_5")]
    Pm2_5,
    #[serde(rename = "pm10")]
    #[strum(serialize = "pm10")]
    Pm10,
    #[serde(rename = "o3")]
    #[strum(serialize = "o3")]
    O3,
    #[serde(rename = "co")]
    #[strum(serialize = "co")]
    Co,
    #[serde(rename = "no2")]
    #[strum(serialize = "no2")]
    No2,
    #[serde(rename = "so2")]
    #[strum(serialize = "so2")]
    So2,
}

impl Pollutant {
    /// All pollutants, in the order the AQI breakdown is reported.
    pub const ALL: [Self; 6] = [
        Self::Pm2_5,
        Self::Pm10,
        Self::O3,
        Self::Co,
        Self::No2,
        Self::So2,
    ];

    /// Molecular weight in g/mol for gaseous pollutants.
    ///
    /// Particulate matter has no molecular weight and returns `None`.
    #[must_use]
    pub const fn molecular_weight(self) -> Option<f64> {
        match self {
            Self::Co => Some(28.01),
            Self::O3 => Some(48.00),
            Self::No2 => Some(46.01),
            Self::So2 => Some(64.07),
            Self::Pm2_5 | Self::Pm10 => None,
        }
    }

    /// Human readable label used by the dashboard.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pm2_5 => "PM2.5",
            Self::Pm10 => "PM10",
            Self::O3 => "O\u{2083}",
            Self::Co => "CO",
            Self::No2 => "NO\u{2082}",
            Self::So2 => "SO\u{2082}",
        }
    }
}

#[cfg(test)]
mod tests {
    use core::str::FromStr;

    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn test_string_forms_match_api_field_names() {
        let names: Vec<String> = Pollutant::iter().map(|p| p.to_string()).collect();
        assert_eq!(names, ["pm2_5", "pm10", "o3", "co", "no2", "so2"]);
        assert_eq!(Pollutant::from_str("no2").ok(), Some(Pollutant::No2));
    }

    #[test]
    fn test_molecular_weight_only_for_gases() {
        assert!(Pollutant::Pm2_5.molecular_weight().is_none());
        assert!(Pollutant::Pm10.molecular_weight().is_none());
        assert!(Pollutant::Co.molecular_weight().is_some());
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&Pollutant::Pm2_5).unwrap();
        assert_eq!(json, "\"pm2_5\"");
    }
}
