use serde::{Deserialize, Serialize};

use crate::{FeatureRef, FeatureRow, ModelFamily, Pollutant};

/// US EPA AQI category bands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
pub enum AqiCategory {
    #[strum(serialize = "Good")]
    Good,
    #[strum(serialize = "Moderate")]
    Moderate,
    #[strum(serialize = "Unhealthy for Sensitive Groups")]
    UnhealthyForSensitiveGroups,
    #[strum(serialize = "Unhealthy")]
    Unhealthy,
    #[strum(serialize = "Very Unhealthy")]
    VeryUnhealthy,
    #[strum(serialize = "Hazardous")]
    Hazardous,
}

impl AqiCategory {
    /// Maps an AQI value onto its category band.
    ///
    /// Returns `None` for NaN, which has no band.
    #[must_use]
    pub fn from_aqi(aqi: f64) -> Option<Self> {
        if aqi.is_nan() {
            return None;
        }
        let category = match aqi.round() as i64 {
            ..=50 => Self::Good,
            51..=100 => Self::Moderate,
            101..=150 => Self::UnhealthyForSensitiveGroups,
            151..=200 => Self::Unhealthy,
            201..=300 => Self::VeryUnhealthy,
            _ => Self::Hazardous,
        };
        Some(category)
    }

    /// Hex colour conventionally used for the band.
    #[must_use]
    pub const fn color(self) -> &'static str {
        match self {
            Self::Good => "#00e400",
            Self::Moderate => "#ffff00",
            Self::UnhealthyForSensitiveGroups => "#ff7e00",
            Self::Unhealthy => "#ff0000",
            Self::VeryUnhealthy => "#8f3f97",
            Self::Hazardous => "#7e0023",
        }
    }
}

/// One pollutant's contribution to the AQI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollutantBreakdown {
    pub pollutant: Pollutant,
    /// Concentration in µg/m³.
    pub concentration: f64,
    /// EPA sub-index, if the concentration falls inside a breakpoint band.
    pub sub_index: Option<u32>,
}

/// A single AQI estimate and the inputs it was derived from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub timestamp: i64,
    pub predicted_aqi: f64,
    pub category: AqiCategory,
    pub model_name: String,
    pub model_version: u32,
    pub family: ModelFamily,
    /// Feature-store version the model was trained on.
    pub lineage: FeatureRef,
    pub inputs: FeatureRow,
    pub breakdown: Vec<PollutantBreakdown>,
    /// Pollutant with the highest sub-index.
    pub dominant_pollutant: Option<Pollutant>,
}
