//! US EPA Air Quality Index computation.
//!
//! Concentrations arrive in µg/m³. Gases are converted to ppb (ppm for CO)
//! at 25 °C and 1 atm before being truncated and looked up in the EPA
//! breakpoint tables.

use aqi_structs::{Pollutant, PollutantBreakdown};

/// Molar volume of an ideal gas at 25 °C and 1 atm, in litres.
const MOLAR_VOLUME: f64 = 24.45;

/// Highest AQI value; concentrations beyond the last band map to it.
pub const MAX_AQI: u32 = 500;

/// One row of an EPA breakpoint table.
#[derive(Debug, Clone, Copy)]
struct Breakpoint {
    c_low: f64,
    c_high: f64,
    i_low: f64,
    i_high: f64,
}

const fn bp(c_low: f64, c_high: f64, i_low: f64, i_high: f64) -> Breakpoint {
    Breakpoint {
        c_low,
        c_high,
        i_low,
        i_high,
    }
}

/// PM2.5, 24-hour, µg/m³ (2024 revision).
const PM2_5: [Breakpoint; 7] = [
    bp(0.0, 9.0, 0.0, 50.0),
    bp(9.1, 35.4, 51.0, 100.0),
    bp(35.5, 55.4, 101.0, 150.0),
    bp(55.5, 150.4, 151.0, 200.0),
    bp(150.5, 250.4, 201.0, 300.0),
    bp(250.5, 350.4, 301.0, 400.0),
    bp(350.5, 500.4, 401.0, 500.0),
];

/// PM10, 24-hour, µg/m³.
const PM10: [Breakpoint; 7] = [
    bp(0.0, 54.0, 0.0, 50.0),
    bp(55.0, 154.0, 51.0, 100.0),
    bp(155.0, 254.0, 101.0, 150.0),
    bp(255.0, 354.0, 151.0, 200.0),
    bp(355.0, 424.0, 201.0, 300.0),
    bp(425.0, 504.0, 301.0, 400.0),
    bp(505.0, 604.0, 401.0, 500.0),
];

/// O3, 8-hour, ppb.
const O3: [Breakpoint; 5] = [
    bp(0.0, 54.0, 0.0, 50.0),
    bp(55.0, 70.0, 51.0, 100.0),
    bp(71.0, 85.0, 101.0, 150.0),
    bp(86.0, 105.0, 151.0, 200.0),
    bp(106.0, 200.0, 201.0, 300.0),
];

/// CO, 8-hour, ppm.
const CO: [Breakpoint; 7] = [
    bp(0.0, 4.4, 0.0, 50.0),
    bp(4.5, 9.4, 51.0, 100.0),
    bp(9.5, 12.4, 101.0, 150.0),
    bp(12.5, 15.4, 151.0, 200.0),
    bp(15.5, 30.4, 201.0, 300.0),
    bp(30.5, 40.4, 301.0, 400.0),
    bp(40.5, 50.4, 401.0, 500.0),
];

/// NO2, 1-hour, ppb.
const NO2: [Breakpoint; 7] = [
    bp(0.0, 53.0, 0.0, 50.0),
    bp(54.0, 100.0, 51.0, 100.0),
    bp(101.0, 360.0, 101.0, 150.0),
    bp(361.0, 649.0, 151.0, 200.0),
    bp(650.0, 1249.0, 201.0, 300.0),
    bp(1250.0, 1649.0, 301.0, 400.0),
    bp(1650.0, 2049.0, 401.0, 500.0),
];

/// SO2, 1-hour, ppb.
const SO2: [Breakpoint; 7] = [
    bp(0.0, 35.0, 0.0, 50.0),
    bp(36.0, 75.0, 51.0, 100.0),
    bp(76.0, 185.0, 101.0, 150.0),
    bp(186.0, 304.0, 151.0, 200.0),
    bp(305.0, 604.0, 201.0, 300.0),
    bp(605.0, 804.0, 301.0, 400.0),
    bp(805.0, 1004.0, 401.0, 500.0),
];

const fn breakpoints(pollutant: Pollutant) -> &'static [Breakpoint] {
    match pollutant {
        Pollutant::Pm2_5 => &PM2_5,
        Pollutant::Pm10 => &PM10,
        Pollutant::O3 => &O3,
        Pollutant::Co => &CO,
        Pollutant::No2 => &NO2,
        Pollutant::So2 => &SO2,
    }
}

/// Converts µg/m³ to ppb for gases; particulates are returned unchanged.
#[must_use]
pub fn ugm3_to_ppb(ugm3: f64, pollutant: Pollutant) -> f64 {
    pollutant
        .molecular_weight()
        .map_or(ugm3, |mw| ugm3 * MOLAR_VOLUME / mw)
}

/// Converts a µg/m³ concentration into the truncated unit of its table.
fn table_concentration(ugm3: f64, pollutant: Pollutant) -> f64 {
    match pollutant {
        Pollutant::Pm2_5 => (ugm3 * 10.0).floor() / 10.0,
        Pollutant::Pm10 => ugm3.floor(),
        Pollutant::Co => (ugm3_to_ppb(ugm3, pollutant) / 1000.0 * 10.0).floor() / 10.0,
        Pollutant::O3 | Pollutant::No2 | Pollutant::So2 => {
            ugm3_to_ppb(ugm3, pollutant).floor()
        }
    }
}

/// Computes the EPA sub-index for one pollutant concentration in µg/m³.
///
/// Returns `None` for negative or non-finite input and for concentrations
/// that fall between two bands.
#[must_use]
pub fn sub_index(pollutant: Pollutant, ugm3: f64) -> Option<u32> {
    if !ugm3.is_finite() || ugm3 < 0.0 {
        return None;
    }

    let c = table_concentration(ugm3, pollutant);
    let table = breakpoints(pollutant);

    if let Some(band) = table.iter().find(|b| b.c_low <= c && c <= b.c_high) {
        let index = (band.i_high - band.i_low) / (band.c_high - band.c_low) * (c - band.c_low)
            + band.i_low;
        return Some(index.round_ties_even() as u32);
    }

    match table.last() {
        Some(top) if c > top.c_high => Some(MAX_AQI),
        _ => None,
    }
}

/// Sub-index of every pollutant for which a concentration is given.
#[must_use]
pub fn breakdown<F>(concentration: F) -> Vec<PollutantBreakdown>
where
    F: Fn(Pollutant) -> Option<f64>,
{
    Pollutant::ALL
        .iter()
        .filter_map(|&pollutant| {
            concentration(pollutant).map(|value| PollutantBreakdown {
                pollutant,
                concentration: value,
                sub_index: sub_index(pollutant, value),
            })
        })
        .collect()
}

/// Overall AQI: the maximum sub-index, if any pollutant has one.
#[must_use]
pub fn overall_aqi(breakdown: &[PollutantBreakdown]) -> Option<u32> {
    breakdown.iter().filter_map(|b| b.sub_index).max()
}

/// The pollutant with the highest sub-index (first in [`Pollutant::ALL`] on ties).
#[must_use]
pub fn dominant_pollutant(breakdown: &[PollutantBreakdown]) -> Option<Pollutant> {
    breakdown
        .iter()
        .filter_map(|b| b.sub_index.map(|i| (b.pollutant, i)))
        .fold(None, |best: Option<(Pollutant, u32)>, (p, i)| match best {
            Some((_, best_i)) if best_i >= i => best,
            _ => Some((p, i)),
        })
        .map(|(p, _)| p)
}
