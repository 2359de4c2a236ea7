// src/coords.rs
use regex::Regex;
use serde::{Deserialize, Serialize};

/// A latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Six-decimal strings, the precision used for form values and place names.
    pub fn fixed(&self) -> (String, String) {
        (format!("{:.6}", self.latitude), format!("{:.6}", self.longitude))
    }

    /// The same point rounded to six decimals, as sent to the lookup backend.
    pub fn rounded(&self) -> Self {
        let (lat, lon) = self.fixed();
        Self {
            latitude: lat.parse().unwrap_or(self.latitude),
            longitude: lon.parse().unwrap_or(self.longitude),
        }
    }
}

lazy_static::lazy_static! {
    // "56.126917, 40.397011"
    static ref DECIMAL_PAIR: Regex =
        Regex::new(r"([-+]?[0-9]{1,2}\.[0-9]+)\s*,\s*([-+]?[0-9]{1,3}\.[0-9]+)").unwrap();
    // "56.126917 N, 40.397011 E"
    static ref HEMISPHERE_PAIR: Regex =
        Regex::new(r"(?i)([-+]?[0-9]{1,2}\.[0-9]+)\s*([NS])[^0-9]+([-+]?[0-9]{1,3}\.[0-9]+)\s*([EW])").unwrap();
}

/// Try to read a coordinate out of free text.
///
/// Plain signed pairs are tried first, then pairs with hemisphere letters
/// (S and W negate). Values are not range-checked beyond the digit counts
/// the patterns allow.
pub fn parse_coordinates(text: &str) -> Option<Coordinate> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Some(caps) = DECIMAL_PAIR.captures(text) {
        let lat = parse_finite(&caps[1]);
        let lon = parse_finite(&caps[2]);
        if let (Some(latitude), Some(longitude)) = (lat, lon) {
            return Some(Coordinate::new(latitude, longitude));
        }
    }

    if let Some(caps) = HEMISPHERE_PAIR.captures(text) {
        let lat = parse_finite(&caps[1]);
        let lon = parse_finite(&caps[3]);
        if let (Some(mut latitude), Some(mut longitude)) = (lat, lon) {
            if caps[2].eq_ignore_ascii_case("S") {
                latitude = -latitude.abs();
            }
            if caps[4].eq_ignore_ascii_case("W") {
                longitude = -longitude.abs();
            }
            return Some(Coordinate::new(latitude, longitude));
        }
    }

    None
}

fn parse_finite(raw: &str) -> Option<f64> {
    raw.parse::<f64>().ok().filter(|v| v.is_finite())
}
