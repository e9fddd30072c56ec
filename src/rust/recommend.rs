//! Rule engine turning a weed label and field conditions into treatment advice.
//!
//! Notes are emitted in a fixed order: soil, temperature, crop. Soil and crop
//! notes only appear for recognized values; exactly one temperature note is
//! always present.

use std::fmt;

use log::debug;
use serde::Serialize;

use crate::catalog::{self, WeedLabel, WeedRecord};

/// Above this temperature (°C) herbicides volatilize.
pub const HOT_THRESHOLD_C: f64 = 30.0;
/// Below this temperature (°C) herbicides lose efficacy.
pub const COLD_THRESHOLD_C: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SoilType {
    Clay,
    Sandy,
    Loamy,
    Silty,
    Peaty,
    Unknown,
}

impl SoilType {
    /// Case-insensitive parse; anything unrecognized is `Unknown`.
    pub fn parse(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "clay" => Self::Clay,
            "sandy" => Self::Sandy,
            "loamy" => Self::Loamy,
            "silty" => Self::Silty,
            "peaty" => Self::Peaty,
            _ => Self::Unknown,
        }
    }

    pub fn advice(&self) -> Option<&'static str> {
        match self {
            Self::Clay => Some("For clay soil, add a surfactant to improve herbicide absorption and use higher application rates."),
            Self::Sandy => Some("On sandy soils, reduce application rates by 20% to prevent leaching and potential groundwater contamination."),
            Self::Loamy => Some("Loamy soils provide ideal conditions for most herbicide applications."),
            Self::Silty => Some("On silty soils, apply herbicides when soil moisture is optimal to prevent runoff."),
            Self::Peaty => Some("For peaty soils, consider using foliar-applied herbicides for better effectiveness."),
            Self::Unknown => None,
        }
    }
}

impl fmt::Display for SoilType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Clay => "Clay",
            Self::Sandy => "Sandy",
            Self::Loamy => "Loamy",
            Self::Silty => "Silty",
            Self::Peaty => "Peaty",
            Self::Unknown => "Unknown",
        };
        f.write_str(name)
    }
}

/// Crops with specific advice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Crop {
    Wheat,
    Corn,
    Soyabean,
}

impl Crop {
    /// Case-insensitive parse; `None` for crops without specific advice.
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "wheat" => Some(Self::Wheat),
            "corn" => Some(Self::Corn),
            "soyabean" => Some(Self::Soyabean),
            _ => None,
        }
    }

    pub fn advice(&self) -> &'static str {
        match self {
            Self::Wheat => "For wheat crops, consider using Axial or Puma Super for grass weed control.",
            Self::Corn => "In corn fields, use atrazine-based products for broadleaf weed control.",
            Self::Soyabean => "For soybeans, Flexstar or Roundup Ready systems work well for post-emergent control.",
        }
    }
}

/// Application temperature band. Both thresholds belong to `Ideal`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TemperatureBand {
    Hot,
    Cold,
    Ideal,
}

impl TemperatureBand {
    /// `None` for NaN or infinite readings.
    pub fn from_celsius(celsius: f64) -> Option<Self> {
        if !celsius.is_finite() {
            return None;
        }
        Some(if celsius > HOT_THRESHOLD_C {
            Self::Hot
        } else if celsius < COLD_THRESHOLD_C {
            Self::Cold
        } else {
            Self::Ideal
        })
    }

    pub fn advice(&self) -> &'static str {
        match self {
            Self::Hot => "⚠️ Avoid herbicide application during high temperatures (>30°C) to prevent volatilization and plant damage.",
            Self::Cold => "⚠️ Herbicides may be less effective in cold temperatures (<10°C). Wait for warmer conditions.",
            Self::Ideal => "✅ Current temperature is ideal for herbicide application.",
        }
    }
}

/// Field conditions for one recommendation request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnvironmentContext {
    pub soil_type: SoilType,
    pub temperature_celsius: f64,
    pub crop_type: String,
}

impl EnvironmentContext {
    pub fn new(
        soil_type: SoilType,
        temperature_celsius: f64,
        crop_type: impl Into<String>,
    ) -> Self {
        Self {
            soil_type,
            temperature_celsius,
            crop_type: crop_type.into(),
        }
    }
}

/// Treatment advice for one weed under given conditions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Recommendation {
    pub pesticides: Vec<String>,
    pub general_recommendation: String,
    /// Ordered soil, temperature, crop
    pub contextual_notes: Vec<String>,
}

impl Recommendation {
    /// Whether the catalog had no treatment for the weed
    pub fn has_pesticides(&self) -> bool {
        !self.pesticides.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RecommendationError {
    #[error("Temperature {0} is not a finite number")]
    NonFiniteTemperature(f64),
    #[error("Catalog record for '{0}' has no pesticides")]
    MalformedRecord(String),
}

/// Builds a recommendation from loosely typed inputs as entered by a user.
///
/// Unrecognized soil or crop text contributes no note.
pub fn recommend(
    label: &str,
    soil_type: &str,
    temperature_celsius: f64,
    crop_type: &str,
) -> Result<Recommendation, RecommendationError> {
    let context =
        EnvironmentContext::new(SoilType::parse(soil_type), temperature_celsius, crop_type);
    recommend_for(label, &context)
}

/// Builds a recommendation for `label` under `context`.
///
/// An unknown label yields empty pesticides and general advice; the notes
/// are still produced.
pub fn recommend_for(
    label: &str,
    context: &EnvironmentContext,
) -> Result<Recommendation, RecommendationError> {
    assemble(label, catalog::lookup(label), context)
}

/// Combines a catalog record with the notes for `context`.
///
/// A known weed whose record lists no pesticides is rejected.
fn assemble(
    label: &str,
    record: WeedRecord,
    context: &EnvironmentContext,
) -> Result<Recommendation, RecommendationError> {
    let band = TemperatureBand::from_celsius(context.temperature_celsius)
        .ok_or(RecommendationError::NonFiniteTemperature(context.temperature_celsius))?;

    if WeedLabel::from_label(label).is_some() && record.pesticides.is_empty() {
        return Err(RecommendationError::MalformedRecord(label.to_string()));
    }

    let mut notes = Vec::with_capacity(3);
    if let Some(advice) = context.soil_type.advice() {
        notes.push(advice.to_string());
    }
    notes.push(band.advice().to_string());
    if let Some(crop) = Crop::parse(&context.crop_type) {
        notes.push(crop.advice().to_string());
    }

    debug!(
        "Recommendation for '{}' (soil {}, {:?}, crop '{}'): {} pesticides, {} notes",
        label,
        context.soil_type,
        band,
        context.crop_type,
        record.pesticides.len(),
        notes.len()
    );

    Ok(Recommendation {
        pesticides: record.pesticides,
        general_recommendation: record.general_recommendation,
        contextual_notes: notes,
    })
}
