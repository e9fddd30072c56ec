//! Static weed metadata keyed by the species the classifier was trained on.

use std::collections::{HashMap, HashSet};
use std::fmt;

use lazy_static::lazy_static;
use log::{debug, warn};
use serde::Serialize;

/// Icon shown for labels that have no catalog record.
pub const DEFAULT_ICON: &str = "🌿";

/// The closed set of weed species known to the catalog.
///
/// Variant order matches the output order of the trained classifier, so
/// `WeedLabel::ALL[i]` is the label for output index `i` of the default model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum WeedLabel {
    Carpetweeds,
    Crabgrass,
    Eclipta,
    Goosegrass,
    Morningglory,
    Nutsedge,
    PalmerAmaranth,
    PricklySida,
    Purslane,
    Ragweed,
    Sicklepod,
    SpottedSpurge,
    SpurredAnoda,
    Swinecress,
    Waterhemp,
}

impl WeedLabel {
    pub const ALL: [WeedLabel; 15] = [
        Self::Carpetweeds,
        Self::Crabgrass,
        Self::Eclipta,
        Self::Goosegrass,
        Self::Morningglory,
        Self::Nutsedge,
        Self::PalmerAmaranth,
        Self::PricklySida,
        Self::Purslane,
        Self::Ragweed,
        Self::Sicklepod,
        Self::SpottedSpurge,
        Self::SpurredAnoda,
        Self::Swinecress,
        Self::Waterhemp,
    ];

    /// The label string as emitted by the classifier
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Carpetweeds => "Carpetweeds",
            Self::Crabgrass => "Crabgrass",
            Self::Eclipta => "Eclipta",
            Self::Goosegrass => "Goosegrass",
            Self::Morningglory => "Morningglory",
            Self::Nutsedge => "Nutsedge",
            Self::PalmerAmaranth => "PalmerAmaranth",
            Self::PricklySida => "Prickly Sida",
            Self::Purslane => "Purslane",
            Self::Ragweed => "Ragweed",
            Self::Sicklepod => "Sicklepod",
            Self::SpottedSpurge => "SpottedSpurge",
            Self::SpurredAnoda => "SpurredAnoda",
            Self::Swinecress => "Swinecress",
            Self::Waterhemp => "Waterhemp",
        }
    }

    /// Resolves a classifier label. Matching is exact; label strings are
    /// case-sensitive in the trained label set.
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|l| l.as_str() == label)
    }
}

impl fmt::Display for WeedLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The default label set, in classifier output order.
pub fn default_label_set() -> Vec<String> {
    WeedLabel::ALL.iter().map(|l| l.as_str().to_string()).collect()
}

/// Descriptive and treatment metadata for one weed species.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WeedRecord {
    pub description: String,
    pub general_recommendation: String,
    pub pesticides: Vec<String>,
    pub icon: String,
}

impl Default for WeedRecord {
    fn default() -> Self {
        Self {
            description: String::new(),
            general_recommendation: String::new(),
            pesticides: Vec::new(),
            icon: DEFAULT_ICON.to_string(),
        }
    }
}

impl WeedRecord {
    fn new(
        description: &str,
        recommendation: &str,
        pesticides: [&str; 4],
        icon: &str,
    ) -> Self {
        Self {
            description: description.to_string(),
            general_recommendation: recommendation.to_string(),
            pesticides: pesticides.iter().map(|p| p.to_string()).collect(),
            icon: icon.to_string(),
        }
    }
}

lazy_static! {
    static ref CATALOG: HashMap<WeedLabel, WeedRecord> = build_catalog();
}

fn record_for(label: WeedLabel) -> WeedRecord {
    use WeedLabel::*;
    match label {
        Carpetweeds => WeedRecord::new(
            "Low-growing summer annual weeds that form dense mats.",
            "Use pre-emergent herbicides like Pendimethalin or post-emergent like 2,4-D. Mulching can help prevent growth.",
            ["Pendimethalin", "2,4-D", "Dicamba", "Atrazine"],
            "🌱",
        ),
        Crabgrass => WeedRecord::new(
            "Annual grassy weed that spreads quickly in thin lawns.",
            "Apply pre-emergent herbicides in early spring. For established plants, use post-emergent herbicides containing Quinclorac.",
            ["Quinclorac", "Dithiopyr", "Prodiamine", "Glyphosate"],
            "🌾",
        ),
        Eclipta => WeedRecord::new(
            "Annual broadleaf weed with white flowers, often found in wet areas.",
            "Control with glyphosate or paraquat for non-selective treatment. In crops, use 2,4-D or dicamba.",
            ["Glyphosate", "Paraquat", "2,4-D", "Dicamba"],
            "🌼",
        ),
        Goosegrass => WeedRecord::new(
            "Annual grassy weed with flattened stems that forms a rosette pattern.",
            "Apply pre-emergent herbicides like oxadiazon in spring. For post-emergence, use fenoxaprop or diclofop.",
            ["Oxadiazon", "Fenoxaprop", "Diclofop", "Glyphosate"],
            "🌿",
        ),
        Morningglory => WeedRecord::new(
            "Climbing annual vine with heart-shaped leaves and trumpet-shaped flowers.",
            "Use pre-emergence herbicides like flumioxazin. Post-emergence control with 2,4-D or dicamba.",
            ["Flumioxazin", "2,4-D", "Dicamba", "Atrazine"],
            "🌸",
        ),
        Nutsedge => WeedRecord::new(
            "Perennial sedge with triangular stems and yellowish-brown flower clusters.",
            "Apply selective herbicides containing halosulfuron or sulfentrazone. Requires persistent treatment.",
            ["Halosulfuron", "Sulfentrazone", "Bentazon", "Imazaquin"],
            "🌾",
        ),
        PalmerAmaranth => WeedRecord::new(
            "Aggressive annual pigweed with rapid growth and prolific seed production.",
            "Use PPO-inhibiting herbicides and residual herbicides. Practice crop rotation and tillage.",
            ["Fomesafen", "Lactofen", "S-metolachlor", "Glufosinate"],
            "🌿",
        ),
        PricklySida => WeedRecord::new(
            "Annual broadleaf weed with spiny seed pods and yellow flowers.",
            "Apply pre-emergent herbicides in early spring. For established plants, use 2,4-D or dicamba.",
            ["2,4-D", "Dicamba", "Bromoxynil", "Bentazon"],
            "🌵",
        ),
        Purslane => WeedRecord::new(
            "Succulent annual with reddish stems and small yellow flowers.",
            "Apply mulch to suppress growth. Use glyphosate for non-selective control or 2,4-D for selective control.",
            ["Glyphosate", "2,4-D", "Oxadiazon", "Oryzalin"],
            "🌱",
        ),
        Ragweed => WeedRecord::new(
            "Annual with deeply lobed leaves and tiny greenish flowers in terminal spikes.",
            "Control with pre-emergence herbicides in spring. Post-emergence, use 2,4-D or dicamba.",
            ["2,4-D", "Dicamba", "Atrazine", "Glyphosate"],
            "🌿",
        ),
        Sicklepod => WeedRecord::new(
            "Annual legume with yellow flowers and curved seed pods.",
            "Apply pre-emergence herbicides like metribuzin. For post-emergence, use acifluorfen or lactofen.",
            ["Metribuzin", "Acifluorfen", "Lactofen", "Glyphosate"],
            "🌱",
        ),
        SpottedSpurge => WeedRecord::new(
            "Low-growing annual with milky sap and distinctive red spot on each leaf.",
            "Use pre-emergence herbicides like isoxaben. Post-emergence, apply triclopyr or 2,4-D.",
            ["Isoxaben", "Triclopyr", "2,4-D", "Glyphosate"],
            "🍃",
        ),
        SpurredAnoda => WeedRecord::new(
            "Annual broadleaf with maple-like leaves and lavender to purple flowers.",
            "Control with pre-emergence herbicides in spring. Post-emergence, use 2,4-D or dicamba.",
            ["2,4-D", "Dicamba", "Bromoxynil", "Glyphosate"],
            "🌸",
        ),
        Swinecress => WeedRecord::new(
            "Winter annual with deeply lobed leaves and small white flowers.",
            "Apply post-emergence herbicides containing 2,4-D or dicamba. Pre-emergence control with isoxaben.",
            ["2,4-D", "Dicamba", "Isoxaben", "Glyphosate"],
            "🌿",
        ),
        Waterhemp => WeedRecord::new(
            "Tall annual pigweed with lance-shaped leaves and multiple herbicide resistances.",
            "Use overlapping residual herbicides. Integrate mechanical and cultural control methods.",
            ["S-metolachlor", "Fomesafen", "Dicamba", "Glufosinate"],
            "🌱",
        ),
    }
}

fn build_catalog() -> HashMap<WeedLabel, WeedRecord> {
    debug!("Building weed catalog with {} records", WeedLabel::ALL.len());
    WeedLabel::ALL
        .iter()
        .map(|&label| (label, record_for(label)))
        .collect()
}

/// Returns the catalog record for a known label, if any.
pub fn get(label: WeedLabel) -> Option<&'static WeedRecord> {
    CATALOG.get(&label)
}

/// Looks up the record for a label string.
///
/// Unknown labels are not an error: they yield `WeedRecord::default()`, which
/// has empty text fields, no pesticides and the default icon.
pub fn lookup(label: &str) -> WeedRecord {
    WeedLabel::from_label(label)
        .and_then(get)
        .cloned()
        .unwrap_or_default()
}

/// Problems found when checking a classifier label set
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LabelSetError {
    #[error("Label set is empty")]
    Empty,
    #[error("Duplicate label '{0}' in label set")]
    Duplicate(String),
}

/// Checks a classifier label set before it is used for predictions.
///
/// Labels without a catalog record are accepted and logged, since a missing
/// record is handled downstream with empty defaults.
pub fn validate_label_set(labels: &[String]) -> Result<(), LabelSetError> {
    if labels.is_empty() {
        return Err(LabelSetError::Empty);
    }

    let mut seen = HashSet::with_capacity(labels.len());
    for label in labels {
        if !seen.insert(label.as_str()) {
            return Err(LabelSetError::Duplicate(label.clone()));
        }
        if WeedLabel::from_label(label).is_none() {
            warn!("Label '{}' has no catalog record; recommendations will be empty", label);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_label_has_a_record() {
        for label in WeedLabel::ALL {
            let record = get(label).expect("missing catalog record");
            assert!(!record.description.is_empty());
            assert_eq!(record.pesticides.len(), 4);
        }
    }

    #[test]
    fn test_label_strings_round_trip() {
        for label in WeedLabel::ALL {
            assert_eq!(WeedLabel::from_label(label.as_str()), Some(label));
        }
        assert_eq!(WeedLabel::from_label("Prickly Sida"), Some(WeedLabel::PricklySida));
        assert_eq!(WeedLabel::from_label("crabgrass"), None);
    }

    #[test]
    fn test_lookup_known_label() {
        let record = lookup("Crabgrass");
        assert_eq!(record.icon, "🌾");
        assert_eq!(
            record.pesticides,
            vec!["Quinclorac", "Dithiopyr", "Prodiamine", "Glyphosate"]
        );
        assert!(record.general_recommendation.starts_with("Apply pre-emergent"));
    }

    #[test]
    fn test_lookup_unknown_label() {
        let record = lookup("NotARealWeed");
        assert!(record.description.is_empty());
        assert!(record.general_recommendation.is_empty());
        assert!(record.pesticides.is_empty());
        assert_eq!(record.icon, DEFAULT_ICON);
    }

    #[test]
    fn test_lookup_is_idempotent() {
        let first = lookup("SpottedSpurge");
        for _ in 0..5 {
            let again = lookup("SpottedSpurge");
            assert_eq!(again.icon, first.icon);
            assert_eq!(again.description, first.description);
        }
    }

    #[test]
    fn test_default_label_set_order() {
        let labels = default_label_set();
        assert_eq!(labels.len(), 15);
        assert_eq!(labels[0], "Carpetweeds");
        assert_eq!(labels[7], "Prickly Sida");
        assert_eq!(labels[14], "Waterhemp");
    }

    #[test]
    fn test_validate_label_set() {
        assert!(validate_label_set(&default_label_set()).is_ok());
        assert_eq!(validate_label_set(&[]), Err(LabelSetError::Empty));

        let dup = vec!["Eclipta".to_string(), "Eclipta".to_string()];
        assert_eq!(
            validate_label_set(&dup),
            Err(LabelSetError::Duplicate("Eclipta".to_string()))
        );

        // Unknown labels are allowed
        let custom = vec!["Eclipta".to_string(), "Dandelion".to_string()];
        assert!(validate_label_set(&custom).is_ok());
    }

    #[test]
    fn test_concurrent_lookup() {
        let handles: Vec<_> = (0..4)
            .map(|_| std::thread::spawn(|| lookup("Waterhemp")))
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap().icon, "🌱");
        }
    }
}
