//! Risk scoring rules shared by every analysis kind.
//! A score is the sum of six criteria worth 0–2 points each, so it lives in 0..=12.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::VigitvaError;

pub const MAX_SCORE: u8 = 12;
pub const MAX_CRITERION_POINTS: u8 = 2;

/// Upper bound (inclusive) of the "faible" band.
pub const LOW_BAND_MAX: u8 = 4;
/// Upper bound (inclusive) of the "modéré" band.
pub const MODERATE_BAND_MAX: u8 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RiskLevel {
    #[serde(rename = "faible")]
    Faible,
    #[serde(rename = "modéré")]
    Modere,
    #[serde(rename = "élevé")]
    Eleve,
}

impl RiskLevel {
    pub const ALL: [RiskLevel; 3] = [RiskLevel::Faible, RiskLevel::Modere, RiskLevel::Eleve];

    /// Step function over integer scores: 0–4 faible, 5–8 modéré, 9 and above élevé.
    pub fn from_score(score: u8) -> Self {
        if score <= LOW_BAND_MAX {
            RiskLevel::Faible
        } else if score <= MODERATE_BAND_MAX {
            RiskLevel::Modere
        } else {
            RiskLevel::Eleve
        }
    }

    /// Same thresholds applied to an average score.
    pub fn from_average(avg: f64) -> Self {
        if avg <= LOW_BAND_MAX as f64 {
            RiskLevel::Faible
        } else if avg <= MODERATE_BAND_MAX as f64 {
            RiskLevel::Modere
        } else {
            RiskLevel::Eleve
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Faible => "faible",
            RiskLevel::Modere => "modéré",
            RiskLevel::Eleve  => "élevé",
        }
    }

    /// CSS class used by the HTML report.
    pub fn css_class(&self) -> &'static str {
        match self {
            RiskLevel::Faible => "risk-low",
            RiskLevel::Modere => "risk-moderate",
            RiskLevel::Eleve  => "risk-high",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RiskLevel {
    type Err = VigitvaError;

    /// Accepts the French labels, with or without accents.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "faible"                      => Ok(RiskLevel::Faible),
            "modéré" | "modere" | "modérée" => Ok(RiskLevel::Modere),
            "élevé" | "eleve" | "élevée"  => Ok(RiskLevel::Eleve),
            other => Err(VigitvaError::UnknownValue(format!("risk level '{}'", other))),
        }
    }
}

/// Count of analyses per risk level. Serialized with the French keys.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskDistribution {
    pub faible: usize,
    #[serde(rename = "modéré")]
    pub modere: usize,
    #[serde(rename = "élevé")]
    pub eleve: usize,
}

impl RiskDistribution {
    pub fn from_levels<I: IntoIterator<Item = RiskLevel>>(levels: I) -> Self {
        let mut dist = Self::default();
        for level in levels {
            dist.add(level);
        }
        dist
    }

    pub fn add(&mut self, level: RiskLevel) {
        match level {
            RiskLevel::Faible => self.faible += 1,
            RiskLevel::Modere => self.modere += 1,
            RiskLevel::Eleve  => self.eleve += 1,
        }
    }

    pub fn count(&self, level: RiskLevel) -> usize {
        match level {
            RiskLevel::Faible => self.faible,
            RiskLevel::Modere => self.modere,
            RiskLevel::Eleve  => self.eleve,
        }
    }

    pub fn total(&self) -> usize {
        self.faible + self.modere + self.eleve
    }

    /// Rounded share of each level, all zero when the distribution is empty.
    pub fn percentages(&self) -> LevelPercentages {
        let total = self.total();
        LevelPercentages {
            faible: percentage(self.faible, total),
            modere: percentage(self.modere, total),
            eleve:  percentage(self.eleve, total),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelPercentages {
    pub faible: u32,
    #[serde(rename = "modéré")]
    pub modere: u32,
    #[serde(rename = "élevé")]
    pub eleve: u32,
}

/// Round half towards positive infinity, as browsers do for `Math.round`.
pub fn round_half_up(x: f64) -> f64 {
    (x + 0.5).floor()
}

pub fn round_one_decimal(x: f64) -> f64 {
    round_half_up(x * 10.0) / 10.0
}

/// Integer percent of `part` over `total`; 0 when `total` is 0.
pub fn percentage(part: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    round_half_up(part as f64 / total as f64 * 100.0) as u32
}

/// Mean of the scores, 0.0 for an empty input.
pub fn average_score<I: IntoIterator<Item = u8>>(scores: I) -> f64 {
    let (sum, n) = scores
        .into_iter()
        .fold((0u64, 0u64), |(sum, n), s| (sum + s as u64, n + 1));
    if n == 0 { 0.0 } else { sum as f64 / n as f64 }
}

/// Company-size criterion derived from annual turnover in euros.
pub fn company_size_points(turnover: f64) -> u8 {
    if turnover > 10_000_000.0 {
        2
    } else if turnover > 2_000_000.0 {
        1
    } else {
        0
    }
}

pub const BASE_RECOMMENDATIONS: [&str; 3] = [
    "Vérifier la cohérence des montants TVA",
    "Contrôler l'existence réelle du fournisseur",
    "Valider les taux de TVA appliqués",
];

/// Canned recommendations for an invoice, by risk level.
pub fn invoice_recommendations(level: RiskLevel) -> Vec<String> {
    let extra: &[&str] = match level {
        RiskLevel::Eleve => &[
            "⚠️ Contrôle approfondi recommandé",
            "Vérification sur site du fournisseur",
            "Audit des factures similaires",
            "Contact direct avec l'administration fiscale",
        ],
        RiskLevel::Modere => &[
            "Contrôle documentaire renforcé",
            "Vérification des antécédents du fournisseur",
        ],
        RiskLevel::Faible => &["✅ Facture conforme aux standards"],
    };
    BASE_RECOMMENDATIONS
        .iter()
        .chain(extra.iter())
        .map(|s| s.to_string())
        .collect()
}
