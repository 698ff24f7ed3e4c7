//! French VAT simulator for construction work: HT/TTC conversion with a few
//! sanity checks on the resulting amounts.

use serde::{Deserialize, Serialize};

use crate::error::{Result, VigitvaError};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VatRate {
    pub rate: f64,
    pub label: &'static str,
    pub description: &'static str,
}

pub const VAT_RATES: [VatRate; 4] = [
    VatRate { rate: 20.0, label: "20% (Taux normal)",        description: "Travaux de construction, rénovation" },
    VatRate { rate: 10.0, label: "10% (Taux intermédiaire)", description: "Amélioration, transformation" },
    VatRate { rate: 5.5,  label: "5,5% (Taux réduit)",       description: "Rénovation énergétique" },
    VatRate { rate: 2.1,  label: "2,1% (Taux super réduit)", description: "Médicaments, presse" },
];

pub fn find_rate(rate: f64) -> Option<&'static VatRate> {
    VAT_RATES.iter().find(|r| (r.rate - rate).abs() < f64::EPSILON)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CalculationMode {
    HtToTtc,
    TtcToHt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnomalyLevel {
    Warning,
    Info,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VatAnomaly {
    #[serde(rename = "type")]
    pub level: AnomalyLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VatBreakdown {
    pub ht_amount: f64,
    pub ttc_amount: f64,
    pub vat_amount: f64,
    pub rate: f64,
    pub anomalies: Vec<VatAnomaly>,
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Convert `amount` in the given direction at `rate` percent.
///
/// Only the four legal rates are accepted. Anomaly checks run on the
/// unrounded figures; the returned amounts are rounded to the cent.
pub fn calculate(amount: f64, rate: f64, mode: CalculationMode) -> Result<VatBreakdown> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(VigitvaError::Validation("amount must be a positive number".into()));
    }
    let rate = find_rate(rate)
        .ok_or_else(|| VigitvaError::UnknownValue(format!("VAT rate {}", rate)))?
        .rate;

    let (ht, ttc, vat) = match mode {
        CalculationMode::HtToTtc => {
            let vat = amount * rate / 100.0;
            (amount, amount + vat, vat)
        }
        CalculationMode::TtcToHt => {
            let ht = amount / (1.0 + rate / 100.0);
            (ht, amount, amount - ht)
        }
    };

    let mut anomalies = Vec::new();
    if amount > 100_000.0 {
        anomalies.push(VatAnomaly {
            level: AnomalyLevel::Warning,
            message: "Montant élevé - Vérifier la cohérence avec le type de travaux".into(),
        });
    }
    if rate == 20.0 && amount < 1000.0 {
        anomalies.push(VatAnomaly {
            level: AnomalyLevel::Info,
            message: "Pour de petits montants, vérifier si le taux réduit s'applique".into(),
        });
    }
    if vat.fract() == 0.0 && vat > 100.0 {
        anomalies.push(VatAnomaly {
            level: AnomalyLevel::Warning,
            message: "Montant de TVA rond - Vérifier le calcul".into(),
        });
    }

    Ok(VatBreakdown {
        ht_amount: round2(ht),
        ttc_amount: round2(ttc),
        vat_amount: round2(vat),
        rate,
        anomalies,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ht_to_ttc_at_normal_rate() {
        let r = calculate(1234.0, 20.0, CalculationMode::HtToTtc).unwrap();
        assert_eq!(r.vat_amount, 246.8);
        assert_eq!(r.ttc_amount, 1480.8);
        assert!(r.anomalies.is_empty());
    }

    #[test]
    fn test_ttc_to_ht_at_reduced_rate() {
        let r = calculate(1055.0, 5.5, CalculationMode::TtcToHt).unwrap();
        assert_eq!(r.ht_amount, 1000.0);
        assert_eq!(r.vat_amount, 55.0);
    }

    #[test]
    fn test_rejects_non_positive_and_nan() {
        assert!(calculate(0.0, 20.0, CalculationMode::HtToTtc).is_err());
        assert!(calculate(-5.0, 20.0, CalculationMode::HtToTtc).is_err());
        assert!(calculate(f64::NAN, 20.0, CalculationMode::HtToTtc).is_err());
    }

    #[test]
    fn test_rejects_unknown_rate() {
        assert!(calculate(100.0, 7.0, CalculationMode::HtToTtc).is_err());
    }

    #[test]
    fn test_flags_large_round_amount() {
        let r = calculate(150_000.0, 20.0, CalculationMode::HtToTtc).unwrap();
        let levels: Vec<_> = r.anomalies.iter().map(|a| a.level).collect();
        // > 100k and a whole-euro VAT of 30 000
        assert_eq!(levels, vec![AnomalyLevel::Warning, AnomalyLevel::Warning]);
    }

    #[test]
    fn test_small_amount_at_normal_rate_gets_info() {
        let r = calculate(500.0, 20.0, CalculationMode::HtToTtc).unwrap();
        assert_eq!(r.anomalies.len(), 1);
        assert_eq!(r.anomalies[0].level, AnomalyLevel::Info);
    }

    #[test]
    fn test_mode_parses_kebab_case() {
        let m: CalculationMode = serde_json::from_str("\"ttc-to-ht\"").unwrap();
        assert_eq!(m, CalculationMode::TtcToHt);
    }
}
