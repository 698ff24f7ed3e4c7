//! Invoice risk scoring on the six-criterion grid.
//!
//! Only `company_size` is derived from data (the company's turnover); the
//! other five criteria are drawn uniformly from `0..=2`.

use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use vigitva_common::risk::{company_size_points, invoice_recommendations, MAX_CRITERION_POINTS};
use vigitva_common::{Company, Criteria, NewInvoiceAnalysis, RiskLevel};

/// Confidence is drawn from this inclusive range, in percent.
pub const INVOICE_CONFIDENCE: (u8, u8) = (80, 99);

/// Outcome of scoring one invoice, before it is tied to a stored analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceVerdict {
    pub criteria: Criteria,
    pub risk_score: u8,
    pub risk_level: RiskLevel,
    pub recommendations: Vec<String>,
    pub ai_message: String,
    pub confidence: u8,
}

impl InvoiceVerdict {
    pub fn into_new_analysis(
        self,
        company_id: Uuid,
        supplier_id: Uuid,
        invoice_file: Option<String>,
        invoice_url: Option<String>,
    ) -> NewInvoiceAnalysis {
        NewInvoiceAnalysis {
            company_id,
            supplier_id,
            invoice_file,
            invoice_url,
            risk_score: self.risk_score,
            risk_level: self.risk_level,
            criteria: self.criteria,
            recommendations: self.recommendations,
            ai_message: Some(self.ai_message),
            confidence: self.confidence,
        }
    }
}

pub fn invoice_ai_message(level: RiskLevel, score: u8) -> String {
    format!(
        "Analyse IA DeepSeek : Cette facture présente un niveau de risque {}. \
         Score calculé : {}/12 points selon notre grille d'évaluation BTP.",
        level, score
    )
}

#[derive(Debug, Clone, Copy, Default)]
pub struct InvoiceScorer;

impl InvoiceScorer {
    pub fn new() -> Self {
        Self
    }

    pub fn draw_criteria<R: Rng>(&self, company_turnover: f64, rng: &mut R) -> Criteria {
        let mut draw = || rng.gen_range(0..=MAX_CRITERION_POINTS);
        Criteria {
            subcontracting_rate: draw(),
            company_size: company_size_points(company_turnover),
            fiscal_history: draw(),
            supplier_count: draw(),
            invoice_volume: draw(),
            operation_complexity: draw(),
        }
    }

    pub fn score<R: Rng>(&self, company: &Company, rng: &mut R) -> InvoiceVerdict {
        let criteria = self.draw_criteria(company.turnover, rng);
        let risk_score = criteria.total();
        let risk_level = RiskLevel::from_score(risk_score);
        let confidence = rng.gen_range(INVOICE_CONFIDENCE.0..=INVOICE_CONFIDENCE.1);

        tracing::debug!(
            company_id = %company.id,
            score = risk_score,
            level = %risk_level,
            "Invoice scored"
        );

        InvoiceVerdict {
            criteria,
            risk_score,
            risk_level,
            recommendations: invoice_recommendations(risk_level),
            ai_message: invoice_ai_message(risk_level, risk_score),
            confidence,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use vigitva_test_utils::{new_company, seeded_rng};

    #[test]
    fn test_score_is_consistent_with_criteria() {
        let company = new_company("Groupe Vinci Construction", 45_000_000.0)
            .into_company(Uuid::new_v4(), Utc::now());
        let scorer = InvoiceScorer::new();
        let mut rng = seeded_rng(42);

        for _ in 0..200 {
            let v = scorer.score(&company, &mut rng);
            assert!(v.criteria.is_in_range());
            assert_eq!(v.criteria.company_size, 2);
            assert_eq!(v.risk_score, v.criteria.total());
            assert_eq!(v.risk_level, RiskLevel::from_score(v.risk_score));
            assert!((80..=99).contains(&v.confidence));
            assert_eq!(v.recommendations, invoice_recommendations(v.risk_level));
        }
    }

    #[test]
    fn test_small_company_gets_zero_size_points() {
        let company = new_company("Plomberie Express", 1_500_000.0)
            .into_company(Uuid::new_v4(), Utc::now());
        let v = InvoiceScorer::new().score(&company, &mut seeded_rng(1));
        assert_eq!(v.criteria.company_size, 0);
    }

    #[test]
    fn test_same_seed_same_verdict() {
        let company = new_company("Maçonnerie Moderne", 3_200_000.0)
            .into_company(Uuid::new_v4(), Utc::now());
        let scorer = InvoiceScorer::new();
        assert_eq!(scorer.score(&company, &mut seeded_rng(9)), scorer.score(&company, &mut seeded_rng(9)));
    }

    #[test]
    fn test_ai_message_template() {
        assert_eq!(
            invoice_ai_message(RiskLevel::Modere, 6),
            "Analyse IA DeepSeek : Cette facture présente un niveau de risque modéré. \
             Score calculé : 6/12 points selon notre grille d'évaluation BTP."
        );
    }
}
