//! Simulated analysis of accounting documents (FEC, TVA returns, journals,
//! bank statements).

use rand::Rng;
use uuid::Uuid;
use vigitva_common::risk::MAX_SCORE;
use vigitva_common::{
    AnalysisStatus, Anomaly, DocumentKind, NewDocumentAnalysis, Period, RiskLevel, Severity,
};

/// Canned output for one document kind.
struct Profile {
    anomalies: [(&'static str, &'static str, Severity); 3],
    /// Confidence range (inclusive) and cap.
    confidence: (u8, u8, u8),
    default_file: &'static str,
}

fn profile(kind: DocumentKind) -> Profile {
    use Severity::*;
    match kind {
        DocumentKind::Fec => Profile {
            anomalies: [
                ("Écritures déséquilibrées", "Détection de 12 écritures avec débit ≠ crédit", High),
                ("Comptes auxiliaires incohérents", "Variations anormales sur les comptes 411xxx", Medium),
                ("Dates d'écriture suspectes", "Concentration d'écritures en fin de période", Low),
            ],
            confidence: (80, 99, 100),
            default_file: "fichier_fec.csv",
        },
        DocumentKind::Tva => Profile {
            anomalies: [
                ("Écart TVA collectée/déductible", "Différence de 15% par rapport aux moyennes sectorielles", Medium),
                ("Taux de TVA incohérents", "Application de taux 5.5% sur prestations 20%", High),
                ("Crédit de TVA anormal", "Crédit persistant sur 3 périodes consécutives", Low),
            ],
            confidence: (85, 104, 100),
            default_file: "declaration_tva.pdf",
        },
        DocumentKind::Journal => Profile {
            anomalies: [
                ("Écritures d'ajustement suspectes", "Concentration d'ajustements en fin de période", Medium),
                ("Mouvements inter-comptes anormaux", "Virements répétés entre comptes sans justification", High),
                ("Séquences de numérotation manquantes", "Gaps dans la numérotation des pièces comptables", Low),
            ],
            confidence: (82, 96, 100),
            default_file: "journaux_comptables.csv",
        },
        DocumentKind::Bank => Profile {
            anomalies: [
                ("Virement inhabituel", "Virement de montant élevé vers un compte étranger", High),
                ("Mouvement suspect", "Encaissements fractionnés sous les seuils déclaratifs", Medium),
                ("Timing suspect", "Concentration de mouvements en fin de mois", Low),
            ],
            confidence: (80, 99, 100),
            default_file: "releves_bancaires.csv",
        },
    }
}

fn findings(kind: DocumentKind, anomalies: usize) -> Vec<String> {
    let lines: [String; 4] = match kind {
        DocumentKind::Fec => [
            "Analyse de 45,678 écritures comptables".into(),
            format!("{} anomalies détectées nécessitant une attention", anomalies),
            "Cohérence globale des comptes de TVA: 94%".into(),
            "Respect des obligations FEC: Conforme".into(),
        ],
        DocumentKind::Tva => [
            "Analyse de la déclaration CA3 complète".into(),
            format!("{} anomalies TVA détectées", anomalies),
            "Cohérence avec les obligations déclaratives: 91%".into(),
            "Respect des délais de déclaration: Conforme".into(),
        ],
        DocumentKind::Journal => [
            "Analyse de 12,456 écritures de journal".into(),
            format!("{} irrégularités comptables détectées", anomalies),
            "Cohérence de la chronologie: 89%".into(),
            "Respect des principes comptables: Conforme".into(),
        ],
        DocumentKind::Bank => [
            "Analyse de 3,842 mouvements bancaires".into(),
            format!("{} mouvements suspects identifiés", anomalies),
            "Rapprochement bancaire: 96%".into(),
            "Traçabilité des flux: Conforme".into(),
        ],
    };
    lines.into()
}

pub fn document_ai_message(kind: DocumentKind, level: RiskLevel, score: u8, anomalies: usize) -> String {
    match kind {
        DocumentKind::Fec => format!(
            "Analyse FEC DeepSeek : Le fichier présente un niveau de risque {level}. \
             Score calculé : {score}/12 points. {anomalies} anomalies détectées dans la structure comptable."
        ),
        DocumentKind::Tva => format!(
            "Analyse TVA DeepSeek : La déclaration présente un niveau de risque {level}. \
             Score calculé : {score}/12 points. Détection de {anomalies} anomalies dans les montants déclarés."
        ),
        DocumentKind::Journal => format!(
            "Analyse Journaux DeepSeek : Les journaux présentent un niveau de risque {level}. \
             Score calculé : {score}/12 points. {anomalies} irrégularités détectées dans les écritures comptables."
        ),
        DocumentKind::Bank => format!(
            "Analyse Flux Bancaires DeepSeek : Les flux présentent un niveau de risque {level}. \
             Score calculé : {score}/12 points. {anomalies} mouvements suspects détectés dans les relevés."
        ),
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DocumentAnalyzer;

impl DocumentAnalyzer {
    pub fn new() -> Self {
        Self
    }

    /// Produce a completed analysis for `kind`. A blank `file_name` falls
    /// back to the kind's default file name.
    pub fn analyze<R: Rng>(
        &self,
        kind: DocumentKind,
        company_id: Uuid,
        period: Period,
        file_name: Option<&str>,
        rng: &mut R,
    ) -> NewDocumentAnalysis {
        let profile = profile(kind);
        let risk_score = rng.gen_range(0..=MAX_SCORE);
        let risk_level = RiskLevel::from_score(risk_score);

        let anomalies: Vec<Anomaly> = profile
            .anomalies
            .iter()
            .map(|(label, description, severity)| Anomaly::new(label, description, *severity))
            .collect();

        let (lo, hi, cap) = profile.confidence;
        let confidence = rng.gen_range(lo..=hi).min(cap);

        let file_name = match file_name.map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => profile.default_file.to_string(),
        };

        tracing::debug!(kind = %kind, %company_id, score = risk_score, "Document analysed");

        NewDocumentAnalysis {
            kind,
            company_id,
            period,
            file_name,
            status: AnalysisStatus::Completed,
            risk_score,
            risk_level,
            findings: findings(kind, anomalies.len()),
            ai_message: document_ai_message(kind, risk_level, risk_score, anomalies.len()),
            confidence,
            anomalies,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use vigitva_test_utils::seeded_rng;

    fn q1() -> Period {
        Period {
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 3, 31).unwrap(),
        }
    }

    #[test]
    fn test_fec_analysis_shape() {
        let a = DocumentAnalyzer::new().analyze(DocumentKind::Fec, Uuid::new_v4(), q1(), Some("fec_2024.csv"), &mut seeded_rng(5));
        assert_eq!(a.file_name, "fec_2024.csv");
        assert_eq!(a.status, AnalysisStatus::Completed);
        assert_eq!(a.anomalies.len(), 3);
        assert_eq!(a.anomalies[0].severity, Severity::High);
        assert_eq!(a.findings[1], "3 anomalies détectées nécessitant une attention");
        assert_eq!(a.risk_level, RiskLevel::from_score(a.risk_score));
        assert!(a.ai_message.starts_with("Analyse FEC DeepSeek : Le fichier présente"));
        assert!(a.ai_message.ends_with("3 anomalies détectées dans la structure comptable."));
    }

    #[test]
    fn test_confidence_ranges_per_kind() {
        let analyzer = DocumentAnalyzer::new();
        let mut rng = seeded_rng(11);
        for _ in 0..300 {
            let tva = analyzer.analyze(DocumentKind::Tva, Uuid::new_v4(), q1(), None, &mut rng);
            assert!((85..=100).contains(&tva.confidence));
            let journal = analyzer.analyze(DocumentKind::Journal, Uuid::new_v4(), q1(), None, &mut rng);
            assert!((82..=96).contains(&journal.confidence));
            let bank = analyzer.analyze(DocumentKind::Bank, Uuid::new_v4(), q1(), None, &mut rng);
            assert!((80..=99).contains(&bank.confidence));
            assert!(bank.risk_score <= 12);
        }
    }

    #[test]
    fn test_tva_confidence_cap_is_hit() {
        let analyzer = DocumentAnalyzer::new();
        let mut rng = seeded_rng(3);
        let capped = (0..500)
            .map(|_| analyzer.analyze(DocumentKind::Tva, Uuid::new_v4(), q1(), None, &mut rng).confidence)
            .filter(|c| *c == 100)
            .count();
        // 100..=104 all collapse to 100
        assert!(capped > 50);
    }

    #[test]
    fn test_blank_file_name_uses_default() {
        let a = DocumentAnalyzer::new().analyze(DocumentKind::Journal, Uuid::new_v4(), q1(), Some("  "), &mut seeded_rng(1));
        assert_eq!(a.file_name, "journaux_comptables.csv");
    }
}
