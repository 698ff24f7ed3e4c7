//! Downloadable reports: per-analysis CSV and HTML, and the global text
//! report, plus the filters of the reports listing.

use chrono::{DateTime, Duration, Utc};
use csv::{QuoteStyle, Terminator, WriterBuilder};
use minijinja::{context, Environment};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;
use vigitva_common::{
    Company, Criteria, DocumentAnalysis, InvoiceAnalysis, RiskDistribution, RiskLevel, Supplier,
};

pub const UNKNOWN_COMPANY: &str = "Entreprise inconnue";
pub const UNKNOWN_SUPPLIER: &str = "Fournisseur inconnu";

const REPORT_TEMPLATE: &str = include_str!("../templates/report.html");

/// `toLocaleString("fr-FR")`
const FR_DATE_TIME: &str = "%d/%m/%Y %H:%M:%S";
/// `toLocaleDateString("fr-FR")`
const FR_DATE: &str = "%d/%m/%Y";

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Report is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
    #[error("Template error: {0}")]
    Template(#[from] minijinja::Error),
}

pub type Result<T> = std::result::Result<T, ReportError>;

// ── Names ────────────────────────────────────────────────────────────────────

/// Company and supplier names by id, with the fallback labels for ids that
/// no longer resolve.
#[derive(Debug, Clone, Default)]
pub struct NameBook {
    companies: HashMap<Uuid, String>,
    suppliers: HashMap<Uuid, String>,
}

impl NameBook {
    pub fn new(companies: &[Company], suppliers: &[Supplier]) -> Self {
        Self {
            companies: companies.iter().map(|c| (c.id, c.name.clone())).collect(),
            suppliers: suppliers.iter().map(|s| (s.id, s.name.clone())).collect(),
        }
    }

    pub fn company(&self, id: Uuid) -> &str {
        self.companies.get(&id).map(String::as_str).unwrap_or(UNKNOWN_COMPANY)
    }

    pub fn supplier(&self, id: Uuid) -> &str {
        self.suppliers.get(&id).map(String::as_str).unwrap_or(UNKNOWN_SUPPLIER)
    }
}

// ── Report data ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportData {
    pub id: Uuid,
    pub company_name: String,
    pub supplier_name: String,
    pub invoice_file: Option<String>,
    pub invoice_url: Option<String>,
    pub risk_score: u8,
    pub risk_level: RiskLevel,
    pub criteria: Criteria,
    pub recommendations: Vec<String>,
    pub ai_message: String,
    pub confidence: u8,
    pub created_at: DateTime<Utc>,
}

impl ReportData {
    pub fn from_invoice(analysis: &InvoiceAnalysis, names: &NameBook) -> Self {
        Self {
            id: analysis.id,
            company_name: names.company(analysis.company_id).to_string(),
            supplier_name: names.supplier(analysis.supplier_id).to_string(),
            invoice_file: analysis.invoice_file.clone(),
            invoice_url: analysis.invoice_url.clone(),
            risk_score: analysis.risk_score,
            risk_level: analysis.risk_level,
            criteria: analysis.criteria,
            recommendations: analysis.recommendations.clone(),
            ai_message: analysis.ai_message.clone().unwrap_or_default(),
            confidence: analysis.confidence,
            created_at: analysis.created_at,
        }
    }

    /// Document analyses have no supplier or criteria grid: the kind's
    /// subject stands in for the supplier and findings replace recommendations.
    pub fn from_document(analysis: &DocumentAnalysis, names: &NameBook) -> Self {
        Self {
            id: analysis.id,
            company_name: names.company(analysis.company_id).to_string(),
            supplier_name: analysis.kind.report_subject().to_string(),
            invoice_file: Some(analysis.file_name.clone()),
            invoice_url: None,
            risk_score: analysis.risk_score,
            risk_level: analysis.risk_level,
            criteria: Criteria::default(),
            recommendations: analysis.findings.clone(),
            ai_message: analysis.ai_message.clone(),
            confidence: analysis.confidence,
            created_at: analysis.created_at,
        }
    }

    /// File name or URL, `N/A` when neither is set.
    pub fn source(&self) -> &str {
        self.invoice_file
            .as_deref()
            .filter(|s| !s.is_empty())
            .or_else(|| self.invoice_url.as_deref().filter(|s| !s.is_empty()))
            .unwrap_or("N/A")
    }
}

// ── CSV ──────────────────────────────────────────────────────────────────────

pub fn csv_report(data: &ReportData) -> Result<String> {
    let c = &data.criteria;
    let rows: Vec<[String; 2]> = vec![
        ["Champ".into(), "Valeur".into()],
        ["ID Analyse".into(), data.id.to_string()],
        ["Entreprise".into(), data.company_name.clone()],
        ["Fournisseur".into(), data.supplier_name.clone()],
        ["Fichier/URL".into(), data.source().to_string()],
        ["Score de Risque".into(), format!("{}/12", data.risk_score)],
        ["Niveau de Risque".into(), data.risk_level.to_string()],
        ["Taux de Sous-traitance".into(), format!("{}/2", c.subcontracting_rate)],
        ["Taille Entreprise".into(), format!("{}/2", c.company_size)],
        ["Antécédents Fiscaux".into(), format!("{}/2", c.fiscal_history)],
        ["Nombre Fournisseurs".into(), format!("{}/2", c.supplier_count)],
        ["Volume Factures".into(), format!("{}/2", c.invoice_volume)],
        ["Complexité Opérations".into(), format!("{}/2", c.operation_complexity)],
        ["Confiance IA".into(), format!("{}%", data.confidence)],
        ["Message IA".into(), data.ai_message.clone()],
        ["Date Analyse".into(), data.created_at.format(FR_DATE_TIME).to_string()],
        ["Recommandations".into(), data.recommendations.join(" | ")],
    ];

    let mut writer = WriterBuilder::new()
        .quote_style(QuoteStyle::Always)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    for row in &rows {
        writer.write_record(row)?;
    }
    let bytes = writer.into_inner().map_err(|e| e.into_error())?;
    let mut out = String::from_utf8(bytes)?;
    if out.ends_with('\n') {
        out.pop();
    }
    Ok(out)
}

// ── HTML ─────────────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct CriterionRow {
    label: &'static str,
    value: u8,
}

const CRITERIA_LABELS: [&str; 6] = [
    "Taux de Sous-traitance",
    "Taille de l'Entreprise",
    "Antécédents Fiscaux",
    "Nombre de Fournisseurs",
    "Volume de Factures",
    "Complexité des Opérations",
];

/// Standalone HTML page; every interpolated value is escaped.
pub fn html_report(data: &ReportData) -> Result<String> {
    let mut env = Environment::new();
    env.add_template("report.html", REPORT_TEMPLATE)?;
    let criteria: Vec<CriterionRow> = CRITERIA_LABELS
        .iter()
        .zip(data.criteria.values())
        .map(|(label, value)| CriterionRow { label: *label, value })
        .collect();

    let html = env.get_template("report.html")?.render(context! {
        report => data,
        source => data.source(),
        risk_class => data.risk_level.css_class(),
        generated_at => data.created_at.format(FR_DATE_TIME).to_string(),
        criteria => criteria,
    })?;
    Ok(html)
}

// ── Global text report ───────────────────────────────────────────────────────

pub fn global_text_report(analyses: &[InvoiceAnalysis], names: &NameBook, now: DateTime<Utc>) -> String {
    let dist = RiskDistribution::from_levels(analyses.iter().map(|a| a.risk_level));
    let pct = dist.percentages();

    let mut out = format!(
        "RAPPORT GLOBAL DE DÉTECTION DE FRAUDE TVA\n\
         Généré le: {}\n\
         \n\
         STATISTIQUES GÉNÉRALES:\n\
         - Total des analyses: {}\n\
         - Risque faible: {} ({}%)\n\
         - Risque modéré: {} ({}%)\n\
         - Risque élevé: {} ({}%)\n\
         \n\
         ANALYSES DÉTAILLÉES:\n",
        now.format(FR_DATE),
        analyses.len(),
        dist.faible, pct.faible,
        dist.modere, pct.modere,
        dist.eleve, pct.eleve,
    );
    for a in analyses {
        out.push_str(&format!(
            "\n- {} / {}\n  Score: {}/12 ({})\n  Date: {}\n  Recommandations: {}\n",
            names.company(a.company_id),
            names.supplier(a.supplier_id),
            a.risk_score,
            a.risk_level,
            a.created_at.format(FR_DATE),
            a.recommendations.join(", "),
        ));
    }
    out.push('\n');
    out
}

// ── Download names ───────────────────────────────────────────────────────────

pub fn invoice_report_filename(id: Uuid, extension: &str) -> String {
    format!("rapport-analyse-{}.{}", id, extension)
}

pub fn document_report_filename(analysis: &DocumentAnalysis, extension: &str) -> String {
    format!("rapport-{}-{}.{}", analysis.kind.as_str(), analysis.id, extension)
}

pub fn global_report_filename(now: DateTime<Utc>) -> String {
    format!("rapport-global-{}.txt", now.format("%Y-%m-%d"))
}

// ── Listing filters ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportPeriod {
    Week,
    Month,
    #[default]
    All,
}

impl ReportPeriod {
    pub fn window(&self) -> Option<Duration> {
        match self {
            ReportPeriod::Week => Some(Duration::days(7)),
            ReportPeriod::Month => Some(Duration::days(30)),
            ReportPeriod::All => None,
        }
    }
}

/// `all` or a single risk level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum LevelFilter {
    #[default]
    All,
    Only(RiskLevel),
}

impl FromStr for LevelFilter {
    type Err = vigitva_common::VigitvaError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") || s.trim().is_empty() {
            return Ok(LevelFilter::All);
        }
        s.parse().map(LevelFilter::Only)
    }
}

impl TryFrom<String> for LevelFilter {
    type Error = vigitva_common::VigitvaError;

    fn try_from(s: String) -> std::result::Result<Self, Self::Error> {
        s.parse()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ReportFilter {
    pub search: String,
    pub level: LevelFilter,
    pub period: ReportPeriod,
}

impl ReportFilter {
    pub fn matches(&self, analysis: &InvoiceAnalysis, names: &NameBook, now: DateTime<Utc>) -> bool {
        let needle = self.search.to_lowercase();
        let matches_search = needle.is_empty()
            || names.company(analysis.company_id).to_lowercase().contains(&needle)
            || names.supplier(analysis.supplier_id).to_lowercase().contains(&needle);

        let matches_level = match self.level {
            LevelFilter::All => true,
            LevelFilter::Only(level) => analysis.risk_level == level,
        };

        let matches_period = match self.period.window() {
            Some(window) => analysis.created_at >= now - window,
            None => true,
        };

        matches_search && matches_level && matches_period
    }

    pub fn apply<'a>(
        &self,
        analyses: &'a [InvoiceAnalysis],
        names: &NameBook,
        now: DateTime<Utc>,
    ) -> Vec<&'a InvoiceAnalysis> {
        analyses.iter().filter(|a| self.matches(a, names, now)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use vigitva_common::{AnalysisStatus, DocumentKind, Period};
    use vigitva_test_utils::{new_company, new_supplier};

    fn fixture() -> (NameBook, InvoiceAnalysis) {
        let company = new_company("Bâti Sud", 3_000_000.0).into_company(Uuid::new_v4(), Utc::now());
        let supplier = new_supplier("Échafaudages Martin").into_supplier(Uuid::new_v4(), Utc::now());
        let analysis = InvoiceAnalysis {
            id: Uuid::nil(),
            company_id: company.id,
            supplier_id: supplier.id,
            invoice_file: Some("facture-042.pdf".into()),
            invoice_url: None,
            risk_score: 7,
            risk_level: RiskLevel::Modere,
            criteria: Criteria {
                subcontracting_rate: 2,
                company_size: 1,
                fiscal_history: 1,
                supplier_count: 1,
                invoice_volume: 1,
                operation_complexity: 1,
            },
            recommendations: vec!["Vérifier le SIRET".into(), "Contrôler les montants".into()],
            ai_message: Some("Risque \"modéré\"".into()),
            confidence: 91,
            created_at: Utc.with_ymd_and_hms(2024, 3, 5, 14, 7, 9).unwrap(),
        };
        (NameBook::new(&[company], &[supplier]), analysis)
    }

    #[test]
    fn test_csv_rows_and_quoting() {
        let (names, analysis) = fixture();
        let csv = csv_report(&ReportData::from_invoice(&analysis, &names)).unwrap();
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines.len(), 17);
        assert_eq!(lines[0], r#""Champ","Valeur""#);
        assert_eq!(lines[2], r#""Entreprise","Bâti Sud""#);
        assert_eq!(lines[4], r#""Fichier/URL","facture-042.pdf""#);
        assert_eq!(lines[5], r#""Score de Risque","7/12""#);
        assert_eq!(lines[7], r#""Taux de Sous-traitance","2/2""#);
        assert_eq!(lines[13], r#""Confiance IA","91%""#);
        assert_eq!(lines[14], r#""Message IA","Risque ""modéré""""#);
        assert_eq!(lines[15], r#""Date Analyse","05/03/2024 14:07:09""#);
        assert_eq!(lines[16], r#""Recommandations","Vérifier le SIRET | Contrôler les montants""#);
        assert!(!csv.ends_with('\n'));
    }

    #[test]
    fn test_unknown_names_fall_back() {
        let (_, analysis) = fixture();
        let data = ReportData::from_invoice(&analysis, &NameBook::default());
        assert_eq!(data.company_name, UNKNOWN_COMPANY);
        assert_eq!(data.supplier_name, UNKNOWN_SUPPLIER);
    }

    #[test]
    fn test_document_report_uses_subject_and_findings() {
        let (names, invoice) = fixture();
        let doc = DocumentAnalysis {
            id: Uuid::new_v4(),
            kind: DocumentKind::Fec,
            company_id: invoice.company_id,
            period: Period {
                start_date: chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                end_date: chrono::NaiveDate::from_ymd_opt(2024, 3, 31).unwrap(),
            },
            file_name: "fec.csv".into(),
            status: AnalysisStatus::Completed,
            risk_score: 3,
            risk_level: RiskLevel::Faible,
            findings: vec!["Analyse de 45,678 écritures comptables".into()],
            ai_message: "Analyse FEC DeepSeek".into(),
            confidence: 88,
            anomalies: vec![],
            created_at: Utc::now(),
        };
        let data = ReportData::from_document(&doc, &names);
        assert_eq!(data.supplier_name, "Analyse FEC");
        assert_eq!(data.criteria.total(), 0);
        assert_eq!(data.recommendations, doc.findings);
        assert_eq!(data.source(), "fec.csv");
        assert_eq!(document_report_filename(&doc, "csv"), format!("rapport-fec-{}.csv", doc.id));
    }

    #[test]
    fn test_html_escapes_values() {
        let (names, mut analysis) = fixture();
        analysis.ai_message = Some("<script>alert(1)</script>".into());
        analysis.risk_level = RiskLevel::Eleve;
        let html = html_report(&ReportData::from_invoice(&analysis, &names)).unwrap();

        assert!(html.contains("Rapport d'Analyse de Fraude TVA"));
        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("<script>"));
        assert!(html.contains(r#"class="risk-high""#));
        assert!(html.contains("<li>Vérifier le SIRET</li>"));
        assert!(html.contains("<td>Taux de Sous-traitance</td><td>2</td><td>2</td>"));
    }

    #[test]
    fn test_global_report_layout() {
        let (names, analysis) = fixture();
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 9, 0, 0).unwrap();
        let text = global_text_report(&[analysis], &names, now);

        assert!(text.starts_with("RAPPORT GLOBAL DE DÉTECTION DE FRAUDE TVA\nGénéré le: 10/03/2024\n"));
        assert!(text.contains("- Total des analyses: 1\n"));
        assert!(text.contains("- Risque modéré: 1 (100%)\n"));
        assert!(text.contains("- Risque faible: 0 (0%)\n"));
        assert!(text.contains("\n- Bâti Sud / Échafaudages Martin\n  Score: 7/12 (modéré)\n  Date: 05/03/2024\n"));
        assert!(text.contains("  Recommandations: Vérifier le SIRET, Contrôler les montants\n"));
        assert_eq!(global_report_filename(now), "rapport-global-2024-03-10.txt");
    }

    #[test]
    fn test_empty_global_report_has_zero_percentages() {
        let text = global_text_report(&[], &NameBook::default(), Utc::now());
        assert!(text.contains("- Risque élevé: 0 (0%)"));
    }

    #[test]
    fn test_filter_search_level_and_period() {
        let (names, analysis) = fixture();
        let now = analysis.created_at + Duration::days(10);

        let by_name = ReportFilter { search: "MARTIN".into(), ..Default::default() };
        assert!(by_name.matches(&analysis, &names, now));

        let miss = ReportFilter { search: "vinci".into(), ..Default::default() };
        assert!(!miss.matches(&analysis, &names, now));

        let high_only = ReportFilter { level: "élevé".parse().unwrap(), ..Default::default() };
        assert!(!high_only.matches(&analysis, &names, now));

        let week = ReportFilter { period: ReportPeriod::Week, ..Default::default() };
        let month = ReportFilter { period: ReportPeriod::Month, ..Default::default() };
        assert!(!week.matches(&analysis, &names, now));
        assert!(month.matches(&analysis, &names, now));
        assert_eq!(month.apply(std::slice::from_ref(&analysis), &names, now).len(), 1);
    }

    #[test]
    fn test_filter_from_query_json() {
        let f: ReportFilter = serde_json::from_str(r#"{"level":"all","period":"month"}"#).unwrap();
        assert_eq!(f.level, LevelFilter::All);
        assert_eq!(f.period, ReportPeriod::Month);
        assert!(serde_json::from_str::<ReportFilter>(r#"{"level":"rouge"}"#).is_err());
    }
}
