//! Core entity types persisted by the store.
//! Field names serialize as camelCase, matching the persisted JSON collections.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{Result, VigitvaError};
use crate::risk::{RiskLevel, MAX_CRITERION_POINTS};

fn require(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(VigitvaError::Validation(format!("{} is required", field)));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Company
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Company {
    pub id: Uuid,
    pub name: String,
    pub siret: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub postal_code: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub sector: String,
    #[serde(default)]
    pub turnover: f64,
    pub created_at: DateTime<Utc>,
}

/// A company as submitted, before the store assigns `id` and `created_at`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCompany {
    pub name: String,
    pub siret: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub postal_code: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub sector: String,
    #[serde(default)]
    pub turnover: f64,
}

fn check_company(name: &str, siret: &str, turnover: f64) -> Result<()> {
    require("name", name)?;
    require("siret", siret)?;
    if !turnover.is_finite() || turnover < 0.0 {
        return Err(VigitvaError::Validation("turnover must be a positive amount".into()));
    }
    Ok(())
}

impl NewCompany {
    pub fn validate(&self) -> Result<()> {
        check_company(&self.name, &self.siret, self.turnover)
    }

    pub fn into_company(self, id: Uuid, created_at: DateTime<Utc>) -> Company {
        Company {
            id,
            name: self.name,
            siret: self.siret,
            address: self.address,
            city: self.city,
            postal_code: self.postal_code,
            phone: self.phone,
            email: self.email,
            sector: self.sector,
            turnover: self.turnover,
            created_at,
        }
    }
}

/// Partial update. `id` and `createdAt` are not patchable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyPatch {
    pub name: Option<String>,
    pub siret: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub sector: Option<String>,
    pub turnover: Option<f64>,
}

impl CompanyPatch {
    /// Apply onto `company`. A patch that would leave it invalid is
    /// rejected and `company` is left as it was.
    pub fn apply(self, company: &mut Company) -> Result<()> {
        let mut patched = company.clone();
        if let Some(v) = self.name { patched.name = v; }
        if let Some(v) = self.siret { patched.siret = v; }
        if let Some(v) = self.address { patched.address = v; }
        if let Some(v) = self.city { patched.city = v; }
        if let Some(v) = self.postal_code { patched.postal_code = v; }
        if let Some(v) = self.phone { patched.phone = v; }
        if let Some(v) = self.email { patched.email = v; }
        if let Some(v) = self.sector { patched.sector = v; }
        if let Some(v) = self.turnover { patched.turnover = v; }
        check_company(&patched.name, &patched.siret, patched.turnover)?;
        *company = patched;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Supplier
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Supplier {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub siret: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub postal_code: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub email: String,
    pub speciality: String,
    pub risk_level: RiskLevel,
    pub created_at: DateTime<Utc>,
}

fn default_risk_level() -> RiskLevel {
    RiskLevel::Faible
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSupplier {
    pub name: String,
    #[serde(default)]
    pub siret: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub postal_code: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub email: String,
    pub speciality: String,
    #[serde(default = "default_risk_level")]
    pub risk_level: RiskLevel,
}

fn check_supplier(name: &str, speciality: &str) -> Result<()> {
    require("name", name)?;
    require("speciality", speciality)
}

impl NewSupplier {
    pub fn validate(&self) -> Result<()> {
        check_supplier(&self.name, &self.speciality)
    }

    pub fn into_supplier(self, id: Uuid, created_at: DateTime<Utc>) -> Supplier {
        Supplier {
            id,
            name: self.name,
            siret: self.siret,
            address: self.address,
            city: self.city,
            postal_code: self.postal_code,
            phone: self.phone,
            email: self.email,
            speciality: self.speciality,
            risk_level: self.risk_level,
            created_at,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupplierPatch {
    pub name: Option<String>,
    pub siret: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub speciality: Option<String>,
    pub risk_level: Option<RiskLevel>,
}

impl SupplierPatch {
    pub fn apply(self, supplier: &mut Supplier) -> Result<()> {
        let mut patched = supplier.clone();
        if let Some(v) = self.name { patched.name = v; }
        if let Some(v) = self.siret { patched.siret = v; }
        if let Some(v) = self.address { patched.address = v; }
        if let Some(v) = self.city { patched.city = v; }
        if let Some(v) = self.postal_code { patched.postal_code = v; }
        if let Some(v) = self.phone { patched.phone = v; }
        if let Some(v) = self.email { patched.email = v; }
        if let Some(v) = self.speciality { patched.speciality = v; }
        if let Some(v) = self.risk_level { patched.risk_level = v; }
        check_supplier(&patched.name, &patched.speciality)?;
        *supplier = patched;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Invoice analysis
// ---------------------------------------------------------------------------

/// The six scoring criteria, each worth 0–2 points.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Criteria {
    pub subcontracting_rate: u8,
    pub company_size: u8,
    pub fiscal_history: u8,
    pub supplier_count: u8,
    pub invoice_volume: u8,
    pub operation_complexity: u8,
}

impl Criteria {
    /// Sum of the criteria, each counted at most `MAX_CRITERION_POINTS`.
    pub fn total(&self) -> u8 {
        self.values().iter().map(|v| (*v).min(MAX_CRITERION_POINTS)).sum()
    }

    pub fn values(&self) -> [u8; 6] {
        [
            self.subcontracting_rate,
            self.company_size,
            self.fiscal_history,
            self.supplier_count,
            self.invoice_volume,
            self.operation_complexity,
        ]
    }

    /// True when every criterion is within `0..=2`.
    pub fn is_in_range(&self) -> bool {
        self.values().iter().all(|v| *v <= MAX_CRITERION_POINTS)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceAnalysis {
    pub id: Uuid,
    pub company_id: Uuid,
    pub supplier_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invoice_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invoice_url: Option<String>,
    pub risk_score: u8,
    pub risk_level: RiskLevel,
    pub criteria: Criteria,
    pub recommendations: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_message: Option<String>,
    pub confidence: u8,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewInvoiceAnalysis {
    pub company_id: Uuid,
    pub supplier_id: Uuid,
    #[serde(default)]
    pub invoice_file: Option<String>,
    #[serde(default)]
    pub invoice_url: Option<String>,
    pub risk_score: u8,
    pub risk_level: RiskLevel,
    pub criteria: Criteria,
    pub recommendations: Vec<String>,
    #[serde(default)]
    pub ai_message: Option<String>,
    pub confidence: u8,
}

impl NewInvoiceAnalysis {
    pub fn into_analysis(self, id: Uuid, created_at: DateTime<Utc>) -> InvoiceAnalysis {
        InvoiceAnalysis {
            id,
            company_id: self.company_id,
            supplier_id: self.supplier_id,
            invoice_file: self.invoice_file,
            invoice_url: self.invoice_url,
            risk_score: self.risk_score,
            risk_level: self.risk_level,
            criteria: self.criteria,
            recommendations: self.recommendations,
            ai_message: self.ai_message,
            confidence: self.confidence,
            created_at,
        }
    }
}

// ---------------------------------------------------------------------------
// Document analyses (FEC, TVA declaration, journals, bank flux)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Fec,
    Tva,
    Journal,
    Bank,
}

impl DocumentKind {
    pub const ALL: [DocumentKind; 4] = [
        DocumentKind::Fec,
        DocumentKind::Tva,
        DocumentKind::Journal,
        DocumentKind::Bank,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::Fec     => "fec",
            DocumentKind::Tva     => "tva",
            DocumentKind::Journal => "journal",
            DocumentKind::Bank    => "bank",
        }
    }

    /// Human label used in listings.
    pub fn label(&self) -> &'static str {
        match self {
            DocumentKind::Fec     => "Fichier FEC",
            DocumentKind::Tva     => "Déclaration TVA",
            DocumentKind::Journal => "Journaux comptables",
            DocumentKind::Bank    => "Flux bancaires",
        }
    }

    /// Stands in for the supplier name on document reports.
    pub fn report_subject(&self) -> &'static str {
        match self {
            DocumentKind::Fec     => "Analyse FEC",
            DocumentKind::Tva     => "Analyse TVA",
            DocumentKind::Journal => "Analyse Journaux",
            DocumentKind::Bank    => "Analyse Flux Bancaires",
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentKind {
    type Err = VigitvaError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "fec"                  => Ok(DocumentKind::Fec),
            "tva"                  => Ok(DocumentKind::Tva),
            "journal" | "journals" => Ok(DocumentKind::Journal),
            "bank" | "bank-flux"   => Ok(DocumentKind::Bank),
            other => Err(VigitvaError::UnknownValue(format!("document kind '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anomaly {
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
    pub severity: Severity,
}

impl Anomaly {
    pub fn new(kind: &str, description: &str, severity: Severity) -> Self {
        Self { kind: kind.to_string(), description: description.to_string(), severity }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisStatus {
    Pending,
    Completed,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Period {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl Period {
    pub fn validate(&self) -> Result<()> {
        if self.end_date < self.start_date {
            return Err(VigitvaError::Validation("period end precedes its start".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentAnalysis {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: DocumentKind,
    pub company_id: Uuid,
    pub period: Period,
    pub file_name: String,
    pub status: AnalysisStatus,
    pub risk_score: u8,
    pub risk_level: RiskLevel,
    pub findings: Vec<String>,
    pub ai_message: String,
    pub confidence: u8,
    pub anomalies: Vec<Anomaly>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDocumentAnalysis {
    #[serde(rename = "type")]
    pub kind: DocumentKind,
    pub company_id: Uuid,
    pub period: Period,
    pub file_name: String,
    pub status: AnalysisStatus,
    pub risk_score: u8,
    pub risk_level: RiskLevel,
    pub findings: Vec<String>,
    pub ai_message: String,
    pub confidence: u8,
    pub anomalies: Vec<Anomaly>,
}

impl NewDocumentAnalysis {
    pub fn into_analysis(self, id: Uuid, created_at: DateTime<Utc>) -> DocumentAnalysis {
        DocumentAnalysis {
            id,
            kind: self.kind,
            company_id: self.company_id,
            period: self.period,
            file_name: self.file_name,
            status: self.status,
            risk_score: self.risk_score,
            risk_level: self.risk_level,
            findings: self.findings,
            ai_message: self.ai_message,
            confidence: self.confidence,
            anomalies: self.anomalies,
            created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn company() -> Company {
        NewCompany {
            name: "BTP Construction Paris".into(),
            siret: "12345678901234".into(),
            turnover: 2_500_000.0,
            ..Default::default()
        }
        .into_company(Uuid::new_v4(), Utc::now())
    }

    #[test]
    fn test_new_company_requires_name_and_siret() {
        let mut input = NewCompany { name: "  ".into(), siret: "123".into(), ..Default::default() };
        assert!(input.validate().is_err());
        input.name = "Acme".into();
        assert!(input.validate().is_ok());
        input.siret = String::new();
        assert!(input.validate().is_err());
    }

    #[test]
    fn test_patch_keeps_identity() {
        let mut c = company();
        let (id, created) = (c.id, c.created_at);
        CompanyPatch { city: Some("Lyon".into()), turnover: Some(12.0), ..Default::default() }
            .apply(&mut c)
            .unwrap();
        assert_eq!(c.city, "Lyon");
        assert_eq!(c.turnover, 12.0);
        assert_eq!(c.name, "BTP Construction Paris");
        assert_eq!((c.id, c.created_at), (id, created));
    }

    #[test]
    fn test_invalid_patch_is_rejected_and_leaves_company_unchanged() {
        let mut c = company();
        let before = c.clone();

        let err = CompanyPatch { name: Some("   ".into()), city: Some("Lyon".into()), ..Default::default() }
            .apply(&mut c)
            .unwrap_err();
        assert!(matches!(err, VigitvaError::Validation(_)));
        assert_eq!(c, before);

        let err = CompanyPatch { turnover: Some(-1.0), ..Default::default() }.apply(&mut c).unwrap_err();
        assert!(matches!(err, VigitvaError::Validation(_)));
        assert_eq!(c.turnover, 2_500_000.0);
    }

    #[test]
    fn test_supplier_patch_requires_speciality() {
        let mut s = NewSupplier {
            name: "Béton Express".into(),
            siret: String::new(),
            address: String::new(),
            city: String::new(),
            postal_code: String::new(),
            phone: String::new(),
            email: String::new(),
            speciality: "Béton".into(),
            risk_level: RiskLevel::Faible,
        }
        .into_supplier(Uuid::new_v4(), Utc::now());
        assert!(SupplierPatch { speciality: Some(String::new()), ..Default::default() }.apply(&mut s).is_err());
        assert_eq!(s.speciality, "Béton");
        SupplierPatch { risk_level: Some(RiskLevel::Eleve), ..Default::default() }.apply(&mut s).unwrap();
        assert_eq!(s.risk_level, RiskLevel::Eleve);
    }

    #[test]
    fn test_company_json_is_camel_case() {
        let json = serde_json::to_value(company()).unwrap();
        assert!(json.get("postalCode").is_some());
        assert!(json.get("createdAt").is_some());
        assert!(json.get("postal_code").is_none());
    }

    #[test]
    fn test_supplier_risk_level_defaults_to_faible() {
        let s: NewSupplier = serde_json::from_str(
            r#"{"name":"Électricité Moderne","speciality":"Électricité"}"#,
        )
        .unwrap();
        assert_eq!(s.risk_level, RiskLevel::Faible);
        assert!(s.validate().is_ok());
    }

    #[test]
    fn test_criteria_total_and_range() {
        let c = Criteria {
            subcontracting_rate: 2,
            company_size: 1,
            fiscal_history: 0,
            supplier_count: 2,
            invoice_volume: 1,
            operation_complexity: 2,
        };
        assert_eq!(c.total(), 8);
        assert!(c.is_in_range());
        assert!(!Criteria { fiscal_history: 3, ..c }.is_in_range());
    }

    #[test]
    fn test_out_of_range_criteria_do_not_overflow_total() {
        let c = Criteria {
            subcontracting_rate: 200,
            company_size: 200,
            fiscal_history: 200,
            supplier_count: 200,
            invoice_volume: 200,
            operation_complexity: 200,
        };
        assert_eq!(c.total(), 12);
    }

    #[test]
    fn test_document_kind_tag_and_parse() {
        assert_eq!(serde_json::to_string(&DocumentKind::Bank).unwrap(), "\"bank\"");
        assert_eq!("FEC".parse::<DocumentKind>().unwrap(), DocumentKind::Fec);
        assert!("pdf".parse::<DocumentKind>().is_err());
    }

    #[test]
    fn test_anomaly_serializes_kind_as_type() {
        let a = Anomaly::new("Crédit de TVA anormal", "Crédit persistant", Severity::Low);
        let json = serde_json::to_value(&a).unwrap();
        assert_eq!(json["type"], "Crédit de TVA anormal");
        assert_eq!(json["severity"], "low");
    }

    #[test]
    fn test_period_rejects_reversed_dates() {
        let p = Period {
            start_date: NaiveDate::from_ymd_opt(2024, 3, 31).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        };
        assert!(p.validate().is_err());
    }
}
