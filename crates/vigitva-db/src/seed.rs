//! Demo dataset loader.
//!
//! Fills each collection from `fixtures/demo.json` only when that
//! collection is empty. Analyses reference companies and suppliers by
//! position in the stored lists and are backdated by a random number of days.

use chrono::{Duration, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;
use vigitva_common::{
    Anomaly, AnalysisStatus, Criteria, DocumentKind, NewCompany, NewDocumentAnalysis,
    NewInvoiceAnalysis, NewSupplier, Period, RiskLevel,
};

use crate::analyses::AnalysisRepository;
use crate::companies::CompanyRepository;
use crate::database::Database;
use crate::documents::DocumentRepository;
use crate::error::Result;
use crate::suppliers::SupplierRepository;

const DEMO_DATA: &str = include_str!("../fixtures/demo.json");

#[derive(Debug, Deserialize)]
struct DemoData {
    companies: Vec<NewCompany>,
    suppliers: Vec<NewSupplier>,
    invoices: Vec<DemoInvoice>,
    documents: Vec<DemoDocument>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DemoInvoice {
    company: usize,
    supplier: usize,
    supplier_fallback: usize,
    risk_score: u8,
    risk_level: RiskLevel,
    criteria: Criteria,
    recommendations: Vec<String>,
    ai_message: String,
    confidence: u8,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DemoDocument {
    #[serde(rename = "type")]
    kind: DocumentKind,
    company: usize,
    period: Period,
    file_name: String,
    status: AnalysisStatus,
    risk_score: u8,
    risk_level: RiskLevel,
    findings: Vec<String>,
    ai_message: String,
    confidence: u8,
    anomalies: Vec<Anomaly>,
}

/// How many records each collection received.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SeedReport {
    pub companies: usize,
    pub suppliers: usize,
    pub invoices: usize,
    pub documents: usize,
}

/// Upper bound (inclusive) of the random backdating, in days.
fn max_age_days(kind: Option<DocumentKind>) -> i64 {
    match kind {
        None                        => 90,
        Some(DocumentKind::Fec)     => 60,
        Some(DocumentKind::Tva)     => 45,
        Some(DocumentKind::Journal) => 30,
        Some(DocumentKind::Bank)    => 20,
    }
}

/// Index into `ids`, or `fallback` when out of range.
fn pick(ids: &[Uuid], index: usize, fallback: usize) -> Option<Uuid> {
    ids.get(index).or_else(|| ids.get(fallback)).copied()
}

pub async fn seed_demo_data<R: Rng + Send>(db: Arc<Database>, rng: &mut R) -> Result<SeedReport> {
    let data: DemoData = serde_json::from_str(DEMO_DATA)?;
    let companies = CompanyRepository::new(db.clone());
    let suppliers = SupplierRepository::new(db.clone());
    let analyses = AnalysisRepository::new(db.clone());
    let documents = DocumentRepository::new(db);
    let mut report = SeedReport::default();

    if companies.count().await? == 0 {
        for c in data.companies {
            companies.save(c).await?;
            report.companies += 1;
        }
    }
    if suppliers.list().await?.is_empty() {
        for s in data.suppliers {
            suppliers.save(s).await?;
            report.suppliers += 1;
        }
    }

    let company_ids: Vec<Uuid> = companies.list().await?.iter().map(|c| c.id).collect();
    let supplier_ids: Vec<Uuid> = suppliers.list().await?.iter().map(|s| s.id).collect();

    if analyses.list().await?.is_empty() && !company_ids.is_empty() && !supplier_ids.is_empty() {
        for inv in data.invoices {
            let (Some(company_id), Some(supplier_id)) = (
                pick(&company_ids, inv.company, 0),
                pick(&supplier_ids, inv.supplier, inv.supplier_fallback),
            ) else {
                continue;
            };
            let days = rng.gen_range(1..=max_age_days(None));
            let input = NewInvoiceAnalysis {
                company_id,
                supplier_id,
                invoice_file: None,
                invoice_url: None,
                risk_score: inv.risk_score,
                risk_level: inv.risk_level,
                criteria: inv.criteria,
                recommendations: inv.recommendations,
                ai_message: Some(inv.ai_message),
                confidence: inv.confidence,
            };
            analyses.save_at(input, Utc::now() - Duration::days(days)).await?;
            report.invoices += 1;
        }
    }

    if !company_ids.is_empty() {
        for kind in DocumentKind::ALL {
            if !documents.list(kind).await?.is_empty() {
                continue;
            }
            for doc in data.documents.iter().filter(|d| d.kind == kind) {
                let Some(company_id) = pick(&company_ids, doc.company, 0) else {
                    continue;
                };
                let days = rng.gen_range(1..=max_age_days(Some(kind)));
                let input = NewDocumentAnalysis {
                    kind,
                    company_id,
                    period: doc.period,
                    file_name: doc.file_name.clone(),
                    status: doc.status,
                    risk_score: doc.risk_score,
                    risk_level: doc.risk_level,
                    findings: doc.findings.clone(),
                    ai_message: doc.ai_message.clone(),
                    confidence: doc.confidence,
                    anomalies: doc.anomalies.clone(),
                };
                documents.save_at(input, Utc::now() - Duration::days(days)).await?;
                report.documents += 1;
            }
        }
    }

    tracing::info!(
        companies = report.companies,
        suppliers = report.suppliers,
        invoices = report.invoices,
        documents = report.documents,
        "Demo data seeded"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_fixture_parses() {
        let data: DemoData = serde_json::from_str(DEMO_DATA).unwrap();
        assert_eq!(data.companies.len(), 10);
        assert_eq!(data.suppliers.len(), 12);
        assert_eq!(data.invoices.len(), 6);
        assert_eq!(data.documents.len(), 8);
        for inv in &data.invoices {
            assert_eq!(inv.criteria.total(), inv.risk_score);
        }
    }

    #[tokio::test]
    async fn test_seeds_empty_store_once() {
        let db = Arc::new(Database::in_memory());
        let mut rng = StdRng::seed_from_u64(7);

        let first = seed_demo_data(db.clone(), &mut rng).await.unwrap();
        assert_eq!(first, SeedReport { companies: 10, suppliers: 12, invoices: 6, documents: 8 });

        let second = seed_demo_data(db.clone(), &mut rng).await.unwrap();
        assert_eq!(second, SeedReport::default());
        assert_eq!(CompanyRepository::new(db).count().await.unwrap(), 10);
    }

    #[tokio::test]
    async fn test_seeded_analyses_are_backdated_within_window() {
        let db = Arc::new(Database::in_memory());
        seed_demo_data(db.clone(), &mut StdRng::seed_from_u64(1)).await.unwrap();
        let now = Utc::now();

        for a in AnalysisRepository::new(db.clone()).list().await.unwrap() {
            let age = now - a.created_at;
            assert!(age >= Duration::days(1) && age <= Duration::days(90) + Duration::minutes(1));
        }
        for d in DocumentRepository::new(db).list(DocumentKind::Bank).await.unwrap() {
            assert!(now - d.created_at <= Duration::days(20) + Duration::minutes(1));
        }
    }

    #[tokio::test]
    async fn test_existing_collection_is_left_alone() {
        let db = Arc::new(Database::in_memory());
        CompanyRepository::new(db.clone())
            .save(NewCompany { name: "Seule".into(), siret: "1".into(), ..Default::default() })
            .await
            .unwrap();

        let report = seed_demo_data(db.clone(), &mut StdRng::seed_from_u64(3)).await.unwrap();
        assert_eq!(report.companies, 0);
        assert_eq!(report.suppliers, 12);
        // every analysis falls back to the only company
        let only = CompanyRepository::new(db.clone()).list().await.unwrap()[0].id;
        let analyses = AnalysisRepository::new(db).list().await.unwrap();
        assert_eq!(analyses.len(), 6);
        assert!(analyses.iter().all(|a| a.company_id == only));
    }
}
