//! Supplier repository.

use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;
use vigitva_common::risk::average_score;
use vigitva_common::{InvoiceAnalysis, NewSupplier, RiskLevel, Supplier, SupplierPatch};

use crate::database::{Change, Database};
use crate::error::Result;
use crate::schema::{COLLECTION_ANALYSES, COLLECTION_SUPPLIERS};

#[derive(Clone)]
pub struct SupplierRepository {
    db: Arc<Database>,
}

impl SupplierRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub async fn list(&self) -> Result<Vec<Supplier>> {
        self.db.load(COLLECTION_SUPPLIERS).await
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<Supplier>> {
        Ok(self.list().await?.into_iter().find(|s| s.id == id))
    }

    pub async fn save(&self, input: NewSupplier) -> Result<Supplier> {
        input.validate()?;
        let supplier = input.into_supplier(Uuid::new_v4(), Utc::now());
        let saved = supplier.clone();
        self.db
            .update(COLLECTION_SUPPLIERS, move |items: &mut Vec<Supplier>| {
                items.push(supplier);
                Change::Commit(())
            })
            .await?;
        tracing::info!(supplier_id = %saved.id, name = %saved.name, "Supplier saved");
        Ok(saved)
    }

    pub async fn update(&self, id: Uuid, patch: SupplierPatch) -> Result<Option<Supplier>> {
        let outcome = self
            .db
            .update(COLLECTION_SUPPLIERS, move |items: &mut Vec<Supplier>| {
                match items.iter_mut().find(|s| s.id == id) {
                    Some(supplier) => match patch.apply(supplier) {
                        Ok(()) => Change::Commit(Ok(Some(supplier.clone()))),
                        Err(e) => Change::Keep(Err(e)),
                    },
                    None => Change::Keep(Ok(None)),
                }
            })
            .await?;
        Ok(outcome?)
    }

    pub async fn delete(&self, id: Uuid) -> Result<bool> {
        let removed = self
            .db
            .update(COLLECTION_SUPPLIERS, move |items: &mut Vec<Supplier>| {
                match items.iter().position(|s| s.id == id) {
                    Some(idx) => {
                        items.remove(idx);
                        Change::Commit(true)
                    }
                    None => Change::Keep(false),
                }
            })
            .await?;
        if removed {
            tracing::info!(supplier_id = %id, "Supplier deleted");
        }
        Ok(removed)
    }

    /// Recompute the supplier's level from the mean score of its invoice
    /// analyses. Does nothing when the supplier has none.
    pub async fn refresh_risk_level(&self, id: Uuid) -> Result<Option<RiskLevel>> {
        let analyses: Vec<InvoiceAnalysis> = self.db.load(COLLECTION_ANALYSES).await?;
        let scores: Vec<u8> = analyses
            .iter()
            .filter(|a| a.supplier_id == id)
            .map(|a| a.risk_score)
            .collect();
        if scores.is_empty() {
            return Ok(None);
        }

        let level = RiskLevel::from_average(average_score(scores));
        let patch = SupplierPatch { risk_level: Some(level), ..Default::default() };
        let updated = self.update(id, patch).await?;
        if updated.is_some() {
            tracing::debug!(supplier_id = %id, level = %level, "Supplier risk level refreshed");
        }
        Ok(updated.map(|s| s.risk_level))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyses::AnalysisRepository;
    use vigitva_common::{Criteria, NewInvoiceAnalysis};

    fn input(name: &str) -> NewSupplier {
        NewSupplier {
            name: name.into(),
            siret: String::new(),
            address: String::new(),
            city: "Toulouse".into(),
            postal_code: String::new(),
            phone: String::new(),
            email: String::new(),
            speciality: "Location d'équipements".into(),
            risk_level: RiskLevel::Faible,
        }
    }

    fn analysis(company_id: Uuid, supplier_id: Uuid, score: u8) -> NewInvoiceAnalysis {
        NewInvoiceAnalysis {
            company_id,
            supplier_id,
            invoice_file: Some("facture.pdf".into()),
            invoice_url: None,
            risk_score: score,
            risk_level: RiskLevel::from_score(score),
            criteria: Criteria::default(),
            recommendations: vec![],
            ai_message: None,
            confidence: 90,
        }
    }

    #[tokio::test]
    async fn test_save_requires_speciality() {
        let repo = SupplierRepository::new(Arc::new(Database::in_memory()));
        let mut bad = input("Équipements BTP");
        bad.speciality = " ".into();
        assert!(repo.save(bad).await.is_err());
    }

    #[tokio::test]
    async fn test_refresh_uses_average_of_supplier_analyses() {
        let db = Arc::new(Database::in_memory());
        let suppliers = SupplierRepository::new(db.clone());
        let analyses = AnalysisRepository::new(db.clone());

        let s = suppliers.save(input("Acier & Métaux SA")).await.unwrap();
        let other = suppliers.save(input("Matériaux Pro")).await.unwrap();
        let company = Uuid::new_v4();
        analyses.save(analysis(company, s.id, 10)).await.unwrap();
        analyses.save(analysis(company, s.id, 9)).await.unwrap();
        analyses.save(analysis(company, other.id, 1)).await.unwrap();

        let level = suppliers.refresh_risk_level(s.id).await.unwrap();
        assert_eq!(level, Some(RiskLevel::Eleve));
        assert_eq!(suppliers.get(s.id).await.unwrap().unwrap().risk_level, RiskLevel::Eleve);
    }

    #[tokio::test]
    async fn test_refresh_without_analyses_is_noop() {
        let repo = SupplierRepository::new(Arc::new(Database::in_memory()));
        let mut seeded = input("Transports Lourds BTP");
        seeded.risk_level = RiskLevel::Eleve;
        let s = repo.save(seeded).await.unwrap();

        assert_eq!(repo.refresh_risk_level(s.id).await.unwrap(), None);
        assert_eq!(repo.get(s.id).await.unwrap().unwrap().risk_level, RiskLevel::Eleve);
    }
}
