//! Invoice analysis repository.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;
use vigitva_common::{InvoiceAnalysis, NewInvoiceAnalysis};

use crate::database::{Change, Database};
use crate::error::{Result, StoreError};
use crate::events::AppEvent;
use crate::schema::COLLECTION_ANALYSES;

#[derive(Clone)]
pub struct AnalysisRepository {
    db: Arc<Database>,
}

impl AnalysisRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub async fn list(&self) -> Result<Vec<InvoiceAnalysis>> {
        self.db.load(COLLECTION_ANALYSES).await
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<InvoiceAnalysis>> {
        Ok(self.list().await?.into_iter().find(|a| a.id == id))
    }

    /// Append a new analysis stamped now and announce it on the bus.
    pub async fn save(&self, input: NewInvoiceAnalysis) -> Result<InvoiceAnalysis> {
        let saved = self.save_at(input, Utc::now()).await?;
        self.db.events().emit(AppEvent::InvoiceAnalyzed { analysis: saved.clone() });
        Ok(saved)
    }

    /// Append with an explicit timestamp. Used for backdated demo data.
    pub async fn save_at(
        &self,
        input: NewInvoiceAnalysis,
        created_at: DateTime<Utc>,
    ) -> Result<InvoiceAnalysis> {
        if !input.criteria.is_in_range() {
            return Err(StoreError::Validation("criteria must each be within 0..=2".into()));
        }
        let analysis = input.into_analysis(Uuid::new_v4(), created_at);
        let saved = analysis.clone();
        self.db
            .update(COLLECTION_ANALYSES, move |items: &mut Vec<InvoiceAnalysis>| {
                items.push(analysis);
                Change::Commit(())
            })
            .await?;
        tracing::info!(
            analysis_id = %saved.id,
            score = saved.risk_score,
            level = %saved.risk_level,
            "Invoice analysis saved"
        );
        Ok(saved)
    }

    pub async fn delete(&self, id: Uuid) -> Result<bool> {
        self.db
            .update(COLLECTION_ANALYSES, move |items: &mut Vec<InvoiceAnalysis>| {
                match items.iter().position(|a| a.id == id) {
                    Some(idx) => {
                        items.remove(idx);
                        Change::Commit(true)
                    }
                    None => Change::Keep(false),
                }
            })
            .await
    }

    pub async fn for_company(&self, company_id: Uuid) -> Result<Vec<InvoiceAnalysis>> {
        let mut items = self.list().await?;
        items.retain(|a| a.company_id == company_id);
        Ok(items)
    }

    pub async fn for_supplier(&self, supplier_id: Uuid) -> Result<Vec<InvoiceAnalysis>> {
        let mut items = self.list().await?;
        items.retain(|a| a.supplier_id == supplier_id);
        Ok(items)
    }
}
