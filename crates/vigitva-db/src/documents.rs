//! Document analysis repository: FEC files, VAT declarations, journals and
//! bank flux share one record shape, each kind in its own collection.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;
use vigitva_common::{DocumentAnalysis, DocumentKind, NewDocumentAnalysis};

use crate::database::{Change, Database};
use crate::error::{Result, StoreError};
use crate::events::AppEvent;
use crate::schema::document_collection;

#[derive(Clone)]
pub struct DocumentRepository {
    db: Arc<Database>,
}

impl DocumentRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub async fn list(&self, kind: DocumentKind) -> Result<Vec<DocumentAnalysis>> {
        self.db.load(document_collection(kind)).await
    }

    /// Every kind, concatenated in `DocumentKind::ALL` order.
    pub async fn list_all(&self) -> Result<Vec<DocumentAnalysis>> {
        let mut all = Vec::new();
        for kind in DocumentKind::ALL {
            all.extend(self.list(kind).await?);
        }
        Ok(all)
    }

    pub async fn get(&self, kind: DocumentKind, id: Uuid) -> Result<Option<DocumentAnalysis>> {
        Ok(self.list(kind).await?.into_iter().find(|a| a.id == id))
    }

    /// Append a new document analysis and emit `analysis:completed`.
    pub async fn save(&self, input: NewDocumentAnalysis) -> Result<DocumentAnalysis> {
        self.save_at(input, Utc::now()).await
    }

    pub async fn save_at(
        &self,
        input: NewDocumentAnalysis,
        created_at: DateTime<Utc>,
    ) -> Result<DocumentAnalysis> {
        input.period.validate()?;
        if input.file_name.trim().is_empty() {
            return Err(StoreError::Validation("fileName is required".into()));
        }
        let kind = input.kind;
        let analysis = input.into_analysis(Uuid::new_v4(), created_at);
        let saved = analysis.clone();
        self.db
            .update(document_collection(kind), move |items: &mut Vec<DocumentAnalysis>| {
                items.push(analysis);
                Change::Commit(())
            })
            .await?;

        let delivered = self
            .db
            .events()
            .emit(AppEvent::AnalysisCompleted { analysis: saved.clone() });
        tracing::info!(
            analysis_id = %saved.id,
            kind = %kind,
            score = saved.risk_score,
            subscribers = delivered,
            "Document analysis saved"
        );
        Ok(saved)
    }

    pub async fn delete(&self, kind: DocumentKind, id: Uuid) -> Result<bool> {
        self.db
            .update(document_collection(kind), move |items: &mut Vec<DocumentAnalysis>| {
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
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use vigitva_common::{Anomaly, AnalysisStatus, Period, RiskLevel, Severity};

    fn input(kind: DocumentKind) -> NewDocumentAnalysis {
        NewDocumentAnalysis {
            kind,
            company_id: Uuid::new_v4(),
            period: Period {
                start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                end_date: NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
            },
            file_name: "FEC_2024.txt".into(),
            status: AnalysisStatus::Completed,
            risk_score: 7,
            risk_level: RiskLevel::Modere,
            findings: vec!["Écritures comptables cohérentes".into()],
            ai_message: "Analyse FEC".into(),
            confidence: 82,
            anomalies: vec![Anomaly::new("Écriture manquante", "Régularisation absente", Severity::Medium)],
        }
    }

    #[tokio::test]
    async fn test_save_emits_analysis_completed() {
        let db = Arc::new(Database::in_memory());
        let mut rx = db.events().subscribe();
        let repo = DocumentRepository::new(db);

        let saved = repo.save(input(DocumentKind::Fec)).await.unwrap();
        match rx.recv().await.unwrap() {
            AppEvent::AnalysisCompleted { analysis } => {
                assert_eq!(analysis.id, saved.id);
                assert_eq!(analysis.kind, DocumentKind::Fec);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_kinds_live_in_separate_collections() {
        let repo = DocumentRepository::new(Arc::new(Database::in_memory()));
        repo.save(input(DocumentKind::Fec)).await.unwrap();
        repo.save(input(DocumentKind::Bank)).await.unwrap();
        repo.save(input(DocumentKind::Bank)).await.unwrap();

        assert_eq!(repo.list(DocumentKind::Fec).await.unwrap().len(), 1);
        assert_eq!(repo.list(DocumentKind::Bank).await.unwrap().len(), 2);
        assert!(repo.list(DocumentKind::Tva).await.unwrap().is_empty());
        assert_eq!(repo.list_all().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_reversed_period_is_rejected() {
        let repo = DocumentRepository::new(Arc::new(Database::in_memory()));
        let mut bad = input(DocumentKind::Tva);
        std::mem::swap(&mut bad.period.start_date, &mut bad.period.end_date);
        assert!(matches!(repo.save(bad).await, Err(StoreError::Validation(_))));
    }

    #[tokio::test]
    async fn test_delete_is_scoped_to_kind() {
        let repo = DocumentRepository::new(Arc::new(Database::in_memory()));
        let saved = repo.save(input(DocumentKind::Journal)).await.unwrap();
        assert!(!repo.delete(DocumentKind::Fec, saved.id).await.unwrap());
        assert!(repo.delete(DocumentKind::Journal, saved.id).await.unwrap());
    }
}
