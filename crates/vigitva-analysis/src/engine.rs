//! Wizard submissions: validate the form, walk the staged pipeline, score,
//! persist, and refresh derived data.

use rand::Rng;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;
use vigitva_common::{DocumentAnalysis, DocumentKind, InvoiceAnalysis};
use vigitva_db::{
    AnalysisRepository, CompanyRepository, Database, DocumentRepository, StoreError,
    SupplierRepository,
};

use crate::documents::DocumentAnalyzer;
use crate::pipeline::{stages_for, ProgressPipeline};
use crate::scorer::InvoiceScorer;
use crate::wizard::{DocumentForm, InvoiceForm, Wizard, WizardError};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Wizard(#[from] WizardError),
    #[error("Company not found: {0}")]
    CompanyNotFound(Uuid),
    #[error("Supplier not found: {0}")]
    SupplierNotFound(Uuid),
}

pub type Result<T> = std::result::Result<T, EngineError>;

pub struct AnalysisEngine {
    db: Arc<Database>,
    pipeline: ProgressPipeline,
    scorer: InvoiceScorer,
    analyzer: DocumentAnalyzer,
}

impl AnalysisEngine {
    /// Progress is published on the store's event bus.
    pub fn new(db: Arc<Database>, progress_scale: f64) -> Self {
        let pipeline = ProgressPipeline::new(progress_scale, Some(db.events().clone()));
        Self {
            db,
            pipeline,
            scorer: InvoiceScorer::new(),
            analyzer: DocumentAnalyzer::new(),
        }
    }

    /// Walk both input steps, failing on the first incomplete one.
    fn advance<F: crate::wizard::WizardForm>(wizard: &mut Wizard<F>) -> Result<()> {
        wizard.next()?;
        wizard.next()?;
        Ok(())
    }

    pub async fn submit_invoice<R: Rng + Send>(
        &self,
        run_id: Uuid,
        form: InvoiceForm,
        rng: &mut R,
    ) -> Result<InvoiceAnalysis> {
        let mut wizard = Wizard::new(form);
        Self::advance(&mut wizard)?;
        let (Some(company_id), Some(supplier_id)) = (wizard.form.company_id, wizard.form.supplier_id) else {
            return Err(WizardError::Incomplete(1).into());
        };

        let company = CompanyRepository::new(self.db.clone())
            .get(company_id)
            .await?
            .ok_or(EngineError::CompanyNotFound(company_id))?;
        let suppliers = SupplierRepository::new(self.db.clone());
        if suppliers.get(supplier_id).await?.is_none() {
            return Err(EngineError::SupplierNotFound(supplier_id));
        }

        self.pipeline.run(run_id, None, stages_for(None)).await;

        let verdict = self.scorer.score(&company, rng);
        let (file, url) = wizard.form.source();
        let saved = AnalysisRepository::new(self.db.clone())
            .save(verdict.into_new_analysis(company_id, supplier_id, file, url))
            .await?;
        suppliers.refresh_risk_level(supplier_id).await?;
        wizard.complete()?;

        tracing::info!(
            analysis_id = %saved.id,
            %company_id,
            %supplier_id,
            score = saved.risk_score,
            "Invoice analysis submitted"
        );
        Ok(saved)
    }

    pub async fn submit_document<R: Rng + Send>(
        &self,
        run_id: Uuid,
        kind: DocumentKind,
        form: DocumentForm,
        rng: &mut R,
    ) -> Result<DocumentAnalysis> {
        let mut wizard = Wizard::new(form);
        Self::advance(&mut wizard)?;
        let (Some(company_id), Some(period)) = (wizard.form.company_id, wizard.form.period()) else {
            return Err(WizardError::Incomplete(2).into());
        };
        period.validate().map_err(StoreError::from)?;
        if CompanyRepository::new(self.db.clone()).get(company_id).await?.is_none() {
            return Err(EngineError::CompanyNotFound(company_id));
        }

        self.pipeline.run(run_id, Some(kind), stages_for(Some(kind))).await;

        let input = self
            .analyzer
            .analyze(kind, company_id, period, wizard.form.file_name.as_deref(), rng);
        let saved = DocumentRepository::new(self.db.clone()).save(input).await?;
        wizard.complete()?;

        tracing::info!(analysis_id = %saved.id, kind = %kind, %company_id, "Document analysis submitted");
        Ok(saved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use vigitva_common::RiskLevel;
    use vigitva_db::AppEvent;
    use vigitva_test_utils::{new_company, new_supplier, seeded_rng};

    async fn setup() -> (Arc<Database>, Uuid, Uuid) {
        let db = Arc::new(Database::in_memory());
        let company = CompanyRepository::new(db.clone())
            .save(new_company("Constructions Durand", 8_000_000.0))
            .await
            .unwrap();
        let supplier = SupplierRepository::new(db.clone())
            .save(new_supplier("Béton Express"))
            .await
            .unwrap();
        (db, company.id, supplier.id)
    }

    fn invoice_form(company_id: Uuid, supplier_id: Uuid) -> InvoiceForm {
        InvoiceForm {
            company_id: Some(company_id),
            supplier_id: Some(supplier_id),
            file_name: Some("facture.pdf".into()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_invoice_submission_saves_and_updates_supplier() {
        let (db, company_id, supplier_id) = setup().await;
        let engine = AnalysisEngine::new(db.clone(), 0.0);

        let saved = engine
            .submit_invoice(Uuid::new_v4(), invoice_form(company_id, supplier_id), &mut seeded_rng(12))
            .await
            .unwrap();

        assert_eq!(saved.invoice_file.as_deref(), Some("facture.pdf"));
        assert_eq!(saved.criteria.company_size, 1);
        assert_eq!(AnalysisRepository::new(db.clone()).list().await.unwrap().len(), 1);

        let supplier = SupplierRepository::new(db).get(supplier_id).await.unwrap().unwrap();
        assert_eq!(supplier.risk_level, RiskLevel::from_average(saved.risk_score as f64));
    }

    #[tokio::test]
    async fn test_incomplete_form_is_rejected_before_pipeline() {
        let (db, company_id, _) = setup().await;
        let mut rx = db.events().subscribe();
        let engine = AnalysisEngine::new(db.clone(), 0.0);
        let form = InvoiceForm { company_id: Some(company_id), ..Default::default() };

        let err = engine.submit_invoice(Uuid::new_v4(), form, &mut seeded_rng(1)).await.unwrap_err();
        assert!(matches!(err, EngineError::Wizard(WizardError::Incomplete(1))));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_unknown_supplier() {
        let (db, company_id, _) = setup().await;
        let engine = AnalysisEngine::new(db, 0.0);
        let missing = Uuid::new_v4();
        let err = engine
            .submit_invoice(Uuid::new_v4(), invoice_form(company_id, missing), &mut seeded_rng(1))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::SupplierNotFound(id) if id == missing));
    }

    #[tokio::test]
    async fn test_document_submission_emits_progress_and_completion() {
        let (db, company_id, _) = setup().await;
        let mut rx = db.events().subscribe();
        let engine = AnalysisEngine::new(db.clone(), 0.0);
        let form = DocumentForm {
            file_name: Some("FEC_2024.txt".into()),
            company_id: Some(company_id),
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1),
            end_date: NaiveDate::from_ymd_opt(2024, 12, 31),
        };

        let saved = engine
            .submit_document(Uuid::new_v4(), DocumentKind::Fec, form, &mut seeded_rng(6))
            .await
            .unwrap();
        assert_eq!(saved.file_name, "FEC_2024.txt");

        let mut progress = 0;
        let mut completed = false;
        while let Ok(event) = rx.try_recv() {
            match event {
                AppEvent::AnalysisProgress { kind, .. } => {
                    assert_eq!(kind, Some(DocumentKind::Fec));
                    progress += 1;
                }
                AppEvent::AnalysisCompleted { analysis } => completed = analysis.id == saved.id,
                _ => {}
            }
        }
        assert_eq!(progress, 7);
        assert!(completed);
    }

    #[tokio::test]
    async fn test_reversed_period_is_rejected() {
        let (db, company_id, _) = setup().await;
        let engine = AnalysisEngine::new(db, 0.0);
        let form = DocumentForm {
            file_name: Some("tva.pdf".into()),
            company_id: Some(company_id),
            start_date: NaiveDate::from_ymd_opt(2024, 6, 30),
            end_date: NaiveDate::from_ymd_opt(2024, 1, 1),
        };
        let err = engine
            .submit_document(Uuid::new_v4(), DocumentKind::Tva, form, &mut seeded_rng(2))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Store(StoreError::Validation(_))));
    }
}
