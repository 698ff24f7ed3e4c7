//! Company repository.

use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;
use vigitva_common::{Company, CompanyPatch, NewCompany};

use crate::database::{Change, Database};
use crate::error::Result;
use crate::schema::COLLECTION_COMPANIES;

/// Repository for company operations.
#[derive(Clone)]
pub struct CompanyRepository {
    db: Arc<Database>,
}

impl CompanyRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// All companies in insertion order.
    pub async fn list(&self) -> Result<Vec<Company>> {
        self.db.load(COLLECTION_COMPANIES).await
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<Company>> {
        Ok(self.list().await?.into_iter().find(|c| c.id == id))
    }

    /// Validate, assign a fresh id and timestamp, append.
    pub async fn save(&self, input: NewCompany) -> Result<Company> {
        input.validate()?;
        let company = input.into_company(Uuid::new_v4(), Utc::now());
        let saved = company.clone();
        self.db
            .update(COLLECTION_COMPANIES, move |items: &mut Vec<Company>| {
                items.push(company);
                Change::Commit(())
            })
            .await?;
        tracing::info!(company_id = %saved.id, name = %saved.name, "Company saved");
        Ok(saved)
    }

    /// Apply a partial update. `None` when the id is unknown.
    pub async fn update(&self, id: Uuid, patch: CompanyPatch) -> Result<Option<Company>> {
        let outcome = self
            .db
            .update(COLLECTION_COMPANIES, move |items: &mut Vec<Company>| {
                match items.iter_mut().find(|c| c.id == id) {
                    Some(company) => match patch.apply(company) {
                        Ok(()) => Change::Commit(Ok(Some(company.clone()))),
                        Err(e) => Change::Keep(Err(e)),
                    },
                    None => Change::Keep(Ok(None)),
                }
            })
            .await?;
        Ok(outcome?)
    }

    /// Remove the company with this id. Analyses referencing it are kept.
    pub async fn delete(&self, id: Uuid) -> Result<bool> {
        let removed = self
            .db
            .update(COLLECTION_COMPANIES, move |items: &mut Vec<Company>| {
                match items.iter().position(|c| c.id == id) {
                    Some(idx) => {
                        items.remove(idx);
                        Change::Commit(true)
                    }
                    None => Change::Keep(false),
                }
            })
            .await?;
        if removed {
            tracing::info!(company_id = %id, "Company deleted");
        }
        Ok(removed)
    }

    pub async fn count(&self) -> Result<usize> {
        Ok(self.list().await?.len())
    }
}
