//! VigiTVA storage layer
//!
//! An embedded JSON collection store for companies, suppliers and the
//! analyses run against them, plus the in-process event bus and the
//! aggregate statistics computed over the stored data.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use vigitva_db::{CompanyRepository, Database};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Arc::new(Database::open("./data").await?);
//!     let companies = CompanyRepository::new(db.clone());
//!     println!("{} companies", companies.count().await?);
//!     Ok(())
//! }
//! ```

pub mod analyses;
pub mod companies;
pub mod database;
pub mod documents;
pub mod error;
pub mod events;
pub mod schema;
pub mod seed;
pub mod stats;
pub mod suppliers;

pub use analyses::AnalysisRepository;
pub use companies::CompanyRepository;
pub use database::{Change, Database};
pub use documents::DocumentRepository;
pub use error::{Result, StoreError};
pub use events::{AppEvent, EventBus};
pub use seed::{seed_demo_data, SeedReport};
pub use stats::StatsRepository;
pub use suppliers::SupplierRepository;
