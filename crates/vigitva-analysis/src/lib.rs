//! vigitva-analysis: invoice and document risk analysis.
//!
//! Scoring, the staged progress pipeline, batch runs, the form wizards,
//! the AI advisor with its simulated fallback, and report rendering.

pub mod advisor;
pub mod batch;
pub mod documents;
pub mod engine;
pub mod pipeline;
pub mod report;
pub mod scorer;
pub mod wizard;

pub use advisor::{Advice, AdviceSource, AdvisorAnalysis, InvoiceAdvisor};
pub use batch::{BatchFile, BatchFileStatus, BatchJob, BatchRunner, BatchSummary, SharedBatch};
pub use documents::DocumentAnalyzer;
pub use engine::{AnalysisEngine, EngineError};
pub use pipeline::{ProgressPipeline, Stage};
pub use report::{NameBook, ReportData, ReportError, ReportFilter, ReportPeriod};
pub use scorer::{InvoiceScorer, InvoiceVerdict};
pub use wizard::{DocumentForm, InvoiceForm, UploadMethod, Wizard, WizardError, WizardForm};
