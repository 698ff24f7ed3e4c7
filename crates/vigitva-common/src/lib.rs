//! vigitva-common: Shared types, errors, and scoring rules used across all VigiTVA crates.

pub mod error;
pub mod entities;
pub mod risk;
pub mod vat;

// Re-export commonly used types
pub use entities::{
    Anomaly, AnalysisStatus, Company, CompanyPatch, Criteria, DocumentAnalysis, DocumentKind,
    InvoiceAnalysis, NewCompany, NewDocumentAnalysis, NewInvoiceAnalysis, NewSupplier, Period,
    Severity, Supplier, SupplierPatch,
};
pub use error::{Result, VigitvaError};
pub use risk::{RiskDistribution, RiskLevel};
