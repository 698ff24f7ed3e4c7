//! Collection keys. Each key maps to one JSON array file, `<key>.json`.

use vigitva_common::DocumentKind;

pub const COLLECTION_COMPANIES: &str = "tva-fraud-companies";
pub const COLLECTION_SUPPLIERS: &str = "tva-fraud-suppliers";
pub const COLLECTION_ANALYSES: &str = "tva-fraud-analyses";
pub const COLLECTION_FEC: &str = "tva-fraud-fec-analyses";
pub const COLLECTION_TVA: &str = "tva-fraud-tva-declarations";
pub const COLLECTION_JOURNAL: &str = "tva-fraud-journal-analyses";
pub const COLLECTION_BANK: &str = "tva-fraud-bank-flux-analyses";

pub const ALL_COLLECTIONS: [&str; 7] = [
    COLLECTION_COMPANIES,
    COLLECTION_SUPPLIERS,
    COLLECTION_ANALYSES,
    COLLECTION_FEC,
    COLLECTION_TVA,
    COLLECTION_JOURNAL,
    COLLECTION_BANK,
];

pub fn document_collection(kind: DocumentKind) -> &'static str {
    match kind {
        DocumentKind::Fec     => COLLECTION_FEC,
        DocumentKind::Tva     => COLLECTION_TVA,
        DocumentKind::Journal => COLLECTION_JOURNAL,
        DocumentKind::Bank    => COLLECTION_BANK,
    }
}
