//! vigitva-web: HTTP server for VigiTVA.
//! Provides:
//!   - JSON API for companies, suppliers and analyses
//!   - The AI invoice proxy with its simulated fallback
//!   - CSV, HTML and text report downloads
//!   - Server-sent events for live progress
//!   - The server-rendered dashboard

pub mod error;
pub mod handlers;
pub mod router;
pub mod sse;
pub mod state;
pub mod templates;
pub mod weather;
