//! Batch analysis of Korean listed companies from public disclosure data:
//! registry loading, statement fetching, ratio derivation, and keyword
//! classification of audit opinions and internal-control assessments.

pub mod analysis;
pub mod api;
pub mod classifier;
pub mod collector;
pub mod extractor;
pub mod models;
pub mod registry;
pub mod report;
