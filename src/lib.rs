pub mod api;
pub mod batch;
pub mod dataset;
pub mod error;
pub mod ingest;
pub mod models;
pub mod panel;
pub mod report;
pub mod scoring;
pub mod utils;
