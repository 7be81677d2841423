#![forbid(unsafe_code)]

pub mod ingest;
pub mod reconcile;
pub mod render;
pub mod state;
