#![forbid(unsafe_code)]

pub mod errors;
pub mod group;
pub mod policy;
pub mod report;
pub mod schema;
pub mod timefmt;
pub mod types;
