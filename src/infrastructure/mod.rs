pub mod catalog_store;
pub mod intent_parser;
pub mod job_store;
pub mod models;
