pub mod assembler;
pub mod config;
pub mod data_models;
pub mod db;
pub mod errors;
pub mod logging;
pub mod metrics;
pub mod monitor;
pub mod pacing;
pub mod parser;
pub mod retry;
pub mod serial;
pub mod validation;
