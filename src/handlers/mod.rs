pub mod auth;
pub mod clients;
pub mod connections;
pub mod dashboards;
pub mod ml_slots;
pub mod public;
pub mod queries;
pub mod storage;
pub mod verification;
pub mod workflows;
