//! Universal connector: type-dispatched access to external PostgreSQL,
//! MySQL, SQL Server, REST API and webhook endpoints, with a
//! database-backed result cache. Every call opens and tears down its own
//! short-lived connection.

pub mod cache;
pub mod http;
pub mod mysql;
pub mod postgres;
pub mod service;
pub mod sqlserver;
pub mod types;

pub use cache::QueryCache;
pub use service::ConnectorService;
pub use types::{ConnectionKind, ConnectionSpec, ConnectorError, QueryRequest, QueryResponse, TestOutcome};
