pub mod client;
pub mod connection;
pub mod dashboard;
pub mod file_upload;
pub mod ml_slot;
pub mod query_cache;
pub mod saved_query;
pub mod tenant;
pub mod user;
pub mod verification;
pub mod workflow;

pub use client::Client;
pub use connection::ExternalConnection;
pub use dashboard::{Dashboard, DashboardWidget};
pub use file_upload::FileUpload;
pub use ml_slot::{MlSlot, MlSlotUsage};
pub use query_cache::QueryCacheRow;
pub use saved_query::SavedQuery;
pub use tenant::Tenant;
pub use user::User;
pub use verification::VerificationCode;
pub use workflow::{TaskTemplate, Workflow};
