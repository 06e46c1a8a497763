pub mod dashboard_service;
pub mod delivery;
pub mod ml_slot_service;
pub mod saved_query_service;
pub mod storage_service;
pub mod trial_service;
pub mod verification_service;
pub mod workflow_service;

pub use dashboard_service::DashboardService;
pub use ml_slot_service::MlSlotService;
pub use saved_query_service::SavedQueryService;
pub use storage_service::StorageService;
pub use trial_service::TrialService;
pub use verification_service::VerificationService;
pub use workflow_service::WorkflowService;
