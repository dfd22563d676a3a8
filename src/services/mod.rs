// Services module - Remote collaborators of the reconciler

pub mod crm;
pub mod endpoint;
pub mod error_tracker;
pub mod http_service;
pub mod marketplace;

pub use crm::{
    ContactImportService, CrmCall, HttpContactImportService, HttpSyncContactService, InMemoryCrm,
    SyncContactService,
};
pub use error_tracker::{ErrorTracker, ErrorType, MessageCode, RecordingErrorTracker, TracingErrorTracker};
pub use http_service::{CourseService, HttpCourseService, InMemoryCourseService};
pub use marketplace::{HttpMarketplaceService, InMemoryMarketplaceService, MarketplaceService};
