pub mod batch;
pub mod call;
pub mod executor;
pub mod paginated;
pub mod retry_manager;
pub mod timeout_manager;

// Re-export commonly used types
pub use batch::BatchExecutor;
pub use call::RemoteCall;
pub use executor::CallExecutor;
pub use paginated::PaginatedExecutor;
pub use retry_manager::{ErrorClassification, RetryDecision, RetryManager};
pub use timeout_manager::TimeoutManager;

pub use tokio_util::sync::CancellationToken;
