pub mod error;
pub mod notify;
pub mod options;
pub mod pagination;
pub mod state;

// Re-export commonly used types
pub use error::{
    CallError, CallFailure, CallResult, EngineError, EngineResult, ErrorKind, FALLBACK_MESSAGE,
    NETWORK_MESSAGE, TIMEOUT_MESSAGE,
};
pub use notify::{
    NoopNotifier, Notification, NotificationKind, Notifier, RecordingNotifier, TracingNotifier,
};
pub use options::{CallOptions, PaginationOptions};
pub use pagination::{Page, PageRequest, PaginationState};
pub use state::{CallState, CallStatus};
