//! Application use cases / business logic

pub mod lifecycle;
pub mod publish_pass;
pub mod report;
pub mod select;
mod throttle;

pub use lifecycle::{LifecycleError, PostLifecycle};
pub use publish_pass::{PassError, PublishPass, PublishPassConfig, Publishers};
pub use report::{PostOutcome, RunSummary};
pub use select::{is_due, select_due};
