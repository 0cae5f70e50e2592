//! Real-time propagation of committed changes to connected viewers.
//!
//! The hub is process-local. [`ChangePublisher`] is where a shared pub/sub
//! transport would plug in for multi-instance deployments.

mod events;
mod notifier;
mod registry;

pub use events::{Change, ChangeEvent, ChangeKind, ChangePayload, ChangedRecord};
pub use notifier::{ChangeNotifier, ChangePublisher, Dispatcher, PublishError};
pub use registry::{FanOutReport, SessionMessage, SessionRegistry, ViewerSession};
