//! Taskdeck client library exports.

pub mod api_client;
pub mod caches;
pub mod config;
pub mod coordinator;
pub mod debounce;
pub mod error;
pub mod invalidation;
pub mod notifications;
pub mod persistence;
pub mod remote;
pub mod view;

pub use caches::Caches;
pub use coordinator::{MutationCoordinator, ToggleHandle, ToggleOutcome};
pub use error::{ClientError, MutationError};
pub use invalidation::{Mutation, Namespace, Settlement};
pub use remote::RemoteStore;
pub use view::{EmptyState, PageInfo, TaskView, ViewSnapshot};
