//! Metadata of remote resources and the services mapping it to handles.
//!
//! Each resource kind has its own [`AttributesService`]. A resource found
//! through several connections keeps one handle whose attributes list every
//! [`Requester`] that reached it.

mod model;
mod service;
pub mod uss;

pub use model::{
    AttributesKind, DatasetAttributes, FileAttributes, JobAttributes, MemberAttributes,
    Requester, SpoolFileAttributes, UssAttributes,
};
pub use service::{AttributesListener, AttributesService, RemoteAttributesService};
