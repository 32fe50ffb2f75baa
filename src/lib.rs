//! Typed client-side controllers for the site's REST collections: events,
//! volunteer roles, social links, contact details, trust partners, study
//! materials and the gallery.

pub mod api {
    pub mod client;
    pub mod errors;
    #[cfg(feature = "http")]
    pub mod http;
}
pub mod auth;
pub mod capabilities;
pub mod config;
pub mod controller;
pub mod error;
pub mod identity;
pub mod models;
pub mod offline;
pub mod query;
pub mod resource;

pub use controller::{ListState, Mode, Phase, Removal, ResourceController};
pub use error::{ControllerError, FieldErrors};
pub use identity::RecordId;
pub use query::{ListQuery, SortDirection, StatusFilter};
pub use resource::Resource;
