pub mod models;

pub use models::{Anonymous, AuthContext, CurrentUser, StaticSession};
