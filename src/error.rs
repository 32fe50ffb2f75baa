use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Field-level validation messages, keyed by field name.
///
/// Ordered so that error output is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an error for `field`. The first message for a field wins.
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_insert_with(|| message.into());
    }

    /// Record a "required" error when `value` is empty after trimming.
    pub fn require(&mut self, field: &str, value: &str) {
        if value.trim().is_empty() {
            self.add(field, format!("{field} is required"));
        }
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// `Ok(())` when no field failed, otherwise the collected errors.
    pub fn into_result(self) -> Result<(), FieldErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, message) in &self.0 {
            if !first {
                write!(f, "; ")?;
            }
            write!(f, "{field}: {message}")?;
            first = false;
        }
        Ok(())
    }
}

impl FromIterator<(String, String)> for FieldErrors {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        let mut errors = FieldErrors::new();
        for (field, message) in iter {
            errors.add(field, message);
        }
        errors
    }
}

/// Errors surfaced by a resource controller operation.
///
/// None of these are fatal to the controller: the cache is always left in its
/// last-known-good state.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ControllerError {
    #[error("Validation failed: {0}")]
    Validation(FieldErrors),

    #[error("Missing identity: {0}")]
    MissingIdentity(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    #[error("Malformed response: {0}")]
    Decode(String),

    #[error("Invalid client configuration: {0}")]
    Config(String),

    #[error("Another operation is pending for record {0}")]
    Busy(String),

    #[error("Not signed in")]
    Unauthenticated,

    #[error("Changes are disabled while offline")]
    Offline,

    #[error("View detached before the response arrived")]
    Detached,
}

impl ControllerError {
    /// Message suitable for a dismissible banner.
    ///
    /// Identity failures are data-integrity problems the user cannot fix, so
    /// they collapse to a generic message.
    pub fn user_message(&self) -> String {
        match self {
            ControllerError::MissingIdentity(_) | ControllerError::Decode(_) => {
                "The action failed. Please reload and try again.".to_string()
            }
            ControllerError::Validation(fields) => format!("Please fix the highlighted fields ({fields})"),
            ControllerError::Network(_) => {
                "Could not reach the server. Check your connection and retry.".to_string()
            }
            ControllerError::Server { message, .. } => message.clone(),
            ControllerError::Config(_) => {
                "The admin client is misconfigured. Contact the site administrator.".to_string()
            }
            ControllerError::Busy(_) => "Please wait for the previous action to finish.".to_string(),
            ControllerError::Unauthenticated => "Please sign in to make changes.".to_string(),
            ControllerError::Offline => {
                "You are viewing offline data. Changes are disabled.".to_string()
            }
            ControllerError::Detached => String::new(),
        }
    }

    /// Field-level messages, when this is a validation failure.
    pub fn field_errors(&self) -> Option<&FieldErrors> {
        match self {
            ControllerError::Validation(fields) => Some(fields),
            _ => None,
        }
    }
}
