//! Browser capabilities (confirm dialogs, clipboard, native share) as
//! injectable traits, so controller logic runs without a browser.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CapabilityError {
    #[error("Capability unavailable: {0}")]
    Unavailable(String),

    #[error("Dismissed by the user")]
    Dismissed,

    #[error("Capability failed: {0}")]
    Failed(String),
}

/// What the user is asked before an irreversible action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmPrompt {
    pub title: String,
    pub message: String,
}

impl ConfirmPrompt {
    pub fn delete(resource: &str, name: &str) -> Self {
        Self {
            title: format!("Delete from {resource}?"),
            message: format!("\"{name}\" will be permanently deleted. This cannot be undone."),
        }
    }
}

/// Asks the user to confirm. Implementations: a modal, a terminal prompt...
#[async_trait]
pub trait Confirmer: Send + Sync {
    async fn confirm(&self, prompt: &ConfirmPrompt) -> bool;
}

/// Confirms everything (`--yes`).
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoConfirm;

#[async_trait]
impl Confirmer for AutoConfirm {
    async fn confirm(&self, _prompt: &ConfirmPrompt) -> bool {
        true
    }
}

/// Declines everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct Decline;

#[async_trait]
impl Confirmer for Decline {
    async fn confirm(&self, _prompt: &ConfirmPrompt) -> bool {
        false
    }
}

#[async_trait]
pub trait Clipboard: Send + Sync {
    async fn write_text(&self, text: &str) -> Result<(), CapabilityError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharePayload {
    pub title: String,
    pub text: String,
    pub url: String,
}

impl SharePayload {
    /// Payload for a public record page at `<site>/<resource>/<id>`.
    pub fn for_record(site_url: &url::Url, resource: &str, id: &str, title: &str) -> Self {
        let url = site_url
            .join(&format!("{resource}/{id}"))
            .map(|u| u.to_string())
            .unwrap_or_else(|_| format!("{}/{resource}/{id}", site_url.as_str().trim_end_matches('/')));
        Self {
            title: title.to_string(),
            text: format!("Check out \"{title}\""),
            url,
        }
    }
}

/// Native share sheet.
#[async_trait]
pub trait Sharer: Send + Sync {
    async fn share(&self, payload: &SharePayload) -> Result<(), CapabilityError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShareOutcome {
    Shared,
    Copied,
}

/// Use the native share sheet when there is one, otherwise copy the link.
///
/// A share the user dismissed is reported as such and does not fall back.
pub async fn share_or_copy(
    sharer: Option<&dyn Sharer>,
    clipboard: &dyn Clipboard,
    payload: &SharePayload,
) -> Result<ShareOutcome, CapabilityError> {
    if let Some(sharer) = sharer {
        match sharer.share(payload).await {
            Ok(()) => return Ok(ShareOutcome::Shared),
            Err(CapabilityError::Dismissed) => return Err(CapabilityError::Dismissed),
            Err(e) => tracing::debug!("Native share failed, copying link instead: {e}"),
        }
    }
    clipboard.write_text(&payload.url).await?;
    Ok(ShareOutcome::Copied)
}
