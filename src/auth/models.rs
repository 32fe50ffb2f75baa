use serde::{Deserialize, Serialize};

/// The signed-in administrator, as provided by the session collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentUser {
    /// Unique user identifier issued by the backend.
    pub user_id: String,
    pub email: String,
    #[serde(default)]
    pub display_name: String,
}

/// Injected session capability.
///
/// Controllers never read ambient storage for tokens; whoever owns the
/// session hands one of these in, and tests substitute their own.
pub trait AuthContext: Send + Sync {
    fn is_authenticated(&self) -> bool;

    fn current_user(&self) -> Option<CurrentUser>;

    /// Bearer token attached to API requests, if any.
    fn bearer_token(&self) -> Option<String>;
}

/// No session. Lists load, mutations are refused.
#[derive(Debug, Clone, Copy, Default)]
pub struct Anonymous;

impl AuthContext for Anonymous {
    fn is_authenticated(&self) -> bool {
        false
    }

    fn current_user(&self) -> Option<CurrentUser> {
        None
    }

    fn bearer_token(&self) -> Option<String> {
        None
    }
}

/// A fixed session, e.g. a token passed on the command line.
#[derive(Debug, Clone)]
pub struct StaticSession {
    user: Option<CurrentUser>,
    token: String,
}

impl StaticSession {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            user: None,
            token: token.into(),
        }
    }

    pub fn with_user(mut self, user: CurrentUser) -> Self {
        self.user = Some(user);
        self
    }
}

impl AuthContext for StaticSession {
    fn is_authenticated(&self) -> bool {
        !self.token.trim().is_empty()
    }

    fn current_user(&self) -> Option<CurrentUser> {
        self.user.clone()
    }

    fn bearer_token(&self) -> Option<String> {
        if self.is_authenticated() {
            Some(self.token.clone())
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anonymous() {
        assert!(!Anonymous.is_authenticated());
        assert!(Anonymous.bearer_token().is_none());
        assert!(Anonymous.current_user().is_none());
    }

    #[test]
    fn test_static_session() {
        let session = StaticSession::new("tok-123").with_user(CurrentUser {
            user_id: "u-1".into(),
            email: "coordinator@example.org".into(),
            display_name: "Sam".into(),
        });
        assert!(session.is_authenticated());
        assert_eq!(session.bearer_token().as_deref(), Some("tok-123"));
        assert_eq!(session.current_user().unwrap().user_id, "u-1");
    }

    #[test]
    fn test_blank_token_is_not_a_session() {
        let session = StaticSession::new("  ");
        assert!(!session.is_authenticated());
        assert!(session.bearer_token().is_none());
    }

    #[test]
    fn test_current_user_deserializes_without_display_name() {
        let user: CurrentUser =
            serde_json::from_str(r#"{"userId": "u-9", "email": "a@example.org"}"#).unwrap();
        assert_eq!(user.user_id, "u-9");
        assert!(user.display_name.is_empty());
    }
}
