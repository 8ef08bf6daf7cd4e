//! Identity provider contract and a local implementation.
//!
//! The session consults [`IdentityProvider::current`] before every write and
//! follows [`IdentityProvider::watch`] to reconnect when the identity changes.

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::sync::watch;

use crate::error::{Result, SaathiError};

/// An established identity. The id is opaque and stable for its lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    uid: String,
    anonymous: bool,
}

impl Identity {
    pub fn new(uid: impl Into<String>, anonymous: bool) -> Self {
        Self {
            uid: uid.into(),
            anonymous,
        }
    }

    pub fn uid(&self) -> &str {
        &self.uid
    }

    pub fn is_anonymous(&self) -> bool {
        self.anonymous
    }

    /// Avatar letter: first character of the id, uppercased.
    pub fn initial(&self) -> String {
        self.uid
            .chars()
            .next()
            .map(|c| c.to_uppercase().collect())
            .unwrap_or_default()
    }

    /// Truncated id for compact display.
    pub fn short_id(&self) -> String {
        let head: String = self.uid.chars().take(10).collect();
        format!("{head}...")
    }
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// The current identity, if one is established.
    fn current(&self) -> Option<Identity>;

    async fn sign_in_anonymously(&self) -> Result<Identity>;

    /// Sign in with an externally issued token.
    async fn sign_in_with_token(&self, token: &str) -> Result<Identity>;

    /// Change notifications. The receiver starts with the current value.
    fn watch(&self) -> watch::Receiver<Option<Identity>>;

    /// Sign in with a token, falling back to anonymous sign-in if it is refused.
    async fn sign_in_with_token_or_anonymous(&self, token: &str) -> Result<Identity> {
        match self.sign_in_with_token(token).await {
            Ok(identity) => Ok(identity),
            Err(e) => {
                tracing::warn!(error = %e, "token sign-in failed, signing in anonymously");
                self.sign_in_anonymously().await
            }
        }
    }
}

/// Longest token accepted by [`LocalIdentityProvider`].
const MAX_TOKEN_LEN: usize = 128;

/// Local identity provider.
///
/// Anonymous identities get a fresh UUID v7. A token is accepted when it is a
/// non-empty string of ASCII alphanumerics, `-`, or `_`, and the token itself
/// becomes the id. With a state file, the last identity survives restarts.
pub struct LocalIdentityProvider {
    state: watch::Sender<Option<Identity>>,
    state_file: Option<PathBuf>,
}

impl LocalIdentityProvider {
    /// An in-process provider with no identity.
    pub fn new() -> Self {
        let (state, _) = watch::channel(None);
        Self {
            state,
            state_file: None,
        }
    }

    /// A provider that restores and persists the identity at `path`.
    pub fn persistent(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let restored = std::fs::read_to_string(&path)
            .ok()
            .and_then(|contents| parse_state(&contents));
        if let Some(ref identity) = restored {
            tracing::info!(uid = %identity.uid(), "restored identity");
        }
        let (state, _) = watch::channel(restored);
        Self {
            state,
            state_file: Some(path),
        }
    }

    fn establish(&self, identity: Identity) -> Identity {
        if let Some(ref path) = self.state_file {
            if let Err(e) = persist_state(path, &identity) {
                tracing::warn!(path = %path.display(), error = %e, "failed to persist identity");
            }
        }
        tracing::info!(uid = %identity.uid(), anonymous = identity.is_anonymous(), "signed in");
        self.state.send_replace(Some(identity.clone()));
        identity
    }
}

impl Default for LocalIdentityProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IdentityProvider for LocalIdentityProvider {
    fn current(&self) -> Option<Identity> {
        self.state.borrow().clone()
    }

    async fn sign_in_anonymously(&self) -> Result<Identity> {
        let uid = uuid::Uuid::now_v7().simple().to_string();
        Ok(self.establish(Identity::new(uid, true)))
    }

    async fn sign_in_with_token(&self, token: &str) -> Result<Identity> {
        let token = token.trim();
        let valid = !token.is_empty()
            && token.len() <= MAX_TOKEN_LEN
            && token
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(SaathiError::Authentication("token rejected".into()));
        }
        Ok(self.establish(Identity::new(token, false)))
    }

    fn watch(&self) -> watch::Receiver<Option<Identity>> {
        self.state.subscribe()
    }
}

/// State file format: `<uid>` on the first line, `anonymous` or `token` on the second.
fn parse_state(contents: &str) -> Option<Identity> {
    let mut lines = contents.lines();
    let uid = lines.next()?.trim();
    if uid.is_empty() {
        return None;
    }
    let anonymous = lines.next().map(str::trim) != Some("token");
    Some(Identity::new(uid, anonymous))
}

fn persist_state(path: &std::path::Path, identity: &Identity) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let kind = if identity.is_anonymous() { "anonymous" } else { "token" };
    std::fs::write(path, format!("{}\n{kind}\n", identity.uid()))
}
