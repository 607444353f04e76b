//! Token provider seam.
//!
//! The screens only talk to a [`TokenProvider`]: a synchronous cache lookup,
//! an asynchronous token fetch and a discard. [`cpa::CpaProvider`] speaks the
//! CPA protocol over HTTP; tests plug in scripted providers.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::mpsc;
use url::Url;

use crate::cache::token::{Token, TokenKind};

pub mod cpa;
pub mod error;
pub mod request;
pub mod wire;

pub use error::ProviderError;
pub use request::TokenRequest;

/// What the user needs to complete a user-token authorization on another screen or device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialsView {
    pub domain: String,
    pub verification_url: Url,
    pub user_code: String,
}

/// Presentation requests sent by the provider while a user token is being obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Presentation {
    Show(CredentialsView),
    Dismiss,
}

pub type PresentationSender = mpsc::UnboundedSender<Presentation>;
pub type PresentationReceiver = mpsc::UnboundedReceiver<Presentation>;

pub fn presentation_channel() -> (PresentationSender, PresentationReceiver) {
    mpsc::unbounded_channel()
}

pub trait TokenProvider: Send + Sync + 'static {
    /// Base URL of the authorization provider
    fn authorization_provider_url(&self) -> &Url;

    /// Token locally available for `domain`, no network I/O. Expired tokens are absent.
    fn token_for_domain(&self, domain: &str) -> Option<Token>;

    /// Obtain a new token and cache it, replacing any previous one for the domain.
    ///
    /// When `presentation` is `None` the provider presents credentials its own way.
    fn fetch_token(
        &self,
        domain: &str,
        kind: TokenKind,
        presentation: Option<PresentationSender>,
    ) -> impl Future<Output = Result<Token, ProviderError>> + Send;

    /// Drop the locally available token for `domain`, if any.
    fn discard_token_for_domain(&self, domain: &str) -> impl Future<Output = ()> + Send;

    /// Start a token request on the runtime. The returned handle completes exactly once.
    fn request_token_for_domain(
        self: Arc<Self>,
        domain: &str,
        kind: TokenKind,
        presentation: Option<PresentationSender>,
    ) -> TokenRequest
    where
        Self: Sized,
    {
        request::spawn(self, domain, kind, presentation)
    }
}
