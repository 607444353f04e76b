use std::fmt;
use std::future::{pending, Future};
use std::sync::Arc;

use tracing::{debug, info};

use crate::cache::token::{Token, TokenKind};
use crate::observability::metrics::get_metrics;
use crate::provider::{
    presentation_channel, Presentation, PresentationReceiver, TokenProvider, TokenRequest,
};
use crate::ui::navigation::{Navigator, Screen};
use crate::utils::constants::{TEXT_ERROR, TEXT_INFORMATION, TEXT_NONE, TEXT_TOKEN_ALREADY_AVAILABLE};

/// Switches of the detail screen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DetailOptions {
    pub request_user_token: bool,
    pub force_renewal: bool,
    pub use_custom_presentation: bool,
}

impl DetailOptions {
    pub fn token_kind(&self) -> TokenKind {
        if self.request_user_token {
            TokenKind::User
        } else {
            TokenKind::Client
        }
    }
}

/// Content of the token label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenDisplay {
    None,
    Token { value: String, kind: TokenKind },
}

impl From<Option<Token>> for TokenDisplay {
    fn from(token: Option<Token>) -> Self {
        match token {
            Some(token) => TokenDisplay::Token {
                value: token.value,
                kind: token.kind,
            },
            None => TokenDisplay::None,
        }
    }
}

impl fmt::Display for TokenDisplay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenDisplay::None => f.write_str(TEXT_NONE),
            TokenDisplay::Token { value, kind } => write!(f, "{}\n({})", value, kind.label()),
        }
    }
}

/// Dialog surfaced to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub title: &'static str,
    pub message: String,
}

impl Alert {
    pub fn information(message: impl Into<String>) -> Self {
        Self {
            title: TEXT_INFORMATION,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            title: TEXT_ERROR,
            message: message.into(),
        }
    }
}

impl fmt::Display for Alert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.title, self.message)
    }
}

/// A request issued by the detail screen, with its presentation channel when custom presentation is on.
pub struct PendingRequest {
    pub request: TokenRequest,
    pub presentation: Option<PresentationReceiver>,
}

/// Detail screen for one domain.
pub struct DomainDetail<P> {
    provider: Arc<P>,
    domain: String,
    title: Option<String>,
    pub options: DetailOptions,
    display: TokenDisplay,
}

impl<P: TokenProvider> DomainDetail<P> {
    /// The domain is fixed for the lifetime of the screen. The label is loaded right away.
    pub fn new(provider: Arc<P>, domain: String, title: Option<String>) -> Self {
        let mut detail = Self {
            provider,
            domain,
            title,
            options: DetailOptions::default(),
            display: TokenDisplay::None,
        };
        detail.refresh();
        detail
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn display(&self) -> &TokenDisplay {
        &self.display
    }

    pub fn provider(&self) -> &Arc<P> {
        &self.provider
    }

    /// Reload the token label from the provider cache.
    pub fn refresh(&mut self) -> &TokenDisplay {
        self.display = self.provider.token_for_domain(&self.domain).into();
        &self.display
    }

    /// Issue the request, or refuse when a token is available and renewal is not forced.
    pub async fn start_request(&self) -> Result<PendingRequest, Alert> {
        if self.provider.token_for_domain(&self.domain).is_some() && !self.options.force_renewal {
            info!("token already available for domain '{}'", self.domain);
            get_metrics().await.redundant_requests.inc();
            return Err(Alert::information(TEXT_TOKEN_ALREADY_AVAILABLE));
        }

        let (sender, receiver) = if self.options.use_custom_presentation {
            let (sender, receiver) = presentation_channel();
            (Some(sender), Some(receiver))
        } else {
            (None, None)
        };

        let request = Arc::clone(&self.provider).request_token_for_domain(
            &self.domain,
            self.options.token_kind(),
            sender,
        );
        Ok(PendingRequest {
            request,
            presentation: receiver,
        })
    }

    /// Retrieve a token and refresh the label on success.
    pub async fn request_token(&mut self, navigator: &mut Navigator) -> Result<TokenDisplay, Alert> {
        self.request_token_with(navigator, pending::<()>(), |_| {}).await
    }

    /// Same as [`DomainDetail::request_token`], cancelling the request when `cancel`
    /// resolves first. `on_navigate` is called after every push or pop driven by the provider.
    pub async fn request_token_with<C, F>(
        &mut self,
        navigator: &mut Navigator,
        cancel: C,
        mut on_navigate: F,
    ) -> Result<TokenDisplay, Alert>
    where
        C: Future,
        F: FnMut(&Navigator),
    {
        let PendingRequest {
            mut request,
            mut presentation,
        } = self.start_request().await?;

        tokio::pin!(cancel);
        let mut cancelled = false;
        let result = loop {
            tokio::select! {
                result = &mut request => break result,
                Some(action) = next_presentation(&mut presentation) => {
                    apply_presentation(navigator, action);
                    on_navigate(navigator);
                }
                _ = &mut cancel, if !cancelled => {
                    cancelled = true;
                    request.cancel();
                }
            }
        };

        // presentation requests sent right before completion
        if let Some(receiver) = presentation.as_mut() {
            while let Ok(action) = receiver.try_recv() {
                apply_presentation(navigator, action);
                on_navigate(navigator);
            }
        }
        // a cancelled request never dismisses what it showed
        if navigator.is_presenting_credentials() {
            navigator.pop();
            on_navigate(navigator);
        }

        match result {
            Ok(_) => Ok(self.refresh().clone()),
            Err(err) => Err(Alert::error(err.to_string())),
        }
    }
}

async fn next_presentation(receiver: &mut Option<PresentationReceiver>) -> Option<Presentation> {
    match receiver {
        Some(receiver) => receiver.recv().await,
        None => pending().await,
    }
}

fn apply_presentation(navigator: &mut Navigator, action: Presentation) {
    match action {
        Presentation::Show(view) => {
            debug!("presenting credentials for domain '{}'", view.domain);
            navigator.push(Screen::Credentials(view));
        }
        Presentation::Dismiss => {
            if navigator.is_presenting_credentials() {
                navigator.pop();
            }
        }
    }
}
