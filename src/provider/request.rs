use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;

use tokio::sync::oneshot;
use tokio::task::AbortHandle;
use tracing::{error, info, warn};

use crate::cache::token::{Token, TokenKind};
use crate::observability::metrics::get_metrics;
use crate::provider::{PresentationSender, ProviderError, TokenProvider};

/// Handle on an in-flight token request.
///
/// Awaiting it yields the single completion: the token, the provider error, or
/// [`ProviderError::AuthorizationCancelled`] once [`TokenRequest::cancel`] was called.
/// A fetch task that dies without answering completes with [`ProviderError::Unknown`].
#[derive(Debug)]
pub struct TokenRequest {
    domain: String,
    kind: TokenKind,
    receiver: oneshot::Receiver<Result<Token, ProviderError>>,
    abort: AbortHandle,
    cancelled: AtomicBool,
}

impl TokenRequest {
    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn kind(&self) -> TokenKind {
        self.kind
    }

    pub fn cancel(&self) {
        info!("cancelling {} token request for domain '{}'", self.kind.as_str(), self.domain);
        self.cancelled.store(true, Ordering::SeqCst);
        self.abort.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.abort.is_finished()
    }
}

impl Future for TokenRequest {
    type Output = Result<Token, ProviderError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let received = match Pin::new(&mut self.receiver).poll(cx) {
            Poll::Ready(received) => received,
            Poll::Pending => return Poll::Pending,
        };
        Poll::Ready(match received {
            Ok(result) => result,
            Err(_) if self.cancelled.load(Ordering::SeqCst) => Err(ProviderError::AuthorizationCancelled),
            Err(_) => {
                error!(
                    "{} token request for domain '{}' ended without a result",
                    self.kind.as_str(),
                    self.domain
                );
                Err(ProviderError::Unknown)
            }
        })
    }
}

pub(crate) fn spawn<P: TokenProvider>(
    provider: Arc<P>,
    domain: &str,
    kind: TokenKind,
    presentation: Option<PresentationSender>,
) -> TokenRequest {
    let (sender, receiver) = oneshot::channel();
    let task_domain = domain.to_owned();

    let handle = tokio::spawn(async move {
        let metrics = get_metrics().await;
        metrics.token_requests.with_label_values(&[kind.as_str()]).inc();
        let start = Instant::now();
        info!("requesting {} token for domain '{}'", kind.as_str(), task_domain);

        let result = provider.fetch_token(&task_domain, kind, presentation).await;

        metrics
            .token_request_duration
            .with_label_values(&[kind.as_str()])
            .observe(start.elapsed().as_secs_f64());
        match &result {
            Ok(_) => info!("{} token obtained for domain '{}'", kind.as_str(), task_domain),
            Err(err) => {
                warn!("{} token request for domain '{}' failed: {}", kind.as_str(), task_domain, err);
                metrics.token_request_failures.with_label_values(&[err.reason()]).inc();
            }
        }

        // receiver gone means nobody waits for the completion anymore
        let _ = sender.send(result);
    });

    TokenRequest {
        domain: domain.to_owned(),
        kind,
        receiver,
        abort: handle.abort_handle(),
        cancelled: AtomicBool::new(false),
    }
}
