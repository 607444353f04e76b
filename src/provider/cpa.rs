use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};
use tracing::{debug, error, info, warn};
use url::Url;

use crate::cache::token::{Identity, Token, TokenKind};
use crate::cache::token_store::TokenStore;
use crate::config::error::ConfigError;
use crate::config::settings::ProviderConfig;
use crate::helpers::time::expires_at;
use crate::observability::metrics::get_metrics;
use crate::provider::wire::{
    AssociateRequest, AssociateResponse, ClientTokenRequest, DeviceTokenRequest, RegisterRequest,
    RegisterResponse, StatusBody, TokenResponse,
};
use crate::provider::{CredentialsView, Presentation, PresentationSender, ProviderError, TokenProvider};
use crate::resilience::retry::RetrySettings;
use crate::utils::constants::{
    ENDPOINT_ASSOCIATE, ENDPOINT_REGISTER, ENDPOINT_TOKEN, GRANT_CLIENT_CREDENTIALS,
    GRANT_DEVICE_CODE, SLOW_DOWN_INCREMENT_SECS,
};

const MIN_POLL_INTERVAL_MS: u64 = 100;

/// Outcome of a CPA call: either the expected body or a "not yet" answer.
enum Reply<T> {
    Ready(T),
    Pending(ProviderError),
}

impl<T> Reply<T> {
    fn ready(self) -> Result<T, ProviderError> {
        match self {
            Reply::Ready(value) => Ok(value),
            Reply::Pending(err) => Err(err),
        }
    }
}

/// Authentication provider speaking CPA (EBU Tech 3366) with an authorization provider.
///
/// Client mode associates the application with an anonymous identity. User mode
/// links it with a user account: the user visits a verification URL, enters the
/// user code, and the provider polls the token endpoint until authorization is
/// granted, denied or expired.
#[derive(Debug, Clone)]
pub struct CpaProvider {
    url: Url,
    config: ProviderConfig,
    client: Client,
    store: TokenStore,
    retry: RetrySettings,
    registration: Arc<Mutex<()>>,
}

impl CpaProvider {
    pub fn new(
        url: Url,
        config: ProviderConfig,
        store: TokenStore,
        retry: RetrySettings,
    ) -> Result<Self, ConfigError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(|e| ConfigError::InvalidProviderUrl {
                url: url.to_string(),
                reason: format!("cannot build HTTP client: {}", e),
            })?;

        Ok(Self {
            url: with_trailing_slash(url),
            config,
            client,
            store,
            retry,
            registration: Arc::new(Mutex::new(())),
        })
    }

    pub fn store(&self) -> &TokenStore {
        &self.store
    }

    fn endpoint(&self, name: &str) -> Result<Url, ProviderError> {
        self.url.join(name).map_err(|_| ProviderError::InvalidRequest)
    }

    /// Registered identity, registering the client first when none is cached.
    async fn identity(&self) -> Result<Identity, ProviderError> {
        if let Some(identity) = self.store.identity() {
            return Ok(identity);
        }
        let _registering = self.registration.lock().await;
        // registered by a concurrent request while waiting
        if let Some(identity) = self.store.identity() {
            return Ok(identity);
        }

        info!("registering client '{}' with {}", self.config.client_name, self.url);
        let body = RegisterRequest {
            client_name: &self.config.client_name,
            software_id: &self.config.software_id,
            software_version: &self.config.software_version,
        };
        let registered: RegisterResponse = self.post(ENDPOINT_REGISTER, &body).await?.ready()?;
        get_metrics().await.client_registrations.inc();

        let identity = Identity::new(registered.client_id, registered.client_secret);
        self.store.set_identity(identity.clone());
        self.persist().await;
        Ok(identity)
    }

    async fn fetch_with_identity(
        &self,
        identity: &Identity,
        domain: &str,
        kind: TokenKind,
        presentation: Option<&PresentationSender>,
    ) -> Result<Token, ProviderError> {
        match kind {
            TokenKind::Client => self.request_client_token(identity, domain).await,
            TokenKind::User => self.request_user_token(identity, domain, presentation).await,
        }
    }

    async fn request_client_token(&self, identity: &Identity, domain: &str) -> Result<Token, ProviderError> {
        let body = ClientTokenRequest {
            grant_type: GRANT_CLIENT_CREDENTIALS,
            client_id: &identity.identifier,
            client_secret: &identity.secret,
            domain,
        };
        let response: TokenResponse = self.post(ENDPOINT_TOKEN, &body).await?.ready()?;
        Ok(to_token(response, domain, TokenKind::Client))
    }

    async fn request_user_token(
        &self,
        identity: &Identity,
        domain: &str,
        presentation: Option<&PresentationSender>,
    ) -> Result<Token, ProviderError> {
        let body = AssociateRequest {
            client_id: &identity.identifier,
            client_secret: &identity.secret,
            domain,
        };
        let association: AssociateResponse = self.post(ENDPOINT_ASSOCIATE, &body).await?.ready()?;
        let verification_url = Url::parse(&association.verification_uri).map_err(|e| {
            error!("invalid verification_uri '{}': {}", association.verification_uri, e);
            ProviderError::InvalidResponse
        })?;

        let view = CredentialsView {
            domain: domain.to_owned(),
            verification_url,
            user_code: association.user_code.clone(),
        };
        present(presentation, Presentation::Show(view));
        let result = self.poll_user_token(identity, domain, &association).await;
        present(presentation, Presentation::Dismiss);
        result
    }

    async fn poll_user_token(
        &self,
        identity: &Identity,
        domain: &str,
        association: &AssociateResponse,
    ) -> Result<Token, ProviderError> {
        let metrics = get_metrics().await;
        let Some(deadline) = Instant::now().checked_add(Duration::from_secs(association.expires_in)) else {
            error!("authorization request lifetime out of range: {}s", association.expires_in);
            return Err(ProviderError::InvalidResponse);
        };
        let mut interval_ms = association.interval.saturating_mul(1000).max(MIN_POLL_INTERVAL_MS);

        loop {
            sleep(Duration::from_millis(interval_ms)).await;
            if Instant::now() >= deadline {
                warn!("authorization request for domain '{}' expired", domain);
                return Err(ProviderError::AuthorizationRequestExpired);
            }

            metrics.authorization_polls.inc();
            let body = DeviceTokenRequest {
                grant_type: GRANT_DEVICE_CODE,
                device_code: &association.device_code,
                client_id: &identity.identifier,
                client_secret: &identity.secret,
                domain,
            };
            match self.post::<TokenResponse, _>(ENDPOINT_TOKEN, &body).await {
                Ok(Reply::Ready(response)) => return Ok(to_token(response, domain, TokenKind::User)),
                Ok(Reply::Pending(ProviderError::TooFast)) | Err(ProviderError::TooFast) => {
                    interval_ms = slowed_down(interval_ms);
                    debug!("slow down requested, polling every {} ms", interval_ms);
                }
                Ok(Reply::Pending(_)) | Err(ProviderError::PendingAuthorization) => {
                    debug!("authorization pending for domain '{}'", domain);
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// POST a JSON body, retrying transport failures.
    async fn post<T, B>(&self, endpoint: &str, body: &B) -> Result<Reply<T>, ProviderError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let url = self.endpoint(endpoint)?;
        self.retry
            .run_with_retry(|| self.post_once(url.clone(), body))
            .await
    }

    async fn post_once<T, B>(&self, url: Url, body: &B) -> Result<Reply<T>, ProviderError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        debug!("POST {}", url);
        let response = self.client.post(url).json(body).send().await?;
        let status = response.status();
        let text = response.text().await?;

        match status {
            StatusCode::ACCEPTED => {
                let pending: StatusBody = serde_json::from_str(&text).unwrap_or_default();
                let reason = pending.reason.or(pending.error).unwrap_or_default();
                Ok(Reply::Pending(match ProviderError::from_identifier(&reason) {
                    ProviderError::TooFast => ProviderError::TooFast,
                    _ => ProviderError::PendingAuthorization,
                }))
            }
            s if s.is_success() => serde_json::from_str(&text).map(Reply::Ready).map_err(|e| {
                error!("invalid response body: {}", e);
                ProviderError::InvalidResponse
            }),
            s if s.is_server_error() => Err(ProviderError::Network(format!(
                "authorization provider answered {}",
                s
            ))),
            s => {
                let body: StatusBody = serde_json::from_str(&text).unwrap_or_default();
                Err(match body.error {
                    Some(identifier) => ProviderError::from_identifier(&identifier),
                    None if s == StatusCode::BAD_REQUEST => ProviderError::InvalidRequest,
                    None if s == StatusCode::UNAUTHORIZED => ProviderError::InvalidClient,
                    None => ProviderError::Unknown,
                })
            }
        }
    }

    async fn persist(&self) {
        if let Err(err) = self.store.persist().await {
            error!("cannot write token store: {}", err);
        }
    }
}

impl TokenProvider for CpaProvider {
    fn authorization_provider_url(&self) -> &Url {
        &self.url
    }

    fn token_for_domain(&self, domain: &str) -> Option<Token> {
        self.store.get(domain)
    }

    async fn fetch_token(
        &self,
        domain: &str,
        kind: TokenKind,
        presentation: Option<PresentationSender>,
    ) -> Result<Token, ProviderError> {
        let identity = self.identity().await?;
        let token = match self
            .fetch_with_identity(&identity, domain, kind, presentation.as_ref())
            .await
        {
            Err(ProviderError::InvalidClient) => {
                // identity revoked on the provider side, register again once
                warn!("client '{}' rejected, registering again", identity.identifier);
                // a concurrent request may already have registered a new one
                self.store.clear_identity_if(&identity);
                let identity = self.identity().await?;
                self.fetch_with_identity(&identity, domain, kind, presentation.as_ref())
                    .await?
            }
            other => other?,
        };

        self.store.set(token.clone());
        get_metrics().await.cached_tokens.set(self.store.len() as i64);
        self.persist().await;
        Ok(token)
    }

    async fn discard_token_for_domain(&self, domain: &str) {
        if self.store.remove(domain).is_some() {
            info!("token for domain '{}' discarded", domain);
            get_metrics().await.cached_tokens.set(self.store.len() as i64);
            self.persist().await;
        }
    }
}

/// Polling interval after a `slow_down` answer.
fn slowed_down(interval_ms: u64) -> u64 {
    interval_ms.saturating_add(SLOW_DOWN_INCREMENT_SECS * 1000)
}

fn to_token(response: TokenResponse, domain: &str, kind: TokenKind) -> Token {
    let user_name = match kind {
        TokenKind::User => response.user_name,
        TokenKind::Client => None,
    };
    Token::new(response.access_token, domain.to_owned(), kind, expires_at(response.expires_in))
        .with_domain_name(response.domain_name)
        .with_user_name(user_name)
}

/// Forward to the caller's presentation channel, or fall back to the terminal.
fn present(presentation: Option<&PresentationSender>, action: Presentation) {
    match (presentation, action) {
        (Some(sender), action) => {
            if sender.send(action).is_err() {
                debug!("presentation receiver dropped");
            }
        }
        (None, Presentation::Show(view)) => {
            info!(
                "authorization required for domain '{}': visit {} and enter code {}",
                view.domain, view.verification_url, view.user_code
            );
            eprintln!(
                "To authorize this device, visit {} and enter the code {}",
                view.verification_url, view.user_code
            );
        }
        (None, Presentation::Dismiss) => {}
    }
}

/// `Url::join` replaces the last segment unless the base ends with '/'.
fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}
