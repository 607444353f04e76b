// CpaProvider against a mock authorization provider:
//  - /register -> client identity (registered once, reused)
//  - /token client_credentials -> client token
//  - /associate + /token device_code -> pending polls, then user token or denial
//  - invalid_client -> identity dropped and registered again
//  - slow_down -> polling interval grows by 5 s
//  - 5xx -> retried with backoff

#[cfg(test)]
mod test {

    use std::net::SocketAddr;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use axum::extract::State;
    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::{json, Value};
    use url::Url;

    use crate::cache::token::TokenKind;
    use crate::cache::token_store::TokenStore;
    use crate::config::settings::ProviderConfig;
    use crate::provider::cpa::CpaProvider;
    use crate::provider::{presentation_channel, Presentation, ProviderError, TokenProvider};
    use crate::resilience::retry::RetrySettings;
    use crate::tests::common::{spawn_axum, JoinHandle};
    use crate::utils::constants::{GRANT_CLIENT_CREDENTIALS, GRANT_DEVICE_CODE};

    #[derive(Default)]
    struct MockCpa {
        registrations: AtomicUsize,
        polls: AtomicUsize,
        /// answer 503 to this many /register calls first
        register_failures: AtomicUsize,
        /// device_code polls answered 202 before success
        pending_polls: usize,
        /// how many of the pending polls ask to slow down
        slow_down_polls: usize,
        deny: bool,
        /// first registered client is rejected as invalid_client
        reject_first_client: bool,
        device_code_lifetime: u64,
        verification_base: std::sync::Mutex<String>,
    }

    type Reply = (StatusCode, Json<Value>);

    async fn register(State(mock): State<Arc<MockCpa>>, Json(body): Json<Value>) -> Reply {
        if mock
            .register_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return (StatusCode::SERVICE_UNAVAILABLE, Json(json!({})));
        }
        assert_eq!(body["client_name"], "cpa-demo");
        let n = mock.registrations.fetch_add(1, Ordering::SeqCst) + 1;
        (
            StatusCode::CREATED,
            Json(json!({"client_id": format!("client-{}", n), "client_secret": "secret"})),
        )
    }

    async fn associate(State(mock): State<Arc<MockCpa>>, Json(body): Json<Value>) -> Reply {
        if mock.reject_first_client && body["client_id"] == "client-1" {
            return (StatusCode::BAD_REQUEST, Json(json!({"error": "invalid_client"})));
        }
        let verification = format!("{}/verify", mock.verification_base.lock().unwrap());
        (
            StatusCode::OK,
            Json(json!({
                "device_code": "dev-1",
                "user_code": "USER-CODE",
                "verification_uri": verification,
                "interval": 0,
                "expires_in": mock.device_code_lifetime,
            })),
        )
    }

    async fn token(State(mock): State<Arc<MockCpa>>, Json(body): Json<Value>) -> Reply {
        let domain = body["domain"].as_str().unwrap_or_default().to_owned();
        if mock.reject_first_client && body["client_id"] == "client-1" {
            return (StatusCode::BAD_REQUEST, Json(json!({"error": "invalid_client"})));
        }

        match body["grant_type"].as_str() {
            Some(GRANT_CLIENT_CREDENTIALS) => (
                StatusCode::OK,
                Json(json!({
                    "access_token": format!("client-token-{}", domain),
                    "token_type": "bearer",
                    "domain_name": "RTS",
                    "expires_in": 3600,
                })),
            ),
            Some(GRANT_DEVICE_CODE) => {
                assert_eq!(body["device_code"], "dev-1");
                let n = mock.polls.fetch_add(1, Ordering::SeqCst);
                if n < mock.pending_polls {
                    let reason = if n < mock.slow_down_polls { "slow_down" } else { "authorization_pending" };
                    (StatusCode::ACCEPTED, Json(json!({"reason": reason})))
                } else if mock.deny {
                    (StatusCode::BAD_REQUEST, Json(json!({"error": "access_denied"})))
                } else {
                    (
                        StatusCode::OK,
                        Json(json!({
                            "access_token": format!("user-token-{}", domain),
                            "token_type": "bearer",
                            "domain_name": "RTS",
                            "user_name": "jane",
                            "expires_in": 3600,
                        })),
                    )
                }
            }
            _ => (StatusCode::BAD_REQUEST, Json(json!({"error": "invalid_request"}))),
        }
    }

    async fn spawn_cpa(mock: MockCpa) -> (JoinHandle<()>, SocketAddr, Arc<MockCpa>) {
        let mock = Arc::new(mock);
        let router = Router::new()
            .route("/cpa/register", post(register))
            .route("/cpa/associate", post(associate))
            .route("/cpa/token", post(token))
            .with_state(Arc::clone(&mock));
        let (handle, addr) = spawn_axum(router).await;
        *mock.verification_base.lock().unwrap() = format!("http://{}", addr);
        (handle, addr, mock)
    }

    fn provider(addr: SocketAddr, store: TokenStore) -> Arc<CpaProvider> {
        let url = Url::parse(&format!("http://{}/cpa", addr)).unwrap();
        let retry = RetrySettings {
            attempts: 3,
            base_delay_ms: 1,
            max_delay_ms: 4,
        };
        Arc::new(CpaProvider::new(url, ProviderConfig::default(), store, retry).unwrap())
    }

    #[tokio::test]
    async fn client_tokens_share_one_registration() {
        let (handle, addr, mock) = spawn_cpa(MockCpa::default()).await;
        let provider = provider(addr, TokenStore::in_memory());
        assert!(provider.token_for_domain("playlist.rts.ch").is_none());

        for domain in ["playlist.rts.ch", "hbbtv.rts.ch"] {
            Arc::clone(&provider)
                .request_token_for_domain(domain, TokenKind::Client, None)
                .await
                .unwrap();
        }

        assert_eq!(mock.registrations.load(Ordering::SeqCst), 1);
        let token = provider.token_for_domain("playlist.rts.ch").unwrap();
        assert_eq!(token.value, "client-token-playlist.rts.ch");
        assert_eq!(token.kind, TokenKind::Client);
        assert_eq!(token.domain_name.as_deref(), Some("RTS"));
        assert_eq!(token.user_name, None);
        assert_eq!(provider.store().identity().unwrap().identifier, "client-1");

        handle.abort();
    }

    #[tokio::test]
    async fn concurrent_first_requests_register_once() {
        let (handle, addr, mock) = spawn_cpa(MockCpa::default()).await;
        let provider = provider(addr, TokenStore::in_memory());

        let first = Arc::clone(&provider).request_token_for_domain("playlist.rts.ch", TokenKind::Client, None);
        let second = Arc::clone(&provider).request_token_for_domain("hbbtv.rts.ch", TokenKind::Client, None);
        let (first, second) = tokio::join!(first, second);

        assert!(first.is_ok() && second.is_ok());
        assert_eq!(mock.registrations.load(Ordering::SeqCst), 1);

        handle.abort();
    }

    #[tokio::test]
    async fn user_token_polls_until_authorized() {
        let (handle, addr, mock) = spawn_cpa(MockCpa {
            pending_polls: 2,
            device_code_lifetime: 30,
            ..MockCpa::default()
        })
        .await;
        let provider = provider(addr, TokenStore::in_memory());
        let (sender, mut receiver) = presentation_channel();

        let token = Arc::clone(&provider)
            .request_token_for_domain("hbbtv.rts.ch", TokenKind::User, Some(sender))
            .await
            .unwrap();

        assert_eq!(token.value, "user-token-hbbtv.rts.ch");
        assert_eq!(token.kind, TokenKind::User);
        assert_eq!(token.user_name.as_deref(), Some("jane"));
        assert_eq!(mock.polls.load(Ordering::SeqCst), 3);

        match receiver.recv().await {
            Some(Presentation::Show(view)) => {
                assert_eq!(view.domain, "hbbtv.rts.ch");
                assert_eq!(view.user_code, "USER-CODE");
                assert_eq!(view.verification_url.as_str(), format!("http://{}/verify", addr));
            }
            other => panic!("expected Show, got {:?}", other),
        }
        assert_eq!(receiver.recv().await, Some(Presentation::Dismiss));
        assert_eq!(provider.token_for_domain("hbbtv.rts.ch"), Some(token));

        handle.abort();
    }

    #[tokio::test]
    async fn denied_authorization_dismisses_and_caches_nothing() {
        let (handle, addr, _mock) = spawn_cpa(MockCpa {
            pending_polls: 1,
            deny: true,
            device_code_lifetime: 30,
            ..MockCpa::default()
        })
        .await;
        let provider = provider(addr, TokenStore::in_memory());
        let (sender, mut receiver) = presentation_channel();

        let result = Arc::clone(&provider)
            .request_token_for_domain("hbbtv.rts.ch", TokenKind::User, Some(sender))
            .await;

        assert_eq!(result, Err(ProviderError::AuthorizationDenied));
        assert!(matches!(receiver.recv().await, Some(Presentation::Show(_))));
        assert_eq!(receiver.recv().await, Some(Presentation::Dismiss));
        assert!(provider.token_for_domain("hbbtv.rts.ch").is_none());

        handle.abort();
    }

    #[tokio::test]
    async fn expired_device_code_fails() {
        let (handle, addr, mock) = spawn_cpa(MockCpa {
            pending_polls: usize::MAX,
            device_code_lifetime: 0,
            ..MockCpa::default()
        })
        .await;
        let provider = provider(addr, TokenStore::in_memory());

        let result = Arc::clone(&provider)
            .request_token_for_domain("hbbtv.rts.ch", TokenKind::User, None)
            .await;

        assert_eq!(result, Err(ProviderError::AuthorizationRequestExpired));
        assert_eq!(mock.polls.load(Ordering::SeqCst), 0);

        handle.abort();
    }

    #[tokio::test]
    async fn rejected_client_registers_again() {
        let (handle, addr, mock) = spawn_cpa(MockCpa {
            reject_first_client: true,
            ..MockCpa::default()
        })
        .await;
        let provider = provider(addr, TokenStore::in_memory());

        let token = Arc::clone(&provider)
            .request_token_for_domain("playlist.rts.ch", TokenKind::Client, None)
            .await
            .unwrap();

        assert_eq!(token.value, "client-token-playlist.rts.ch");
        assert_eq!(mock.registrations.load(Ordering::SeqCst), 2);
        assert_eq!(provider.store().identity().unwrap().identifier, "client-2");

        handle.abort();
    }

    #[tokio::test]
    async fn server_errors_are_retried() {
        let (handle, addr, mock) = spawn_cpa(MockCpa {
            register_failures: AtomicUsize::new(2),
            ..MockCpa::default()
        })
        .await;
        let provider = provider(addr, TokenStore::in_memory());

        Arc::clone(&provider)
            .request_token_for_domain("playlist.rts.ch", TokenKind::Client, None)
            .await
            .unwrap();
        assert_eq!(mock.registrations.load(Ordering::SeqCst), 1);

        handle.abort();
    }

    #[tokio::test]
    async fn unreachable_provider_reports_network_error() {
        // bind then drop to get a port nobody listens on
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let provider = provider(addr, TokenStore::in_memory());

        let result = Arc::clone(&provider)
            .request_token_for_domain("playlist.rts.ch", TokenKind::Client, None)
            .await;

        assert!(matches!(result, Err(ProviderError::Network(_))));
    }

    #[tokio::test]
    async fn tokens_and_identity_survive_restart() {
        let (handle, addr, mock) = spawn_cpa(MockCpa::default()).await;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tokens.json");

        let first = provider(addr, TokenStore::open(&path).unwrap());
        Arc::clone(&first)
            .request_token_for_domain("playlist.rts.ch", TokenKind::Client, None)
            .await
            .unwrap();

        let second = provider(addr, TokenStore::open(&path).unwrap());
        assert_eq!(
            second.token_for_domain("playlist.rts.ch").unwrap().value,
            "client-token-playlist.rts.ch"
        );
        Arc::clone(&second)
            .request_token_for_domain("hbbtv.rts.ch", TokenKind::Client, None)
            .await
            .unwrap();
        assert_eq!(mock.registrations.load(Ordering::SeqCst), 1);

        second.discard_token_for_domain("playlist.rts.ch").await;
        let third = provider(addr, TokenStore::open(&path).unwrap());
        assert!(third.token_for_domain("playlist.rts.ch").is_none());
        assert!(third.token_for_domain("hbbtv.rts.ch").is_some());

        handle.abort();
    }

    #[tokio::test]
    async fn slow_down_lengthens_polling_interval() {
        let (handle, addr, mock) = spawn_cpa(MockCpa {
            pending_polls: 1,
            slow_down_polls: 1,
            device_code_lifetime: 30,
            ..MockCpa::default()
        })
        .await;
        let provider = provider(addr, TokenStore::in_memory());

        let started = std::time::Instant::now();
        let token = Arc::clone(&provider)
            .request_token_for_domain("hbbtv.rts.ch", TokenKind::User, None)
            .await
            .unwrap();

        assert_eq!(token.value, "user-token-hbbtv.rts.ch");
        assert_eq!(mock.polls.load(Ordering::SeqCst), 2);
        assert!(started.elapsed() >= std::time::Duration::from_secs(5));

        handle.abort();
    }

    #[tokio::test]
    async fn out_of_range_lifetime_is_an_invalid_response() {
        let (handle, addr, mock) = spawn_cpa(MockCpa {
            device_code_lifetime: u64::MAX,
            ..MockCpa::default()
        })
        .await;
        let provider = provider(addr, TokenStore::in_memory());
        let (sender, mut receiver) = presentation_channel();

        let result = Arc::clone(&provider)
            .request_token_for_domain("hbbtv.rts.ch", TokenKind::User, Some(sender))
            .await;

        assert_eq!(result, Err(ProviderError::InvalidResponse));
        assert_eq!(mock.polls.load(Ordering::SeqCst), 0);
        assert!(matches!(receiver.recv().await, Some(Presentation::Show(_))));
        assert_eq!(receiver.recv().await, Some(Presentation::Dismiss));

        handle.abort();
    }

    #[tokio::test]
    async fn concurrent_rejections_register_once_more() {
        let (handle, addr, mock) = spawn_cpa(MockCpa {
            reject_first_client: true,
            ..MockCpa::default()
        })
        .await;
        let provider = provider(addr, TokenStore::in_memory());

        let first = Arc::clone(&provider).request_token_for_domain("playlist.rts.ch", TokenKind::Client, None);
        let second = Arc::clone(&provider).request_token_for_domain("hbbtv.rts.ch", TokenKind::Client, None);
        let (first, second) = tokio::join!(first, second);

        assert!(first.is_ok() && second.is_ok());
        assert_eq!(mock.registrations.load(Ordering::SeqCst), 2);
        assert_eq!(provider.store().identity().unwrap().identifier, "client-2");

        handle.abort();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_requests_keep_store_file_readable() {
        let (handle, addr, _mock) = spawn_cpa(MockCpa::default()).await;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tokens.json");
        let provider = provider(addr, TokenStore::open(&path).unwrap());

        for round in 0..10 {
            let requests: Vec<_> = (0..6)
                .map(|i| {
                    Arc::clone(&provider).request_token_for_domain(
                        &format!("domain-{}-{}.example.org", round, i),
                        TokenKind::Client,
                        None,
                    )
                })
                .collect();
            for request in requests {
                request.await.unwrap();
            }

            let reopened = TokenStore::open(&path).unwrap();
            assert_eq!(reopened.len(), provider.store().len(), "round {}", round);
            assert_eq!(reopened.identity(), provider.store().identity());
        }

        handle.abort();
    }
}
