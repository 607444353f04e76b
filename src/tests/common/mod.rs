// tests/common/mod.rs
pub use axum::Router;
pub use serde_json::json;
pub use tokio::task::JoinHandle;

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use url::Url;

use crate::cache::token::{Token, TokenKind};
use crate::cache::token_store::TokenStore;
use crate::helpers::time::now_u64;
use crate::provider::{CredentialsView, Presentation, PresentationSender, ProviderError, TokenProvider};

/// Spawn an Axum router on an ephemeral port and return (JoinHandle, SocketAddr)
pub async fn spawn_axum(router: Router) -> (JoinHandle<()>, SocketAddr) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind failed");
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        axum::serve(listener, router).await.expect("server failed");
    });
    (handle, addr)
}

/// How the scripted provider answers the next fetches.
#[derive(Debug, Clone)]
pub enum Script {
    Succeed(String),
    Fail(ProviderError),
    /// show credentials, dismiss them, then succeed
    PresentThenSucceed(String),
    /// never completes on its own
    Hang,
    /// the fetch task dies
    Panic,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedFetch {
    pub domain: String,
    pub kind: TokenKind,
    pub with_presentation: bool,
}

/// In-memory provider recording every fetch it is asked for.
pub struct ScriptedProvider {
    url: Url,
    pub store: TokenStore,
    script: Mutex<Script>,
    fetches: Mutex<Vec<RecordedFetch>>,
    completed: AtomicUsize,
}

impl ScriptedProvider {
    pub fn new(script: Script) -> Arc<Self> {
        Arc::new(Self {
            url: Url::parse("https://cpa.example.org/").unwrap(),
            store: TokenStore::in_memory(),
            script: Mutex::new(script),
            fetches: Mutex::new(Vec::new()),
            completed: AtomicUsize::new(0),
        })
    }

    pub fn with_cached_token(self: Arc<Self>, domain: &str, value: &str, kind: TokenKind) -> Arc<Self> {
        self.store
            .set(Token::new(value.into(), domain.into(), kind, now_u64() + 3600));
        self
    }

    pub fn set_script(&self, script: Script) {
        *self.script.lock().unwrap() = script;
    }

    pub fn fetches(&self) -> Vec<RecordedFetch> {
        self.fetches.lock().unwrap().clone()
    }

    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }
}

impl TokenProvider for ScriptedProvider {
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
        self.fetches.lock().unwrap().push(RecordedFetch {
            domain: domain.to_owned(),
            kind,
            with_presentation: presentation.is_some(),
        });
        let script = self.script.lock().unwrap().clone();

        let result = match script {
            Script::Succeed(value) => Ok(Token::new(value, domain.into(), kind, now_u64() + 3600)),
            Script::Fail(err) => Err(err),
            Script::PresentThenSucceed(value) => {
                if let Some(sender) = &presentation {
                    let view = CredentialsView {
                        domain: domain.to_owned(),
                        verification_url: Url::parse("https://cpa.example.org/verify").unwrap(),
                        user_code: "ABCD-1234".into(),
                    };
                    sender.send(Presentation::Show(view)).unwrap();
                    tokio::task::yield_now().await;
                    sender.send(Presentation::Dismiss).unwrap();
                }
                Ok(Token::new(value, domain.into(), kind, now_u64() + 3600))
            }
            Script::Hang => {
                if let Some(sender) = &presentation {
                    let view = CredentialsView {
                        domain: domain.to_owned(),
                        verification_url: Url::parse("https://cpa.example.org/verify").unwrap(),
                        user_code: "WAIT-0000".into(),
                    };
                    let _ = sender.send(Presentation::Show(view));
                }
                std::future::pending::<Result<Token, ProviderError>>().await
            }
            Script::Panic => panic!("fetch task crashed for domain '{}'", domain),
        };

        if let Ok(token) = &result {
            self.store.set(token.clone());
        }
        self.completed.fetch_add(1, Ordering::SeqCst);
        result
    }

    async fn discard_token_for_domain(&self, domain: &str) {
        self.store.remove(domain);
    }
}
