use std::fmt;

use serde::{Deserialize, Serialize};

use crate::helpers::time::now_u64;
use crate::utils::constants::{TEXT_CLIENT, TEXT_USER};

/// Token kind requested from the authorization provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    /// Unauthenticated association of the application with an anonymous identity
    Client,
    /// Association with a user account, needs the user to enter credentials
    User,
}

impl TokenKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::Client => "client",
            TokenKind::User => "user",
        }
    }

    /// Label shown on the detail screen.
    pub fn label(&self) -> &'static str {
        match self {
            TokenKind::Client => TEXT_CLIENT,
            TokenKind::User => TEXT_USER,
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Service token, keyed by domain in the token store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub value: String,
    pub domain: String,
    /// friendly domain name returned by the provider
    pub domain_name: Option<String>,
    /// account name, only for user tokens
    pub user_name: Option<String>,
    pub kind: TokenKind,
    pub exp_unix_ts: u64, // UNIX TIMESTAMP
}

impl Token {
    pub fn new(value: String, domain: String, kind: TokenKind, exp_unix_ts: u64) -> Self {
        Self {
            value,
            domain,
            domain_name: None,
            user_name: None,
            kind,
            exp_unix_ts,
        }
    }

    pub fn with_domain_name(mut self, domain_name: Option<String>) -> Self {
        self.domain_name = domain_name;
        self
    }

    pub fn with_user_name(mut self, user_name: Option<String>) -> Self {
        self.user_name = user_name;
        self
    }

    pub fn is_expired(&self) -> bool {
        now_u64() >= self.exp_unix_ts
    }
}

/// Client credentials attributed by the authorization provider's `/register` endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub identifier: String,
    pub secret: String,
}

impl Identity {
    pub fn new(identifier: String, secret: String) -> Self {
        Self { identifier, secret }
    }
}
