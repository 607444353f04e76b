//! JSON bodies exchanged with the authorization provider.

use serde::{Deserialize, Serialize};

/// `POST /register`
#[derive(Debug, Serialize)]
pub struct RegisterRequest<'a> {
    pub client_name: &'a str,
    pub software_id: &'a str,
    pub software_version: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct RegisterResponse {
    pub client_id: String,
    pub client_secret: String,
}

/// `POST /token`, client mode
#[derive(Debug, Serialize)]
pub struct ClientTokenRequest<'a> {
    pub grant_type: &'a str,
    pub client_id: &'a str,
    pub client_secret: &'a str,
    pub domain: &'a str,
}

/// `POST /associate`
#[derive(Debug, Serialize)]
pub struct AssociateRequest<'a> {
    pub client_id: &'a str,
    pub client_secret: &'a str,
    pub domain: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct AssociateResponse {
    pub device_code: String,
    pub user_code: String,
    pub verification_uri: String,
    /// polling interval, seconds
    #[serde(default)]
    pub interval: u64,
    /// lifetime of the device code, seconds
    pub expires_in: u64,
}

/// `POST /token`, user mode
#[derive(Debug, Serialize)]
pub struct DeviceTokenRequest<'a> {
    pub grant_type: &'a str,
    pub device_code: &'a str,
    pub client_id: &'a str,
    pub client_secret: &'a str,
    pub domain: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub domain_name: Option<String>,
    #[serde(default)]
    pub user_name: Option<String>,
    pub expires_in: u64,
}

/// Error (`4xx`) and pending (`202`) bodies
#[derive(Debug, Default, Deserialize)]
pub struct StatusBody {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
}
