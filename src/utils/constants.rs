//! Shared constants and invariants

pub const DEFAULT_CONFIG_PATH: &str = "cpa-demo.yaml";
pub const DEFAULT_AUTHORIZATION_PROVIDER_URL: &str = "https://cpa.rts.ch";
pub const DEFAULT_CLIENT_NAME: &str = "cpa-demo";
pub const DEFAULT_SOFTWARE_ID: &str = "cpa-demo";
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 5000;

pub const DEFAULT_RETRY_ATTEMPTS: u32 = 3;
pub const DEFAULT_RETRY_BASE_DELAY_MS: u64 = 200;
pub const DEFAULT_RETRY_MAX_DELAY_MS: u64 = 2000;

// Built-in domain table
pub const DEFAULT_DOMAINS: [(&str, &str); 3] = [
    ("playlist.rts.ch", "RTSPlaylist"),
    ("hbbtv.rts.ch", "TS HbbTV"),
    ("unsupported.ch", "Unsupported domain"),
];

// CPA endpoints, relative to the authorization provider URL
pub const ENDPOINT_REGISTER: &str = "register";
pub const ENDPOINT_ASSOCIATE: &str = "associate";
pub const ENDPOINT_TOKEN: &str = "token";

// CPA grant types
pub const GRANT_CLIENT_CREDENTIALS: &str = "http://tech.ebu.ch/cpa/1.0/client_credentials";
pub const GRANT_DEVICE_CODE: &str = "http://tech.ebu.ch/cpa/1.0/device_code";

/// Added to the polling interval each time the provider answers `slow_down`.
pub const SLOW_DOWN_INCREMENT_SECS: u64 = 5;

// Screen texts
pub const TEXT_NONE: &str = "None";
pub const TEXT_CLIENT: &str = "Client";
pub const TEXT_USER: &str = "User";
pub const TEXT_INFORMATION: &str = "Information";
pub const TEXT_ERROR: &str = "Error";
pub const TEXT_TOKEN_ALREADY_AVAILABLE: &str = "A token is already available";
