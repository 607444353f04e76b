use chrono::Utc;

pub fn now_u64() -> u64 {
    now_i64().max(0) as u64
}

pub fn now_i64() -> i64 {
    Utc::now().timestamp()
}

/// Absolute expiration for a lifetime reported in seconds by the provider.
pub fn expires_at(lifetime_seconds: u64) -> u64 {
    now_u64().saturating_add(lifetime_seconds)
}
