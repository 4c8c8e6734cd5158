use chrono::{DateTime, TimeZone, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Correlation token tying one plan request to its asynchronous resolution.
/// Format: CDK1-{unix_ts}-{origin_tag}-{nonce}, where origin_tag is derived
/// from the canonicalized calling-page origin so the provider can target
/// its response at the right page.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationToken(String);

impl CorrelationToken {
    pub fn issue(page_origin: &str, now: DateTime<Utc>) -> Self {
        let tag = origin_tag(&canonicalize_origin(page_origin));
        let nonce: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(8)
            .map(char::from)
            .collect();
        Self(format!("CDK1-{}-{}-{}", now.timestamp(), tag, nonce))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Issue timestamp embedded in the token, if it parses.
    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        let ts: i64 = self.0.split('-').nth(1)?.parse().ok()?;
        Utc.timestamp_opt(ts, 0).single()
    }

    pub fn origin_tag(&self) -> Option<&str> {
        self.0.split('-').nth(2)
    }
}

impl std::fmt::Display for CorrelationToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for CorrelationToken {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Lowercase, no trailing slash, default ports stripped. Both the token tag
/// and the trusted-origin comparison go through this, so casing and port
/// cosmetics never break a match.
pub fn canonicalize_origin(origin: &str) -> String {
    let mut origin = origin.trim().to_lowercase();
    while origin.ends_with('/') {
        origin.pop();
    }
    if let Some(host) = origin.strip_prefix("https://") {
        let host = host.strip_suffix(":443").unwrap_or(host);
        return format!("https://{}", host);
    }
    if let Some(host) = origin.strip_prefix("http://") {
        let host = host.strip_suffix(":80").unwrap_or(host);
        return format!("http://{}", host);
    }
    origin
}

/// Eight hex chars of an FNV-1a hash. Only a routing tag, nothing secret.
fn origin_tag(canonical: &str) -> String {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    let mut hash = OFFSET;
    for byte in canonical.bytes() {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(PRIME);
    }
    format!("{:08x}", (hash as u32) ^ ((hash >> 32) as u32))
}
