// src/response.rs

use serde::{Deserialize, Serialize};

use crate::algorithms::RateLimiter;
use crate::error::Result;

pub const ALLOWED_MESSAGE: &str = "Request allowed";
pub const DENIED_MESSAGE: &str = "Rate limit exceeded";

/// The outcome of one rate limit check, as handed back to a caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitResponse {
    pub allowed: bool,
    /// The caller-supplied key, without the store prefix
    pub subject: String,
    pub message: String,
}

impl LimitResponse {
    pub fn allowed(subject: impl Into<String>) -> Self {
        Self {
            allowed: true,
            subject: subject.into(),
            message: ALLOWED_MESSAGE.to_string(),
        }
    }

    pub fn denied(subject: impl Into<String>) -> Self {
        Self {
            allowed: false,
            subject: subject.into(),
            message: DENIED_MESSAGE.to_string(),
        }
    }

    /// HTTP status a front end should answer with: 200, or 429 when denied.
    pub fn status_code(&self) -> u16 {
        if self.allowed {
            200
        } else {
            429
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Runs a single `allow` for `subject`.
///
/// Store failures come back as `Err` so they are never mistaken for a denial.
pub async fn evaluate<L>(limiter: &L, subject: &str) -> Result<LimitResponse>
where
    L: RateLimiter + ?Sized,
{
    let response = if limiter.allow(subject).await? {
        LimitResponse::allowed(subject)
    } else {
        LimitResponse::denied(subject)
    };
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::TokenBucket;
    use crate::config::LimiterOptions;
    use crate::test_utils::{memory_store, FlakyStore};
    use tokio_test::{assert_err, assert_ok};

    fn options(burst: i64) -> LimiterOptions {
        LimiterOptions {
            burst,
            ..LimiterOptions::default()
        }
    }

    #[test]
    fn response_serializes_to_a_fixed_shape() {
        let json = LimitResponse::denied("10.0.0.7:5123").to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["allowed"], false);
        assert_eq!(value["subject"], "10.0.0.7:5123");
        assert_eq!(value["message"], "Rate limit exceeded");
        assert_eq!(value.as_object().unwrap().len(), 3);
    }

    #[test]
    fn status_codes_follow_the_decision() {
        assert_eq!(LimitResponse::allowed("a").status_code(), 200);
        assert_eq!(LimitResponse::denied("a").status_code(), 429);
    }

    #[tokio::test]
    async fn evaluate_reports_allow_then_deny() {
        let limiter = TokenBucket::new(memory_store(), options(1));

        let first = assert_ok!(evaluate(&limiter, "client").await);
        assert_eq!(first, LimitResponse::allowed("client"));

        let second = assert_ok!(evaluate(&limiter, "client").await);
        assert_eq!(second, LimitResponse::denied("client"));
    }

    #[tokio::test]
    async fn evaluate_keeps_store_errors_apart_from_denials() {
        let store = FlakyStore::failing_increments(memory_store(), &[1]);
        let limiter = TokenBucket::new(store, options(5));

        assert_err!(evaluate(&limiter, "client").await);
    }
}
