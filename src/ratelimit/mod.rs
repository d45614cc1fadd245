// src/ratelimit/mod.rs
// Per-(provider, service) minute/day counters plus credit accounting.
//
// The limiter protects the provider's quota, not correctness: when the
// cache store itself is unreachable we fail open (allow the request) and
// log, rather than block all AI work because of a counter-store outage.

pub mod policy;

use std::time::Duration;

use tracing::warn;

use crate::cache::CacheStore;
use policy::{policy_for, CREDIT_TTL_SECS, DAY_TTL_SECS, MINUTE_TTL_SECS};

#[derive(Debug, Clone)]
pub struct CheckResult {
    pub allowed: bool,
    pub retry_after_seconds: Option<u64>,
}

#[derive(Debug, Clone, Default)]
pub struct RateLimitStatus {
    pub minute_count: i64,
    pub day_count: i64,
    pub credits_spent: f64,
}

pub struct RateLimiter {
    cache: CacheStore,
}

impl RateLimiter {
    pub fn new(cache: CacheStore) -> Self {
        Self { cache }
    }

    fn minute_key(provider: &str, service: &str) -> String {
        format!("ratelimit:{}:{}:minute", provider, service)
    }

    fn day_key(provider: &str, service: &str) -> String {
        format!("ratelimit:{}:{}:day", provider, service)
    }

    fn credit_key(provider: &str, service: &str) -> String {
        format!("ratelimit:{}:{}:credits", provider, service)
    }

    /// Can this `(provider, service)` make one more call right now?
    pub async fn check(&self, provider: &str, service: &str) -> CheckResult {
        let policy = policy_for(provider, service);

        let minute_key = Self::minute_key(provider, service);
        let day_key = Self::day_key(provider, service);
        let credit_key = Self::credit_key(provider, service);

        let minute_count = match self.cache.get_i64(&minute_key).await {
            Ok(v) => v.unwrap_or(0),
            Err(e) => {
                warn!(%provider, %service, error = %e, "rate limiter store unreachable, failing open");
                return CheckResult {
                    allowed: true,
                    retry_after_seconds: None,
                };
            }
        };

        if minute_count >= policy.per_minute as i64 {
            let retry = self.cache.ttl_seconds(&minute_key).await.unwrap_or(60) as u64;
            return CheckResult {
                allowed: false,
                retry_after_seconds: Some(retry.min(60)),
            };
        }

        let day_count = self.cache.get_i64(&day_key).await.unwrap_or(Some(0)).unwrap_or(0);
        if day_count >= policy.per_day as i64 {
            let retry = self.cache.ttl_seconds(&day_key).await.unwrap_or(86_400) as u64;
            return CheckResult {
                allowed: false,
                retry_after_seconds: Some(retry),
            };
        }

        if let Some(limit) = policy.credit_limit {
            let spent_raw = self.cache.get_i64(&credit_key).await.unwrap_or(Some(0)).unwrap_or(0);
            let spent = spent_raw as f64 / 100.0;
            if spent >= limit {
                let retry = self.cache.ttl_seconds(&credit_key).await.unwrap_or(2_592_000) as u64;
                return CheckResult {
                    allowed: false,
                    retry_after_seconds: Some(retry),
                };
            }
        }

        CheckResult {
            allowed: true,
            retry_after_seconds: None,
        }
    }

    /// Record that a call to `(provider, service)` was made.
    pub async fn increment(&self, provider: &str, service: &str) -> anyhow::Result<()> {
        let policy = policy_for(provider, service);

        self.cache
            .incr_with_ttl(&Self::minute_key(provider, service), Duration::from_secs(MINUTE_TTL_SECS))
            .await?;
        self.cache
            .incr_with_ttl(&Self::day_key(provider, service), Duration::from_secs(DAY_TTL_SECS))
            .await?;

        if policy.credit_limit.is_some() && policy.estimated_cost_per_request > 0.0 {
            let cents = (policy.estimated_cost_per_request * 100.0).round() as i64;
            self.cache
                .incr_by(
                    &Self::credit_key(provider, service),
                    cents,
                    Duration::from_secs(CREDIT_TTL_SECS),
                )
                .await?;
        }

        Ok(())
    }

    pub async fn status(&self, provider: &str, service: &str) -> RateLimitStatus {
        let minute_count = self
            .cache
            .get_i64(&Self::minute_key(provider, service))
            .await
            .unwrap_or(Some(0))
            .unwrap_or(0);
        let day_count = self
            .cache
            .get_i64(&Self::day_key(provider, service))
            .await
            .unwrap_or(Some(0))
            .unwrap_or(0);
        let credits_spent = self
            .cache
            .get_i64(&Self::credit_key(provider, service))
            .await
            .unwrap_or(Some(0))
            .unwrap_or(0) as f64
            / 100.0;

        RateLimitStatus {
            minute_count,
            day_count,
            credits_spent,
        }
    }

    pub async fn reset(&self, provider: &str, service: &str) -> anyhow::Result<()> {
        self.cache.del(&Self::minute_key(provider, service)).await?;
        self.cache.del(&Self::day_key(provider, service)).await?;
        self.cache.del(&Self::credit_key(provider, service)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::policy::policy_for;

    #[test]
    fn unknown_provider_gets_a_conservative_default() {
        let p = policy_for("nonexistent", "nonexistent");
        assert_eq!(p.per_minute, 10);
        assert_eq!(p.per_day, 1000);
    }

    #[test]
    fn groq_llm_has_the_configured_quota() {
        let p = policy_for("groq", "llm");
        assert_eq!(p.per_minute, 30);
    }
}
