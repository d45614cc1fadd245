// src/ratelimit/policy.rs
// Static per-(provider, service) rate limit policy table.

#[derive(Debug, Clone, Copy)]
pub struct RateLimitPolicy {
    pub per_minute: u32,
    pub per_day: u32,
    pub credit_limit: Option<f64>,
    pub estimated_cost_per_request: f64,
}

/// Looks up the policy for a `(provider, service)` pair. Unknown pairs get a
/// generous default rather than failing closed, matching the "fail open"
/// philosophy that governs this whole limiter (see module docs).
pub fn policy_for(provider: &str, service: &str) -> RateLimitPolicy {
    match (provider, service) {
        ("groq", "audio") => RateLimitPolicy {
            per_minute: 20,
            per_day: 2000,
            credit_limit: None,
            estimated_cost_per_request: 0.0,
        },
        ("groq", "image") | ("groq", "ocr") => RateLimitPolicy {
            per_minute: 30,
            per_day: 3000,
            credit_limit: None,
            estimated_cost_per_request: 0.0,
        },
        ("groq", "llm") => RateLimitPolicy {
            per_minute: 30,
            per_day: 5000,
            credit_limit: None,
            estimated_cost_per_request: 0.0,
        },
        ("deepgram", "audio") => RateLimitPolicy {
            per_minute: 15,
            per_day: 1000,
            credit_limit: Some(50.0),
            estimated_cost_per_request: 0.01,
        },
        ("assemblyai", "audio") => RateLimitPolicy {
            per_minute: 10,
            per_day: 500,
            credit_limit: Some(50.0),
            estimated_cost_per_request: 0.015,
        },
        ("gemini", "image") | ("gemini", "ocr") => RateLimitPolicy {
            per_minute: 15,
            per_day: 1500,
            credit_limit: Some(100.0),
            estimated_cost_per_request: 0.002,
        },
        ("gemini", "llm") => RateLimitPolicy {
            per_minute: 15,
            per_day: 1500,
            credit_limit: Some(100.0),
            estimated_cost_per_request: 0.003,
        },
        _ => RateLimitPolicy {
            per_minute: 10,
            per_day: 1000,
            credit_limit: None,
            estimated_cost_per_request: 0.0,
        },
    }
}

pub const MINUTE_TTL_SECS: u64 = 60;
pub const DAY_TTL_SECS: u64 = 86_400;
pub const CREDIT_TTL_SECS: u64 = 30 * 86_400;
