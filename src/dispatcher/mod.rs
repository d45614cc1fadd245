// src/dispatcher/mod.rs
// Worker pool: one task group per job kind, each draining the queue with a
// fixed concurrency (spec §4.D/§5) and walking that kind's provider chain in
// order. A provider's rate-limit denial is not a provider failure — the
// dispatcher just moves on to the next provider in the same attempt without
// spending a retry.

pub mod chains;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Semaphore};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::providers::{AudioProvider, ImageProvider, LlmOptions, LlmProvider, OcrProvider, ProviderError};
use crate::queue::job::{JobKind, JobPayload, JobRecord, JobResult};
use crate::queue::JobQueue;
use crate::ratelimit::RateLimiter;
use chains::ProviderChains;

pub struct Dispatcher {
    queue: JobQueue,
    ratelimiter: RateLimiter,
    chains: ProviderChains,
}

impl Dispatcher {
    pub fn new(queue: JobQueue, ratelimiter: RateLimiter, chains: ProviderChains) -> Self {
        Self { queue, ratelimiter, chains }
    }

    /// Spawns one worker-pool task group per job kind and runs until
    /// `shutdown` is signalled. Each kind gets `JobKind::concurrency()`
    /// concurrent in-flight jobs via a semaphore, matching spec §4.D.
    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let mut handles = Vec::new();

        for kind in JobKind::all() {
            let dispatcher = self.clone();
            let mut shutdown = shutdown.clone();
            handles.push(tokio::spawn(async move {
                dispatcher.drain_kind(kind, &mut shutdown).await;
            }));
        }

        let _ = shutdown.changed().await;
        for handle in handles {
            let _ = handle.await;
        }
    }

    async fn drain_kind(self: Arc<Self>, kind: JobKind, shutdown: &mut watch::Receiver<bool>) {
        let semaphore = Arc::new(Semaphore::new(kind.concurrency()));

        loop {
            if *shutdown.borrow() {
                return;
            }

            let next = tokio::select! {
                next = self.queue.dequeue_next(kind) => next,
                _ = shutdown.changed() => return,
            };

            match next {
                Ok(Some(job_id)) => {
                    let permit = semaphore.clone().acquire_owned().await.expect("semaphore closed");
                    let dispatcher = self.clone();
                    tokio::spawn(async move {
                        let _permit = permit;
                        dispatcher.process_job(kind, job_id).await;
                    });
                }
                Ok(None) => {
                    tokio::select! {
                        _ = tokio::time::sleep(Duration::from_millis(250)) => {}
                        _ = shutdown.changed() => return,
                    }
                }
                Err(e) => {
                    error!(kind = kind.as_str(), error = %e, "failed to dequeue job, backing off");
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
            }
        }
    }

    async fn process_job(&self, kind: JobKind, job_id: Uuid) {
        let record = match self.queue.mark_active(kind, job_id).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                warn!(job_id = %job_id, "active job has no record, dropping");
                return;
            }
            Err(e) => {
                error!(job_id = %job_id, error = %e, "failed to mark job active");
                return;
            }
        };

        let outcome = tokio::time::timeout(kind.hard_timeout(), self.run_chain(&record)).await;

        let result = match outcome {
            Ok(Ok(result)) => result,
            Ok(Err(message)) => JobResult {
                success: false,
                value: None,
                error: Some(message),
                provider: None,
            },
            Err(_) => JobResult {
                success: false,
                value: None,
                error: Some(format!("job exceeded hard timeout of {:?}", kind.hard_timeout())),
                provider: None,
            },
        };

        if !result.success {
            if self.queue.retry(kind, job_id).await.unwrap_or(false) {
                let delay = backoff_delay(record.options.backoff_base_ms, record.attempts_remaining);
                info!(job_id = %job_id, kind = kind.as_str(), ?delay, "job failed, retrying after backoff");
                tokio::time::sleep(delay).await;
                return;
            }
        }

        if let Err(e) = self.queue.complete(kind, job_id, result).await {
            error!(job_id = %job_id, error = %e, "failed to record job completion");
        }
    }

    /// Walks the provider chain for this job's kind in order. A rate-limited
    /// provider is skipped without being treated as a failure; an actual
    /// provider error moves on to the next provider in the chain. Only
    /// running out of providers entirely is a job-level failure.
    async fn run_chain(&self, record: &JobRecord) -> Result<JobResult, String> {
        match &record.payload {
            JobPayload::Audio { audio_url, language } => {
                self.run_audio_chain(audio_url, language).await
            }
            JobPayload::Image { image_url, prompt } => self.run_image_chain(image_url, prompt).await,
            JobPayload::Ocr { image_url, languages } => self.run_ocr_chain(image_url, languages).await,
            JobPayload::Llm { prompt, system_prompt, max_tokens, temperature } => {
                self.run_llm_chain(prompt, system_prompt.as_deref(), *max_tokens, *temperature)
                    .await
            }
        }
    }

    async fn run_audio_chain(&self, audio_url: &str, language: &str) -> Result<JobResult, String> {
        let mut last_error = None;
        for provider in &self.chains.audio {
            match self.try_call(provider.name(), "audio", || provider.transcribe(audio_url, language)).await {
                Attempt::Success(r) => {
                    return Ok(JobResult {
                        success: true,
                        value: Some(serde_json::json!({
                            "text": r.text,
                            "language": r.language,
                            "confidence": r.confidence,
                            "duration": r.duration,
                            "model": r.model,
                        })),
                        error: None,
                        provider: Some(r.provider),
                    });
                }
                Attempt::Skipped => continue,
                Attempt::Failed(e) => last_error = Some(e),
            }
        }
        Err(last_error.unwrap_or_else(|| "no audio provider configured".to_string()))
    }

    async fn run_image_chain(&self, image_url: &str, prompt: &str) -> Result<JobResult, String> {
        let mut last_error = None;
        for provider in &self.chains.image {
            match self.try_call(provider.name(), "image", || provider.describe(image_url, prompt)).await {
                Attempt::Success(r) => {
                    return Ok(JobResult {
                        success: true,
                        value: Some(serde_json::json!({ "description": r.description, "model": r.model })),
                        error: None,
                        provider: Some(r.provider),
                    });
                }
                Attempt::Skipped => continue,
                Attempt::Failed(e) => last_error = Some(e),
            }
        }
        Err(last_error.unwrap_or_else(|| "no image provider configured".to_string()))
    }

    async fn run_ocr_chain(&self, image_url: &str, languages: &[String]) -> Result<JobResult, String> {
        let mut last_error = None;
        for provider in &self.chains.ocr {
            match self.try_call(provider.name(), "ocr", || provider.extract(image_url, languages)).await {
                Attempt::Success(r) => {
                    return Ok(JobResult {
                        success: true,
                        value: Some(serde_json::json!({
                            "text": r.text,
                            "has_text": r.has_text,
                            "languages": r.languages,
                            "model": r.model,
                        })),
                        error: None,
                        provider: Some(r.provider),
                    });
                }
                Attempt::Skipped => continue,
                Attempt::Failed(e) => last_error = Some(e),
            }
        }
        Err(last_error.unwrap_or_else(|| "no ocr provider configured".to_string()))
    }

    async fn run_llm_chain(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
        max_tokens: u32,
        temperature: f32,
    ) -> Result<JobResult, String> {
        let options = LlmOptions { max_tokens, temperature };
        let mut last_error = None;
        for provider in &self.chains.llm {
            match self
                .try_call(provider.name(), "llm", || provider.generate(prompt, system_prompt, options))
                .await
            {
                Attempt::Success(r) => {
                    return Ok(JobResult {
                        success: true,
                        value: Some(serde_json::json!({ "answer": r.answer, "model": r.model })),
                        error: None,
                        provider: Some(r.provider),
                    });
                }
                Attempt::Skipped => continue,
                Attempt::Failed(e) => last_error = Some(e),
            }
        }
        Err(last_error.unwrap_or_else(|| "no llm provider configured".to_string()))
    }

    async fn try_call<T, F, Fut>(&self, provider: &str, service: &str, call: F) -> Attempt<T>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<T, ProviderError>>,
    {
        let check = self.ratelimiter.check(provider, service).await;
        if !check.allowed {
            warn!(%provider, %service, "rate limited, trying next provider in chain");
            return Attempt::Skipped;
        }

        match call().await {
            Ok(value) => {
                if let Err(e) = self.ratelimiter.increment(provider, service).await {
                    warn!(%provider, %service, error = %e, "failed to record rate limit usage");
                }
                Attempt::Success(value)
            }
            Err(ProviderError::Rate { .. }) => Attempt::Skipped,
            Err(e) => {
                warn!(%provider, %service, error = %e, "provider call failed");
                Attempt::Failed(e.to_string())
            }
        }
    }
}

enum Attempt<T> {
    Success(T),
    Skipped,
    Failed(String),
}

fn backoff_delay(base_ms: u64, attempts_remaining: u32) -> Duration {
    let attempt_index = attempts_remaining.min(10);
    let factor = 2u64.saturating_pow(attempt_index);
    Duration::from_millis(base_ms.saturating_mul(factor).min(60_000))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_per_attempt() {
        assert_eq!(backoff_delay(100, 0), Duration::from_millis(100));
        assert_eq!(backoff_delay(100, 1), Duration::from_millis(200));
        assert_eq!(backoff_delay(100, 2), Duration::from_millis(400));
    }

    #[test]
    fn backoff_is_capped_at_one_minute() {
        assert_eq!(backoff_delay(1000, 10), Duration::from_millis(60_000));
    }
}
