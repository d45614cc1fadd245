// src/queue/mod.rs
// Durable FIFO-with-priority job queues backed by the shared cache store,
// with a blocking "await result" handle for in-process callers.
//
// Keys (cache store, Redis):
//   bull:<kind>:wait:<priority>   list of job ids, FIFO within a priority
//   bull:<kind>:job:<id>          hash: payload/options/attempts/status/result
//   bull:<kind>:completed         list of recently completed ids (capped)
//   bull:<kind>:failed            list of recently failed ids (capped)
//   bull:<kind>:done:<id>         pub/sub channel a completion is published to
//
// `JobHandle::await_result` is implemented on top of that pub/sub channel,
// not by polling: the worker publishes to `bull:<kind>:done:<id>` exactly
// once, after durably recording the result in the job hash.

pub mod job;

use std::time::Duration;

use anyhow::{Context, Result};
use futures::StreamExt;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::cache::CacheStore;
use job::{JobKind, JobOptions, JobPayload, JobRecord, JobResult, JobStatus, Priority, QueueStats};

const COMPLETED_RETENTION: usize = 100;
const FAILED_RETENTION: usize = 500;

#[derive(Clone)]
pub struct JobQueue {
    cache: CacheStore,
}

impl JobQueue {
    pub fn new(cache: CacheStore) -> Self {
        Self { cache }
    }

    fn wait_key(kind: JobKind, priority: Priority) -> String {
        format!("bull:{}:wait:{}", kind.as_str(), priority.as_str())
    }

    fn job_key(kind: JobKind, id: Uuid) -> String {
        format!("bull:{}:job:{}", kind.as_str(), id)
    }

    fn completed_key(kind: JobKind) -> String {
        format!("bull:{}:completed", kind.as_str())
    }

    fn failed_key(kind: JobKind) -> String {
        format!("bull:{}:failed", kind.as_str())
    }

    fn done_channel(kind: JobKind, id: Uuid) -> String {
        format!("bull:{}:done:{}", kind.as_str(), id)
    }

    pub async fn enqueue(&self, payload: JobPayload, options: JobOptions) -> Result<JobHandle> {
        let kind = payload.kind();
        let id = Uuid::new_v4();

        let record = JobRecord {
            id,
            payload,
            attempts_remaining: options.attempts,
            options,
            status: JobStatus::Queued,
            result: None,
        };

        self.write_record(kind, &record).await?;
        self.cache
            .rpush(&Self::wait_key(kind, record.options.priority), &id.to_string())
            .await
            .context("failed to enqueue job")?;

        debug!(job_id = %id, kind = kind.as_str(), "enqueued job");

        Ok(JobHandle {
            cache: self.cache.clone(),
            kind,
            id,
            hard_timeout: kind.hard_timeout(),
        })
    }

    async fn write_record(&self, kind: JobKind, record: &JobRecord) -> Result<()> {
        let json = serde_json::to_string(record)?;
        self.cache.hset(&Self::job_key(kind, record.id), "record", &json).await
    }

    async fn read_record(&self, kind: JobKind, id: Uuid) -> Result<Option<JobRecord>> {
        let raw = self.cache.hget(&Self::job_key(kind, id), "record").await?;
        Ok(match raw {
            Some(s) => Some(serde_json::from_str(&s)?),
            None => None,
        })
    }

    /// Pop the next job id to run, draining `high` before `normal` before `low`.
    /// FIFO is preserved within a priority level because each list is pushed
    /// and popped in the same order.
    pub async fn dequeue_next(&self, kind: JobKind) -> Result<Option<Uuid>> {
        for priority in Priority::all_in_drain_order() {
            if let Some(raw) = self.cache.lpop(&Self::wait_key(kind, priority)).await? {
                if let Ok(id) = raw.parse::<Uuid>() {
                    return Ok(Some(id));
                }
            }
        }
        Ok(None)
    }

    pub async fn mark_active(&self, kind: JobKind, id: Uuid) -> Result<Option<JobRecord>> {
        let Some(mut record) = self.read_record(kind, id).await? else {
            return Ok(None);
        };
        record.status = JobStatus::Active;
        self.write_record(kind, &record).await?;
        Ok(Some(record))
    }

    /// Record a terminal result and notify any waiting `JobHandle`.
    pub async fn complete(&self, kind: JobKind, id: Uuid, result: JobResult) -> Result<()> {
        let Some(mut record) = self.read_record(kind, id).await? else {
            warn!(job_id = %id, "completed job has no record, dropping result");
            return Ok(());
        };

        record.status = if result.success {
            JobStatus::Completed
        } else {
            JobStatus::Failed
        };
        record.result = Some(result.clone());
        self.write_record(kind, &record).await?;

        let retention_key = if result.success {
            Self::completed_key(kind)
        } else {
            Self::failed_key(kind)
        };
        let cap = if result.success { COMPLETED_RETENTION } else { FAILED_RETENTION };
        self.cache.rpush(&retention_key, &id.to_string()).await?;
        self.trim_retention(&retention_key, cap).await?;

        self.cache
            .publish(&Self::done_channel(kind, id), if result.success { "ok" } else { "err" })
            .await?;

        Ok(())
    }

    /// Requeue a job for a retry attempt with exponential backoff, decrementing
    /// `attempts_remaining`. Caller is responsible for honouring the delay
    /// before re-pushing; this only updates bookkeeping and re-enqueues.
    pub async fn retry(&self, kind: JobKind, id: Uuid) -> Result<bool> {
        let Some(mut record) = self.read_record(kind, id).await? else {
            return Ok(false);
        };
        if record.attempts_remaining == 0 {
            return Ok(false);
        }
        record.attempts_remaining -= 1;
        record.status = JobStatus::Queued;
        self.write_record(kind, &record).await?;
        self.cache
            .rpush(&Self::wait_key(kind, record.options.priority), &id.to_string())
            .await?;
        Ok(true)
    }

    async fn trim_retention(&self, key: &str, cap: usize) -> Result<()> {
        // Pop from the front until we're back under the cap; RPUSH/LPOP keeps
        // this cheap since the list only ever grows by one per call.
        loop {
            let len = self.cache.llen(key).await?;
            if len as usize <= cap {
                break;
            }
            self.cache.lpop(key).await?;
        }
        Ok(())
    }

    pub async fn stats(&self, kind: JobKind) -> Result<QueueStats> {
        let mut waiting = 0;
        for priority in Priority::all_in_drain_order() {
            waiting += self.cache.llen(&Self::wait_key(kind, priority)).await?;
        }
        let completed = self.cache.llen(&Self::completed_key(kind)).await?;
        let failed = self.cache.llen(&Self::failed_key(kind)).await?;

        Ok(QueueStats {
            waiting,
            active: 0,
            completed,
            failed,
            delayed: 0,
        })
    }
}

/// Opaque handle a caller holds after enqueuing, resolving once the job
/// reaches a terminal state.
pub struct JobHandle {
    cache: CacheStore,
    kind: JobKind,
    id: Uuid,
    hard_timeout: Duration,
}

impl JobHandle {
    pub fn job_id(&self) -> Uuid {
        self.id
    }

    pub async fn await_result(self) -> Result<JobResult> {
        let channel = JobQueue::done_channel(self.kind, self.id);
        let mut pubsub = self.cache.subscribe(&channel).await?;

        // Re-check: the job may have completed between enqueue and subscribe.
        if let Some(result) = self.try_read_result().await? {
            return Ok(result);
        }

        let wait = async {
            let stream = pubsub.on_message();
            tokio::pin!(stream);
            stream.next().await
        };

        match tokio::time::timeout(self.hard_timeout, wait).await {
            Ok(Some(_msg)) => self
                .try_read_result()
                .await?
                .context("job notified completion but result is missing"),
            Ok(None) => anyhow::bail!("job notification channel closed unexpectedly"),
            Err(_) => {
                // One last check in case the notification raced the timeout.
                if let Some(result) = self.try_read_result().await? {
                    return Ok(result);
                }
                anyhow::bail!(
                    "job {} timed out after {:?}",
                    self.id,
                    self.hard_timeout
                )
            }
        }
    }

    async fn try_read_result(&self) -> Result<Option<JobResult>> {
        let key = format!("bull:{}:job:{}", self.kind.as_str(), self.id);
        let raw = self.cache.hget(&key, "record").await?;
        let Some(raw) = raw else { return Ok(None) };
        let record: JobRecord = serde_json::from_str(&raw)?;
        Ok(record.result)
    }
}

#[cfg(test)]
mod tests {
    use super::job::*;

    #[test]
    fn priorities_drain_high_before_normal_before_low() {
        let order = Priority::all_in_drain_order();
        assert_eq!(order, [Priority::High, Priority::Normal, Priority::Low]);
    }

    #[test]
    fn job_kind_timeouts_match_spec() {
        assert_eq!(JobKind::Audio.hard_timeout().as_secs(), 120);
        assert_eq!(JobKind::Image.hard_timeout().as_secs(), 60);
        assert_eq!(JobKind::Ocr.hard_timeout().as_secs(), 60);
        assert_eq!(JobKind::Llm.hard_timeout().as_secs(), 90);
    }

    #[test]
    fn job_kind_concurrency_matches_spec() {
        assert_eq!(JobKind::Audio.concurrency(), 3);
        assert_eq!(JobKind::Image.concurrency(), 5);
        assert_eq!(JobKind::Ocr.concurrency(), 5);
        assert_eq!(JobKind::Llm.concurrency(), 4);
    }
}
