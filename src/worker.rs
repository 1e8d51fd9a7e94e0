//! Resident-model inference worker.
//!
//! Each service owns one expensive model resource. The worker loads it once
//! (in `spawn_blocking`, since loading does synchronous I/O and heavy
//! compute), then a dedicated blocking thread owns it for the life of the
//! process and drains a queue of jobs. Callers hold a cheap cloneable
//! [`Worker`] handle and await a oneshot reply.
//!
//! Serializing jobs through the queue is what makes mutable backend state
//! (KV caches, RNG state) safe: the backend is never invoked concurrently.
//!
//! # Example
//!
//! ```no_run
//! use eva_services::worker::{Backend, Worker};
//!
//! struct Upper;
//!
//! impl Backend for Upper {
//!     type Job = String;
//!     type Output = String;
//!     fn invoke(&mut self, job: String) -> eva_services::Result<String> {
//!         Ok(job.to_uppercase())
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let worker = Worker::start(|| Ok(Upper)).await.unwrap();
//!     let out = worker.invoke("hi".to_string()).await.unwrap();
//!     assert_eq!(out, "HI");
//! }
//! ```

use tokio::sync::{mpsc, oneshot};

use crate::{Error, Result};

/// A loaded model resource that can run one job at a time.
///
/// `invoke` takes `&mut self` so implementations may keep caches and RNG
/// state without interior mutability; the worker guarantees exclusive access.
pub trait Backend: Send + 'static {
    type Job: Send + 'static;
    type Output: Send + 'static;

    fn invoke(&mut self, job: Self::Job) -> Result<Self::Output>;
}

/// A submitted job awaiting its reply.
struct Pending<B: Backend> {
    job: B::Job,
    reply: oneshot::Sender<Result<B::Output>>,
}

/// Handle for submitting jobs to a running worker.
pub struct Worker<B: Backend> {
    tx: mpsc::Sender<Pending<B>>,
}

// Manual impl: `B` itself need not be Clone for the handle to be.
impl<B: Backend> Clone for Worker<B> {
    fn clone(&self) -> Self {
        Self { tx: self.tx.clone() }
    }
}

impl<B: Backend> Worker<B> {
    /// Load the backend and start the worker thread.
    ///
    /// Returns once loading has finished, so a returned handle is always
    /// backed by a ready model. Returns an error if loading fails.
    pub async fn start<F>(load: F) -> Result<Self>
    where
        F: FnOnce() -> Result<B> + Send + 'static,
    {
        let backend = tokio::task::spawn_blocking(load)
            .await
            .map_err(|join_error| Error::Worker(format!("load task panicked: {join_error}")))??;

        let (tx, rx) = mpsc::channel::<Pending<B>>(64);
        tokio::task::spawn_blocking(move || run_worker(backend, rx));

        Ok(Self { tx })
    }

    /// Submit a job and wait for the result.
    pub async fn invoke(&self, job: B::Job) -> Result<B::Output> {
        let (reply_tx, reply_rx) = oneshot::channel::<Result<B::Output>>();
        self.tx
            .send(Pending { job, reply: reply_tx })
            .await
            .map_err(|_| Error::Worker("worker has shut down".into()))?;

        reply_rx
            .await
            .map_err(|_| Error::Worker("worker dropped reply channel".into()))?
    }
}

/// The worker loop — runs in a dedicated blocking thread, processing jobs
/// sequentially until every handle is dropped.
fn run_worker<B: Backend>(mut backend: B, mut rx: mpsc::Receiver<Pending<B>>) {
    while let Some(pending) = rx.blocking_recv() {
        let result = backend.invoke(pending.job);
        // Ignore send errors — caller may have gone away.
        let _ = pending.reply.send(result);
    }
    tracing::info!("inference worker shut down");
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Doubler;

    impl Backend for Doubler {
        type Job = i64;
        type Output = i64;

        fn invoke(&mut self, job: i64) -> Result<i64> {
            if job < 0 {
                return Err(Error::Inference("negative input".into()));
            }
            Ok(job * 2)
        }
    }

    #[tokio::test]
    async fn test_jobs_round_trip() {
        let worker = Worker::start(|| Ok(Doubler)).await.unwrap();
        assert_eq!(worker.invoke(21).await.unwrap(), 42);
        assert_eq!(worker.invoke(0).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_backend_errors_propagate() {
        let worker = Worker::start(|| Ok(Doubler)).await.unwrap();
        let err = worker.invoke(-1).await.unwrap_err();
        assert!(err.to_string().contains("negative input"));
        // The worker survives a failed job.
        assert_eq!(worker.invoke(3).await.unwrap(), 6);
    }

    #[tokio::test]
    async fn test_load_failure_surfaces() {
        let result = Worker::<Doubler>::start(|| Err(Error::WeightLoad("no weights".into()))).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_clones_share_one_backend() {
        let worker = Worker::start(|| Ok(Doubler)).await.unwrap();
        let clone = worker.clone();
        assert_eq!(worker.invoke(1).await.unwrap(), 2);
        assert_eq!(clone.invoke(2).await.unwrap(), 4);
    }
}
