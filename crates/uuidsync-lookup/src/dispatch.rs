#![forbid(unsafe_code)]

//! Where lookup jobs run.
//!
//! A job resolves one key and posts the completion on the session's channel.
//! [`ThreadDispatcher`] runs every job on its own background thread;
//! [`InlineDispatcher`] runs it on the caller, which keeps tests
//! deterministic. Either way the result is only applied on the next tick.

use std::thread;

/// A boxed lookup job.
pub type LookupJob = Box<dyn FnOnce() + Send + 'static>;

/// Executes lookup jobs.
pub trait Dispatcher {
    fn dispatch(&mut self, job: LookupJob);
}

/// Runs each job on a spawned thread and reaps finished threads.
#[derive(Debug, Default)]
pub struct ThreadDispatcher {
    handles: Vec<thread::JoinHandle<()>>,
}

impl ThreadDispatcher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of jobs not yet reaped.
    #[must_use]
    pub fn outstanding(&self) -> usize {
        self.handles.len()
    }

    fn reap_finished(&mut self) {
        if self.handles.is_empty() {
            return;
        }
        let mut remaining = Vec::with_capacity(self.handles.len());
        for handle in self.handles.drain(..) {
            if handle.is_finished() {
                if let Err(payload) = handle.join() {
                    let msg = if let Some(s) = payload.downcast_ref::<&str>() {
                        (*s).to_owned()
                    } else if let Some(s) = payload.downcast_ref::<String>() {
                        s.clone()
                    } else {
                        "unknown panic payload".to_owned()
                    };
                    tracing::error!("lookup job panicked: {msg}");
                }
            } else {
                remaining.push(handle);
            }
        }
        self.handles = remaining;
    }
}

impl Dispatcher for ThreadDispatcher {
    fn dispatch(&mut self, job: LookupJob) {
        self.reap_finished();
        self.handles.push(thread::spawn(job));
    }
}

/// Runs each job immediately on the calling thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct InlineDispatcher;

impl Dispatcher for InlineDispatcher {
    fn dispatch(&mut self, job: LookupJob) {
        job();
    }
}
