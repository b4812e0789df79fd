//! A concurrent process runner for the coldchain services.
//!
//! Each service binary hands the runner its long-running processes
//! (broker consumer loops, HTTP servers) and its cleanup functions
//! (client close, producer flush). The runner provides:
//! - Concurrent execution of named processes
//! - Graceful shutdown on SIGTERM/SIGINT via a shared cancellation token
//! - Cancellation of all processes when any process fails
//! - Closers executed under a timeout, regardless of process outcome
//!
//! # Example
//!
//! ```no_run
//! use coldchain_runner::Runner;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() {
//!     let runner = Runner::new()
//!         .with_named_process("consumer", |ctx| async move {
//!             loop {
//!                 tokio::select! {
//!                     _ = ctx.cancelled() => break,
//!                     _ = tokio::time::sleep(Duration::from_secs(1)) => {
//!                         tracing::info!("working");
//!                     }
//!                 }
//!             }
//!             Ok(())
//!         })
//!         .with_closer(|| async move {
//!             tracing::info!("flushing");
//!             Ok(())
//!         })
//!         .with_closer_timeout(Duration::from_secs(5));
//!
//!     runner.run().await;
//! }
//! ```

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// A long-running process: takes the shared cancellation token and runs
/// until cancelled or failed.
pub type Process = Box<
    dyn FnOnce(CancellationToken) -> Pin<Box<dyn Future<Output = Result<(), anyhow::Error>> + Send>>
        + Send,
>;

/// A cleanup function executed after all processes have stopped.
pub type Closer =
    Box<dyn FnOnce() -> Pin<Box<dyn Future<Output = Result<(), anyhow::Error>> + Send>> + Send>;

pub struct Runner {
    processes: Vec<(String, Process)>,
    closers: Vec<Closer>,
    closer_timeout: Duration,
    cancellation_token: CancellationToken,
}

impl Default for Runner {
    fn default() -> Self {
        Self::new()
    }
}

impl Runner {
    pub fn new() -> Self {
        Self {
            processes: Vec::new(),
            closers: Vec::new(),
            closer_timeout: Duration::from_secs(10),
            cancellation_token: CancellationToken::new(),
        }
    }

    /// Add a named process. Processes run concurrently; the name shows up
    /// in lifecycle logs. If any process returns an error, all processes
    /// are cancelled and the runner exits non-zero after the closers run.
    pub fn with_named_process<F, Fut>(mut self, name: impl Into<String>, process: F) -> Self
    where
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), anyhow::Error>> + Send + 'static,
    {
        self.processes
            .push((name.into(), Box::new(|token| Box::pin(process(token)))));
        self
    }

    /// Add an already-boxed process, for modules that build their
    /// processes ahead of time.
    pub fn with_boxed_process(mut self, name: impl Into<String>, process: Process) -> Self {
        self.processes.push((name.into(), process));
        self
    }

    /// Add a closer. Closers run after all processes stop, whether they
    /// stopped by cancellation or error; every closer is attempted.
    pub fn with_closer<F, Fut>(mut self, closer: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), anyhow::Error>> + Send + 'static,
    {
        self.closers.push(Box::new(|| Box::pin(closer())));
        self
    }

    /// Bound the total time closers may take. Default 10 seconds.
    pub fn with_closer_timeout(mut self, timeout: Duration) -> Self {
        self.closer_timeout = timeout;
        self
    }

    /// Use an externally owned cancellation token.
    pub fn with_cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancellation_token = token;
        self
    }

    /// Run all processes until completion or shutdown, then run closers
    /// and exit the process: 0 on clean shutdown, 1 when a process
    /// failed.
    pub async fn run(self) {
        let token = self.cancellation_token;
        let closers = self.closers;
        let closer_timeout = self.closer_timeout;

        let mut join_set = JoinSet::new();
        for (name, process) in self.processes {
            let process_token = token.clone();
            join_set.spawn(async move {
                tracing::debug!(process = %name, "process starting");
                let result = process(process_token).await;
                (name, result)
            });
        }

        spawn_signal_handlers(token.clone());

        let mut first_error = None;
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((name, Ok(()))) => {
                    tracing::debug!(process = %name, "process completed");
                }
                Ok((name, Err(err))) => {
                    if !token.is_cancelled() {
                        tracing::error!(process = %name, error = %format!("{err:#}"), "process failed");
                        first_error = Some(err);
                        token.cancel();
                    } else {
                        tracing::warn!(process = %name, error = %format!("{err:#}"), "process failed during shutdown");
                    }
                }
                Err(join_err) => {
                    tracing::error!(error = %join_err, "process panicked");
                    if !token.is_cancelled() {
                        token.cancel();
                    }
                }
            }
        }

        if !closers.is_empty() {
            tracing::info!(timeout_secs = closer_timeout.as_secs(), "running closers");
            match tokio::time::timeout(closer_timeout, run_closers(closers)).await {
                Ok(()) => tracing::info!("all closers completed"),
                Err(_) => tracing::error!("closers timed out"),
            }
        }

        if let Some(err) = first_error {
            tracing::error!(error = %format!("{err:#}"), "exiting with error");
            std::process::exit(1);
        }
        tracing::info!("exiting normally");
        std::process::exit(0);
    }

    #[cfg(test)]
    fn into_parts(self) -> (Vec<(String, Process)>, Vec<Closer>) {
        (self.processes, self.closers)
    }
}

fn spawn_signal_handlers(token: CancellationToken) {
    let ctrl_c_token = token.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("received shutdown signal");
                ctrl_c_token.cancel();
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to install ctrl-c handler");
            }
        }
    });

    #[cfg(unix)]
    {
        tokio::spawn(async move {
            use tokio::signal::unix::{signal, SignalKind};
            match signal(SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    sigterm.recv().await;
                    tracing::info!("received SIGTERM");
                    token.cancel();
                }
                Err(err) => {
                    tracing::error!(error = %err, "failed to install SIGTERM handler");
                }
            }
        });
    }
}

async fn run_closers(closers: Vec<Closer>) {
    let mut closer_set = JoinSet::new();
    for closer in closers {
        closer_set.spawn(async move { closer().await });
    }

    while let Some(result) = closer_set.join_next().await {
        match result {
            Ok(Ok(())) => tracing::debug!("closer completed"),
            Ok(Err(err)) => tracing::error!(error = %format!("{err:#}"), "closer failed"),
            Err(err) => tracing::error!(error = %err, "closer panicked"),
        }
    }
}
