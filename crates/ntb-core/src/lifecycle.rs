//! Process lifecycle: configure, clear webhook, register handlers, poll, stop.
//!
//! States only move forward, one step at a time, except that `Stopped` can be
//! entered from anywhere (setup failures jump straight to it).

use std::{fmt, future::Future, sync::Arc, time::Duration};

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::{
    config::Config,
    errors::Error,
    messaging::port::{PollingOptions, UpdateTransport},
    router::{ErrorSink, HandlerTable, Router},
    Result,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LifecycleState {
    Uninitialized,
    Configuring,
    HandlersRegistered,
    Polling,
    Stopping,
    Stopped,
}

impl LifecycleState {
    fn successor(self) -> Option<Self> {
        use LifecycleState::*;
        match self {
            Uninitialized => Some(Configuring),
            Configuring => Some(HandlersRegistered),
            HandlersRegistered => Some(Polling),
            Polling => Some(Stopping),
            Stopping => Some(Stopped),
            Stopped => None,
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Why the process is exiting.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Exit {
    /// Termination signal received while polling.
    Signal,
    /// The receive loop ended on its own.
    Completed,
    /// Setup failed or the receive loop hit an unrecoverable error.
    Failed,
}

impl Exit {
    pub fn code(self) -> u8 {
        match self {
            Exit::Signal | Exit::Completed => 0,
            Exit::Failed => 1,
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct StopPolicy {
    /// How long in-flight handlers get after the receive loop is told to stop.
    pub drain_timeout: Duration,
}

impl Default for StopPolicy {
    fn default() -> Self {
        Self {
            drain_timeout: Duration::from_secs(5),
        }
    }
}

pub struct LifecycleManager {
    state: LifecycleState,
    history: Vec<LifecycleState>,
    policy: StopPolicy,
}

impl Default for LifecycleManager {
    fn default() -> Self {
        Self::new(StopPolicy::default())
    }
}

impl LifecycleManager {
    pub fn new(policy: StopPolicy) -> Self {
        Self {
            state: LifecycleState::Uninitialized,
            history: vec![LifecycleState::Uninitialized],
            policy,
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Every state visited so far, in order.
    pub fn history(&self) -> &[LifecycleState] {
        &self.history
    }

    fn advance(&mut self, next: LifecycleState) -> Result<()> {
        let allowed = match next {
            LifecycleState::Stopped => self.state != LifecycleState::Stopped,
            _ => self.state.successor() == Some(next),
        };
        if !allowed {
            return Err(Error::External(format!(
                "invalid lifecycle transition {} -> {next}",
                self.state
            )));
        }
        debug!(from = %self.state, to = %next, "lifecycle transition");
        self.state = next;
        self.history.push(next);
        Ok(())
    }

    fn expect_state(&self, want: LifecycleState) -> Result<()> {
        if self.state != want {
            return Err(Error::External(format!(
                "expected lifecycle state {want}, found {}",
                self.state
            )));
        }
        Ok(())
    }

    fn abort(&mut self) {
        if self.state != LifecycleState::Stopped {
            let _ = self.advance(LifecycleState::Stopped);
        }
    }

    /// Abandon startup after a fatal error outside the lifecycle's own steps
    /// (logging, client wiring). Leaves the lifecycle `Stopped`.
    pub fn fail_setup(&mut self, err: &dyn fmt::Display) -> Exit {
        error!(state = %self.state, error = %err, "startup failed");
        self.abort();
        Exit::Failed
    }

    /// Run the config loader. On failure the lifecycle is `Stopped` and the
    /// error is returned for the caller to exit non-zero.
    pub fn configure(&mut self, load: impl FnOnce() -> Result<Config>) -> Result<Arc<Config>> {
        self.advance(LifecycleState::Configuring)?;
        match load() {
            Ok(cfg) => Ok(Arc::new(cfg)),
            Err(e) => {
                self.abort();
                Err(e)
            }
        }
    }

    /// Best-effort removal of a stale webhook. Never fails startup.
    pub async fn clear_webhook(&mut self, transport: &dyn UpdateTransport) -> Result<bool> {
        self.expect_state(LifecycleState::Configuring)?;
        match transport.clear_webhook().await {
            Ok(()) => {
                info!("cleared existing webhook");
                Ok(true)
            }
            Err(e) => {
                warn!(error = %e, "unable to clear webhook; continuing with polling");
                Ok(false)
            }
        }
    }

    /// Build the handler table. A registration error is fatal.
    pub fn register_handlers(
        &mut self,
        error_sink: Arc<dyn ErrorSink>,
        register: impl FnOnce(&mut HandlerTable) -> Result<()>,
    ) -> Result<Arc<Router>> {
        self.expect_state(LifecycleState::Configuring)?;

        let mut table = HandlerTable::new();
        if let Err(e) = register(&mut table) {
            error!(error = %e, "handler registration failed");
            self.abort();
            return Err(e);
        }

        self.advance(LifecycleState::HandlersRegistered)?;
        info!(handlers = table.len(), "handlers registered");
        Ok(Arc::new(Router::new(table, error_sink)))
    }

    /// Poll until `shutdown` resolves or the receive loop ends, then run the
    /// stop sequence. Always leaves the lifecycle in `Stopped`.
    pub async fn poll_until_shutdown<S>(
        &mut self,
        transport: Arc<dyn UpdateTransport>,
        router: Arc<Router>,
        opts: PollingOptions,
        shutdown: S,
    ) -> Exit
    where
        S: Future<Output = ()>,
    {
        if let Err(e) = self.advance(LifecycleState::Polling) {
            error!(error = %e, "cannot start polling");
            self.abort();
            return Exit::Failed;
        }

        info!(
            drop_pending = opts.drop_pending_updates,
            allowed = ?opts.allowed_updates,
            "starting polling"
        );

        let token = CancellationToken::new();
        let poll = transport.run_polling(router, opts, token.clone());
        tokio::pin!(poll);
        tokio::pin!(shutdown);

        let (exit, loop_done) = tokio::select! {
            res = &mut poll => match res {
                Ok(()) => (Exit::Completed, true),
                Err(e) => {
                    error!(error = %e, "receive loop failed");
                    (Exit::Failed, true)
                }
            },
            _ = &mut shutdown => {
                info!("termination signal received, shutting down");
                (Exit::Signal, false)
            }
        };

        if let Err(e) = self.advance(LifecycleState::Stopping) {
            warn!(error = %e, "unexpected state while stopping");
        }

        // Each step runs regardless of how the previous one went.
        token.cancel();

        if !loop_done {
            match tokio::time::timeout(self.policy.drain_timeout, &mut poll).await {
                Ok(Ok(())) => debug!("receive loop drained"),
                Ok(Err(e)) => warn!(error = %e, "receive loop failed while draining"),
                Err(_) => warn!(
                    timeout_ms = self.policy.drain_timeout.as_millis() as u64,
                    "in-flight work abandoned"
                ),
            }
        }

        if let Err(e) = transport.close().await {
            warn!(error = %e, "failed to release transport session");
        }

        self.abort();
        info!(code = exit.code(), "bot stopped");
        exit
    }
}

/// Resolves on Ctrl-C, or SIGTERM on unix.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
