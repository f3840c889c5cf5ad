//! The poll/dispatch/flush loop.
//!
//! One tokio task runs every stage in sequence:
//!
//! 1. fetch up to `poll_limit` updates starting at the cursor (long poll),
//! 2. advance the cursor past the highest update id seen,
//! 3. hand the batch to the callback,
//! 4. flush every action queued so far.
//!
//! An empty fetch skips straight back to stage 1. `stop()` only trips a token
//! that the loop checks before each fetch, so an in-flight long poll is never
//! interrupted.

use std::{
    sync::{
        atomic::{AtomicU8, Ordering},
        Arc,
    },
    time::Duration,
};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::{
    actions::{self, ActionDrain, ActionQueue, FlushReport},
    api::{methods, Api},
    codec::{decode_result, decode_update_batch, parse_body},
    config::ServerConfig,
    domain::UpdateId,
    entities::{Update, User},
    ports::{Params, Transport},
    Error, Result,
};

/// Batch callback, invoked on the poll task.
pub type UpdateCallback = Box<dyn FnMut(&[Update]) + Send + 'static>;

/// How [`PollEngine::start`] runs the loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Launch {
    /// Spawn the loop and return immediately.
    Detached,
    /// Spawn the loop and wait for it to exit.
    Joined,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EngineState {
    Stopped,
    Running,
    /// The loop died on an uncaught fetch fault.
    Faulted,
}

impl EngineState {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => EngineState::Running,
            2 => EngineState::Faulted,
            _ => EngineState::Stopped,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            EngineState::Stopped => 0,
            EngineState::Running => 1,
            EngineState::Faulted => 2,
        }
    }
}

/// Loop state shared between the poll task and its observers.
#[derive(Clone, Debug, Default)]
pub(crate) struct SharedState(Arc<AtomicU8>);

impl SharedState {
    pub(crate) fn get(&self) -> EngineState {
        EngineState::from_u8(self.0.load(Ordering::SeqCst))
    }

    fn set(&self, state: EngineState) {
        self.0.store(state.as_u8(), Ordering::SeqCst);
    }
}

pub struct PollEngine {
    api: Api,
    transport: Arc<dyn Transport>,
    poll_limit: u32,
    long_poll_timeout: Duration,
    cursor: UpdateId,
    queue: ActionQueue,
    drain: ActionDrain,
    stop: CancellationToken,
    state: SharedState,
}

impl PollEngine {
    pub fn new(cfg: &ServerConfig, transport: Arc<dyn Transport>) -> Self {
        let (queue, drain) = actions::channel();
        Self {
            api: Api::new(cfg.api_base.clone(), cfg.token.clone()),
            transport,
            poll_limit: cfg.poll_limit,
            long_poll_timeout: cfg.long_poll_timeout,
            cursor: UpdateId(0),
            queue,
            drain,
            stop: CancellationToken::new(),
            state: SharedState::default(),
        }
    }

    /// Producer handle for outgoing actions.
    pub fn queue(&self) -> ActionQueue {
        self.queue.clone()
    }

    /// Token that stops the loop before its next fetch once cancelled.
    pub fn stop_token(&self) -> CancellationToken {
        self.stop.clone()
    }

    /// Observer of the loop state; survives the engine being consumed by `start`.
    pub(crate) fn shared_state(&self) -> SharedState {
        self.state.clone()
    }

    /// Lowest update id not yet acknowledged.
    pub fn cursor(&self) -> UpdateId {
        self.cursor
    }

    pub fn state(&self) -> EngineState {
        self.state.get()
    }

    /// One-shot `getMe` call; fails if the token is not accepted.
    pub async fn check_identity(&self) -> Result<User> {
        tracing::info!(url = %self.api.redacted_url(methods::GET_ME), "checking bot token");
        let body = self
            .transport
            .request(&self.api.method_url(methods::GET_ME), &Params::new())
            .await?;
        let me = decode_result::<User>(&parse_body(&body)?).inspect_err(|e| {
            tracing::error!(error = %e, "bot token rejected");
        })?;
        tracing::info!(
            id = me.id.0,
            name = %me.first_name,
            username = me.username.as_deref().unwrap_or(""),
            "bot token accepted"
        );
        Ok(me)
    }

    async fn fetch_updates(&self) -> Result<Vec<Update>> {
        let params: Params = vec![
            ("offset".to_string(), self.cursor.to_string()),
            ("limit".to_string(), self.poll_limit.to_string()),
            (
                "timeout".to_string(),
                self.long_poll_timeout.as_secs().to_string(),
            ),
        ];
        tracing::debug!(
            url = %self.api.redacted_url(methods::GET_UPDATES),
            offset = self.cursor.0,
            "polling for updates"
        );
        let body = self
            .transport
            .request(&self.api.method_url(methods::GET_UPDATES), &params)
            .await?;
        decode_update_batch(&parse_body(&body)?)
    }

    fn advance_cursor(&mut self, batch: &[Update]) {
        let Some(top) = batch.iter().map(|u| u.update_id).max() else {
            return;
        };
        let next = UpdateId(top.0.saturating_add(1));
        if next > self.cursor {
            tracing::info!(from = self.cursor.0, to = next.0, "advancing update cursor");
            self.cursor = next;
        }
    }

    /// Run a single fetch/dispatch/flush iteration.
    ///
    /// Returns `None` for an idle iteration (empty fetch: no callback, no flush).
    pub async fn poll_once(
        &mut self,
        callback: &mut (dyn FnMut(&[Update]) + Send),
    ) -> Result<Option<FlushReport>> {
        let batch = self.fetch_updates().await?;
        if batch.is_empty() {
            return Ok(None);
        }

        tracing::info!(count = batch.len(), "received updates");
        self.advance_cursor(&batch);
        callback(&batch);

        let report = self.drain.flush(&self.api, self.transport.as_ref()).await;
        Ok(Some(report))
    }

    /// Check the token, then run the loop on a new task.
    ///
    /// Identity failures abort here and no loop is entered. With
    /// [`Launch::Joined`] this only returns once the loop has exited, and a fault
    /// that killed the loop is returned as the error.
    pub async fn start(
        self,
        callback: impl FnMut(&[Update]) + Send + 'static,
        launch: Launch,
    ) -> Result<EngineHandle> {
        self.check_identity().await?;

        let stop = self.stop.clone();
        let state = self.state.clone();
        state.set(EngineState::Running);
        let worker = tokio::spawn(self.run(Box::new(callback)));

        let mut handle = EngineHandle {
            stop,
            state,
            worker: Some(worker),
        };

        if launch == Launch::Joined {
            handle.wait().await?;
        }
        Ok(handle)
    }

    async fn run(mut self, mut callback: UpdateCallback) -> Result<()> {
        tracing::info!("poll loop started");
        while !self.stop.is_cancelled() {
            if let Err(e) = self.poll_once(callback.as_mut()).await {
                tracing::error!(error = %e, cursor = self.cursor.0, "poll loop terminated by fault");
                self.state.set(EngineState::Faulted);
                return Err(e);
            }
        }
        self.state.set(EngineState::Stopped);
        tracing::info!(cursor = self.cursor.0, "poll loop stopped");
        Ok(())
    }
}

/// Handle to a started loop.
#[derive(Debug)]
pub struct EngineHandle {
    stop: CancellationToken,
    state: SharedState,
    worker: Option<JoinHandle<Result<()>>>,
}

impl EngineHandle {
    /// Ask the loop to exit before its next fetch.
    pub fn stop(&self) {
        self.stop.cancel();
    }

    pub fn state(&self) -> EngineState {
        self.state.get()
    }

    /// Wait for the loop to exit and return the fault that ended it, if any.
    pub async fn join(mut self) -> Result<()> {
        self.wait().await
    }

    async fn wait(&mut self) -> Result<()> {
        let Some(worker) = self.worker.take() else {
            return Ok(());
        };
        match worker.await {
            Ok(outcome) => outcome,
            Err(e) => {
                self.state.set(EngineState::Faulted);
                Err(Error::Worker(e.to_string()))
            }
        }
    }
}
