//! Update routing: one handler per update, chosen by dispatch key.

use std::{fmt, sync::Arc};

use async_trait::async_trait;

use crate::{errors::Error, messaging::types::IncomingUpdate, Result};

/// What selects a handler for an update.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum DispatchKey {
    /// Exact, case-sensitive command name (without the leading `/`).
    Command(String),
    Callback,
    Photo,
    Text,
}

impl DispatchKey {
    pub fn command(name: impl Into<String>) -> Self {
        DispatchKey::Command(name.into())
    }

    pub fn for_update(update: &IncomingUpdate) -> Self {
        match update {
            IncomingUpdate::Command(c) => DispatchKey::Command(c.name.clone()),
            IncomingUpdate::Callback(_) => DispatchKey::Callback,
            IncomingUpdate::Photo(_) => DispatchKey::Photo,
            IncomingUpdate::Text(_) => DispatchKey::Text,
        }
    }
}

impl fmt::Display for DispatchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchKey::Command(name) => write!(f, "/{name}"),
            DispatchKey::Callback => f.write_str("callback"),
            DispatchKey::Photo => f.write_str("photo"),
            DispatchKey::Text => f.write_str("text"),
        }
    }
}

/// A unit of logic bound to one dispatch key.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn handle(&self, update: &IncomingUpdate) -> Result<()>;
}

/// Where handler failures end up. Must not fail itself.
#[async_trait]
pub trait ErrorSink: Send + Sync {
    async fn report(&self, key: &DispatchKey, update: &IncomingUpdate, err: &Error);
}

/// Default sink: log and move on.
#[derive(Clone, Copy, Debug, Default)]
pub struct LoggingErrorSink;

#[async_trait]
impl ErrorSink for LoggingErrorSink {
    async fn report(&self, key: &DispatchKey, update: &IncomingUpdate, err: &Error) {
        tracing::error!(
            key = %key,
            chat_id = update.chat_id().0,
            user_id = update.user_id().0,
            error = %err,
            "handler failed"
        );
    }
}

/// Ordered key -> handler mapping. Built during setup, read-only afterwards.
#[derive(Default)]
pub struct HandlerTable {
    entries: Vec<(DispatchKey, Arc<dyn Handler>)>,
}

impl HandlerTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `handler` to `key`. Binding the same key twice is a setup error.
    pub fn register(&mut self, key: DispatchKey, handler: Arc<dyn Handler>) -> Result<()> {
        if self.entries.iter().any(|(k, _)| *k == key) {
            return Err(Error::Handler(format!("duplicate handler for {key}")));
        }
        if let DispatchKey::Command(name) = &key {
            if name.is_empty() || name.contains(char::is_whitespace) {
                return Err(Error::Handler(format!("invalid command name {name:?}")));
            }
        }
        self.entries.push((key, handler));
        Ok(())
    }

    pub fn get(&self, key: &DispatchKey) -> Option<&Arc<dyn Handler>> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, h)| h)
    }

    pub fn keys(&self) -> impl Iterator<Item = &DispatchKey> {
        self.entries.iter().map(|(k, _)| k)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DispatchOutcome {
    Handled(DispatchKey),
    Failed(DispatchKey),
    /// No handler for the key; nothing was sent.
    Ignored,
}

/// Routes each update to at most one handler. Shared freely across tasks.
pub struct Router {
    table: HandlerTable,
    error_sink: Arc<dyn ErrorSink>,
}

impl Router {
    pub fn new(table: HandlerTable, error_sink: Arc<dyn ErrorSink>) -> Self {
        Self { table, error_sink }
    }

    pub fn table(&self) -> &HandlerTable {
        &self.table
    }

    pub async fn dispatch(&self, update: IncomingUpdate) -> DispatchOutcome {
        let key = DispatchKey::for_update(&update);
        let Some(handler) = self.table.get(&key) else {
            tracing::debug!(key = %key, "no handler; update ignored");
            return DispatchOutcome::Ignored;
        };

        match handler.handle(&update).await {
            Ok(()) => DispatchOutcome::Handled(key),
            Err(err) => {
                self.error_sink.report(&key, &update, &err).await;
                DispatchOutcome::Failed(key)
            }
        }
    }
}
