//! Long-polling receive loop.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use teloxide::{
    dispatching::Dispatcher,
    dptree,
    error_handlers::LoggingErrorHandler,
    prelude::*,
    types::AllowedUpdate,
    update_listeners::Polling,
};

use tokio::time::{sleep, Duration};
use tokio_util::sync::CancellationToken;

use ntb_core::{
    errors::Error,
    messaging::{
        port::{PollingOptions, UpdateTransport},
        types::UpdateCategory,
    },
    router::Router,
    Result,
};

use crate::{handlers, map_err};

fn allowed(category: UpdateCategory) -> AllowedUpdate {
    match category {
        UpdateCategory::Message => AllowedUpdate::Message,
        UpdateCategory::CallbackQuery => AllowedUpdate::CallbackQuery,
    }
}

/// Owns a `Bot` handle until [`close`](UpdateTransport::close) drops it.
pub struct TelegramTransport {
    bot: Mutex<Option<Bot>>,
}

impl TelegramTransport {
    pub fn new(bot: Bot) -> Self {
        Self {
            bot: Mutex::new(Some(bot)),
        }
    }

    fn bot(&self) -> Result<Bot> {
        self.bot
            .lock()
            .map_err(|_| Error::Transport("transport lock poisoned".to_string()))?
            .clone()
            .ok_or_else(|| Error::Transport("transport already closed".to_string()))
    }

    /// Log the bot identity. Best-effort: failures are logged, not returned.
    pub async fn announce(&self) {
        let bot = match self.bot() {
            Ok(bot) => bot,
            Err(e) => {
                tracing::warn!(error = %e, "getMe skipped");
                return;
            }
        };
        match bot.get_me().await {
            Ok(me) => tracing::info!(username = %me.username(), id = me.id.0, "bot started"),
            Err(e) => tracing::warn!(error = %e, "getMe failed"),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.bot.lock().map_or(true, |bot| bot.is_none())
    }
}

#[async_trait]
impl UpdateTransport for TelegramTransport {
    async fn clear_webhook(&self) -> Result<()> {
        self.bot()?.delete_webhook().await.map_err(map_err)?;
        Ok(())
    }

    async fn run_polling(
        &self,
        router: Arc<Router>,
        opts: PollingOptions,
        shutdown: CancellationToken,
    ) -> Result<()> {
        let bot = self.bot()?;

        let mut builder = Polling::builder(bot.clone())
            .allowed_updates(opts.allowed_updates.iter().copied().map(allowed).collect());
        if opts.drop_pending_updates {
            builder = builder.drop_pending_updates();
        }
        let listener = builder.build();

        let handler = dptree::entry()
            .branch(Update::filter_callback_query().endpoint(handlers::handle_callback))
            .branch(Update::filter_message().endpoint(handlers::handle_message));

        let mut dispatcher = Dispatcher::builder(bot, handler)
            .dependencies(dptree::deps![router])
            .default_handler(|upd| async move {
                tracing::debug!(update_id = upd.id, "unhandled update kind");
            })
            .error_handler(LoggingErrorHandler::with_custom_text(
                "an error from the update listener",
            ))
            .build();

        let token = dispatcher.shutdown_token();
        let watcher = tokio::spawn(async move {
            shutdown.cancelled().await;
            // The dispatcher may not be running yet; retry until it accepts the request.
            loop {
                match token.shutdown() {
                    Ok(done) => {
                        done.await;
                        break;
                    }
                    Err(_idle) => sleep(Duration::from_millis(50)).await,
                }
            }
        });

        tracing::info!(
            allowed = ?opts.allowed_updates,
            drop_pending = opts.drop_pending_updates,
            "long polling started"
        );
        dispatcher
            .dispatch_with_listener(
                listener,
                LoggingErrorHandler::with_custom_text("an error from the update listener"),
            )
            .await;
        watcher.abort();
        tracing::info!("long polling stopped");
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        let released = self
            .bot
            .lock()
            .map_err(|_| Error::Transport("transport lock poisoned".to_string()))?
            .take();
        match released {
            Some(_) => tracing::debug!("telegram client handle released"),
            None => tracing::debug!("transport already closed"),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{bot_for, method};

    #[test]
    fn categories_map_to_allowed_updates() {
        let mapped: Vec<AllowedUpdate> = PollingOptions::default()
            .allowed_updates
            .into_iter()
            .map(allowed)
            .collect();
        assert_eq!(
            mapped,
            vec![AllowedUpdate::Message, AllowedUpdate::CallbackQuery]
        );
    }

    #[tokio::test]
    async fn clear_webhook_calls_delete_webhook() {
        let mut server = mockito::Server::new_async().await;
        let delete = server
            .mock("POST", method("deleteWebhook"))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"ok":true,"result":true}"#)
            .expect(1)
            .create_async()
            .await;

        let transport = TelegramTransport::new(bot_for(&server));
        transport.clear_webhook().await.unwrap();
        delete.assert_async().await;
    }

    #[tokio::test]
    async fn clear_webhook_failure_is_transport_error() {
        let mut server = mockito::Server::new_async().await;
        let _delete = server
            .mock("POST", method("deleteWebhook"))
            .with_status(401)
            .with_header("content-type", "application/json")
            .with_body(r#"{"ok":false,"error_code":401,"description":"Unauthorized"}"#)
            .create_async()
            .await;

        let transport = TelegramTransport::new(bot_for(&server));
        let err = transport.clear_webhook().await.unwrap_err();
        assert!(matches!(err, Error::Transport(_)));
    }

    #[tokio::test]
    async fn polling_after_close_is_refused() {
        let server = mockito::Server::new_async().await;
        let transport = TelegramTransport::new(bot_for(&server));
        transport.close().await.unwrap();
        transport.close().await.unwrap();
        assert!(transport.is_closed());

        let err = transport
            .run_polling(empty_router(), PollingOptions::default(), CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Transport(_)));
    }

    fn empty_router() -> Arc<Router> {
        Arc::new(Router::new(
            ntb_core::router::HandlerTable::new(),
            Arc::new(ntb_core::router::LoggingErrorSink),
        ))
    }

    async fn idle_bot_api() -> mockito::ServerGuard {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", method("deleteWebhook"))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"ok":true,"result":true}"#)
            .create_async()
            .await;
        server
            .mock("POST", method("getUpdates"))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"ok":true,"result":[]}"#)
            .expect_at_least(1)
            .create_async()
            .await;
        server
    }

    #[tokio::test]
    async fn cancelling_stops_a_running_dispatcher() {
        let server = idle_bot_api().await;
        let transport = Arc::new(TelegramTransport::new(bot_for(&server)));
        let shutdown = CancellationToken::new();

        let polling = tokio::spawn({
            let transport = transport.clone();
            let shutdown = shutdown.clone();
            async move {
                transport
                    .run_polling(empty_router(), PollingOptions::default(), shutdown)
                    .await
            }
        });

        sleep(Duration::from_millis(300)).await;
        shutdown.cancel();

        let finished = tokio::time::timeout(Duration::from_secs(2), polling)
            .await
            .expect("dispatcher must stop well before the drain timeout")
            .unwrap();
        assert!(finished.is_ok());
    }

    #[tokio::test]
    async fn cancellation_before_start_is_not_lost() {
        let server = idle_bot_api().await;
        let transport = TelegramTransport::new(bot_for(&server));
        let shutdown = CancellationToken::new();
        shutdown.cancel();

        tokio::time::timeout(
            Duration::from_secs(2),
            transport.run_polling(empty_router(), PollingOptions::default(), shutdown),
        )
        .await
        .expect("an early cancel must still stop the dispatcher")
        .unwrap();
    }
}
