//! The lookup workflow: validate -> rate limit -> call upstream -> format.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::{
    domain::{ChatId, UserId},
    formatting::{rate_limited, ENTER_NUMBER_PROMPT, PLEASE_WAIT},
    lookup::{LookupResult, NumberLookup},
    messaging::types::IncomingUpdate,
    ports::RateDecision,
    router::Handler,
    validation::{classify, normalize_registration, Verdict},
    Result,
};

use super::{unexpected, Services};

pub(crate) const VEHICLE_PROMPT: &str =
    "🚗 Please send a registration number, e.g. /vehicle MH12AB1234";
pub(crate) const VEHICLE_INVALID: &str = "❌ That doesn't look like a valid registration number.";
pub(crate) const VEHICLE_UNAVAILABLE: &str = "🚗 Vehicle lookup is not available right now.";

/// Count anyone who uses the lookup workflow, not just `/start` callers.
async fn remember(svc: &Services, user_id: UserId) {
    if let Err(e) = svc.users.record_user(user_id, None).await {
        warn!(user_id = user_id.0, error = %e, "failed to record user");
    }
}

/// Classify `text` and, if it is a phone number, look it up.
pub(crate) async fn number_lookup(
    svc: &Services,
    chat_id: ChatId,
    user_id: UserId,
    text: &str,
) -> Result<()> {
    remember(svc, user_id).await;

    let number = match classify(text) {
        Verdict::Valid(number) => number,
        other => {
            let prompt = svc.formatter.prompt_for(&other).unwrap_or(ENTER_NUMBER_PROMPT);
            return svc.reply(chat_id, prompt).await;
        }
    };

    run_lookup(svc, svc.lookup.as_ref(), chat_id, user_id, &number, "number").await
}

async fn run_lookup(
    svc: &Services,
    lookup: &dyn NumberLookup,
    chat_id: ChatId,
    user_id: UserId,
    key: &str,
    kind: &'static str,
) -> Result<()> {
    if let RateDecision::Limited { retry_after } = svc.limits.check(user_id).await {
        info!(user_id = user_id.0, "lookup rate limited");
        return svc.reply(chat_id, &rate_limited(retry_after)).await;
    }

    svc.reply(chat_id, PLEASE_WAIT).await?;

    let result = svc.retry.run(lookup, key).await;
    match &result {
        LookupResult::Success(body) => {
            info!(user_id = user_id.0, kind, bytes = body.len(), "lookup succeeded")
        }
        LookupResult::Failure(f) => {
            warn!(user_id = user_id.0, kind, failure = f.kind(), detail = %f, "lookup failed")
        }
    }

    for chunk in svc.formatter.format_chunks(&result) {
        svc.reply(chat_id, &chunk).await?;
    }
    Ok(())
}

/// `/trace <number>`
pub struct TraceHandler {
    svc: Arc<Services>,
}

impl TraceHandler {
    pub fn new(svc: Arc<Services>) -> Self {
        Self { svc }
    }
}

#[async_trait]
impl Handler for TraceHandler {
    async fn handle(&self, update: &IncomingUpdate) -> Result<()> {
        let IncomingUpdate::Command(cmd) = update else {
            return Err(unexpected("trace", update));
        };
        if cmd.args.trim().is_empty() {
            return self.svc.reply(cmd.chat_id, ENTER_NUMBER_PROMPT).await;
        }
        number_lookup(&self.svc, cmd.chat_id, cmd.user_id, &cmd.args).await
    }
}

/// `/vehicle <registration>`, served by the optional vehicle endpoint.
pub struct VehicleHandler {
    svc: Arc<Services>,
}

impl VehicleHandler {
    pub fn new(svc: Arc<Services>) -> Self {
        Self { svc }
    }
}

#[async_trait]
impl Handler for VehicleHandler {
    async fn handle(&self, update: &IncomingUpdate) -> Result<()> {
        let IncomingUpdate::Command(cmd) = update else {
            return Err(unexpected("vehicle", update));
        };
        remember(&self.svc, cmd.user_id).await;
        let Some(lookup) = &self.svc.vehicle_lookup else {
            return self.svc.reply(cmd.chat_id, VEHICLE_UNAVAILABLE).await;
        };
        if cmd.args.trim().is_empty() {
            return self.svc.reply(cmd.chat_id, VEHICLE_PROMPT).await;
        }
        let Some(registration) = normalize_registration(&cmd.args) else {
            return self.svc.reply(cmd.chat_id, VEHICLE_INVALID).await;
        };

        run_lookup(
            &self.svc,
            lookup.as_ref(),
            cmd.chat_id,
            cmd.user_id,
            &registration,
            "vehicle",
        )
        .await
    }
}
