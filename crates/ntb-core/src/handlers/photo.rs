use std::sync::Arc;

use async_trait::async_trait;

use crate::{messaging::types::IncomingUpdate, router::Handler, Result};

use super::{unexpected, Services};

pub(crate) const OCR_DISABLED: &str =
    "📷 Image recognition is disabled on this bot. Please type the number instead.";
pub(crate) const OCR_UNAVAILABLE: &str =
    "📷 Reading numbers from images isn't available yet. Please type the number instead.";

/// Photos. The OCR pipeline is not part of this bot; only the feature flags are honoured.
pub struct PhotoHandler {
    svc: Arc<Services>,
}

impl PhotoHandler {
    pub fn new(svc: Arc<Services>) -> Self {
        Self { svc }
    }
}

#[async_trait]
impl Handler for PhotoHandler {
    async fn handle(&self, update: &IncomingUpdate) -> Result<()> {
        let IncomingUpdate::Photo(photo) = update else {
            return Err(unexpected("photo", update));
        };

        let cfg = &self.svc.cfg;
        let reply = if cfg.enable_ocr && cfg.enable_image_processing {
            tracing::info!(file_id = %photo.file_id, "photo received; no OCR backend configured");
            OCR_UNAVAILABLE
        } else {
            OCR_DISABLED
        };
        self.svc.reply(photo.chat_id, reply).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::testing::{
        config, photo, services, services_with, RecordingMessenger, ScriptedLookup,
    };

    #[tokio::test]
    async fn ocr_disabled_by_default() {
        let messenger = Arc::new(RecordingMessenger::default());
        let svc = services(messenger.clone(), Arc::new(ScriptedLookup::ok("{}")), None);
        PhotoHandler::new(svc).handle(&photo()).await.unwrap();
        assert_eq!(messenger.texts(), vec![OCR_DISABLED.to_string()]);
    }

    #[tokio::test]
    async fn ocr_enabled_without_backend() {
        let messenger = Arc::new(RecordingMessenger::default());
        let cfg = config(&[("ENABLE_OCR", "true")]);
        let lookup = Arc::new(ScriptedLookup::ok("{}"));
        let svc = services_with(cfg, messenger.clone(), lookup, None);
        PhotoHandler::new(svc).handle(&photo()).await.unwrap();
        assert_eq!(messenger.texts(), vec![OCR_UNAVAILABLE.to_string()]);
    }

    #[tokio::test]
    async fn image_processing_off_wins() {
        let messenger = Arc::new(RecordingMessenger::default());
        let cfg = config(&[("ENABLE_OCR", "true"), ("ENABLE_IMAGE_PROCESSING", "false")]);
        let lookup = Arc::new(ScriptedLookup::ok("{}"));
        let svc = services_with(cfg, messenger.clone(), lookup, None);
        PhotoHandler::new(svc).handle(&photo()).await.unwrap();
        assert_eq!(messenger.texts(), vec![OCR_DISABLED.to_string()]);
    }
}
