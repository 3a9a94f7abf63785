//! In-memory stand-ins for the collaborator ports. Nothing here survives a restart.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::{
    domain::{ChatId, UserId},
    messaging::port::MessagingPort,
    ports::{BroadcastReport, Broadcaster, UserStore},
    Result,
};

#[derive(Clone, Debug)]
pub struct UserRecord {
    pub username: Option<String>,
    pub first_seen: DateTime<Utc>,
}

pub struct InMemoryUserStore {
    admin_id: UserId,
    users: RwLock<HashMap<UserId, UserRecord>>,
}

impl InMemoryUserStore {
    pub fn new(admin_id: i64) -> Self {
        Self {
            admin_id: UserId(admin_id),
            users: RwLock::new(HashMap::new()),
        }
    }

    pub async fn get(&self, user_id: UserId) -> Option<UserRecord> {
        self.users.read().await.get(&user_id).cloned()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn record_user(&self, user_id: UserId, username: Option<&str>) -> Result<()> {
        let mut users = self.users.write().await;
        let rec = users.entry(user_id).or_insert_with(|| UserRecord {
            username: None,
            first_seen: Utc::now(),
        });
        if let Some(name) = username {
            rec.username = Some(name.to_string());
        }
        Ok(())
    }

    async fn is_admin(&self, user_id: UserId) -> bool {
        user_id == self.admin_id
    }

    async fn user_count(&self) -> usize {
        self.users.read().await.len()
    }

    async fn user_ids(&self) -> Vec<UserId> {
        let mut ids: Vec<UserId> = self.users.read().await.keys().copied().collect();
        ids.sort_by_key(|u| u.0);
        ids
    }
}

/// Sends to every known user one at a time (private chats share the user id).
pub struct DirectBroadcaster {
    users: Arc<dyn UserStore>,
    messenger: Arc<dyn MessagingPort>,
}

impl DirectBroadcaster {
    pub fn new(users: Arc<dyn UserStore>, messenger: Arc<dyn MessagingPort>) -> Self {
        Self { users, messenger }
    }
}

#[async_trait]
impl Broadcaster for DirectBroadcaster {
    async fn broadcast(&self, text: &str) -> Result<BroadcastReport> {
        let mut report = BroadcastReport::default();
        for user in self.users.user_ids().await {
            match self.messenger.send_message(ChatId(user.0), text, None).await {
                Ok(_) => report.delivered += 1,
                Err(e) => {
                    tracing::warn!(user_id = user.0, error = %e, "broadcast delivery failed");
                    report.failed += 1;
                }
            }
        }
        Ok(report)
    }
}
