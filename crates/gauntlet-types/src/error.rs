use thiserror::Error;
use uuid::Uuid;

use crate::session::{SessionEvent, SessionStatus};

#[derive(Debug, Error)]
pub enum GauntletError {
    #[error("state transition error: cannot transition from {from:?} via {event:?}")]
    InvalidStateTransition {
        from: SessionStatus,
        event: SessionEvent,
    },

    #[error("session not found: {0}")]
    SessionNotFound(Uuid),

    #[error("session {id} already {status:?}, run not re-executed")]
    SessionConflict { id: Uuid, status: SessionStatus },

    #[error("invalid webhook url: {0}")]
    InvalidWebhookUrl(String),

    #[error("cannot connect to webhook: {0}")]
    WebhookUnreachable(String),

    #[error("webhook reachable but returned status {0} to the connectivity probe")]
    WebhookRejected(u16),

    #[error("no verified webhook known for agent {0}")]
    NoKnownWebhook(Uuid),

    #[error("store error: {0}")]
    Store(String),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, GauntletError>;
