//! Repository client: the remote note store seen through one trait.
//!
//! Implementations never retry and never compute pin slots on the caller's
//! behalf; slot assignment belongs to the store.

pub mod http;
pub mod local;

use crate::model::{Note, NoteDraft, NoteId, NotePatch, Owner, PinState};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub use http::HttpNoteStore;
pub use local::LocalNoteStore;

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("no signed-in owner")]
    Unauthenticated,
    #[error("{0}")]
    PinLimitExceeded(String),
    #[error("note not found: {0}")]
    NotFound(NoteId),
    #[error("server returned {status}: {detail}")]
    Server { status: u16, detail: String },
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("unexpected response body: {0}")]
    Decode(String),
    #[error("local store: {0}")]
    Local(String),
}

impl StoreError {
    /// Failures worth reconciling by re-fetching the list.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            StoreError::Network(_) | StoreError::Server { .. } | StoreError::Decode(_) | StoreError::Local(_)
        )
    }

    /// Failures after which the local list may no longer match the store.
    /// Only a refused pin and a missing owner leave both sides unchanged.
    pub fn needs_reconcile(&self) -> bool {
        !matches!(
            self,
            StoreError::Unauthenticated | StoreError::PinLimitExceeded(_)
        )
    }
}

#[async_trait]
pub trait NoteStore: Send + Sync {
    /// Notes in board order: pinned by slot, then newest id first.
    async fn list(&self, owner: &Owner) -> Result<Vec<Note>, StoreError>;

    async fn create(
        &self,
        owner: &Owner,
        draft: &NoteDraft,
        now: DateTime<Utc>,
    ) -> Result<Note, StoreError>;

    async fn update(
        &self,
        id: NoteId,
        owner: &Owner,
        patch: &NotePatch,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    async fn delete(&self, id: NoteId, owner: &Owner) -> Result<(), StoreError>;

    /// Flip the pin of `id`; the store assigns the slot and bumps
    /// `updated_at` to `now`.
    async fn toggle_pin(
        &self,
        id: NoteId,
        owner: &Owner,
        now: DateTime<Utc>,
    ) -> Result<PinState, StoreError>;
}
