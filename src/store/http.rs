//! Typed HTTP client for the remote note service.

use super::{NoteStore, StoreError};
use crate::model::{Note, NoteDraft, NoteId, NotePatch, Owner, PinState};
use crate::point::Point;
use async_trait::async_trait;
use chrono::serde::ts_seconds_option;
use chrono::{DateTime, Utc};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const OWNER_HEADER: &str = "X-User-Email";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

pub struct HttpNoteStore {
    base_url: String,
    client: reqwest::Client,
}

// ── wire bodies ─────────────────────────────────────

#[derive(Debug, Serialize)]
struct CreateNoteBody<'a> {
    title: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
    points: &'a [Point],
    owner_email: &'a str,
    #[serde(with = "chrono::serde::ts_seconds")]
    created_at: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_seconds")]
    updated_at: DateTime<Utc>,
    #[serde(
        rename = "reminder_time",
        with = "ts_seconds_option",
        skip_serializing_if = "Option::is_none"
    )]
    reminder_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
struct UpdateNoteBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    points: Option<&'a [Point]>,
    #[serde(with = "chrono::serde::ts_seconds")]
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: String,
}

// ── client impl ─────────────────────────────────────

impl HttpNoteStore {
    pub fn new(base_url: &str) -> Result<Self, StoreError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn notes_url(&self) -> String {
        format!("{}/notes/", self.base_url)
    }

    fn note_url(&self, id: NoteId) -> String {
        format!("{}/notes/{}", self.base_url, id)
    }

    async fn send(
        &self,
        request: RequestBuilder,
        owner: &Owner,
        id: Option<NoteId>,
    ) -> Result<Response, StoreError> {
        let resp = request.header(OWNER_HEADER, owner.as_str()).send().await?;
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        let detail = serde_json::from_str::<ErrorBody>(&body)
            .map(|e| e.detail)
            .unwrap_or(body);
        Err(match (status, id) {
            (StatusCode::NOT_FOUND, Some(id)) => StoreError::NotFound(id),
            _ => StoreError::Server {
                status: status.as_u16(),
                detail,
            },
        })
    }
}

#[async_trait]
impl NoteStore for HttpNoteStore {
    async fn list(&self, owner: &Owner) -> Result<Vec<Note>, StoreError> {
        tracing::debug!(owner = %owner, "GET notes");
        let resp = self
            .send(self.client.get(self.notes_url()), owner, None)
            .await?;
        resp.json::<Vec<Note>>()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))
    }

    async fn create(
        &self,
        owner: &Owner,
        draft: &NoteDraft,
        now: DateTime<Utc>,
    ) -> Result<Note, StoreError> {
        let body = CreateNoteBody {
            title: &draft.title,
            description: draft.description.as_deref(),
            points: &draft.points,
            owner_email: owner.as_str(),
            created_at: now,
            updated_at: now,
            reminder_at: draft.reminder_at,
        };
        tracing::debug!(owner = %owner, title = %draft.title, "POST note");
        let resp = self
            .send(self.client.post(self.notes_url()).json(&body), owner, None)
            .await?;
        resp.json::<Note>()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))
    }

    async fn update(
        &self,
        id: NoteId,
        owner: &Owner,
        patch: &NotePatch,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let body = UpdateNoteBody {
            title: patch.title.as_deref(),
            description: patch.description.as_deref(),
            points: patch.points.as_deref(),
            updated_at: now,
        };
        tracing::debug!(note_id = id, "PUT note");
        self.send(self.client.put(self.note_url(id)).json(&body), owner, Some(id))
            .await?;
        Ok(())
    }

    async fn delete(&self, id: NoteId, owner: &Owner) -> Result<(), StoreError> {
        tracing::debug!(note_id = id, "DELETE note");
        self.send(self.client.delete(self.note_url(id)), owner, Some(id))
            .await?;
        Ok(())
    }

    async fn toggle_pin(
        &self,
        id: NoteId,
        owner: &Owner,
        _now: DateTime<Utc>,
    ) -> Result<PinState, StoreError> {
        tracing::debug!(note_id = id, "PATCH note pin");
        let url = format!("{}/pin", self.note_url(id));
        let resp = match self.send(self.client.patch(url), owner, Some(id)).await {
            Ok(resp) => resp,
            Err(StoreError::Server { status, detail }) if (400..500).contains(&status) => {
                return Err(StoreError::PinLimitExceeded(detail));
            }
            Err(err) => return Err(err),
        };
        resp.json::<PinState>()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))
    }
}
