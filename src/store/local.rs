//! Note store kept on this machine, optionally backed by a YAML file.
//!
//! It plays the server's part of the contract: it assigns ids, bumps
//! `updated_at`, scopes everything by owner, and hands out pin slots through
//! the pin engine.

use super::{NoteStore, StoreError};
use crate::model::{Note, NoteDraft, NoteId, NotePatch, Owner, PinState};
use crate::pin::{self, PinError};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

pub const PROJECT_DIR: &str = ".stickyboard";
pub const NOTES_FILE: &str = "notes.yml";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreScope {
    Project,
    Global,
}

#[derive(Debug, Clone)]
pub struct StoreLocation {
    pub path: PathBuf,
    pub scope: StoreScope,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LocalBoard {
    next_id: NoteId,
    notes: Vec<Note>,
}

impl Default for LocalBoard {
    fn default() -> Self {
        LocalBoard {
            next_id: 1,
            notes: Vec::new(),
        }
    }
}

pub struct LocalNoteStore {
    board: Mutex<LocalBoard>,
    location: Option<StoreLocation>,
    offline: Mutex<bool>,
    failing_writes: Mutex<bool>,
}

impl LocalNoteStore {
    pub fn in_memory() -> Self {
        LocalNoteStore {
            board: Mutex::new(LocalBoard::default()),
            location: None,
            offline: Mutex::new(false),
            failing_writes: Mutex::new(false),
        }
    }

    /// Open the file at `location`, creating an empty one if needed.
    pub fn open(location: StoreLocation) -> Result<Self> {
        let board = if location.path.exists() {
            let data = fs::read_to_string(&location.path)
                .with_context(|| format!("reading {:?}", location.path))?;
            serde_yaml::from_str(&data).context("parsing notes file")?
        } else {
            let board = LocalBoard::default();
            write_board(&location.path, &board)?;
            board
        };
        Ok(LocalNoteStore {
            board: Mutex::new(board),
            location: Some(location),
            offline: Mutex::new(false),
            failing_writes: Mutex::new(false),
        })
    }

    pub fn location(&self) -> Option<&StoreLocation> {
        self.location.as_ref()
    }

    /// While offline every call fails as if the network were down.
    pub fn set_offline(&self, offline: bool) {
        if let Ok(mut flag) = self.offline.lock() {
            *flag = offline;
        }
    }

    /// While set, create/update/delete/pin fail but listing still works.
    pub fn fail_writes(&self, fail: bool) {
        if let Ok(mut flag) = self.failing_writes.lock() {
            *flag = fail;
        }
    }

    /// Notes of every owner, in storage order.
    pub fn snapshot(&self) -> Vec<Note> {
        self.board
            .lock()
            .map(|b| b.notes.clone())
            .unwrap_or_default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, LocalBoard>, StoreError> {
        if self.offline.lock().map(|f| *f).unwrap_or(false) {
            return Err(StoreError::Local("store is offline".into()));
        }
        self.board
            .lock()
            .map_err(|_| StoreError::Local("store lock poisoned".into()))
    }

    fn lock_for_write(&self) -> Result<MutexGuard<'_, LocalBoard>, StoreError> {
        if self.failing_writes.lock().map(|f| *f).unwrap_or(false) {
            return Err(StoreError::Server {
                status: 503,
                detail: "write rejected".into(),
            });
        }
        self.lock()
    }

    fn persist(&self, board: &LocalBoard) -> Result<(), StoreError> {
        match &self.location {
            Some(location) => write_board(&location.path, board)
                .map_err(|err| StoreError::Local(format!("{err:#}"))),
            None => Ok(()),
        }
    }
}

fn owned_by(note: &Note, owner: &Owner) -> bool {
    note.owner.as_ref() == Some(owner)
}

#[async_trait]
impl NoteStore for LocalNoteStore {
    async fn list(&self, owner: &Owner) -> Result<Vec<Note>, StoreError> {
        let board = self.lock()?;
        let mut notes: Vec<Note> = board
            .notes
            .iter()
            .filter(|n| owned_by(n, owner))
            .cloned()
            .collect();
        pin::sort_board(&mut notes);
        Ok(notes)
    }

    async fn create(
        &self,
        owner: &Owner,
        draft: &NoteDraft,
        now: DateTime<Utc>,
    ) -> Result<Note, StoreError> {
        let mut board = self.lock_for_write()?;
        let note = Note {
            id: board.next_id,
            title: draft.title.clone(),
            description: draft.description.clone(),
            points: draft.points.clone(),
            created_at: Some(now),
            updated_at: Some(now),
            reminder_at: draft.reminder_at,
            owner: Some(owner.clone()),
            pin: None,
        };
        board.next_id += 1;
        board.notes.push(note.clone());
        self.persist(&board)?;
        Ok(note)
    }

    async fn update(
        &self,
        id: NoteId,
        owner: &Owner,
        patch: &NotePatch,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut board = self.lock_for_write()?;
        let note = board
            .notes
            .iter_mut()
            .find(|n| n.id == id && owned_by(n, owner))
            .ok_or(StoreError::NotFound(id))?;
        patch.apply(note, now);
        self.persist(&board)
    }

    async fn delete(&self, id: NoteId, owner: &Owner) -> Result<(), StoreError> {
        let mut board = self.lock_for_write()?;
        board.notes.retain(|n| !(n.id == id && owned_by(n, owner)));
        self.persist(&board)
    }

    async fn toggle_pin(
        &self,
        id: NoteId,
        owner: &Owner,
        now: DateTime<Utc>,
    ) -> Result<PinState, StoreError> {
        let mut board = self.lock_for_write()?;
        let (mut mine, others): (Vec<Note>, Vec<Note>) = std::mem::take(&mut board.notes)
            .into_iter()
            .partition(|n| owned_by(n, owner));
        let result = pin::toggle_pin(&mut mine, id);
        if result.is_ok() {
            if let Some(note) = mine.iter_mut().find(|n| n.id == id) {
                note.touch(now);
            }
        }
        board.notes = others;
        board.notes.extend(mine);
        board.notes.sort_by_key(|n| n.id);
        let state = result.map_err(|err| match err {
            PinError::LimitExceeded => StoreError::PinLimitExceeded(err.to_string()),
            PinError::NotFound(id) => StoreError::NotFound(id),
        })?;
        self.persist(&board)?;
        Ok(state)
    }
}

pub fn init_project_store() -> Result<StoreLocation> {
    let cwd = env::current_dir()?;
    let dir = cwd.join(PROJECT_DIR);
    fs::create_dir_all(&dir).with_context(|| format!("failed to create {PROJECT_DIR} directory"))?;
    let path = dir.join(NOTES_FILE);
    if !path.exists() {
        write_board(&path, &LocalBoard::default())?;
    }
    Ok(StoreLocation {
        path,
        scope: StoreScope::Project,
    })
}

/// Nearest project notes file above `start`, else the global one.
pub fn locate_store(start: &Path, global_dir: Option<&Path>) -> Result<StoreLocation> {
    if let Some(project_path) = find_project_store(start) {
        return Ok(StoreLocation {
            path: project_path,
            scope: StoreScope::Project,
        });
    }
    let path = match global_dir {
        Some(dir) => dir.join(NOTES_FILE),
        None => global_store_path()?,
    };
    Ok(StoreLocation {
        path,
        scope: StoreScope::Global,
    })
}

fn write_board(path: &Path, board: &LocalBoard) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("creating {:?}", parent))?;
    }
    let serialized = serde_yaml::to_string(board).context("serializing notes")?;
    fs::write(path, serialized).with_context(|| format!("writing {:?}", path))?;
    Ok(())
}

fn find_project_store(start: &Path) -> Option<PathBuf> {
    let mut dir = Some(start);
    while let Some(current) = dir {
        let candidate = current.join(PROJECT_DIR).join(NOTES_FILE);
        if candidate.exists() {
            return Some(candidate);
        }
        dir = current.parent();
    }
    None
}

fn global_store_path() -> Result<PathBuf> {
    let dirs = ProjectDirs::from("", "", "stickyboard").context("locating data directory")?;
    Ok(dirs.data_dir().join(NOTES_FILE))
}
