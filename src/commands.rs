use crate::cli::GlobalArgs;
use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use std::env;
use std::sync::Arc;
use std::time::Duration;
use stickyboard::board::{Board, BoardContext, ARCHIVE_DELAY};
use stickyboard::clock::SystemClock;
use stickyboard::completion::ToggleOutcome;
use stickyboard::config::{AppConfig, Overrides};
use stickyboard::model::{Note, NoteDraft, NoteId, NotePatch};
use stickyboard::notify::{DesktopNotifier, NoticeKind};
use stickyboard::point::{self, Point};
use stickyboard::records::FileRecordStore;
use stickyboard::session::BoardSession;
use stickyboard::stats::DailyStats;
use stickyboard::store::local::{init_project_store, locate_store, StoreScope};
use stickyboard::store::{HttpNoteStore, LocalNoteStore, NoteStore};
use stickyboard::timer::{format_elapsed, FocusTimer};
use tokio::io::{AsyncBufReadExt, BufReader};

const REMIND_FORMAT: &str = "%Y.%m.%d@%H:%M";

pub fn init() -> Result<()> {
    let location = init_project_store()?;
    println!("Initialized notes file at {}", location.path.display());
    Ok(())
}

pub async fn list(global: &GlobalArgs, page: Option<usize>) -> Result<()> {
    let board = open_loaded_board(global).await?;
    print_board(&board, page);
    Ok(())
}

pub async fn add(
    global: &GlobalArgs,
    title: String,
    points: Vec<String>,
    description: Option<String>,
    remind: Option<String>,
) -> Result<()> {
    let mut board = open_loaded_board(global).await?;
    let mut draft = NoteDraft::new(title).with_lines(points);
    draft.description = description;
    if let Some(at) = parse_remind(remind.as_deref())? {
        draft = draft.with_reminder(at);
    }
    let result = board.create_note(draft).await;
    flush_notices(&mut board);
    let id = result.context("creating note")?;
    println!("Added note {}", id);
    Ok(())
}

pub async fn edit(
    global: &GlobalArgs,
    note_id: NoteId,
    title: Option<String>,
    description: Option<String>,
    points: Vec<String>,
) -> Result<()> {
    let mut board = open_loaded_board(global).await?;
    let patch = NotePatch {
        title,
        description,
        points: if points.is_empty() {
            None
        } else {
            Some(points.iter().map(|l| Point::parse(l)).collect())
        },
    };
    board.begin_edit(note_id)?;
    let result = board.save_edit(note_id, patch).await;
    flush_notices(&mut board);
    result.with_context(|| format!("updating note {}", note_id))?;
    println!("Updated note {}", note_id);
    Ok(())
}

pub async fn add_point(global: &GlobalArgs, note_id: NoteId, line: String) -> Result<()> {
    let mut board = open_loaded_board(global).await?;
    let result = board.add_point(note_id, &line).await;
    flush_notices(&mut board);
    result.with_context(|| format!("adding a line to note {}", note_id))?;
    println!("Added line to note {}", note_id);
    Ok(())
}

pub async fn toggle(global: &GlobalArgs, note_id: NoteId, index: usize) -> Result<()> {
    let mut board = open_loaded_board(global).await?;
    let result = board.toggle_point(note_id, index).await;
    flush_notices(&mut board);
    match result.with_context(|| format!("toggling point {} of note {}", index, note_id))? {
        ToggleOutcome::Inert => println!("Point {} is not a task", index),
        ToggleOutcome::Toggled => println!("Toggled point {} of note {}", index, note_id),
        ToggleOutcome::Completed => {
            println!("All tasks done in note {}", note_id);
            tokio::time::sleep(ARCHIVE_DELAY).await;
            let archived = board.archive_due(note_id).await;
            flush_notices(&mut board);
            if archived? {
                println!("Archived note {}", note_id);
            }
        }
    }
    Ok(())
}

pub async fn pin(global: &GlobalArgs, note_id: NoteId) -> Result<()> {
    let mut board = open_loaded_board(global).await?;
    let result = board.toggle_pin(note_id).await;
    flush_notices(&mut board);
    let state = result?;
    match state.slot {
        Some(slot) => println!("Pinned note {} in slot {}", note_id, slot.get()),
        None => println!("Unpinned note {}", note_id),
    }
    Ok(())
}

pub async fn delete(global: &GlobalArgs, note_id: NoteId) -> Result<()> {
    let mut board = open_loaded_board(global).await?;
    let result = board.delete_note(note_id).await;
    flush_notices(&mut board);
    result.with_context(|| format!("deleting note {}", note_id))?;
    Ok(())
}

pub fn stats(global: &GlobalArgs) -> Result<()> {
    let mut board = open_board(global)?;
    print_stats(&board.stats(), None);
    Ok(())
}

pub async fn watch(global: &GlobalArgs) -> Result<()> {
    let board = open_loaded_board(global).await?;
    print_board(&board, Some(1));
    let session = BoardSession::spawn(board);
    println!(
        "Commands: start, pause, resume, stop, stats, list [page], toggle <id> <index>, pin <id>, quit"
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut refresh = tokio::time::interval(Duration::from_secs(1));
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match run_watch_command(&session, line.trim()).await {
                    Ok(true) => break,
                    Ok(false) => {}
                    Err(err) => eprintln!("error: {:#}", err),
                }
            }
            _ = refresh.tick() => flush_notices(&mut *session.lock().await),
            _ = tokio::signal::ctrl_c() => break,
        }
    }
    session.shutdown().await;
    Ok(())
}

/// Runs one interactive command. Returns `true` when the user asked to quit.
async fn run_watch_command(session: &BoardSession, line: &str) -> Result<bool> {
    let mut words = line.split_whitespace();
    let mut board = session.lock().await;
    match words.next() {
        None => {}
        Some("quit") | Some("exit") => return Ok(true),
        Some("start") => board.start_timer()?,
        Some("pause") => board.pause_timer()?,
        Some("resume") => board.resume_timer()?,
        Some("stop") => board.stop_timer()?,
        Some("stats") => {
            let stats = board.stats();
            print_stats(&stats, Some(board.timer()));
        }
        Some("list") => {
            let page = words.next().map(str::parse).transpose()?;
            print_board(&board, page.or(Some(1)));
        }
        Some("toggle") => {
            let id = next_number(&mut words, "note id")?;
            let index = next_number(&mut words, "point index")?;
            let outcome = board.toggle_point(id, index).await?;
            if outcome == ToggleOutcome::Completed {
                println!("All tasks done, note {} will be archived", id);
            }
        }
        Some("pin") => {
            let id = next_number(&mut words, "note id")?;
            board.toggle_pin(id).await?;
        }
        Some(other) => bail!("unknown command: {}", other),
    }
    if matches!(line, "start" | "pause" | "resume" | "stop") {
        let timer = board.timer();
        println!("timer {} {}", timer.state(), format_elapsed(timer.elapsed_seconds()));
    }
    Ok(false)
}

fn next_number<'a, T: std::str::FromStr>(
    words: &mut impl Iterator<Item = &'a str>,
    what: &str,
) -> Result<T> {
    words
        .next()
        .ok_or_else(|| anyhow!("missing {}", what))?
        .parse()
        .map_err(|_| anyhow!("invalid {}", what))
}

fn open_board(global: &GlobalArgs) -> Result<Board> {
    let config = AppConfig::resolve(Overrides {
        api_url: global.api_url.clone(),
        owner: global.owner.clone(),
        data_dir: global.data_dir.clone(),
        config_path: global.config.clone(),
        local: global.local,
    })?;
    let store: Arc<dyn NoteStore> = if config.local {
        let cwd = env::current_dir()?;
        let location = locate_store(&cwd, Some(&config.data_dir))?;
        tracing::debug!(path = ?location.path, project = location.scope == StoreScope::Project, "using local notes file");
        Arc::new(LocalNoteStore::open(location)?)
    } else {
        tracing::debug!(api_url = %config.api_url, "using note service");
        Arc::new(HttpNoteStore::new(&config.api_url)?)
    };
    let ctx = BoardContext {
        store,
        records: Arc::new(FileRecordStore::new(config.data_dir)),
        notifier: Arc::new(DesktopNotifier::default()),
        clock: Arc::new(SystemClock),
    };
    Ok(Board::new(ctx, config.owner))
}

async fn open_loaded_board(global: &GlobalArgs) -> Result<Board> {
    let mut board = open_board(global)?;
    if board.owner().is_none() {
        bail!("no user signed in: pass --owner or set STICKYBOARD_OWNER");
    }
    board.load().await.context("loading notes")?;
    Ok(board)
}

fn flush_notices(board: &mut Board) {
    for notice in board.drain_notices() {
        match notice.kind {
            NoticeKind::Error => eprintln!("! {}", notice.message),
            NoticeKind::Success | NoticeKind::Info => println!("* {}", notice.message),
        }
    }
}

fn parse_remind(input: Option<&str>) -> Result<Option<DateTime<Utc>>> {
    let raw = match input {
        Some(r) => r.trim(),
        None => return Ok(None),
    };
    if raw.is_empty() {
        return Ok(None);
    }
    let dt = NaiveDateTime::parse_from_str(raw, REMIND_FORMAT)
        .map_err(|_| anyhow!("invalid date format (use YYYY.MM.DD@hh:mm): {}", raw))?;
    let local = Local
        .from_local_datetime(&dt)
        .single()
        .ok_or_else(|| anyhow!("{} is not a single local time", raw))?;
    Ok(Some(local.with_timezone(&Utc)))
}

fn format_remind(dt: &DateTime<Utc>) -> String {
    dt.with_timezone(&Local).format(REMIND_FORMAT).to_string()
}

fn print_board(board: &Board, page: Option<usize>) {
    let owner = board.owner().map(|o| o.as_str()).unwrap_or("-");
    println!("Board of {} ({} notes)", owner, board.notes().len());
    let notes = match page {
        Some(n) => {
            println!("Page {} of {}", n, board.page_count().max(1));
            board.page(n)
        }
        None => board.notes(),
    };
    if notes.is_empty() {
        println!("  (empty)");
    }
    for note in notes {
        print_note(note);
    }
}

fn print_note(note: &Note) {
    let pin = note
        .pin
        .map(|slot| format!(" [pinned {}]", slot.get()))
        .unwrap_or_default();
    let edited = if note.is_edited() { " (edited)" } else { "" };
    println!("  - {}: {}{}{}", note.id, note.title, pin, edited);
    if let Some(description) = &note.description {
        println!("    {}", description);
    }
    for (index, point) in point::display_order(&note.points) {
        match point {
            Point::Heading(text) => println!("    {:>2}  # {}", index, text),
            Point::Task(text) => println!("    {:>2}  [ ] {}", index, text),
            Point::CompletedTask(text) => println!("    {:>2}  [x] {}", index, text),
            Point::Image(_) => println!("    {:>2}  (image)", index),
        }
    }
    if let Some(at) = note.reminder_at {
        println!("    remind: {}", format_remind(&at));
    }
}

fn print_stats(stats: &DailyStats, timer: Option<&FocusTimer>) {
    println!("Today ({})", stats.date);
    println!("  focus time:      {}", format_elapsed(stats.total_focus_seconds));
    println!("  laps:            {}", stats.lap_count);
    println!("  resets:          {}", stats.reset_count);
    println!("  completed notes: {}", stats.completed_note_count);
    if let Some(timer) = timer {
        println!(
            "  timer:           {} {}",
            timer.state(),
            format_elapsed(timer.elapsed_seconds())
        );
    }
}
