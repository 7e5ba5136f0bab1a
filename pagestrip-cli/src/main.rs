mod host;

use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use crossterm::cursor;
use crossterm::event::{self, DisableMouseCapture, EnableMouseCapture};
use crossterm::terminal;
use directories::ProjectDirs;
use pagestrip_core::{
    ChapterInfo, ChapterProvider, ControlId, FileStorage, Host, InputSample, KeyPress, Point,
    RawInput, Reader, ReaderConfig, SessionStorage, Target,
};
use pagestrip_pages::{DirectoryChapterProvider, PageLoader};
use pagestrip_tty::{EventMapper, PointerPhase, TerminalPainter, UiEvent};
use tracing::{debug, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{prelude::*, EnvFilter};

use crate::host::{FrameLine, HostAction, TerminalHost, CELL_HEIGHT, CELL_WIDTH};

const FRAME: Duration = Duration::from_millis(16);

#[derive(Debug, Parser)]
#[command(
    name = "pagestrip",
    version,
    about = "Vertical page-strip reader for image chapters"
)]
struct Args {
    /// Name of the session whose scroll positions are restored
    #[arg(long = "session", default_value = "default")]
    session: String,

    /// Forget every saved position of the session before opening
    #[arg(long = "reset-session")]
    reset_session: bool,

    /// Reader config file (TOML)
    #[arg(long = "config")]
    config: Option<PathBuf>,

    /// Directory holding the chapter's page images
    chapter: PathBuf,
}

struct RawModeGuard;

impl RawModeGuard {
    fn new() -> anyhow::Result<Self> {
        terminal::enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let mut stdout = io::stdout();
        let _ = crossterm::execute!(stdout, DisableMouseCapture, cursor::Show);
        let _ = terminal::disable_raw_mode();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let project_dirs = ProjectDirs::from("net", "pagestrip", "pagestrip")
        .ok_or_else(|| anyhow!("unable to resolve platform data directories"))?;
    let _log_guard = init_logging(&project_dirs)?;

    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| project_dirs.config_dir().join("config.toml"));
    let config = ReaderConfig::load_or_default(&config_path)?;

    let session_path = project_dirs
        .cache_dir()
        .join("session")
        .join(format!("{}.json", args.session));
    let storage = FileStorage::open(session_path.clone())
        .with_context(|| format!("failed to open session store {:?}", session_path))?;
    if args.reset_session {
        storage.clear()?;
        info!(session = %args.session, "session reset");
    }
    let storage: Arc<dyn SessionStorage> = Arc::new(storage);

    let provider = DirectoryChapterProvider::new();
    let mut chapter = provider
        .open(&args.chapter)
        .await
        .with_context(|| format!("failed to open {:?}", args.chapter))?;

    let _raw = RawModeGuard::new()?;
    let mut painter = TerminalPainter::new(io::stdout());
    crossterm::execute!(painter.writer(), cursor::Hide, EnableMouseCapture)?;

    loop {
        match read_chapter(&mut painter, &chapter, Arc::clone(&storage), &config)? {
            LoopAction::Open(path) => {
                info!(?path, "switching chapter");
                chapter = provider
                    .open(&path)
                    .await
                    .with_context(|| format!("failed to open {:?}", path))?;
            }
            LoopAction::Quit => break,
        }
    }

    painter.clear_all()?;
    Ok(())
}

enum LoopAction {
    Open(PathBuf),
    Quit,
}

/// Press state tracked across a drag, so the strip follows the pointer and
/// controls only fire when released on the element they were pressed on.
struct PointerState {
    control: Option<ControlId>,
    last_row: u16,
}

fn read_chapter(
    painter: &mut TerminalPainter<io::Stdout>,
    chapter: &ChapterInfo,
    storage: Arc<dyn SessionStorage>,
    config: &ReaderConfig,
) -> Result<LoopAction> {
    let (columns, rows) = terminal::size()?;
    let loader = PageLoader::new();
    let mut host = TerminalHost::new(
        chapter.clone(),
        loader.clone(),
        columns,
        rows,
        config.near_top,
    );
    let mut reader = Reader::attach(&mut host, chapter, storage, config, Instant::now());
    let mut mapper = EventMapper::new();
    let mut pointer: Option<PointerState> = None;
    let mut last_frame: Vec<FrameLine> = Vec::new();
    painter.clear_all()?;

    loop {
        host.request_visible_pages();
        for load in loader.drain_loaded() {
            reader.handle_image_loaded(&host, load.index);
        }
        settle(&mut reader, &mut host);
        if let Some(entry) = host.last_page_intersection() {
            reader.handle_intersection(&mut host, entry);
        }
        for action in host.take_actions() {
            match action {
                HostAction::Open(path) => {
                    settle(&mut reader, &mut host);
                    return Ok(LoopAction::Open(path));
                }
                HostAction::Shortcut(shortcut) => reader.handle_shortcut(&mut host, shortcut),
            }
        }

        let frame = host.render();
        if frame != last_frame {
            draw(painter, &frame, host.columns())?;
            last_frame = frame;
        }

        if !event::poll(FRAME)? {
            continue;
        }
        let now = Instant::now();
        match mapper.map_event(event::read()?) {
            UiEvent::Pointer { phase, column, row } => {
                let (target, control) = host.hit_test(column, row);
                let sample = sample_at(column, row, target, now);
                match phase {
                    PointerPhase::Down => {
                        pointer = Some(PointerState {
                            control,
                            last_row: row,
                        });
                        reader.handle_input(&mut host, RawInput::PointerDown(sample));
                    }
                    PointerPhase::Move => {
                        if let Some(state) = pointer.as_mut() {
                            let delta = f32::from(state.last_row) - f32::from(row);
                            state.last_row = row;
                            host.scroll_by(delta * CELL_HEIGHT);
                        }
                        reader.handle_input(&mut host, RawInput::PointerMove(sample));
                    }
                    PointerPhase::Up => {
                        reader.handle_input(&mut host, RawInput::PointerUp(sample));
                        if let Some(state) = pointer.take() {
                            if let Some(pressed) = state.control.filter(|&id| control == Some(id)) {
                                host.activate(pressed);
                            }
                        }
                    }
                }
            }
            UiEvent::Key(press) => handle_key(&mut reader, &mut host, press),
            UiEvent::Scroll { rows } => host.scroll_by(rows as f32 * CELL_HEIGHT),
            UiEvent::Shortcut(shortcut) => reader.handle_shortcut(&mut host, shortcut),
            UiEvent::Resize { columns, rows } => {
                host.resize(columns, rows);
                reader.handle_resize(&mut host);
                last_frame.clear();
                painter.clear_all()?;
            }
            UiEvent::Quit => {
                settle(&mut reader, &mut host);
                return Ok(LoopAction::Quit);
            }
            UiEvent::None => {}
        }
    }
}

/// Reports pending scrolls to the reader and runs this frame's work.
fn settle(reader: &mut Reader, host: &mut TerminalHost) {
    if host.take_scrolled() {
        reader.handle_scroll(host);
    }
    reader.run_frame(host, Instant::now());
}

/// Routes a key through the reader. Nothing else in the terminal reacts to
/// keys, so a claimed-but-unresolved Space or PageDown simply does nothing.
fn handle_key(reader: &mut Reader, host: &mut TerminalHost, press: KeyPress) {
    let outcome = reader.handle_key(host, &press);
    if let Some(intent) = outcome.intent {
        debug!(?intent, "key handled");
    }
}

fn sample_at(column: u16, row: u16, target: Target, at: Instant) -> InputSample {
    let point = Point::new(f32::from(column) * CELL_WIDTH, f32::from(row) * CELL_HEIGHT);
    InputSample::new(point, target, at)
}

fn draw(
    painter: &mut TerminalPainter<io::Stdout>,
    frame: &[FrameLine],
    columns: u16,
) -> Result<()> {
    painter.begin_sync_update()?;
    for (row, line) in frame.iter().enumerate() {
        painter.draw_line(row as u16, usize::from(columns), &line.text, line.style)?;
    }
    painter.end_sync_update()
}

fn init_logging(project_dirs: &ProjectDirs) -> Result<WorkerGuard> {
    let log_dir = project_dirs.data_local_dir().join("logs");
    fs::create_dir_all(&log_dir)?;

    let file_appender = tracing_appender::rolling::never(log_dir, "pagestrip.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // The strip owns the terminal, so logs only go to the file.
    let file_layer = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_writer(file_writer);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .try_init()
        .map_err(|err| anyhow!(err))?;

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagestrip_core::{Key, MemoryStorage, PageInfo, ReadingContext};

    #[test]
    fn args_default_to_shared_session() {
        let args = Args::try_parse_from(["pagestrip", "library/demo/5"]).unwrap();
        assert_eq!(args.session, "default");
        assert!(!args.reset_session);
        assert!(args.config.is_none());
        assert_eq!(args.chapter, PathBuf::from("library/demo/5"));
    }

    #[test]
    fn args_accept_session_options() {
        let args = Args::try_parse_from([
            "pagestrip",
            "--session",
            "night",
            "--reset-session",
            "--config",
            "reader.toml",
            "ch",
        ])
        .unwrap();
        assert_eq!(args.session, "night");
        assert!(args.reset_session);
        assert_eq!(args.config, Some(PathBuf::from("reader.toml")));
    }

    #[test]
    fn samples_use_layout_pixels() {
        let sample = sample_at(3, 2, Target::page(), Instant::now());
        assert_eq!(sample.point, Point::new(24.0, 32.0));
        assert!(!sample.handled);
    }

    #[test]
    fn page_keys_past_the_last_page_leave_the_strip_alone() {
        let chapter = ChapterInfo {
            context: ReadingContext::new("demo", "5"),
            pages: (0..2)
                .map(|index| PageInfo {
                    index,
                    src: format!("/library/demo/5/{:03}.png", index + 1),
                })
                .collect(),
            prev: None,
            next: None,
        };
        let mut host = TerminalHost::new(chapter.clone(), PageLoader::new(), 40, 20, 64.0);
        let mut reader = Reader::attach(
            &mut host,
            &chapter,
            Arc::new(MemoryStorage::new()),
            &ReaderConfig::default(),
            Instant::now(),
        );
        host.scroll_by(5000.0);
        let bottom = host.scroll_y();
        assert!(bottom > 0.0);

        for key in [Key::Space, Key::PageDown] {
            let outcome = reader.handle_key(&mut host, &KeyPress::new(key));
            assert!(outcome.prevent_default);
            assert!(outcome.intent.is_none());

            handle_key(&mut reader, &mut host, KeyPress::new(key));
            assert_eq!(host.scroll_y(), bottom);
        }
        assert!(host.take_actions().is_empty());
    }
}
