//! Entry point for the terminal reader.
//!
//! Responsibilities here are intentionally minimal:
//! - Parse command-line arguments.
//! - Load user configuration from `conf/config.toml`.
//! - Import the chapter library and open its preferences.
//! - Run the requested command against a reader session.

use anyhow::{Context, Result, anyhow};
use serial_reader::config::{AppConfig, load_config};
use serial_reader::library::load_library;
use serial_reader::pagination::ScrollOffset;
use serial_reader::prefs::{FilePreferences, PreferencesStore, library_cache_dir};
use serial_reader::session::{ChapterLayout, LoadedChapter, PageTurn, ReaderSession};
use serial_reader::store::{ChapterStore, MemoryChapterStore};
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*, reload};

type ReloadHandle = reload::Handle<EnvFilter, tracing_subscriber::Registry>;

const USAGE: &str = "Usage: serial-reader <chapters.json> [list | read [chapter-id] | reset]";
const PARAGRAPHS_PER_SCREEN: usize = 6;

enum Command {
    List,
    Read(Option<i64>),
    Reset,
}

#[tokio::main]
async fn main() {
    let reload_handle = init_tracing();
    if let Err(err) = run(&reload_handle).await {
        error!("{err:?}");
        std::process::exit(1);
    }
}

async fn run(reload_handle: &ReloadHandle) -> Result<()> {
    let (library_path, command) = parse_args()?;
    let config = load_config(Path::new("conf/config.toml"));
    set_log_level(reload_handle, config.log_level.as_filter_str());
    info!(
        path = %library_path.display(),
        level = %config.log_level,
        "Starting serial reader"
    );

    let library = load_library(&library_path)
        .await
        .with_context(|| format!("Failed to import {}", library_path.display()))?;
    if let Some(title) = &library.book_title {
        info!(%title, "Opened book");
    }
    let store = Arc::new(MemoryChapterStore::new());
    store.replace_all(library.chapters).await?;

    let prefs_dir = library_cache_dir(&config.cache_root(), &library_path);
    let prefs = Arc::new(
        FilePreferences::open(&prefs_dir)
            .await
            .context("Failed to open reader preferences")?,
    );
    info!(path = %prefs.path().display(), "Using preferences file");

    match command {
        Command::List => list_chapters(store.as_ref()).await,
        Command::Reset => {
            prefs.clear_reading_position().await?;
            println!("Reading position cleared.");
            Ok(())
        }
        Command::Read(chapter) => read(store, prefs, &config, chapter).await,
    }
}

async fn list_chapters(store: &MemoryChapterStore) -> Result<()> {
    for chapter in store.list_ordered().await? {
        let marker = if chapter.text().is_empty() { " (empty)" } else { "" };
        println!("{:>6}  {}{marker}", chapter.id, chapter.title);
    }
    Ok(())
}

async fn read(
    store: Arc<MemoryChapterStore>,
    prefs: Arc<FilePreferences>,
    config: &AppConfig,
    chapter: Option<i64>,
) -> Result<()> {
    let mut session = ReaderSession::open(store, prefs, config).await?;
    let opened = match chapter {
        Some(id) => Some(session.load_chapter(id).await?),
        None => session.resume().await?,
    };
    match opened {
        Some(loaded) => render(loaded),
        None => {
            println!("The library has no chapters.");
            return Ok(());
        }
    }
    println!(
        "[n]ext/[p]rev page, [N]ext/[P]rev chapter, g <page>, s <offset>, [m]ode, +/- font, [q]uit"
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let mut parts = line.split_whitespace();
        let command = parts.next().unwrap_or("n");
        let argument = parts.next();
        match command {
            "q" => break,
            "n" => report_turn(session.next_page().await?),
            "p" => report_turn(session.previous_page().await?),
            "N" => {
                if session.next_chapter().await?.is_none() {
                    println!("Already at the last chapter.");
                }
            }
            "P" => {
                if session.previous_chapter().await?.is_none() {
                    println!("Already at the first chapter.");
                }
            }
            "g" => match argument.and_then(|arg| arg.parse::<usize>().ok()) {
                Some(page) => {
                    if session.go_to_page(page.saturating_sub(1)).is_none() {
                        println!("Page jumps need paginated mode.");
                    }
                }
                None => println!("Usage: g <page>"),
            },
            "s" => match argument.and_then(|arg| arg.parse::<f32>().ok()) {
                Some(offset) => session.update_scroll(offset),
                None => println!("Usage: s <offset>"),
            },
            "m" => {
                let mode = session.preferences().reading_mode.toggled();
                session.set_reading_mode(mode).await?;
            }
            "+" | "-" => {
                let step = if command == "+" {
                    config.font_size_step
                } else {
                    -config.font_size_step
                };
                let size = session
                    .set_font_size(session.preferences().font_size + step)
                    .await?;
                println!("Font size {size}px");
            }
            other => {
                println!("Unknown command: {other}");
                continue;
            }
        }
        if let Some(loaded) = session.current() {
            render(loaded);
        }
    }

    session.close().await?;
    Ok(())
}

fn report_turn(turn: PageTurn) {
    if turn == PageTurn::Boundary {
        println!("No more pages in that direction.");
    }
}

fn render(loaded: &LoadedChapter) {
    println!();
    println!("== {} ==", loaded.chapter.title);
    match &loaded.layout {
        ChapterLayout::Paginated {
            pages,
            current_page,
        } => {
            if let Some(page) = pages.get(*current_page) {
                println!("{}", page.text);
                println!("-- page {}/{} --", page.index + 1, page.total_in_chapter);
            }
        }
        ChapterLayout::Continuous {
            paragraphs,
            scroll_offset,
        } => {
            let first = ScrollOffset::from_virtual(*scroll_offset).item_index;
            for paragraph in paragraphs.iter().skip(first).take(PARAGRAPHS_PER_SCREEN) {
                println!("{paragraph}\n");
            }
            println!(
                "-- paragraph {}/{} --",
                first.min(paragraphs.len().saturating_sub(1)) + 1,
                paragraphs.len().max(1)
            );
        }
    }
    let navigation = loaded.navigation;
    println!(
        "-- chapter {} of {} (id {}){}{} --",
        navigation.index + 1,
        navigation.total_chapters,
        loaded.chapter.id,
        if navigation.has_previous() { ", [P] previous" } else { "" },
        if navigation.has_next() { ", [N] next" } else { "" },
    );
}

fn parse_args() -> Result<(PathBuf, Command)> {
    let mut args = env::args().skip(1);
    let path = args.next().ok_or_else(|| anyhow!(USAGE))?;
    let path = PathBuf::from(path);
    if !path.exists() {
        return Err(anyhow!("File not found: {}", path.as_path().display()));
    }

    let command = match args.next().as_deref() {
        None | Some("read") => {
            let chapter = args
                .next()
                .map(|id| id.parse::<i64>().with_context(|| format!("Invalid chapter id: {id}")))
                .transpose()?;
            Command::Read(chapter)
        }
        Some("list") => Command::List,
        Some("reset") => Command::Reset,
        Some(other) => return Err(anyhow!("Unknown command '{other}'. {USAGE}")),
    };
    Ok((path, command))
}

fn init_tracing() -> ReloadHandle {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let (filter_layer, handle) = reload::Layer::new(env_filter);
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .with_filter(filter_layer),
        )
        .init();
    handle
}

fn set_log_level(handle: &ReloadHandle, level: &str) {
    if env::var_os("RUST_LOG").is_some() {
        return;
    }
    let parsed = EnvFilter::builder()
        .parse(level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    if let Err(err) = handle.modify(|filter| *filter = parsed.clone()) {
        warn!(%level, "Failed to update log level from config: {err}");
    } else {
        info!(%level, "Applied log level from config");
    }
}
