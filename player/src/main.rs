use std::{
    fs::OpenOptions,
    io::{self, Write},
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{Event, EventStream, KeyCode},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use futures::StreamExt;
use log::{debug, error, info};
use player_core::{
    PlayerConfig,
    sim::{SimFrameHost, SimHost, SimMediaHost},
};
use ratatui::{Terminal, backend::CrosstermBackend, style::Color};

mod app;
mod commands;
mod events;
mod library;
mod ui;

use app::App;
use events::event_utils;

/// Terminal console for the video playback facade
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// JSON file with the video library (defaults to a built-in demo library)
    #[arg(short, long)]
    library: Option<PathBuf>,

    /// JSON file overriding player settings
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Where log output goes; the terminal is busy with the UI
    #[arg(long, default_value = "video_console.log")]
    log_file: PathBuf,

    /// Library id or 1-based position of a video to open at start
    video: Option<String>,
}

fn init_logging(path: &Path) -> Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file {}", path.display()))?;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Pipe(Box::new(file)))
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {:<5} {}] {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();
    Ok(())
}

/// In-process backends standing in for the browser
fn console_host(config: &PlayerConfig) -> SimHost {
    SimHost::new()
        .with_media(SimMediaHost::new().with_duration(95.0))
        .with_frames(
            SimFrameHost::new()
                .with_origin(config.frame_origin.clone())
                .responsive()
                .announcing_ready_after(Duration::from_millis(1200))
                .with_time_updates(Duration::from_millis(500)),
        )
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_file)?;
    info!("Application starting");

    let config = match &args.config {
        Some(path) => PlayerConfig::from_json_file(path)?,
        None => PlayerConfig::default(),
    };
    let library = match &args.library {
        Some(path) => library::load_library(path)?,
        None => library::demo_library(),
    };

    // Set up clean terminal restoration on panic
    let orig_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        error!("PANIC: {}", panic_info);
        orig_hook(panic_info);
    }));

    enable_raw_mode().context("Failed to enable raw mode")?;
    let mut stdout = io::stdout();
    if let Err(e) = execute!(stdout, EnterAlternateScreen) {
        let _ = disable_raw_mode();
        return Err(e).context("Failed to set up terminal");
    }
    let mut terminal = match Terminal::new(CrosstermBackend::new(stdout)) {
        Ok(terminal) => terminal,
        Err(e) => {
            let _ = disable_raw_mode();
            return Err(e).context("Failed to create terminal");
        }
    };

    let host = console_host(&config);
    let mut app = App::new(host.player_host(), config, library);
    if let Some(video) = &args.video {
        if let Err(e) = app.open_video(video) {
            error!("Error opening video: {}", e);
            app.set_status(format!("Error: {}", e), Color::Red);
        }
    }

    let result = run(&mut terminal, &mut app).await;

    info!("Shutting down application");
    app.player.unload();

    let cleanup_result = (|| -> Result<()> {
        disable_raw_mode().context("Failed to disable raw mode")?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)
            .context("Failed to leave alternate screen")?;
        terminal.show_cursor().context("Failed to show cursor")?;
        Ok(())
    })();
    if let Err(e) = cleanup_result {
        error!("Error during cleanup: {}", e);
        eprintln!("Error during cleanup: {}", e);
    }

    result
}

/// Redraw on a fixed tick and react to terminal input as it arrives
async fn run(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> Result<()> {
    let mut events = EventStream::new();
    let mut redraw = tokio::time::interval(Duration::from_millis(100));

    while !app.should_quit {
        tokio::select! {
            _ = redraw.tick() => {
                terminal
                    .draw(|f| ui::draw_ui(f, app))
                    .context("Failed to draw UI")?;
            }
            event = events.next() => match event {
                Some(Ok(event)) if event_utils::is_terminate_event(&event) => {
                    info!("Quit key pressed, exiting application");
                    app.should_quit = true;
                }
                Some(Ok(Event::Key(key))) if event_utils::is_press(&key) => handle_key(app, key),
                Some(Ok(Event::Resize(w, h))) => {
                    debug!("Resize event: {}x{}", w, h);
                    redraw.reset_immediately();
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e).context("Failed to read terminal event"),
                None => break,
            },
        }
    }
    Ok(())
}

fn handle_key(app: &mut App, key: crossterm::event::KeyEvent) {
    if key.code == KeyCode::Char(':') && !app.is_command_mode() {
        app.enter_command_mode();
    } else if app.is_command_mode() && key.code == KeyCode::Enter {
        let cmd = app.get_command_buffer().to_string();
        debug!("Executing command: {}", cmd);
        app.exit_command_mode();
        if let Err(e) = commands::handle_command(app, &cmd) {
            debug!("Command error: {}", e);
            app.set_status(format!("Error: {}", e), Color::Red);
        }
    } else if let Err(e) = app.handle_key_event(key) {
        error!("Key handler error: {}", e);
        app.set_status(format!("Key error: {}", e), Color::Red);
    }
}
