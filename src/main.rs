use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use parking_lot::Mutex;
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::info;

use foxwatch::app::{export_page, App};
use foxwatch::duration::parse_duration;
use foxwatch::{
    events, logging, ui, FileSource, HttpSource, Page, PollOutcome, Settings, StatusPoller,
    StatusSource,
};

#[derive(Parser, Debug)]
#[command(name = "foxwatch")]
#[command(about = "Live status page for FoxESPTemp environmental sensors")]
struct Args {
    /// Device base URL (e.g. http://192.168.1.50)
    #[arg(short, long, conflicts_with = "file")]
    endpoint: Option<String>,

    /// TOML settings file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Poll period (e.g. "30s", "500ms")
    #[arg(short, long)]
    interval: Option<String>,

    /// Read the status document from a file instead of the device
    #[arg(long)]
    file: Option<PathBuf>,

    /// Poll once, print the page and exit
    #[arg(long, conflicts_with = "export")]
    once: bool,

    /// Poll once and write the page to a JSON file
    #[arg(long)]
    export: Option<PathBuf>,

    /// Write logs to this file (the TUI never logs to the terminal)
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Ignore responses that arrive after a newer one was applied
    #[arg(long)]
    discard_stale: bool,
}

fn main() -> Result<ExitCode> {
    let args = Args::parse();

    let interactive = !args.once && args.export.is_none();
    if interactive {
        if let Some(ref path) = args.log_file {
            logging::init_file(path)?;
        }
    } else {
        logging::init_stderr();
    }

    let settings = load_settings(&args)?;
    let source = build_source(&args, &settings)?;
    let view = Arc::new(Mutex::new(settings.page()));
    let poller = StatusPoller::with_options(
        source,
        view,
        settings.renderer(),
        settings.interval,
        settings.sequencing(),
    );

    let rt = tokio::runtime::Runtime::new()?;

    if args.once {
        let outcome = rt.block_on(poller.poll_once());
        print_page(&poller.view().lock());
        return Ok(exit_code(outcome));
    }

    if let Some(ref export_path) = args.export {
        let outcome = rt.block_on(poller.poll_once());
        export_page(
            &poller.view().lock(),
            poller.source_description(),
            export_path,
        )?;
        println!("Exported status page to: {}", export_path.display());
        return Ok(exit_code(outcome));
    }

    let _guard = rt.enter();
    if settings.poll_on_start {
        let first = poller.clone();
        rt.spawn(async move {
            first.poll_once().await;
        });
    }
    let timer = poller.start();
    info!(
        event = "app.started",
        source = poller.source_description(),
        "status page running"
    );

    let app = App::new(poller, Some(timer), rt.handle().clone());
    run_tui(app)?;
    Ok(ExitCode::SUCCESS)
}

/// Defaults, then the settings file and environment, then flags.
fn load_settings(args: &Args) -> Result<Settings> {
    let mut settings = Settings::load(args.config.as_deref())?;

    if let Some(ref endpoint) = args.endpoint {
        settings.endpoint = Some(endpoint.clone());
    }
    if let Some(ref interval) = args.interval {
        settings.interval = parse_duration(interval)
            .with_context(|| format!("invalid --interval {:?}", interval))?;
    }
    if args.discard_stale {
        settings.discard_stale = true;
    }

    settings.validate()?;
    Ok(settings)
}

fn build_source(args: &Args, settings: &Settings) -> Result<Box<dyn StatusSource>> {
    if let Some(ref path) = args.file {
        return Ok(Box::new(FileSource::new(path)));
    }

    let Some(ref endpoint) = settings.endpoint else {
        bail!("no device endpoint: pass --endpoint, set FOXWATCH_ENDPOINT, or use --file");
    };

    let source = HttpSource::builder()
        .endpoint(endpoint.clone())
        .path(settings.path.clone())
        .timeout(settings.timeout)
        .build()?;
    Ok(Box::new(source))
}

fn print_page(page: &Page) {
    let width = page
        .elements()
        .iter()
        .map(|e| e.label().chars().count())
        .max()
        .unwrap_or(0);
    for element in page.elements() {
        println!("{:<width$}  {}", element.label(), element.text(), width = width);
    }
}

fn exit_code(outcome: PollOutcome) -> ExitCode {
    match outcome {
        PollOutcome::Failed => ExitCode::FAILURE,
        _ => ExitCode::SUCCESS,
    }
}

/// Run the TUI until the user quits
fn run_tui(mut app: App) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Setup panic hook to restore terminal
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen, DisableMouseCapture);
        original_hook(panic);
    }));

    let result = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

fn run_app(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>, app: &mut App) -> Result<()> {
    while app.running {
        terminal.draw(|frame| ui::draw(frame, app))?;

        // The poller renders in the background; redraw at least every 250ms
        if let Some(event) = events::poll_event(Duration::from_millis(250))? {
            match event {
                Event::Key(key) => events::handle_key_event(app, key),
                // Header bar (1) + table border (1) puts the table header on row 2
                Event::Mouse(mouse) => events::handle_mouse_event(app, mouse, 2),
                _ => {}
            }
        }
    }

    Ok(())
}

