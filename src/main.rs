use anyhow::{Context, Result};
use clap::Parser;
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, MouseButton,
    MouseEvent, MouseEventKind,
};
use crossterm::execute;
use ratatui::layout::Rect;
use ratatui::DefaultTerminal;
use season_map::app::{App, HoverEvent, PanEvent, ZoomEvent};
use season_map::config::{Config, Palette};
use season_map::context::RenderContext;
use season_map::data::{self, Dataset};
use season_map::legend::format_percent;
use season_map::map::ZOOM_STEP;
use season_map::season::{Season, Target};
use season_map::ui;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Metric column to map (spring_rate, summer_rate, autumn_rate, winter_rate)
    #[arg(default_value = "spring_rate")]
    target: String,

    /// TOML configuration file
    #[arg(short, long, value_name = "FILE", env = "SEASON_MAP_CONFIG")]
    config: Option<PathBuf>,

    /// Boundary TopoJSON/GeoJSON, overriding the config
    #[arg(long, value_name = "URL|PATH")]
    topology: Option<String>,

    /// Seasonal metric CSV, overriding the config
    #[arg(long, value_name = "FILE")]
    metrics: Option<PathBuf>,

    /// Write logs to this file
    #[arg(long, value_name = "FILE")]
    log_file: Option<PathBuf>,

    /// Print the joined table and callouts instead of opening the map
    #[arg(long)]
    summary: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_file.as_deref(), cli.summary)?;

    let mut config = match &cli.config {
        Some(path) => Config::load_from_file(path).with_context(|| format!("loading config {path:?}"))?,
        None => Config::default(),
    };
    if let Some(topology) = cli.topology {
        config.data.topology = topology;
    }
    if let Some(metrics) = cli.metrics {
        config.data.metrics = metrics;
    }
    let palette = config.map.palette()?;

    let target = Target::parse(&cli.target);
    if target.season.is_none() {
        warn!(field = %target.field, "unrecognized target, rendering without annotations");
    }

    let loaded = data::load_dataset(&config.data, &config.map).context("failed to load map data");

    if cli.summary {
        print_summary(Arc::new(loaded?), target, &config, palette);
        return Ok(());
    }

    // Initialize terminal
    let mut terminal = ratatui::init();
    terminal.clear()?;
    execute!(std::io::stdout(), EnableMouseCapture)?;

    let result = match loaded {
        Ok(dataset) => {
            let size = terminal.size()?;
            let screen = Rect::new(0, 0, size.width, size.height);
            run(&mut terminal, App::new(config, palette, Arc::new(dataset), target, screen))
        }
        Err(e) => {
            error!(error = ?e, "data load failed");
            show_load_error(&mut terminal, &e).and(Err(e))
        }
    };

    // Disable mouse capture and restore terminal
    let _ = execute!(std::io::stdout(), DisableMouseCapture);
    ratatui::restore();

    result
}

fn init_tracing(log_file: Option<&Path>, summary: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());

    match log_file {
        Some(path) => {
            let file = File::create(path).with_context(|| format!("creating log file {path:?}"))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        // The TUI owns the screen; only log to stderr when printing text
        None if summary => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
        None => {}
    }
    Ok(())
}

fn print_summary(dataset: Arc<Dataset>, target: Target, config: &Config, palette: Palette) {
    let cx = RenderContext::build(dataset, target, config, palette);

    println!("Target: {}", cx.target.title());
    match cx.joined.range() {
        Some(range) => println!("Range:  {} .. {}", format_percent(range.min), format_percent(range.max)),
        None => println!("Range:  none (no parsable values)"),
    }
    println!();
    println!("{:<28} {:<5} {:>10} {}", "State", "Abbr", "Rate", "Fill");
    for state in &cx.states {
        let rate = state.value.map_or_else(|| "-".to_string(), |v| format!("{:.4}%", v * 100.0));
        println!(
            "{:<28} {:<5} {:>10} {}",
            state.name,
            state.abbreviation.as_deref().unwrap_or("-"),
            rate,
            state.fill.hex()
        );
    }

    if !cx.callouts.is_empty() {
        println!();
        println!("Callouts:");
        for c in &cx.callouts {
            println!(
                "  {:?} at ({:.1}, {:.1}) -> note ({:.1}, {:.1})",
                c.label, c.subject.0, c.subject.1, c.note.0, c.note.1
            );
        }
    }
}

/// Keep the failure on screen until the user quits
fn show_load_error(terminal: &mut DefaultTerminal, error: &anyhow::Error) -> Result<()> {
    loop {
        terminal.draw(|frame| ui::render_load_error(frame, error))?;
        if let Event::Key(key) = event::read()? {
            if key.kind == KeyEventKind::Press && matches!(key.code, KeyCode::Char('q') | KeyCode::Esc) {
                return Ok(());
            }
        }
    }
}

/// Handle mouse events for panning, zooming and hover
fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    // Always track pointer position for the tooltip
    app.on_hover(HoverEvent {
        col: mouse.column,
        row: mouse.row,
    });

    match mouse.kind {
        // Scroll wheel zooms around the pointer
        MouseEventKind::ScrollUp => app.on_zoom(ZoomEvent {
            factor: ZOOM_STEP,
            anchor: Some((mouse.column, mouse.row)),
        }),
        MouseEventKind::ScrollDown => app.on_zoom(ZoomEvent {
            factor: 1.0 / ZOOM_STEP,
            anchor: Some((mouse.column, mouse.row)),
        }),
        // Horizontal scroll for panning (trackpad two-finger swipe)
        MouseEventKind::ScrollLeft => app.on_pan(PanEvent { dx: -15, dy: 0 }),
        MouseEventKind::ScrollRight => app.on_pan(PanEvent { dx: 15, dy: 0 }),
        // Click and drag to pan
        MouseEventKind::Down(MouseButton::Left) => {
            app.last_mouse = Some((mouse.column, mouse.row));
        }
        MouseEventKind::Drag(MouseButton::Left) => {
            app.handle_drag(mouse.column, mouse.row);
        }
        MouseEventKind::Up(MouseButton::Left) => {
            app.end_drag();
        }
        _ => {}
    }
}

fn handle_key(app: &mut App, code: KeyCode) {
    match code {
        KeyCode::Char('q') | KeyCode::Esc => app.quit(),

        // Pan with hjkl or arrow keys
        KeyCode::Left | KeyCode::Char('h') => app.on_pan(PanEvent { dx: -10, dy: 0 }),
        KeyCode::Right | KeyCode::Char('l') => app.on_pan(PanEvent { dx: 10, dy: 0 }),
        KeyCode::Up | KeyCode::Char('k') => app.on_pan(PanEvent { dx: 0, dy: -6 }),
        KeyCode::Down | KeyCode::Char('j') => app.on_pan(PanEvent { dx: 0, dy: 6 }),

        // Zoom
        KeyCode::Char('+') | KeyCode::Char('=') => app.on_zoom(ZoomEvent { factor: ZOOM_STEP, anchor: None }),
        KeyCode::Char('-') | KeyCode::Char('_') => app.on_zoom(ZoomEvent {
            factor: 1.0 / ZOOM_STEP,
            anchor: None,
        }),

        // Seasons
        KeyCode::Char(c @ '1'..='4') => {
            let idx = c as usize - '1' as usize;
            app.select_season(Season::ALL[idx]);
        }
        KeyCode::Tab => app.cycle_season(),

        // Layer toggles
        KeyCode::Char('b') | KeyCode::Char('B') => app.toggle_outlines(),
        KeyCode::Char('L') => app.toggle_labels(),

        // Reset view
        KeyCode::Char('r') | KeyCode::Char('0') => app.reset(Instant::now()),

        _ => {}
    }
}

fn run(terminal: &mut DefaultTerminal, mut app: App) -> Result<()> {
    loop {
        app.tick(Instant::now());

        // Draw
        terminal.draw(|frame| ui::render(frame, &mut app))?;

        // Handle events with ~60fps target
        if event::poll(Duration::from_millis(16))? {
            match event::read()? {
                // Only handle key press events (not release)
                Event::Key(key) if key.kind == KeyEventKind::Press => handle_key(&mut app, key.code),
                Event::Mouse(mouse) => handle_mouse(&mut app, mouse),
                Event::Resize(width, height) => app.resize(Rect::new(0, 0, width, height)),
                _ => {}
            }
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}
