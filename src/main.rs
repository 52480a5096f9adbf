use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, MouseButton,
    MouseEvent, MouseEventKind,
};
use crossterm::execute;
use fluxmap::app::App;
use fluxmap::session::MapMode;
use fluxmap::ui;
use ratatui::DefaultTerminal;
use tracing_subscriber::EnvFilter;

/// Log to a file when FLUXMAP_LOG is set (the terminal itself is the UI).
fn init_tracing() {
    let Ok(filter) = std::env::var("FLUXMAP_LOG") else {
        return;
    };
    let Ok(file) = std::fs::File::create("fluxmap.log") else {
        return;
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_writer(Arc::new(file))
        .with_ansi(false)
        .try_init();
}

fn main() -> Result<()> {
    init_tracing();

    let data_root = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("data"));
    let mut app = App::new(&data_root)?;

    let mut terminal = ratatui::init();
    terminal.clear()?;
    execute!(std::io::stdout(), EnableMouseCapture)?;

    let result = run(&mut terminal, &mut app);

    let _ = execute!(std::io::stdout(), DisableMouseCapture);
    ratatui::restore();

    result
}

/// Terminal cell to map pixel coordinates, None outside the map widget.
/// One cell is one pixel wide and two pixels tall (half blocks).
fn map_pixel(app: &App, col: u16, row: u16) -> Option<(f64, f64)> {
    let (ox, oy) = app.map_origin;
    if col < ox || row < oy {
        return None;
    }
    let x = (col - ox) as f64;
    let y = (row - oy) as f64 * 2.0;
    let (w, h) = app.map_pixel_size;
    if x >= w || y >= h {
        return None;
    }
    Some((x, y))
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    let pixel = map_pixel(app, mouse.column, mouse.row);

    match mouse.kind {
        MouseEventKind::ScrollUp => {
            if let Some((x, y)) = pixel {
                app.wheel(x, y, true);
            }
        }
        MouseEventKind::ScrollDown => {
            if let Some((x, y)) = pixel {
                app.wheel(x, y, false);
            }
        }
        MouseEventKind::Down(MouseButton::Left) => {
            if let Some((x, y)) = pixel {
                app.pointer_down(x, y);
            }
        }
        MouseEventKind::Drag(MouseButton::Left) => match pixel {
            Some((x, y)) => app.pointer_drag(x, y),
            None => app.pointer_leave(),
        },
        MouseEventKind::Up(MouseButton::Left) => match pixel {
            Some((x, y)) => app.pointer_up(x, y),
            None => app.pointer_leave(),
        },
        MouseEventKind::Moved => app.hover(pixel),
        _ => {}
    }
}

fn run(terminal: &mut DefaultTerminal, app: &mut App) -> Result<()> {
    loop {
        terminal.draw(|frame| ui::render(frame, app))?;

        // ~60fps poll so the relief view re-renders while orbiting.
        if event::poll(Duration::from_millis(16))? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => match key.code {
                    KeyCode::Char('q') | KeyCode::Esc => app.quit(),
                    KeyCode::Tab => app.cycle_dataset(),

                    KeyCode::Char('1') => app.set_mode(MapMode::Flux),
                    KeyCode::Char('2') => app.set_mode(MapMode::Change),
                    KeyCode::Char('3') => app.set_mode(MapMode::HeightMap),
                    KeyCode::Char('m') => {
                        let next = match app.session.mode {
                            MapMode::Flux => MapMode::Change,
                            MapMode::Change => MapMode::HeightMap,
                            MapMode::HeightMap => MapMode::Flux,
                        };
                        app.set_mode(next);
                    }

                    KeyCode::Left | KeyCode::Char('h') => app.pan_key(15.0, 0.0),
                    KeyCode::Right | KeyCode::Char('l') => app.pan_key(-15.0, 0.0),
                    KeyCode::Up | KeyCode::Char('k') => app.pan_key(0.0, 10.0),
                    KeyCode::Down | KeyCode::Char('j') => app.pan_key(0.0, -10.0),

                    KeyCode::Char('+') | KeyCode::Char('=') => app.zoom_key(true),
                    KeyCode::Char('-') | KeyCode::Char('_') => app.zoom_key(false),

                    KeyCode::Char('x') => app.place_marker(),
                    KeyCode::Char('r') | KeyCode::Char('0') => app.reset_view(),

                    _ => {}
                },
                Event::Mouse(mouse) => handle_mouse(app, mouse),
                _ => {}
            }
        }

        if app.should_quit {
            break;
        }
    }
    Ok(())
}
