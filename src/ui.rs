use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget},
    Frame,
};

use crate::app::App;
use crate::canvas::PixelCanvas;
use crate::color::{DivergingScale, Domain, Rgb, SequentialScale};
use crate::map::geometry::{draw_line, draw_marker};
use crate::session::MapMode;

const BORDER_COLOR: Rgb = Rgb(90, 90, 90);
const MARKER_COLOR: Rgb = Rgb(255, 60, 60);
const SIDE_PANEL_WIDTH: u16 = 34;
const LEGEND_ROWS: usize = 9;

/// Render the UI.
pub fn render(frame: &mut Frame, app: &mut App) {
    let area = frame.area();

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(1)])
        .split(area);
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(20), Constraint::Length(SIDE_PANEL_WIDTH)])
        .split(rows[0]);

    render_map(frame, app, columns[0]);
    render_side_panel(frame, app, columns[1]);
    render_status_bar(frame, app, rows[1]);
}

fn mode_title(mode: MapMode) -> &'static str {
    match mode {
        MapMode::Flux => " Flux ",
        MapMode::Change => " Yearly Change ",
        MapMode::HeightMap => " Relief ",
    }
}

fn render_map(frame: &mut Frame, app: &mut App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(Span::styled(
            mode_title(app.session.mode),
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ));
    let inner = block.inner(area);
    frame.render_widget(block, area);
    if inner.width == 0 || inner.height == 0 {
        return;
    }

    // Half blocks give one terminal cell two vertical pixels.
    let pw = inner.width as usize;
    let ph = inner.height as usize * 2;
    app.map_origin = (inner.x, inner.y);
    app.map_pixel_size = (pw as f64, ph as f64);
    app.ensure_fitted(pw as f64, ph as f64);

    let mut canvas = PixelCanvas::new(pw, ph);
    match (&app.scene, app.session.mode) {
        (Some(scene), MapMode::HeightMap) => scene.render(&mut canvas),
        _ => {
            sample_surface(app, &mut canvas);
            draw_borders(app, &mut canvas);
            draw_marker_overlay(app, &mut canvas);
        }
    }

    frame.render_widget(HalfBlockWidget { canvas }, inner);
}

/// Pull the visible window of the native surface through the viewport's
/// inverse transform, one output pixel at a time.
fn sample_surface(app: &App, canvas: &mut PixelCanvas) {
    let native_w = app.surface.width() as f64;
    let native_h = app.surface.height() as f64;
    for y in 0..canvas.height() {
        for x in 0..canvas.width() {
            let (nx, ny) = app
                .viewport
                .screen_to_native(x as f64 + 0.5, y as f64 + 0.5);
            if nx < 0.0 || ny < 0.0 || nx >= native_w || ny >= native_h {
                continue;
            }
            if let Some(color) = app.surface.get(nx as usize, ny as usize) {
                canvas.set(x, y, color);
            }
        }
    }
}

fn draw_borders(app: &App, canvas: &mut PixelCanvas) {
    for ring in &app.borders_native {
        let mut prev: Option<(f64, f64)> = None;
        for &(nx, ny) in ring {
            let p = app.viewport.native_to_screen(nx, ny);
            if let Some((px, py)) = prev {
                // Skip segments entirely outside the view.
                let on_screen = |(x, y): (f64, f64)| {
                    x >= -1.0
                        && y >= -1.0
                        && x <= canvas.width() as f64 + 1.0
                        && y <= canvas.height() as f64 + 1.0
                };
                if on_screen(p) || on_screen((px, py)) {
                    draw_line(canvas, px as i32, py as i32, p.0 as i32, p.1 as i32, BORDER_COLOR);
                }
            }
            prev = Some(p);
        }
    }
}

fn draw_marker_overlay(app: &App, canvas: &mut PixelCanvas) {
    let Some((lon, lat)) = app.marker else {
        return;
    };
    let (nx, ny) = app.project_native(lon, lat);
    let (sx, sy) = app.viewport.native_to_screen(nx, ny);
    draw_marker(canvas, sx as i32, sy as i32, 2, MARKER_COLOR);
}

/// Widget that blits an RGBA canvas using upper-half-block glyphs, packing
/// two canvas rows into each terminal row.
struct HalfBlockWidget {
    canvas: PixelCanvas,
}

impl Widget for HalfBlockWidget {
    fn render(self, area: Rect, buf: &mut Buffer) {
        for row in 0..area.height as usize {
            let y = area.y + row as u16;
            for col in 0..area.width as usize {
                let x = area.x + col as u16;
                let top = self.canvas.get(col, row * 2);
                let bottom = self.canvas.get(col, row * 2 + 1);
                let cell = &mut buf[(x, y)];
                match (top, bottom) {
                    (None, None) => {}
                    (Some(Rgb(tr, tg, tb)), Some(Rgb(br, bg, bb))) => {
                        cell.set_char('▀')
                            .set_fg(Color::Rgb(tr, tg, tb))
                            .set_bg(Color::Rgb(br, bg, bb));
                    }
                    (Some(Rgb(r, g, b)), None) => {
                        cell.set_char('▀').set_fg(Color::Rgb(r, g, b));
                    }
                    // An unpainted top pixel keeps the cell background.
                    (None, Some(Rgb(r, g, b))) => {
                        cell.set_char('▄').set_fg(Color::Rgb(r, g, b));
                    }
                }
            }
        }
    }
}

fn render_side_panel(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(Span::styled(" Dataset ", Style::default().fg(Color::Cyan)));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let label = Style::default().fg(Color::DarkGray);
    let value = Style::default().fg(Color::White);
    let mut lines: Vec<Line> = Vec::new();

    if let Some(name) = &app.session.dataset_name {
        lines.push(Line::from(vec![
            Span::styled("Name      ", label),
            Span::styled(name.clone(), value),
        ]));
    }
    if let Some(grid) = app.session.grid() {
        lines.push(Line::from(vec![
            Span::styled("Shape     ", label),
            Span::styled(format!("{}x{}", grid.height(), grid.width()), value),
        ]));
    }
    if let Some(meta) = &app.session.metadata {
        if let Some(substance) = &meta.substance {
            lines.push(Line::from(vec![
                Span::styled("Substance ", label),
                Span::styled(substance.clone(), value),
            ]));
        }
        if let Some(year) = meta.year {
            lines.push(Line::from(vec![
                Span::styled("Year      ", label),
                Span::styled(year.to_string(), value),
            ]));
        }
        if let Some(release) = &meta.release {
            lines.push(Line::from(vec![
                Span::styled("Release   ", label),
                Span::styled(release.clone(), value),
            ]));
        }
        if let Some(total) = meta.global_total {
            lines.push(Line::from(vec![
                Span::styled("Total     ", label),
                Span::styled(format!("{total:.3e}"), value),
            ]));
        }
    }

    lines.push(Line::from(""));
    lines.extend(legend_lines(app));

    if let Some(selected) = &app.selected {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            selected.name.clone(),
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        )));
        if let Some(pct) = selected.change_pct {
            let color = if pct >= 0.0 { Color::Red } else { Color::Green };
            lines.push(Line::from(vec![
                Span::styled("Change    ", label),
                Span::styled(format!("{pct:+.2}%"), Style::default().fg(color)),
            ]));
        }
        if let Some(emissions) = selected.emissions {
            lines.push(Line::from(vec![
                Span::styled("Emissions ", label),
                Span::styled(format!("{emissions:.3e}"), value),
            ]));
        }
        if let Some(prev) = selected.prev_emissions {
            lines.push(Line::from(vec![
                Span::styled("Previous  ", label),
                Span::styled(format!("{prev:.3e}"), value),
            ]));
        }
    }

    frame.render_widget(Paragraph::new(lines), inner);
}

/// Vertical colorbar with the extremes labeled. Suppressed entirely when
/// the installed dataset has no color domain.
fn legend_lines(app: &App) -> Vec<Line<'static>> {
    let label = Style::default().fg(Color::DarkGray);
    let suppressed =
        |text: &'static str| vec![Line::from(Span::styled(text, label))];

    // The change legend is anchored on the percent-change values, not the
    // flux grid's domain; each mode brings its own domain and unit label.
    let (domain, sample, units): (Domain, Box<dyn Fn(f32) -> Rgb>, String) =
        match app.session.mode {
            MapMode::Change => {
                let Some(domain) = app.change_domain() else {
                    return suppressed("no change data");
                };
                let scale = DivergingScale::new(domain);
                (
                    domain,
                    Box::new(move |t| scale.sample(t)),
                    "% change in emissions".to_string(),
                )
            }
            MapMode::Flux | MapMode::HeightMap => {
                let Some(domain) = app.session.domain() else {
                    return suppressed("no valid samples");
                };
                let scale = SequentialScale::new(domain);
                // Flip so the maximum sits at the top of the bar.
                (
                    domain,
                    Box::new(move |t| scale.sample(1.0 - t)),
                    app.session
                        .metadata
                        .as_ref()
                        .and_then(|m| m.units.clone())
                        .unwrap_or_else(|| "log_10(kg m^-2 s^-1)".to_string()),
                )
            }
        };

    let mut lines = Vec::with_capacity(LEGEND_ROWS + 2);
    lines.push(Line::from(Span::styled(units, label)));
    for row in 0..LEGEND_ROWS {
        let t = row as f32 / (LEGEND_ROWS - 1) as f32;
        let Rgb(r, g, b) = sample(t);
        let tag = if row == 0 {
            format!(" {:.2}", domain.max)
        } else if row == LEGEND_ROWS - 1 {
            format!(" {:.2}", domain.min)
        } else {
            String::new()
        };
        lines.push(Line::from(vec![
            Span::styled("██", Style::default().fg(Color::Rgb(r, g, b))),
            Span::styled(tag, label),
        ]));
    }
    lines
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let dim = Style::default().fg(Color::DarkGray);
    let status = if let Some(notice) = &app.notice {
        Line::from(Span::styled(
            format!(" {notice}"),
            Style::default().fg(Color::Red),
        ))
    } else {
        let mode_span = |mode: MapMode, text: &'static str| {
            Span::styled(
                text,
                if app.session.mode == mode {
                    Style::default().fg(Color::Green)
                } else {
                    dim
                },
            )
        };
        Line::from(vec![
            mode_span(MapMode::Flux, " [1]flux"),
            mode_span(MapMode::Change, " [2]change"),
            mode_span(MapMode::HeightMap, " [3]relief "),
            Span::styled(format!("| {} datasets ", app.dataset_count()), dim),
            Span::styled(format!("| zoom {:.2}x ", app.viewport.zoom), Style::default().fg(Color::Yellow)),
            Span::styled(
                "| tab:dataset x:mark hjkl:pan +/-:zoom r:reset q:quit",
                dim,
            ),
        ])
    };
    frame.render_widget(Paragraph::new(status), area);
}
