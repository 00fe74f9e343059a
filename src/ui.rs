use crate::app::{Annotations, App};
use crate::context::tooltip;
use crate::legend::Legend;
use crate::map::{MapLayers, PlacedText};
use crate::scale::Rgb;
use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Widget, Wrap},
    Frame,
};

/// Columns reserved for the legend panel
const LEGEND_WIDTH: u16 = 16;

impl From<Rgb> for Color {
    fn from(c: Rgb) -> Self {
        Color::Rgb(c.r, c.g, c.b)
    }
}

/// Map block, legend panel and status bar
fn split(area: Rect) -> (Rect, Rect, Rect) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(3),    // Map + legend
            Constraint::Length(1), // Status bar
        ])
        .split(area);
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(10), Constraint::Length(LEGEND_WIDTH)])
        .split(rows[0]);
    (cols[0], cols[1], rows[1])
}

fn map_block(title: String) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(Span::styled(
            format!(" {title} "),
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ))
}

/// Screen area the map itself is drawn into
pub fn map_area(screen: Rect) -> Rect {
    let (map, _, _) = split(screen);
    map_block(String::new()).inner(map)
}

/// Render the UI
pub fn render(frame: &mut Frame, app: &mut App) {
    let (map, legend, status) = split(frame.area());

    let block = map_block(app.context.target.title());
    frame.render_widget(block, map);

    let outline = app.context.palette.outline;
    let inner = app.map_area;
    let widget = MapWidget {
        layers: app.layers(),
        outline: outline.into(),
    };
    frame.render_widget(widget, inner);

    render_legend(frame, app.context.legend.as_ref(), legend);
    render_tooltip(frame, app, inner);
    render_status_bar(frame, app, status);
}

/// Cell fills with outlines, labels and callouts on top
struct MapWidget<'a> {
    layers: &'a MapLayers,
    outline: Color,
}

impl MapWidget<'_> {
    fn put_text(&self, text: &PlacedText, style: Style, area: Rect, buf: &mut Buffer) {
        if text.row < 0 || text.row >= area.height as i32 {
            return;
        }
        for (i, ch) in text.text.chars().enumerate() {
            let col = text.col + i as i32;
            if col < 0 || col >= area.width as i32 {
                continue;
            }
            let (x, y) = (area.x + col as u16, area.y + text.row as u16);
            let mut style = style;
            if let Some(fill) = self.layers.fill(col as usize, text.row as usize) {
                style = style.fg(fill.contrasting().into());
            }
            buf[(x, y)].set_char(ch).set_style(style);
        }
    }
}

impl Widget for MapWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let rows = self.layers.rows.min(area.height as usize);
        let cols = self.layers.cols.min(area.width as usize);

        for row in 0..rows {
            for col in 0..cols {
                let cell = &mut buf[(area.x + col as u16, area.y + row as u16)];
                if let Some(fill) = self.layers.fill(col, row) {
                    cell.set_char(' ').set_bg(fill.into());
                }
                // Connectors win over outlines where both have dots
                if let Some(ch) = self.layers.connectors.glyph(col, row) {
                    cell.set_char(ch).set_fg(Color::White);
                } else if let Some(ch) = self.layers.outlines.glyph(col, row) {
                    cell.set_char(ch).set_fg(self.outline);
                }
            }
        }

        for label in &self.layers.labels {
            self.put_text(label, Style::default().fg(Color::Black), area, buf);
        }
        for note in &self.layers.notes {
            let style = Style::default().fg(Color::White).add_modifier(Modifier::BOLD);
            self.put_text(note, style, area, buf);
        }
    }
}

fn render_legend(frame: &mut Frame, legend: Option<&Legend>, area: Rect) {
    let title = legend.map_or("Death rate", |l| l.title.as_str()).to_string();
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(Span::styled(format!(" {title} "), Style::default().fg(Color::White)));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let Some(legend) = legend else {
        let msg = Paragraph::new("no data").style(Style::default().fg(Color::DarkGray)).alignment(Alignment::Center);
        frame.render_widget(msg, inner);
        return;
    };

    // Max caption, bar, min caption
    let bar_rows = inner.height.saturating_sub(2) as usize;
    let mut lines = vec![Line::from(Span::raw(format!(" {}", legend.max_label())))];
    for color in legend.sample(bar_rows) {
        lines.push(Line::from(Span::styled(" ████", Style::default().fg(color.into()))));
    }
    lines.push(Line::from(Span::raw(format!(" {}", legend.min_label()))));
    frame.render_widget(Paragraph::new(lines), inner);
}

fn render_tooltip(frame: &mut Frame, app: &App, map: Rect) {
    let Some((col, row)) = app.mouse_pos else {
        return;
    };
    let Some(state) = app.hovered_state() else {
        return;
    };
    let (name, rate) = tooltip(state);

    let width = (name.chars().count().max(rate.chars().count()) as u16 + 4).min(map.width);
    let height = 4u16.min(map.height);
    // Below-right of the pointer, flipped to stay inside the map
    let x = if col + 2 + width <= map.x + map.width { col + 2 } else { col.saturating_sub(width + 1).max(map.x) };
    let y = if row + 1 + height <= map.y + map.height { row + 1 } else { row.saturating_sub(height).max(map.y) };
    let area = Rect::new(x, y, width, height);

    let popup = Paragraph::new(vec![
        Line::from(Span::styled(name, Style::default().add_modifier(Modifier::BOLD))),
        Line::from(rate),
    ])
    .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(Color::Gray)));
    frame.render_widget(Clear, area);
    frame.render_widget(popup, area);
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let settings = &app.map_renderer.settings;
    let on_off = |on: bool| Style::default().fg(if on { Color::Green } else { Color::DarkGray });

    let season = match app.context.target.season {
        Some(season) => season.to_string(),
        None => format!("{} (no annotations)", app.context.target.field),
    };
    let annotations = match app.annotations {
        Annotations::Shown => "notes",
        Annotations::Hidden => "notes hidden",
        Annotations::RevealAt(_) => "notes…",
    };

    let status = Line::from(vec![
        Span::styled(" Zoom: ", Style::default().fg(Color::DarkGray)),
        Span::styled(app.zoom_level(), Style::default().fg(Color::Yellow)),
        Span::styled(" | ", Style::default().fg(Color::DarkGray)),
        Span::styled(season, Style::default().fg(Color::Magenta)),
        Span::styled(" | ", Style::default().fg(Color::DarkGray)),
        // Key hints name the toggle key; dimmed when the layer is off
        Span::styled("[b]order ", on_off(settings.show_outlines)),
        Span::styled("[L]abels ", on_off(settings.show_labels)),
        Span::styled(annotations, on_off(app.annotations == Annotations::Shown)),
        Span::styled(
            " | hjkl:pan +/-:zoom 1-4/tab:season r:reset q:quit",
            Style::default().fg(Color::DarkGray),
        ),
    ]);

    frame.render_widget(Paragraph::new(status), area);
}

/// Full-screen notice shown instead of the map when loading failed
pub fn render_load_error(frame: &mut Frame, error: &anyhow::Error) {
    let area = frame.area();
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Red))
        .title(Span::styled(
            " Failed to load data ",
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        ));

    let mut lines = vec![Line::from(Span::styled(
        "The map could not be drawn because its data failed to load:",
        Style::default().add_modifier(Modifier::BOLD),
    ))];
    lines.push(Line::raw(""));
    for (depth, cause) in error.chain().enumerate() {
        let prefix = if depth == 0 { "  " } else { "  caused by: " };
        lines.push(Line::raw(format!("{prefix}{cause}")));
    }
    lines.push(Line::raw(""));
    lines.push(Line::from(Span::styled("Press q to quit", Style::default().fg(Color::DarkGray))));

    let paragraph = Paragraph::new(lines).block(block).wrap(Wrap { trim: false });
    frame.render_widget(paragraph, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::data::{Dataset, GeoFeature, SeasonalMetricRow};
    use crate::season::Target;
    use geo::{polygon, MultiPolygon};
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;
    use std::sync::Arc;

    fn app(screen: Rect) -> App {
        let config = Config::default();
        let palette = config.map.palette().unwrap();
        let dataset = Dataset {
            features: vec![GeoFeature {
                id: None,
                name: "Texas".to_string(),
                geometry: MultiPolygon::new(vec![polygon![
                    (x: 0.0, y: 0.0), (x: 800.0, y: 0.0), (x: 800.0, y: 450.0), (x: 0.0, y: 450.0)
                ]]),
            }],
            rows: vec![SeasonalMetricRow {
                state: "Texas".to_string(),
                abbreviation: "TX".to_string(),
                fields: [("summer_rate".to_string(), "0.02".to_string())].into_iter().collect(),
            }],
        };
        App::new(config, palette, Arc::new(dataset), Target::parse("summer_rate"), screen)
    }

    /// Status bar text and the foreground of the first cell of `needle`
    fn status_line(app: &mut App, needle: &str) -> (String, Color) {
        let mut terminal = Terminal::new(TestBackend::new(160, 30)).unwrap();
        terminal.draw(|frame| render(frame, app)).unwrap();
        let buffer = terminal.backend().buffer();
        let y = buffer.area.height - 1;
        let line: String = (0..buffer.area.width).map(|x| buffer[(x, y)].symbol().to_string()).collect();
        let col = line.find(needle).expect("hint present") as u16;
        (line, buffer[(col, y)].fg)
    }

    #[test]
    fn test_map_area_leaves_room_for_legend_and_status() {
        let area = map_area(Rect::new(0, 0, 120, 40));
        assert_eq!(area, Rect::new(1, 1, 120 - LEGEND_WIDTH - 2, 37));
    }

    #[test]
    fn test_load_error_screen() {
        let mut terminal = Terminal::new(TestBackend::new(80, 12)).unwrap();
        let error = anyhow::anyhow!("connection refused").context("failed to fetch https://d3js.org/us-10m.v2.json");
        terminal.draw(|frame| render_load_error(frame, &error)).unwrap();

        let buffer = terminal.backend().buffer();
        let text: String = (0..buffer.area.height)
            .map(|y| (0..buffer.area.width).map(|x| buffer[(x, y)].symbol().to_string()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n");
        assert!(text.contains("Failed to load data"));
        assert!(text.contains("caused by: connection refused"));
    }

    #[test]
    fn test_label_hint_names_toggle_key() {
        let mut app = app(Rect::new(0, 0, 160, 30));
        let (line, fg) = status_line(&mut app, "[L]abels");
        assert_eq!(fg, Color::Green);
        assert!(line.contains("[b]order"));

        app.toggle_labels();
        let (line, fg) = status_line(&mut app, "[L]abels");
        assert!(!line.contains("[l]abels"));
        assert_eq!(fg, Color::DarkGray);
    }
}
