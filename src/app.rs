use ratatui::layout::Rect;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::{Config, Palette};
use crate::context::{RenderContext, StateShape};
use crate::data::Dataset;
use crate::map::{MapLayers, MapRenderer, Viewport};
use crate::season::{Season, Target};
use crate::ui;

/// Wheel or key zoom. `anchor` is the terminal cell to zoom around;
/// `None` zooms around the map center.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ZoomEvent {
    pub factor: f64,
    pub anchor: Option<(u16, u16)>,
}

/// Pan by a delta in Braille pixels
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PanEvent {
    pub dx: i32,
    pub dy: i32,
}

/// Pointer moved to a terminal cell
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HoverEvent {
    pub col: u16,
    pub row: u16,
}

/// Annotation layer state. Interaction hides it; reset brings it back
/// once the reveal delay has passed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Annotations {
    Shown,
    Hidden,
    RevealAt(Instant),
}

/// Application state
pub struct App {
    pub config: Config,
    pub palette: Palette,
    pub context: RenderContext,
    pub viewport: Viewport,
    pub map_renderer: MapRenderer,
    pub should_quit: bool,
    /// Last mouse position for drag tracking
    pub last_mouse: Option<(u16, u16)>,
    /// Current pointer cell for the tooltip
    pub mouse_pos: Option<(u16, u16)>,
    pub annotations: Annotations,
    /// Inner map area on screen
    pub map_area: Rect,
    layers: Option<MapLayers>,
}

impl App {
    pub fn new(config: Config, palette: Palette, dataset: Arc<Dataset>, target: Target, screen: Rect) -> Self {
        let map_area = ui::map_area(screen);
        let viewport = Viewport::new(
            &config.map,
            map_area.width as usize * 2,
            map_area.height as usize * 4,
        );
        let context = RenderContext::build(dataset, target, &config, palette);

        Self {
            config,
            palette,
            context,
            viewport,
            map_renderer: MapRenderer::new(),
            should_quit: false,
            last_mouse: None,
            mouse_pos: None,
            annotations: Annotations::Shown,
            map_area,
            layers: None,
        }
    }

    /// Update viewport size when terminal resizes
    pub fn resize(&mut self, screen: Rect) {
        self.map_area = ui::map_area(screen);
        self.viewport
            .resize(self.map_area.width as usize * 2, self.map_area.height as usize * 4);
        self.invalidate();
    }

    fn invalidate(&mut self) {
        self.layers = None;
    }

    /// Rasterized map for the current view, re-rendered only after a change
    pub fn layers(&mut self) -> &MapLayers {
        let annotations_visible = self.annotations == Annotations::Shown;
        let (cols, rows) = (self.map_area.width as usize, self.map_area.height as usize);
        self.layers.get_or_insert_with(|| {
            self.map_renderer
                .render(&self.context, &self.viewport, cols, rows, annotations_visible)
        })
    }

    /// Cached layers, if the last frame rendered them
    pub fn cached_layers(&self) -> Option<&MapLayers> {
        self.layers.as_ref()
    }

    /// Convert a terminal cell to Braille pixel coordinates inside the map
    fn cell_to_pixel(&self, col: u16, row: u16) -> (i32, i32) {
        let px = (col as i32 - self.map_area.x as i32) * 2;
        let py = (row as i32 - self.map_area.y as i32) * 4;
        (px, py)
    }

    pub fn on_pan(&mut self, event: PanEvent) {
        self.viewport.pan(event.dx, event.dy);
        self.interacted();
    }

    pub fn on_zoom(&mut self, event: ZoomEvent) {
        let (px, py) = match event.anchor {
            Some((col, row)) => {
                let (px, py) = self.cell_to_pixel(col, row);
                (px as f64 + 1.0, py as f64 + 2.0)
            }
            None => (self.viewport.width as f64 / 2.0, self.viewport.height as f64 / 2.0),
        };
        self.viewport.zoom_at(px, py, event.factor);
        self.interacted();
    }

    fn interacted(&mut self) {
        self.annotations = Annotations::Hidden;
        self.invalidate();
    }

    /// Restore the default transform; annotations return after the reveal delay
    pub fn reset(&mut self, now: Instant) {
        self.viewport.reset();
        self.annotations = Annotations::RevealAt(now + Duration::from_millis(self.config.map.annotation_reveal_ms));
        self.invalidate();
    }

    /// Advance timers
    pub fn tick(&mut self, now: Instant) {
        if let Annotations::RevealAt(at) = self.annotations {
            if now >= at {
                self.annotations = Annotations::Shown;
                self.invalidate();
            }
        }
    }

    /// Start a fresh render pass for `target` at the default view
    pub fn select(&mut self, target: Target) {
        let dataset = Arc::clone(self.context.dataset());
        self.context = RenderContext::build(dataset, target, &self.config, self.palette);
        self.viewport.reset();
        self.annotations = Annotations::Shown;
        self.invalidate();
    }

    pub fn select_season(&mut self, season: Season) {
        self.select(Target::season(season));
    }

    /// Next season; an unrecognized target starts over at spring
    pub fn cycle_season(&mut self) {
        let next = self.context.target.season.map_or(Season::Spring, Season::next);
        self.select_season(next);
    }

    pub fn toggle_labels(&mut self) {
        self.map_renderer.settings.show_labels = !self.map_renderer.settings.show_labels;
        self.invalidate();
    }

    pub fn toggle_outlines(&mut self) {
        self.map_renderer.settings.show_outlines = !self.map_renderer.settings.show_outlines;
        self.invalidate();
    }

    /// Handle mouse drag: the map follows the pointer
    pub fn handle_drag(&mut self, x: u16, y: u16) {
        if let Some((last_x, last_y)) = self.last_mouse {
            let dx = (last_x as i32 - x as i32) * 2;
            let dy = (last_y as i32 - y as i32) * 4;
            if dx != 0 || dy != 0 {
                self.on_pan(PanEvent { dx, dy });
            }
        }
        self.last_mouse = Some((x, y));
    }

    /// Reset drag state when mouse button released
    pub fn end_drag(&mut self) {
        self.last_mouse = None;
    }

    pub fn on_hover(&mut self, event: HoverEvent) {
        self.mouse_pos = Some((event.col, event.row));
    }

    /// State under the pointer, if the pointer is over the map
    pub fn hovered_state(&self) -> Option<&StateShape> {
        let (col, row) = self.mouse_pos?;
        let inside = col >= self.map_area.x
            && row >= self.map_area.y
            && col < self.map_area.x + self.map_area.width
            && row < self.map_area.y + self.map_area.height;
        if !inside {
            return None;
        }
        let (px, py) = self.cell_to_pixel(col, row);
        let (x, y) = self.viewport.unproject(px as f64 + 1.0, py as f64 + 2.0);
        self.context.locate(x, y)
    }

    /// Request quit
    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    /// Get current zoom level as a string
    pub fn zoom_level(&self) -> String {
        format!("{:.1}x", self.viewport.k)
    }
}
