use rayon::prelude::*;

use crate::braille::BrailleCanvas;
use crate::context::RenderContext;
use crate::map::geometry::{draw_line, draw_ring};
use crate::map::projection::Viewport;
use crate::scale::Rgb;

/// Display settings for map layers
#[derive(Clone, Debug)]
pub struct DisplaySettings {
    pub show_outlines: bool,
    pub show_labels: bool,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            show_outlines: true,
            show_labels: true,
        }
    }
}

/// Text placed on the character grid
#[derive(Clone, Debug, PartialEq)]
pub struct PlacedText {
    pub col: i32,
    pub row: i32,
    pub text: String,
}

/// One rasterized frame of the map, in terminal cells
pub struct MapLayers {
    pub cols: usize,
    pub rows: usize,
    /// Fill per cell, row-major; `None` outside every state
    pub fills: Vec<Vec<Option<Rgb>>>,
    pub outlines: BrailleCanvas,
    pub connectors: BrailleCanvas,
    pub labels: Vec<PlacedText>,
    pub notes: Vec<PlacedText>,
}

impl MapLayers {
    pub fn fill(&self, col: usize, row: usize) -> Option<Rgb> {
        self.fills.get(row).and_then(|r| r.get(col)).copied().flatten()
    }
}

/// Rasterizes a render context through a viewport
#[derive(Default)]
pub struct MapRenderer {
    pub settings: DisplaySettings,
}

impl MapRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Render `cols` x `rows` terminal cells. The viewport must be sized
    /// to the matching Braille resolution (`cols * 2` x `rows * 4`).
    pub fn render(
        &self,
        context: &RenderContext,
        viewport: &Viewport,
        cols: usize,
        rows: usize,
        annotations_visible: bool,
    ) -> MapLayers {
        let fills = rasterize_fills(context, viewport, cols, rows);

        let mut outlines = BrailleCanvas::new(cols, rows);
        if self.settings.show_outlines {
            for state in &context.states {
                for polygon in context.geometry(state) {
                    draw_ring(&mut outlines, polygon.exterior(), viewport);
                    for hole in polygon.interiors() {
                        draw_ring(&mut outlines, hole, viewport);
                    }
                }
            }
        }

        let labels = if self.settings.show_labels {
            context
                .labels
                .iter()
                .map(|label| {
                    let (px, py) = viewport.project(label.at.0, label.at.1);
                    let width = label.text.chars().count() as i32;
                    PlacedText {
                        col: px.div_euclid(2) - width / 2,
                        row: py.div_euclid(4),
                        text: label.text.clone(),
                    }
                })
                .collect()
        } else {
            Vec::new()
        };

        let mut connectors = BrailleCanvas::new(cols, rows);
        let mut notes = Vec::new();
        if annotations_visible {
            for callout in &context.callouts {
                let (sx, sy) = viewport.project(callout.subject.0, callout.subject.1);
                let (nx, ny) = viewport.project(callout.note.0, callout.note.1);
                draw_line(&mut connectors, sx, sy, nx, ny);

                // Notes left of their subject end at the connector
                let width = callout.label.chars().count() as i32;
                let col = if nx < sx { nx.div_euclid(2) - width + 1 } else { nx.div_euclid(2) };
                notes.push(PlacedText {
                    col,
                    row: ny.div_euclid(4),
                    text: callout.label.clone(),
                });
            }
        }

        tracing::debug!(cols, rows, k = viewport.k, "map rasterized");

        MapLayers {
            cols,
            rows,
            fills,
            outlines,
            connectors,
            labels,
            notes,
        }
    }
}

/// Fill color of every cell, sampled at the cell center. Rows run in parallel.
fn rasterize_fills(context: &RenderContext, viewport: &Viewport, cols: usize, rows: usize) -> Vec<Vec<Option<Rgb>>> {
    (0..rows)
        .into_par_iter()
        .map(|row| {
            (0..cols)
                .map(|col| {
                    let (x, y) = viewport.unproject(col as f64 * 2.0 + 1.0, row as f64 * 4.0 + 2.0);
                    context.locate(x, y).map(|s| s.fill)
                })
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::data::{Dataset, GeoFeature, SeasonalMetricRow};
    use crate::season::Target;
    use geo::{polygon, MultiPolygon};
    use std::sync::Arc;

    fn context(target: &str) -> (RenderContext, Config) {
        let config = Config::default();
        let dataset = Dataset {
            features: vec![
                GeoFeature {
                    id: None,
                    name: "Texas".to_string(),
                    geometry: MultiPolygon::new(vec![polygon![
                        (x: 0.0, y: 0.0), (x: 400.0, y: 0.0), (x: 400.0, y: 400.0), (x: 0.0, y: 400.0)
                    ]]),
                },
                GeoFeature {
                    id: None,
                    name: "New York".to_string(),
                    geometry: MultiPolygon::new(vec![polygon![
                        (x: 500.0, y: 0.0), (x: 860.0, y: 0.0), (x: 860.0, y: 400.0), (x: 500.0, y: 400.0)
                    ]]),
                },
            ],
            rows: vec![
                SeasonalMetricRow {
                    state: "Texas".to_string(),
                    abbreviation: "TX".to_string(),
                    fields: [("summer_rate".to_string(), "0.03".to_string())].into_iter().collect(),
                },
                SeasonalMetricRow {
                    state: "New York".to_string(),
                    abbreviation: "NY".to_string(),
                    fields: [("summer_rate".to_string(), "0.01".to_string())].into_iter().collect(),
                },
            ],
        };
        let palette = config.map.palette().unwrap();
        let cx = RenderContext::build(Arc::new(dataset), Target::parse(target), &config, palette);
        (cx, config)
    }

    #[test]
    fn test_fills_follow_scale() {
        let (cx, config) = context("summer_rate");
        let (cols, rows) = (96, 30);
        let viewport = Viewport::new(&config.map, cols * 2, rows * 4);
        let layers = MapRenderer::new().render(&cx, &viewport, cols, rows, true);

        // Frame is 960x600 into 192x120 pixels: 0.2 px/unit. Texas spans
        // plane x 0..400 → pixels 15..75, cells 7..37
        let red = Rgb::new(255, 0, 0);
        let green = Rgb::new(0, 128, 0);
        assert_eq!(layers.fill(20, 10), Some(red));
        assert_eq!(layers.fill(60, 10), Some(green));
        assert_eq!(layers.fill(0, 0), None);
        assert_eq!(layers.fill(500, 500), None);
    }

    #[test]
    fn test_annotation_layer_toggles() {
        let (cx, config) = context("summer_rate");
        let viewport = Viewport::new(&config.map, 192, 120);
        let renderer = MapRenderer::new();

        let shown = renderer.render(&cx, &viewport, 96, 30, true);
        assert_eq!(shown.notes.len(), 2);
        assert!(shown.notes.iter().any(|n| n.text == "High death rate in the south"));

        let hidden = renderer.render(&cx, &viewport, 96, 30, false);
        assert!(hidden.notes.is_empty());
    }

    #[test]
    fn test_labels_toggle() {
        let (cx, config) = context("winter_rate");
        let viewport = Viewport::new(&config.map, 192, 120);
        let mut renderer = MapRenderer::new();
        let layers = renderer.render(&cx, &viewport, 96, 30, true);
        let texts: Vec<&str> = layers.labels.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, vec!["TX", "NY"]);
        // No winter values: everything is the missing gray
        assert_eq!(layers.fill(20, 10), Some(Rgb::new(128, 128, 128)));

        renderer.settings.show_labels = false;
        assert!(renderer.render(&cx, &viewport, 96, 30, true).labels.is_empty());
    }
}
