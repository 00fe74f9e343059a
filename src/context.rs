use geo::{BoundingRect, Centroid, Contains, Intersects, MultiPolygon, Point, Rect};
use std::sync::Arc;
use tracing::info;

use crate::annotation::{self, Callout};
use crate::config::{Config, Palette};
use crate::data::Dataset;
use crate::join::{self, JoinedData};
use crate::legend::Legend;
use crate::map::FeatureGrid;
use crate::scale::{ColorScale, Rgb};
use crate::season::Target;

/// Grid cells per frame width for hit-testing
const GRID_DIVISIONS: f64 = 16.0;

/// A feature with its resolved fill
#[derive(Clone, Debug)]
pub struct StateShape {
    pub name: String,
    pub abbreviation: Option<String>,
    pub value: Option<f64>,
    pub fill: Rgb,
    /// Index into `Dataset::features`
    pub feature: usize,
    bbox: Option<Rect<f64>>,
}

/// Abbreviation text at a state's planar centroid
#[derive(Clone, Debug, PartialEq)]
pub struct StateLabel {
    pub text: String,
    pub at: (f64, f64),
}

/// Everything one render pass derives from the dataset and a target.
/// Built fresh per pass and dropped when the next one replaces it.
pub struct RenderContext {
    pub target: Target,
    pub joined: JoinedData,
    pub scale: Option<ColorScale>,
    pub legend: Option<Legend>,
    pub states: Vec<StateShape>,
    pub labels: Vec<StateLabel>,
    pub callouts: Vec<Callout>,
    pub palette: Palette,
    dataset: Arc<Dataset>,
    grid: FeatureGrid,
}

impl RenderContext {
    pub fn build(dataset: Arc<Dataset>, target: Target, config: &Config, palette: Palette) -> Self {
        let joined = join::join(&dataset.features, &dataset.rows, &target.field);

        // Without a range there is nothing to scale: every state is missing
        let scale = joined
            .range()
            .map(|range| ColorScale::new(range, palette.low, palette.high, palette.missing));
        let legend = scale
            .as_ref()
            .map(|s| Legend::new(s, config.legend.steps, &config.legend.title));

        let states: Vec<StateShape> = joined
            .states()
            .map(|s| StateShape {
                name: s.name.to_string(),
                abbreviation: s.abbreviation.map(str::to_string),
                value: s.value,
                fill: scale.as_ref().map_or(palette.missing, |cs| cs.color(s.value)),
                feature: s.feature,
                bbox: dataset.features[s.feature].geometry.bounding_rect(),
            })
            .collect();

        let labels = states
            .iter()
            .filter_map(|s| {
                let text = s.abbreviation.as_ref()?;
                if config.map.label_skip.iter().any(|skip| skip == text) {
                    return None;
                }
                let c = dataset.features[s.feature].geometry.centroid()?;
                Some(StateLabel {
                    text: text.clone(),
                    at: (c.x(), c.y()),
                })
            })
            .collect();

        let callouts = annotation::callouts(&target, &joined, &dataset.features);

        let grid = FeatureGrid::build(
            states.iter().map(|s| match s.bbox {
                Some(r) => (r.min().x, r.min().y, r.max().x, r.max().y),
                None => (f64::NAN, f64::NAN, f64::NAN, f64::NAN),
            }),
            (config.map.width / GRID_DIVISIONS).max(1.0),
        );

        info!(
            field = %target.field,
            season = ?target.season,
            range = ?joined.range(),
            states = states.len(),
            callouts = callouts.len(),
            "render pass built"
        );

        Self {
            target,
            joined,
            scale,
            legend,
            states,
            labels,
            callouts,
            palette,
            dataset,
            grid,
        }
    }

    pub fn dataset(&self) -> &Arc<Dataset> {
        &self.dataset
    }

    pub fn geometry(&self, state: &StateShape) -> &MultiPolygon<f64> {
        &self.dataset.features[state.feature].geometry
    }

    /// State containing the map-plane point, if any
    pub fn locate(&self, x: f64, y: f64) -> Option<&StateShape> {
        let point = Point::new(x, y);
        self.grid
            .candidates(x, y)
            .iter()
            .filter_map(|&idx| self.states.get(idx))
            .filter(|s| s.bbox.is_some_and(|r| r.intersects(&point)))
            .find(|s| self.geometry(s).contains(&point))
    }

    /// Fill for a state name; unknown names get the missing color
    pub fn fill_of(&self, name: &str) -> Rgb {
        match &self.scale {
            Some(cs) => cs.color(self.joined.value_of(name)),
            None => self.palette.missing,
        }
    }
}

/// Tooltip lines for a hovered state
pub fn tooltip(state: &StateShape) -> (String, String) {
    let rate = match state.value {
        Some(v) => format!("Death rate: {:.4}%", v * 100.0),
        None => "Death rate: no data".to_string(),
    };
    (state.name.clone(), rate)
}
