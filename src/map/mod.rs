mod geometry;
mod projection;
mod renderer;
mod spatial;

pub use projection::{project_features, Viewport, ZOOM_STEP};
pub use renderer::{DisplaySettings, MapLayers, MapRenderer, PlacedText};
pub use spatial::FeatureGrid;
