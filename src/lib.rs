//! Terminal choropleth of US per-state COVID death rates by season.
//!
//! State boundaries (TopoJSON or GeoJSON) and a per-state seasonal CSV are
//! joined on state name, colored on a linear two-color scale, and drawn
//! with a legend, state labels, hover tooltips and season callouts.

pub mod annotation;
pub mod app;
pub mod braille;
pub mod config;
pub mod context;
pub mod data;
pub mod join;
pub mod legend;
pub mod map;
pub mod scale;
pub mod season;
pub mod ui;
