use geo::{coord, Coord, LineString, MultiPolygon, Polygon};
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};
use std::collections::HashMap;

use super::{GeoFeature, LoadError};

/// Quantization transform applied to delta-encoded arcs
#[derive(Deserialize, Debug, Clone, Copy)]
struct Transform {
    scale: [f64; 2],
    translate: [f64; 2],
}

#[derive(Deserialize, Debug)]
pub struct Topology {
    #[serde(default)]
    transform: Option<Transform>,
    objects: HashMap<String, GeometrySlot>,
    arcs: Vec<Vec<Vec<f64>>>,
}

#[derive(Deserialize, Debug)]
#[serde(tag = "type")]
enum TopoGeometry {
    GeometryCollection {
        geometries: Vec<GeometrySlot>,
    },
    Polygon {
        arcs: Vec<Vec<i64>>,
        #[serde(default)]
        id: Option<Value>,
        #[serde(default)]
        properties: Option<Map<String, Value>>,
    },
    MultiPolygon {
        arcs: Vec<Vec<Vec<i64>>>,
        #[serde(default)]
        id: Option<Value>,
        #[serde(default)]
        properties: Option<Map<String, Value>>,
    },
    /// Points and lines carry no state area
    #[serde(other)]
    Other,
}

/// A geometry entry. TopoJSON writes `"type": null` for features without
/// coordinates, which an internally tagged enum cannot take.
#[derive(Debug)]
enum GeometrySlot {
    Null { id: Option<Value> },
    Geometry(TopoGeometry),
}

impl<'de> Deserialize<'de> for GeometrySlot {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        if value.get("type").is_some_and(Value::is_null) {
            return Ok(GeometrySlot::Null {
                id: value.get("id").cloned(),
            });
        }
        TopoGeometry::deserialize(value)
            .map(GeometrySlot::Geometry)
            .map_err(serde::de::Error::custom)
    }
}

impl Topology {
    /// Decode a TopoJSON document. The buffer is parsed in place.
    pub fn from_slice(bytes: &mut [u8]) -> Result<Self, LoadError> {
        Ok(simd_json::serde::from_slice(bytes)?)
    }

    /// Expand every polygon geometry of `object` into a feature.
    /// Geometries without a `name_property` string are skipped.
    pub fn features(&self, object: &str, name_property: &str) -> Result<Vec<GeoFeature>, LoadError> {
        let root = self
            .objects
            .get(object)
            .ok_or_else(|| LoadError::MissingObject(object.to_string()))?;

        let arcs = self.decode_arcs();
        let mut features = Vec::new();
        collect_features(root, &arcs, name_property, &mut features)?;
        Ok(features)
    }

    /// Absolute coordinates for every arc, undoing quantization and delta encoding
    fn decode_arcs(&self) -> Vec<Vec<Coord<f64>>> {
        self.arcs
            .iter()
            .map(|arc| {
                let (mut x, mut y) = (0.0, 0.0);
                arc.iter()
                    .filter(|p| p.len() >= 2)
                    .map(|p| match self.transform {
                        Some(t) => {
                            x += p[0];
                            y += p[1];
                            coord! { x: x * t.scale[0] + t.translate[0], y: y * t.scale[1] + t.translate[1] }
                        }
                        None => coord! { x: p[0], y: p[1] },
                    })
                    .collect()
            })
            .collect()
    }
}

fn collect_features(
    slot: &GeometrySlot,
    arcs: &[Vec<Coord<f64>>],
    name_property: &str,
    out: &mut Vec<GeoFeature>,
) -> Result<(), LoadError> {
    let geometry = match slot {
        GeometrySlot::Geometry(geometry) => geometry,
        GeometrySlot::Null { id } => {
            tracing::warn!(id = ?id.as_ref().and_then(value_to_id), "skipping null geometry");
            return Ok(());
        }
    };

    match geometry {
        TopoGeometry::GeometryCollection { geometries } => {
            for g in geometries {
                collect_features(g, arcs, name_property, out)?;
            }
        }
        TopoGeometry::Polygon { arcs: rings, id, properties } => {
            let polygon = polygon(arcs, rings)?;
            push_feature(out, id, properties, name_property, MultiPolygon::new(vec![polygon]));
        }
        TopoGeometry::MultiPolygon { arcs: polys, id, properties } => {
            let polygons = polys
                .iter()
                .map(|rings| polygon(arcs, rings))
                .collect::<Result<Vec<_>, _>>()?;
            push_feature(out, id, properties, name_property, MultiPolygon::new(polygons));
        }
        TopoGeometry::Other => {}
    }
    Ok(())
}

fn push_feature(
    out: &mut Vec<GeoFeature>,
    id: &Option<Value>,
    properties: &Option<Map<String, Value>>,
    name_property: &str,
    geometry: MultiPolygon<f64>,
) {
    let id = id.as_ref().and_then(value_to_id);
    let name = properties
        .as_ref()
        .and_then(|p| p.get(name_property))
        .and_then(|v| v.as_str());

    match name {
        Some(name) => out.push(GeoFeature {
            id,
            name: name.to_string(),
            geometry,
        }),
        None => tracing::warn!(?id, property = name_property, "skipping unnamed geometry"),
    }
}

fn value_to_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn polygon(arcs: &[Vec<Coord<f64>>], rings: &[Vec<i64>]) -> Result<Polygon<f64>, LoadError> {
    let mut rings = rings.iter().map(|r| ring(arcs, r));
    let exterior = match rings.next() {
        Some(r) => r?,
        None => LineString::new(Vec::new()),
    };
    let interiors = rings.collect::<Result<Vec<_>, _>>()?;
    Ok(Polygon::new(exterior, interiors))
}

/// Stitch a ring from arc references. Negative indices (`!i`) are
/// traversed backwards; each arc after the first drops its first point,
/// which repeats the previous arc's last one.
fn ring(arcs: &[Vec<Coord<f64>>], indices: &[i64]) -> Result<LineString<f64>, LoadError> {
    let mut points: Vec<Coord<f64>> = Vec::new();

    for &index in indices {
        let (idx, reversed) = if index < 0 { (!index as usize, true) } else { (index as usize, false) };
        let arc = arcs
            .get(idx)
            .ok_or_else(|| LoadError::Topology(format!("arc index {index} out of range")))?;

        let skip = usize::from(!points.is_empty());
        if reversed {
            points.extend(arc.iter().rev().skip(skip).copied());
        } else {
            points.extend(arc.iter().skip(skip).copied());
        }
    }

    Ok(LineString::new(points))
}
