use geo::BoundingRect;

use crate::data::GeoFeature;
use crate::join::JoinedData;
use crate::season::{Season, Target};

/// What a callout points at
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Subject {
    /// Bounding-box center of the state with this abbreviation
    State(&'static str),
    /// A fixed map-plane position
    Fixed(f64, f64),
}

/// Callout before its subject is resolved against the data
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Annotation {
    pub label: &'static str,
    pub subject: Subject,
    pub dx: f64,
    pub dy: f64,
}

/// A resolved callout: connector from `subject` to the note at `note`,
/// both in map-plane coordinates
#[derive(Clone, Debug, PartialEq)]
pub struct Callout {
    pub label: String,
    pub subject: (f64, f64),
    pub note: (f64, f64),
}

type Builder = fn() -> Vec<Annotation>;

/// Indexed by `Season::index`
const BUILDERS: [Builder; 4] = [spring, summer, autumn, winter];

fn spring() -> Vec<Annotation> {
    vec![Annotation {
        label: "Very high death rate in New York and New Jersey",
        subject: Subject::State("NY"),
        dx: -150.0,
        dy: -100.0,
    }]
}

fn summer() -> Vec<Annotation> {
    vec![
        Annotation {
            label: "High death rate in the south",
            subject: Subject::State("TX"),
            dx: 150.0,
            dy: 100.0,
        },
        Annotation {
            label: "Lower death rate in general",
            subject: Subject::Fixed(1020.0, 100.0),
            dx: -50.0,
            dy: -100.0,
        },
    ]
}

fn autumn() -> Vec<Annotation> {
    vec![
        Annotation {
            label: "Lower death rate on the coasts",
            subject: Subject::State("NY"),
            dx: -100.0,
            dy: -100.0,
        },
        Annotation {
            label: "Lower death rate on the coasts",
            subject: Subject::State("CA"),
            dx: -100.0,
            dy: 50.0,
        },
    ]
}

fn winter() -> Vec<Annotation> {
    vec![Annotation {
        label: "Higher death rate in general",
        subject: Subject::Fixed(1020.0, 100.0),
        dx: -50.0,
        dy: -100.0,
    }]
}

pub fn annotations_for(season: Season) -> Vec<Annotation> {
    BUILDERS[season.index()]()
}

/// Center of a feature's bounding box
pub fn bbox_center(feature: &GeoFeature) -> Option<(f64, f64)> {
    feature.geometry.bounding_rect().map(|r| {
        let c = r.center();
        (c.x, c.y)
    })
}

/// Resolve the target's callouts. Unknown targets get none; a callout
/// whose subject state is absent from either source is dropped.
pub fn callouts(target: &Target, joined: &JoinedData, features: &[GeoFeature]) -> Vec<Callout> {
    let Some(season) = target.season else {
        return Vec::new();
    };

    annotations_for(season)
        .into_iter()
        .filter_map(|a| {
            let subject = match a.subject {
                Subject::Fixed(x, y) => (x, y),
                Subject::State(abbr) => {
                    let resolved = joined
                        .name_for_abbreviation(abbr)
                        .and_then(|name| joined.geometry_of(name))
                        .and_then(|idx| features.get(idx))
                        .and_then(bbox_center);
                    match resolved {
                        Some(center) => center,
                        None => {
                            tracing::warn!(state = abbr, %season, "annotation subject not found, dropping callout");
                            return None;
                        }
                    }
                }
            };
            Some(Callout {
                label: a.label.to_string(),
                subject,
                note: (subject.0 + a.dx, subject.1 + a.dy),
            })
        })
        .collect()
}
