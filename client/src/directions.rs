//! Directions API: routes between waypoints

use std::fmt;
use std::sync::Arc;

use serde::Deserialize;

use crate::base::{self, Base, Location, Params, RouteGeometry};
use crate::error::{Error, Result};

const API_NAME: &str = "directions";
const API_VERSION: &str = "v5";

/// Routing mode, shared by the directions, matrix and map matching APIs
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum RoutingProfile {
    /// Automotive routing using current and historic traffic
    DrivingTraffic,
    Driving,
    Walking,
    Cycling,
}

impl RoutingProfile {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoutingProfile::DrivingTraffic => "mapbox/driving-traffic",
            RoutingProfile::Driving => "mapbox/driving",
            RoutingProfile::Walking => "mapbox/walking",
            RoutingProfile::Cycling => "mapbox/cycling",
        }
    }
}

impl fmt::Display for RoutingProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Encoding of returned geometries
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum GeometryType {
    GeoJson,
    /// Polyline with 5 digit precision
    Polyline,
    /// Polyline with 6 digit precision
    Polyline6,
}

impl fmt::Display for GeometryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            GeometryType::GeoJson => "geojson",
            GeometryType::Polyline => "polyline",
            GeometryType::Polyline6 => "polyline6",
        })
    }
}

/// Detail of the overview geometry
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum OverviewType {
    Full,
    Simplified,
    False,
}

impl fmt::Display for OverviewType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OverviewType::Full => "full",
            OverviewType::Simplified => "simplified",
            OverviewType::False => "false",
        })
    }
}

/// Per-segment metadata returned along a route
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AnnotationType {
    Duration,
    Distance,
    Speed,
}

impl fmt::Display for AnnotationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AnnotationType::Duration => "duration",
            AnnotationType::Distance => "distance",
            AnnotationType::Speed => "speed",
        })
    }
}

#[derive(Clone, Debug, Default)]
pub struct RequestOpts {
    pub alternatives: bool,
    pub geometries: Option<GeometryType>,
    pub overview: Option<OverviewType>,
    pub radiuses: Option<String>,
    pub steps: bool,
    pub continue_straight: Option<bool>,
    pub bearings: Option<String>,
    pub annotations: Option<String>,
}

impl RequestOpts {
    /// Maximum snapping distance per location, one entry per requested location
    pub fn set_radiuses(&mut self, radiuses: &[f64]) {
        self.radiuses = Some(base::join(radiuses, ";"));
    }

    /// Bearing and allowed deviation per location
    pub fn set_bearings(&mut self, angles: &[f64], deviations: &[f64]) -> Result<()> {
        if angles.len() != deviations.len() {
            return Err(Error::Configuration(format!(
                "bearing angles and deviations must have the same length ({} != {})",
                angles.len(),
                deviations.len()
            )));
        }
        let bearings: Vec<String> = angles
            .iter()
            .zip(deviations)
            .map(|(angle, deviation)| format!("{},{}", angle, deviation))
            .collect();
        self.bearings = Some(bearings.join(";"));
        Ok(())
    }

    pub fn set_annotations(&mut self, annotations: &[AnnotationType]) {
        self.annotations = Some(base::join(annotations, ","));
    }

    pub fn to_params(&self) -> Params {
        let mut params = Params::new();
        if self.alternatives {
            params.push(("alternatives".into(), "true".into()));
        }
        if let Some(geometries) = self.geometries {
            params.push(("geometries".into(), geometries.to_string()));
        }
        if let Some(overview) = self.overview {
            params.push(("overview".into(), overview.to_string()));
        }
        if let Some(radiuses) = &self.radiuses {
            params.push(("radiuses".into(), radiuses.clone()));
        }
        if self.steps {
            params.push(("steps".into(), "true".into()));
        }
        if let Some(continue_straight) = self.continue_straight {
            params.push(("continue_straight".into(), continue_straight.to_string()));
        }
        if let Some(bearings) = &self.bearings {
            params.push(("bearings".into(), bearings.clone()));
        }
        if let Some(annotations) = &self.annotations {
            params.push(("annotations".into(), annotations.clone()));
        }
        params
    }
}

/// Response from [`Directions::get_directions`]
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct DirectionResponse {
    pub code: String,
    pub waypoints: Vec<Waypoint>,
    pub routes: Vec<Route>,
}

impl DirectionResponse {
    pub fn is_ok(&self) -> bool {
        self.code == "Ok"
    }
}

/// An input point snapped to the road network
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Waypoint {
    pub name: String,
    /// `[lng, lat]`
    pub location: Vec<f64>,
}

/// A route through (potentially multiple) waypoints
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Route {
    pub distance: f64,
    pub duration: f64,
    pub weight: f64,
    pub geometry: Option<RouteGeometry>,
    pub legs: Vec<RouteLeg>,
}

/// A route between two waypoints
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct RouteLeg {
    pub distance: f64,
    pub duration: f64,
    pub steps: Vec<RouteStep>,
    pub summary: String,
    pub annotation: Option<Annotation>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Annotation {
    pub distance: Vec<f64>,
    pub duration: Vec<f64>,
    pub speed: Vec<f64>,
}

/// One maneuver and the travel to the following step
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct RouteStep {
    pub distance: f64,
    pub duration: f64,
    pub geometry: Option<RouteGeometry>,
    pub name: String,
    #[serde(rename = "ref")]
    pub reference: Option<String>,
    pub destinations: Option<String>,
    pub mode: TransportationMode,
    pub maneuver: StepManeuver,
    pub intersections: Vec<Intersection>,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportationMode {
    #[default]
    Driving,
    Walking,
    Ferry,
    Cycling,
    Unaccessible,
    #[serde(other)]
    Other,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Intersection {
    pub location: Vec<f64>,
    pub bearings: Vec<f64>,
    pub entry: Vec<bool>,
    #[serde(rename = "in")]
    pub in_bearing: Option<u32>,
    #[serde(rename = "out")]
    pub out_bearing: Option<u32>,
    pub lanes: Vec<Lane>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Lane {
    pub valid: bool,
    pub indications: Vec<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct StepManeuver {
    pub location: Vec<f64>,
    pub bearing_before: f64,
    pub bearing_after: f64,
    pub instruction: String,
    #[serde(rename = "type")]
    pub kind: String,
    /// e.g. `uturn`, `sharp right`, `slight left`
    pub modifier: Option<String>,
}

/// Directions API wrapper
pub struct Directions {
    base: Arc<Base>,
}

impl Directions {
    pub fn new(base: Arc<Base>) -> Self {
        Self { base }
    }

    /// Route between `locations` in order using the given profile
    pub fn get_directions(
        &self,
        locations: &[Location],
        profile: RoutingProfile,
        opts: &RequestOpts,
    ) -> Result<DirectionResponse> {
        self.base.query(
            API_NAME,
            API_VERSION,
            profile.as_str(),
            &base::coordinate_path(locations),
            &opts.to_params(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_bearings_checks_lengths() {
        let mut opts = RequestOpts::default();
        assert!(matches!(
            opts.set_bearings(&[45.0, 90.0], &[10.0]),
            Err(Error::Configuration(_))
        ));
        assert!(opts.bearings.is_none());

        opts.set_bearings(&[45.0, 90.0], &[10.0, 20.5]).unwrap();
        assert_eq!(opts.bearings.as_deref(), Some("45,10;90,20.5"));
    }

    #[test]
    fn test_params() {
        let mut opts = RequestOpts {
            alternatives: true,
            geometries: Some(GeometryType::GeoJson),
            overview: Some(OverviewType::Full),
            steps: true,
            ..Default::default()
        };
        opts.set_radiuses(&[50.0, 12.5]);
        opts.set_annotations(&[AnnotationType::Duration, AnnotationType::Speed]);

        assert_eq!(
            opts.to_params(),
            vec![
                ("alternatives".to_string(), "true".to_string()),
                ("geometries".to_string(), "geojson".to_string()),
                ("overview".to_string(), "full".to_string()),
                ("radiuses".to_string(), "50;12.5".to_string()),
                ("steps".to_string(), "true".to_string()),
                ("annotations".to_string(), "duration,speed".to_string()),
            ]
        );
        assert!(RequestOpts::default().to_params().is_empty());
    }

    #[test]
    fn test_coordinate_path() {
        let path = base::coordinate_path(&[
            Location::new(-36.848461, 174.763336),
            Location::new(-41.28646, 174.776236),
        ]);
        assert_eq!(path, "174.763336,-36.848461;174.776236,-41.286460");
        assert_eq!(RoutingProfile::Cycling.to_string(), "mapbox/cycling");
    }

    #[test]
    fn test_parse_response() {
        let body = r#"{
            "code": "Ok",
            "waypoints": [{"name": "Queen Street", "location": [174.76, -36.85]}],
            "routes": [{
                "distance": 1200.5,
                "duration": 300,
                "geometry": {"type": "LineString", "coordinates": [[174.76, -36.85], [174.77, -36.86]]},
                "legs": [{
                    "distance": 1200.5,
                    "duration": 300,
                    "summary": "Queen Street",
                    "annotation": {"speed": [4.0, 5.5]},
                    "steps": [{
                        "distance": 100,
                        "duration": 20,
                        "geometry": "_p~iF~ps|U",
                        "name": "Queen Street",
                        "mode": "driving",
                        "maneuver": {"location": [174.76, -36.85], "bearing_before": 0, "bearing_after": 90, "instruction": "Head east", "type": "depart"},
                        "intersections": [{"location": [174.76, -36.85], "bearings": [90], "entry": [true], "out": 0}]
                    }]
                }]
            }]
        }"#;
        let response: DirectionResponse = serde_json::from_str(body).unwrap();
        assert!(response.is_ok());

        let route = &response.routes[0];
        let line = route.geometry.as_ref().unwrap().line_string().unwrap();
        assert_eq!(line.coordinates.len(), 2);
        assert!(route.geometry.as_ref().unwrap().polyline().is_err());

        let step = &route.legs[0].steps[0];
        assert_eq!(step.geometry.as_ref().unwrap().polyline().unwrap(), "_p~iF~ps|U");
        assert_eq!(step.mode, TransportationMode::Driving);
        assert_eq!(step.maneuver.kind, "depart");
        assert_eq!(step.intersections[0].out_bearing, Some(0));
        assert_eq!(route.legs[0].annotation.as_ref().unwrap().speed, vec![4.0, 5.5]);
    }
}
