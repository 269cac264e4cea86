//! Map matching API: snap noisy traces to the road network

use std::sync::Arc;

use serde::Deserialize;

use crate::base::{self, Base, Location, Params, RouteGeometry};
use crate::directions::{Annotation, AnnotationType, GeometryType, OverviewType, RouteStep, RoutingProfile};
use crate::error::Result;

const API_NAME: &str = "matching";
const API_VERSION: &str = "v5";

#[derive(Clone, Debug, Default)]
pub struct RequestOpts {
    pub geometries: Option<GeometryType>,
    pub radiuses: Option<String>,
    pub steps: bool,
    pub overview: Option<OverviewType>,
    pub timestamps: Option<String>,
    pub annotations: Option<String>,
}

impl RequestOpts {
    /// Snapping radius in metres per trace point
    pub fn set_radiuses(&mut self, radiuses: &[u32]) {
        self.radiuses = Some(base::join(radiuses, ";"));
    }

    /// Unix timestamp per trace point
    pub fn set_timestamps(&mut self, timestamps: &[i64]) {
        self.timestamps = Some(base::join(timestamps, ";"));
    }

    pub fn set_annotations(&mut self, annotations: &[AnnotationType]) {
        self.annotations = Some(base::join(annotations, ","));
    }

    pub fn set_geometries(&mut self, geometries: GeometryType) {
        self.geometries = Some(geometries);
    }

    pub fn set_overview(&mut self, overview: OverviewType) {
        self.overview = Some(overview);
    }

    pub fn set_steps(&mut self, steps: bool) {
        self.steps = steps;
    }

    pub fn to_params(&self) -> Params {
        let mut params = Params::new();
        if let Some(geometries) = self.geometries {
            params.push(("geometries".into(), geometries.to_string()));
        }
        if let Some(radiuses) = &self.radiuses {
            params.push(("radiuses".into(), radiuses.clone()));
        }
        if self.steps {
            params.push(("steps".into(), "true".into()));
        }
        if let Some(overview) = self.overview {
            params.push(("overview".into(), overview.to_string()));
        }
        if let Some(timestamps) = &self.timestamps {
            params.push(("timestamps".into(), timestamps.clone()));
        }
        if let Some(annotations) = &self.annotations {
            params.push(("annotations".into(), annotations.clone()));
        }
        params
    }
}

/// Response from [`MapMatching::get_matching`]
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct MatchingResponse {
    pub code: String,
    pub matchings: Vec<Matching>,
    /// One entry per input point, `None` for points that could not be matched
    pub tracepoints: Vec<Option<TracePoint>>,
}

impl MatchingResponse {
    pub fn is_ok(&self) -> bool {
        self.code == "Ok"
    }
}

/// A matched route with its confidence
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Matching {
    /// 0 (low) to 1 (high)
    pub confidence: f64,
    pub distance: f64,
    pub duration: f64,
    pub geometry: Option<RouteGeometry>,
    pub legs: Vec<MatchingLeg>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct MatchingLeg {
    pub steps: Vec<RouteStep>,
    pub summary: String,
    pub duration: f64,
    pub distance: f64,
    pub annotation: Option<Annotation>,
}

/// Where an input point was matched
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct TracePoint {
    pub waypoint_index: Option<usize>,
    pub matchings_index: usize,
    pub alternatives_count: usize,
    /// `[lng, lat]`
    pub location: Vec<f64>,
    pub name: String,
}

/// Map matching API wrapper
pub struct MapMatching {
    base: Arc<Base>,
}

impl MapMatching {
    pub fn new(base: Arc<Base>) -> Self {
        Self { base }
    }

    /// Match a recorded path using the given profile
    pub fn get_matching(
        &self,
        path: &[Location],
        profile: RoutingProfile,
        opts: &RequestOpts,
    ) -> Result<MatchingResponse> {
        self.base.query(
            API_NAME,
            API_VERSION,
            profile.as_str(),
            &base::coordinate_path(path),
            &opts.to_params(),
        )
    }
}
