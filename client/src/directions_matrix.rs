//! Directions matrix API: travel times between many points

use std::sync::Arc;

use serde::Deserialize;

use crate::base::{self, Base, Location, Params};
use crate::directions::{RoutingProfile, Waypoint};
use crate::error::Result;

const API_NAME: &str = "directions-matrix";
const API_VERSION: &str = "v1";

/// Which input locations act as sources or destinations
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub enum PointSelection {
    #[default]
    All,
    /// Indices into the request locations
    Indices(Vec<usize>),
}

impl PointSelection {
    fn to_param(&self) -> String {
        match self {
            PointSelection::All => "all".to_string(),
            PointSelection::Indices(indices) => base::join(indices, ";"),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct RequestOpts {
    pub sources: Option<PointSelection>,
    pub destinations: Option<PointSelection>,
}

impl RequestOpts {
    pub fn set_sources(&mut self, sources: PointSelection) {
        self.sources = Some(sources);
    }

    pub fn set_destinations(&mut self, destinations: PointSelection) {
        self.destinations = Some(destinations);
    }

    pub fn to_params(&self) -> Params {
        let mut params = Params::new();
        if let Some(sources) = &self.sources {
            params.push(("sources".into(), sources.to_param()));
        }
        if let Some(destinations) = &self.destinations {
            params.push(("destinations".into(), destinations.to_param()));
        }
        params
    }
}

/// Response from [`DirectionsMatrix::get_directions_matrix`]
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct DirectionMatrixResponse {
    pub code: String,
    /// Seconds from each source (row) to each destination (column), `None` when unroutable
    pub durations: Vec<Vec<Option<f64>>>,
    pub sources: Vec<Waypoint>,
    pub destinations: Vec<Waypoint>,
}

impl DirectionMatrixResponse {
    pub fn is_ok(&self) -> bool {
        self.code == "Ok"
    }
}

/// Directions matrix API wrapper
pub struct DirectionsMatrix {
    base: Arc<Base>,
}

impl DirectionsMatrix {
    pub fn new(base: Arc<Base>) -> Self {
        Self { base }
    }

    pub fn get_directions_matrix(
        &self,
        locations: &[Location],
        profile: RoutingProfile,
        opts: &RequestOpts,
    ) -> Result<DirectionMatrixResponse> {
        self.base.query(
            API_NAME,
            API_VERSION,
            profile.as_str(),
            &base::coordinate_path(locations),
            &opts.to_params(),
        )
    }
}
