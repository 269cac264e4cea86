//! Value types shared between API modules

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A geographic location in degrees
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Location {
    #[serde(rename = "lat")]
    pub latitude: f64,
    #[serde(rename = "lng")]
    pub longitude: f64,
}

impl Location {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// Area spanned by two corner locations, in any order
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(from = "[f64; 4]")]
pub struct BoundingBox {
    pub a: Location,
    pub b: Location,
}

impl BoundingBox {
    pub fn new(a: Location, b: Location) -> Self {
        Self { a, b }
    }

    /// South-west corner
    pub fn min(&self) -> Location {
        Location::new(
            self.a.latitude.min(self.b.latitude),
            self.a.longitude.min(self.b.longitude),
        )
    }

    /// North-east corner
    pub fn max(&self) -> Location {
        Location::new(
            self.a.latitude.max(self.b.latitude),
            self.a.longitude.max(self.b.longitude),
        )
    }

    /// `minLng,minLat,maxLng,maxLat` as used by query strings
    pub fn to_param(&self) -> String {
        let (min, max) = (self.min(), self.max());
        format!(
            "{:.6},{:.6},{:.6},{:.6}",
            min.longitude, min.latitude, max.longitude, max.latitude
        )
    }
}

impl From<[f64; 4]> for BoundingBox {
    fn from(v: [f64; 4]) -> Self {
        Self::new(Location::new(v[1], v[0]), Location::new(v[3], v[2]))
    }
}

/// GeoJSON point geometry
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct PointGeometry {
    #[serde(rename = "type")]
    pub kind: String,
    pub coordinates: Vec<f64>,
}

/// GeoJSON line string geometry
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct LineString {
    #[serde(rename = "type", default)]
    pub kind: String,
    /// `[lng, lat]` pairs
    pub coordinates: Vec<[f64; 2]>,
}

impl LineString {
    pub fn locations(&self) -> Vec<Location> {
        self.coordinates
            .iter()
            .map(|[lng, lat]| Location::new(*lat, *lng))
            .collect()
    }
}

/// Route or match geometry, depending on the requested `geometries` option
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RouteGeometry {
    EncodedPolyline(String),
    GeoJson(LineString),
}

impl RouteGeometry {
    fn variant_name(&self) -> &'static str {
        match self {
            RouteGeometry::EncodedPolyline(_) => "polyline",
            RouteGeometry::GeoJson(_) => "geojson",
        }
    }

    /// The encoded polyline, if the geometry was requested as polyline
    pub fn polyline(&self) -> Result<&str> {
        match self {
            RouteGeometry::EncodedPolyline(line) => Ok(line),
            other => Err(Error::TypeMismatch {
                expected: "polyline",
                found: other.variant_name(),
            }),
        }
    }

    /// The line string, if the geometry was requested as geojson
    pub fn line_string(&self) -> Result<&LineString> {
        match self {
            RouteGeometry::GeoJson(line) => Ok(line),
            other => Err(Error::TypeMismatch {
                expected: "geojson",
                found: other.variant_name(),
            }),
        }
    }
}

/// Hierarchical context of a geocoded feature
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Context {
    pub id: String,
    pub text: String,
    pub short_code: Option<String>,
    pub wikidata: Option<String>,
}

/// GeoJSON feature returned by the geocoding API
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Feature {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub text: String,
    pub place_name: String,
    pub place_type: Vec<String>,
    pub relevance: f64,
    pub properties: HashMap<String, serde_json::Value>,
    pub bbox: Option<BoundingBox>,
    pub center: Vec<f64>,
    pub geometry: PointGeometry,
    pub context: Vec<Context>,
}

impl Feature {
    /// The feature centre as a location
    pub fn center_location(&self) -> Option<Location> {
        match self.center.as_slice() {
            [lng, lat] => Some(Location::new(*lat, *lng)),
            _ => None,
        }
    }
}

/// GeoJSON feature collection
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct FeatureCollection {
    #[serde(rename = "type")]
    pub kind: String,
    pub features: Vec<Feature>,
    pub attribution: String,
}
