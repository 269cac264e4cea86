//! Surface API: point queries against vector tile layers (e.g. elevation contours)

use std::sync::Arc;

use serde::Deserialize;

use crate::base::{self, Base, Location, Params};
use crate::error::Result;

const API_NAME: &str = "surface";
const API_VERSION: &str = "v4";
const MAP_ID: &str = "mapbox.mapbox-terrain-v2";

#[derive(Clone, Debug)]
pub struct RequestOpts {
    pub layer: String,
    pub fields: String,
    pub geojson: bool,
    /// `lng,lat;lng,lat` list, see [`RequestOpts::set_points`]
    pub points: Option<String>,
    pub encoded_polyline: Option<String>,
    pub zoom: Option<u8>,
    pub interpolate: bool,
}

impl Default for RequestOpts {
    fn default() -> Self {
        Self {
            layer: "contour".into(),
            fields: "ele,index".into(),
            geojson: false,
            points: None,
            encoded_polyline: None,
            zoom: None,
            interpolate: false,
        }
    }
}

impl RequestOpts {
    pub fn set_points(&mut self, points: &[Location]) {
        self.points = Some(base::coordinate_path(points));
    }

    pub fn to_params(&self) -> Params {
        let mut params: Params = vec![
            ("layer".into(), self.layer.clone()),
            ("fields".into(), self.fields.clone()),
        ];
        if self.geojson {
            params.push(("geojson".into(), "true".into()));
        }
        if let Some(points) = &self.points {
            params.push(("points".into(), points.clone()));
        }
        if let Some(polyline) = &self.encoded_polyline {
            params.push(("encoded_polyline".into(), polyline.clone()));
        }
        if let Some(zoom) = self.zoom {
            params.push(("z".into(), zoom.to_string()));
        }
        if self.interpolate {
            params.push(("interpolate".into(), "true".into()));
        }
        params
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Response {
    pub results: Vec<SurfaceResult>,
    pub attribution: String,
}

/// A queried point and its elevation
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct SurfaceResult {
    pub id: u64,
    pub latlng: Location,
    #[serde(rename = "ele")]
    pub elevation: f64,
}

/// Surface API wrapper
pub struct Surface {
    base: Arc<Base>,
}

impl Surface {
    pub fn new(base: Arc<Base>) -> Self {
        Self { base }
    }

    /// Query elevation at a list of points
    pub fn query_points(&self, locations: &[Location], mut opts: RequestOpts) -> Result<Response> {
        opts.set_points(locations);
        self.query(&opts)
    }

    pub fn query(&self, opts: &RequestOpts) -> Result<Response> {
        self.base.query_json(&query_path(), &opts.to_params())
    }
}

fn query_path() -> String {
    format!("{}/{}/{}.json", API_VERSION, API_NAME, MAP_ID)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_path() {
        assert_eq!(query_path(), "v4/surface/mapbox.mapbox-terrain-v2.json");
    }

    #[test]
    fn test_params() {
        let mut opts = RequestOpts {
            zoom: Some(14),
            interpolate: true,
            ..Default::default()
        };
        opts.set_points(&[Location::new(-39.295182, 174.063668)]);
        assert_eq!(
            opts.to_params(),
            vec![
                ("layer".to_string(), "contour".to_string()),
                ("fields".to_string(), "ele,index".to_string()),
                ("points".to_string(), "174.063668,-39.295182".to_string()),
                ("z".to_string(), "14".to_string()),
                ("interpolate".to_string(), "true".to_string()),
            ]
        );
    }

    #[test]
    fn test_parse_response() {
        let body = r#"{
            "results": [{"id": 0, "latlng": {"lat": -39.295182, "lng": 174.063668}, "ele": 2500}],
            "attribution": "<a href=\"https://www.mapbox.com/about/maps/\">Mapbox</a>"
        }"#;
        let response: Response = serde_json::from_str(body).unwrap();
        assert_eq!(response.results[0].elevation, 2500.0);
        assert_eq!(response.results[0].latlng, Location::new(-39.295182, 174.063668));
    }
}
