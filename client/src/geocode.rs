//! Geocoding API: place names to locations and back

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::base::{self, Base, BoundingBox, FeatureCollection, Location, Params};
use crate::error::Result;

const API_NAME: &str = "geocoding";
const API_VERSION: &str = "v5";
const API_MODE: &str = "mapbox.places";

/// Feature types a lookup can be limited to
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Type {
    Country,
    Region,
    Postcode,
    District,
    Place,
    Locality,
    Neighborhood,
    Address,
    Poi,
}

impl Type {
    pub fn as_str(&self) -> &'static str {
        match self {
            Type::Country => "country",
            Type::Region => "region",
            Type::Postcode => "postcode",
            Type::District => "district",
            Type::Place => "place",
            Type::Locality => "locality",
            Type::Neighborhood => "neighborhood",
            Type::Address => "address",
            Type::Poi => "poi",
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, Default)]
pub struct ForwardRequestOpts {
    /// ISO 3166 alpha 2 country codes, comma separated
    pub country: Option<String>,
    /// Bias results towards this location
    pub proximity: Option<Location>,
    pub types: Vec<Type>,
    pub autocomplete: Option<bool>,
    pub bbox: Option<BoundingBox>,
    pub limit: Option<u32>,
}

impl ForwardRequestOpts {
    pub fn to_params(&self) -> Params {
        let mut params = Params::new();
        if let Some(country) = &self.country {
            params.push(("country".into(), country.clone()));
        }
        if let Some(p) = &self.proximity {
            params.push((
                "proximity".into(),
                format!("{},{}", p.longitude, p.latitude),
            ));
        }
        if !self.types.is_empty() {
            params.push(("types".into(), base::join(&self.types, ",")));
        }
        if let Some(autocomplete) = self.autocomplete {
            params.push(("autocomplete".into(), autocomplete.to_string()));
        }
        if let Some(bbox) = &self.bbox {
            params.push(("bbox".into(), bbox.to_param()));
        }
        if let Some(limit) = self.limit {
            params.push(("limit".into(), limit.to_string()));
        }
        params
    }
}

#[derive(Clone, Debug, Default)]
pub struct ReverseRequestOpts {
    pub types: Vec<Type>,
    pub limit: Option<u32>,
}

impl ReverseRequestOpts {
    pub fn to_params(&self) -> Params {
        let mut params = Params::new();
        if !self.types.is_empty() {
            params.push(("types".into(), base::join(&self.types, ",")));
        }
        if let Some(limit) = self.limit {
            params.push(("limit".into(), limit.to_string()));
        }
        params
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct ForwardResponse {
    #[serde(flatten)]
    pub collection: FeatureCollection,
    #[serde(default)]
    pub query: Vec<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct ReverseResponse {
    #[serde(flatten)]
    pub collection: FeatureCollection,
    #[serde(default)]
    pub query: Vec<f64>,
}

/// Geocoding API wrapper
pub struct Geocode {
    base: Arc<Base>,
}

impl Geocode {
    pub fn new(base: Arc<Base>) -> Self {
        Self { base }
    }

    /// Find locations matching a place name
    pub fn forward(&self, place: &str, opts: &ForwardRequestOpts) -> Result<ForwardResponse> {
        self.base.query(
            API_NAME,
            API_VERSION,
            API_MODE,
            &forward_query(place),
            &opts.to_params(),
        )
    }

    /// Find place names near a location
    pub fn reverse(&self, loc: &Location, opts: &ReverseRequestOpts) -> Result<ReverseResponse> {
        self.base.query(
            API_NAME,
            API_VERSION,
            API_MODE,
            &reverse_query(loc),
            &opts.to_params(),
        )
    }
}

fn forward_query(place: &str) -> String {
    format!("{}.json", place.trim().replace(' ', "+"))
}

fn reverse_query(loc: &Location) -> String {
    format!("{:.6},{:.6}.json", loc.longitude, loc.latitude)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_paths() {
        assert_eq!(forward_query("2 Lincoln Memorial Circle"), "2+Lincoln+Memorial+Circle.json");
        assert_eq!(
            reverse_query(&Location::new(-36.848461, 174.763336)),
            "174.763336,-36.848461.json"
        );
    }

    #[test]
    fn test_forward_params() {
        let opts = ForwardRequestOpts {
            country: Some("nz".into()),
            proximity: Some(Location::new(-36.5, 174.5)),
            types: vec![Type::Place, Type::Poi],
            autocomplete: Some(false),
            bbox: None,
            limit: Some(3),
        };
        let params = opts.to_params();
        assert_eq!(
            params,
            vec![
                ("country".to_string(), "nz".to_string()),
                ("proximity".to_string(), "174.5,-36.5".to_string()),
                ("types".to_string(), "place,poi".to_string()),
                ("autocomplete".to_string(), "false".to_string()),
                ("limit".to_string(), "3".to_string()),
            ]
        );
        assert!(ForwardRequestOpts::default().to_params().is_empty());
    }

    #[test]
    fn test_reverse_params() {
        let opts = ReverseRequestOpts {
            types: vec![Type::Address],
            limit: Some(1),
        };
        assert_eq!(
            opts.to_params(),
            vec![
                ("types".to_string(), "address".to_string()),
                ("limit".to_string(), "1".to_string()),
            ]
        );
    }

    #[test]
    fn test_parse_forward_response() {
        let body = r#"{
            "type": "FeatureCollection",
            "query": ["auckland"],
            "features": [{
                "id": "place.123",
                "type": "Feature",
                "place_type": ["place"],
                "relevance": 1,
                "properties": {"wikidata": "Q37100"},
                "text": "Auckland",
                "place_name": "Auckland, New Zealand",
                "bbox": [174.4, -37.1, 175.3, -36.6],
                "center": [174.76, -36.85],
                "geometry": {"type": "Point", "coordinates": [174.76, -36.85]},
                "context": [{"id": "country.1", "text": "New Zealand", "short_code": "nz"}]
            }],
            "attribution": "NOTICE"
        }"#;
        let response: ForwardResponse = serde_json::from_str(body).unwrap();

        assert_eq!(response.query, vec!["auckland"]);
        let feature = &response.collection.features[0];
        assert_eq!(feature.place_name, "Auckland, New Zealand");
        assert_eq!(feature.context[0].short_code.as_deref(), Some("nz"));
        assert_eq!(feature.center_location(), Some(Location::new(-36.85, 174.76)));
        assert!(feature.bbox.is_some());
    }

    #[test]
    fn test_parse_reverse_response() {
        let body = r#"{"type":"FeatureCollection","query":[174.76,-36.85],"features":[]}"#;
        let response: ReverseResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.query, vec![174.76, -36.85]);
        assert!(response.collection.features.is_empty());
    }
}
