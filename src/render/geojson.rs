use super::{Renderer, draw_basemap};
use crate::config::JsonGeometryType;
use crate::error::{KaartError, Result};
use crate::request::MapRequest;
use crate::style::{JsonStyle, JsonTarget, ResolvedFeature};
use crate::transform::rd_to_lat_lon;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct FeatureCollection<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    features: Vec<JsonFeature>,
    #[serde(skip_serializing_if = "Option::is_none")]
    metadata: Option<Metadata<'a>>,
}

#[derive(Debug, Serialize)]
struct Metadata<'a> {
    copyright: Vec<&'a str>,
}

#[derive(Debug, Serialize)]
struct JsonFeature {
    #[serde(rename = "type")]
    kind: &'static str,
    properties: Properties,
    geometry: JsonGeometry,
}

#[derive(Debug, Serialize)]
struct Properties {
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    id: String,
    style: JsonStyle,
    #[serde(skip_serializing_if = "Option::is_none")]
    href: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    target: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    onclick: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    onmouseover: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    onmouseout: Option<String>,
}

type Position = [f64; 2];

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Coordinates {
    Line(Vec<Position>),
    Polygon(Vec<Vec<Position>>),
    MultiPolygon(Vec<Vec<Vec<Position>>>),
}

#[derive(Debug, Serialize)]
struct JsonGeometry {
    #[serde(rename = "type")]
    kind: &'static str,
    coordinates: Coordinates,
}

/// `[lon, lat]` positions for a flat RD coordinate run.
fn positions(coords: &[f64]) -> Vec<Position> {
    coords
        .chunks_exact(2)
        .map(|pair| {
            let (lat, lon) = rd_to_lat_lon(pair[0], pair[1]);
            [lon, lat]
        })
        .collect()
}

fn geometry(resolved: &ResolvedFeature<'_, JsonStyle>) -> JsonGeometry {
    let geometry = &resolved.feature.geometry;
    let parts = geometry.parts();
    if geometry.is_multi() {
        return JsonGeometry {
            kind: "MultiPolygon",
            coordinates: Coordinates::MultiPolygon(
                parts.into_iter().map(|ring| vec![positions(ring)]).collect(),
            ),
        };
    }
    let ring = parts.first().map(|ring| positions(ring)).unwrap_or_default();
    match resolved.style.geometry_type {
        JsonGeometryType::Polygon => JsonGeometry {
            kind: "Polygon",
            coordinates: Coordinates::Polygon(vec![ring]),
        },
        JsonGeometryType::LineString => JsonGeometry {
            kind: "LineString",
            coordinates: Coordinates::Line(ring),
        },
    }
}

#[derive(Default)]
struct GeoJsonRenderer {
    features: Vec<JsonFeature>,
}

impl Renderer for GeoJsonRenderer {
    type Target = JsonTarget;

    fn draw_feature(&mut self, resolved: ResolvedFeature<'_, JsonStyle>) -> Result<()> {
        let geometry = geometry(&resolved);
        let feature = resolved.feature;
        let link = resolved.link.unwrap_or_default();
        self.features.push(JsonFeature {
            kind: "Feature",
            properties: Properties {
                name: resolved.tooltip.or_else(|| feature.name.clone()),
                id: feature.id.clone(),
                style: resolved.style,
                href: link.href,
                target: link.target,
                onclick: link.onclick,
                onmouseover: link.onmouseover,
                onmouseout: link.onmouseout,
            },
            geometry,
        });
        Ok(())
    }
}

/// Renders the request as a GeoJSON FeatureCollection in WGS84 coordinates.
pub fn render_geojson(request: &MapRequest) -> Result<String> {
    let mut renderer = GeoJsonRenderer::default();
    draw_basemap(&mut renderer, request)?;

    let copyright = request.basemap().copyrights();
    let collection = FeatureCollection {
        kind: "FeatureCollection",
        features: renderer.features,
        metadata: (!copyright.is_empty()).then_some(Metadata { copyright }),
    };
    serde_json::to_string(&collection).map_err(|err| KaartError::Io(err.into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MapDefinitions;
    use crate::geometry::{Basemap, BasemapLayer};
    use crate::request::MapType;
    use crate::style::OverlaySpec;
    use indexmap::IndexMap;
    use serde_json::Value;

    fn request() -> MapRequest {
        let layer = BasemapLayer::parse(
            r#"{"properties": {"name": "Gemeenten", "copyright": ["CBS"]}, "features": [
                {"properties": {"id": "g_0534", "name": "Hillegom", "path_type": "municipality"},
                 "geometry": {"type": "Polygon", "coordinates": [[[100000, 480000], [101000, 480000], [101000, 481000]]]}},
                {"properties": {"id": "g_0010", "name": "Delfzijl", "path_type": "municipality"},
                 "geometry": {"type": "MultiPolygon", "coordinates": [
                    [[[253000, 590000], [254000, 590000], [254000, 591000]]],
                    [[[255000, 590000], [256000, 590000], [256000, 591000]]]
                 ]}},
                {"properties": {"id": "b_1", "path_type": "border"},
                 "geometry": {"type": "LineString", "coordinates": [[155000, 463000], [156000, 463000]]}}
            ]}"#,
        )
        .unwrap();
        MapRequest::new(
            MapType::Municipalities,
            MapDefinitions::default(),
            Basemap::merge_layers(vec![layer]),
        )
    }

    fn render(request: &MapRequest) -> Value {
        serde_json::from_str(&render_geojson(request).unwrap()).unwrap()
    }

    fn feature<'v>(json: &'v Value, id: &str) -> &'v Value {
        json["features"]
            .as_array()
            .unwrap()
            .iter()
            .find(|feature| feature["properties"]["id"] == id)
            .unwrap()
    }

    #[test]
    fn collection_carries_copyright_metadata() {
        let json = render(&request());
        assert_eq!(json["type"], "FeatureCollection");
        assert_eq!(json["metadata"]["copyright"][0], "CBS");
        assert_eq!(json["features"].as_array().unwrap().len(), 3);
    }

    #[test]
    fn highlighted_style_uses_html_colors() {
        let mut request = request();
        request.set_data(IndexMap::from([(
            "g_0534".to_string(),
            OverlaySpec::Simple("FF13C5FF".to_string()),
        )]));
        let json = render(&request);
        let hillegom = feature(&json, "g_0534");
        assert_eq!(hillegom["properties"]["name"], "Hillegom");
        assert_eq!(hillegom["properties"]["style"]["fill"], "#FFC513");
        assert_eq!(hillegom["properties"]["style"]["stroke"], "#808080");
        assert_eq!(hillegom["properties"]["style"]["stroke-width"], "200");
        assert!(hillegom["properties"].get("href").is_none());
        // highlighted features come last
        assert_eq!(json["features"][2]["properties"]["id"], "g_0534");
    }

    #[test]
    fn geometry_types_follow_the_feature_and_path_type() {
        let json = render(&request());
        let hillegom = feature(&json, "g_0534");
        assert_eq!(hillegom["geometry"]["type"], "Polygon");
        assert_eq!(hillegom["geometry"]["coordinates"][0].as_array().unwrap().len(), 3);
        let delfzijl = feature(&json, "g_0010");
        assert_eq!(delfzijl["geometry"]["type"], "MultiPolygon");
        assert_eq!(delfzijl["geometry"]["coordinates"].as_array().unwrap().len(), 2);
        let border = feature(&json, "b_1");
        assert_eq!(border["geometry"]["type"], "LineString");
        let first = &border["geometry"]["coordinates"][0];
        assert!((first[0].as_f64().unwrap() - 5.387638889).abs() < 1e-9);
        assert!((first[1].as_f64().unwrap() - 52.156160556).abs() < 1e-9);
        assert!(border["properties"].get("name").is_none());
    }

    #[test]
    fn links_and_tooltips_become_properties() {
        let mut request = request();
        request.set_link("http://www.example.com/?code=%s", Some("_blank"));
        request.set_tooltips(IndexMap::from([("g_0534".to_string(), "Hillegom: 21.000".to_string())]));
        let json = render(&request);
        let hillegom = feature(&json, "g_0534");
        assert_eq!(hillegom["properties"]["href"], "http://www.example.com/?code=g_0534");
        assert_eq!(hillegom["properties"]["target"], "_blank");
        assert_eq!(hillegom["properties"]["name"], "Hillegom: 21.000");
    }
}
