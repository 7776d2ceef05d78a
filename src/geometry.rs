use crate::config::DEFAULT_PATH_TYPE;
use crate::error::{KaartError, Result};
use crate::request::MapType;
use indexmap::IndexMap;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Feature geometry as flat `x0, y0, x1, y1, ...` RD coordinate runs.
///
/// Polygons keep their outer ring only.
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    LineString(Vec<f64>),
    Polygon(Vec<f64>),
    MultiPolygon(Vec<Vec<f64>>),
}

impl Geometry {
    pub fn parts(&self) -> Vec<&[f64]> {
        match self {
            Geometry::LineString(coords) | Geometry::Polygon(coords) => vec![coords.as_slice()],
            Geometry::MultiPolygon(polygons) => polygons.iter().map(Vec::as_slice).collect(),
        }
    }

    pub fn is_multi(&self) -> bool {
        matches!(self, Geometry::MultiPolygon(_))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub id: String,
    pub name: Option<String>,
    pub path_type: String,
    pub geometry: Geometry,
}

/// One basemap document: features in document order plus attribution.
#[derive(Debug, Clone, Default)]
pub struct BasemapLayer {
    pub name: String,
    pub copyright: String,
    pub features: IndexMap<String, Feature>,
}

#[derive(Deserialize)]
struct RawDocument {
    features: Vec<RawFeature>,
    #[serde(default)]
    properties: RawLayerProperties,
}

#[derive(Deserialize, Default)]
struct RawLayerProperties {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    copyright: Vec<String>,
}

#[derive(Deserialize)]
struct RawFeature {
    #[serde(default)]
    properties: RawFeatureProperties,
    #[serde(default)]
    geometry: Option<RawGeometry>,
}

#[derive(Deserialize, Default)]
struct RawFeatureProperties {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    path_type: Option<String>,
}

#[derive(Deserialize)]
struct RawGeometry {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    coordinates: Value,
}

type Position = Vec<f64>;

fn flatten_ring(ring: &[Position]) -> Vec<f64> {
    ring.iter()
        .flat_map(|position| position.iter().take(2).copied())
        .collect()
}

fn outer_ring(polygon: &[Vec<Position>]) -> Vec<f64> {
    polygon
        .first()
        .map(|ring| flatten_ring(ring))
        .unwrap_or_default()
}

fn feature_id(value: Option<Value>) -> Option<String> {
    match value? {
        Value::String(id) => Some(id),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    }
}

impl BasemapLayer {
    /// Parses a GeoJSON document with RD coordinates.
    ///
    /// # Errors
    ///
    /// Returns [`KaartError::Parse`] when the document is not JSON, has no
    /// `features` array, or has coordinates of the wrong shape.
    pub fn parse(json: &str) -> Result<Self> {
        Self::parse_with_context(json, "basemap")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let layer = Self::parse_with_context(&contents, &path.display().to_string())?;
        log::debug!(
            "Loaded {} features from {}",
            layer.features.len(),
            path.display()
        );
        Ok(layer)
    }

    fn parse_with_context(json: &str, context: &str) -> Result<Self> {
        let document: RawDocument =
            serde_json::from_str(json).map_err(|err| KaartError::parse(context, err))?;
        let mut layer = BasemapLayer {
            name: document.properties.name.unwrap_or_default(),
            copyright: document
                .properties
                .copyright
                .into_iter()
                .next()
                .unwrap_or_default(),
            features: IndexMap::new(),
        };

        for raw in document.features {
            let Some(id) = feature_id(raw.properties.id) else {
                log::debug!("Skipping feature without id in {context}");
                continue;
            };
            let Some(geometry) = raw.geometry else {
                log::warn!("Skipping feature {id} without geometry in {context}");
                continue;
            };
            let Some(geometry) = parse_geometry(geometry, context)? else {
                log::warn!("Skipping feature {id} with unsupported geometry in {context}");
                continue;
            };
            let feature = Feature {
                id: id.clone(),
                name: raw.properties.name,
                path_type: raw
                    .properties
                    .path_type
                    .unwrap_or_else(|| DEFAULT_PATH_TYPE.to_string()),
                geometry,
            };
            layer.features.shift_remove(&id);
            layer.features.insert(id, feature);
        }
        Ok(layer)
    }
}

fn coordinates<T: DeserializeOwned>(value: Value, context: &str) -> Result<T> {
    serde_json::from_value(value).map_err(|err| KaartError::parse(context, err))
}

fn parse_geometry(raw: RawGeometry, context: &str) -> Result<Option<Geometry>> {
    let geometry = match raw.kind.as_str() {
        "LineString" => {
            let line: Vec<Position> = coordinates(raw.coordinates, context)?;
            Geometry::LineString(flatten_ring(&line))
        }
        "Polygon" => {
            let polygon: Vec<Vec<Position>> = coordinates(raw.coordinates, context)?;
            Geometry::Polygon(outer_ring(&polygon))
        }
        "MultiPolygon" => {
            let polygons: Vec<Vec<Vec<Position>>> = coordinates(raw.coordinates, context)?;
            Geometry::MultiPolygon(polygons.iter().map(|polygon| outer_ring(polygon)).collect())
        }
        _ => return Ok(None),
    };
    Ok(Some(geometry))
}

/// Ordered basemap layers, base layer first.
#[derive(Debug, Clone, Default)]
pub struct Basemap {
    layers: Vec<BasemapLayer>,
}

impl Basemap {
    pub fn merge_layers(layers: Vec<BasemapLayer>) -> Self {
        Self { layers }
    }

    pub fn load(base: &Path, additional: &[PathBuf]) -> Result<Self> {
        let mut layers = vec![BasemapLayer::load(base)?];
        for path in additional {
            layers.push(BasemapLayer::load(path)?);
        }
        Ok(Self::merge_layers(layers))
    }

    /// Loads the default coordinate files for a map type from `coords_dir`.
    pub fn for_map_type(coords_dir: &Path, map_type: MapType) -> Result<Self> {
        let mut files = map_type
            .basemap_files()
            .iter()
            .map(|file| coords_dir.join(file));
        let Some(base) = files.next() else {
            return Ok(Self::default());
        };
        let additional: Vec<PathBuf> = files.collect();
        Self::load(&base, &additional)
    }

    pub fn push_layer(&mut self, layer: BasemapLayer) {
        self.layers.push(layer);
    }

    pub fn layers(&self) -> &[BasemapLayer] {
        &self.layers
    }

    /// Non-empty copyright strings, deduplicated, in layer order.
    pub fn copyrights(&self) -> Vec<&str> {
        let mut copyrights: Vec<&str> = Vec::new();
        for layer in &self.layers {
            let copyright = layer.copyright.as_str();
            if !copyright.is_empty() && !copyrights.contains(&copyright) {
                copyrights.push(copyright);
            }
        }
        copyrights
    }

    /// Ids and names of all named features; later layers override earlier names.
    pub fn possible_areas(&self) -> IndexMap<String, String> {
        let mut areas = IndexMap::new();
        for feature in self.layers.iter().flat_map(|layer| layer.features.values()) {
            if let Some(name) = &feature.name {
                areas.insert(feature.id.clone(), name.clone());
            }
        }
        areas
    }
}
