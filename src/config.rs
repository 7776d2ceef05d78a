use crate::error::{KaartError, Result};
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

/// Path type used for features that do not declare one.
pub const DEFAULT_PATH_TYPE: &str = "default";

static FALLBACK_PATH_STYLE: Lazy<PathTypeStyle> = Lazy::new(PathTypeStyle::default);

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MapSettings {
    pub width: u32,
    pub height_factor: f64,
    /// Whether areas of this basemap get hover text and image map entries at all.
    pub basemap_interactive: bool,
    pub background_color: String,
    pub svg_default_fontsize: f64,
    pub svg_viewbox_width: f64,
    pub svg_viewbox_height: f64,
    pub svg_translate_x: f64,
    pub svg_translate_y: f64,
    pub svg_scale_x: f64,
    pub svg_scale_y: f64,
    /// Added to the viewBox height when the map has a title.
    pub svg_title_extra_space: f64,
    /// Added to the map translation and tooltip position when the map has a title.
    pub svg_title_map_shift: f64,
    pub svg_title_x: f64,
    pub svg_title_y: f64,
    pub svg_title_fontsize: f64,
    pub svg_tooltip_x: f64,
    pub svg_tooltip_y: f64,
    #[serde(rename = "svg_tooltip_text-anchor", alias = "svg_tooltip_text_anchor")]
    pub svg_tooltip_text_anchor: String,
    pub bitmap_size_factor: f64,
    pub bitmap_smaller_bitmap_factor: f64,
    pub bitmap_fontsize_factor: f64,
    pub bitmap_title_y_factor: f64,
    pub bitmap_title_fontsize_factor: f64,
    pub bitmap_extra_pixels_factor: f64,
    pub bitmap_map_downward_factor: f64,
    pub bitmap_rd2pixel_x: f64,
    pub bitmap_rd2pixel_y: f64,
    pub bitmap_outline: bool,
    pub bitmap_title_font_family: String,
}

impl Default for MapSettings {
    fn default() -> Self {
        Self {
            width: 640,
            height_factor: 1.1,
            basemap_interactive: true,
            background_color: "white".to_string(),
            svg_default_fontsize: 10000.0,
            svg_viewbox_width: 288051.0,
            svg_viewbox_height: 322430.0,
            svg_translate_x: 2000.0,
            svg_translate_y: 626000.0,
            svg_scale_x: 1.0,
            svg_scale_y: -1.0,
            svg_title_extra_space: 78000.0,
            svg_title_map_shift: 40000.0,
            svg_title_x: 144000.0,
            svg_title_y: 30000.0,
            svg_title_fontsize: 14000.0,
            svg_tooltip_x: 20000.0,
            svg_tooltip_y: 20000.0,
            svg_tooltip_text_anchor: "start".to_string(),
            bitmap_size_factor: 540.0,
            bitmap_smaller_bitmap_factor: 10.0,
            bitmap_fontsize_factor: 0.5,
            bitmap_title_y_factor: 20.0,
            bitmap_title_fontsize_factor: 1.5,
            bitmap_extra_pixels_factor: 9.0,
            bitmap_map_downward_factor: 20.0,
            bitmap_rd2pixel_x: 3000.0,
            bitmap_rd2pixel_y: 622000.0,
            bitmap_outline: false,
            bitmap_title_font_family: "DejaVu Sans, Arial, Helvetica, sans-serif".to_string(),
        }
    }
}

impl MapSettings {
    pub fn height_for_width(&self, width: u32) -> u32 {
        (f64::from(width) * self.height_factor).round() as u32
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KmlLookAt {
    pub longitude: f64,
    pub latitude: f64,
    pub altitude: f64,
    pub range: f64,
    pub tilt: f64,
    pub heading: f64,
}

impl Default for KmlLookAt {
    fn default() -> Self {
        Self {
            longitude: 5.3,
            latitude: 52.1,
            altitude: 0.0,
            range: 300000.0,
            tilt: 0.0,
            heading: 0.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KmlDefaults {
    pub default_polygon_style_name: String,
    pub default_linestyle_linewidth: f64,
    pub default_linestyle_color: String,
    pub default_polystyle_color: String,
}

impl Default for KmlDefaults {
    fn default() -> Self {
        Self {
            default_polygon_style_name: "default_polygon".to_string(),
            default_linestyle_linewidth: 1.0,
            default_linestyle_color: "ff808080".to_string(),
            default_polystyle_color: "00ffffff".to_string(),
        }
    }
}

/// Raster drawing primitive for a path type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BitmapFunction {
    /// Closed outline only.
    #[serde(rename = "imagepolygon")]
    Polygon,
    /// Filled with the outline color.
    #[serde(rename = "imagefilledpolygon")]
    FilledPolygon,
    /// Open polyline.
    #[serde(rename = "imagepath")]
    Path,
    /// Fill color first, then the outline.
    #[serde(rename = "outlinedpolygon")]
    OutlinedPolygon,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JsonGeometryType {
    Polygon,
    LineString,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathTypeStyle {
    pub svg_path_style: String,
    pub svg_path_closed: bool,
    pub svg_stroke_width: f64,
    pub bitmap_function: BitmapFunction,
    pub bitmap_thickness_factor: f64,
    /// Outline and fill in one color; `none` or absent means use outline/fill.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bitmap_color: Option<String>,
    pub bitmap_outline: String,
    pub bitmap_fill: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kml_linestyle_linewidth: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kml_linestyle_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kml_polystyle_color: Option<String>,
    pub json_geometry_type: JsonGeometryType,
}

impl Default for PathTypeStyle {
    fn default() -> Self {
        Self {
            svg_path_style: "fill:#FFFFFF;stroke:#808080;stroke-width:200;".to_string(),
            svg_path_closed: true,
            svg_stroke_width: 200.0,
            bitmap_function: BitmapFunction::OutlinedPolygon,
            bitmap_thickness_factor: 1.0,
            bitmap_color: None,
            bitmap_outline: "gray".to_string(),
            bitmap_fill: "white".to_string(),
            kml_linestyle_linewidth: None,
            kml_linestyle_color: None,
            kml_polystyle_color: None,
            json_geometry_type: JsonGeometryType::Polygon,
        }
    }
}

impl PathTypeStyle {
    fn outline(svg_style: &str, stroke_width: f64, color: &str, thickness: f64) -> Self {
        Self {
            svg_path_style: svg_style.to_string(),
            svg_stroke_width: stroke_width,
            bitmap_function: BitmapFunction::Polygon,
            bitmap_thickness_factor: thickness,
            bitmap_color: Some(color.to_string()),
            ..Default::default()
        }
    }

    /// Whether the KML renderer needs an inline style for non-highlighted features.
    pub fn has_kml_overrides(&self) -> bool {
        self.kml_linestyle_linewidth.is_some()
            || self.kml_linestyle_color.is_some()
            || self.kml_polystyle_color.is_some()
    }
}

fn default_path_types() -> IndexMap<String, PathTypeStyle> {
    let mut types = IndexMap::new();
    types.insert(DEFAULT_PATH_TYPE.to_string(), PathTypeStyle::default());
    types.insert("municipality".to_string(), PathTypeStyle::default());
    types.insert(
        "municipality_flanders".to_string(),
        PathTypeStyle {
            svg_path_style: "fill:#FFFFFF;stroke:#A0A0A0;stroke-width:200;".to_string(),
            ..Default::default()
        },
    );
    types.insert(
        "dialectarea".to_string(),
        PathTypeStyle {
            svg_path_style: "fill:#FFFFFF;stroke:#404040;stroke-width:300;".to_string(),
            svg_stroke_width: 300.0,
            bitmap_outline: "black".to_string(),
            ..Default::default()
        },
    );
    types.insert(
        "water".to_string(),
        PathTypeStyle {
            svg_path_style: "fill:#BFEFFF;stroke:#87CEEB;stroke-width:100;".to_string(),
            svg_stroke_width: 100.0,
            bitmap_function: BitmapFunction::FilledPolygon,
            bitmap_color: Some("lightblue".to_string()),
            kml_linestyle_color: Some("ffebce87".to_string()),
            kml_polystyle_color: Some("ffffefbf".to_string()),
            ..Default::default()
        },
    );
    let mut province = PathTypeStyle::outline(
        "fill:none;stroke:#000000;stroke-width:600;",
        600.0,
        "black",
        2.0,
    );
    province.kml_linestyle_linewidth = Some(3.0);
    province.kml_linestyle_color = Some("ff000000".to_string());
    province.kml_polystyle_color = Some("00ffffff".to_string());
    types.insert("province".to_string(), province);
    let mut corop = PathTypeStyle::outline(
        "fill:none;stroke:#800000;stroke-width:400;",
        400.0,
        "brown",
        1.5,
    );
    corop.kml_linestyle_linewidth = Some(2.0);
    corop.kml_linestyle_color = Some("ff000080".to_string());
    corop.kml_polystyle_color = Some("00ffffff".to_string());
    types.insert("corop".to_string(), corop);
    types.insert(
        "border".to_string(),
        PathTypeStyle {
            svg_path_style: "fill:none;stroke:#000000;stroke-width:400;".to_string(),
            svg_path_closed: false,
            svg_stroke_width: 400.0,
            bitmap_function: BitmapFunction::Path,
            bitmap_thickness_factor: 2.0,
            bitmap_color: Some("black".to_string()),
            kml_linestyle_linewidth: Some(2.0),
            kml_linestyle_color: Some("ff000000".to_string()),
            kml_polystyle_color: Some("00ffffff".to_string()),
            json_geometry_type: JsonGeometryType::LineString,
            ..Default::default()
        },
    );
    types
}

/// Map definitions: global settings plus per path-type default styles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapDefinitions {
    #[serde(default)]
    pub map_settings: MapSettings,
    #[serde(default)]
    pub kml_lookat: KmlLookAt,
    #[serde(default)]
    pub kml_defaults: KmlDefaults,
    #[serde(flatten)]
    pub path_types: IndexMap<String, PathTypeStyle>,
}

impl Default for MapDefinitions {
    fn default() -> Self {
        Self {
            map_settings: MapSettings::default(),
            kml_lookat: KmlLookAt::default(),
            kml_defaults: KmlDefaults::default(),
            path_types: default_path_types(),
        }
    }
}

impl MapDefinitions {
    /// Style for a path type, falling back to the `default` path type.
    pub fn path_style(&self, path_type: &str) -> &PathTypeStyle {
        if let Some(style) = self.path_types.get(path_type) {
            return style;
        }
        log::warn!("No styling defined for path type {path_type:?}, using defaults");
        self.path_types
            .get(DEFAULT_PATH_TYPE)
            .unwrap_or(&FALLBACK_PATH_STYLE)
    }

    /// Merges a definitions document over these definitions.
    ///
    /// Keys of an existing section are replaced one by one; sections that do
    /// not exist yet are added whole.
    pub fn merge_value(&mut self, overlay: Value) -> Result<()> {
        let Value::Object(overlay) = overlay else {
            return Err(KaartError::parse(
                "map definitions",
                "top level must be an object",
            ));
        };
        let mut base = serde_json::to_value(&*self)
            .map_err(|err| KaartError::parse("map definitions", err))?;
        let Some(base_sections) = base.as_object_mut() else {
            return Err(KaartError::parse(
                "map definitions",
                "defaults did not serialize to an object",
            ));
        };
        for (section, values) in overlay {
            match (base_sections.get_mut(&section), values) {
                (Some(Value::Object(existing)), Value::Object(values)) => {
                    existing.extend(values);
                }
                (_, values) => {
                    base_sections.insert(section, values);
                }
            }
        }
        *self = serde_json::from_value(base)
            .map_err(|err| KaartError::parse("map definitions", err))?;
        Ok(())
    }

    pub fn merge_str(&mut self, contents: &str) -> Result<()> {
        let parsed = json5::from_str::<Value>(contents)
            .map_err(|err| KaartError::parse("map definitions", err))?;
        self.merge_value(parsed)
    }
}

pub fn load_config(path: Option<&Path>) -> Result<MapDefinitions> {
    let mut definitions = MapDefinitions::default();
    let Some(path) = path else {
        return Ok(definitions);
    };

    let contents = std::fs::read_to_string(path)?;
    let parsed = json5::from_str::<Value>(&contents)
        .map_err(|err| KaartError::parse(path.display().to_string(), err))?;
    definitions.merge_value(parsed)?;
    log::debug!("Loaded map definitions from {}", path.display());
    Ok(definitions)
}
