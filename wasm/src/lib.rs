use indexmap::IndexMap;
use kaart_rs_renderer::{
    Basemap, BasemapLayer, MapDefinitions, MapRequest, MapType, OutputFormat, OverlaySpec,
    render_map,
};
use serde::Deserialize;
use wasm_bindgen::prelude::*;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct KaartRenderOptions {
    map_type: Option<String>,
    format: Option<String>,
    title: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    interactive: Option<bool>,
    data: Option<IndexMap<String, OverlaySpec>>,
    links: Option<IndexMap<String, String>>,
    tooltips: Option<IndexMap<String, String>>,
    link: Option<String>,
    target: Option<String>,
    link_highlighted_only: Option<bool>,
    /// Map definitions merged over the built-in defaults.
    definitions: Option<serde_json::Value>,
}

fn build_request(
    basemaps: &[&str],
    options: KaartRenderOptions,
) -> Result<(MapRequest, OutputFormat), String> {
    let map_type = match options.map_type.as_deref() {
        Some(name) => name.parse::<MapType>().map_err(|error| error.to_string())?,
        None => MapType::Municipalities,
    };
    let format = options
        .format
        .as_deref()
        .unwrap_or("svg")
        .parse::<OutputFormat>()
        .map_err(|error| error.to_string())?;
    if format.is_raster() {
        return Err(format!("{format} output is not available in the browser build"));
    }

    let layers = basemaps
        .iter()
        .map(|source| BasemapLayer::parse(source))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|error| error.to_string())?;
    let mut definitions = MapDefinitions::default();
    if let Some(overlay) = options.definitions {
        definitions
            .merge_value(overlay)
            .map_err(|error| error.to_string())?;
    }

    let mut request = MapRequest::new(map_type, definitions, Basemap::merge_layers(layers));
    if let Some(width) = options.width {
        request.set_pixel_width(width);
    }
    if let Some(height) = options.height {
        request.set_pixel_height(height);
    }
    if let Some(title) = options.title {
        request.set_title(title);
    }
    request.set_interactive(options.interactive.unwrap_or(false));
    if let Some(data) = options.data {
        request.set_data(data);
    }
    if let Some(links) = options.links {
        request.set_links(links, options.target.as_deref());
    }
    if let Some(tooltips) = options.tooltips {
        request.set_tooltips(tooltips);
    }
    if let Some(template) = options.link {
        if options.link_highlighted_only.unwrap_or(false) {
            request.set_link_highlighted(template, options.target.as_deref());
        } else {
            request.set_link(template, options.target.as_deref());
        }
    }
    Ok((request, format))
}

fn render(basemaps: &[&str], options_json: Option<String>) -> Result<String, String> {
    let options = match options_json {
        Some(raw_options) => serde_json::from_str::<KaartRenderOptions>(&raw_options)
            .map_err(|error| error.to_string())?,
        None => KaartRenderOptions::default(),
    };
    let (request, format) = build_request(basemaps, options)?;
    let rendered = render_map(&request, format).map_err(|error| error.to_string())?;
    String::from_utf8(rendered.bytes).map_err(|error| error.to_string())
}

/// Renders a map from one basemap GeoJSON document.
#[wasm_bindgen]
pub fn render_kaart(basemap_json: &str, options_json: Option<String>) -> Result<String, JsValue> {
    render(&[basemap_json], options_json).map_err(|error| JsValue::from_str(&error))
}

/// Renders a map from a base layer plus extra layers drawn over it.
#[wasm_bindgen]
pub fn render_kaart_layers(
    basemap_json: &str,
    additional_json: Vec<String>,
    options_json: Option<String>,
) -> Result<String, JsValue> {
    let mut basemaps = vec![basemap_json];
    basemaps.extend(additional_json.iter().map(String::as_str));
    render(&basemaps, options_json).map_err(|error| JsValue::from_str(&error))
}
