pub mod geojson;
pub mod kml;
#[cfg(feature = "bitmap")]
pub mod raster;
pub mod svg;

use crate::error::Result;
use crate::geometry::BasemapLayer;
use crate::request::{MapRequest, OutputFormat};
use crate::style::{ResolvedFeature, StyleTarget, ordered_features, resolve_feature};
use std::io::Write;
use std::path::Path;

/// Output-format specific drawing of resolved features.
pub trait Renderer {
    type Target: StyleTarget;

    fn begin_layer(&mut self, _layer: &BasemapLayer) -> Result<()> {
        Ok(())
    }

    fn draw_feature(
        &mut self,
        feature: ResolvedFeature<'_, <Self::Target as StyleTarget>::Style>,
    ) -> Result<()>;

    fn end_layer(&mut self, _layer: &BasemapLayer) -> Result<()> {
        Ok(())
    }
}

/// Feeds every layer of the request's basemap to a renderer, highlighted features last.
pub fn draw_basemap<R: Renderer>(renderer: &mut R, request: &MapRequest) -> Result<()> {
    for layer in request.basemap().layers() {
        renderer.begin_layer(layer)?;
        for feature in ordered_features(layer, request) {
            let resolved = resolve_feature::<R::Target>(feature, request)?;
            renderer.draw_feature(resolved)?;
        }
        renderer.end_layer(layer)?;
    }
    Ok(())
}

/// A rendered map document or image.
#[derive(Debug, Clone)]
pub struct RenderedMap {
    pub format: OutputFormat,
    pub bytes: Vec<u8>,
    /// `<area>` elements for an HTML image map; raster formats only.
    pub image_map: Option<String>,
}

impl RenderedMap {
    fn document(format: OutputFormat, document: String) -> Self {
        Self {
            format,
            bytes: document.into_bytes(),
            image_map: None,
        }
    }

    pub fn mime_type(&self) -> &'static str {
        self.format.mime_type()
    }
}

/// Renders the request in one output format.
///
/// # Errors
///
/// Fails on unresolvable overlay colors, raster encoding errors, and raster
/// formats when the crate is built without the `bitmap` feature.
pub fn render_map(request: &MapRequest, format: OutputFormat) -> Result<RenderedMap> {
    log::debug!(
        "Rendering {} map as {} ({}x{})",
        request.map_type(),
        format,
        request.width(),
        request.height()
    );
    match format {
        OutputFormat::Svg => Ok(RenderedMap::document(format, svg::render_svg(request)?)),
        OutputFormat::Kml => Ok(RenderedMap::document(format, kml::render_kml(request)?)),
        OutputFormat::Json => Ok(RenderedMap::document(
            format,
            geojson::render_geojson(request)?,
        )),
        OutputFormat::Png | OutputFormat::Gif | OutputFormat::Jpeg => render_raster(request, format),
    }
}

#[cfg(feature = "bitmap")]
fn render_raster(request: &MapRequest, format: OutputFormat) -> Result<RenderedMap> {
    let raster = raster::render_raster(request)?;
    let bytes = raster.encode(format)?;
    Ok(RenderedMap {
        format,
        bytes,
        image_map: Some(raster.image_map),
    })
}

#[cfg(not(feature = "bitmap"))]
fn render_raster(_request: &MapRequest, format: OutputFormat) -> Result<RenderedMap> {
    Err(crate::error::KaartError::UnsupportedFormat(
        format.to_string(),
    ))
}

/// Writes output to a file, or to stdout when no path is given.
pub fn write_output(bytes: &[u8], output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, bytes)?;
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(bytes)?;
            stdout.flush()?;
        }
    }
    Ok(())
}

/// Escapes text for a single-quoted ECMAScript string literal.
pub(crate) fn escape_js(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '\\' => escaped.push_str("\\\\"),
            '\'' => escaped.push_str("\\'"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            _ => escaped.push(ch),
        }
    }
    escaped
}
