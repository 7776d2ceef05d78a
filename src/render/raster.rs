//! Raster maps: a tiny-skia canvas with an optional HTML image map.

use super::{Renderer, draw_basemap};
use crate::color::{self, NONE};
use crate::config::BitmapFunction;
use crate::error::{KaartError, Result};
use crate::request::{MapRequest, OutputFormat};
use crate::style::{BitmapStyle, BitmapTarget, ResolvedFeature};
use crate::text_metrics::{font_database, text_width_or_estimate};
use crate::theme::{DEFAULT_RASTER_COLORS, RASTER_TITLE_COLOR, SVG_NAMESPACE};
use crate::transform::PixelGrid;
use crate::xml::{escape_attr, escape_text};
use indexmap::IndexMap;
use resvg::tiny_skia::{
    Color, FillRule, Paint, Path, PathBuilder, Pixmap, Rect, Stroke, Transform,
};
use std::io::Cursor;

/// Colors in use on one canvas, keyed by lowercase name.
#[derive(Debug, Default)]
struct Palette {
    colors: IndexMap<String, [u8; 3]>,
}

impl Palette {
    fn new(background: &str) -> Result<Self> {
        let mut palette = Self::default();
        palette.allocate(background)?;
        for name in DEFAULT_RASTER_COLORS {
            palette.allocate(name)?;
        }
        let gray = palette.colors.get("gray").copied();
        if let Some(gray) = gray {
            palette.colors.insert("grey".to_string(), gray);
        }
        Ok(palette)
    }

    fn allocate(&mut self, name: &str) -> Result<Option<[u8; 3]>> {
        let key = name.trim().to_ascii_lowercase();
        if key == NONE {
            return Ok(None);
        }
        if let Some(rgb) = self.colors.get(&key) {
            return Ok(Some(*rgb));
        }
        let rgb = color::parse_rgb(&key)?;
        self.colors.insert(key, rgb);
        Ok(Some(rgb))
    }

    /// Paint for a color name, `None` for `none`.
    fn paint(&mut self, name: &str) -> Result<Option<Paint<'static>>> {
        Ok(self.allocate(name)?.map(|[r, g, b]| {
            let mut paint = Paint::default();
            paint.set_color_rgba8(r, g, b, 255);
            paint.anti_alias = false;
            paint
        }))
    }
}

/// Pixel-centred path through `x0, y0, x1, y1, ...`.
fn pixel_path(points: &[i32], close: bool) -> Option<Path> {
    let mut builder = PathBuilder::new();
    for (index, pair) in points.chunks_exact(2).enumerate() {
        let (x, y) = (pair[0] as f32 + 0.5, pair[1] as f32 + 0.5);
        if index == 0 {
            builder.move_to(x, y);
        } else {
            builder.line_to(x, y);
        }
    }
    if close {
        builder.close();
    }
    builder.finish()
}

fn area_element(id: &str, points: &[i32], resolved: &ResolvedFeature<'_, BitmapStyle>) -> String {
    let coords = points
        .iter()
        .map(i32::to_string)
        .collect::<Vec<_>>()
        .join(",");
    let mut area = format!("<area shape=\"poly\" coords=\"{coords}\"");
    let mut push = |name: &str, value: Option<&str>| {
        if let Some(value) = value.filter(|value| !value.is_empty()) {
            area.push_str(&format!(" {name}=\"{}\"", escape_attr(value)));
        }
    };
    let hover = resolved.hover_text.as_deref();
    push("title", hover);
    push("alt", hover);
    if let Some(link) = &resolved.link {
        push("href", link.href.as_deref());
        push("target", link.target.as_deref());
        push("onclick", link.onclick.as_deref());
        push("onmouseover", link.onmouseover.as_deref());
        push("onmouseout", link.onmouseout.as_deref());
    }
    format!("{area} id=\"{}\" />\n", escape_attr(id))
}

struct RasterRenderer {
    pixmap: Pixmap,
    palette: Palette,
    grid: PixelGrid,
    basemap_interactive: bool,
    image_map: String,
}

impl RasterRenderer {
    fn draw_part(&mut self, points: &[i32], style: &BitmapStyle) -> Result<()> {
        let stroke = Stroke {
            width: self.grid.thickness(style.thickness_factor) as f32,
            ..Stroke::default()
        };
        let outline = self.palette.paint(&style.outline)?;
        let closed = style.function != BitmapFunction::Path;
        let Some(path) = pixel_path(points, closed) else {
            return Ok(());
        };
        let identity = Transform::identity();
        match style.function {
            BitmapFunction::Polygon | BitmapFunction::Path => {
                if let Some(outline) = &outline {
                    self.pixmap.stroke_path(&path, outline, &stroke, identity, None);
                }
            }
            BitmapFunction::FilledPolygon => {
                if let Some(outline) = &outline {
                    self.pixmap
                        .fill_path(&path, outline, FillRule::EvenOdd, identity, None);
                }
            }
            BitmapFunction::OutlinedPolygon => {
                if let Some(fill) = self.palette.paint(&style.fill)? {
                    self.pixmap
                        .fill_path(&path, &fill, FillRule::EvenOdd, identity, None);
                }
                if let Some(outline) = &outline {
                    self.pixmap.stroke_path(&path, outline, &stroke, identity, None);
                }
            }
        }
        Ok(())
    }
}

impl Renderer for RasterRenderer {
    type Target = BitmapTarget;

    fn draw_feature(&mut self, resolved: ResolvedFeature<'_, BitmapStyle>) -> Result<()> {
        let feature = resolved.feature;
        let mapped = self.basemap_interactive
            && (resolved.hover_text.is_some() || resolved.link.is_some());
        let multi = feature.geometry.is_multi();
        for (index, coords) in feature.geometry.parts().into_iter().enumerate() {
            let points = self.grid.to_pixels(coords);
            if points.len() < 4 {
                continue;
            }
            self.draw_part(&points, &resolved.style)?;
            if mapped {
                let id = if multi {
                    format!("{}_{index}", feature.id)
                } else {
                    feature.id.clone()
                };
                self.image_map.push_str(&area_element(&id, &points, &resolved));
            }
        }
        Ok(())
    }
}

/// A rendered canvas and the image map of its clickable areas.
pub struct RasterMap {
    pixmap: Pixmap,
    pub image_map: String,
}

impl RasterMap {
    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }

    /// Encodes the canvas as PNG, GIF or JPEG.
    pub fn encode(&self, format: OutputFormat) -> Result<Vec<u8>> {
        let image_format = match format {
            OutputFormat::Png => return self.pixmap.encode_png().map_err(KaartError::image),
            OutputFormat::Gif => image::ImageFormat::Gif,
            OutputFormat::Jpeg => image::ImageFormat::Jpeg,
            other => return Err(KaartError::UnsupportedFormat(other.to_string())),
        };
        let rgba: Vec<u8> = self
            .pixmap
            .pixels()
            .iter()
            .flat_map(|pixel| {
                let color = pixel.demultiply();
                [color.red(), color.green(), color.blue(), color.alpha()]
            })
            .collect();
        let buffer = image::RgbaImage::from_raw(self.width(), self.height(), rgba)
            .ok_or_else(|| KaartError::image("pixel buffer does not match the canvas size"))?;
        let image = match format {
            OutputFormat::Jpeg => {
                image::DynamicImage::ImageRgb8(image::DynamicImage::ImageRgba8(buffer).to_rgb8())
            }
            _ => image::DynamicImage::ImageRgba8(buffer),
        };
        let mut bytes = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut bytes), image_format)
            .map_err(KaartError::image)?;
        Ok(bytes)
    }
}

fn draw_frame(pixmap: &mut Pixmap, palette: &mut Palette) -> Result<()> {
    let (width, height) = (pixmap.width() as f32, pixmap.height() as f32);
    let Some(rect) = Rect::from_xywh(0.5, 0.5, width - 1.0, height - 1.0) else {
        return Ok(());
    };
    if let Some(black) = palette.paint("black")? {
        let stroke = Stroke {
            width: 1.0,
            ..Stroke::default()
        };
        pixmap.stroke_path(
            &PathBuilder::from_rect(rect),
            &black,
            &stroke,
            Transform::identity(),
            None,
        );
    }
    Ok(())
}

fn title_options() -> usvg::Options<'static> {
    usvg::Options {
        fontdb: font_database(),
        ..usvg::Options::default()
    }
}

fn draw_title(pixmap: &mut Pixmap, request: &MapRequest, grid: &PixelGrid) -> Result<()> {
    let settings = &request.definitions().map_settings;
    let title = request.title();
    let font_size = settings.svg_default_fontsize
        * settings.bitmap_title_fontsize_factor
        * settings.bitmap_fontsize_factor
        / grid.scale;
    let family = &settings.bitmap_title_font_family;
    let text_width = text_width_or_estimate(title, font_size as f32, family, true);
    let x = (f64::from(request.width()) - f64::from(text_width)) / 2.0;
    let y = (f64::from(request.height()) / settings.bitmap_title_y_factor).round();

    let svg = format!(
        "<svg xmlns=\"{SVG_NAMESPACE}\" width=\"{}\" height=\"{}\"><text x=\"{x}\" y=\"{y}\" font-family=\"{}\" font-size=\"{font_size}\" font-weight=\"bold\" fill=\"{RASTER_TITLE_COLOR}\">{}</text></svg>",
        pixmap.width(),
        pixmap.height(),
        escape_attr(family),
        escape_text(title),
    );
    let tree = usvg::Tree::from_str(&svg, &title_options()).map_err(KaartError::image)?;
    resvg::render(&tree, Transform::default(), &mut pixmap.as_mut());
    Ok(())
}

/// Draws the request on a raster canvas.
///
/// # Errors
///
/// Fails when the canvas cannot be allocated, a color cannot be resolved or
/// the title cannot be laid out.
pub fn render_raster(request: &MapRequest) -> Result<RasterMap> {
    let settings = &request.definitions().map_settings;
    let (width, height) = (request.width(), request.height());
    let titled = request.has_title();
    let grid = PixelGrid::new(settings, width, height, titled);

    let mut pixmap = Pixmap::new(width, height)
        .ok_or_else(|| KaartError::image(format!("cannot allocate a {width}x{height} canvas")))?;
    let mut palette = Palette::new(&settings.background_color)?;
    if let Some([r, g, b]) = palette.allocate(&settings.background_color)? {
        pixmap.fill(Color::from_rgba8(r, g, b, 255));
    }
    if settings.bitmap_outline {
        draw_frame(&mut pixmap, &mut palette)?;
    }

    let mut renderer = RasterRenderer {
        pixmap,
        palette,
        grid,
        basemap_interactive: settings.basemap_interactive,
        image_map: String::new(),
    };
    draw_basemap(&mut renderer, request)?;

    let mut pixmap = renderer.pixmap;
    if titled {
        draw_title(&mut pixmap, request, &grid)?;
    }
    log::debug!(
        "Raster map {}x{} with {} colors",
        width,
        height,
        renderer.palette.colors.len()
    );
    Ok(RasterMap {
        pixmap,
        image_map: renderer.image_map,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MapDefinitions;
    use crate::geometry::{Basemap, BasemapLayer};
    use crate::request::MapType;
    use crate::style::OverlaySpec;
    use indexmap::IndexMap;

    fn request() -> MapRequest {
        let layer = BasemapLayer::parse(
            r#"{"properties": {"name": "Gemeenten"}, "features": [
                {"properties": {"id": "g_0534", "name": "Hillegom", "path_type": "municipality"},
                 "geometry": {"type": "Polygon", "coordinates": [[[100000, 480000], [140000, 480000], [140000, 520000], [100000, 520000]]]}},
                {"properties": {"id": "g_0010", "name": "Delfzijl", "path_type": "municipality"},
                 "geometry": {"type": "MultiPolygon", "coordinates": [
                    [[[253000, 590000], [263000, 590000], [263000, 600000]]],
                    [[[240000, 570000], [250000, 570000], [250000, 580000]]]
                 ]}}
            ]}"#,
        )
        .unwrap();
        MapRequest::new(
            MapType::Municipalities,
            MapDefinitions::default(),
            Basemap::merge_layers(vec![layer]),
        )
    }

    fn pixel(map: &RasterMap, x: u32, y: u32) -> [u8; 3] {
        let color = map.pixmap.pixel(x, y).unwrap().demultiply();
        [color.red(), color.green(), color.blue()]
    }

    #[test]
    fn palette_starts_with_background_and_defaults() {
        let mut palette = Palette::new("white").unwrap();
        let names: Vec<&str> = palette.colors.keys().map(String::as_str).collect();
        assert_eq!(names[0], "white");
        assert_eq!(names[1..9], DEFAULT_RASTER_COLORS);
        assert_eq!(palette.colors["grey"], palette.colors["gray"]);
        assert!(palette.paint("none").unwrap().is_none());
        assert_eq!(palette.allocate("#FFC513").unwrap(), Some([0xFF, 0xC5, 0x13]));
        assert!(palette.allocate("nocolor").is_err());
    }

    #[test]
    fn highlighted_area_is_filled_with_the_overlay_color() {
        let mut request = request();
        request.set_data(IndexMap::from([(
            "g_0534".to_string(),
            OverlaySpec::Simple("FF13C5FF".to_string()),
        )]));
        let map = render_raster(&request).unwrap();
        let grid = PixelGrid::new(&request.definitions().map_settings, 640, 704, false);
        let centre = grid.to_pixels(&[120000.0, 500000.0]);
        assert_eq!(pixel(&map, centre[0] as u32, centre[1] as u32), [0xFF, 0xC5, 0x13]);
        assert_eq!(pixel(&map, 2, 2), [255, 255, 255]);
    }

    #[test]
    fn image_map_lists_areas_only_for_hover_or_links() {
        let map = render_raster(&request()).unwrap();
        assert!(map.image_map.is_empty());

        let mut request = request();
        request.set_interactive(true);
        request.set_link("http://www.example.com/?code=%s", None);
        let map = render_raster(&request).unwrap();
        let grid = PixelGrid::new(&request.definitions().map_settings, 640, 704, false);
        let coords = grid
            .to_pixels(&[100000.0, 480000.0, 140000.0, 480000.0, 140000.0, 520000.0, 100000.0, 520000.0])
            .iter()
            .map(i32::to_string)
            .collect::<Vec<_>>()
            .join(",");
        assert!(map.image_map.contains(&format!(
            "<area shape=\"poly\" coords=\"{coords}\" title=\"Hillegom\" alt=\"Hillegom\" href=\"http://www.example.com/?code=g_0534\" id=\"g_0534\" />\n"
        )));
        assert!(map.image_map.contains("id=\"g_0010_0\""));
        assert!(map.image_map.contains("id=\"g_0010_1\""));
        assert_eq!(map.image_map.lines().count(), 3);
        assert!(!map.image_map.contains("=\"\""));
    }

    #[test]
    fn tooltip_only_areas_are_not_links() {
        let mut request = request();
        request.set_tooltips(IndexMap::from([(
            "g_0534".to_string(),
            "Hillegom: 21.000 inwoners".to_string(),
        )]));
        let map = render_raster(&request).unwrap();
        assert_eq!(map.image_map.lines().count(), 1);
        assert!(map.image_map.contains(
            "title=\"Hillegom: 21.000 inwoners\" alt=\"Hillegom: 21.000 inwoners\" id=\"g_0534\" />"
        ));
        for attribute in ["href=", "target=", "onclick=", "onmouseover=", "onmouseout="] {
            assert!(!map.image_map.contains(attribute), "{attribute}");
        }
    }

    #[test]
    fn frame_is_drawn_in_black_when_enabled() {
        let mut request = request();
        let mut definitions = MapDefinitions::default();
        definitions.map_settings.bitmap_outline = true;
        request.set_definitions(definitions);
        let map = render_raster(&request).unwrap();
        assert_eq!(pixel(&map, 0, 100), [0, 0, 0]);
        assert_eq!(pixel(&map, 100, 0), [0, 0, 0]);
    }

    #[test]
    fn encodes_all_raster_formats() {
        let map = render_raster(&request()).unwrap();
        let png = map.encode(OutputFormat::Png).unwrap();
        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
        let gif = map.encode(OutputFormat::Gif).unwrap();
        assert_eq!(&gif[..4], b"GIF8");
        let jpeg = map.encode(OutputFormat::Jpeg).unwrap();
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
        assert!(map.encode(OutputFormat::Svg).is_err());
    }

    #[test]
    fn title_is_drawn_with_the_measuring_fonts() {
        assert!(std::sync::Arc::ptr_eq(&title_options().fontdb, &font_database()));
    }

    #[test]
    fn title_leaves_the_canvas_size_alone() {
        let mut request = request();
        request.set_title("Gemeenten van Nederland");
        let map = render_raster(&request).unwrap();
        assert_eq!((map.width(), map.height()), (640, 704));
    }
}
