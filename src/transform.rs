//! Conversions from RD (Rijksdriehoeksstelsel) coordinates to WGS84 and to raster pixels.

use crate::config::MapSettings;

const X0: f64 = 155000.0;
const Y0: f64 = 463000.0;
const F0: f64 = 52.156160556;
const L0: f64 = 5.387638889;

const A01: f64 = 3236.0331637;
const A20: f64 = -32.5915821;
const A02: f64 = -0.2472814;
const A21: f64 = -0.8501341;
const A03: f64 = -0.0655238;
const A22: f64 = -0.0171137;
const A40: f64 = 0.0052771;
const A23: f64 = -0.0003859;
const A41: f64 = 0.0003314;
const A04: f64 = 0.0000371;
const A42: f64 = 0.0000143;
const A24: f64 = -0.0000090;

const B10: f64 = 5261.3028966;
const B11: f64 = 105.9780241;
const B12: f64 = 2.4576469;
const B30: f64 = -0.8192156;
const B31: f64 = -0.0560092;
const B13: f64 = 0.0560089;
const B32: f64 = -0.0025614;
const B14: f64 = 0.0012770;
const B50: f64 = 0.0002574;
const B33: f64 = -0.0000973;
const B51: f64 = 0.0000293;
const B15: f64 = 0.0000291;

/// Converts RD coordinates to WGS84 `(latitude, longitude)` in degrees.
pub fn rd_to_lat_lon(x: f64, y: f64) -> (f64, f64) {
    let dx = (x - X0) * 1e-5;
    let dy = (y - Y0) * 1e-5;

    let dx2 = dx * dx;
    let dx3 = dx2 * dx;
    let dx4 = dx3 * dx;
    let dx5 = dx4 * dx;
    let dy2 = dy * dy;
    let dy3 = dy2 * dy;
    let dy4 = dy3 * dy;
    let dy5 = dy4 * dy;

    let df = A01 * dy
        + A20 * dx2
        + A02 * dy2
        + A21 * dx2 * dy
        + A03 * dy3
        + A40 * dx4
        + A22 * dx2 * dy2
        + A04 * dy4
        + A41 * dx4 * dy
        + A23 * dx2 * dy3
        + A42 * dx4 * dy2
        + A24 * dx2 * dy4;

    let dl = B10 * dx
        + B11 * dx * dy
        + B30 * dx3
        + B12 * dx * dy2
        + B31 * dx3 * dy
        + B13 * dx * dy3
        + B50 * dx5
        + B32 * dx3 * dy2
        + B14 * dx * dy4
        + B51 * dx5 * dy
        + B33 * dx3 * dy3
        + B15 * dx * dy5;

    (F0 + df / 3600.0, L0 + dl / 3600.0)
}

/// Converts a flat `x0, y0, x1, y1, ...` RD sequence to pixel coordinates.
pub fn rd_to_pixels(
    coords: &[f64],
    origin_x: f64,
    origin_y: f64,
    scale_factor: f64,
    vertical_offset: i32,
) -> Vec<i32> {
    coords
        .iter()
        .enumerate()
        .map(|(index, value)| {
            if index % 2 == 0 {
                ((value + origin_x) / scale_factor).round() as i32
            } else {
                (-((value - origin_y) / scale_factor)).round() as i32 + vertical_offset
            }
        })
        .collect()
}

/// Raster scale constants for one canvas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelGrid {
    /// RD units per pixel.
    pub scale: f64,
    /// Base line width in pixels before the path-type thickness factor.
    pub line_width: f64,
    /// Vertical shift reserved for a title.
    pub extra_pixels: i32,
    pub origin_x: f64,
    pub origin_y: f64,
}

impl PixelGrid {
    pub fn new(settings: &MapSettings, width: u32, height: u32, with_title: bool) -> Self {
        let mut size_factor = settings.bitmap_size_factor;
        let mut extra_pixels = 0;
        if with_title {
            size_factor += size_factor / settings.bitmap_smaller_bitmap_factor;
            let height = f64::from(height);
            extra_pixels = (height / settings.bitmap_extra_pixels_factor).round() as i32
                - (height / settings.bitmap_map_downward_factor).round() as i32;
        }
        let line_width = f64::from(width) / size_factor;
        let scale = (size_factor / line_width).round().max(1.0);
        Self {
            scale,
            line_width,
            extra_pixels,
            origin_x: settings.bitmap_rd2pixel_x,
            origin_y: settings.bitmap_rd2pixel_y,
        }
    }

    pub fn to_pixels(&self, coords: &[f64]) -> Vec<i32> {
        rd_to_pixels(
            coords,
            self.origin_x,
            self.origin_y,
            self.scale,
            self.extra_pixels,
        )
    }

    /// Stroke thickness for a thickness factor, at least one pixel.
    pub fn thickness(&self, factor: f64) -> u32 {
        ((self.line_width * factor).trunc() as i64).max(1) as u32
    }
}
