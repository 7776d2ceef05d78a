//! Fixed presentation constants shared by the renderers.

/// ECMAScript embedded in interactive SVG maps to show area names on hover.
pub const TOOLTIP_ECMASCRIPT: &str = "
var svgDocument;
var tooltip;

function init(evt) {
    svgDocument = evt.target.ownerDocument;
    tooltip = svgDocument.getElementById('ttt');
}

function ShowTooltip(text) {
    tooltip.firstChild.data = text;
    tooltip.setAttribute('display', 'inline');
}

function HideTooltip() {
    tooltip.setAttribute('display', 'none');
}
";

pub const SVG_DOCTYPE: &str = r#"<!DOCTYPE svg PUBLIC "-//W3C//DTD SVG 1.0//EN" "http://www.w3.org/TR/2001/REC-SVG-20010904/DTD/svg10.dtd">"#;
pub const SVG_NAMESPACE: &str = "http://www.w3.org/2000/svg";
pub const XLINK_NAMESPACE: &str = "http://www.w3.org/1999/xlink";
pub const KML_NAMESPACE: &str = "http://earth.google.com/kml/2.1";

/// Map background rectangle in SVG output.
#[derive(Debug, Clone, Copy)]
pub struct Background {
    pub x: f64,
    pub y: f64,
    /// Subtracted from the viewBox width when there is no title.
    pub width_inset: f64,
    /// Subtracted from the viewBox height when there is no title.
    pub height_inset: f64,
    pub style: &'static str,
}

pub const SVG_BACKGROUND: Background = Background {
    x: 15000.0,
    y: 3000.0,
    width_inset: 13000.0,
    height_inset: 5000.0,
    style: "fill:#eeeeff;stroke:#000000;stroke-width:200;",
};

#[derive(Debug, Clone, Copy)]
pub struct TitleStyle {
    pub fill: &'static str,
    pub font_weight: &'static str,
    pub text_anchor: &'static str,
}

pub const TITLE_STYLE: TitleStyle = TitleStyle {
    fill: "black",
    font_weight: "bold",
    text_anchor: "middle",
};

#[derive(Debug, Clone, Copy)]
pub struct TooltipStyle {
    pub fill: &'static str,
    pub font_weight: &'static str,
    pub placeholder: &'static str,
}

pub const TOOLTIP_STYLE: TooltipStyle = TooltipStyle {
    fill: "blue",
    font_weight: "bold",
    placeholder: "tooltip",
};

/// Colors allocated on every raster canvas right after the background.
pub const DEFAULT_RASTER_COLORS: [&str; 8] = [
    "blue",
    "brown",
    "yellow",
    "green",
    "red",
    "black",
    "gray",
    "dodgerblue",
];

pub const RASTER_TITLE_COLOR: &str = "black";
