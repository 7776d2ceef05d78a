//! Per-feature resolution of highlight styling, links and tooltips.
//!
//! Every renderer goes through [`resolve_feature`] so the same overlay data
//! produces the same highlights, links and hover texts in each format.

use crate::color::{self, SymbolFill};
use crate::config::{BitmapFunction, JsonGeometryType, MapDefinitions, PathTypeStyle};
use crate::error::Result;
use crate::geometry::{BasemapLayer, Feature};
use crate::request::MapRequest;
use once_cell::sync::Lazy;
use regex::{NoExpand, Regex};
use serde::{Deserialize, Serialize};

static SVG_FILL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"fill:.+?;").unwrap());
static STYLE_FILL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"fill:\s*(.+?);").unwrap());
static STYLE_STROKE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"stroke:\s*(.+?);").unwrap());
static STYLE_STROKE_WIDTH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"stroke-width:\s*(.+?);").unwrap());

/// Highlight for one area: a fill color, or fill, outline and a stroke width factor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OverlaySpec {
    Simple(String),
    Detailed {
        fill: String,
        outline: String,
        strokewidth: f64,
    },
}

/// Link and script attributes for one area. `%s` is replaced by the area id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub onclick: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub onmouseover: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub onmouseout: Option<String>,
}

impl LinkSpec {
    fn substituted(&self, id: &str) -> Self {
        let fill_in = |value: &Option<String>| value.as_ref().map(|value| value.replace("%s", id));
        Self {
            href: fill_in(&self.href),
            target: self.target.clone(),
            onclick: fill_in(&self.onclick),
            onmouseover: fill_in(&self.onmouseover),
            onmouseout: fill_in(&self.onmouseout),
        }
    }
}

/// Link template applied to every area (or every highlighted area).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneralLink {
    pub template: String,
    pub target: Option<String>,
}

/// A feature with everything a renderer needs to draw it.
#[derive(Debug, Clone)]
pub struct ResolvedFeature<'a, S> {
    pub feature: &'a Feature,
    pub highlighted: bool,
    pub style: S,
    pub link: Option<LinkSpec>,
    /// Tooltip set for this area by the caller.
    pub tooltip: Option<String>,
    /// Text shown on hover: the tooltip, else the area name on interactive maps.
    pub hover_text: Option<String>,
}

/// Output format family a style is resolved for.
pub trait StyleTarget {
    type Style;

    fn resolve_style(
        defaults: &PathTypeStyle,
        overlay: Option<&OverlaySpec>,
        definitions: &MapDefinitions,
    ) -> Result<Self::Style>;
}

pub struct SvgTarget;
pub struct BitmapTarget;
pub struct KmlTarget;
pub struct JsonTarget;

#[derive(Debug, Clone, PartialEq)]
pub struct SvgStyle {
    pub style: String,
    pub closed: bool,
}

impl StyleTarget for SvgTarget {
    type Style = SvgStyle;

    fn resolve_style(
        defaults: &PathTypeStyle,
        overlay: Option<&OverlaySpec>,
        _definitions: &MapDefinitions,
    ) -> Result<SvgStyle> {
        let style = match overlay {
            None => defaults.svg_path_style.clone(),
            Some(OverlaySpec::Simple(fill)) => {
                let fill = color::resolve(fill, SymbolFill::Unfilled)?.html;
                SVG_FILL_RE
                    .replace_all(&defaults.svg_path_style, NoExpand(&format!("fill:{fill};")))
                    .into_owned()
            }
            Some(OverlaySpec::Detailed {
                fill,
                outline,
                strokewidth,
            }) => {
                let fill = color::resolve(fill, SymbolFill::Unfilled)?.html;
                let outline = color::resolve(outline, SymbolFill::Unfilled)?.html;
                let width = defaults.svg_stroke_width * strokewidth;
                format!("stroke:{outline}; fill:{fill}; stroke-width:{width};")
            }
        };
        Ok(SvgStyle {
            style,
            closed: defaults.svg_path_closed,
        })
    }
}

/// Raster colors are HTML colors or `none` for "do not paint".
#[derive(Debug, Clone, PartialEq)]
pub struct BitmapStyle {
    pub function: BitmapFunction,
    pub thickness_factor: f64,
    pub outline: String,
    pub fill: String,
}

impl StyleTarget for BitmapTarget {
    type Style = BitmapStyle;

    fn resolve_style(
        defaults: &PathTypeStyle,
        overlay: Option<&OverlaySpec>,
        _definitions: &MapDefinitions,
    ) -> Result<BitmapStyle> {
        let mut style = match defaults.bitmap_color.as_deref() {
            Some(single) if single != color::NONE => BitmapStyle {
                function: defaults.bitmap_function,
                thickness_factor: defaults.bitmap_thickness_factor,
                outline: single.to_string(),
                fill: single.to_string(),
            },
            _ => BitmapStyle {
                function: defaults.bitmap_function,
                thickness_factor: defaults.bitmap_thickness_factor,
                outline: defaults.bitmap_outline.clone(),
                fill: defaults.bitmap_fill.clone(),
            },
        };
        match overlay {
            None => {}
            Some(OverlaySpec::Simple(fill)) => {
                style.fill = color::resolve(fill, SymbolFill::Unfilled)?.html;
            }
            Some(OverlaySpec::Detailed {
                fill,
                outline,
                strokewidth,
            }) => {
                style.fill = color::resolve(fill, SymbolFill::Unfilled)?.html;
                style.outline = color::resolve(outline, SymbolFill::Unfilled)?.html;
                style.thickness_factor = *strokewidth;
            }
        }
        Ok(style)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum KmlStyle {
    /// Reference to the document's default style.
    Shared,
    Inline {
        line_width: f64,
        line_color: String,
        poly_color: String,
    },
}

impl StyleTarget for KmlTarget {
    type Style = KmlStyle;

    fn resolve_style(
        defaults: &PathTypeStyle,
        overlay: Option<&OverlaySpec>,
        definitions: &MapDefinitions,
    ) -> Result<KmlStyle> {
        let kml = &definitions.kml_defaults;
        let style = match overlay {
            Some(OverlaySpec::Simple(fill)) => KmlStyle::Inline {
                line_width: kml.default_linestyle_linewidth,
                line_color: kml.default_linestyle_color.clone(),
                poly_color: color::resolve(fill, SymbolFill::Unfilled)?.kml,
            },
            Some(OverlaySpec::Detailed {
                fill,
                outline,
                strokewidth,
            }) => KmlStyle::Inline {
                line_width: kml.default_linestyle_linewidth * strokewidth,
                line_color: color::resolve(outline, SymbolFill::Unfilled)?.kml,
                poly_color: color::resolve(fill, SymbolFill::Unfilled)?.kml,
            },
            None if defaults.has_kml_overrides() => KmlStyle::Inline {
                line_width: kml.default_linestyle_linewidth
                    * defaults.kml_linestyle_linewidth.unwrap_or(1.0),
                line_color: defaults
                    .kml_linestyle_color
                    .clone()
                    .unwrap_or_else(|| kml.default_linestyle_color.clone()),
                poly_color: defaults
                    .kml_polystyle_color
                    .clone()
                    .unwrap_or_else(|| kml.default_polystyle_color.clone()),
            },
            None => KmlStyle::Shared,
        };
        Ok(style)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JsonStyle {
    pub fill: String,
    pub stroke: String,
    #[serde(rename = "stroke-width")]
    pub stroke_width: String,
    #[serde(skip)]
    pub geometry_type: JsonGeometryType,
}

fn style_value(re: &Regex, style: &str) -> String {
    re.captures(style)
        .and_then(|caps| caps.get(1))
        .map(|value| value.as_str().to_string())
        .unwrap_or_default()
}

impl StyleTarget for JsonTarget {
    type Style = JsonStyle;

    fn resolve_style(
        defaults: &PathTypeStyle,
        overlay: Option<&OverlaySpec>,
        _definitions: &MapDefinitions,
    ) -> Result<JsonStyle> {
        let svg_style = &defaults.svg_path_style;
        let mut style = JsonStyle {
            fill: style_value(&STYLE_FILL_RE, svg_style),
            stroke: style_value(&STYLE_STROKE_RE, svg_style),
            stroke_width: style_value(&STYLE_STROKE_WIDTH_RE, svg_style),
            geometry_type: defaults.json_geometry_type,
        };
        match overlay {
            None => {}
            Some(OverlaySpec::Simple(fill)) => {
                style.fill = color::resolve(fill, SymbolFill::Unfilled)?.html;
            }
            Some(OverlaySpec::Detailed {
                fill,
                outline,
                strokewidth,
            }) => {
                style.fill = color::resolve(fill, SymbolFill::Unfilled)?.html;
                style.stroke = color::resolve(outline, SymbolFill::Unfilled)?.html;
                style.stroke_width = (defaults.svg_stroke_width * strokewidth).to_string();
            }
        }
        Ok(style)
    }
}

fn resolve_link(feature: &Feature, request: &MapRequest, highlighted: bool) -> Option<LinkSpec> {
    if let Some(link) = request.link(&feature.id) {
        return Some(link.substituted(&feature.id));
    }
    let general = request.general_link()?;
    if request.link_highlighted_only() && !highlighted {
        return None;
    }
    Some(LinkSpec {
        href: Some(general.template.replace("%s", &feature.id)),
        target: general.target.clone(),
        ..Default::default()
    })
}

/// Resolves style, link and tooltip of a feature for one output format.
///
/// # Errors
///
/// Fails with [`crate::KaartError::Color`] when an overlay color cannot be resolved.
pub fn resolve_feature<'a, T: StyleTarget>(
    feature: &'a Feature,
    request: &MapRequest,
) -> Result<ResolvedFeature<'a, T::Style>> {
    let definitions = request.definitions();
    let defaults = definitions.path_style(&feature.path_type);
    let overlay = request.overlay(&feature.id);
    let highlighted = overlay.is_some();
    let style = T::resolve_style(defaults, overlay, definitions)?;
    let tooltip = request.tooltip(&feature.id).map(str::to_string);
    let hover_text = tooltip.clone().or_else(|| {
        if request.interactive() {
            feature.name.clone()
        } else {
            None
        }
    });
    Ok(ResolvedFeature {
        feature,
        highlighted,
        style,
        link: resolve_link(feature, request, highlighted),
        tooltip,
        hover_text,
    })
}

/// Features of a layer in draw order: plain features first, then highlighted
/// features in the order they were highlighted.
pub fn ordered_features<'a>(layer: &'a BasemapLayer, request: &MapRequest) -> Vec<&'a Feature> {
    let mut ordered: Vec<&Feature> = layer
        .features
        .values()
        .filter(|feature| request.overlay(&feature.id).is_none())
        .collect();
    ordered.extend(
        request
            .data()
            .keys()
            .filter_map(|id| layer.features.get(id)),
    );
    ordered
}
