use super::{Renderer, draw_basemap, escape_js};
use crate::error::Result;
use crate::request::MapRequest;
use crate::style::{ResolvedFeature, SvgStyle, SvgTarget};
use crate::theme::{
    SVG_BACKGROUND, SVG_DOCTYPE, SVG_NAMESPACE, TITLE_STYLE, TOOLTIP_ECMASCRIPT, TOOLTIP_STYLE,
    XLINK_NAMESPACE,
};
use crate::xml::{Document, Element, Node};

struct SvgRenderer {
    transform_group: Element,
    basemap_interactive: bool,
}

impl SvgRenderer {
    fn path_element(
        &self,
        id: Option<&str>,
        coords: &[f64],
        resolved: &ResolvedFeature<'_, SvgStyle>,
    ) -> Node {
        let mut path = Element::new("path");
        if let Some(id) = id {
            path.set_attr("id", id);
        }
        path.set_attr("d", path_data(coords, resolved.style.closed));
        path.set_attr("style", &resolved.style.style);
        if self.basemap_interactive
            && let Some(text) = &resolved.hover_text
        {
            path.set_attr("onmouseover", format!("ShowTooltip('{}')", escape_js(text)));
            path.set_attr("onmouseout", "HideTooltip()");
        }

        let Some(link) = &resolved.link else {
            return path.into();
        };
        if let Some(onclick) = &link.onclick {
            path.set_attr("onclick", onclick);
        }
        if let Some(onmouseover) = &link.onmouseover {
            path.set_attr("onmouseover", onmouseover);
        }
        if let Some(onmouseout) = &link.onmouseout {
            path.set_attr("onmouseout", onmouseout);
        }
        let Some(href) = &link.href else {
            return path.into();
        };
        let mut anchor = Element::new("a").attr("xlink:href", href);
        if let Some(target) = &link.target {
            anchor.set_attr("target", target);
        }
        Element::new("g").child(anchor.child(path)).into()
    }
}

impl Renderer for SvgRenderer {
    type Target = SvgTarget;

    fn draw_feature(&mut self, resolved: ResolvedFeature<'_, SvgStyle>) -> Result<()> {
        let feature = resolved.feature;
        let parts = feature.geometry.parts();
        if feature.geometry.is_multi() {
            let mut group = Element::new("g").attr("id", &feature.id);
            for coords in parts.into_iter().filter(|coords| coords.len() >= 2) {
                group.push(self.path_element(None, coords, &resolved));
            }
            self.transform_group.push(group);
        } else {
            for coords in parts.into_iter().filter(|coords| coords.len() >= 2) {
                let node = self.path_element(Some(&feature.id), coords, &resolved);
                self.transform_group.push(node);
            }
        }
        Ok(())
    }
}

/// `M x y L x y ...` path data, closed with `z` when requested.
fn path_data(coords: &[f64], closed: bool) -> String {
    let mut data = String::new();
    for (index, pair) in coords.chunks_exact(2).enumerate() {
        let command = if index == 0 { "M" } else { " L" };
        data.push_str(&format!("{command} {} {}", pair[0], pair[1]));
    }
    if closed {
        data.push_str(" z");
    }
    data
}

/// Renders the request as an SVG 1.0 document.
pub fn render_svg(request: &MapRequest) -> Result<String> {
    let settings = &request.definitions().map_settings;
    let titled = request.has_title();
    let with_script = request.interactive() || request.has_tooltips();

    let viewbox_width = settings.svg_viewbox_width;
    let mut viewbox_height = settings.svg_viewbox_height;
    let mut translate_y = settings.svg_translate_y;
    let mut tooltip_y = settings.svg_tooltip_y;
    let (background_width, background_height) = if titled {
        viewbox_height += settings.svg_title_extra_space;
        translate_y += settings.svg_title_map_shift;
        tooltip_y += settings.svg_title_map_shift;
        (viewbox_width, viewbox_height - settings.svg_title_map_shift)
    } else {
        (
            viewbox_width - SVG_BACKGROUND.width_inset,
            viewbox_height - SVG_BACKGROUND.height_inset,
        )
    };

    let mut root = Element::new("svg")
        .attr("xmlns", SVG_NAMESPACE)
        .attr("xmlns:xlink", XLINK_NAMESPACE)
        .attr("width", request.width())
        .attr("height", request.height())
        .attr("viewBox", format!("0 0 {viewbox_width} {viewbox_height}"))
        .attr("preserveAspectRatio", "xMidYMid");
    if with_script {
        root.set_attr("onload", "init(evt)");
    }

    root.push(
        Element::new("rect")
            .attr("x", SVG_BACKGROUND.x)
            .attr("y", SVG_BACKGROUND.y)
            .attr("width", background_width)
            .attr("height", background_height)
            .attr("style", SVG_BACKGROUND.style),
    );

    if with_script {
        let script = Element::new("script")
            .attr("type", "text/ecmascript")
            .child(Node::CData(TOOLTIP_ECMASCRIPT.to_string()));
        root.push(Element::new("defs").child(script));
        let tooltip = Element::new("text")
            .attr("id", "ttt")
            .attr("x", settings.svg_tooltip_x)
            .attr("y", tooltip_y)
            .attr("display", "none")
            .attr("fill", TOOLTIP_STYLE.fill)
            .attr("font-size", settings.svg_title_fontsize)
            .attr("font-weight", TOOLTIP_STYLE.font_weight)
            .attr("text-anchor", &settings.svg_tooltip_text_anchor)
            .text(TOOLTIP_STYLE.placeholder);
        root.push(Element::new("g").attr("id", "tooltip").child(tooltip));
    }

    let transform = format!(
        "translate({},{}) scale({},{})",
        settings.svg_translate_x, translate_y, settings.svg_scale_x, settings.svg_scale_y
    );
    let mut renderer = SvgRenderer {
        transform_group: Element::new("g").attr("transform", transform),
        basemap_interactive: settings.basemap_interactive,
    };
    draw_basemap(&mut renderer, request)?;
    root.push(renderer.transform_group);

    if titled {
        root.push(
            Element::new("text")
                .attr("x", settings.svg_title_x)
                .attr("y", settings.svg_title_y)
                .attr("font-size", settings.svg_title_fontsize)
                .attr("fill", TITLE_STYLE.fill)
                .attr("font-weight", TITLE_STYLE.font_weight)
                .attr("text-anchor", TITLE_STYLE.text_anchor)
                .text(request.title()),
        );
    }

    for copyright in request.basemap().copyrights() {
        root.push(Node::Comment(copyright.to_string()));
    }

    Ok(Document::new(root)
        .with_doctype(SVG_DOCTYPE)
        .to_xml_string())
}
