use super::{Renderer, draw_basemap};
use crate::config::MapDefinitions;
use crate::error::Result;
use crate::geometry::BasemapLayer;
use crate::request::MapRequest;
use crate::style::{KmlStyle, KmlTarget, LinkSpec, ResolvedFeature};
use crate::theme::KML_NAMESPACE;
use crate::transform::rd_to_lat_lon;
use crate::xml::{Document, Element, Node, escape_attr, escape_text};

struct LayerFolders {
    name: String,
    plain: Element,
    highlighted: Option<Element>,
}

struct KmlRenderer<'d> {
    definitions: &'d MapDefinitions,
    document: Element,
    current: Option<LayerFolders>,
}

fn folder(name: &str) -> Element {
    Element::new("Folder").child(Element::with_text("name", name))
}

/// `lon,lat,0 ` triplets for a flat RD coordinate run.
fn coordinate_string(coords: &[f64]) -> String {
    let mut out = String::new();
    for pair in coords.chunks_exact(2) {
        let (lat, lon) = rd_to_lat_lon(pair[0], pair[1]);
        out.push_str(&format!("{lon},{lat},0 "));
    }
    out
}

fn style_element(line_width: f64, line_color: &str, poly_color: &str) -> Element {
    Element::new("Style")
        .child(
            Element::new("LineStyle")
                .child(Element::with_text("width", line_width))
                .child(Element::with_text("color", line_color)),
        )
        .child(Element::new("PolyStyle").child(Element::with_text("color", poly_color)))
}

fn link_anchor(link: &LinkSpec) -> Option<String> {
    let href = link.href.as_deref()?;
    let mut anchor = format!("<a href=\"{}\"", escape_attr(href));
    if let Some(target) = &link.target {
        anchor.push_str(&format!(" target=\"{}\"", escape_attr(target)));
    }
    anchor.push_str(&format!(">{}</a>", escape_text(href)));
    Some(anchor)
}

fn description(resolved: &ResolvedFeature<'_, KmlStyle>) -> Option<String> {
    let mut lines: Vec<String> = Vec::new();
    if let Some(anchor) = resolved.link.as_ref().and_then(link_anchor) {
        lines.push(anchor);
    }
    if let Some(tooltip) = resolved.tooltip.as_ref().filter(|tooltip| !tooltip.is_empty()) {
        lines.push(tooltip.clone());
    }
    if lines.is_empty() {
        None
    } else {
        Some(format!("<p> {}</p>", lines.join("<br />")))
    }
}

impl KmlRenderer<'_> {
    fn placemark(
        &self,
        name: &str,
        coords: &[f64],
        resolved: &ResolvedFeature<'_, KmlStyle>,
    ) -> Option<Element> {
        let coordinates = coordinate_string(coords);
        if coordinates.is_empty() {
            return None;
        }
        let mut placemark = Element::new("Placemark");
        match &resolved.style {
            KmlStyle::Shared => placemark.push(Element::with_text(
                "styleUrl",
                format!("#{}", self.definitions.kml_defaults.default_polygon_style_name),
            )),
            KmlStyle::Inline {
                line_width,
                line_color,
                poly_color,
            } => placemark.push(style_element(*line_width, line_color, poly_color)),
        }
        let name_element = if name.is_empty() {
            Element::new("name")
        } else {
            Element::with_text("name", name)
        };
        placemark.push(name_element);
        let ring = Element::new("LinearRing")
            .child(Element::with_text("tessellate", 0))
            .child(Element::with_text("coordinates", coordinates));
        placemark.push(Element::new("Polygon").child(Element::new("outerBoundaryIs").child(ring)));
        if let Some(text) = description(resolved) {
            placemark.push(Element::new("description").child(Node::CData(text)));
        }
        Some(placemark)
    }
}

impl Renderer for KmlRenderer<'_> {
    type Target = KmlTarget;

    fn begin_layer(&mut self, layer: &BasemapLayer) -> Result<()> {
        self.current = Some(LayerFolders {
            name: layer.name.clone(),
            plain: folder(&layer.name),
            highlighted: None,
        });
        Ok(())
    }

    fn draw_feature(&mut self, resolved: ResolvedFeature<'_, KmlStyle>) -> Result<()> {
        let feature = resolved.feature;
        let name = feature.name.as_deref().unwrap_or_default();
        let node = if feature.geometry.is_multi() {
            let mut subfolder = folder(name);
            for (index, coords) in feature.geometry.parts().into_iter().enumerate() {
                let part_name = format!("{name} ({})", index + 1);
                if let Some(placemark) = self.placemark(&part_name, coords, &resolved) {
                    subfolder.push(placemark);
                }
            }
            Some(subfolder)
        } else {
            feature
                .geometry
                .parts()
                .into_iter()
                .find_map(|coords| self.placemark(name, coords, &resolved))
        };

        let Some(node) = node else {
            return Ok(());
        };
        let Some(folders) = self.current.as_mut() else {
            return Ok(());
        };
        if resolved.highlighted {
            let name = format!("{} (highlighted)", folders.name);
            folders
                .highlighted
                .get_or_insert_with(|| folder(&name))
                .push(node);
        } else {
            folders.plain.push(node);
        }
        Ok(())
    }

    fn end_layer(&mut self, _layer: &BasemapLayer) -> Result<()> {
        if let Some(folders) = self.current.take() {
            self.document.push(folders.plain);
            if let Some(highlighted) = folders.highlighted {
                self.document.push(highlighted);
            }
        }
        Ok(())
    }
}

/// Renders the request as a KML 2.1 document in WGS84 coordinates.
pub fn render_kml(request: &MapRequest) -> Result<String> {
    let definitions = request.definitions();
    let lookat = &definitions.kml_lookat;
    let defaults = &definitions.kml_defaults;

    let mut document = Element::new("Document");
    if request.has_title() {
        document.push(Element::with_text("name", request.title()));
    }
    document.push(
        Element::new("LookAt")
            .child(Element::with_text("longitude", lookat.longitude))
            .child(Element::with_text("latitude", lookat.latitude))
            .child(Element::with_text("altitude", lookat.altitude))
            .child(Element::with_text("range", lookat.range))
            .child(Element::with_text("tilt", lookat.tilt))
            .child(Element::with_text("heading", lookat.heading)),
    );
    document.push(
        style_element(
            defaults.default_linestyle_linewidth,
            &defaults.default_linestyle_color,
            &defaults.default_polystyle_color,
        )
        .attr("id", &defaults.default_polygon_style_name),
    );

    let mut renderer = KmlRenderer {
        definitions,
        document,
        current: None,
    };
    draw_basemap(&mut renderer, request)?;

    let root = Element::new("kml")
        .attr("xmlns", KML_NAMESPACE)
        .child(renderer.document);
    let mut xml = Document::new(root);
    for copyright in request.basemap().copyrights() {
        xml.push_trailing(Node::Comment(copyright.to_string()));
    }
    Ok(xml.to_xml_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Basemap;
    use crate::request::MapType;
    use crate::style::OverlaySpec;
    use indexmap::IndexMap;

    fn request() -> MapRequest {
        let layer = BasemapLayer::parse(
            r#"{"properties": {"name": "Gemeenten", "copyright": ["CBS"]}, "features": [
                {"properties": {"id": "g_0003", "name": "Appingedam", "path_type": "municipality"},
                 "geometry": {"type": "Polygon", "coordinates": [[[250000, 590000], [252000, 590000], [252000, 592000]]]}},
                {"properties": {"id": "g_0010", "name": "Delfzijl", "path_type": "municipality"},
                 "geometry": {"type": "MultiPolygon", "coordinates": [
                    [[[253000, 590000], [254000, 590000], [254000, 591000]]],
                    [[[255000, 590000], [256000, 590000], [256000, 591000]]]
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

    #[test]
    fn document_has_lookat_default_style_and_one_folder() {
        let kml = render_kml(&request()).unwrap();
        assert!(kml.contains("<kml xmlns=\"http://earth.google.com/kml/2.1\">"));
        assert!(kml.contains("<longitude>5.3</longitude>"));
        assert!(kml.contains("<range>300000</range>"));
        assert!(kml.contains("<Style id=\"default_polygon\">"));
        assert!(kml.contains("<styleUrl>#default_polygon</styleUrl>"));
        assert_eq!(kml.matches("<name>Gemeenten").count(), 1);
        assert!(!kml.contains("(highlighted)"));
        assert!(kml.contains("<name>Delfzijl (2)</name>"));
        assert!(kml.trim_end().ends_with("</kml>\n<!-- CBS -->"));
    }

    #[test]
    fn highlighted_features_get_their_own_folder_and_style() {
        let mut request = request();
        request.set_data(IndexMap::from([(
            "g_0003".to_string(),
            OverlaySpec::Simple("#FFC513".to_string()),
        )]));
        let kml = render_kml(&request).unwrap();
        let plain = kml.find("<name>Gemeenten</name>").unwrap();
        let highlighted = kml.find("<name>Gemeenten (highlighted)</name>").unwrap();
        assert!(plain < highlighted);
        let section = &kml[highlighted..];
        assert!(section.contains("<color>ff13c5ff</color>"));
        assert!(section.contains("<name>Appingedam</name>"));
        assert!(!kml[..highlighted].contains("Appingedam"));
    }

    #[test]
    fn links_and_tooltips_become_a_description() {
        let mut request = request();
        request.set_links(
            IndexMap::from([("g_0003".to_string(), "http://www.janpieterkunst.nl/".to_string())]),
            Some("_blank"),
        );
        request.set_tooltips(IndexMap::from([("g_0003".to_string(), "Appingedam, 12.000".to_string())]));
        let kml = render_kml(&request).unwrap();
        assert!(kml.contains(
            "<description><![CDATA[<p> <a href=\"http://www.janpieterkunst.nl/\" target=\"_blank\">http://www.janpieterkunst.nl/</a><br />Appingedam, 12.000</p>]]></description>"
        ));
    }

    #[test]
    fn coordinates_are_longitude_first() {
        let coordinates = coordinate_string(&[155000.0, 463000.0]);
        assert_eq!(coordinates, "5.387638889,52.156160556,0 ");
    }
}
