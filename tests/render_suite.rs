use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use kaart_rs_renderer::{
    Basemap, MapDefinitions, MapRequest, MapType, OutputFormat, OverlaySpec, render_map,
};

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn municipalities() -> MapRequest {
    let basemap = Basemap::load(&fixture("municipalities.json"), &[]).expect("basemap load failed");
    MapRequest::new(MapType::Municipalities, MapDefinitions::default(), basemap)
}

fn with_layers() -> MapRequest {
    let basemap = Basemap::load(
        &fixture("municipalities.json"),
        &[fixture("provinces.json"), fixture("border.json")],
    )
    .expect("basemap load failed");
    MapRequest::new(MapType::Municipalities, MapDefinitions::default(), basemap)
}

fn highlight(request: &mut MapRequest, entries: &[(&str, &str)]) {
    request.set_data(
        entries
            .iter()
            .map(|(id, color)| (id.to_string(), OverlaySpec::Simple(color.to_string())))
            .collect(),
    );
}

fn render_text(request: &MapRequest, format: OutputFormat) -> String {
    let rendered = render_map(request, format).expect("render failed");
    assert_eq!(rendered.format, format);
    assert!(rendered.image_map.is_none());
    String::from_utf8(rendered.bytes).expect("text output is UTF-8")
}

const TEXT_FORMATS: [OutputFormat; 3] = [OutputFormat::Svg, OutputFormat::Kml, OutputFormat::Json];

#[test]
fn skips_features_without_id_or_supported_geometry() {
    let request = municipalities();
    let areas = request.possible_areas();
    let ids: Vec<&str> = areas.keys().map(String::as_str).collect();
    assert_eq!(ids, vec!["g_0534", "g_0003", "g_0010", "g_0363"]);
    assert_eq!(areas["g_0003"], "Appingedam");
}

#[test]
fn rendering_twice_gives_identical_output() {
    let mut request = with_layers();
    highlight(&mut request, &[("g_0534", "#FFC513"), ("g_0363", "red")]);
    request.set_title("Testkaart");
    request.set_interactive(true);
    for format in TEXT_FORMATS {
        assert_eq!(
            render_text(&request, format),
            render_text(&request, format),
            "{format} output differs between renders"
        );
    }
}

#[test]
fn html_and_kml_notations_highlight_identically() {
    let mut html = municipalities();
    highlight(&mut html, &[("g_0534", "#FFC513")]);
    let mut kml = municipalities();
    highlight(&mut kml, &[("g_0534", "FF13C5FF")]);
    let mut kml_lower = municipalities();
    highlight(&mut kml_lower, &[("g_0534", "ff13c5ff")]);
    for format in TEXT_FORMATS {
        let expected = render_text(&html, format);
        assert_eq!(expected, render_text(&kml, format), "{format}");
        assert_eq!(expected, render_text(&kml_lower, format), "{format}");
    }
    let svg = render_text(&html, OutputFormat::Svg);
    assert!(svg.contains("fill:#FFC513;stroke:#808080;stroke-width:200;"));
    let kml_doc = render_text(&kml, OutputFormat::Kml);
    assert!(kml_doc.contains("<color>ff13c5ff</color>"));
}

#[test]
fn highlighted_areas_are_drawn_last_in_data_order() {
    let mut request = municipalities();
    highlight(&mut request, &[("g_0363", "red"), ("g_0534", "blue")]);
    let svg = render_text(&request, OutputFormat::Svg);
    let position = |id: &str| svg.find(&format!("id=\"{id}\"")).expect(id);
    assert!(position("g_0003") < position("g_0010"));
    assert!(position("g_0010") < position("g_0363"));
    assert!(position("g_0363") < position("g_0534"));
}

#[test]
fn polygons_keep_only_their_outer_ring() {
    let svg = render_text(&municipalities(), OutputFormat::Svg);
    let start = svg.find("<path id=\"g_0003\"").unwrap();
    let path = &svg[start..start + svg[start..].find("/>").unwrap()];
    assert_eq!(path.matches('M').count(), 1);
    assert!(!path.contains("253000"));
}

#[test]
fn general_link_is_templated_per_area() {
    let mut request = municipalities();
    request.set_link("http://www.example.com/?code=%s", Some("_blank"));
    let svg = render_text(&request, OutputFormat::Svg);
    assert!(svg.contains("<a xlink:href=\"http://www.example.com/?code=g_0534\" target=\"_blank\">"));
    assert!(svg.contains("<a xlink:href=\"http://www.example.com/?code=g_0010\" target=\"_blank\">"));

    request.set_link_highlighted("http://www.example.com/?code=%s", None);
    highlight(&mut request, &[("g_0363", "red")]);
    let svg = render_text(&request, OutputFormat::Svg);
    assert_eq!(svg.matches("<a xlink:href").count(), 1);
    assert!(svg.contains("?code=g_0363\" target=\"_blank\""));
    let json = render_text(&request, OutputFormat::Json);
    assert_eq!(json.matches("\"href\"").count(), 1);
}

#[test]
fn title_reflows_the_svg_canvas() {
    let mut request = municipalities();
    let plain = render_text(&request, OutputFormat::Svg);
    request.set_title("Gemeenten");
    let titled = render_text(&request, OutputFormat::Svg);
    assert!(plain.contains("viewBox=\"0 0 288051 322430\""));
    assert!(titled.contains("viewBox=\"0 0 288051 400430\""));
    assert!(titled.contains(">Gemeenten</text>"));
    let kml = render_text(&request, OutputFormat::Kml);
    assert!(kml.contains("<Document>\n    <name>Gemeenten</name>"));
}

#[test]
fn kml_splits_every_layer_into_plain_and_highlighted_folders() {
    let mut request = with_layers();
    highlight(&mut request, &[("g_0534", "#FFC513")]);
    let kml = render_text(&request, OutputFormat::Kml);
    let folders: Vec<usize> = [
        "<name>Gemeenten</name>",
        "<name>Gemeenten (highlighted)</name>",
        "<name>Provincies</name>",
        "<name>Landsgrens</name>",
    ]
    .iter()
    .map(|name| kml.find(name).expect(name))
    .collect();
    assert!(folders.windows(2).all(|pair| pair[0] < pair[1]));
    assert!(!kml.contains("Provincies (highlighted)"));
    // provinces carry their own line style
    let provinces = &kml[folders[2]..folders[3]];
    assert!(provinces.contains("<width>3</width>"));
    assert!(kml.contains("<!-- CBS/Kadaster -->\n<!-- Eurogeographics -->"));
}

#[test]
fn geojson_keeps_layer_order_and_line_geometry() {
    let json: serde_json::Value =
        serde_json::from_str(&render_text(&with_layers(), OutputFormat::Json)).unwrap();
    let features = json["features"].as_array().unwrap();
    assert_eq!(features.len(), 6);
    assert_eq!(features[4]["properties"]["id"], "p_20");
    assert_eq!(features[5]["geometry"]["type"], "LineString");
    assert_eq!(
        json["metadata"]["copyright"],
        serde_json::json!(["CBS/Kadaster", "Eurogeographics"])
    );
}

#[test]
fn tooltips_reach_every_text_format() {
    let mut request = municipalities();
    request.set_tooltips(IndexMap::from([(
        "g_0534".to_string(),
        "Hillegom: 21.000 inwoners".to_string(),
    )]));
    let svg = render_text(&request, OutputFormat::Svg);
    assert!(svg.contains("onmouseover=\"ShowTooltip('Hillegom: 21.000 inwoners')\""));
    assert!(svg.contains("<script type=\"text/ecmascript\">"));
    let kml = render_text(&request, OutputFormat::Kml);
    assert!(kml.contains("<p> Hillegom: 21.000 inwoners</p>"));
    let json = render_text(&request, OutputFormat::Json);
    assert!(json.contains("\"name\":\"Hillegom: 21.000 inwoners\""));
}

#[test]
fn unknown_highlight_color_fails_the_render() {
    let mut request = municipalities();
    highlight(&mut request, &[("g_0534", "notacolor")]);
    for format in TEXT_FORMATS {
        assert!(render_map(&request, format).is_err());
    }
}

#[cfg(feature = "bitmap")]
mod raster {
    use super::*;

    #[test]
    fn raster_output_is_deterministic_and_color_equivalent() {
        let mut html = municipalities();
        highlight(&mut html, &[("g_0534", "#FFC513")]);
        let mut kml = municipalities();
        highlight(&mut kml, &[("g_0534", "FF13C5FF")]);
        let first = render_map(&html, OutputFormat::Png).unwrap();
        let second = render_map(&html, OutputFormat::Png).unwrap();
        let other = render_map(&kml, OutputFormat::Png).unwrap();
        let mut kml_lower = municipalities();
        highlight(&mut kml_lower, &[("g_0534", "ff13c5ff")]);
        let lower = render_map(&kml_lower, OutputFormat::Png).unwrap();
        assert_eq!(first.bytes, second.bytes);
        assert_eq!(first.bytes, other.bytes);
        assert_eq!(first.bytes, lower.bytes);
        assert_eq!(first.mime_type(), "image/png");
    }

    #[test]
    fn image_map_has_an_area_per_polygon_part() {
        let mut request = municipalities();
        request.set_interactive(true);
        let rendered = render_map(&request, OutputFormat::Gif).unwrap();
        let image_map = rendered.image_map.unwrap();
        assert_eq!(image_map.lines().count(), 5);
        assert!(image_map.contains("title=\"Hillegom\" alt=\"Hillegom\""));
        assert!(image_map.contains("id=\"g_0010_0\""));
        assert!(image_map.contains("id=\"g_0010_1\""));
        assert!(image_map.lines().all(|line| line.starts_with("<area shape=\"poly\" coords=\"")));
    }

    #[test]
    fn title_shifts_the_image_map() {
        let mut request = municipalities();
        request.set_interactive(true);
        let plain = render_map(&request, OutputFormat::Png).unwrap().image_map.unwrap();
        request.set_title("Gemeenten");
        let titled = render_map(&request, OutputFormat::Jpeg).unwrap();
        assert_eq!(&titled.bytes[..2], &[0xFF, 0xD8]);
        let titled = titled.image_map.unwrap();
        assert_eq!(plain.lines().count(), titled.lines().count());
        assert_ne!(plain, titled);
    }
}
