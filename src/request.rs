use crate::config::MapDefinitions;
use crate::error::KaartError;
use crate::geometry::Basemap;
use crate::style::{GeneralLink, LinkSpec, OverlaySpec};
use indexmap::IndexMap;
use std::fmt;
use std::str::FromStr;

/// Kinds of choropleth basemaps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapType {
    Municipalities,
    Corop,
    Provinces,
    MunicipalitiesNlFlanders,
    MunicipalitiesFlanders,
    DialectAreas,
}

impl MapType {
    pub fn as_str(self) -> &'static str {
        match self {
            MapType::Municipalities => "municipalities",
            MapType::Corop => "corop",
            MapType::Provinces => "provinces",
            MapType::MunicipalitiesNlFlanders => "municipalities_nl_flanders",
            MapType::MunicipalitiesFlanders => "municipalities_flanders",
            MapType::DialectAreas => "dialectareas",
        }
    }

    /// Coordinate files for this map type, base layer first.
    pub fn basemap_files(self) -> &'static [&'static str] {
        match self {
            MapType::Municipalities => &["municipalities.json"],
            MapType::Corop => &["corop.json"],
            MapType::Provinces => &["provinces.json"],
            MapType::MunicipalitiesNlFlanders => &[
                "municipalities.json",
                "municipalities_flanders.json",
                "border_nl_be.json",
            ],
            MapType::MunicipalitiesFlanders => &["municipalities_flanders.json"],
            MapType::DialectAreas => &["dialectareas.json"],
        }
    }

    /// Layer file for a named additional layer such as `provinces`.
    pub fn additional_data_file(name: &str) -> Option<&'static str> {
        match name {
            "corop" => Some("corop.json"),
            "provinces" | "provincies" => Some("provinces.json"),
            "dialectareas" => Some("dialectareas.json"),
            "border_nl_be" => Some("border_nl_be.json"),
            _ => None,
        }
    }
}

impl FromStr for MapType {
    type Err = KaartError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "municipalities" | "gemeentes" => Ok(MapType::Municipalities),
            "corop" => Ok(MapType::Corop),
            "provinces" | "provincies" => Ok(MapType::Provinces),
            "municipalities_nl_flanders" => Ok(MapType::MunicipalitiesNlFlanders),
            "municipalities_flanders" => Ok(MapType::MunicipalitiesFlanders),
            "dialectareas" => Ok(MapType::DialectAreas),
            other => Err(KaartError::parse("map type", format!("unknown map type {other:?}"))),
        }
    }
}

impl fmt::Display for MapType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Svg,
    Png,
    Gif,
    Jpeg,
    Kml,
    Json,
}

impl OutputFormat {
    pub fn mime_type(self) -> &'static str {
        match self {
            OutputFormat::Svg => "image/svg+xml",
            OutputFormat::Png => "image/png",
            OutputFormat::Gif => "image/gif",
            OutputFormat::Jpeg => "image/jpeg",
            OutputFormat::Kml => "application/vnd.google-earth.kml+xml",
            OutputFormat::Json => "application/json",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Svg => "svg",
            OutputFormat::Png => "png",
            OutputFormat::Gif => "gif",
            OutputFormat::Jpeg => "jpg",
            OutputFormat::Kml => "kml",
            OutputFormat::Json => "json",
        }
    }

    pub fn is_raster(self) -> bool {
        matches!(
            self,
            OutputFormat::Png | OutputFormat::Gif | OutputFormat::Jpeg
        )
    }
}

impl FromStr for OutputFormat {
    type Err = KaartError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "svg" => Ok(OutputFormat::Svg),
            "png" => Ok(OutputFormat::Png),
            "gif" => Ok(OutputFormat::Gif),
            "jpeg" | "jpg" => Ok(OutputFormat::Jpeg),
            "kml" => Ok(OutputFormat::Kml),
            "json" | "geojson" => Ok(OutputFormat::Json),
            _ => Err(KaartError::UnsupportedFormat(value.to_string())),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Element event a script snippet is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptEvent {
    OnClick,
    OnMouseOver,
    OnMouseOut,
}

/// Everything needed to render one map: basemap, definitions and overlay data.
///
/// Renders only read the request; the same request can be rendered in
/// several formats in a row.
#[derive(Debug, Clone)]
pub struct MapRequest {
    map_type: MapType,
    definitions: MapDefinitions,
    basemap: Basemap,
    width: u32,
    height: u32,
    width_manually_changed: bool,
    title: String,
    interactive: bool,
    highlighted: IndexMap<String, OverlaySpec>,
    links: IndexMap<String, LinkSpec>,
    general_link: Option<GeneralLink>,
    link_highlighted_only: bool,
    tooltips: IndexMap<String, String>,
}

impl MapRequest {
    pub fn new(map_type: MapType, definitions: MapDefinitions, basemap: Basemap) -> Self {
        let width = definitions.map_settings.width;
        let height = definitions.map_settings.height_for_width(width);
        Self {
            map_type,
            definitions,
            basemap,
            width,
            height,
            width_manually_changed: false,
            title: String::new(),
            interactive: false,
            highlighted: IndexMap::new(),
            links: IndexMap::new(),
            general_link: None,
            link_highlighted_only: false,
            tooltips: IndexMap::new(),
        }
    }

    pub fn map_type(&self) -> MapType {
        self.map_type
    }

    pub fn definitions(&self) -> &MapDefinitions {
        &self.definitions
    }

    /// Replaces the map definitions, keeping a width or height set by hand.
    pub fn set_definitions(&mut self, definitions: MapDefinitions) {
        self.definitions = definitions;
        if !self.width_manually_changed {
            self.width = self.definitions.map_settings.width;
            self.height = self.definitions.map_settings.height_for_width(self.width);
        }
    }

    pub fn basemap(&self) -> &Basemap {
        &self.basemap
    }

    pub fn set_basemap(&mut self, basemap: Basemap) {
        self.basemap = basemap;
    }

    /// Sets the width and derives the height from the configured height factor.
    pub fn set_pixel_width(&mut self, width: u32) {
        self.width = width;
        self.height = self.definitions.map_settings.height_for_width(width);
        self.width_manually_changed = true;
    }

    pub fn set_pixel_height(&mut self, height: u32) {
        self.height = height;
        self.width_manually_changed = true;
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn has_title(&self) -> bool {
        !self.title.is_empty()
    }

    /// Turns area names on hover (and image map titles) on or off.
    pub fn set_interactive(&mut self, interactive: bool) {
        self.interactive = interactive;
    }

    pub fn interactive(&self) -> bool {
        self.interactive
    }

    /// Sets the highlighted areas. Insertion order is the order they are drawn in.
    pub fn set_data(&mut self, data: IndexMap<String, OverlaySpec>) {
        self.highlighted = data;
    }

    pub fn data(&self) -> &IndexMap<String, OverlaySpec> {
        &self.highlighted
    }

    pub fn overlay(&self, id: &str) -> Option<&OverlaySpec> {
        self.highlighted.get(id)
    }

    /// Sets a link per area, all with the same optional target.
    pub fn set_links(&mut self, links: IndexMap<String, String>, target: Option<&str>) {
        for (id, href) in links {
            let link = self.links.entry(id).or_default();
            link.href = Some(href);
            if let Some(target) = target {
                link.target = Some(target.to_string());
            }
        }
    }

    /// Sets a link for every area; `%s` in the template is replaced by the area id.
    pub fn set_link(&mut self, template: impl Into<String>, target: Option<&str>) {
        let template = template.into();
        let target = match (target, self.general_link.take()) {
            (Some(target), _) => Some(target.to_string()),
            (None, previous) => previous.and_then(|link| link.target),
        };
        self.general_link = Some(GeneralLink { template, target });
    }

    /// Like [`MapRequest::set_link`], but only for highlighted areas.
    pub fn set_link_highlighted(&mut self, template: impl Into<String>, target: Option<&str>) {
        self.set_link(template, target);
        self.link_highlighted_only = true;
    }

    pub fn general_link(&self) -> Option<&GeneralLink> {
        self.general_link.as_ref()
    }

    pub fn link_highlighted_only(&self) -> bool {
        self.link_highlighted_only
    }

    pub fn link(&self, id: &str) -> Option<&LinkSpec> {
        self.links.get(id)
    }

    pub fn set_tooltips(&mut self, tooltips: IndexMap<String, String>) {
        self.tooltips = tooltips;
    }

    pub fn tooltip(&self, id: &str) -> Option<&str> {
        self.tooltips.get(id).map(String::as_str)
    }

    pub fn has_tooltips(&self) -> bool {
        !self.tooltips.is_empty()
    }

    /// Attaches a script snippet per area to one element event.
    pub fn set_java_script(&mut self, scripts: IndexMap<String, String>, event: ScriptEvent) {
        for (id, script) in scripts {
            let link = self.links.entry(id).or_default();
            match event {
                ScriptEvent::OnClick => link.onclick = Some(script),
                ScriptEvent::OnMouseOver => link.onmouseover = Some(script),
                ScriptEvent::OnMouseOut => link.onmouseout = Some(script),
            }
        }
    }

    pub fn possible_areas(&self) -> IndexMap<String, String> {
        self.basemap.possible_areas()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> MapRequest {
        MapRequest::new(
            MapType::Municipalities,
            MapDefinitions::default(),
            Basemap::default(),
        )
    }

    #[test]
    fn height_follows_width() {
        let mut request = request();
        assert_eq!((request.width(), request.height()), (640, 704));
        request.set_pixel_width(300);
        assert_eq!(request.height(), 330);
        request.set_pixel_height(500);
        assert_eq!((request.width(), request.height()), (300, 500));
    }

    #[test]
    fn new_definitions_keep_manual_size() {
        let mut request = request();
        let mut definitions = MapDefinitions::default();
        definitions.map_settings.width = 1000;
        request.set_definitions(definitions.clone());
        assert_eq!(request.width(), 1000);

        request.set_pixel_width(200);
        request.set_definitions(definitions);
        assert_eq!((request.width(), request.height()), (200, 220));
    }

    #[test]
    fn links_and_scripts_share_one_entry() {
        let mut request = request();
        request.set_links(
            IndexMap::from([("g_0003".to_string(), "http://example.com/".to_string())]),
            Some("_blank"),
        );
        request.set_java_script(
            IndexMap::from([("g_0003".to_string(), "alert('g_0003');".to_string())]),
            ScriptEvent::OnMouseOver,
        );
        let link = request.link("g_0003").unwrap();
        assert_eq!(link.href.as_deref(), Some("http://example.com/"));
        assert_eq!(link.target.as_deref(), Some("_blank"));
        assert_eq!(link.onmouseover.as_deref(), Some("alert('g_0003');"));
        assert!(link.onclick.is_none());
    }

    #[test]
    fn general_link_keeps_previous_target() {
        let mut request = request();
        request.set_link("http://example.com/?code=%s", Some("_top"));
        request.set_link_highlighted("http://example.com/?id=%s", None);
        let link = request.general_link().unwrap();
        assert_eq!(link.template, "http://example.com/?id=%s");
        assert_eq!(link.target.as_deref(), Some("_top"));
        assert!(request.link_highlighted_only());
    }

    #[test]
    fn parses_map_types_and_formats() {
        assert_eq!("gemeentes".parse::<MapType>().unwrap(), MapType::Municipalities);
        assert_eq!("provincies".parse::<MapType>().unwrap(), MapType::Provinces);
        assert!("nederland".parse::<MapType>().is_err());
        assert_eq!(MapType::MunicipalitiesNlFlanders.basemap_files().len(), 3);
        assert_eq!(MapType::additional_data_file("provincies"), Some("provinces.json"));

        assert_eq!("jpg".parse::<OutputFormat>().unwrap(), OutputFormat::Jpeg);
        assert_eq!(OutputFormat::Kml.mime_type(), "application/vnd.google-earth.kml+xml");
        assert!(matches!(
            "bmp".parse::<OutputFormat>(),
            Err(KaartError::UnsupportedFormat(_))
        ));
    }
}
