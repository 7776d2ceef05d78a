use crate::config::load_config;
use crate::geometry::{Basemap, BasemapLayer};
use crate::render::{render_map, write_output};
use crate::request::{MapRequest, MapType, OutputFormat};
use anyhow::{Context, Result};
use clap::Parser;
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "kaart", version, about = "Choropleth maps of Dutch and Flemish areas")]
pub struct Args {
    /// Map type (municipalities, corop, provinces, municipalities_nl_flanders, ...)
    #[arg(short = 't', long = "type", default_value = "municipalities")]
    pub map_type: MapType,

    /// Basemap GeoJSON file in RD coordinates. Defaults to the map type's files in --coords-dir
    #[arg(long = "basemap")]
    pub basemap: Option<PathBuf>,

    /// Directory holding the default basemap files
    #[arg(long = "coords-dir", default_value = "coords")]
    pub coords_dir: PathBuf,

    /// Extra layers drawn over the basemap, in order. A file, or a layer name
    /// (corop, provinces, dialectareas, border_nl_be) looked up in --coords-dir
    #[arg(long = "additional")]
    pub additional: Vec<PathBuf>,

    /// Output file. Defaults to stdout for SVG, KML and JSON
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Output format (svg, png, gif, jpeg, kml, json)
    #[arg(short = 'e', long = "outputFormat", default_value = "svg")]
    pub output_format: OutputFormat,

    /// Map definitions (JSON or JSON5) merged over the built-in defaults
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    /// Width in pixels; the height follows unless given
    #[arg(short = 'w', long = "width")]
    pub width: Option<u32>,

    /// Height in pixels
    #[arg(short = 'H', long = "height")]
    pub height: Option<u32>,

    /// Map title
    #[arg(long = "title")]
    pub title: Option<String>,

    /// JSON file mapping area ids to a color or {fill, outline, strokewidth}
    #[arg(long = "data")]
    pub data: Option<PathBuf>,

    /// JSON file mapping area ids to link URLs
    #[arg(long = "links")]
    pub links: Option<PathBuf>,

    /// JSON file mapping area ids to tooltip texts
    #[arg(long = "tooltips")]
    pub tooltips: Option<PathBuf>,

    /// Link for every area; %s is replaced by the area id
    #[arg(long = "link")]
    pub link: Option<String>,

    /// Link target (e.g. _blank)
    #[arg(long = "target")]
    pub target: Option<String>,

    /// Apply --link to highlighted areas only
    #[arg(long = "link-highlighted-only")]
    pub link_highlighted_only: bool,

    /// Show area names on hover
    #[arg(long = "interactive")]
    pub interactive: bool,

    /// Write the HTML image map of a raster map to this file
    #[arg(long = "imagemap")]
    pub imagemap: Option<PathBuf>,

    /// Print the ids and names of all areas and exit
    #[arg(long = "possible-areas")]
    pub possible_areas: bool,
}

pub fn run() -> Result<()> {
    let args = Args::parse();
    let request = build_request(&args)?;

    if args.possible_areas {
        for (id, name) in request.possible_areas() {
            println!("{id}\t{name}");
        }
        return Ok(());
    }

    if args.output_format.is_raster() {
        ensure_output(&args.output, args.output_format)?;
    }
    let rendered = render_map(&request, args.output_format)?;
    log::info!(
        "Rendered {} map as {} ({} bytes)",
        request.map_type(),
        args.output_format,
        rendered.bytes.len()
    );
    write_output(&rendered.bytes, args.output.as_deref())?;

    if let Some(path) = &args.imagemap {
        match &rendered.image_map {
            Some(image_map) => write_output(image_map.as_bytes(), Some(path))?,
            None => log::warn!(
                "No image map for {} output, {} not written",
                args.output_format,
                path.display()
            ),
        }
    }
    Ok(())
}

fn build_request(args: &Args) -> Result<MapRequest> {
    let definitions = load_config(args.config.as_deref())?;
    let additional = additional_layers(args);
    let basemap = match &args.basemap {
        Some(base) => Basemap::load(base, &additional)?,
        None => {
            let mut basemap = Basemap::for_map_type(&args.coords_dir, args.map_type)
                .with_context(|| {
                    format!(
                        "Loading {} basemap from {}",
                        args.map_type,
                        args.coords_dir.display()
                    )
                })?;
            for path in &additional {
                basemap.push_layer(BasemapLayer::load(path)?);
            }
            basemap
        }
    };

    let mut request = MapRequest::new(args.map_type, definitions, basemap);
    if let Some(width) = args.width {
        request.set_pixel_width(width);
    }
    if let Some(height) = args.height {
        request.set_pixel_height(height);
    }
    if let Some(title) = &args.title {
        request.set_title(title);
    }
    request.set_interactive(args.interactive);
    if let Some(path) = &args.data {
        request.set_data(read_json(path)?);
    }
    if let Some(path) = &args.links {
        let links: IndexMap<String, String> = read_json(path)?;
        request.set_links(links, args.target.as_deref());
    }
    if let Some(path) = &args.tooltips {
        request.set_tooltips(read_json(path)?);
    }
    if let Some(template) = &args.link {
        if args.link_highlighted_only {
            request.set_link_highlighted(template, args.target.as_deref());
        } else {
            request.set_link(template, args.target.as_deref());
        }
    }
    Ok(request)
}

/// Paths of the `--additional` layers. Names of known layers that are not
/// existing files resolve against the coordinate directory.
fn additional_layers(args: &Args) -> Vec<PathBuf> {
    args.additional
        .iter()
        .map(|entry| {
            let named = entry
                .to_str()
                .filter(|_| !entry.exists())
                .and_then(MapType::additional_data_file);
            match named {
                Some(file) => {
                    log::debug!("Additional layer {} is {file}", entry.display());
                    args.coords_dir.join(file)
                }
                None => entry.clone(),
            }
        })
        .collect()
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Reading {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("Parsing {}", path.display()))
}

fn ensure_output(output: &Option<PathBuf>, format: OutputFormat) -> Result<PathBuf> {
    if let Some(path) = output {
        return Ok(path.clone());
    }
    Err(anyhow::anyhow!(
        "Output path required for {} output",
        format
    ))
}
