#[cfg(feature = "cli")]
pub mod cli;
pub mod color;
pub mod config;
pub mod error;
pub mod geometry;
pub mod render;
pub mod request;
pub mod style;
#[cfg(feature = "bitmap")]
pub mod text_metrics;
pub mod theme;
pub mod transform;
pub mod xml;

#[cfg(feature = "cli")]
pub use cli::run;
pub use config::{MapDefinitions, load_config};
pub use error::{KaartError, Result};
pub use geometry::{Basemap, BasemapLayer, Feature, Geometry};
pub use render::{RenderedMap, render_map, write_output};
pub use request::{MapRequest, MapType, OutputFormat, ScriptEvent};
pub use style::{LinkSpec, OverlaySpec};
