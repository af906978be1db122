pub mod cleanup;
#[cfg(feature = "cli")]
pub mod cli;
pub mod color;
pub mod config;
pub mod contrast;
pub mod error;
pub mod placeholder;
pub mod render;
pub mod spatial;
pub mod svg_tree;
pub mod templates;
pub mod theme;

#[cfg(feature = "cli")]
pub use cli::run;
pub use error::{Result, ThemeError};
pub use placeholder::DataPoint;
pub use render::{render_diagram, DiagramMetadata, DiagramOutput, DiagramRequest, DiagramThemer};
pub use spatial::{ElementColorMap, SpatialStrategy};
pub use templates::TemplateCache;
pub use theme::{ColorScheme, Palette, ThemeBuilder, ThemeConfig};
