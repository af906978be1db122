use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ThemeError {
    #[error("no template cached for diagram type `{0}`")]
    UnsupportedDiagramType(String),
    #[error("invalid color `{0}`: expected #RRGGBB")]
    InvalidColor(String),
    #[error("template `{template}` is missing expected element ids: {}", missing.join(", "))]
    MalformedTemplate {
        template: String,
        missing: Vec<String>,
    },
    #[error("no free color left near `{0}` for another region")]
    ColorsExhausted(String),
    #[error("template `{template}` is not well-formed SVG: {message}")]
    TemplateParse { template: String, message: String },
    #[error("failed to read templates from {}: {source}", path.display())]
    TemplateIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, ThemeError>;
