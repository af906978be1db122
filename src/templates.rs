use crate::error::{Result, ThemeError};
use once_cell::sync::Lazy;
use std::collections::BTreeMap;
use std::path::Path;

const BUILTIN_TEMPLATES: [(&str, &str); 12] = [
    ("matrix_2x2", include_str!("../templates/matrix_2x2.svg")),
    ("swot_matrix", include_str!("../templates/swot_matrix.svg")),
    ("hub_spoke_4", include_str!("../templates/hub_spoke_4.svg")),
    ("hub_spoke_6", include_str!("../templates/hub_spoke_6.svg")),
    ("pyramid_3_level", include_str!("../templates/pyramid_3_level.svg")),
    ("pyramid_5_level", include_str!("../templates/pyramid_5_level.svg")),
    ("venn_2_circle", include_str!("../templates/venn_2_circle.svg")),
    ("venn_3_circle", include_str!("../templates/venn_3_circle.svg")),
    ("cycle_3_step", include_str!("../templates/cycle_3_step.svg")),
    ("cycle_4_step", include_str!("../templates/cycle_4_step.svg")),
    ("process_flow_3", include_str!("../templates/process_flow_3.svg")),
    ("funnel_3_stage", include_str!("../templates/funnel_3_stage.svg")),
];

static BUILTIN: Lazy<TemplateCache> = Lazy::new(|| {
    let cache = TemplateCache::from_entries(
        BUILTIN_TEMPLATES
            .iter()
            .map(|(name, svg)| (name.to_string(), svg.to_string())),
    );
    tracing::info!(count = cache.len(), "loaded built-in templates");
    cache
});

/// Immutable map from diagram type to template SVG. Built once, then shared
/// read-only between requests.
#[derive(Debug, Clone, Default)]
pub struct TemplateCache {
    templates: BTreeMap<String, String>,
}

impl TemplateCache {
    pub fn from_entries(entries: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            templates: entries.into_iter().collect(),
        }
    }

    /// Templates compiled into the crate.
    pub fn builtin() -> &'static TemplateCache {
        &BUILTIN
    }

    /// Reads every `*.svg` in `dir`, keyed by file stem. Files that cannot be
    /// read are skipped with a warning.
    pub fn load_dir(dir: &Path) -> Result<Self> {
        let io_err = |source| ThemeError::TemplateIo {
            path: dir.to_path_buf(),
            source,
        };
        let mut templates = BTreeMap::new();
        for entry in std::fs::read_dir(dir).map_err(io_err)? {
            let path = entry.map_err(io_err)?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("svg") {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };
            match std::fs::read_to_string(&path) {
                Ok(svg) => {
                    templates.insert(name.to_string(), svg);
                }
                Err(err) => {
                    tracing::warn!(path = %path.display(), %err, "skipping unreadable template");
                }
            }
        }
        tracing::info!(dir = %dir.display(), count = templates.len(), "loaded templates");
        Ok(Self { templates })
    }

    pub fn supports(&self, diagram_type: &str) -> bool {
        self.templates.contains_key(diagram_type)
    }

    pub fn get(&self, diagram_type: &str) -> Option<&str> {
        self.templates.get(diagram_type).map(String::as_str)
    }

    /// Names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        self.templates.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}
