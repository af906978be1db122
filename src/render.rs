use crate::cleanup;
use crate::config::{EngineConfig, RenderConfig};
use crate::contrast::resolve_text_colors;
use crate::error::{Result, ThemeError};
use crate::placeholder::{resolve_placeholders, DataPoint};
use crate::spatial::{self, apply_colors, ElementColorMap, SpatialPlan, SpatialStrategy};
use crate::svg_tree::SvgTree;
use crate::templates::TemplateCache;
use crate::theme::{apply_basic_theme, ThemeBuilder, ThemeConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const GENERATION_METHOD: &str = "svg_template";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagramRequest {
    pub diagram_type: String,
    #[serde(default)]
    pub data_points: Vec<DataPoint>,
    pub theme: ThemeConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagramMetadata {
    pub generation_method: String,
    pub template_used: String,
    pub elements_modified: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagramOutput {
    pub content: String,
    pub metadata: DiagramMetadata,
}

/// Turns a template plus labels and a theme into a finished SVG. Holds only
/// shared read-only state, so one instance can serve any number of threads.
#[derive(Debug, Clone)]
pub struct DiagramThemer<'a> {
    templates: &'a TemplateCache,
    config: EngineConfig,
}

impl<'a> DiagramThemer<'a> {
    pub fn new(templates: &'a TemplateCache, config: EngineConfig) -> Self {
        Self { templates, config }
    }

    pub fn templates(&self) -> &TemplateCache {
        self.templates
    }

    pub fn render(&self, request: &DiagramRequest) -> Result<DiagramOutput> {
        let diagram_type = request.diagram_type.as_str();
        let template = self
            .templates
            .get(diagram_type)
            .ok_or_else(|| ThemeError::UnsupportedDiagramType(diagram_type.to_string()))?;
        request.theme.validate()?;

        let svg = resolve_placeholders(template, diagram_type, &request.data_points);
        let content = if request.theme.use_smart_theming {
            self.smart_theme(diagram_type, &svg, &request.theme)?
        } else {
            let svg = apply_basic_theme(&svg, &request.theme)?;
            resolve_text_colors(&svg, &ElementColorMap::new(), self.config.contrast_threshold)
        };

        tracing::debug!(
            diagram_type,
            smart = request.theme.use_smart_theming,
            bytes = content.len(),
            "rendered diagram"
        );
        Ok(DiagramOutput {
            content,
            metadata: DiagramMetadata {
                generation_method: GENERATION_METHOD.to_string(),
                template_used: diagram_type.to_string(),
                elements_modified: request.data_points.len(),
            },
        })
    }

    fn smart_theme(&self, diagram_type: &str, svg: &str, theme: &ThemeConfig) -> Result<String> {
        let theme = ThemeBuilder::from_config(theme, &self.config)?;
        let plan = plan_regions(diagram_type, svg);

        let owned = plan.owned();
        let svg = theme.apply_to_svg_except(svg, &owned);
        let svg = cleanup::run(&svg, &theme.palette, &self.config.cleanup);

        let (svg, colors) = if plan.strategy() == SpatialStrategy::None {
            (svg, ElementColorMap::new())
        } else {
            let colored = plan.assign(&theme).and_then(|colors| {
                let tree = SvgTree::parse(&svg).map_err(|err| ThemeError::TemplateParse {
                    template: diagram_type.to_string(),
                    message: err.to_string(),
                })?;
                Ok((apply_colors(&svg, &tree, &colors), colors))
            });
            match colored {
                Ok(colored) => colored,
                Err(err) => {
                    tracing::warn!(diagram_type, %err, "region colors skipped, baseline recolor applied to owned elements");
                    (theme.apply_to_svg_only(&svg, &owned), ElementColorMap::new())
                }
            }
        };
        Ok(resolve_text_colors(&svg, &colors, self.config.contrast_threshold))
    }
}

/// Spatial plan for the template, or an empty one when the template cannot
/// support its strategy.
fn plan_regions(diagram_type: &str, svg: &str) -> SpatialPlan {
    let planned = SvgTree::parse(svg)
        .map_err(|err| ThemeError::TemplateParse {
            template: diagram_type.to_string(),
            message: err.to_string(),
        })
        .and_then(|tree| spatial::plan(diagram_type, &tree));
    match planned {
        Ok(plan) => plan,
        Err(err) => {
            tracing::warn!(%err, "falling back to baseline recolor");
            SpatialPlan::none()
        }
    }
}

/// Renders `request` against the built-in templates with default settings.
pub fn render_diagram(request: &DiagramRequest) -> Result<DiagramOutput> {
    DiagramThemer::new(TemplateCache::builtin(), EngineConfig::default()).render(request)
}

pub fn write_output_svg(svg: &str, output: Option<&Path>) -> anyhow::Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, svg)?;
        }
        None => {
            print!("{}", svg);
        }
    }
    Ok(())
}

#[cfg(feature = "png")]
pub fn write_output_png(svg: &str, output: &Path, render_cfg: &RenderConfig) -> anyhow::Result<()> {
    let mut opt = usvg::Options::default();
    opt.fontdb_mut().load_system_fonts();
    opt.default_size = usvg::Size::from_wh(render_cfg.width, render_cfg.height)
        .or(usvg::Size::from_wh(800.0, 600.0))
        .ok_or_else(|| anyhow::anyhow!("invalid render size"))?;

    let tree = usvg::Tree::from_str(svg, &opt)?;
    let size = tree.size().to_int_size();
    let mut pixmap = resvg::tiny_skia::Pixmap::new(size.width(), size.height())
        .ok_or_else(|| anyhow::anyhow!("Failed to allocate pixmap"))?;

    let mut pixmap_mut = pixmap.as_mut();
    resvg::render(&tree, resvg::tiny_skia::Transform::default(), &mut pixmap_mut);
    pixmap.save_png(output)?;
    Ok(())
}

#[cfg(not(feature = "png"))]
pub fn write_output_png(_svg: &str, _output: &Path, _render_cfg: &RenderConfig) -> anyhow::Result<()> {
    anyhow::bail!("PNG output requires the `png` feature")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::theme::ColorScheme;

    fn request(diagram_type: &str, labels: &[&str], theme: ThemeConfig) -> DiagramRequest {
        DiagramRequest {
            diagram_type: diagram_type.to_string(),
            data_points: labels.iter().map(|l| DataPoint::new(*l)).collect(),
            theme,
        }
    }

    #[test]
    fn unsupported_type_fails_before_color_checks() {
        let req = request("gantt", &[], ThemeConfig::new("not-a-color"));
        assert!(matches!(
            render_diagram(&req),
            Err(ThemeError::UnsupportedDiagramType(name)) if name == "gantt"
        ));
    }

    #[test]
    fn invalid_color_is_rejected() {
        let req = request("matrix_2x2", &[], ThemeConfig::new("#12345"));
        assert!(matches!(render_diagram(&req), Err(ThemeError::InvalidColor(_))));
    }

    #[test]
    fn metadata_reports_template_and_label_count() {
        let req = request(
            "process_flow_3",
            &["Collect", "Clean", "Ship"],
            ThemeConfig::new("#2563eb"),
        );
        let out = render_diagram(&req).unwrap();
        assert_eq!(out.metadata.generation_method, "svg_template");
        assert_eq!(out.metadata.template_used, "process_flow_3");
        assert_eq!(out.metadata.elements_modified, 3);
        assert!(out.content.contains("Collect"));
    }

    #[test]
    fn malformed_template_degrades_to_baseline_recolor() {
        let cache = TemplateCache::from_entries([(
            "matrix_2x2".to_string(),
            r##"<svg xmlns="http://www.w3.org/2000/svg"><rect id="q1_fill" fill="#dbeafe" stroke="#94a3b8"/><text id="q1_text" x="1" y="200">High / High</text></svg>"##
                .to_string(),
        )]);
        let themer = DiagramThemer::new(&cache, EngineConfig::default());
        let theme = ThemeConfig::new("#3b82f6").with_scheme(ColorScheme::Complementary);
        let out = themer.render(&request("matrix_2x2", &["Quick wins"], theme.clone())).unwrap();

        let builder = ThemeBuilder::from_config(&theme, &EngineConfig::default()).unwrap();
        let baseline = builder.mapped_color("#dbeafe").unwrap();
        assert!(out.content.contains(&format!(r#"fill="{baseline}" stroke="{baseline}""#)));
        assert!(out.content.contains("Quick wins"));
    }

    const QUADRANTS: &str = r##"<rect id="q1_fill" fill="#dbeafe" stroke="#94a3b8"/><rect id="q2_fill" fill="#dcfce7"/><rect id="q3_fill" fill="#fef3c7"/><rect id="q4_fill" fill="#fee2e2"/>"##;

    fn single_template(svg: String) -> TemplateCache {
        TemplateCache::from_entries([("matrix_2x2".to_string(), svg)])
    }

    #[test]
    fn self_closing_title_keeps_document_and_region_colors() {
        let cache = single_template(format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg"><text id="m_title" y="40"/><g><text id="x">x</text></g>{QUADRANTS}</svg>"#
        ));
        let themer = DiagramThemer::new(&cache, EngineConfig::default());
        let out = themer.render(&request("matrix_2x2", &[], ThemeConfig::new("#3b82f6"))).unwrap();

        let tree = SvgTree::parse(&out.content).expect("output stays well-formed");
        assert!(tree.has_id("x"));
        assert!(!tree.has_id("m_title"));
        let fills: Vec<&str> = (1..=4)
            .map(|q| tree.element_by_id(&format!("q{q}_fill")).and_then(|e| e.fill()).unwrap())
            .collect();
        for raw in ["#dbeafe", "#dcfce7", "#fef3c7", "#fee2e2"] {
            assert!(!fills.contains(&raw), "{fills:?}");
        }
        assert_eq!(fills.iter().collect::<std::collections::HashSet<_>>().len(), 4);
    }

    #[test]
    fn unparsable_cleanup_output_recolors_owned_regions_with_baseline() {
        // The comment fools the gradient pass into cutting the definition short.
        let cache = single_template(format!(
            r##"<svg xmlns="http://www.w3.org/2000/svg"><defs><linearGradient id="g"><!-- </linearGradient> --><stop offset="0" stop-color="#fff"/></linearGradient></defs>{QUADRANTS}</svg>"##
        ));
        let themer = DiagramThemer::new(&cache, EngineConfig::default());
        let theme = ThemeConfig::new("#3b82f6").with_scheme(ColorScheme::Complementary);
        let out = themer.render(&request("matrix_2x2", &[], theme.clone())).unwrap();

        let builder = ThemeBuilder::from_config(&theme, &EngineConfig::default()).unwrap();
        let baseline = builder.mapped_color("#dbeafe").unwrap();
        assert!(out.content.contains(&format!(r#"id="q1_fill" fill="{baseline}" stroke="{baseline}""#)));
        for raw in ["#dbeafe", "#dcfce7", "#fef3c7", "#fee2e2"] {
            assert!(!out.content.contains(raw), "{raw} left in {}", out.content);
        }
    }

    #[test]
    fn basic_mode_skips_cleanup_but_still_fixes_text() {
        let mut theme = ThemeConfig::new("#1d4ed8");
        theme.use_smart_theming = false;
        let out = render_diagram(&request("cycle_3_step", &["Plan"], theme)).unwrap();
        assert!(out.content.contains("Plan"));
        assert!(out.content.contains("_title"));
        assert!(out.content.contains("#1d4ed8"));
    }

    #[test]
    fn request_deserializes_from_wire_json() {
        let req: DiagramRequest = serde_json::from_str(
            r##"{"diagram_type":"cycle_3_step","data_points":[{"label":"Plan","value":1.5}],
                "theme":{"primaryColor":"#10b981","colorScheme":"monochromatic","useSmartTheming":true}}"##,
        )
        .unwrap();
        assert_eq!(req.data_points[0].value, Some(1.5));
        assert_eq!(req.theme.color_scheme, ColorScheme::Monochromatic);
    }
}
