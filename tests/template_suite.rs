use std::collections::HashSet;

use svg_diagram_themer::cleanup;
use svg_diagram_themer::color::{hex_to_hsl, hex_to_rgb, is_hex_color, relative_luminance};
use svg_diagram_themer::config::EngineConfig;
use svg_diagram_themer::{
    ColorScheme, DataPoint, DiagramRequest, DiagramThemer, TemplateCache, ThemeBuilder,
    ThemeConfig, render_diagram,
};

const PRIMARIES: [&str; 6] = [
    "#10b981", "#3b82f6", "#ef4444", "#808080", "#000000", "#ffffff",
];

fn request(diagram_type: &str, labels: &[&str], theme: ThemeConfig) -> DiagramRequest {
    DiagramRequest {
        diagram_type: diagram_type.to_string(),
        data_points: labels.iter().map(|label| DataPoint::new(*label)).collect(),
        theme,
    }
}

fn themes() -> Vec<ThemeConfig> {
    let mut themes = Vec::new();
    for primary in PRIMARIES {
        for scheme in [ColorScheme::Monochromatic, ColorScheme::Complementary] {
            themes.push(ThemeConfig::new(primary).with_scheme(scheme));
        }
    }
    themes
}

fn render(diagram_type: &str, theme: ThemeConfig) -> String {
    render_diagram(&request(diagram_type, &[], theme))
        .unwrap_or_else(|err| panic!("{diagram_type}: {err}"))
        .content
}

fn fill_of(svg: &str, id: &str) -> String {
    let doc = roxmltree::Document::parse(svg).expect("output parses");
    doc.descendants()
        .find(|node| node.attribute("id") == Some(id))
        .and_then(|node| node.attribute("fill"))
        .unwrap_or_else(|| panic!("no fill for #{id}"))
        .to_string()
}

fn luminance(hex: &str) -> f64 {
    relative_luminance(hex_to_rgb(hex).unwrap())
}

fn assert_pairwise_distinct(colors: &[String], context: &str) {
    let unique: HashSet<&String> = colors.iter().collect();
    assert_eq!(unique.len(), colors.len(), "{context}: {colors:?}");
}

#[test]
fn every_template_renders_with_black_or_white_text() {
    let cache = TemplateCache::builtin();
    assert_eq!(cache.len(), 12);
    for name in cache.names() {
        for theme in themes() {
            let svg = render(name, theme.clone());
            let doc = roxmltree::Document::parse(&svg)
                .unwrap_or_else(|err| panic!("{name}: output is not XML: {err}"));
            for text in doc.descendants().filter(|n| n.has_tag_name("text")) {
                let fill = text.attribute("fill");
                assert!(
                    matches!(fill, Some("#000000") | Some("#ffffff")),
                    "{name} {:?}: text {:?} has fill {fill:?}",
                    theme.primary_color,
                    text.attribute("id")
                );
            }
            assert!(!svg.contains("url(#"), "{name}: gradient reference left");
            assert!(!svg.contains("Gradient"), "{name}: gradient definition left");
            assert!(!svg.contains("_title"), "{name}: title left");
        }
    }
}

#[test]
fn filled_shapes_have_matching_strokes_and_connectors_keep_theirs() {
    for name in TemplateCache::builtin().names() {
        let svg = render(name, ThemeConfig::new("#6366f1"));
        let doc = roxmltree::Document::parse(&svg).unwrap();
        for node in doc.descendants().filter(|n| {
            matches!(
                n.tag_name().name(),
                "rect" | "circle" | "path" | "polygon" | "ellipse"
            )
        }) {
            let (Some(fill), Some(stroke)) = (node.attribute("fill"), node.attribute("stroke"))
            else {
                continue;
            };
            if fill == "none" {
                assert!(matches!(stroke, "#64748b" | "#94a3b8"), "{name}: {stroke}");
                continue;
            }
            if is_hex_color(fill) {
                assert_eq!(fill, stroke, "{name}: {:?}", node.attribute("id"));
            }
        }
    }
}

#[test]
fn matrix_quadrants_are_pairwise_distinct() {
    for diagram_type in ["matrix_2x2", "swot_matrix"] {
        for theme in themes() {
            let svg = render(diagram_type, theme.clone());
            let fills: Vec<String> = (1..=4).map(|q| fill_of(&svg, &format!("q{q}_fill"))).collect();
            assert_pairwise_distinct(&fills, &format!("{diagram_type} {}", theme.primary_color));
        }
    }
}

#[test]
fn monochromatic_emerald_matrix_has_four_distinct_quadrant_fills() {
    let theme = ThemeConfig::new("#10b981").with_scheme(ColorScheme::Monochromatic);
    let svg = render("matrix_2x2", theme);
    let fills: Vec<String> = (1..=4).map(|q| fill_of(&svg, &format!("q{q}_fill"))).collect();
    assert!(fills.iter().all(|fill| is_hex_color(fill)), "{fills:?}");
    assert_pairwise_distinct(&fills, "matrix_2x2 #10b981");
}

#[test]
fn hub_differs_from_every_spoke_and_spokes_differ() {
    for (diagram_type, spokes) in [("hub_spoke_4", 4), ("hub_spoke_6", 6)] {
        for theme in themes() {
            let svg = render(diagram_type, theme.clone());
            let hub = fill_of(&svg, "hub_fill");
            let spoke_fills: Vec<String> = (1..=spokes)
                .map(|i| fill_of(&svg, &format!("spoke_{i}_fill")))
                .collect();
            let context = format!("{diagram_type} {}", theme.primary_color);
            assert!(!spoke_fills.contains(&hub), "{context}: hub {hub} reused");
            assert_pairwise_distinct(&spoke_fills, &context);
        }
    }
}

#[test]
fn pyramid_lightness_never_decreases_toward_the_top() {
    for (diagram_type, levels) in [("pyramid_3_level", 3), ("pyramid_5_level", 5)] {
        for theme in themes() {
            let svg = render(diagram_type, theme.clone());
            let fills: Vec<String> = (1..=levels)
                .map(|i| fill_of(&svg, &format!("level_{i}")))
                .collect();
            let lightness: Vec<f64> = fills.iter().map(|f| hex_to_hsl(f).unwrap().l).collect();
            assert!(
                lightness.windows(2).all(|pair| pair[0] <= pair[1]),
                "{diagram_type} {}: {fills:?}",
                theme.primary_color
            );
            assert_pairwise_distinct(&fills, diagram_type);
        }
    }
}

#[test]
fn venn_intersections_are_darker_than_their_circles() {
    let cases: [(&str, &[(&str, &str, &str)]); 2] = [
        ("venn_2_circle", &[("intersection_ab", "circle_1", "circle_2")]),
        (
            "venn_3_circle",
            &[
                ("intersection_ab", "circle_1", "circle_2"),
                ("intersection_ac", "circle_1", "circle_3"),
                ("intersection_bc", "circle_2", "circle_3"),
            ],
        ),
    ];
    for (diagram_type, overlaps) in cases {
        for theme in themes() {
            let svg = render(diagram_type, theme.clone());
            for (overlap, a, b) in overlaps {
                let (mid, left, right) = (
                    fill_of(&svg, overlap),
                    fill_of(&svg, a),
                    fill_of(&svg, b),
                );
                let context = format!("{diagram_type} {} {overlap}", theme.primary_color);
                assert_ne!(mid, left, "{context}");
                assert_ne!(mid, right, "{context}");
                assert!(
                    luminance(&mid) < luminance(&left).max(luminance(&right)),
                    "{context}: {mid} vs {left}/{right}"
                );
            }
        }
    }
}

#[test]
fn cycle_labels_replace_default_steps() {
    let req = request(
        "cycle_3_step",
        &["Plan", "Do", "Check"],
        ThemeConfig::new("#2563eb"),
    );
    let out = render_diagram(&req).unwrap();
    for label in ["Plan", "Do", "Check"] {
        assert!(out.content.contains(label), "missing {label}");
    }
    for placeholder in ["Step 1", "Step 2", "Step 3"] {
        assert!(!out.content.contains(placeholder), "left {placeholder}");
    }
    assert_eq!(out.metadata.template_used, "cycle_3_step");
    assert_eq!(out.metadata.elements_modified, 3);
}

#[test]
fn hub_label_replaces_both_placeholder_lines() {
    let req = request("hub_spoke_4", &["Platform", "Web"], ThemeConfig::new("#0891b2"));
    let svg = render_diagram(&req).unwrap().content;
    assert!(svg.contains(">Platform<"));
    assert!(!svg.contains(">Central<"));
    assert!(!svg.contains(">Hub<"));
    assert!(svg.contains(">Web<"));
    assert!(svg.contains(">Node 2<"));
}

#[test]
fn cleanup_is_idempotent_on_rendered_output() {
    let config = EngineConfig::default();
    for name in TemplateCache::builtin().names() {
        for theme in themes().into_iter().take(4) {
            let palette = ThemeBuilder::from_config(&theme, &config).unwrap().palette;
            let svg = render(name, theme);
            let again = cleanup::run(&svg, &palette, &config.cleanup);
            assert_eq!(again, svg, "{name}");
        }
    }
}

#[test]
fn custom_template_directory_is_served() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("status_board.svg"),
        r##"<svg xmlns="http://www.w3.org/2000/svg"><rect id="tile_fill" fill="#dbeafe" stroke="#000000"/><text id="tile_text">Item 1</text><text id="other">Item 2</text></svg>"##,
    )
    .unwrap();
    let cache = TemplateCache::load_dir(dir.path()).unwrap();
    let themer = DiagramThemer::new(&cache, EngineConfig::default());
    let out = themer
        .render(&request("status_board", &["Green"], ThemeConfig::new("#1e3a8a")))
        .unwrap();
    assert!(out.content.contains(">Green<"));
    assert!(out.content.contains(">Item 2<"));
    assert!(!out.content.contains("#dbeafe"));
    let tile = fill_of(&out.content, "tile_fill");
    assert_eq!(
        fill_of(&out.content, "tile_text"),
        if luminance(&tile) > 0.179 { "#000000" } else { "#ffffff" }
    );
}

#[test]
fn every_fill_region_is_distinct_for_every_theme() {
    for name in TemplateCache::builtin().names() {
        for theme in themes() {
            let context = format!("{name} {} {:?}", theme.primary_color, theme.color_scheme);
            let svg = render(name, theme);
            let doc = roxmltree::Document::parse(&svg).expect("output parses");
            let fills: Vec<String> = doc
                .descendants()
                .filter(|node| node.attribute("id").is_some_and(|id| id.ends_with("_fill")))
                .filter_map(|node| node.attribute("fill").map(str::to_string))
                .collect();
            assert_pairwise_distinct(&fills, &context);
        }
    }
}

fn assert_send_sync<T: Send + Sync>() {}

#[test]
fn renderer_is_shareable_across_threads() {
    assert_send_sync::<TemplateCache>();
    assert_send_sync::<EngineConfig>();
    assert_send_sync::<DiagramThemer<'static>>();

    let cache = TemplateCache::builtin();
    let themer = DiagramThemer::new(cache, EngineConfig::default());
    let jobs: Vec<(&str, ThemeConfig)> = cache
        .names()
        .into_iter()
        .flat_map(|name| themes().into_iter().take(4).map(move |theme| (name, theme)))
        .collect();
    let sequential: Vec<String> = jobs
        .iter()
        .map(|(name, theme)| themer.render(&request(name, &[], theme.clone())).unwrap().content)
        .collect();

    let concurrent: Vec<Vec<String>> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| {
                scope.spawn(|| {
                    jobs.iter()
                        .map(|(name, theme)| {
                            themer.render(&request(name, &[], theme.clone())).unwrap().content
                        })
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        handles.into_iter().map(|handle| handle.join().unwrap()).collect()
    });
    for outputs in concurrent {
        assert_eq!(outputs, sequential);
    }
}
