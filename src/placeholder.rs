use serde::{Deserialize, Serialize};

/// One caller-supplied label, matched positionally against a diagram's
/// placeholder schema. `value` is carried for the caller and not rendered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataPoint {
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
}

impl DataPoint {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: None,
        }
    }
}

const GENERIC_PLACEHOLDERS: usize = 10;

fn known_schema(diagram_type: &str) -> Option<&'static [&'static str]> {
    let schema: &'static [&'static str] = match diagram_type {
        "matrix_2x2" => &["High / High", "Low / High", "Low / Low", "High / Low"],
        "matrix_3x3" => &[
            "Cell 1", "Cell 2", "Cell 3", "Cell 4", "Cell 5", "Cell 6", "Cell 7", "Cell 8",
            "Cell 9",
        ],
        "swot_matrix" => &["Strengths", "Weaknesses", "Opportunities", "Threats"],
        "hub_spoke_4" => &["Central\nHub", "Node 1", "Node 2", "Node 3", "Node 4"],
        "hub_spoke_6" => &[
            "Central\nHub",
            "Node 1",
            "Node 2",
            "Node 3",
            "Node 4",
            "Node 5",
            "Node 6",
        ],
        "process_flow_3" => &["Input", "Process", "Output"],
        "process_flow_5" => &["Input", "Process", "Transform", "Validate", "Output"],
        "gears_3" => &["Process", "System", "Output"],
        "roadmap_quarterly_4" => &["Q1", "Q2", "Q3", "Q4"],
        "venn_2_circle" => &["Set A", "Set B", "A ∩ B"],
        "venn_3_circle" => &[
            "Set A", "Set B", "Set C", "A ∩ B", "A ∩ C", "B ∩ C", "A∩B∩C",
        ],
        "honeycomb_3" => &["Core", "Cell 2", "Cell 3"],
        "honeycomb_5" => &["Core", "Cell 2", "Cell 3", "Cell 4", "Cell 5"],
        "honeycomb_7" => &[
            "Core", "Cell 2", "Cell 3", "Cell 4", "Cell 5", "Cell 6", "Cell 7",
        ],
        "timeline_horizontal" => &["Event 1", "Event 2", "Event 3", "Event 4"],
        "pyramid_3_level" => &["Peak Level", "Core Level", "Foundation Level"],
        "pyramid_4_level" => &["Vision", "Strategy", "Development", "Foundation"],
        "pyramid_5_level" => &[
            "Vision",
            "Strategy",
            "Planning",
            "Implementation",
            "Foundation",
        ],
        "cycle_3_step" => &["Step 1", "Step 2", "Step 3"],
        "cycle_4_step" => &["Step 1", "Step 2", "Step 3", "Step 4"],
        "cycle_5_step" => &["Define", "Measure", "Analyze", "Improve", "Control"],
        "funnel_3_stage" => &["Stage 1", "Stage 2", "Stage 3"],
        "funnel_4_stage" => &["Stage 1", "Stage 2", "Stage 3", "Stage 4"],
        "funnel_5_stage" => &["Stage 1", "Stage 2", "Stage 3", "Stage 4", "Stage 5"],
        "fishbone_4_bone" => &["Cause 1", "Cause 2", "Cause 3", "Cause 4"],
        _ => return None,
    };
    Some(schema)
}

/// Ordered placeholder texts for `diagram_type`; unknown types get
/// `Item 1` through `Item 10`.
pub fn placeholder_schema(diagram_type: &str) -> Vec<String> {
    match known_schema(diagram_type) {
        Some(schema) => schema.iter().map(|s| s.to_string()).collect(),
        None => (1..=GENERIC_PLACEHOLDERS)
            .map(|i| format!("Item {i}"))
            .collect(),
    }
}

fn sentinel(index: usize) -> String {
    format!("\u{E000}{index}\u{E001}")
}

/// Substitutes labels for placeholders in `svg`.
///
/// Every placeholder is first swapped for a private-use sentinel and only then
/// for its escaped label, so a label that spells a later placeholder is left
/// alone. Data points past the end of the schema are ignored, as are empty
/// labels.
pub fn resolve_placeholders(svg: &str, diagram_type: &str, points: &[DataPoint]) -> String {
    let schema = placeholder_schema(diagram_type);
    let mut out = svg.to_string();
    let mut pending = Vec::new();

    for (index, (placeholder, point)) in schema.iter().zip(points).enumerate() {
        if placeholder.is_empty() || point.label.is_empty() {
            continue;
        }
        let marker = sentinel(index);
        if placeholder.contains('\n') {
            let parts: Vec<&str> = placeholder.split('\n').collect();
            let continuous = parts.concat();
            if out.contains(&continuous) {
                out = out.replace(&continuous, &marker);
            }
            let mut placed = false;
            for part in parts {
                let exact = format!(">{part}<");
                if !out.contains(&exact) {
                    continue;
                }
                let replacement = if placed {
                    "><".to_string()
                } else {
                    format!(">{marker}<")
                };
                out = out.replace(&exact, &replacement);
                placed = true;
            }
        } else {
            out = out.replace(placeholder.as_str(), &marker);
        }
        pending.push((marker, escape_xml(&point.label)));
    }

    for (marker, label) in pending {
        out = out.replace(&marker, &label);
    }
    tracing::debug!(diagram_type, labels = points.len(), "placeholders resolved");
    out
}

fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
