//! Arena view of an SVG document.
//!
//! Elements live in a flat `Vec` with parent/child links stored as indices.
//! Each element remembers the byte range of its start tag so attribute edits
//! can be spliced back into the original text without re-serializing it.

use std::collections::HashMap;
use std::ops::Range;

#[derive(Debug, Clone)]
pub struct SvgElement {
    pub tag: String,
    pub id: Option<String>,
    pub parent: Option<usize>,
    pub children: Vec<usize>,
    pub start_tag: Range<usize>,
    attrs: Vec<(String, String)>,
}

impl SvgElement {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn fill(&self) -> Option<&str> {
        self.attr("fill")
    }

    pub fn class(&self) -> Option<&str> {
        self.attr("class")
    }

    pub fn is_shape(&self) -> bool {
        matches!(
            self.tag.as_str(),
            "rect" | "circle" | "path" | "polygon" | "ellipse"
        )
    }
}

#[derive(Debug, Clone, Default)]
pub struct SvgTree {
    elements: Vec<SvgElement>,
    by_id: HashMap<String, usize>,
}

impl SvgTree {
    pub fn parse(svg: &str) -> Result<Self, roxmltree::Error> {
        let doc = roxmltree::Document::parse(svg)?;
        let mut elements = Vec::new();
        push_element(doc.root_element(), None, svg, &mut elements);
        let mut by_id = HashMap::new();
        for (idx, element) in elements.iter().enumerate() {
            if let Some(id) = &element.id {
                by_id.entry(id.clone()).or_insert(idx);
            }
        }
        Ok(Self { elements, by_id })
    }

    pub fn elements(&self) -> &[SvgElement] {
        &self.elements
    }

    pub fn get(&self, idx: usize) -> &SvgElement {
        &self.elements[idx]
    }

    pub fn find_by_id(&self, id: &str) -> Option<usize> {
        self.by_id.get(id).copied()
    }

    pub fn element_by_id(&self, id: &str) -> Option<&SvgElement> {
        self.find_by_id(id).map(|idx| &self.elements[idx])
    }

    pub fn has_id(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    /// Walks from `idx`'s parent up to the root.
    pub fn ancestors(&self, idx: usize) -> impl Iterator<Item = usize> + '_ {
        std::iter::successors(self.elements[idx].parent, move |&i| self.elements[i].parent)
    }

    pub fn descendants(&self, idx: usize) -> Vec<usize> {
        let mut out = Vec::new();
        let mut stack: Vec<usize> = self.elements[idx].children.iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.elements[next].children.iter().rev().copied());
        }
        out
    }
}

fn push_element(
    node: roxmltree::Node<'_, '_>,
    parent: Option<usize>,
    svg: &str,
    out: &mut Vec<SvgElement>,
) -> usize {
    let start = node.range().start;
    let idx = out.len();
    out.push(SvgElement {
        tag: node.tag_name().name().to_string(),
        id: node.attribute("id").map(str::to_string),
        parent,
        children: Vec::new(),
        start_tag: start..start_tag_end(svg, start),
        attrs: node
            .attributes()
            .map(|attr| (attr.name().to_string(), attr.value().to_string()))
            .collect(),
    });
    for child in node.children().filter(|child| child.is_element()) {
        let child_idx = push_element(child, Some(idx), svg, out);
        out[idx].children.push(child_idx);
    }
    idx
}

/// Index just past the `>` closing the tag that opens at `start`.
fn start_tag_end(svg: &str, start: usize) -> usize {
    let mut quote = None;
    for (offset, byte) in svg.as_bytes()[start..].iter().copied().enumerate() {
        match (quote, byte) {
            (None, b'"' | b'\'') => quote = Some(byte),
            (Some(q), b) if b == q => quote = None,
            (None, b'>') => return start + offset + 1,
            _ => {}
        }
    }
    svg.len()
}

/// Attribute edits on start tags, applied back to front in one pass.
#[derive(Debug, Default)]
pub struct SvgPatch {
    edits: Vec<(Range<usize>, String)>,
}

impl SvgPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_attrs(&mut self, svg: &str, element: &SvgElement, attrs: &[(&str, &str)]) {
        let mut tag = svg[element.start_tag.clone()].to_string();
        for (name, value) in attrs {
            tag = set_attr(&tag, name, value);
        }
        self.edits.push((element.start_tag.clone(), tag));
    }

    pub fn len(&self) -> usize {
        self.edits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    pub fn apply(mut self, svg: &str) -> String {
        self.edits.sort_by(|a, b| b.0.start.cmp(&a.0.start));
        let mut out = svg.to_string();
        for (range, replacement) in self.edits {
            out.replace_range(range, &replacement);
        }
        out
    }
}

struct AttrSpan {
    name: Range<usize>,
    value: Range<usize>,
}

/// Locates `name="value"` pairs in a single start tag such as `<rect x="1"/>`.
fn scan_attrs(tag: &str) -> Vec<AttrSpan> {
    let bytes = tag.as_bytes();
    let mut spans = Vec::new();
    let mut i = 1;
    while i < bytes.len() && !bytes[i].is_ascii_whitespace() && bytes[i] != b'>' && bytes[i] != b'/' {
        i += 1;
    }
    loop {
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        if i >= bytes.len() || bytes[i] == b'>' || bytes[i] == b'/' {
            return spans;
        }
        let name_start = i;
        while i < bytes.len()
            && !bytes[i].is_ascii_whitespace()
            && !matches!(bytes[i], b'=' | b'>' | b'/')
        {
            i += 1;
        }
        let name = name_start..i;
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        if i >= bytes.len() || bytes[i] != b'=' {
            continue;
        }
        i += 1;
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        let Some(&quote) = bytes.get(i).filter(|b| matches!(**b, b'"' | b'\'')) else {
            return spans;
        };
        let value_start = i + 1;
        let Some(len) = bytes[value_start..].iter().position(|b| *b == quote) else {
            return spans;
        };
        spans.push(AttrSpan {
            name,
            value: value_start..value_start + len,
        });
        i = value_start + len + 1;
    }
}

/// Value of `name` in a raw start tag.
pub fn attr_value<'a>(tag: &'a str, name: &str) -> Option<&'a str> {
    scan_attrs(tag)
        .into_iter()
        .find(|span| &tag[span.name.clone()] == name)
        .map(|span| &tag[span.value])
}

/// Rewrites (or appends) `name="value"` in a raw start tag.
pub fn set_attr(tag: &str, name: &str, value: &str) -> String {
    if let Some(span) = scan_attrs(tag)
        .into_iter()
        .find(|span| &tag[span.name.clone()] == name)
    {
        let mut out = tag.to_string();
        out.replace_range(span.value, value);
        return out;
    }
    let trimmed = tag.trim_end_matches('>');
    let (head, close) = match trimmed.strip_suffix('/') {
        Some(head) => (head.trim_end(), "/>"),
        None => (trimmed.trim_end(), ">"),
    };
    format!("{head} {name}=\"{value}\"{close}")
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 10 10">
  <g id="group" data-bg="box">
    <rect id="box" fill="#dbeafe" stroke="#64748b"/>
    <text id="label" x="5" y="5"><tspan fill="#333">a &gt; b</tspan></text>
  </g>
</svg>"##;

    #[test]
    fn parse_builds_index_links() {
        let tree = SvgTree::parse(DOC).unwrap();
        assert_eq!(tree.get(0).tag, "svg");
        let group = tree.find_by_id("group").unwrap();
        let label = tree.find_by_id("label").unwrap();
        assert_eq!(tree.get(label).parent, Some(group));
        assert_eq!(tree.ancestors(label).collect::<Vec<_>>(), vec![group, 0]);
        let tspan = tree.descendants(label)[0];
        assert_eq!(tree.get(tspan).tag, "tspan");
        assert_eq!(tree.element_by_id("box").unwrap().fill(), Some("#dbeafe"));
        assert!(tree.element_by_id("box").unwrap().is_shape());
    }

    #[test]
    fn start_tag_range_covers_only_the_open_tag() {
        let tree = SvgTree::parse(DOC).unwrap();
        let label = tree.element_by_id("label").unwrap();
        assert_eq!(&DOC[label.start_tag.clone()], r#"<text id="label" x="5" y="5">"#);
    }

    #[test]
    fn patch_rewrites_and_appends_attributes() {
        let tree = SvgTree::parse(DOC).unwrap();
        let mut patch = SvgPatch::new();
        patch.set_attrs(DOC, tree.element_by_id("box").unwrap(), &[("fill", "#000000"), ("stroke", "#000000")]);
        patch.set_attrs(DOC, tree.element_by_id("label").unwrap(), &[("fill", "#ffffff")]);
        assert_eq!(patch.len(), 2);
        let out = patch.apply(DOC);
        assert!(out.contains(r##"<rect id="box" fill="#000000" stroke="#000000"/>"##));
        assert!(out.contains(r##"<text id="label" x="5" y="5" fill="#ffffff">"##));
    }

    #[test]
    fn attribute_helpers_respect_names_and_quotes() {
        let tag = r##"<rect stroke-width='2' stroke="#111111" fill="url(#g)">"##;
        assert_eq!(attr_value(tag, "stroke"), Some("#111111"));
        assert_eq!(attr_value(tag, "stroke-width"), Some("2"));
        assert_eq!(attr_value(tag, "id"), None);
        assert_eq!(
            set_attr(r#"<circle r="3" />"#, "fill", "#fff"),
            r##"<circle r="3" fill="#fff"/>"##
        );
    }

    #[test]
    fn rejects_malformed_documents() {
        assert!(SvgTree::parse("<svg><rect></svg>").is_err());
    }
}
