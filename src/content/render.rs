//! Markdown to render tree transform.
//!
//! The tree is inert data for the rendering layer: elements with string
//! attributes, text, and raw HTML passthrough.

use std::collections::BTreeMap;

use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag, TagEnd};
use serde::{Deserialize, Serialize};

/// Transform configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformConfig {
    pub tables: bool,
    pub footnotes: bool,
    pub strikethrough: bool,
    pub task_lists: bool,
    /// `# Heading {#custom-id}`
    pub heading_attributes: bool,
    /// Element wrapping the whole document
    pub root_element: String,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            tables: true,
            footnotes: true,
            strikethrough: true,
            task_lists: true,
            heading_attributes: true,
            root_element: "article".to_string(),
        }
    }
}

impl TransformConfig {
    fn parser_options(&self) -> Options {
        let mut opts = Options::empty();
        if self.tables {
            opts.insert(Options::ENABLE_TABLES);
        }
        if self.footnotes {
            opts.insert(Options::ENABLE_FOOTNOTES);
        }
        if self.strikethrough {
            opts.insert(Options::ENABLE_STRIKETHROUGH);
        }
        if self.task_lists {
            opts.insert(Options::ENABLE_TASKLISTS);
        }
        if self.heading_attributes {
            opts.insert(Options::ENABLE_HEADING_ATTRIBUTES);
        }
        opts
    }
}

/// Node of the render tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RenderNode {
    Element {
        name: String,
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        attributes: BTreeMap<String, String>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        children: Vec<RenderNode>,
    },
    Text {
        value: String,
    },
    Html {
        value: String,
    },
}

impl RenderNode {
    fn element(name: &str, attributes: Vec<(String, String)>) -> Self {
        RenderNode::Element {
            name: name.to_string(),
            attributes: attributes.into_iter().collect(),
            children: Vec::new(),
        }
    }

    fn push(&mut self, child: RenderNode) {
        if let RenderNode::Element { children, .. } = self {
            children.push(child);
        }
    }

    /// Element name, if this is an element
    pub fn name(&self) -> Option<&str> {
        match self {
            RenderNode::Element { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Child nodes (empty for leaves)
    pub fn children(&self) -> &[RenderNode] {
        match self {
            RenderNode::Element { children, .. } => children,
            _ => &[],
        }
    }

    fn collect_text(&self, out: &mut String) {
        match self {
            RenderNode::Element { children, .. } => {
                for child in children {
                    child.collect_text(out);
                }
            }
            RenderNode::Text { value } => out.push_str(value),
            RenderNode::Html { .. } => {}
        }
    }
}

/// Renderer-consumable document tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderTree {
    pub root: RenderNode,
}

impl RenderTree {
    /// Top-level nodes of the document
    pub fn nodes(&self) -> &[RenderNode] {
        self.root.children()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes().is_empty()
    }

    /// Concatenated text content
    pub fn text(&self) -> String {
        let mut out = String::new();
        self.root.collect_text(&mut out);
        out
    }
}

/// Convert a markdown body into a render tree.
pub fn transform(markdown: &str, config: &TransformConfig) -> RenderTree {
    let mut builder = TreeBuilder {
        stack: vec![RenderNode::element(&config.root_element, Vec::new())],
    };

    for event in Parser::new_ext(markdown, config.parser_options()) {
        builder.handle(event);
    }

    RenderTree {
        root: builder.finish(),
    }
}

struct TreeBuilder {
    /// Open elements; index 0 is the root
    stack: Vec<RenderNode>,
}

impl TreeBuilder {
    fn handle(&mut self, event: Event) {
        match event {
            Event::Start(Tag::CodeBlock(kind)) => {
                self.open(RenderNode::element("pre", Vec::new()));
                let attrs = match kind {
                    CodeBlockKind::Fenced(lang) if !lang.is_empty() => {
                        vec![("class".to_string(), format!("language-{lang}"))]
                    }
                    _ => Vec::new(),
                };
                self.open(RenderNode::element("code", attrs));
            }
            Event::End(TagEnd::CodeBlock) => {
                self.close();
                self.close();
            }
            Event::Start(Tag::TableCell) if self.in_table_head() => {
                self.open(RenderNode::element("th", Vec::new()));
            }
            Event::Start(tag) => {
                let (name, attrs) = tag_to_element(&tag);
                self.open(RenderNode::element(name, attrs));
            }
            Event::End(_) => self.close(),
            Event::Text(text) => self.text(&text),
            Event::Code(code) => {
                let mut element = RenderNode::element("code", Vec::new());
                element.push(RenderNode::Text {
                    value: code.to_string(),
                });
                self.append(element);
            }
            Event::Html(html) | Event::InlineHtml(html) => self.append(RenderNode::Html {
                value: html.to_string(),
            }),
            Event::SoftBreak => self.text("\n"),
            Event::HardBreak => self.append(RenderNode::element("br", Vec::new())),
            Event::Rule => self.append(RenderNode::element("hr", Vec::new())),
            Event::FootnoteReference(name) => {
                let mut link = RenderNode::element(
                    "a",
                    vec![
                        ("href".to_string(), format!("#fn-{name}")),
                        ("id".to_string(), format!("fnref-{name}")),
                    ],
                );
                link.push(RenderNode::Text {
                    value: format!("[{name}]"),
                });
                let mut sup =
                    RenderNode::element("sup", vec![("class".to_string(), "footnote-ref".to_string())]);
                sup.push(link);
                self.append(sup);
            }
            Event::TaskListMarker(checked) => {
                let mut attrs = vec![
                    ("type".to_string(), "checkbox".to_string()),
                    ("disabled".to_string(), String::new()),
                ];
                if checked {
                    attrs.push(("checked".to_string(), String::new()));
                }
                self.append(RenderNode::element("input", attrs));
            }
            Event::InlineMath(math) | Event::DisplayMath(math) => self.text(&math),
        }
    }

    fn in_table_head(&self) -> bool {
        self.stack.iter().any(|node| node.name() == Some("thead"))
    }

    fn open(&mut self, element: RenderNode) {
        self.stack.push(element);
    }

    fn close(&mut self) {
        if self.stack.len() > 1 {
            if let Some(element) = self.stack.pop() {
                self.append(element);
            }
        }
    }

    fn append(&mut self, node: RenderNode) {
        if let Some(parent) = self.stack.last_mut() {
            parent.push(node);
        }
    }

    fn text(&mut self, text: &str) {
        if !text.is_empty() {
            self.append(RenderNode::Text {
                value: text.to_string(),
            });
        }
    }

    fn finish(mut self) -> RenderNode {
        while self.stack.len() > 1 {
            self.close();
        }
        self.stack
            .pop()
            .unwrap_or_else(|| RenderNode::element("article", Vec::new()))
    }
}

fn tag_to_element(tag: &Tag) -> (&'static str, Vec<(String, String)>) {
    match tag {
        Tag::Paragraph => ("p", vec![]),
        Tag::Heading { level, id, .. } => {
            let attrs = id
                .as_ref()
                .map(|id| vec![("id".to_string(), id.to_string())])
                .unwrap_or_default();
            (heading_tag(*level), attrs)
        }
        Tag::BlockQuote(_) => ("blockquote", vec![]),
        Tag::List(Some(start)) if *start != 1 => ("ol", vec![("start".to_string(), start.to_string())]),
        Tag::List(Some(_)) => ("ol", vec![]),
        Tag::List(None) => ("ul", vec![]),
        Tag::Item => ("li", vec![]),
        Tag::FootnoteDefinition(name) => (
            "div",
            vec![
                ("class".to_string(), "footnote".to_string()),
                ("id".to_string(), format!("fn-{name}")),
            ],
        ),
        Tag::Table(_) => ("table", vec![]),
        Tag::TableHead => ("thead", vec![]),
        Tag::TableRow => ("tr", vec![]),
        Tag::TableCell => ("td", vec![]),
        Tag::Emphasis => ("em", vec![]),
        Tag::Strong => ("strong", vec![]),
        Tag::Strikethrough => ("del", vec![]),
        Tag::Link {
            dest_url, title, ..
        } => {
            let mut attrs = vec![("href".to_string(), dest_url.to_string())];
            if !title.is_empty() {
                attrs.push(("title".to_string(), title.to_string()));
            }
            ("a", attrs)
        }
        Tag::Image {
            dest_url, title, ..
        } => {
            let mut attrs = vec![("src".to_string(), dest_url.to_string())];
            if !title.is_empty() {
                attrs.push(("title".to_string(), title.to_string()));
            }
            ("img", attrs)
        }
        _ => ("div", vec![]),
    }
}

fn heading_tag(level: HeadingLevel) -> &'static str {
    match level {
        HeadingLevel::H1 => "h1",
        HeadingLevel::H2 => "h2",
        HeadingLevel::H3 => "h3",
        HeadingLevel::H4 => "h4",
        HeadingLevel::H5 => "h5",
        HeadingLevel::H6 => "h6",
    }
}
