//! # Abstract Syntax Tree
//!
//! Every element of a parsed document is a [`Node`]: a [`NodeKind`] tag, an
//! ordered list of children and, where the grammar recorded one, a [`Span`]
//! into the original source.
//!
//! ## Text merging
//!
//! [`Node::add_child`] is the only way the grammar attaches children, and it
//! enforces the central invariant of the tree: two `Text` nodes are never
//! adjacent siblings. A `Text` child appended after a `Text` child is folded
//! into it instead. `SpecialText` (escaped characters) is deliberately a
//! different kind so it never merges.
//!
//! ## Outline format
//!
//! `Display` prints an indented outline, one node per line:
//!
//! ```text
//! Root
//!   Para
//!     Emph
//!       Text "a"
//!     Text " "
//! ```

use std::fmt;

use serde::Serialize;

use crate::tables::ReferenceTable;

/// A half-open range `[start, end)` of character indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Smallest span covering both.
    pub fn cover(self, other: Span) -> Span {
        Span::new(self.start.min(other.start), self.end.max(other.end))
    }
}

/// Symbolic marks resolved to a glyph only at render time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Mark {
    HRule,
    Linebreak,
    Ellipsis,
    Endash,
    Emdash,
    Apostrophe,
    Nbsp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum QuoteKind {
    Single,
    Double,
    DoubleAngle,
}

/// Column alignment taken from a table divider row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum Alignment {
    #[default]
    None,
    Left,
    Right,
    Center,
}

impl Alignment {
    /// Alignment from the presence of leading/trailing colons.
    pub fn from_colons(left: bool, right: bool) -> Self {
        match (left, right) {
            (false, false) => Alignment::None,
            (true, false) => Alignment::Left,
            (false, true) => Alignment::Right,
            (true, true) => Alignment::Center,
        }
    }
}

/// Destination of a link definition.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct LinkTarget {
    pub url: String,
    pub title: Option<String>,
}

/// How a link (or image) names its destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum LinkKind {
    /// `[label](url "title")`
    Explicit { url: String, title: Option<String> },
    /// `[label][key]`, `[label][]` or `[label]`, resolved later against the
    /// document's [`ReferenceTable`].
    Reference {
        /// Source text between the label brackets.
        label: String,
        /// Source text of the second bracket pair, when it was non-empty.
        key: Option<String>,
        /// Whitespace between the two bracket pairs; `None` for the bare
        /// `[label]` form.
        separator: Option<String>,
    },
    /// `<http://...>`
    AutoUrl { url: String },
    /// `<user@host>`
    AutoEmail { address: String },
}

impl LinkKind {
    /// The raw key a reference link resolves by: the explicit key if one was
    /// given, otherwise the label itself.
    pub fn reference_key(&self) -> Option<&str> {
        match self {
            LinkKind::Reference { label, key, .. } => Some(key.as_deref().unwrap_or(label)),
            _ => None,
        }
    }
}

/// The variant tag of a [`Node`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum NodeKind {
    /// Document root while it is being built on the value stack.
    Root,
    /// Anonymous inline container: the content of a block that was not
    /// wrapped in a paragraph (tight list items, trailing inlines).
    Super,
    Text(String),
    /// An escaped character; never merged with neighbouring text.
    SpecialText(String),
    Para,
    Header { level: u8 },
    Emph,
    Strong,
    BlockQuote,
    /// Indented or fenced code block.
    Verbatim { text: String, info: Option<String> },
    BulletList { tight: bool },
    OrderedList { tight: bool },
    ListItem { tight: bool },
    DefinitionList,
    DefinitionTerm,
    Definition,
    /// Raw HTML block; empty when HTML blocks are suppressed.
    HtmlBlock(String),
    /// Raw inline HTML; empty when inline HTML is suppressed.
    InlineHtml(String),
    Link(LinkKind),
    Image(LinkKind),
    /// Inline code span.
    Code(String),
    /// `&name;`, `&#123;` or `&#x1F;`, kept verbatim.
    Entity(String),
    SimpleMark(Mark),
    Quoted(QuoteKind),
    Table,
    TableColumn(Alignment),
    TableHeader,
    TableBody,
    TableRow,
    TableCell { colspan: usize },
    /// A link reference definition; lives in the reference table, its
    /// children are the label.
    Reference(LinkTarget),
    /// An abbreviation definition; lives in the abbreviation list, its
    /// children are the expansion.
    Abbreviation { label: String },
}

impl NodeKind {
    /// Short name used in outlines and diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::Root => "Root",
            NodeKind::Super => "Super",
            NodeKind::Text(_) => "Text",
            NodeKind::SpecialText(_) => "SpecialText",
            NodeKind::Para => "Para",
            NodeKind::Header { .. } => "Header",
            NodeKind::Emph => "Emph",
            NodeKind::Strong => "Strong",
            NodeKind::BlockQuote => "BlockQuote",
            NodeKind::Verbatim { .. } => "Verbatim",
            NodeKind::BulletList { .. } => "BulletList",
            NodeKind::OrderedList { .. } => "OrderedList",
            NodeKind::ListItem { .. } => "ListItem",
            NodeKind::DefinitionList => "DefinitionList",
            NodeKind::DefinitionTerm => "DefinitionTerm",
            NodeKind::Definition => "Definition",
            NodeKind::HtmlBlock(_) => "HtmlBlock",
            NodeKind::InlineHtml(_) => "InlineHtml",
            NodeKind::Link(_) => "Link",
            NodeKind::Image(_) => "Image",
            NodeKind::Code(_) => "Code",
            NodeKind::Entity(_) => "Entity",
            NodeKind::SimpleMark(_) => "SimpleMark",
            NodeKind::Quoted(_) => "Quoted",
            NodeKind::Table => "Table",
            NodeKind::TableColumn(_) => "TableColumn",
            NodeKind::TableHeader => "TableHeader",
            NodeKind::TableBody => "TableBody",
            NodeKind::TableRow => "TableRow",
            NodeKind::TableCell { .. } => "TableCell",
            NodeKind::Reference(_) => "Reference",
            NodeKind::Abbreviation { .. } => "Abbreviation",
        }
    }
}

/// A node of the syntax tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Node {
    pub kind: NodeKind,
    pub children: Vec<Node>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span: Option<Span>,
}

impl Node {
    pub fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            children: Vec::new(),
            span: None,
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::new(NodeKind::Text(text.into()))
    }

    pub fn mark(mark: Mark) -> Self {
        Self::new(NodeKind::SimpleMark(mark))
    }

    /// Builds a node with the given children, merging adjacent text.
    pub fn with_children(kind: NodeKind, children: impl IntoIterator<Item = Node>) -> Self {
        let mut node = Self::new(kind);
        for child in children {
            node.add_child(child);
        }
        node
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    /// Appends `child`, folding it into a trailing `Text` sibling when both
    /// are plain text.
    pub fn add_child(&mut self, child: Node) {
        if let NodeKind::Text(incoming) = &child.kind
            && let Some(last) = self.children.last_mut()
            && let NodeKind::Text(existing) = &mut last.kind
        {
            existing.push_str(incoming);
            last.span = match (last.span, child.span) {
                (Some(a), Some(b)) => Some(a.cover(b)),
                (a, b) => a.or(b),
            };
            return;
        }
        self.children.push(child);
    }

    pub fn is_text(&self) -> bool {
        matches!(self.kind, NodeKind::Text(_))
    }

    /// The text payload of a `Text` or `SpecialText` node.
    pub fn as_text(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Text(t) | NodeKind::SpecialText(t) => Some(t),
            _ => None,
        }
    }

    /// Concatenated text of the whole subtree, with marks, entities and
    /// code spans rendered as their plain source-ish equivalents.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        match &self.kind {
            NodeKind::Text(t)
            | NodeKind::SpecialText(t)
            | NodeKind::Code(t)
            | NodeKind::Entity(t) => out.push_str(t),
            NodeKind::SimpleMark(Mark::Nbsp) => out.push(' '),
            NodeKind::SimpleMark(Mark::Linebreak) => out.push('\n'),
            _ => {}
        }
        for child in &self.children {
            child.collect_text(out);
        }
    }

    /// Depth-first iterator over this node and all descendants.
    pub fn descendants(&self) -> impl Iterator<Item = &Node> {
        let mut stack = vec![self];
        std::iter::from_fn(move || {
            let node = stack.pop()?;
            stack.extend(node.children.iter().rev());
            Some(node)
        })
    }

    /// A copy of this subtree with every span removed, for comparing shapes.
    pub fn without_spans(&self) -> Node {
        Node {
            kind: self.kind.clone(),
            children: self.children.iter().map(Node::without_spans).collect(),
            span: None,
        }
    }

    fn write_outline(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        write!(f, "{:indent$}{}", "", self.kind.name(), indent = depth * 2)?;
        match &self.kind {
            NodeKind::Text(t)
            | NodeKind::SpecialText(t)
            | NodeKind::Code(t)
            | NodeKind::Entity(t)
            | NodeKind::HtmlBlock(t)
            | NodeKind::InlineHtml(t) => write!(f, " {t:?}")?,
            NodeKind::Header { level } => write!(f, " h{level}")?,
            NodeKind::Verbatim { text, info } => {
                if let Some(info) = info {
                    write!(f, " [{info}]")?;
                }
                write!(f, " {text:?}")?;
            }
            NodeKind::BulletList { tight }
            | NodeKind::OrderedList { tight }
            | NodeKind::ListItem { tight } => {
                write!(f, " {}", if *tight { "tight" } else { "loose" })?
            }
            NodeKind::Link(link) | NodeKind::Image(link) => match link {
                LinkKind::Explicit { url, title } => {
                    write!(f, " {url:?}")?;
                    if let Some(title) = title {
                        write!(f, " title={title:?}")?;
                    }
                }
                LinkKind::Reference { .. } => {
                    write!(f, " ref={:?}", link.reference_key().unwrap_or_default())?
                }
                LinkKind::AutoUrl { url } => write!(f, " auto {url:?}")?,
                LinkKind::AutoEmail { address } => write!(f, " mailto {address:?}")?,
            },
            NodeKind::SimpleMark(mark) => write!(f, " {mark:?}")?,
            NodeKind::Quoted(kind) => write!(f, " {kind:?}")?,
            NodeKind::TableColumn(align) => write!(f, " {align:?}")?,
            NodeKind::TableCell { colspan } if *colspan > 1 => write!(f, " colspan={colspan}")?,
            NodeKind::Reference(target) => write!(f, " {:?}", target.url)?,
            NodeKind::Abbreviation { label } => write!(f, " {label:?}")?,
            _ => {}
        }
        writeln!(f)?;
        for child in &self.children {
            child.write_outline(f, depth + 1)?;
        }
        Ok(())
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_outline(f, 0)
    }
}

/// The result of a parse: top-level blocks plus the document-wide tables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Root {
    pub children: Vec<Node>,
    pub references: ReferenceTable,
    /// `Abbreviation` nodes in definition order.
    pub abbreviations: Vec<Node>,
    pub span: Option<Span>,
}

impl Root {
    /// The children as a `Root` node, for outline printing and traversal.
    pub fn as_node(&self) -> Node {
        Node {
            kind: NodeKind::Root,
            children: self.children.clone(),
            span: self.span,
        }
    }

    /// Depth-first iterator over every node below the root.
    pub fn descendants(&self) -> impl Iterator<Item = &Node> {
        self.children.iter().flat_map(|child| child.descendants())
    }
}

impl fmt::Display for Root {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Root")?;
        for child in &self.children {
            child.write_outline(f, 1)?;
        }
        Ok(())
    }
}
