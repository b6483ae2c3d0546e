//! Defines the content graph: [`ContentNode`]s produced by sourcing, the
//! [`NodeLookup`] and [`NodeActions`] capabilities handed to the annotator,
//! and [`ContentGraph`], the in-memory store that implements them.

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;

/// The name of the field under which a post's slug is stored.
pub const SLUG_FIELD: &str = "slug";

/// Uniquely identifies a [`ContentNode`] within a [`ContentGraph`].
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> NodeId {
        NodeId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// The internal type tag of a node. Only [`NodeType::MarkdownRemark`] nodes
/// are posts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeType {
    /// A source file discovered on disk.
    File,

    /// A Markdown post parsed out of a [`NodeType::File`] node.
    MarkdownRemark,

    /// Any other node type.
    Other(String),
}

impl NodeType {
    pub fn is_post(&self) -> bool {
        matches!(self, NodeType::MarkdownRemark)
    }
}

impl From<&str> for NodeType {
    fn from(s: &str) -> NodeType {
        match s {
            "File" => NodeType::File,
            "MarkdownRemark" => NodeType::MarkdownRemark,
            other => NodeType::Other(other.to_owned()),
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            NodeType::File => f.write_str("File"),
            NodeType::MarkdownRemark => f.write_str("MarkdownRemark"),
            NodeType::Other(name) => f.write_str(name),
        }
    }
}

/// The frontmatter block of a post.
#[derive(Clone, Debug, PartialEq)]
pub struct Frontmatter {
    pub title: String,
    pub date: NaiveDate,

    /// URL of an image shown above the post.
    pub banner: Option<String>,

    /// Attribution shown beneath the banner.
    pub banner_credit: Option<String>,
}

/// One record in the content graph. File nodes carry a `relative_path`;
/// post nodes carry the parsed frontmatter and rendered body and point at
/// their file node through `parent`.
#[derive(Clone, Debug, PartialEq)]
pub struct ContentNode {
    pub id: NodeId,
    pub parent: Option<NodeId>,
    pub node_type: NodeType,

    /// The path of the source file relative to the content directory, e.g.
    /// `posts/2020-01-01-hello/index.md`. Only set for file nodes.
    pub relative_path: Option<String>,

    pub frontmatter: Option<Frontmatter>,
    pub html: String,
    pub excerpt: String,

    /// Derived fields attached after sourcing (see [`NodeActions`]).
    pub fields: BTreeMap<String, String>,
}

impl ContentNode {
    /// Creates a file node for the source file at `relative_path`.
    pub fn file(relative_path: &str) -> ContentNode {
        ContentNode {
            id: NodeId::new(format!("file:{}", relative_path)),
            parent: None,
            node_type: NodeType::File,
            relative_path: Some(relative_path.to_owned()),
            frontmatter: None,
            html: String::new(),
            excerpt: String::new(),
            fields: BTreeMap::new(),
        }
    }

    /// Creates a post node parsed out of `file`.
    pub fn post(
        file: &ContentNode,
        frontmatter: Frontmatter,
        html: String,
        excerpt: String,
    ) -> ContentNode {
        let source = file.relative_path.as_deref().unwrap_or(file.id.as_str());
        ContentNode {
            id: NodeId::new(format!("markdown:{}", source)),
            parent: Some(file.id.clone()),
            node_type: NodeType::MarkdownRemark,
            relative_path: None,
            frontmatter: Some(frontmatter),
            html,
            excerpt,
            fields: BTreeMap::new(),
        }
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    pub fn slug(&self) -> Option<&str> {
        self.field(SLUG_FIELD)
    }
}

/// Looks nodes up by id.
pub trait NodeLookup {
    fn get_node(&self, id: &NodeId) -> Option<&ContentNode>;
}

/// Attaches derived fields to nodes.
pub trait NodeActions {
    fn create_node_field(&mut self, node: &NodeId, name: &str, value: String);
}

/// A [`NodeActions`] implementation that buffers field writes so they can be
/// applied to a [`ContentGraph`] once every node has been visited.
#[derive(Debug, Default)]
pub struct PendingFields(Vec<(NodeId, String, String)>);

impl PendingFields {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The buffered writes as `(node, name, value)`, in the order they were
    /// made.
    pub fn iter(&self) -> impl Iterator<Item = (&NodeId, &str, &str)> {
        self.0
            .iter()
            .map(|(node, name, value)| (node, name.as_str(), value.as_str()))
    }
}

impl NodeActions for PendingFields {
    fn create_node_field(&mut self, node: &NodeId, name: &str, value: String) {
        self.0.push((node.clone(), name.to_owned(), value));
    }
}

/// The in-memory node store. Nodes are kept ordered by id so that every pass
/// over the graph is deterministic.
#[derive(Debug, Default)]
pub struct ContentGraph {
    nodes: BTreeMap<NodeId, ContentNode>,
}

impl ContentGraph {
    pub fn new() -> ContentGraph {
        ContentGraph::default()
    }

    /// Inserts `node`, replacing any node with the same id.
    pub fn insert(&mut self, node: ContentNode) {
        self.nodes.insert(node.id.clone(), node);
    }

    pub fn nodes(&self) -> impl Iterator<Item = &ContentNode> {
        self.nodes.values()
    }

    pub fn posts(&self) -> impl Iterator<Item = &ContentNode> {
        self.nodes().filter(|node| node.node_type.is_post())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Applies buffered field writes. Writing a field that already exists
    /// replaces its value. Writes to unknown nodes are dropped.
    pub fn apply(&mut self, pending: PendingFields) {
        for (id, name, value) in pending.0 {
            self.set_field(&id, name, value);
        }
    }

    fn set_field(&mut self, id: &NodeId, name: String, value: String) {
        match self.nodes.get_mut(id) {
            Some(node) => {
                node.fields.insert(name, value);
            }
            None => log::warn!("dropping field `{}` for unknown node `{}`", name, id),
        }
    }
}

impl NodeLookup for ContentGraph {
    fn get_node(&self, id: &NodeId) -> Option<&ContentNode> {
        self.nodes.get(id)
    }
}

impl NodeActions for ContentGraph {
    fn create_node_field(&mut self, node: &NodeId, name: &str, value: String) {
        self.set_field(node, name.to_owned(), value);
    }
}
