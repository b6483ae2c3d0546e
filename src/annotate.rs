//! The node annotator. [`on_create_node`] is called once for every node in
//! the content graph and attaches a `slug` field to posts.

use std::collections::BTreeMap;

use crate::filepath::{self, FilePathResolver};
use crate::node::{
    ContentGraph, ContentNode, NodeActions, NodeId, NodeLookup, PendingFields, SLUG_FIELD,
};

/// The prefix every post slug is rooted under.
pub const POSTS_BASE_PATH: &str = "pages/posts";

/// Attaches a slug to `node` if it is a post; does nothing otherwise. The
/// slug comes from `resolver` with [`POSTS_BASE_PATH`] as the base path, and
/// any error it returns is passed straight back to the caller.
pub fn on_create_node<R, A>(
    node: &ContentNode,
    lookup: &dyn NodeLookup,
    resolver: &R,
    actions: &mut A,
) -> filepath::Result<()>
where
    R: FilePathResolver + ?Sized,
    A: NodeActions + ?Sized,
{
    on_create_node_with_base(node, lookup, resolver, POSTS_BASE_PATH, actions)
}

/// Like [`on_create_node`], with a configurable base path.
pub fn on_create_node_with_base<R, A>(
    node: &ContentNode,
    lookup: &dyn NodeLookup,
    resolver: &R,
    base_path: &str,
    actions: &mut A,
) -> filepath::Result<()>
where
    R: FilePathResolver + ?Sized,
    A: NodeActions + ?Sized,
{
    if !node.node_type.is_post() {
        return Ok(());
    }
    let slug = resolver.create_file_path(node, lookup, base_path)?;
    log::debug!("node `{}` -> slug `{}`", node.id, slug);
    actions.create_node_field(&node.id, SLUG_FIELD, slug);
    Ok(())
}

/// Runs the annotator over every node in `graph` and applies the resulting
/// fields. Nodes are read while the pass runs and only written once it has
/// finished, so a failing node leaves the graph untouched. Two posts that
/// resolve to the same slug are an error. Returns the number of fields
/// attached.
pub fn annotate_graph<R>(
    graph: &mut ContentGraph,
    resolver: &R,
    base_path: &str,
) -> filepath::Result<usize>
where
    R: FilePathResolver + ?Sized,
{
    let mut pending = PendingFields::default();
    for node in graph.nodes() {
        on_create_node_with_base(node, &*graph, resolver, base_path, &mut pending)?;
    }

    let mut claimed: BTreeMap<&str, &NodeId> = BTreeMap::new();
    for (id, _, slug) in pending.iter().filter(|(_, name, _)| *name == SLUG_FIELD) {
        if let Some(first) = claimed.insert(slug, id) {
            return Err(filepath::Error::DuplicatePath {
                path: slug.to_owned(),
                first: source_file(graph, first),
                second: source_file(graph, id),
            });
        }
    }

    let count = pending.len();
    graph.apply(pending);
    Ok(count)
}

// The path of the file `id` was sourced from, falling back to the id itself.
fn source_file(graph: &ContentGraph, id: &NodeId) -> String {
    let node = graph.get_node(id);
    let file = match node.and_then(|node| node.relative_path.as_ref()) {
        Some(_) => node,
        None => node
            .and_then(|node| node.parent.as_ref())
            .and_then(|parent| graph.get_node(parent)),
    };
    file.and_then(|file| file.relative_path.clone())
        .unwrap_or_else(|| id.to_string())
}
