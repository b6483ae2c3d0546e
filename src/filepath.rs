//! Derives URL paths from the location of a node's source file. See
//! [`ContentRootResolver`] for the rules.

use std::ffi::OsStr;
use std::path::{Component, Path, PathBuf};

use thiserror::Error;

use crate::node::{ContentNode, NodeId, NodeLookup};

/// Turns a node into a URL path rooted at `base_path`.
pub trait FilePathResolver {
    fn create_file_path(
        &self,
        node: &ContentNode,
        lookup: &dyn NodeLookup,
        base_path: &str,
    ) -> Result<String>;
}

/// Resolves paths relative to a content root directory (e.g. `posts`).
///
/// The file backing a node is the node itself if it carries a
/// `relative_path`, otherwise its parent. The content root is stripped from
/// that path, the extension dropped, and a trailing `index` file name
/// collapsed into its directory, so `posts/2020-01-01-hello/index.md` and
/// `posts/2020-01-01-hello.md` both resolve to `{base_path}/2020-01-01-hello`.
/// The result never carries a leading or trailing slash.
#[derive(Clone, Debug)]
pub struct ContentRootResolver {
    content_root: PathBuf,
}

impl ContentRootResolver {
    pub fn new(content_root: impl Into<PathBuf>) -> ContentRootResolver {
        ContentRootResolver {
            content_root: content_root.into(),
        }
    }

    fn source_path<'a>(
        node: &'a ContentNode,
        lookup: &'a dyn NodeLookup,
    ) -> Result<&'a str> {
        if let Some(path) = &node.relative_path {
            return Ok(path.as_str());
        }
        let parent = node
            .parent
            .as_ref()
            .ok_or_else(|| Error::MissingParent(node.id.clone()))?;
        let file = lookup.get_node(parent).ok_or_else(|| Error::UnknownParent {
            node: node.id.clone(),
            parent: parent.clone(),
        })?;
        file.relative_path
            .as_deref()
            .ok_or_else(|| Error::NotAFile(parent.clone()))
    }
}

impl FilePathResolver for ContentRootResolver {
    fn create_file_path(
        &self,
        node: &ContentNode,
        lookup: &dyn NodeLookup,
        base_path: &str,
    ) -> Result<String> {
        let source_path = Self::source_path(node, lookup)?;
        let within_root = Path::new(source_path)
            .strip_prefix(&self.content_root)
            .map_err(|_| Error::OutsideContentRoot {
                path: source_path.to_owned(),
                root: self.content_root.clone(),
            })?;

        let directory_form = if within_root.file_stem() == Some(OsStr::new("index")) {
            within_root.parent().unwrap_or_else(|| Path::new("")).to_owned()
        } else {
            within_root.with_extension("")
        };

        let mut segments = Vec::new();
        for component in directory_form.components() {
            match component {
                Component::Normal(segment) => segments.push(
                    segment
                        .to_str()
                        .ok_or_else(|| Error::NonUtf8(source_path.to_owned()))?,
                ),
                Component::CurDir => {}
                _ => {
                    return Err(Error::OutsideContentRoot {
                        path: source_path.to_owned(),
                        root: self.content_root.clone(),
                    })
                }
            }
        }
        if segments.is_empty() {
            return Err(Error::Empty(source_path.to_owned()));
        }

        let base = base_path.trim_matches('/');
        let relative = segments.join("/");
        Ok(match base.is_empty() {
            true => relative,
            false => format!("{}/{}", base, relative),
        })
    }
}

/// Represents the result of resolving a node's file path.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents a failure to derive a path from a node.
#[derive(Debug, Error)]
pub enum Error {
    /// Returned when a non-file node has no parent.
    #[error("node `{0}` has no parent file node")]
    MissingParent(NodeId),

    /// Returned when a node's parent isn't in the graph.
    #[error("parent `{parent}` of node `{node}` not found")]
    UnknownParent { node: NodeId, parent: NodeId },

    /// Returned when a node's parent isn't backed by a file.
    #[error("node `{0}` is not a file node")]
    NotAFile(NodeId),

    /// Returned when the source file lies outside of the content root.
    #[error("`{path}` is not inside content root `{}`", .root.display())]
    OutsideContentRoot { path: String, root: PathBuf },

    /// Returned when a path segment isn't valid UTF-8.
    #[error("`{0}` contains a non UTF-8 segment")]
    NonUtf8(String),

    /// Returned when two source files resolve to the same path, e.g.
    /// `posts/a.md` and `posts/a/index.md`.
    #[error("`{first}` and `{second}` both resolve to `{path}`")]
    DuplicatePath {
        path: String,
        first: String,
        second: String,
    },

    /// Returned when nothing is left of the path once the content root and
    /// `index` file name are removed.
    #[error("`{0}` does not name a page below the content root")]
    Empty(String),
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::node::test::post_pair;
    use crate::node::ContentGraph;

    fn resolve(relative_path: &str) -> Result<String> {
        let (file, post) = post_pair(relative_path, "T", "2020-01-01");
        let mut graph = ContentGraph::new();
        graph.insert(file);
        let resolver = ContentRootResolver::new("posts");
        resolver.create_file_path(&post, &graph, "pages/posts")
    }

    #[test]
    fn test_bundle_uses_directory_name() -> Result<()> {
        assert_eq!(
            resolve("posts/2020-01-01-hello/index.md")?,
            "pages/posts/2020-01-01-hello"
        );
        Ok(())
    }

    #[test]
    fn test_plain_file_drops_extension() -> Result<()> {
        assert_eq!(resolve("posts/plain.md")?, "pages/posts/plain");
        Ok(())
    }

    #[test]
    fn test_nested_directories_are_kept() -> Result<()> {
        assert_eq!(
            resolve("posts/2021/trip/index.md")?,
            "pages/posts/2021/trip"
        );
        Ok(())
    }

    #[test]
    fn test_base_path_slashes_are_trimmed() -> Result<()> {
        let (file, _) = post_pair("posts/a.md", "T", "2020-01-01");
        let resolver = ContentRootResolver::new("posts");
        let graph = ContentGraph::new();
        assert_eq!(
            resolver.create_file_path(&file, &graph, "/pages/posts/")?,
            "pages/posts/a"
        );
        Ok(())
    }

    #[test]
    fn test_outside_content_root() {
        match resolve("drafts/a.md") {
            Err(Error::OutsideContentRoot { path, .. }) => assert_eq!(path, "drafts/a.md"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_root_index_is_empty() {
        assert!(matches!(resolve("posts/index.md"), Err(Error::Empty(_))));
    }

    #[test]
    fn test_missing_parent_in_graph() {
        let (_, post) = post_pair("posts/a.md", "T", "2020-01-01");
        let resolver = ContentRootResolver::new("posts");
        let graph = ContentGraph::new();
        assert!(matches!(
            resolver.create_file_path(&post, &graph, "pages/posts"),
            Err(Error::UnknownParent { .. })
        ));
    }
}
