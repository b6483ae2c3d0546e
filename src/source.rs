//! Discovers post source files on disk and turns them into nodes of a
//! [`ContentGraph`]. Every `.md` file below the content root becomes a
//! [`NodeType::File`](crate::node::NodeType::File) node plus a
//! [`NodeType::MarkdownRemark`](crate::node::NodeType::MarkdownRemark) child
//! holding the parsed post.

use std::ffi::OsStr;
use std::fs;
use std::path::{Component, Path, PathBuf};

use chrono::{DateTime, NaiveDate};
use serde::Deserialize;
use thiserror::Error;
use walkdir::WalkDir;

use crate::markdown;
use crate::node::{ContentGraph, ContentNode, Frontmatter};

const MARKDOWN_EXTENSION: &str = "md";
const BUNDLE_INDEX: &str = "index.md";

/// Reads posts from `{content_directory}/{content_root}`.
pub struct Sourcer<'a> {
    /// The directory that node paths are made relative to.
    content_directory: &'a Path,

    /// The directory, relative to `content_directory`, that holds the posts.
    content_root: &'a Path,
}

impl<'a> Sourcer<'a> {
    pub fn new(content_directory: &'a Path, content_root: &'a Path) -> Sourcer<'a> {
        Sourcer {
            content_directory,
            content_root,
        }
    }

    /// Walks the content root and returns a graph with a file node and a post
    /// node for every Markdown file. A missing content root yields an empty
    /// graph.
    pub fn source_nodes(&self) -> Result<ContentGraph> {
        let mut graph = ContentGraph::new();
        let root = self.content_directory.join(self.content_root);
        if !root.is_dir() {
            log::warn!("content root `{}` does not exist; no posts", root.display());
            return Ok(graph);
        }

        for result in WalkDir::new(&root) {
            let entry = result?;
            if !entry.file_type().is_file() || !is_markdown(entry.path()) {
                continue;
            }
            let relative_path = self.relative_path(entry.path())?;
            let file = ContentNode::file(&relative_path);
            let post = parse_post(entry.path(), &file).map_err(|e| {
                Error::Annotated(format!("parsing post `{}`", relative_path), Box::new(e))
            })?;
            log::debug!("sourced `{}`", relative_path);
            graph.insert(file);
            graph.insert(post);
        }
        Ok(graph)
    }

    /// Lists the assets of the bundle whose index file is at `relative_path`
    /// (relative to the content directory). Each asset is returned as its
    /// location on disk and its path relative to the bundle directory. Posts
    /// that aren't bundles have no assets.
    pub fn bundle_assets(&self, relative_path: &str) -> Result<Vec<(PathBuf, PathBuf)>> {
        let relative_path = Path::new(relative_path);
        if relative_path.file_name() != Some(OsStr::new(BUNDLE_INDEX)) {
            return Ok(Vec::new());
        }
        let bundle = match relative_path.parent() {
            Some(dir) => self.content_directory.join(dir),
            None => return Ok(Vec::new()),
        };

        let mut assets = Vec::new();
        for result in WalkDir::new(&bundle) {
            let entry = result?;
            if entry.file_type().is_file() && !is_markdown(entry.path()) {
                assets.push((
                    entry.path().to_owned(),
                    // strip_prefix shouldn't fail since `bundle` is always an
                    // ancestor of the entry
                    entry
                        .path()
                        .strip_prefix(&bundle)
                        .map_err(|_| Error::InvalidFileName(entry.path().to_owned()))?
                        .to_owned(),
                ));
            }
        }
        Ok(assets)
    }

    fn relative_path(&self, path: &Path) -> Result<String> {
        let relative = path
            .strip_prefix(self.content_directory)
            .map_err(|_| Error::InvalidFileName(path.to_owned()))?;
        let mut segments = Vec::new();
        for component in relative.components() {
            if let Component::Normal(segment) = component {
                segments.push(
                    segment
                        .to_str()
                        .ok_or_else(|| Error::InvalidFileName(path.to_owned()))?,
                );
            }
        }
        Ok(segments.join("/"))
    }
}

fn is_markdown(path: &Path) -> bool {
    path.extension().map_or(false, |ext| ext == MARKDOWN_EXTENSION)
}

#[derive(Deserialize)]
struct RawFrontmatter {
    title: String,
    date: String,

    #[serde(default)]
    banner: Option<String>,

    #[serde(default, rename = "bannerCredit", alias = "banner_credit")]
    banner_credit: Option<String>,
}

/// Parses the post at `path` into a post node whose parent is `file`.
pub fn parse_post(path: &Path, file: &ContentNode) -> Result<ContentNode> {
    let contents = fs::read_to_string(path)?;
    let (frontmatter, body) = split_frontmatter(&contents)?;
    Ok(ContentNode::post(
        file,
        frontmatter,
        markdown::to_html(body),
        markdown::excerpt(body),
    ))
}

/// Splits a post into its frontmatter and Markdown body. The post must be
/// structured as follows:
///
/// 1. Initial frontmatter fence (`---`)
/// 2. YAML frontmatter with fields `title`, `date`, and optionally `banner`
///    and `bannerCredit`
/// 3. Terminal frontmatter fence (`---`) on its own line
/// 4. Post body
///
/// For example:
///
/// ```md
/// ---
/// title: Hello, world!
/// date: 2021-04-16
/// ---
/// # Hello
///
/// World
/// ```
pub fn split_frontmatter(input: &str) -> Result<(Frontmatter, &str)> {
    const FENCE: &str = "---";
    const END_FENCE: &str = "\n---";

    let input = input.trim_start_matches('\u{feff}');
    if !input.starts_with(FENCE) {
        return Err(Error::FrontmatterMissingStartFence);
    }
    let yaml_start = FENCE.len();
    let yaml_stop = match input[yaml_start..].find(END_FENCE) {
        None => return Err(Error::FrontmatterMissingEndFence),
        Some(offset) => yaml_start + offset,
    };
    let after_fence = yaml_stop + END_FENCE.len();
    let body_start = match input[after_fence..].find('\n') {
        Some(offset) => after_fence + offset + 1,
        None => input.len(),
    };

    let raw: RawFrontmatter = serde_yaml::from_str(&input[yaml_start..yaml_stop])?;
    let date = parse_date(&raw.date).map_err(|err| Error::InvalidDate {
        date: raw.date.clone(),
        err,
    })?;
    Ok((
        Frontmatter {
            title: raw.title,
            date,
            banner: raw.banner.filter(|b| !b.is_empty()),
            banner_credit: raw.banner_credit.filter(|c| !c.is_empty()),
        },
        &input[body_start..],
    ))
}

/// Parses a frontmatter date, either a plain `YYYY-MM-DD` date or an RFC 3339
/// timestamp (whose local date is used).
pub fn parse_date(date: &str) -> chrono::ParseResult<NaiveDate> {
    let date = date.trim();
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .or_else(|_| DateTime::parse_from_rfc3339(date).map(|d| d.naive_local().date()))
}

/// Represents the result of sourcing posts.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error sourcing posts.
#[derive(Debug, Error)]
pub enum Error {
    /// Returned when a post source file is missing its starting frontmatter
    /// fence (`---`).
    #[error("post must begin with `---`")]
    FrontmatterMissingStartFence,

    /// Returned when the starting fence was found but the closing one was
    /// missing.
    #[error("missing closing `---`")]
    FrontmatterMissingEndFence,

    /// Returned when there was an error parsing the frontmatter as YAML.
    #[error(transparent)]
    DeserializeYaml(#[from] serde_yaml::Error),

    /// Returned when the frontmatter `date` isn't a date.
    #[error("invalid date `{date}`: {err}")]
    InvalidDate {
        date: String,
        #[source]
        err: chrono::ParseError,
    },

    /// Returned for other I/O errors.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Returned for WalkDir I/O errors.
    #[error(transparent)]
    WalkDir(#[from] walkdir::Error),

    /// Returned when a source path isn't valid UTF-8 or lies outside of the
    /// content directory.
    #[error("invalid file name: {0:?}")]
    InvalidFileName(PathBuf),

    /// An error with an annotation.
    #[error("{0}: {1}")]
    Annotated(String, #[source] Box<Error>),
}
