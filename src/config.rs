//! Loads the project file (`copperwall.yaml`) into a [`Config`].

use std::fs::{self, File};
use std::path::{Component, Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use url::Url;

use crate::annotate::POSTS_BASE_PATH;

/// The name of the project file.
pub const PROJECT_FILE: &str = "copperwall.yaml";

/// Site-wide metadata, available to every page.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct SiteMetadata {
    pub title: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub author: String,

    /// The URL the site is served from. Always ends in a `/` once loaded.
    #[serde(alias = "rootUrl")]
    pub root_url: Url,

    /// Profile links shown in the footer with `rel="me"`.
    #[serde(default)]
    pub links: Vec<Link>,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Link {
    pub name: String,
    pub url: Url,
}

#[derive(Deserialize)]
struct Project {
    #[serde(alias = "siteMetadata")]
    site_metadata: SiteMetadata,

    #[serde(default)]
    about: Option<String>,

    #[serde(default = "default_content_directory")]
    content_directory: PathBuf,

    #[serde(default = "default_content_root")]
    content_root: PathBuf,

    #[serde(default = "default_slug_prefix")]
    slug_prefix: String,

    #[serde(default)]
    theme: Option<PathBuf>,
}

fn default_content_directory() -> PathBuf {
    PathBuf::from("content")
}

fn default_content_root() -> PathBuf {
    PathBuf::from("posts")
}

fn default_slug_prefix() -> String {
    POSTS_BASE_PATH.to_owned()
}

/// The resolved configuration for one build. All directories are joined onto
/// the project root except `content_root`, which stays relative to
/// `content_directory`.
#[derive(Clone, Debug)]
pub struct Config {
    pub site: SiteMetadata,

    /// The text of the about page.
    pub about: String,

    pub project_root: PathBuf,
    pub content_directory: PathBuf,
    pub content_root: PathBuf,
    pub slug_prefix: String,

    /// Templates in this directory override the built-in ones.
    pub theme_directory: Option<PathBuf>,

    pub static_source_directory: PathBuf,
    pub output_directory: PathBuf,
}

impl Config {
    /// Looks for the project file in `dir` and then in each of its ancestors.
    /// `dir` is canonicalized first, so a relative path like `.` is searched
    /// upwards from the current directory. When `output_directory` is `None`,
    /// the site is written to `public` beside the project file.
    pub fn from_directory(dir: &Path, output_directory: Option<&Path>) -> Result<Config> {
        let start = fs::canonicalize(dir).map_err(|err| Error::Resolve {
            path: dir.to_owned(),
            err,
        })?;
        let mut current = Some(start.as_path());
        while let Some(dir) = current {
            let path = dir.join(PROJECT_FILE);
            if path.is_file() {
                return Config::from_project_file(&path, output_directory);
            }
            current = dir.parent();
        }
        Err(Error::NotFound(dir.to_owned()))
    }

    pub fn from_project_file(path: &Path, output_directory: Option<&Path>) -> Result<Config> {
        let file = File::open(path).map_err(|err| Error::Open {
            path: path.to_owned(),
            err,
        })?;
        let project: Project = serde_yaml::from_reader(file).map_err(|err| Error::Parse {
            path: path.to_owned(),
            err,
        })?;
        let project_root = path
            .parent()
            .ok_or_else(|| Error::NoParent(path.to_owned()))?
            .to_owned();
        log::debug!("loaded project file `{}`", path.display());
        let content_root = normalize_content_root(&project.content_root).ok_or_else(|| {
            Error::InvalidContentRoot {
                path: path.to_owned(),
                root: project.content_root.clone(),
            }
        })?;
        Ok(Config::from_project(project, project_root, content_root, output_directory))
    }

    fn from_project(
        project: Project,
        project_root: PathBuf,
        content_root: PathBuf,
        output_directory: Option<&Path>,
    ) -> Config {
        let mut site = project.site_metadata;
        if !site.root_url.path().ends_with('/') {
            let path = format!("{}/", site.root_url.path());
            site.root_url.set_path(&path);
        }
        Config {
            about: project.about.unwrap_or_else(|| site.description.clone()),
            site,
            content_directory: project_root.join(project.content_directory),
            content_root,
            slug_prefix: project.slug_prefix,
            theme_directory: project.theme.map(|theme| project_root.join(theme)),
            static_source_directory: project_root.join("static"),
            output_directory: match output_directory {
                Some(dir) => dir.to_owned(),
                None => project_root.join("public"),
            },
            project_root,
        }
    }
}

// Slugs are derived by stripping the content root off each post's path
// component by component, so `./posts` has to become `posts`. Roots that
// climb out of the content directory or are absolute are rejected.
fn normalize_content_root(root: &Path) -> Option<PathBuf> {
    let mut normalized = PathBuf::new();
    for component in root.components() {
        match component {
            Component::CurDir => {}
            Component::Normal(segment) => normalized.push(segment),
            _ => return None,
        }
    }
    Some(normalized)
}

/// Represents the result of loading configuration.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents a failure to load the project file.
#[derive(Debug, Error)]
pub enum Error {
    /// Returned when no project file exists in the directory or any of its
    /// ancestors.
    #[error("could not find `{}` in `{}` or any parent directory", PROJECT_FILE, .0.display())]
    NotFound(PathBuf),

    /// Returned when the directory to search from can't be resolved.
    #[error("resolving directory `{}`: {err}", .path.display())]
    Resolve {
        path: PathBuf,
        #[source]
        err: std::io::Error,
    },

    /// Returned when the project file can't be opened.
    #[error("opening project file `{}`: {err}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        err: std::io::Error,
    },

    /// Returned when the project file isn't valid.
    #[error("loading configuration `{}`: {err}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        err: serde_yaml::Error,
    },

    /// Returned when `content_root` isn't a plain path below the content
    /// directory.
    #[error(
        "`content_root` `{}` in `{}` must be a relative path without `..`",
        .root.display(),
        .path.display()
    )]
    InvalidContentRoot { path: PathBuf, root: PathBuf },

    /// Returned when the project file has no parent directory.
    #[error("can't get parent directory for project file `{}`", .0.display())]
    NoParent(PathBuf),
}
