//! Exports the [`build_site`] function which stitches together the high-level
//! steps of building the output static site: sourcing posts
//! ([`crate::source`]), annotating them with slugs ([`crate::annotate`]),
//! planning pages ([`crate::pages`]), rendering them ([`crate::write`]), and
//! copying post-bundle assets and the static directory into the output.

use std::fs;
use std::path::{Component, Path, PathBuf};

use thiserror::Error;
use walkdir::WalkDir;

use crate::annotate::annotate_graph;
use crate::config::Config;
use crate::filepath::{self, ContentRootResolver};
use crate::node::{ContentGraph, NodeLookup};
use crate::pages::{create_pages, site_pages, PageDescriptor};
use crate::query;
use crate::source::{self, Sourcer};
use crate::write::{self, Theme, Writer};

/// Counts of what a build produced.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BuildSummary {
    pub posts: usize,
    pub pages: usize,
    pub assets: usize,
}

/// Sources and annotates the content graph and returns it along with every
/// page the site consists of: one per post, then the index and about pages.
pub fn plan_pages(config: &Config) -> Result<(ContentGraph, Vec<PageDescriptor>)> {
    let sourcer = Sourcer::new(&config.content_directory, &config.content_root);
    let mut graph = sourcer.source_nodes()?;
    log::info!("sourced {} nodes", graph.len());

    let resolver = ContentRootResolver::new(config.content_root.clone());
    let annotated = annotate_graph(&mut graph, &resolver, &config.slug_prefix)?;
    log::info!("annotated {} posts", annotated);

    let mut pages: Vec<PageDescriptor> = Vec::new();
    create_pages(&graph, &mut pages)?;
    pages.extend(site_pages());
    Ok((graph, pages))
}

/// Builds the site from a [`Config`] object. The output directory is removed
/// and recreated from scratch.
pub fn build_site(config: &Config) -> Result<BuildSummary> {
    let (graph, pages) = plan_pages(config)?;
    let theme = Theme::load(config.theme_directory.as_deref())?;

    clean(config)?;

    let writer = Writer {
        theme: &theme,
        site: &config.site,
        about: &config.about,
        output_directory: &config.output_directory,
    };
    writer.write_pages(&pages, &graph)?;
    log::info!("wrote {} pages", pages.len());

    let sourcer = Sourcer::new(&config.content_directory, &config.content_root);
    let mut assets = copy_bundle_assets(&sourcer, &graph, &config.output_directory)?;

    if config.static_source_directory.is_dir() {
        assets += copy_dir(&config.static_source_directory, &config.output_directory)?;
    } else {
        log::debug!(
            "no static directory at `{}`",
            config.static_source_directory.display()
        );
    }
    log::info!("copied {} assets", assets);

    Ok(BuildSummary {
        posts: graph.posts().count(),
        pages: pages.len(),
        assets,
    })
}

// Removes the output directory. We refuse to remove a directory that is or
// contains the project itself in case the user passes the wrong directory.
// Both paths are resolved first since either may be relative or spelled with
// `..` or symlinks.
fn clean(config: &Config) -> Result<()> {
    let output = &config.output_directory;
    let resolve = |path: &Path| {
        resolve_path(path).map_err(|err| Error::Clean {
            path: path.to_owned(),
            err,
        })
    };
    let resolved_output = resolve(output)?;
    let resolved_project = resolve(&config.project_root)?;
    if resolved_project.starts_with(&resolved_output) {
        return Err(Error::UnsafeOutputDirectory(output.to_owned()));
    }
    match fs::remove_dir_all(output) {
        Ok(()) => Ok(()),
        Err(e) => match e.kind() {
            std::io::ErrorKind::NotFound => Ok(()),
            _ => Err(Error::Clean {
                path: output.to_owned(),
                err: e,
            }),
        },
    }
}

// Makes `path` absolute and resolves it one component at a time. Symlinks are
// resolved for as long as the path exists; below that, `..` just drops the
// previous component.
fn resolve_path(path: &Path) -> std::io::Result<PathBuf> {
    let absolute = match path.is_absolute() {
        true => path.to_owned(),
        false => std::env::current_dir()?.join(path),
    };
    let mut resolved = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                resolved.pop();
            }
            other => resolved.push(other),
        }
        if let Ok(canonical) = fs::canonicalize(&resolved) {
            resolved = canonical;
        }
    }
    Ok(resolved)
}

// Copies each bundle's assets beside the bundle's page so that relative links
// in the post keep working.
fn copy_bundle_assets(sourcer: &Sourcer, graph: &ContentGraph, output: &Path) -> Result<usize> {
    let mut copied = 0;
    for post in graph.posts() {
        let (slug, file) = match (post.slug(), post.parent.as_ref().and_then(|id| graph.get_node(id))) {
            (Some(slug), Some(file)) => (slug, file),
            _ => continue,
        };
        let relative_path = match &file.relative_path {
            Some(path) => path,
            None => continue,
        };
        let page_directory = slug
            .split('/')
            .filter(|s| !s.is_empty())
            .fold(output.to_owned(), |dir, segment| dir.join(segment));
        for (from, relative) in sourcer.bundle_assets(relative_path)? {
            copy_file(&from, &page_directory.join(relative))?;
            copied += 1;
        }
    }
    Ok(copied)
}

fn copy_dir(src: &Path, dst: &Path) -> Result<usize> {
    let mut copied = 0;
    for result in WalkDir::new(src) {
        let entry = result.map_err(source::Error::from)?;
        if !entry.file_type().is_file() {
            continue;
        }
        // strip_prefix shouldn't fail since `src` is always an ancestor of
        // the entry
        if let Ok(relative) = entry.path().strip_prefix(src) {
            copy_file(entry.path(), &dst.join(relative))?;
            copied += 1;
        }
    }
    Ok(copied)
}

fn copy_file(from: &Path, to: &Path) -> Result<()> {
    let copy = || -> std::io::Result<()> {
        if let Some(dir) = to.parent() {
            fs::create_dir_all(dir)?;
        }
        fs::copy(from, to)?;
        Ok(())
    };
    copy().map_err(|err| Error::Copy {
        from: from.to_owned(),
        to: to.to_owned(),
        err,
    })?;
    log::debug!("copied `{}` to `{}`", from.display(), to.display());
    Ok(())
}

/// The result of building a site.
pub type Result<T> = std::result::Result<T, Error>;

/// The error type for building a site. Errors can be during sourcing,
/// annotating, querying, writing, cleaning the output directory, and copying
/// assets.
#[derive(Debug, Error)]
pub enum Error {
    /// Returned for errors while sourcing posts.
    #[error(transparent)]
    Source(#[from] source::Error),

    /// Returned when a post's slug can't be derived.
    #[error("deriving slug: {0}")]
    Annotate(#[from] filepath::Error),

    /// Returned when the content graph can't be queried.
    #[error(transparent)]
    Query(#[from] query::Error),

    /// Returned for errors templating or writing pages.
    #[error(transparent)]
    Write(#[from] write::Error),

    /// Returned when the output directory contains the project.
    #[error("refusing to remove output directory `{}` since it contains the project", .0.display())]
    UnsafeOutputDirectory(PathBuf),

    /// Returned for I/O problems while cleaning the output directory.
    #[error("cleaning directory `{}`: {err}", .path.display())]
    Clean {
        path: PathBuf,
        #[source]
        err: std::io::Error,
    },

    /// Returned for I/O problems while copying assets.
    #[error("copying `{}` to `{}`: {err}", .from.display(), .to.display())]
    Copy {
        from: PathBuf,
        to: PathBuf,
        #[source]
        err: std::io::Error,
    },
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::test::relative_to_cwd;
    use crate::config::PROJECT_FILE;

    const PROJECT: &str = "site_metadata:
  title: Copperwall Blog
  description: Posts about code
  author: \"@copperwall\"
  root_url: https://example.org/
about: Super awesome cool blog on the internet
";

    fn write(root: &Path, relative: &str, contents: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    fn post(title: &str, date: &str) -> String {
        format!("---\ntitle: {}\ndate: {}\n---\nThis is {}.\n", title, date, title)
    }

    fn project() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), PROJECT_FILE, PROJECT);
        write(
            dir.path(),
            "content/posts/2020-01-01-hello/index.md",
            &post("Hello", "2020-01-01"),
        );
        write(dir.path(), "content/posts/2020-01-01-hello/cat.jpg", "meow");
        write(dir.path(), "content/posts/second.md", &post("Second", "2020-02-01"));
        write(dir.path(), "content/posts/2021/third/index.md", &post("Third", "2021-03-01"));
        write(dir.path(), "static/style.css", "body {}");
        dir
    }

    #[test]
    fn test_plan_pages() -> Result<()> {
        let dir = project();
        let config = Config::from_directory(dir.path(), None).unwrap();
        let (graph, pages) = plan_pages(&config)?;
        assert_eq!(graph.posts().count(), 3);
        let mut paths: Vec<&str> = pages.iter().map(|p| p.path.as_str()).collect();
        paths.sort();
        assert_eq!(
            paths,
            vec![
                "",
                "about",
                "pages/posts/2020-01-01-hello",
                "pages/posts/2021/third",
                "pages/posts/second",
            ]
        );
        Ok(())
    }

    #[test]
    fn test_build_site() -> Result<()> {
        let dir = project();
        let config = Config::from_directory(dir.path(), None).unwrap();
        // leftovers from a previous build are removed
        write(&config.output_directory, "stale.html", "old");

        let summary = build_site(&config)?;
        assert_eq!(
            summary,
            BuildSummary {
                posts: 3,
                pages: 5,
                assets: 2,
            }
        );

        let out = &config.output_directory;
        assert!(!out.join("stale.html").exists());
        let index = fs::read_to_string(out.join("index.html")).unwrap();
        assert!(index.contains("<h4>3 Posts</h4>"), "{}", index);
        let hello =
            fs::read_to_string(out.join("pages/posts/2020-01-01-hello/index.html")).unwrap();
        assert!(hello.contains("<h1>Hello</h1>"), "{}", hello);
        assert!(hello.contains("<p>This is Hello.</p>"), "{}", hello);
        assert!(out.join("pages/posts/2021/third/index.html").is_file());
        assert!(out.join("about/index.html").is_file());
        assert_eq!(
            fs::read_to_string(out.join("pages/posts/2020-01-01-hello/cat.jpg")).unwrap(),
            "meow"
        );
        assert!(out.join("style.css").is_file());
        Ok(())
    }

    #[test]
    fn test_build_without_posts() -> Result<()> {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), PROJECT_FILE, PROJECT);
        let config = Config::from_directory(dir.path(), None).unwrap();
        let summary = build_site(&config)?;
        assert_eq!(summary.posts, 0);
        assert_eq!(summary.pages, 2);
        let index = fs::read_to_string(config.output_directory.join("index.html")).unwrap();
        assert!(index.contains("<h4>0 Posts</h4>"), "{}", index);
        Ok(())
    }

    #[test]
    fn test_refuses_to_remove_project() {
        let dir = project();
        let config = Config::from_directory(dir.path(), Some(dir.path())).unwrap();
        assert!(matches!(
            build_site(&config),
            Err(Error::UnsafeOutputDirectory(_))
        ));
        assert!(dir.path().join(PROJECT_FILE).is_file());
    }

    #[test]
    fn test_refuses_project_spelled_differently() {
        let dir = project();
        let absolute = dir.path().canonicalize().unwrap();
        let config = Config::from_directory(dir.path(), None).unwrap();

        // a relative project root against an absolute output directory
        let mut relative = config.clone();
        relative.project_root = relative_to_cwd(&absolute);
        relative.output_directory = absolute.clone();
        assert!(relative.project_root.is_relative());
        assert!(matches!(
            build_site(&relative),
            Err(Error::UnsafeOutputDirectory(_))
        ));

        // an output directory that climbs back up into the project
        let mut climbing = config.clone();
        climbing.output_directory = absolute.join("content/posts/../..");
        assert!(matches!(
            build_site(&climbing),
            Err(Error::UnsafeOutputDirectory(_))
        ));

        // a relative output directory naming the project
        let mut relative_output = config;
        relative_output.output_directory = relative_to_cwd(&absolute).join("static/..");
        assert!(matches!(
            build_site(&relative_output),
            Err(Error::UnsafeOutputDirectory(_))
        ));

        assert!(dir.path().join(PROJECT_FILE).is_file());
        assert!(dir.path().join("content/posts/second.md").is_file());
    }

    #[test]
    fn test_missing_output_below_project_is_allowed() -> Result<()> {
        let dir = project();
        let mut config = Config::from_directory(dir.path(), None).unwrap();
        config.output_directory = dir.path().join("site/public");
        build_site(&config)?;
        assert!(dir.path().join("site/public/index.html").is_file());
        assert!(dir.path().join(PROJECT_FILE).is_file());
        Ok(())
    }

    #[test]
    fn test_duplicate_slugs_are_rejected() {
        let dir = project();
        write(dir.path(), "content/posts/a.md", &post("Plain", "2020-01-01"));
        write(dir.path(), "content/posts/a/index.md", &post("Bundle", "2020-01-02"));
        let config = Config::from_directory(dir.path(), None).unwrap();
        match plan_pages(&config) {
            Err(Error::Annotate(filepath::Error::DuplicatePath {
                path,
                first,
                second,
            })) => {
                assert_eq!(path, "pages/posts/a");
                assert_eq!(first, "posts/a.md");
                assert_eq!(second, "posts/a/index.md");
            }
            other => panic!("unexpected result: {:?}", other.map(|(_, pages)| pages)),
        }
        assert!(build_site(&config).is_err());
        assert!(!config.output_directory.exists());
    }

    #[test]
    fn test_dotted_content_root() -> Result<()> {
        let dir = project();
        write(dir.path(), PROJECT_FILE, &format!("{}content_root: ./posts\n", PROJECT));
        let config = Config::from_directory(dir.path(), None).unwrap();
        let (graph, _) = plan_pages(&config)?;
        assert_eq!(graph.posts().count(), 3);
        assert!(graph.posts().all(|post| post.slug().is_some()));
        Ok(())
    }

    #[test]
    fn test_nested_content_root() {
        let dir = project();
        write(dir.path(), PROJECT_FILE, &format!("{}content_root: posts/2021\n", PROJECT));
        let config = Config::from_directory(dir.path(), None).unwrap();
        let (graph, pages) = plan_pages(&config).unwrap();
        assert_eq!(graph.posts().count(), 1);
        assert_eq!(pages[0].path, "pages/posts/third");
    }
}
