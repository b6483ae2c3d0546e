//! Templating and writing HTML pages to disk from [`PageDescriptor`]s. Each
//! page's own template is rendered first and the result is dropped into the
//! `content` slot of the layout template.

use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};

use gtmpl::{Context, Template};
use gtmpl_value::Value;
use thiserror::Error;
use url::Url;

use crate::config::SiteMetadata;
use crate::pages::{PageDescriptor, PageTemplate};
use crate::query::{self, ContentQuery};
use crate::value::{self, Blurb};

const LAYOUT: &str = "layout.html";
const BLOG_POST: &str = "blog-post.html";
const INDEX: &str = "index.html";
const ABOUT: &str = "about.html";

const BUILTIN_LAYOUT: &str = include_str!("../templates/layout.html");
const BUILTIN_BLOG_POST: &str = include_str!("../templates/blog-post.html");
const BUILTIN_INDEX: &str = include_str!("../templates/index.html");
const BUILTIN_ABOUT: &str = include_str!("../templates/about.html");

/// The parsed templates for every kind of page.
pub struct Theme {
    layout: Template,
    blog_post: Template,
    index: Template,
    about: Template,
}

impl Theme {
    /// Parses the built-in templates.
    pub fn builtin() -> Result<Theme> {
        Theme::load(None)
    }

    /// Parses the templates, taking each from `directory` when it contains a
    /// file of the same name and falling back to the built-in one otherwise.
    pub fn load(directory: Option<&Path>) -> Result<Theme> {
        Ok(Theme {
            layout: parse_template(directory, LAYOUT, BUILTIN_LAYOUT)?,
            blog_post: parse_template(directory, BLOG_POST, BUILTIN_BLOG_POST)?,
            index: parse_template(directory, INDEX, BUILTIN_INDEX)?,
            about: parse_template(directory, ABOUT, BUILTIN_ABOUT)?,
        })
    }

    fn page_template(&self, template: PageTemplate) -> &Template {
        match template {
            PageTemplate::BlogPost => &self.blog_post,
            PageTemplate::Index => &self.index,
            PageTemplate::About => &self.about,
        }
    }
}

// Loads the override for `name` from `directory` if there is one and parses
// it, or parses `builtin`.
fn parse_template(directory: Option<&Path>, name: &str, builtin: &str) -> Result<Template> {
    let mut contents = String::new();
    match directory.map(|dir| dir.join(name)).filter(|path| path.is_file()) {
        Some(path) => {
            log::debug!("using template `{}`", path.display());
            File::open(&path)
                .map_err(|err| Error::OpenTemplateFile {
                    path: path.clone(),
                    err,
                })?
                .read_to_string(&mut contents)?;
        }
        None => contents.push_str(builtin),
    }

    let mut template = Template::default();
    template
        .parse(&contents)
        .map_err(|err| Error::ParseTemplate {
            name: name.to_owned(),
            err: err.to_string(),
        })?;
    Ok(template)
}

/// Responsible for templating and writing pages to disk.
pub struct Writer<'a> {
    pub theme: &'a Theme,
    pub site: &'a SiteMetadata,

    /// The text of the about page.
    pub about: &'a str,

    /// Page `p` is written to `{output_directory}/{p}/index.html`.
    pub output_directory: &'a Path,
}

/// The head of a page: its title, description and canonical URL.
struct Head {
    title: Value,
    description: Value,
    url: Url,
}

impl Writer<'_> {
    /// Returns the absolute URL of the page at `path`. Pages are directories,
    /// so every URL but the root's gets a trailing slash.
    pub fn page_url(&self, path: &str) -> Result<Url> {
        let path = path.trim_matches('/');
        match path.is_empty() {
            true => Ok(self.site.root_url.clone()),
            false => Ok(self.site.root_url.join(&format!("{}/", path))?),
        }
    }

    /// Returns the output file for the page at `path`.
    pub fn file_path(&self, path: &str) -> PathBuf {
        let mut file_path = self.output_directory.to_owned();
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            file_path.push(segment);
        }
        file_path.join("index.html")
    }

    /// Renders a single page to HTML, pulling whatever the page's template
    /// needs from `query`.
    pub fn render_page<Q>(&self, page: &PageDescriptor, query: &Q) -> Result<String>
    where
        Q: ContentQuery + ?Sized,
    {
        let url = self.page_url(&page.path)?;
        let (item, head) = match page.template {
            PageTemplate::BlogPost => {
                let slug = page
                    .context
                    .slug
                    .as_deref()
                    .ok_or_else(|| Error::MissingSlug(page.path.clone()))?;
                let post = query
                    .post_by_slug(slug)?
                    .ok_or_else(|| Error::PostNotFound(slug.to_owned()))?;
                let head = Head {
                    title: value::text(&post.title),
                    description: value::text(&self.site.description),
                    url,
                };
                (Value::from(&post), head)
            }
            PageTemplate::Index => {
                let listing = query.all_posts()?;
                let mut posts = Vec::with_capacity(listing.posts.len());
                for post in &listing.posts {
                    let href = self.page_url(&post.slug)?;
                    posts.push(Value::from(Blurb { post, url: &href }));
                }
                let item = value::object([
                    ("total_count", Value::String(listing.total_count.to_string())),
                    ("posts", Value::Array(posts)),
                ]);
                let head = Head {
                    title: value::text(&self.site.title),
                    description: value::text(&self.site.description),
                    url,
                };
                (item, head)
            }
            PageTemplate::About => {
                let item = value::object([
                    ("site", Value::from(self.site)),
                    ("about", value::text(self.about)),
                ]);
                let head = Head {
                    title: value::text(&format!("About {}", self.site.title)),
                    description: value::text(&self.site.description),
                    url,
                };
                (item, head)
            }
        };

        let content = execute(self.theme.page_template(page.template), item)?;
        execute(
            &self.theme.layout,
            value::object([
                ("lang", Value::String("en".to_owned())),
                ("title", head.title),
                ("description", head.description),
                ("url", value::url(&head.url)),
                ("site", Value::from(self.site)),
                ("home_url", value::url(&self.site.root_url)),
                ("about_url", value::url(&self.page_url("about")?)),
                ("content", value::html(&content)),
            ]),
        )
    }

    /// Renders a page and writes it to disk, returning the file written.
    pub fn write_page<Q>(&self, page: &PageDescriptor, query: &Q) -> Result<PathBuf>
    where
        Q: ContentQuery + ?Sized,
    {
        let html = self
            .render_page(page, query)
            .map_err(|e| Error::Annotated(format!("rendering page `{}`", page.path), Box::new(e)))?;
        let file_path = self.file_path(&page.path);
        if let Some(dir) = file_path.parent() {
            fs::create_dir_all(dir)?;
        }
        fs::write(&file_path, html)?;
        log::debug!("wrote `{}` ({})", file_path.display(), page.template);
        Ok(file_path)
    }

    /// Writes every page in `pages`.
    pub fn write_pages<Q>(&self, pages: &[PageDescriptor], query: &Q) -> Result<()>
    where
        Q: ContentQuery + ?Sized,
    {
        pages
            .iter()
            .map(|page| self.write_page(page, query).map(|_| ()))
            .collect()
    }
}

fn execute(template: &Template, value: Value) -> Result<String> {
    let context = Context::from(value).map_err(|err| Error::Template(err.to_string()))?;
    let mut out: Vec<u8> = Vec::new();
    template
        .execute(&mut out, &context)
        .map_err(|err| Error::Template(err.to_string()))?;
    String::from_utf8(out).map_err(|err| Error::Template(err.to_string()))
}

/// The result of a fallible page-writing operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error in a page-writing operation.
#[derive(Debug, Error)]
pub enum Error {
    /// Returned for I/O problems while opening template files.
    #[error("opening template file `{}`: {err}", .path.display())]
    OpenTemplateFile {
        path: PathBuf,
        #[source]
        err: std::io::Error,
    },

    /// Returned for errors parsing template files.
    #[error("parsing template `{name}`: {err}")]
    ParseTemplate { name: String, err: String },

    /// An error during templating.
    #[error("{0}")]
    Template(String),

    /// Returned when a blog-post page carries no slug in its context.
    #[error("page `{0}` has no slug in its context")]
    MissingSlug(String),

    /// Returned when no post has the slug a page asks for.
    #[error("no post with slug `{0}`")]
    PostNotFound(String),

    /// Returned when a page's data can't be queried.
    #[error(transparent)]
    Query(#[from] query::Error),

    /// Returned when a page URL can't be built.
    #[error(transparent)]
    UrlParse(#[from] url::ParseError),

    /// An error writing the output files.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// An error with an annotation.
    #[error("{0}: {1}")]
    Annotated(String, #[source] Box<Error>),
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::annotate::{annotate_graph, POSTS_BASE_PATH};
    use crate::filepath::ContentRootResolver;
    use crate::node::test::post_pair;
    use crate::node::ContentGraph;

    fn site() -> SiteMetadata {
        SiteMetadata {
            title: "Copperwall Blog".to_owned(),
            description: "Posts & such".to_owned(),
            author: "@copperwall".to_owned(),
            root_url: Url::parse("https://example.org/").unwrap(),
            links: Vec::new(),
        }
    }

    fn graph() -> ContentGraph {
        let mut graph = ContentGraph::new();
        for (path, title, date) in &[
            ("posts/first/index.md", "First <post>", "2020-01-01"),
            ("posts/second.md", "Second", "2020-02-01"),
        ] {
            let (file, mut post) = post_pair(path, title, date);
            if let Some(frontmatter) = post.frontmatter.as_mut() {
                frontmatter.banner = Some("https://example.org/banner.jpg".to_owned());
            }
            graph.insert(file);
            graph.insert(post);
        }
        annotate_graph(&mut graph, &ContentRootResolver::new("posts"), POSTS_BASE_PATH).unwrap();
        graph
    }

    #[test]
    fn test_page_urls_and_paths() -> Result<()> {
        let theme = Theme::builtin()?;
        let site = site();
        let writer = Writer {
            theme: &theme,
            site: &site,
            about: "",
            output_directory: Path::new("/out"),
        };
        assert_eq!(writer.page_url("")?.as_str(), "https://example.org/");
        assert_eq!(
            writer.page_url("pages/posts/a")?.as_str(),
            "https://example.org/pages/posts/a/"
        );
        assert_eq!(writer.file_path(""), PathBuf::from("/out/index.html"));
        assert_eq!(
            writer.file_path("pages/posts/a"),
            PathBuf::from("/out/pages/posts/a/index.html")
        );
        Ok(())
    }

    #[test]
    fn test_render_blog_post() -> Result<()> {
        let theme = Theme::builtin()?;
        let site = site();
        let writer = Writer {
            theme: &theme,
            site: &site,
            about: "",
            output_directory: Path::new("/out"),
        };
        let html = writer.render_page(&PageDescriptor::blog_post("pages/posts/first"), &graph())?;
        assert!(html.contains("<title>First &lt;post&gt;</title>"), "{}", html);
        assert!(html.contains("<h1>First &lt;post&gt;</h1>"), "{}", html);
        assert!(html.contains("<p>First <post></p>"), "{}", html);
        assert!(html.contains(r#"<img src="https://example.org/banner.jpg" alt="banner">"#), "{}", html);
        assert!(!html.contains("banner-credit\">"), "{}", html);
        assert!(html.contains(r#"<meta name="twitter:creator" content="@copperwall">"#), "{}", html);
        assert!(html.contains(r#"<meta property="og:url" content="https://example.org/pages/posts/first/">"#), "{}", html);
        Ok(())
    }

    #[test]
    fn test_render_index() -> Result<()> {
        let theme = Theme::builtin()?;
        let site = site();
        let writer = Writer {
            theme: &theme,
            site: &site,
            about: "",
            output_directory: Path::new("/out"),
        };
        let html = writer.render_page(&PageDescriptor::index(), &graph())?;
        assert!(html.contains("<h4>2 Posts</h4>"), "{}", html);
        assert!(html.contains("<title>Copperwall Blog</title>"), "{}", html);
        assert!(html.contains("<small>01 February, 2020</small>"), "{}", html);
        let second = html.find("https://example.org/pages/posts/second/").unwrap();
        let first = html.find("https://example.org/pages/posts/first/\"><h3>").unwrap();
        assert!(second < first, "newest post should come first");
        Ok(())
    }

    #[test]
    fn test_render_about() -> Result<()> {
        let theme = Theme::builtin()?;
        let site = site();
        let writer = Writer {
            theme: &theme,
            site: &site,
            about: "Super awesome cool blog on the internet",
            output_directory: Path::new("/out"),
        };
        let html = writer.render_page(&PageDescriptor::about(), &graph())?;
        assert!(html.contains("<h1>About Copperwall Blog</h1>"), "{}", html);
        assert!(html.contains("<p>Super awesome cool blog on the internet</p>"), "{}", html);
        assert!(html.contains("content=\"Posts &amp; such\""), "{}", html);
        Ok(())
    }

    #[test]
    fn test_unknown_slug_is_an_error() -> Result<()> {
        let theme = Theme::builtin()?;
        let site = site();
        let writer = Writer {
            theme: &theme,
            site: &site,
            about: "",
            output_directory: Path::new("/out"),
        };
        assert!(matches!(
            writer.render_page(&PageDescriptor::blog_post("pages/posts/nope"), &graph()),
            Err(Error::PostNotFound(_))
        ));
        Ok(())
    }

    #[test]
    fn test_theme_overrides_builtin() -> Result<()> {
        let dir = tempfile::tempdir()?;
        fs::write(dir.path().join(ABOUT), "<p>custom {{ .about }}</p>")?;
        let theme = Theme::load(Some(dir.path()))?;
        let site = site();
        let writer = Writer {
            theme: &theme,
            site: &site,
            about: "text",
            output_directory: dir.path(),
        };
        let path = writer.write_page(&PageDescriptor::about(), &ContentGraph::new())?;
        assert_eq!(path, dir.path().join("about/index.html"));
        assert!(fs::read_to_string(path)?.contains("<p>custom text</p>"));
        Ok(())
    }
}
