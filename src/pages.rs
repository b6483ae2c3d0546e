//! The page builder. [`create_pages`] asks the content graph for every post
//! and emits one [`PageDescriptor`] per post through a [`PageActions`] sink.

use std::fmt;
use std::io::{self, Write};

use crate::query::{self, ContentQuery};

/// The template a page is rendered with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PageTemplate {
    /// The shared template for individual posts.
    BlogPost,

    /// The post listing at the site root.
    Index,

    /// The about page.
    About,
}

impl PageTemplate {
    pub fn name(self) -> &'static str {
        match self {
            PageTemplate::BlogPost => "blog-post",
            PageTemplate::Index => "index",
            PageTemplate::About => "about",
        }
    }
}

impl fmt::Display for PageTemplate {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Values passed through to the template, so that it can look up the rest of
/// its data itself.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PageContext {
    pub slug: Option<String>,
}

/// An instruction to emit one page at `path`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PageDescriptor {
    /// The URL path of the page, without leading or trailing slashes. The
    /// empty path is the site root.
    pub path: String,
    pub template: PageTemplate,
    pub context: PageContext,
}

impl PageDescriptor {
    pub fn blog_post(slug: &str) -> PageDescriptor {
        PageDescriptor {
            path: slug.to_owned(),
            template: PageTemplate::BlogPost,
            context: PageContext {
                slug: Some(slug.to_owned()),
            },
        }
    }

    pub fn index() -> PageDescriptor {
        PageDescriptor {
            path: String::new(),
            template: PageTemplate::Index,
            context: PageContext::default(),
        }
    }

    pub fn about() -> PageDescriptor {
        PageDescriptor {
            path: String::from("about"),
            template: PageTemplate::About,
            context: PageContext::default(),
        }
    }
}

/// Receives page-creation instructions.
pub trait PageActions {
    fn create_page(&mut self, page: PageDescriptor);
}

impl PageActions for Vec<PageDescriptor> {
    fn create_page(&mut self, page: PageDescriptor) {
        self.push(page);
    }
}

/// Creates one blog-post page per post returned by `query`. Query failures
/// are returned as-is; an empty result creates no pages.
pub fn create_pages<Q, A>(query: &Q, actions: &mut A) -> query::Result<()>
where
    Q: ContentQuery + ?Sized,
    A: PageActions + ?Sized,
{
    for slug in query.post_slugs()? {
        log::debug!("creating page `{}`", slug);
        actions.create_page(PageDescriptor::blog_post(&slug));
    }
    Ok(())
}

/// The pages every site has regardless of its posts.
pub fn site_pages() -> Vec<PageDescriptor> {
    vec![PageDescriptor::index(), PageDescriptor::about()]
}

/// Writes one `/{path}\t{template}` line per page.
pub fn write_listing<W: Write>(pages: &[PageDescriptor], w: &mut W) -> io::Result<()> {
    for page in pages {
        writeln!(w, "/{}\t{}", page.path, page.template)?;
    }
    Ok(())
}
