//! Typed reads over the content graph. [`ContentQuery`] covers the fixed set
//! of questions the page builder and the page templates ask.

use chrono::NaiveDate;
use thiserror::Error;

use crate::node::{ContentGraph, ContentNode, NodeId};

/// The display format for post dates on the index page, e.g.
/// `01 January, 2020`.
pub const DISPLAY_DATE_FORMAT: &str = "%d %B, %Y";

/// One row of the index listing.
#[derive(Clone, Debug, PartialEq)]
pub struct PostSummary {
    pub id: NodeId,
    pub slug: String,
    pub title: String,
    pub date: NaiveDate,
    pub excerpt: String,
}

impl PostSummary {
    pub fn display_date(&self) -> String {
        self.date.format(DISPLAY_DATE_FORMAT).to_string()
    }
}

/// All posts, newest first.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PostListing {
    pub total_count: usize,
    pub posts: Vec<PostSummary>,
}

/// Everything the blog-post page shows.
#[derive(Clone, Debug, PartialEq)]
pub struct PostDetail {
    pub slug: String,
    pub title: String,
    pub banner: Option<String>,
    pub banner_credit: Option<String>,
    pub html: String,
}

pub trait ContentQuery {
    /// The slugs of every post.
    fn post_slugs(&self) -> Result<Vec<String>>;

    /// Every post, sorted by date with the most recent first.
    fn all_posts(&self) -> Result<PostListing>;

    /// The post whose slug is `slug`, if any.
    fn post_by_slug(&self, slug: &str) -> Result<Option<PostDetail>>;
}

fn slug_of(node: &ContentNode) -> Result<&str> {
    node.slug().ok_or_else(|| Error::MissingSlug(node.id.clone()))
}

fn frontmatter_of(node: &ContentNode) -> Result<&crate::node::Frontmatter> {
    node.frontmatter
        .as_ref()
        .ok_or_else(|| Error::MissingFrontmatter(node.id.clone()))
}

impl ContentQuery for ContentGraph {
    fn post_slugs(&self) -> Result<Vec<String>> {
        self.posts()
            .map(|node| slug_of(node).map(str::to_owned))
            .collect()
    }

    fn all_posts(&self) -> Result<PostListing> {
        let mut posts = self
            .posts()
            .map(|node| {
                let frontmatter = frontmatter_of(node)?;
                Ok(PostSummary {
                    id: node.id.clone(),
                    slug: slug_of(node)?.to_owned(),
                    title: frontmatter.title.clone(),
                    date: frontmatter.date,
                    excerpt: node.excerpt.clone(),
                })
            })
            .collect::<Result<Vec<PostSummary>>>()?;

        // Ties fall back to the slug so the listing is stable.
        posts.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| a.slug.cmp(&b.slug)));
        Ok(PostListing {
            total_count: posts.len(),
            posts,
        })
    }

    fn post_by_slug(&self, slug: &str) -> Result<Option<PostDetail>> {
        for node in self.posts() {
            if node.slug() != Some(slug) {
                continue;
            }
            let frontmatter = frontmatter_of(node)?;
            return Ok(Some(PostDetail {
                slug: slug.to_owned(),
                title: frontmatter.title.clone(),
                banner: frontmatter.banner.clone(),
                banner_credit: frontmatter.banner_credit.clone(),
                html: node.html.clone(),
            }));
        }
        Ok(None)
    }
}

/// Represents the result of a query.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents a failed query.
#[derive(Debug, Error)]
pub enum Error {
    /// Returned when a post hasn't been annotated with a slug.
    #[error("post `{0}` has no slug")]
    MissingSlug(NodeId),

    /// Returned when a post node carries no frontmatter.
    #[error("post `{0}` has no frontmatter")]
    MissingFrontmatter(NodeId),
}
