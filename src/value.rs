//! Conversions from site data into template [`Value`]s. Text is HTML-escaped
//! on the way in since the templates print values verbatim; rendered HTML
//! (post bodies, page content) is passed through untouched.

use std::collections::HashMap;

use gtmpl_value::Value;
use pulldown_cmark::escape::escape_html;
use url::Url;

use crate::config::{Link, SiteMetadata};
use crate::query::{PostDetail, PostSummary};

/// Escapes `text` and wraps it in a [`Value::String`].
pub fn text(text: &str) -> Value {
    let mut out = String::with_capacity(text.len());
    escape_html(&mut out, text).expect("writing to a String can't fail");
    Value::String(out)
}

/// Wraps already-rendered HTML.
pub fn html(html: &str) -> Value {
    Value::String(html.to_owned())
}

pub fn optional_text(opt: Option<&str>) -> Value {
    match opt {
        Some(s) => text(s),
        None => Value::Nil,
    }
}

pub fn url(url: &Url) -> Value {
    text(url.as_str())
}

pub fn object<const N: usize>(fields: [(&str, Value); N]) -> Value {
    let mut m: HashMap<String, Value> = HashMap::with_capacity(N);
    for (key, value) in fields {
        m.insert(key.to_owned(), value);
    }
    Value::Object(m)
}

impl From<&Link> for Value {
    fn from(link: &Link) -> Value {
        object([("name", text(&link.name)), ("url", url(&link.url))])
    }
}

impl From<&SiteMetadata> for Value {
    fn from(site: &SiteMetadata) -> Value {
        object([
            ("title", text(&site.title)),
            ("description", text(&site.description)),
            ("author", text(&site.author)),
            ("root_url", url(&site.root_url)),
            ("links", Value::Array(site.links.iter().map(Value::from).collect())),
        ])
    }
}

impl From<&PostDetail> for Value {
    fn from(post: &PostDetail) -> Value {
        object([
            ("slug", text(&post.slug)),
            ("title", text(&post.title)),
            ("banner", optional_text(post.banner.as_deref())),
            ("banner_credit", optional_text(post.banner_credit.as_deref())),
            ("html", html(&post.html)),
        ])
    }
}

/// A post as it appears in the index listing, alongside the URL of its page.
pub struct Blurb<'a> {
    pub post: &'a PostSummary,
    pub url: &'a Url,
}

impl From<Blurb<'_>> for Value {
    fn from(blurb: Blurb<'_>) -> Value {
        let post = blurb.post;
        object([
            ("id", text(post.id.as_str())),
            ("slug", text(&post.slug)),
            ("url", url(blurb.url)),
            ("title", text(&post.title)),
            ("date", text(&post.display_date())),
            ("excerpt", text(&post.excerpt)),
        ])
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn string(value: &Value) -> &str {
        match value {
            Value::String(s) => s,
            _ => panic!("not a string"),
        }
    }

    #[test]
    fn test_text_is_escaped() {
        assert_eq!(string(&text("Tom & <Jerry>")), "Tom &amp; &lt;Jerry&gt;");
    }

    #[test]
    fn test_html_is_verbatim() {
        assert_eq!(string(&html("<p>hi</p>")), "<p>hi</p>");
    }

    #[test]
    fn test_missing_banner_is_nil() {
        let post = PostDetail {
            slug: "pages/posts/a".to_owned(),
            title: "A".to_owned(),
            banner: None,
            banner_credit: None,
            html: String::new(),
        };
        match Value::from(&post) {
            Value::Object(m) => {
                assert!(matches!(m.get("banner"), Some(Value::Nil)));
                assert_eq!(string(&m["title"]), "A");
            }
            _ => panic!("not an object"),
        }
    }
}
