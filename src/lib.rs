//! The library code for the `copperwall` blog generator. A build runs in
//! four steps:
//!
//! 1. Sourcing posts from Markdown files on disk into a content graph
//!    ([`crate::source`], [`crate::node`])
//! 2. Annotating every post node with a slug derived from its file location
//!    ([`crate::annotate`], [`crate::filepath`])
//! 3. Planning one page per post plus the site's fixed pages
//!    ([`crate::pages`])
//! 4. Rendering every page to disk ([`crate::write`])
//!
//! Steps 2 and 3 only see the graph through small capabilities
//! ([`node::NodeLookup`], [`node::NodeActions`], [`query::ContentQuery`],
//! [`pages::PageActions`]), so they can be driven by something other than
//! [`build::build_site`].

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]

pub mod annotate;
pub mod build;
pub mod config;
pub mod filepath;
pub mod markdown;
pub mod node;
pub mod pages;
pub mod query;
pub mod source;
pub mod value;
pub mod write;
