//! CDN URL rewriting for rendered pages.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::{Captures, Regex};

/// Prefixes selected root-relative asset URLs with a CDN base.
#[derive(Debug, Clone)]
pub struct CdnRewriter {
    base: String,
    files: HashSet<String>,
}

impl CdnRewriter {
    /// Create a rewriter for `files` (root-relative paths such as
    /// `/styles/main.min.css`) served from `base`.
    pub fn new<I, S>(base: impl Into<String>, files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let base = base.into().trim_end_matches('/').to_string();
        Self {
            base,
            files: files.into_iter().map(Into::into).collect(),
        }
    }

    /// Rewrite `src` and `href` attributes that point at a listed file.
    ///
    /// Query strings and fragments are ignored when matching and kept in the
    /// rewritten URL.
    pub fn rewrite(&self, html: &str) -> String {
        static ATTR: LazyLock<Regex> = LazyLock::new(|| {
            Regex::new(r#"\b(src|href)=(?:"([^"]*)"|'([^']*)')"#).expect("Invalid attribute regex")
        });

        ATTR.replace_all(html, |caps: &Captures| {
            let (quote, url) = match (caps.get(2), caps.get(3)) {
                (Some(m), _) => ('"', m.as_str()),
                (None, Some(m)) => ('\'', m.as_str()),
                (None, None) => return caps[0].to_string(),
            };

            let path = url.split(['?', '#']).next().unwrap_or(url);
            if url.starts_with("//") || !self.files.contains(path) {
                return caps[0].to_string();
            }

            format!("{}={quote}{}{url}{quote}", &caps[1], self.base)
        })
        .into_owned()
    }
}
