//! Builds the pattern that finds wrappable `require(...)` calls.

use crate::errors::Result;
use crate::filter::{FilterMode, FilterSet};
use regex::{Captures, Regex};
use tracing::debug;

/// Matches any single or double quote
const QUOTE: &str = r#"['"]"#;

/// Literal prefix of every match
const REQUIRE_OPEN: &str = "require(";

/// Everything inside the call's parentheses
const CATCH_ALL: &str = r"([^)]+)";

/// A compiled `require(...)` matcher for one filter set.
///
/// Capture group 1 holds the call argument. For an inclusion set it is the
/// quoted literal, quotes included. Otherwise it is the raw text between the
/// parentheses, and for an exclusion set a match whose argument starts with a
/// quote followed by an excluded path is skipped by [`RequirePattern::wrappable_calls`].
#[derive(Debug, Clone)]
pub struct RequirePattern {
    regex: Regex,
    excluded: Vec<String>,
}

impl RequirePattern {
    pub fn build(filters: &FilterSet) -> Result<Self> {
        let (capture, excluded) = match filters.mode() {
            FilterMode::All => (CATCH_ALL.to_string(), Vec::new()),
            FilterMode::Exclude => (
                CATCH_ALL.to_string(),
                filters.paths().map(str::to_string).collect(),
            ),
            FilterMode::Include => {
                let alternation = filters
                    .paths()
                    .map(regex::escape)
                    .collect::<Vec<_>>()
                    .join("|");
                (
                    format!("({quote}(?:{alternation}){quote})", quote = QUOTE),
                    Vec::new(),
                )
            }
        };

        let source = format!(r"require\({}\)", capture);
        debug!("Built require pattern: {} (excluding {:?})", source, excluded);

        Ok(Self {
            regex: Regex::new(&source)?,
            excluded,
        })
    }

    pub fn regex(&self) -> &Regex {
        &self.regex
    }

    /// Every wrappable call in `source`, in source order.
    ///
    /// A rejected match only fails at its own `require(`: scanning resumes just
    /// past it, so calls nested in an excluded call's argument are still found.
    pub fn wrappable_calls<'s>(
        &'s self,
        source: &'s str,
    ) -> impl Iterator<Item = Captures<'s>> + 's {
        let mut search_from = 0;
        std::iter::from_fn(move || loop {
            let caps = self.regex.captures_at(source, search_from)?;
            let call = caps.get(0)?;
            if self.accepts(&caps) {
                search_from = call.end();
                return Some(caps);
            }
            search_from = call.start() + REQUIRE_OPEN.len();
        })
    }

    /// An argument is rejected when it starts with a quote immediately followed
    /// by an excluded path. This is a prefix test: excluding `./a` also skips
    /// `require('./ab')`.
    fn accepts(&self, caps: &Captures<'_>) -> bool {
        let Some(argument) = caps.get(1).map(|m| m.as_str()) else {
            return false;
        };
        let unquoted = argument
            .strip_prefix('\'')
            .or_else(|| argument.strip_prefix('"'));
        match unquoted {
            Some(rest) => !self.excluded.iter().any(|path| rest.starts_with(path.as_str())),
            None => true,
        }
    }
}
