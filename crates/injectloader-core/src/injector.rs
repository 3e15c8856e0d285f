use crate::config::InjectConfig;
use crate::context::rewrite_context_calls;
use crate::errors::Result;
use crate::filter::FilterSet;
use crate::pattern::RequirePattern;
use crate::wrap::{render_module, wrap_requires};
use tracing::debug;

/// Cheap pre-check deciding whether the structural pass is needed
const REQUIRE_CONTEXT: &str = "require.context(";

/// Rewrites module sources so their dependencies can be injected at runtime.
///
/// The output module exports `function inject(injections)`. Calling it runs the
/// original module body with every wrapped `require()` first looking up
/// `injections[path]` and falling back to the real load.
#[derive(Debug, Clone)]
pub struct Injector {
    pattern: RequirePattern,
}

impl Injector {
    pub fn new(filters: &FilterSet) -> Result<Self> {
        Ok(Self {
            pattern: RequirePattern::build(filters)?,
        })
    }

    pub fn from_config(config: &InjectConfig) -> Result<Self> {
        Self::new(&config.filters)
    }

    pub fn pattern(&self) -> &RequirePattern {
        &self.pattern
    }

    pub fn transform(&self, source: &str) -> Result<String> {
        let output = render_module(&wrap_requires(source, &self.pattern));

        if !source.contains(REQUIRE_CONTEXT) {
            return Ok(output);
        }

        debug!("Source uses require.context, running structural pass");
        rewrite_context_calls(&output)
    }
}

/// Transform `source` using the filters of a loader query string such as `?./dep`.
pub fn inject(query: &str, source: &str) -> Result<String> {
    let filters = FilterSet::from_query(query)?;
    Injector::new(&filters)?.transform(source)
}
