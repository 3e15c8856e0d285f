pub mod config;
pub mod context;
pub mod errors;
pub mod filter;
pub mod injector;
pub mod pattern;
pub mod replace;
pub mod wrap;

pub use config::{CliOverrides, InjectConfig};
pub use context::{rewrite_context_calls, ContextBinding, ContextCallSite};
pub use errors::{InjectError, ReplaceError};
pub use filter::{FilterMode, FilterSet};
pub use injector::{inject, Injector};
pub use pattern::RequirePattern;
pub use replace::SourceReplacer;
