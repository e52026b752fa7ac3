//! Template rendering.
//!
//! Two template kinds share one binding:
//!
//! - [`TopicTemplate`]: `{name}` substitution only.
//! - [`PayloadTemplate`]: a [`tera`] template with `{{ expr }}` output,
//!   `{% if %}` blocks, arithmetic, comparisons, `is defined` and filters.
//!   It reads the binding and nothing else.
//!
//! Both are parsed once when routes compile; rendering never re-parses.

mod payload;
mod topic;

pub use payload::PayloadTemplate;
pub use topic::TopicTemplate;
