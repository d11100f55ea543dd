//! Image recognition: templates and the normalized cross-correlation matcher

pub mod matcher;
pub mod template;


pub use matcher::{Point, exists, exists_any, find, find_any};
pub use template::{DEFAULT_THRESHOLD, Template, TemplateSet};
