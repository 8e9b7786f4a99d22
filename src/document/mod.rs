//! Document layer: the user-authored unified config, parsed but not validated.
//!
//! This module only turns YAML into the loosely-typed `RawDocument`. Everything
//! that decides whether the document makes sense lives in `graph`.

pub mod parse;
pub mod raw;

pub use parse::{SyntaxError, parse_document, read_document};
pub use raw::{Entries, RawComponent, RawDocument, RawPipeline, RawSection, RawService};
