//! markdoc: markdown pages from templated doc comments.
//!
//! Members opt into documentation with a comment block between `=mark_doc`
//! and `=mark_end`. The block is an ERB-style template whose macros can
//! print source, evaluate members and build links. Every subject (class or
//! module) becomes one page; inline markers are then resolved into links.
//!
//! ```text
//! # =mark_doc
//! # The sum of <%= methods_as_local_links(print_method_source) %>
//! # =mark_end
//! def total
//!   subtotal + tax
//! end
//! ```

pub mod config;
pub mod error;
pub mod extract;
pub mod inflect;
pub mod invoke;
pub mod link;
pub mod model;
pub mod pipeline;
pub mod reference;
pub mod registry;
pub mod render;
pub mod sink;
pub mod source;
pub mod template;

pub use config::Manifest;
pub use error::{Error, Result};
pub use model::{EntryKey, NamespaceTree, Page, Subject};
pub use pipeline::{run_pipeline, Generator, RunConfig};
pub use reference::{MethodReference, ReferenceKind};
pub use registry::SubjectRegistry;
