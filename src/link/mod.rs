//! Link resolution passes run over every assembled page, in order:
//! [`InlineLinker`] then [`RelativeLinkCollapser`].

pub mod inline;
pub mod relative;
pub mod repo;

pub use inline::InlineLinker;
pub use relative::RelativeLinkCollapser;
pub use repo::{GitHubLinks, LocalLinks, RepositoryLinks};
