//! Domain types - increments, the package manifest and release tags

pub mod increment;
pub mod package;
pub mod tag;

pub use increment::Increment;
pub use package::{PackageManifest, PublishConfig, RepositoryField};
pub use tag::{Tag, DEFAULT_TAG_PREFIX};
