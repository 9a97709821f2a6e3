//! Filesystem primitives used by the migration engine:
//! segment-scoped glob matching, pruned tree copy, and relative redirect links.

mod copy_tree;
mod helpers;
mod link;
mod matcher;
mod metadata;

pub use copy_tree::{copy_tree, CopyStats};
pub use helpers::io_error_with_help;
pub use link::{install_redirect, normalize, relative_path};
pub use matcher::PathMatcher;
