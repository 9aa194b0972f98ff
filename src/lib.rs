pub mod cli;
pub mod core;
pub mod error;
pub mod taxonomy;
pub mod utils;

pub use crate::error::{TaxkitError, TaxkitResult};
pub use crate::taxonomy::{
    AncestryWalker, ChangelogEngine, IdentitySynthesizer, LcaCache, LineagePath, RankFilter,
    RankOrder, TaxonId, TaxonomyStore, VersionReconciler,
};
