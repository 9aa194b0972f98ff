//! Taxonomy graph engine: snapshots, queries, synthesis and change tracking

pub mod changelog;
pub mod dump;
pub mod filter;
pub mod lca;
pub mod lineage;
pub mod names;
pub mod rank;
pub mod reconcile;
pub mod store;
pub mod synthesis;
pub mod tree;
pub mod types;

pub use changelog::{ChangeEvent, ChangeKind, ChangelogEngine};
pub use filter::{RankFilter, RankFilterConfig};
pub use lca::LcaCache;
pub use lineage::AncestryWalker;
pub use names::NameIndex;
pub use rank::RankOrder;
pub use reconcile::{Reconciliation, VersionReconciler};
pub use store::{DumpPaths, TaxonomyStore};
pub use synthesis::{IdentitySynthesizer, SynthesizedTaxonomy, TaxonRow};
pub use tree::ChildIndex;
pub use types::{LineageError, LineagePath, Resolution, Taxon, TaxonId};
