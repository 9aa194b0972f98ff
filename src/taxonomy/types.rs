/// Taxonomy value types shared by the store, the query engines and the changelog
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::error::TaxkitError;

/// Taxonomy ID type - newtype pattern for type safety
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
pub struct TaxonId(pub u32);

impl TaxonId {
    /// Reserved value for "no taxid" in tabular outputs
    pub const UNCLASSIFIED: Self = Self(0);
    /// Root of every taxonomy
    pub const ROOT: Self = Self(1);

    pub fn is_root(&self) -> bool {
        *self == Self::ROOT
    }
}

impl fmt::Display for TaxonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for TaxonId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl From<TaxonId> for u32 {
    fn from(taxon: TaxonId) -> Self {
        taxon.0
    }
}

impl FromStr for TaxonId {
    type Err = TaxkitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u32>()
            .map(TaxonId)
            .map_err(|_| TaxkitError::Parse(format!("invalid taxid: {:?}", s)))
    }
}

/// One node of a taxonomy as it appears in the dump tables
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Taxon {
    pub taxid: TaxonId,
    pub parent: TaxonId,
    pub rank: String,
    pub name: String,
}

/// One element of a lineage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineageNode {
    pub taxid: TaxonId,
    pub name: String,
    pub rank: String,
}

/// Root-first path from the top of the taxonomy down to a queried taxon.
///
/// The root itself is only part of the path when the root is queried.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineagePath {
    /// Taxid the caller asked for
    pub query: TaxonId,
    /// Merge aliases followed while resolving, as `(old, new)` pairs
    pub redirects: Vec<(TaxonId, TaxonId)>,
    pub nodes: Vec<LineageNode>,
}

impl LineagePath {
    /// Taxid the path ends at (differs from `query` when an alias was followed)
    pub fn taxid(&self) -> TaxonId {
        self.nodes.last().map(|n| n.taxid).unwrap_or(self.query)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn was_redirected(&self) -> bool {
        !self.redirects.is_empty()
    }

    pub fn taxids(&self) -> Vec<TaxonId> {
        self.nodes.iter().map(|n| n.taxid).collect()
    }

    pub fn names(&self) -> Vec<&str> {
        self.nodes.iter().map(|n| n.name.as_str()).collect()
    }

    pub fn ranks(&self) -> Vec<&str> {
        self.nodes.iter().map(|n| n.rank.as_str()).collect()
    }

    /// True when `self` is a strict prefix of `other`
    pub fn is_strict_prefix_of(&self, other: &LineagePath) -> bool {
        self.nodes.len() < other.nodes.len()
            && self
                .nodes
                .iter()
                .zip(other.nodes.iter())
                .all(|(a, b)| a.taxid == b.taxid)
    }
}

/// How a single taxid resolves against one snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Live(TaxonId),
    Merged { from: TaxonId, to: TaxonId },
    Deleted(TaxonId),
    Unknown(TaxonId),
}

impl Resolution {
    /// The live taxid this resolution points at, if any
    pub fn live_id(&self) -> Option<TaxonId> {
        match self {
            Resolution::Live(id) => Some(*id),
            Resolution::Merged { to, .. } => Some(*to),
            Resolution::Deleted(_) | Resolution::Unknown(_) => None,
        }
    }
}

/// Why a lineage or LCA query could not produce a taxid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LineageError {
    #[error("taxid {0} was deleted")]
    Deleted(TaxonId),

    #[error("taxid {0} not found")]
    Unknown(TaxonId),

    #[error("cycle detected above taxid {taxid} after {hops} hops")]
    CycleDetected { taxid: TaxonId, hops: usize },

    #[error("no taxids given")]
    EmptyQuery,
}

impl From<LineageError> for TaxkitError {
    fn from(err: LineageError) -> Self {
        match err {
            LineageError::CycleDetected { taxid, hops } => {
                TaxkitError::CycleDetected { taxid, hops }
            }
            other => TaxkitError::InvalidInput(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(taxid: u32) -> LineageNode {
        LineageNode {
            taxid: TaxonId(taxid),
            name: format!("t{}", taxid),
            rank: "no rank".to_string(),
        }
    }

    #[test]
    fn test_taxon_id_parse() {
        assert_eq!("9606".parse::<TaxonId>().unwrap(), TaxonId(9606));
        assert_eq!(" 2 ".parse::<TaxonId>().unwrap(), TaxonId(2));
        assert!("abc".parse::<TaxonId>().is_err());
        assert!("-3".parse::<TaxonId>().is_err());
    }

    #[test]
    fn test_root_constant() {
        assert!(TaxonId::ROOT.is_root());
        assert!(!TaxonId(2).is_root());
    }

    #[test]
    fn test_strict_prefix() {
        let short = LineagePath {
            query: TaxonId(3),
            redirects: vec![],
            nodes: vec![node(2), node(3)],
        };
        let long = LineagePath {
            query: TaxonId(4),
            redirects: vec![],
            nodes: vec![node(2), node(3), node(4)],
        };
        assert!(short.is_strict_prefix_of(&long));
        assert!(!long.is_strict_prefix_of(&short));
        assert!(!long.is_strict_prefix_of(&long));
    }

    #[test]
    fn test_resolution_live_id() {
        assert_eq!(Resolution::Live(TaxonId(5)).live_id(), Some(TaxonId(5)));
        assert_eq!(
            Resolution::Merged {
                from: TaxonId(5),
                to: TaxonId(6)
            }
            .live_id(),
            Some(TaxonId(6))
        );
        assert_eq!(Resolution::Deleted(TaxonId(5)).live_id(), None);
    }
}
