//! Rank order model
//!
//! A rank file lists rank levels from the least specific (first line) to the
//! most specific (last line):
//!
//! ```text
//! # comment
//! !no rank
//! domain,superkingdom
//! phylum
//! species
//! ```
//!
//! Ranks on one line share a level; a `!` prefix marks a rank as unordered.
//! Matching is case-insensitive. Levels are numbered from 1 upward, so a
//! larger number means a more specific rank.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

use tracing::info;

use crate::error::{TaxkitError, TaxkitResult};

pub const DEFAULT_RANKS_FILE: &str = "ranks.txt";

/// Built-in rank order (Wikipedia taxonomic ranks plus the NCBI additions)
pub const DEFAULT_RANKS: &str = "\
# Taxonomic rank order used by taxkit.
#
# Rules:
#     1. Blank lines and lines starting with \"#\" are ignored.
#     2. Ranks go from the least to the most specific; case is ignored.
#     3. Ranks sharing a level go on one line, separated by commas.
#     4. Ranks without an order are prefixed with \"!\".

!no rank
!clade

life

domain,superkingdom,realm,empire

kingdom
subkingdom
infrakingdom
parvkingdom

superphylum,superdivision
phylum,division
subphylum,subdivision
infraphylum,infradivision
microphylum,microdivision

superclass
class
subclass
infraclass
parvclass

superlegion
legion
sublegion
infralegion

supercohort
cohort
subcohort
infracohort

gigaorder
magnorder,megaorder
grandorder,capaxorder
mirorder,hyperorder
superorder
order
nanorder
hypoorder
minorder
suborder
infraorder
parvorder

gigafamily
megafamily
grandfamily
hyperfamily
superfamily
epifamily
group
family
subfamily
infrafamily

supertribe
tribe
subtribe
infratribe

genus
subgenus
section
subsection
series
subseries

superspecies,species group
species subgroup
species

subspecies,forma specialis,pathovar

pathogroup,serogroup
biotype,serotype,genotype

variety,varietas,morph,aberration
subvariety,subvarietas,submorph,subaberration
form,forma
subform,subforma

strain
isolate
";

/// Integer specificity per rank plus the set of unordered ranks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankOrder {
    order: HashMap<String, u32>,
    unordered: HashSet<String>,
}

impl RankOrder {
    pub fn parse(text: &str) -> TaxkitResult<Self> {
        let mut levels: Vec<Vec<String>> = Vec::new();
        let mut unordered = HashSet::new();

        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let mut level = Vec::new();
            for item in line.split(',') {
                let item = item.trim().to_lowercase();
                if item.is_empty() {
                    continue;
                }
                match item.strip_prefix('!') {
                    Some(rank) => {
                        unordered.insert(rank.trim().to_string());
                    }
                    None => level.push(item),
                }
            }
            if !level.is_empty() {
                levels.push(level);
            }
        }

        if levels.is_empty() {
            return Err(TaxkitError::Configuration(
                "no ranks found in rank order".to_string(),
            ));
        }

        let mut order = HashMap::new();
        for (i, level) in levels.into_iter().enumerate() {
            for rank in level {
                if unordered.contains(&rank) || order.contains_key(&rank) {
                    return Err(TaxkitError::Configuration(format!(
                        "duplicated rank: {}",
                        rank
                    )));
                }
                order.insert(rank, i as u32 + 1);
            }
        }

        Ok(Self { order, unordered })
    }

    pub fn from_file(path: &Path) -> TaxkitResult<Self> {
        info!("Reading rank order from {}", path.display());
        let text = std::fs::read_to_string(path).map_err(|e| {
            TaxkitError::Configuration(format!(
                "failed to read rank order from {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::parse(&text)
    }

    /// Read `path`, writing the built-in order there first if it is missing
    pub fn load_or_init(path: &Path) -> TaxkitResult<Self> {
        if !path.exists() {
            info!("Writing default rank order to {}", path.display());
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, DEFAULT_RANKS)?;
        }
        Self::from_file(path)
    }

    /// Specificity of an ordered rank
    pub fn order_of(&self, rank: &str) -> Option<u32> {
        self.order.get(&rank.to_lowercase()).copied()
    }

    pub fn is_unordered(&self, rank: &str) -> bool {
        self.unordered.contains(&rank.to_lowercase())
    }

    /// Ordered or explicitly unordered
    pub fn is_defined(&self, rank: &str) -> bool {
        let rank = rank.to_lowercase();
        self.order.contains_key(&rank) || self.unordered.contains(&rank)
    }

    /// Ordered ranks grouped by level, least specific first
    pub fn levels(&self) -> Vec<Vec<String>> {
        let mut grouped: BTreeMap<u32, Vec<String>> = BTreeMap::new();
        for (rank, order) in &self.order {
            grouped.entry(*order).or_default().push(rank.clone());
        }
        grouped
            .into_values()
            .map(|mut ranks| {
                ranks.sort();
                ranks
            })
            .collect()
    }

    pub fn unordered(&self) -> Vec<String> {
        let mut ranks: Vec<String> = self.unordered.iter().cloned().collect();
        ranks.sort();
        ranks
    }
}

impl Default for RankOrder {
    fn default() -> Self {
        Self::parse(DEFAULT_RANKS).unwrap_or_else(|_| Self {
            order: HashMap::new(),
            unordered: HashSet::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_order() {
        let order = RankOrder::default();
        assert!(order.order_of("species").unwrap() > order.order_of("genus").unwrap());
        assert!(order.order_of("genus").unwrap() > order.order_of("family").unwrap());
        assert_eq!(order.order_of("domain"), order.order_of("superkingdom"));
        assert!(order.is_unordered("no rank"));
        assert!(order.is_unordered("Clade"));
        assert_eq!(order.order_of("no rank"), None);
        assert!(order.is_defined("Species"));
        assert!(!order.is_defined("kingdomish"));
    }

    #[test]
    fn test_parse_levels() {
        let order = RankOrder::parse("# x\n!no rank\n\nKingdom\nphylum,division\nspecies\n").unwrap();
        assert_eq!(order.order_of("kingdom"), Some(1));
        assert_eq!(order.order_of("division"), Some(2));
        assert_eq!(order.order_of("species"), Some(3));
        assert_eq!(
            order.levels(),
            vec![
                vec!["kingdom".to_string()],
                vec!["division".to_string(), "phylum".to_string()],
                vec!["species".to_string()],
            ]
        );
        assert_eq!(order.unordered(), vec!["no rank".to_string()]);
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            RankOrder::parse("# only comments\n!no rank\n"),
            Err(TaxkitError::Configuration(_))
        ));
        assert!(matches!(
            RankOrder::parse("genus\nspecies\ngenus\n"),
            Err(TaxkitError::Configuration(_))
        ));
    }

    #[test]
    fn test_load_or_init_writes_default() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(DEFAULT_RANKS_FILE);
        let order = RankOrder::load_or_init(&path).unwrap();
        assert!(path.exists());
        assert_eq!(order, RankOrder::default());
    }
}
