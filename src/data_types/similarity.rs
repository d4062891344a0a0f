
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::data_types::taxonomy::TaxonomyLevel;

/// Marker written in place of a taxon when the engine returned fewer than top-N matches
pub const NO_MATCH_FOUND: &str = "No match found";

/// A single hit from the embedding similarity engine
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct SimilarityMatch {
    /// Identifier of the matched reference sequence
    pub id: String,
    /// Similarity distance reported by the engine
    pub distance: f64,
    /// Metadata of the matched reference, keyed by taxonomy level
    #[serde(default)]
    pub entity: IndexMap<String, serde_json::Value>
}

impl SimilarityMatch {
    /// The taxon this match carries for `level`; empty or non-string values count as missing.
    pub fn taxon(&self, level: TaxonomyLevel) -> Option<&str> {
        self.entity.get(level.as_ref())
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
    }
}

/// Raw engine output: level name -> one ranked match list per query sequence
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(transparent)]
pub struct SimilarityResults {
    by_level: IndexMap<String, Vec<Vec<SimilarityMatch>>>
}

impl SimilarityResults {
    pub fn new(by_level: IndexMap<String, Vec<Vec<SimilarityMatch>>>) -> Self {
        Self { by_level }
    }

    /// Number of query sequences the engine answered for, taken from the first level.
    pub fn query_count(&self) -> usize {
        self.by_level.get(TaxonomyLevel::Kingdom.as_ref())
            .or_else(|| self.by_level.values().next())
            .map(|per_query| per_query.len())
            .unwrap_or(0)
    }

    /// The `rank_index`-th (0-based) match for a query at a level, if the engine returned one.
    pub fn get(&self, level: TaxonomyLevel, query_index: usize, rank_index: usize) -> Option<&SimilarityMatch> {
        self.by_level.get(level.as_ref())?
            .get(query_index)?
            .get(rank_index)
    }
}

/// The per-level part of a flattened match
#[derive(Clone, Debug, PartialEq)]
pub enum LevelMatch {
    /// The match at this slot carries a taxon for the level
    Found { taxon: String, hit_id: String, similarity: f64 },
    /// There is a match at this slot but it has no value at this level
    Unassigned,
    /// The engine returned fewer matches than requested
    NoMatch
}

/// One flattened row: a query sequence at one ordinal match position
#[derive(Clone, Debug, PartialEq)]
pub struct FlatMatchRecord {
    /// The input sequence ID
    pub sequence_id: String,
    /// 1-based position in the ranked match list
    pub rank: usize,
    /// One entry per taxonomy level, kingdom first
    pub levels: Vec<LevelMatch>
}

impl FlatMatchRecord {
    pub fn level(&self, level: TaxonomyLevel) -> &LevelMatch {
        &self.levels[level as usize]
    }
}
