
use log::{debug, trace};

use crate::backends::BackendError;
use crate::data_types::similarity::{FlatMatchRecord, LevelMatch, SimilarityResults};
use crate::data_types::taxonomy::TaxonomyLevel;

/// Flattens the nested engine output into one record per (sequence, match position).
/// Positions the engine did not fill are marked `NoMatch` instead of failing.
/// # Arguments
/// * `results` - raw engine output, level -> per-query ranked matches
/// * `sequence_ids` - input IDs, in the order the sequences were submitted
/// * `top_n` - number of match positions to emit per sequence
/// # Errors
/// * if the engine answered for a different number of sequences than were submitted
pub fn flatten_similarity_results(results: &SimilarityResults, sequence_ids: &[String], top_n: usize) -> Result<Vec<FlatMatchRecord>, BackendError> {
    let found = results.query_count();
    if found != sequence_ids.len() {
        return Err(BackendError::ResultCountMismatch { expected: sequence_ids.len(), found });
    }

    let mut flattened = Vec::with_capacity(sequence_ids.len() * top_n);
    for (query_index, sequence_id) in sequence_ids.iter().enumerate() {
        for rank_index in 0..top_n {
            let levels: Vec<LevelMatch> = TaxonomyLevel::all()
                .map(|level| match results.get(level, query_index, rank_index) {
                    Some(hit) => match hit.taxon(level) {
                        Some(taxon) => LevelMatch::Found {
                            taxon: taxon.to_string(),
                            hit_id: hit.id.clone(),
                            similarity: hit.distance
                        },
                        None => LevelMatch::Unassigned
                    },
                    None => {
                        trace!("No match {} at {level} for {sequence_id}", rank_index + 1);
                        LevelMatch::NoMatch
                    }
                })
                .collect();

            flattened.push(FlatMatchRecord {
                sequence_id: sequence_id.clone(),
                rank: rank_index + 1,
                levels
            });
        }
    }
    debug!("Flattened similarity results into {} records", flattened.len());
    Ok(flattened)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    use crate::util::json_io::load_json;

    fn ids(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_missing_match_marked() {
        let results: SimilarityResults = load_json(Path::new("test_data/similarity/two_queries.json")).unwrap();
        let flat = flatten_similarity_results(&results, &ids(&["seq1", "seq2"]), 2).unwrap();
        assert_eq!(flat.len(), 4);

        assert_eq!(flat[0].sequence_id, "seq1");
        assert_eq!(flat[0].rank, 1);
        assert_eq!(flat[0].level(TaxonomyLevel::Genus), &LevelMatch::Found {
            taxon: "Aspergillus".to_string(), hit_id: "UDB01".to_string(), similarity: 0.98
        });

        // sequence 2 has a single genus match
        assert_eq!(flat[3].sequence_id, "seq2");
        assert_eq!(flat[3].rank, 2);
        assert_eq!(flat[3].level(TaxonomyLevel::Genus), &LevelMatch::NoMatch);
        assert!(matches!(flat[3].level(TaxonomyLevel::Kingdom), LevelMatch::Found { .. }));

        // a match without a species value is unassigned, not missing
        assert_eq!(flat[2].level(TaxonomyLevel::Species), &LevelMatch::Unassigned);
    }

    #[test]
    fn test_count_mismatch() {
        let results: SimilarityResults = load_json(Path::new("test_data/similarity/two_queries.json")).unwrap();
        let result = flatten_similarity_results(&results, &ids(&["seq1"]), 2);
        assert!(matches!(result, Err(BackendError::ResultCountMismatch { expected: 1, found: 2 })));
    }

    #[test]
    fn test_top_n_beyond_results() {
        let results: SimilarityResults = load_json(Path::new("test_data/similarity/two_queries.json")).unwrap();
        let flat = flatten_similarity_results(&results, &ids(&["seq1", "seq2"]), 5).unwrap();
        assert_eq!(flat.len(), 10);
        assert!(flat[4].levels.iter().all(|l| *l == LevelMatch::NoMatch));
    }
}
