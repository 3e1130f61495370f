//! Linear-scan cosine similarity index.
//!
//! Scores every stored vector that shares the query's dimensionality and
//! keeps the best `k`. Vectors of another dimensionality are counted and
//! skipped. A zero-norm vector on either side scores `0.0` and ranks below
//! every vector that has a direction.
//!
//! Sorting is stable, so equal scores keep their input (storage) order.

use crate::embedding::{cosine_similarity, EmbeddingVector};

/// Default number of vector hits returned per query.
pub const DEFAULT_TOP_K: usize = 5;

/// One ranked entry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit<'a, T> {
    pub item: &'a T,
    pub score: f32,
}

/// Result of a scan.
#[derive(Debug, Clone)]
pub struct TopK<'a, T> {
    /// Best hits, by non-increasing score.
    pub hits: Vec<Hit<'a, T>>,
    /// Entries whose dimensionality matched the query.
    pub compared: usize,
    /// Entries skipped for a dimension mismatch.
    pub mismatched: usize,
}

/// Rank `entries` against `query` and keep the top `k`.
pub fn top_k<'a, T, I>(query: &EmbeddingVector, entries: I, k: usize) -> TopK<'a, T>
where
    I: IntoIterator<Item = (&'a T, &'a EmbeddingVector)>,
{
    let query_degenerate = query.is_degenerate();
    let mut mismatched = 0usize;

    // (rank key, reported score, hit)
    let mut scored: Vec<(f32, Hit<'a, T>)> = Vec::new();

    for (item, vector) in entries {
        let sim = match cosine_similarity(query.as_slice(), vector.as_slice()) {
            Ok(sim) => sim,
            Err(_) => {
                mismatched += 1;
                continue;
            }
        };

        let degenerate = query_degenerate || vector.is_degenerate() || !sim.is_finite();
        let (rank, score) = if degenerate {
            (f32::NEG_INFINITY, 0.0)
        } else {
            (sim, sim)
        };
        scored.push((rank, Hit { item, score }));
    }

    let compared = scored.len();
    scored.sort_by(|a, b| b.0.total_cmp(&a.0));
    scored.truncate(k);

    TopK {
        hits: scored.into_iter().map(|(_, hit)| hit).collect(),
        compared,
        mismatched,
    }
}
