use crate::error::SearchError;
use crate::traits::{Neighbor, VectorIndex};
use std::cmp::Ordering;

/// Exact cosine-similarity index. Vectors are normalised on insert so a
/// query is scored with one dot product per stored vector.
#[derive(Debug, Clone)]
pub struct FlatIndex {
    dimensions: usize,
    vectors: Vec<Vec<f32>>,
}

impl FlatIndex {
    pub fn from_vectors(vectors: Vec<Vec<f32>>) -> Result<Self, SearchError> {
        let dimensions = vectors.first().map(Vec::len).unwrap_or_default();
        if dimensions == 0 {
            return Err(SearchError::InvalidVector(
                "index needs at least one non-empty vector".to_string(),
            ));
        }

        let vectors = vectors
            .into_iter()
            .enumerate()
            .map(|(position, vector)| {
                if vector.len() != dimensions {
                    return Err(SearchError::DimensionMismatch {
                        expected: dimensions,
                        actual: vector.len(),
                    });
                }
                if vector.iter().any(|value| !value.is_finite()) {
                    return Err(SearchError::InvalidVector(format!(
                        "vector {position} contains NaN or infinite values"
                    )));
                }
                Ok(normalize(vector))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { dimensions, vectors })
    }
}

impl VectorIndex for FlatIndex {
    fn len(&self) -> usize {
        self.vectors.len()
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn nearest(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>, SearchError> {
        if query.len() != self.dimensions {
            return Err(SearchError::DimensionMismatch {
                expected: self.dimensions,
                actual: query.len(),
            });
        }
        if query.iter().any(|value| !value.is_finite()) {
            return Err(SearchError::InvalidVector(
                "query vector contains NaN or infinite values".to_string(),
            ));
        }

        let query = normalize(query.to_vec());
        let mut scored: Vec<Neighbor> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(position, vector)| Neighbor {
                position,
                score: dot(vector, &query),
            })
            .collect();

        // stable sort: ties stay in insertion order, and +0.0 == -0.0
        scored.sort_by(|left, right| {
            right
                .score
                .partial_cmp(&left.score)
                .unwrap_or(Ordering::Equal)
        });
        scored.truncate(k);
        Ok(scored)
    }
}

fn dot(left: &[f32], right: &[f32]) -> f32 {
    left.iter().zip(right).map(|(a, b)| a * b).sum()
}

fn normalize(mut vector: Vec<f32>) -> Vec<f32> {
    let magnitude = vector.iter().map(|value| value * value).sum::<f32>().sqrt();
    if magnitude > 0.0 {
        for value in &mut vector {
            *value /= magnitude;
        }
    }
    vector
}
