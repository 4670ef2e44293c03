//! BM25 relevance scoring.

use serde::{Deserialize, Serialize};

use crate::error::{NotedexError, Result};

/// BM25 parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bm25Params {
    /// Term frequency saturation.
    pub k1: f32,
    /// Length normalization, between 0 (none) and 1 (full).
    pub b: f32,
}

impl Default for Bm25Params {
    fn default() -> Self {
        Bm25Params { k1: 1.2, b: 0.75 }
    }
}

impl Bm25Params {
    pub fn validate(&self) -> Result<()> {
        if !self.k1.is_finite() || self.k1 < 0.0 {
            return Err(NotedexError::invalid_config(format!(
                "bm25.k1 must be a non-negative number, got {}",
                self.k1
            )));
        }
        if !(0.0..=1.0).contains(&self.b) {
            return Err(NotedexError::invalid_config(format!(
                "bm25.b must be within [0, 1], got {}",
                self.b
            )));
        }
        Ok(())
    }

    /// `ln(1 + (N - df + 0.5) / (df + 0.5))`.
    pub fn idf(&self, doc_freq: u64, doc_count: u64) -> f32 {
        if doc_count == 0 {
            return 0.0;
        }
        let df = doc_freq.min(doc_count) as f32;
        let n = doc_count as f32;
        (1.0 + (n - df + 0.5) / (df + 0.5)).ln()
    }

    pub fn weight(&self, idf: f32, boost: f32, avg_field_length: f32) -> Bm25Weight {
        Bm25Weight {
            idf_boost: idf * boost,
            k1: self.k1,
            b: self.b,
            avg_field_length: if avg_field_length > 0.0 {
                avg_field_length
            } else {
                1.0
            },
        }
    }
}

/// Query-side part of a BM25 score, ready to be applied per document.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bm25Weight {
    idf_boost: f32,
    k1: f32,
    b: f32,
    avg_field_length: f32,
}

impl Bm25Weight {
    pub fn score(&self, freq: f32, field_length: u32) -> f32 {
        if freq <= 0.0 {
            return 0.0;
        }
        let norm = self.k1 * (1.0 - self.b + self.b * field_length as f32 / self.avg_field_length);
        self.idf_boost * freq * (self.k1 + 1.0) / (freq + norm)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idf_prefers_rare_terms() {
        let params = Bm25Params::default();
        assert!(params.idf(1, 100) > params.idf(50, 100));
        assert!(params.idf(100, 100) > 0.0);
        assert_eq!(params.idf(0, 0), 0.0);
    }

    #[test]
    fn test_score_properties() {
        let params = Bm25Params::default();
        let weight = params.weight(params.idf(1, 10), 1.0, 10.0);

        assert!(weight.score(2.0, 10) > weight.score(1.0, 10));
        assert!(weight.score(1.0, 5) > weight.score(1.0, 20));
        assert_eq!(weight.score(0.0, 10), 0.0);

        let boosted = params.weight(params.idf(1, 10), 2.0, 10.0);
        assert!((boosted.score(1.0, 10) - 2.0 * weight.score(1.0, 10)).abs() < 1e-5);
    }

    #[test]
    fn test_validate() {
        assert!(Bm25Params::default().validate().is_ok());
        assert!(Bm25Params { k1: -1.0, b: 0.5 }.validate().is_err());
        assert!(Bm25Params { k1: 1.0, b: 1.5 }.validate().is_err());
    }
}
