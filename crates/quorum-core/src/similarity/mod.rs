//! Nearest-neighbour lookup over past (question, chosen key, quality) records.

pub mod index;
pub mod metric;

pub use index::{ChosenKey, Neighbor, SimilarityIndex, SimilarityRecord};
pub use metric::{SignatureMatch, SimilarityMetric, TokenJaccard};
