pub mod normalize;
pub mod store;

pub use normalize::{select as select_normalizer, TextNormalizer};
