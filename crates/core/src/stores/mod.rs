pub mod flat;

pub use flat::FlatIndex;
