pub mod stats;

pub use stats::stats;
