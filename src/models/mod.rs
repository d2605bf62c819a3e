pub mod dataset;
pub mod pool;
