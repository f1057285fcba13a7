pub mod like;
pub mod pool;
