pub mod adjust;
pub mod info;
pub mod query;
