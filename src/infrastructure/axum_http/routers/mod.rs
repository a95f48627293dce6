pub mod operations;
pub mod proxy;
