pub mod generate;
pub mod persist;
pub mod upload;
