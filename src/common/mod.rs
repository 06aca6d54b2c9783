pub mod config;
pub mod db;
pub mod di;
pub mod errors;
pub(crate) mod fsutil;
