pub mod config;
pub mod engine;
pub mod error;
pub mod exchange;
pub mod models;
pub mod scanner;
#[cfg(test)]
pub mod test_helpers;
pub mod trading;
