pub mod analytics;
pub mod assembler;
pub mod catalog;
pub mod currency;
pub mod generation;
pub mod transactions;
