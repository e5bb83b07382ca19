//! API types shared between the Arena engine and the debate service

pub mod types;

pub use types::*;
