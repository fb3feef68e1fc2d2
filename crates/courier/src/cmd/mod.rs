//! Command implementations for the courier CLI

pub mod send;
pub mod serve;
