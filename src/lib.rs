//! Terminal client for a team task board.
//!
//! Tasks are loaded once from a [`source::TaskSource`] and kept in a
//! [`view::TaskView`], which filters, sorts and counts them in memory.

pub mod api;
pub mod app;
pub mod config;
pub mod error;
pub mod filter;
pub mod fixtures;
pub mod logging;
pub mod models;
pub mod parser;
pub mod sort;
pub mod source;
pub mod stats;
pub mod ui;
pub mod view;

#[cfg(test)]
mod test_support;
