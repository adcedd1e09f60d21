//! Command-line front end for `bonsai-mailgun`.

pub mod cli;
pub mod config;
pub mod controller;

pub use controller::Bonsai;
