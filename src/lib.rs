//! catex: hierarchical catalog exporter
//!
//! Layers, innermost first: `domain` (pure model and algorithms),
//! `application` (services over I/O traits), `infrastructure` (HTTP client,
//! filesystem, wiring) and `cli`.

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod util;
