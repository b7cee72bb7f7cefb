//! Edge Proxy is a single configurable reverse proxy for edge deployments.
//!
//! Every inbound request runs through an ordered chain of policy stages:
//! CORS negotiation, an optional static basic-auth gate, then origin
//! resolution and forwarding. The upstream origin is picked from static
//! bindings (one origin, or prod/staging selected by hostname prefix), and
//! request and response bodies are streamed without buffering.
//!
//! # Architecture
//!
//! - [`cli`] -- Command-line argument parsing with clap derive macros.
//! - [`cmd`] -- Subcommand dispatch and execution (run, init, validate).
//! - [`config`] -- Policy and bindings model, layered loading via the
//!   [`ConfigSource`](config::ConfigSource) trait, and validation.
//! - [`error`] -- Process-level and request-level error types using `thiserror`.
//! - [`logging`] -- Structured tracing setup with JSON and pretty-print output.
//! - [`middleware`] -- The CORS and basic-auth policy stages.
//! - [`proxy`] -- Origin resolution, header rewriting, streaming forwarding
//!   and upgraded-connection splicing.
//! - [`server`] -- Axum server setup, shared application state, HTTP client, and
//!   graceful shutdown.
//!
//! # Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `yaml` | YAML config file support _(enabled by default)_ |
//! | `json` | JSON config file support |
//! | `toml` | TOML config file support |
//! | `file-backends` | All file format backends |
//! | `full` | All features |

// Binary crate — public functions are internal, not consumed by external users.
#![allow(clippy::missing_errors_doc)]

pub mod cli;
pub mod cmd;
pub mod config;
pub mod error;
pub mod logging;
pub mod middleware;
pub mod proxy;
pub mod server;
