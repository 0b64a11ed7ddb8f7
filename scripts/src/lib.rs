//! Scripts for deploying, verifying, and recording the identity platform's
//! smart contracts.

#![deny(missing_docs)]
#![deny(clippy::missing_docs_in_private_items)]

pub mod artifacts;
pub mod cli;
pub mod client;
mod commands;
pub mod constants;
pub mod deployments;
pub mod errors;
pub mod orchestrator;
pub mod types;
pub mod utils;
pub mod verify;
