//! Client for the build gateway API.
//!
//! [`GatewayClient`] wraps the HTTP surface; [`poll_until_terminal`] drives a
//! bounded, cancellable status loop on top of any [`StatusFetch`].

mod client;
mod error;
mod poller;

pub use client::{BuildStarted, BuildStatusView, GatewayClient};
pub use error::ClientError;
pub use poller::{poll_until_terminal, PollConfig, PollOutcome, StatusFetch};
