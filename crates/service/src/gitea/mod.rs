//! Gitea side: webhook payloads and the user API used to recover real emails.

pub mod client;
pub mod webhook;

pub use client::{deanonymise, GiteaClient, UserDirectory};
pub use webhook::{Action, Webhook};
