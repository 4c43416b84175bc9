//! Slack side: Block Kit messages, the Web API client and message rendering.

pub mod blocks;
pub mod client;
pub mod render;

pub use blocks::{Block, SlackMessage, SlackUserId};
pub use client::{ChatClient, SlackClient};
pub use render::render;
