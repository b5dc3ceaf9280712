//! Botpress bridge core library — config, conversation state, Botpress clients,
//! console relay, and the inbound gateway, used by the CLI.

pub mod botpress;
pub mod config;
pub mod conversation;
pub mod gateway;
pub mod relay;
