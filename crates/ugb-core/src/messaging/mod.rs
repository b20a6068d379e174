//! Outbound chat abstractions (Telegram is the only adapter today).

pub mod port;
pub mod types;
