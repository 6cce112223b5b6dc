//! Transport-facing abstractions (Telegram today, behind a port).

pub mod port;
pub mod types;
