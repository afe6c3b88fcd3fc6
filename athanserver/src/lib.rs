//! # athanserver - HTTP server and logging of the broadcaster
//!
//! Speakers fetch the audio files over HTTP: this server exposes the audio
//! directory at the root, plus a few diagnostic routes.
//!
//! - [`server`] : the Axum [`Server`] (audio, `/info`, JSON routes)
//! - [`logs`] : `tracing` setup, ring buffer and SSE stream
//!
//! ## Usage
//!
//! ```rust,no_run
//! use athanconfig::Config;
//! use athanserver::{Server, logs::init_logging};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = Config::load_config("/etc/athan")?;
//! let log_state = init_logging(&config)?;
//!
//! let mut server = Server::from_config("Athan", &config);
//! server.init_logging_routes(log_state).await;
//! server.start().await?;
//! # Ok(())
//! # }
//! ```

pub mod logs;
pub mod server;

pub use logs::{LogState, SseLayer, init_logging, log_dump, log_sse};
pub use server::{Server, ServerInfo};
