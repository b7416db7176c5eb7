//! HTTP API for scoring, tracking and live feedback streaming
//!
//! Provides:
//! - `POST /evaluate/code-snapshot` and `POST /track/code-snapshot`
//! - Per-session summaries (`GET /track/summary`, `DELETE /track/session`)
//! - Server-Sent Events (SSE) for live feedback (`GET /events`)
//! - Health check (`GET /health`)

pub mod events;
pub mod server;
pub mod state;

pub use events::{Event, EventBroadcaster, EventType, FeedbackKind};
pub use server::{ApiServer, ApiServerConfig};
pub use state::{RegistryStats, SessionRegistry};
