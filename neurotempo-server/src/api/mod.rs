//! HTTP API handlers for neurotempo-server
//!
//! REST endpoints for uploads, recommendations, sessions and settings, plus
//! a WebSocket push channel and an SSE event stream.

pub mod extract;
pub mod health;
pub mod recommend;
pub mod session;
pub mod settings;
pub mod sse;
pub mod upload;
pub mod ws;
pub mod youtube;

pub use health::health_routes;
pub use recommend::recommend_routes;
pub use session::session_routes;
pub use settings::settings_routes;
pub use sse::event_stream;
pub use upload::upload_routes;
pub use ws::ws_handler;
pub use youtube::youtube_routes;
