pub mod config;
pub mod error;
pub mod facade;
pub mod host;
pub mod media;
mod session;
pub mod sim;
pub mod video;

// Re-exports
pub use config::PlayerConfig;
pub use error::PlayerError;
pub use facade::{PlayerCallbacks, PlayerProps, PlayerView, VideoPlayer};
pub use host::{KeyPress, PlayerHost};
pub use media::{ScriptLoader, Surface};
pub use video::{PlayerState, StateReport, Video, VideoSource};
