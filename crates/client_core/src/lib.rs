//! Session handling, image intake/export and the image transformation client.

pub mod config;
pub mod export;
pub mod generation;
pub mod intake;
pub mod session;
pub mod session_store;
pub mod studio;

pub use config::{load_settings, Settings};
pub use generation::{GeminiHttpTransport, GenerationTransport, TransformationClient, TransportFault};
pub use session::{Event, Session};
pub use session_store::SessionStore;
pub use studio::{PendingGeneration, Studio};
