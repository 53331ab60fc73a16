//! deej-web - embedded configuration server for deej
//!
//! Serves a small web UI and REST API for editing which applications each
//! hardware slider controls, and lists the audio sessions the host sees.

pub mod api;
pub mod config;
pub mod sessions;

pub use api::{WebServer, DEFAULT_SERVER_PORT};
pub use config::{ConfigAccessor, ConfigStore, SliderMapping};
pub use sessions::{SessionMap, SessionRegistry};
