//! # huddle-settings
//!
//! Configuration for the huddle relay, loaded from three layers (in
//! priority order):
//! 1. **Compiled defaults**: [`HuddleSettings::default()`]
//! 2. **User file**: `~/.huddle/settings.json` (deep-merged over defaults)
//! 3. **Environment variables**: `HUDDLE_*` overrides (highest priority)
//!
//! Command-line flags in the binary are applied on top of the result.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{deep_merge, load_settings_from_path, settings_path, validate};
pub use types::{HuddleSettings, LogFormat, LoggingSettings, ServerSettings};
