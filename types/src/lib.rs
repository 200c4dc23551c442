//! Shared configuration types for Tandem.
//!
//! These types are plain serde structs so that both the DSL parser in
//! `tandem-core` and external tooling can read and write them. Every field has
//! a default, so a partial TOML file (or none at all) yields usable settings.

pub mod settings;

pub use settings::{DebugSettings, GeneralSettings, ResetPolicy, Settings, DEFAULT_MAX_TICK_SECS};
