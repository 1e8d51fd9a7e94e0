//! Inference microservices and database tools for the eva companion app.
//!
//! Four HTTP services, each wrapping one pretrained model behind a single
//! POST endpoint, plus the `eva-db` operator tool for inspecting and patching
//! URL columns in the application database.
//!
//! ## Architecture
//!
//! Every service follows the same shape:
//!
//! ```text
//! JSON request → validate → worker queue → model backend → encoded response
//!                                ↑
//!                  resident model, loaded once per process
//!                  (or once per language direction, for translation)
//! ```
//!
//! The model mathematics live entirely in `candle-transformers`; this crate
//! owns the shim around them.
//!
//! ## Modules
//!
//! - [`worker`] — resident-model worker: one blocking thread per backend,
//!   jobs serialized through an mpsc queue
//! - [`cache`] — memoized worker construction keyed by language direction
//! - [`http`] — binary/JSON response types, error mapping, server loop
//! - [`imggen`], [`textgen`], [`translate`], [`tts`] — the four services
//! - [`audio`] — WAV encoding, peak normalization, resampling
//! - [`db`] — database maintenance procedures

pub mod audio;
pub mod cache;
pub mod config;
pub mod db;
pub mod device;
pub mod http;
pub mod hub;
pub mod imggen;
pub mod textgen;
pub mod translate;
pub mod tts;
pub mod worker;

mod error;

pub use error::{Error, Result};
