//! # imgpipe
//!
//! A URL-driven image transformation pipeline. A request names a source
//! image plus a slash-delimited sequence of operations with comma-separated
//! parameters:
//!
//! ```text
//! image/resize,w_100,h_100/rounded-corners,r_10/format,png
//! ```
//!
//! The pipeline parses the instruction, validates every operation, applies
//! them in order to an in-memory image, and returns encoded bytes plus
//! final metadata.
//!
//! # Architecture: Two-Phase Interpreter
//!
//! A request flows through a small interpreter:
//!
//! ```text
//! StyleProcessor (alias expansion, optional)
//!   → parser      instruction → ordered (name, params) list
//!   → registry    name → Action dispatch
//!   → phase 1     before_process over ALL actions (masking)
//!   → phase 2     process for each unmasked action, in order
//!   → finalize    feature-flag output policy + encode
//! ```
//!
//! The two phases exist because some actions are meaningless or harmful for
//! certain sources (progressive JPEG on an animated GIF). Phase 1 runs over
//! the entire parsed list first, so masking decisions see global source
//! properties and never depend on phase-2 mutations. Masked entries are
//! disabled in place, never removed — indices stay aligned with the
//! original instruction for diagnostics.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`parser`] | Instruction mini-DSL → ordered `(name, params)` pairs |
//! | [`actions`] | The [`actions::Action`] trait and every named operation |
//! | [`registry`] | Name → action dispatch table with a process-wide default |
//! | [`context`] | Per-request state: handle, metadata, mask, feature flags |
//! | [`processor`] | Two-phase orchestration, finalization, encoding |
//! | [`style`] | Named stored instructions (`style/<name>`) |
//! | [`engine`] | Pixel-work seam: [`engine::ImageEngine`] trait + raster impl |
//! | [`store`] | Byte store seam: source fetch, watermark sub-fetch, output |
//! | [`config`] | `pipe.toml` loading for the CLI |
//! | [`error`] | `InvalidArgument` / `NotFound` / upstream taxonomy |
//!
//! # Design Decisions
//!
//! ## Injectable Registries
//!
//! The action registry and style store are plain values wired by reference.
//! [`registry::ActionRegistry::global`] exists for production convenience,
//! but every component accepts an injected instance, so tests register
//! doubles without touching process-wide state.
//!
//! ## Engine Behind a Trait
//!
//! Pixel work goes through the [`engine::ImageEngine`] trait: actions
//! compute specs, the engine executes them, and nothing above the seam
//! knows how pixels are stored.
//! The production [`engine::RasterEngine`] is pure Rust (`image` crate) —
//! no ImageMagick, no system dependencies, a single static binary.
//!
//! ## Permissive No-ops
//!
//! An action that is valid but inapplicable (interlace on a PNG target, an
//! index crop past the last strip) is a silent no-op, not an error. Only
//! malformed parameters and unknown names abort a request.

pub mod actions;
pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod parser;
pub mod processor;
pub mod registry;
pub mod store;
pub mod style;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use context::{Features, ProcessingContext};
pub use engine::{ImageEngine, ImageInfo, PixelFormat, RasterEngine};
pub use error::{PipelineError, Result};
pub use processor::{ImageProcessor, ProcessOutput};
pub use registry::ActionRegistry;
pub use store::{ByteStore, LocalStore, MemStore};
pub use style::{MemStyleStore, StyleProcessor, StyleRecord, StyleStore};
