//! Per-request processing state.
//!
//! A [`ProcessingContext`] is created once per request from (key,
//! instruction, byte store), mutated by the action sequence, consumed by the
//! final encode, then discarded. It owns the image handle (single-writer:
//! only the currently executing action touches it) and keeps the raw source
//! bytes around so the processor can reload a single frame when an action
//! switches animation decoding off.

use crate::engine::{ImageEngine, ImageHandle, ImageInfo};
use crate::parser::ParsedAction;
use crate::store::ByteStore;

/// Per-request feature flags influencing finalization policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Features {
    /// Encode to WebP when no explicit `format` action ran.
    pub auto_webp: bool,
    /// Decode every frame of an animated source. Cleared in the pre-pass
    /// when the target format cannot carry animation.
    pub read_all_frames: bool,
}

impl Default for Features {
    fn default() -> Self {
        Self {
            auto_webp: false,
            read_all_frames: true,
        }
    }
}

/// Disabled-action bookkeeping for the two-phase protocol.
///
/// Indices are disabled, never removed, so they stay aligned with the parsed
/// instruction for error reporting, and disabling one entry never shifts the
/// execution order of the rest.
#[derive(Debug, Clone, Default)]
pub struct ActionMask {
    disabled: Vec<bool>,
}

impl ActionMask {
    pub fn new(len: usize) -> Self {
        Self {
            disabled: vec![false; len],
        }
    }

    pub fn disable(&mut self, index: usize) {
        if index < self.disabled.len() {
            self.disabled[index] = true;
        }
    }

    pub fn is_disabled(&self, index: usize) -> bool {
        self.disabled.get(index).copied().unwrap_or(false)
    }
}

/// Mutable state threaded through one request.
pub struct ProcessingContext<'a> {
    /// Source object key, echoed in diagnostics.
    pub key: String,
    /// Parsed instruction; order is execution order.
    pub actions: Vec<ParsedAction>,
    /// Raw source bytes, retained for single-frame reload.
    pub source: Vec<u8>,
    pub handle: ImageHandle,
    /// Metadata snapshot, refreshed after every executed action.
    pub info: ImageInfo,
    pub mask: ActionMask,
    pub features: Features,
    /// Store for sub-fetches (watermark overlays) and derived-output writes.
    pub store: &'a dyn ByteStore,
    pub engine: &'a dyn ImageEngine,
}

impl ProcessingContext<'_> {
    pub fn refresh_info(&mut self) {
        self.info = self.engine.metadata(&self.handle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_disables_without_shifting() {
        let mut mask = ActionMask::new(3);
        mask.disable(1);

        assert!(!mask.is_disabled(0));
        assert!(mask.is_disabled(1));
        assert!(!mask.is_disabled(2));
    }

    #[test]
    fn mask_out_of_range_is_harmless() {
        let mut mask = ActionMask::new(1);
        mask.disable(5);
        assert!(!mask.is_disabled(5));
    }

    #[test]
    fn features_default_reads_all_frames() {
        let features = Features::default();
        assert!(features.read_all_frames);
        assert!(!features.auto_webp);
    }
}
