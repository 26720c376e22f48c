//! Shared helpers for unit tests.
//!
//! `test_ctx` builds a [`ProcessingContext`] over a caller-supplied engine
//! and store (usually the recording mocks), mirroring what
//! `ImageProcessor::new_context` produces without going through a real
//! decode.

use crate::context::{ActionMask, Features, ProcessingContext};
use crate::engine::{ImageEngine, LoadOptions};
use crate::parser::parse_instruction;
use crate::store::ByteStore;

/// Split one instruction segment into the `params` vector an action sees
/// (`params[0]` is the action name).
pub(crate) fn params(segment: &str) -> Vec<String> {
    segment.split(',').map(str::to_string).collect()
}

/// Build a context for action/processor tests.
pub(crate) fn test_ctx<'a>(
    engine: &'a dyn ImageEngine,
    store: &'a dyn ByteStore,
    instruction: &str,
) -> ProcessingContext<'a> {
    let actions = parse_instruction(instruction);
    let handle = engine
        .load(&[], &LoadOptions::default())
        .expect("test engine load");
    let info = engine.metadata(&handle);
    ProcessingContext {
        key: "test-object".into(),
        mask: ActionMask::new(actions.len()),
        actions,
        source: Vec::new(),
        handle,
        info,
        features: Features::default(),
        store,
        engine,
    }
}
