//! Styles: named, stored instruction strings.
//!
//! A request of the form `style/<name>` looks the name up in a
//! [`StyleStore`] and behaves exactly as if the caller had supplied the
//! stored instruction directly. Expansion is single-level: a stored style is
//! a full `image/...` instruction, never a reference to another style — the
//! substituted instruction is handed to the image processor, which has no
//! `style` action registered, so a chained alias fails with `NotFound`.
//!
//! Style names are restricted to ASCII alphanumerics plus `.`, `_`, `-`;
//! anything else is rejected before the lookup.

use crate::context::ProcessingContext;
use crate::error::{PipelineError, Result};
use crate::parser::parse_instruction;
use crate::processor::{ImageProcessor, ProcessOutput};
use crate::store::ByteStore;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;

/// A stored alias. `style` is itself a full instruction string and is
/// parsed exactly as a direct request would be.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyleRecord {
    pub id: String,
    pub style: String,
}

/// Key-value lookup from style name to stored record.
pub trait StyleStore: Send + Sync {
    fn get(&self, name: &str) -> Result<StyleRecord>;
}

/// In-memory style store, for tests and embedders. Insertion is expected at
/// startup or test setup; lookups are concurrent-safe.
#[derive(Default)]
pub struct MemStyleStore {
    records: RwLock<HashMap<String, StyleRecord>>,
}

impl MemStyleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from `(name, instruction)` pairs.
    pub fn from_styles<I, K, V>(styles: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let store = Self::new();
        for (name, style) in styles {
            let name = name.into();
            store.insert(StyleRecord {
                id: name,
                style: style.into(),
            });
        }
        store
    }

    /// Insert or overwrite by `record.id`.
    pub fn insert(&self, record: StyleRecord) {
        self.records
            .write()
            .unwrap()
            .insert(record.id.clone(), record);
    }
}

impl StyleStore for MemStyleStore {
    fn get(&self, name: &str) -> Result<StyleRecord> {
        self.records
            .read()
            .unwrap()
            .get(name)
            .cloned()
            .ok_or_else(|| PipelineError::not_found("Style not found"))
    }
}

/// Check a style name against the allowed character set.
pub fn is_valid_style_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
}

/// Resolves `style/<name>` instructions and delegates to the image
/// processor.
pub struct StyleProcessor<'a> {
    styles: &'a dyn StyleStore,
    processor: &'a ImageProcessor<'a>,
}

impl<'a> StyleProcessor<'a> {
    /// Leading instruction segment that names this processor.
    pub const NAME: &'static str = "style";

    pub fn new(styles: &'a dyn StyleStore, processor: &'a ImageProcessor<'a>) -> Self {
        Self { styles, processor }
    }

    /// Build a context exactly as the image processor would.
    pub fn new_context<'s>(
        &self,
        key: &str,
        instruction: &str,
        store: &'s dyn ByteStore,
    ) -> Result<ProcessingContext<'s>>
    where
        'a: 's,
    {
        self.processor.new_context(key, instruction, store)
    }

    /// Substitute the stored instruction and run the image pipeline.
    pub fn process(&self, ctx: &mut ProcessingContext) -> Result<ProcessOutput> {
        let name = match ctx.actions.split_first() {
            Some((first, rest)) if first.name == Self::NAME => {
                // The name is the whole next segment; rejoining the comma
                // split lets the character check catch stray commas too.
                rest.first().map(|entry| entry.params.join(","))
            }
            _ => None,
        };
        let name = name.ok_or_else(|| PipelineError::invalid("Invalid style name"))?;
        if !is_valid_style_name(&name) {
            return Err(PipelineError::invalid("Invalid style name"));
        }
        let record = self.styles.get(&name)?;
        debug!("style {name} expands to {}", record.style);
        ctx.actions = parse_instruction(&record.style);
        self.processor.process(ctx)
    }
}
