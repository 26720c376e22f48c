//! Request orchestration.
//!
//! One request moves through a fixed sequence of states:
//!
//! ```text
//! Created → MetadataLoaded → Masked → Executing(i) → Finalized
//! ```
//!
//! - [`ImageProcessor::new_context`] fetches the source bytes, decodes them,
//!   and snapshots metadata (`MetadataLoaded`).
//! - [`ImageProcessor::process`] resolves every parsed action name up front
//!   (an unknown name aborts before anything runs), then executes the
//!   two-phase protocol: phase 1 runs `before_process` over the *entire*
//!   list in order so later actions can be disabled from global source
//!   properties (`Masked`); phase 2 executes the unmasked actions in
//!   original order, fail-fast (`Executing`). Masking decisions never depend
//!   on phase-2 mutations.
//! - Finalization applies feature-flag output policy — auto-webp when no
//!   explicit format ran — and encodes (`Finalized`).
//!
//! Between the phases sits one special case: when the pre-pass cleared
//! `read_all_frames` (an animated source headed for a still format), the
//! source is reloaded first-frame-only from the bytes retained in the
//! context.

use crate::context::{ActionMask, Features, ProcessingContext};
use crate::engine::{ImageEngine, ImageInfo, LoadOptions, PixelFormat, RasterEngine};
use crate::error::Result;
use crate::parser::parse_instruction;
use crate::registry::ActionRegistry;
use crate::store::ByteStore;
use crate::{error::PipelineError, parser::ParsedAction};
use log::{debug, info};
use std::sync::{Arc, LazyLock};

/// Encoded output bytes plus final metadata.
#[derive(Debug)]
pub struct ProcessOutput {
    pub data: Vec<u8>,
    pub info: ImageInfo,
}

pub struct ImageProcessor<'e> {
    registry: &'e ActionRegistry,
    engine: &'e dyn ImageEngine,
}

static RASTER: RasterEngine = RasterEngine;
static GLOBAL: LazyLock<ImageProcessor<'static>> =
    LazyLock::new(|| ImageProcessor::new(ActionRegistry::global(), &RASTER));

impl<'e> ImageProcessor<'e> {
    /// Leading instruction segment that names this processor. Skipped during
    /// execution so `image/resize,w_100` and `resize,w_100` behave alike.
    pub const NAME: &'static str = "image";

    pub fn new(registry: &'e ActionRegistry, engine: &'e dyn ImageEngine) -> Self {
        Self { registry, engine }
    }

    /// Production wiring: global registry plus the raster engine.
    pub fn global() -> &'static ImageProcessor<'static> {
        &GLOBAL
    }

    /// Fetch, decode, and snapshot metadata for one request.
    pub fn new_context<'a>(
        &self,
        key: &str,
        instruction: &str,
        store: &'a dyn ByteStore,
    ) -> Result<ProcessingContext<'a>>
    where
        'e: 'a,
    {
        let object = store.get(key)?;
        let features = Features::default();
        let handle = self
            .engine
            .load(
                &object.bytes,
                &LoadOptions {
                    all_frames: features.read_all_frames,
                },
            )
            .map_err(|e| PipelineError::engine("load", e))?;
        let info = self.engine.metadata(&handle);
        debug!(
            "loaded {key}: {}x{} {} ({} page(s))",
            info.width, info.height, info.format, info.pages
        );
        let actions = parse_instruction(instruction);
        Ok(ProcessingContext {
            key: key.to_string(),
            mask: ActionMask::new(actions.len()),
            actions,
            source: object.bytes,
            handle,
            info,
            features,
            store,
            engine: self.engine,
        })
    }

    /// Run the full two-phase pipeline and encode.
    pub fn process(&self, ctx: &mut ProcessingContext) -> Result<ProcessOutput> {
        let parsed: Vec<ParsedAction> = ctx.actions.clone();
        let resolved = self.resolve(&parsed)?;
        ctx.mask = ActionMask::new(parsed.len());

        debug!("phase 1: masking pre-pass over {} segment(s)", parsed.len());
        for (index, (entry, action)) in parsed.iter().zip(&resolved).enumerate() {
            if let Some(action) = action {
                action.before_process(ctx, &entry.params, index);
            }
        }

        if !ctx.features.read_all_frames && ctx.info.pages > 1 {
            debug!("still target on an animated source; reloading first frame");
            let settings = *ctx.handle.encode_settings();
            let mut handle = self
                .engine
                .load(&ctx.source, &LoadOptions { all_frames: false })
                .map_err(|e| PipelineError::engine("load", e))?;
            *handle.encode_settings_mut() = settings;
            ctx.handle = handle;
            ctx.refresh_info();
        }

        debug!("phase 2: executing unmasked actions");
        for (index, (entry, action)) in parsed.iter().zip(&resolved).enumerate() {
            let Some(action) = action else { continue };
            if ctx.mask.is_disabled(index) {
                debug!("skipping masked action {} at index {index}", entry.name);
                continue;
            }
            info!("running {}", entry.name);
            action.process(ctx, &entry.params)?;
            ctx.refresh_info();
        }

        self.finalize(ctx)
    }

    /// Resolve every action name before anything runs, so an unknown name
    /// fails without a single engine mutation.
    fn resolve(
        &self,
        parsed: &[ParsedAction],
    ) -> Result<Vec<Option<Arc<dyn crate::actions::Action>>>> {
        parsed
            .iter()
            .map(|entry| {
                if entry.name == Self::NAME {
                    Ok(None)
                } else {
                    self.registry.lookup(&entry.name).map(Some)
                }
            })
            .collect()
    }

    fn finalize(&self, ctx: &mut ProcessingContext) -> Result<ProcessOutput> {
        if ctx.features.auto_webp && !ctx.handle.encode_settings().explicit_format {
            debug!("no explicit format; auto-selecting webp");
            ctx.handle.encode_settings_mut().format = Some(PixelFormat::Webp);
        }
        let encoded = self
            .engine
            .encode(&ctx.handle)
            .map_err(|e| PipelineError::engine("encode", e))?;
        debug!(
            "encoded {} byte(s) as {}",
            encoded.data.len(),
            encoded.info.format
        );
        Ok(ProcessOutput {
            data: encoded.data,
            info: encoded.info,
        })
    }
}
