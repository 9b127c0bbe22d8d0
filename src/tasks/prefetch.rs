//! Double-buffered display slots fed by a single background prefetch worker.
//!
//! Two slots are on screen at any time: `main` (the one fading in or fully
//! shown) and the hidden one underneath it. A third, lookahead image is
//! prepared off-thread. When the fade into `main` completes, the lookahead is
//! moved into the hidden slot and the worker is relaunched for the next one.
//!
//! The image source is moved into the worker thread and handed back through
//! its `JoinHandle`, so the worker and the render thread never share state.

use std::thread::{self, JoinHandle};

use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, info, warn};

use crate::config::{BlurOptions, Configuration, FitMode, PanOptions};
use crate::error::{Error, Result};
use crate::processing::blur::blur_in_place;
use crate::processing::layout::fit_size;
use crate::processing::pixel_buffer::PixelBuffer;
use crate::processing::resize::resize_exact;
use crate::tasks::files::ImageSource;
use crate::tasks::transition::PanMotion;

/// How many picks priming may spend per display slot before leaving it empty.
const PRIME_ATTEMPTS: usize = 3;

/// Everything the worker needs to turn a decoded image into display buffers.
#[derive(Debug, Clone)]
pub struct PrefetchSettings {
    /// Display size images are fitted to.
    pub target: (u32, u32),
    pub fit: FitMode,
    pub max_dimension: u32,
    pub blur: BlurOptions,
    pub pan: PanOptions,
    /// Seconds the incoming slot takes to fade in after [`PrefetchPipeline::next`].
    pub fade_secs: f32,
    pub seed: Option<u64>,
}

impl PrefetchSettings {
    pub fn from_config(cfg: &Configuration, target: (u32, u32)) -> Self {
        Self {
            target,
            fit: cfg.fit,
            max_dimension: cfg.max_dimension,
            blur: cfg.blur.clone(),
            pan: cfg.pan.clone(),
            fade_secs: cfg.transition_secs(),
            seed: cfg.seed,
        }
    }
}

/// A fitted foreground plus its blurred, reduced-size background.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Prepared {
    pub image: PixelBuffer,
    pub background: PixelBuffer,
}

impl Prepared {
    pub fn is_empty(&self) -> bool {
        self.image.is_empty()
    }
}

/// Resize `image` to the display and derive its blurred background.
///
/// An empty input (or a resize failure) yields an empty [`Prepared`].
pub fn prepare(image: PixelBuffer, settings: &PrefetchSettings) -> Prepared {
    if image.is_empty() {
        return Prepared::default();
    }
    let (fw, fh) = fit_size(
        settings.fit,
        settings.target,
        image.dimensions(),
        settings.max_dimension,
    );
    let fitted = match resize_exact(&image, fw, fh) {
        Ok(buf) => buf,
        Err(err) => {
            warn!(error = %err, "foreground resize failed; dropping image");
            return Prepared::default();
        }
    };
    drop(image);

    let scale = settings.blur.background_scale;
    let bw = ((fw as f32 * scale).round() as u32).max(1);
    let bh = ((fh as f32 * scale).round() as u32).max(1);
    let mut background = match resize_exact(&fitted, bw, bh) {
        Ok(buf) => buf,
        Err(err) => {
            warn!(error = %err, "background resize failed; dropping image");
            return Prepared::default();
        }
    };
    blur_in_place(&mut background, settings.blur.radius, settings.blur.algorithm);
    debug!(fw, fh, bw, bh, "prepared");
    Prepared {
        image: fitted,
        background,
    }
}

/// One of the two on-screen image slots.
#[derive(Debug, Clone, Default)]
pub struct DisplaySlot {
    pub image: PixelBuffer,
    pub background: PixelBuffer,
    /// Bumped every time new pixels are installed; lets the presenter spot stale textures.
    pub generation: u64,
    pub pan: PanMotion,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SwapPhase {
    /// `main` fully shown; nothing to do until [`PrefetchPipeline::next`].
    Steady,
    FadingIn { progress: f32 },
    /// Fade finished; waiting for the lookahead to be installed in the hidden slot.
    SwapPending,
}

pub struct PrefetchPipeline<S: ImageSource + Send + 'static> {
    slots: [DisplaySlot; 2],
    main: usize,
    phase: SwapPhase,
    settings: PrefetchSettings,
    /// Home of the source while no worker holds it.
    source: Option<S>,
    worker: Option<JoinHandle<(S, Prepared)>>,
    lookahead: Option<Prepared>,
    generation: u64,
    rng: StdRng,
}

impl<S: ImageSource + Send + 'static> PrefetchPipeline<S> {
    /// Fill both display slots synchronously, then start prefetching the lookahead.
    pub fn new(mut source: S, settings: PrefetchSettings) -> Result<Self> {
        let rng = match settings.seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(1)),
            None => StdRng::from_os_rng(),
        };
        let mut pipeline = Self {
            slots: [DisplaySlot::default(), DisplaySlot::default()],
            main: 0,
            phase: SwapPhase::Steady,
            settings,
            source: None,
            worker: None,
            lookahead: None,
            generation: 0,
            rng,
        };
        for slot in 0..2 {
            let prepared = (0..PRIME_ATTEMPTS)
                .map(|_| prepare(source.next_image(), &pipeline.settings))
                .find(|p| !p.is_empty());
            match prepared {
                Some(p) => pipeline.install(slot, p),
                None => warn!(slot, "no image available while priming; slot left empty"),
            }
        }
        pipeline.source = Some(source);
        pipeline.launch()?;
        info!(
            target_w = pipeline.settings.target.0,
            target_h = pipeline.settings.target.1,
            "prefetch pipeline primed"
        );
        Ok(pipeline)
    }

    /// Advance the fade timer and pan motion by `dt` seconds.
    ///
    /// Once the fade completes, the finished lookahead replaces the hidden slot
    /// and a fresh worker is launched. If the worker is still busy the swap
    /// waits for a later call; the render thread never blocks on it here.
    pub fn update(&mut self, dt: f32) -> Result<()> {
        let dt = dt.max(0.0);
        self.poll()?;

        self.slots[self.main].pan.advance(dt);
        if let SwapPhase::FadingIn { progress } = self.phase {
            self.slots[self.hidden()].pan.advance(dt);
            let progress = progress + dt / self.settings.fade_secs.max(f32::EPSILON);
            self.phase = if progress >= 1.0 {
                SwapPhase::SwapPending
            } else {
                SwapPhase::FadingIn { progress }
            };
        }
        if self.phase == SwapPhase::SwapPending {
            self.complete_swap()?;
        }
        Ok(())
    }

    /// Start the transition to the hidden slot: the timer restarts and roles flip.
    pub fn next(&mut self) -> Result<()> {
        self.poll()?;
        if self.phase == SwapPhase::SwapPending {
            // Lookahead is late; the hidden slot still holds the previous image.
            self.complete_swap()?;
            if self.phase == SwapPhase::SwapPending {
                debug!("lookahead not ready at next(); reshowing previous image");
            }
        }
        self.main = self.hidden();
        self.phase = SwapPhase::FadingIn { progress: 0.0 };
        Ok(())
    }

    pub fn slots(&self) -> &[DisplaySlot; 2] {
        &self.slots
    }

    pub fn main_index(&self) -> usize {
        self.main
    }

    pub fn hidden(&self) -> usize {
        1 - self.main
    }

    pub fn phase(&self) -> SwapPhase {
        self.phase
    }

    pub fn settings(&self) -> &PrefetchSettings {
        &self.settings
    }

    /// Non-blocking: has the lookahead finished preparing?
    pub fn is_lookahead_ready(&mut self) -> Result<bool> {
        self.poll()?;
        Ok(self.lookahead.is_some())
    }

    /// Whether a worker thread is still outstanding (running or not yet joined).
    pub fn worker_outstanding(&self) -> bool {
        self.worker.is_some()
    }

    /// Change the display size for images prepared from now on.
    pub fn set_target(&mut self, target: (u32, u32)) {
        self.settings.target = target;
    }

    /// Join the worker if it has already finished; never waits.
    fn poll(&mut self) -> Result<()> {
        if self.worker.as_ref().is_some_and(JoinHandle::is_finished) {
            self.join()?;
        }
        Ok(())
    }

    fn join(&mut self) -> Result<()> {
        let Some(handle) = self.worker.take() else {
            return Ok(());
        };
        let (source, prepared) = handle.join().map_err(|_| Error::WorkerPanicked)?;
        self.source = Some(source);
        self.lookahead = Some(prepared);
        Ok(())
    }

    fn complete_swap(&mut self) -> Result<()> {
        let Some(prepared) = self.lookahead.take() else {
            return Ok(());
        };
        if prepared.is_empty() {
            warn!("lookahead came back empty; keeping hidden slot and retrying");
        } else {
            self.install(self.hidden(), prepared);
        }
        self.phase = SwapPhase::Steady;
        self.launch()
    }

    fn install(&mut self, slot: usize, prepared: Prepared) {
        self.generation += 1;
        let pan = &self.settings.pan;
        self.slots[slot] = DisplaySlot {
            image: prepared.image,
            background: prepared.background,
            generation: self.generation,
            pan: PanMotion::random(&mut self.rng, pan.radius_px, pan.speed_px_per_sec),
        };
        debug!(slot, generation = self.generation, "slot replaced");
    }

    fn launch(&mut self) -> Result<()> {
        if self.worker.is_some() {
            return Err(Error::WorkerBusy);
        }
        let Some(mut source) = self.source.take() else {
            return Err(Error::WorkerPanicked);
        };
        let settings = self.settings.clone();
        let handle = thread::Builder::new()
            .name("prefetch".into())
            .spawn(move || {
                let mut image = source.next_image();
                if image.is_empty() && source.refresh() {
                    debug!("empty pick; source refreshed");
                    image = source.next_image();
                }
                let prepared = prepare(image, &settings);
                (source, prepared)
            })
            .map_err(Error::Spawn)?;
        self.worker = Some(handle);
        Ok(())
    }
}

impl<S: ImageSource + Send + 'static> Drop for PrefetchPipeline<S> {
    fn drop(&mut self) {
        if let Some(handle) = self.worker.take() {
            if handle.join().is_err() {
                warn!("prefetch worker panicked during shutdown");
            }
        }
    }
}
