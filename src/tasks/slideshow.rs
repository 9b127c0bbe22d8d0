use tracing::debug;

use crate::config::{Configuration, Easing, TransitionStyle};
use crate::error::Result;
use crate::processing::pixel_buffer::PixelBuffer;
use crate::tasks::files::ImageSource;
use crate::tasks::prefetch::{PrefetchPipeline, PrefetchSettings, SwapPhase};
use crate::tasks::transition::{Phase, TransitionController};

/// One image to draw this frame, back to front.
#[derive(Debug, Clone, Copy)]
pub struct Layer<'a> {
    /// Display slot the pixels come from (0 or 1).
    pub slot: usize,
    pub generation: u64,
    pub image: &'a PixelBuffer,
    pub background: &'a PixelBuffer,
    pub opacity: f32,
    /// Pan displacement of the foreground from center, in pixels.
    pub offset: [f32; 2],
}

/// Drives a [`PrefetchPipeline`] from a [`TransitionController`] and turns the
/// result into draw layers.
pub struct Slideshow<S: ImageSource + Send + 'static> {
    pipeline: PrefetchPipeline<S>,
    controller: TransitionController,
    style: TransitionStyle,
    easing: Easing,
}

impl<S: ImageSource + Send + 'static> Slideshow<S> {
    pub fn new(source: S, cfg: &Configuration, target: (u32, u32)) -> Result<Self> {
        let pipeline = PrefetchPipeline::new(source, PrefetchSettings::from_config(cfg, target))?;
        Ok(Self::from_parts(
            pipeline,
            TransitionController::from_config(cfg),
            cfg.transition_style,
            cfg.easing,
        ))
    }

    pub fn from_parts(
        pipeline: PrefetchPipeline<S>,
        controller: TransitionController,
        style: TransitionStyle,
        easing: Easing,
    ) -> Self {
        Self {
            pipeline,
            controller,
            style,
            easing,
        }
    }

    /// Advance by `dt` seconds and return this frame's layers.
    pub fn tick(&mut self, dt: f32) -> Result<Vec<Layer<'_>>> {
        if self.controller.advance(dt).phase == Phase::Done {
            debug!(elapsed = self.controller.elapsed(), "slide done; advancing");
            self.pipeline.next()?;
            self.controller.reset();
        }
        self.pipeline.update(dt)?;
        Ok(self.layers())
    }

    /// Layers for the current state without advancing time.
    pub fn layers(&self) -> Vec<Layer<'_>> {
        let main = self.pipeline.main_index();
        let hidden = self.pipeline.hidden();
        let mut out = Vec::with_capacity(2);
        match self.style {
            TransitionStyle::Crossfade => {
                let opacity = match self.pipeline.phase() {
                    SwapPhase::FadingIn { progress } => {
                        self.push(&mut out, hidden, 1.0);
                        self.easing.apply(progress)
                    }
                    SwapPhase::Steady | SwapPhase::SwapPending => 1.0,
                };
                self.push(&mut out, main, opacity);
            }
            TransitionStyle::FadeThrough => {
                let opacity = self.easing.apply(self.controller.current().opacity);
                self.push(&mut out, main, opacity);
            }
        }
        out
    }

    pub fn pipeline(&self) -> &PrefetchPipeline<S> {
        &self.pipeline
    }

    pub fn pipeline_mut(&mut self) -> &mut PrefetchPipeline<S> {
        &mut self.pipeline
    }

    pub fn controller(&self) -> &TransitionController {
        &self.controller
    }

    fn push<'a>(&'a self, out: &mut Vec<Layer<'a>>, slot: usize, opacity: f32) {
        let s = &self.pipeline.slots()[slot];
        if s.image.is_empty() {
            return;
        }
        out.push(Layer {
            slot,
            generation: s.generation,
            image: &s.image,
            background: &s.background,
            opacity,
            offset: s.pan.offset(),
        });
    }
}
