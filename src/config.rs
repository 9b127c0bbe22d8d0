use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, ensure};
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BlurAlgorithm {
    /// Three sliding-window box passes approximating a Gaussian; O(1) per pixel.
    Gaussian,
    /// Direct neighbourhood average; O(r²) per pixel.
    Box,
}

impl Default for BlurAlgorithm {
    fn default() -> Self {
        Self::Gaussian
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FitMode {
    Contain,
    Cover,
}

impl Default for FitMode {
    fn default() -> Self {
        Self::Contain
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransitionStyle {
    /// Incoming slide fades in over the outgoing one.
    Crossfade,
    /// Each slide fades in from black and back out before the next.
    FadeThrough,
}

impl Default for TransitionStyle {
    fn default() -> Self {
        Self::Crossfade
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Easing {
    Linear,
    /// Quadratic ease-out: fast start, gentle landing.
    Parabolic,
}

impl Default for Easing {
    fn default() -> Self {
        Self::Linear
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct BlurOptions {
    pub algorithm: BlurAlgorithm,
    /// Gaussian sigma (or box half-width) in background pixels.
    pub radius: f32,
    /// Background size relative to the fitted foreground; smaller is cheaper to blur.
    pub background_scale: f32,
}

impl BlurOptions {
    const fn default_radius() -> f32 {
        8.0
    }

    const fn default_background_scale() -> f32 {
        0.5
    }

    fn validate(&self) -> Result<()> {
        ensure!(
            self.radius.is_finite() && self.radius >= 1.0,
            "blur.radius must be a finite number of at least 1 (got {})",
            self.radius
        );
        ensure!(
            self.background_scale > 0.0 && self.background_scale <= 1.0,
            "blur.background-scale must be in (0, 1] (got {})",
            self.background_scale
        );
        Ok(())
    }
}

impl Default for BlurOptions {
    fn default() -> Self {
        Self {
            algorithm: BlurAlgorithm::default(),
            radius: Self::default_radius(),
            background_scale: Self::default_background_scale(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct PanOptions {
    /// Distance from the screen center where the foreground starts drifting.
    pub radius_px: f32,
    pub speed_px_per_sec: f32,
}

impl Default for PanOptions {
    fn default() -> Self {
        Self {
            radius_px: 200.0,
            speed_px_per_sec: 50.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Configuration {
    /// Root directory to scan recursively for images.
    pub photo_library_path: PathBuf,
    /// Accepted file extensions, matched case-insensitively without the dot.
    pub extensions: Vec<String>,
    /// Total time a slide stays on screen, transitions included.
    #[serde(with = "humantime_serde")]
    pub slide_duration: Duration,
    /// Length of each fade window.
    #[serde(with = "humantime_serde")]
    pub transition_duration: Duration,
    /// Display size images are fitted to; the window size is used when unset.
    pub target_resolution: Option<Resolution>,
    pub fit: FitMode,
    /// Upper bound on either side of a prepared image.
    pub max_dimension: u32,
    pub blur: BlurOptions,
    pub transition_style: TransitionStyle,
    pub easing: Easing,
    pub pan: PanOptions,
    /// Optional deterministic seed for catalog picks and pan motion.
    pub seed: Option<u64>,
    pub fullscreen: bool,
}

impl Configuration {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let s = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Ok(serde_yaml::from_str(&s)?)
    }

    /// Validate runtime invariants that cannot be expressed via serde defaults alone.
    pub fn validated(mut self) -> Result<Self> {
        self.extensions = self
            .extensions
            .iter()
            .map(|e| e.trim().trim_start_matches('.').to_ascii_lowercase())
            .filter(|e| !e.is_empty())
            .collect();
        ensure!(
            !self.extensions.is_empty(),
            "extensions must list at least one file type"
        );
        ensure!(
            !self.slide_duration.is_zero(),
            "slide-duration must be greater than zero"
        );
        ensure!(
            !self.transition_duration.is_zero(),
            "transition-duration must be greater than zero"
        );
        ensure!(
            self.transition_duration * 2 < self.slide_duration,
            "transition-duration ({:?}) must be less than half of slide-duration ({:?})",
            self.transition_duration,
            self.slide_duration
        );
        if let Some(res) = self.target_resolution {
            ensure!(
                res.width > 0 && res.height > 0,
                "target-resolution must be non-zero"
            );
        }
        ensure!(
            self.max_dimension > 0,
            "max-dimension must be greater than zero"
        );
        ensure!(
            self.pan.radius_px >= 0.0 && self.pan.speed_px_per_sec >= 0.0,
            "pan radius and speed must not be negative"
        );
        self.blur.validate()?;
        Ok(self)
    }

    pub fn slide_secs(&self) -> f32 {
        self.slide_duration.as_secs_f32()
    }

    pub fn transition_secs(&self) -> f32 {
        self.transition_duration.as_secs_f32()
    }
}

/// HEIC is only listed when this build can decode it.
fn default_extensions() -> Vec<String> {
    let mut exts = vec!["jpg", "jpeg", "png"];
    if cfg!(feature = "heic") {
        exts.push("heic");
    }
    exts.into_iter().map(String::from).collect()
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            photo_library_path: PathBuf::from("./data"),
            extensions: default_extensions(),
            slide_duration: Duration::from_secs(8),
            transition_duration: Duration::from_secs(1),
            target_resolution: None,
            fit: FitMode::default(),
            max_dimension: 8192,
            blur: BlurOptions::default(),
            transition_style: TransitionStyle::default(),
            easing: Easing::default(),
            pan: PanOptions::default(),
            seed: None,
            fullscreen: true,
        }
    }
}
