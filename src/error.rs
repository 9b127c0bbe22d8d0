use thiserror::Error;

/// Library error type for slideshow operations.
///
/// Ordinary decode failures are not represented here: the loader reports them
/// through the empty [`PixelBuffer`](crate::processing::pixel_buffer::PixelBuffer)
/// sentinel instead. Configuration loading reports through `anyhow`.
#[derive(Debug, Error)]
pub enum Error {
    /// The pixel allocation could not be satisfied.
    #[error("failed to allocate {bytes} bytes for pixel buffer")]
    Allocation { bytes: usize },

    /// Raw pixel memory did not match the declared shape.
    #[error("invalid pixel buffer: {0}")]
    InvalidBuffer(String),

    /// Resampling a buffer to new dimensions failed.
    #[error("resize failed: {0}")]
    Resize(String),

    /// A prefetch worker was requested while another is still outstanding.
    #[error("a prefetch worker is already running")]
    WorkerBusy,

    /// The prefetch worker panicked; its image source is gone with it.
    #[error("prefetch worker panicked")]
    WorkerPanicked,

    /// The OS refused to start the prefetch worker thread.
    #[error("failed to spawn prefetch worker: {0}")]
    Spawn(#[source] std::io::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
