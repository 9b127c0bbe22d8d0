pub mod config;
pub mod error;
pub mod processing {
    pub mod blur;
    pub mod layout;
    pub mod pixel_buffer;
    pub mod resize;
}
pub mod tasks {
    pub mod files;
    pub mod loader;
    pub mod prefetch;
    pub mod slideshow;
    pub mod transition;
}
pub mod render {
    pub mod texture;
    pub mod viewer;
}

pub use error::{Error, Result};
