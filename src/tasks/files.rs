use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, instrument, warn};
use walkdir::WalkDir;

use crate::config::Configuration;
use crate::processing::pixel_buffer::PixelBuffer;

/// Anything that can hand the prefetch worker its next decoded image.
///
/// `next_image` returns the empty sentinel when nothing is available (empty
/// library, unreadable file); callers skip that cycle and ask again later.
pub trait ImageSource {
    /// Re-enumerate the underlying library. `false` means it could not be read.
    fn refresh(&mut self) -> bool;

    fn next_image(&mut self) -> PixelBuffer;
}

/// Recursive, extension-filtered listing of a local photo directory with
/// uniform random picks (repeats allowed).
#[derive(Debug)]
pub struct LocalCatalog {
    root: PathBuf,
    extensions: Vec<String>,
    paths: Vec<PathBuf>,
    rng: StdRng,
}

impl LocalCatalog {
    /// `extensions` are matched case-insensitively; a leading dot is ignored.
    pub fn new<I, S>(root: impl Into<PathBuf>, extensions: I, seed: Option<u64>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let extensions = extensions
            .into_iter()
            .map(|e| e.as_ref().trim_start_matches('.').to_ascii_lowercase())
            .filter(|e| !e.is_empty())
            .collect();
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::seed_from_u64(rand::rng().random()),
        };
        Self {
            root: root.into(),
            extensions,
            paths: Vec::new(),
            rng,
        }
    }

    pub fn from_config(cfg: &Configuration) -> Self {
        Self::new(&cfg.photo_library_path, &cfg.extensions, cfg.seed)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Full re-scan of the root. A missing root keeps the previous list.
    #[instrument(skip(self), fields(root = %self.root.display()))]
    pub fn rescan(&mut self) -> bool {
        if !self.root.is_dir() {
            warn!("photo library root does not exist; keeping previous list");
            return false;
        }
        let mut found: Vec<PathBuf> = WalkDir::new(&self.root)
            .follow_links(true)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_file())
            .map(walkdir::DirEntry::into_path)
            .filter(|p| self.accepts(p))
            .collect();
        // WalkDir order is filesystem dependent; sort so seeded picks repeat.
        found.sort();
        info!(discovered = found.len(), "recursive scan complete");
        self.paths = found;
        true
    }

    /// Uniform random pick, or `None` when the catalog is empty.
    pub fn next_path(&mut self) -> Option<PathBuf> {
        if self.paths.is_empty() {
            return None;
        }
        let idx = self.rng.random_range(0..self.paths.len());
        let path = self.paths[idx].clone();
        debug!(path = %path.display(), "picked");
        Some(path)
    }

    fn accepts(&self, p: &Path) -> bool {
        matches!(
            p.extension()
                .and_then(OsStr::to_str)
                .map(str::to_ascii_lowercase),
            Some(ref e) if self.extensions.iter().any(|x| x == e)
        )
    }
}

impl ImageSource for LocalCatalog {
    fn refresh(&mut self) -> bool {
        self.rescan()
    }

    fn next_image(&mut self) -> PixelBuffer {
        match self.next_path() {
            Some(path) => PixelBuffer::from_file(&path),
            None => {
                debug!("catalog empty; nothing to decode");
                PixelBuffer::empty()
            }
        }
    }
}
