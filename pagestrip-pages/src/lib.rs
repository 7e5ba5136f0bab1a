use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use pagestrip_core::{ChapterInfo, ChapterProvider, ImageFetcher, PageInfo, ReadingContext};
use parking_lot::Mutex;
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

pub const MANIFEST_FILE: &str = "chapter.toml";

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp", "gif"];

/// Optional per-chapter overrides for the reading context.
#[derive(Debug, Clone, Default, Deserialize)]
struct ChapterManifest {
    slug: Option<String>,
    chapter: Option<String>,
}

/// Opens chapters laid out as `<series>/<chapter>/<page images>`.
#[derive(Debug, Default, Clone)]
pub struct DirectoryChapterProvider;

impl DirectoryChapterProvider {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ChapterProvider for DirectoryChapterProvider {
    #[instrument(skip(self))]
    async fn open(&self, path: &Path) -> Result<ChapterInfo> {
        let root = path
            .canonicalize()
            .with_context(|| format!("failed to resolve chapter directory {:?}", path))?;
        if !root.is_dir() {
            bail!("{:?} is not a directory", root);
        }

        let manifest = read_manifest(&root)?;
        let context = ReadingContext::from_attributes(
            manifest
                .slug
                .as_deref()
                .or_else(|| root.parent().and_then(file_name_str)),
            manifest.chapter.as_deref().or_else(|| file_name_str(&root)),
        );

        let pages: Vec<PageInfo> = list_images(&root)?
            .into_iter()
            .enumerate()
            .map(|(index, path)| PageInfo {
                index,
                src: path.to_string_lossy().into_owned(),
            })
            .collect();
        if pages.is_empty() {
            bail!("no page images found in {:?}", root);
        }

        let (prev, next) = siblings(&root)?;
        info!(
            slug = %context.slug,
            chapter = %context.chapter,
            pages = pages.len(),
            "opened chapter"
        );
        Ok(ChapterInfo {
            context,
            pages,
            prev,
            next,
        })
    }
}

fn file_name_str(path: &Path) -> Option<&str> {
    path.file_name().and_then(|name| name.to_str())
}

fn read_manifest(root: &Path) -> Result<ChapterManifest> {
    let path = root.join(MANIFEST_FILE);
    if !path.exists() {
        return Ok(ChapterManifest::default());
    }
    let raw = fs::read_to_string(&path)
        .with_context(|| format!("failed to read manifest {:?}", path))?;
    toml::from_str(&raw).with_context(|| format!("failed to decode manifest {:?}", path))
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            IMAGE_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

fn list_images(root: &Path) -> Result<Vec<PathBuf>> {
    let mut images = Vec::new();
    for entry in fs::read_dir(root).with_context(|| format!("failed to list {:?}", root))? {
        let path = entry?.path();
        if path.is_file() && is_image(&path) {
            images.push(path);
        }
    }
    alphanumeric_sort::sort_path_slice(&mut images);
    Ok(images)
}

fn siblings(root: &Path) -> Result<(Option<PathBuf>, Option<PathBuf>)> {
    let Some(parent) = root.parent() else {
        return Ok((None, None));
    };
    let mut chapters = Vec::new();
    for entry in fs::read_dir(parent).with_context(|| format!("failed to list {:?}", parent))? {
        let path = entry?.path();
        if path.is_dir() {
            chapters.push(path);
        }
    }
    alphanumeric_sort::sort_path_slice(&mut chapters);

    let Some(position) = chapters.iter().position(|path| path == root) else {
        warn!(?root, "chapter missing from its own parent listing");
        return Ok((None, None));
    };
    let prev = position
        .checked_sub(1)
        .and_then(|idx| chapters.get(idx))
        .cloned();
    let next = chapters.get(position + 1).cloned();
    Ok((prev, next))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageDimensions {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLoad {
    pub index: usize,
    pub dimensions: PageDimensions,
}

/// Decodes page image headers on the rayon pool. Results land in a shared
/// cache; first loads of on-screen pages are also queued as events for the
/// UI loop to drain.
#[derive(Clone, Default)]
pub struct PageLoader {
    cache: Arc<Mutex<HashMap<String, PageDimensions>>>,
    events: Arc<Mutex<Vec<PageLoad>>>,
    failures: Arc<Mutex<HashSet<String>>>,
}

impl PageLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dimensions(&self, src: &str) -> Option<PageDimensions> {
        self.cache.lock().get(src).copied()
    }

    /// Loads page `index`. Completion is reported through
    /// [`PageLoader::drain_loaded`]; failed loads never are.
    pub fn load_page(&self, index: usize, src: &str) {
        if let Some(dimensions) = self.dimensions(src) {
            self.events.lock().push(PageLoad { index, dimensions });
            return;
        }
        let src = src.to_string();
        let loader = self.clone();
        rayon::spawn(move || match loader.decode(&src) {
            Ok(dimensions) => loader.events.lock().push(PageLoad { index, dimensions }),
            Err(err) => {
                warn!(%src, "failed to load page: {err:#}");
                loader.failures.lock().insert(src);
            }
        });
    }

    pub fn drain_loaded(&self) -> Vec<PageLoad> {
        std::mem::take(&mut *self.events.lock())
    }

    /// Whether a load of `src` failed. The page then keeps its placeholder.
    pub fn has_failed(&self, src: &str) -> bool {
        self.failures.lock().contains(src)
    }

    fn decode(&self, src: &str) -> Result<PageDimensions> {
        let (width, height) = image::image_dimensions(src)
            .map_err(|err| anyhow!(err))
            .with_context(|| format!("failed to read image header of {}", src))?;
        let dimensions = PageDimensions { width, height };
        self.cache.lock().insert(src.to_string(), dimensions);
        Ok(dimensions)
    }
}

impl ImageFetcher for PageLoader {
    fn fetch(&self, src: &str) {
        if self.dimensions(src).is_some() {
            return;
        }
        let src = src.to_string();
        let loader = self.clone();
        rayon::spawn(move || {
            if let Err(err) = loader.decode(&src) {
                debug!(%src, "preload failed: {err:#}");
            }
        });
    }
}
