use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;

use crate::error::FetchError;

/// Resolves a frame locator to the bytes of a complete single-frame file.
pub trait FrameSource: Send + Sync {
    fn fetch(&self, path: &str) -> BoxFuture<'static, Result<Vec<u8>, FetchError>>;
}

/// Reads frames from the local file system, optionally relative to a root.
#[derive(Debug, Clone, Default)]
pub struct FileSource {
    root: Option<PathBuf>,
}

impl FileSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }

    fn resolve(&self, path: &str) -> PathBuf {
        match &self.root {
            Some(root) => root.join(path.trim_start_matches('/')),
            None => PathBuf::from(path),
        }
    }
}

impl FrameSource for FileSource {
    fn fetch(&self, path: &str) -> BoxFuture<'static, Result<Vec<u8>, FetchError>> {
        let resolved = self.resolve(path);
        let path = path.to_string();
        async move {
            tokio::fs::read(&resolved).await.map_err(|source| {
                if source.kind() == std::io::ErrorKind::NotFound {
                    FetchError::NotFound(path)
                } else {
                    FetchError::Io { path, source }
                }
            })
        }
        .boxed()
    }
}

/// An ordered list of frame locators. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Series {
    id: String,
    ordered_frame_paths: Arc<[String]>,
}

impl Series {
    pub fn new(id: impl Into<String>, ordered_frame_paths: Vec<String>) -> Self {
        Self {
            id: id.into(),
            ordered_frame_paths: ordered_frame_paths.into(),
        }
    }

    /// A series of every ".dcm" file in a directory, ordered by file name.
    pub fn from_directory(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let mut paths: Vec<_> = fs::read_dir(path)?
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| {
                path.extension()
                    .and_then(|s| s.to_str())
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("dcm"))
            })
            .collect();
        paths.sort();

        let id = path.display().to_string();
        Ok(Self::new(
            id,
            paths.iter().map(|p| p.display().to_string()).collect(),
        ))
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn frame_paths(&self) -> &[String] {
        &self.ordered_frame_paths
    }

    pub fn len(&self) -> usize {
        self.ordered_frame_paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered_frame_paths.is_empty()
    }

    /// The frame shown when the series is opened. Frame number
    /// `floor(n / 2) - 1`, counted from one, clamped to the first frame.
    pub fn key_image_index(&self) -> usize {
        (self.len() / 2).saturating_sub(2)
    }
}
