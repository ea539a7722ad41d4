//! Persistence of generated artifacts under the output directory.
//!
//! Files are named `<YYYYmmdd_HHMMSS>_<slug>.<ext>` inside one subdirectory per
//! media kind. Directories are created on first use.

use crate::error::{MuseError, Result};
use crate::gateway::{MediaAsset, MediaData};
use chrono::Local;
use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, instrument};

const MAX_SLUG_CHARS: usize = 40;

/// Subdirectory of the output tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    Articles,
    Audio,
    Images,
    Videos,
    Prompts,
}

impl OutputKind {
    pub const ALL: [OutputKind; 5] = [
        OutputKind::Articles,
        OutputKind::Audio,
        OutputKind::Images,
        OutputKind::Videos,
        OutputKind::Prompts,
    ];

    pub fn dir_name(&self) -> &'static str {
        match self {
            OutputKind::Articles => "articles",
            OutputKind::Audio => "audio",
            OutputKind::Images => "images",
            OutputKind::Videos => "videos",
            OutputKind::Prompts => "prompts",
        }
    }
}

/// Writes artifacts below a root directory.
#[derive(Debug, Clone)]
pub struct OutputStore {
    root: PathBuf,
}

impl OutputStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The directory for `kind`, created if absent.
    pub fn dir(&self, kind: OutputKind) -> Result<PathBuf> {
        let dir = self.root.join(kind.dir_name());
        std::fs::create_dir_all(&dir)
            .map_err(|e| MuseError::Output(format!("cannot create {}: {}", dir.display(), e)))?;
        Ok(dir)
    }

    /// Create a new artifact file, reserving its name atomically.
    ///
    /// The first free name of `<stem>.<ext>`, `<stem>_2.<ext>`, ... is opened
    /// with `create_new`, so concurrent saves never share a file.
    pub async fn create(&self, kind: OutputKind, title: &str, ext: &str) -> Result<(PathBuf, File)> {
        let dir = self.dir(kind)?;
        let stem = format!("{}_{}", Local::now().format("%Y%m%d_%H%M%S"), slugify(title));

        let mut n = 1;
        loop {
            let path = match n {
                1 => dir.join(format!("{}.{}", stem, ext)),
                _ => dir.join(format!("{}_{}.{}", stem, n, ext)),
            };
            match OpenOptions::new().write(true).create_new(true).open(&path).await {
                Ok(file) => return Ok((path, file)),
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => n += 1,
                Err(e) => return Err(write_error(&path, e)),
            }
        }
    }

    #[instrument(skip(self, content), fields(kind = kind.dir_name()))]
    pub async fn save_text(&self, kind: OutputKind, title: &str, ext: &str, content: &str) -> Result<PathBuf> {
        let (path, mut file) = self.create(kind, title, ext).await?;
        let written = async {
            file.write_all(content.as_bytes()).await?;
            file.flush().await
        }
        .await;
        finish(path, written).await
    }

    /// Persist a media asset. Temporary files are copied, then removed.
    #[instrument(skip(self, asset), fields(kind = kind.dir_name(), format = asset.format.extension()))]
    pub async fn save_media(&self, kind: OutputKind, title: &str, asset: MediaAsset) -> Result<PathBuf> {
        let (path, mut file) = self.create(kind, title, asset.format.extension()).await?;
        let written = async {
            match &asset.data {
                MediaData::Bytes(bytes) => file.write_all(bytes).await?,
                MediaData::TempFile(temp) => {
                    let mut source = File::open(temp).await?;
                    tokio::io::copy(&mut source, &mut file).await?;
                }
            }
            file.flush().await
        }
        .await;
        drop(asset);
        finish(path, written).await
    }

    /// Save a batch of images as `<slug>_1`, `<slug>_2`, ...
    pub async fn save_images(&self, title: &str, images: Vec<MediaAsset>) -> Result<Vec<PathBuf>> {
        if images.len() == 1 {
            let image = images.into_iter().next();
            return match image {
                Some(image) => Ok(vec![self.save_media(OutputKind::Images, title, image).await?]),
                None => Ok(Vec::new()),
            };
        }

        let saves = images.into_iter().enumerate().map(|(i, image)| {
            let title = format!("{}_{}", title, i + 1);
            async move { self.save_media(OutputKind::Images, &title, image).await }
        });
        futures::future::try_join_all(saves).await
    }

    /// Path relative to the output root, for URLs.
    pub fn relative<'a>(&self, path: &'a Path) -> Option<&'a Path> {
        path.strip_prefix(&self.root).ok()
    }
}

/// Keep the file on success; remove the partial file on a failed write.
async fn finish(path: PathBuf, written: std::io::Result<()>) -> Result<PathBuf> {
    match written {
        Ok(()) => {
            debug!("Saved {}", path.display());
            Ok(path)
        }
        Err(e) => {
            let _ = tokio::fs::remove_file(&path).await;
            Err(write_error(&path, e))
        }
    }
}

fn write_error(path: &Path, e: std::io::Error) -> MuseError {
    MuseError::Output(format!("cannot write {}: {}", path.display(), e))
}

/// File-name-safe form of a title.
///
/// Letters and digits of any script are kept, everything else collapses to a
/// single `_`. At most 40 characters; `untitled` when nothing is left.
pub fn slugify(title: &str) -> String {
    let mut slug = String::new();
    let mut pending_sep = false;

    for c in title.chars() {
        if c.is_alphanumeric() {
            if pending_sep && !slug.is_empty() {
                slug.push('_');
            }
            pending_sep = false;
            slug.push(c);
        } else {
            pending_sep = true;
        }
    }

    let slug: String = slug.chars().take(MAX_SLUG_CHARS).collect();
    let slug = slug.trim_end_matches('_');
    if slug.is_empty() {
        "untitled".to_string()
    } else {
        slug.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::MediaFormat;
    use std::io::Write;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Trends in AI: 2024!"), "Trends_in_AI_2024");
        assert_eq!(slugify("  人工智能 的 未来 "), "人工智能_的_未来");
        assert_eq!(slugify("???"), "untitled");
        assert_eq!(slugify(&"a".repeat(100)).chars().count(), 40);
        assert_eq!(slugify(&format!("{} b", "a".repeat(39))), "a".repeat(39));
    }

    #[tokio::test]
    async fn test_create_layout() {
        let dir = tempfile::tempdir().unwrap();
        let store = OutputStore::new(dir.path());

        let (path, _file) = store.create(OutputKind::Articles, "Hello World", "md").await.unwrap();

        assert_eq!(path.parent().unwrap(), dir.path().join("articles"));
        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(name.ends_with("_Hello_World.md"), "{name}");
        assert_eq!(name.len(), "YYYYmmdd_HHMMSS_Hello_World.md".len());
    }

    #[tokio::test]
    async fn test_save_text_never_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let store = OutputStore::new(dir.path());

        let a = store.save_text(OutputKind::Prompts, "same", "md", "one").await.unwrap();
        let b = store.save_text(OutputKind::Prompts, "same", "md", "two").await.unwrap();

        assert_ne!(a, b);
        assert_eq!(std::fs::read_to_string(&a).unwrap(), "one");
        assert_eq!(std::fs::read_to_string(&b).unwrap(), "two");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_concurrent_saves_get_distinct_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = OutputStore::new(dir.path());

        let tasks: Vec<_> = (0..32)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move {
                    store
                        .save_text(OutputKind::Articles, "same topic", "md", &format!("body {}", i))
                        .await
                        .unwrap()
                })
            })
            .collect();

        let mut paths = Vec::new();
        for task in tasks {
            paths.push(task.await.unwrap());
        }
        let distinct: std::collections::HashSet<_> = paths.iter().collect();
        assert_eq!(distinct.len(), 32);
        assert_eq!(std::fs::read_dir(dir.path().join("articles")).unwrap().count(), 32);

        let mut bodies: Vec<String> = paths.iter().map(|p| std::fs::read_to_string(p).unwrap()).collect();
        bodies.sort();
        bodies.dedup();
        assert_eq!(bodies.len(), 32);
    }

    #[tokio::test]
    async fn test_save_media_copies_and_removes_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = OutputStore::new(dir.path().join("out"));

        let mut temp = tempfile::NamedTempFile::new().unwrap();
        temp.write_all(b"mp4 bytes").unwrap();
        let temp_path = temp.into_temp_path();
        let temp_location = temp_path.to_path_buf();

        let saved = store
            .save_media(OutputKind::Videos, "clip", MediaAsset::from_temp_file(MediaFormat::Mp4, temp_path))
            .await
            .unwrap();

        assert_eq!(std::fs::read(&saved).unwrap(), b"mp4 bytes");
        assert!(saved.to_str().unwrap().ends_with("_clip.mp4"));
        assert!(!temp_location.exists());
    }

    #[tokio::test]
    async fn test_save_images_numbers_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = OutputStore::new(dir.path());
        let images = vec![
            MediaAsset::from_bytes(MediaFormat::Png, b"one".to_vec()),
            MediaAsset::from_bytes(MediaFormat::Jpeg, b"two".to_vec()),
        ];

        let paths = store.save_images("cat", images).await.unwrap();

        assert_eq!(paths.len(), 2);
        assert!(paths[0].to_str().unwrap().ends_with("_cat_1.png"));
        assert!(paths[1].to_str().unwrap().ends_with("_cat_2.jpg"));
        assert_eq!(store.relative(&paths[0]).unwrap().parent().unwrap(), Path::new("images"));
    }
}
