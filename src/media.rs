use crate::config::StorageConfig;
use crate::error::MediaError;
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaKind {
    Photo,
    Video,
}

impl MediaKind {
    pub fn extension(self) -> &'static str {
        match self {
            MediaKind::Photo => "jpg",
            MediaKind::Video => "mp4",
        }
    }
}

/// Names temporary media and moves it into permanent storage
#[derive(Debug, Clone)]
pub struct MediaStore {
    tmp_folder: PathBuf,
    storage_folder: PathBuf,
}

impl MediaStore {
    pub fn new(config: &StorageConfig) -> Self {
        Self {
            tmp_folder: PathBuf::from(&config.tmp_folder),
            storage_folder: PathBuf::from(&config.storage_folder),
        }
    }

    pub fn tmp_folder(&self) -> &Path {
        &self.tmp_folder
    }

    pub fn storage_folder(&self) -> &Path {
        &self.storage_folder
    }

    /// Reserve a fresh `<timestamp>.<ext>` path in the temporary folder
    pub async fn allocate_temp_path(&self, kind: MediaKind) -> std::io::Result<PathBuf> {
        fs::create_dir_all(&self.tmp_folder).await?;

        let stamp = Local::now().format("%Y%m%d_%H%M%S_%3f").to_string();
        let mut path = self
            .tmp_folder
            .join(format!("{}.{}", stamp, kind.extension()));
        let mut suffix = 1;
        while fs::try_exists(&path).await? {
            path = self
                .tmp_folder
                .join(format!("{}_{}.{}", stamp, suffix, kind.extension()));
            suffix += 1;
        }

        debug!("Allocated temporary media path {}", path.display());
        Ok(path)
    }

    /// Write captured bytes, removing any partial file on failure
    pub async fn persist(&self, bytes: &[u8], path: &Path) -> std::io::Result<()> {
        if let Err(e) = fs::write(path, bytes).await {
            if let Err(remove_err) = fs::remove_file(path).await {
                if remove_err.kind() != std::io::ErrorKind::NotFound {
                    warn!(
                        "Failed to remove partial file {}: {}",
                        path.display(),
                        remove_err
                    );
                }
            }
            return Err(e);
        }
        Ok(())
    }

    /// Move temporary media into the storage folder, keeping its file name
    pub async fn save(&self, temp: &Path) -> Result<PathBuf, MediaError> {
        let file_name = temp.file_name().ok_or_else(|| MediaError::InvalidPath {
            path: temp.display().to_string(),
        })?;

        ensure_dir(&self.storage_folder)?;
        let destination = self.storage_folder.join(file_name);

        if fs::rename(temp, &destination).await.is_err() {
            // rename fails across filesystems, fall back to copy + delete
            fs::copy(temp, &destination)
                .await
                .map_err(|e| MediaError::Move {
                    from: temp.display().to_string(),
                    to: destination.display().to_string(),
                    source: e,
                })?;
            fs::remove_file(temp)
                .await
                .map_err(|e| MediaError::Delete {
                    path: temp.display().to_string(),
                    source: e,
                })?;
        }

        info!("Saved media {}", destination.display());
        Ok(destination)
    }

    /// Delete temporary media; a missing file is not an error
    pub async fn discard(&self, temp: &Path) -> Result<(), MediaError> {
        match fs::remove_file(temp).await {
            Ok(()) => {
                debug!("Discarded media {}", temp.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(MediaError::Delete {
                path: temp.display().to_string(),
                source: e,
            }),
        }
    }
}

fn ensure_dir(path: &Path) -> Result<(), MediaError> {
    if !path.exists() {
        std::fs::create_dir_all(path).map_err(|e| MediaError::DirectoryCreation {
            path: path.display().to_string(),
            source: e,
        })?;
        info!("Created media directory: {}", path.display());
    }
    Ok(())
}
