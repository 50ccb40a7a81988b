use crate::domain::ports::AssetSource;
use crate::utils::error::Result;
use std::path::{Path, PathBuf};

/// Assets read from a directory on local disk (`/app` inside the image).
#[derive(Debug, Clone)]
pub struct LocalAssets {
    base_path: PathBuf,
}

impl LocalAssets {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn resolve(&self, path: &str) -> PathBuf {
        let candidate = Path::new(path);
        if candidate.is_absolute() {
            candidate.to_path_buf()
        } else {
            self.base_path.join(candidate)
        }
    }
}

impl AssetSource for LocalAssets {
    async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        let full_path = self.resolve(path);
        tracing::debug!("Reading asset {}", full_path.display());
        let data = tokio::fs::read(full_path).await?;
        Ok(data)
    }
}
