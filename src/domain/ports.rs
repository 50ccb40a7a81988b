use crate::utils::error::Result;

/// Read-only access to the files baked into the image (dataset and templates).
pub trait AssetSource: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;

    fn read_to_string(
        &self,
        path: &str,
    ) -> impl std::future::Future<Output = Result<String>> + Send {
        async move {
            let bytes = self.read_file(path).await?;
            String::from_utf8(bytes).map_err(|e| {
                crate::utils::error::AppError::IoError(std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    format!("{}: {}", path, e),
                ))
            })
        }
    }
}
