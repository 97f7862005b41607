use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::{
    api::ResultSink,
    error::{persistence_error, sink_unavailable_error, Error},
};

/// Writes each artifact to `<directory>/<key>`.
#[derive(Clone, Debug)]
pub struct FileSink {
    directory: PathBuf,
}

impl FileSink {
    /// Creates the output directory. Failure here aborts the batch.
    pub async fn create(directory: impl AsRef<Path>) -> Result<Self, Error> {
        let directory = directory.as_ref().to_path_buf();

        tokio::fs::create_dir_all(&directory)
            .await
            .map_err(|err| sink_unavailable_error(format!("{}: {}", directory.display(), err)))?;

        Ok(Self { directory })
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }
}

#[async_trait]
impl ResultSink for FileSink {
    async fn write(&self, key: &str, bytes: Vec<u8>) -> Result<(), Error> {
        let path = self.directory.join(key);

        tokio::fs::write(&path, bytes)
            .await
            .map_err(|err| persistence_error(format!("{}: {}", path.display(), err)))
    }
}
