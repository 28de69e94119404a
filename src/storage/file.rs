use std::io::ErrorKind;
use std::path::PathBuf;

use anyhow::bail;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use urlencoding::encode;

use super::Store;

/// Longest file name the common file systems accept.
const MAX_FILE_NAME_LEN: usize = 255;

/// One file per key inside a directory.
#[derive(Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub async fn new(dir: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let dir: PathBuf = dir.into();

        let metadata = match fs::metadata(&dir).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == ErrorKind::NotFound => bail!("directory does not exist"),
            Err(e) => return Err(e.into()),
        };

        if !metadata.is_dir() {
            bail!("not a directory");
        }

        Ok(FileStore { dir })
    }

    /// Keys are percent-encoded, so ':' and '/' never reach the file system.
    /// `None` when the encoded name is too long to ever have been stored.
    fn path_for(&self, key: &str) -> Option<PathBuf> {
        let name = encode(key);
        (name.len() <= MAX_FILE_NAME_LEN).then(|| self.dir.join(&*name))
    }
}

impl Store for FileStore {
    async fn get(&mut self, key: &str) -> crate::ApiResult<Option<String>> {
        let Some(path) = self.path_for(key) else {
            return Ok(None);
        };

        match fs::read_to_string(path).await {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn set(&mut self, key: &str, value: String) -> crate::ApiResult<()> {
        let path = self.path_for(key).ok_or_else(|| {
            std::io::Error::new(ErrorKind::InvalidInput, "key too long for a file name")
        })?;

        let mut file = fs::File::create(path).await?;
        file.write_all(value.as_bytes()).await?;
        file.flush().await?;

        Ok(())
    }
}
