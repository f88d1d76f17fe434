// FICHIER : memdb/src/memory_db/storage/file_storage.rs

use crate::utils::fs::{self, Path, PathBuf};
use crate::utils::prelude::*;
use crate::utils::async_trait;

/// Support durable du snapshot.
/// Le fichier est l'implémentation standard ; les tests injectent les leurs.
#[async_trait]
pub trait SnapshotBackend: Send + Sync {
    /// Contenu brut du dernier snapshot, `None` s'il n'existe pas encore.
    async fn load(&self) -> RaiseResult<Option<String>>;

    /// Remplace intégralement le snapshot.
    async fn write(&self, content: &str) -> RaiseResult<()>;

    fn describe(&self) -> String;
}

#[derive(Debug, Clone)]
pub struct FileBackend {
    path: PathBuf,
}

impl FileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SnapshotBackend for FileBackend {
    async fn load(&self) -> RaiseResult<Option<String>> {
        if !fs::exists(&self.path).await {
            return Ok(None);
        }
        let content = fs::read_to_string(&self.path).await?;
        Ok(Some(content))
    }

    async fn write(&self, content: &str) -> RaiseResult<()> {
        fs::write_atomic(&self.path, content.as_bytes()).await
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}
