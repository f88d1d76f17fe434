// FICHIER : memdb/src/utils/fs.rs

use crate::utils::error::RaiseResult;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::instrument;

// --- RE-EXPORTS (Isolation de la couche OS) ---
pub use std::path::{Path, PathBuf};

/// Indique si le chemin existe (fichier ou dossier).
pub async fn exists(path: &Path) -> bool {
    fs::metadata(path).await.is_ok()
}

pub async fn ensure_dir(path: &Path) -> RaiseResult<()> {
    if !exists(path).await {
        fs::create_dir_all(path).await?;
    }
    Ok(())
}

#[instrument(skip(path), fields(path = ?path))]
pub async fn read_to_string(path: &Path) -> RaiseResult<String> {
    Ok(fs::read_to_string(path).await?)
}

pub async fn remove_file(path: &Path) -> RaiseResult<()> {
    if exists(path).await {
        fs::remove_file(path).await?;
    }
    Ok(())
}

// --- ÉCRITURE ATOMIQUE ---

/// Écriture atomique sécurisée (write -> sync -> rename).
/// Un lecteur concurrent voit soit l'ancien contenu, soit le nouveau.
#[instrument(skip(content, path), fields(path = ?path, bytes = content.len()))]
pub async fn write_atomic(path: &Path, content: &[u8]) -> RaiseResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            ensure_dir(parent).await?;
        }
    }

    let tmp_path = tmp_path_for(path);
    let written = async {
        let mut file = fs::File::create(&tmp_path).await?;
        file.write_all(content).await?;
        file.flush().await?;
        // On force l'écriture physique avant le rename
        file.sync_all().await?;
        drop(file);
        fs::rename(&tmp_path, path).await
    }
    .await;

    if let Err(e) = written {
        let _ = remove_file(&tmp_path).await;
        return Err(e.into());
    }
    Ok(())
}

/// `<nom complet>.tmp` : `db.json` et `db.yaml` ne partagent pas le même temporaire.
fn tmp_path_for(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

// =========================================================================
// TESTS UNITAIRES
// =========================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_atomic_write_roundtrip() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("nested/atomic.json");

        write_atomic(&file_path, b"{\"ok\":true}").await.unwrap();
        assert!(exists(&file_path).await);
        assert!(!exists(&tmp_path_for(&file_path)).await);

        let content = read_to_string(&file_path).await.unwrap();
        assert_eq!(content, "{\"ok\":true}");
    }

    #[tokio::test]
    async fn test_atomic_write_overwrites() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("snap.json");

        write_atomic(&file_path, b"v1").await.unwrap();
        write_atomic(&file_path, b"v2").await.unwrap();
        assert_eq!(read_to_string(&file_path).await.unwrap(), "v2");
    }

    #[test]
    fn test_tmp_path_keeps_full_name() {
        let dir = Path::new("/data");
        assert_eq!(tmp_path_for(&dir.join("db.json")), dir.join("db.json.tmp"));
        assert_ne!(
            tmp_path_for(&dir.join("db.json")),
            tmp_path_for(&dir.join("db.yaml"))
        );
    }

    #[tokio::test]
    async fn test_failed_write_leaves_no_tmp_file() {
        let dir = tempdir().unwrap();
        // La cible est un dossier non vide : le rename échoue
        let target = dir.path().join("occupied");
        fs::create_dir_all(target.join("child")).await.unwrap();

        assert!(write_atomic(&target, b"data").await.is_err());
        assert!(!exists(&tmp_path_for(&target)).await);
    }

    #[tokio::test]
    async fn test_remove_missing_file_is_noop() {
        let dir = tempdir().unwrap();
        assert!(remove_file(&dir.path().join("absent.json")).await.is_ok());
    }
}
