// FICHIER : memdb/src/memory_db/storage/sync.rs

//! Synchronisation du snapshot avec regroupement des écritures.
//!
//! Une seule tâche d'écriture consomme les demandes : elle prend la première,
//! attend éventuellement la fenêtre de regroupement, vide la file, capture
//! l'état courant une seule fois puis répond à tous les demandeurs avec le
//! même résultat. Une demande arrivée pendant une écriture en déclenche
//! exactement une de plus. Deux écritures ne se chevauchent jamais.

use crate::memory_db::collections::Store;
use crate::memory_db::storage::SnapshotBackend;
use crate::utils::prelude::*;
use crate::utils::{mpsc, oneshot, Arc, Duration, RwLock};
use std::sync::atomic::{AtomicU64, Ordering};

struct FlushRequest {
    result_tx: oneshot::Sender<RaiseResult<()>>,
}

#[derive(Debug, Default)]
pub struct SyncStats {
    writes: AtomicU64,
    failures: AtomicU64,
}

impl SyncStats {
    pub fn writes(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }

    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }
}

#[derive(Clone)]
pub struct PersistenceSync {
    submit_tx: mpsc::UnboundedSender<FlushRequest>,
    stats: Arc<SyncStats>,
    target: String,
}

impl PersistenceSync {
    /// Démarre la tâche d'écriture (nécessite un runtime tokio actif).
    pub fn spawn(
        store: Arc<RwLock<Store>>,
        backend: Arc<dyn SnapshotBackend>,
        coalesce_window: Duration,
    ) -> Self {
        let (submit_tx, submit_rx) = mpsc::unbounded_channel::<FlushRequest>();
        let stats = Arc::new(SyncStats::default());
        let target = backend.describe();

        tokio::spawn(writer_loop(
            submit_rx,
            store,
            backend,
            coalesce_window,
            Arc::clone(&stats),
        ));

        Self {
            submit_tx,
            stats,
            target,
        }
    }

    /// Demande une écriture de l'état courant et attend qu'elle soit sur disque.
    pub async fn flush(&self) -> RaiseResult<()> {
        let (result_tx, result_rx) = oneshot::channel();
        self.submit_tx
            .send(FlushRequest { result_tx })
            .map_err(|_| {
                AppError::PersistenceWriteFailure(format!(
                    "tâche d'écriture arrêtée ({})",
                    self.target
                ))
            })?;

        result_rx.await.map_err(|_| {
            AppError::PersistenceWriteFailure(format!(
                "résultat d'écriture perdu ({})",
                self.target
            ))
        })?
    }

    pub fn stats(&self) -> &SyncStats {
        &self.stats
    }

    pub fn target(&self) -> &str {
        &self.target
    }
}

async fn writer_loop(
    mut rx: mpsc::UnboundedReceiver<FlushRequest>,
    store: Arc<RwLock<Store>>,
    backend: Arc<dyn SnapshotBackend>,
    coalesce_window: Duration,
    stats: Arc<SyncStats>,
) {
    while let Some(first) = rx.recv().await {
        let mut waiters = vec![first.result_tx];

        if !coalesce_window.is_zero() {
            let deadline = tokio::time::Instant::now() + coalesce_window;
            while let Ok(Some(req)) = tokio::time::timeout_at(deadline, rx.recv()).await {
                waiters.push(req.result_tx);
            }
        }
        while let Ok(req) = rx.try_recv() {
            waiters.push(req.result_tx);
        }

        let outcome = write_snapshot(&store, backend.as_ref()).await;
        match &outcome {
            Ok(bytes) => {
                stats.writes.fetch_add(1, Ordering::Relaxed);
                debug!(
                    backend = %backend.describe(),
                    bytes,
                    coalesced = waiters.len(),
                    "💾 Snapshot écrit"
                );
            }
            Err(reason) => {
                stats.failures.fetch_add(1, Ordering::Relaxed);
                error!(
                    backend = %backend.describe(),
                    error = %reason,
                    coalesced = waiters.len(),
                    "❌ Échec d'écriture du snapshot (l'état mémoire reste la référence)"
                );
            }
        }

        for tx in waiters {
            let reply = match &outcome {
                Ok(_) => Ok(()),
                Err(reason) => Err(AppError::PersistenceWriteFailure(reason.clone())),
            };
            // Le demandeur a pu abandonner son futur
            let _ = tx.send(reply);
        }
    }
    debug!(backend = %backend.describe(), "Tâche d'écriture terminée");
}

/// Capture l'état sous verrou de lecture, puis écrit hors verrou.
async fn write_snapshot(
    store: &RwLock<Store>,
    backend: &dyn SnapshotBackend,
) -> std::result::Result<usize, String> {
    let encoded = {
        let guard = store
            .read()
            .map_err(|_| "verrou du store empoisonné".to_string())?;
        guard.to_snapshot().encode().map_err(|e| e.to_string())?
    };
    backend
        .write(&encoded)
        .await
        .map_err(|e| e.to_string())?;
    Ok(encoded.len())
}
