// FICHIER : memdb/src/utils/logger.rs

use std::path::Path;
use std::sync::Once;
use tracing_appender::rolling;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

// Sécurité pour éviter la double initialisation (crash fréquent en tests)
static INIT: Once = Once::new();

/// Installe le subscriber global.
/// Console filtrée par `RUST_LOG` (défaut : warn), et si `log_dir` est fourni,
/// un fichier JSON journalier `memdb.log` pour l'analyse outillée.
pub fn init_logging(log_dir: Option<&Path>) {
    INIT.call_once(|| {
        // =========================================================================
        // LAYER 1 : FICHIER (optionnel)
        // =========================================================================
        let file_layer = log_dir.map(|dir| {
            std::fs::create_dir_all(dir).ok();
            let file_appender = rolling::daily(dir, "memdb.log");
            fmt::layer()
                .json()
                .with_writer(file_appender)
                .with_target(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true)
        });

        // =========================================================================
        // LAYER 2 : CONSOLE
        // =========================================================================
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

        let console_layer = fmt::layer()
            .compact()
            .with_target(false)
            .with_filter(env_filter);

        let registry = tracing_subscriber::registry()
            .with(file_layer)
            .with(console_layer);

        if registry.try_init().is_err() {
            tracing::warn!("⚠️ [Logger] Subscriber global déjà actif, ré-initialisation ignorée.");
            return;
        }

        tracing::info!("🚀 Logger initialisé (fichier : {:?})", log_dir);
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logger_init_idempotency() {
        let dir = tempfile::tempdir().unwrap();
        init_logging(Some(dir.path()));
        init_logging(None);
    }
}
