//! Startup reconciliation
//!
//! Restores "record exists iff artifact exists" after a crash or after the
//! artifact directory was edited by hand.

use config_model_compiler::PluginCompiler;
use config_model_db::ModelRepository;
use std::collections::HashSet;
use tracing::{info, instrument, warn};

use crate::dto::ReconcileReport;
use crate::error::ServiceResult;
use crate::locks::ArtifactLocks;

/// Run one reconciliation pass
///
/// 1. Delete temp files left by interrupted writes.
/// 2. Recompile records whose artifact is missing; drop those that fail.
/// 3. Delete artifact files that no record owns.
#[instrument(skip_all)]
pub async fn reconcile(
    repository: &dyn ModelRepository,
    compiler: &dyn PluginCompiler,
    locks: &ArtifactLocks,
) -> ServiceResult<ReconcileReport> {
    let mut report = ReconcileReport {
        stale_temp_files: compiler.remove_stale_temp_files().await?,
        ..Default::default()
    };

    let mut owned = HashSet::new();
    for record in repository.list_models().await? {
        let _guard = locks.acquire(record.artifact_file()).await;

        if compiler.plugin_exists(&record.identity).await? {
            owned.insert(record.artifact_file().to_string());
            continue;
        }

        warn!("Artifact missing for model {}, recompiling", record.identity);
        match compiler.compile_plugin(&record).await {
            Ok(_) => {
                owned.insert(record.artifact_file().to_string());
                report.recompiled.push(record.identity.to_string());
            }
            Err(e) => {
                warn!("Recompile of {} failed, dropping record: {}", record.identity, e);
                match repository.remove_model(&record.identity).await {
                    Ok(_) => {}
                    Err(e) if e.is_not_found() => {}
                    Err(e) => return Err(e.into()),
                }
                report.dropped.push(record.identity.to_string());
            }
        }
    }

    for file in compiler.list_artifacts().await? {
        if owned.contains(&file) {
            continue;
        }
        let _guard = locks.acquire(&file).await;
        // A push may have registered the file since the listing above.
        if repository.find_by_artifact(&file).await?.is_some() {
            continue;
        }
        if compiler.remove_artifact(&file).await? {
            report.orphans_removed.push(file);
        }
    }

    if report.is_clean() {
        info!("Reconciliation found nothing to repair");
    } else {
        info!(
            stale_temp_files = report.stale_temp_files,
            recompiled = report.recompiled.len(),
            dropped = report.dropped.len(),
            orphans_removed = report.orphans_removed.len(),
            "Reconciliation repaired registry state"
        );
    }
    Ok(report)
}
