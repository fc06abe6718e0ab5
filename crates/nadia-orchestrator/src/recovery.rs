use nadia_core::model::ReviewStatus;
use nadia_core::{ConversationId, Interaction, UserId};
use nadia_store_db::DbError;
use nadia_store_kv::WalQueue;
use tracing::{info, warn};

use crate::error::Result;
use crate::pipeline::Pipeline;

/// Runs at startup and on a periodic interval thereafter: replays every WAL
/// entry still on disk, mirroring the reference scheduler's
/// mark-missed-on-startup sweep. An entry survives only when the process
/// died before step 6 of the pipeline (enqueue + WAL removal), so recovery
/// is just "run the remaining stages and try again to remove it."
///
/// Bounded by `max_attempts`: a row that keeps failing recovery is marked
/// `failed` and its WAL entry cleared rather than retried forever.
pub async fn recover_on_startup(
    pipeline: &Pipeline,
    repo: &nadia_store_db::InteractionRepository,
    wal: &WalQueue,
    max_attempts: i32,
) -> Result<usize> {
    let entries = wal.snapshot().await?;
    if entries.is_empty() {
        return Ok(0);
    }
    info!(count = entries.len(), "replaying WAL entries left by a previous run");

    let mut recovered = 0;
    for entry in entries {
        let interaction = match repo.get(&entry.interaction_id).await {
            Ok(row) => row,
            Err(DbError::NotFound { .. }) => {
                let rebuilt = rebuild_from_wal(&entry);
                if let Err(e) = repo.insert(&rebuilt).await {
                    warn!(id = %entry.interaction_id, error = %e, "failed to re-insert stranded interaction, leaving in WAL");
                    continue;
                }
                rebuilt
            }
            Err(e) => {
                warn!(id = %entry.interaction_id, error = %e, "failed to load stranded interaction, leaving in WAL");
                continue;
            }
        };

        match interaction.review_status {
            ReviewStatus::Approved | ReviewStatus::Rejected | ReviewStatus::Sent => {
                // Enqueue (and WAL removal) already happened; this is a
                // leftover from a crash between the two. Nothing left to do.
            }
            _ => {
                if let Err(e) = pipeline.run_stages(&interaction).await {
                    let attempts = repo.bump_recovery_attempts(&entry.interaction_id).await.unwrap_or(interaction.recovery_attempts + 1);
                    if attempts >= max_attempts {
                        warn!(id = %entry.interaction_id, attempts, error = %e, "recovery attempts exhausted, giving up");
                        let _ = repo.mark_failed(&entry.interaction_id, &format!("recovery exhausted after {attempts} attempts: {e}")).await;
                        let _ = wal.remove(&entry).await;
                    } else {
                        warn!(id = %entry.interaction_id, attempts, error = %e, "retry failed, leaving in WAL");
                    }
                    continue;
                }
            }
        }

        if let Err(e) = wal.remove(&entry).await {
            warn!(id = %entry.interaction_id, error = %e, "recovered but failed to clear WAL entry");
            continue;
        }
        recovered += 1;
    }

    info!(recovered, "WAL replay complete");
    Ok(recovered)
}

/// The process died between writing the WAL entry and committing the
/// relational row. Reconstruct a minimal pending row from the entry's
/// payload so `run_stages` has something to work from.
fn rebuild_from_wal(entry: &nadia_store_kv::WalEntry) -> Interaction {
    let conversation_id = entry
        .payload
        .get("conversation_id")
        .and_then(|v| v.as_str())
        .map(|s| ConversationId(s.to_string()))
        .unwrap_or_else(|| ConversationId::for_user(&UserId::from(entry.user_id.clone())));
    let message_number = entry.payload.get("message_number").and_then(|v| v.as_i64()).unwrap_or(0);
    let user_message = entry
        .payload
        .get("user_message")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();

    let mut interaction = Interaction::new(
        UserId::from(entry.user_id.clone()),
        conversation_id,
        message_number,
        user_message,
    );
    interaction.id = entry.interaction_id.clone().into();
    interaction
}
