use std::future::Future;
use std::time::Duration;

use tokio::sync::watch;
use uuid::Uuid;

use crate::error::{ExternalServiceError, StoreError};
use crate::models::Record;
use crate::notify::templates;
use crate::state::{AppState, SharedState};

#[derive(Debug, Default, Clone, PartialEq)]
pub struct CycleReport {
    pub purged_tokens: u64,
    pub scanned: usize,
    pub fulfilled: usize,
    /// Claimed elsewhere between listing and claiming.
    pub skipped: usize,
    /// External call failed; the record stays pending for the next cycle.
    pub failed: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Fulfilled,
    Skipped,
    FulfillmentFailed(ExternalServiceError),
    NotifyFailed(ExternalServiceError),
    ClaimLost,
}

/// Start the fulfillment loop on a dedicated Tokio runtime so slow external
/// calls never compete with the request path. Returns once the loop exits.
pub fn spawn(
    state: SharedState,
    shutdown: watch::Receiver<bool>,
) -> std::io::Result<std::thread::JoinHandle<()>> {
    std::thread::Builder::new()
        .name("fulfillment-worker".into())
        .spawn(move || {
            let runtime = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(runtime) => runtime,
                Err(e) => {
                    tracing::error!("Failed to build worker runtime: {e}");
                    return;
                }
            };

            runtime.block_on(run(state, shutdown));
        })
}

/// Serial scan loop: the next cycle is only scheduled after the previous one
/// has finished, and every record is claimed before any external call.
pub async fn run(state: SharedState, mut shutdown: watch::Receiver<bool>) {
    let interval = state.config.scan_interval;
    tracing::info!("Fulfillment worker started (interval {}s)", interval.as_secs());

    loop {
        if *shutdown.borrow() {
            break;
        }

        tokio::select! {
            result = run_cycle(&state) => match result {
                Ok(report) if report.scanned > 0 || report.purged_tokens > 0 => {
                    tracing::info!(
                        scanned = report.scanned,
                        fulfilled = report.fulfilled,
                        skipped = report.skipped,
                        failed = report.failed,
                        purged_tokens = report.purged_tokens,
                        "Fulfillment cycle finished"
                    );
                }
                Ok(_) => tracing::debug!("Fulfillment cycle found nothing to do"),
                Err(e) => tracing::error!("Fulfillment cycle aborted: {e}"),
            },
            _ = shutdown.changed() => {
                tracing::info!("Shutdown during fulfillment cycle, abandoning in-flight work");
                break;
            }
        }

        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            changed = shutdown.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
    }

    tracing::info!("Fulfillment worker stopped");
}

/// One scan over pending records. A store failure aborts the cycle; an
/// external failure only affects the record it happened on.
pub async fn run_cycle(state: &AppState) -> Result<CycleReport, StoreError> {
    let mut report = CycleReport {
        purged_tokens: state.store.purge_expired_tokens().await?,
        ..CycleReport::default()
    };

    let pending = state.store.pending_records(state.config.scan_batch).await?;
    report.scanned = pending.len();

    for record in &pending {
        match process_record(state, record).await? {
            Outcome::Fulfilled => report.fulfilled += 1,
            Outcome::Skipped | Outcome::ClaimLost => report.skipped += 1,
            Outcome::FulfillmentFailed(e) => {
                report.failed += 1;
                tracing::warn!(
                    record_id = %record.id,
                    target_id = %record.target_id,
                    "Fulfillment call failed, will retry: {e}"
                );
            }
            Outcome::NotifyFailed(e) => {
                report.failed += 1;
                tracing::warn!(
                    record_id = %record.id,
                    requester_id = record.requester_id,
                    "Notification failed, will retry: {e}"
                );
            }
        }
    }

    Ok(report)
}

pub async fn process_record(state: &AppState, record: &Record) -> Result<Outcome, StoreError> {
    let store = state.store.as_ref();
    let claim_id = Uuid::now_v7();

    let Some(claimed) = store
        .claim_record(record.id, claim_id, state.config.claim_lease)
        .await?
    else {
        return Ok(Outcome::Skipped);
    };

    // A stored result means the fulfillment already happened and only the
    // notification is outstanding.
    let result = match claimed.stored_result() {
        Some(result) => result.clone(),
        None => {
            let call = state.fulfillment.fulfill(&claimed.target_id);
            match bounded(state.config.http_timeout, call).await {
                Ok(result) => {
                    if !store.store_result(claimed.id, claim_id, &result).await? {
                        tracing::warn!(record_id = %claimed.id, "Claim lost during fulfillment, not notifying");
                        return Ok(Outcome::ClaimLost);
                    }
                    result
                }
                Err(e) => {
                    store
                        .release_claim(claimed.id, claim_id, &format!("fulfillment: {e}"))
                        .await?;
                    return Ok(Outcome::FulfillmentFailed(e));
                }
            }
        }
    };

    let text = templates::render_fulfilled(&claimed.target_id, &result);
    let send = state.notifier.notify(claimed.requester_id, &text);
    if let Err(e) = bounded(state.config.http_timeout, send).await {
        store
            .release_claim(claimed.id, claim_id, &format!("notify: {e}"))
            .await?;
        return Ok(Outcome::NotifyFailed(e));
    }

    if !store.mark_fulfilled(claimed.id, claim_id).await? {
        tracing::warn!(record_id = %claimed.id, "Claim lost before the record could be marked fulfilled");
        return Ok(Outcome::ClaimLost);
    }

    tracing::info!(
        record_id = %claimed.id,
        requester_id = claimed.requester_id,
        target_id = %claimed.target_id,
        likes_after = result.likes_after,
        "Record fulfilled"
    );
    Ok(Outcome::Fulfilled)
}

async fn bounded<T>(
    limit: Duration,
    call: impl Future<Output = Result<T, ExternalServiceError>>,
) -> Result<T, ExternalServiceError> {
    tokio::time::timeout(limit, call)
        .await
        .unwrap_or(Err(ExternalServiceError::Timeout))
}
