//! # Batch Loop
//!
//! The checkpointed batch loop shared by every distribution kind. A batch is
//! split into sub-batches of `bulk_size` elements, one `WorkerTask` each, all
//! dispatched at once; the loop waits for the whole batch, merges the results
//! into the step responses and persists a checkpoint before the next batch.
//!
//! A FATAL batch stops the loop without writing a checkpoint so that a retry
//! starts again from the last good one.

use futures::future::join_all;
use futures::StreamExt;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::elements::parse_json_line;
use super::worker_task::{is_interruption, WorkerTask};
use crate::client::{CheckpointStore, LineStream, ProcessMetadataStore};
use crate::constants::{DISTRIBUTOR_INDEX, OBJECTS_LIST_EMPTY, WORKER_CALL_EXCEPTION};
use crate::error::{DistributorError, Result, WorkerTaskError};
use crate::logging::log_distribution_operation;
use crate::models::{
    DistributorIndex, ItemStatus, PauseOrCancelAction, RequestContext, StatusCode, Step,
};
use crate::registry::WorkerRegistry;

/// Where a level starts, according to the resume snapshot
#[derive(Debug)]
pub(crate) enum ResumePoint {
    /// No snapshot applies; start at the beginning
    Fresh,
    /// The snapshot belongs to another level, this one is already done
    OtherLevel,
    /// The level finished before the stop; its status is final
    Finished(ItemStatus),
    Resume {
        offset: usize,
        status: ItemStatus,
        remaining: Vec<String>,
    },
}

/// Result of one dispatched batch
#[derive(Debug)]
struct BatchOutcome {
    status: ItemStatus,
    /// Elements of the sub-batches that did not complete
    remaining: Vec<String>,
    interruption: Option<PauseOrCancelAction>,
}

/// State of one `distribute` call
pub(crate) struct DistributionRun<'a> {
    pub(crate) step: Arc<Step>,
    pub(crate) operation_id: &'a str,
    pub(crate) context: &'a RequestContext,
    pub(crate) registry: &'a WorkerRegistry,
    pub(crate) checkpoints: &'a dyn CheckpointStore,
    pub(crate) metadata: &'a dyn ProcessMetadataStore,
    pub(crate) bulk_size: usize,
    pub(crate) batch_size: usize,
    /// Checkpoint read once at the start of a resumed call
    pub(crate) snapshot: Option<DistributorIndex>,
}

impl DistributionRun<'_> {
    /// Resolve the start of `level` from the snapshot
    ///
    /// Returns `Fresh` when `use_snapshot` is off or no snapshot was loaded.
    pub(crate) fn resume_point(&self, level: &str, use_snapshot: bool) -> Result<ResumePoint> {
        let Some(index) = self.snapshot.as_ref().filter(|_| use_snapshot) else {
            return Ok(ResumePoint::Fresh);
        };

        if index.step_id != self.step.id() {
            return Err(DistributorError::WrongStep {
                expected: index.step_id.clone(),
                found: self.step.id().to_string(),
            });
        }
        if index.level != level {
            return Ok(ResumePoint::OtherLevel);
        }
        if index.level_finished {
            return Ok(ResumePoint::Finished(index.item_status.clone()));
        }

        let mut status = index.item_status.clone();
        status.remove_item(PauseOrCancelAction::Pause.as_str());
        Ok(ResumePoint::Resume {
            offset: index.offset,
            status,
            remaining: index.remaining_elements.clone(),
        })
    }

    pub(crate) fn record_empty(&self) {
        let status_on_empty = self.step.distribution().status_on_empty();
        self.step.update_responses(|responses| {
            responses.put_item_status(
                OBJECTS_LIST_EMPTY,
                ItemStatus::new(OBJECTS_LIST_EMPTY).increment(status_on_empty),
            )
        });
        info!(
            operation_id = %self.operation_id,
            step_id = %self.step.id(),
            status = %status_on_empty,
            "Distribution resolved to no element"
        );
    }

    /// Distribute an in-memory element list for one level
    ///
    /// Returns whether the resume snapshot was consumed by this level.
    pub(crate) async fn distribute_on_list(
        &self,
        level: &str,
        elements: Vec<String>,
        use_snapshot: bool,
    ) -> Result<bool> {
        if elements.is_empty() {
            self.record_empty();
            return Ok(false);
        }

        let size = elements.len();
        let mut offset = 0;
        let mut remaining_filter = Vec::new();

        match self.resume_point(level, use_snapshot)? {
            ResumePoint::OtherLevel => {
                debug!(level = %level, "Level completed before the stop, skipped");
                return Ok(false);
            }
            ResumePoint::Finished(status) => {
                self.step.set_responses(status);
                return Ok(true);
            }
            ResumePoint::Resume {
                offset: stored_offset,
                status,
                remaining,
            } => {
                offset = stored_offset.min(size);
                self.step.set_responses(status);
                remaining_filter = remaining;
                info!(
                    operation_id = %self.operation_id,
                    level = %level,
                    offset = offset,
                    remaining = remaining_filter.len(),
                    "Resuming distribution from checkpoint"
                );
            }
            ResumePoint::Fresh => {
                self.update_step(size, false).await;
            }
        }

        while offset < size {
            let next_offset = (offset + self.batch_size).min(size);
            let mut batch = elements[offset..next_offset].to_vec();
            if !remaining_filter.is_empty() {
                retain_remaining(&mut batch, &remaining_filter);
                remaining_filter.clear();
            }

            let outcome = self.run_batch(batch).await;
            if outcome.status.global_status().is_greater_or_equal_to_fatal() {
                warn!(
                    operation_id = %self.operation_id,
                    level = %level,
                    offset = offset,
                    "FATAL batch, distribution stopped at the last checkpoint"
                );
                return Ok(true);
            }

            if outcome.remaining.is_empty() {
                offset = next_offset;
            }
            let finished = offset >= size;
            self.persist_checkpoint(level, offset, &outcome, finished)
                .await?;

            if let Some(action) = outcome.interruption {
                return Err(DistributorError::PauseCancel(action));
            }
        }
        Ok(true)
    }

    /// Distribute a JSONL stream, pulling lines batch by batch
    ///
    /// The checkpoint offset counts lines, records without id included.
    pub(crate) async fn distribute_on_stream(
        &self,
        level: &str,
        lines: LineStream,
        use_snapshot: bool,
    ) -> Result<bool> {
        let mut offset = 0;
        let mut remaining_filter = Vec::new();
        let mut update_total = true;

        match self.resume_point(level, use_snapshot)? {
            ResumePoint::OtherLevel => return Ok(false),
            ResumePoint::Finished(status) => {
                self.step.set_responses(status);
                return Ok(true);
            }
            ResumePoint::Resume {
                offset: stored_offset,
                status,
                remaining,
            } => {
                offset = stored_offset;
                self.step.set_responses(status);
                remaining_filter = remaining;
                update_total = false;
            }
            ResumePoint::Fresh => {}
        }

        let mut lines = lines.skip(offset);
        let resumed = !update_total;
        let mut finished = false;
        let mut first_batch = true;

        while !finished {
            let mut batch = Vec::new();
            let mut consumed = 0;
            while consumed < self.batch_size {
                match lines.next().await {
                    Some(line) => {
                        let line = line?;
                        consumed += 1;
                        if let Some(id) = parse_json_line(&line, offset + consumed)? {
                            batch.push(id);
                        }
                    }
                    None => {
                        finished = true;
                        break;
                    }
                }
            }

            if first_batch && !resumed && finished && consumed == 0 {
                self.record_empty();
                return Ok(false);
            }
            first_batch = false;

            if update_total {
                self.update_step(batch.len(), false).await;
            }
            if !remaining_filter.is_empty() {
                retain_remaining(&mut batch, &remaining_filter);
                remaining_filter.clear();
            }

            let outcome = self.run_batch(batch).await;
            if outcome.status.global_status().is_greater_or_equal_to_fatal() {
                warn!(
                    operation_id = %self.operation_id,
                    offset = offset,
                    "FATAL batch, stream distribution stopped at the last checkpoint"
                );
                return Ok(true);
            }

            if outcome.remaining.is_empty() {
                offset += consumed;
            }
            let level_finished = finished && outcome.remaining.is_empty();
            self.persist_checkpoint(level, offset, &outcome, level_finished)
                .await?;

            if let Some(action) = outcome.interruption {
                return Err(DistributorError::PauseCancel(action));
            }
        }
        Ok(true)
    }

    /// Dispatch one batch and wait for every sub-batch
    async fn run_batch(&self, batch: Vec<String>) -> BatchOutcome {
        let tasks: Vec<Arc<WorkerTask>> = batch
            .chunks(self.bulk_size)
            .map(|chunk| {
                Arc::new(WorkerTask::new(
                    Arc::clone(&self.step),
                    self.operation_id,
                    chunk.to_vec(),
                    self.context.clone(),
                ))
            })
            .collect();

        debug!(
            operation_id = %self.operation_id,
            elements = batch.len(),
            sub_batches = tasks.len(),
            "Dispatching batch"
        );

        let results = join_all(tasks.iter().map(|task| self.prepare(Arc::clone(task)))).await;

        let mut cancelled = false;
        let mut paused = false;
        let status = self.step.update_responses(|responses| {
            for result in results {
                cancelled |= is_interruption(&result, PauseOrCancelAction::Cancel);
                paused |= is_interruption(&result, PauseOrCancelAction::Pause);
                responses.merge(result);
            }
            responses.clone()
        });

        let remaining = tasks
            .iter()
            .filter(|task| !task.is_completed())
            .flat_map(|task| task.elements().iter().cloned())
            .collect();

        let interruption = if cancelled {
            Some(PauseOrCancelAction::Cancel)
        } else if paused {
            Some(PauseOrCancelAction::Pause)
        } else {
            None
        };

        BatchOutcome {
            status,
            remaining,
            interruption,
        }
    }

    /// Submit one task to the step's family and turn every failure into a status
    async fn prepare(&self, task: Arc<WorkerTask>) -> ItemStatus {
        let family = self.step.worker_group_id();
        let pool = match self.registry.find_pool_for(family) {
            Ok(pool) => pool,
            Err(e) => {
                error!(family = %family, error = %e, "No worker family found for the step");
                return ItemStatus::new(self.step.step_name()).increment(StatusCode::Fatal);
            }
        };

        let result = match pool.submit(Arc::clone(&task)).await {
            Ok(handle) => handle.join().await,
            Err(e) => {
                error!(family = %family, error = %e, "Worker family cannot accept the task");
                return ItemStatus::new(self.step.step_name()).increment(StatusCode::Fatal);
            }
        };

        let status = match result {
            Ok(status) => status,
            Err(e) => {
                error!(task_id = %task.id(), family = %family, error = %e, "Exception while executing task");
                if let WorkerTaskError::Unreachable { worker_id } = &e {
                    if let Err(unregister_error) =
                        self.registry.unregister_worker(family, worker_id).await
                    {
                        warn!(
                            worker_id = %worker_id,
                            error = %unregister_error,
                            "Failed to unregister unreachable worker"
                        );
                    }
                }
                ItemStatus::new(WORKER_CALL_EXCEPTION).set_item_status(
                    WORKER_CALL_EXCEPTION,
                    ItemStatus::new(WORKER_CALL_EXCEPTION).increment(StatusCode::Fatal),
                )
            }
        };

        if !matches!(
            status.global_status(),
            StatusCode::Unknown | StatusCode::Fatal
        ) {
            self.update_step(task.elements().len(), true).await;
        }
        status
    }

    async fn persist_checkpoint(
        &self,
        level: &str,
        offset: usize,
        outcome: &BatchOutcome,
        level_finished: bool,
    ) -> Result<()> {
        let index = DistributorIndex::new(
            level,
            offset,
            outcome.status.clone(),
            self.context.request_id.clone(),
            self.step.id(),
            outcome.remaining.clone(),
        )
        .with_level_finished(level_finished);

        self.checkpoints
            .persist_distributor_index(DISTRIBUTOR_INDEX, self.operation_id, &index)
            .await
            .map_err(|e| {
                error!(operation_id = %self.operation_id, error = %e, "Error while persisting checkpoint");
                DistributorError::Checkpoint(e)
            })?;

        log_distribution_operation(
            "checkpoint",
            self.operation_id,
            self.step.id(),
            Some(level),
            outcome.status.global_status().as_str(),
            Some(&format!(
                "offset={offset} remaining={} level_finished={level_finished}",
                outcome.remaining.len()
            )),
        );
        Ok(())
    }

    async fn update_step(&self, delta: usize, completed: bool) {
        if let Err(e) = self
            .metadata
            .update_step(
                self.operation_id,
                self.step.id(),
                delta,
                completed,
                self.context.tenant_id,
            )
            .await
        {
            warn!(
                operation_id = %self.operation_id,
                error = %e,
                "Failed to update step progress counters"
            );
        }
    }
}

fn retain_remaining(batch: &mut Vec<String>, remaining: &[String]) {
    let remaining: HashSet<&str> = remaining.iter().map(String::as_str).collect();
    batch.retain(|element| remaining.contains(element.as_str()));
}
