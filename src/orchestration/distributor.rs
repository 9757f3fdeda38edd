//! # Process Distributor
//!
//! Entry point of a step execution: resolves the step's elements, drives the
//! checkpointed batch loop for every level and returns the aggregated step
//! status. `distribute` never fails; errors are folded into a FATAL status.
//!
//! Pause and cancel are cooperative: they flip the action of the running step
//! and only affect worker tasks that have not started yet. The batch in flight
//! is still checkpointed before `distribute` returns.

use dashmap::DashMap;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

use super::batch::DistributionRun;
use super::elements::{parse_chained_file, parse_file_listing, parse_levels};
use crate::client::{CheckpointStore, ElementSource, ProcessMetadataStore};
use crate::config::{ConfigManager, DistributorConfig};
use crate::constants::{DISTRIBUTOR_INDEX, NOLEVEL};
use crate::error::{DistributorError, Result};
use crate::logging::log_distribution_operation;
use crate::models::{
    DistributionKind, DistributorIndex, ItemStatus, PauseOrCancelAction, PauseRecover,
    RequestContext, StatusCode, Step,
};
use crate::registry::WorkerRegistry;

pub struct ProcessDistributor {
    config: DistributorConfig,
    registry: Arc<WorkerRegistry>,
    checkpoints: Arc<dyn CheckpointStore>,
    metadata: Arc<dyn ProcessMetadataStore>,
    source: Arc<dyn ElementSource>,
    /// Steps currently being distributed, by operation id
    current_steps: DashMap<String, Arc<Step>>,
}

impl std::fmt::Debug for ProcessDistributor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessDistributor")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .field("running_operations", &self.current_steps.len())
            .finish()
    }
}

impl ProcessDistributor {
    pub fn new(
        config: &ConfigManager,
        registry: Arc<WorkerRegistry>,
        checkpoints: Arc<dyn CheckpointStore>,
        metadata: Arc<dyn ProcessMetadataStore>,
        source: Arc<dyn ElementSource>,
    ) -> Self {
        Self {
            config: config.config().clone(),
            registry,
            checkpoints,
            metadata,
            source,
            current_steps: DashMap::new(),
        }
    }

    pub fn registry(&self) -> &Arc<WorkerRegistry> {
        &self.registry
    }

    /// Distribute `step` over its elements and return the step status
    ///
    /// The stored checkpoint of `operation_id` is honoured only when
    /// `pause_recover` is not `NoRecover` and the step action is `Recover`.
    /// On every exit except pause and cancel the step action ends as
    /// `Complete`.
    #[instrument(
        skip(self, context, step),
        fields(step_id = %step.id(), step_name = %step.step_name())
    )]
    pub async fn distribute(
        &self,
        context: &RequestContext,
        step: Arc<Step>,
        operation_id: &str,
        pause_recover: PauseRecover,
    ) -> ItemStatus {
        let use_snapshot = pause_recover != PauseRecover::NoRecover
            && step.action() == PauseOrCancelAction::Recover;
        step.set_responses(ItemStatus::new(step.step_name()));

        log_distribution_operation(
            "distribute",
            operation_id,
            step.id(),
            None,
            "STARTED",
            Some(step.distribution().kind().name()),
        );

        self.current_steps
            .insert(operation_id.to_string(), Arc::clone(&step));
        let result = self
            .distribute_step(context, &step, operation_id, use_snapshot)
            .await;
        self.current_steps.remove(operation_id);

        match result {
            Ok(()) => {}
            Err(DistributorError::PauseCancel(action)) => {
                let responses = step.responses();
                log_distribution_operation(
                    "distribute",
                    operation_id,
                    step.id(),
                    None,
                    action.as_str(),
                    Some(&responses.status_meter_message()),
                );
                return responses;
            }
            Err(e) if e.is_configuration() => {
                error!(operation_id = %operation_id, error = %e, "Configuration error, distribution aborted");
                step.update_responses(|responses| responses.record(StatusCode::Fatal, 1));
            }
            Err(e) => {
                error!(operation_id = %operation_id, error = %e, "Exception while distributing step");
                step.update_responses(|responses| responses.record(StatusCode::Fatal, 1));
            }
        }

        step.set_action(PauseOrCancelAction::Complete);
        let responses = step.responses();
        log_distribution_operation(
            "distribute",
            operation_id,
            step.id(),
            None,
            responses.global_status().as_str(),
            Some(&responses.status_meter_message()),
        );
        responses
    }

    async fn distribute_step(
        &self,
        context: &RequestContext,
        step: &Arc<Step>,
        operation_id: &str,
        use_snapshot: bool,
    ) -> Result<()> {
        let distribution = step.distribution();
        distribution.validate()?;

        let snapshot = if use_snapshot {
            Some(self.load_snapshot(operation_id).await?)
        } else {
            None
        };

        let bulk_size = distribution
            .bulk_size()
            .unwrap_or(self.config.worker_bulk_size);
        let run = DistributionRun {
            step: Arc::clone(step),
            operation_id,
            context,
            registry: self.registry.as_ref(),
            checkpoints: self.checkpoints.as_ref(),
            metadata: self.metadata.as_ref(),
            bulk_size,
            batch_size: self.config.distributor_batch_size * bulk_size,
            snapshot,
        };

        match distribution.kind() {
            DistributionKind::Single { element } => {
                let element = element
                    .as_deref()
                    .map(str::trim)
                    .filter(|e| !e.is_empty())
                    .unwrap_or(operation_id);
                run.distribute_on_list(NOLEVEL, vec![element.to_string()], use_snapshot)
                    .await?;
            }
            DistributionKind::DirectoryListing { element } => {
                let elements = self.source.list_directory(operation_id, element).await?;
                run.distribute_on_list(NOLEVEL, elements, use_snapshot)
                    .await?;
            }
            DistributionKind::FileListing { element } => {
                let bytes = self.source.read_blob(operation_id, element).await?;
                run.distribute_on_list(NOLEVEL, parse_file_listing(&bytes)?, use_snapshot)
                    .await?;
            }
            DistributionKind::MultiLevelFile { element } => {
                let bytes = self.source.read_blob(operation_id, element).await?;
                let levels = parse_levels(&bytes)?;
                self.distribute_levels(&run, levels, use_snapshot).await?;
            }
            DistributionKind::LinkedFiles { element } => {
                self.distribute_linked_files(&run, element, use_snapshot)
                    .await?;
            }
            DistributionKind::JsonlStream { element } => {
                let lines = self.source.read_lines(operation_id, element).await?;
                run.distribute_on_stream(NOLEVEL, lines, use_snapshot)
                    .await?;
            }
        }
        Ok(())
    }

    async fn load_snapshot(&self, operation_id: &str) -> Result<DistributorIndex> {
        self.checkpoints
            .get_distributor_index(DISTRIBUTOR_INDEX, operation_id)
            .await?
            .ok_or_else(|| DistributorError::CheckpointNotFound(operation_id.to_string()))
    }

    /// Levels run strictly in order; empty levels are skipped
    async fn distribute_levels(
        &self,
        run: &DistributionRun<'_>,
        levels: Vec<(String, Vec<String>)>,
        mut use_snapshot: bool,
    ) -> Result<()> {
        let mut any_element = false;
        for (level, elements) in levels {
            if elements.is_empty() {
                continue;
            }
            any_element = true;

            let consumed = run
                .distribute_on_list(&level, elements, use_snapshot)
                .await?;
            // only the first level matching the snapshot may reuse it
            if use_snapshot && consumed {
                use_snapshot = false;
            }
            if run.step.responses().global_status().is_greater_or_equal_to_fatal() {
                warn!(level = %level, "FATAL level, remaining levels not distributed");
                break;
            }
        }
        if !any_element {
            run.record_empty();
        }
        Ok(())
    }

    /// Walk the page chain with an explicit cursor; each page is a level
    async fn distribute_linked_files(
        &self,
        run: &DistributionRun<'_>,
        first_page: &str,
        mut use_snapshot: bool,
    ) -> Result<()> {
        let mut current = Some(first_page.to_string());
        let mut any_element = false;

        while let Some(page_name) = current.take() {
            let bytes = self.source.read_blob(run.operation_id, &page_name).await?;
            let page = parse_chained_file(&bytes)?;
            let elements = page.element_ids();

            if !elements.is_empty() {
                any_element = true;
                let consumed = run
                    .distribute_on_list(&page_name, elements, use_snapshot)
                    .await?;
                if use_snapshot && consumed {
                    use_snapshot = false;
                }
                if run.step.responses().global_status().is_greater_or_equal_to_fatal() {
                    warn!(page = %page_name, "FATAL page, remaining pages not distributed");
                    break;
                }
            }

            current = page.next_file.filter(|next| !next.trim().is_empty());
        }

        if !any_element {
            run.record_empty();
        }
        Ok(())
    }

    /// Request a pause of the step running under `operation_id`
    ///
    /// Returns `false` when no step is running for that operation.
    pub fn pause(&self, operation_id: &str) -> bool {
        self.signal(operation_id, PauseOrCancelAction::Pause)
    }

    /// Request a cancel of the step running under `operation_id`
    pub fn cancel(&self, operation_id: &str) -> bool {
        self.signal(operation_id, PauseOrCancelAction::Cancel)
    }

    fn signal(&self, operation_id: &str, action: PauseOrCancelAction) -> bool {
        match self.current_steps.get(operation_id) {
            Some(step) => {
                step.set_action(action);
                info!(operation_id = %operation_id, step_id = %step.id(), action = %action, "Step action requested");
                true
            }
            None => false,
        }
    }

    /// Whether a step is being distributed for `operation_id`
    pub fn is_running(&self, operation_id: &str) -> bool {
        self.current_steps.contains_key(operation_id)
    }
}
