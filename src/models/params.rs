//! Routing context and the step description sent to a worker.

use serde::{Deserialize, Serialize};

use super::step::StepDescriptor;

/// Tenant and request identifiers a worker call is made on behalf of
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestContext {
    pub tenant_id: i32,
    pub request_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_id: Option<String>,
}

impl RequestContext {
    pub fn new(tenant_id: i32, request_id: impl Into<String>) -> Self {
        Self {
            tenant_id,
            request_id: request_id.into(),
            contract_id: None,
            context_id: None,
        }
    }

    pub fn with_contract_id(mut self, contract_id: impl Into<String>) -> Self {
        self.contract_id = Some(contract_id.into());
        self
    }

    pub fn with_context_id(mut self, context_id: impl Into<String>) -> Self {
        self.context_id = Some(context_id.into());
        self
    }
}

/// Parameters of one worker call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerParameters {
    /// Operation id the elements belong to
    pub container_name: String,
    pub object_name_list: Vec<String>,
    pub current_step: String,
    pub step_unique_id: String,
    #[serde(flatten)]
    pub context: RequestContext,
}

/// Payload of `WorkerClient::submit_step`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DescriptionStep {
    pub step: StepDescriptor,
    pub work_params: WorkerParameters,
}

impl DescriptionStep {
    pub fn object_names(&self) -> &[String] {
        &self.work_params.object_name_list
    }
}
