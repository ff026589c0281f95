//! Provider wire types.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use scalegate_scaling::ReplicaObservation;

/// Label carrying a function's minimum replica count.
pub const MIN_REPLICAS_LABEL: &str = "com.openfaas.scale.min";

/// Body of `GET /system/function/{name}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionStatus {
    pub name: String,
    #[serde(default)]
    pub replicas: u64,
    #[serde(default)]
    pub available_replicas: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<HashMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotations: Option<HashMap<String, String>>,
}

impl FunctionStatus {
    /// Minimum replicas from [`MIN_REPLICAS_LABEL`]; 0 when absent or not a number.
    pub fn min_replicas(&self) -> u64 {
        self.labels
            .as_ref()
            .and_then(|labels| labels.get(MIN_REPLICAS_LABEL))
            .and_then(|value| value.trim().parse().ok())
            .unwrap_or(0)
    }

    pub fn observation(&self) -> ReplicaObservation {
        ReplicaObservation::new(self.available_replicas, self.min_replicas())
    }
}

/// Body of `POST /system/scale-function/{name}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScaleServiceRequest {
    pub service_name: String,
    pub replicas: u64,
}
