use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Status an instance reports to the registry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InstanceStatus {
    #[default]
    Up,
    Down,
    Starting,
    OutOfService,
    #[serde(other)]
    Unknown,
}
