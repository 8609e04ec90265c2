//! Model catalog response types.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::catalog::ModelEntry;

/// One selectable model in the `GET /v1/models` listing.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ModelInfo {
    pub id: String,
    pub name: String,
    pub provider: String,
}

impl From<&ModelEntry> for ModelInfo {
    fn from(m: &ModelEntry) -> Self {
        Self {
            id: m.id.to_owned(),
            name: m.name.to_owned(),
            provider: m.provider.to_owned(),
        }
    }
}
