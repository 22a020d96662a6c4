// SPDX-FileCopyrightText: 2026 Guiche Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Operator directory trait: resolves who sits where.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::GuicheError;
use crate::types::{OperatorId, Station};

/// Resolves an operator to the station announced on wall displays.
///
/// `Ok(None)` means the operator is unknown; errors are reserved for
/// directory transport failures.
#[async_trait]
pub trait OperatorDirectory: Send + Sync {
    async fn lookup_station(&self, operator: &OperatorId)
    -> Result<Option<Station>, GuicheError>;
}

/// Directory backed by a fixed operator-to-station table, typically the
/// `[stations]` section of the configuration file.
#[derive(Debug, Clone, Default)]
pub struct StaticDirectory {
    stations: HashMap<String, Station>,
}

impl StaticDirectory {
    pub fn new(stations: HashMap<String, Station>) -> Self {
        Self { stations }
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }
}

#[async_trait]
impl OperatorDirectory for StaticDirectory {
    async fn lookup_station(
        &self,
        operator: &OperatorId,
    ) -> Result<Option<Station>, GuicheError> {
        Ok(self.stations.get(&operator.0).cloned())
    }
}
