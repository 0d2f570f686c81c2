// operational and connector states
use std::fmt;

use serde::{Deserialize, Serialize};

/// Operational state of a terminal element or fiber span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum OperationalState {
    #[default]
    Activo,
    Inactivo,
    Corte,
}

impl OperationalState {
    pub fn is_active(self) -> bool {
        matches!(self, OperationalState::Activo)
    }
}

impl fmt::Display for OperationalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OperationalState::Activo => "Activo",
            OperationalState::Inactivo => "Inactivo",
            OperationalState::Corte => "Corte",
        })
    }
}

/// Occupancy of a single connector slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ConnectorStatus {
    #[default]
    Libre,
    Ocupado,
    Reservado,
    #[serde(rename = "Dañado", alias = "Danado")]
    Danado,
}

impl fmt::Display for ConnectorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ConnectorStatus::Libre => "Libre",
            ConnectorStatus::Ocupado => "Ocupado",
            ConnectorStatus::Reservado => "Reservado",
            ConnectorStatus::Danado => "Dañado",
        })
    }
}

/// The status badge attached to a path step: either the element/span state
/// or the state of the connector the step refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StepStatus {
    Operational(OperationalState),
    Connector(ConnectorStatus),
}

impl From<OperationalState> for StepStatus {
    fn from(s: OperationalState) -> Self {
        StepStatus::Operational(s)
    }
}

impl From<ConnectorStatus> for StepStatus {
    fn from(s: ConnectorStatus) -> Self {
        StepStatus::Connector(s)
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepStatus::Operational(s) => s.fmt(f),
            StepStatus::Connector(s) => s.fmt(f),
        }
    }
}
