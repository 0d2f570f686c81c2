// path steps: what a trace emits, in traversal order
use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::state::{OperationalState, StepStatus};
use crate::core::types::ElementKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StepKind {
    Odf,
    Fiber,
    Mufla,
    Splitter,
    CajaNap,
    End,
}

impl From<ElementKind> for StepKind {
    fn from(kind: ElementKind) -> Self {
        match kind {
            ElementKind::Odf => StepKind::Odf,
            ElementKind::Mufla => StepKind::Mufla,
            ElementKind::CajaNap => StepKind::CajaNap,
            ElementKind::Splitter => StepKind::Splitter,
        }
    }
}

/// Why a branch of the trace stopped. Only `End` steps carry one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EndCause {
    /// Reached a client port/position with its bound service.
    Delivered,
    /// One per splitter output after a fan-out.
    SplitterOutput,
    /// The splitter has no outputs at all.
    NoOutputs,
    /// The starting connector has no far-end binding.
    Unconnected,
    FiberNotFound,
    FiberNotActive(OperationalState),
    ConnectionLost,
    AmbiguousMatch,
    HopLimit,
}

impl EndCause {
    /// True for the causes that describe a fault rather than a normal terminus.
    pub fn is_fault(self) -> bool {
        !matches!(self, EndCause::Delivered | EndCause::SplitterOutput)
    }
}

impl fmt::Display for EndCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EndCause::Delivered => f.write_str("delivered"),
            EndCause::SplitterOutput => f.write_str("splitter output"),
            EndCause::NoOutputs => f.write_str("splitter has no outputs"),
            EndCause::Unconnected => f.write_str("connector not connected"),
            EndCause::FiberNotFound => f.write_str("fiber not found"),
            EndCause::FiberNotActive(state) => write!(f, "fiber is {state}"),
            EndCause::ConnectionLost => f.write_str("connection lost"),
            EndCause::AmbiguousMatch => f.write_str("ambiguous connection"),
            EndCause::HopLimit => f.write_str("hop limit reached"),
        }
    }
}

/// One entry on the reconstructed circuit path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathStep {
    pub kind: StepKind,
    pub element_id: String,
    pub element_name: String,
    pub details: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<StepStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cause: Option<EndCause>,
}

impl PathStep {
    pub fn new(
        kind: StepKind,
        element_id: impl Into<String>,
        element_name: impl Into<String>,
        details: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            element_id: element_id.into(),
            element_name: element_name.into(),
            details: details.into(),
            status: None,
            cause: None,
        }
    }

    pub fn end(
        cause: EndCause,
        element_id: impl Into<String>,
        element_name: impl Into<String>,
        details: impl Into<String>,
    ) -> Self {
        let mut step = Self::new(StepKind::End, element_id, element_name, details);
        step.cause = Some(cause);
        step
    }

    pub fn with_status(mut self, status: impl Into<StepStatus>) -> Self {
        self.status = Some(status.into());
        self
    }

    pub fn is_end(&self) -> bool {
        self.kind == StepKind::End
    }
}

/// Ids a map view should highlight for a finished trace.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Highlight {
    pub fibers: BTreeSet<String>,
    pub elements: BTreeSet<String>,
}

impl Highlight {
    pub fn from_steps(start_element: &str, steps: &[PathStep]) -> Self {
        let mut h = Highlight::default();
        h.elements.insert(start_element.to_string());

        for step in steps {
            match step.kind {
                StepKind::Fiber => {
                    h.fibers.insert(step.element_id.clone());
                }
                StepKind::End => {}
                _ => {
                    h.elements.insert(step.element_id.clone());
                }
            }
        }
        h
    }
}
