// ids, kinds and far-end references
use std::fmt;

use serde::{Deserialize, Serialize};

pub type ElementId = String;
pub type FiberId = String;
pub type ConnectorId = String;

/// Thread numbers are 1-based; valid range for a span is `1..=thread_count`.
pub type ThreadNumber = u32;

/// The four kinds of terminal element a fiber span can land on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ElementKind {
    Odf,
    Mufla,
    CajaNap,
    Splitter,
}

impl ElementKind {
    pub fn label(self) -> &'static str {
        match self {
            ElementKind::Odf => "ODF",
            ElementKind::Mufla => "Mufla",
            ElementKind::CajaNap => "Caja NAP",
            ElementKind::Splitter => "Splitter",
        }
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A `(fiber, thread)` pair: one strand inside one span.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FiberRef {
    pub fiber_id: FiberId,
    pub thread: ThreadNumber,
}

impl FiberRef {
    pub fn new(fiber_id: impl Into<FiberId>, thread: ThreadNumber) -> Self {
        Self { fiber_id: fiber_id.into(), thread }
    }

    /// Builds a reference from the two optional document fields.
    /// Both must be present and the thread must be non-zero.
    pub fn from_parts(fiber_id: Option<&str>, thread: Option<ThreadNumber>) -> Option<Self> {
        match (fiber_id, thread) {
            (Some(id), Some(t)) if !id.is_empty() && t > 0 => Some(Self::new(id, t)),
            _ => None,
        }
    }

    pub fn matches(&self, fiber_id: &str, thread: ThreadNumber) -> bool {
        self.fiber_id == fiber_id && self.thread == thread
    }
}

impl fmt::Display for FiberRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.fiber_id, self.thread)
    }
}

const THREAD_COLORS: [&str; 12] = [
    "blue", "orange", "green", "brown", "slate", "white", "red", "black", "yellow", "violet",
    "rose", "aqua",
];

/// Standard 12-colour code; thread 13 wraps back to blue.
pub fn thread_color(thread: ThreadNumber) -> Option<&'static str> {
    if thread == 0 {
        return None;
    }
    Some(THREAD_COLORS[((thread - 1) % 12) as usize])
}
