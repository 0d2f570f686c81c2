// consistency audit over a loaded snapshot
//
// The tracer tolerates every issue reported here (it just dead-ends), so the audit
// only reports. Callers decide whether to log, surface or refuse the data.
use std::collections::HashMap;
use std::fmt;

use crate::core::snapshot::{NetworkSnapshot, SpliceTarget};
use crate::core::types::{FiberRef, ThreadNumber};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntegrityIssue {
    /// A connector names a thread the span does not have.
    ThreadOutOfRange { element: String, connector: String, fiber: String, thread: ThreadNumber, thread_count: u32 },
    UnknownFiber { element: String, connector: String, fiber: String },
    /// Several connectors on one element claim the same thread; the tracer takes the first.
    AmbiguousMatch { element: String, fiber: String, thread: ThreadNumber, connectors: Vec<String> },
    /// A splice's outgoing side names neither a fiber nor a splitter.
    DanglingSpliceTarget { element: String, splice: String, target: String },
    /// A span endpoint names an element missing from its table.
    UnknownEndpoint { fiber: String, element: String },
}

impl fmt::Display for IntegrityIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntegrityIssue::ThreadOutOfRange { element, connector, fiber, thread, thread_count } => write!(
                f,
                "{element}/{connector}: thread {thread} exceeds the {thread_count} threads of fiber {fiber}"
            ),
            IntegrityIssue::UnknownFiber { element, connector, fiber } => {
                write!(f, "{element}/{connector}: fiber {fiber} does not exist")
            }
            IntegrityIssue::AmbiguousMatch { element, fiber, thread, connectors } => write!(
                f,
                "{element}: {} connectors claim {fiber}#{thread} ({})",
                connectors.len(),
                connectors.join(", ")
            ),
            IntegrityIssue::DanglingSpliceTarget { element, splice, target } => {
                write!(f, "{element}/{splice}: outgoing target {target} is neither a fiber nor a splitter")
            }
            IntegrityIssue::UnknownEndpoint { fiber, element } => {
                write!(f, "fiber {fiber}: endpoint {element} does not exist")
            }
        }
    }
}

fn sorted_keys<T>(map: &HashMap<String, T>) -> Vec<&String> {
    let mut keys: Vec<&String> = map.keys().collect();
    keys.sort();
    keys
}

impl NetworkSnapshot {
    pub fn audit(&self) -> Vec<IntegrityIssue> {
        let mut issues = Vec::new();

        for id in sorted_keys(&self.fibers) {
            let fiber = &self.fibers[id];
            let ends = [(fiber.origin_type, &fiber.origin_id), (fiber.destination_type, &fiber.destination_id)];
            for (kind, end) in ends {
                if let Some(kind) = kind {
                    if self.element(kind, end).is_none() {
                        issues.push(IntegrityIssue::UnknownEndpoint { fiber: id.clone(), element: end.clone() });
                    }
                }
            }
        }

        for id in sorted_keys(&self.odfs) {
            let odf = &self.odfs[id];
            let bound: Vec<(&str, FiberRef)> =
                odf.positions.iter().filter_map(|p| p.far_end().map(|r| (p.id.as_str(), r))).collect();
            self.check_bindings(id, &bound, &mut issues);
            check_ambiguous(id, &bound, &mut issues);
        }

        for id in sorted_keys(&self.muflas) {
            let mufla = &self.muflas[id];
            self.check_splices(id, &mufla.splices, &mut issues);
        }

        for id in sorted_keys(&self.cajas_nap) {
            let caja = &self.cajas_nap[id];
            let bound: Vec<(&str, FiberRef)> =
                caja.ports.iter().filter_map(|p| p.far_end().map(|r| (p.id.as_str(), r))).collect();
            self.check_bindings(id, &bound, &mut issues);
            check_ambiguous(id, &bound, &mut issues);
            self.check_splices(id, &caja.splices, &mut issues);
        }

        for id in sorted_keys(&self.splitters) {
            let splitter = &self.splitters[id];
            let mut bound: Vec<(&str, FiberRef)> = splitter
                .outputs
                .iter()
                .filter_map(|o| o.far_end().map(|r| (o.id.as_str(), r)))
                .collect();
            if let Some(input) = splitter.input() {
                bound.push(("input", input));
            }
            self.check_bindings(id, &bound, &mut issues);
        }

        issues
    }

    fn check_bindings(&self, element: &str, bound: &[(&str, FiberRef)], issues: &mut Vec<IntegrityIssue>) {
        for (connector, r) in bound {
            match self.fiber(&r.fiber_id) {
                None => issues.push(IntegrityIssue::UnknownFiber {
                    element: element.to_string(),
                    connector: connector.to_string(),
                    fiber: r.fiber_id.clone(),
                }),
                Some(f) if !f.has_thread(r.thread) => issues.push(IntegrityIssue::ThreadOutOfRange {
                    element: element.to_string(),
                    connector: connector.to_string(),
                    fiber: r.fiber_id.clone(),
                    thread: r.thread,
                    thread_count: f.thread_count,
                }),
                Some(_) => {}
            }
        }
    }

    fn check_splices(&self, element: &str, splices: &[crate::core::model::Splice], issues: &mut Vec<IntegrityIssue>) {
        let incoming: Vec<(&str, FiberRef)> =
            splices.iter().filter_map(|s| s.incoming_ref().map(|r| (s.id.as_str(), r))).collect();
        self.check_bindings(element, &incoming, issues);
        check_ambiguous(element, &incoming, issues);

        for splice in splices {
            match self.splice_target(splice) {
                SpliceTarget::Splitter(_) | SpliceTarget::Unbound => {}
                SpliceTarget::Fiber(id, thread) => {
                    if self.fiber(id).is_none() {
                        issues.push(IntegrityIssue::DanglingSpliceTarget {
                            element: element.to_string(),
                            splice: splice.id.clone(),
                            target: id.to_string(),
                        });
                    } else {
                        self.check_bindings(element, &[(splice.id.as_str(), FiberRef::new(id, thread))], issues);
                    }
                }
            }
        }
    }
}

fn check_ambiguous(element: &str, bound: &[(&str, FiberRef)], issues: &mut Vec<IntegrityIssue>) {
    let mut groups: Vec<(&FiberRef, Vec<String>)> = Vec::new();
    for (connector, r) in bound {
        match groups.iter_mut().find(|(g, _)| *g == r) {
            Some((_, members)) => members.push(connector.to_string()),
            None => groups.push((r, vec![connector.to_string()])),
        }
    }
    for (r, connectors) in groups {
        if connectors.len() > 1 {
            issues.push(IntegrityIssue::AmbiguousMatch {
                element: element.to_string(),
                fiber: r.fiber_id.clone(),
                thread: r.thread,
                connectors,
            });
        }
    }
}
