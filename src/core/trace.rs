// path tracer: follow a signal from one connector through spans and splices
use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::{AmbiguityPolicy, TracerConfig};
use crate::core::model::{ElementInfo, Splice, Splitter};
use crate::core::snapshot::{NetworkSnapshot, SpliceTarget};
use crate::core::step::{EndCause, PathStep, StepKind};
use crate::core::types::{ElementId, ElementKind, FiberRef, thread_color};

/// Connector id that selects a splitter's input instead of one of its outputs.
pub const SPLITTER_INPUT: &str = "input";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceRequest {
    pub start_kind: ElementKind,
    pub start_element_id: ElementId,
    pub start_connector_id: String,
}

impl TraceRequest {
    pub fn new(kind: ElementKind, element_id: impl Into<String>, connector_id: impl Into<String>) -> Self {
        Self {
            start_kind: kind,
            start_element_id: element_id.into(),
            start_connector_id: connector_id.into(),
        }
    }
}

/// Setup failures. Everything that goes wrong once the walk has started is an `End` step instead.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TraceError {
    #[error("network snapshot not loaded")]
    SnapshotNotLoaded,
    #[error("{kind} `{id}` not found")]
    ElementNotFound { kind: ElementKind, id: String },
    #[error("connector `{connector}` not found on {kind} `{element}`")]
    ConnectorNotFound { kind: ElementKind, element: String, connector: String },
}

enum Walk<'a> {
    /// A thread is pending; `from` is the element the signal is leaving.
    Fiber { at: FiberRef, from: ElementId },
    FanOut(&'a Splitter),
    Done,
}

enum Pick<T> {
    Missing,
    Found(T),
    Ambiguous(usize),
}

/// A lazily produced trace. Each call to `next` yields one step, resolving at
/// most one fiber hop when the buffer runs dry.
pub struct Trace<'a> {
    snapshot: &'a NetworkSnapshot,
    pending: VecDeque<PathStep>,
    walk: Walk<'a>,
    hops: usize,
    max_hops: usize,
    ambiguity: AmbiguityPolicy,
}

/// Starts a trace. Fails only when the starting element or connector does not exist.
pub fn trace<'a>(
    snapshot: &'a NetworkSnapshot,
    request: &TraceRequest,
    config: &TracerConfig,
) -> Result<Trace<'a>, TraceError> {
    let mut t = Trace {
        snapshot,
        pending: VecDeque::new(),
        walk: Walk::Done,
        hops: 0,
        max_hops: config.max_hops,
        ambiguity: config.ambiguity,
    };
    t.walk = t.start(request)?;
    debug!(
        kind = %request.start_kind,
        element = %request.start_element_id,
        connector = %request.start_connector_id,
        "trace started"
    );
    Ok(t)
}

/// Runs a trace to completion.
pub fn trace_path(
    snapshot: &NetworkSnapshot,
    request: &TraceRequest,
    config: &TracerConfig,
) -> Result<Vec<PathStep>, TraceError> {
    Ok(trace(snapshot, request, config)?.collect())
}

impl NetworkSnapshot {
    pub fn trace(&self, request: &TraceRequest) -> Result<Vec<PathStep>, TraceError> {
        trace_path(self, request, &TracerConfig::default())
    }
}

impl Iterator for Trace<'_> {
    type Item = PathStep;

    fn next(&mut self) -> Option<PathStep> {
        loop {
            if let Some(step) = self.pending.pop_front() {
                return Some(step);
            }
            if matches!(self.walk, Walk::Done) {
                return None;
            }
            self.advance();
        }
    }
}

impl<'a> Trace<'a> {
    /// Number of fiber hops resolved so far.
    pub fn hops(&self) -> usize {
        self.hops
    }

    fn advance(&mut self) {
        match std::mem::replace(&mut self.walk, Walk::Done) {
            Walk::Done => {}
            Walk::FanOut(splitter) => {
                let snapshot = self.snapshot;
                self.pending.extend(snapshot.fan_out(splitter));
            }
            Walk::Fiber { at, from } => {
                if self.hops >= self.max_hops {
                    self.finish(PathStep::end(
                        EndCause::HopLimit,
                        &at.fiber_id,
                        "Hop limit",
                        format!("Trace stopped after {} hops to avoid an endless loop.", self.hops),
                    ));
                    return;
                }
                self.hops += 1;
                self.walk = self.hop(at, from);
            }
        }
    }

    fn emit(&mut self, step: PathStep) {
        self.pending.push_back(step);
    }

    fn finish(&mut self, step: PathStep) {
        match step.cause {
            Some(cause) if cause.is_fault() => {
                debug!(%cause, element = %step.element_id, hops = self.hops, "trace stopped short")
            }
            Some(cause) => debug!(%cause, element = %step.element_id, hops = self.hops, "trace ended"),
            None => {}
        }
        self.pending.push_back(step);
    }

    fn lost(&mut self, at: &FiberRef, element_id: &str) -> Walk<'a> {
        self.finish(PathStep::end(
            EndCause::ConnectionLost,
            element_id,
            "Connection lost",
            format!("No outgoing connection for thread #{} at {}.", at.thread, element_id),
        ));
        Walk::Done
    }

    fn ambiguous(&mut self, at: &FiberRef, element_id: &str, count: usize) -> Walk<'a> {
        self.finish(PathStep::end(
            EndCause::AmbiguousMatch,
            element_id,
            "Ambiguous connection",
            format!("{count} connectors at {element_id} claim thread #{} of {}.", at.thread, at.fiber_id),
        ));
        Walk::Done
    }

    // exact (fiber, thread) equality; extra candidates are a data fault
    fn pick<'s, T>(
        &self,
        element_id: &str,
        what: &str,
        at: &FiberRef,
        mut candidates: impl Iterator<Item = &'s T>,
    ) -> Pick<&'s T> {
        let Some(first) = candidates.next() else {
            return Pick::Missing;
        };
        let extra = candidates.count();
        if extra == 0 {
            return Pick::Found(first);
        }
        match self.ambiguity {
            AmbiguityPolicy::FirstMatch => {
                warn!(element = element_id, %at, candidates = extra + 1, "several {}s match, using the first", what);
                Pick::Found(first)
            }
            AmbiguityPolicy::Reject => Pick::Ambiguous(extra + 1),
        }
    }

    fn start(&mut self, req: &TraceRequest) -> Result<Walk<'a>, TraceError> {
        let snapshot = self.snapshot;
        let element = snapshot
            .element(req.start_kind, &req.start_element_id)
            .ok_or_else(|| TraceError::ElementNotFound {
                kind: req.start_kind,
                id: req.start_element_id.clone(),
            })?;
        let connector = req.start_connector_id.as_str();
        let not_found = || TraceError::ConnectorNotFound {
            kind: req.start_kind,
            element: req.start_element_id.clone(),
            connector: connector.to_string(),
        };

        use crate::core::model::TerminalElement as E;
        let walk = match element {
            E::Odf(odf) => {
                let p = odf.positions.iter().find(|p| p.id == connector).ok_or_else(not_found)?;
                let label = format!("Position {}", p.position_number);
                self.emit(
                    PathStep::new(StepKind::Odf, &odf.info.id, odf.info.display_name(), format!("Start at {label}"))
                        .with_status(p.status),
                );
                self.walk_from(p.far_end(), &odf.info.id, &p.id, &label)
            }
            E::Mufla(m) => {
                let s = m.splices.iter().find(|s| s.id == connector).ok_or_else(not_found)?;
                self.start_from_splice(ElementKind::Mufla, &m.info, s)
            }
            E::CajaNap(caja) => {
                if let Some(p) = caja.ports.iter().find(|p| p.id == connector) {
                    let label = format!("Port {}", p.port_number);
                    let name = caja.info.display_name();
                    self.emit(
                        PathStep::new(StepKind::CajaNap, &caja.info.id, name, format!("Start at {label}"))
                            .with_status(p.status),
                    );
                    self.walk_from(p.far_end(), &caja.info.id, &p.id, &label)
                } else {
                    let s = caja.splices.iter().find(|s| s.id == connector).ok_or_else(not_found)?;
                    self.start_from_splice(ElementKind::CajaNap, &caja.info, s)
                }
            }
            E::Splitter(sp) => {
                if let Some(o) = sp.outputs.iter().find(|o| o.id == connector) {
                    let label = format!("Output {}", o.output_number);
                    let name = sp.info.display_name();
                    self.emit(
                        PathStep::new(StepKind::Splitter, &sp.info.id, name, format!("Start at {label}"))
                            .with_status(o.status),
                    );
                    self.walk_from(o.far_end(), &sp.info.id, &o.id, &label)
                } else if connector == SPLITTER_INPUT || connector == sp.info.id {
                    Walk::FanOut(sp)
                } else {
                    return Err(not_found());
                }
            }
        };
        Ok(walk)
    }

    fn walk_from(&mut self, far: Option<FiberRef>, element_id: &str, connector_id: &str, label: &str) -> Walk<'a> {
        match far {
            Some(at) => Walk::Fiber { at, from: element_id.to_string() },
            None => {
                self.finish(PathStep::end(
                    EndCause::Unconnected,
                    connector_id,
                    "Not connected",
                    format!("{label} has no fiber bound."),
                ));
                Walk::Done
            }
        }
    }

    fn start_from_splice(&mut self, kind: ElementKind, info: &'a ElementInfo, splice: &'a Splice) -> Walk<'a> {
        let toward = self.splice_destination_name(splice);
        self.emit(
            PathStep::new(
                kind.into(),
                &info.id,
                info.display_name(),
                format!(
                    "Start from splice (tray {}, splice {}) toward {}",
                    splice.tray_number, splice.splice_number, toward
                ),
            )
            .with_status(info.state),
        );
        self.continue_through(info, splice)
    }

    fn splice_destination_name(&self, splice: &Splice) -> String {
        match self.snapshot.splice_target(splice) {
            SpliceTarget::Splitter(sp) => format!("Splitter: {}", sp.info.display_name()),
            SpliceTarget::Fiber(id, _) => match self.snapshot.fiber(id) {
                Some(f) => f.display_name().to_string(),
                None => id.to_string(),
            },
            SpliceTarget::Unbound => "nothing".to_string(),
        }
    }

    // where the walk goes after a splice step has been emitted
    fn continue_through(&mut self, info: &ElementInfo, splice: &'a Splice) -> Walk<'a> {
        let snapshot = self.snapshot;
        match snapshot.splice_target(splice) {
            SpliceTarget::Splitter(sp) => Walk::FanOut(sp),
            SpliceTarget::Fiber(id, thread) => Walk::Fiber { at: FiberRef::new(id, thread), from: info.id.clone() },
            SpliceTarget::Unbound => {
                self.finish(PathStep::end(
                    EndCause::ConnectionLost,
                    &splice.id,
                    "Connection lost",
                    format!(
                        "Splice (tray {}, splice {}) at {} has no outgoing fiber.",
                        splice.tray_number, splice.splice_number, info.id
                    ),
                ));
                Walk::Done
            }
        }
    }

    fn hop(&mut self, at: FiberRef, from: ElementId) -> Walk<'a> {
        let snapshot = self.snapshot;

        let Some(fiber) = snapshot.fiber(&at.fiber_id) else {
            self.finish(PathStep::end(
                EndCause::FiberNotFound,
                &at.fiber_id,
                "Unknown fiber",
                format!("Thread #{} is lost in span {} (fiber not found).", at.thread, at.fiber_id),
            ));
            return Walk::Done;
        };

        let color = thread_color(at.thread).unwrap_or("uncoloured");
        let mut details = format!("Using thread #{} ({color}), {} m", at.thread, fiber.distance);
        if !fiber.has_thread(at.thread) {
            debug!(fiber = %fiber.id, thread = at.thread, thread_count = fiber.thread_count, "thread out of range");
            details.push_str(&format!(" (span has only {} threads)", fiber.thread_count));
        }
        self.emit(
            PathStep::new(StepKind::Fiber, &fiber.id, fiber.display_name(), details).with_status(fiber.state),
        );

        if !fiber.state.is_active() {
            self.finish(PathStep::end(
                EndCause::FiberNotActive(fiber.state),
                &fiber.id,
                "End of trace",
                format!("Fiber is in state \"{}\".", fiber.state),
            ));
            return Walk::Done;
        }

        let (kind, next_id) = fiber.far_end_from(&from);
        let Some(next) = kind.and_then(|k| snapshot.element(k, next_id)) else {
            return self.lost(&at, next_id);
        };

        use crate::core::model::TerminalElement as E;
        match next {
            E::Mufla(m) => {
                match self.pick(&m.info.id, "splice", &at, m.splices.iter().filter(|s| s.matches_incoming(&at))) {
                    Pick::Found(s) => {
                        self.emit_splice_step(ElementKind::Mufla, &m.info, s);
                        self.continue_through(&m.info, s)
                    }
                    Pick::Ambiguous(n) => self.ambiguous(&at, &m.info.id, n),
                    Pick::Missing => self.lost(&at, &m.info.id),
                }
            }
            E::CajaNap(caja) => {
                match self.pick(&caja.info.id, "splice", &at, caja.splices.iter().filter(|s| s.matches_incoming(&at))) {
                    Pick::Found(s) => {
                        self.emit_splice_step(ElementKind::CajaNap, &caja.info, s);
                        return self.continue_through(&caja.info, s);
                    }
                    Pick::Ambiguous(n) => return self.ambiguous(&at, &caja.info.id, n),
                    Pick::Missing => {}
                }
                let ports = caja.ports.iter().filter(|p| p.far_end().as_ref() == Some(&at));
                match self.pick(&caja.info.id, "port", &at, ports) {
                    Pick::Found(p) => {
                        self.emit(
                            PathStep::new(
                                StepKind::CajaNap,
                                &caja.info.id,
                                caja.info.display_name(),
                                format!("Ends at Port {}", p.port_number),
                            )
                            .with_status(p.status),
                        );
                        self.delivered(&p.id, p.service_name.as_deref())
                    }
                    Pick::Ambiguous(n) => self.ambiguous(&at, &caja.info.id, n),
                    Pick::Missing => self.lost(&at, &caja.info.id),
                }
            }
            E::Odf(odf) => {
                let positions = odf.positions.iter().filter(|p| p.far_end().as_ref() == Some(&at));
                match self.pick(&odf.info.id, "position", &at, positions) {
                    Pick::Found(p) => {
                        self.emit(
                            PathStep::new(
                                StepKind::Odf,
                                &odf.info.id,
                                odf.info.display_name(),
                                format!("Ends at Position {}", p.position_number),
                            )
                            .with_status(p.status),
                        );
                        self.delivered(&p.id, p.service_name.as_deref())
                    }
                    Pick::Ambiguous(n) => self.ambiguous(&at, &odf.info.id, n),
                    Pick::Missing => self.lost(&at, &odf.info.id),
                }
            }
            E::Splitter(sp) => match sp.input() {
                Some(input) if input == at => Walk::FanOut(sp),
                _ => self.lost(&at, &sp.info.id),
            },
        }
    }

    fn emit_splice_step(&mut self, kind: ElementKind, info: &ElementInfo, splice: &Splice) {
        let toward = self.splice_destination_name(splice);
        let details = match kind {
            ElementKind::CajaNap => format!(
                "Pass-through splice at tray {}, splice {} toward {}",
                splice.tray_number, splice.splice_number, toward
            ),
            _ => format!(
                "Splice at tray {}, splice {} toward {}",
                splice.tray_number, splice.splice_number, toward
            ),
        };
        self.emit(PathStep::new(kind.into(), &info.id, info.display_name(), details).with_status(info.state));
    }

    fn delivered(&mut self, connector_id: &str, service: Option<&str>) -> Walk<'a> {
        self.finish(PathStep::end(
            EndCause::Delivered,
            connector_id,
            "Terminal point",
            format!("Service: {}", service.unwrap_or("N/A")),
        ));
        Walk::Done
    }
}
