// inventory entities: terminal elements, their connectors, and fiber spans
use serde::{Deserialize, Deserializer, Serialize};

use crate::core::state::{ConnectorStatus, OperationalState};
use crate::core::types::{ConnectorId, ElementId, ElementKind, FiberId, FiberRef, ThreadNumber};

/// Attributes shared by every terminal element.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementInfo {
    #[serde(default)]
    pub id: ElementId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub capacity: u32,
    #[serde(default, rename = "estado")]
    pub state: OperationalState,
}

impl ElementInfo {
    pub fn new(id: impl Into<ElementId>, name: impl Into<String>) -> Self {
        Self { id: id.into(), name: name.into(), ..Self::default() }
    }

    pub fn display_name(&self) -> &str {
        if self.name.is_empty() { &self.id } else { &self.name }
    }
}

/// Client-facing port on an ODF.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OdfPosition {
    #[serde(default)]
    pub id: ConnectorId,
    pub position_number: u32,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub status: ConnectorStatus,
    #[serde(default)]
    pub service_name: Option<String>,
    #[serde(default)]
    pub fiber_trunk_id: Option<FiberId>,
    #[serde(default)]
    pub fiber_thread_number: Option<ThreadNumber>,
    #[serde(default)]
    pub destination_label: Option<String>,
}

impl OdfPosition {
    pub fn new(id: impl Into<ConnectorId>, position_number: u32) -> Self {
        Self { id: id.into(), position_number, ..Self::default() }
    }

    pub fn bound_to(mut self, fiber_id: impl Into<FiberId>, thread: ThreadNumber) -> Self {
        self.fiber_trunk_id = Some(fiber_id.into());
        self.fiber_thread_number = Some(thread);
        self.status = ConnectorStatus::Ocupado;
        self
    }

    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        self.service_name = Some(service.into());
        self
    }

    pub fn far_end(&self) -> Option<FiberRef> {
        FiberRef::from_parts(self.fiber_trunk_id.as_deref(), self.fiber_thread_number)
    }
}

/// Client-facing port on an access box.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CajaNapPort {
    #[serde(default)]
    pub id: ConnectorId,
    pub port_number: u32,
    #[serde(default)]
    pub status: ConnectorStatus,
    #[serde(default)]
    pub service_name: Option<String>,
    /// dBm
    #[serde(default)]
    pub output_power: Option<f64>,
    #[serde(default)]
    pub fiber_trunk_id: Option<FiberId>,
    #[serde(default)]
    pub fiber_thread_number: Option<ThreadNumber>,
}

impl CajaNapPort {
    pub fn new(id: impl Into<ConnectorId>, port_number: u32) -> Self {
        Self { id: id.into(), port_number, ..Self::default() }
    }

    pub fn bound_to(mut self, fiber_id: impl Into<FiberId>, thread: ThreadNumber) -> Self {
        self.fiber_trunk_id = Some(fiber_id.into());
        self.fiber_thread_number = Some(thread);
        self.status = ConnectorStatus::Ocupado;
        self
    }

    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        self.service_name = Some(service.into());
        self
    }

    pub fn far_end(&self) -> Option<FiberRef> {
        FiberRef::from_parts(self.fiber_trunk_id.as_deref(), self.fiber_thread_number)
    }
}

/// Fixed joint inside a mufla or access box.
///
/// `out_fiber_id` names either a fiber span or, by convention, a splitter
/// (whose input is then implicitly thread 1). Use
/// [`NetworkSnapshot::splice_target`](crate::core::snapshot::NetworkSnapshot::splice_target)
/// to tell the two apart.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Splice {
    #[serde(default)]
    pub id: ConnectorId,
    #[serde(default)]
    pub tray_number: u32,
    #[serde(default)]
    pub splice_number: u32,
    #[serde(default)]
    pub in_fiber_id: FiberId,
    #[serde(default)]
    pub in_fiber_thread: ThreadNumber,
    #[serde(default)]
    pub out_fiber_id: String,
    #[serde(default)]
    pub out_fiber_thread: ThreadNumber,
    #[serde(default)]
    pub notes: Option<String>,
}

impl Splice {
    pub fn new(id: impl Into<ConnectorId>, tray_number: u32, splice_number: u32) -> Self {
        Self { id: id.into(), tray_number, splice_number, ..Self::default() }
    }

    pub fn incoming(mut self, fiber_id: impl Into<FiberId>, thread: ThreadNumber) -> Self {
        self.in_fiber_id = fiber_id.into();
        self.in_fiber_thread = thread;
        self
    }

    pub fn outgoing(mut self, fiber_id: impl Into<FiberId>, thread: ThreadNumber) -> Self {
        self.out_fiber_id = fiber_id.into();
        self.out_fiber_thread = thread;
        self
    }

    pub fn into_splitter(mut self, splitter_id: impl Into<ElementId>) -> Self {
        self.out_fiber_id = splitter_id.into();
        self.out_fiber_thread = 1;
        self
    }

    pub fn matches_incoming(&self, at: &FiberRef) -> bool {
        at.matches(&self.in_fiber_id, self.in_fiber_thread)
    }

    pub fn incoming_ref(&self) -> Option<FiberRef> {
        FiberRef::from_parts(Some(&self.in_fiber_id), Some(self.in_fiber_thread))
    }
}

/// One of the N outputs of a passive splitter.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitterOutput {
    #[serde(default)]
    pub id: ConnectorId,
    pub output_number: u32,
    #[serde(default)]
    pub status: ConnectorStatus,
    #[serde(default)]
    pub service_name: Option<String>,
    #[serde(default)]
    pub fiber_trunk_id: Option<FiberId>,
    #[serde(default)]
    pub fiber_thread_number: Option<ThreadNumber>,
    #[serde(default)]
    pub destination_label: Option<String>,
}

impl SplitterOutput {
    pub fn new(id: impl Into<ConnectorId>, output_number: u32) -> Self {
        Self { id: id.into(), output_number, ..Self::default() }
    }

    pub fn bound_to(mut self, fiber_id: impl Into<FiberId>, thread: ThreadNumber) -> Self {
        self.fiber_trunk_id = Some(fiber_id.into());
        self.fiber_thread_number = Some(thread);
        self.status = ConnectorStatus::Ocupado;
        self
    }

    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        self.service_name = Some(service.into());
        self.status = ConnectorStatus::Ocupado;
        self
    }

    pub fn far_end(&self) -> Option<FiberRef> {
        FiberRef::from_parts(self.fiber_trunk_id.as_deref(), self.fiber_thread_number)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Odf {
    #[serde(flatten)]
    pub info: ElementInfo,
    #[serde(skip)]
    pub positions: Vec<OdfPosition>,
}

impl Odf {
    pub fn new(id: impl Into<ElementId>, name: impl Into<String>) -> Self {
        Self { info: ElementInfo::new(id, name), positions: Vec::new() }
    }

    pub fn with_position(mut self, position: OdfPosition) -> Self {
        self.positions.push(position);
        self
    }
}

/// Splice enclosure.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Mufla {
    #[serde(flatten)]
    pub info: ElementInfo,
    #[serde(skip)]
    pub splices: Vec<Splice>,
}

impl Mufla {
    pub fn new(id: impl Into<ElementId>, name: impl Into<String>) -> Self {
        Self { info: ElementInfo::new(id, name), splices: Vec::new() }
    }

    pub fn with_splice(mut self, splice: Splice) -> Self {
        self.splices.push(splice);
        self
    }
}

/// Access box: client ports plus pass-through splices.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CajaNap {
    #[serde(flatten)]
    pub info: ElementInfo,
    #[serde(default)]
    pub function_type: Option<String>,
    #[serde(default)]
    pub in_fiber_id: Option<FiberId>,
    #[serde(default)]
    pub in_fiber_thread: Option<ThreadNumber>,
    #[serde(skip)]
    pub ports: Vec<CajaNapPort>,
    #[serde(skip)]
    pub splices: Vec<Splice>,
}

impl CajaNap {
    pub fn new(id: impl Into<ElementId>, name: impl Into<String>) -> Self {
        Self { info: ElementInfo::new(id, name), ..Self::default() }
    }

    pub fn with_port(mut self, port: CajaNapPort) -> Self {
        self.ports.push(port);
        self
    }

    pub fn with_splice(mut self, splice: Splice) -> Self {
        self.splices.push(splice);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Splitter {
    #[serde(flatten)]
    pub info: ElementInfo,
    #[serde(default)]
    pub splitting_ratio: Option<String>,
    #[serde(default)]
    pub mufla_id: Option<ElementId>,
    #[serde(default)]
    pub in_fiber_id: Option<FiberId>,
    #[serde(default)]
    pub in_fiber_thread: Option<ThreadNumber>,
    #[serde(skip)]
    pub outputs: Vec<SplitterOutput>,
}

impl Splitter {
    pub fn new(id: impl Into<ElementId>, name: impl Into<String>, ratio: &str) -> Self {
        let mut s = Self { info: ElementInfo::new(id, name), ..Self::default() };
        s.splitting_ratio = Some(ratio.to_string());
        s.info.capacity = s.output_count();
        s
    }

    pub fn fed_by(mut self, fiber_id: impl Into<FiberId>, thread: ThreadNumber) -> Self {
        self.in_fiber_id = Some(fiber_id.into());
        self.in_fiber_thread = Some(thread);
        self
    }

    pub fn with_output(mut self, output: SplitterOutput) -> Self {
        self.outputs.push(output);
        self
    }

    pub fn input(&self) -> Option<FiberRef> {
        FiberRef::from_parts(self.in_fiber_id.as_deref(), self.in_fiber_thread)
    }

    /// `1:8` gives 8; falls back to the stored capacity when the ratio is absent or garbled.
    pub fn output_count(&self) -> u32 {
        self.splitting_ratio
            .as_deref()
            .and_then(parse_ratio)
            .unwrap_or(self.info.capacity)
    }

    pub fn ratio_label(&self) -> String {
        match &self.splitting_ratio {
            Some(r) => r.clone(),
            None => format!("1:{}", self.info.capacity),
        }
    }
}

fn parse_ratio(ratio: &str) -> Option<u32> {
    let (_, outputs) = ratio.split_once(':')?;
    outputs.trim().parse().ok()
}

/// A physical cable segment between two terminal elements.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fiber {
    #[serde(default)]
    pub id: FiberId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub origin_id: ElementId,
    #[serde(default, deserialize_with = "lenient_kind")]
    pub origin_type: Option<ElementKind>,
    #[serde(default)]
    pub destination_id: ElementId,
    #[serde(default, deserialize_with = "lenient_kind")]
    pub destination_type: Option<ElementKind>,
    /// metres
    #[serde(default)]
    pub distance: f64,
    #[serde(default)]
    pub thread_count: u32,
    #[serde(default, rename = "type")]
    pub fiber_type: Option<String>,
    #[serde(default, rename = "estado")]
    pub state: OperationalState,
}

impl Fiber {
    pub fn new(
        id: impl Into<FiberId>,
        name: impl Into<String>,
        origin: (ElementKind, &str),
        destination: (ElementKind, &str),
        thread_count: u32,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            origin_id: origin.1.to_string(),
            origin_type: Some(origin.0),
            destination_id: destination.1.to_string(),
            destination_type: Some(destination.0),
            thread_count,
            ..Self::default()
        }
    }

    pub fn with_state(mut self, state: OperationalState) -> Self {
        self.state = state;
        self
    }

    pub fn with_distance(mut self, metres: f64) -> Self {
        self.distance = metres;
        self
    }

    pub fn display_name(&self) -> &str {
        if self.name.is_empty() { &self.id } else { &self.name }
    }

    pub fn has_thread(&self, thread: ThreadNumber) -> bool {
        thread >= 1 && thread <= self.thread_count
    }

    /// The end of the span opposite `from`. Spans are walked in either direction;
    /// when `from` is neither end (or both), the destination side is used.
    pub fn far_end_from(&self, from: &str) -> (Option<ElementKind>, &str) {
        if self.destination_id == from && self.origin_id != from {
            (self.origin_type, &self.origin_id)
        } else {
            (self.destination_type, &self.destination_id)
        }
    }
}

// unknown kind strings become None so the tracer can report a lost connection
fn lenient_kind<'de, D>(deserializer: D) -> Result<Option<ElementKind>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.and_then(|s| match s.as_str() {
        "Odf" | "ODF" => Some(ElementKind::Odf),
        "Mufla" => Some(ElementKind::Mufla),
        "CajaNap" | "Caja NAP" => Some(ElementKind::CajaNap),
        "Splitter" => Some(ElementKind::Splitter),
        _ => None,
    }))
}

/// Borrowed view over one terminal element of any kind.
#[derive(Debug, Clone, Copy)]
pub enum TerminalElement<'a> {
    Odf(&'a Odf),
    Mufla(&'a Mufla),
    CajaNap(&'a CajaNap),
    Splitter(&'a Splitter),
}

impl<'a> TerminalElement<'a> {
    pub fn info(&self) -> &'a ElementInfo {
        match self {
            TerminalElement::Odf(e) => &e.info,
            TerminalElement::Mufla(e) => &e.info,
            TerminalElement::CajaNap(e) => &e.info,
            TerminalElement::Splitter(e) => &e.info,
        }
    }

    pub fn kind(&self) -> ElementKind {
        match self {
            TerminalElement::Odf(_) => ElementKind::Odf,
            TerminalElement::Mufla(_) => ElementKind::Mufla,
            TerminalElement::CajaNap(_) => ElementKind::CajaNap,
            TerminalElement::Splitter(_) => ElementKind::Splitter,
        }
    }

    pub fn id(&self) -> &'a str {
        &self.info().id
    }

    pub fn name(&self) -> &'a str {
        self.info().display_name()
    }
}
