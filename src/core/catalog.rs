// listings for pickers and reports: elements, selectable start connectors, occupancy
use serde::Serialize;

use crate::core::snapshot::NetworkSnapshot;
use crate::core::state::ConnectorStatus;
use crate::core::trace::SPLITTER_INPUT;
use crate::core::types::ElementKind;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ElementSummary {
    pub id: String,
    pub name: String,
}

/// A connector a trace can start from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartOption {
    pub connector_id: String,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
}

impl StartOption {
    fn new(connector_id: &str, label: String, service: Option<&String>) -> Self {
        Self { connector_id: connector_id.to_string(), label, service: service.cloned() }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Occupancy {
    pub capacity: u32,
    pub libre: usize,
    pub ocupado: usize,
    pub reservado: usize,
    pub danado: usize,
}

impl Occupancy {
    fn count(&mut self, status: ConnectorStatus) {
        match status {
            ConnectorStatus::Libre => self.libre += 1,
            ConnectorStatus::Ocupado => self.ocupado += 1,
            ConnectorStatus::Reservado => self.reservado += 1,
            ConnectorStatus::Danado => self.danado += 1,
        }
    }

    pub fn used(&self) -> usize {
        self.ocupado + self.reservado + self.danado
    }
}

impl NetworkSnapshot {
    /// All elements of one kind, ordered by name then id.
    pub fn elements(&self, kind: ElementKind) -> Vec<ElementSummary> {
        let mut out: Vec<ElementSummary> = match kind {
            ElementKind::Odf => self.odfs.values().map(|e| &e.info).map(summary).collect(),
            ElementKind::Mufla => self.muflas.values().map(|e| &e.info).map(summary).collect(),
            ElementKind::CajaNap => self.cajas_nap.values().map(|e| &e.info).map(summary).collect(),
            ElementKind::Splitter => self.splitters.values().map(|e| &e.info).map(summary).collect(),
        };
        out.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        out
    }

    /// Connectors on one element that a trace may start from, in connector-number order.
    pub fn start_options(&self, kind: ElementKind, element_id: &str) -> Option<Vec<StartOption>> {
        use crate::core::model::TerminalElement as E;

        let options: Vec<StartOption> = match self.element(kind, element_id)? {
            E::Odf(odf) => {
                let mut ps: Vec<_> = odf.positions.iter().collect();
                ps.sort_by_key(|p| p.position_number);
                ps.into_iter()
                    .map(|p| {
                        StartOption::new(&p.id, format!("Position {}", p.position_number), p.service_name.as_ref())
                    })
                    .collect()
            }
            E::Mufla(m) => {
                let mut ss: Vec<_> = m.splices.iter().collect();
                ss.sort_by_key(|s| (s.tray_number, s.splice_number));
                ss.into_iter()
                    .map(|s| {
                        let label = format!(
                            "Splice output (tray {}, splice {}) -> thread {}",
                            s.tray_number, s.splice_number, s.out_fiber_thread
                        );
                        StartOption::new(&s.id, label, None)
                    })
                    .collect()
            }
            E::CajaNap(caja) => {
                let mut ps: Vec<_> = caja.ports.iter().collect();
                ps.sort_by_key(|p| p.port_number);
                ps.into_iter()
                    .map(|p| StartOption::new(&p.id, format!("Port {}", p.port_number), p.service_name.as_ref()))
                    .collect()
            }
            E::Splitter(sp) => {
                let mut os: Vec<_> = sp.outputs.iter().collect();
                os.sort_by_key(|o| o.output_number);
                std::iter::once(StartOption::new(SPLITTER_INPUT, format!("Input {}", sp.ratio_label()), None))
                    .chain(os.into_iter().map(|o| {
                        StartOption::new(&o.id, format!("Output {}", o.output_number), o.service_name.as_ref())
                    }))
                    .collect()
            }
        };
        Some(options)
    }

    /// Connector usage on one element. Splices carry no status, so a mufla counts
    /// each recorded splice as occupied against its capacity.
    pub fn occupancy(&self, kind: ElementKind, element_id: &str) -> Option<Occupancy> {
        use crate::core::model::TerminalElement as E;

        let element = self.element(kind, element_id)?;
        let mut occ = Occupancy { capacity: element.info().capacity, ..Occupancy::default() };
        match element {
            E::Odf(odf) => odf.positions.iter().for_each(|p| occ.count(p.status)),
            E::CajaNap(caja) => caja.ports.iter().for_each(|p| occ.count(p.status)),
            E::Splitter(sp) => sp.outputs.iter().for_each(|o| occ.count(o.status)),
            E::Mufla(m) => {
                occ.ocupado = m.splices.len();
                occ.libre = (m.info.capacity as usize).saturating_sub(m.splices.len());
            }
        }
        Some(occ)
    }
}

fn summary(info: &crate::core::model::ElementInfo) -> ElementSummary {
    ElementSummary { id: info.id.clone(), name: info.display_name().to_string() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::{Mufla, Odf, OdfPosition, Splice, Splitter, SplitterOutput};

    #[test]
    fn elements_sorted_by_name() {
        let mut s = NetworkSnapshot::new();
        s.add_odf(Odf::new("B", "ODF Nodo Norte")).unwrap();
        s.add_odf(Odf::new("A", "ODF Central Principal")).unwrap();

        let names: Vec<String> = s.elements(ElementKind::Odf).into_iter().map(|e| e.name).collect();
        assert_eq!(names, vec!["ODF Central Principal", "ODF Nodo Norte"]);
        assert!(s.elements(ElementKind::Splitter).is_empty());
    }

    #[test]
    fn start_options_carry_services() {
        let mut s = NetworkSnapshot::new();
        s.add_odf(
            Odf::new("ODF1", "ODF")
                .with_position(OdfPosition::new("p2", 2))
                .with_position(OdfPosition::new("p1", 1).bound_to("F1", 1).with_service("OLT 1")),
        )
        .unwrap();
        s.add_splitter(Splitter::new("S1", "Splitter", "1:2").with_output(SplitterOutput::new("o1", 1))).unwrap();

        let opts = s.start_options(ElementKind::Odf, "ODF1").unwrap();
        assert_eq!(opts[0].label, "Position 1");
        assert_eq!(opts[0].service.as_deref(), Some("OLT 1"));
        assert_eq!(opts[1].connector_id, "p2");

        let opts = s.start_options(ElementKind::Splitter, "S1").unwrap();
        assert_eq!(opts[0].connector_id, SPLITTER_INPUT);
        assert_eq!(opts[1].label, "Output 1");

        assert!(s.start_options(ElementKind::Mufla, "S1").is_none());
    }

    #[test]
    fn occupancy_counts_statuses() {
        let mut s = NetworkSnapshot::new();
        let mut odf = Odf::new("ODF1", "ODF")
            .with_position(OdfPosition::new("p1", 1).bound_to("F1", 1))
            .with_position(OdfPosition::new("p2", 2))
            .with_position(OdfPosition::new("p3", 3));
        odf.info.capacity = 3;
        odf.positions[2].status = ConnectorStatus::Danado;
        s.add_odf(odf).unwrap();

        let mut m = Mufla::new("M1", "Mufa").with_splice(Splice::new("s1", 1, 1));
        m.info.capacity = 4;
        s.add_mufla(m).unwrap();

        let occ = s.occupancy(ElementKind::Odf, "ODF1").unwrap();
        assert_eq!((occ.libre, occ.ocupado, occ.danado), (1, 1, 1));
        assert_eq!(occ.used(), 2);

        let occ = s.occupancy(ElementKind::Mufla, "M1").unwrap();
        assert_eq!((occ.capacity, occ.ocupado, occ.libre), (4, 1, 3));
    }
}
