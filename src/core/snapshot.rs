// in-memory inventory arena: five id-keyed tables, cross references are plain ids
use std::collections::HashMap;

use thiserror::Error;

use crate::core::model::{CajaNap, Fiber, Mufla, Odf, Splice, Splitter, TerminalElement};
use crate::core::types::{ElementId, ElementKind, FiberId, FiberRef};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SnapshotError {
    #[error("duplicate {table} id `{id}`")]
    DuplicateId { table: &'static str, id: String },
}

/// Read-only view of the whole network for one trace session.
///
/// Every element already carries its connector sub-records; nothing is
/// fetched lazily once a snapshot exists.
#[derive(Debug, Clone, Default)]
pub struct NetworkSnapshot {
    pub odfs: HashMap<ElementId, Odf>,
    pub fibers: HashMap<FiberId, Fiber>,
    pub muflas: HashMap<ElementId, Mufla>,
    pub cajas_nap: HashMap<ElementId, CajaNap>,
    pub splitters: HashMap<ElementId, Splitter>,
}

/// Where the outgoing side of a splice leads.
#[derive(Debug, Clone, Copy)]
pub enum SpliceTarget<'a> {
    /// The splice feeds a splitter input (implicit thread 1).
    Splitter(&'a Splitter),
    /// The splice continues into a fiber thread. The fiber may be missing from the snapshot.
    Fiber(&'a str, u32),
    Unbound,
}

fn insert_unique<T>(
    table: &'static str,
    map: &mut HashMap<String, T>,
    id: String,
    value: T,
) -> Result<(), SnapshotError> {
    if map.contains_key(&id) {
        return Err(SnapshotError::DuplicateId { table, id });
    }
    map.insert(id, value);
    Ok(())
}

impl NetworkSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_odf(&mut self, odf: Odf) -> Result<(), SnapshotError> {
        insert_unique("odf", &mut self.odfs, odf.info.id.clone(), odf)
    }

    pub fn add_fiber(&mut self, fiber: Fiber) -> Result<(), SnapshotError> {
        insert_unique("fiber", &mut self.fibers, fiber.id.clone(), fiber)
    }

    pub fn add_mufla(&mut self, mufla: Mufla) -> Result<(), SnapshotError> {
        insert_unique("mufla", &mut self.muflas, mufla.info.id.clone(), mufla)
    }

    pub fn add_caja_nap(&mut self, caja: CajaNap) -> Result<(), SnapshotError> {
        insert_unique("caja_nap", &mut self.cajas_nap, caja.info.id.clone(), caja)
    }

    pub fn add_splitter(&mut self, splitter: Splitter) -> Result<(), SnapshotError> {
        insert_unique("splitter", &mut self.splitters, splitter.info.id.clone(), splitter)
    }

    pub fn fiber(&self, id: &str) -> Option<&Fiber> {
        self.fibers.get(id)
    }

    pub fn element(&self, kind: ElementKind, id: &str) -> Option<TerminalElement<'_>> {
        match kind {
            ElementKind::Odf => self.odfs.get(id).map(TerminalElement::Odf),
            ElementKind::Mufla => self.muflas.get(id).map(TerminalElement::Mufla),
            ElementKind::CajaNap => self.cajas_nap.get(id).map(TerminalElement::CajaNap),
            ElementKind::Splitter => self.splitters.get(id).map(TerminalElement::Splitter),
        }
    }

    /// Splitter ids win over fiber ids, matching how splices are recorded.
    pub fn splice_target<'a>(&'a self, splice: &'a Splice) -> SpliceTarget<'a> {
        if let Some(splitter) = self.splitters.get(&splice.out_fiber_id) {
            return SpliceTarget::Splitter(splitter);
        }
        match FiberRef::from_parts(Some(&splice.out_fiber_id), Some(splice.out_fiber_thread)) {
            Some(_) => SpliceTarget::Fiber(&splice.out_fiber_id, splice.out_fiber_thread),
            None => SpliceTarget::Unbound,
        }
    }

    pub fn element_count(&self) -> usize {
        self.odfs.len() + self.muflas.len() + self.cajas_nap.len() + self.splitters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.element_count() == 0 && self.fibers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::Splice;

    #[test]
    fn add_rejects_duplicate_ids_per_table() {
        let mut s = NetworkSnapshot::new();
        s.add_odf(Odf::new("X1", "ODF Central")).unwrap();

        // same id in another table is fine
        s.add_mufla(Mufla::new("X1", "Mufa Troncal")).unwrap();

        let err = s.add_odf(Odf::new("X1", "ODF Norte")).unwrap_err();
        assert_eq!(err, SnapshotError::DuplicateId { table: "odf", id: "X1".to_string() });
    }

    #[test]
    fn element_dispatches_on_kind() {
        let mut s = NetworkSnapshot::new();
        s.add_caja_nap(CajaNap::new("N1", "NAP Centro")).unwrap();

        let e = s.element(ElementKind::CajaNap, "N1").unwrap();
        assert_eq!(e.kind(), ElementKind::CajaNap);
        assert_eq!(e.name(), "NAP Centro");
        assert!(s.element(ElementKind::Odf, "N1").is_none());
    }

    #[test]
    fn splice_target_prefers_splitter_table() {
        let mut s = NetworkSnapshot::new();
        s.add_splitter(Splitter::new("S1", "Splitter 1", "1:8")).unwrap();

        let to_splitter = Splice::new("sp1", 1, 1).incoming("F1", 3).into_splitter("S1");
        assert!(matches!(s.splice_target(&to_splitter), SpliceTarget::Splitter(sp) if sp.info.id == "S1"));

        let to_fiber = Splice::new("sp2", 1, 2).incoming("F1", 4).outgoing("F9", 7);
        assert!(matches!(s.splice_target(&to_fiber), SpliceTarget::Fiber("F9", 7)));

        let dangling = Splice::new("sp3", 1, 3).incoming("F1", 5);
        assert!(matches!(s.splice_target(&dangling), SpliceTarget::Unbound));
    }
}
