// snapshot loader: fan out every read, fan in, assemble the arena
use std::time::Duration;

use futures::future::try_join_all;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::TracerConfig;
use crate::core::model::{CajaNap, CajaNapPort, Fiber, Mufla, Odf, OdfPosition, Splice, Splitter, SplitterOutput};
use crate::core::snapshot::{NetworkSnapshot, SnapshotError};
use crate::store::{
    CAJAS_NAP, CollectionPath, Document, FIBERS, InventoryStore, MUFLAS, ODFS, OUTPUTS, PORTS, POSITIONS, SPLICES,
    SPLITTERS, StoreError,
};

#[derive(Debug, Error)]
pub enum LoadError {
    /// The store could not serve a read; no trace should be attempted.
    #[error("inventory data unavailable at {path}")]
    DataUnavailable {
        path: String,
        #[source]
        source: StoreError,
    },
    #[error("malformed document `{id}` in {path}")]
    Malformed {
        path: String,
        id: String,
        #[source]
        source: serde_json::Error,
    },
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
}

struct Fetched {
    path: CollectionPath,
    docs: Vec<Document>,
}

// the document id is authoritative over any id field in the body
trait Record: DeserializeOwned {
    fn set_id(&mut self, id: String);
}

macro_rules! element_record {
    ($($t:ty),*) => {
        $(impl Record for $t {
            fn set_id(&mut self, id: String) {
                self.info.id = id;
            }
        })*
    };
}

macro_rules! plain_record {
    ($($t:ty),*) => {
        $(impl Record for $t {
            fn set_id(&mut self, id: String) {
                self.id = id;
            }
        })*
    };
}

element_record!(Odf, Mufla, CajaNap, Splitter);
plain_record!(Fiber, OdfPosition, CajaNapPort, Splice, SplitterOutput);

async fn read<S>(store: &S, path: CollectionPath, timeout: Option<Duration>) -> Result<Fetched, LoadError>
where
    S: InventoryStore + ?Sized,
{
    let result = match timeout {
        Some(limit) => match tokio::time::timeout(limit, store.fetch(&path)).await {
            Ok(r) => r,
            Err(_) => Err(StoreError::Timeout(limit)),
        },
        None => store.fetch(&path).await,
    };
    match result {
        Ok(docs) => {
            debug!(%path, documents = docs.len(), "collection read");
            Ok(Fetched { path, docs })
        }
        Err(source) => Err(LoadError::DataUnavailable { path: path.to_string(), source }),
    }
}

fn decode<T: Record>(fetched: Fetched) -> Result<Vec<T>, LoadError> {
    let Fetched { path, docs } = fetched;
    docs.into_iter()
        .map(|doc| {
            let mut body = doc.body;
            if let serde_json::Value::Object(fields) = &mut body {
                fields.remove("id");
            }
            let mut record: T = serde_json::from_value(body).map_err(|source| LoadError::Malformed {
                path: path.to_string(),
                id: doc.id.clone(),
                source,
            })?;
            record.set_id(doc.id);
            Ok(record)
        })
        .collect()
}

/// Pulls the whole inventory into a fresh [`NetworkSnapshot`].
///
/// The five top-level collections are read concurrently, then every
/// sub-collection of every parent is read concurrently. Any failed read fails
/// the whole load with [`LoadError::DataUnavailable`].
pub async fn load_snapshot<S>(store: &S, config: &TracerConfig) -> Result<NetworkSnapshot, LoadError>
where
    S: InventoryStore + ?Sized,
{
    let timeout = config.read_timeout();

    let (odfs, fibers, muflas, cajas, splitters) = futures::try_join!(
        read(store, CollectionPath::root(ODFS), timeout),
        read(store, CollectionPath::root(FIBERS), timeout),
        read(store, CollectionPath::root(MUFLAS), timeout),
        read(store, CollectionPath::root(CAJAS_NAP), timeout),
        read(store, CollectionPath::root(SPLITTERS), timeout),
    )?;

    let mut odfs: Vec<Odf> = decode(odfs)?;
    let fibers: Vec<Fiber> = decode(fibers)?;
    let mut muflas: Vec<Mufla> = decode(muflas)?;
    let mut cajas: Vec<CajaNap> = decode(cajas)?;
    let mut splitters: Vec<Splitter> = decode(splitters)?;

    let sub = |collection: &'static str, id: &str, child: &'static str| {
        read(store, CollectionPath::sub(collection, id, child), timeout)
    };
    let (positions, mufla_splices, caja_ports, caja_splices, outputs) = futures::try_join!(
        try_join_all(odfs.iter().map(|e| sub(ODFS, &e.info.id, POSITIONS))),
        try_join_all(muflas.iter().map(|e| sub(MUFLAS, &e.info.id, SPLICES))),
        try_join_all(cajas.iter().map(|e| sub(CAJAS_NAP, &e.info.id, PORTS))),
        try_join_all(cajas.iter().map(|e| sub(CAJAS_NAP, &e.info.id, SPLICES))),
        try_join_all(splitters.iter().map(|e| sub(SPLITTERS, &e.info.id, OUTPUTS))),
    )?;

    // try_join_all keeps input order, so results zip back onto their parents
    for (odf, fetched) in odfs.iter_mut().zip(positions) {
        odf.positions = decode(fetched)?;
        odf.positions.sort_by_key(|p| p.position_number);
    }
    for (mufla, fetched) in muflas.iter_mut().zip(mufla_splices) {
        mufla.splices = decode(fetched)?;
        mufla.splices.sort_by_key(|s| (s.tray_number, s.splice_number));
    }
    for ((caja, ports), splices) in cajas.iter_mut().zip(caja_ports).zip(caja_splices) {
        caja.ports = decode(ports)?;
        caja.ports.sort_by_key(|p| p.port_number);
        caja.splices = decode(splices)?;
        caja.splices.sort_by_key(|s| (s.tray_number, s.splice_number));
    }
    for (splitter, fetched) in splitters.iter_mut().zip(outputs) {
        splitter.outputs = decode(fetched)?;
        splitter.outputs.sort_by_key(|o| o.output_number);
    }

    let mut snapshot = NetworkSnapshot::new();
    for e in odfs {
        snapshot.add_odf(e)?;
    }
    for f in fibers {
        snapshot.add_fiber(f)?;
    }
    for e in muflas {
        snapshot.add_mufla(e)?;
    }
    for e in cajas {
        snapshot.add_caja_nap(e)?;
    }
    for e in splitters {
        snapshot.add_splitter(e)?;
    }

    let issues = snapshot.audit();
    for issue in &issues {
        warn!(%issue, "inventory integrity");
    }

    info!(
        odfs = snapshot.odfs.len(),
        fibers = snapshot.fibers.len(),
        muflas = snapshot.muflas.len(),
        cajas_nap = snapshot.cajas_nap.len(),
        splitters = snapshot.splitters.len(),
        issues = issues.len(),
        "network snapshot loaded"
    );
    Ok(snapshot)
}
