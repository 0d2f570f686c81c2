use fiber_trace::core::model::{CajaNap, CajaNapPort, Fiber, Mufla, Odf, OdfPosition, Splice, Splitter, SplitterOutput};
use fiber_trace::core::state::OperationalState;
use fiber_trace::store::{
    CAJAS_NAP, FIBERS, MUFLAS, MemoryStore, ODFS, OUTPUTS, PORTS, POSITIONS, SPLICES, SPLITTERS, ToonStore,
};
use fiber_trace::{
    CollectionPath, Document, ElementKind, EndCause, NetworkSnapshot, NetworkTracer, PathStep, StepKind,
    TracerConfig, TraceRequest, load_snapshot, trace, trace_path,
};
use serde::Serialize;

fn mk_fiber(id: &str, from: (ElementKind, &str), to: (ElementKind, &str)) -> Fiber {
    Fiber::new(id, format!("Troncal {id}"), from, to, 12).with_distance(250.0)
}

fn kinds(steps: &[PathStep]) -> Vec<StepKind> {
    steps.iter().map(|s| s.kind).collect()
}

fn start_a() -> TraceRequest {
    TraceRequest::new(ElementKind::Odf, "ODF1", "pos-1")
}

// ODF1 pos 1 -F1/3- M1 (F1/3 -> F2/7) -F2/7- N1 port bound to F2/7
fn mk_scenario_a() -> NetworkSnapshot {
    let mut s = NetworkSnapshot::new();
    s.add_odf(Odf::new("ODF1", "ODF Central").with_position(OdfPosition::new("pos-1", 1).bound_to("F1", 3)))
        .unwrap();
    s.add_fiber(mk_fiber("F1", (ElementKind::Odf, "ODF1"), (ElementKind::Mufla, "M1"))).unwrap();
    let splice = Splice::new("sp-1", 1, 1).incoming("F1", 3).outgoing("F2", 7);
    s.add_mufla(Mufla::new("M1", "Mufa Norte").with_splice(splice)).unwrap();
    s.add_fiber(mk_fiber("F2", (ElementKind::Mufla, "M1"), (ElementKind::CajaNap, "N1"))).unwrap();
    s.add_caja_nap(
        CajaNap::new("N1", "NAP El Parque")
            .with_port(CajaNapPort::new("port-4", 4).bound_to("F2", 7).with_service("Cliente X")),
    )
    .unwrap();
    s
}

// ODF1 -F1/3- M1 splice into S1 (1:8), three outputs with services
fn mk_scenario_c() -> NetworkSnapshot {
    let mut s = NetworkSnapshot::new();
    s.add_odf(Odf::new("ODF1", "ODF Central").with_position(OdfPosition::new("pos-1", 1).bound_to("F1", 3)))
        .unwrap();
    s.add_fiber(mk_fiber("F1", (ElementKind::Odf, "ODF1"), (ElementKind::Mufla, "M1"))).unwrap();
    let splice = Splice::new("sp-1", 1, 1).incoming("F1", 3).into_splitter("S1");
    s.add_mufla(Mufla::new("M1", "Mufa Norte").with_splice(splice)).unwrap();

    let mut splitter = Splitter::new("S1", "Splitter Norte", "1:8");
    for (n, client) in [(1, "Cliente A"), (4, "Cliente B"), (6, "Cliente C")] {
        splitter = splitter.with_output(SplitterOutput::new(format!("out-{n}"), n).with_service(client));
    }
    s.add_splitter(splitter).unwrap();
    s
}

#[test]
fn scenario_a_reaches_the_client() {
    let steps = mk_scenario_a().trace(&start_a()).unwrap();

    assert_eq!(
        kinds(&steps),
        vec![StepKind::Odf, StepKind::Fiber, StepKind::Mufla, StepKind::Fiber, StepKind::CajaNap, StepKind::End]
    );
    assert_eq!(steps[1].element_id, "F1");
    assert_eq!(steps[2].element_id, "M1");
    assert_eq!(steps[3].element_id, "F2");
    assert!(steps[3].details.contains("thread #7"));
    assert_eq!(steps[5].cause, Some(EndCause::Delivered));
    assert!(steps[5].details.contains("Cliente X"));
}

#[test]
fn scenario_b_cut_span_stops_before_the_box() {
    let mut s = mk_scenario_a();
    s.fibers.get_mut("F2").unwrap().state = OperationalState::Corte;

    let steps = s.trace(&start_a()).unwrap();
    assert_eq!(
        kinds(&steps),
        vec![StepKind::Odf, StepKind::Fiber, StepKind::Mufla, StepKind::Fiber, StepKind::End]
    );
    assert_eq!(steps[4].cause, Some(EndCause::FiberNotActive(OperationalState::Corte)));
    assert!(steps[4].details.contains("Corte"));
    assert!(steps.iter().all(|s| s.element_id != "N1"));
}

#[test]
fn scenario_c_lists_every_splitter_output() {
    let steps = mk_scenario_c().trace(&start_a()).unwrap();

    let mut expected = vec![StepKind::Odf, StepKind::Fiber, StepKind::Mufla, StepKind::Splitter];
    expected.extend([StepKind::End; 8]);
    assert_eq!(kinds(&steps), expected);

    let outputs = &steps[4..];
    assert!(outputs.iter().all(|s| s.cause == Some(EndCause::SplitterOutput)));
    let titles: Vec<&str> = outputs.iter().map(|s| s.element_name.as_str()).collect();
    assert_eq!(titles, (1..=8).map(|n| format!("Output {n}")).collect::<Vec<_>>());

    assert!(outputs[0].details.contains("Cliente A"));
    assert!(outputs[3].details.contains("Cliente B"));
    assert!(outputs[5].details.contains("Cliente C"));
    let unconfigured = outputs.iter().filter(|s| s.details.contains("Unconfigured")).count();
    assert_eq!(unconfigured, 5);
}

#[test]
fn cyclic_splices_stop_at_the_hop_limit() {
    let mut s = NetworkSnapshot::new();
    s.add_odf(Odf::new("ODF1", "ODF").with_position(OdfPosition::new("pos-1", 1).bound_to("F1", 1))).unwrap();
    s.add_fiber(mk_fiber("F1", (ElementKind::Odf, "ODF1"), (ElementKind::Mufla, "M1"))).unwrap();
    s.add_fiber(mk_fiber("F2", (ElementKind::Mufla, "M1"), (ElementKind::Mufla, "M2"))).unwrap();
    s.add_fiber(mk_fiber("F3", (ElementKind::Mufla, "M2"), (ElementKind::Mufla, "M1"))).unwrap();
    s.add_mufla(
        Mufla::new("M1", "Mufa 1")
            .with_splice(Splice::new("a", 1, 1).incoming("F1", 1).outgoing("F2", 1))
            .with_splice(Splice::new("b", 1, 2).incoming("F3", 1).outgoing("F2", 1)),
    )
    .unwrap();
    s.add_mufla(Mufla::new("M2", "Mufa 2").with_splice(Splice::new("c", 1, 1).incoming("F2", 1).outgoing("F3", 1)))
        .unwrap();

    let steps = s.trace(&TraceRequest::new(ElementKind::Odf, "ODF1", "pos-1")).unwrap();
    let fiber_steps = steps.iter().filter(|s| s.kind == StepKind::Fiber).count();
    assert_eq!(fiber_steps, 20);
    assert_eq!(steps.last().unwrap().cause, Some(EndCause::HopLimit));
    assert_eq!(steps.iter().filter(|s| s.is_end()).count(), 1);

    let short = TracerConfig { max_hops: 3, ..TracerConfig::default() };
    let steps = trace_path(&s, &TraceRequest::new(ElementKind::Odf, "ODF1", "pos-1"), &short).unwrap();
    assert_eq!(steps.iter().filter(|s| s.kind == StepKind::Fiber).count(), 3);
}

#[test]
fn cut_at_first_hop_leaves_two_steps_before_the_end() {
    for state in [OperationalState::Corte, OperationalState::Inactivo] {
        let mut s = mk_scenario_a();
        s.fibers.get_mut("F1").unwrap().state = state;

        let steps = s.trace(&start_a()).unwrap();
        assert_eq!(kinds(&steps), vec![StepKind::Odf, StepKind::Fiber, StepKind::End]);
        assert_eq!(steps[2].cause, Some(EndCause::FiberNotActive(state)));
    }
}

#[test]
fn missing_fiber_ends_the_trace() {
    let mut s = mk_scenario_a();
    s.muflas.get_mut("M1").unwrap().splices[0].out_fiber_id = "F404".to_string();

    let steps = s.trace(&start_a()).unwrap();
    assert_eq!(kinds(&steps), vec![StepKind::Odf, StepKind::Fiber, StepKind::Mufla, StepKind::End]);
    let last = steps.last().unwrap();
    assert_eq!(last.cause, Some(EndCause::FiberNotFound));
    assert_eq!(last.element_id, "F404");
}

#[test]
fn repeated_traces_are_identical() {
    let s = mk_scenario_c();
    let first = s.trace(&start_a()).unwrap();
    let second = s.trace(&start_a()).unwrap();
    assert_eq!(first, second);

    let lazy: Vec<PathStep> = trace(&s, &start_a(), &TracerConfig::default()).unwrap().collect();
    assert_eq!(lazy, first);
}

#[test]
fn thread_bounds_are_reported_not_fatal() {
    let mut s = mk_scenario_a();
    s.odfs.get_mut("ODF1").unwrap().positions[0].fiber_thread_number = Some(5);
    s.muflas.get_mut("M1").unwrap().splices[0].in_fiber_thread = 5;
    let steps = s.trace(&start_a()).unwrap();
    assert_eq!(steps[1].element_id, "F1");
    assert!(steps[1].details.contains("thread #5"));
    assert_eq!(steps.last().unwrap().cause, Some(EndCause::Delivered));

    s.odfs.get_mut("ODF1").unwrap().positions[0].fiber_thread_number = Some(13);
    let steps = s.trace(&start_a()).unwrap();
    assert_eq!(kinds(&steps), vec![StepKind::Odf, StepKind::Fiber, StepKind::End]);
    assert!(steps[1].details.contains("only 12 threads"));
    assert_eq!(steps[2].cause, Some(EndCause::ConnectionLost));
}

fn doc<T: Serialize>(id: &str, record: &T) -> Document {
    Document::new(id, serde_json::to_value(record).unwrap())
}

// the same network as a list of (collection, documents)
fn scenario_a_documents() -> Vec<(CollectionPath, Vec<Document>)> {
    let s = mk_scenario_a();
    let odf = &s.odfs["ODF1"];
    let mufla = &s.muflas["M1"];
    let caja = &s.cajas_nap["N1"];
    vec![
        (CollectionPath::root(ODFS), vec![doc("ODF1", odf)]),
        (CollectionPath::sub(ODFS, "ODF1", POSITIONS), odf.positions.iter().map(|p| doc(&p.id, p)).collect()),
        (CollectionPath::root(FIBERS), vec![doc("F1", &s.fibers["F1"]), doc("F2", &s.fibers["F2"])]),
        (CollectionPath::root(MUFLAS), vec![doc("M1", mufla)]),
        (CollectionPath::sub(MUFLAS, "M1", SPLICES), mufla.splices.iter().map(|x| doc(&x.id, x)).collect()),
        (CollectionPath::root(CAJAS_NAP), vec![doc("N1", caja)]),
        (CollectionPath::sub(CAJAS_NAP, "N1", PORTS), caja.ports.iter().map(|p| doc(&p.id, p)).collect()),
    ]
}

#[tokio::test]
async fn memory_store_session_traces_scenario_a() {
    let store = MemoryStore::new();
    for (path, docs) in scenario_a_documents() {
        for d in docs {
            store.put_raw(&path, d).await;
        }
    }

    let mut tracer = NetworkTracer::new(store, TracerConfig::default());
    tracer.reload().await.unwrap();
    let steps = tracer.trace(&start_a()).unwrap();
    assert_eq!(steps, mk_scenario_a().trace(&start_a()).unwrap());
}

#[tokio::test]
async fn toon_directory_loads_into_the_same_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let store = ToonStore::new(dir.path());
    for (path, docs) in scenario_a_documents() {
        store.write(&path, &docs).await.unwrap();
    }
    // a splitter table with no outputs file is still a valid load
    store
        .write(&CollectionPath::root(SPLITTERS), &[doc("S9", &Splitter::new("S9", "Spare", "1:4"))])
        .await
        .unwrap();
    assert!(!dir.path().join(SPLITTERS).join("S9").join(format!("{OUTPUTS}.toon")).exists());

    let snapshot = load_snapshot(&store, &TracerConfig::default()).await.unwrap();
    assert_eq!(snapshot.element_count(), 4);
    assert!(snapshot.audit().is_empty());
    assert_eq!(snapshot.trace(&start_a()).unwrap(), mk_scenario_a().trace(&start_a()).unwrap());
}
