// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Cell group construction and stepping with an exponential synapse kernel

use neurocable_engine::{
    table_values, CellGroupMechanisms, CpuBackend, DeliverableEvent, GapJunction, IonConfig,
    LifecycleState, MechanismError, MechanismKernels, MechanismSpec, NullSink, SampleEvent,
    SampleEventStream, SharedState, SharedStateConfig, StaticKernels, StimulusConfig, TracingSink,
    Verbosity,
};
use neurocable_mechanism::{
    Index, IonDependency, MechanismDescriptor, MechanismId, MechanismKind, MechanismLayout,
    MechanismOverrides, ParameterPack, Value, ValuePtr,
};
use neurocable_runtime::ArenaSet;
use std::sync::Arc;

/// Point synapse: `g` jumps by the event weight and decays with `tau`;
/// `i = g * (v - e)`
struct ExpSynKernels;

impl ExpSynKernels {
    fn descriptor() -> MechanismDescriptor {
        MechanismDescriptor::new("expsyn", MechanismKind::Point)
            .with_parameter("tau", 2.0)
            .with_parameter("e", 0.0)
            .with_state_var("g", 0.0)
    }
}

fn read_one(space: &CpuBackend, arenas: &ArenaSet<CpuBackend>, ptr: ValuePtr, i: usize) -> neurocable_engine::Result<Value> {
    Ok(arenas.read_values(space, ptr.add(i), 1)?[0])
}

impl MechanismKernels<CpuBackend> for ExpSynKernels {
    fn init_mechanism(
        &self,
        pack: &ParameterPack,
        space: &CpuBackend,
        arenas: &mut ArenaSet<CpuBackend>,
    ) -> neurocable_engine::Result<()> {
        let g = table_values(space, arenas, pack.state_vars, 1)?[0];
        arenas.fill_values(space, g, pack.width(), 0.0)?;
        Ok(())
    }

    fn compute_currents(
        &self,
        pack: &ParameterPack,
        space: &CpuBackend,
        arenas: &mut ArenaSet<CpuBackend>,
    ) -> neurocable_engine::Result<()> {
        let params = table_values(space, arenas, pack.parameters, 2)?;
        let g = table_values(space, arenas, pack.state_vars, 1)?[0];
        let cvs = arenas.read_indices(space, pack.node_index, pack.width())?;
        for (i, &cv) in cvs.iter().enumerate() {
            let cv = cv as usize;
            let e = read_one(space, arenas, params[1], i)?;
            let gi = read_one(space, arenas, g, i)?;
            let v = read_one(space, arenas, pack.vec_v, cv)?;
            let current = read_one(space, arenas, pack.vec_i, cv)?;
            let conductance = read_one(space, arenas, pack.vec_g, cv)?;
            arenas.write_values(space, pack.vec_i.add(cv), &[current + gi * (v - e)])?;
            arenas.write_values(space, pack.vec_g.add(cv), &[conductance + gi])?;
        }
        Ok(())
    }

    fn advance_state(
        &self,
        pack: &ParameterPack,
        space: &CpuBackend,
        arenas: &mut ArenaSet<CpuBackend>,
    ) -> neurocable_engine::Result<()> {
        let tau = table_values(space, arenas, pack.parameters, 1)?[0];
        let g = table_values(space, arenas, pack.state_vars, 1)?[0];
        let cvs = arenas.read_indices(space, pack.node_index, pack.width())?;
        for (i, &cv) in cvs.iter().enumerate() {
            let dt = read_one(space, arenas, pack.vec_dt, cv as usize)?;
            let decay = (-dt / read_one(space, arenas, tau, i)?).exp();
            let gi = read_one(space, arenas, g, i)?;
            arenas.write_values(space, g.add(i), &[gi * decay])?;
        }
        Ok(())
    }

    fn apply_events(
        &self,
        pack: &ParameterPack,
        events: &[DeliverableEvent],
        space: &CpuBackend,
        arenas: &mut ArenaSet<CpuBackend>,
    ) -> neurocable_engine::Result<()> {
        let g = table_values(space, arenas, pack.state_vars, 1)?[0];
        for event in events {
            let i = event.mech_index as usize;
            let gi = read_one(space, arenas, g, i)?;
            arenas.write_values(space, g.add(i), &[gi + event.weight])?;
        }
        Ok(())
    }
}

fn pas_descriptor() -> MechanismDescriptor {
    MechanismDescriptor::new("pas", MechanismKind::Density)
        .with_parameter("g", 0.001)
        .with_parameter("e", -70.0)
}

fn hh_like_descriptor() -> MechanismDescriptor {
    MechanismDescriptor::new("nax", MechanismKind::Density)
        .with_parameter("gbar", 0.12)
        .with_state_var("m", 0.0)
        .with_ion(IonDependency::new("na"))
}

fn shared_state(n_cv: usize) -> SharedState<CpuBackend> {
    shared_state_with(SharedStateConfig::uniform(n_cv, -65.0, 279.45, 1.0))
}

fn shared_state_with(config: SharedStateConfig) -> SharedState<CpuBackend> {
    let n_cv = config.n_cv();
    let mut shared = SharedState::new(CpuBackend::with_alignment(4), config).unwrap();
    let all: Vec<Index> = (0..n_cv as Index).collect();
    shared
        .add_ion("na", 1, &IonConfig::uniform(all, 10.0, 140.0, 50.0))
        .unwrap();
    shared
}

fn expsyn_spec(cv: Vec<Index>) -> MechanismSpec<CpuBackend> {
    MechanismSpec::new(
        Arc::new(ExpSynKernels::descriptor()),
        Arc::new(ExpSynKernels),
        MechanismLayout::uniform(cv),
    )
}

#[test]
fn test_build_assigns_sequential_ids() {
    let specs = vec![
        MechanismSpec::new(Arc::new(pas_descriptor()), Arc::new(StaticKernels::for_schema(&pas_descriptor())), MechanismLayout::uniform(vec![0, 1, 2, 3])),
        expsyn_spec(vec![1, 3]),
        MechanismSpec::new(Arc::new(hh_like_descriptor()), Arc::new(StaticKernels::for_schema(&hh_like_descriptor())), MechanismLayout::default()),
    ];
    let group = CellGroupMechanisms::build(shared_state(4), specs, Arc::new(NullSink)).unwrap();

    assert_eq!(group.mechanisms().len(), 3);
    for (i, m) in group.mechanisms().iter().enumerate() {
        assert_eq!(m.id(), MechanismId(i as u32));
        assert_eq!(m.state(), LifecycleState::Instantiated);
    }
    assert_eq!(group.mechanism(MechanismId(1)).unwrap().name(), "expsyn");
    assert_eq!(group.find("nax").unwrap().width(), 0);
    assert_eq!(group.total_width(), 6);
}

#[test]
fn test_build_aborts_on_first_failure() {
    let overrides = MechanismOverrides::new().rebind_ion("na", "na2");
    let specs = vec![
        expsyn_spec(vec![0]),
        MechanismSpec::new(Arc::new(hh_like_descriptor()), Arc::new(StaticKernels::for_schema(&hh_like_descriptor())), MechanismLayout::uniform(vec![1]))
            .with_overrides(overrides),
        expsyn_spec(vec![2]),
    ];
    let result = CellGroupMechanisms::build(shared_state(4), specs, Arc::new(NullSink));
    match result {
        Err(MechanismError::IonBinding { mechanism, binding, .. }) => {
            assert_eq!(mechanism, "nax");
            assert_eq!(binding, "na2");
        }
        Err(other) => panic!("expected ion binding error, got {}", other),
        Ok(_) => panic!("construction should have failed"),
    }
}

#[test]
fn test_step_delivers_events_and_advances_time() {
    let mut group = CellGroupMechanisms::build(
        shared_state(4),
        vec![expsyn_spec(vec![1, 3])],
        Arc::new(TracingSink::new(Verbosity::Detailed)),
    )
    .unwrap();
    group.initialize().unwrap();

    let id = MechanismId(0);
    group.push_event(DeliverableEvent::new(0.0, id, 1, 0.5));
    group.push_event(DeliverableEvent::new(0.1, id, 0, 0.25));

    group.step(0.025, 1.0).unwrap();

    let shared = group.shared();
    assert_eq!(shared.time_bounds().unwrap(), (0.025, 0.025));
    assert_eq!(shared.events().len(), 1);
    assert_eq!(shared.read_values(shared.dt_cv, 4).unwrap(), vec![0.025; 4]);

    // Current computed before the state update, from g = 0.5 on cv 3
    let current = shared.read_values(shared.current_density, 4).unwrap();
    assert_eq!(current, vec![0.0, 0.0, 0.0, 0.5 * (-65.0 - 0.0)]);
    let conductivity = shared.read_values(shared.conductivity, 4).unwrap();
    assert_eq!(conductivity, vec![0.0, 0.0, 0.0, 0.5]);

    let m = group.mechanism(id).unwrap();
    assert_eq!(m.state(), LifecycleState::Stepping);
    let g = m.field_values(shared, "g").unwrap();
    assert_eq!(g[0], 0.0);
    let expected: Value = 0.5 * (-0.025f32 / 2.0).exp();
    assert!((g[1] - expected).abs() < 1e-7);
}

#[test]
fn test_step_clamps_to_tmax() {
    let mut group =
        CellGroupMechanisms::build(shared_state(2), vec![expsyn_spec(vec![0])], Arc::new(NullSink)).unwrap();
    group.initialize().unwrap();
    group.step(0.025, 0.01).unwrap();
    let shared = group.shared();
    assert_eq!(shared.time_bounds().unwrap(), (0.01, 0.01));
    assert_eq!(shared.read_values(shared.dt_intdom, 1).unwrap(), vec![0.01]);
}

#[test]
fn test_initialize_resets_shared_state() {
    let mut group =
        CellGroupMechanisms::build(shared_state(2), vec![expsyn_spec(vec![0, 1])], Arc::new(NullSink)).unwrap();
    group.initialize().unwrap();
    group.push_event(DeliverableEvent::new(0.0, MechanismId(0), 0, 1.0));
    group.step(0.025, 1.0).unwrap();
    group.push_event(DeliverableEvent::new(5.0, MechanismId(0), 0, 1.0));

    group.initialize().unwrap();
    let shared = group.shared();
    assert_eq!(shared.time_bounds().unwrap(), (0.0, 0.0));
    assert_eq!(shared.voltage_bounds().unwrap(), (-65.0, -65.0));
    assert!(shared.events().is_empty());
    assert_eq!(group.mechanisms()[0].field_values(shared, "g").unwrap(), vec![0.0, 0.0]);
}

#[test]
fn test_group_set_parameter() {
    let mut group =
        CellGroupMechanisms::build(shared_state(3), vec![expsyn_spec(vec![0, 2])], Arc::new(NullSink)).unwrap();
    group.set_parameter(MechanismId(0), "tau", &[1.0, 4.0]).unwrap();
    assert_eq!(
        group.mechanisms()[0].field_values(group.shared(), "tau").unwrap(),
        vec![1.0, 4.0]
    );
    assert!(matches!(
        group.set_parameter(MechanismId(7), "tau", &[1.0, 4.0]),
        Err(MechanismError::UnknownField { .. })
    ));
}

#[test]
fn test_shared_state_dump_lists_ions() {
    let group =
        CellGroupMechanisms::build(shared_state(2), vec![expsyn_spec(vec![0])], Arc::new(NullSink)).unwrap();
    let dump = group.shared().to_string();
    assert!(dump.contains("voltage"));
    assert!(dump.contains("na/internal_concentration"));
}

#[test]
fn test_repeated_initialize_does_not_compound_multiplicity() {
    let descriptor = MechanismDescriptor::new("ca_buffer", MechanismKind::Density).with_state_var("x", 2.0);
    let kernels = Arc::new(StaticKernels::for_schema(&descriptor));
    let layout = MechanismLayout::uniform(vec![0, 1]).with_multiplicity(vec![1, 3]);
    let mut group = CellGroupMechanisms::build(
        shared_state(2),
        vec![MechanismSpec::new(Arc::new(descriptor), kernels, layout)],
        Arc::new(NullSink),
    )
    .unwrap();

    for _ in 0..3 {
        group.initialize().unwrap();
        assert_eq!(group.mechanisms()[0].field_values(group.shared(), "x").unwrap(), vec![2.0, 6.0]);
    }
}

#[test]
fn test_events_delivered_against_their_own_domain() {
    let mut config = SharedStateConfig::uniform(2, -65.0, 279.45, 1.0);
    config.n_intdom = 2;
    config.n_cell = 2;
    config.cv_to_intdom = vec![0, 1];
    config.cv_to_cell = vec![0, 1];
    let mut group =
        CellGroupMechanisms::build(shared_state_with(config), vec![expsyn_spec(vec![0, 1])], Arc::new(NullSink))
            .unwrap();
    group.initialize().unwrap();
    let shared = group.shared_mut();
    shared.write_values(shared.time, &[0.0, 0.5]).unwrap();

    let id = MechanismId(0);
    group.push_event(DeliverableEvent::new(0.2, id, 0, 1.0).in_intdom(0));
    group.push_event(DeliverableEvent::new(0.2, id, 1, 0.5).in_intdom(1));
    group.push_event(DeliverableEvent::new(0.55, id, 1, 1.0).in_intdom(1));
    group.step(0.025, 10.0).unwrap();

    let shared = group.shared();
    assert_eq!(shared.read_values(shared.time, 2).unwrap(), vec![0.025, 0.5 + 0.025]);
    assert_eq!(shared.events().len(), 2);
    let g = group.mechanisms()[0].field_values(shared, "g").unwrap();
    assert_eq!(g[0], 0.0);
    let expected: Value = 0.5 * (-0.025f32 / 2.0).exp();
    assert!((g[1] - expected).abs() < 1e-7);
}

#[test]
fn test_step_adds_gap_junction_and_stimulus_currents() {
    let config = SharedStateConfig::uniform(2, -65.0, 279.45, 1.0)
        .with_gap_junctions(vec![GapJunction::new(0, 1, 0.1), GapJunction::new(1, 0, 0.1)]);
    let mut group =
        CellGroupMechanisms::build(shared_state_with(config), vec![expsyn_spec(vec![1])], Arc::new(NullSink))
            .unwrap();
    let mut stimulus = StimulusConfig::default();
    stimulus.push(0, 0.0, 0.0, [(0.0, 0.3)]);
    group.configure_stimulus(&stimulus).unwrap();
    group.initialize().unwrap();
    let shared = group.shared_mut();
    shared.write_values(shared.voltage, &[-60.0, -70.0]).unwrap();

    let mut samples = SampleEventStream::new();
    let voltage = group.shared().voltage;
    samples.push(SampleEvent { time: 0.0, intdom: 0, handle: voltage, offset: 0 });
    samples.push(SampleEvent { time: 0.05, intdom: 0, handle: voltage, offset: 1 });
    let (mut times, mut values) = (vec![0.0; 2], vec![0.0; 2]);
    let taken = group.step_sampled(0.025, 1.0, &mut samples, &mut times, &mut values).unwrap();
    assert_eq!(taken, 1);
    assert_eq!((times[0], values[0]), (0.0, -60.0));
    assert_eq!(samples.len(), 1);

    let shared = group.shared();
    let current = shared.read_values(shared.current_density, 2).unwrap();
    // gap junction +1.0 / -1.0, stimulus -0.3 on cv 0
    assert!((current[0] - 0.7).abs() < 1e-5);
    assert!((current[1] + 1.0).abs() < 1e-5);
    assert_eq!(shared.read_values(shared.stimulus().accu_stim, 1).unwrap(), vec![0.3]);
}
