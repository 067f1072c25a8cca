//! Inter-domain converter behavior against hand-built nodes.

use bf_core::{EngineError, Id, Tolerances};
use bf_elements::{Converter, ConverterKind, Element, Kind};
use bf_graph::{Node, PhysicalDomain, Port};
use bf_steam::{CurveFitTable, SteamTable};

const CP: f64 = 4186.0;

fn converter_between(
    d0: PhysicalDomain,
    d1: PhysicalDomain,
    kind: ConverterKind,
) -> (Vec<Node>, Element) {
    let mut n0 = Node::new(Id::from_index(0), "a", d0);
    let mut n1 = Node::new(Id::from_index(1), "b", d1);
    let mut elem = Element::new(
        Id::from_index(0),
        "bridge",
        PhysicalDomain::Multidomain,
        Kind::Converter(Converter::new(kind)),
    );
    let s0 = n0.register(elem.id);
    elem.attach(Port {
        node: n0.id,
        slot: s0,
    })
    .unwrap();
    let s1 = n1.register(elem.id);
    elem.attach(Port {
        node: n1.id,
        slot: s1,
    })
    .unwrap();
    (vec![n0, n1], elem)
}

fn settle(elem: &mut Element, nodes: &mut [Node], table: &dyn SteamTable) {
    for _ in 0..8 {
        if !elem.step(nodes, table).unwrap() {
            return;
        }
    }
    panic!("converter did not settle");
}

#[test]
fn heat_to_phased_converts_temperature_to_energy() {
    let table = CurveFitTable::new();
    let (mut nodes, mut elem) = converter_between(
        PhysicalDomain::HeatFluid,
        PhysicalDomain::PhasedFluid,
        ConverterKind::HeatPhased { cp: CP },
    );

    nodes[0].set_effort(2e5).unwrap();
    nodes[0].set_flow(0, 1.5).unwrap();
    // The incoming stream's temperature, as node mixing would deliver it.
    nodes[0]
        .scalar_slot_mut(0)
        .unwrap()
        .set(300.0, Tolerances::default())
        .unwrap();

    settle(&mut elem, &mut nodes, &table);

    // Pressure and (negated) flow crossed; the sink carries T·cp.
    assert_eq!(nodes[1].effort().unwrap(), 2e5);
    assert_eq!(nodes[1].flow(0).unwrap(), -1.5);
    assert_eq!(
        nodes[1].scalar_slot(0).unwrap().value().unwrap(),
        300.0 * CP
    );
    assert!(elem.is_finished(&nodes));
}

#[test]
fn heat_to_steam_builds_the_full_state() {
    let table = CurveFitTable::new();
    let (mut nodes, mut elem) = converter_between(
        PhysicalDomain::HeatFluid,
        PhysicalDomain::Steam,
        ConverterKind::HeatSteam,
    );

    let (p, t) = (1e5, 330.0);
    nodes[0].set_effort(p).unwrap();
    nodes[0].set_flow(0, 0.8).unwrap();
    nodes[0]
        .scalar_slot_mut(0)
        .unwrap()
        .set(t, Tolerances::default())
        .unwrap();

    settle(&mut elem, &mut nodes, &table);

    let props = nodes[1].steam_slot(0).unwrap().props().unwrap();
    // Subcooled inlet: enthalpy straight from the (p, T) lookup.
    assert_eq!(props.h, table.h_pt(p, t).unwrap());
    assert_eq!(props.x, 0.0);
    assert!((props.t - t).abs() < 1e-9);
}

#[test]
fn zero_flow_marks_both_sides() {
    let table = CurveFitTable::new();
    let (mut nodes, mut elem) = converter_between(
        PhysicalDomain::HeatFluid,
        PhysicalDomain::PhasedFluid,
        ConverterKind::HeatPhased { cp: CP },
    );

    nodes[0].set_flow(0, 0.0).unwrap();

    settle(&mut elem, &mut nodes, &table);

    assert!(nodes[0].scalar_slot(0).unwrap().is_no_value());
    assert!(nodes[1].scalar_slot(0).unwrap().is_no_value());
}

#[test]
fn inconsistent_directions_are_a_calculation_error() {
    let table = CurveFitTable::new();
    let (mut nodes, mut elem) = converter_between(
        PhysicalDomain::HeatFluid,
        PhysicalDomain::PhasedFluid,
        ConverterKind::HeatPhased { cp: CP },
    );

    // Both ports claim inflow: impossible for a massless bridge.
    nodes[0].set_flow(0, 1.0).unwrap();
    nodes[1].set_flow(0, 1.0).unwrap();

    let err = elem.step(&mut nodes, &table).unwrap_err();
    assert!(matches!(err, EngineError::Calculation { .. }));
}
