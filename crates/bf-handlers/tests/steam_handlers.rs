//! Steam handler behavior against hand-built nodes.

use bf_core::{Id, Tolerances};
use bf_graph::{Node, PhysicalDomain, Port, SteamProps};
use bf_handlers::{HandlerCtx, IsenthalpicExpansion, SaturatedSeparation};
use bf_steam::{CurveFitTable, SteamTable};

fn two_steam_nodes(elem: u32) -> (Vec<Node>, Vec<Port>) {
    let mut n0 = Node::new(Id::from_index(0), "up", PhysicalDomain::Steam);
    let mut n1 = Node::new(Id::from_index(1), "down", PhysicalDomain::Steam);
    let s0 = n0.register(Id::from_index(elem));
    let s1 = n1.register(Id::from_index(elem));
    let ports = vec![
        Port {
            node: Id::from_index(0),
            slot: s0,
        },
        Port {
            node: Id::from_index(1),
            slot: s1,
        },
    ];
    (vec![n0, n1], ports)
}

#[test]
fn isenthalpic_valve_preserves_enthalpy_exactly() {
    // With both pressures and one side's state known, the far enthalpy is
    // bit-identical and T, s, x follow from the far pressure.
    let table = CurveFitTable::new();
    let (mut nodes, ports) = two_steam_nodes(4);

    let (p_up, p_down) = (5e5, 1e5);
    nodes[0].set_effort(p_up).unwrap();
    nodes[1].set_effort(p_down).unwrap();
    nodes[0].set_flow(ports[0].slot, 1.5).unwrap();
    nodes[1].set_flow(ports[1].slot, -1.5).unwrap();

    let h_up = table.h_steam_p(p_up).unwrap() + 5e4;
    let props_up = SteamProps::new(
        table.t_ph(p_up, h_up).unwrap(),
        h_up,
        table.s_ph(p_up, h_up).unwrap(),
        1.0,
    );
    nodes[0]
        .steam_slot_mut(ports[0].slot)
        .unwrap()
        .set(props_up, Tolerances::default())
        .unwrap();

    let mut valve = IsenthalpicExpansion::new();
    let mut ctx = HandlerCtx {
        name: "valve",
        ports: &ports,
        nodes: &mut nodes,
        table: &table,
    };
    assert!(valve.do_calculation(&mut ctx).unwrap());
    assert!(valve.is_finished(&ports, ctx.nodes));

    let down = nodes[1]
        .steam_slot(ports[1].slot)
        .unwrap()
        .props()
        .unwrap();
    assert_eq!(down.h, h_up);
    assert_eq!(down.t, table.t_ph(p_down, h_up).unwrap());
    assert_eq!(down.s, table.s_ph(p_down, h_up).unwrap());
    assert_eq!(down.x, table.x_ph(p_down, h_up).unwrap());
}

#[test]
fn isenthalpic_valve_zero_flow_degrades_both_sides() {
    let table = CurveFitTable::new();
    let (mut nodes, ports) = two_steam_nodes(4);

    nodes[0].set_flow(ports[0].slot, 0.0).unwrap();
    nodes[1].set_flow(ports[1].slot, 0.0).unwrap();

    let mut valve = IsenthalpicExpansion::new();
    let mut ctx = HandlerCtx {
        name: "valve",
        ports: &ports,
        nodes: &mut nodes,
        table: &table,
    };
    assert!(valve.do_calculation(&mut ctx).unwrap());
    assert!(nodes[0].steam_slot(ports[0].slot).unwrap().is_no_value());
    assert!(nodes[1].steam_slot(ports[1].slot).unwrap().is_no_value());
}

#[test]
fn reservoir_separates_liquid_and_vapor_branches() {
    // A saturated reservoir discharging through a liquid port and a vapor
    // port assigns the matching saturation branch to each.
    let table = CurveFitTable::new();

    let mut n_liq = Node::new(Id::from_index(0), "liq", PhysicalDomain::Steam);
    let mut n_vap = Node::new(Id::from_index(1), "vap", PhysicalDomain::Steam);
    let ports = vec![
        Port {
            node: Id::from_index(0),
            slot: n_liq.register(Id::from_index(9)),
        },
        Port {
            node: Id::from_index(1),
            slot: n_vap.register(Id::from_index(9)),
        },
    ];
    let mut nodes = vec![n_liq, n_vap];

    let mut reservoir = SaturatedSeparation::new(vec![true, false]);
    reservoir
        .initialize(&table, 420.0, 500.0, 400.0, 440.0, 1e5)
        .unwrap();
    reservoir.set_step_time(0.1);

    let p_res = reservoir.imposed_effort();
    assert!(p_res > 1e5, "above ambient at 420 K");

    // Both ports discharge.
    nodes[0].set_flow(ports[0].slot, -3.0).unwrap();
    nodes[1].set_flow(ports[1].slot, -0.2).unwrap();

    let mut ctx = HandlerCtx {
        name: "drum",
        ports: &ports,
        nodes: &mut nodes,
        table: &table,
    };
    while reservoir.do_calculation(&mut ctx).unwrap() {}
    assert!(reservoir.is_finished(&ports, ctx.nodes));

    let liq = nodes[0]
        .steam_slot(ports[0].slot)
        .unwrap()
        .props()
        .unwrap();
    let vap = nodes[1]
        .steam_slot(ports[1].slot)
        .unwrap()
        .props()
        .unwrap();
    assert_eq!(liq.x, 0.0);
    assert_eq!(vap.x, 1.0);
    assert_eq!(liq.h, table.h_liq_p(p_res).unwrap());
    assert_eq!(vap.h, table.h_steam_p(p_res).unwrap());
    assert!(vap.h > liq.h);

    // Discharge drains the inventory on commit.
    reservoir.prepare();
    assert!((reservoir.total_mass() - (500.0 - 0.32)).abs() < 1e-9);
}

#[test]
fn reservoir_charging_follows_the_linear_fit() {
    // Charging with hot condensate raises T along the fitted T(h) line and
    // the pressure follows the saturation curve.
    let table = CurveFitTable::new();

    let mut n_in = Node::new(Id::from_index(0), "in", PhysicalDomain::Steam);
    let ports = vec![Port {
        node: Id::from_index(0),
        slot: n_in.register(Id::from_index(9)),
    }];
    let mut nodes = vec![n_in];

    let mut reservoir = SaturatedSeparation::new(vec![true]);
    reservoir
        .initialize(&table, 410.0, 1000.0, 400.0, 440.0, 1e5)
        .unwrap();
    reservoir.set_step_time(1.0);
    let t0 = reservoir.temperature();
    let p0 = reservoir.imposed_effort();

    // 5 kg/s arriving hotter than the inventory.
    let h_in = table.h_liq_p(table.p_sat_t(435.0).unwrap()).unwrap();
    nodes[0].set_flow(ports[0].slot, 5.0).unwrap();
    nodes[0]
        .steam_slot_mut(ports[0].slot)
        .unwrap()
        .set(
            SteamProps::new(435.0, h_in, table.s_ph(p0, h_in).unwrap(), 0.0),
            Tolerances::default(),
        )
        .unwrap();

    let mut ctx = HandlerCtx {
        name: "drum",
        ports: &ports,
        nodes: &mut nodes,
        table: &table,
    };
    while reservoir.do_calculation(&mut ctx).unwrap() {}
    reservoir.prepare();

    assert!(reservoir.temperature() > t0);
    assert!(reservoir.imposed_effort() > p0);
    assert!((reservoir.total_mass() - 1005.0).abs() < 1e-9);
}
