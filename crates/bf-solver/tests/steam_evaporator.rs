//! Fixed-volume evaporator scenarios.

use approx::assert_relative_eq;
use bf_core::units::s;
use bf_elements::{Kind, Storage};
use bf_graph::PhysicalDomain;
use bf_handlers::{Handler, IsobaricIsochoric};
use bf_solver::{ModelBuilder, Network, Solver};
use bf_steam::{CurveFitTable, SteamTable};

const P_OPERATING: f64 = 1e5;

/// Evaporator between a closed feed and a pressure-anchored outlet, with an
/// optional thermal duty wired to the side.
fn build_evaporator(t_init: f64, duty_w: Option<f64>) -> (Network, Solver, bf_core::ElemId) {
    let table = CurveFitTable::new();

    let mut b = ModelBuilder::new();
    let n_in = b.add_node("feed", PhysicalDomain::Steam);
    let n_out = b.add_node("steam-out", PhysicalDomain::Steam);

    let feed = b
        .add_element("feed-valve", PhysicalDomain::Steam, Kind::Open)
        .unwrap();
    b.connect(feed, n_in).unwrap();

    let mut handler = IsobaricIsochoric::new(1.0);
    handler.initialize(&table, P_OPERATING, t_init).unwrap();
    let evap = b
        .add_element(
            "evaporator",
            PhysicalDomain::Steam,
            Kind::Capacitance(Storage::new(1.0)),
        )
        .unwrap();
    b.set_handler(evap, Handler::IsobaricIsochoric(handler)).unwrap();
    b.connect_between(evap, n_in, n_out).unwrap();

    let anchor = b
        .add_element(
            "pressure-anchor",
            PhysicalDomain::Steam,
            Kind::Origin {
                effort: P_OPERATING,
                accepts_external: true,
            },
        )
        .unwrap();
    b.connect(anchor, n_out).unwrap();

    let mut thermal_start = None;
    if let Some(q) = duty_w {
        let tn = b.add_node("duty", PhysicalDomain::Thermal);
        let burner = b
            .add_element("burner", PhysicalDomain::Thermal, Kind::FlowSource { flow: q })
            .unwrap();
        b.connect(burner, tn).unwrap();
        b.attach_thermal_source(evap, burner).unwrap();
        thermal_start = Some(tn);
    }

    b.set_step_time(s(0.1)).unwrap();
    let net = b.finish().unwrap();
    let mut solver = Solver::new();
    solver.add_network(&net, n_in);
    if let Some(tn) = thermal_start {
        solver.add_network(&net, tn);
    }
    (net, solver, evap)
}

fn evaporator_handler(net: &Network, evap: bf_core::ElemId) -> &IsobaricIsochoric {
    match net.element(evap).handler() {
        Some(Handler::IsobaricIsochoric(h)) => h,
        _ => unreachable!(),
    }
}

#[test]
fn idle_evaporator_stays_put() {
    // No feed, no duty: the outflow is numerically zero and the internal
    // state does not move.
    let (mut net, mut solver, evap) = build_evaporator(298.15, None);

    let m0 = evaporator_handler(&net, evap).inner_mass();
    let h0 = evaporator_handler(&net, evap).heat_energy();

    for _ in 0..10 {
        solver.prepare(&mut net).unwrap();
        solver.step_once(&mut net).unwrap();

        let out_port = net.element(evap).ports()[1];
        let out_flow = net.node(out_port.node).flow(out_port.slot).unwrap();
        assert!(out_flow.abs() < 1e-5);
    }
    solver.prepare(&mut net).unwrap();

    let h = evaporator_handler(&net, evap);
    assert_relative_eq!(h.inner_mass(), m0, epsilon = 1e-9);
    assert_relative_eq!(h.heat_energy(), h0, epsilon = 1e-9);
}

#[test]
fn heated_evaporator_expels_steam() {
    // Initialized at saturation with a 10 kW duty and no mechanical feed:
    // every step expels a small outflow and the stored heat-energy climbs
    // monotonically.
    let table = CurveFitTable::new();
    let t_sat = table.t_sat_p(P_OPERATING).unwrap();
    let (mut net, mut solver, evap) = build_evaporator(t_sat, Some(10_000.0));

    let mut previous_h = evaporator_handler(&net, evap).heat_energy();
    for step in 0..10 {
        solver.prepare(&mut net).unwrap();

        // Prepare commits the previous step; heat-energy climbs monotonically.
        let h = evaporator_handler(&net, evap).heat_energy();
        assert!(h >= previous_h, "step {step}: heat-energy must not fall");
        previous_h = h;

        solver.step_once(&mut net).unwrap();

        let out_port = net.element(evap).ports()[1];
        let out_flow = net.node(out_port.node).flow(out_port.slot).unwrap();
        assert!(out_flow < 0.0, "step {step}: steam must leave the outlet");
        let magnitude = out_flow.abs();
        assert!(
            (0.002..=0.02).contains(&magnitude),
            "step {step}: outflow {magnitude} out of the expected band"
        );
    }
    solver.prepare(&mut net).unwrap();
    assert!(
        evaporator_handler(&net, evap).heat_energy() > previous_h,
        "heating must raise the stored heat-energy"
    );
}
