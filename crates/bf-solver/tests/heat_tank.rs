//! Heat-fluid circulation: tank with inner thermal mass fed by a flow
//! source in a closed loop.

use bf_core::units::constants::CP_WATER;
use bf_core::units::s;
use bf_elements::{Dissipator, Kind, Storage};
use bf_graph::PhysicalDomain;
use bf_handlers::{Handler, Mix, ScalarKind, ThermalCoupled, Volumized};
use bf_solver::{ModelBuilder, Solver};

#[test]
fn circulating_tank_holds_its_temperature() {
    // Tank (100 kg inner mass, 298.15 K) circulated by a 10 kg/s source at
    // the same temperature: after 10 steps of 0.1 s nothing may drift.
    let mut b = ModelBuilder::new();
    let outlet = b.add_node("tank-out", PhysicalDomain::HeatFluid);
    let inlet = b.add_node("tank-in", PhysicalDomain::HeatFluid);

    let mut storage = Storage::new(1.0);
    storage.set_state_value(2e5);
    let tank = b
        .add_element("tank", PhysicalDomain::HeatFluid, Kind::Capacitance(storage))
        .unwrap();
    let mut vol = Volumized::new(ScalarKind::Temperature { cp: CP_WATER });
    vol.set_inner_mass(100.0).unwrap();
    vol.set_initial(298.15);
    b.set_handler(tank, Handler::Volumized(vol)).unwrap();

    let pump = b
        .add_element(
            "pump",
            PhysicalDomain::HeatFluid,
            Kind::FlowSource { flow: 10.0 },
        )
        .unwrap();
    b.set_handler(pump, Handler::Mix(Mix::new(ScalarKind::Temperature { cp: CP_WATER })))
        .unwrap();

    b.connect_between(tank, outlet, inlet).unwrap();
    b.connect_between(pump, outlet, inlet).unwrap();
    b.set_step_time(s(0.1)).unwrap();

    let mut net = b.finish().unwrap();
    let mut solver = Solver::new();
    solver.add_network(&net, outlet);

    for _ in 0..10 {
        solver.prepare(&mut net).unwrap();
        solver.step_once(&mut net).unwrap();
    }

    // The outflow carries the stored temperature, so its heat-energy is
    // c_p · 298.15. Read before the next prepare resets the slots.
    let tank_out = net.element(tank).ports()[0];
    let t_out = net
        .node(outlet)
        .scalar_slot(tank_out.slot)
        .unwrap()
        .value()
        .unwrap();
    assert!((t_out - 298.15).abs() < 1e-8);
    assert!((CP_WATER * t_out - CP_WATER * 298.15).abs() < 1e-4);

    solver.prepare(&mut net).unwrap();

    // The tank temperature is unchanged to within 1e-8 K.
    let t_tank = net.element(tank).handler().unwrap().get_value().unwrap();
    assert!((t_tank - 298.15).abs() < 1e-8);

    // The pressure level is untouched by a balanced circulation.
    match net.element(tank).kind() {
        Kind::Capacitance(st) => assert_eq!(st.state_value(), 2e5),
        _ => unreachable!(),
    }
}

#[test]
fn thermally_coupled_tank_warms_toward_ambient() {
    // The tank's thermal surface is a coupled effort source in a thermal
    // circuit against a hotter ambient. Heat conducts in through a linear
    // thermal resistor; the tank temperature climbs monotonically and
    // never overshoots the ambient.
    let mut b = ModelBuilder::new();
    let outlet = b.add_node("tank-out", PhysicalDomain::HeatFluid);
    let inlet = b.add_node("tank-in", PhysicalDomain::HeatFluid);
    let surface = b.add_node("surface", PhysicalDomain::Thermal);
    let ambient_node = b.add_node("ambient", PhysicalDomain::Thermal);

    let mut storage = Storage::new(1.0);
    storage.set_state_value(2e5);
    let tank = b
        .add_element("tank", PhysicalDomain::HeatFluid, Kind::Capacitance(storage))
        .unwrap();
    let mut coupled = ThermalCoupled::new(ScalarKind::Temperature { cp: CP_WATER });
    coupled.inner.set_inner_mass(100.0).unwrap();
    coupled.inner.set_initial(298.15);
    b.set_handler(tank, Handler::ThermalCoupled(coupled)).unwrap();

    let pump = b
        .add_element(
            "pump",
            PhysicalDomain::HeatFluid,
            Kind::FlowSource { flow: 10.0 },
        )
        .unwrap();
    b.set_handler(pump, Handler::Mix(Mix::new(ScalarKind::Temperature { cp: CP_WATER })))
        .unwrap();

    // Thermal side: surface source, conduction, fixed ambient.
    let t_src = b
        .add_element(
            "tank-surface",
            PhysicalDomain::Thermal,
            Kind::EffortSource { effort: 298.15 },
        )
        .unwrap();
    let conduction = b
        .add_element(
            "conduction",
            PhysicalDomain::Thermal,
            Kind::Dissipator(Dissipator::linear(1e-3).unwrap()),
        )
        .unwrap();
    let ambient = b
        .add_element(
            "ambient",
            PhysicalDomain::Thermal,
            Kind::Origin {
                effort: 350.0,
                accepts_external: false,
            },
        )
        .unwrap();

    b.connect_between(tank, outlet, inlet).unwrap();
    b.connect_between(pump, outlet, inlet).unwrap();
    b.connect(t_src, surface).unwrap();
    b.connect_between(conduction, surface, ambient_node).unwrap();
    b.connect(ambient, ambient_node).unwrap();
    b.attach_thermal_source(tank, t_src).unwrap();
    b.set_step_time(s(0.1)).unwrap();

    let mut net = b.finish().unwrap();
    let mut solver = Solver::new();
    solver.add_network(&net, outlet);
    solver.add_network(&net, surface);

    let mut previous = 298.15;
    for _ in 0..20 {
        solver.prepare(&mut net).unwrap();
        solver.step_once(&mut net).unwrap();
        // The committed state trails the sweep by one prepare.
        let t = net.element(tank).handler().unwrap().get_value().unwrap();
        assert!(t >= previous, "warming must be monotone");
        assert!(t <= 350.0);
        previous = t;
    }
    solver.prepare(&mut net).unwrap();
    let t_final = net.element(tank).handler().unwrap().get_value().unwrap();
    assert!(t_final > 298.15, "conduction must have warmed the tank");
    assert!(t_final < 350.0);

    // The surface source tracks the committed tank temperature.
    match net.element(t_src).kind() {
        Kind::EffortSource { effort } => assert!((effort - t_final).abs() < 1e-12),
        _ => unreachable!(),
    }
}
