//! Port Timers (spec.md §4.E). PTI has no distinct states in the standard
//! (it runs continuously); it simply decrements every timer once per tick.

use crate::model::{PerTreePort, Port};

/// Port-level timers (spec.md §3 Port: `edgeDelayWhile`, `mdelayWhile`).
pub fn tick_port(port: &mut Port) {
    port.edge_delay_while.tick();
    port.mdelay_while.tick();
}

/// Per-tree-per-port timers (spec.md §3 PerTreePort).
pub fn tick_ptp(ptp: &mut PerTreePort) {
    ptp.hello_when.tick();
    ptp.tc_while.tick();
    ptp.fd_while.tick();
    ptp.rb_while.tick();
    ptp.rr_while.tick();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ident::PortIdentifier;
    use crate::model::PerTreePort;

    #[test]
    fn tick_ptp_decrements_all_named_timers() {
        let mut ptp = PerTreePort::new(PortIdentifier::default(), true);
        ptp.hello_when.set(2);
        ptp.tc_while.set(3);
        ptp.fd_while.set(4);
        ptp.rb_while.set(5);
        ptp.rr_while.set(6);
        tick_ptp(&mut ptp);
        assert_eq!(ptp.hello_when.value(), 1);
        assert_eq!(ptp.tc_while.value(), 2);
        assert_eq!(ptp.fd_while.value(), 3);
        assert_eq!(ptp.rb_while.value(), 4);
        assert_eq!(ptp.rr_while.value(), 5);
    }
}
