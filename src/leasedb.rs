use dashmap::DashMap;

use crate::{LeaseV6, Reservation};

/// Minimal in-memory lease store backing the example allocation handler.
/// Persistent lease storage proper is an external collaborator (SPEC_FULL.md §1).
#[derive(Clone)]
pub struct LeaseDb {
    v6: DashMap<Reservation, LeaseV6>,
}

impl Default for LeaseDb {
    fn default() -> Self {
        Self::new()
    }
}

impl LeaseDb {
    pub fn new() -> Self {
        Self { v6: DashMap::new() }
    }

    pub fn leased(&self, reservation: &Reservation, lease: LeaseV6) {
        self.v6.insert(reservation.clone(), lease);
    }

    pub fn get(&self, reservation: &Reservation) -> Option<LeaseV6> {
        self.v6.get(reservation).map(|r| r.value().clone())
    }
}
