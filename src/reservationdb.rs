use std::{
    borrow::Borrow,
    hash::{Hash, Hasher},
    sync::Arc,
};

use advmac::MacAddr6;
use dashmap::DashMap;

use crate::{Duid, Option1837, Reservation};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReservationKey {
    Mac(MacAddr6),
    Duid(Duid),
    Option1837(Option1837),
}

/* IMPORTANT: for each variant we hash ONLY the payload, so that the hash
 * equals the hash of the borrowed key. */
impl Hash for ReservationKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            ReservationKey::Mac(m) => m.hash(state),
            ReservationKey::Duid(d) => d.hash(state),
            ReservationKey::Option1837(o) => o.hash(state),
        }
    }
}

impl Borrow<MacAddr6> for ReservationKey {
    fn borrow(&self) -> &MacAddr6 {
        match self {
            ReservationKey::Mac(ref m) => m,
            _ => panic!("called borrow::<MacAddr6> on non-Mac key"),
        }
    }
}

impl Borrow<Duid> for ReservationKey {
    fn borrow(&self) -> &Duid {
        match self {
            ReservationKey::Duid(ref d) => d,
            _ => panic!("called borrow::<Duid> on non-Duid key"),
        }
    }
}

impl Borrow<Option1837> for ReservationKey {
    fn borrow(&self) -> &Option1837 {
        match self {
            ReservationKey::Option1837(ref o) => o,
            _ => panic!("called borrow::<Option1837> on non-Option1837 key"),
        }
    }
}

/* DashMap uses the == operator between &K and &Q, so the comparisons below
 * are written by hand for each borrowed-key type. */

impl PartialEq<MacAddr6> for ReservationKey {
    fn eq(&self, other: &MacAddr6) -> bool {
        matches!(self, ReservationKey::Mac(m) if m == other)
    }
}
impl PartialEq<ReservationKey> for MacAddr6 {
    fn eq(&self, other: &ReservationKey) -> bool {
        other == self
    }
}

impl PartialEq<Duid> for ReservationKey {
    fn eq(&self, other: &Duid) -> bool {
        matches!(self, ReservationKey::Duid(d) if d == other)
    }
}
impl PartialEq<ReservationKey> for Duid {
    fn eq(&self, other: &ReservationKey) -> bool {
        other == self
    }
}

impl PartialEq<Option1837> for ReservationKey {
    fn eq(&self, other: &Option1837) -> bool {
        matches!(self, ReservationKey::Option1837(o) if o == other)
    }
}
impl PartialEq<ReservationKey> for Option1837 {
    fn eq(&self, other: &ReservationKey) -> bool {
        other == self
    }
}

pub struct ReservationDb {
    inner: DashMap<ReservationKey, Arc<Reservation>>,
}

impl Default for ReservationDb {
    fn default() -> Self {
        Self::new()
    }
}

impl ReservationDb {
    pub fn new() -> Self {
        Self {
            inner: DashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.inner
            .iter()
            .map(|e| Arc::as_ptr(e.value()))
            .collect::<std::collections::HashSet<_>>()
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn insert(&self, reservation: Reservation) {
        let stored = Arc::new(reservation);

        if let Some(mac) = stored.mac {
            self.inner.insert(ReservationKey::Mac(mac), stored.clone());
        }

        if let Some(ref duid) = stored.duid {
            self.inner
                .insert(ReservationKey::Duid(duid.clone()), stored.clone());
        }

        if let Some(ref opt1837) = stored.option1837 {
            self.inner
                .insert(ReservationKey::Option1837(opt1837.clone()), stored.clone());
        }
    }

    pub fn load_reservations(&self, reservations: Vec<Reservation>) {
        for reservation in reservations.into_iter() {
            self.insert(reservation);
        }
    }

    pub fn by_mac(&self, mac: &MacAddr6) -> Option<Arc<Reservation>> {
        self.inner.get(mac).map(|r| Arc::clone(r.value()))
    }

    pub fn by_duid(&self, duid: &Duid) -> Option<Arc<Reservation>> {
        self.inner.get(duid).map(|r| Arc::clone(r.value()))
    }

    pub fn by_option1837(&self, opt: &Option1837) -> Option<Arc<Reservation>> {
        self.inner.get(opt).map(|r| Arc::clone(r.value()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dashmap::DashMap;

    #[test]
    fn test_mac_borrow() {
        let key = ReservationKey::Mac(MacAddr6::new([0x00, 0x1A, 0x2B, 0x3C, 0x4D, 0x5E]));
        let borrowed: &MacAddr6 = key.borrow();
        assert_eq!(
            borrowed,
            &MacAddr6::new([0x00, 0x1A, 0x2B, 0x3C, 0x4D, 0x5E])
        );
    }

    #[test]
    fn test_map_lookups() {
        let map: DashMap<ReservationKey, &'static str> = DashMap::new();

        let mac: MacAddr6 = "00:11:22:33:44:55".parse().unwrap();
        map.insert(ReservationKey::Mac(mac), "alice");

        let duid = Duid::from(vec![0xde, 0xad, 0xbe, 0xef]);
        map.insert(ReservationKey::Duid(duid.clone()), "bob");

        let opt1837 = Option1837 {
            interface: Some("eth0/1".into()),
            remote: Some("00-11-22-33-44-55".into()),
            enterprise_number: None,
        };
        map.insert(ReservationKey::Option1837(opt1837.clone()), "charlie");

        assert_eq!(*map.get(&mac).unwrap().value(), "alice");
        assert_eq!(*map.get(&duid).unwrap().value(), "bob");
        assert_eq!(*map.get(&opt1837).unwrap().value(), "charlie");
    }

    #[test]
    fn test_reservation_lookups() {
        let db = ReservationDb::new();

        let json_str = r#"
        [
            {
                "ipv6_na": "2605:cb40:1:2::1",
                "ipv6_pd": "2605:cb40:1:3::/56",
                "mac": "00-11-22-33-44-55"
            },
            {
                "ipv6_na": "2605:cb40:1:4::1",
                "ipv6_pd": "2605:cb40:1:5::/56",
                "mac": "00-11-22-33-44-57"
            },
            {
                "ipv6_na": "2605:cb40:1:8::1",
                "ipv6_pd": "2605:cb40:1:9::/56",
                "duid": "00:11:22:33:44:55:66"
            }
        ]
        "#;
        let reservations: Vec<Reservation> = serde_json::from_str(json_str).unwrap();
        for reservation in reservations.into_iter() {
            db.insert(reservation);
        }

        assert_eq!(
            db.by_mac(&MacAddr6::new([0x00, 0x11, 0x22, 0x33, 0x44, 0x55]))
                .unwrap()
                .ipv6_na,
            "2605:cb40:1:2::1".parse::<std::net::Ipv6Addr>().unwrap()
        );

        assert_eq!(
            db.by_duid(&Duid::from(vec![0x00, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66]))
                .unwrap()
                .ipv6_na,
            "2605:cb40:1:8::1".parse::<std::net::Ipv6Addr>().unwrap()
        );
    }
}
