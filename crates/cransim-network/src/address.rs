//! Address segments and address allocation.

use std::collections::BTreeMap;
use std::fmt;
use std::net::Ipv4Addr;

use serde::{Serialize, Serializer};

use crate::error::NetworkError;
use crate::node::NodeId;

/// Unique segment id.
pub type SegmentId = usize;

/// IPv4 network prefix.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Subnet {
    /// Network address.
    pub base: Ipv4Addr,
    /// Prefix length in bits.
    pub prefix_len: u8,
}

impl Subnet {
    /// Creates a subnet from a base address and a dotted network mask.
    ///
    /// The mask must be contiguous and the base must not have host bits set.
    pub fn from_mask(base: Ipv4Addr, mask: Ipv4Addr) -> Result<Self, NetworkError> {
        let bits = u32::from(mask);
        if bits.leading_ones() + bits.trailing_zeros() != 32 {
            return Err(NetworkError::Configuration(format!("non-contiguous network mask {}", mask)));
        }
        if u32::from(base) & !bits != 0 {
            return Err(NetworkError::Configuration(format!(
                "base address {} has host bits set for mask {}",
                base, mask
            )));
        }
        Ok(Self {
            base,
            prefix_len: bits.leading_ones() as u8,
        })
    }

    /// Creates a host (/32) subnet.
    pub fn host(address: Ipv4Addr) -> Self {
        Self {
            base: address,
            prefix_len: 32,
        }
    }

    /// Returns the network mask as an integer.
    pub fn mask_bits(&self) -> u32 {
        if self.prefix_len == 0 {
            0
        } else {
            u32::MAX << (32 - self.prefix_len as u32)
        }
    }

    /// Returns true if the address belongs to the subnet.
    pub fn contains(&self, address: Ipv4Addr) -> bool {
        u32::from(address) & self.mask_bits() == u32::from(self.base)
    }

    /// Returns true if the two subnets share at least one address.
    pub fn overlaps(&self, other: &Subnet) -> bool {
        let mask = self.mask_bits() & other.mask_bits();
        u32::from(self.base) & mask == u32::from(other.base) & mask
    }

    /// Returns the number of assignable host addresses (network and broadcast addresses excluded).
    pub fn host_capacity(&self) -> u32 {
        let size = 1u64 << (32 - self.prefix_len as u32);
        size.saturating_sub(2) as u32
    }
}

impl fmt::Display for Subnet {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}/{}", self.base, self.prefix_len)
    }
}

impl Serialize for Subnet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A block of addresses shared by the nodes of one link tier.
///
/// Addresses are handed out sequentially starting from the first host address. No address is handed out twice.
#[derive(Clone, Debug)]
pub struct AddressSegment {
    subnet: Subnet,
    next_host: u32,
    assigned: BTreeMap<Ipv4Addr, NodeId>,
}

impl AddressSegment {
    /// Creates a segment, failing for masks without room for host addresses.
    pub fn new(base: Ipv4Addr, mask: Ipv4Addr) -> Result<Self, NetworkError> {
        let subnet = Subnet::from_mask(base, mask)?;
        if subnet.host_capacity() == 0 {
            return Err(NetworkError::Configuration(format!(
                "address segment {} has no host addresses",
                subnet
            )));
        }
        Ok(Self {
            subnet,
            next_host: 1,
            assigned: BTreeMap::new(),
        })
    }

    /// Returns the segment prefix.
    pub fn subnet(&self) -> Subnet {
        self.subnet
    }

    /// Returns the number of addresses that can still be allocated.
    pub fn remaining(&self) -> u32 {
        self.subnet.host_capacity() + 1 - self.next_host
    }

    /// Allocates the next free address for the node.
    pub fn allocate(&mut self, node: NodeId) -> Result<Ipv4Addr, NetworkError> {
        if self.remaining() == 0 {
            return Err(NetworkError::SegmentExhausted {
                subnet: self.subnet,
                capacity: self.subnet.host_capacity(),
            });
        }
        let address = Ipv4Addr::from(u32::from(self.subnet.base) + self.next_host);
        self.next_host += 1;
        self.assigned.insert(address, node);
        Ok(address)
    }

    /// Returns allocated addresses with their owners in address order.
    pub fn assigned(&self) -> &BTreeMap<Ipv4Addr, NodeId> {
        &self.assigned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(s: &str) -> Ipv4Addr {
        s.parse().unwrap()
    }

    #[test]
    fn subnet_from_mask() {
        let subnet = Subnet::from_mask(addr("10.1.0.0"), addr("255.255.255.0")).unwrap();
        assert_eq!(subnet.prefix_len, 24);
        assert_eq!(subnet.to_string(), "10.1.0.0/24");
        assert!(subnet.contains(addr("10.1.0.254")));
        assert!(!subnet.contains(addr("10.1.1.1")));
        assert_eq!(subnet.host_capacity(), 254);
    }

    #[test]
    fn invalid_masks_are_rejected() {
        assert!(Subnet::from_mask(addr("10.0.0.0"), addr("255.0.255.0")).is_err());
        assert!(Subnet::from_mask(addr("10.0.0.1"), addr("255.255.255.0")).is_err());
        assert!(AddressSegment::new(addr("10.0.0.0"), addr("255.255.255.254")).is_err());
        assert!(AddressSegment::new(addr("10.0.0.0"), addr("255.255.255.255")).is_err());
    }

    #[test]
    fn overlap() {
        let a = Subnet::from_mask(addr("10.0.0.0"), addr("255.255.0.0")).unwrap();
        let b = Subnet::from_mask(addr("10.0.3.0"), addr("255.255.255.0")).unwrap();
        let c = Subnet::from_mask(addr("10.1.0.0"), addr("255.255.255.0")).unwrap();
        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
        assert!(!a.overlaps(&c));
        assert!(!b.overlaps(&c));
    }

    #[test]
    fn sequential_allocation_until_exhausted() {
        let mut segment = AddressSegment::new(addr("192.168.0.0"), addr("255.255.255.252")).unwrap();
        assert_eq!(segment.remaining(), 2);
        assert_eq!(segment.allocate(0).unwrap(), addr("192.168.0.1"));
        assert_eq!(segment.allocate(1).unwrap(), addr("192.168.0.2"));
        let err = segment.allocate(2).unwrap_err();
        assert!(matches!(err, NetworkError::SegmentExhausted { capacity: 2, .. }));
        assert_eq!(segment.assigned().len(), 2);
    }
}
