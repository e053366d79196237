//! CIDR - IPv4 address blocks and subnet allocation
//!
//! Subnets are carved out of a parent block in request order. Each request is
//! aligned up to its own mask boundary, so a /28 requested after two /24s
//! starts right after them.

use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CidrError {
    #[error("Invalid CIDR format '{0}': expected IP/prefix")]
    Format(String),

    #[error("Invalid IP address '{0}'")]
    InvalidAddress(String),

    #[error("Invalid prefix length '{0}': must be 0-32")]
    InvalidPrefix(String),

    #[error("CIDR '{cidr}' has host bits set (network address is {network})")]
    HostBitsSet { cidr: String, network: Ipv4Addr },

    #[error("Subnet mask /{prefix} does not fit inside {parent}")]
    InvalidSubnetMask { prefix: u8, parent: Ipv4Cidr },

    #[error("Address space {parent} has no room left for another /{prefix} subnet")]
    Exhausted { parent: Ipv4Cidr, prefix: u8 },
}

/// An IPv4 network block (e.g., 10.0.0.0/16)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ipv4Cidr {
    network: Ipv4Addr,
    prefix: u8,
}

impl Ipv4Cidr {
    pub fn new(network: Ipv4Addr, prefix: u8) -> Result<Self, CidrError> {
        if prefix > 32 {
            return Err(CidrError::InvalidPrefix(prefix.to_string()));
        }
        let cidr = Self { network, prefix };
        let masked = Ipv4Addr::from(u32::from(network) & cidr.mask());
        if masked != network {
            return Err(CidrError::HostBitsSet {
                cidr: format!("{}/{}", network, prefix),
                network: masked,
            });
        }
        Ok(cidr)
    }

    pub fn network(&self) -> Ipv4Addr {
        self.network
    }

    pub fn prefix(&self) -> u8 {
        self.prefix
    }

    /// Number of addresses in the block
    pub fn size(&self) -> u64 {
        1u64 << (32 - u32::from(self.prefix))
    }

    fn mask(&self) -> u32 {
        if self.prefix == 0 {
            0
        } else {
            u32::MAX << (32 - u32::from(self.prefix))
        }
    }

    fn start(&self) -> u64 {
        u64::from(u32::from(self.network))
    }

    fn end(&self) -> u64 {
        self.start() + self.size()
    }

    /// Returns true if `other` lies entirely inside this block
    pub fn contains(&self, other: &Ipv4Cidr) -> bool {
        other.prefix >= self.prefix && other.start() >= self.start() && other.end() <= self.end()
    }
}

impl fmt::Display for Ipv4Cidr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.network, self.prefix)
    }
}

impl FromStr for Ipv4Cidr {
    type Err = CidrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (ip, prefix) = s
            .split_once('/')
            .ok_or_else(|| CidrError::Format(s.to_string()))?;

        let network: Ipv4Addr = ip
            .parse()
            .map_err(|_| CidrError::InvalidAddress(ip.to_string()))?;

        let prefix: u8 = prefix
            .parse()
            .map_err(|_| CidrError::InvalidPrefix(prefix.to_string()))?;

        Self::new(network, prefix)
    }
}

/// Hands out consecutive, non-overlapping subnets of a parent block
#[derive(Debug, Clone)]
pub struct SubnetAllocator {
    parent: Ipv4Cidr,
    next: u64,
}

impl SubnetAllocator {
    pub fn new(parent: Ipv4Cidr) -> Self {
        Self {
            parent,
            next: parent.start(),
        }
    }

    pub fn parent(&self) -> Ipv4Cidr {
        self.parent
    }

    /// Allocate the next free block with the given prefix length
    pub fn allocate(&mut self, prefix: u8) -> Result<Ipv4Cidr, CidrError> {
        if prefix < self.parent.prefix || prefix > 32 {
            return Err(CidrError::InvalidSubnetMask {
                prefix,
                parent: self.parent,
            });
        }

        let size = 1u64 << (32 - u32::from(prefix));
        let start = self.next.div_ceil(size) * size;
        if start + size > self.parent.end() {
            return Err(CidrError::Exhausted {
                parent: self.parent,
                prefix,
            });
        }

        self.next = start + size;
        // start < 2^32 because it lies inside the parent block
        Ipv4Cidr::new(Ipv4Addr::from(start as u32), prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cidr(s: &str) -> Ipv4Cidr {
        s.parse().unwrap()
    }

    #[test]
    fn parse_and_display() {
        assert_eq!(cidr("10.0.0.0/16").to_string(), "10.0.0.0/16");
        assert_eq!(cidr("0.0.0.0/0").size(), 1u64 << 32);
        assert_eq!(cidr("255.255.255.255/32").size(), 1);
    }

    #[test]
    fn parse_errors() {
        assert!(matches!(
            "10.0.0.0".parse::<Ipv4Cidr>(),
            Err(CidrError::Format(_))
        ));
        assert!(matches!(
            "10.0.0/16".parse::<Ipv4Cidr>(),
            Err(CidrError::InvalidAddress(_))
        ));
        assert!(matches!(
            "10.0.0.256/16".parse::<Ipv4Cidr>(),
            Err(CidrError::InvalidAddress(_))
        ));
        assert!(matches!(
            "10.0.0.0/33".parse::<Ipv4Cidr>(),
            Err(CidrError::InvalidPrefix(_))
        ));
        assert!(matches!(
            "10.0.1.0/16".parse::<Ipv4Cidr>(),
            Err(CidrError::HostBitsSet { .. })
        ));
    }

    #[test]
    fn allocates_in_request_order_with_alignment() {
        let mut alloc = SubnetAllocator::new(cidr("10.0.0.0/16"));
        assert_eq!(alloc.allocate(24).unwrap(), cidr("10.0.0.0/24"));
        assert_eq!(alloc.allocate(24).unwrap(), cidr("10.0.1.0/24"));
        assert_eq!(alloc.allocate(28).unwrap(), cidr("10.0.2.0/28"));
        assert_eq!(alloc.allocate(28).unwrap(), cidr("10.0.2.16/28"));
        // A larger block after small ones is pushed to its next boundary
        assert_eq!(alloc.allocate(24).unwrap(), cidr("10.0.3.0/24"));
    }

    #[test]
    fn allocation_exhausts_small_parent() {
        let mut alloc = SubnetAllocator::new(cidr("192.168.0.0/24"));
        assert!(matches!(
            alloc.allocate(24),
            Ok(c) if c == cidr("192.168.0.0/24")
        ));
        assert!(matches!(
            alloc.allocate(28),
            Err(CidrError::Exhausted { prefix: 28, .. })
        ));
    }

    #[test]
    fn subnet_larger_than_parent_is_rejected() {
        let mut alloc = SubnetAllocator::new(cidr("10.0.0.0/26"));
        assert!(matches!(
            alloc.allocate(24),
            Err(CidrError::InvalidSubnetMask { prefix: 24, .. })
        ));
    }

    #[test]
    fn containment() {
        let vpc = cidr("10.0.0.0/16");
        assert!(vpc.contains(&cidr("10.0.2.16/28")));
        assert!(!vpc.contains(&cidr("10.1.0.0/24")));
        assert!(!cidr("10.0.0.0/24").contains(&vpc));
    }
}
