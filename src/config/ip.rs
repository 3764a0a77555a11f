use std::collections::BTreeMap;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use ipnetwork::IpNetwork;
use serde::Serialize;

/// Address metadata attached to healthcheck `--ip` and `--next-hop` values
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct IpInfo {
    pub compressed: String,
    pub exploded: String,
    pub is_link_local: bool,
    pub is_loopback: bool,
    pub is_multicast: bool,
    pub is_private: bool,
    pub is_reserved: bool,
    pub is_unspecified: bool,
    pub max_prefixlen: u8,
    pub reverse_pointer: String,
    pub version: u8,
}

/// Single entry map keyed by the compressed representation
pub type IpMap = BTreeMap<String, IpInfo>;

struct Flags {
    link_local: bool,
    loopback: bool,
    multicast: bool,
    private: bool,
    reserved: bool,
    unspecified: bool,
}

impl Flags {
    fn of(addr: IpAddr) -> Self {
        match addr {
            IpAddr::V4(v4) => Self::v4(v4),
            IpAddr::V6(v6) => Self::v6(v6),
        }
    }

    fn v4(addr: Ipv4Addr) -> Self {
        const PRIVATE: &[([u8; 4], u8)] = &[
            ([0, 0, 0, 0], 8),
            ([10, 0, 0, 0], 8),
            ([127, 0, 0, 0], 8),
            ([169, 254, 0, 0], 16),
            ([172, 16, 0, 0], 12),
            ([192, 0, 0, 0], 29),
            ([192, 0, 0, 170], 31),
            ([192, 0, 2, 0], 24),
            ([192, 168, 0, 0], 16),
            ([198, 18, 0, 0], 15),
            ([198, 51, 100, 0], 24),
            ([203, 0, 113, 0], 24),
            ([240, 0, 0, 0], 4),
            ([255, 255, 255, 255], 32),
        ];
        let bits = u32::from(addr);
        let within = |net: [u8; 4], len: u8| {
            let mask = u32::MAX.checked_shl(32 - u32::from(len)).unwrap_or(0);
            bits & mask == u32::from(Ipv4Addr::from(net)) & mask
        };
        Self {
            link_local: within([169, 254, 0, 0], 16),
            loopback: within([127, 0, 0, 0], 8),
            multicast: within([224, 0, 0, 0], 4),
            private: PRIVATE.iter().any(|(net, len)| within(*net, *len)),
            reserved: within([240, 0, 0, 0], 4),
            unspecified: bits == 0,
        }
    }

    fn v6(addr: Ipv6Addr) -> Self {
        const PRIVATE: &[(u128, u8)] = &[
            (0, 128),                                      // ::
            (1, 128),                                      // ::1
            (0xffff_0000_0000, 96),                        // ::ffff:0:0/96
            (0x0100 << 112, 64),                           // 100::/64
            (0x2001 << 112, 23),                           // 2001::/23
            ((0x2001 << 112) | (0x0db8 << 96), 32),        // 2001:db8::/32
            ((0x2001 << 112) | (0x0010 << 96), 28),        // 2001:10::/28
            (0xfc00 << 112, 7),                            // fc00::/7
            (0xfe80 << 112, 10),                           // fe80::/10
        ];
        const RESERVED: &[(u128, u8)] = &[
            (0, 8),
            (0x0100 << 112, 8),
            (0x0200 << 112, 7),
            (0x0400 << 112, 6),
            (0x0800 << 112, 5),
            (0x1000 << 112, 4),
            (0x4000 << 112, 3),
            (0x6000 << 112, 3),
            (0x8000 << 112, 3),
            (0xa000 << 112, 3),
            (0xc000 << 112, 3),
            (0xe000 << 112, 4),
            (0xf000 << 112, 5),
            (0xf800 << 112, 6),
            (0xfe00 << 112, 9),
        ];
        let bits = u128::from(addr);
        let within = |net: u128, len: u8| {
            let mask = u128::MAX.checked_shl(128 - u32::from(len)).unwrap_or(0);
            bits & mask == net & mask
        };
        Self {
            link_local: within(0xfe80 << 112, 10),
            loopback: bits == 1,
            multicast: within(0xff00 << 112, 8),
            private: PRIVATE.iter().any(|(net, len)| within(*net, *len)),
            reserved: RESERVED.iter().any(|(net, len)| within(*net, *len)),
            unspecified: bits == 0,
        }
    }

    fn and(self, other: Self) -> Self {
        Self {
            link_local: self.link_local && other.link_local,
            loopback: self.loopback && other.loopback,
            multicast: self.multicast && other.multicast,
            private: self.private && other.private,
            reserved: self.reserved && other.reserved,
            unspecified: self.unspecified && other.unspecified,
        }
    }
}

fn exploded_addr(addr: IpAddr) -> String {
    match addr {
        IpAddr::V4(v4) => v4.to_string(),
        IpAddr::V6(v6) => v6
            .segments()
            .iter()
            .map(|s| format!("{:04x}", s))
            .collect::<Vec<_>>()
            .join(":"),
    }
}

/// Reverse DNS name (E.g. 1.0.0.10.in-addr.arpa)
pub fn reverse_pointer(addr: IpAddr) -> String {
    match addr {
        IpAddr::V4(v4) => {
            let octets = v4.octets();
            format!(
                "{}.{}.{}.{}.in-addr.arpa",
                octets[3], octets[2], octets[1], octets[0]
            )
        }
        IpAddr::V6(v6) => {
            let hex = format!("{:032x}", u128::from(v6));
            let mut nibbles: Vec<String> = hex.chars().rev().map(|c| c.to_string()).collect();
            nibbles.push("ip6.arpa".to_string());
            nibbles.join(".")
        }
    }
}

/// Last address covered by a network
fn last_address(network: &IpNetwork) -> IpAddr {
    match network {
        IpNetwork::V4(v4) => {
            let host_bits = u32::MAX.checked_shr(u32::from(v4.prefix())).unwrap_or(0);
            IpAddr::V4(Ipv4Addr::from(u32::from(v4.ip()) | host_bits))
        }
        IpNetwork::V6(v6) => {
            let host_bits = u128::MAX.checked_shr(u32::from(v6.prefix())).unwrap_or(0);
            IpAddr::V6(Ipv6Addr::from(u128::from(v6.ip()) | host_bits))
        }
    }
}

impl IpInfo {
    pub fn from_addr(addr: IpAddr) -> Self {
        Self::build(
            addr.to_string(),
            exploded_addr(addr),
            Flags::of(addr),
            addr,
            reverse_pointer(addr),
        )
    }

    /// Networks are flagged only when both ends of the range are
    pub fn from_network(network: &IpNetwork) -> Self {
        let flags = Flags::of(network.ip()).and(Flags::of(last_address(network)));
        Self::build(
            format!("{}/{}", network.ip(), network.prefix()),
            format!("{}/{}", exploded_addr(network.ip()), network.prefix()),
            flags,
            network.ip(),
            String::new(),
        )
    }

    fn build(
        compressed: String,
        exploded: String,
        flags: Flags,
        addr: IpAddr,
        reverse_pointer: String,
    ) -> Self {
        let (version, max_prefixlen) = match addr {
            IpAddr::V4(_) => (4, 32),
            IpAddr::V6(_) => (6, 128),
        };
        Self {
            compressed,
            exploded,
            is_link_local: flags.link_local,
            is_loopback: flags.loopback,
            is_multicast: flags.multicast,
            is_private: flags.private,
            is_reserved: flags.reserved,
            is_unspecified: flags.unspecified,
            max_prefixlen,
            reverse_pointer,
            version,
        }
    }
}

pub fn describe_addr(addr: IpAddr) -> IpMap {
    let info = IpInfo::from_addr(addr);
    let mut map = IpMap::new();
    map.insert(info.compressed.clone(), info);
    map
}

pub fn describe_networks<'a, I>(networks: I) -> IpMap
where
    I: IntoIterator<Item = &'a IpNetwork>,
{
    networks
        .into_iter()
        .map(|network| {
            let info = IpInfo::from_network(network);
            (info.compressed.clone(), info)
        })
        .collect()
}
