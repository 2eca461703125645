//! IPv4 helpers for the mock store

use crate::models::*;
use std::net::Ipv4Addr;

fn parse_cidr(cidr: &str) -> Option<(Ipv4Addr, u8)> {
    let (network, mask) = cidr.split_once('/')?;
    let network: Ipv4Addr = network.parse().ok()?;
    let mask: u8 = mask.parse().ok().filter(|m| *m <= 32)?;
    Some((network, mask))
}

fn mask_bits(mask: u8) -> u32 {
    if mask == 0 { 0 } else { u32::MAX << (32 - u32::from(mask)) }
}

/// Build a subnet record with phpIPAM-style derived values
pub(crate) fn build_subnet(id: u64, section_id: &str, cidr: &str, description: &str, gateway: Option<&str>) -> Subnet {
    let (network, mask) = parse_cidr(cidr).unwrap_or((Ipv4Addr::UNSPECIFIED, 32));
    let bits = mask_bits(mask);
    let network_u32 = u32::from(network) & bits;
    let broadcast = Ipv4Addr::from(network_u32 | !bits);
    let hosts = match mask {
        32 => 1,
        31 => 2,
        m => (1u64 << (32 - u32::from(m))) - 2,
    };

    Subnet {
        id: id.to_string(),
        subnet: Ipv4Addr::from(network_u32).to_string(),
        mask: mask.to_string(),
        section_id: section_id.to_string(),
        description: description.to_string(),
        gateway: gateway.map(|ip| Gateway { ip_addr: ip.to_string(), id: String::new() }),
        calculation: Calculation {
            kind: "IPv4".to_string(),
            network: Ipv4Addr::from(network_u32).to_string(),
            broadcast: broadcast.to_string(),
            bitmask: mask.to_string(),
            netmask: Ipv4Addr::from(bits).to_string(),
            hosts: hosts.to_string(),
        },
    }
}

/// First host address of `subnet` not present in `used` and not the gateway
pub(crate) fn first_free(subnet: &Subnet, used: &[Ipv4Addr]) -> Option<Ipv4Addr> {
    let (network, mask) = parse_cidr(&subnet.cidr())?;
    let bits = mask_bits(mask);
    let network_u32 = u32::from(network) & bits;
    let broadcast_u32 = network_u32 | !bits;
    let (first, last) = if mask >= 31 {
        (network_u32, broadcast_u32)
    } else {
        (network_u32 + 1, broadcast_u32 - 1)
    };
    let gateway: Option<Ipv4Addr> = subnet.gateway_ip().parse().ok();

    (first..=last)
        .map(Ipv4Addr::from)
        .find(|ip| Some(*ip) != gateway && !used.contains(ip))
}
