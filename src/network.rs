//! Network identity primitives
//!
//! Provides:
//! - Interface address parsing with default prefix widths
//! - Ordered, deduplicated per-family address sets
//! - Named interfaces grouping IPv4 and IPv6 addresses

pub mod addr;
pub mod iface;

pub use addr::{AddrSet, IpInput, parse_ifaddr};
pub use iface::Interface;
