//! Authoritative DNS zone-data management core.
//!
//! Mutates PowerDNS-style `domains`/`records` tables behind a permissioned
//! service façade: CNAME exclusivity, SOA serial maintenance, and PTR
//! mirroring for forward address records. Transport layers live elsewhere
//! and consume [`records::RecordService`].

pub mod access;
pub mod audit;
pub mod config;
pub mod db;
pub mod error;
pub mod records;
