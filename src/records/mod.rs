//! Record mutation engine: repository, invariant guards, reverse-zone
//! resolution, PTR mirroring, and the service façade tying them together.

pub mod cname;
pub mod ptr;
pub mod repository;
pub mod reverse;
pub mod serial;
pub mod service;

pub use service::RecordService;
