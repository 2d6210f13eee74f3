//! The wraith scanning engine: probe strategies, the worker pool, the
//! shared result store, post-scan enrichment, and report assembly.

pub mod enrich;
pub mod probe;
pub mod report;
pub mod scan;
pub mod scheduler;
pub mod store;
