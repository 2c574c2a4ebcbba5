//! The operations the service offers, independent of how they are reached.
//!
//! Every function takes the shared [`ServiceState`](crate::ServiceState) and,
//! where it matters, the calling [`Principal`](crate::Principal).

pub mod catalog;
pub mod gateway;
pub mod ingest;
pub mod validation;
