//! Cart and pricing domain
pub mod aggregates;
pub mod events;
pub mod pricing;
pub mod value_objects;
