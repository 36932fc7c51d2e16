// Domain layer: field catalog, models and ports (interfaces).

pub mod catalog;
pub mod model;
pub mod ports;
