// Domain layer: models, slot encoding and ports. No I/O here.

pub mod model;
pub mod ports;
pub mod slot;
