// Domain layer: order records, findings and ports. No I/O here.

pub mod model;
pub mod ports;
