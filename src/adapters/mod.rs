// Adapters layer: concrete implementations for external systems (file storage, XML codec).

pub mod storage;
pub mod xml;
