//! Small value types shared across the graph and engine

pub mod ports;

pub use ports::PortList;
