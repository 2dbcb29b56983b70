pub mod analyzer;
pub mod capture;
pub mod engine;
pub mod jack;
pub mod manager;
pub mod ports;
