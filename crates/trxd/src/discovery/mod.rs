//! Discovery: finds which slots currently have a host.

pub mod scanner;

pub use scanner::DiscoveryScanner;
