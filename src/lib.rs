pub mod azure;
pub mod cli;
pub mod config;
pub mod contract;
pub mod copier;
pub mod lister;
pub mod marker;
pub mod report;
pub mod transfer;
