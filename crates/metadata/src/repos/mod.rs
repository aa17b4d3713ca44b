//! Repository traits for metadata operations.

pub mod ledger;
pub mod pricing;
pub mod stations;
pub mod videos;

pub use ledger::LedgerRepo;
pub use pricing::PricingRepo;
pub use stations::StationRepo;
pub use videos::VideoRepo;
