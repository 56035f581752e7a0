//! YD Ledger - Course marketplace ledger
//!
//! This crate implements the bookkeeping behind the YD University course marketplace:
//! a fungible token ledger, a course registry, an enrollment ledger and the marketplace
//! engine that moves funds and records enrollments in one atomic step.
//!
//! Every mutation runs against a single `Marketplace` value. `LedgerService` serializes
//! writers behind one lock so readers only ever observe committed state.

pub mod types;
pub mod error;
pub mod config;
pub mod events;
pub mod token;
pub mod registry;
pub mod enrollment;
pub mod marketplace;
pub mod snapshot;
pub mod service;

pub use types::{units, Address, AddressParseError, Amount, CourseId};
pub use error::{LedgerError, LedgerErrorCategory, LedgerResult};
pub use config::LedgerConfig;
pub use events::{EventLog, EventRecord, LedgerEvent};
pub use token::TokenLedger;
pub use registry::{ActiveCoursesPage, Course, CourseRegistry};
pub use enrollment::{Enrollment, EnrollmentLedger};
pub use marketplace::{fee_split, CourseStats, Marketplace, PurchaseReceipt};
pub use snapshot::LedgerSnapshot;
pub use service::LedgerService;

/// Ledger protocol version, recorded in snapshots
pub const LEDGER_VERSION: &str = "0.1.0";

/// Marketplace and token constants
pub mod constants {
    /// Platform fee charged when no configuration overrides it
    pub const DEFAULT_PLATFORM_FEE_PERCENTAGE: u8 = 5;

    /// Upper bound accepted by `set_platform_fee_percentage`
    pub const MAX_PLATFORM_FEE_PERCENTAGE: u8 = 20;

    /// Tokens handed out per unit of ETH by `buy_tokens`
    pub const DEFAULT_EXCHANGE_RATE: u64 = 2500;

    /// Whole tokens minted to the owner at genesis
    pub const DEFAULT_INITIAL_SUPPLY_TOKENS: u64 = 1_000_000;

    /// Token decimals
    pub const DEFAULT_DECIMALS: u8 = 18;

    /// Token name
    pub const DEFAULT_TOKEN_NAME: &str = "YD Token";

    /// Token symbol
    pub const DEFAULT_TOKEN_SYMBOL: &str = "YDT";

    /// First id handed out by the course registry
    pub const FIRST_COURSE_ID: u64 = 1;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_constant() {
        assert!(!LEDGER_VERSION.is_empty());
    }

    #[test]
    fn test_default_fee_within_bounds() {
        use constants::*;
        assert!(DEFAULT_PLATFORM_FEE_PERCENTAGE <= MAX_PLATFORM_FEE_PERCENTAGE);
    }
}
