//! Facts emitted by committed ledger operations

use crate::{Address, Amount, CourseId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A fact recorded after an operation commits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LedgerEvent {
    /// A course was registered
    CourseCreated {
        /// Course id
        course_id: CourseId,
        /// Course instructor
        instructor: Address,
        /// Content reference
        metadata_ref: String,
        /// Course price
        price: Amount,
    },
    /// A student paid for a course
    CoursePurchased {
        /// Course id
        course_id: CourseId,
        /// Buyer
        student: Address,
        /// Course instructor
        instructor: Address,
        /// Course price
        price: Amount,
    },
    /// A course was activated or retired
    CourseStatusToggled {
        /// Course id
        course_id: CourseId,
        /// Course instructor
        instructor: Address,
        /// New active flag
        is_active: bool,
    },
    /// Price or metadata reference changed
    CourseUpdated {
        /// Course id
        course_id: CourseId,
        /// Course instructor
        instructor: Address,
        /// New content reference
        new_metadata_ref: String,
    },
    /// Tokens were bought with ETH
    TokensPurchased {
        /// Buying account
        buyer: Address,
        /// ETH paid or received
        eth_amount: Amount,
        /// Tokens moved
        token_amount: Amount,
    },
    /// Tokens were sold back for ETH
    TokensSold {
        /// Selling account
        seller: Address,
        /// Tokens moved
        token_amount: Amount,
        /// ETH paid or received
        eth_amount: Amount,
    },
    /// Tokens moved; `from` is the null account for mints
    Transfer {
        /// Debited account
        from: Address,
        /// Credited account
        to: Address,
        /// Amount moved
        amount: Amount,
    },
    /// An allowance was set
    Approval {
        /// Token holder
        owner: Address,
        /// Account allowed to spend
        spender: Address,
        /// Amount moved
        amount: Amount,
    },
    /// The ETH reserve was paid to the token owner
    EthWithdrawn {
        /// Credited account
        to: Address,
        /// Amount moved
        amount: Amount,
    },
    /// Platform ownership changed
    OwnershipTransferred {
        /// Owner before the change
        previous_owner: Address,
        /// Owner after the change
        new_owner: Address,
    },
    /// The platform fee changed
    PlatformFeeUpdated {
        /// Fee before the change
        old_percentage: u8,
        /// Fee after the change
        new_percentage: u8,
    },
    /// Marketplace mutations were halted
    EmergencyPaused {
        /// Acting owner
        by: Address,
    },
    /// Marketplace mutations were re-enabled
    Resumed {
        /// Acting owner
        by: Address,
    },
}

impl LedgerEvent {
    /// Event name as indexers know it
    pub fn name(&self) -> &'static str {
        match self {
            LedgerEvent::CourseCreated { .. } => "CourseCreated",
            LedgerEvent::CoursePurchased { .. } => "CoursePurchased",
            LedgerEvent::CourseStatusToggled { .. } => "CourseStatusToggled",
            LedgerEvent::CourseUpdated { .. } => "CourseUpdated",
            LedgerEvent::TokensPurchased { .. } => "TokensPurchased",
            LedgerEvent::TokensSold { .. } => "TokensSold",
            LedgerEvent::Transfer { .. } => "Transfer",
            LedgerEvent::Approval { .. } => "Approval",
            LedgerEvent::EthWithdrawn { .. } => "EthWithdrawn",
            LedgerEvent::OwnershipTransferred { .. } => "OwnershipTransferred",
            LedgerEvent::PlatformFeeUpdated { .. } => "PlatformFeeUpdated",
            LedgerEvent::EmergencyPaused { .. } => "EmergencyPaused",
            LedgerEvent::Resumed { .. } => "Resumed",
        }
    }
}

/// An event with its position in the log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Unique record id
    pub id: Uuid,
    /// Gap-free position, starting at 1
    pub sequence: u64,
    /// Commit time
    pub recorded_at: DateTime<Utc>,
    /// The fact itself
    pub event: LedgerEvent,
}

/// Append-only event log
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventLog {
    entries: Vec<EventRecord>,
}

impl EventLog {
    /// Create an empty log
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event and return its sequence number
    pub fn append(&mut self, event: LedgerEvent) -> u64 {
        let sequence = self.last_sequence() + 1;
        tracing::debug!("Recorded event #{}: {}", sequence, event.name());
        self.entries.push(EventRecord {
            id: Uuid::new_v4(),
            sequence,
            recorded_at: Utc::now(),
            event,
        });
        sequence
    }

    /// Append several events in order
    pub fn extend<I: IntoIterator<Item = LedgerEvent>>(&mut self, events: I) {
        for event in events {
            self.append(event);
        }
    }

    /// All records in commit order
    pub fn events(&self) -> &[EventRecord] {
        &self.entries
    }

    /// Records with a sequence number greater than `sequence`
    pub fn events_since(&self, sequence: u64) -> &[EventRecord] {
        let start = (sequence as usize).min(self.entries.len());
        &self.entries[start..]
    }

    /// Sequence number of the newest record, 0 when empty
    pub fn last_sequence(&self) -> u64 {
        self.entries.last().map(|r| r.sequence).unwrap_or(0)
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the log is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
