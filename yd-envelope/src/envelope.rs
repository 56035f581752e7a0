//! Envelope state and the grab rules

use crate::{EnvelopeError, EnvelopeResult};
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use yd_ledger::{Address, Amount};

/// What one account received in the current round
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrabInfo {
    /// Amount received
    pub amount: Amount,
    /// Whether the account has grabbed this round
    pub has_grabbed: bool,
    /// When the grab happened
    pub grab_time: Option<DateTime<Utc>>,
    /// Zero-based position among this round's grabs
    pub grab_index: u64,
}

/// Facts emitted by envelope operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EnvelopeEvent {
    /// A new round was funded
    RedEnvelopeSet {
        /// Funding account
        sender: Address,
        /// Deposit
        amount: Amount,
        /// Number of shares
        count: u64,
        /// Equal or random shares
        is_equal: bool,
    },
    /// A share was claimed
    RedEnvelopeGrabbed {
        /// Claiming account
        grabber: Address,
        /// Share paid out
        amount: Amount,
        /// Zero-based position in the round
        grab_index: u64,
    },
}

/// Red envelope lottery
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedEnvelope {
    owner: Address,
    red_owner: Address,
    total_amount: Amount,
    count: u64,
    grabbed_count: u64,
    is_equal: bool,
    is_set: bool,
    /// Funds deposited and not yet claimed
    balance: Amount,
    grab_info: BTreeMap<Address, GrabInfo>,
    grabbers: Vec<Address>,
    events: Vec<EnvelopeEvent>,
}

impl RedEnvelope {
    /// Create an empty lottery deployed by `owner`
    pub fn new(owner: Address) -> Self {
        Self {
            owner,
            red_owner: Address::ZERO,
            total_amount: Amount::zero(),
            count: 0,
            grabbed_count: 0,
            is_equal: false,
            is_set: false,
            balance: Amount::zero(),
            grab_info: BTreeMap::new(),
            grabbers: Vec::new(),
            events: Vec::new(),
        }
    }

    /// Fund a new round of `count` shares totalling `amount`
    pub fn set_red_envelope(
        &mut self,
        sender: Address,
        amount: Amount,
        count: u64,
        is_equal: bool,
    ) -> EnvelopeResult<()> {
        if amount.is_zero() {
            return Err(EnvelopeError::ZeroAmount);
        }
        if count == 0 {
            return Err(EnvelopeError::ZeroCount);
        }
        if amount < Amount::from(count) {
            return Err(EnvelopeError::AmountTooSmall);
        }
        if self.is_set && self.grabbed_count < self.count {
            return Err(EnvelopeError::AlreadyActive);
        }
        let balance = self.balance.checked_add(amount).ok_or(EnvelopeError::Overflow)?;

        self.red_owner = sender;
        self.total_amount = amount;
        self.count = count;
        self.grabbed_count = 0;
        self.is_equal = is_equal;
        self.is_set = true;
        self.balance = balance;
        self.grab_info.clear();
        self.grabbers.clear();
        self.events.push(EnvelopeEvent::RedEnvelopeSet {
            sender,
            amount,
            count,
            is_equal,
        });

        tracing::info!(
            "Red envelope set by {}: {} in {} {} shares",
            sender,
            amount,
            count,
            if is_equal { "equal" } else { "random" }
        );
        Ok(())
    }

    /// Claim one share for `grabber` and return its amount
    pub fn grab_red_envelope<R: Rng>(
        &mut self,
        grabber: Address,
        rng: &mut R,
    ) -> EnvelopeResult<Amount> {
        if !self.is_set {
            return Err(EnvelopeError::NotSet);
        }
        if self.has_grabbed(&grabber) {
            return Err(EnvelopeError::AlreadyGrabbed(grabber));
        }
        let shares_left = self.get_remaining_count();
        if shares_left == 0 {
            return Err(EnvelopeError::Exhausted);
        }

        let amount = if shares_left == 1 {
            self.balance
        } else if self.is_equal {
            self.total_amount / Amount::from(self.count)
        } else {
            random_share(rng, self.balance, shares_left)
        };

        let grab_index = self.grabbed_count;
        self.balance -= amount;
        self.grabbed_count += 1;
        self.grabbers.push(grabber);
        self.grab_info.insert(
            grabber,
            GrabInfo {
                amount,
                has_grabbed: true,
                grab_time: Some(Utc::now()),
                grab_index,
            },
        );
        self.events.push(EnvelopeEvent::RedEnvelopeGrabbed {
            grabber,
            amount,
            grab_index,
        });

        tracing::info!("{} grabbed {} (share {} of {})", grabber, amount, grab_index + 1, self.count);
        Ok(amount)
    }

    /// Grab record for `user`; all zero when the user has not grabbed this round
    pub fn get_user_grab_info(&self, user: &Address) -> GrabInfo {
        self.grab_info.get(user).cloned().unwrap_or_default()
    }

    /// Accounts that grabbed this round, in grab order
    pub fn get_all_grabbers(&self) -> &[Address] {
        &self.grabbers
    }

    /// Shares still unclaimed
    pub fn get_remaining_count(&self) -> u64 {
        self.count - self.grabbed_count
    }

    /// Deposited funds not yet paid out
    pub fn get_contract_balance(&self) -> Amount {
        self.balance
    }

    /// Deployer of the lottery
    pub fn owner(&self) -> Address {
        self.owner
    }

    /// Sender of the current round
    pub fn red_owner(&self) -> Address {
        self.red_owner
    }

    /// Deposit of the current round
    pub fn total_amount(&self) -> Amount {
        self.total_amount
    }

    /// Shares in the current round
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Shares already claimed this round
    pub fn grabbed_count(&self) -> u64 {
        self.grabbed_count
    }

    /// Whether shares are equal rather than random
    pub fn is_equal(&self) -> bool {
        self.is_equal
    }

    /// Whether any round has been funded
    pub fn is_red_envelope_set(&self) -> bool {
        self.is_set
    }

    /// Events in emission order
    pub fn events(&self) -> &[EnvelopeEvent] {
        &self.events
    }

    fn has_grabbed(&self, user: &Address) -> bool {
        self.grab_info.get(user).map(|info| info.has_grabbed).unwrap_or(false)
    }
}

/// Uniform draw in `[1, 2 * remaining / shares_left)`, leaving one unit for each later share
///
/// Requires `shares_left >= 2` and `remaining >= shares_left`.
fn random_share<R: Rng>(rng: &mut R, remaining: Amount, shares_left: u64) -> Amount {
    let left = Amount::from(shares_left);
    let reserved = left - Amount::one();
    let cap = remaining - reserved;

    let doubled_mean = remaining
        .checked_mul(Amount::from(2u64))
        .map(|doubled| doubled / left)
        .unwrap_or(Amount::MAX);
    let ceiling = doubled_mean
        .saturating_sub(Amount::one())
        .min(cap)
        .max(Amount::one());

    let draw = Amount::from_big_endian(&rng.gen::<[u8; 32]>());
    draw % ceiling + Amount::one()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn addr(n: u64) -> Address {
        Address::from_low_u64(n)
    }

    fn amount(n: u64) -> Amount {
        Amount::from(n)
    }

    fn envelope() -> RedEnvelope {
        RedEnvelope::new(addr(1))
    }

    #[test]
    fn test_equal_split_last_takes_remainder() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut envelope = envelope();
        envelope.set_red_envelope(addr(2), amount(100), 3, true).unwrap();

        let shares: Vec<Amount> = (10..13)
            .map(|n| envelope.grab_red_envelope(addr(n), &mut rng).unwrap())
            .collect();
        assert_eq!(shares, vec![amount(33), amount(33), amount(34)]);
        assert_eq!(envelope.get_contract_balance(), Amount::zero());
        assert_eq!(envelope.get_all_grabbers(), &[addr(10), addr(11), addr(12)]);

        let info = envelope.get_user_grab_info(&addr(11));
        assert!(info.has_grabbed);
        assert_eq!(info.grab_index, 1);
        assert_eq!(info.amount, amount(33));
    }

    #[test]
    fn test_set_validation() {
        let mut envelope = envelope();
        assert_eq!(
            envelope.set_red_envelope(addr(2), Amount::zero(), 3, true),
            Err(EnvelopeError::ZeroAmount)
        );
        assert_eq!(
            envelope.set_red_envelope(addr(2), amount(10), 0, true),
            Err(EnvelopeError::ZeroCount)
        );
        assert_eq!(
            envelope.set_red_envelope(addr(2), amount(2), 3, false),
            Err(EnvelopeError::AmountTooSmall)
        );
        assert!(!envelope.is_red_envelope_set());
        assert!(envelope.events().is_empty());
    }

    #[test]
    fn test_grab_rules() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut envelope = envelope();
        assert_eq!(
            envelope.grab_red_envelope(addr(10), &mut rng),
            Err(EnvelopeError::NotSet)
        );

        envelope.set_red_envelope(addr(2), amount(10), 1, false).unwrap();
        assert_eq!(envelope.grab_red_envelope(addr(10), &mut rng), Ok(amount(10)));
        assert_eq!(
            envelope.grab_red_envelope(addr(10), &mut rng),
            Err(EnvelopeError::AlreadyGrabbed(addr(10)))
        );
        assert_eq!(
            envelope.grab_red_envelope(addr(11), &mut rng),
            Err(EnvelopeError::Exhausted)
        );
    }

    #[test]
    fn test_new_round_resets_grabs() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut envelope = envelope();
        envelope.set_red_envelope(addr(2), amount(10), 2, true).unwrap();
        envelope.grab_red_envelope(addr(10), &mut rng).unwrap();

        assert_eq!(
            envelope.set_red_envelope(addr(3), amount(10), 2, true),
            Err(EnvelopeError::AlreadyActive)
        );

        envelope.grab_red_envelope(addr(11), &mut rng).unwrap();
        envelope.set_red_envelope(addr(3), amount(20), 2, false).unwrap();

        assert_eq!(envelope.red_owner(), addr(3));
        assert_eq!(envelope.get_remaining_count(), 2);
        assert!(envelope.get_all_grabbers().is_empty());
        assert!(!envelope.get_user_grab_info(&addr(10)).has_grabbed);
        envelope.grab_red_envelope(addr(10), &mut rng).unwrap();
        assert_eq!(envelope.events().len(), 5);
    }

    proptest! {
        #[test]
        fn prop_round_pays_out_exactly(
            total in 1u64..1_000_000,
            count in 1u64..50,
            is_equal in any::<bool>(),
            seed in any::<u64>(),
        ) {
            prop_assume!(total >= count);
            let mut rng = StdRng::seed_from_u64(seed);
            let mut envelope = envelope();
            envelope.set_red_envelope(addr(2), amount(total), count, is_equal).unwrap();

            let mut paid = Amount::zero();
            for n in 0..count {
                let share = envelope.grab_red_envelope(addr(100 + n), &mut rng).unwrap();
                prop_assert!(share >= Amount::one());
                paid += share;
            }

            prop_assert_eq!(paid, amount(total));
            prop_assert_eq!(envelope.get_contract_balance(), Amount::zero());
            prop_assert_eq!(envelope.get_remaining_count(), 0);
        }
    }
}
