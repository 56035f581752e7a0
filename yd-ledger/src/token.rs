//! Fungible token bookkeeping: balances, allowances and the fixed-rate ETH exchange

use crate::config::TokenSettings;
use crate::events::LedgerEvent;
use crate::{units, Address, Amount, LedgerError, LedgerResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Balance and allowance ledger for a single asset
///
/// Mutations validate every precondition before touching state, so a failed call
/// leaves the ledger exactly as it was. Events produced by successful calls are
/// buffered until the caller drains them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenLedger {
    name: String,
    symbol: String,
    decimals: u8,
    owner: Address,
    total_supply: Amount,
    exchange_rate: Amount,
    /// ETH received by `buy_tokens` and not yet paid out
    eth_reserve: Amount,
    balances: BTreeMap<Address, Amount>,
    allowances: BTreeMap<Address, BTreeMap<Address, Amount>>,
    #[serde(skip)]
    outbox: Vec<LedgerEvent>,
}

impl TokenLedger {
    /// Create the ledger and credit the initial supply to `owner`
    pub fn genesis(owner: Address, settings: &TokenSettings) -> LedgerResult<Self> {
        if owner.is_zero() {
            return Err(LedgerError::InvalidRecipient);
        }
        if settings.exchange_rate == 0 {
            return Err(LedgerError::Config("Exchange rate cannot be zero".to_string()));
        }

        let initial_supply = units::to_base_units(settings.initial_supply_tokens, settings.decimals)?;

        let mut ledger = Self {
            name: settings.name.clone(),
            symbol: settings.symbol.clone(),
            decimals: settings.decimals,
            owner,
            total_supply: Amount::zero(),
            exchange_rate: Amount::from(settings.exchange_rate),
            eth_reserve: Amount::zero(),
            balances: BTreeMap::new(),
            allowances: BTreeMap::new(),
            outbox: Vec::new(),
        };
        ledger.credit_supply(owner, initial_supply)?;

        tracing::info!(
            "Token {} ({}) created with supply {} held by {}",
            ledger.name, ledger.symbol, initial_supply, owner
        );
        Ok(ledger)
    }

    /// Token name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Token symbol
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Decimal places of one whole token
    pub fn decimals(&self) -> u8 {
        self.decimals
    }

    /// Account allowed to mint and withdraw ETH
    pub fn owner(&self) -> Address {
        self.owner
    }

    /// Total tokens in existence
    pub fn total_supply(&self) -> Amount {
        self.total_supply
    }

    /// Tokens per unit of ETH
    pub fn exchange_rate(&self) -> Amount {
        self.exchange_rate
    }

    /// ETH held against sold tokens
    pub fn eth_reserve(&self) -> Amount {
        self.eth_reserve
    }

    /// Get account balance
    pub fn balance_of(&self, account: &Address) -> Amount {
        self.balances.get(account).copied().unwrap_or_default()
    }

    /// Remaining amount `spender` may move out of `owner`'s balance
    pub fn allowance(&self, owner: &Address, spender: &Address) -> Amount {
        self.allowances
            .get(owner)
            .and_then(|spenders| spenders.get(spender))
            .copied()
            .unwrap_or_default()
    }

    /// Set `spender`'s allowance over `owner`'s balance, replacing any previous value
    pub fn approve(&mut self, owner: Address, spender: Address, amount: Amount) -> LedgerResult<()> {
        if owner.is_zero() {
            return Err(LedgerError::InvalidSender);
        }
        if spender.is_zero() {
            return Err(LedgerError::InvalidRecipient);
        }

        self.allowances.entry(owner).or_default().insert(spender, amount);
        self.outbox.push(LedgerEvent::Approval { owner, spender, amount });
        Ok(())
    }

    /// Move `amount` from `from` to `to`
    pub fn transfer(&mut self, from: Address, to: Address, amount: Amount) -> LedgerResult<()> {
        let staged = self.stage_transfer(from, &[(to, amount)])?;
        self.apply_transfer(from, &[(to, amount)], staged);
        Ok(())
    }

    /// Move `amount` from `from` to `to` on behalf of `spender`, consuming allowance
    pub fn transfer_from(
        &mut self,
        spender: Address,
        from: Address,
        to: Address,
        amount: Amount,
    ) -> LedgerResult<()> {
        self.transfer_from_split(spender, from, &[(to, amount)])
    }

    /// Spend one allowance-backed debit of `from` and split it across several recipients
    ///
    /// The debit equals the sum of the legs. Either every leg lands or none does.
    pub fn transfer_from_split(
        &mut self,
        spender: Address,
        from: Address,
        legs: &[(Address, Amount)],
    ) -> LedgerResult<()> {
        let total = sum_legs(legs)?;
        let allowed = self.allowance(&from, &spender);
        if allowed < total {
            return Err(LedgerError::InsufficientAllowance {
                needed: total,
                available: allowed,
            });
        }

        let staged = self.stage_transfer(from, legs)?;

        self.allowances
            .entry(from)
            .or_default()
            .insert(spender, allowed - total);
        self.apply_transfer(from, legs, staged);
        Ok(())
    }

    /// Create `amount` new tokens for `to`
    pub fn mint(&mut self, caller: Address, to: Address, amount: Amount) -> LedgerResult<()> {
        self.ensure_owner(caller)?;
        if to.is_zero() {
            return Err(LedgerError::InvalidRecipient);
        }

        self.credit_supply(to, amount)?;
        tracing::info!("Minted {} {} to {}", amount, self.symbol, to);
        Ok(())
    }

    /// Exchange `eth_amount` for tokens out of the owner's inventory
    pub fn buy_tokens(&mut self, buyer: Address, eth_amount: Amount) -> LedgerResult<Amount> {
        if eth_amount.is_zero() {
            return Err(LedgerError::ZeroAmount);
        }
        if buyer.is_zero() {
            return Err(LedgerError::InvalidRecipient);
        }

        let token_amount = eth_amount
            .checked_mul(self.checked_rate()?)
            .ok_or(LedgerError::Overflow)?;
        let new_reserve = self
            .eth_reserve
            .checked_add(eth_amount)
            .ok_or(LedgerError::Overflow)?;

        let inventory = self.balance_of(&self.owner);
        if inventory < token_amount {
            return Err(LedgerError::InsufficientSupply {
                needed: token_amount,
                available: inventory,
            });
        }

        let owner = self.owner;
        let staged = self.stage_transfer(owner, &[(buyer, token_amount)])?;
        self.apply_transfer(owner, &[(buyer, token_amount)], staged);
        self.eth_reserve = new_reserve;
        self.outbox.push(LedgerEvent::TokensPurchased {
            buyer,
            eth_amount,
            token_amount,
        });

        tracing::info!("{} bought {} {} for {} wei", buyer, token_amount, self.symbol, eth_amount);
        Ok(token_amount)
    }

    /// Return tokens to the owner's inventory and pay out ETH from the reserve
    pub fn sell_tokens(&mut self, seller: Address, token_amount: Amount) -> LedgerResult<Amount> {
        let eth_amount = token_amount
            .checked_div(self.checked_rate()?)
            .ok_or(LedgerError::Overflow)?;
        if eth_amount.is_zero() {
            return Err(LedgerError::AmountTooSmall);
        }

        let held = self.balance_of(&seller);
        if held < token_amount {
            return Err(LedgerError::InsufficientBalance {
                needed: token_amount,
                available: held,
            });
        }

        if self.eth_reserve < eth_amount {
            return Err(LedgerError::InsufficientReserve {
                needed: eth_amount,
                available: self.eth_reserve,
            });
        }

        let owner = self.owner;
        let staged = self.stage_transfer(seller, &[(owner, token_amount)])?;
        self.apply_transfer(seller, &[(owner, token_amount)], staged);
        self.eth_reserve -= eth_amount;
        self.outbox.push(LedgerEvent::TokensSold {
            seller,
            token_amount,
            eth_amount,
        });

        tracing::info!("{} sold {} {} for {} wei", seller, token_amount, self.symbol, eth_amount);
        Ok(eth_amount)
    }

    /// Drain the whole ETH reserve to the owner
    pub fn withdraw_eth(&mut self, caller: Address) -> LedgerResult<Amount> {
        self.ensure_owner(caller)?;
        if self.eth_reserve.is_zero() {
            return Err(LedgerError::NothingToWithdraw);
        }

        let amount = std::mem::take(&mut self.eth_reserve);
        self.outbox.push(LedgerEvent::EthWithdrawn {
            to: self.owner,
            amount,
        });

        tracing::info!("Owner {} withdrew {} wei", self.owner, amount);
        Ok(amount)
    }

    /// Take the events produced since the last drain
    pub fn drain_events(&mut self) -> Vec<LedgerEvent> {
        std::mem::take(&mut self.outbox)
    }

    /// Exchange rate, refusing a zero rate restored from outside `genesis`
    fn checked_rate(&self) -> LedgerResult<Amount> {
        if self.exchange_rate.is_zero() {
            return Err(LedgerError::Config("Exchange rate cannot be zero".to_string()));
        }
        Ok(self.exchange_rate)
    }

    fn ensure_owner(&self, caller: Address) -> LedgerResult<()> {
        if caller != self.owner {
            return Err(LedgerError::Unauthorized { caller });
        }
        Ok(())
    }

    fn credit_supply(&mut self, to: Address, amount: Amount) -> LedgerResult<()> {
        let total_supply = self
            .total_supply
            .checked_add(amount)
            .ok_or(LedgerError::Overflow)?;
        // Balances never exceed the total supply, so this cannot overflow once the supply did not.
        let balance = self.balance_of(&to) + amount;

        self.total_supply = total_supply;
        self.balances.insert(to, balance);
        self.outbox.push(LedgerEvent::Transfer {
            from: Address::ZERO,
            to,
            amount,
        });
        Ok(())
    }

    /// Compute post-transfer balances for every touched account without mutating anything
    fn stage_transfer(
        &self,
        from: Address,
        legs: &[(Address, Amount)],
    ) -> LedgerResult<BTreeMap<Address, Amount>> {
        if from.is_zero() {
            return Err(LedgerError::InvalidSender);
        }
        if legs.iter().any(|(to, _)| to.is_zero()) {
            return Err(LedgerError::InvalidRecipient);
        }

        let total = sum_legs(legs)?;
        let available = self.balance_of(&from);
        if available < total {
            return Err(LedgerError::InsufficientBalance {
                needed: total,
                available,
            });
        }

        let mut staged = BTreeMap::new();
        staged.insert(from, available - total);
        for (to, amount) in legs {
            let current = match staged.get(to) {
                Some(balance) => *balance,
                None => self.balance_of(to),
            };
            let credited = current.checked_add(*amount).ok_or(LedgerError::Overflow)?;
            staged.insert(*to, credited);
        }
        Ok(staged)
    }

    fn apply_transfer(
        &mut self,
        from: Address,
        legs: &[(Address, Amount)],
        staged: BTreeMap<Address, Amount>,
    ) {
        self.balances.extend(staged);
        for (to, amount) in legs {
            self.outbox.push(LedgerEvent::Transfer {
                from,
                to: *to,
                amount: *amount,
            });
        }
    }
}

fn sum_legs(legs: &[(Address, Amount)]) -> LedgerResult<Amount> {
    legs.iter().try_fold(Amount::zero(), |acc, (_, amount)| {
        acc.checked_add(*amount).ok_or(LedgerError::Overflow)
    })
}
