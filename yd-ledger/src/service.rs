//! Shared, lock-guarded access to a marketplace ledger
//!
//! Writers are serialized behind one `RwLock`, so every mutation observes the state
//! left by the previous one and readers never see a partially applied operation.

use crate::events::EventRecord;
use crate::{
    ActiveCoursesPage, Address, Amount, Course, CourseId, CourseStats, LedgerConfig, LedgerResult,
    Marketplace, PurchaseReceipt,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Cloneable handle to a ledger shared across tasks
#[derive(Debug, Clone)]
pub struct LedgerService {
    inner: Arc<RwLock<Marketplace>>,
    snapshot_path: PathBuf,
}

impl LedgerService {
    /// Start a fresh ledger
    pub fn new(config: &LedgerConfig) -> LedgerResult<Self> {
        let marketplace = Marketplace::new(config)?;
        Ok(Self::from_marketplace(marketplace, config.storage.snapshot_path.clone()))
    }

    /// Wrap an existing ledger
    pub fn from_marketplace(marketplace: Marketplace, snapshot_path: PathBuf) -> Self {
        Self {
            inner: Arc::new(RwLock::new(marketplace)),
            snapshot_path,
        }
    }

    /// Resume from the configured snapshot, or start fresh when none exists
    pub async fn open(config: &LedgerConfig) -> LedgerResult<Self> {
        config.validate()?;
        let path = config.storage.snapshot_path.clone();

        if tokio::fs::try_exists(&path).await? {
            let bytes = tokio::fs::read(&path).await?;
            let snapshot = crate::LedgerSnapshot::from_bytes(&bytes)?;
            tracing::info!(
                "Resumed ledger from {} ({} events)",
                path.display(),
                snapshot.state.events().len()
            );
            return Ok(Self::from_marketplace(snapshot.state, path));
        }

        tracing::info!("No snapshot at {}, starting a fresh ledger", path.display());
        Self::new(config)
    }

    /// Where `persist` writes
    pub fn snapshot_path(&self) -> &Path {
        &self.snapshot_path
    }

    /// Run a mutation under the write lock
    pub async fn commit<R>(
        &self,
        operation: impl FnOnce(&mut Marketplace) -> LedgerResult<R>,
    ) -> LedgerResult<R> {
        let mut marketplace = self.inner.write().await;
        operation(&mut marketplace)
    }

    /// Run a query under the read lock
    pub async fn read<R>(&self, query: impl FnOnce(&Marketplace) -> R) -> R {
        let marketplace = self.inner.read().await;
        query(&marketplace)
    }

    /// Write a snapshot of the committed state
    pub async fn persist(&self) -> LedgerResult<()> {
        let bytes = self.read(|m| m.snapshot().and_then(|s| s.to_bytes())).await?;

        if let Some(parent) = self.snapshot_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&self.snapshot_path, bytes).await?;

        tracing::info!("Persisted ledger to {}", self.snapshot_path.display());
        Ok(())
    }

    /// See [`Marketplace::create_course`]
    pub async fn create_course(
        &self,
        instructor: Address,
        price: Amount,
        metadata_ref: String,
    ) -> LedgerResult<CourseId> {
        self.commit(|m| m.create_course(instructor, price, metadata_ref)).await
    }

    /// See [`Marketplace::update_course`]
    pub async fn update_course(
        &self,
        caller: Address,
        course_id: CourseId,
        new_metadata_ref: String,
        new_price: Amount,
    ) -> LedgerResult<()> {
        self.commit(|m| m.update_course(caller, course_id, new_metadata_ref, new_price))
            .await
    }

    /// See [`Marketplace::toggle_course_status`]
    pub async fn toggle_course_status(&self, caller: Address, course_id: CourseId) -> LedgerResult<bool> {
        self.commit(|m| m.toggle_course_status(caller, course_id)).await
    }

    /// See [`Marketplace::purchase_course`]
    pub async fn purchase_course(&self, student: Address, course_id: CourseId) -> LedgerResult<PurchaseReceipt> {
        self.commit(|m| m.purchase_course(student, course_id)).await
    }

    /// See [`Marketplace::approve`]
    pub async fn approve(&self, owner: Address, spender: Address, amount: Amount) -> LedgerResult<()> {
        self.commit(|m| m.approve(owner, spender, amount)).await
    }

    /// See [`Marketplace::transfer`]
    pub async fn transfer(&self, from: Address, to: Address, amount: Amount) -> LedgerResult<()> {
        self.commit(|m| m.transfer(from, to, amount)).await
    }

    /// See [`Marketplace::transfer_from`]
    pub async fn transfer_from(
        &self,
        spender: Address,
        from: Address,
        to: Address,
        amount: Amount,
    ) -> LedgerResult<()> {
        self.commit(|m| m.transfer_from(spender, from, to, amount)).await
    }

    /// See [`Marketplace::mint`]
    pub async fn mint(&self, caller: Address, to: Address, amount: Amount) -> LedgerResult<()> {
        self.commit(|m| m.mint(caller, to, amount)).await
    }

    /// See [`Marketplace::buy_tokens`]
    pub async fn buy_tokens(&self, buyer: Address, eth_amount: Amount) -> LedgerResult<Amount> {
        self.commit(|m| m.buy_tokens(buyer, eth_amount)).await
    }

    /// See [`Marketplace::sell_tokens`]
    pub async fn sell_tokens(&self, seller: Address, token_amount: Amount) -> LedgerResult<Amount> {
        self.commit(|m| m.sell_tokens(seller, token_amount)).await
    }

    /// See [`Marketplace::set_platform_fee_percentage`]
    pub async fn set_platform_fee_percentage(&self, caller: Address, new_fee: u8) -> LedgerResult<()> {
        self.commit(|m| m.set_platform_fee_percentage(caller, new_fee)).await
    }

    /// Token balance of `account`
    pub async fn balance_of(&self, account: Address) -> Amount {
        self.read(|m| m.balance_of(&account)).await
    }

    /// Copy of a course record
    pub async fn get_course(&self, course_id: CourseId) -> LedgerResult<Course> {
        self.read(|m| m.get_course(course_id).cloned()).await
    }

    /// Whether `student` has paid for `course_id`
    pub async fn has_enrolled(&self, course_id: CourseId, student: Address) -> bool {
        self.read(|m| m.has_enrolled(course_id, &student)).await
    }

    /// Page of active courses
    pub async fn get_active_courses(&self, offset: usize, limit: usize) -> ActiveCoursesPage {
        self.read(|m| m.get_active_courses(offset, limit)).await
    }

    /// Instructor-only course statistics
    pub async fn get_course_stats(&self, caller: Address, course_id: CourseId) -> LedgerResult<CourseStats> {
        self.read(|m| m.get_course_stats(caller, course_id)).await
    }

    /// Courses bought by `student`
    pub async fn student_courses(&self, student: Address) -> Vec<CourseId> {
        self.read(|m| m.student_courses(&student).to_vec()).await
    }

    /// Students of `course_id`
    pub async fn course_students(&self, course_id: CourseId) -> Vec<Address> {
        self.read(|m| m.course_students(course_id).to_vec()).await
    }

    /// Events committed after `sequence`
    pub async fn events_since(&self, sequence: u64) -> Vec<EventRecord> {
        self.read(|m| m.events().events_since(sequence).to_vec()).await
    }
}
