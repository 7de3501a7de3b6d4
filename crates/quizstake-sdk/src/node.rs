//! `QuizstakeNode` — the unified client most consumers hold. Owns the
//! ledger reader, wallet backend, transaction orchestrator, aggregator and
//! metadata resolver behind `&self`, and exposes the whole surface: lesson
//! queries, every transaction flow, user stake/reward reads and metadata
//! publishing.

use std::sync::Arc;

use tokio::sync::broadcast;

use crate::aggregator::{Lesson, PoolAggregator};
use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::ledger::{LedgerReader, PoolCreationParams, WalletBackend};
use crate::metadata::content::LessonMetadata;
use crate::metadata::remote::{PublishRequest, RemoteMetadataStore};
use crate::metadata::resolver::MetadataResolver;
use crate::metadata::store_trait::MetadataCache;
use crate::network::Network;
use crate::orchestrator::{TransactionOrchestrator, TransactionRecord, TxStatus};
use crate::types::{Address, UserStake};

pub struct QuizstakeNode<L, W, R, C>
where
    L: LedgerReader,
    W: WalletBackend,
    R: RemoteMetadataStore,
    C: MetadataCache,
{
    reader: Arc<L>,
    wallet: Arc<W>,
    remote: Option<Arc<R>>,
    orchestrator: TransactionOrchestrator<L, W>,
    aggregator: PoolAggregator<L, R, C>,
    config: ClientConfig,
}

impl<L, W, R, C> QuizstakeNode<L, W, R, C>
where
    L: LedgerReader,
    W: WalletBackend,
    R: RemoteMetadataStore,
    C: MetadataCache,
{
    /// Returns the node and a receiver for transaction status updates.
    pub fn new(
        reader: Arc<L>,
        wallet: Arc<W>,
        remote: Option<Arc<R>>,
        cache: C,
        config: ClientConfig,
    ) -> (Self, broadcast::Receiver<TransactionRecord>) {
        let (orchestrator, rx) =
            TransactionOrchestrator::new(reader.clone(), wallet.clone(), config.clone());
        let resolver = MetadataResolver::new(remote.clone(), cache);
        let aggregator = PoolAggregator::new(reader.clone(), resolver);
        (
            Self {
                reader,
                wallet,
                remote,
                orchestrator,
                aggregator,
                config,
            },
            rx,
        )
    }

    pub fn network(&self) -> Network {
        self.config.network
    }

    /// The connected account, if any.
    pub fn address(&self) -> Option<Address> {
        self.wallet.address()
    }

    // ── Lesson queries ──────────────────────────────────────────────────

    pub async fn lessons(&self, limit: u64) -> Result<Vec<Lesson>> {
        self.aggregator.list_lessons(limit).await
    }

    pub async fn lesson(&self, id: u64) -> Result<Option<Lesson>> {
        self.aggregator.get_lesson(id).await
    }

    /// Lessons still open for staking right now.
    pub async fn active_lessons(&self, limit: u64) -> Result<Vec<Lesson>> {
        let now = chrono::Utc::now().timestamp().max(0) as u64;
        self.aggregator.active_lessons(limit, now).await
    }

    /// The id the next created pool will take.
    pub async fn next_pool_id(&self) -> Result<u64> {
        Ok(self.reader.pool_counter().await? + 1)
    }

    // ── User queries ────────────────────────────────────────────────────

    pub async fn has_staked(&self, pool_id: u64) -> Result<bool> {
        let user = self.identity()?;
        self.reader.has_user_staked(pool_id, user).await
    }

    pub async fn claimable_reward(&self, pool_id: u64) -> Result<u128> {
        let user = self.identity()?;
        self.reader.calculate_reward(pool_id, user).await
    }

    pub async fn user_stake(&self, pool_id: u64, choice: u8) -> Result<UserStake> {
        let user = self.identity()?;
        self.reader.get_user_stake(pool_id, user, choice).await
    }

    // ── Transaction flows ───────────────────────────────────────────────

    pub async fn stake(&self, pool_id: u64, amount: u128, choice: u8) -> Result<TransactionRecord> {
        self.orchestrator.initiate_stake(pool_id, amount, choice).await
    }

    pub async fn create_pool(&self, params: PoolCreationParams) -> Result<TransactionRecord> {
        self.orchestrator.initiate_create_pool(params).await
    }

    /// Publish the lesson content, then create the pool pointing at it.
    ///
    /// The record is stored under a content id (aliased to the pool id so
    /// it is reachable either way) and the returned id becomes the pool's
    /// `metadata_uri`. Without a configured store the pool is created with
    /// the `metadata_uri` already in `params`.
    pub async fn create_lesson(
        &self,
        mut params: PoolCreationParams,
        metadata: &LessonMetadata,
    ) -> Result<TransactionRecord> {
        if let Some(remote) = &self.remote {
            let content_id = remote
                .publish(&PublishRequest {
                    id: None,
                    metadata: metadata.clone(),
                    aliases: vec![params.pool_id.to_string()],
                })
                .await?;
            params.metadata_uri = content_id;
        }
        self.orchestrator.initiate_create_pool(params).await
    }

    pub async fn resolve(&self, pool_id: u64, winning_choice: u8) -> Result<TransactionRecord> {
        self.orchestrator.initiate_resolve(pool_id, winning_choice).await
    }

    pub async fn cancel(&self, pool_id: u64, reason: impl Into<String>) -> Result<TransactionRecord> {
        self.orchestrator.initiate_cancel(pool_id, reason).await
    }

    pub async fn claim_reward(&self, pool_id: u64) -> Result<TransactionRecord> {
        self.orchestrator.initiate_claim_reward(pool_id).await
    }

    pub async fn claim_refund(&self, pool_id: u64) -> Result<TransactionRecord> {
        self.orchestrator.initiate_claim_refund(pool_id).await
    }

    // ── Metadata publishing ─────────────────────────────────────────────

    /// Publish or update a lesson record without creating a pool.
    pub async fn publish_lesson_metadata(
        &self,
        id: Option<String>,
        metadata: &LessonMetadata,
        aliases: Vec<String>,
    ) -> Result<String> {
        let Some(remote) = &self.remote else {
            return Err(Error::Store("no metadata store configured".into()));
        };
        remote
            .publish(&PublishRequest {
                id,
                metadata: metadata.clone(),
                aliases,
            })
            .await
    }

    // ── Transaction tracking ────────────────────────────────────────────

    pub fn pending_transaction(&self) -> Option<TransactionRecord> {
        self.orchestrator.pending()
    }

    pub fn transaction_status(&self) -> TxStatus {
        self.orchestrator.current_status()
    }

    pub fn transaction_history(&self) -> Vec<TransactionRecord> {
        self.orchestrator.history()
    }

    pub fn transaction_history_for_pool(&self, pool_id: u64) -> Vec<TransactionRecord> {
        self.orchestrator.history_for_pool(pool_id)
    }

    pub fn clear_pending_transaction(&self) {
        self.orchestrator.clear_pending();
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TransactionRecord> {
        self.orchestrator.subscribe()
    }

    fn identity(&self) -> Result<Address> {
        self.wallet.address().ok_or(Error::NoIdentity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::content::placeholder;
    use crate::testing::{MemoryCache, MockLedger, MockRemoteStore, MockWallet, test_pool};

    fn user() -> Address {
        "0x1111111111111111111111111111111111111111".parse().unwrap()
    }

    fn setup(
        with_remote: bool,
    ) -> (
        Arc<MockLedger>,
        Arc<MockRemoteStore>,
        QuizstakeNode<MockLedger, MockWallet, MockRemoteStore, MemoryCache>,
    ) {
        let ledger = Arc::new(MockLedger::default());
        let remote = Arc::new(MockRemoteStore::default());
        let wallet = Arc::new(MockWallet::new(
            Some(user()),
            Network::Devnet.chain_id(),
            ledger.clone(),
        ));
        let config = ClientConfig::new(
            Network::Devnet,
            "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa".parse().unwrap(),
            "0xbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb".parse().unwrap(),
        );
        let (node, _rx) = QuizstakeNode::new(
            ledger.clone(),
            wallet,
            with_remote.then(|| remote.clone()),
            MemoryCache::default(),
            config,
        );
        (ledger, remote, node)
    }

    #[tokio::test]
    async fn create_lesson_publishes_then_creates() {
        let (ledger, remote, node) = setup(true);
        ledger.set_counter(6);

        let pool_id = node.next_pool_id().await.unwrap();
        assert_eq!(pool_id, 7);

        let params = PoolCreationParams {
            pool_id,
            metadata_uri: String::new(),
            choices_count: 3,
            deadline: 4_000_000_000,
            min_stake: 1,
            max_stake: 100,
            creator_seed: 0,
            creator_fee_bps: 250,
        };
        let record = node
            .create_lesson(params, &placeholder("draft", 3))
            .await
            .unwrap();
        assert_eq!(record.pool_id, 7);

        // Published once, aliased to the pool id.
        let published = remote.published();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].aliases, vec!["7".to_string()]);
    }

    #[tokio::test]
    async fn create_lesson_without_store_keeps_given_uri() {
        let (_ledger, remote, node) = setup(false);

        let params = PoolCreationParams {
            pool_id: 1,
            metadata_uri: "pre-set".into(),
            choices_count: 2,
            deadline: 4_000_000_000,
            min_stake: 1,
            max_stake: 100,
            creator_seed: 0,
            creator_fee_bps: 0,
        };
        node.create_lesson(params, &placeholder("draft", 2))
            .await
            .unwrap();
        assert!(remote.published().is_empty());
    }

    #[tokio::test]
    async fn publish_without_store_is_an_error() {
        let (_ledger, _remote, node) = setup(false);
        let err = node
            .publish_lesson_metadata(None, &placeholder("x", 2), Vec::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Store(_)));
    }

    #[tokio::test]
    async fn user_queries_go_through_the_connected_identity() {
        let (ledger, _remote, node) = setup(true);
        ledger.insert_pool(test_pool(1, 2));
        ledger.set_reward(1, user(), 42);

        assert_eq!(node.claimable_reward(1).await.unwrap(), 42);
        assert!(!node.has_staked(1).await.unwrap());
        assert_eq!(node.user_stake(1, 0).await.unwrap().amount, 0);
    }

    #[tokio::test]
    async fn lessons_flow_through_the_aggregator() {
        let (ledger, _remote, node) = setup(true);
        ledger.insert_pool(test_pool(1, 2));
        ledger.insert_pool(test_pool(2, 2));

        let lessons = node.lessons(10).await.unwrap();
        assert_eq!(lessons.len(), 2);
        assert_eq!(lessons[0].id, 2);

        let active = node.active_lessons(10).await.unwrap();
        assert_eq!(active.len(), 2);
    }
}
