//! In-memory collaborator implementations for driving the orchestrator and
//! attributor without a database or a live scheduler.

#![allow(dead_code, clippy::unwrap_used)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use followup_core::{CartIdentity, Email, EmailId, OrderId, ProductId, UserId};
use followup_service::abandonment::{AbandonmentThreshold, ThresholdUnit};
use followup_service::attribution::ConversionAttributor;
use followup_service::db::RepositoryError;
use followup_service::dedup::{DedupKey, DedupSet, DedupStore};
use followup_service::events::EventBus;
use followup_service::lifecycle::{Collaborators, LifecycleOrchestrator};
use followup_service::models::{CartContents, CartLineItem, CartSnapshot, VisitorContext};
use followup_service::orders::{OrderCustomer, OrderDirectory};
use followup_service::platform::PlatformStore;
use followup_service::scheduler::{
    EmailScheduler, QueueCartEmails, SchedulerError, SentEmailQuery, SentEmailRecord,
};
use followup_service::snapshot::CartSnapshotStore;

// =============================================================================
// Test data helpers
// =============================================================================

pub fn email(s: &str) -> Email {
    Email::parse(s).unwrap()
}

pub fn item(product: i64, quantity: u32) -> CartLineItem {
    CartLineItem::new(ProductId::new(product), quantity, Decimal::new(1999, 2))
}

pub fn contents(items: Vec<CartLineItem>) -> CartContents {
    let total = items
        .iter()
        .map(|line| line.unit_price * Decimal::from(line.quantity))
        .sum();
    CartContents::new(items, total)
}

pub fn key(email_id: i64, product: i64) -> DedupKey {
    DedupKey::new(EmailId::new(email_id), ProductId::new(product))
}

pub fn sent_record(
    queue_id: i64,
    email_id: i64,
    user_id: Option<i64>,
    user_email: Option<&str>,
    date_sent: DateTime<Utc>,
) -> SentEmailRecord {
    SentEmailRecord {
        queue_id,
        email_id: EmailId::new(email_id),
        user_id: user_id.map(UserId::new),
        user_email: user_email.map(email),
        date_sent,
    }
}

// =============================================================================
// In-memory stores
// =============================================================================

/// Snapshot store over a plain map.
#[derive(Default)]
pub struct MemoryCartStore {
    rows: Mutex<HashMap<CartIdentity, CartSnapshot>>,
}

impl MemoryCartStore {
    pub fn get(&self, identity: &CartIdentity) -> Option<CartSnapshot> {
        self.rows.lock().unwrap().get(identity).cloned()
    }

    pub fn len(&self) -> usize {
        self.rows.lock().unwrap().len()
    }

    /// Backdate a stored snapshot (for abandonment scenarios).
    pub fn set_date_updated(&self, identity: &CartIdentity, date_updated: DateTime<Utc>) {
        if let Some(row) = self.rows.lock().unwrap().get_mut(identity) {
            row.date_updated = date_updated;
        }
    }
}

#[async_trait]
impl CartSnapshotStore for MemoryCartStore {
    async fn upsert(
        &self,
        visitor: &VisitorContext,
        cart: &CartContents,
    ) -> Result<(), RepositoryError> {
        let Some(identity) = visitor.identity() else {
            return Ok(());
        };

        self.rows.lock().unwrap().insert(
            identity.clone(),
            CartSnapshot {
                identity,
                first_name: visitor.first_name.clone(),
                last_name: visitor.last_name.clone(),
                items: cart.items.clone(),
                total: cart.total,
                date_updated: Utc::now(),
            },
        );
        Ok(())
    }

    async fn fetch(
        &self,
        identity: &CartIdentity,
    ) -> Result<Option<CartSnapshot>, RepositoryError> {
        Ok(self.get(identity))
    }

    async fn touch(
        &self,
        identity: &CartIdentity,
        now: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        if let Some(row) = self.rows.lock().unwrap().get_mut(identity) {
            row.date_updated = now;
        }
        Ok(())
    }
}

/// Dedup store over a plain map.
#[derive(Default)]
pub struct MemoryDedupStore {
    sets: Mutex<HashMap<CartIdentity, DedupSet>>,
}

impl MemoryDedupStore {
    pub fn marks_for(&self, identity: &CartIdentity) -> DedupSet {
        self.sets
            .lock()
            .unwrap()
            .get(identity)
            .cloned()
            .unwrap_or_default()
    }

    pub fn preload(&self, identity: &CartIdentity, marks: DedupSet) {
        self.sets.lock().unwrap().insert(identity.clone(), marks);
    }
}

#[async_trait]
impl DedupStore for MemoryDedupStore {
    async fn load(&self, identity: &CartIdentity) -> Result<DedupSet, RepositoryError> {
        Ok(self.marks_for(identity))
    }

    async fn save(&self, identity: &CartIdentity, marks: &DedupSet) -> Result<(), RepositoryError> {
        self.sets
            .lock()
            .unwrap()
            .insert(identity.clone(), marks.clone());
        Ok(())
    }
}

/// Scheduler double: records every call, answers from configured fixtures.
#[derive(Default)]
pub struct MemoryScheduler {
    active: Mutex<Vec<EmailId>>,
    sent: Mutex<Vec<SentEmailRecord>>,
    /// Pairs the scheduler "wants" to queue for any cart state; the
    /// already-queued set from the request is skipped, like the real thing.
    queue_response: Mutex<Vec<DedupKey>>,
    queue_calls: Mutex<Vec<QueueCartEmails>>,
    delete_calls: Mutex<Vec<(Option<UserId>, Option<String>)>>,
}

impl MemoryScheduler {
    pub fn set_active(&self, ids: Vec<i64>) {
        *self.active.lock().unwrap() = ids.into_iter().map(EmailId::new).collect();
    }

    pub fn push_sent(&self, record: SentEmailRecord) {
        self.sent.lock().unwrap().push(record);
    }

    pub fn set_queue_response(&self, keys: Vec<DedupKey>) {
        *self.queue_response.lock().unwrap() = keys;
    }

    pub fn queue_calls(&self) -> Vec<QueueCartEmails> {
        self.queue_calls.lock().unwrap().clone()
    }

    pub fn delete_calls(&self) -> Vec<(Option<UserId>, Option<String>)> {
        self.delete_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl EmailScheduler for MemoryScheduler {
    async fn active_email_ids(&self) -> Result<Vec<EmailId>, SchedulerError> {
        Ok(self.active.lock().unwrap().clone())
    }

    async fn queue_cart_emails(
        &self,
        request: QueueCartEmails,
    ) -> Result<Vec<DedupKey>, SchedulerError> {
        let queued: Vec<DedupKey> = self
            .queue_response
            .lock()
            .unwrap()
            .iter()
            .filter(|k| !request.already_queued.contains(k))
            .copied()
            .collect();

        self.queue_calls.lock().unwrap().push(request);
        Ok(queued)
    }

    async fn delete_unsent_cart_emails(
        &self,
        user_id: Option<UserId>,
        email: Option<&Email>,
    ) -> Result<u64, SchedulerError> {
        self.delete_calls
            .lock()
            .unwrap()
            .push((user_id, email.map(|e| e.as_str().to_owned())));
        Ok(0)
    }

    async fn sent_emails(
        &self,
        query: &SentEmailQuery,
    ) -> Result<Vec<SentEmailRecord>, SchedulerError> {
        let mut matches: Vec<SentEmailRecord> = self
            .sent
            .lock()
            .unwrap()
            .iter()
            .filter(|record| query.email_ids.contains(&record.email_id))
            .filter(|record| match (query.user_id, query.email.as_ref()) {
                (Some(user_id), _) => record.user_id == Some(user_id),
                (None, Some(email)) => record.user_email.as_ref() == Some(email),
                (None, None) => false,
            })
            .filter(|record| {
                record.date_sent >= query.sent_after && record.date_sent <= query.sent_before
            })
            .cloned()
            .collect();

        matches.sort_by_key(|record| std::cmp::Reverse(record.date_sent));
        matches.truncate(query.limit);
        Ok(matches)
    }
}

/// Order directory over plain maps.
#[derive(Default)]
pub struct MemoryOrders {
    customers: Mutex<HashMap<OrderId, OrderCustomer>>,
    renewals: Mutex<HashSet<OrderId>>,
    conversions: Mutex<HashMap<OrderId, EmailId>>,
}

impl MemoryOrders {
    pub fn insert_order(&self, order_id: OrderId, customer: OrderCustomer) {
        self.customers.lock().unwrap().insert(order_id, customer);
    }

    pub fn flag_renewal(&self, order_id: OrderId) {
        self.renewals.lock().unwrap().insert(order_id);
    }

    pub fn conversion(&self, order_id: OrderId) -> Option<EmailId> {
        self.conversions.lock().unwrap().get(&order_id).copied()
    }

    pub fn conversion_count(&self) -> usize {
        self.conversions.lock().unwrap().len()
    }
}

#[async_trait]
impl OrderDirectory for MemoryOrders {
    async fn resolve_customer(
        &self,
        order_id: OrderId,
    ) -> Result<Option<OrderCustomer>, RepositoryError> {
        Ok(self.customers.lock().unwrap().get(&order_id).cloned())
    }

    async fn is_subscription_renewal(&self, order_id: OrderId) -> Result<bool, RepositoryError> {
        Ok(self.renewals.lock().unwrap().contains(&order_id))
    }

    async fn conversion_email(
        &self,
        order_id: OrderId,
    ) -> Result<Option<EmailId>, RepositoryError> {
        Ok(self.conversion(order_id))
    }

    async fn record_conversion(
        &self,
        order_id: OrderId,
        email_id: EmailId,
    ) -> Result<(), RepositoryError> {
        self.conversions.lock().unwrap().insert(order_id, email_id);
        Ok(())
    }
}

/// Platform state over plain maps.
#[derive(Default)]
pub struct MemoryPlatform {
    remembered: Mutex<HashSet<UserId>>,
    sessions: Mutex<HashMap<String, serde_json::Value>>,
}

impl MemoryPlatform {
    pub fn remember_cart(&self, user_id: UserId) {
        self.remembered.lock().unwrap().insert(user_id);
    }

    pub fn is_remembered(&self, user_id: UserId) -> bool {
        self.remembered.lock().unwrap().contains(&user_id)
    }

    pub fn set_session(&self, session_key: &str, blob: serde_json::Value) {
        self.sessions
            .lock()
            .unwrap()
            .insert(session_key.to_owned(), blob);
    }

    pub fn session(&self, session_key: &str) -> Option<serde_json::Value> {
        self.sessions.lock().unwrap().get(session_key).cloned()
    }
}

#[async_trait]
impl PlatformStore for MemoryPlatform {
    async fn clear_remembered_cart(&self, user_id: UserId) -> Result<(), RepositoryError> {
        self.remembered.lock().unwrap().remove(&user_id);
        Ok(())
    }

    async fn clear_session_cart(&self, user_id: UserId) -> Result<(), RepositoryError> {
        let mut sessions = self.sessions.lock().unwrap();
        if let Some(serde_json::Value::Object(blob)) = sessions.get_mut(&user_id.to_string())
            && blob.contains_key("cart")
        {
            blob.insert("cart".to_owned(), serde_json::json!({}));
        }
        Ok(())
    }
}

// =============================================================================
// Harness
// =============================================================================

/// Orchestrator plus handles on every in-memory collaborator.
pub struct Harness {
    pub snapshots: Arc<MemoryCartStore>,
    pub dedup: Arc<MemoryDedupStore>,
    pub scheduler: Arc<MemoryScheduler>,
    pub orders: Arc<MemoryOrders>,
    pub platform: Arc<MemoryPlatform>,
    pub bus: EventBus,
    pub orchestrator: LifecycleOrchestrator,
}

pub fn harness() -> Harness {
    harness_with_threshold(AbandonmentThreshold::new(1, ThresholdUnit::Hours))
}

pub fn harness_with_threshold(threshold: AbandonmentThreshold) -> Harness {
    let snapshots = Arc::new(MemoryCartStore::default());
    let dedup = Arc::new(MemoryDedupStore::default());
    let scheduler = Arc::new(MemoryScheduler::default());
    let orders = Arc::new(MemoryOrders::default());
    let platform = Arc::new(MemoryPlatform::default());
    let bus = EventBus::default();

    let orchestrator = LifecycleOrchestrator::new(
        Collaborators {
            snapshots: snapshots.clone(),
            dedup: dedup.clone(),
            scheduler: scheduler.clone(),
            orders: orders.clone(),
            platform: platform.clone(),
        },
        bus.clone(),
        threshold,
    );

    Harness {
        snapshots,
        dedup,
        scheduler,
        orders,
        platform,
        bus,
        orchestrator,
    }
}

impl Harness {
    pub fn attributor(&self, conversion_days: u32) -> ConversionAttributor {
        ConversionAttributor::new(
            self.orders.clone(),
            self.scheduler.clone(),
            self.bus.clone(),
            conversion_days,
        )
    }
}
