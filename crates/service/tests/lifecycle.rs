//! Lifecycle orchestrator behavior against in-memory collaborators.

#![allow(clippy::unwrap_used)]

mod support;

use chrono::{Duration, Utc};

use followup_core::{CartIdentity, OrderId, UserId};
use followup_service::abandonment::{AbandonmentThreshold, CartStatus, ThresholdUnit};
use followup_service::events::CartEvent;
use followup_service::models::{CartContents, CartEmptiedReason, CartUpdateTrigger, VisitorContext};
use followup_service::orders::OrderCustomer;

use support::{contents, email, harness, harness_with_threshold, item, key};

fn registered_visitor(id: i64) -> VisitorContext {
    VisitorContext::registered(UserId::new(id)).with_name("Ada", "Lovelace")
}

#[tokio::test]
async fn test_anonymous_visitor_is_never_tracked() {
    let h = harness();
    let visitor = VisitorContext::anonymous();

    h.orchestrator
        .cart_updated(&visitor, &contents(vec![item(1, 2)]), CartUpdateTrigger::Other)
        .await
        .unwrap();
    h.orchestrator
        .cart_emptied(&visitor, CartEmptiedReason::Cleared)
        .await
        .unwrap();

    assert_eq!(h.snapshots.len(), 0);
    assert!(h.scheduler.queue_calls().is_empty());
    assert!(h.scheduler.delete_calls().is_empty());
}

#[tokio::test]
async fn test_cart_updated_snapshots_and_queues() {
    let h = harness();
    h.scheduler.set_queue_response(vec![key(5, 42)]);

    let visitor = registered_visitor(7);
    let cart = contents(vec![item(42, 2), item(43, 1)]);

    h.orchestrator
        .cart_updated(&visitor, &cart, CartUpdateTrigger::AddToCart(42.into()))
        .await
        .unwrap();

    // Snapshot round-trips the cart the platform reported.
    let identity = CartIdentity::Customer(UserId::new(7));
    let snapshot = h.snapshots.get(&identity).unwrap();
    assert_eq!(snapshot.items, cart.items);
    assert_eq!(snapshot.total, cart.total);
    assert_eq!(snapshot.first_name, "Ada");

    // The scheduler saw the cart and the added product; its queued pairs
    // are now marked.
    let calls = h.scheduler.queue_calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].added_product, Some(42.into()));
    assert_eq!(calls[0].user_id, Some(UserId::new(7)));
    assert!(h.dedup.marks_for(&identity).contains(&key(5, 42)));
}

#[tokio::test]
async fn test_cart_updated_skips_already_queued_pairs() {
    let h = harness();
    let visitor = registered_visitor(7);
    let identity = CartIdentity::Customer(UserId::new(7));

    h.dedup.preload(&identity, [key(5, 42)].into_iter().collect());
    h.scheduler.set_queue_response(vec![key(5, 42), key(5, 43)]);

    h.orchestrator
        .cart_updated(
            &visitor,
            &contents(vec![item(42, 1), item(43, 1)]),
            CartUpdateTrigger::Other,
        )
        .await
        .unwrap();

    // The scheduler received the existing marks and only the new pair got
    // queued and marked on top.
    let calls = h.scheduler.queue_calls();
    assert!(calls[0].already_queued.contains(&key(5, 42)));
    let marks = h.dedup.marks_for(&identity);
    assert_eq!(marks.len(), 2);
    assert!(marks.contains(&key(5, 43)));
}

#[tokio::test]
async fn test_cart_updated_with_empty_cart_is_handled_as_emptied() {
    let h = harness();
    let visitor = registered_visitor(7);
    let identity = CartIdentity::Customer(UserId::new(7));
    let mut events = h.bus.subscribe();

    h.dedup.preload(&identity, [key(5, 42)].into_iter().collect());

    h.orchestrator
        .cart_updated(&visitor, &CartContents::empty(), CartUpdateTrigger::Other)
        .await
        .unwrap();

    // Emptied handling: unsent emails dropped, marks reset, empty snapshot
    // recorded, event announced. No queueing happened.
    assert_eq!(
        h.scheduler.delete_calls(),
        vec![(Some(UserId::new(7)), None)]
    );
    assert!(h.dedup.marks_for(&identity).is_empty());
    assert!(h.snapshots.get(&identity).unwrap().items.is_empty());
    assert!(h.scheduler.queue_calls().is_empty());

    match events.try_recv().unwrap() {
        CartEvent::CartEmptied { identity: seen } => assert_eq!(seen, identity),
        CartEvent::CartConversion { .. } => panic!("wrong event"),
    }
}

#[tokio::test]
async fn test_cart_emptied_during_logout_changes_nothing() {
    let h = harness();
    let visitor = registered_visitor(7);
    let identity = CartIdentity::Customer(UserId::new(7));
    let mut events = h.bus.subscribe();

    // Seed live state: a snapshot and a mark.
    h.orchestrator
        .cart_updated(&visitor, &contents(vec![item(42, 1)]), CartUpdateTrigger::Other)
        .await
        .unwrap();
    h.dedup.preload(&identity, [key(5, 42)].into_iter().collect());

    h.orchestrator
        .cart_emptied(&visitor, CartEmptiedReason::Logout)
        .await
        .unwrap();

    // Queued emails survive a logout; snapshot and marks are untouched.
    assert!(h.scheduler.delete_calls().is_empty());
    assert_eq!(h.dedup.marks_for(&identity).len(), 1);
    assert!(!h.snapshots.get(&identity).unwrap().items.is_empty());
    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn test_cart_emptied_clears_state_for_guests_too() {
    let h = harness();
    let guest = VisitorContext::guest(email("g@example.com"));
    let identity = CartIdentity::Guest(email("g@example.com"));

    h.dedup.preload(&identity, [key(5, 42)].into_iter().collect());

    h.orchestrator
        .cart_emptied(&guest, CartEmptiedReason::Cleared)
        .await
        .unwrap();

    assert_eq!(
        h.scheduler.delete_calls(),
        vec![(None, Some("g@example.com".to_owned()))]
    );
    assert!(h.dedup.marks_for(&identity).is_empty());
    assert!(h.snapshots.get(&identity).unwrap().items.is_empty());
}

#[tokio::test]
async fn test_order_finalized_clears_registered_and_billing_email() {
    let h = harness();
    let order = OrderId::new(900);
    let identity = CartIdentity::Customer(UserId::new(7));

    h.orders.insert_order(
        order,
        OrderCustomer {
            user_id: Some(UserId::new(7)),
            billing_email: Some(email("ada@example.com")),
        },
    );
    h.dedup.preload(&identity, [key(5, 42)].into_iter().collect());

    h.orchestrator.order_finalized(order).await.unwrap();

    assert_eq!(
        h.scheduler.delete_calls(),
        vec![
            (Some(UserId::new(7)), None),
            (None, Some("ada@example.com".to_owned())),
        ]
    );
    assert!(h.dedup.marks_for(&identity).is_empty());

    // Fires once per status transition; the second run only repeats the
    // delete calls.
    h.orchestrator.order_finalized(order).await.unwrap();
    assert_eq!(h.scheduler.delete_calls().len(), 4);
    assert!(h.dedup.marks_for(&identity).is_empty());
}

#[tokio::test]
async fn test_order_finalized_guest_deletes_by_email_only() {
    let h = harness();
    let order = OrderId::new(901);

    h.orders.insert_order(
        order,
        OrderCustomer {
            user_id: None,
            billing_email: Some(email("g@example.com")),
        },
    );

    h.orchestrator.order_finalized(order).await.unwrap();

    assert_eq!(
        h.scheduler.delete_calls(),
        vec![(None, Some("g@example.com".to_owned()))]
    );
}

#[tokio::test]
async fn test_order_finalized_unknown_order_is_a_noop() {
    let h = harness();

    h.orchestrator
        .order_finalized(OrderId::new(999))
        .await
        .unwrap();

    assert!(h.scheduler.delete_calls().is_empty());
}

#[tokio::test]
async fn test_operator_clear_wipes_every_cart_remnant() {
    let h = harness();
    let user = UserId::new(7);
    let identity = CartIdentity::Customer(user);
    let visitor = registered_visitor(7);

    h.orchestrator
        .cart_updated(&visitor, &contents(vec![item(42, 1)]), CartUpdateTrigger::Other)
        .await
        .unwrap();
    h.dedup.preload(&identity, [key(5, 42)].into_iter().collect());
    h.platform.remember_cart(user);
    h.platform.set_session(
        "7",
        serde_json::json!({
            "cart": {"42": {"quantity": 1}},
            "currency": "USD",
        }),
    );

    h.orchestrator
        .operator_clear(Some(user), None)
        .await
        .unwrap();

    assert_eq!(h.scheduler.delete_calls(), vec![(Some(user), None)]);
    assert!(h.dedup.marks_for(&identity).is_empty());
    assert!(!h.platform.is_remembered(user));

    // The session row keeps unrelated keys; only the cart was rewritten.
    let session = h.platform.session("7").unwrap();
    assert_eq!(session["cart"], serde_json::json!({}));
    assert_eq!(session["currency"], serde_json::json!("USD"));
}

#[tokio::test]
async fn test_operator_clear_guest_resets_marks() {
    let h = harness();
    let identity = CartIdentity::Guest(email("g@example.com"));
    h.dedup.preload(&identity, [key(5, 42)].into_iter().collect());

    h.orchestrator
        .operator_clear(None, Some(&email("g@example.com")))
        .await
        .unwrap();

    assert!(h.dedup.marks_for(&identity).is_empty());
}

#[tokio::test]
async fn test_operator_clear_with_no_target_is_a_noop() {
    let h = harness();

    h.orchestrator.operator_clear(None, None).await.unwrap();

    assert!(h.scheduler.delete_calls().is_empty());
}

#[tokio::test]
async fn test_cart_status_uses_configured_threshold() {
    let one_hour = harness_with_threshold(AbandonmentThreshold::new(1, ThresholdUnit::Hours));
    let three_hours = harness_with_threshold(AbandonmentThreshold::new(3, ThresholdUnit::Hours));
    let visitor = registered_visitor(7);
    let identity = CartIdentity::Customer(UserId::new(7));
    let two_hours_ago = Utc::now() - Duration::hours(2);

    for h in [&one_hour, &three_hours] {
        h.orchestrator
            .cart_updated(&visitor, &contents(vec![item(42, 1)]), CartUpdateTrigger::Other)
            .await
            .unwrap();
        h.snapshots.set_date_updated(&identity, two_hours_ago);
    }

    assert_eq!(
        one_hour.orchestrator.cart_status(&identity).await.unwrap(),
        CartStatus::Abandoned
    );
    assert_eq!(
        three_hours
            .orchestrator
            .cart_status(&identity)
            .await
            .unwrap(),
        CartStatus::Active
    );

    // No snapshot at all reads as active.
    let other = CartIdentity::Customer(UserId::new(8));
    assert_eq!(
        one_hour.orchestrator.cart_status(&other).await.unwrap(),
        CartStatus::Active
    );
}
