//! Delivery ledger and fraud heuristics: pending-quantity guard, attempt
//! thresholds, ticket age, and the authorization flow.

mod common;

use club_server::deliveries::DeliveryService;
use club_server::utils::AppError;
use shared::models::FraudKind;
use shared::request::DeliverItem;

fn deliver_req(ticket: &str, item: &str, qty: i64, sold: i64, sale_ts: Option<i64>) -> DeliverItem {
    DeliverItem::new(ticket, item, qty, sold, sale_ts, "S1", "Pedro", "Barra Principal").unwrap()
}

#[tokio::test]
async fn redeemed_quantity_never_exceeds_sold() {
    let env = common::setup().await;
    let service = DeliveryService::new(env.state.clone());

    // 2 sold: two single deliveries pass, the third is rejected
    service
        .deliver(&deliver_req("BMB 2001", "Mojito", 1, 2, None))
        .await
        .unwrap();
    service
        .deliver(&deliver_req("BMB 2001", "Mojito", 1, 2, None))
        .await
        .unwrap();

    let err = service
        .deliver(&deliver_req("BMB 2001", "Mojito", 1, 2, None))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)), "got {err:?}");

    // Over-asking in one go is rejected the same way
    let err = service
        .deliver(&deliver_req("BMB 2002", "Ron Cola", 3, 2, None))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)), "got {err:?}");
}

#[tokio::test]
async fn multiple_attempts_flags_then_authorization_covers_that_count() {
    let env = common::setup().await;
    let service = DeliveryService::new(env.state.clone());

    // Default threshold is 3 prior deliveries; the first four calls see
    // counts 0..=3 and pass
    for _ in 0..4 {
        service
            .deliver(&deliver_req("BMB 3001", "Cerveza", 1, 20, None))
            .await
            .unwrap();
    }

    // Fifth call sees 4 recorded deliveries and is flagged
    let err = service
        .deliver(&deliver_req("BMB 3001", "Cerveza", 1, 20, None))
        .await
        .unwrap_err();
    assert!(err.is_conflict(), "got {err:?}");

    let attempts = service.fraud_attempts_for_ticket("BMB 3001").await.unwrap();
    assert_eq!(attempts.len(), 1);
    assert_eq!(attempts[0].kind, FraudKind::MultipleAttempts);
    assert!(!attempts[0].authorized);

    // Authorize and retry: passes, and appends the delivery
    service
        .authorize_fraud("BMB 3001", FraudKind::MultipleAttempts, "admin")
        .await
        .unwrap();
    service
        .deliver(&deliver_req("BMB 3001", "Cerveza", 1, 20, None))
        .await
        .unwrap();

    // A fresh over-threshold count triggers again
    let err = service
        .deliver(&deliver_req("BMB 3001", "Cerveza", 1, 20, None))
        .await
        .unwrap_err();
    assert!(err.is_conflict(), "fresh trigger must re-flag, got {err:?}");

    let attempts = service.fraud_attempts_for_ticket("BMB 3001").await.unwrap();
    assert_eq!(attempts.len(), 2);
}

#[tokio::test]
async fn old_ticket_flags_and_passes_after_authorization() {
    let env = common::setup().await;
    let service = DeliveryService::new(env.state.clone());

    // Sold 30 hours ago, threshold 24h
    let sold_at = shared::util::now_millis() - 30 * 60 * 60 * 1000;
    let req = deliver_req("BMB 1001", "Mojito", 1, 2, Some(sold_at));

    let err = service.deliver(&req).await.unwrap_err();
    assert!(err.is_conflict(), "got {err:?}");

    let attempts = service.fraud_attempts_for_ticket("BMB 1001").await.unwrap();
    assert_eq!(attempts.len(), 1);
    assert_eq!(attempts[0].kind, FraudKind::OldTicket);

    // No delivery was appended by the flagged attempt
    assert!(service.deliveries_for_ticket("BMB 1001").await.unwrap().is_empty());

    service
        .authorize_fraud("BMB 1001", FraudKind::OldTicket, "admin")
        .await
        .unwrap();

    // The identical redemption call now succeeds and appends a row
    let delivered = service.deliver(&req).await.unwrap();
    assert_eq!(delivered.ticket_id, "BMB 1001");
    assert_eq!(delivered.qty, 1);
    assert_eq!(service.deliveries_for_ticket("BMB 1001").await.unwrap().len(), 1);

    // Age only grows; an authorized old_ticket never re-flags
    service.deliver(&req).await.unwrap();
}

#[tokio::test]
async fn authorize_without_pending_attempt_is_not_found() {
    let env = common::setup().await;
    let service = DeliveryService::new(env.state.clone());

    let err = service
        .authorize_fraud("BMB 9999", FraudKind::OldTicket, "admin")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)), "got {err:?}");
}

#[tokio::test]
async fn redeemed_total_is_the_sum_of_rows() {
    let env = common::setup().await;
    let service = DeliveryService::new(env.state.clone());

    service
        .deliver(&deliver_req("BMB 4001", "Vodka", 2, 6, None))
        .await
        .unwrap();
    service
        .deliver(&deliver_req("BMB 4001", "Vodka", 3, 6, None))
        .await
        .unwrap();

    let delivered =
        club_server::db::repository::delivery::sum_delivered(&env.state.pool, "BMB 4001", "Vodka")
            .await
            .unwrap();
    assert_eq!(delivered, 5);

    // Only 1 left
    let err = service
        .deliver(&deliver_req("BMB 4001", "Vodka", 2, 6, None))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)), "got {err:?}");
    service
        .deliver(&deliver_req("BMB 4001", "Vodka", 1, 6, None))
        .await
        .unwrap();
}

#[tokio::test]
async fn admin_delete_is_the_only_mutation() {
    let env = common::setup().await;
    let service = DeliveryService::new(env.state.clone());

    let delivered = service
        .deliver(&deliver_req("BMB 5001", "Gin Tonic", 1, 1, None))
        .await
        .unwrap();

    assert!(service.delete_delivery(delivered.id, "admin").await.unwrap());
    assert!(service.deliveries_for_ticket("BMB 5001").await.unwrap().is_empty());

    let err = service.delete_delivery(delivered.id, "admin").await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)), "got {err:?}");
}
