//! Ledger behaviour exercised through the repositories against SQLite.

mod test_utils;

use databundle::error::RepositoryError;
use databundle::models::{OrderStatus, Withdrawal, WithdrawalStatus};
use databundle::repositories::{
    AnalyticsRepository, BundleRepository, NetworkRepository, OrderRepository,
    WithdrawalRepository, vendor_balance,
};
use sea_orm::{EntityTrait, PaginatorTrait};
use tempfile::TempDir;
use test_utils::{
    COMMISSION_BPS, completed_order_with_profit, create_test_bundle, create_test_network,
    create_test_vendor, place_test_order, setup_file_db, setup_test_db,
};

#[tokio::test]
async fn second_withdrawal_beyond_remaining_balance_is_refused() {
    let db = setup_test_db().await.unwrap();
    let vendor = create_test_vendor(&db, "ama@example.com").await.unwrap();
    completed_order_with_profit(&db, vendor.id, 20).await.unwrap();
    completed_order_with_profit(&db, vendor.id, 30).await.unwrap();

    let repo = WithdrawalRepository::new(&db);
    let first = repo.request(vendor.id, 40).await.unwrap();
    assert_eq!(first.status, "Pending");
    assert!(first.processed_at.is_none());

    let err = repo.request(vendor.id, 40).await.unwrap_err();
    assert!(matches!(
        err,
        RepositoryError::InsufficientBalance {
            requested: 40,
            available: 10
        }
    ));

    assert_eq!(Withdrawal::find().count(&db).await.unwrap(), 1);
}

#[tokio::test]
async fn pending_attributed_profit_is_withdrawable_but_failed_is_not() {
    let db = setup_test_db().await.unwrap();
    let vendor = create_test_vendor(&db, "kofi@example.com").await.unwrap();
    let network = create_test_network(&db, "MTN").await.unwrap();
    let bundle = create_test_bundle(&db, network.id, 500).await.unwrap();

    let pending = place_test_order(&db, bundle.id, Some(vendor.id))
        .await
        .unwrap();
    assert_eq!(pending.status, "Pending");
    assert_eq!(pending.profit, 50);

    let failed = place_test_order(&db, bundle.id, Some(vendor.id))
        .await
        .unwrap();
    OrderRepository::new(&db, COMMISSION_BPS)
        .update_status(failed.id, OrderStatus::Failed)
        .await
        .unwrap();

    let balance = vendor_balance(&db, vendor.id).await.unwrap();
    assert_eq!(balance.earned, 50);
    assert_eq!(balance.available, 50);

    let repo = WithdrawalRepository::new(&db);
    let withdrawal = repo.request(vendor.id, 40).await.unwrap();
    assert_eq!(withdrawal.amount, 40);

    let err = repo.request(vendor.id, 20).await.unwrap_err();
    assert!(matches!(
        err,
        RepositoryError::InsufficientBalance {
            requested: 20,
            available: 10
        }
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_requests_cannot_overdraw() {
    let dir = TempDir::new().unwrap();
    let db = setup_file_db(&dir).await.unwrap();
    let vendor = create_test_vendor(&db, "adwoa@example.com").await.unwrap();
    completed_order_with_profit(&db, vendor.id, 50).await.unwrap();

    let repo = WithdrawalRepository::new(&db);
    let (first, second) = tokio::join!(repo.request(vendor.id, 40), repo.request(vendor.id, 40));

    let granted = [&first, &second].iter().filter(|r| r.is_ok()).count();
    assert_eq!(granted, 1, "first={first:?} second={second:?}");
    assert_eq!(Withdrawal::find().count(&db).await.unwrap(), 1);
    assert_eq!(vendor_balance(&db, vendor.id).await.unwrap().available, 10);
}

#[tokio::test]
async fn non_positive_withdrawal_is_a_validation_error() {
    let db = setup_test_db().await.unwrap();
    let vendor = create_test_vendor(&db, "esi@example.com").await.unwrap();

    let repo = WithdrawalRepository::new(&db);
    assert!(matches!(
        repo.request(vendor.id, 0).await,
        Err(RepositoryError::Validation(_))
    ));
    assert!(matches!(
        repo.request(vendor.id, -5).await,
        Err(RepositoryError::Validation(_))
    ));
}

#[tokio::test]
async fn approval_stamps_processed_at_and_cannot_repeat() {
    let db = setup_test_db().await.unwrap();
    let vendor = create_test_vendor(&db, "yaw@example.com").await.unwrap();
    completed_order_with_profit(&db, vendor.id, 50).await.unwrap();

    let repo = WithdrawalRepository::new(&db);
    let requested = repo.request(vendor.id, 50).await.unwrap();

    let approved = repo.approve(requested.id).await.unwrap();
    assert_eq!(approved.status, "Approved");
    assert!(approved.processed_at.is_some());

    match repo.approve(requested.id).await.unwrap_err() {
        RepositoryError::Conflict { code, .. } => assert_eq!(code, "INVALID_TRANSITION"),
        other => panic!("expected conflict, got {other:?}"),
    }

    let completed = repo.complete(requested.id).await.unwrap();
    assert_eq!(completed.status, WithdrawalStatus::Completed.as_str());

    // Completed payouts stay deducted
    let balance = vendor_balance(&db, vendor.id).await.unwrap();
    assert_eq!(balance.available, 0);
}

#[tokio::test]
async fn rejected_withdrawal_returns_funds() {
    let db = setup_test_db().await.unwrap();
    let vendor = create_test_vendor(&db, "abena@example.com").await.unwrap();
    completed_order_with_profit(&db, vendor.id, 30).await.unwrap();

    let repo = WithdrawalRepository::new(&db);
    let requested = repo.request(vendor.id, 30).await.unwrap();
    assert_eq!(vendor_balance(&db, vendor.id).await.unwrap().available, 0);

    let rejected = repo.reject(requested.id).await.unwrap();
    assert_eq!(rejected.status, "Rejected");
    assert!(rejected.processed_at.is_some());
    assert_eq!(vendor_balance(&db, vendor.id).await.unwrap().available, 30);

    assert!(repo.complete(requested.id).await.is_err());
}

#[tokio::test]
async fn unknown_withdrawal_is_not_found() {
    let db = setup_test_db().await.unwrap();
    let err = WithdrawalRepository::new(&db)
        .approve(uuid::Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(matches!(err, RepositoryError::NotFound(_)));
}

#[tokio::test]
async fn terminal_order_rejects_further_updates() {
    let db = setup_test_db().await.unwrap();
    let network = create_test_network(&db, "Vodafone").await.unwrap();
    let bundle = create_test_bundle(&db, network.id, 200).await.unwrap();
    let order = place_test_order(&db, bundle.id, None).await.unwrap();

    let repo = OrderRepository::new(&db, COMMISSION_BPS);
    repo.update_status(order.id, OrderStatus::Completed)
        .await
        .unwrap();

    for next in [OrderStatus::Pending, OrderStatus::Failed, OrderStatus::Completed] {
        match repo.update_status(order.id, next).await.unwrap_err() {
            RepositoryError::Conflict { code, .. } => assert_eq!(code, "INVALID_TRANSITION"),
            other => panic!("expected conflict, got {other:?}"),
        }
    }

    let stored = repo.find(order.id).await.unwrap().unwrap();
    assert_eq!(stored.status, "Completed");
}

#[tokio::test]
async fn placed_orders_start_pending_and_price_from_bundle() {
    let db = setup_test_db().await.unwrap();
    let vendor = create_test_vendor(&db, "kwame@example.com").await.unwrap();
    let network = create_test_network(&db, "AirtelTigo").await.unwrap();
    let bundle = create_test_bundle(&db, network.id, 1250).await.unwrap();

    let customer = place_test_order(&db, bundle.id, None).await.unwrap();
    assert_eq!(customer.status, "Pending");
    assert_eq!(customer.amount, 1250);
    assert_eq!(customer.profit, 0);

    let attributed = place_test_order(&db, bundle.id, Some(vendor.id))
        .await
        .unwrap();
    assert_eq!(attributed.status, "Pending");
    assert_eq!(attributed.profit, 125);
}

#[tokio::test]
async fn unknown_bundle_is_not_found() {
    let db = setup_test_db().await.unwrap();
    let err = place_test_order(&db, uuid::Uuid::new_v4(), None)
        .await
        .unwrap_err();
    let err = err.downcast::<RepositoryError>().unwrap();
    assert!(matches!(err, RepositoryError::NotFound(_)));
}

#[tokio::test]
async fn assigning_a_vendor_credits_commission_once() {
    let db = setup_test_db().await.unwrap();
    let vendor = create_test_vendor(&db, "efua@example.com").await.unwrap();
    let other = create_test_vendor(&db, "akua@example.com").await.unwrap();
    let network = create_test_network(&db, "Glo").await.unwrap();
    let bundle = create_test_bundle(&db, network.id, 300).await.unwrap();
    let order = place_test_order(&db, bundle.id, None).await.unwrap();

    let repo = OrderRepository::new(&db, COMMISSION_BPS);
    let assigned = repo.assign_vendor(order.id, vendor.id).await.unwrap();
    assert_eq!(assigned.vendor_id, Some(vendor.id));
    assert_eq!(assigned.profit, 30);

    match repo.assign_vendor(order.id, other.id).await.unwrap_err() {
        RepositoryError::Conflict { code, .. } => assert_eq!(code, "ALREADY_ASSIGNED"),
        other => panic!("expected conflict, got {other:?}"),
    }
}

#[tokio::test]
async fn catalog_deletes_are_restricted_while_referenced() {
    let db = setup_test_db().await.unwrap();
    let network = create_test_network(&db, "MTN").await.unwrap();
    let bundle = create_test_bundle(&db, network.id, 100).await.unwrap();

    let networks = NetworkRepository::new(&db);
    let bundles = BundleRepository::new(&db);

    match networks.delete(network.id).await.unwrap_err() {
        RepositoryError::Conflict { code, .. } => assert_eq!(code, "RESOURCE_IN_USE"),
        other => panic!("expected conflict, got {other:?}"),
    }

    place_test_order(&db, bundle.id, None).await.unwrap();
    match bundles.delete(bundle.id).await.unwrap_err() {
        RepositoryError::Conflict { code, .. } => assert_eq!(code, "RESOURCE_IN_USE"),
        other => panic!("expected conflict, got {other:?}"),
    }

    let unused = create_test_bundle(&db, network.id, 150).await.unwrap();
    bundles.delete(unused.id).await.unwrap();
    assert!(bundles.find(unused.id).await.unwrap().is_none());
}

#[tokio::test]
async fn duplicate_network_name_conflicts() {
    let db = setup_test_db().await.unwrap();
    create_test_network(&db, "MTN").await.unwrap();

    let err = NetworkRepository::new(&db).create("MTN").await.unwrap_err();
    match err {
        RepositoryError::Conflict { code, .. } => assert_eq!(code, "DUPLICATE_NETWORK"),
        other => panic!("expected conflict, got {other:?}"),
    }
}

#[tokio::test]
async fn analytics_on_empty_ledgers_are_zero() {
    let db = setup_test_db().await.unwrap();

    let summary = AnalyticsRepository::new(&db).summary(5).await.unwrap();
    assert_eq!(summary.total_vendors, 0);
    assert_eq!(summary.total_sales, 0);
    assert_eq!(summary.pending_withdrawals, 0);
    assert!(summary.top_vendors.is_empty());
}

#[tokio::test]
async fn analytics_ranks_vendors_by_profit() {
    let db = setup_test_db().await.unwrap();
    let small = create_test_vendor(&db, "small@example.com").await.unwrap();
    let big = create_test_vendor(&db, "big@example.com").await.unwrap();
    completed_order_with_profit(&db, small.id, 20).await.unwrap();
    completed_order_with_profit(&db, big.id, 70).await.unwrap();
    WithdrawalRepository::new(&db)
        .request(big.id, 25)
        .await
        .unwrap();

    let analytics = AnalyticsRepository::new(&db);
    let summary = analytics.summary(5).await.unwrap();
    assert_eq!(summary.total_vendors, 2);
    assert_eq!(summary.total_sales, 90);
    assert_eq!(summary.pending_withdrawals, 25);
    assert_eq!(summary.top_vendors.len(), 2);
    assert_eq!(summary.top_vendors[0].vendor_id, big.id);
    assert_eq!(summary.top_vendors[0].total_sales, 70);

    let top_one = analytics.top_vendors(1).await.unwrap();
    assert_eq!(top_one.len(), 1);

    let dashboard = analytics.vendor_dashboard(big.id).await.unwrap();
    assert_eq!(dashboard.total_orders, 1);
    assert_eq!(dashboard.earned_profit, 70);
    assert_eq!(dashboard.withdrawn, 25);
    assert_eq!(dashboard.available_balance, 45);
    assert_eq!(dashboard.pending_withdrawals, 25);
}
