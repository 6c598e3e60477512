//! Expiration sweeper integration tests
//!
//! Expiry is simulated by rewriting hold deadlines into the past rather
//! than waiting out the hold window.

mod helpers;

use assert_matches::assert_matches;
use helpers::database_helper::TestDatabase;
use helpers::test_data;
use serial_test::serial;
use TicketDesk::models::order::OrderStatus;
use TicketDesk::models::ticket::TicketStatus;
use TicketDesk::models::user::{Actor, UserRole};
use TicketDesk::TicketDeskError;

#[tokio::test]
#[serial]
async fn sweep_releases_expired_holds_and_cancels_orders() {
    let db = TestDatabase::new().await.expect("db setup failed");
    db.cleanup().await.unwrap();
    let services = db.services();

    let organizer = test_data::create_user(&services.database, "org@example.com", UserRole::Organizer).await;
    let buyer = test_data::create_user(&services.database, "buyer@example.com", UserRole::User).await;
    let (_, tickets) = test_data::create_published_event(&services.database, organizer.id, 1000, 2).await;

    let order = services
        .orders
        .create_order(
            test_data::actor_for(&buyer),
            test_data::order_request(vec![tickets[0].id, tickets[1].id]),
        )
        .await
        .unwrap();

    db.expire_holds(order.order.id).await.unwrap();

    let outcome = services.sweeper.run_once().await.expect("sweep failed");
    assert_eq!(outcome.released_tickets, 2);
    assert_eq!(outcome.cancelled_orders, 1);

    for ticket in &tickets {
        let ticket = services
            .database
            .tickets
            .find_by_id(ticket.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(ticket.status, TicketStatus::Available);
        assert!(ticket.reserved_until.is_none());
        assert!(ticket.order_id.is_none());
    }

    let order = services
        .database
        .orders
        .find_by_id(order.order.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(order.status, OrderStatus::Cancelled);
}

#[tokio::test]
#[serial]
async fn sweep_leaves_active_holds_alone() {
    let db = TestDatabase::new().await.expect("db setup failed");
    db.cleanup().await.unwrap();
    let services = db.services();

    let organizer = test_data::create_user(&services.database, "org@example.com", UserRole::Organizer).await;
    let buyer = test_data::create_user(&services.database, "buyer@example.com", UserRole::User).await;
    let (_, tickets) = test_data::create_published_event(&services.database, organizer.id, 1000, 1).await;

    let order = services
        .orders
        .create_order(
            test_data::actor_for(&buyer),
            test_data::order_request(vec![tickets[0].id]),
        )
        .await
        .unwrap();

    let outcome = services.sweeper.run_once().await.unwrap();
    assert_eq!(outcome.released_tickets, 0);
    assert_eq!(outcome.cancelled_orders, 0);

    let ticket = services
        .database
        .tickets
        .find_by_id(tickets[0].id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(ticket.status, TicketStatus::Reserved);
    assert_eq!(ticket.order_id, Some(order.order.id));
}

#[tokio::test]
#[serial]
async fn settled_orders_are_not_swept() {
    let db = TestDatabase::new().await.expect("db setup failed");
    db.cleanup().await.unwrap();
    let services = db.services();

    let organizer = test_data::create_user(&services.database, "org@example.com", UserRole::Organizer).await;
    let buyer = test_data::create_user(&services.database, "buyer@example.com", UserRole::User).await;
    let (_, tickets) = test_data::create_published_event(&services.database, organizer.id, 1000, 1).await;

    let order = services
        .orders
        .create_order(
            test_data::actor_for(&buyer),
            test_data::order_request(vec![tickets[0].id]),
        )
        .await
        .unwrap();
    services
        .orders
        .pay_order(order.order.id, test_data::actor_for(&buyer), "card", None)
        .await
        .unwrap();

    // Settlement cleared the deadline, so there is nothing to sweep
    let outcome = services.sweeper.run_once().await.unwrap();
    assert_eq!(outcome.released_tickets, 0);

    let ticket = services
        .database
        .tickets
        .find_by_id(tickets[0].id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(ticket.status, TicketStatus::Sold);
}

#[tokio::test]
#[serial]
async fn payment_after_sweep_is_rejected() {
    let db = TestDatabase::new().await.expect("db setup failed");
    db.cleanup().await.unwrap();
    let services = db.services();

    let organizer = test_data::create_user(&services.database, "org@example.com", UserRole::Organizer).await;
    let buyer = test_data::create_user(&services.database, "buyer@example.com", UserRole::User).await;
    let (_, tickets) = test_data::create_published_event(&services.database, organizer.id, 1000, 1).await;

    let order = services
        .orders
        .create_order(
            test_data::actor_for(&buyer),
            test_data::order_request(vec![tickets[0].id]),
        )
        .await
        .unwrap();

    db.expire_holds(order.order.id).await.unwrap();
    services.sweeper.run_once().await.unwrap();

    let err = services
        .orders
        .pay_order(order.order.id, test_data::actor_for(&buyer), "card", None)
        .await
        .unwrap_err();
    assert_matches!(
        err,
        TicketDeskError::OrderNotPending { status: OrderStatus::Cancelled, .. }
    );

    // The released ticket is immediately purchasable again
    let retry = services
        .orders
        .create_order(
            test_data::actor_for(&buyer),
            test_data::order_request(vec![tickets[0].id]),
        )
        .await;
    assert!(retry.is_ok());
}

#[tokio::test]
#[serial]
async fn manual_sweep_requires_admin() {
    let db = TestDatabase::new().await.expect("db setup failed");
    db.cleanup().await.unwrap();
    let services = db.services();

    let err = services
        .sweeper
        .release_expired_reservations(Actor::new(1, UserRole::User))
        .await
        .unwrap_err();
    assert_matches!(err, TicketDeskError::Forbidden(_));

    let outcome = services
        .sweeper
        .release_expired_reservations(Actor::new(1, UserRole::Admin))
        .await
        .unwrap();
    assert_eq!(outcome.released_tickets, 0);
}
