use crate::helpers::{publish_body, spawn_app};
use diesel::prelude::*;
use pushgate::models::NotificationReceipt;
use pushgate::schema::notification_receipts::dsl::notification_receipts;
use uuid::Uuid;

async fn publish_and_get_id(app: &crate::helpers::TestApp, title: &str) -> Uuid {
    let response = app.publish(publish_body(title)).await;
    assert_eq!(200, response.status().as_u16());
    let body: serde_json::Value = response.json().await.unwrap();
    Uuid::parse_str(body["id"].as_str().unwrap()).unwrap()
}

#[tokio::test]
async fn the_feed_requires_authentication() {
    // arrange
    let app = spawn_app().await;

    // act
    let response = app
        .api_client
        .get(&format!("{}/notifications", app.address))
        .send()
        .await
        .expect("Failed to execute request.");

    // assert
    assert_eq!(401, response.status().as_u16());
}

#[tokio::test]
async fn the_feed_lists_recent_notifications_newest_first() {
    // arrange
    let app = spawn_app().await;
    let reader = app.add_user();
    publish_and_get_id(&app, "first").await;
    publish_and_get_id(&app, "second").await;
    publish_and_get_id(&app, "third").await;

    // act
    let feed = app.list_notifications(&reader).await;

    // assert
    let titles: Vec<&str> = feed.iter().map(|n| n["title"].as_str().unwrap()).collect();
    assert_eq!(titles, vec!["third", "second", "first"]);
    assert!(feed.iter().all(|n| n["is_read"] == false));
    assert!(feed.iter().all(|n| n["is_clicked"] == false));
}

#[tokio::test]
async fn the_feed_limit_is_respected() {
    // arrange
    let app = spawn_app().await;
    let reader = app.add_user();
    for title in ["one", "two", "three"] {
        publish_and_get_id(&app, title).await;
    }

    // act
    let response = app
        .api_client
        .get(&format!("{}/notifications?limit=2", app.address))
        .basic_auth(&reader.username, Some(&reader.password))
        .send()
        .await
        .expect("Failed to execute request.");

    // assert
    let feed: Vec<serde_json::Value> = response.json().await.unwrap();
    assert_eq!(feed.len(), 2);
}

#[tokio::test]
async fn marking_read_is_idempotent() {
    // arrange
    let app = spawn_app().await;
    let reader = app.add_user();
    let id = publish_and_get_id(&app, "read me").await;

    // act
    let first = app.mark_read(&reader, &[id]).await;
    assert_eq!(200, first.status().as_u16());
    let receipt_after_first = load_receipt(&app, &reader.user_id, &id);

    let second = app.mark_read(&reader, &[id]).await;
    assert_eq!(200, second.status().as_u16());
    let receipt_after_second = load_receipt(&app, &reader.user_id, &id);

    // assert: the second call changed nothing, timestamp included.
    assert!(receipt_after_first.is_read);
    assert_eq!(receipt_after_first.read_at, receipt_after_second.read_at);

    let feed = app.list_notifications(&reader).await;
    assert_eq!(feed[0]["is_read"], true);
}

#[tokio::test]
async fn marking_many_read_marks_every_id() {
    // arrange
    let app = spawn_app().await;
    let reader = app.add_user();
    let first = publish_and_get_id(&app, "one").await;
    let second = publish_and_get_id(&app, "two").await;
    let third = publish_and_get_id(&app, "three").await;

    // act
    let response = app.mark_read(&reader, &[first, second, third]).await;

    // assert
    assert_eq!(200, response.status().as_u16());
    let feed = app.list_notifications(&reader).await;
    assert!(feed.iter().all(|n| n["is_read"] == true));
}

#[tokio::test]
async fn clicking_is_independent_of_reading() {
    // arrange
    let app = spawn_app().await;
    let reader = app.add_user();
    let id = publish_and_get_id(&app, "tap target").await;

    // act: the user taps the system notification without ever opening the
    // list.
    let response = app.mark_clicked(&reader, &id).await;

    // assert
    assert_eq!(200, response.status().as_u16());
    let feed = app.list_notifications(&reader).await;
    assert_eq!(feed[0]["is_clicked"], true);
    assert_eq!(feed[0]["is_read"], false);
}

#[tokio::test]
async fn flags_never_go_back_to_false() {
    // arrange
    let app = spawn_app().await;
    let reader = app.add_user();
    let id = publish_and_get_id(&app, "sticky").await;
    app.mark_read(&reader, &[id]).await;
    app.mark_clicked(&reader, &id).await;

    // act: replay every mark in every order.
    app.mark_clicked(&reader, &id).await;
    app.mark_read(&reader, &[id]).await;

    // assert
    let receipt = load_receipt(&app, &reader.user_id, &id);
    assert!(receipt.is_read);
    assert!(receipt.is_clicked);

    let feed = app.list_notifications(&reader).await;
    assert_eq!(feed[0]["is_read"], true);
    assert_eq!(feed[0]["is_clicked"], true);
}

#[tokio::test]
async fn a_deleted_notification_disappears_from_that_users_feed_only() {
    // arrange
    let app = spawn_app().await;
    let user_u = app.add_user();
    let user_v = app.add_user();
    publish_and_get_id(&app, "n1").await;
    let n2 = publish_and_get_id(&app, "n2").await;
    publish_and_get_id(&app, "n3").await;

    // act
    let response = app.delete_notification(&user_u, &n2).await;

    // assert
    assert_eq!(200, response.status().as_u16());

    let feed_u: Vec<String> = app
        .list_notifications(&user_u)
        .await
        .iter()
        .map(|n| n["title"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(feed_u, vec!["n3", "n1"]);

    let feed_v = app.list_notifications(&user_v).await;
    assert_eq!(feed_v.len(), 3);
}

#[tokio::test]
async fn deletion_is_permanent() {
    // arrange
    let app = spawn_app().await;
    let reader = app.add_user();
    let id = publish_and_get_id(&app, "gone for good").await;
    app.delete_notification(&reader, &id).await;

    // act: reading a deleted notification does not resurrect it.
    app.mark_read(&reader, &[id]).await;

    // assert
    let feed = app.list_notifications(&reader).await;
    assert!(feed.is_empty());
}

#[tokio::test]
async fn deleting_twice_is_a_no_op() {
    // arrange
    let app = spawn_app().await;
    let reader = app.add_user();
    let id = publish_and_get_id(&app, "double delete").await;

    // act
    let first = app.delete_notification(&reader, &id).await;
    let second = app.delete_notification(&reader, &id).await;

    // assert
    assert_eq!(200, first.status().as_u16());
    assert_eq!(200, second.status().as_u16());
    assert!(app.list_notifications(&reader).await.is_empty());
}

#[tokio::test]
async fn opening_a_notification_records_the_click_and_redirects() {
    // arrange
    let app = spawn_app().await;
    let reader = app.add_user();
    let id = publish_and_get_id(&app, "open me").await;

    // act
    let response = app.open_notification(&reader, &id.to_string()).await;

    // assert
    assert_eq!(303, response.status().as_u16());
    assert_eq!(response.headers()["Location"], "/news/latest");

    let feed = app.list_notifications(&reader).await;
    assert_eq!(feed[0]["is_clicked"], true);
}

#[tokio::test]
async fn opening_an_unknown_notification_is_a_404() {
    // arrange
    let app = spawn_app().await;
    let reader = app.add_user();

    // act
    let response = app
        .open_notification(&reader, &Uuid::new_v4().to_string())
        .await;

    // assert
    assert_eq!(404, response.status().as_u16());
}

#[tokio::test]
async fn a_malformed_notification_id_is_a_400() {
    // arrange
    let app = spawn_app().await;
    let reader = app.add_user();

    // act
    let response = app.open_notification(&reader, "not-a-uuid").await;

    // assert
    assert_eq!(400, response.status().as_u16());
}

fn load_receipt(
    app: &crate::helpers::TestApp,
    user: &Uuid,
    notification: &Uuid,
) -> NotificationReceipt {
    notification_receipts
        .find((user, notification))
        .first::<NotificationReceipt>(&app.db_connection)
        .expect("No receipt was stored.")
}
