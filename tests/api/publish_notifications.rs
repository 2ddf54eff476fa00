use crate::helpers::{publish_body, spawn_app, spawn_app_without_push};
use diesel::prelude::*;
use pushgate::models::{Notification, PushSubscription};
use pushgate::schema::notifications::dsl::notifications;
use pushgate::schema::push_subscriptions::dsl::push_subscriptions;
use uuid::Uuid;

#[tokio::test]
async fn publishing_requires_authentication() {
    // arrange
    let app = spawn_app().await;

    // act
    let response = app
        .api_client
        .post(&format!("{}/notifications", app.address))
        .json(&publish_body("Scheduled maintenance"))
        .send()
        .await
        .expect("Failed to execute request.");

    // assert
    assert_eq!(401, response.status().as_u16());
}

#[tokio::test]
async fn publishing_returns_a_400_for_an_invalid_title() {
    // arrange
    let app = spawn_app().await;
    let test_cases = vec![
        (serde_json::json!({ "title": "", "body": "b", "url": "/x" }), "an empty title"),
        (serde_json::json!({ "title": "   ", "body": "b", "url": "/x" }), "a whitespace title"),
        (serde_json::json!({ "title": "<b>hi</b>", "body": "b", "url": "/x" }), "a markup title"),
    ];

    for (body, description) in test_cases {
        // act
        let response = app.publish(body).await;

        // assert
        assert_eq!(
            400,
            response.status().as_u16(),
            "The API did not fail with 400 Bad Request when the payload had {}.",
            description
        );
    }
}

#[tokio::test]
async fn a_broadcast_reaches_every_subscription() {
    // arrange
    let app = spawn_app().await;
    let other_user = app.add_user();
    app.register_subscription(&app.test_user, "https://push.example.com/sub/one")
        .await;
    app.register_subscription(&other_user, "https://push.example.com/sub/two")
        .await;

    // act
    let response = app.publish(publish_body("Scheduled maintenance")).await;

    // assert
    assert_eq!(200, response.status().as_u16());
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["delivery"]["status"], "dispatched");
    assert_eq!(body["delivery"]["attempted"], 2);
    assert_eq!(body["delivery"]["delivered"], 2);
    assert_eq!(body["delivery"]["failed"], 0);

    let deliveries = app.push_transport.deliveries.lock().unwrap();
    assert_eq!(deliveries.len(), 2);
}

#[tokio::test]
async fn the_push_payload_carries_the_public_fields_and_nothing_else() {
    // arrange
    let app = spawn_app().await;
    app.register_subscription(&app.test_user, "https://push.example.com/sub/one")
        .await;

    // act
    let response = app
        .publish(serde_json::json!({
            "title": "Lab results ready",
            "body": "Your results from Tuesday are available.",
            "url": "/results/42",
            "icon": "/static/flask.png",
        }))
        .await;

    // assert
    assert_eq!(200, response.status().as_u16());
    let published: serde_json::Value = response.json().await.unwrap();

    let deliveries = app.push_transport.deliveries.lock().unwrap();
    assert_eq!(deliveries.len(), 1);
    assert_eq!(deliveries[0].endpoint, "https://push.example.com/sub/one");
    let payload = &deliveries[0].payload;
    assert_eq!(payload["title"], "Lab results ready");
    assert_eq!(payload["body"], "Your results from Tuesday are available.");
    assert_eq!(payload["url"], "/results/42");
    assert_eq!(payload["icon"], "/static/flask.png");
    assert_eq!(payload["notification_id"], published["id"]);

    let mut keys: Vec<&str> = payload.as_object().unwrap().keys().map(String::as_str).collect();
    keys.sort_unstable();
    assert_eq!(keys, vec!["body", "icon", "notification_id", "title", "url"]);
}

#[tokio::test]
async fn a_targeted_notification_only_reaches_the_targeted_users_subscriptions() {
    // arrange
    let app = spawn_app().await;
    let user_b = app.add_user();
    let user_c = app.add_user();
    app.register_subscription(&app.test_user, "https://push.example.com/sub/a")
        .await;
    app.register_subscription(&user_b, "https://push.example.com/sub/b")
        .await;
    app.register_subscription(&user_c, "https://push.example.com/sub/c")
        .await;

    // act
    let response = app
        .publish(serde_json::json!({
            "title": "Targeted",
            "body": "Only for two of you.",
            "url": "/x",
            "target_user_ids": [app.test_user.user_id, user_b.user_id],
        }))
        .await;

    // assert
    assert_eq!(200, response.status().as_u16());
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["delivery"]["attempted"], 2);

    let mut attempts = app.push_transport.attempts.lock().unwrap().clone();
    attempts.sort_unstable();
    assert_eq!(
        attempts,
        vec![
            "https://push.example.com/sub/a".to_string(),
            "https://push.example.com/sub/b".to_string(),
        ]
    );
}

#[tokio::test]
async fn one_dead_one_hanging_endpoint_do_not_fail_the_batch() {
    // arrange
    let app = spawn_app().await;
    let user_b = app.add_user();
    let user_c = app.add_user();
    app.register_subscription(&app.test_user, "https://push.example.com/sub/ok")
        .await;
    app.register_subscription(&user_b, "https://push.example.com/gone/dead")
        .await;
    app.register_subscription(&user_c, "https://push.example.com/slow/hang")
        .await;

    // act
    let response = app.publish(publish_body("Partial failure")).await;

    // assert
    assert_eq!(200, response.status().as_u16());
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["delivery"]["status"], "dispatched");
    assert_eq!(body["delivery"]["attempted"], 3);
    assert_eq!(body["delivery"]["delivered"], 1);
    assert_eq!(body["delivery"]["pruned"], 1);
    assert_eq!(body["delivery"]["failed"], 1);

    // The dead endpoint was pruned; the healthy and the slow one remain.
    let mut remaining: Vec<String> = push_subscriptions
        .load::<PushSubscription>(&app.db_connection)
        .expect("Failed to fetch saved subscriptions.")
        .into_iter()
        .map(|s| s.endpoint)
        .collect();
    remaining.sort_unstable();
    assert_eq!(
        remaining,
        vec![
            "https://push.example.com/slow/hang".to_string(),
            "https://push.example.com/sub/ok".to_string(),
        ]
    );
}

#[tokio::test]
async fn a_rejected_delivery_leaves_the_subscription_in_place() {
    // arrange
    let app = spawn_app().await;
    app.register_subscription(&app.test_user, "https://push.example.com/refuse/500")
        .await;

    // act
    let response = app.publish(publish_body("Transient trouble")).await;

    // assert
    assert_eq!(200, response.status().as_u16());
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["delivery"]["delivered"], 0);
    assert_eq!(body["delivery"]["failed"], 1);
    assert_eq!(body["delivery"]["pruned"], 0);

    let remaining = push_subscriptions
        .load::<PushSubscription>(&app.db_connection)
        .expect("Failed to fetch saved subscriptions.");
    assert_eq!(remaining.len(), 1);
}

#[tokio::test]
async fn without_push_configured_the_notification_is_recorded_but_not_dispatched() {
    // arrange
    let app = spawn_app_without_push().await;
    app.register_subscription(&app.test_user, "https://push.example.com/sub/one")
        .await;

    // act
    let response = app.publish(publish_body("Recorded only")).await;

    // assert
    assert_eq!(200, response.status().as_u16());
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["delivery"]["status"], "not_configured");
    assert_eq!(body["delivery"]["attempted"], 0);

    assert!(app.push_transport.attempts.lock().unwrap().is_empty());

    let saved = notifications
        .load::<Notification>(&app.db_connection)
        .expect("Failed to fetch saved notifications.");
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].title, "Recorded only");

    // The feed works without any delivery having happened.
    let feed = app.list_notifications(&app.test_user).await;
    assert_eq!(feed.len(), 1);
    assert_eq!(feed[0]["title"], "Recorded only");
}

#[tokio::test]
async fn the_concrete_targeting_scenario_end_to_end() {
    // arrange: u1 and u3 have subscriptions; the notification targets u1
    // (and u2, who has none).
    let app = spawn_app().await;
    let u1 = app.add_user();
    let u2 = app.add_user();
    let u3 = app.add_user();
    app.register_subscription(&u1, "https://push.example.com/sub/u1")
        .await;
    app.register_subscription(&u3, "https://push.example.com/sub/u3")
        .await;

    // act
    let response = app
        .publish(serde_json::json!({
            "title": "T",
            "body": "B",
            "url": "/t",
            "target_user_ids": [u1.user_id, u2.user_id],
        }))
        .await;

    // assert: only u1's subscription was attempted.
    assert_eq!(200, response.status().as_u16());
    let published: serde_json::Value = response.json().await.unwrap();
    let id = Uuid::parse_str(published["id"].as_str().unwrap()).unwrap();
    {
        let attempts = app.push_transport.attempts.lock().unwrap();
        assert_eq!(*attempts, vec!["https://push.example.com/sub/u1".to_string()]);
    }

    // u1 reads it; u1's feed shows it read.
    app.mark_read(&u1, &[id]).await;
    let feed = app.list_notifications(&u1).await;
    assert_eq!(feed.len(), 1);
    assert_eq!(feed[0]["is_read"], true);

    // Listing is broadcast-style: u3 still sees the notification, unread —
    // targeting restricted delivery, not visibility.
    let feed = app.list_notifications(&u3).await;
    assert_eq!(feed.len(), 1);
    assert_eq!(feed[0]["is_read"], false);
}
