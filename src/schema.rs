table! {
    push_subscriptions (endpoint_key) {
        endpoint_key -> Text,
        endpoint -> Text,
        public_key -> Text,
        auth_secret -> Text,
        user_id -> Uuid,
        registered_at -> Timestamptz,
    }
}

table! {
    notifications (id) {
        id -> Uuid,
        title -> Text,
        body -> Text,
        url -> Text,
        icon -> Nullable<Text>,
        target_user_ids -> Nullable<Array<Uuid>>,
        created_at -> Timestamptz,
    }
}

table! {
    notification_receipts (user_id, notification_id) {
        user_id -> Uuid,
        notification_id -> Uuid,
        is_read -> Bool,
        read_at -> Nullable<Timestamptz>,
        is_clicked -> Bool,
        clicked_at -> Nullable<Timestamptz>,
        is_deleted -> Bool,
    }
}

table! {
    users (user_id) {
        user_id -> Uuid,
        username -> Text,
        password_hash -> Text,
    }
}
