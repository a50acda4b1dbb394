diesel::table! {
    events (id) {
        id -> BigInt,
        discord_channel_id -> Text,
        discord_message_id -> Nullable<Text>,
        emoji -> Text,
        date -> Nullable<Timestamptz>,
        title -> Text,
        location -> Text,
        price -> Text,
        description -> Text,
        author_id -> Text,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    event_responses (id) {
        id -> BigInt,
        event_id -> BigInt,
        user_id -> Text,
        response_type -> Text,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    users (id) {
        id -> BigInt,
        discord_user_id -> Text,
        username -> Text,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    channels (id) {
        id -> BigInt,
        discord_channel_id -> Text,
        channel_name -> Text,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    poker_sessions (id) {
        id -> BigInt,
        user_id -> Text,
        in_amount -> Double,
        out_amount -> Double,
        location -> Nullable<Text>,
        stakes_sb -> Nullable<Double>,
        stakes_bb -> Nullable<Double>,
        stakes_text -> Nullable<Text>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    messages (id) {
        id -> BigInt,
        discord_message_id -> Text,
        discord_channel_id -> Text,
        discord_user_id -> Text,
        message -> Text,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    commands (id) {
        id -> BigInt,
        discord_user_id -> Text,
        command_text -> Text,
        created_at -> Timestamptz,
    }
}

diesel::allow_tables_to_appear_in_same_query!(
    events,
    event_responses,
    users,
    channels,
    poker_sessions,
    messages,
    commands,
);
