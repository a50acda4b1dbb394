diesel::table! {
    events (id) {
        id -> Integer,
        discord_channel_id -> Text,
        discord_message_id -> Nullable<Text>,
        emoji -> Text,
        date -> Nullable<Text>,
        title -> Text,
        location -> Text,
        price -> Text,
        description -> Text,
        author_id -> Text,
        created_at -> Text,
        updated_at -> Text,
    }
}

diesel::table! {
    event_responses (id) {
        id -> Integer,
        event_id -> Integer,
        user_id -> Text,
        response_type -> Text,
        updated_at -> Text,
    }
}

diesel::table! {
    users (id) {
        id -> Integer,
        discord_user_id -> Text,
        username -> Text,
        created_at -> Text,
        updated_at -> Text,
    }
}

diesel::table! {
    channels (id) {
        id -> Integer,
        discord_channel_id -> Text,
        channel_name -> Text,
        created_at -> Text,
        updated_at -> Text,
    }
}

diesel::table! {
    poker_sessions (id) {
        id -> Integer,
        user_id -> Text,
        in_amount -> Double,
        out_amount -> Double,
        location -> Nullable<Text>,
        stakes_sb -> Nullable<Double>,
        stakes_bb -> Nullable<Double>,
        stakes_text -> Nullable<Text>,
        created_at -> Text,
    }
}

diesel::table! {
    messages (id) {
        id -> Integer,
        discord_message_id -> Text,
        discord_channel_id -> Text,
        discord_user_id -> Text,
        message -> Text,
        created_at -> Text,
    }
}

diesel::table! {
    commands (id) {
        id -> Integer,
        discord_user_id -> Text,
        command_text -> Text,
        created_at -> Text,
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
