// Queue table owned by this service (see migrations/).

diesel::table! {
    order_jobs (id) {
        id -> Uuid,
        payload -> Jsonb,
        #[max_length = 20]
        status -> Varchar,
        attempts -> Int4,
        available_at -> Timestamptz,
        claimed_at -> Nullable<Timestamptz>,
        last_error -> Nullable<Text>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

// Read-only tables owned by the main application; declared here only for
// lookups, never migrated by this service.

diesel::table! {
    users (id) {
        id -> Int8,
        #[max_length = 255]
        api_key -> Varchar,
    }
}

diesel::table! {
    products (id) {
        id -> Int8,
        user_id -> Int8,
        #[max_length = 255]
        name -> Varchar,
        retail_cost -> Int8,
        #[max_length = 50]
        unit -> Nullable<Varchar>,
    }
}

diesel::table! {
    rooms (id) {
        id -> Int8,
        user_id -> Int8,
        #[max_length = 255]
        name -> Varchar,
    }
}
