diesel::table! {
    users (user_id) {
        user_id -> Integer,
        name -> Text,
        created_at -> BigInt,
        updated_at -> BigInt,
    }
}

diesel::table! {
    plans (plan_id) {
        plan_id -> Integer,
        created_at -> BigInt,
        updated_at -> BigInt,
    }
}

diesel::table! {
    procedures (procedure_id) {
        procedure_id -> Integer,
        procedure_title -> Text,
        created_at -> BigInt,
        updated_at -> BigInt,
    }
}

diesel::table! {
    plan_procedure_users (plan_id, procedure_id, user_id) {
        plan_id -> Integer,
        procedure_id -> Integer,
        user_id -> Integer,
        created_at -> BigInt,
        updated_at -> BigInt,
    }
}

diesel::joinable!(plan_procedure_users -> users (user_id));

diesel::allow_tables_to_appear_in_same_query!(plan_procedure_users, plans, procedures, users);
