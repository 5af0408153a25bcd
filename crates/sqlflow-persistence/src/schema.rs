//! Esquema Diesel (escrito a mano). Reemplazable con `diesel print-schema`.

diesel::table! {
    sql_workflow (id) {
        id -> BigInt,
        workflow_name -> Text,
        group_id -> BigInt,
        engineer -> Text,
        status -> Text,
        instance_name -> Text,
        db_name -> Text,
        syntax_type -> SmallInt,
        run_date_start -> Nullable<Timestamptz>,
        run_date_end -> Nullable<Timestamptz>,
        finish_time -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    sql_workflow_content (workflow_id) {
        workflow_id -> BigInt,
        sql_content -> Text,
        execute_result -> Nullable<Text>,
    }
}

diesel::table! {
    db_env_relation (id) {
        id -> BigInt,
        dev_instance -> Nullable<Text>,
        dev_database -> Nullable<Text>,
        sit_instance -> Nullable<Text>,
        sit_database -> Nullable<Text>,
        uat_instance -> Nullable<Text>,
        uat_database -> Nullable<Text>,
        pro_instance -> Nullable<Text>,
        pro_database -> Nullable<Text>,
    }
}

diesel::table! {
    workflow_audit (audit_id) {
        audit_id -> BigInt,
        workflow_id -> BigInt,
        workflow_type -> Integer,
    }
}

diesel::table! {
    workflow_log (id) {
        id -> BigInt,
        audit_id -> BigInt,
        operation_type -> Integer,
        operation_type_desc -> Text,
        operation_info -> Text,
        operator -> Text,
        operator_display -> Text,
        operation_time -> Timestamptz,
    }
}

diesel::table! {
    execution_task (task_id) {
        task_id -> Uuid,
        workflow_id -> BigInt,
        instance_name -> Text,
        db_name -> Text,
        state -> Text,
        payload -> Jsonb,
        result -> Nullable<Jsonb>,
        enqueued_at -> Timestamptz,
        stopped_at -> Nullable<Timestamptz>,
    }
}

diesel::joinable!(sql_workflow_content -> sql_workflow (workflow_id));
diesel::joinable!(workflow_log -> workflow_audit (audit_id));
diesel::joinable!(execution_task -> sql_workflow (workflow_id));

diesel::allow_tables_to_appear_in_same_query!(
    sql_workflow,
    sql_workflow_content,
    db_env_relation,
    workflow_audit,
    workflow_log,
    execution_task,
);
