//! Binder integration tests
//!
//! Drive complete binds against the in-memory cluster and check the Secret,
//! the mutated workloads and the reported conditions.

mod common;

use common::*;
use serde_json::json;
use service_binding_controller::binder::conditions::ConditionType::{
    BindingReady, CollectionReady, InjectionReady,
};
use service_binding_controller::binder::Binder;
use service_binding_controller::error::BindError;
use service_binding_controller::resolver::memory::Verb;

#[tokio::test]
async fn test_golden_path_binds_database_to_deployment() {
    let cluster = cluster();
    insert(&cluster, database("db1"));
    insert(&cluster, deployment("app"));

    let sbr = binding(
        "my-binding",
        json!({"application": connects_to_database(), "services": [db_service("db1")]}),
    );
    let result = binder(&cluster, sbr).bind().await;

    assert!(result.error.is_none(), "unexpected error: {:?}", result.error);
    assert_eq!(condition(&result, CollectionReady), (true, "DataCollected".to_string()));
    assert_eq!(condition(&result, InjectionReady), (true, "ApplicationInjected".to_string()));
    assert_eq!(condition(&result, BindingReady), (true, "BindingSucceeded".to_string()));
    assert_eq!(result.secret.as_deref(), Some("my-binding"));
    assert_eq!(result.applications.len(), 1);

    let data = secret_data(&cluster, "my-binding");
    assert_eq!(data["DATABASE_DBNAME"], "db1");
    assert_eq!(data["DATABASE_DBCONFIGMAP"], "db1-config");
    assert_eq!(data["DATABASE_DBCREDENTIALS"], "db1-credentials");

    let app = deployment_tree(&cluster, "app");
    assert_eq!(
        app["spec"]["template"]["spec"]["containers"][0]["envFrom"],
        json!([{"secretRef": {"name": "my-binding"}}])
    );

    let secret = cluster.secret(NAMESPACE, "my-binding").unwrap();
    let owner = &secret.metadata.owner_references.unwrap()[0];
    assert_eq!(owner.kind, "ServiceBinding");
    assert_eq!(owner.uid, "my-binding-uid");

    assert!(result.secret_written);
    assert_eq!(updated(&cluster, "databases"), ["db1"]);
    assert_eq!(bound_by(&cluster, "db1").as_deref(), Some("default/my-binding"));
    assert_eq!(result.services_marked.len(), 1);
}

#[tokio::test]
async fn test_mappings_render_from_every_lookup_path() {
    let cluster = cluster();
    insert(&cluster, database("db1"));
    insert(&cluster, deployment("app"));

    let mut db = db_service("db1");
    db["id"] = json!("db");
    let sbr = binding(
        "mapped",
        json!({
            "application": connects_to_database(),
            "services": [db],
            "mappings": [
                {"name": "MY_DB_NAME", "value": "{{ .v1alpha1.postgresql_example_org.Database.db1.status.dbName }}"},
                {"name": "MY_DB_CONFIG", "value": "{{ index .v1alpha1 \"postgresql.example.org\" \"Database\" \"db1\" \"status\" \"dbConfigMap\" }}"},
                {"name": "MY_DB_URL", "value": "postgres://{{ .db.status.dbName }}:5432/{{ .db.spec.dbName }}"}
            ]
        }),
    );
    let result = binder(&cluster, sbr).bind().await;

    assert!(result.is_ready(), "unexpected error: {:?}", result.error);
    let data = secret_data(&cluster, "mapped");
    assert_eq!(data["MY_DB_NAME"], "db1");
    assert_eq!(data["MY_DB_CONFIG"], "db1-config");
    assert_eq!(data["MY_DB_URL"], "postgres://db1:5432/db1");
    // derived variables are still present
    assert_eq!(data["DATABASE_DBNAME"], "db1");
}

#[tokio::test]
async fn test_mapping_overrides_derived_variable() {
    let cluster = cluster();
    insert(&cluster, database("db1"));

    let mut db = db_service("db1");
    db["id"] = json!("db");
    let sbr = binding(
        "override",
        json!({
            "services": [db],
            "mappings": [{"name": "DATABASE_DBNAME", "value": "{{ .db.status.dbCredentials }}"}]
        }),
    );
    binder(&cluster, sbr).bind().await;

    assert_eq!(secret_data(&cluster, "override")["DATABASE_DBNAME"], "db1-credentials");
}

#[tokio::test]
async fn test_sanitized_paths_keep_hyphenated_services_apart() {
    let cluster = cluster();
    insert(&cluster, database("db-1"));
    insert(&cluster, database("db-2"));

    let sbr = binding(
        "hyphens",
        json!({
            "services": [db_service("db-1"), db_service("db-2")],
            "mappings": [
                {"name": "FIRST", "value": "{{ .v1alpha1.postgresql_example_org.Database.db_1.status.dbName }}"},
                {"name": "SECOND", "value": "{{ .v1alpha1.postgresql_example_org.Database.db_2.status.dbName }}"}
            ]
        }),
    );
    let result = binder(&cluster, sbr).bind().await;

    assert!(result.error.is_none(), "unexpected error: {:?}", result.error);
    let data = secret_data(&cluster, "hyphens");
    assert_eq!(data["FIRST"], "db-1");
    assert_eq!(data["SECOND"], "db-2");
}

#[tokio::test]
async fn test_later_service_wins_on_variable_collision() {
    let cluster = cluster();
    insert(&cluster, database("db1"));
    insert(&cluster, database("db2"));
    insert(&cluster, deployment("app"));

    let sbr = binding(
        "multi",
        json!({
            "application": connects_to_database(),
            "services": [db_service("db1"), db_service("db2")]
        }),
    );
    let result = binder(&cluster, sbr).bind().await;

    assert!(result.is_ready());
    assert_eq!(secret_data(&cluster, "multi")["DATABASE_DBNAME"], "db2");

    let mut marked = updated(&cluster, "databases");
    marked.sort();
    assert_eq!(marked, ["db1", "db2"]);
    assert_eq!(bound_by(&cluster, "db2").as_deref(), Some("default/multi"));
}

#[tokio::test]
async fn test_env_var_prefixes_compose() {
    let cluster = cluster();
    insert(&cluster, database("db1"));
    insert(&cluster, database("db2"));

    let mut first = db_service("db1");
    first["envVarPrefix"] = json!("pg");
    let mut second = db_service("db2");
    second["envVarPrefix"] = json!("");
    let sbr = binding(
        "prefixed",
        json!({"envVarPrefix": "app", "services": [first, second]}),
    );
    binder(&cluster, sbr).bind().await;

    let data = secret_data(&cluster, "prefixed");
    assert_eq!(data["APP_PG_DBNAME"], "db1");
    assert_eq!(data["APP_DBNAME"], "db2");
    assert!(!data.contains_key("APP_DATABASE_DBNAME"));
}

#[tokio::test]
async fn test_service_selected_by_labels() {
    let cluster = cluster();
    insert(&cluster, database("db1"));
    insert(&cluster, database("db2"));

    let sbr = binding(
        "by-label",
        json!({
            "services": [{
                "group": DB_GROUP,
                "version": DB_VERSION,
                "kind": "Database",
                "labelSelector": {"matchLabels": {"app": "db2"}}
            }]
        }),
    );
    let result = binder(&cluster, sbr).bind().await;

    assert!(result.error.is_none(), "unexpected error: {:?}", result.error);
    assert_eq!(secret_data(&cluster, "by-label")["DATABASE_DBNAME"], "db2");
}

#[tokio::test]
async fn test_annotated_fields_replace_status_convention() {
    let cluster = cluster();
    let mut db = database("db1");
    db["metadata"]["annotations"] = json!({
        "servicebinding.operators.coreos.com/spec.image": "binding:env:attribute",
        "servicebinding.operators.coreos.com/status.connection": "binding:env:object"
    });
    db["status"]["connection"] = json!({"host": "db1.default.svc", "port": "5432"});
    insert(&cluster, db);

    let sbr = binding("annotated", json!({"services": [db_service("db1")]}));
    let result = binder(&cluster, sbr).bind().await;

    assert!(result.error.is_none(), "unexpected error: {:?}", result.error);
    let data = secret_data(&cluster, "annotated");
    assert_eq!(data["DATABASE_IMAGE"], "docker.io/postgres");
    assert_eq!(data["DATABASE_CONNECTION_HOST"], "db1.default.svc");
    assert_eq!(data["DATABASE_CONNECTION_PORT"], "5432");
    assert!(!data.contains_key("DATABASE_DBNAME"));
}

#[tokio::test]
async fn test_empty_application_still_writes_secret() {
    let cluster = cluster();
    insert(&cluster, database("db1"));

    let sbr = binding("no-app", json!({"services": [db_service("db1")]}));
    let result = binder(&cluster, sbr).bind().await;

    assert!(result.error.is_none());
    assert_eq!(condition(&result, CollectionReady).0, true);
    assert_eq!(condition(&result, InjectionReady), (false, "EmptyApplication".to_string()));
    assert_eq!(condition(&result, BindingReady).0, true);
    assert_eq!(secret_data(&cluster, "no-app")["DATABASE_DBNAME"], "db1");
    assert!(result.applications.is_empty());
}

#[tokio::test]
async fn test_application_not_found() {
    let cluster = cluster();
    insert(&cluster, database("db1"));

    let sbr = binding(
        "missing-app",
        json!({
            "application": {
                "group": "apps",
                "version": "v1",
                "resource": "deployments",
                "labelSelector": {"matchLabels": {"connects-to": "nothing"}}
            },
            "services": [db_service("db1")]
        }),
    );
    let result = binder(&cluster, sbr).bind().await;

    assert_eq!(condition(&result, CollectionReady).0, true);
    assert_eq!(
        condition(&result, InjectionReady),
        (false, "ApplicationNotFound".to_string())
    );
    assert_eq!(condition(&result, BindingReady).0, false);
    assert!(cluster.secret(NAMESPACE, "missing-app").is_some());
}

#[tokio::test]
async fn test_rebind_is_idempotent() {
    let cluster = cluster();
    insert(&cluster, database("db1"));
    insert(&cluster, deployment("app"));

    let sbr = binding(
        "stable",
        json!({"application": connects_to_database(), "services": [db_service("db1")]}),
    );
    let first = binder(&cluster, sbr.clone()).bind().await;
    assert!(first.is_ready());
    let app_before = deployment_tree(&cluster, "app");

    cluster.clear_actions();
    let second = binder(&cluster, sbr).bind().await;

    assert!(second.is_ready());
    assert_eq!(first.data, second.data);
    assert_eq!(first.conditions, second.conditions);
    assert!(cluster.actions_for(Verb::Create, "secrets").is_empty());
    assert!(cluster.actions_for(Verb::Update, "secrets").is_empty());
    assert!(cluster.actions_for(Verb::Update, "deployments").is_empty());
    assert!(cluster.actions_for(Verb::Update, "databases").is_empty());
    assert!(!second.secret_written);
    assert_eq!(deployment_tree(&cluster, "app"), app_before);
}

#[tokio::test]
async fn test_changed_service_updates_existing_secret() {
    let cluster = cluster();
    insert(&cluster, database("db1"));

    let sbr = binding("refresh", json!({"services": [db_service("db1")]}));
    binder(&cluster, sbr.clone()).bind().await;

    let mut db = database("db1");
    db["status"]["dbName"] = json!("renamed");
    insert(&cluster, db);
    cluster.clear_actions();
    binder(&cluster, sbr).bind().await;

    assert_eq!(cluster.actions_for(Verb::Update, "secrets").len(), 1);
    assert_eq!(secret_data(&cluster, "refresh")["DATABASE_DBNAME"], "renamed");
}

#[tokio::test]
async fn test_bind_as_files_mounts_secret() {
    let cluster = cluster();
    insert(&cluster, database("db1"));
    insert(&cluster, deployment("app"));

    let sbr = binding(
        "files",
        json!({
            "application": connects_to_database(),
            "services": [db_service("db1")],
            "bindAsFiles": true
        }),
    );
    let result = binder(&cluster, sbr).bind().await;

    assert!(result.is_ready(), "unexpected error: {:?}", result.error);
    let pod_spec = &deployment_tree(&cluster, "app")["spec"]["template"]["spec"];
    let container = &pod_spec["containers"][0];
    assert_eq!(
        container["volumeMounts"],
        json!([{"name": "files", "mountPath": "/bindings/files"}])
    );
    assert_eq!(
        container["env"],
        json!([{"name": "SERVICE_BINDING_ROOT", "value": "/bindings"}])
    );
    assert!(container.get("envFrom").is_none());
    assert_eq!(
        pod_spec["volumes"],
        json!([{"name": "files", "secret": {"secretName": "files"}}])
    );
}

#[tokio::test]
async fn test_bind_as_files_honours_mount_path() {
    let cluster = cluster();
    insert(&cluster, database("db1"));
    insert(&cluster, deployment("app"));

    let sbr = binding(
        "custom-mount",
        json!({
            "application": connects_to_database(),
            "services": [db_service("db1")],
            "bindAsFiles": true,
            "mountPath": "/var/run/bindings/db"
        }),
    );
    binder(&cluster, sbr).bind().await;

    let container = &deployment_tree(&cluster, "app")["spec"]["template"]["spec"]["containers"][0];
    assert_eq!(container["volumeMounts"][0]["mountPath"], "/var/run/bindings/db");
    assert_eq!(container["env"][0]["value"], "/var/run/bindings");
}

#[tokio::test]
async fn test_secret_path_writes_secret_name_into_custom_resource() {
    let cluster = cluster();
    cluster.register_kind("example.org", "v1", "ConsumerApp", "consumerapps", true);
    insert(&cluster, database("db1"));
    insert(
        &cluster,
        json!({
            "apiVersion": "example.org/v1",
            "kind": "ConsumerApp",
            "metadata": {"name": "consumer", "namespace": NAMESPACE},
            "spec": {"replicas": 1}
        }),
    );

    let sbr = binding(
        "secret-path",
        json!({
            "application": {
                "group": "example.org",
                "version": "v1",
                "resource": "consumerapps",
                "name": "consumer",
                "bindingPath": {"secretPath": "spec.bindingSecret"}
            },
            "services": [db_service("db1")]
        }),
    );
    let result = binder(&cluster, sbr).bind().await;

    assert!(result.is_ready(), "unexpected error: {:?}", result.error);
    let consumer = cluster
        .object("example.org", "consumerapps", Some(NAMESPACE), "consumer")
        .unwrap();
    assert_eq!(consumer.data["spec"]["bindingSecret"], "secret-path");
    assert_eq!(consumer.data["spec"]["replicas"], 1);
}

#[tokio::test]
async fn test_detect_binding_resources_collects_owned_data() {
    let cluster = cluster();
    insert(&cluster, database("db1"));
    let owner = json!([{
        "apiVersion": "postgresql.example.org/v1alpha1",
        "kind": "Database",
        "name": "db1",
        "uid": "db1-uid"
    }]);
    insert(
        &cluster,
        json!({
            "apiVersion": "v1",
            "kind": "ConfigMap",
            "metadata": {"name": "db1-config", "namespace": NAMESPACE, "ownerReferences": owner},
            "data": {"host": "db1.default.svc"}
        }),
    );
    insert(
        &cluster,
        json!({
            "apiVersion": "v1",
            "kind": "Secret",
            "metadata": {"name": "db1-credentials", "namespace": NAMESPACE, "ownerReferences": owner},
            "data": {"password": "c2VjcmV0"}
        }),
    );
    insert(
        &cluster,
        json!({
            "apiVersion": "v1",
            "kind": "ConfigMap",
            "metadata": {"name": "unrelated", "namespace": NAMESPACE},
            "data": {"other": "value"}
        }),
    );

    let sbr = binding(
        "detected",
        json!({"services": [db_service("db1")], "detectBindingResources": true}),
    );
    let result = binder(&cluster, sbr).bind().await;

    assert!(result.error.is_none(), "unexpected error: {:?}", result.error);
    let data = secret_data(&cluster, "detected");
    assert_eq!(data["DATABASE_HOST"], "db1.default.svc");
    assert_eq!(data["DATABASE_PASSWORD"], "secret");
    assert!(!data.contains_key("DATABASE_OTHER"));
}

#[tokio::test]
async fn test_unknown_kind_is_not_retryable() {
    let cluster = cluster();
    let sbr = binding(
        "unknown",
        json!({"services": [{"group": "cache.example.org", "version": "v1", "kind": "Cache", "name": "c1"}]}),
    );
    let result = binder(&cluster, sbr).bind().await;

    assert!(matches!(result.error, Some(BindError::UnknownKind(_))));
    assert!(!result.requeue());
    assert_eq!(condition(&result, CollectionReady), (false, "UnknownKind".to_string()));
    assert_eq!(condition(&result, BindingReady).0, false);
    assert!(cluster.secret(NAMESPACE, "unknown").is_none());
}

#[tokio::test]
async fn test_missing_service_is_retryable() {
    let cluster = cluster();
    let sbr = binding("not-yet", json!({"services": [db_service("db1")]}));
    let result = binder(&cluster, sbr).bind().await;

    assert!(matches!(result.error, Some(BindError::ServiceNotFound(_))));
    assert!(result.requeue());
    assert_eq!(
        condition(&result, CollectionReady),
        (false, "ServiceNotFound".to_string())
    );
}

#[tokio::test]
async fn test_field_type_mismatch_fails_collection() {
    let cluster = cluster();
    let mut db = database("db1");
    db["metadata"]["annotations"] =
        json!({"servicebinding.operators.coreos.com/status.port": "binding:env:attribute"});
    db["status"]["port"] = json!(5432);
    insert(&cluster, db);

    let sbr = binding("mismatch", json!({"services": [db_service("db1")]}));
    let result = binder(&cluster, sbr).bind().await;

    assert!(matches!(result.error, Some(BindError::FieldTypeMismatch { .. })));
    assert!(!result.requeue());
    assert_eq!(
        condition(&result, CollectionReady),
        (false, "FieldTypeMismatch".to_string())
    );
}

#[tokio::test]
async fn test_mapping_failure_names_the_mapping() {
    let cluster = cluster();
    insert(&cluster, database("db1"));

    let sbr = binding(
        "bad-mapping",
        json!({
            "services": [db_service("db1")],
            "mappings": [{"name": "BROKEN", "value": "{{ .v1alpha1.nowhere.status }}"}]
        }),
    );
    let result = binder(&cluster, sbr).bind().await;

    match &result.error {
        Some(BindError::Mapping { name, .. }) => assert_eq!(name, "BROKEN"),
        other => panic!("expected mapping error, got {other:?}"),
    }
    assert_eq!(
        condition(&result, CollectionReady),
        (false, "MappingEvaluationFailed".to_string())
    );
    assert!(cluster.secret(NAMESPACE, "bad-mapping").is_none());
}

#[tokio::test]
async fn test_id_colliding_with_version_key_is_rejected() {
    let cluster = cluster();
    insert(&cluster, database("db1"));

    let mut db = db_service("db1");
    db["id"] = json!("v1alpha1");
    let sbr = binding("collision", json!({"services": [db]}));
    let result = binder(&cluster, sbr).bind().await;

    assert!(matches!(result.error, Some(BindError::LookupPathCollision { .. })));
    assert_eq!(
        condition(&result, CollectionReady),
        (false, "LookupPathCollision".to_string())
    );
}

#[tokio::test]
async fn test_secret_write_conflict_is_retryable() {
    let cluster = cluster();
    insert(&cluster, database("db1"));
    insert(&cluster, deployment("app"));
    cluster.fail_writes("secrets");

    let sbr = binding(
        "conflicted",
        json!({"application": connects_to_database(), "services": [db_service("db1")]}),
    );
    let result = binder(&cluster, sbr).bind().await;

    assert!(matches!(result.error, Some(BindError::SecretWrite { .. })));
    assert!(result.requeue());
    assert_eq!(condition(&result, CollectionReady).0, true);
    assert_eq!(
        condition(&result, InjectionReady),
        (false, "SecretWriteFailed".to_string())
    );
    assert!(result.secret.is_none());
    // the workload is never touched without a Secret
    assert!(deployment_tree(&cluster, "app")["spec"]["template"]["spec"]["containers"][0]
        .get("envFrom")
        .is_none());
}

#[tokio::test]
async fn test_injection_conflict_keeps_secret() {
    let cluster = cluster();
    insert(&cluster, database("db1"));
    insert(&cluster, deployment("app"));
    cluster.fail_writes("deployments");

    let sbr = binding(
        "inject-fail",
        json!({"application": connects_to_database(), "services": [db_service("db1")]}),
    );
    let result = binder(&cluster, sbr).bind().await;

    assert!(matches!(result.error, Some(BindError::Injection { .. })));
    assert!(result.requeue());
    assert_eq!(condition(&result, InjectionReady), (false, "InjectionFailed".to_string()));
    assert_eq!(condition(&result, BindingReady).0, false);
    assert_eq!(secret_data(&cluster, "inject-fail")["DATABASE_DBNAME"], "db1");
}

#[tokio::test]
async fn test_malformed_application_is_not_retryable() {
    let cluster = cluster();
    insert(&cluster, database("db1"));
    let mut app = deployment("app");
    app["spec"]["template"]["spec"]["containers"] = json!("not-a-list");
    insert(&cluster, app);

    let sbr = binding(
        "malformed",
        json!({"application": connects_to_database(), "services": [db_service("db1")]}),
    );
    let result = binder(&cluster, sbr).bind().await;

    assert!(matches!(result.error, Some(BindError::Injection { .. })));
    assert!(!result.requeue());
}

#[tokio::test]
async fn test_invalid_options_are_rejected_up_front() {
    let cluster = cluster();

    let err = Binder::new(options(&cluster)).unwrap_err();
    assert!(matches!(err, BindError::InvalidOptions(_)));

    let sbr = binding(
        "no-target",
        json!({"services": [{"group": DB_GROUP, "version": DB_VERSION, "kind": "Database"}]}),
    );
    let err = Binder::new(options(&cluster).binding(sbr)).unwrap_err();
    assert!(matches!(err, BindError::InvalidOptions(_)));
    assert!(!err.is_retryable());

    let err = Binder::new(options(&cluster).binding(binding("nothing", json!({})))).unwrap_err();
    assert!(matches!(err, BindError::InvalidOptions(_)));
    assert_eq!(err.reason(), "InvalidOptions");

    let sbr = binding(
        "bad-selector",
        json!({
            "services": [{
                "group": DB_GROUP,
                "version": DB_VERSION,
                "kind": "Database",
                "labelSelector": {"matchExpressions": [{"key": "app", "operator": "Near", "values": ["db1"]}]}
            }]
        }),
    );
    let err = Binder::new(options(&cluster).binding(sbr)).unwrap_err();
    assert!(matches!(err, BindError::InvalidOptions(_)));
    assert!(cluster.actions().is_empty());
}

#[tokio::test]
async fn test_application_not_found_without_services_is_ready() {
    let cluster = cluster();

    let sbr = binding(
        "app-only",
        json!({
            "application": {
                "group": "apps",
                "version": "v1",
                "resource": "deployments",
                "labelSelector": {"matchLabels": {"connects-to": "nothing"}}
            }
        }),
    );
    let result = binder(&cluster, sbr).bind().await;

    assert!(result.error.is_none(), "unexpected error: {:?}", result.error);
    assert_eq!(condition(&result, CollectionReady).0, true);
    assert_eq!(
        condition(&result, InjectionReady),
        (false, "ApplicationNotFound".to_string())
    );
    assert_eq!(condition(&result, BindingReady), (true, "BindingSucceeded".to_string()));
    assert!(cluster.secret(NAMESPACE, "app-only").is_some());
}

#[tokio::test]
async fn test_index_mapping_without_target_reads_lookup_root() {
    let cluster = cluster();
    insert(&cluster, database("db1"));
    insert(&cluster, deployment("app"));

    let sbr = binding(
        "indexed",
        json!({
            "application": connects_to_database(),
            "services": [db_service("db1")],
            "mappings": [{
                "name": "MY_DB_NAME",
                "value": "{{ index \"v1alpha1\" \"postgresql.example.org\" \"Database\" \"db1\" \"status\" \"dbName\" }}"
            }]
        }),
    );
    let result = binder(&cluster, sbr).bind().await;

    assert!(result.is_ready(), "unexpected error: {:?}", result.error);
    assert_eq!(secret_data(&cluster, "indexed")["MY_DB_NAME"], "db1");
}

#[tokio::test]
async fn test_mapping_wins_over_derived_key_of_later_service() {
    let cluster = cluster();
    insert(&cluster, database("db1"));
    insert(&cluster, database("db2"));

    let sbr = binding(
        "mapped-first",
        json!({
            "mappings": [{
                "name": "DATABASE_DBNAME",
                "value": "{{ .v1alpha1.postgresql_example_org.Database.db1.status.dbName }}"
            }],
            "services": [db_service("db1"), db_service("db2")]
        }),
    );
    let result = binder(&cluster, sbr).bind().await;

    assert!(result.error.is_none(), "unexpected error: {:?}", result.error);
    let data = secret_data(&cluster, "mapped-first");
    assert_eq!(data["DATABASE_DBNAME"], "db1");
    assert_eq!(data["DATABASE_DBCONFIGMAP"], "db2-config");
}

#[tokio::test]
async fn test_undecodable_owned_secret_fails_collection() {
    let cluster = cluster();
    insert(&cluster, database("db1"));
    insert(
        &cluster,
        json!({
            "apiVersion": "v1",
            "kind": "Secret",
            "metadata": {
                "name": "db1-credentials",
                "namespace": NAMESPACE,
                "ownerReferences": [{
                    "apiVersion": "postgresql.example.org/v1alpha1",
                    "kind": "Database",
                    "name": "db1",
                    "uid": "db1-uid"
                }]
            },
            "data": {"keystore": "//4AAQ==", "broken": "%%%not-base64%%%"}
        }),
    );

    let sbr = binding(
        "undecodable",
        json!({"services": [db_service("db1")], "detectBindingResources": true}),
    );
    let result = binder(&cluster, sbr).bind().await;

    assert!(matches!(result.error, Some(BindError::FieldTypeMismatch { .. })));
    assert!(!result.requeue());
    assert_eq!(
        condition(&result, CollectionReady),
        (false, "FieldTypeMismatch".to_string())
    );
    assert_eq!(condition(&result, BindingReady).0, false);
    let message = result.error.unwrap().to_string();
    assert!(message.contains("db1-credentials"), "{message}");
    assert!(cluster.secret(NAMESPACE, "undecodable").is_none());
}

#[tokio::test]
async fn test_service_mark_conflict_is_retryable() {
    let cluster = cluster();
    insert(&cluster, database("db1"));
    insert(&cluster, deployment("app"));
    cluster.fail_writes("databases");

    let sbr = binding(
        "mark-conflict",
        json!({"application": connects_to_database(), "services": [db_service("db1")]}),
    );
    let result = binder(&cluster, sbr).bind().await;

    assert!(matches!(result.error, Some(BindError::ServiceMark { .. })));
    assert!(result.requeue());
    assert_eq!(condition(&result, CollectionReady).0, true);
    assert_eq!(condition(&result, InjectionReady), (false, "ClientError".to_string()));
    assert_eq!(condition(&result, BindingReady).0, false);
    assert!(cluster.secret(NAMESPACE, "mark-conflict").is_some());
    assert!(bound_by(&cluster, "db1").is_none());
}
