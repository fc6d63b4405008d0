mod common;

use std::sync::Arc;
use std::time::Duration;

use common::*;
use packsync_lib::core::error::ErrorKind;
use packsync_lib::core::integrity::{hash_str, HashAlgorithm, IntegrityInfo};
use packsync_lib::core::sync::{ModSyncEngine, SyncPhase};
use packsync_lib::core::sync_info::{Environment, ModDescriptor, SupportLevel, SyncInfo};
use tokio_util::sync::CancellationToken;

fn sync_info(mods: Vec<ModDescriptor>) -> Arc<SyncInfo> {
    Arc::new(SyncInfo {
        mods,
        ..SyncInfo::default()
    })
}

#[tokio::test]
async fn reconciles_desired_against_local() {
    let (_dir, instance) = instance();
    write_mod(&instance, "b.jar", "bravo");
    write_mod(&instance, "c.jar", "charlie");

    let downloader = MockDownloader::new()
        .serve(mod_url("a.jar"), Served::Body("alpha".into()))
        .into_arc();
    let info = sync_info(vec![
        mod_with_content("a.jar", "alpha"),
        mod_with_content("b.jar", "bravo"),
    ]);

    let engine = ModSyncEngine::new(info, instance.clone(), downloader.clone());
    let report = engine.run().await.unwrap();

    assert_eq!(report.added, vec!["a.jar"]);
    assert_eq!(report.kept, vec!["b.jar"]);
    assert_eq!(report.removed, vec!["c.jar"]);
    assert!(report.is_clean());
    assert_eq!(downloader.requested(), vec![mod_url("a.jar")]);

    assert_eq!(read_mod(&instance, "a.jar").as_deref(), Some("alpha"));
    assert_eq!(read_mod(&instance, "b.jar").as_deref(), Some("bravo"));
    assert_eq!(read_mod(&instance, "c.jar"), None);
    assert_eq!(engine.phase(), SyncPhase::Done);
}

#[tokio::test]
async fn second_run_changes_nothing() {
    let (_dir, instance) = instance();
    let downloader = MockDownloader::new()
        .serve(mod_url("a.jar"), Served::Body("alpha".into()))
        .into_arc();
    let info = sync_info(vec![mod_with_content("a.jar", "alpha")]);

    ModSyncEngine::new(info.clone(), instance.clone(), downloader.clone())
        .run()
        .await
        .unwrap();
    let report = ModSyncEngine::new(info, instance.clone(), downloader.clone())
        .run()
        .await
        .unwrap();

    assert!(report.added.is_empty());
    assert_eq!(report.kept, vec!["a.jar"]);
    assert_eq!(downloader.requested().len(), 1);
}

#[tokio::test]
async fn one_failure_does_not_abort_the_rest() {
    let (_dir, instance) = instance();
    let downloader = MockDownloader::new()
        .serve(mod_url("a.jar"), Served::Status(503))
        .serve(mod_url("b.jar"), Served::Body("bravo".into()))
        .into_arc();
    let info = sync_info(vec![
        mod_with_content("a.jar", "alpha"),
        mod_with_content("b.jar", "bravo"),
    ]);

    let report = ModSyncEngine::new(info, instance.clone(), downloader)
        .with_concurrency(1)
        .run()
        .await
        .unwrap();

    assert_eq!(report.added, vec!["b.jar"]);
    let failure = report.failure_for("a.jar").unwrap();
    assert_eq!(failure.kind, ErrorKind::Io);
    assert_eq!(failure.target, mod_url("a.jar"));
    assert!(!report.is_clean());
    assert_eq!(read_mod(&instance, "a.jar"), None);
}

#[tokio::test]
async fn tampered_download_is_discarded() {
    let (_dir, instance) = instance();
    let downloader = MockDownloader::new()
        .serve(mod_url("a.jar"), Served::Body("tampered".into()))
        .into_arc();
    let info = sync_info(vec![mod_with_content("a.jar", "alpha")]);

    let report = ModSyncEngine::new(info, instance.clone(), downloader)
        .run()
        .await
        .unwrap();

    assert_eq!(report.failure_for("a.jar").unwrap().kind, ErrorKind::Integrity);
    assert_eq!(read_mod(&instance, "a.jar"), None);
    let staged = std::fs::read_dir(instance.downloads_dir())
        .map(|entries| entries.count())
        .unwrap_or(0);
    assert_eq!(staged, 0);
}

#[tokio::test]
async fn corrupt_local_copy_is_downloaded_again() {
    let (_dir, instance) = instance();
    write_mod(&instance, "a.jar", "truncated");
    let downloader = MockDownloader::new()
        .serve(mod_url("a.jar"), Served::Body("alpha".into()))
        .into_arc();
    let info = sync_info(vec![mod_with_content("a.jar", "alpha")]);

    let report = ModSyncEngine::new(info, instance.clone(), downloader)
        .run()
        .await
        .unwrap();

    assert_eq!(report.added, vec!["a.jar"]);
    assert_eq!(read_mod(&instance, "a.jar").as_deref(), Some("alpha"));
}

#[tokio::test]
async fn disabled_integrity_matches_by_name() {
    let (_dir, instance) = instance();
    write_mod(&instance, "a.jar", "whatever is there");
    let downloader = MockDownloader::new().into_arc();
    let info = Arc::new(SyncInfo {
        verify_asset_integrity: false,
        mods: vec![mod_with_content("a.jar", "alpha")],
        ..SyncInfo::default()
    });

    let report = ModSyncEngine::new(info, instance.clone(), downloader.clone())
        .run()
        .await
        .unwrap();

    assert_eq!(report.kept, vec!["a.jar"]);
    assert!(downloader.requested().is_empty());
}

#[tokio::test]
async fn mod_override_forces_verification() {
    let (_dir, instance) = instance();
    write_mod(&instance, "a.jar", "stale");
    let downloader = MockDownloader::new()
        .serve(mod_url("a.jar"), Served::Body("alpha".into()))
        .into_arc();
    let mut descriptor = mod_with_content("a.jar", "alpha");
    descriptor.override_verify_integrity = Some(true);
    let info = Arc::new(SyncInfo {
        verify_asset_integrity: false,
        verify_mod_integrity: Some(false),
        mods: vec![descriptor],
        ..SyncInfo::default()
    });

    let report = ModSyncEngine::new(info, instance.clone(), downloader)
        .run()
        .await
        .unwrap();

    assert_eq!(report.added, vec!["a.jar"]);
    assert_eq!(read_mod(&instance, "a.jar").as_deref(), Some("alpha"));
}

#[tokio::test]
async fn verifies_every_digest_without_preferred_strength() {
    let (_dir, instance) = instance();
    let downloader = MockDownloader::new()
        .serve(mod_url("a.jar"), Served::Body("alpha".into()))
        .into_arc();
    let mut descriptor = ModDescriptor::new(mod_url("a.jar"));
    descriptor.file_integrity_info = IntegrityInfo::default()
        .with(HashAlgorithm::Sha256, hash_str("alpha", HashAlgorithm::Sha256))
        .with(HashAlgorithm::Md5, "00000000000000000000000000000000");
    let info = Arc::new(SyncInfo {
        preferred_verification_strength: None,
        mods: vec![descriptor],
        ..SyncInfo::default()
    });

    let report = ModSyncEngine::new(info, instance.clone(), downloader)
        .run()
        .await
        .unwrap();

    assert_eq!(report.failure_for("a.jar").unwrap().kind, ErrorKind::Integrity);
    assert_eq!(read_mod(&instance, "a.jar"), None);
}

#[tokio::test]
async fn mods_without_digests_are_installed() {
    let (_dir, instance) = instance();
    let downloader = MockDownloader::new()
        .serve(mod_url("a.jar"), Served::Body("alpha".into()))
        .into_arc();
    let info = sync_info(vec![ModDescriptor::new(mod_url("a.jar"))]);

    let report = ModSyncEngine::new(info, instance.clone(), downloader)
        .run()
        .await
        .unwrap();

    assert_eq!(report.added, vec!["a.jar"]);
}

#[tokio::test]
async fn protected_files_survive() {
    let (_dir, instance) = instance();
    write_mod(&instance, "my-own-mod.jar", "mine");
    write_mod(&instance, "old.jar", "old");
    let downloader = MockDownloader::new().into_arc();

    let report = ModSyncEngine::new(sync_info(vec![]), instance.clone(), downloader)
        .with_protected_files(["my-own-mod.jar".to_string()])
        .run()
        .await
        .unwrap();

    assert_eq!(report.removed, vec!["old.jar"]);
    assert!(read_mod(&instance, "my-own-mod.jar").is_some());
}

#[tokio::test]
async fn only_jar_files_are_managed() {
    let (_dir, instance) = instance();
    write_mod(&instance, "notes.txt", "keep me");
    std::fs::create_dir_all(instance.mods_dir().join(".index")).unwrap();
    let downloader = MockDownloader::new().into_arc();

    let report = ModSyncEngine::new(sync_info(vec![]), instance.clone(), downloader)
        .run()
        .await
        .unwrap();

    assert!(report.removed.is_empty());
    assert!(read_mod(&instance, "notes.txt").is_some());
    assert!(instance.mods_dir().join(".index").is_dir());
}

#[tokio::test]
async fn server_skips_client_only_mods() {
    let (_dir, instance) = instance();
    let downloader = MockDownloader::new()
        .serve(mod_url("lithium.jar"), Served::Body("lithium".into()))
        .into_arc();
    let mut shader = mod_with_content("iris.jar", "iris");
    shader.name = Some("Iris".into());
    shader.server_support = SupportLevel::Unsupported;
    let mut minimap = mod_with_content("minimap.jar", "minimap");
    minimap.server_support = SupportLevel::Optional;
    minimap.sync_optional = Some(false);
    let info = sync_info(vec![
        shader,
        minimap,
        mod_with_content("lithium.jar", "lithium"),
    ]);

    let report = ModSyncEngine::new(info, instance.clone(), downloader.clone())
        .with_environment(Environment::Server)
        .run()
        .await
        .unwrap();

    assert_eq!(report.added, vec!["lithium.jar"]);
    assert_eq!(sorted(report.skipped.clone()), vec!["Iris", "minimap.jar"]);
    assert!(report.failed.is_empty());
    assert_eq!(downloader.requested(), vec![mod_url("lithium.jar")]);
}

#[tokio::test]
async fn invalid_url_is_reported_and_others_continue() {
    let (_dir, instance) = instance();
    let downloader = MockDownloader::new()
        .serve(mod_url("a.jar"), Served::Body("alpha".into()))
        .into_arc();
    let info = sync_info(vec![
        ModDescriptor::new("https://cdn.example.com/"),
        mod_with_content("a.jar", "alpha"),
    ]);

    let report = ModSyncEngine::new(info, instance.clone(), downloader)
        .run()
        .await
        .unwrap();

    assert_eq!(report.added, vec!["a.jar"]);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].kind, ErrorKind::Config);
}

#[tokio::test]
async fn duplicate_file_names_download_once() {
    let (_dir, instance) = instance();
    let downloader = MockDownloader::new()
        .serve(mod_url("a.jar"), Served::Body("alpha".into()))
        .into_arc();
    let info = sync_info(vec![
        mod_with_content("a.jar", "alpha"),
        mod_with_content("a.jar", "alpha"),
    ]);

    let report = ModSyncEngine::new(info, instance.clone(), downloader.clone())
        .run()
        .await
        .unwrap();

    assert_eq!(report.added, vec!["a.jar"]);
    assert_eq!(downloader.requested().len(), 1);
}

#[tokio::test]
async fn plan_leaves_files_untouched() {
    let (_dir, instance) = instance();
    write_mod(&instance, "b.jar", "bravo");
    write_mod(&instance, "c.jar", "charlie");
    let downloader = MockDownloader::new().into_arc();
    let info = sync_info(vec![
        mod_with_content("a.jar", "alpha"),
        mod_with_content("b.jar", "bravo"),
    ]);

    let plan = ModSyncEngine::new(info, instance.clone(), downloader.clone())
        .plan()
        .await
        .unwrap();

    assert_eq!(plan.download_names(), vec!["a.jar"]);
    assert_eq!(plan.keep_names(), vec!["b.jar"]);
    assert_eq!(plan.remove_names(), vec!["c.jar"]);
    assert!(read_mod(&instance, "c.jar").is_some());
    assert!(downloader.requested().is_empty());
}

#[tokio::test]
async fn cancelled_before_start_changes_nothing() {
    let (_dir, instance) = instance();
    write_mod(&instance, "c.jar", "charlie");
    let downloader = MockDownloader::new()
        .serve(mod_url("a.jar"), Served::Body("alpha".into()))
        .into_arc();
    let token = CancellationToken::new();
    token.cancel();

    let report = ModSyncEngine::new(
        sync_info(vec![mod_with_content("a.jar", "alpha")]),
        instance.clone(),
        downloader.clone(),
    )
    .with_cancellation(token)
    .run()
    .await
    .unwrap();

    assert!(report.was_cancelled());
    assert_eq!(report.cancelled, vec!["a.jar"]);
    assert!(report.removed.is_empty());
    assert!(downloader.requested().is_empty());
    assert!(read_mod(&instance, "c.jar").is_some());
    assert_eq!(read_mod(&instance, "a.jar"), None);
}

#[tokio::test]
async fn cancelling_stops_hanging_downloads() {
    let (_dir, instance) = instance();
    write_mod(&instance, "c.jar", "charlie");
    let downloader = MockDownloader::new()
        .serve(mod_url("a.jar"), Served::Hang)
        .into_arc();
    let engine = ModSyncEngine::new(
        sync_info(vec![mod_with_content("a.jar", "alpha")]),
        instance.clone(),
        downloader,
    );

    let token = engine.cancellation_token();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        token.cancel();
    });

    let report = tokio::time::timeout(Duration::from_secs(5), engine.run())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(report.cancelled, vec!["a.jar"]);
    assert!(read_mod(&instance, "c.jar").is_some());
    assert_eq!(read_mod(&instance, "a.jar"), None);
}

#[tokio::test]
async fn phases_end_in_done() {
    let (_dir, instance) = instance();
    let downloader = MockDownloader::new()
        .serve(mod_url("a.jar"), Served::Body("alpha".into()))
        .into_arc();
    let engine = ModSyncEngine::new(
        sync_info(vec![mod_with_content("a.jar", "alpha")]),
        instance,
        downloader,
    );

    let phases = engine.subscribe();
    assert_eq!(*phases.borrow(), SyncPhase::Init);
    engine.run().await.unwrap();
    assert_eq!(*phases.borrow(), SyncPhase::Done);
}

#[tokio::test]
async fn missing_instance_root_fails_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("file-not-dir");
    std::fs::write(&root, "").unwrap();
    let instance = packsync_lib::core::instance::GameInstance::new(&root);

    let engine = ModSyncEngine::new(sync_info(vec![]), instance, MockDownloader::new().into_arc());
    assert!(engine.run().await.is_err());
    assert_eq!(engine.phase(), SyncPhase::Failed);
}

#[tokio::test]
async fn engine_follows_script_config() {
    use packsync_lib::core::config::{ScriptConfig, SyncContext};

    let (_dir, instance) = instance();
    write_mod(&instance, "my-own-mod.jar", "mine");
    let mut client_only = mod_with_content("iris.jar", "iris");
    client_only.server_support = SupportLevel::Unsupported;

    let mut config = ScriptConfig::new("sync-info.json");
    config.environment = Environment::Server;
    config.protected_files.push("my-own-mod.jar".into());
    let info = SyncInfo {
        mods: vec![client_only],
        ..SyncInfo::default()
    };
    let ctx = SyncContext::with_default_client(config, info, instance.clone()).unwrap();

    let downloader = MockDownloader::new().into_arc();
    let report = ModSyncEngine::from_context(&ctx, downloader.clone())
        .run()
        .await
        .unwrap();

    assert_eq!(report.skipped, vec!["iris.jar"]);
    assert!(report.removed.is_empty());
    assert!(downloader.requested().is_empty());
    assert!(read_mod(&instance, "my-own-mod.jar").is_some());
}

#[tokio::test]
async fn non_jar_mods_are_matched_by_url_name() {
    let (_dir, instance) = instance();
    write_mod(&instance, "datapack.zip", "pack");
    let downloader = MockDownloader::new()
        .serve(mod_url("datapack.zip"), Served::Body("pack".into()))
        .into_arc();
    let info = sync_info(vec![mod_with_content("datapack.zip", "pack")]);

    let engine = ModSyncEngine::new(info.clone(), instance.clone(), downloader.clone());
    let plan = engine.plan().await.unwrap();
    assert_eq!(plan.keep_names(), vec!["datapack.zip"]);
    assert!(plan.download_names().is_empty());

    let report = engine.run().await.unwrap();
    assert_eq!(report.kept, vec!["datapack.zip"]);
    assert!(report.added.is_empty());
    assert!(downloader.requested().is_empty());
}

#[tokio::test]
async fn dropped_non_jar_mod_is_removed_on_next_run() {
    let (_dir, instance) = instance();
    write_mod(&instance, "notes.txt", "the user's");
    let downloader = MockDownloader::new()
        .serve(
            "https://cdn.example.com/download/12345".to_string(),
            Served::Body("build".into()),
        )
        .into_arc();
    let mut descriptor = ModDescriptor::new("https://cdn.example.com/download/12345");
    descriptor.file_integrity_info =
        IntegrityInfo::default().with(HashAlgorithm::Sha1, hash_str("build", HashAlgorithm::Sha1));

    let first = ModSyncEngine::new(sync_info(vec![descriptor]), instance.clone(), downloader.clone())
        .run()
        .await
        .unwrap();
    assert_eq!(first.added, vec!["12345"]);
    assert_eq!(read_mod(&instance, "12345").as_deref(), Some("build"));

    let second = ModSyncEngine::new(sync_info(vec![]), instance.clone(), downloader)
        .run()
        .await
        .unwrap();
    assert_eq!(second.removed, vec!["12345"]);
    assert_eq!(read_mod(&instance, "12345"), None);
    assert!(read_mod(&instance, "notes.txt").is_some());
}

#[tokio::test]
async fn case_variant_of_a_wanted_mod_is_not_removed() {
    let (_dir, instance) = instance();
    write_mod(&instance, "sodium.jar", "sodium");
    let downloader = MockDownloader::new()
        .serve(mod_url("Sodium.jar"), Served::Body("sodium".into()))
        .into_arc();
    let info = sync_info(vec![mod_with_content("Sodium.jar", "sodium")]);

    let report = ModSyncEngine::new(info, instance.clone(), downloader)
        .run()
        .await
        .unwrap();

    assert!(report.removed.is_empty());
    assert_eq!(read_mod(&instance, "Sodium.jar").as_deref(), Some("sodium"));
}

#[tokio::test]
async fn downloads_respect_concurrency_limit() {
    let (_dir, instance) = instance();
    let names: Vec<String> = (0..6).map(|i| format!("mod-{i}.jar")).collect();
    let mut downloader = MockDownloader::new().with_latency(Duration::from_millis(30));
    for name in &names {
        downloader = downloader.serve(mod_url(name), Served::Body(name.clone()));
    }
    let downloader = downloader.into_arc();
    let info = sync_info(
        names
            .iter()
            .map(|name| mod_with_content(name, name))
            .collect(),
    );

    let report = ModSyncEngine::new(info, instance, downloader.clone())
        .with_concurrency(2)
        .run()
        .await
        .unwrap();

    assert_eq!(report.added.len(), 6);
    assert_eq!(downloader.requested().len(), 6);
    assert!(downloader.max_in_flight() <= 2);
    assert_eq!(downloader.max_in_flight(), 2);
}
