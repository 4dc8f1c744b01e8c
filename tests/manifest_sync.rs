//! Forward sync, reverse discovery and the manifest watcher end to end.

mod common;

use std::fs;
use std::time::Duration;

use common::{RecordingControl, TestSite};
use nginx_manager::inspect;
use nginx_manager::manifest::{Manifest, ManifestWatcher, Protocol};
use nginx_manager::{ManagerError, Shutdown};

#[tokio::test]
async fn test_apply_manifest_generates_enables_and_reloads() {
    let site = TestSite::new();
    fs::create_dir_all(site.root().join("apps")).unwrap();
    let path = site.manifest("shop.example.com.yaml");
    fs::write(&path, "domain: shop.example.com\nport: 4000\n").unwrap();

    let name = site.sync().apply_manifest(&path).await.unwrap();

    assert_eq!(name, "shop.example.com.conf");
    let generated = site.available("shop.example.com.conf");
    assert!(generated.exists());
    assert!(fs::symlink_metadata(site.enabled("shop.example.com.conf"))
        .unwrap()
        .file_type()
        .is_symlink());

    let target = inspect::proxy_target(&generated).unwrap();
    assert_eq!(target.protocol, Protocol::Http);
    assert_eq!(target.host, "127.0.0.1");
    assert_eq!(target.port, 4000);
    let details = inspect::extract(&generated);
    assert_eq!(details.details().unwrap().listen_port, 8080);

    assert_eq!(site.control.calls(), vec!["validate", "reload"]);
}

#[tokio::test]
async fn test_manifest_without_port_changes_nothing() {
    let site = TestSite::new();
    fs::create_dir_all(site.root().join("apps")).unwrap();
    let path = site.manifest("broken.yaml");
    fs::write(&path, "domain: broken.example.com\nport:\n").unwrap();

    let err = site.sync().apply_manifest(&path).await.unwrap_err();

    assert!(matches!(err, ManagerError::InvalidInput(_)));
    assert_eq!(fs::read_dir(site.root().join("sites-available")).unwrap().count(), 0);
    assert_eq!(fs::read_dir(site.root().join("sites-enabled")).unwrap().count(), 0);
    assert!(site.control.calls().is_empty());
}

#[tokio::test]
async fn test_rejected_config_stays_saved_but_is_not_reloaded() {
    let site = TestSite::with_control(RecordingControl {
        fail_validate: true,
        ..Default::default()
    });
    fs::create_dir_all(site.root().join("apps")).unwrap();
    let path = site.manifest("api.example.com.yaml");
    fs::write(&path, "domain: api.example.com\nprotocol: https\nport: 8443\n").unwrap();

    let err = site.sync().apply_manifest(&path).await.unwrap_err();

    assert!(matches!(err, ManagerError::ValidationFailed { .. }));
    assert!(site.available("api.example.com.conf").exists());
    assert_eq!(site.control.calls(), vec!["validate"]);
}

#[tokio::test]
async fn test_reverse_sync_creates_missing_manifest_once() {
    let site = TestSite::new();
    site.write_site("shop.example.com.conf", 8080, "http://127.0.0.1:5000");
    fs::write(site.available("static.conf"), "server {\n    listen 80;\n    root /srv;\n}\n").unwrap();
    let sync = site.sync();

    let report = sync.reverse_sync().await;

    let manifest_path = site.manifest("shop.example.com.yaml");
    assert_eq!(report.created, vec![manifest_path.clone()]);
    assert_eq!(report.skipped, 1);
    let text = fs::read_to_string(&manifest_path).unwrap();
    let manifest = Manifest::from_yaml(&text, &manifest_path).unwrap();
    assert_eq!(manifest.domain, "shop.example.com");
    assert_eq!(manifest.protocol, Protocol::Http);
    assert_eq!(manifest.hostname, "127.0.0.1");
    assert_eq!(manifest.port, 5000);

    let again = sync.reverse_sync().await;
    assert!(again.created.is_empty());
    assert_eq!(again.existing, 1);
    assert_eq!(fs::read_to_string(&manifest_path).unwrap(), text);
}

#[tokio::test]
async fn test_reverse_sync_keeps_hand_edited_manifest() {
    let site = TestSite::new();
    site.write_site("shop.example.com.conf", 8080, "http://127.0.0.1:5000");
    fs::create_dir_all(site.root().join("apps")).unwrap();
    let manifest_path = site.manifest("shop.example.com.yaml");
    fs::write(&manifest_path, "domain: shop.example.com\nport: 9999\n").unwrap();

    let report = site.sync().reverse_sync().await;

    assert!(report.created.is_empty());
    assert_eq!(
        fs::read_to_string(&manifest_path).unwrap(),
        "domain: shop.example.com\nport: 9999\n"
    );
}

#[tokio::test]
async fn test_reverse_sync_respects_yml_manifest() {
    let site = TestSite::new();
    site.write_site("shop.example.com.conf", 8080, "http://127.0.0.1:5000");
    fs::create_dir_all(site.root().join("apps")).unwrap();
    fs::write(
        site.manifest("shop.example.com.yml"),
        "domain: shop.example.com\nport: 5000\n",
    )
    .unwrap();

    let report = site.sync().reverse_sync().await;

    assert!(report.created.is_empty());
    assert_eq!(report.existing, 1);
    assert!(!site.manifest("shop.example.com.yaml").exists());
}

#[tokio::test]
async fn test_create_manifest_rejects_missing_domain() {
    let site = TestSite::new();
    let err = site.sync().create_manifest(&Manifest::new("", 3000)).unwrap_err();
    assert!(matches!(err, ManagerError::InvalidInput(_)));
    assert!(!site.root().join("apps").exists());
}

#[tokio::test]
async fn test_watcher_deploys_manifests_and_stops_on_shutdown() {
    let site = TestSite::new();
    site.write_site("legacy.example.com.conf", 8080, "http://127.0.0.1:7000");
    let watcher = ManifestWatcher::new(&site.config, site.sync());
    let shutdown = Shutdown::new();
    let task = tokio::spawn(watcher.run(shutdown.subscribe()));

    // Reverse discovery runs before watching starts.
    let legacy = site.manifest("legacy.example.com.yaml");
    assert!(common::eventually(Duration::from_secs(5), || legacy.exists()).await);

    // Rewrite until the watch is registered and the event is picked up.
    let manifest = site.manifest("new.example.com.yaml");
    let generated = site.available("new.example.com.conf");
    let mut deployed = false;
    for _ in 0..20 {
        fs::write(&manifest, "domain: new.example.com\nport: 4100\n").unwrap();
        if common::eventually(Duration::from_millis(500), || generated.exists()).await {
            deployed = true;
            break;
        }
    }
    assert!(deployed, "watcher never generated the config");
    assert!(fs::symlink_metadata(site.enabled("new.example.com.conf")).is_ok());

    shutdown.trigger();
    let result = tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .expect("watcher did not stop")
        .unwrap();
    assert!(result.is_ok());
}
