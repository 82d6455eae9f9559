//! Integration tests for shellcache

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    fn shellcache() -> Command {
        cargo_bin_cmd!("shellcache")
    }

    /// Write a config using the memory backend, optionally with a bundle
    fn write_config(dir: &Path, with_bundle: bool) -> PathBuf {
        let mut worker = String::from("[worker]\norigin = \"http://127.0.0.1:9\"\n");
        if with_bundle {
            std::fs::write(
                dir.join("asset-bundle.json"),
                r#"{"resources": {"/": "h0", "main.js": "h1"}, "core": ["main.js"]}"#,
            )
            .unwrap();
            worker.push_str("bundle = \"asset-bundle.json\"\n");
        }

        let path = dir.join("config.toml");
        std::fs::write(&path, format!("{}\n[storage]\nbackend = \"memory\"\n", worker)).unwrap();
        path
    }

    #[test]
    fn help_displays() {
        shellcache()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("offline resource cache"));
    }

    #[test]
    fn version_displays() {
        shellcache()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("shellcache"));
    }

    #[test]
    fn config_path_honours_flag() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("custom.toml");

        shellcache()
            .arg("--config")
            .arg(&path)
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("custom.toml"));
    }

    #[test]
    fn config_path_honours_env() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("from-env.toml");

        shellcache()
            .env("SHELLCACHE_CONFIG", &path)
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("from-env.toml"));
    }

    #[test]
    fn config_show() {
        let temp = TempDir::new().unwrap();
        let path = write_config(temp.path(), false);

        shellcache()
            .arg("--config")
            .arg(&path)
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[general]"))
            .stdout(predicate::str::contains("app-temp-cache"));
    }

    #[test]
    fn config_init_then_set() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("config.toml");

        shellcache()
            .arg("--config")
            .arg(&path)
            .args(["config", "init"])
            .assert()
            .success();
        assert!(path.exists());

        shellcache()
            .arg("--config")
            .arg(&path)
            .args(["config", "set", "storage.backend", "memory"])
            .assert()
            .success();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("backend = \"memory\""));
    }

    #[test]
    fn config_set_rejects_unknown_key() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");

        shellcache()
            .arg("--config")
            .arg(&path)
            .args(["config", "set", "worker.name", "x"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Unknown config key"));
    }

    #[test]
    fn status_without_bundle() {
        let temp = TempDir::new().unwrap();
        let path = write_config(temp.path(), false);

        shellcache()
            .arg("--config")
            .arg(&path)
            .arg("status")
            .assert()
            .success()
            .stdout(predicate::str::contains("No asset bundle configured"));
    }

    #[test]
    fn status_json_reports_bundle() {
        let temp = TempDir::new().unwrap();
        let path = write_config(temp.path(), true);

        shellcache()
            .arg("--config")
            .arg(&path)
            .args(["status", "--format", "json"])
            .assert()
            .success()
            .stdout(predicate::str::contains("\"manifest_resources\": 2"))
            .stdout(predicate::str::contains("\"missing\": 2"));
    }

    #[test]
    fn entries_empty() {
        let temp = TempDir::new().unwrap();
        let path = write_config(temp.path(), false);

        shellcache()
            .arg("--config")
            .arg(&path)
            .arg("entries")
            .assert()
            .success()
            .stdout(predicate::str::contains("No cached entries"));
    }

    #[test]
    fn unknown_message_is_ignored() {
        let temp = TempDir::new().unwrap();
        let path = write_config(temp.path(), true);

        shellcache()
            .arg("--config")
            .arg(&path)
            .args(["message", "reticulate"])
            .assert()
            .success()
            .stdout(predicate::str::contains("ignored"));
    }

    #[test]
    fn skip_waiting_reports_nothing_waiting() {
        let temp = TempDir::new().unwrap();
        let path = write_config(temp.path(), true);

        shellcache()
            .arg("--config")
            .arg(&path)
            .args(["message", "skipWaiting"])
            .assert()
            .success()
            .stdout(predicate::str::contains("No generation is waiting"));
    }

    #[test]
    fn config_rejects_shared_store_names() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(&path, "[caches]\ntemp = \"app-cache\"\n").unwrap();

        shellcache()
            .arg("--config")
            .arg(&path)
            .arg("status")
            .assert()
            .failure()
            .stderr(predicate::str::contains("more than one store"));
    }

    #[test]
    fn update_without_bundle_fails_with_hint() {
        let temp = TempDir::new().unwrap();
        let path = write_config(temp.path(), false);

        shellcache()
            .arg("--config")
            .arg(&path)
            .arg("update")
            .assert()
            .failure()
            .stderr(predicate::str::contains("Asset bundle not configured"))
            .stderr(predicate::str::contains("config set worker.bundle"));
    }

    #[test]
    fn update_with_unreachable_origin_fails() {
        let temp = TempDir::new().unwrap();
        let path = write_config(temp.path(), true);

        shellcache()
            .arg("--config")
            .arg(&path)
            .arg("update")
            .assert()
            .failure()
            .stderr(predicate::str::contains("Network request failed"));
    }
}

mod upgrade_tests {
    use async_trait::async_trait;
    use shellcache::config::CacheNames;
    use shellcache::error::{ShellcacheError, ShellcacheResult};
    use shellcache::host::{LifecycleState, Registration};
    use shellcache::manifest::{CoreSet, ManifestRegistry, ResourceManifest};
    use shellcache::net::{Fetcher, Origin, Request, Response};
    use shellcache::store::{CacheStorage, DiskStorage};
    use shellcache::worker::{FetchOutcome, ResponseSource, Worker, WorkerConfig};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tempfile::TempDir;

    const ORIGIN: &str = "https://shell.test";

    /// Serves fixed bodies per path and counts requests
    struct Site {
        bodies: HashMap<String, String>,
        requests: AtomicUsize,
    }

    impl Site {
        fn new(pages: &[(&str, &str)]) -> Self {
            Self {
                bodies: pages
                    .iter()
                    .map(|(path, body)| (format!("{}/{}", ORIGIN, path), body.to_string()))
                    .collect(),
                requests: AtomicUsize::new(0),
            }
        }

        fn requests(&self) -> usize {
            self.requests.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Fetcher for Site {
        async fn fetch(&self, request: &Request) -> ShellcacheResult<Response> {
            self.requests.fetch_add(1, Ordering::SeqCst);
            self.bodies
                .get(&request.url)
                .map(|body| Response::new(&request.url, 200, body.as_bytes()))
                .ok_or_else(|| ShellcacheError::network(&request.url, "not found"))
        }
    }

    fn worker(
        root: &std::path::Path,
        site: Arc<Site>,
        registration: Arc<Registration>,
        manifest: &[(&str, &str)],
        core: &[&str],
    ) -> Worker {
        let config = WorkerConfig {
            origin: Origin::parse(ORIGIN).unwrap(),
            registry: ManifestRegistry::new(
                ResourceManifest::from_entries(manifest.iter().copied()),
                CoreSet::new(core.iter().copied()),
            )
            .unwrap(),
            caches: CacheNames::default(),
        };
        // A fresh storage handle per generation, as after a restart
        Worker::new(
            config,
            Arc::new(DiskStorage::new(root.to_path_buf())),
            site,
            registration,
        )
        .unwrap()
    }

    async fn get(worker: &Worker, path: &str) -> (ResponseSource, String) {
        let outcome = worker
            .handle_fetch(&Request::get(format!("{}/{}", ORIGIN, path)))
            .await
            .unwrap();
        match outcome {
            FetchOutcome::Respond { response, source } => {
                (source, String::from_utf8(response.body).unwrap())
            }
            FetchOutcome::Passthrough => panic!("{} passed through", path),
        }
    }

    #[tokio::test]
    async fn upgrade_keeps_unchanged_and_evicts_changed() {
        let temp = TempDir::new().unwrap();
        let old = [("a", "h1"), ("b", "h2")];
        let new = [("a", "h1"), ("b", "h3"), ("c", "h4")];

        // First generation, resources cached lazily
        let site_v1 = Arc::new(Site::new(&[("a", "a1"), ("b", "b1")]));
        let registration = Arc::new(Registration::new());
        let v1 = worker(temp.path(), site_v1.clone(), registration.clone(), &old, &[]);
        assert_eq!(
            registration.update(&v1).await.unwrap(),
            LifecycleState::Activated
        );
        assert_eq!(get(&v1, "a").await, (ResponseSource::Network, "a1".into()));
        assert_eq!(get(&v1, "b").await, (ResponseSource::Network, "b1".into()));

        // Second generation after a deploy that changed b and added c
        let site_v2 = Arc::new(Site::new(&[("a", "a2"), ("b", "b2"), ("c", "c2")]));
        let registration = Arc::new(Registration::new());
        let v2 = worker(temp.path(), site_v2.clone(), registration.clone(), &new, &["c"]);
        assert_eq!(
            registration.update(&v2).await.unwrap(),
            LifecycleState::Activated
        );
        assert_eq!(site_v2.requests(), 1);

        // a survived, so the cached v1 body is still served
        assert_eq!(get(&v2, "a").await, (ResponseSource::Cache, "a1".into()));
        // b was evicted and is refetched
        assert_eq!(get(&v2, "b").await, (ResponseSource::Network, "b2".into()));
        // c was staged by install
        assert_eq!(get(&v2, "c").await, (ResponseSource::Cache, "c2".into()));
        assert_eq!(site_v2.requests(), 2);

        let applied = v2.applied_manifest().await.unwrap().unwrap();
        assert_eq!(applied, ResourceManifest::from_entries(new));

        let storage = DiskStorage::new(temp.path().to_path_buf());
        assert!(!storage.has("app-temp-cache").await.unwrap());
    }

    #[tokio::test]
    async fn hydration_survives_restart_and_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let manifest = [("/", "h0"), ("main.js", "h1"), ("logo.png", "h2")];
        let site = Arc::new(Site::new(&[("", "<html>"), ("main.js", "js"), ("logo.png", "png")]));

        let registration = Arc::new(Registration::new());
        let first = worker(temp.path(), site.clone(), registration.clone(), &manifest, &["main.js"]);
        registration.update(&first).await.unwrap();
        let report = first.hydrate_offline().await.unwrap();
        assert_eq!(report.fetched, 2);

        // Restarted process: a new generation handle over the same stores
        let again = worker(
            temp.path(),
            site.clone(),
            Arc::new(Registration::new()),
            &manifest,
            &["main.js"],
        );
        let before = site.requests();
        let report = again.hydrate_offline().await.unwrap();

        assert_eq!(report.fetched, 0);
        assert_eq!(site.requests(), before);
        assert!(again.missing_resources().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_install_keeps_previous_generation_content() {
        let temp = TempDir::new().unwrap();
        let site = Arc::new(Site::new(&[("a", "a1")]));

        let registration = Arc::new(Registration::new());
        let v1 = worker(temp.path(), site.clone(), registration.clone(), &[("a", "h1")], &["a"]);
        registration.update(&v1).await.unwrap();

        // The next build lists a core resource the server cannot provide
        let registration = Arc::new(Registration::new());
        let v2 = worker(
            temp.path(),
            site,
            registration.clone(),
            &[("a", "h2"), ("missing.js", "h3")],
            &["missing.js"],
        );
        assert!(registration.update(&v2).await.is_err());
        assert_eq!(registration.state().await, Some(LifecycleState::Redundant));

        let applied = v1.applied_manifest().await.unwrap().unwrap();
        assert_eq!(applied, ResourceManifest::from_entries([("a", "h1")]));
        assert_eq!(get(&v1, "a").await, (ResponseSource::Cache, "a1".into()));
    }
}
