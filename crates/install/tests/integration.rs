//! End-to-end tests for the install pipeline

#[cfg(all(test, unix))]
mod tests {
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use keg_errors::{BuildError, Error, ExtractionError, IntegrityError};
    use keg_events::{channel, AppEvent, EventReceiver, GeneralEvent, StageEvent};
    use keg_hash::{hash_tree, DigestAlgorithm, Hash};
    use keg_install::*;
    use keg_types::{
        BuildCommand, ExpectedDigest, PackageSpec, Reproducibility, SourceLocation, Stage,
        Version, DEFAULT_MODE,
    };
    use std::os::unix::fs::PermissionsExt;
    use std::path::{Path, PathBuf};
    use tempfile::{tempdir, TempDir};
    use url::Url;

    const FAKE_GO: &str = r#"#!/bin/sh
[ "$1" = "build" ] || exit 64
[ -f main.go ] || { echo "no main.go in $(pwd)" >&2; exit 65; }
printf '#!/bin/sh\necho blisp\n' > "$3"
"#;

    fn release_archive() -> Vec<u8> {
        let encoder = GzEncoder::new(Vec::new(), Compression::default());
        let mut builder = tar::Builder::new(encoder);
        for (path, data) in [
            ("blisp-prod/main.go", b"package main\n".as_slice()),
            ("blisp-prod/go.mod", b"module blisp\n".as_slice()),
        ] {
            let mut header = tar::Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append_data(&mut header, path, data).unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap()
    }

    struct Fixture {
        dir: TempDir,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                dir: tempdir().unwrap(),
            }
        }

        fn bin_dir(&self) -> PathBuf {
            self.dir.path().join("prefix/bin")
        }

        fn toolchain(&self, body: &str) -> PathBuf {
            let path = self.dir.path().join("fake-go");
            std::fs::write(&path, body).unwrap();
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
            path
        }

        fn publish(&self, name: &str, data: &[u8]) -> String {
            let path = self.dir.path().join(name);
            std::fs::write(&path, data).unwrap();
            Url::from_file_path(&path).unwrap().to_string()
        }

        fn spec(&self, url: &str, digest: &Hash, toolchain: &Path) -> PackageSpec {
            PackageSpec {
                name: "blisp".into(),
                version: Version::new(0, 1, 0),
                description: Some("Blisp interpreter".into()),
                homepage: None,
                source: SourceLocation::parse(url, None).unwrap(),
                expected_digest: ExpectedDigest::from_bytes(digest.algorithm(), *digest.as_bytes()),
                build_command: BuildCommand::toolchain_default(toolchain.display().to_string()),
                build_dependencies: Vec::new(),
                install_path: self.bin_dir(),
                mode: DEFAULT_MODE,
            }
        }

        fn release_spec(&self, toolchain_body: &str) -> PackageSpec {
            let data = release_archive();
            let url = self.publish("prod.tar.gz", &data);
            let toolchain = self.toolchain(toolchain_body);
            self.spec(&url, &Hash::from_data(DigestAlgorithm::Sha256, &data), &toolchain)
        }

        fn context(&self) -> (InstallContext, EventReceiver) {
            let (tx, rx) = channel();
            let ctx = InstallContext::new()
                .with_scratch_dir(Some(self.dir.path().join("scratch")))
                .with_event_sender(tx);
            (ctx, rx)
        }
    }

    fn stage_events(rx: &mut EventReceiver) -> Vec<StageEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let AppEvent::Stage(e) = event {
                events.push(e);
            }
        }
        events
    }

    fn started_stages(events: &[StageEvent]) -> Vec<Stage> {
        events
            .iter()
            .filter_map(|e| match e {
                StageEvent::Started { stage, .. } => Some(*stage),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_release_install() {
        let fx = Fixture::new();
        let spec = fx.release_spec(FAKE_GO);
        let (ctx, mut rx) = fx.context();

        let report = install_package(&spec, &ctx).await.unwrap();

        let target = fx.bin_dir().join("blisp");
        assert_eq!(report.path, target);
        assert_eq!(report.mode, 0o755);
        assert_eq!(report.digest, spec.expected_digest.to_hex());
        assert_eq!(report.reproducibility, Reproducibility::Pinned);
        assert_eq!(
            report.stages.iter().map(|t| t.stage).collect::<Vec<_>>(),
            Stage::ALL.to_vec()
        );

        let meta = std::fs::metadata(&target).unwrap();
        assert!(meta.permissions().mode() & 0o100 != 0);
        let output = std::process::Command::new(&target).output().unwrap();
        assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "blisp");

        assert_eq!(started_stages(&stage_events(&mut rx)), Stage::ALL.to_vec());

        // scratch is cleaned up
        let leftovers = std::fs::read_dir(fx.dir.path().join("scratch"))
            .unwrap()
            .count();
        assert_eq!(leftovers, 0);
    }

    #[tokio::test]
    async fn test_install_is_idempotent() {
        let fx = Fixture::new();
        let spec = fx.release_spec(FAKE_GO);
        let (ctx, _rx) = fx.context();

        let first = install_package(&spec, &ctx).await.unwrap();
        let first_bytes = std::fs::read(&first.path).unwrap();
        let second = install_package(&spec, &ctx).await.unwrap();

        assert_eq!(first.path, second.path);
        assert_eq!(first.mode, second.mode);
        assert_eq!(std::fs::read(&second.path).unwrap(), first_bytes);
        assert_eq!(std::fs::read_dir(fx.bin_dir()).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn test_digest_mismatch_stops_before_extraction() {
        let fx = Fixture::new();
        let data = release_archive();
        let mut tampered = data.clone();
        tampered[20] ^= 0x01;
        let url = fx.publish("prod.tar.gz", &tampered);
        let toolchain = fx.toolchain(FAKE_GO);
        let spec = fx.spec(&url, &Hash::from_data(DigestAlgorithm::Sha256, &data), &toolchain);
        let (ctx, mut rx) = fx.context();

        let err = install_package(&spec, &ctx).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Integrity(IntegrityError::Mismatch { .. })
        ));
        assert_eq!(err.stage(), "verify");
        assert!(!fx.bin_dir().exists());

        let events = stage_events(&mut rx);
        assert_eq!(started_stages(&events), vec![Stage::Resolve, Stage::Verify]);
        assert!(events.iter().any(|e| matches!(
            e,
            StageEvent::Failed { stage: Stage::Verify, failure, .. }
                if failure.code.as_deref() == Some("integrity.mismatch")
        )));
    }

    #[tokio::test]
    async fn test_failed_build_never_installs() {
        let fx = Fixture::new();
        let spec = fx.release_spec("#!/bin/sh\necho 'build failed' >&2\nexit 2\n");
        let (ctx, mut rx) = fx.context();

        let err = install_package(&spec, &ctx).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Build(BuildError::Failed {
                exit_code: Some(2),
                ..
            })
        ));
        assert!(!fx.bin_dir().exists());
        assert!(!started_stages(&stage_events(&mut rx)).contains(&Stage::Install));
    }

    #[tokio::test]
    async fn test_corrupted_archive_leaves_no_install() {
        let fx = Fixture::new();
        let data = release_archive();
        let truncated = &data[..data.len() / 2];
        let url = fx.publish("prod.tar.gz", truncated);
        let toolchain = fx.toolchain(FAKE_GO);
        let spec = fx.spec(
            &url,
            &Hash::from_data(DigestAlgorithm::Sha256, truncated),
            &toolchain,
        );
        let (ctx, _rx) = fx.context();

        let err = install_package(&spec, &ctx).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Extraction(ExtractionError::Corrupted { .. })
        ));
        assert!(!fx.bin_dir().exists());
    }

    #[tokio::test]
    async fn test_keep_scratch() {
        let fx = Fixture::new();
        let spec = fx.release_spec(FAKE_GO);
        let (ctx, _rx) = fx.context();
        let ctx = ctx.with_keep_scratch(true);

        install_package(&spec, &ctx).await.unwrap();

        let kept: Vec<_> = std::fs::read_dir(fx.dir.path().join("scratch"))
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect();
        assert_eq!(kept.len(), 1);
        assert!(kept[0].join("stage/bin/blisp").is_file());
        assert!(kept[0].join("downloads/prod.tar.gz").is_file());
    }

    #[tokio::test]
    async fn test_repository_head_is_flagged() {
        if which::which("git").is_err() {
            eprintln!("git not found, skipping");
            return;
        }

        let fx = Fixture::new();
        let repo = fx.dir.path().join("blisp");
        std::fs::create_dir(&repo).unwrap();
        std::fs::write(repo.join("main.go"), b"package main\n").unwrap();
        for args in [
            vec!["init", "--quiet"],
            vec!["add", "."],
            vec!["commit", "--quiet", "-m", "initial"],
        ] {
            let status = std::process::Command::new("git")
                .args(["-c", "user.name=keg", "-c", "user.email=keg@example.com"])
                .args(&args)
                .current_dir(&repo)
                .status()
                .unwrap();
            assert!(status.success());
        }

        let digest = hash_tree(DigestAlgorithm::Sha256, &repo).await.unwrap();
        let url = Url::from_file_path(&repo).unwrap().to_string();
        let toolchain = fx.toolchain(FAKE_GO);
        let mut spec = fx.spec(&url, &digest, &toolchain);
        spec.version = Version::new(1, 0, 0);
        let (ctx, mut rx) = fx.context();

        let report = install_package(&spec, &ctx).await.unwrap();
        assert!(matches!(
            report.reproducibility,
            Reproducibility::Unpinned { .. }
        ));
        assert!(report.path.is_file());

        let mut warned = false;
        while let Ok(event) = rx.try_recv() {
            if let AppEvent::General(GeneralEvent::Warning { message, .. }) = event {
                warned |= message.contains("not reproducible");
            }
        }
        assert!(warned);
    }

    #[test]
    fn test_inspect() {
        let fx = Fixture::new();
        let digest = Hash::from_data(DigestAlgorithm::Sha256, b"archive");
        let spec = fx.spec(
            "https://github.com/JacksonO123/blisp/archive/refs/tags/prod.tar.gz",
            &digest,
            Path::new("go"),
        );

        let summary = inspect(&spec);
        assert_eq!(summary.target, fx.bin_dir().join("blisp"));
        assert_eq!(
            summary.build_command,
            "go build -o <scratch>/stage/bin/blisp"
        );
        assert_eq!(
            summary.expected_digest,
            format!("sha256:{}", digest.to_hex())
        );
        assert!(summary.reproducibility.is_pinned());
    }
}
