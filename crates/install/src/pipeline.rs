//! The five install stages composed in order

use crate::context::InstallContext;
use crate::placement::install;
use keg_builder::{
    build, extract, resolve_source, verify_integrity, BuildOptions, Scratch,
};
use keg_errors::Error;
use keg_events::{EventEmitter, FailureContext};
use keg_net::NetClient;
use keg_types::{InstallReport, PackageSpec, SpecSummary, Stage, StageTiming};
use std::future::Future;
use std::path::Path;
use std::time::Instant;

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

/// Run one stage, recording its timing and emitting lifecycle events
async fn run_stage<T, F>(
    ctx: &InstallContext,
    stage: Stage,
    package: &str,
    timings: &mut Vec<StageTiming>,
    fut: F,
) -> Result<T, Error>
where
    F: Future<Output = Result<T, Error>>,
{
    ctx.emit_stage_started(stage, package);
    let started = Instant::now();

    match fut.await {
        Ok(value) => {
            let duration_ms = elapsed_ms(started);
            tracing::info!(%stage, package, duration_ms, "stage completed");
            timings.push(StageTiming { stage, duration_ms });
            ctx.emit_stage_completed(stage, package, duration_ms);
            Ok(value)
        }
        Err(e) => {
            tracing::debug!(%stage, package, error = %e, "stage failed");
            ctx.emit_stage_failed(stage, package, FailureContext::from_error(&e));
            Err(e)
        }
    }
}

/// Install `spec`: resolve, verify, extract, build, install
///
/// Stages run strictly in order and none is retried; the first failure
/// aborts the run and is returned as-is. Verification always completes
/// before anything is unpacked or executed.
///
/// # Errors
///
/// Returns the error of the stage that failed: `Fetch`, `Integrity`,
/// `Extraction`, `Build` or `Install`.
pub async fn install_package(
    spec: &PackageSpec,
    ctx: &InstallContext,
) -> Result<InstallReport, Error> {
    let started = Instant::now();
    let package = spec.to_string();
    let reproducibility = spec.reproducibility();

    if let keg_types::Reproducibility::Unpinned { reason } = &reproducibility {
        ctx.emit_warning_with_context(format!("{package} is not reproducible"), reason.clone());
    }

    let client = NetClient::new(ctx.net_config.clone())?;
    let scratch = Scratch::new(ctx.scratch_dir.as_deref())?;
    tracing::debug!(package = %package, scratch = %scratch.path().display(), "starting install");

    let result = run_stages(spec, ctx, &client, &scratch, &package).await;

    if ctx.keep_scratch {
        let kept = scratch.keep();
        ctx.emit_debug(format!("scratch directory kept at {}", kept.display()));
    }

    let (installed, digest, stages) = result?;
    Ok(InstallReport {
        name: spec.name.clone(),
        version: spec.version.clone(),
        path: installed.path,
        algorithm: digest.algorithm(),
        digest: digest.to_hex(),
        mode: installed.mode,
        size: installed.size,
        reproducibility,
        stages,
        duration_ms: elapsed_ms(started),
    })
}

type StageOutput = (
    crate::placement::InstalledArtifact,
    keg_hash::Hash,
    Vec<StageTiming>,
);

async fn run_stages(
    spec: &PackageSpec,
    ctx: &InstallContext,
    client: &NetClient,
    scratch: &Scratch,
    package: &str,
) -> Result<StageOutput, Error> {
    let mut timings = Vec::with_capacity(Stage::ALL.len());

    let local = run_stage(
        ctx,
        Stage::Resolve,
        package,
        &mut timings,
        resolve_source(spec, client, scratch, ctx),
    )
    .await?;

    let verified = run_stage(
        ctx,
        Stage::Verify,
        package,
        &mut timings,
        verify_integrity(local, &spec.expected_digest),
    )
    .await?;

    let source_dir = scratch.source_dir();
    let tree = run_stage(
        ctx,
        Stage::Extract,
        package,
        &mut timings,
        extract(&verified, &source_dir),
    )
    .await?;

    let options = BuildOptions {
        timeout: ctx.build_timeout,
    };
    let stage_dir = scratch.stage_dir();
    let artifact = run_stage(
        ctx,
        Stage::Build,
        package,
        &mut timings,
        build(spec, &tree, &stage_dir, &options, ctx),
    )
    .await?;

    let installed = run_stage(
        ctx,
        Stage::Install,
        package,
        &mut timings,
        install(&artifact, &spec.install_path, &spec.name, spec.mode),
    )
    .await?;

    Ok((installed, verified.digest().clone(), timings))
}

/// Describe what [`install_package`] would do without running anything
#[must_use]
pub fn inspect(spec: &PackageSpec) -> SpecSummary {
    let staged_output = Path::new("<scratch>/stage/bin").join(&spec.name);
    let args = spec
        .build_command
        .render_args(&staged_output, &spec.name, &spec.version);

    SpecSummary {
        name: spec.name.clone(),
        version: spec.version.clone(),
        description: spec.description.clone(),
        homepage: spec.homepage.clone(),
        source: spec.source.clone(),
        expected_digest: spec.expected_digest.to_string(),
        build_dependencies: spec.build_dependencies.clone(),
        build_command: spec.build_command.display_with(&args),
        target: spec.target_path(),
        mode: spec.mode,
        reproducibility: spec.reproducibility(),
    }
}
