//! Processing pipeline: fetch snapshot → check it → build view → render.

use std::time::Instant;

use tracing::{info, warn};

use exposure_core::{Components, JsonInventoryProvider, SnapshotProvider, find_token_collisions};
use exposure_error::{Error, Result};
use exposure_mermaid::{generate_report, render_load_balancer_view};

use crate::options::{ExposureOptions, View};

/// Run against the inventory file named in `opts`.
pub fn run_main(opts: &ExposureOptions) -> Result<String> {
    run_with(opts, &JsonInventoryProvider::new(&opts.snapshot))
}

/// Run against any snapshot provider.
pub fn run_with<P>(opts: &ExposureOptions, provider: &P) -> Result<String>
where
    P: SnapshotProvider + ?Sized,
{
    let components = load_snapshot(opts, provider)?;
    report_snapshot_issues(&components);

    if opts.print_snapshot {
        let json = serde_json::to_string_pretty(&components)
            .map_err(|err| Error::from(err).with_operation("pipeline::print_snapshot"))?;
        return Ok(json);
    }

    let render_start = Instant::now();
    let text = match opts.view {
        View::AttackSurface => generate_report(&components),
        View::LoadBalancer => {
            let focus = opts
                .load_balancer
                .as_deref()
                .map(|name| {
                    components
                        .load_balancer_by_name(name)
                        .ok_or_else(|| Error::load_balancer_not_found(name))
                })
                .transpose()?;
            render_load_balancer_view(&components, focus)
        }
    };
    info!("Rendering: {:.2}s", render_start.elapsed().as_secs_f64());

    Ok(text)
}

/// Fetch the snapshot, turning any provider failure into `SnapshotUnavailable`.
///
/// The wrapper keeps the provider error's status: a missing or malformed
/// inventory is not retryable just because it was wrapped.
fn load_snapshot<P>(opts: &ExposureOptions, provider: &P) -> Result<Components>
where
    P: SnapshotProvider + ?Sized,
{
    let fetch_start = Instant::now();
    info!(
        profile = opts.request.profile.as_str(),
        region = opts.request.region.as_str(),
        vpc_id = opts.request.vpc_id.as_deref().unwrap_or("<any>"),
        "Loading snapshot"
    );

    let components = provider.fetch(&opts.request).map_err(|err| {
        Error::snapshot_unavailable(err.message().to_string())
            .with_status(err.status())
            .with_operation("pipeline::load_snapshot")
            .set_source(err)
    })?;

    info!("Snapshot: {:.2}s", fetch_start.elapsed().as_secs_f64());
    Ok(components)
}

/// Log what will make the diagrams less precise than the snapshot.
fn report_snapshot_issues(components: &Components) {
    for collision in find_token_collisions(components) {
        let identifiers: Vec<&str> = collision
            .identifiers
            .iter()
            .map(|(_, ident)| ident.as_str())
            .collect();
        warn!(
            token = collision.token.as_str(),
            identifiers = ?identifiers,
            "identifiers share a diagram token"
        );
    }
    for (owner, group) in components.dangling_security_group_references() {
        warn!(owner, group, "unknown security group reference");
    }
}
