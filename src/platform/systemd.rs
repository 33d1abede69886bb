//! systemd unit control through `systemctl`.

use crate::exec::CommandSpec;
use crate::pipeline::Context;

pub fn is_active(ctx: &Context<'_>, unit: &str) -> bool {
    ctx.exec
        .run(
            &CommandSpec::new("systemctl")
                .args(["is-active", "--quiet", unit])
                .probe(),
        )
        .is_success()
}

pub fn enable(ctx: &Context<'_>, unit: &str) -> Result<(), String> {
    systemctl(ctx, "enable", unit)
}

pub fn start(ctx: &Context<'_>, unit: &str) -> Result<(), String> {
    systemctl(ctx, "start", unit)
}

pub fn stop(ctx: &Context<'_>, unit: &str) -> Result<(), String> {
    systemctl(ctx, "stop", unit)
}

pub fn disable(ctx: &Context<'_>, unit: &str) -> Result<(), String> {
    systemctl(ctx, "disable", unit)
}

fn systemctl(ctx: &Context<'_>, action: &str, unit: &str) -> Result<(), String> {
    let result = ctx.exec.run(
        &CommandSpec::new("systemctl")
            .args([action, unit])
            .elevated(),
    );
    if result.is_success() {
        Ok(())
    } else {
        Err(format!(
            "Failed to {action} systemd unit {unit}: {}",
            result.summary()
        ))
    }
}
