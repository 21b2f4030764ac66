// system-tests/tests/suites/quotas.rs
// ============================================================================
// Module: Quota Tests
// Description: Create, read, update, and delete quotas through the CLI.
// Purpose: Validate the quota command workflow against a live platform.
// Dependencies: system-tests helpers, cf-acceptance-harness
// ============================================================================

//! Quota CRUD coverage for the acceptance suites.

use cf_acceptance_harness::FixtureSet;
use cf_acceptance_harness::HarnessError;
use cf_acceptance_harness::say;
use helpers::context::CfContext;
use helpers::context::Scenario;
use helpers::fixtures::QuotaGuard;

use crate::helpers;

async fn quota_workflow(ctx: CfContext, quota: String) -> Result<(), HarnessError> {
    let name = quota.as_str();
    ctx.expect(["create-quota", name, "-m", "512M"], say("OK")).await?;
    ctx.expect(["quota", name], say("512M")).await?;
    ctx.expect(["quotas"], say(name)).await?;

    ctx.expect(["update-quota", name, "-m", "513M"], say("OK")).await?;
    ctx.expect(["quotas"], say("513M")).await?;

    ctx.expect(["delete-quota", name, "-f"], say("OK")).await?;
    ctx.expect_never(["quotas"], say(name)).await?;
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn quotas_create_read_update_delete() -> Result<(), Box<dyn std::error::Error>> {
    let Some(scenario) = Scenario::start("quotas_create_read_update_delete")? else {
        return Ok(());
    };
    let Scenario {
        mut reporter,
        ctx,
        session,
        names,
    } = scenario;
    let quota = names.quota();

    let fixtures = FixtureSet::new("quotas_create_read_update_delete")
        .with_sink(reporter.transcript())
        .with(session)
        .with(QuotaGuard::new(&ctx, &quota));
    let outcome = fixtures.run(|| quota_workflow(ctx, quota)).await;
    reporter.conclude(outcome)
}
