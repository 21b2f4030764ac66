// system-tests/tests/suites/security_groups.rs
// ============================================================================
// Module: Security Group Tests
// Description: Security group CRUD, default binds, and org/space binds.
// Purpose: Validate security group workflows against a live platform.
// Dependencies: system-tests helpers, cf-acceptance-harness
// ============================================================================

//! Security group coverage for the acceptance suites.
//!
//! Every test runs with a fresh security group (empty rules), org, and space.
//! Teardown deletes the group while targeting the org and space, confirms the
//! group is gone, then deletes the space and the org.

use std::error::Error;

use cf_acceptance_harness::FixtureNames;
use cf_acceptance_harness::FixtureSet;
use cf_acceptance_harness::HarnessError;
use cf_acceptance_harness::say;
use helpers::context::CfContext;
use helpers::context::Scenario;
use helpers::fixtures::OrgFixture;
use helpers::fixtures::SecurityGroupFixture;
use helpers::fixtures::SpaceFixture;
use helpers::fixtures::with_rules_file;

use crate::helpers;

const TCP_RULES: &str = r#"[{"protocol": "tcp", "ports": "8080-8081", "destination": "8.8.8.8"}]"#;

/// Runs `body` between security group, org, and space fixtures.
async fn with_security_group<F, Fut>(test_name: &str, body: F) -> Result<(), Box<dyn Error>>
where
    F: FnOnce(CfContext, FixtureNames) -> Fut,
    Fut: Future<Output = Result<(), HarnessError>> + Send + 'static,
{
    let Some(scenario) = Scenario::start(test_name)? else {
        return Ok(());
    };
    let Scenario {
        mut reporter,
        ctx,
        session,
        names,
    } = scenario;
    let (group, org, space) = (names.security_group(), names.org(), names.space());

    let fixtures = FixtureSet::new(test_name)
        .with_sink(reporter.transcript())
        .with(session)
        .with(OrgFixture::new(&ctx, &org))
        .with(SpaceFixture::new(&ctx, &space, &org))
        .with(SecurityGroupFixture::new(&ctx, &group, &org, &space));
    let outcome = fixtures.run(|| body(ctx, names)).await;
    reporter.conclude(outcome)
}

#[tokio::test(flavor = "multi_thread")]
async fn security_group_crud_workflow() -> Result<(), Box<dyn Error>> {
    with_security_group("security_group_crud_workflow", |ctx, names| async move {
        let group = names.security_group();
        ctx.expect(["security-group", group.as_str()], say("Rules")).await?;

        with_rules_file(TCP_RULES, |path| {
            let ctx = &ctx;
            let group = group.as_str();
            async move {
                ctx.expect(["update-security-group", group, path.as_str()], say("OK")).await
            }
        })
        .await?;
        ctx.expect(["security-group", group.as_str()], say("8.8.8.8")).await?;

        ctx.expect(["security-groups"], say(group.as_str())).await?;
        Ok(())
    })
    .await
}

#[tokio::test(flavor = "multi_thread")]
async fn staging_security_group_default_binding() -> Result<(), Box<dyn Error>> {
    with_security_group("staging_security_group_default_binding", |ctx, names| async move {
        let group = names.security_group();
        ctx.expect_never(["staging-security-groups"], say(group.as_str())).await?;

        ctx.expect(["bind-staging-security-group", group.as_str()], say("OK")).await?;
        ctx.expect(["staging-security-groups"], say(group.as_str())).await?;

        ctx.expect(["unbind-staging-security-group", group.as_str()], say("OK")).await?;
        ctx.expect_never(["staging-security-groups"], say(group.as_str())).await?;
        Ok(())
    })
    .await
}

#[tokio::test(flavor = "multi_thread")]
async fn running_security_group_default_binding() -> Result<(), Box<dyn Error>> {
    with_security_group("running_security_group_default_binding", |ctx, names| async move {
        let group = names.security_group();
        ctx.expect_never(["running-security-groups"], say(group.as_str())).await?;

        ctx.expect(["bind-running-security-group", group.as_str()], say("OK")).await?;
        ctx.expect(["running-security-groups"], say(group.as_str())).await?;

        ctx.expect(["unbind-running-security-group", group.as_str()], say("OK")).await?;
        ctx.expect_never(["running-security-groups"], say(group.as_str())).await?;
        Ok(())
    })
    .await
}

#[tokio::test(flavor = "multi_thread")]
async fn security_group_space_binding() -> Result<(), Box<dyn Error>> {
    with_security_group("security_group_space_binding", |ctx, names| async move {
        let (group, org, space) = (names.security_group(), names.org(), names.space());
        let bind_args = [group.as_str(), org.as_str(), space.as_str()];

        let bind = ["bind-security-group"].into_iter().chain(bind_args);
        ctx.expect(bind, say("OK")).await?;
        ctx.expect(["security-group", group.as_str()], say(space.as_str())).await?;

        let unbind = ["unbind-security-group"].into_iter().chain(bind_args);
        ctx.expect(unbind, say("OK")).await?;
        ctx.expect_never(["security-group", group.as_str()], say(space.as_str())).await?;
        Ok(())
    })
    .await
}
