//! Automation rules evaluated on product updates.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::sync::Arc;

use batchwise_core::bulk::{
    AutomationEngine, AutomationRule, ChangeType, FilterRule, ModSpec, ModSpecInput, Operator,
    QuotaPolicy, RuleOutcome,
};
use batchwise_core::ports::UsageCounter;
use batchwise_core::{ChangeSource, Field, FieldRegistry};
use batchwise_integration_tests::{Harness, SHOP, sample_catalog};
use uuid::Uuid;

fn rule(
    name: &str,
    filters: Vec<FilterRule>,
    inputs: &[ModSpecInput],
    registry: &FieldRegistry,
) -> AutomationRule {
    AutomationRule {
        id: Uuid::new_v4(),
        name: name.to_string(),
        enabled: true,
        filters,
        modifications: ModSpec::from_inputs(inputs, registry).unwrap(),
    }
}

fn engine(harness: &Harness, quota: QuotaPolicy) -> AutomationEngine {
    AutomationEngine::new(Arc::new(harness.executor()), harness.rules.clone(), quota)
}

#[tokio::test]
async fn test_matching_rule_applies_then_converges() {
    let harness = Harness::new(sample_catalog());
    harness
        .rules
        .add_rule(
            SHOP,
            rule(
                "Clearance compare-at",
                vec![FilterRule::new(Field::Tags, Operator::Contains, "clearance")],
                &[ModSpecInput::new(Field::CompareAtPrice, ChangeType::Exact, "30.00")],
                &harness.registry,
            ),
        )
        .await;
    let engine = engine(&harness, QuotaPolicy::unlimited());

    let lotion = harness.product("1").await.unwrap();
    let runs = engine.on_product_updated(SHOP, lotion).await.unwrap();
    assert_eq!(runs.len(), 1);
    let RuleOutcome::Applied { changeset_id, report } = &runs[0].outcome else {
        panic!("expected rule to apply, got {:?}", runs[0].outcome);
    };
    assert_eq!(report.success_count, 2);

    let records = harness.audit.records().await;
    assert_eq!(records.len(), 1);
    assert_eq!(Some(records[0].summary.id), *changeset_id);
    assert_eq!(records[0].summary.source, ChangeSource::Automation);
    assert_eq!(records[0].summary.name, "Clearance compare-at");

    // the webhook our own update triggers plans nothing
    let updated = harness.product("1").await.unwrap();
    let runs = engine.on_product_updated(SHOP, updated).await.unwrap();
    assert_eq!(runs[0].outcome, RuleOutcome::Converged);
    assert_eq!(harness.audit.records().await.len(), 1);
}

#[tokio::test]
async fn test_rule_with_two_specs_on_one_field_converges() {
    let harness = Harness::new(sample_catalog());
    harness
        .rules
        .add_rule(
            SHOP,
            rule(
                "Balm reprice",
                vec![FilterRule::new(Field::ProductType, Operator::Equals, "Lip Care")],
                &[
                    ModSpecInput::new(Field::Price, ChangeType::Exact, "10.00"),
                    ModSpecInput::new(Field::Price, ChangeType::Exact, "12.00"),
                ],
                &harness.registry,
            ),
        )
        .await;
    let engine = engine(&harness, QuotaPolicy::unlimited());

    let balm = harness.product("3").await.unwrap();
    let runs = engine.on_product_updated(SHOP, balm).await.unwrap();
    let RuleOutcome::Applied { report, .. } = &runs[0].outcome else {
        panic!("expected rule to apply, got {:?}", runs[0].outcome);
    };
    assert_eq!(report.success_count, 1);
    assert_eq!(harness.product("3").await.unwrap().variants[0].price, "12.00");

    for _ in 0..3 {
        let updated = harness.product("3").await.unwrap();
        let runs = engine.on_product_updated(SHOP, updated).await.unwrap();
        assert_eq!(runs[0].outcome, RuleOutcome::Converged);
    }
    assert_eq!(harness.product("3").await.unwrap().variants[0].price, "12.00");
    assert_eq!(harness.audit.records().await.len(), 1);
    assert_eq!(harness.usage.current_usage(SHOP).await.unwrap(), 1);
}

#[tokio::test]
async fn test_non_matching_product_is_left_alone() {
    let harness = Harness::new(sample_catalog());
    harness
        .rules
        .add_rule(
            SHOP,
            rule(
                "Summer draft",
                vec![FilterRule::new(Field::Tags, Operator::Contains, "summer")],
                &[ModSpecInput::new(Field::Status, ChangeType::Set, "DRAFT")],
                &harness.registry,
            ),
        )
        .await;

    let balm = harness.product("3").await.unwrap();
    let runs = engine(&harness, QuotaPolicy::unlimited())
        .on_product_updated(SHOP, balm)
        .await
        .unwrap();

    assert_eq!(runs[0].outcome, RuleOutcome::NotMatched);
    assert!(harness.catalog.calls().await.is_empty());
}

#[tokio::test]
async fn test_later_rules_see_earlier_results() {
    let harness = Harness::new(sample_catalog());
    harness
        .rules
        .add_rule(
            SHOP,
            rule(
                "Feature cheap items",
                vec![FilterRule::new(Field::Price, Operator::LessThan, "10")],
                &[ModSpecInput::new(Field::Tags, ChangeType::Add, "featured")],
                &harness.registry,
            ),
        )
        .await;
    harness
        .rules
        .add_rule(
            SHOP,
            rule(
                "Featured template",
                vec![FilterRule::new(Field::Tags, Operator::Contains, "featured")],
                &[ModSpecInput::new(Field::TemplateSuffix, ChangeType::Set, "featured")],
                &harness.registry,
            ),
        )
        .await;

    let balm = harness.product("3").await.unwrap();
    let runs = engine(&harness, QuotaPolicy::unlimited())
        .on_product_updated(SHOP, balm)
        .await
        .unwrap();

    assert!(matches!(runs[0].outcome, RuleOutcome::Applied { .. }));
    assert!(matches!(runs[1].outcome, RuleOutcome::Applied { .. }));
    let balm = harness.product("3").await.unwrap();
    assert_eq!(balm.tags, vec!["sale", "featured"]);
    assert_eq!(balm.template_suffix.as_deref(), Some("featured"));
}

#[tokio::test]
async fn test_quota_stops_remaining_rules() {
    let harness = Harness::new(sample_catalog());
    for (name, value) in [("Rename", "Lip Balm Classic"), ("Rename again", "Lip Balm Original")] {
        harness
            .rules
            .add_rule(
                SHOP,
                rule(
                    name,
                    Vec::new(),
                    &[ModSpecInput::new(Field::Title, ChangeType::Set, value)],
                    &harness.registry,
                ),
            )
            .await;
    }

    let balm = harness.product("3").await.unwrap();
    let runs = engine(&harness, QuotaPolicy::limited(1))
        .on_product_updated(SHOP, balm)
        .await
        .unwrap();

    assert!(matches!(runs[0].outcome, RuleOutcome::Applied { .. }));
    assert_eq!(runs[1].outcome, RuleOutcome::QuotaExceeded { usage: 1, limit: 1 });
    assert_eq!(harness.usage.current_usage(SHOP).await.unwrap(), 1);
    assert_eq!(harness.product("3").await.unwrap().title, "Lip Balm Classic");
}
