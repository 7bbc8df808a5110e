//! Tests for While statements

use super::helpers::Harness;
use crate::executor::errors;
use crate::executor::{ExecError, Value, MAX_LOOP_ITERATIONS};
use maplit::hashmap;

#[tokio::test]
async fn test_while_counts_down_three_times() {
    let harness = Harness::new();
    let (result, ctx) = harness
        .run_with_context(
            r#"
            int n = 3;
            int runs = 0;
            while (n) {
                cal n = n - 1;
                cal runs = runs + 1;
            }
            output r = runs;
        "#,
        )
        .await;

    assert_eq!(result.unwrap().value, Value::Int(3));
    assert_eq!(ctx.get("n"), Some(&Value::Int(0)));
}

#[tokio::test]
async fn test_while_zero_iterations() {
    let harness = Harness::new();

    let outcome = harness
        .run(
            "int n = 0; def hit = false; while (n) { set hit = true; } output r = hit;",
            hashmap! {},
        )
        .await
        .unwrap();

    assert_eq!(outcome.value, Value::Bool(false));
}

#[tokio::test]
async fn test_while_boolean_condition() {
    let harness = Harness::new();

    let outcome = harness
        .run(
            r#"
            def go = true;
            int n = 2;
            while (go) {
                cal n = n - 1;
                if (n) { set go = true; }
                set go = false;
            }
            output r = n;
        "#,
            hashmap! {},
        )
        .await
        .unwrap();

    assert_eq!(outcome.value, Value::Int(1));
}

#[tokio::test]
async fn test_runaway_loop_hits_default_cap() {
    let harness = Harness::new();
    let (result, ctx) = harness
        .run_with_context(
            "def go = true; int i = 0; while (go) { cal i = i + 1; } output r = i;",
        )
        .await;

    match result.unwrap_err() {
        ExecError::IterationLimitExceeded { cond, limit } => {
            assert_eq!(cond, "go");
            assert_eq!(limit, MAX_LOOP_ITERATIONS);
        }
        other => panic!("Expected IterationLimitExceeded, got {:?}", other),
    }
    assert_eq!(ctx.get("i"), Some(&Value::Int(MAX_LOOP_ITERATIONS as i64)));
}

#[tokio::test]
async fn test_custom_loop_cap() {
    let harness = Harness::new().with_max_loop_iterations(5);
    let (result, ctx) = harness
        .run_with_context("def go = true; int i = 0; while (go) { cal i = i + 1; }")
        .await;

    assert_eq!(result.unwrap_err().code(), errors::ITERATION_LIMIT_EXCEEDED);
    assert_eq!(ctx.get("i"), Some(&Value::Int(5)));
}

#[tokio::test]
async fn test_loop_of_exactly_cap_iterations_succeeds() {
    let harness = Harness::new().with_max_loop_iterations(4);

    let outcome = harness
        .run("int n = 4; while (n) { cal n = n - 1; } output r = n;", hashmap! {})
        .await
        .unwrap();

    assert_eq!(outcome.value, Value::Int(0));
}

#[tokio::test]
async fn test_nested_loops() {
    let harness = Harness::new();

    let outcome = harness
        .run(
            r#"
            int outer = 3;
            int total = 0;
            while (outer) {
                int inner = 2;
                while (inner) {
                    cal inner = inner - 1;
                    cal total = total + 1;
                }
                cal outer = outer - 1;
            }
            output r = total;
        "#,
            hashmap! {},
        )
        .await
        .unwrap();

    assert_eq!(outcome.value, Value::Int(6));
}

#[tokio::test]
async fn test_loop_error_in_body_aborts() {
    let harness = Harness::new();

    let err = harness
        .run("int n = 2; while (n) { cal n = n * 1; }", hashmap! {})
        .await
        .unwrap_err();

    assert_eq!(err.code(), errors::UNSUPPORTED_OPERATOR);
}
