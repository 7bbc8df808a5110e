//! Tests for `int` and `cal`

use super::helpers::Harness;
use crate::executor::errors;
use crate::executor::{ExecError, Value};
use maplit::hashmap;

#[tokio::test]
async fn test_cal_add() {
    let harness = Harness::new();

    let outcome = harness
        .run("int s = 10; cal t = s + 5; output r = t;", hashmap! {})
        .await
        .unwrap();

    assert_eq!(outcome.value, Value::Int(15));
}

#[tokio::test]
async fn test_cal_sub() {
    let harness = Harness::new();

    let outcome = harness
        .run("int s = 10; cal t = s - 5; output r = t;", hashmap! {})
        .await
        .unwrap();

    assert_eq!(outcome.value, Value::Int(5));
}

#[tokio::test]
async fn test_cal_leaves_source_untouched() {
    let harness = Harness::new();
    let (result, ctx) = harness
        .run_with_context("int s = 10; cal t = s + -3; output r = t;")
        .await;

    assert_eq!(result.unwrap().value, Value::Int(7));
    assert_eq!(ctx.get("s"), Some(&Value::Int(10)));
}

#[tokio::test]
async fn test_cal_unsupported_operators() {
    for op in ["*", "/", "%"] {
        let harness = Harness::new();
        let source = format!("int s = 10; cal t = s {} 5; output r = t;", op);

        let err = harness.run(&source, hashmap! {}).await.unwrap_err();

        assert!(
            matches!(err, ExecError::UnsupportedOperator(ref sym) if sym == op),
            "got {:?}",
            err
        );
        assert_eq!(err.code(), errors::UNSUPPORTED_OPERATOR);
    }
}

#[tokio::test]
async fn test_cal_on_def_number_is_type_error() {
    let harness = Harness::new();

    let err = harness
        .run("def s = 10; cal t = s + 1; output r = t;", hashmap! {})
        .await
        .unwrap_err();

    assert_eq!(err.code(), errors::TYPE_ERROR);
}

#[tokio::test]
async fn test_cal_on_string_param_is_type_error() {
    let harness = Harness::new();

    let err = harness
        .run(
            "cal t = s + 1; output r = t;",
            hashmap! { "s".to_string() => "10".to_string() },
        )
        .await
        .unwrap_err();

    assert_eq!(err.code(), errors::TYPE_ERROR);
}

#[tokio::test]
async fn test_cal_on_unbound_source_fails() {
    let harness = Harness::new();

    let err = harness.run("cal t = s + 1;", hashmap! {}).await.unwrap_err();

    assert_eq!(err.code(), errors::UNDEFINED_VARIABLE);
}

#[tokio::test]
async fn test_cal_overflow_is_reported() {
    let harness = Harness::new();

    let err = harness
        .run("int s = 9223372036854775807; cal t = s + 1;", hashmap! {})
        .await
        .unwrap_err();

    assert_eq!(err.code(), errors::INTEGER_OVERFLOW);
}
