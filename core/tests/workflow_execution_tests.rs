mod common;

use common::*;
use serial_test::serial;
use std::sync::Arc;
use storeflow::{Control, Ctx, FlowError, Outcome, SkipIf, Workflow};

#[tokio::test]
#[serial]
async fn stages_run_in_declared_order() {
  setup_tracing();
  let mut flow = Workflow::<OrderDraft, TestError>::new(&[
    ("price_lines", false, None),
    ("add_shipping", false, None),
    ("apply_discount", false, None),
  ]);
  flow.on("price_lines", add_amount("price_lines", 120_000)).unwrap();
  flow.on("add_shipping", add_amount("add_shipping", 30_000)).unwrap();
  flow.on("apply_discount", add_amount("apply_discount", -10_000)).unwrap();

  let ctx = Ctx::new(OrderDraft::default());
  let outcome = flow.run(ctx.clone()).await.unwrap();

  assert_eq!(outcome, Outcome::Completed);
  let draft = ctx.read();
  assert_eq!(draft.total, 140_000);
  assert_eq!(draft.trail, vec!["price_lines", "add_shipping", "apply_discount"]);
}

#[tokio::test]
#[serial]
async fn halt_stops_remaining_stages() {
  setup_tracing();
  let mut flow = Workflow::<OrderDraft, TestError>::new(&[
    ("validate", false, None),
    ("persist", false, None),
    ("notify", false, None),
  ]);
  flow.on("validate", add_amount("validate", 0)).unwrap();
  flow.on("persist", add_amount("persist", 1)).unwrap();
  flow.on("notify", add_amount("notify", 1)).unwrap();

  let ctx = Ctx::new(OrderDraft {
    halt_at: Some("persist".to_string()),
    ..Default::default()
  });
  let outcome = flow.run(ctx.clone()).await.unwrap();

  assert_eq!(outcome, Outcome::Halted);
  assert_eq!(ctx.read().trail, vec!["validate", "persist"]);
}

#[tokio::test]
#[serial]
async fn required_stage_error_aborts_run() {
  setup_tracing();
  let mut flow = Workflow::<OrderDraft, TestError>::new(&[
    ("reserve_stock", false, None),
    ("persist", false, None),
    ("notify", false, None),
  ]);
  flow.on("reserve_stock", add_amount("reserve_stock", 5)).unwrap();
  flow.on("persist", fail_with("persist", "unique violation")).unwrap();
  flow.on("notify", add_amount("notify", 5)).unwrap();

  let ctx = Ctx::new(OrderDraft::default());
  let err = flow.run(ctx.clone()).await.unwrap_err();

  assert_eq!(err, TestError::Handler("unique violation".to_string()));
  assert_eq!(ctx.read().trail, vec!["reserve_stock", "persist"]);
}

#[tokio::test]
#[serial]
async fn optional_stage_error_is_swallowed() {
  setup_tracing();
  let mut flow = Workflow::<OrderDraft, TestError>::new(&[
    ("persist", false, None),
    ("send_confirmation", true, None),
    ("respond", false, None),
  ]);
  flow.on("persist", add_amount("persist", 1)).unwrap();
  flow.on("send_confirmation", fail_with("send_confirmation", "smtp down")).unwrap();
  flow
    .after("send_confirmation", |ctx: Ctx<OrderDraft>| async move {
      ctx.write().email_sent = true;
      Ok::<_, TestError>(Control::Continue)
    })
    .unwrap();
  flow.on("respond", add_amount("respond", 1)).unwrap();

  let ctx = Ctx::new(OrderDraft::default());
  let outcome = flow.run(ctx.clone()).await.unwrap();

  assert_eq!(outcome, Outcome::Completed);
  let draft = ctx.read();
  assert_eq!(draft.trail, vec!["persist", "send_confirmation", "respond"]);
  assert!(!draft.email_sent, "after handler must not run once the stage failed");
}

#[tokio::test]
#[serial]
async fn skip_if_predicate_skips_stage() {
  setup_tracing();
  let below_minimum: SkipIf<OrderDraft> = Arc::new(|ctx: Ctx<OrderDraft>| ctx.read().total < 100_000);
  let mut flow = Workflow::<OrderDraft, TestError>::new(&[
    ("price_lines", false, None),
    ("apply_promotion", false, Some(below_minimum)),
  ]);
  flow.on("price_lines", add_amount("price_lines", 50_000)).unwrap();
  flow.on("apply_promotion", add_amount("apply_promotion", -5_000)).unwrap();

  let ctx = Ctx::new(OrderDraft::default());
  flow.run(ctx.clone()).await.unwrap();

  assert_eq!(ctx.read().total, 50_000);
  assert_eq!(ctx.read().trail, vec!["price_lines"]);
}

#[tokio::test]
#[serial]
async fn skip_if_can_be_replaced_after_construction() {
  setup_tracing();
  let mut flow = Workflow::<OrderDraft, TestError>::new(&[
    ("price_lines", false, None),
    ("apply_promotion", false, None),
  ]);
  flow.on("price_lines", add_amount("price_lines", 50_000)).unwrap();
  flow.on("apply_promotion", add_amount("apply_promotion", -5_000)).unwrap();

  let always: SkipIf<OrderDraft> = Arc::new(|_ctx: Ctx<OrderDraft>| true);
  flow.set_skip_if("apply_promotion", Some(always)).unwrap();
  let ctx = Ctx::new(OrderDraft::default());
  flow.run(ctx.clone()).await.unwrap();
  assert_eq!(ctx.read().trail, vec!["price_lines"]);

  flow.set_skip_if("apply_promotion", None).unwrap();
  let ctx = Ctx::new(OrderDraft::default());
  flow.run(ctx.clone()).await.unwrap();
  assert_eq!(ctx.read().total, 45_000);

  let err = flow.set_skip_if("missing", None).unwrap_err();
  assert!(matches!(err, FlowError::UnknownStage { ref stage } if stage == "missing"));
}

#[tokio::test]
#[serial]
async fn required_stage_without_handlers_fails() {
  setup_tracing();
  let flow = Workflow::<OrderDraft, TestError>::new(&[("persist", false, None)]);

  let err = flow.run(Ctx::new(OrderDraft::default())).await.unwrap_err();
  match err {
    TestError::Flow(msg) => {
      assert!(msg.contains("HandlerMissing"));
      assert!(msg.contains("persist"));
    }
    other => panic!("expected flow error, got {other:?}"),
  }
}

#[tokio::test]
#[serial]
async fn optional_stage_without_handlers_is_skipped() {
  setup_tracing();
  let flow = Workflow::<OrderDraft, TestError>::new(&[("merge_guest_cart", true, None)]);
  let outcome = flow.run(Ctx::new(OrderDraft::default())).await.unwrap();
  assert_eq!(outcome, Outcome::Completed);
}

#[tokio::test]
#[serial]
async fn phases_run_before_on_after() {
  setup_tracing();
  let mut flow = Workflow::<OrderDraft, TestError>::new(&[("persist", false, None)]);
  flow.after("persist", add_amount("after", 1)).unwrap();
  flow.on("persist", add_amount("on", 1)).unwrap();
  flow.before("persist", add_amount("before", 1)).unwrap();

  let ctx = Ctx::new(OrderDraft::default());
  flow.run(ctx.clone()).await.unwrap();
  assert_eq!(ctx.read().trail, vec!["before", "on", "after"]);
}

#[tokio::test]
#[serial]
async fn structural_edits_reshape_the_workflow() {
  setup_tracing();
  let mut flow = Workflow::<OrderDraft, TestError>::new(&[("validate", false, None), ("persist", false, None)]);

  flow.insert_before("persist", "price_lines", false, None).unwrap();
  flow.insert_after("persist", "notify", true, None).unwrap();
  assert_eq!(flow.stage_names(), vec!["validate", "price_lines", "persist", "notify"]);

  let dup = flow.insert_after("validate", "persist", false, None).unwrap_err();
  assert!(matches!(dup, FlowError::DuplicateStage { .. }));

  let unknown = flow.on("missing", add_amount("missing", 1)).unwrap_err();
  assert!(matches!(unknown, FlowError::UnknownStage { .. }));

  flow.on("notify", add_amount("notify", 1)).unwrap();
  flow.remove_stage("notify").unwrap();
  assert_eq!(flow.handler_count("notify"), 0);
  assert_eq!(flow.stage_names(), vec!["validate", "price_lines", "persist"]);
  let gone = flow.remove_stage("notify").unwrap_err();
  assert!(matches!(gone, FlowError::UnknownStage { ref stage } if stage == "notify"));
  assert_eq!(flow.stage_names(), vec!["validate", "price_lines", "persist"]);

  flow.set_optional("price_lines", true).unwrap();
  assert!(flow.stage("price_lines").map(|s| s.optional).unwrap_or(false));
}
