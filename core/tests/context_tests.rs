mod common;

use common::*;
use serial_test::serial;
use std::time::Duration;
use storeflow::{Control, Ctx, Workflow};

#[tokio::test]
#[serial]
async fn clones_share_state() {
  setup_tracing();
  let ctx = Ctx::new(OrderDraft::default());
  let other = ctx.clone();
  other.write().total = 42;
  assert_eq!(ctx.read().total, 42);
}

#[tokio::test]
#[serial]
async fn mapped_guards_expose_a_field() {
  setup_tracing();
  let ctx = Ctx::new(OrderDraft::default());
  ctx.map_write(|d| &mut d.trail).push("mapped".to_string());
  assert_eq!(&*ctx.map_read(|d| &d.trail), &vec!["mapped".to_string()]);
}

#[tokio::test]
#[serial]
async fn try_write_fails_while_read_guard_is_held() {
  setup_tracing();
  let ctx = Ctx::new(OrderDraft::default());
  let guard = ctx.read();
  assert!(ctx.try_write().is_none());
  drop(guard);
  assert!(ctx.try_write().is_some());

  let writer = ctx.write();
  assert!(ctx.try_read().is_none());
  drop(writer);
  assert!(ctx.try_read().is_some());
}

#[tokio::test]
#[serial]
async fn into_inner_requires_last_handle() {
  setup_tracing();
  let ctx = Ctx::new(OrderDraft::default());
  let extra = ctx.clone();
  let ctx = ctx.into_inner().unwrap_err();
  drop(extra);
  assert_eq!(ctx.into_inner().unwrap().total, 0);
}

#[tokio::test]
#[serial]
async fn handlers_release_locks_across_await() {
  setup_tracing();
  let mut flow = Workflow::<OrderDraft, TestError>::new(&[("slow", false, None)]);
  flow
    .on("slow", |ctx: Ctx<OrderDraft>| async move {
      let current = ctx.read().total;
      tokio::time::sleep(Duration::from_millis(5)).await;
      ctx.write().total = current + 1;
      Ok::<_, TestError>(Control::Continue)
    })
    .unwrap();

  let ctx = Ctx::new(OrderDraft::default());
  flow.run(ctx.clone()).await.unwrap();
  assert_eq!(ctx.read().total, 1);
}
