use super::*;

#[test]
fn fresh_token_is_not_cancelled() {
    let t = CancelToken::new();
    assert!(!t.is_cancelled());
}

#[test]
fn cancel_is_visible_through_clones() {
    let a = CancelToken::new();
    let b = a.clone();
    b.cancel();
    assert!(a.is_cancelled());
    assert!(b.is_cancelled());
}

#[tokio::test]
async fn cancelled_future_resolves_after_cancel() {
    let t = CancelToken::new();
    let waiter = {
        let t = t.clone();
        tokio::spawn(async move { t.cancelled().await })
    };
    t.cancel();
    tokio::time::timeout(std::time::Duration::from_secs(1), waiter)
        .await
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn cancelled_future_pends_while_live() {
    let t = CancelToken::new();
    let r = tokio::time::timeout(std::time::Duration::from_millis(20), t.cancelled()).await;
    assert!(r.is_err());
}
