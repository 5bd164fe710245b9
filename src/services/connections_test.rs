use super::*;

#[tokio::test]
async fn broadcast_reaches_every_client() {
    let manager = ConnectionManager::new();
    let (tx_a, mut rx_a) = mpsc::channel(8);
    let (tx_b, mut rx_b) = mpsc::channel(8);
    manager.connect("a", tx_a).await;
    manager.connect("b", tx_b).await;

    assert_eq!(manager.broadcast("hello").await, 2);
    assert_eq!(rx_a.recv().await.as_deref(), Some("hello"));
    assert_eq!(rx_b.recv().await.as_deref(), Some("hello"));
}

#[tokio::test]
async fn personal_message_only_reaches_target() {
    let manager = ConnectionManager::new();
    let (tx_a, mut rx_a) = mpsc::channel(8);
    let (tx_b, mut rx_b) = mpsc::channel(8);
    manager.connect("a", tx_a).await;
    manager.connect("b", tx_b).await;

    assert!(manager.send_personal("a", "just you").await);
    assert_eq!(rx_a.recv().await.as_deref(), Some("just you"));
    assert!(rx_b.try_recv().is_err());
}

#[tokio::test]
async fn personal_message_to_unknown_client_is_false() {
    let manager = ConnectionManager::new();
    assert!(!manager.send_personal("ghost", "hi").await);
}

#[tokio::test]
async fn disconnect_removes_client() {
    let manager = ConnectionManager::new();
    let (tx, _rx) = mpsc::channel(8);
    manager.connect("a", tx.clone()).await;
    assert_eq!(manager.count().await, 1);

    assert!(manager.disconnect("a", &tx).await);
    assert!(!manager.disconnect("a", &tx).await);
    assert_eq!(manager.count().await, 0);
}

#[tokio::test]
async fn broadcast_prunes_closed_channels() {
    let manager = ConnectionManager::new();
    let (tx_live, mut rx_live) = mpsc::channel(8);
    let (tx_dead, rx_dead) = mpsc::channel(8);
    manager.connect("live", tx_live).await;
    manager.connect("dead", tx_dead).await;
    drop(rx_dead);

    assert_eq!(manager.broadcast("ping").await, 1);
    assert_eq!(rx_live.recv().await.as_deref(), Some("ping"));
    assert_eq!(manager.count().await, 1);
}

#[tokio::test]
async fn reconnect_replaces_sender() {
    let manager = ConnectionManager::new();
    let (old_tx, mut old_rx) = mpsc::channel(8);
    let (new_tx, mut new_rx) = mpsc::channel(8);
    manager.connect("a", old_tx).await;
    manager.connect("a", new_tx).await;

    manager.send_personal("a", "latest").await;
    assert_eq!(new_rx.recv().await.as_deref(), Some("latest"));
    assert!(old_rx.try_recv().is_err());
    assert_eq!(manager.count().await, 1);
}

#[tokio::test]
async fn stale_disconnect_keeps_the_reconnected_sender() {
    let manager = ConnectionManager::new();
    let (old_tx, _old_rx) = mpsc::channel(8);
    let (new_tx, mut new_rx) = mpsc::channel(8);
    manager.connect("a", old_tx.clone()).await;
    manager.connect("a", new_tx.clone()).await;

    assert!(!manager.disconnect("a", &old_tx).await);

    assert_eq!(manager.count().await, 1);
    assert!(manager.send_personal("a", "still here").await);
    assert_eq!(new_rx.recv().await.as_deref(), Some("still here"));
    assert!(manager.disconnect("a", &new_tx).await);
    assert_eq!(manager.count().await, 0);
}
