//! End-to-end foreground scenarios: a post sent while unreachable is queued,
//! replayed on the retry signal, and confirmed; a feed read while reachable
//! flows straight through with no store mutation.

mod common;

use common::rig;
use driftsync::types::{ClientCommand, ClientEvent, Partition, RetryTag};
use driftsync::{SyncWorker, WorkerConfig};

#[tokio::test]
async fn test_send_post_offline_then_drain_confirms() {
    let rig = rig(false);
    let (listener, mut events) = rig.worker.attach();

    rig.worker
        .on_message(
            listener,
            ClientCommand::SendPost {
                url: "https://store/x?title=Hi".into(),
            },
        )
        .await
        .unwrap();

    // Queued durably under the outbound partition with the exact URL.
    let store = rig.worker.store().unwrap();
    let entries = store.list_all(Partition::OutboundPosts).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].url, "https://store/x?title=Hi");
    assert_eq!(rig.scheduler.registered(), vec![RetryTag::SendPosts]);
    assert!(events.try_recv().is_err());

    // Network comes back; the host fires the registered tag.
    rig.fetcher.set_online(true);
    let report = rig.worker.on_sync(RetryTag::SendPosts).await.unwrap();
    assert_eq!(report.delivered, 1);

    assert!(store.is_empty(Partition::OutboundPosts));
    assert_eq!(events.recv().await.unwrap(), ClientEvent::PostsSent);
}

#[tokio::test]
async fn test_get_posts_online_flows_through_without_store_mutation() {
    let rig = rig(true);
    rig.fetcher.set_body(
        "https://store/x",
        br#"[{"title":"A","text":"B","date":1,"user":"U"}]"#,
    );
    let (listener, mut events) = rig.worker.attach();

    rig.worker
        .on_message(
            listener,
            ClientCommand::GetPosts {
                url: "https://store/x".into(),
            },
        )
        .await
        .unwrap();

    match events.recv().await.unwrap() {
        ClientEvent::GotPosts { posts } => {
            assert_eq!(posts.len(), 1);
            assert_eq!(posts[0].title, "A");
            assert_eq!(posts[0].text, "B");
            assert_eq!(posts[0].user, "U");
        }
        other => panic!("expected GotPosts, got {:?}", other),
    }

    let store = rig.worker.store().unwrap();
    assert!(store.is_empty(Partition::OutboundPosts));
    assert!(store.is_empty(Partition::PendingReads));
    assert!(rig.scheduler.registered().is_empty());
}

#[tokio::test]
async fn test_get_posts_offline_then_drain_delivers_feed() {
    let rig = rig(false);
    let (listener, mut events) = rig.worker.attach();

    rig.worker
        .on_message(
            listener,
            ClientCommand::GetPosts {
                url: "https://store/x".into(),
            },
        )
        .await
        .unwrap();
    assert_eq!(rig.scheduler.registered(), vec![RetryTag::GetPosts]);

    rig.fetcher.set_online(true);
    rig.fetcher
        .set_body("https://store/x", br#"[{"title":"Later","user":"U"}]"#);
    rig.worker.on_sync(RetryTag::GetPosts).await.unwrap();

    match events.recv().await.unwrap() {
        ClientEvent::GotPosts { posts } => {
            assert_eq!(posts.len(), 1);
            assert_eq!(posts[0].title, "Later");
        }
        other => panic!("expected GotPosts, got {:?}", other),
    }
}

#[tokio::test]
async fn test_waiting_posts_reflects_queue_and_clears_after_drain() {
    let rig = rig(false);
    let (listener, mut events) = rig.worker.attach();

    rig.worker
        .on_message(
            listener,
            ClientCommand::SendPost {
                url: "https://store/x?title=Hi".into(),
            },
        )
        .await
        .unwrap();

    rig.worker
        .on_message(listener, ClientCommand::WaitingPosts)
        .await
        .unwrap();
    assert_eq!(
        events.recv().await.unwrap(),
        ClientEvent::WaitingPosts {
            urls: vec!["https://store/x?title=Hi".to_string()]
        }
    );

    rig.fetcher.set_online(true);
    rig.worker.on_sync(RetryTag::SendPosts).await.unwrap();
    assert_eq!(events.recv().await.unwrap(), ClientEvent::PostsSent);

    rig.worker
        .on_message(listener, ClientCommand::WaitingPosts)
        .await
        .unwrap();
    assert_eq!(
        events.recv().await.unwrap(),
        ClientEvent::WaitingPosts { urls: vec![] }
    );
}

#[tokio::test]
async fn test_queued_entries_survive_restart() {
    let fetcher = common::ScriptedFetcher::new(false);
    let scheduler = common::RecordingScheduler::new();
    let dir = tempfile::TempDir::new().unwrap();
    let config = WorkerConfig::load_or_default(dir.path());

    {
        let worker =
            SyncWorker::open(config.clone(), fetcher.clone(), scheduler.clone()).unwrap();
        let (listener, _events) = worker.attach();
        worker
            .on_message(
                listener,
                ClientCommand::SendPost {
                    url: "https://store/x?title=Persist".into(),
                },
            )
            .await
            .unwrap();
    }

    // A new worker instance over the same data dir sees the entry and
    // drains it once the network is reachable.
    let worker = SyncWorker::open(config, fetcher.clone(), scheduler).unwrap();
    let (_listener, mut events) = worker.attach();
    let store = worker.store().unwrap();
    assert_eq!(
        store.urls(Partition::OutboundPosts).unwrap(),
        vec!["https://store/x?title=Persist"]
    );

    fetcher.set_online(true);
    let report = worker.on_sync(RetryTag::SendPosts).await.unwrap();
    assert_eq!(report.delivered, 1);
    assert_eq!(events.recv().await.unwrap(), ClientEvent::PostsSent);
}

#[tokio::test]
async fn test_listener_attached_mid_flight_receives_broadcast() {
    let rig = rig(false);
    let (listener, _early_events) = rig.worker.attach();

    rig.worker
        .on_message(
            listener,
            ClientCommand::SendPost {
                url: "https://store/x".into(),
            },
        )
        .await
        .unwrap();

    // Attach after the triggering event began; broadcast still reaches it.
    let (_late, mut late_events) = rig.worker.attach();
    rig.fetcher.set_online(true);
    rig.worker.on_sync(RetryTag::SendPosts).await.unwrap();
    assert_eq!(late_events.recv().await.unwrap(), ClientEvent::PostsSent);
}
