use std::time::Duration;

use trx_core::config::DirectoryPolicy;
use trx_core::wire::{Envelope, SLOT_COUNT};

use crate::*;

#[tokio::test(start_paused = true)]
async fn hosted_slot_shows_up_in_one_scan() {
    let (_medium, nodes) = nodes(2);
    let (host, guest) = (&nodes[0], &nodes[1]);

    host.create(slot(3), "Kai", "Ops", PASSKEY).await.unwrap();
    assert_eq!(guest.scan().await, 1);

    let directory = guest.directory().snapshot();
    assert_eq!(directory.len(), SLOT_COUNT as usize);
    for status in directory {
        if status.slot_id == slot(3) {
            assert!(status.is_active);
            assert_eq!(status.name, "Ops");
            assert_eq!(status.host_name.as_deref(), Some("Kai"));
        } else {
            assert!(!status.is_active, "slot {} should be idle", status.slot_id);
            assert_eq!(status.name, status.slot_id.default_name());
        }
    }
}

#[tokio::test(start_paused = true)]
async fn background_scanner_picks_up_rename() {
    let (_medium, nodes) = nodes(2);
    let (host, watcher) = (&nodes[0], &nodes[1]);

    host.create(slot(1), "Kai", "Ops", PASSKEY).await.unwrap();
    let scanner = watcher.spawn_scanner();

    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert_eq!(watcher.directory().get(slot(1)).name, "Ops");

    host.rename("Logistics").await.unwrap();
    tokio::time::sleep(Duration::from_millis(3000)).await;
    assert_eq!(watcher.directory().get(slot(1)).name, "Logistics");

    watcher.shutdown().await;
    scanner.await.unwrap().unwrap();
}

#[tokio::test(start_paused = true)]
async fn stale_entry_survives_under_accumulate() {
    let (_medium, nodes) = nodes(2);
    let (host, watcher) = (&nodes[0], &nodes[1]);

    host.create(slot(2), "Kai", "Ops", PASSKEY).await.unwrap();
    watcher.scan().await;
    host.leave().await;
    watcher.scan().await;

    assert!(watcher.directory().get(slot(2)).is_active);
}

#[tokio::test(start_paused = true)]
async fn stale_entry_clears_under_reconcile() {
    let (_medium, nodes) = nodes_with(2, &config(DirectoryPolicy::Reconcile));
    let (host, watcher) = (&nodes[0], &nodes[1]);

    host.create(slot(2), "Kai", "Ops", PASSKEY).await.unwrap();
    watcher.scan().await;
    assert!(watcher.directory().get(slot(2)).is_active);

    host.leave().await;
    watcher.scan().await;
    let two = watcher.directory().get(slot(2));
    assert!(!two.is_active);
    assert_eq!(two.host_name, None);
}

#[tokio::test(start_paused = true)]
async fn host_answers_pings_without_a_passkey() {
    let (medium, nodes) = nodes(1);
    nodes[0].create(slot(4), "Kai", "Ops", PASSKEY).await.unwrap();

    let mut probe = medium.bind_slot(slot(4)).unwrap();
    probe.publish(&Envelope::DiscoveryPing).unwrap();

    let reply = next_envelope(&mut probe, 100).await.expect("pong");
    let json: serde_json::Value = serde_json::from_slice(&reply.to_bytes().unwrap()).unwrap();
    assert_eq!(json["type"], "DISCOVERY_PONG");
    assert_eq!(json["payload"]["slotId"], 4);
    assert!(json.to_string().find(PASSKEY).is_none());
}

#[tokio::test(start_paused = true)]
async fn scanning_does_not_disturb_members() {
    let (_medium, nodes) = nodes(3);
    let (host, guest, watcher) = (&nodes[0], &nodes[1], &nodes[2]);
    host_and_join(host, guest).await.unwrap();

    watcher.scan().await;
    watcher.scan().await;
    settle().await;

    assert!(host.log().is_empty());
    assert!(guest.log().is_empty());
    assert_eq!(watcher.directory().active_count(), 1);
}
