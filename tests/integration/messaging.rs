use trx_core::message::Message;
use trx_core::wire::{Envelope, Passkey};

use crate::*;

#[tokio::test(start_paused = true)]
async fn rally_point_alpha_round_trip() {
    let (_medium, nodes) = nodes(2);
    let (host, guest) = (&nodes[0], &nodes[1]);
    host_and_join(host, guest).await.unwrap();

    let sent = host.send("rally point alpha").await.unwrap().unwrap();
    settle().await;

    let local = host.log().snapshot();
    assert_eq!(local.len(), 1);
    assert!(local[0].is_local);
    assert_eq!(local[0].text, "rally point alpha");

    let heard = single_remote(&guest.log().snapshot()).unwrap();
    assert_eq!(heard.text, sent.text);
    assert_eq!(heard.user_name, "Kai");
    assert_eq!(heard.id, sent.id);
    assert!(!heard.is_local);
}

#[tokio::test(start_paused = true)]
async fn guests_reach_host_and_each_other() {
    let (_medium, nodes) = nodes(3);
    let (host, a, b) = (&nodes[0], &nodes[1], &nodes[2]);
    host.create(slot(1), "Kai", "Ops", PASSKEY).await.unwrap();
    a.join(slot(1), "Mei", PASSKEY).await.unwrap();
    b.join(slot(1), "Ren", PASSKEY).await.unwrap();

    a.send("copy").await.unwrap();
    settle().await;

    assert_eq!(single_remote(&host.log().snapshot()).unwrap().user_name, "Mei");
    assert_eq!(single_remote(&b.log().snapshot()).unwrap().text, "copy");
    assert!(a.log().snapshot()[0].is_local);
}

#[tokio::test(start_paused = true)]
async fn foreign_passkey_transcripts_are_dropped() {
    let (medium, nodes) = nodes(2);
    let (host, guest) = (&nodes[0], &nodes[1]);
    host_and_join(host, guest).await.unwrap();

    let outsider = medium.bind_slot(slot(3)).unwrap();
    outsider
        .publish(&Envelope::transcript(
            &Passkey::parse("999999").unwrap(),
            Message::local("Eve", "listen to me", 1),
        ))
        .unwrap();
    settle().await;

    assert!(host.log().is_empty());
    assert!(guest.log().is_empty());
}

#[tokio::test(start_paused = true)]
async fn whitespace_is_not_sent() {
    let (_medium, nodes) = nodes(2);
    let (host, guest) = (&nodes[0], &nodes[1]);
    host_and_join(host, guest).await.unwrap();

    assert!(host.send(" \t ").await.unwrap().is_none());
    settle().await;
    assert!(host.log().is_empty());
    assert!(guest.log().is_empty());
}

#[tokio::test(start_paused = true)]
async fn order_is_arrival_order() {
    let (_medium, nodes) = nodes(2);
    let (host, guest) = (&nodes[0], &nodes[1]);
    host_and_join(host, guest).await.unwrap();

    for text in ["one", "two", "three"] {
        host.send(text).await.unwrap();
    }
    settle().await;

    let texts: Vec<String> = guest.log().snapshot().into_iter().map(|m| m.text).collect();
    assert_eq!(texts, ["one", "two", "three"]);
}

#[tokio::test(start_paused = true)]
async fn after_leave_nothing_more_arrives() {
    let (_medium, nodes) = nodes(2);
    let (host, guest) = (&nodes[0], &nodes[1]);
    host_and_join(host, guest).await.unwrap();

    host.send("before").await.unwrap();
    settle().await;
    assert_eq!(guest.log().len(), 1);

    guest.leave().await;
    assert!(guest.log().is_empty());

    host.send("after").await.unwrap();
    settle().await;
    assert!(guest.log().is_empty());
}

#[tokio::test(start_paused = true)]
async fn export_and_summary() {
    let (_medium, nodes) = nodes(2);
    let (host, guest) = (&nodes[0], &nodes[1]);
    host_and_join(host, guest).await.unwrap();

    host.send("moving out").await.unwrap();
    guest.send("copy").await.unwrap();
    settle().await;

    let export = host.export_log();
    let lines: Vec<&str> = export.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].ends_with("] Kai: moving out"), "{}", lines[0]);
    assert!(lines[1].ends_with("] Mei: copy"), "{}", lines[1]);

    let summary = host.summarize().await;
    assert!(summary.starts_with("2 messages from 2 speakers"), "{summary}");

    host.clear_log();
    assert_eq!(host.export_log(), "");
    assert_eq!(host.summarize().await, "No transcripts to summarize.");
}
