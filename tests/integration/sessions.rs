use trx_core::TrxError;
use trx_services::Role;

use crate::*;

#[tokio::test(start_paused = true)]
async fn wrong_passkey_then_right_one() {
    let (_medium, nodes) = nodes(2);
    let (host, guest) = (&nodes[0], &nodes[1]);

    host.create(slot(3), "Kai", "Ops", PASSKEY).await.unwrap();
    guest.scan().await;

    let err = guest.join(slot(3), "Mei", "000000").await.unwrap_err();
    assert!(matches!(err, TrxError::WrongPasskey));
    assert!(guest.current_session().is_none());
    assert_eq!(guest.bound_slot(), None);

    let session = guest.join(slot(3), "Mei", PASSKEY).await.unwrap();
    assert_eq!(session.role, Role::Guest);
    assert_eq!(session.slot, slot(3));
    assert_eq!(session.channel_name, "Ops");
    assert_eq!(guest.bound_slot(), Some(slot(3)));
}

#[tokio::test(start_paused = true)]
async fn guest_takes_channel_name_from_directory() {
    let (_medium, nodes) = nodes(2);
    let (host, guest) = (&nodes[0], &nodes[1]);

    host.create(slot(5), "Kai", "Night Shift", PASSKEY).await.unwrap();

    // Joining without a scan still works; the name falls back to the slot default.
    let session = guest.join(slot(5), "Mei", PASSKEY).await.unwrap();
    assert_eq!(session.channel_name, "Transceiver 05");
    guest.leave().await;

    guest.scan().await;
    let session = guest.join(slot(5), "Mei", PASSKEY).await.unwrap();
    assert_eq!(session.channel_name, "Night Shift");
}

#[tokio::test(start_paused = true)]
async fn several_guests_share_one_host() {
    let (_medium, nodes) = nodes(3);
    let host = &nodes[0];
    host.create(slot(1), "Kai", "Ops", PASSKEY).await.unwrap();

    for (guest, name) in nodes[1..].iter().zip(["Mei", "Ren"]) {
        let session = guest.join(slot(1), name, PASSKEY).await.unwrap();
        assert_eq!(session.role, Role::Guest);
    }
}

#[tokio::test(start_paused = true)]
async fn only_the_host_can_rename() {
    let (_medium, nodes) = nodes(2);
    let (host, guest) = (&nodes[0], &nodes[1]);
    host_and_join(host, guest).await.unwrap();

    assert!(matches!(guest.rename("Mine now").await, Err(TrxError::NotHost)));
    assert!(!host.rename("  ").await.unwrap());
    assert!(host.rename("Logistics").await.unwrap());
    assert_eq!(host.current_session().unwrap().channel_name, "Logistics");
}

#[tokio::test(start_paused = true)]
async fn one_session_at_a_time() {
    let (_medium, nodes) = nodes(2);
    let (host, guest) = (&nodes[0], &nodes[1]);
    host_and_join(host, guest).await.unwrap();

    assert!(matches!(
        guest.join(slot(3), "Mei", PASSKEY).await,
        Err(TrxError::AlreadyInSession(3))
    ));
    assert!(matches!(
        guest.create(slot(2), "Mei", "Side", PASSKEY).await,
        Err(TrxError::AlreadyInSession(3))
    ));
}

#[tokio::test(start_paused = true)]
async fn cannot_create_over_a_live_host() {
    let (medium, nodes) = nodes(2);
    let (kai, ren) = (&nodes[0], &nodes[1]);

    kai.create(slot(3), "Kai", "Ops", "123456").await.unwrap();
    ren.scan().await;

    assert!(matches!(
        ren.create(slot(3), "Ren", "Takeover", "654321").await,
        Err(TrxError::SlotOccupied(3))
    ));
    assert!(ren.current_session().is_none());
    assert_eq!(ren.bound_slot(), None);
    assert_eq!(medium.bound_count(&slot(3).topic_name()), 1);

    // A free slot is still fine.
    ren.create(slot(4), "Ren", "Side", "654321").await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn leave_releases_topic_and_allows_rejoin() {
    let (medium, nodes) = nodes(2);
    let (host, guest) = (&nodes[0], &nodes[1]);
    host_and_join(host, guest).await.unwrap();
    assert_eq!(medium.bound_count(&slot(3).topic_name()), 2);

    let ended = guest.leave().await.unwrap();
    assert_eq!(ended.role, Role::Guest);
    assert_eq!(medium.bound_count(&slot(3).topic_name()), 1);

    guest.join(slot(3), "Mei", PASSKEY).await.unwrap();
    assert_eq!(medium.bound_count(&slot(3).topic_name()), 2);
}

#[tokio::test(start_paused = true)]
async fn session_changes_are_observable() {
    let (_medium, nodes) = nodes(1);
    let host = &nodes[0];
    let mut watch = host.session().subscribe();

    host.create(slot(2), "Kai", "Ops", PASSKEY).await.unwrap();
    assert!(watch.has_changed().unwrap());
    assert_eq!(
        watch.borrow_and_update().as_ref().map(|s| s.role),
        Some(Role::Host)
    );

    host.leave().await;
    assert!(watch.has_changed().unwrap());
    assert!(watch.borrow_and_update().is_none());
}
