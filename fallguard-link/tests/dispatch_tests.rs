mod common;

use chrono::Utc;
use common::{caregiver, wait_for_state};
use fallguard_link::codec;
use fallguard_link::protocol::{AlertEnvelope, Topic};
use fallguard_link::transport::mock::MockTransport;
use fallguard_link::{
    AlertDispatcher, FallEvent, LinkConfig, LinkError, LocalEventBus, MainContext,
    SessionManager, SessionState,
};
use fallguard_types::Caregiver;
use pretty_assertions::assert_eq;
use std::sync::{Arc, Mutex};

struct Harness {
    context: MainContext,
    transport: Arc<MockTransport>,
    session: Arc<SessionManager>,
    dispatcher: Arc<AlertDispatcher>,
    received: Arc<Mutex<Vec<Caregiver>>>,
}

async fn harness(alert: Caregiver) -> Harness {
    let context = MainContext::spawn();
    let transport = Arc::new(MockTransport::new());
    let session = SessionManager::new(transport.clone(), &LinkConfig::default());
    session.start();
    session.activate().await.unwrap();
    wait_for_state(&session, SessionState::Active).await;

    let bus = Arc::new(LocalEventBus::new(context.clone()));
    let received = Arc::new(Mutex::new(Vec::new()));
    let r = received.clone();
    bus.subscribe(Topic::FallDetected, move |c: &Caregiver| {
        r.lock().unwrap().push(c.clone());
    });

    let dispatcher = Arc::new(AlertDispatcher::new(session.clone(), bus, alert));
    Harness {
        context,
        transport,
        session,
        dispatcher,
        received,
    }
}

// ── Detection ───────────────────────────────────────────────────

#[tokio::test]
async fn detection_sends_encoded_alert_on_fall_topic() {
    let alert = caregiver("Fall Signal");
    let h = harness(alert.clone()).await;

    h.dispatcher
        .handle_detection(&FallEvent::new(Utc::now()))
        .await
        .unwrap();

    let sent = h.transport.sent_messages();
    assert_eq!(sent.len(), 1);
    let payload = sent[0].payload_for(Topic::FallDetected).unwrap();
    assert_eq!(codec::decode(payload).unwrap(), alert);
}

#[tokio::test]
async fn alert_identity_is_stable_across_sends() {
    let h = harness(caregiver("Fall Signal")).await;
    let event = FallEvent::new(Utc::now());
    h.dispatcher.handle_detection(&event).await.unwrap();
    h.dispatcher.handle_detection(&event).await.unwrap();

    let ids: Vec<_> = h
        .transport
        .sent_messages()
        .iter()
        .map(|env| codec::decode(env.payload_for(Topic::FallDetected).unwrap()).unwrap().id())
        .collect();
    assert_eq!(ids, vec![h.dispatcher.alert().id(); 2]);
}

#[tokio::test]
async fn unreachable_detection_is_dropped() {
    let h = harness(caregiver("Fall Signal")).await;
    h.transport.set_reachable(false);
    wait_for_state(&h.session, SessionState::Unreachable).await;

    let result = h.dispatcher.handle_detection(&FallEvent::new(Utc::now())).await;
    assert!(matches!(result, Err(LinkError::PeerUnreachable)));
    assert!(h.transport.sent_messages().is_empty());
}

#[tokio::test]
async fn transport_failure_is_not_retried() {
    let h = harness(caregiver("Fall Signal")).await;
    h.transport.set_fail_sends(true);

    let result = h.dispatcher.handle_detection(&FallEvent::new(Utc::now())).await;
    assert!(matches!(result, Err(LinkError::SendFailed(_))));

    h.transport.set_fail_sends(false);
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    assert!(h.transport.sent_messages().is_empty());
}

// ── Inbound ─────────────────────────────────────────────────────

#[tokio::test]
async fn inbound_alert_is_published() {
    let h = harness(caregiver("Fall Signal")).await;
    let incoming = caregiver("Ana");
    let env = AlertEnvelope::single(Topic::FallDetected, codec::encode(&incoming).unwrap());

    assert!(h.dispatcher.handle_inbound(&env));
    h.context.flush().await.unwrap();
    assert_eq!(*h.received.lock().unwrap(), vec![incoming]);
}

#[tokio::test]
async fn unrelated_topic_is_ignored() {
    let h = harness(caregiver("Fall Signal")).await;
    let mut env = AlertEnvelope::default();
    env.insert("heartRate", codec::encode(&caregiver("Ana")).unwrap());

    assert!(!h.dispatcher.handle_inbound(&env));
    h.context.flush().await.unwrap();
    assert!(h.received.lock().unwrap().is_empty());
}

#[tokio::test]
async fn envelope_with_extra_key_is_ignored() {
    let h = harness(caregiver("Fall Signal")).await;
    let mut env =
        AlertEnvelope::single(Topic::FallDetected, codec::encode(&caregiver("Ana")).unwrap());
    env.insert("other", vec![]);

    assert!(!h.dispatcher.handle_inbound(&env));
}

#[tokio::test]
async fn corrupted_payload_is_dropped() {
    let h = harness(caregiver("Fall Signal")).await;
    let env = AlertEnvelope::single(Topic::FallDetected, b"{\"id\":".to_vec());

    assert!(!h.dispatcher.handle_inbound(&env));
    h.context.flush().await.unwrap();
    assert!(h.received.lock().unwrap().is_empty());
}

#[tokio::test]
async fn attached_receiver_routes_transport_messages() {
    let h = harness(caregiver("Fall Signal")).await;
    h.dispatcher.attach_receiver();
    let incoming = caregiver("Ana");
    h.transport.inject(AlertEnvelope::single(
        Topic::FallDetected,
        codec::encode(&incoming).unwrap(),
    ));

    let received = h.received.clone();
    common::eventually(|| received.lock().unwrap().len() == 1).await;
    assert_eq!(received.lock().unwrap()[0], incoming);
}
