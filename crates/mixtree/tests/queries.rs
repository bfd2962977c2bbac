mod common;

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use common::{console, console_with};
use mixtree::{DispatchError, DispatcherConfig, OwnershipKey};
use mixtree_core::{
    AnyValue, Argument, BooleanValue, FloatValue, Node, NodeEvent, Peer, StringValue,
};
use tokio::time::{self, Instant};

fn timed(retry_ms: u64, timeout_ms: u64) -> DispatcherConfig {
    DispatcherConfig {
        retry_interval_ms: retry_ms,
        query_timeout_ms: Some(timeout_ms),
        ..DispatcherConfig::default()
    }
}

#[tokio::test(start_paused = true)]
async fn unanswered_query_times_out_after_retries() {
    let c = console_with(timed(500, 1200));
    let fader = c.root.lookup_as::<Rc<FloatValue>>("/main/fader").unwrap();

    let started = Instant::now();
    let err = c.dispatcher.query(&fader).await.unwrap_err();

    assert!(started.elapsed() >= Duration::from_millis(1200));
    assert_eq!(
        err,
        DispatchError::QueryTimeout {
            address: "/main/fader".into(),
            timeout: Duration::from_millis(1200),
        }
    );
    // sent at 0, 500 and 1000 ms
    let requests = c.port.sent_to("/main/fader");
    assert_eq!(requests.len(), 3);
    assert!(requests.iter().all(|message| message.args.is_empty()));
    assert_eq!(c.port.unsubscribe_count(), 1);
    assert_eq!(c.port.subscriber_count("/main/fader"), 0);
    assert_eq!(fader.get(), None);
}

#[tokio::test(start_paused = true)]
async fn answered_query_applies_the_response_remotely() {
    let c = console();
    c.port.respond_with(|address, args| {
        (address == "/main/fader" && args.is_empty()).then(|| vec![Argument::Float(0.25)])
    });
    let fader = c.root.lookup_as::<Rc<FloatValue>>("/main/fader").unwrap();
    let peers = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&peers);
    fader.core().on(move |event| {
        if let NodeEvent::RemoteChange { peer } = event {
            sink.borrow_mut().push(peer.clone());
        }
    });

    assert_eq!(c.dispatcher.query(&fader).await, Ok(Some(0.25)));
    assert_eq!(*peers.borrow(), vec![Some(Peer::new("memory"))]);
    assert_eq!(c.port.sent_to("/main/fader").len(), 1);
    assert_eq!(c.port.subscriber_count("/main/fader"), 0);
}

#[tokio::test(start_paused = true)]
async fn late_answer_resolves_a_retrying_query() {
    let c = console();
    let name = c.root.lookup_as::<Rc<StringValue>>("/main/name").unwrap();

    let (result, _) = tokio::join!(c.dispatcher.query(&name), async {
        time::sleep(Duration::from_millis(1100)).await;
        c.port
            .deliver("/main/name", vec![Argument::from("Vocals")], None);
    });

    assert_eq!(result, Ok(Some("Vocals".to_string())));
    assert_eq!(c.port.sent_to("/main/name").len(), 3);
}

#[tokio::test(start_paused = true)]
async fn parameterless_traffic_does_not_resolve_a_query() {
    let c = console_with(timed(100, 250));
    let on = c.root.lookup_as::<Rc<BooleanValue>>("/main/on").unwrap();
    c.port.respond_with(|_, _| Some(Vec::new()));

    let err = c.dispatcher.query(&on).await.unwrap_err();
    assert!(matches!(err, DispatchError::QueryTimeout { .. }));
}

#[tokio::test(start_paused = true)]
async fn monitored_value_is_applied_once() {
    let c = console();
    c.port.respond_with(|address, args| {
        (address == "/main/fader" && args.is_empty()).then(|| vec![Argument::Float(0.5)])
    });
    let fader = c.root.lookup_as::<Rc<FloatValue>>("/main/fader").unwrap();
    let changes = Rc::new(RefCell::new(0));
    let counter = Rc::clone(&changes);
    fader.core().on(move |event| {
        if let NodeEvent::RemoteChange { .. } = event {
            *counter.borrow_mut() += 1;
        }
    });

    let value = c
        .dispatcher
        .add_and_query(OwnershipKey::new(), &fader)
        .await
        .unwrap();

    assert_eq!(value, Some(0.5));
    assert_eq!(*changes.borrow(), 1);
    assert!(c.dispatcher.is_monitored(&Node::from(Rc::clone(&fader))));
    // the monitor keeps its subscription once the query is done
    assert_eq!(c.port.subscriber_count("/main/fader"), 1);
}

#[tokio::test]
async fn detached_value_cannot_be_queried() {
    let c = console();
    let loose = Rc::new(FloatValue::new());
    assert_eq!(
        c.dispatcher.query(&loose).await,
        Err(DispatchError::NotAttached)
    );
    assert!(c.port.sent().is_empty());
}

#[tokio::test(start_paused = true)]
async fn query_all_resolves_in_order() {
    let c = console();
    c.port.respond_with(|address, args| {
        if !args.is_empty() {
            return None;
        }
        match address {
            "/main/fader" => Some(vec![Argument::Float(0.8)]),
            "/info" => Some(vec![Argument::from("X32 V4.06")]),
            _ => None,
        }
    });
    let values: Vec<Rc<dyn AnyValue>> = ["/info", "/main/fader"]
        .into_iter()
        .map(|address| c.root.lookup_as::<Rc<dyn AnyValue>>(address).unwrap())
        .collect();

    let answers = c.dispatcher.query_all(&values).await.unwrap();
    assert_eq!(
        answers,
        vec![Some(Argument::from("X32 V4.06")), Some(Argument::Float(0.8))]
    );
}

#[tokio::test(start_paused = true)]
async fn query_all_fails_with_the_first_failure() {
    let c = console_with(timed(500, 2000));
    c.port.respond_with(|address, args| {
        (address == "/info" && args.is_empty()).then(|| vec![Argument::from("X32")])
    });
    let values: Vec<Rc<dyn AnyValue>> = ["/info", "/main/name"]
        .into_iter()
        .map(|address| c.root.lookup_as::<Rc<dyn AnyValue>>(address).unwrap())
        .collect();

    let err = c.dispatcher.query_all(&values).await.unwrap_err();
    assert!(matches!(
        err,
        DispatchError::QueryTimeout { ref address, .. } if address == "/main/name"
    ));
}

#[tokio::test(start_paused = true)]
async fn closed_port_keeps_retrying_until_timeout() {
    let c = console_with(timed(500, 1000));
    c.port.close();
    let fader = c.root.lookup_as::<Rc<FloatValue>>("/main/fader").unwrap();

    let err = c.dispatcher.query(&fader).await.unwrap_err();
    assert!(matches!(err, DispatchError::QueryTimeout { .. }));
    assert!(c.port.sent().is_empty());
}
