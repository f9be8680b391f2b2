use capnode::{ApiValue, Capnode};
use futures::StreamExt;
use std::collections::HashSet;

/// Server emits many small messages while the reader drains slowly;
/// every message must still arrive, none dropped, even though the
/// Outbound Queue backs up behind a bounded channel.
///
/// Per the specification, invocation replies settle in the order each
/// method's future completes, not invocation order, so this test
/// checks the *set* of replies that arrive rather than their relative
/// order (see `SPEC_FULL.md` §4.3).
#[tokio::test]
async fn outbound_queue_survives_a_slow_reader() {
    let server = Capnode::new();

    let shape = server
        .expose(ApiValue::object(vec![(
            "echo".to_string(),
            ApiValue::function(|mut args| Box::pin(async move { Ok(args.pop().unwrap_or(ApiValue::str(""))) })),
        )]))
        .unwrap();
    let method_id = match shape {
        capnode::Shape::Object { value } => match value.get("echo").unwrap() {
            capnode::Shape::Function { method_id } => method_id.clone(),
            _ => panic!("expected function shape"),
        },
        _ => panic!("expected object shape"),
    };

    let server_stream = server.attach_stream();

    // Collect every outbound message the server offers, reading
    // slowly so the drain task backs up behind the bounded channel.
    let collector = tokio::spawn(async move {
        let mut stream = server_stream;
        let mut seen = Vec::new();
        while seen.len() < 1000 {
            match stream.next().await {
                Some(msg) => {
                    tokio::time::sleep(std::time::Duration::from_micros(200)).await;
                    seen.push(msg);
                }
                None => break,
            }
        }
        seen
    });

    for i in 0..1000u32 {
        server
            .receive(capnode::Message::Invocation {
                method_id: method_id.clone(),
                arguments: vec![capnode::Shape::Number {
                    value: serde_json::Number::from(i),
                }],
                reply_id: capnode::Handle::from_raw(format!("reply-{}", i)),
            })
            .await
            .unwrap();
    }

    let seen = collector.await.unwrap();
    assert_eq!(seen.len(), 1000);

    let mut reply_ids = HashSet::new();
    for msg in seen {
        match msg {
            capnode::Message::Return { method_id: reply_id, value } => {
                assert!(reply_ids.insert(reply_id.as_str().to_string()), "duplicate reply");
                match value {
                    capnode::Shape::Number { .. } => {}
                    other => panic!("unexpected shape: {:?}", other),
                }
            }
            other => panic!("unexpected message: {:?}", other),
        }
    }
    assert_eq!(reply_ids.len(), 1000);
    for i in 0..1000u32 {
        assert!(reply_ids.contains(&format!("reply-{}", i)));
    }
}
