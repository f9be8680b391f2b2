use capnode::{ApiValue, Capnode, Message, Method};
use std::sync::{Arc, Mutex};

/// Every message a Capnode offers reaches every listener, in offer
/// order, alongside whatever is attached as its transport stream.
#[tokio::test]
async fn listener_sees_every_offered_message_in_order() {
    let server = Capnode::new();
    let client = Capnode::new();

    let api = ApiValue::object(vec![(
        "ping".to_string(),
        ApiValue::function(|_args| Box::pin(async { Ok(ApiValue::str("pong")) })),
    )]);
    server.expose(api).unwrap();

    let seen: Arc<Mutex<Vec<Message>>> = Arc::new(Mutex::new(Vec::new()));
    let seen_clone = seen.clone();
    let listener_id = server.add_listener(move |msg| {
        seen_clone.lock().unwrap().push(msg.clone());
    });

    capnode::connect(&server, &client);
    client.await_remote().await;

    let remote = client.remote_api().unwrap();
    let ping = remote.as_object().unwrap().get("ping").unwrap().clone();
    let ApiValue::Function(ping) = ping else {
        panic!("expected ping to be a function");
    };
    ping.call(vec![]).await.unwrap();

    let recorded = seen.lock().unwrap().clone();
    assert!(matches!(recorded.first(), Some(Message::Init { .. })));
    assert!(matches!(recorded.last(), Some(Message::Return { .. })));

    server.remove_listener(listener_id);
    ping.call(vec![]).await.unwrap();
    assert_eq!(seen.lock().unwrap().len(), recorded.len());
}

/// `replyId` on the request equals `methodId` on the matching
/// `Return`/`Error` response -- the correlation the Reply Table keys
/// on -- exercised directly against the Dispatcher rather than
/// through a proxy, so the correlation itself is what's under test.
#[tokio::test]
async fn reply_id_on_request_matches_method_id_on_response() {
    let server = Capnode::new();
    let shape = server
        .expose(ApiValue::object(vec![(
            "id".to_string(),
            ApiValue::function(|mut args| Box::pin(async move { Ok(args.pop().unwrap_or(ApiValue::str(""))) })),
        )]))
        .unwrap();
    let method_id = match shape {
        capnode::Shape::Object { value } => match value.get("id").unwrap() {
            capnode::Shape::Function { method_id } => method_id.clone(),
            _ => panic!("expected function shape"),
        },
        _ => panic!("expected object shape"),
    };

    let seen: Arc<Mutex<Vec<Message>>> = Arc::new(Mutex::new(Vec::new()));
    let seen_clone = seen.clone();
    server.add_listener(move |msg| seen_clone.lock().unwrap().push(msg.clone()));

    let reply_id = capnode::Handle::from_raw("correlate-me".to_string());
    server
        .receive(Message::Invocation {
            method_id,
            arguments: vec![capnode::Shape::Str { value: "x".to_string() }],
            reply_id: reply_id.clone(),
        })
        .await
        .unwrap();

    let recorded = seen.lock().unwrap().clone();
    let response = recorded
        .iter()
        .find(|m| matches!(m, Message::Return { .. } | Message::Error { .. }))
        .expect("expected a Return or Error message");
    match response {
        Message::Return { method_id, .. } => assert_eq!(method_id, &reply_id),
        Message::Error { method_id, .. } => assert_eq!(method_id, &reply_id),
        _ => unreachable!(),
    }
}
