use capnode::{ApiValue, Capnode, Method};

#[tokio::test]
async fn callback_passed_as_an_argument_is_invoked_by_the_peer() {
    let server = Capnode::new();
    let client = Capnode::new();

    let api = ApiValue::object(vec![(
        "apply".to_string(),
        ApiValue::function(|mut args| {
            Box::pin(async move {
                let cb = args.remove(0);
                let ApiValue::Function(cb) = cb else {
                    return Err(capnode::CapnodeError::new(
                        capnode::CapnodeErrorKind::InvalidValue,
                        "apply expects a function argument",
                    ));
                };
                cb.call(vec![ApiValue::str("hello")]).await
            })
        }),
    )]);
    server.expose(api).unwrap();

    capnode::connect(&server, &client);
    client.await_remote().await;

    let remote = client.remote_api().unwrap();
    let apply = remote.as_object().unwrap().get("apply").unwrap().clone();
    let ApiValue::Function(apply) = apply else {
        panic!("expected apply to be a function");
    };

    let exclaim = ApiValue::function(|mut args| {
        Box::pin(async move {
            let s = args.remove(0);
            let s = s.as_str().unwrap_or_default().to_string();
            Ok(ApiValue::str(format!("{}!", s)))
        })
    });

    let result = apply.call(vec![exclaim]).await.unwrap();
    assert_eq!(result.as_str(), Some("hello!"));
}

#[tokio::test]
async fn two_references_to_the_same_function_get_distinct_handles() {
    let node = Capnode::new();
    let f = ApiValue::function(|_args| Box::pin(async { Ok(ApiValue::str("x")) }));
    let shape = node
        .expose(ApiValue::array(vec![f.clone(), f]))
        .unwrap();
    match shape {
        capnode::Shape::Array { value } => {
            let ids: Vec<_> = value
                .into_iter()
                .map(|s| match s {
                    capnode::Shape::Function { method_id } => method_id,
                    _ => panic!("expected function shape"),
                })
                .collect();
            assert_ne!(ids[0], ids[1]);
        }
        _ => panic!("expected array shape"),
    }
}
