use holdem_server::http::routes;
use holdem_server::AppContext;
use serde_json::{json, Value};

fn body_json(body: &[u8]) -> Value {
    serde_json::from_slice(body).expect("json body")
}

#[tokio::test]
async fn health_answers_ok() {
    let context = AppContext::new_for_tests();
    let api = routes(&context);

    let response = warp::test::request()
        .method("GET")
        .path("/health")
        .reply(&api)
        .await;
    assert_eq!(response.status(), 200);
    assert_eq!(body_json(response.body())["success"], true);
}

#[tokio::test]
async fn tables_can_be_created_and_listed() {
    let context = AppContext::new_for_tests();
    let api = routes(&context);

    let created = warp::test::request()
        .method("POST")
        .path("/api/tables")
        .json(&json!({}))
        .reply(&api)
        .await;
    assert_eq!(created.status(), 200);
    let created = body_json(created.body());
    assert_eq!(created["success"], true);
    let table_id = created["table_id"].as_str().unwrap().to_string();

    let listed = warp::test::request()
        .method("GET")
        .path("/api/tables")
        .reply(&api)
        .await;
    let listed = body_json(listed.body());
    assert_eq!(listed["success"], true);
    let tables = listed["tables"].as_array().unwrap();
    assert_eq!(tables.len(), 1);
    assert_eq!(tables[0]["table_id"], table_id.as_str());
    assert_eq!(tables[0]["seated"], 0);
    assert_eq!(tables[0]["max_players"], 5);
    assert_eq!(tables[0]["small_blind"], 5);
    assert_eq!(tables[0]["big_blind"], 10);
}

#[tokio::test]
async fn bad_table_options_are_rejected() {
    let context = AppContext::new_for_tests();
    let api = routes(&context);

    let response = warp::test::request()
        .method("POST")
        .path("/api/tables")
        .json(&json!({ "small_blind": 50, "big_blind": 10 }))
        .reply(&api)
        .await;
    assert_eq!(response.status(), 400);
    assert_eq!(body_json(response.body())["success"], false);
}

async fn create_table(api: &warp::filters::BoxedFilter<(warp::reply::Response,)>) -> String {
    let created = warp::test::request()
        .method("POST")
        .path("/api/tables")
        .json(&json!({}))
        .reply(api)
        .await;
    body_json(created.body())["table_id"]
        .as_str()
        .unwrap()
        .to_string()
}

async fn join(
    api: &warp::filters::BoxedFilter<(warp::reply::Response,)>,
    table_id: &str,
    name: &str,
) -> String {
    let response = warp::test::request()
        .method("POST")
        .path(&format!("/api/tables/{table_id}/join"))
        .json(&json!({ "name": name }))
        .reply(api)
        .await;
    assert_eq!(response.status(), 200, "join failed for {name}");
    let body = body_json(response.body());
    assert_eq!(body["success"], true);
    body["player_id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn join_validates_names() {
    let context = AppContext::new_for_tests();
    let api = routes(&context);
    let table_id = create_table(&api).await;

    for bad in ["x", "way_too_long_of_a_player_name", "bad;name"] {
        let response = warp::test::request()
            .method("POST")
            .path(&format!("/api/tables/{table_id}/join"))
            .json(&json!({ "name": bad }))
            .reply(&api)
            .await;
        assert_eq!(response.status(), 400, "{bad:?} should be rejected");
        assert_eq!(body_json(response.body())["success"], false);
    }
}

#[tokio::test]
async fn join_rejects_unknown_tables() {
    let context = AppContext::new_for_tests();
    let api = routes(&context);

    let response = warp::test::request()
        .method("POST")
        .path("/api/tables/nonexistent/join")
        .json(&json!({ "name": "alice" }))
        .reply(&api)
        .await;
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn two_joins_start_a_hand_and_actions_flow() {
    let context = AppContext::new_for_tests();
    let api = routes(&context);
    let table_id = create_table(&api).await;

    let alice = join(&api, &table_id, "alice").await;
    let bob = join(&api, &table_id, "bob").await;

    // bob is not first to act heads-up; the engine's answer comes back
    // as a user error in the standard envelope
    let response = warp::test::request()
        .method("POST")
        .path(&format!("/api/tables/{table_id}/actions"))
        .json(&json!({ "player_id": bob, "action": "check" }))
        .reply(&api)
        .await;
    assert_eq!(response.status(), 400);
    assert_eq!(body_json(response.body())["success"], false);

    // the dealer may fold
    let response = warp::test::request()
        .method("POST")
        .path(&format!("/api/tables/{table_id}/actions"))
        .json(&json!({ "player_id": alice, "action": "fold" }))
        .reply(&api)
        .await;
    assert_eq!(response.status(), 200);
    assert_eq!(body_json(response.body())["success"], true);
}

#[tokio::test]
async fn bet_amounts_are_validated_at_the_edge() {
    let context = AppContext::new_for_tests();
    let api = routes(&context);
    let table_id = create_table(&api).await;
    let alice = join(&api, &table_id, "alice").await;
    let _bob = join(&api, &table_id, "bob").await;

    for amount in [json!(0), json!(2_000_000), Value::Null] {
        let response = warp::test::request()
            .method("POST")
            .path(&format!("/api/tables/{table_id}/actions"))
            .json(&json!({ "player_id": alice, "action": "raise", "amount": amount.clone() }))
            .reply(&api)
            .await;
        assert_eq!(response.status(), 400, "amount {amount:?} should be rejected");
    }
}

#[tokio::test]
async fn chat_is_trimmed_and_bounded() {
    let context = AppContext::new_for_tests();
    let api = routes(&context);
    let table_id = create_table(&api).await;
    let alice = join(&api, &table_id, "alice").await;

    let response = warp::test::request()
        .method("POST")
        .path(&format!("/api/tables/{table_id}/chat"))
        .json(&json!({ "player_id": alice, "message": "  glhf  " }))
        .reply(&api)
        .await;
    assert_eq!(response.status(), 200);

    let response = warp::test::request()
        .method("POST")
        .path(&format!("/api/tables/{table_id}/chat"))
        .json(&json!({ "player_id": alice, "message": "   " }))
        .reply(&api)
        .await;
    assert_eq!(response.status(), 400);

    let response = warp::test::request()
        .method("POST")
        .path(&format!("/api/tables/{table_id}/chat"))
        .json(&json!({ "player_id": "stranger", "message": "hi" }))
        .reply(&api)
        .await;
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn leaving_twice_is_an_error() {
    let context = AppContext::new_for_tests();
    let api = routes(&context);
    let table_id = create_table(&api).await;
    let alice = join(&api, &table_id, "alice").await;

    let response = warp::test::request()
        .method("POST")
        .path(&format!("/api/tables/{table_id}/leave"))
        .json(&json!({ "player_id": alice }))
        .reply(&api)
        .await;
    assert_eq!(response.status(), 200);

    let response = warp::test::request()
        .method("POST")
        .path(&format!("/api/tables/{table_id}/leave"))
        .json(&json!({ "player_id": alice }))
        .reply(&api)
        .await;
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn malformed_payloads_use_the_error_envelope() {
    let context = AppContext::new_for_tests();
    let api = routes(&context);
    let table_id = create_table(&api).await;

    let response = warp::test::request()
        .method("POST")
        .path(&format!("/api/tables/{table_id}/join"))
        .body("this is not json")
        .header("content-type", "application/json")
        .reply(&api)
        .await;
    assert_eq!(response.status(), 400);
    assert_eq!(body_json(response.body())["success"], false);

    let response = warp::test::request()
        .method("GET")
        .path("/api/unknown")
        .reply(&api)
        .await;
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn event_stream_rejects_unknown_tables() {
    let context = AppContext::new_for_tests();
    let api = routes(&context);

    let response = warp::test::request()
        .method("GET")
        .path("/api/tables/missing/events")
        .reply(&api)
        .await;
    assert_eq!(response.status(), 404);
}
