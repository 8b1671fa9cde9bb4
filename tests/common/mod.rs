#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use moltboard_github::GitHubService;
use moltboard_github::clock::ManualClock;
use serde_json::{Value, json};
use wiremock::{MockServer, ResponseTemplate};

pub const START_MS: i64 = 1_700_000_000_000;
pub const TOKEN: &str = "t1";

pub async fn setup() -> (MockServer, Arc<ManualClock>, GitHubService) {
    let server = MockServer::start().await;
    let clock = Arc::new(ManualClock::new(START_MS));
    let service = GitHubService::new(&server.uri(), Duration::from_secs(5), clock.clone())
        .expect("service");
    (server, clock, service)
}

/// Reset header value `secs` after the test clock's start.
pub fn reset_in(secs: i64) -> String {
    (START_MS / 1000 + secs).to_string()
}

pub fn issue(number: u64) -> Value {
    json!({
        "number": number,
        "title": format!("Issue {}", number),
        "state": "open",
        "labels": [],
        "body": "details",
        "created_at": "2024-01-01T00:00:00Z",
        "updated_at": "2024-01-02T00:00:00Z",
        "closed_at": null,
        "assignee": null,
        "comments": 0,
        "reactions": {"total_count": 1}
    })
}

pub fn pull_request(number: u64) -> Value {
    let mut value = issue(number);
    value["pull_request"] = json!({"url": format!("https://api.github.com/pulls/{}", number)});
    value
}

/// Issues numbered `first..first + count`.
pub fn issues(first: u64, count: u64) -> Value {
    Value::Array((first..first + count).map(issue).collect())
}

pub fn repository(owner: &str, name: &str) -> Value {
    json!({
        "id": 99,
        "name": name,
        "full_name": format!("{}/{}", owner, name),
        "owner": {"login": owner},
        "private": false,
        "fork": true,
        "default_branch": "main",
        "open_issues_count": 3,
        "parent": {
            "name": name,
            "full_name": format!("upstream/{}", name),
            "owner": {"login": "upstream"}
        }
    })
}

pub fn page(body: Value, remaining: i64) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_json(body)
        .insert_header("x-ratelimit-remaining", remaining.to_string().as_str())
        .insert_header("x-ratelimit-reset", reset_in(3600).as_str())
}

pub fn throttled(status: u16) -> ResponseTemplate {
    ResponseTemplate::new(status)
        .set_body_json(json!({"message": "API rate limit exceeded"}))
        .insert_header("x-ratelimit-remaining", "0")
        .insert_header("x-ratelimit-reset", reset_in(120).as_str())
}

/// Throttling response without a reset header, so the tracker backs off 60s from "now".
pub fn throttled_now(status: u16) -> ResponseTemplate {
    ResponseTemplate::new(status)
        .set_body_json(json!({"message": "You have exceeded a secondary rate limit"}))
}
