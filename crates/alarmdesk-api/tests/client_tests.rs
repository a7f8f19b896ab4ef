// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use alarmdesk_api::Client;
use alarmdesk_app::{DateRange, IncidentAction, IncidentId, IncidentState, PickerDate};
use anyhow::{Result, anyhow};
use std::io::Read;
use std::thread;
use std::time::Duration;
use tiny_http::{Header, Method, Request, Response, Server};

const INCIDENTS: &str = r#"[
  {"id": 1, "priority": 3, "users": [], "calls": [],
   "companyPublic": {"id": "acme", "name": "Acme"}, "caseNumber": 10,
   "createdAt": "2024-06-10T08:00:00Z", "alarmCount": 2},
  {"id": 2, "priority": 1, "users": [{"id": 5, "name": "Dana"}],
   "companyPublic": {"id": "globex", "name": "Globex"},
   "createdAt": "2024-06-09T22:15:00Z"}
]"#;

fn json_response(body: &str, status: u16) -> Response<std::io::Cursor<Vec<u8>>> {
    Response::from_string(body)
        .with_status_code(status)
        .with_header(
            Header::from_bytes("Content-Type", "application/json")
                .expect("valid content type header"),
        )
}

fn header_value(request: &Request, name: &'static str) -> Option<String> {
    request
        .headers()
        .iter()
        .find(|header| header.field.equiv(name))
        .map(|header| header.value.as_str().to_owned())
}

fn mock_server() -> Result<(Server, String)> {
    let server =
        Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock server: {error}"))?;
    let addr = format!("http://{}/api", server.server_addr());
    Ok((server, addr))
}

#[test]
fn unreachable_server_error_names_remediation() {
    let client = Client::new("http://127.0.0.1:1", Duration::from_millis(50))
        .expect("client should initialize")
        .with_session("sid=x");

    let error = client
        .list_active()
        .expect_err("listing should fail for unreachable endpoint");
    let message = error.to_string();
    assert!(
        message.contains("api.base_url") || message.contains("api.timeout"),
        "unexpected message: {message}"
    );
}

#[test]
fn client_rejects_empty_and_invalid_base_urls() {
    assert!(Client::new("  ", Duration::from_secs(1)).is_err());
    assert!(Client::new("not a url", Duration::from_secs(1)).is_err());
}

#[test]
fn calls_without_session_ask_for_login() -> Result<()> {
    let client = Client::new("http://127.0.0.1:1", Duration::from_millis(50))?;
    let error = client.list_active().expect_err("no session");
    assert!(error.to_string().contains("alarmdesk --login"));
    Ok(())
}

#[test]
fn login_stores_cookie_and_sends_it_back() -> Result<()> {
    let (server, addr) = mock_server()?;

    let handle = thread::spawn(move || {
        let mut login = server.recv().expect("login request expected");
        assert_eq!(login.method(), &Method::Post);
        assert_eq!(login.url(), "/api/auth/login");
        let mut body = String::new();
        login
            .as_reader()
            .read_to_string(&mut body)
            .expect("read login body");
        let parsed: serde_json::Value = serde_json::from_str(&body).expect("login body is JSON");
        assert_eq!(parsed["username"], "dana");
        assert_eq!(parsed["password"], "hunter2");
        let response = json_response("{}", 200).with_header(
            Header::from_bytes("Set-Cookie", "sid=abc123; Path=/; HttpOnly")
                .expect("valid cookie header"),
        );
        login.respond(response).expect("response should succeed");

        let list = server.recv().expect("list request expected");
        assert_eq!(list.url(), "/api/incidents?resolved=false");
        assert_eq!(header_value(&list, "Cookie").as_deref(), Some("sid=abc123"));
        list.respond(json_response(INCIDENTS, 200))
            .expect("response should succeed");
    });

    let mut client = Client::new(&addr, Duration::from_secs(2))?;
    let session = client.login("dana", "hunter2")?;
    assert_eq!(session.cookie, "sid=abc123");
    assert_eq!(client.session(), Some("sid=abc123"));

    let incidents = client.list_active()?;
    assert_eq!(incidents.len(), 2);
    assert_eq!(incidents[0].state(), IncidentState::Error);
    assert_eq!(incidents[1].state(), IncidentState::Acknowledged);
    assert_eq!(incidents[0].alarm_count, 2);

    handle.join().expect("server thread should join");
    Ok(())
}

#[test]
fn rejected_login_is_actionable() -> Result<()> {
    let (server, addr) = mock_server()?;

    let handle = thread::spawn(move || {
        let request = server.recv().expect("request expected");
        request
            .respond(json_response(r#"{"error":"bad credentials"}"#, 401))
            .expect("response should succeed");
    });

    let mut client = Client::new(&addr, Duration::from_secs(2))?;
    let error = client
        .login("dana", "wrong")
        .expect_err("login should fail");
    assert!(error.to_string().contains("check the username and password"));
    assert_eq!(client.session(), None);

    handle.join().expect("server thread should join");
    Ok(())
}

#[test]
fn history_sends_iso_range() -> Result<()> {
    let (server, addr) = mock_server()?;

    let handle = thread::spawn(move || {
        let request = server.recv().expect("request expected");
        assert_eq!(request.url(), "/api/incidents?from=2024-06-01&to=2024-06-09");
        request
            .respond(json_response("[]", 200))
            .expect("response should succeed");
    });

    let client = Client::new(&addr, Duration::from_secs(2))?.with_session("sid=1");
    let range = DateRange::ordered(PickerDate::new(1, 6, 2024), PickerDate::new(9, 6, 2024));
    assert!(client.list_history(range)?.is_empty());

    handle.join().expect("server thread should join");
    Ok(())
}

#[test]
fn expired_session_maps_to_login_hint() -> Result<()> {
    let (server, addr) = mock_server()?;

    let handle = thread::spawn(move || {
        let request = server.recv().expect("request expected");
        request
            .respond(json_response(r#"{"message":"expired"}"#, 401))
            .expect("response should succeed");
    });

    let client = Client::new(&addr, Duration::from_secs(2))?.with_session("sid=old");
    let error = client
        .list_alarms(IncidentId::new(4))
        .expect_err("401 should fail");
    assert!(error.to_string().contains("session expired; log in again"));

    handle.join().expect("server thread should join");
    Ok(())
}

#[test]
fn alarms_are_decoded_for_their_incident() -> Result<()> {
    let (server, addr) = mock_server()?;

    let handle = thread::spawn(move || {
        let request = server.recv().expect("request expected");
        assert_eq!(request.url(), "/api/incidents/4/alarms");
        let body = r#"[
          {"id": 40, "incidentId": 4, "service": "db-primary", "message": "replication lag",
           "createdAt": "2024-06-10T08:00:00Z"},
          {"id": 41, "service": "db-replica", "message": "disk 91%",
           "createdAt": "2024-06-10T08:01:00Z"}
        ]"#;
        request
            .respond(json_response(body, 200))
            .expect("response should succeed");
    });

    let client = Client::new(&addr, Duration::from_secs(2))?.with_session("sid=1");
    let alarms = client.list_alarms(IncidentId::new(4))?;
    assert_eq!(alarms.len(), 2);
    assert_eq!(alarms[1].incident_id, IncidentId::new(4));
    assert_eq!(alarms[0].service, "db-primary");

    handle.join().expect("server thread should join");
    Ok(())
}

#[test]
fn actions_post_to_incident_endpoints() -> Result<()> {
    let (server, addr) = mock_server()?;

    let handle = thread::spawn(move || {
        let ack = server.recv().expect("ack request expected");
        assert_eq!(ack.method(), &Method::Post);
        assert_eq!(ack.url(), "/api/incidents/7/acknowledge");
        ack.respond(json_response("{}", 200))
            .expect("response should succeed");

        let mut merge = server.recv().expect("merge request expected");
        assert_eq!(merge.url(), "/api/incidents/7/merge");
        let mut body = String::new();
        merge
            .as_reader()
            .read_to_string(&mut body)
            .expect("read merge body");
        assert_eq!(body, r#"{"sources":[8,9]}"#);
        merge
            .respond(json_response("{}", 200))
            .expect("response should succeed");

        let resolve = server.recv().expect("resolve request expected");
        assert_eq!(resolve.url(), "/api/incidents/7/resolve");
        resolve
            .respond(json_response(r#"{"error":"incident 7 is locked"}"#, 409))
            .expect("response should succeed");
    });

    let client = Client::new(&addr, Duration::from_secs(2))?.with_session("sid=1");
    let target = IncidentId::new(7);
    client.apply(&IncidentAction::Acknowledge { incident: target })?;
    client.apply(&IncidentAction::Merge {
        target,
        sources: vec![IncidentId::new(8), IncidentId::new(9)],
    })?;
    let error = client
        .apply(&IncidentAction::Resolve { incident: target })
        .expect_err("conflict should fail");
    assert_eq!(error.to_string(), "server error (409): incident 7 is locked");

    handle.join().expect("server thread should join");
    Ok(())
}

#[test]
fn malformed_incident_fails_whole_listing() -> Result<()> {
    let (server, addr) = mock_server()?;

    let handle = thread::spawn(move || {
        let request = server.recv().expect("request expected");
        let body = r#"[{"id": 1, "priority": 9, "companyPublic": {"id": "acme"},
                        "createdAt": "2024-06-10T08:00:00Z"}]"#;
        request
            .respond(json_response(body, 200))
            .expect("response should succeed");
    });

    let client = Client::new(&addr, Duration::from_secs(2))?.with_session("sid=1");
    let error = client.list_active().expect_err("priority 9 is invalid");
    assert!(format!("{error:#}").contains("outside 1-4"));

    handle.join().expect("server thread should join");
    Ok(())
}
