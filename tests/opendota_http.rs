use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use std::thread;

use reqwest::blocking::Client;

use dota_ingest::opendota::{OpenDotaClient, StatsSource};

/// Answers one request per canned `(status line, body)` pair, in order.
fn serve(responses: Vec<(&'static str, &'static str)>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("addr");
    thread::spawn(move || {
        for (status, body) in responses {
            let (mut stream, _) = listener.accept().expect("accept");
            let mut reader = BufReader::new(stream.try_clone().expect("clone"));
            let mut line = String::new();
            while reader.read_line(&mut line).expect("read") > 2 {
                line.clear();
            }
            let reply = format!(
                "HTTP/1.1 {status}\r\nContent-Type: application/json\r\n\
                 Content-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(reply.as_bytes()).expect("write");
        }
    });
    format!("http://{addr}/api")
}

#[test]
fn server_error_surfaces_as_fetch_error() {
    let base = serve(vec![("500 Internal Server Error", r#"{"error":"down"}"#)]);
    let client = OpenDotaClient::new(Client::new(), base);

    let err = client.fetch_match(42).expect_err("500 should fail");
    let msg = format!("{err:#}");
    assert!(msg.starts_with("fetch match 42: http 500"));
    assert!(msg.contains("/api/matches/42"));
}

#[test]
fn malformed_json_surfaces_as_fetch_error() {
    let base = serve(vec![("200 OK", "<html>rate limited</html>")]);
    let client = OpenDotaClient::new(Client::new(), base);

    let err = client.fetch_pro_matches(None).expect_err("not json");
    assert!(format!("{err:#}").contains("invalid json from"));
}

#[test]
fn ok_response_is_returned_as_json() {
    let base = serve(vec![("200 OK", r#"[{"match_id": 7}]"#)]);
    let client = OpenDotaClient::new(Client::new(), base);

    let v = client.fetch_player_matches(10).expect("json");
    assert_eq!(v[0]["match_id"], 7);
}
