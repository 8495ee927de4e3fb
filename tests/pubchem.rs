use std::fs;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::thread;
use std::time::Duration;

use assert_matches::assert_matches;

use kira_pubchem_fetcher::domain::{Cid, Decimal, StructureKind};
use kira_pubchem_fetcher::pubchem::{
    PubchemClient, PubchemHttpClient, Unavailable, extract_properties,
};

fn text(value: &Option<Decimal>) -> Option<&str> {
    value.as_ref().map(Decimal::as_str)
}

/// Serves one canned response per connection, in order, and returns the
/// base URL plus the request lines it saw.
fn canned_server(responses: Vec<(u16, String)>) -> (String, thread::JoinHandle<Vec<String>>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let base_url = format!("http://{}/rest/pug", listener.local_addr().unwrap());
    let handle = thread::spawn(move || {
        let mut seen = Vec::new();
        for (status, body) in responses {
            let (mut stream, _) = listener.accept().unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let read = stream.read(&mut buf).unwrap();
                if read == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..read]);
            }
            let request = String::from_utf8_lossy(&request);
            seen.push(request.lines().next().unwrap_or_default().to_string());

            let response = format!(
                "HTTP/1.1 {status} Canned\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(response.as_bytes()).unwrap();
        }
        seen
    });
    (base_url, handle)
}

#[test]
fn extract_aspirin_properties() {
    let raw = fs::read_to_string("tests/fixtures/pubchem_cid_2244.json").unwrap();
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    let record = extract_properties(Cid::new(2244).unwrap(), &value).unwrap();

    assert_eq!(record.cid.get(), 2244);
    assert_eq!(text(&record.molecular_weight), Some("180.16"));
    assert_eq!(text(&record.xlogp), Some("1.2"));
    assert_eq!(record.hbond_donors, Some(1));
    assert_eq!(record.hbond_acceptors, Some(4));
    assert_eq!(text(&record.tpsa), Some("63.6"));
}

#[test]
fn http_failures_map_to_unavailable_tags() {
    let fixture = fs::read_to_string("tests/fixtures/pubchem_cid_2244.json").unwrap();
    let (base_url, server) = canned_server(vec![
        (404, r#"{"Fault":{"Code":"PUGREST.NotFound"}}"#.to_string()),
        (200, "<html>not json</html>".to_string()),
        (200, fixture),
        (500, "server error".to_string()),
        (200, "2244\n  structure\n$$$$\n".to_string()),
    ]);
    let client = PubchemHttpClient::new(&base_url, Duration::from_secs(5)).unwrap();
    let cid = Cid::new(2244).unwrap();

    assert_matches!(client.fetch_properties(cid), Err(Unavailable::Status(404)));
    assert_matches!(client.fetch_properties(cid), Err(Unavailable::Malformed(_)));
    let record = client.fetch_properties(cid).unwrap();
    assert_eq!(text(&record.molecular_weight), Some("180.16"));
    assert_matches!(
        client.fetch_structure(cid, StructureKind::ThreeD),
        Err(Unavailable::Status(500))
    );
    assert_eq!(
        client.fetch_structure(cid, StructureKind::TwoD).unwrap(),
        b"2244\n  structure\n$$$$\n"
    );

    let seen = server.join().unwrap();
    assert_eq!(seen.len(), 5);
    assert!(seen[0].starts_with("GET /rest/pug/compound/cid/2244/property/"));
    assert_eq!(
        seen[3],
        "GET /rest/pug/compound/cid/2244/SDF?record_type=3d HTTP/1.1"
    );
    assert_eq!(
        seen[4],
        "GET /rest/pug/compound/cid/2244/SDF?record_type=2d HTTP/1.1"
    );
}

#[test]
fn refused_connection_is_a_transport_failure() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let base_url = format!("http://{}/rest/pug", listener.local_addr().unwrap());
    drop(listener);
    let client = PubchemHttpClient::new(&base_url, Duration::from_secs(5)).unwrap();

    assert_matches!(
        client.fetch_properties(Cid::new(1).unwrap()),
        Err(Unavailable::Transport(_))
    );
}
