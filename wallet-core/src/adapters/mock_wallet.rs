//! Mock wallet API server
//!
//! A local HTTP server that simulates the remote wallet API. Backs demo mode
//! and the test suite, so the whole client can run without real credentials.
//!
//! Routes mirror the real API:
//! - POST /auth/login returns { entity: { sessionId } } or an error envelope
//! - GET /wallet/balance returns { entity: { ledgerBalance } }
//! - POST /history reads start/end/currentPage/batchSize headers and returns
//!   { entity: [...] }, or an XML document once the pages run out
//! - GET /ip returns { ip } like a public IP echo service

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde_json::{json, Value as JsonValue};

use crate::domain::AuthenticationRequest;

const HISTORY_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const MAX_HEADER_BYTES: usize = 64 * 1024;
const TOKEN_PREFIX: &str = "mock-session-";

/// Configuration for mock behaviour
#[derive(Debug, Clone)]
pub struct MockConfig {
    /// Credentials the server accepts
    pub api_key: String,
    pub api_secret: String,
    /// Address returned by /ip
    pub public_ip: String,
    pub ledger_balance: Decimal,
    /// Size of the full history result set
    pub num_transactions: usize,
    /// Answer 2xx to login but leave out the session token
    pub omit_session_id: bool,
    /// Include email/role in the login entity
    pub identity_in_response: bool,
    pub fail_balance: bool,
    /// Answer every history request with an XML fault
    pub always_xml: bool,
    /// Answer history with an entity that is not an array
    pub malformed_history: bool,
    pub fail_ip_lookup: bool,
    /// Delay in milliseconds before every response
    pub delay_ms: u64,
    /// Extra delay for one history page: (page, milliseconds)
    pub slow_page: Option<(u32, u64)>,
    /// Fixed JSON body for every valid history request
    pub history_body: Option<String>,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            api_key: "demo_api_key".to_string(),
            api_secret: "demo_api_secret".to_string(),
            public_ip: "203.0.113.10".to_string(),
            ledger_balance: Decimal::new(1_525_075, 2),
            num_transactions: 45,
            omit_session_id: false,
            identity_in_response: false,
            fail_balance: false,
            always_xml: false,
            malformed_history: false,
            fail_ip_lookup: false,
            delay_ms: 0,
            slow_page: None,
            history_body: None,
        }
    }
}

/// A request as received by the mock server
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    /// Header names are lowercased
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl RecordedRequest {
    /// Case-insensitive header lookup
    pub fn header(&self, name: &str) -> Option<&str> {
        let name = name.to_ascii_lowercase();
        self.headers
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v.as_str())
    }
}

struct ServerState {
    config: MockConfig,
    requests: Mutex<Vec<RecordedRequest>>,
    issued_tokens: AtomicU64,
}

/// Mock wallet server for demo mode and testing
pub struct MockWalletServer {
    port: u16,
    running: Arc<AtomicBool>,
    state: Arc<ServerState>,
    thread_handle: Option<thread::JoinHandle<()>>,
}

impl MockWalletServer {
    /// Start a new mock server on a random available port
    pub fn start(config: MockConfig) -> std::io::Result<Self> {
        Self::start_on_port(0, config)
    }

    /// Start mock server on a specific port (0 for random)
    pub fn start_on_port(port: u16, config: MockConfig) -> std::io::Result<Self> {
        let listener = TcpListener::bind(format!("127.0.0.1:{}", port))?;
        let actual_port = listener.local_addr()?.port();
        let running = Arc::new(AtomicBool::new(true));
        let running_clone = running.clone();
        let state = Arc::new(ServerState {
            config,
            requests: Mutex::new(Vec::new()),
            issued_tokens: AtomicU64::new(0),
        });
        let state_clone = state.clone();

        // Non-blocking accept so stop() can end the loop
        listener.set_nonblocking(true)?;

        let thread_handle = thread::spawn(move || {
            while running_clone.load(Ordering::SeqCst) {
                match listener.accept() {
                    Ok((stream, _)) => {
                        let state = state_clone.clone();
                        thread::spawn(move || {
                            handle_connection(stream, &state);
                        });
                    }
                    Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                        thread::sleep(Duration::from_millis(5));
                    }
                    Err(_) => break,
                }
            }
        });

        Ok(Self {
            port: actual_port,
            running,
            state,
            thread_handle: Some(thread_handle),
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Base URL to configure the wallet client with
    pub fn base_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    /// URL of the IP echo endpoint
    pub fn ip_lookup_url(&self) -> String {
        format!("{}/ip", self.base_url())
    }

    pub fn config(&self) -> &MockConfig {
        &self.state.config
    }

    /// All requests received so far, in arrival order
    pub fn requests(&self) -> Vec<RecordedRequest> {
        match self.state.requests.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn request_count(&self) -> usize {
        self.requests().len()
    }

    /// Requests whose path (without query string) equals `path`
    pub fn requests_to(&self, path: &str) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.path.split('?').next() == Some(path))
            .collect()
    }

    /// Stop the mock server
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for MockWalletServer {
    fn drop(&mut self) {
        self.stop();
    }
}

fn handle_connection(mut stream: TcpStream, state: &ServerState) {
    let _ = stream.set_nonblocking(false);
    let _ = stream.set_read_timeout(Some(Duration::from_secs(5)));

    let request = match read_request(&mut stream) {
        Ok(Some(request)) => request,
        _ => {
            send_response(&mut stream, 400, "Bad Request", &json!({"message": "Invalid request"}));
            return;
        }
    };

    if let Ok(mut requests) = state.requests.lock() {
        requests.push(request.clone());
    }

    let config = &state.config;
    if config.delay_ms > 0 {
        thread::sleep(Duration::from_millis(config.delay_ms));
    }

    let path = request.path.split('?').next().unwrap_or("");
    match (request.method.as_str(), path) {
        ("POST", "/auth/login") => handle_login(&mut stream, &request, state),
        ("GET", "/wallet/balance") => handle_balance(&mut stream, &request, config),
        ("POST", "/history") => handle_history(&mut stream, &request, config),
        ("GET", "/ip") => {
            if config.fail_ip_lookup {
                send_response(&mut stream, 503, "Service Unavailable", &json!({"message": "lookup unavailable"}));
            } else {
                send_response(&mut stream, 200, "OK", &json!({"ip": config.public_ip}));
            }
        }
        (_, "/auth/login" | "/wallet/balance" | "/history" | "/ip") => {
            send_response(&mut stream, 405, "Method Not Allowed", &json!({"message": "Method not allowed"}));
        }
        _ => {
            send_response(&mut stream, 404, "Not Found", &json!({"message": "Endpoint not found"}));
        }
    }
}

fn handle_login(stream: &mut TcpStream, request: &RecordedRequest, state: &ServerState) {
    let config = &state.config;
    let auth: AuthenticationRequest = match serde_json::from_str(&request.body) {
        Ok(auth) => auth,
        Err(_) => {
            send_response(stream, 400, "Bad Request", &json!({"message": "Malformed authentication request"}));
            return;
        }
    };

    if auth.extra_data.ip_address.trim().is_empty() {
        send_response(stream, 400, "Bad Request", &json!({"message": "ipAddress is required"}));
        return;
    }

    if auth.api_key != config.api_key || auth.api_secret != config.api_secret {
        send_response(stream, 401, "Unauthorized", &json!({"message": "Invalid API credentials"}));
        return;
    }

    if config.omit_session_id {
        send_response(stream, 200, "OK", &json!({"entity": {}}));
        return;
    }

    let n = state.issued_tokens.fetch_add(1, Ordering::SeqCst) + 1;
    let mut entity = json!({ "sessionId": format!("{}{}", TOKEN_PREFIX, n) });
    if config.identity_in_response {
        entity["email"] = json!("merchant@example.com");
        entity["role"] = json!("merchant");
    }
    send_response(stream, 200, "OK", &json!({ "entity": entity }));
}

fn has_valid_session(request: &RecordedRequest) -> bool {
    request
        .header("sessionid")
        .map(|token| token.starts_with(TOKEN_PREFIX))
        .unwrap_or(false)
}

fn handle_balance(stream: &mut TcpStream, request: &RecordedRequest, config: &MockConfig) {
    if !has_valid_session(request) {
        send_response(stream, 401, "Unauthorized", &json!({"message": "Invalid session"}));
        return;
    }
    if config.fail_balance {
        send_response(stream, 500, "Internal Server Error", &json!({"message": "Ledger unavailable"}));
        return;
    }
    let amount: JsonValue = config
        .ledger_balance
        .to_string()
        .parse::<f64>()
        .map(JsonValue::from)
        .unwrap_or_else(|_| json!(config.ledger_balance.to_string()));
    send_response(stream, 200, "OK", &json!({"entity": {"ledgerBalance": amount}}));
}

fn handle_history(stream: &mut TcpStream, request: &RecordedRequest, config: &MockConfig) {
    if !has_valid_session(request) {
        send_response(stream, 401, "Unauthorized", &json!({"message": "Invalid session"}));
        return;
    }

    let range_ok = ["start", "end"].iter().all(|name| {
        request
            .header(name)
            .map(|v| NaiveDateTime::parse_from_str(v, HISTORY_TIME_FORMAT).is_ok())
            .unwrap_or(false)
    });
    let page = request.header("currentpage").and_then(|v| v.parse::<u32>().ok());
    let batch_size = request.header("batchsize").and_then(|v| v.parse::<u32>().ok());

    let (page, batch_size) = match (range_ok, page, batch_size) {
        (true, Some(p), Some(b)) if p > 0 && b > 0 => (p, b),
        _ => {
            send_response(stream, 400, "Bad Request", &json!({"message": "Invalid history headers"}));
            return;
        }
    };

    if let Some((slow, ms)) = config.slow_page {
        if slow == page {
            thread::sleep(Duration::from_millis(ms));
        }
    }

    if config.always_xml {
        send_xml(stream, &xml_fault("500", "Upstream ledger fault"));
        return;
    }
    if let Some(body) = &config.history_body {
        write_response(stream, 200, "OK", "application/json", body);
        return;
    }
    if config.malformed_history {
        send_response(stream, 200, "OK", &json!({"entity": "unexpected"}));
        return;
    }

    let skip = (page as usize - 1) * batch_size as usize;
    if skip >= config.num_transactions {
        send_xml(stream, &xml_fault("204", "No records found"));
        return;
    }

    let records: Vec<JsonValue> = (skip..config.num_transactions)
        .take(batch_size as usize)
        .map(generate_mock_record)
        .collect();
    send_response(stream, 200, "OK", &json!({ "entity": records }));
}

/// Deterministic record; cycles through the upstream shapes
fn generate_mock_record(i: usize) -> JsonValue {
    let merchants = [
        ("POS purchase - Shoprite", 4_523.50),
        ("Transfer from Ada", 25_000.00),
        ("Airtime top-up", 1_000.00),
        ("Coffee", 500.00),
        ("Settlement payout", 150_000.00),
        ("Card refund", 2_750.25),
    ];
    let (summary, amount) = merchants[i % merchants.len()];
    let minute = i % 60;
    let hour = 8 + (i / 60) % 12;
    let creation_time = format!("2024-01-{:02} {:02}:{:02}:00", 1 + (i % 28), hour, minute);

    match i % 3 {
        0 => json!({ "summary": summary, "amount": amount, "creationTime": creation_time }),
        1 => json!({ "description": summary, "amount": amount }),
        _ => json!({ "summary": summary, "amount": amount }),
    }
}

fn xml_fault(code: &str, message: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n<fault><code>{}</code><message>{}</message></fault>",
        code, message
    )
}

fn read_request(stream: &mut TcpStream) -> std::io::Result<Option<RecordedRequest>> {
    let mut buffer = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        if let Some(pos) = find_header_end(&buffer) {
            break pos;
        }
        if buffer.len() > MAX_HEADER_BYTES {
            return Ok(None);
        }
        let n = stream.read(&mut chunk)?;
        if n == 0 {
            return Ok(None);
        }
        buffer.extend_from_slice(&chunk[..n]);
    };

    let head = String::from_utf8_lossy(&buffer[..header_end]).to_string();
    let mut lines = head.split("\r\n");
    let request_line = lines.next().unwrap_or("");
    let parts: Vec<&str> = request_line.split_whitespace().collect();
    if parts.len() < 2 {
        return Ok(None);
    }

    let headers: Vec<(String, String)> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(name, value)| (name.trim().to_ascii_lowercase(), value.trim().to_string()))
        .collect();

    let content_length = headers
        .iter()
        .find(|(name, _)| name == "content-length")
        .and_then(|(_, value)| value.parse::<usize>().ok())
        .unwrap_or(0);

    let mut body = buffer[header_end + 4..].to_vec();
    while body.len() < content_length {
        let n = stream.read(&mut chunk)?;
        if n == 0 {
            break;
        }
        body.extend_from_slice(&chunk[..n]);
    }
    body.truncate(content_length);

    Ok(Some(RecordedRequest {
        method: parts[0].to_string(),
        path: parts[1].to_string(),
        headers,
        body: String::from_utf8_lossy(&body).to_string(),
    }))
}

fn find_header_end(buffer: &[u8]) -> Option<usize> {
    buffer.windows(4).position(|w| w == b"\r\n\r\n")
}

fn send_response(stream: &mut TcpStream, status: u16, status_text: &str, body: &JsonValue) {
    write_response(stream, status, status_text, "application/json", &body.to_string());
}

fn send_xml(stream: &mut TcpStream, body: &str) {
    write_response(stream, 200, "OK", "application/xml", body);
}

fn write_response(stream: &mut TcpStream, status: u16, status_text: &str, content_type: &str, body: &str) {
    let response = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        status_text,
        content_type,
        body.len(),
        body
    );
    let _ = stream.write_all(response.as_bytes());
    let _ = stream.flush();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_server_starts() {
        let server = MockWalletServer::start(MockConfig::default()).unwrap();
        assert!(server.port() > 0);
        assert_eq!(server.request_count(), 0);
    }

    #[test]
    fn test_generated_records_cover_both_shapes() {
        let summary = generate_mock_record(0);
        let description = generate_mock_record(1);
        let partial = generate_mock_record(2);

        assert!(summary.get("summary").is_some());
        assert!(summary.get("creationTime").is_some());
        assert!(description.get("description").is_some());
        assert!(description.get("summary").is_none());
        assert!(partial.get("creationTime").is_none());
    }

    #[test]
    fn test_xml_fault_has_declaration() {
        assert!(xml_fault("204", "No records found").starts_with("<?xml"));
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let request = RecordedRequest {
            method: "POST".to_string(),
            path: "/history".to_string(),
            headers: vec![("currentpage".to_string(), "2".to_string())],
            body: String::new(),
        };
        assert_eq!(request.header("currentPage"), Some("2"));
        assert_eq!(request.header("batchSize"), None);
    }

    #[test]
    fn test_find_header_end() {
        assert_eq!(find_header_end(b"GET / HTTP/1.1\r\n\r\nbody"), Some(14));
        assert_eq!(find_header_end(b"GET / HTTP/1.1\r\n"), None);
    }
}
