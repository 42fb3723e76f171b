use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use coursecat::web::{build_router, Outcome, RequestMeta, RequestObserver, Route};
use coursecat::{AppState, CatalogService, Config, CourseStore, JsonFileStore};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tracing::Span;

struct RawResponse {
    status: u16,
    head: String,
    body: String,
}

impl RawResponse {
    fn header(&self, name: &str) -> Option<&str> {
        let prefix = format!("{}:", name.to_ascii_lowercase());
        self.head.lines().find_map(|line| {
            if line.to_ascii_lowercase().starts_with(&prefix) {
                Some(line[prefix.len()..].trim())
            } else {
                None
            }
        })
    }

    /// The `flash=...` pair from `Set-Cookie`, ready to send back.
    fn flash_cookie(&self) -> Option<String> {
        self.header("set-cookie")
            .and_then(|v| v.split(';').next())
            .map(str::to_string)
    }
}

async fn send_raw(addr: SocketAddr, request: String) -> RawResponse {
    let mut stream = tokio::net::TcpStream::connect(addr)
        .await
        .expect("connect server");
    stream
        .write_all(request.as_bytes())
        .await
        .expect("write request");
    let mut response = String::new();
    stream
        .read_to_string(&mut response)
        .await
        .expect("read response");
    let (head, body) = response
        .split_once("\r\n\r\n")
        .expect("http response separator");
    let status = head
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .and_then(|s| s.parse::<u16>().ok())
        .expect("status");
    RawResponse {
        status,
        head: head.to_string(),
        body: body.to_string(),
    }
}

async fn get(addr: SocketAddr, path: &str, cookie: Option<&str>) -> RawResponse {
    let cookie = cookie.map(|c| format!("Cookie: {c}\r\n")).unwrap_or_default();
    send_raw(
        addr,
        format!("GET {path} HTTP/1.1\r\nHost: {addr}\r\n{cookie}Connection: close\r\n\r\n"),
    )
    .await
}

fn form_encode(fields: &[(&str, &str)]) -> String {
    fields
        .iter()
        .map(|(k, v)| {
            let mut value = String::new();
            for b in v.bytes() {
                match b {
                    b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' => {
                        value.push(char::from(b));
                    }
                    b' ' => value.push('+'),
                    _ => value.push_str(&format!("%{b:02X}")),
                }
            }
            format!("{k}={value}")
        })
        .collect::<Vec<_>>()
        .join("&")
}

async fn post_form(addr: SocketAddr, path: &str, fields: &[(&str, &str)]) -> RawResponse {
    let body = form_encode(fields);
    send_raw(
        addr,
        format!(
            "POST {path} HTTP/1.1\r\nHost: {addr}\r\n\
             Content-Type: application/x-www-form-urlencoded\r\n\
             Content-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        ),
    )
    .await
}

const CS203: [(&str, &str); 9] = [
    ("code", "CS203"),
    ("name", "Data Structures"),
    ("instructor", "Dr. Smith"),
    ("semester", "Fall 2024"),
    ("schedule", "MWF 10:00"),
    ("classroom", "Room 101"),
    ("prerequisites", "CS101"),
    ("grading", "Exams 60%, Projects 40%"),
    ("description", "Trees & graphs"),
];

struct Harness {
    addr: SocketAddr,
    store: Arc<JsonFileStore>,
    _dir: tempfile::TempDir,
}

impl Harness {
    async fn start() -> Self {
        Self::start_with(|state| state).await
    }

    async fn start_with(customize: impl FnOnce(AppState) -> AppState) -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("course_catalog.json");
        Self::start_in(dir, path, customize).await
    }

    async fn start_in(
        dir: tempfile::TempDir,
        path: PathBuf,
        customize: impl FnOnce(AppState) -> AppState,
    ) -> Self {
        let store = Arc::new(JsonFileStore::new(path));
        let state = customize(AppState::new(
            CatalogService::new(store.clone()),
            &Config::default(),
        ));

        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        let app = build_router(state).into_make_service_with_connect_info::<SocketAddr>();
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("serve");
        });

        Self {
            addr,
            store,
            _dir: dir,
        }
    }
}

#[tokio::test]
async fn test_index_renders() {
    let h = Harness::start().await;
    let resp = get(h.addr, "/", None).await;
    assert_eq!(resp.status, 200);
    assert!(resp.body.contains("Welcome to the Course Catalog"));
    assert!(resp.header("set-cookie").is_none());
}

#[tokio::test]
async fn test_empty_catalog_shows_zero() {
    let h = Harness::start().await;
    let resp = get(h.addr, "/catalog", None).await;
    assert_eq!(resp.status, 200);
    assert!(resp.body.contains("Total courses: <strong>0</strong>"));
    assert!(resp.body.contains("No courses yet."));
    // Reading does not create the file.
    assert!(!h.store.path().exists());
}

#[tokio::test]
async fn test_add_course_then_view() {
    let h = Harness::start().await;

    let resp = post_form(h.addr, "/add_course", &CS203).await;
    assert_eq!(resp.status, 303);
    assert_eq!(resp.header("location"), Some("/catalog"));
    let cookie = resp.flash_cookie().expect("flash cookie");
    assert!(cookie.starts_with("flash="));

    let stored = h.store.load_all().await.expect("load");
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].code, "CS203");
    assert_eq!(stored[0].grading, "Exams 60%, Projects 40%");
    assert_eq!(stored[0].description, "Trees & graphs");

    // The flash shows once on the next page and is cleared there.
    let resp = get(h.addr, "/catalog", Some(&cookie)).await;
    assert_eq!(resp.status, 200);
    assert!(resp.body.contains(
        "<div class=\"flash success\">Course &#x27;CS203&#x27; added successfully!</div>"
    ));
    assert!(resp.body.contains("Total courses: <strong>1</strong>"));
    assert!(resp.body.contains("<a href=\"/course/CS203\">"));
    let cleared = resp.header("set-cookie").expect("clearing cookie");
    assert!(cleared.contains("Max-Age=0"));

    let resp = get(h.addr, "/catalog", None).await;
    assert!(!resp.body.contains("class=\"flash"));

    let resp = get(h.addr, "/course/CS203", None).await;
    assert_eq!(resp.status, 200);
    assert!(resp.body.contains("<h1>CS203 - Data Structures</h1>"));
    assert!(resp.body.contains("Dr. Smith"));
    assert!(resp.body.contains("Trees &amp; graphs"));
}

#[tokio::test]
async fn test_add_course_missing_field_is_rejected() {
    let h = Harness::start().await;
    let fields: Vec<_> = CS203
        .iter()
        .copied()
        .filter(|(k, _)| *k != "instructor")
        .collect();

    let resp = post_form(h.addr, "/add_course", &fields).await;
    assert_eq!(resp.status, 303);
    assert_eq!(resp.header("location"), Some("/add_course"));
    assert!(h.store.load_all().await.expect("load").is_empty());

    let cookie = resp.flash_cookie().expect("flash cookie");
    let resp = get(h.addr, "/add_course", Some(&cookie)).await;
    assert_eq!(resp.status, 200);
    assert!(resp
        .body
        .contains("<div class=\"flash error\">Missing fields: instructor</div>"));
}

#[tokio::test]
async fn test_add_course_empty_values_list_every_missing_field() {
    let h = Harness::start().await;
    let resp = post_form(h.addr, "/add_course", &[("code", "CS1"), ("name", "")]).await;
    assert_eq!(resp.status, 303);

    let cookie = resp.flash_cookie().expect("flash cookie");
    let resp = get(h.addr, "/add_course", Some(&cookie)).await;
    assert!(resp.body.contains(
        "Missing fields: name, instructor, semester, schedule, classroom, prerequisites, grading"
    ));
}

#[tokio::test]
async fn test_unknown_course_redirects_to_catalog() {
    let h = Harness::start().await;
    let resp = get(h.addr, "/course/ZZ999", None).await;
    assert_eq!(resp.status, 303);
    assert_eq!(resp.header("location"), Some("/catalog"));

    let cookie = resp.flash_cookie().expect("flash cookie");
    let resp = get(h.addr, "/catalog", Some(&cookie)).await;
    assert!(resp
        .body
        .contains("No course found with code &#x27;ZZ999&#x27;."));
}

#[tokio::test]
async fn test_tampered_flash_cookie_is_dropped() {
    let h = Harness::start().await;
    let resp = get(h.addr, "/catalog", Some("flash=error.6869.deadbeef")).await;
    assert_eq!(resp.status, 200);
    assert!(!resp.body.contains("class=\"flash"));
    // Still cleared so the browser stops sending it.
    assert!(resp.header("set-cookie").is_some());
}

#[tokio::test]
async fn test_corrupt_catalog_is_server_error() {
    let h = Harness::start().await;
    std::fs::write(h.store.path(), b"not json").expect("write");
    let resp = get(h.addr, "/catalog", None).await;
    assert_eq!(resp.status, 500);
    assert!(resp.body.contains("Internal Server Error"));
}

#[tokio::test]
async fn test_failed_write_is_server_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let blocker = dir.path().join("not_a_dir");
    std::fs::write(&blocker, b"").expect("write");
    let path = blocker.join("course_catalog.json");
    let h = Harness::start_in(dir, path, |state| state).await;

    let resp = post_form(h.addr, "/add_course", &CS203).await;
    assert_eq!(resp.status, 500);
    assert!(resp.body.contains("Internal Server Error"));
    assert!(resp.header("set-cookie").is_none());
    assert!(!h.store.path().exists());
    assert_eq!(std::fs::read(&blocker).expect("read"), b"");
}

#[tokio::test]
async fn test_long_unknown_code_flash_fits_in_cookie() {
    let h = Harness::start().await;
    let code = "Z".repeat(2500);
    let resp = get(h.addr, &format!("/course/{code}"), None).await;
    assert_eq!(resp.status, 303);

    let set_cookie = resp.header("set-cookie").expect("set-cookie");
    assert!(set_cookie.len() < 4096, "cookie too long: {}", set_cookie.len());

    let cookie = resp.flash_cookie().expect("flash cookie");
    let resp = get(h.addr, "/catalog", Some(&cookie)).await;
    assert!(resp
        .body
        .contains("<div class=\"flash error\">No course found with code &#x27;ZZZ"));
}

#[derive(Debug, Default)]
struct RecordingObserver {
    seen: Mutex<Vec<(Route, String, Outcome)>>,
}

impl RequestObserver for RecordingObserver {
    fn before(&self, _meta: &RequestMeta) -> Span {
        Span::none()
    }

    fn after(&self, _span: &Span, meta: &RequestMeta, outcome: &Outcome) {
        self.seen
            .lock()
            .expect("lock")
            .push((meta.route, meta.user_ip.clone(), outcome.clone()));
    }
}

#[tokio::test]
async fn test_observer_sees_route_and_notes() {
    let observer = Arc::new(RecordingObserver::default());
    let hook: Arc<dyn RequestObserver> = observer.clone();
    let h = Harness::start_with(move |state| state.with_observer(hook)).await;

    post_form(h.addr, "/add_course", &CS203).await;
    get(h.addr, "/catalog", None).await;
    get(h.addr, "/course/CS203", None).await;
    get(h.addr, "/course/NOPE", None).await;

    let seen = observer.seen.lock().expect("lock");
    assert_eq!(seen.len(), 4);

    let (route, ip, add) = &seen[0];
    assert_eq!(*route, Route::AddCourse);
    assert_eq!(ip, "127.0.0.1");
    assert_eq!(add.redirect.as_deref(), Some("/catalog"));
    assert!(add
        .notes
        .events
        .iter()
        .any(|e| e == "Course 'CS203' added successfully!"));

    let (route, _, catalog) = &seen[1];
    assert_eq!(*route, Route::CourseCatalog);
    assert_eq!(catalog.notes.course_count, Some(1));

    let (route, _, details) = &seen[2];
    assert_eq!(*route, Route::CourseDetails);
    assert_eq!(details.notes.course_code.as_deref(), Some("CS203"));

    let (_, _, missing) = &seen[3];
    assert_eq!(missing.status.as_u16(), 303);
    assert_eq!(
        missing.notes.error.as_deref(),
        Some("No course found with code 'NOPE'.")
    );
}
