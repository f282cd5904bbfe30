use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde_json::{json, Value};
use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::{mpsc, Arc, Mutex};
use std::time::{Duration, Instant};
use tempfile::TempDir;

const OPENAI_KEY_ENV: &str = "CARDWISE_TEST_OPENAI_KEY";
const PINECONE_KEY_ENV: &str = "CARDWISE_TEST_PINECONE_KEY";
const OPENAI_KEY: &str = "sk-test-openai";
const PINECONE_KEY: &str = "pc-test";

fn cardwise_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("cardwise");
    path
}

fn run_cardwise(config_path: &Path, args: &[&str], with_keys: bool) -> (String, String, bool) {
    let binary = cardwise_binary();
    let mut command = Command::new(&binary);
    command
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .env_remove("RUST_LOG")
        .env_remove(OPENAI_KEY_ENV)
        .env_remove(PINECONE_KEY_ENV);
    if with_keys {
        command
            .env(OPENAI_KEY_ENV, OPENAI_KEY)
            .env(PINECONE_KEY_ENV, PINECONE_KEY);
    }
    let output = command
        .output()
        .unwrap_or_else(|e| panic!("Failed to run cardwise binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

/// Run the binary on a blocking thread so the mock server keeps serving.
async fn run_cardwise_async(config_path: PathBuf, args: Vec<String>) -> (String, String, bool) {
    tokio::task::spawn_blocking(move || {
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        run_cardwise(&config_path, &args, true)
    })
    .await
    .unwrap()
}

fn spawn_chat(config_path: &Path, args: &[&str]) -> Child {
    let binary = cardwise_binary();
    Command::new(&binary)
        .arg("--config")
        .arg(config_path)
        .arg("chat")
        .args(["--progress", "off"])
        .args(args)
        .env_remove("RUST_LOG")
        .env(OPENAI_KEY_ENV, OPENAI_KEY)
        .env(PINECONE_KEY_ENV, PINECONE_KEY)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap_or_else(|e| panic!("Failed to run cardwise binary at {:?}: {}", binary, e))
}

/// Feed a whole chat script on stdin and wait for the session to end.
async fn run_chat_script(config_path: PathBuf, args: Vec<String>, script: &str) -> (String, bool) {
    let script = script.to_string();
    tokio::task::spawn_blocking(move || {
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        let mut child = spawn_chat(&config_path, &args);
        child
            .stdin
            .take()
            .unwrap()
            .write_all(script.as_bytes())
            .unwrap();
        let output = child.wait_with_output().unwrap();
        (
            String::from_utf8_lossy(&output.stdout).to_string(),
            output.status.success(),
        )
    })
    .await
    .unwrap()
}

fn write_config(dir: &TempDir, body: &str) -> PathBuf {
    let config_dir = dir.path().join("config");
    fs::create_dir_all(&config_dir).unwrap();
    let path = config_dir.join("cardwise.toml");
    fs::write(&path, body).unwrap();
    path
}

fn openai_config(port: u16, vector_host_suffix: &str) -> String {
    format!(
        r#"[openai]
base_url = "http://127.0.0.1:{port}/v1"
api_key_env = "{OPENAI_KEY_ENV}"
timeout_secs = 5

[vector]
host = "http://127.0.0.1:{port}{vector_host_suffix}"
api_key_env = "{PINECONE_KEY_ENV}"
dims = 4
timeout_secs = 5

[retrieval]
top_k = 3
"#
    )
}

// ─── Mock services ──────────────────────────────────────────────────

#[derive(Clone, Default)]
struct Mock {
    calls: Arc<Mutex<Vec<String>>>,
}

impl Mock {
    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

fn authorized_openai(headers: &HeaderMap) -> bool {
    let bearer = format!("Bearer {}", OPENAI_KEY);
    headers.get("authorization").and_then(|v| v.to_str().ok()) == Some(bearer.as_str())
        || headers.get("api-key").and_then(|v| v.to_str().ok()) == Some(OPENAI_KEY)
}

async fn embeddings(State(mock): State<Mock>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    if !authorized_openai(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    mock.calls
        .lock()
        .unwrap()
        .push(format!("embeddings:{}", body["input"].as_str().unwrap_or("")));
    Json(json!({ "data": [{ "index": 0, "embedding": [0.1, 0.2, 0.3, 0.4] }] })).into_response()
}

async fn chat_completions(
    State(mock): State<Mock>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !authorized_openai(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    let first = body["messages"][0]["content"].as_str().unwrap_or("");
    let reply = if first == "Refine this query for semantic search." {
        mock.calls.lock().unwrap().push("refine".to_string());
        "HSBC Red annual fee"
    } else {
        mock.calls.lock().unwrap().push("synthesize".to_string());
        "The HSBC Red Credit Card has no annual fee."
    };
    Json(json!({
        "choices": [{ "index": 0, "message": { "role": "assistant", "content": reply } }]
    }))
    .into_response()
}

async fn query(State(mock): State<Mock>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    if headers.get("api-key").and_then(|v| v.to_str().ok()) != Some(PINECONE_KEY) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    mock.calls
        .lock()
        .unwrap()
        .push(format!("query:{}", body["topK"]));
    Json(json!({
        "matches": [
            { "id": "2", "score": 0.81, "metadata": {} },
            { "id": "1", "score": 0.92, "metadata": { "filename": "hsbc_red.pdf", "text": "No annual fee." } }
        ],
        "namespace": ""
    }))
    .into_response()
}

async fn start_mock() -> (u16, Mock) {
    let mock = Mock::default();
    let app = Router::new()
        .route("/v1/embeddings", post(embeddings))
        .route("/v1/chat/completions", post(chat_completions))
        .route("/openai/deployments/{deployment}/embeddings", post(embeddings))
        .route(
            "/openai/deployments/{deployment}/chat/completions",
            post(chat_completions),
        )
        .route("/query", post(query))
        .with_state(mock.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (port, mock)
}

// ─── Catalog commands (no config needed) ────────────────────────────

#[test]
fn test_cards_lists_catalog() {
    let tmp = TempDir::new().unwrap();
    let missing = tmp.path().join("missing.toml");
    let (stdout, _, success) = run_cardwise(&missing, &["cards"], false);
    assert!(success);
    assert!(stdout.contains("HSBC Credit Cards"));
    assert!(stdout.contains("Hang Seng Bank Credit Cards"));
    assert!(stdout.contains("Citi PremierMiles Card"));
    assert!(stdout.contains("BOC Dual Currency Card"));
}

#[test]
fn test_cards_bank_filter_json() {
    let tmp = TempDir::new().unwrap();
    let missing = tmp.path().join("missing.toml");
    let (stdout, _, success) = run_cardwise(&missing, &["cards", "--bank", "citi", "--json"], false);
    assert!(success);
    let cards: Value = serde_json::from_str(&stdout).unwrap();
    let cards = cards.as_array().unwrap();
    assert_eq!(cards.len(), 3);
    assert!(cards.iter().all(|c| c["bank"] == "Citibank"));
}

#[test]
fn test_terms() {
    let tmp = TempDir::new().unwrap();
    let missing = tmp.path().join("missing.toml");
    let (stdout, _, success) = run_cardwise(&missing, &["terms"], false);
    assert!(success);
    assert!(stdout.contains("Terms of Use"));
    assert!(stdout.contains("Disclaimer"));
}

#[test]
fn test_completions() {
    let tmp = TempDir::new().unwrap();
    let missing = tmp.path().join("missing.toml");
    let (stdout, _, success) = run_cardwise(&missing, &["completions", "bash"], false);
    assert!(success);
    assert!(stdout.contains("cardwise"));
}

// ─── Config errors ──────────────────────────────────────────────────

#[test]
fn test_ask_without_config_errors() {
    let tmp = TempDir::new().unwrap();
    let missing = tmp.path().join("missing.toml");
    let (_, stderr, success) = run_cardwise(&missing, &["ask", "annual fee"], true);
    assert!(!success);
    assert!(stderr.contains("Failed to read config file"));
}

#[test]
fn test_ask_with_invalid_config_errors() {
    let tmp = TempDir::new().unwrap();
    let path = write_config(&tmp, "[vector]\nhost = \"http://x\"\n[retrieval]\ntop_k = 0\n");
    let (_, stderr, success) = run_cardwise(&path, &["ask", "annual fee"], true);
    assert!(!success);
    assert!(stderr.contains("retrieval.top_k"));
}

#[test]
fn test_ask_without_api_key_errors() {
    let tmp = TempDir::new().unwrap();
    let path = write_config(&tmp, &openai_config(9, ""));
    let (_, stderr, success) = run_cardwise(&path, &["ask", "annual fee"], false);
    assert!(!success);
    assert!(stderr.contains(OPENAI_KEY_ENV));
}

#[test]
fn test_ask_empty_query_errors() {
    let tmp = TempDir::new().unwrap();
    let path = write_config(&tmp, &openai_config(9, ""));
    let (_, stderr, success) = run_cardwise(&path, &["ask", "   "], true);
    assert!(!success);
    assert!(stderr.contains("query must not be empty"));
}

// ─── End to end against mock services ───────────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn test_ask_end_to_end_with_refinement() {
    let (port, mock) = start_mock().await;
    let tmp = TempDir::new().unwrap();
    let path = write_config(&tmp, &openai_config(port, ""));

    let (stdout, stderr, success) = run_cardwise_async(
        path,
        vec!["ask".into(), "what's the fee on red?".into(), "--progress".into(), "off".into()],
    )
    .await;
    assert!(success, "stderr: {}", stderr);

    assert!(stdout.contains("Refined query: HSBC Red annual fee"));
    assert!(stdout.contains("### Final Response"));
    assert!(stdout.contains("The HSBC Red Credit Card has no annual fee."));
    assert!(stdout.contains("1. hsbc_red.pdf (Score: 0.9200)"));
    assert!(stdout.contains("2. Unknown (Score: 0.8100)"));
    assert!(stdout.contains("No text available"));
    assert!(stderr.contains("Processed in"));

    assert_eq!(
        mock.calls(),
        vec![
            "refine",
            "embeddings:HSBC Red annual fee",
            "query:3",
            "synthesize"
        ]
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn test_ask_json_without_refinement() {
    let (port, mock) = start_mock().await;
    let tmp = TempDir::new().unwrap();
    let path = write_config(&tmp, &openai_config(port, ""));

    let (stdout, stderr, success) = run_cardwise_async(
        path,
        vec![
            "ask".into(),
            "best travel card".into(),
            "--no-refine".into(),
            "--top-k".into(),
            "2".into(),
            "--json".into(),
            "--progress".into(),
            "json".into(),
        ],
    )
    .await;
    assert!(success, "stderr: {}", stderr);

    let output: Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(output["query"], "best travel card");
    assert_eq!(output["refined_query"], "best travel card");
    let results = output["results"].as_array().unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0]["filename"], "hsbc_red.pdf");
    assert_eq!(results[1]["filename"], "Unknown");

    assert!(stderr.contains(r#""stage":"embedding""#));
    assert!(!stderr.contains(r#""stage":"refine""#));
    assert_eq!(
        mock.calls(),
        vec!["embeddings:best travel card", "query:2", "synthesize"]
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn test_ask_upstream_error_exits_nonzero() {
    let (port, mock) = start_mock().await;
    let tmp = TempDir::new().unwrap();
    let path = write_config(&tmp, &openai_config(port, "/missing"));

    let (_, stderr, success) = run_cardwise_async(
        path,
        vec!["ask".into(), "cashback".into(), "--no-refine".into()],
    )
    .await;
    assert!(!success);
    assert!(stderr.contains("vector search failed"));
    assert!(stderr.contains("404"));
    // Synthesis never ran.
    assert_eq!(mock.calls(), vec!["embeddings:cashback"]);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_ask_against_azure_deployment() {
    let (port, mock) = start_mock().await;
    let tmp = TempDir::new().unwrap();
    let config = format!(
        r#"[openai]
flavor = "azure"
base_url = "http://127.0.0.1:{port}"
api_version = "2024-10-21"
api_key_env = "{OPENAI_KEY_ENV}"

[vector]
host = "http://127.0.0.1:{port}"
api_key_env = "{PINECONE_KEY_ENV}"
dims = 4
"#
    );
    let path = write_config(&tmp, &config);

    let (stdout, stderr, success) =
        run_cardwise_async(path, vec!["ask".into(), "annual fee".into()]).await;
    assert!(success, "stderr: {}", stderr);
    assert!(stdout.contains("The HSBC Red Credit Card has no annual fee."));
    assert_eq!(
        mock.calls(),
        vec![
            "refine",
            "embeddings:HSBC Red annual fee",
            "query:5",
            "synthesize"
        ]
    );
}

// ─── Interactive chat ───────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn test_chat_keeps_history_across_turns() {
    let (port, mock) = start_mock().await;
    let tmp = TempDir::new().unwrap();
    let path = write_config(&tmp, &openai_config(port, ""));

    let (stdout, success) = run_chat_script(
        path,
        vec!["--no-refine".into()],
        "cashback\n\n/foo\nannual fee\n/history\n/quit\nnever asked\n",
    )
    .await;
    assert!(success, "stdout: {}", stdout);

    assert!(stdout.contains("Unknown command: /foo"));
    assert_eq!(stdout.matches("### Final Response").count(), 2);
    assert!(stdout.contains("[user] cashback"));
    assert!(stdout.contains("[user] annual fee"));
    assert_eq!(stdout.matches("[user] ").count(), 2);
    assert_eq!(
        stdout
            .matches("[assistant] The HSBC Red Credit Card has no annual fee.")
            .count(),
        2
    );
    // Empty line, unknown command and anything after /quit never reach the services.
    assert_eq!(
        mock.calls(),
        vec![
            "embeddings:cashback",
            "query:3",
            "synthesize",
            "embeddings:annual fee",
            "query:3",
            "synthesize"
        ]
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn test_chat_continues_after_failed_turn() {
    let (port, mock) = start_mock().await;
    let tmp = TempDir::new().unwrap();
    let path = write_config(&tmp, &openai_config(port, "/missing"));

    let (stdout, success) = run_chat_script(
        path,
        vec!["--no-refine".into()],
        "cashback\nannual fee\n/history\n/exit\n",
    )
    .await;
    assert!(success, "stdout: {}", stdout);

    assert!(!stdout.contains("### Final Response"));
    assert_eq!(
        stdout
            .matches("[assistant] An error occurred: vector search failed")
            .count(),
        2
    );
    assert!(stdout.contains("[user] annual fee"));
    assert_eq!(
        mock.calls(),
        vec!["embeddings:cashback", "embeddings:annual fee"]
    );
}

#[cfg(unix)]
#[tokio::test(flavor = "multi_thread")]
async fn test_chat_ctrl_c_at_prompt_ends_session() {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    let (port, _mock) = start_mock().await;
    let tmp = TempDir::new().unwrap();
    let path = write_config(&tmp, &openai_config(port, ""));

    let (answered, exit) = tokio::task::spawn_blocking(move || {
        let mut child = spawn_chat(&path, &["--no-refine"]);
        let mut stdin = child.stdin.take().unwrap();
        let stdout = child.stdout.take().unwrap();

        let (tx, rx) = mpsc::channel();
        std::thread::spawn(move || {
            for line in BufReader::new(stdout).lines().map_while(Result::ok) {
                if tx.send(line).is_err() {
                    break;
                }
            }
        });

        stdin.write_all(b"cashback\n").unwrap();
        stdin.flush().unwrap();

        let deadline = Instant::now() + Duration::from_secs(15);
        let mut answered = false;
        while let Some(left) = deadline.checked_duration_since(Instant::now()) {
            match rx.recv_timeout(left) {
                Ok(line) if line.contains("The HSBC Red Credit Card has no annual fee.") => {
                    answered = true;
                    break;
                }
                Ok(_) => continue,
                Err(_) => break,
            }
        }

        // Back at the prompt with stdin still open.
        kill(Pid::from_raw(child.id() as i32), Signal::SIGINT).unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        let exit = loop {
            if let Some(status) = child.try_wait().unwrap() {
                break Some(status);
            }
            if Instant::now() >= deadline {
                let _ = child.kill();
                break None;
            }
            std::thread::sleep(Duration::from_millis(50));
        };
        drop(stdin);
        (answered, exit)
    })
    .await
    .unwrap();

    assert!(answered, "first turn was never answered");
    let status = exit.expect("chat kept running after Ctrl-C at the prompt");
    assert!(status.success());
}
