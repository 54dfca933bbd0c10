use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::str::FromStr;
use tempfile::TempDir;

fn chatgraph_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("chatgraph");
    path
}

fn run_chatgraph(cwd: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = chatgraph_binary();
    let output = Command::new(&binary)
        .current_dir(cwd)
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run chatgraph binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

/// Unix timestamp for a date inside the test window.
fn ts(year: i32, month: u32, day: u32) -> i64 {
    use chrono::TimeZone;
    chrono::Utc
        .with_ymd_and_hms(year, month, day, 12, 0, 0)
        .unwrap()
        .timestamp()
}

/// Build a source directory with the 3.x layout and a normalized store:
/// an owner account, a balanced 1:1 contact, a quiet group, an official
/// account, a silent contact, and one contact active only outside the
/// window.
async fn setup_source_dir() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let msg_dir = tmp.path().join("Msg");
    fs::create_dir_all(&msg_dir).unwrap();
    fs::write(tmp.path().join("version.txt"), "3.9.8.25\n").unwrap();

    let db_path = msg_dir.join("chat.db");
    let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", db_path.display()))
        .unwrap()
        .create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .unwrap();

    sqlx::query("CREATE TABLE contacts (id TEXT PRIMARY KEY, nickname TEXT, remark TEXT)")
        .execute(&pool)
        .await
        .unwrap();
    sqlx::query(
        "CREATE TABLE messages (id INTEGER PRIMARY KEY AUTOINCREMENT, \
         contact_id TEXT NOT NULL, ts INTEGER NOT NULL, is_outgoing INTEGER NOT NULL)",
    )
    .execute(&pool)
    .await
    .unwrap();
    sqlx::query("CREATE TABLE account (id TEXT PRIMARY KEY, name TEXT)")
        .execute(&pool)
        .await
        .unwrap();

    sqlx::query("INSERT INTO account (id, name) VALUES ('wxid_me', 'Me Myself')")
        .execute(&pool)
        .await
        .unwrap();

    for (id, nickname) in [
        ("wxid_me", Some("Me Myself")),
        ("wxid_alice", Some("Alice")),
        ("777@chatroom", Some("Hiking Group")),
        ("gh_dailynews", Some("Daily News")),
        ("wxid_silent", None),
        ("wxid_oldtimes", Some("Old Times")),
    ] {
        sqlx::query("INSERT INTO contacts (id, nickname, remark) VALUES (?, ?, NULL)")
            .bind(id)
            .bind(nickname)
            .execute(&pool)
            .await
            .unwrap();
    }

    let mut rows: Vec<(&str, i64, i64)> = Vec::new();
    // Alice: 30 outgoing, 45 incoming inside the window.
    for _ in 0..30 {
        rows.push(("wxid_alice", ts(2024, 3, 15), 1));
    }
    for _ in 0..45 {
        rows.push(("wxid_alice", ts(2024, 3, 16), 0));
    }
    // Quiet group: 5 outgoing, 195 incoming.
    for _ in 0..5 {
        rows.push(("777@chatroom", ts(2024, 4, 1), 1));
    }
    for _ in 0..195 {
        rows.push(("777@chatroom", ts(2024, 4, 2), 0));
    }
    // Official account: inbound only.
    for _ in 0..80 {
        rows.push(("gh_dailynews", ts(2024, 5, 10), 0));
    }
    // Old Times: traffic entirely before the window.
    for _ in 0..50 {
        rows.push(("wxid_oldtimes", ts(2019, 6, 1), 1));
    }

    for (id, t, outgoing) in rows {
        sqlx::query("INSERT INTO messages (contact_id, ts, is_outgoing) VALUES (?, ?, ?)")
            .bind(id)
            .bind(t)
            .bind(outgoing)
            .execute(&pool)
            .await
            .unwrap();
    }

    pool.close().await;
    tmp
}

const WINDOW: [&str; 4] = ["--since", "2024-01-01", "--until", "2024-12-31"];

#[tokio::test]
async fn analyze_data_only_end_to_end() {
    let source = setup_source_dir().await;
    let out = TempDir::new().unwrap();

    let mut args = vec![
        "analyze",
        "--source",
        source.path().to_str().unwrap(),
        "--output-dir",
        out.path().to_str().unwrap(),
        "--no-server",
        "--no-browser",
    ];
    args.extend_from_slice(&WINDOW);

    let (stdout, stderr, success) = run_chatgraph(out.path(), &args);
    assert!(success, "analyze failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("Artifact written to"));
    assert!(stdout.contains("Analysis complete"));

    let artifact = out.path().join("chat_data.json");
    assert!(artifact.is_file());
    assert!(out.path().join("relationship_graph.html").is_file());
    // Atomic write leaves no temp file behind.
    assert!(!out.path().join("chat_data.json.tmp").exists());

    let v: serde_json::Value = serde_json::from_str(&fs::read_to_string(&artifact).unwrap()).unwrap();

    // The owner's own id is excluded; everyone else is present, zero-message
    // contacts included.
    let nodes = v["nodesData"].as_array().unwrap();
    assert_eq!(nodes.len(), 6); // me + 5 contacts
    assert_eq!(nodes[0]["id"], "me");
    assert!(nodes.iter().all(|n| n["id"] != "wxid_me"));

    // Highest-scoring contact (balanced 1:1) comes right after the owner.
    assert_eq!(nodes[1]["id"], "wxid_alice");

    // Category encoding: official account 3, group 2, contact 1.
    let category_of = |id: &str| {
        nodes
            .iter()
            .find(|n| n["id"] == id)
            .unwrap_or_else(|| panic!("node {} missing", id))["category"]
            .as_u64()
            .unwrap()
    };
    assert_eq!(category_of("gh_dailynews"), 3);
    assert_eq!(category_of("777@chatroom"), 2);
    assert_eq!(category_of("wxid_alice"), 1);

    // Details mirror the aggregated counts.
    let details = v["nodeDetails"].as_array().unwrap();
    let alice = details.iter().find(|d| d["id"] == "wxid_alice").unwrap();
    assert_eq!(alice["total_msgs"], 75);
    assert_eq!(alice["sent_msgs"], 30);
    assert_eq!(alice["received_msgs"], 45);
    assert_eq!(alice["name"], "Alice");

    // Out-of-window traffic does not count.
    let old = details.iter().find(|d| d["id"] == "wxid_oldtimes").unwrap();
    assert_eq!(old["total_msgs"], 0);
    assert_eq!(old["interaction_score"], 0.0);

    // One edge per contact, all anchored on the owner node.
    let links = v["linksData"].as_array().unwrap();
    assert_eq!(links.len(), 5);
    assert!(links.iter().all(|l| l["source"] == "me"));

    assert_eq!(v["time_range"][0], "2024-01-01 00:00:00");
    assert_eq!(v["time_range"][1], "2024-12-31 23:59:59");
}

#[tokio::test]
async fn analyze_respects_max_nodes() {
    let source = setup_source_dir().await;
    let out = TempDir::new().unwrap();

    let mut args = vec![
        "analyze",
        "--source",
        source.path().to_str().unwrap(),
        "--output-dir",
        out.path().to_str().unwrap(),
        "--max-nodes",
        "2",
        "--no-server",
        "--no-browser",
    ];
    args.extend_from_slice(&WINDOW);

    let (stdout, stderr, success) = run_chatgraph(out.path(), &args);
    assert!(success, "analyze failed: stdout={}, stderr={}", stdout, stderr);

    let v: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(out.path().join("chat_data.json")).unwrap())
            .unwrap();
    let nodes = v["nodesData"].as_array().unwrap();
    // Owner plus the two highest-scoring contacts.
    assert_eq!(nodes.len(), 3);
    assert_eq!(nodes[1]["id"], "wxid_alice");
    assert_eq!(nodes[2]["id"], "777@chatroom");
}

#[test]
fn analyze_rejects_inverted_time_range() {
    let tmp = TempDir::new().unwrap();
    let (stdout, stderr, success) = run_chatgraph(
        tmp.path(),
        &[
            "analyze",
            "--source",
            ".",
            "--since",
            "2024-06-01",
            "--until",
            "2024-01-01",
            "--no-server",
        ],
    );
    assert!(!success, "expected failure, got stdout={}", stdout);
    assert!(stderr.contains("invalid time range"), "stderr={}", stderr);
    // Nothing was written before the validation error.
    assert!(!tmp.path().join("chat_data.json").exists());
}

#[test]
fn analyze_fails_on_unrecognized_source() {
    let source = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();

    let (stdout, stderr, success) = run_chatgraph(
        out.path(),
        &[
            "analyze",
            "--source",
            source.path().to_str().unwrap(),
            "--output-dir",
            out.path().to_str().unwrap(),
            "--no-server",
        ],
    );
    assert!(!success, "expected failure, got stdout={}", stdout);
    assert!(stderr.contains("version detection"), "stderr={}", stderr);
    assert!(!out.path().join("chat_data.json").exists());
}

#[test]
fn serve_requires_an_artifact() {
    let tmp = TempDir::new().unwrap();
    let (stdout, stderr, success) = run_chatgraph(
        tmp.path(),
        &[
            "serve",
            "-d",
            tmp.path().to_str().unwrap(),
            "--no-browser",
        ],
    );
    assert!(!success, "expected failure, got stdout={}", stdout);
    assert!(stderr.contains("chat_data.json"), "stderr={}", stderr);
}
