//! End-to-end materializer scenarios.

use std::fs;
use std::time::Duration;

use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use super::*;
use crate::coord::lock::acquire_dir_lock;

fn quiet() -> impl Fn(&str) + Send + Sync {
    |_| {}
}

async fn run(mat: &Materializer, response: &str) -> Vec<FileAction> {
    mat.materialize(response, &CancellationToken::new(), &quiet())
        .await
}

#[tokio::test]
async fn single_go_main_fence_with_explicit_path() {
    let tmp = TempDir::new().unwrap();
    let mat = Materializer::new(tmp.path());

    let response =
        "Here you go:\n```go\n// path: main.go\npackage main\n\nfunc main() {}\n```\nEnjoy!";
    let actions = run(&mat, response).await;

    assert_eq!(actions.len(), 1);
    assert_eq!(actions[0].kind, ActionKind::Saved);
    assert_eq!(actions[0].message, "created");
    assert_eq!(actions[0].path, "main.go");
    assert!(!actions[0].diff.is_empty());

    let written = fs::read_to_string(tmp.path().join("main.go")).unwrap();
    assert_eq!(written, "package main\n\nfunc main() {}\n");
}

#[tokio::test]
async fn python_class_routes_to_package_directory() {
    let tmp = TempDir::new().unwrap();
    let mat = Materializer::new(tmp.path());

    let response = "```python\nclass Greeter:\n    def __init__(self):\n        pass\n```";
    let actions = run(&mat, response).await;

    assert_eq!(actions.len(), 1);
    assert_eq!(actions[0].kind, ActionKind::Saved);
    assert_eq!(actions[0].path, "greeter/greeter.py");
    assert!(tmp.path().join("greeter/greeter.py").is_file());
}

#[tokio::test]
async fn rerunning_the_same_response_is_idempotent() {
    let tmp = TempDir::new().unwrap();
    let mat = Materializer::new(tmp.path());
    let response = "```go\n// path: main.go\npackage main\n\nfunc main() {}\n```";

    let first = run(&mat, response).await;
    assert_eq!(first[0].message, "created");

    let second = run(&mat, response).await;
    assert_eq!(second.len(), 1);
    assert_eq!(second[0].kind, ActionKind::Saved);
    assert_eq!(second[0].message, "unchanged");
    assert!(second[0].diff.is_empty());

    let written = fs::read_to_string(tmp.path().join("main.go")).unwrap();
    assert_eq!(written, "package main\n\nfunc main() {}\n");
}

#[tokio::test]
async fn actions_preserve_fence_order() {
    let tmp = TempDir::new().unwrap();
    let mat = Materializer::new(tmp.path());

    let response = "\
```go\n// path: a.go\npackage a\n```\n\
```go\n// path: b.go\npackage b\n```\n\
```go\n// path: c.go\npackage c\n```\n";
    let actions = run(&mat, response).await;

    let paths: Vec<&str> = actions.iter().map(|a| a.path.as_str()).collect();
    assert_eq!(paths, vec!["a.go", "b.go", "c.go"]);
    assert!(actions.iter().all(|a| a.kind == ActionKind::Saved));
}

#[tokio::test]
async fn explicit_path_wins_regardless_of_language() {
    let tmp = TempDir::new().unwrap();
    let mat = Materializer::new(tmp.path());

    let response = "```rust\n// path: deep/nested/lib.rs\npub fn f() {}\n```";
    let actions = run(&mat, response).await;

    assert_eq!(actions[0].path, "deep/nested/lib.rs");
    assert!(tmp.path().join("deep/nested/lib.rs").is_file());
}

#[tokio::test]
async fn update_produces_diff_against_previous_turn() {
    let tmp = TempDir::new().unwrap();
    let mat = Materializer::new(tmp.path());

    run(&mat, "```go\n// path: calc.go\npackage calc\n\nfunc Add() {}\n```").await;
    let actions = run(
        &mat,
        "```go\n// path: calc.go\npackage calc\n\nfunc Add() {}\n\nfunc Sub() {}\n```",
    )
    .await;

    assert_eq!(actions[0].message, "updated");
    assert!(actions[0].diff.contains("+func Sub() {}"));
    assert!(actions[0].diff.contains("diff --git a/calc.go b/calc.go"));
}

#[tokio::test]
async fn response_without_fences_yields_info() {
    let tmp = TempDir::new().unwrap();
    let mat = Materializer::new(tmp.path());

    let actions = run(&mat, "I could not produce code for this request.").await;
    assert_eq!(actions.len(), 1);
    assert_eq!(actions[0].kind, ActionKind::Info);
    assert_eq!(actions[0].message, "No code blocks detected.");
}

#[tokio::test]
async fn write_failure_is_reported_and_batch_continues() {
    let tmp = TempDir::new().unwrap();
    // A plain file where a parent directory is needed.
    fs::write(tmp.path().join("blocked"), "file").unwrap();
    let mat = Materializer::new(tmp.path());

    let response = "\
```go\n// path: blocked/inner.go\npackage inner\n```\n\
```go\n// path: ok.go\npackage ok\n```\n";
    let actions = run(&mat, response).await;

    assert_eq!(actions.len(), 2);
    assert_eq!(actions[0].kind, ActionKind::Error);
    assert!(actions[0].err.is_some());
    assert_eq!(actions[1].kind, ActionKind::Saved);
    assert!(tmp.path().join("ok.go").is_file());
}

#[tokio::test]
async fn fence_without_name_token_falls_back_to_generated() {
    let tmp = TempDir::new().unwrap();
    let mat = Materializer::new(tmp.path());

    let actions = run(&mat, "```\nsome plain notes\n```").await;
    assert_eq!(actions[0].path, "generated/file_1.txt");
    assert!(tmp.path().join("generated/file_1.txt").is_file());
}

#[tokio::test]
async fn crlf_bodies_are_normalized_on_write() {
    let tmp = TempDir::new().unwrap();
    let mat = Materializer::new(tmp.path());

    let response = "```go\n// path: win.go\npackage win\r\n\r\nfunc F() {}\r\n```";
    run(&mat, response).await;

    let written = fs::read_to_string(tmp.path().join("win.go")).unwrap();
    assert!(!written.contains('\r'));
    assert!(written.ends_with('\n'));
}

#[tokio::test]
async fn imports_are_normalized_after_the_batch() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("go.mod"), "module example.com/app\n").unwrap();
    let mat = Materializer::new(tmp.path());

    let response =
        "```go\n// path: main.go\npackage main\n\nimport \"app/src/calc\"\n\nfunc main() {}\n```";
    run(&mat, response).await;

    let written = fs::read_to_string(tmp.path().join("main.go")).unwrap();
    assert!(
        written.contains("\"example.com/app/calc\""),
        "normalizer did not run: {written}"
    );
}

#[tokio::test]
async fn waiting_for_the_shared_lock_is_surfaced() {
    let tmp = TempDir::new().unwrap();
    let lock_root = tmp.path().join("locks");
    fs::create_dir_all(&lock_root).unwrap();

    let cancel = CancellationToken::new();
    let holder = acquire_dir_lock(&lock_root.join("codegen"), &|_| {}, &cancel)
        .await
        .unwrap();

    let messages = std::sync::Arc::new(std::sync::Mutex::new(Vec::<String>::new()));
    let sink = messages.clone();
    let status = move |msg: &str| sink.lock().unwrap().push(msg.to_string());

    let mat = Materializer::new(tmp.path()).with_lock_root(&lock_root);
    let handle = tokio::spawn(async move {
        mat.materialize(
            "```go\n// path: locked.go\npackage locked\n```",
            &CancellationToken::new(),
            &status,
        )
        .await
    });

    tokio::time::sleep(Duration::from_millis(800)).await;
    holder.release().unwrap();
    let actions = handle.await.unwrap();

    assert_eq!(actions[0].kind, ActionKind::Saved);
    let seen = messages.lock().unwrap();
    assert!(seen.iter().any(|m| m.contains("Waiting for shared code generation lock")));
    assert!(seen.iter().any(|m| m.contains("lock acquired")));
}
