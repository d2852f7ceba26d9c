//! Content search end to end, with canned protocol output and with ripgrep when present.

#![cfg(unix)]

mod common;

use delve_tools::SearchError;
use delve_types::{OUTPUT_TRUNCATION_NOTICE, SearchRequest};
use tempfile::tempdir;

use common::{canned_output, file_events, real_service, service, write_file, write_script};

#[tokio::test]
async fn two_files_with_todo_are_reported_in_order() {
    let bin = tempdir().unwrap();
    let ws = tempdir().unwrap();
    let mut events = file_events("./src/a.rs", &[(3, "// TODO: one")]);
    events.push_str(&file_events("src/b.rs", &[(7, "TODO two")]));
    events.push_str("{\"type\":\"summary\",\"data\":{\"stats\":{}}}\n");
    let rg = canned_output(bin.path(), &events, 0);

    let out = service(&rg, ws.path())
        .content(&SearchRequest::new("TODO"))
        .await
        .unwrap();

    assert_eq!(
        out.output,
        "Found 2 results.\n\n# src/a.rs\n3 | // TODO: one\n----\n\n# src/b.rs\n7 | TODO two\n----\n\n"
    );
    assert_eq!(out.files, 2);
    assert_eq!(out.results, 2);
    assert!(!out.limit_reached);
}

#[tokio::test]
async fn no_matches_reports_zero_results() {
    let bin = tempdir().unwrap();
    let ws = tempdir().unwrap();
    let rg = canned_output(bin.path(), "", 1);

    let out = service(&rg, ws.path())
        .content(&SearchRequest::new("nothing-here"))
        .await
        .unwrap();

    assert_eq!(out.output, "Found 0 results.\n\n");
    assert_eq!(out.results, 0);
}

#[tokio::test]
async fn malformed_protocol_lines_are_skipped() {
    let bin = tempdir().unwrap();
    let ws = tempdir().unwrap();
    let mut events = String::from("not json at all\n");
    events.push_str(&file_events("a.rs", &[(1, "hit")]));
    events.push_str("{\"type\":\"progress\",\"data\":{}}\n");
    let rg = canned_output(bin.path(), &events, 0);

    let out = service(&rg, ws.path())
        .content(&SearchRequest::new("hit"))
        .await
        .unwrap();

    assert!(out.output.starts_with("Found 1 result.\n\n# a.rs\n1 | hit\n"));
}

#[tokio::test]
async fn endless_output_stops_at_line_cap_with_partial_header() {
    let bin = tempdir().unwrap();
    let ws = tempdir().unwrap();
    let rg = write_script(
        bin.path(),
        "endless-rg",
        r#"i=0
while true; do
  i=$((i+1))
  printf '{"type":"begin","data":{"path":{"text":"f%s.rs"}}}\n' "$i"
  printf '{"type":"match","data":{"path":{"text":"f%s.rs"},"lines":{"text":"hit\\n"},"line_number":1,"absolute_offset":0,"submatches":[]}}\n' "$i"
  printf '{"type":"end","data":{"path":{"text":"f%s.rs"}}}\n' "$i"
done
"#,
    );

    // Cap is 2 * 5 = 10 lines: three complete files and one dangling begin.
    let out = service(&rg, ws.path())
        .content(&SearchRequest::new("hit").with_max_results(2))
        .await
        .unwrap();

    assert!(out.output.starts_with("Found first 2 of 2+ results.\n\n"));
    assert!(out.output.contains("# f1.rs\n1 | hit\n----\n"));
    assert!(out.output.contains("# f2.rs\n"));
    assert!(!out.output.contains("# f3.rs"));
    assert_eq!(out.results, 3);
    assert!(out.limit_reached);
}

#[tokio::test]
async fn character_budget_truncates_output() {
    let bin = tempdir().unwrap();
    let ws = tempdir().unwrap();
    let long = "x".repeat(500);
    let lines: Vec<(u64, &str)> = (1..=40).map(|n| (n * 10, long.as_str())).collect();
    let rg = canned_output(bin.path(), &file_events("big.rs", &lines), 0);

    let mut settings = common::settings_for(&rg);
    settings.content.max_output_chars = 2_000;
    let svc = delve_tools::SearchService::new(settings, ws.path()).unwrap();
    let out = svc.content(&SearchRequest::new("x")).await.unwrap();

    assert!(out.limit_reached);
    assert!(out.output.ends_with(OUTPUT_TRUNCATION_NOTICE));
    assert!(out.output.chars().count() <= 2_000 + OUTPUT_TRUNCATION_NOTICE.chars().count());
}

#[tokio::test]
async fn search_error_exit_propagates() {
    let bin = tempdir().unwrap();
    let ws = tempdir().unwrap();
    let rg = write_script(bin.path(), "bad-rg", "echo 'regex parse error' >&2\nexit 2\n");

    let err = service(&rg, ws.path())
        .content(&SearchRequest::new("("))
        .await
        .unwrap_err();
    assert!(matches!(err, SearchError::ProcessExit { code: Some(2), .. }));
}

#[tokio::test]
async fn escaping_path_is_rejected_before_spawn() {
    let bin = tempdir().unwrap();
    let ws = tempdir().unwrap();
    let marker = bin.path().join("spawned");
    let rg = write_script(
        bin.path(),
        "marker-rg",
        &format!("touch '{}'\nexit 1\n", marker.display()),
    );

    let err = service(&rg, ws.path())
        .content(&SearchRequest::new("root").with_path("../../../etc"))
        .await
        .unwrap_err();

    assert!(matches!(err, SearchError::PathTraversal { .. }));
    assert!(!marker.exists());
}

#[tokio::test]
async fn invalid_requests_are_rejected() {
    let bin = tempdir().unwrap();
    let ws = tempdir().unwrap();
    let rg = canned_output(bin.path(), "", 1);
    let svc = service(&rg, ws.path());

    assert!(matches!(
        svc.content(&SearchRequest::new("")).await,
        Err(SearchError::InvalidRequest { .. })
    ));
    assert!(matches!(
        svc.content(&SearchRequest::new("x").with_max_results(0)).await,
        Err(SearchError::InvalidRequest { .. })
    ));
    assert!(matches!(
        svc.content(&SearchRequest::new("x").with_path("missing")).await,
        Err(SearchError::PathNotFound { .. })
    ));
}

#[tokio::test]
async fn real_rg_finds_todo_in_two_files() {
    let ws = tempdir().unwrap();
    let Some(svc) = real_service(ws.path()) else {
        return;
    };
    write_file(ws.path(), "src/a.rs", "fn a() {}\n// TODO: one\n");
    write_file(ws.path(), "src/b.rs", "// TODO: two\n");
    write_file(ws.path(), "src/c.rs", "nothing\n");

    let out = svc.content(&SearchRequest::new("TODO")).await.unwrap();

    assert!(out.output.starts_with("Found 2 results.\n\n"), "{}", out.output);
    assert!(out.output.contains("# src/a.rs\n2 | // TODO: one\n"));
    assert!(out.output.contains("# src/b.rs\n1 | // TODO: two\n"));
    assert!(!out.output.contains("c.rs"));
}

#[tokio::test]
async fn real_rg_regex_with_escaped_parens() {
    let ws = tempdir().unwrap();
    let Some(svc) = real_service(ws.path()) else {
        return;
    };
    write_file(ws.path(), "notes.txt", "plain line\nsome (parentheses) here\n");

    let out = svc.content(&SearchRequest::new(r"\(.*\)")).await.unwrap();

    assert!(out.output.contains("# notes.txt\n"));
    assert!(out.output.contains("2 | some (parentheses) here"));
}

#[tokio::test]
async fn real_rg_no_matches() {
    let ws = tempdir().unwrap();
    let Some(svc) = real_service(ws.path()) else {
        return;
    };
    write_file(ws.path(), "a.txt", "alpha\n");

    let out = svc
        .content(&SearchRequest::new("zzz-not-present"))
        .await
        .unwrap();
    assert_eq!(out.output, "Found 0 results.\n\n");
}

#[tokio::test]
async fn real_rg_context_lines_join_the_block() {
    let ws = tempdir().unwrap();
    let Some(svc) = real_service(ws.path()) else {
        return;
    };
    write_file(ws.path(), "a.txt", "one\ntwo\nneedle\nfour\nfive\n");

    let out = svc
        .content(&SearchRequest::new("needle").with_context(1))
        .await
        .unwrap();

    assert!(out.output.starts_with("Found 1 result.\n\n"));
    assert!(out.output.contains("2 | two\n3 | needle\n4 | four\n----\n"));
}
