//! Full run integration tests.
//!
//! Tests for complete gate runs: orchestration, dependency skipping,
//! severity classification, parallel replay and cancellation.

use std::io::{Read, Write};
use std::net::TcpListener;
use std::path::PathBuf;
use std::thread;

use verigate::checks::builtin::{default_suite, DASHBOARD_PAGE, TELEMETRY_FUNCTION};
use verigate::checks::{Check, Predicate, RegionSelector, Suite, Target};
use verigate::cli::output::{OutputFormatter, TerminalFormatter};
use verigate::engine::orchestrator::CancelToken;
use verigate::platform::probe::{ProbeResponse, TransportErrorKind};
use verigate::{run_gate, FailureKind, GateConfig, GateError, RunReport, Status};

use crate::mocks::*;

fn outcomes(report: &RunReport) -> Vec<(String, Status, String)> {
    report
        .results()
        .iter()
        .map(|r| (r.check_id().to_string(), r.status(), r.message().to_string()))
        .collect()
}

fn scenario_suite() -> Suite {
    Suite::builder("scenario")
        .check(Check::new(
            "C1",
            "Leaderboard is rendered",
            Target::file("page.tsx"),
            Predicate::contains("Leaderboard"),
        ))
        .check(
            Check::new(
                "C2",
                "Leaderboard block shows no laps",
                Target::file("page.tsx"),
                Predicate::not_contains("laps"),
            )
            .region(RegionSelector::anchored("Leaderboard", "/>", true).max_lines(5))
            .depends_on("C1"),
        )
        .check(Check::new(
            "C3",
            "Backend is healthy",
            Target::endpoint("{base_url}/health"),
            Predicate::http_status_in(&[200]),
        ))
        .build()
        .unwrap()
}

// End-to-end scenarios

#[test]
fn test_missing_leaderboard_fails_and_skips_dependant() {
    let env = MockEnvironment::new(
        MockReader::new().with_file("page.tsx", "<Standings laps={laps} />\n"),
        MockProbe::new().with_response("http://api.test/health", 200, "ok"),
    );

    let report = env.orchestrator(false).run(&scenario_suite()).unwrap();

    let results = outcomes(&report);
    assert_eq!(results.len(), 3);
    assert_eq!(results[0].0, "C1");
    assert_eq!(results[0].1, Status::Fail);
    assert_eq!(results[1].1, Status::Skip);
    assert!(results[1].2.starts_with("dependency failed"));
    assert_eq!(results[2].1, Status::Pass);
    assert_eq!(report.exit_code(), 1);

    // Only C1 read the page; C2 never touched it.
    assert_eq!(env.reader.reads_of("page.tsx"), 1);
    assert_eq!(env.probe.calls_to("http://api.test/health"), 1);
}

#[test]
fn test_healthy_application_passes_builtin_suite() {
    let env = MockEnvironment::healthy_application();
    let suite = default_suite().unwrap();

    let report = env.orchestrator(false).run(&suite).unwrap();

    for result in report.results() {
        assert_eq!(
            result.status(),
            Status::Pass,
            "{}: {}",
            result.check_id(),
            result.message()
        );
    }
    assert_eq!(report.results().len(), suite.len());
    assert_eq!(report.exit_code(), 0);
}

#[test]
fn test_laps_inside_leaderboard_block_fails() {
    let env = MockEnvironment::healthy_application();
    env.reader.set_file(
        DASHBOARD_PAGE,
        "<main>\n  <Leaderboard\n    laps={laps}\n  />\n</main>\n",
    );

    let report = env.orchestrator(false).run(&default_suite().unwrap()).unwrap();
    let ui2 = report.get("UI-002").unwrap();
    assert_eq!(ui2.status(), Status::Fail);
    assert_eq!(ui2.message(), "forbidden 'laps' present (line 3)");
    assert_eq!(report.exit_code(), 1);
}

#[test]
fn test_report_has_one_result_per_check() {
    let env = MockEnvironment::new(MockReader::new(), MockProbe::new());
    let suite = Suite::builder("mixed")
        .check(Check::new("A", "a", Target::file("missing.tsx"), Predicate::contains("x")))
        .check(
            Check::new("B", "b", Target::file("missing.tsx"), Predicate::contains("x"))
                .depends_on("A"),
        )
        .check(
            Check::new("C", "c", Target::endpoint("{base_url}/x"), Predicate::http_status_in(&[200]))
                .advisory(),
        )
        .check(
            Check::new("D", "d", Target::endpoint("{base_url}/x"), Predicate::http_status_in(&[200]))
                .depends_on("C"),
        )
        .build()
        .unwrap();

    let report = env.orchestrator(false).run(&suite).unwrap();
    assert_eq!(report.results().len(), suite.len());
    let sequences: Vec<usize> = report.results().iter().map(|r| r.sequence()).collect();
    assert_eq!(sequences, vec![0, 1, 2, 3]);
}

// Severity classification

#[test]
fn test_missing_artifact_is_fail_not_skip() {
    let env = MockEnvironment::healthy_application();
    let suite = Suite::builder("missing")
        .check(Check::new(
            "F-001",
            "Settings page exists",
            Target::file("frontend/src/pages/Settings.tsx"),
            Predicate::contains("Settings"),
        ))
        .build()
        .unwrap();

    let report = env.orchestrator(false).run(&suite).unwrap();
    let result = report.get("F-001").unwrap();
    assert_eq!(result.status(), Status::Fail);
    assert_eq!(result.kind(), Some(FailureKind::ArtifactNotFound));
}

#[test]
fn test_advisory_unreachable_is_warn_and_exit_zero() {
    let env = MockEnvironment::healthy_application();
    env.probe.set_response(
        "http://web.test/",
        ProbeResponse::failed(
            TransportErrorKind::Unreachable,
            "connection refused",
        ),
    );

    let report = env.orchestrator(false).run(&default_suite().unwrap()).unwrap();
    let web = report.get("WEB-001").unwrap();
    assert_eq!(web.status(), Status::Warn);
    assert_eq!(web.kind(), Some(FailureKind::Unreachable));
    assert_eq!(report.warnings().len(), 1);
    assert_eq!(report.exit_code(), 0);
}

#[test]
fn test_server_error_hard_fails_and_skips_dependants() {
    let env = MockEnvironment::healthy_application();
    env.probe.set_response(
        "http://api.test/health",
        ProbeResponse::ok(503, "unavailable"),
    );

    let report = env.orchestrator(false).run(&default_suite().unwrap()).unwrap();
    assert_eq!(report.get("API-001").unwrap().status(), Status::Fail);
    assert_eq!(
        report.get("API-002").unwrap().message(),
        "dependency failed (API-001)"
    );
    assert_eq!(report.get("API-003").unwrap().status(), Status::Skip);
    // API-001 probed /health once; API-002 never did.
    assert_eq!(env.probe.calls_to("http://api.test/health"), 1);
    assert_eq!(env.probe.calls_to("http://api.test/sessions/s1/laps"), 0);
    assert_eq!(report.exit_code(), 1);
}

#[test]
fn test_advisory_timeout_is_warn() {
    let env = MockEnvironment::new(
        MockReader::new()
            .with_file(DASHBOARD_PAGE, HEALTHY_DASHBOARD)
            .with_file(TELEMETRY_FUNCTION, HEALTHY_FUNCTION),
        MockProbe::new()
            .with_response("http://api.test/health", 200, r#"{"status":"ok"}"#)
            .with_timeout("http://api.test/sessions/s1/laps")
            .with_response("http://web.test/", 200, ""),
    );

    let report = env.orchestrator(false).run(&default_suite().unwrap()).unwrap();
    let laps = report.get("API-003").unwrap();
    assert_eq!(laps.status(), Status::Warn);
    assert_eq!(laps.kind(), Some(FailureKind::Timeout));
    assert_eq!(report.exit_code(), 0);
}

#[test]
fn test_malformed_payload_is_distinct_from_missing_field() {
    let env = MockEnvironment::healthy_application();
    env.probe.set_response(
        "http://api.test/health",
        ProbeResponse::ok(200, "<html>OK</html>"),
    );
    let report = env.orchestrator(false).run(&default_suite().unwrap()).unwrap();
    assert_eq!(
        report.get("API-002").unwrap().kind(),
        Some(FailureKind::MalformedPayload)
    );

    env.probe.set_response(
        "http://api.test/health",
        ProbeResponse::ok(200, r#"{"uptime": 12}"#),
    );
    let report = env.orchestrator(false).run(&default_suite().unwrap()).unwrap();
    let api2 = report.get("API-002").unwrap();
    assert_eq!(api2.kind(), Some(FailureKind::PredicateMismatch));
    assert_eq!(api2.message(), "missing field 'status'");
}

#[test]
fn test_panicking_custom_check_fails_in_isolation() {
    let env = MockEnvironment::new(
        MockReader::new().with_file("page.tsx", "content"),
        MockProbe::new(),
    );
    let suite = Suite::builder("custom")
        .check(Check::new(
            "X",
            "explodes",
            Target::file("page.tsx"),
            Predicate::custom("explodes", |_| panic!("bad evaluator")),
        ))
        .check(Check::new(
            "Y",
            "still runs",
            Target::file("page.tsx"),
            Predicate::contains("content"),
        ))
        .build()
        .unwrap();

    let report = env.orchestrator(false).run(&suite).unwrap();
    assert_eq!(report.get("X").unwrap().status(), Status::Fail);
    assert_eq!(report.get("X").unwrap().kind(), Some(FailureKind::Panicked));
    assert_eq!(report.get("Y").unwrap().status(), Status::Pass);
}

// Determinism, parallelism and cancellation

#[test]
fn test_rerun_is_deterministic() {
    let env = MockEnvironment::healthy_application();
    env.reader.set_file(DASHBOARD_PAGE, "<Standings />");
    let suite = default_suite().unwrap();

    let first = env.orchestrator(false).run(&suite).unwrap();
    let second = env.orchestrator(false).run(&suite).unwrap();
    assert_eq!(outcomes(&first), outcomes(&second));
}

#[test]
fn test_artifacts_are_read_fresh_each_run() {
    let env = MockEnvironment::healthy_application();
    let suite = default_suite().unwrap();

    env.reader.set_file(DASHBOARD_PAGE, "<Standings />");
    let before = env.orchestrator(false).run(&suite).unwrap();
    assert_eq!(before.get("UI-001").unwrap().status(), Status::Fail);

    env.reader.set_file(DASHBOARD_PAGE, HEALTHY_DASHBOARD);
    let after = env.orchestrator(false).run(&suite).unwrap();
    assert_eq!(after.get("UI-001").unwrap().status(), Status::Pass);
}

#[test]
fn test_parallel_matches_sequential_order() {
    let suite = default_suite().unwrap();

    for broken in [None, Some("http://api.test/health")] {
        let sequential_env = MockEnvironment::healthy_application();
        let parallel_env = MockEnvironment::healthy_application();
        if let Some(url) = broken {
            for env in [&sequential_env, &parallel_env] {
                env.probe.set_response(
                    url,
                    ProbeResponse::ok(500, "boom"),
                );
            }
        }

        let sequential = sequential_env.orchestrator(false).run(&suite).unwrap();
        let parallel = parallel_env.orchestrator(true).run(&suite).unwrap();

        assert_eq!(outcomes(&sequential), outcomes(&parallel));
        assert_eq!(sequential.exit_code(), parallel.exit_code());
        assert_eq!(
            sequential_env.probe.total_calls(),
            parallel_env.probe.total_calls()
        );
    }
}

#[test]
fn test_cancelled_before_start_reports_nothing() {
    let env = MockEnvironment::healthy_application();
    let token = CancelToken::new();
    token.cancel();

    let report = env
        .orchestrator(false)
        .with_cancel_token(token)
        .run(&default_suite().unwrap())
        .unwrap();

    assert!(report.is_cancelled());
    assert!(report.results().is_empty());
    assert_eq!(env.reader.total_reads(), 0);
    assert_eq!(env.probe.total_calls(), 0);
}

#[test]
fn test_cancel_mid_run_stops_before_next_check() {
    let env = MockEnvironment::new(
        MockReader::new().with_file("page.tsx", "content"),
        MockProbe::new(),
    );
    let token = CancelToken::new();
    let trigger = token.clone();
    let suite = Suite::builder("cancel")
        .check(Check::new(
            "A",
            "cancels the run",
            Target::file("page.tsx"),
            Predicate::custom("cancel", move |_| {
                trigger.cancel();
                Ok("stop requested".to_string())
            }),
        ))
        .check(Check::new("B", "never starts", Target::file("page.tsx"), Predicate::contains("content")))
        .build()
        .unwrap();

    let report = env
        .orchestrator(false)
        .with_cancel_token(token)
        .run(&suite)
        .unwrap();

    assert!(report.is_cancelled());
    assert_eq!(report.results().len(), 1);
    assert_eq!(report.get("A").unwrap().status(), Status::Pass);
    assert!(report.get("B").is_none());
    assert_eq!(report.declared(), 2);
}

// Primary artifact

#[test]
fn test_missing_primary_artifact_aborts_run() {
    let env = MockEnvironment::new(
        MockReader::new().with_file(TELEMETRY_FUNCTION, HEALTHY_FUNCTION),
        MockProbe::new(),
    );

    let err = env
        .orchestrator(false)
        .run(&default_suite().unwrap())
        .unwrap_err();
    assert!(matches!(err, GateError::PrimaryArtifactMissing { .. }));
    assert_eq!(env.reader.total_reads(), 0);
    assert_eq!(env.probe.total_calls(), 0);
}

// Real filesystem and loopback HTTP

fn serve(connections: usize, status_line: &'static str, body: &'static str) -> (u16, thread::JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let handle = thread::spawn(move || {
        for _ in 0..connections {
            let Ok((mut stream, _)) = listener.accept() else {
                return;
            };
            let mut buf = [0u8; 4096];
            let _ = stream.read(&mut buf);
            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status_line,
                body.len(),
                body
            );
            let _ = stream.write_all(response.as_bytes());
        }
    });
    (port, handle)
}

fn closed_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

const LIVE_SUITE: &str = r#"
name = "live"
primary_artifact = "src/page.tsx"

[[checks]]
id = "C1"
description = "Leaderboard is rendered"
target = { kind = "file", path = "src/page.tsx" }
predicate = { kind = "contains", pattern = "Leaderboard" }

[[checks]]
id = "C2"
description = "Leaderboard block shows no laps"
target = { kind = "file", path = "src/page.tsx" }
region = { kind = "anchored_block", start = "Leaderboard", end = "/>", max_lines = 5 }
predicate = { kind = "not_contains", pattern = "laps" }
depends_on = "C1"

[[checks]]
id = "C3"
description = "Backend is healthy"
target = { kind = "endpoint", url = "{base_url}/health" }
predicate = { kind = "http_status_in", codes = [200] }

[[checks]]
id = "C4"
description = "Health payload names a status"
target = { kind = "endpoint", url = "{base_url}/health" }
predicate = { kind = "json_field_present", path = "status" }
depends_on = "C3"
"#;

fn live_config(root: PathBuf, base_url: String) -> GateConfig {
    GateConfig {
        base_url,
        root,
        suite_file: Some(PathBuf::from("gate.toml")),
        timeout_ms: 5000,
        ..GateConfig::default()
    }
}

#[test]
fn test_live_run_against_filesystem_and_loopback() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("src")).unwrap();
    std::fs::write(dir.path().join("src/page.tsx"), "<Standings />\n").unwrap();
    std::fs::write(dir.path().join("gate.toml"), LIVE_SUITE).unwrap();

    let (port, handle) = serve(2, "200 OK", r#"{"status":"ok"}"#);
    let config = live_config(dir.path().to_path_buf(), format!("http://127.0.0.1:{}", port));

    let report = run_gate(&config, CancelToken::new()).unwrap();
    handle.join().unwrap();

    let statuses: Vec<Status> = report.results().iter().map(|r| r.status()).collect();
    assert_eq!(
        statuses,
        vec![Status::Fail, Status::Skip, Status::Pass, Status::Pass]
    );
    assert_eq!(report.exit_code(), 1);
}

#[test]
fn test_live_unreachable_backend_is_classified() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("src")).unwrap();
    std::fs::write(dir.path().join("src/page.tsx"), "<Leaderboard rows={rows} />\n").unwrap();
    std::fs::write(dir.path().join("gate.toml"), LIVE_SUITE).unwrap();

    let config = live_config(
        dir.path().to_path_buf(),
        format!("http://127.0.0.1:{}", closed_port()),
    );
    let report = run_gate(&config, CancelToken::new()).unwrap();

    assert_eq!(report.get("C1").unwrap().status(), Status::Pass);
    assert_eq!(report.get("C2").unwrap().status(), Status::Pass);
    let c3 = report.get("C3").unwrap();
    assert_eq!(c3.status(), Status::Fail);
    assert_eq!(c3.kind(), Some(FailureKind::Unreachable));
    assert_eq!(report.get("C4").unwrap().status(), Status::Skip);
}

#[test]
fn test_live_missing_primary_artifact() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("gate.toml"), LIVE_SUITE).unwrap();

    let config = live_config(dir.path().to_path_buf(), "http://127.0.0.1:9".to_string());
    assert!(matches!(
        run_gate(&config, CancelToken::new()),
        Err(GateError::PrimaryArtifactMissing { .. })
    ));
}

/// Serves one request, cancelling `token` after reading it and before
/// answering, as a stop signal arriving mid-request would.
fn serve_and_cancel(token: CancelToken) -> (u16, thread::JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let handle = thread::spawn(move || {
        let Ok((mut stream, _)) = listener.accept() else {
            return;
        };
        let mut buf = [0u8; 4096];
        let _ = stream.read(&mut buf);
        token.cancel();
        let body = r#"{"status":"ok"}"#;
        let response = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            body.len(),
            body
        );
        let _ = stream.write_all(response.as_bytes());
    });
    (port, handle)
}

#[test]
fn test_live_cancel_mid_request_reports_finished_checks() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("src")).unwrap();
    std::fs::write(dir.path().join("src/page.tsx"), "<Leaderboard rows={rows} />\n").unwrap();
    std::fs::write(dir.path().join("gate.toml"), LIVE_SUITE).unwrap();

    let token = CancelToken::new();
    let (port, handle) = serve_and_cancel(token.clone());
    let config = live_config(dir.path().to_path_buf(), format!("http://127.0.0.1:{}", port));

    let report = run_gate(&config, token).unwrap();
    handle.join().unwrap();

    // The request in flight completes; C4 never starts.
    assert!(report.is_cancelled());
    let ids: Vec<&str> = report.results().iter().map(|r| r.check_id()).collect();
    assert_eq!(ids, vec!["C1", "C2", "C3"]);
    assert_eq!(report.get("C3").unwrap().status(), Status::Pass);
    assert!(report.get("C4").is_none());
    assert_eq!(report.exit_code(), 0);

    let output = TerminalFormatter::new(false, false).format(&report);
    assert!(output.contains("CANCELLED: 1 check(s) never started"));
    assert!(output.contains("VERDICT: PASS (exit code 0)"));
}
