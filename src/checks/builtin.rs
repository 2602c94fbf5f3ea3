//! Built-in suite for the conventional application layout.
//!
//! The layout is a telemetry dashboard: a React front end under `frontend/`,
//! an edge function under `edge/functions/`, a backend API at `{base_url}`
//! and the front-end dev server at `{frontend_url}`. Projects with a
//! different layout pass `--suite` instead.

use crate::checks::{Check, EndpointTarget, Predicate, RegionSelector, Suite, Target};
use crate::GateError;

pub const DASHBOARD_PAGE: &str = "frontend/src/pages/Dashboard.tsx";
pub const TELEMETRY_FUNCTION: &str = "edge/functions/session-telemetry/index.ts";

pub fn default_suite() -> Result<Suite, GateError> {
    Suite::builder("telemetry-dashboard")
        .primary_artifact(DASHBOARD_PAGE)
        // Front end
        .check(Check::new(
            "UI-001",
            "Dashboard renders the leaderboard",
            Target::file(DASHBOARD_PAGE),
            Predicate::contains("Leaderboard"),
        ))
        .check(
            Check::new(
                "UI-002",
                "Leaderboard block does not render lap rows",
                Target::file(DASHBOARD_PAGE),
                Predicate::not_contains("laps"),
            )
            .region(RegionSelector::anchored("<Leaderboard", "/>", true).max_lines(5))
            .depends_on("UI-001"),
        )
        .check(Check::new(
            "UI-003",
            "Dashboard is free of debugging leftovers",
            Target::file(DASHBOARD_PAGE),
            Predicate::contains_none_of(&["console.log(", "debugger;"]),
        ))
        // Edge function
        .check(Check::new(
            "EDGE-001",
            "Telemetry function answers CORS preflight",
            Target::file(TELEMETRY_FUNCTION),
            Predicate::contains_all_of(&["Access-Control-Allow-Origin", "OPTIONS"]),
        ))
        .check(
            Check::new(
                "EDGE-002",
                "Telemetry handler reads the session id from the request",
                Target::file(TELEMETRY_FUNCTION),
                Predicate::contains("session_id"),
            )
            .region(RegionSelector::function_scope("serve(", 40))
            .depends_on("EDGE-001"),
        )
        .check(Check::new(
            "EDGE-003",
            "Telemetry function embeds no credentials",
            Target::file(TELEMETRY_FUNCTION),
            Predicate::contains_none_of(&["sk_live_", "BEGIN PRIVATE KEY"]),
        ))
        // Backend
        .check(Check::new(
            "API-001",
            "Backend health endpoint answers 200",
            Target::endpoint("{base_url}/health"),
            Predicate::http_status_in(&[200]),
        ))
        .check(
            Check::new(
                "API-002",
                "Health payload reports a status",
                Target::endpoint("{base_url}/health"),
                Predicate::json_field_present("status"),
            )
            .depends_on("API-001"),
        )
        .check(
            Check::new(
                "API-003",
                "Session laps endpoint serves lap data",
                Target::Endpoint(
                    EndpointTarget::new("{base_url}/sessions/{entity}/laps")
                        .header("Accept", "application/json"),
                ),
                Predicate::json_field_present("laps"),
            )
            .advisory()
            .depends_on("API-001"),
        )
        // Front-end server
        .check(
            Check::new(
                "WEB-001",
                "Front-end server is up",
                Target::endpoint("{frontend_url}/"),
                Predicate::http_status_in(&[200]),
            )
            .advisory(),
        )
        .build()
}
