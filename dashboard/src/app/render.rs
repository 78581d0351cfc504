//! Terminal rendering

use std::io::{self, Write};

use chrono::{DateTime, Utc};
use colored::{ColoredString, Colorize};
use openapi_client::models::ProjectInfo;

use crate::models::build::BuildRecord;
use crate::observe::snapshot::{
    FetchOutcome, LogSnapshot, EMPTY_PLACEHOLDER, NOT_FOUND_PLACEHOLDER, RETRY_MESSAGE,
};
use crate::observe::status::{classify, LifecycleState};
use crate::utils::describe_start_time;

/// Colored status badge
pub fn status_badge(state: LifecycleState) -> ColoredString {
    let label = state.label();
    match state {
        LifecycleState::InProgress => label.yellow().bold(),
        LifecycleState::Succeeded => label.green().bold(),
        LifecycleState::Failed => label.red().bold(),
        LifecycleState::New | LifecycleState::Unknown => label.dimmed(),
    }
}

/// Display name of a project framework
pub fn framework_label(framework: &str) -> &str {
    match framework {
        "react" => "React",
        "springboot" => "Spring Boot",
        "fastapi" => "FastAPI",
        other => other,
    }
}

/// Write the project cards
pub fn write_projects(
    out: &mut impl Write,
    projects: &[ProjectInfo],
) -> io::Result<()> {
    if projects.is_empty() {
        writeln!(out, "No projects yet")?;
        return Ok(());
    }

    for project in projects {
        let state = classify(&project.last_build_status);
        writeln!(
            out,
            "#{} {} [{}] {}",
            project.id,
            project.name.bold(),
            status_badge(state),
            framework_label(&project.framework)
        )?;
        writeln!(out, "    {}", project.git_url)?;
        if let (LifecycleState::Succeeded, Some(url)) = (state, &project.deployed_url) {
            writeln!(out, "    live at {}", url)?;
        }
        if let Some(run) = &project.last_pipeline_run_name {
            writeln!(out, "    last run {}", run)?;
        }
    }
    Ok(())
}

/// Write a project's build list
pub fn write_history(
    out: &mut impl Write,
    project_name: &str,
    builds: &[BuildRecord],
    now: DateTime<Utc>,
) -> io::Result<()> {
    writeln!(out, "Build History: {}", project_name.bold())?;
    if builds.is_empty() {
        writeln!(out, "No builds found for this project")?;
        return Ok(());
    }
    for build in builds {
        writeln!(
            out,
            "  Build #{:<6} {:<10} {}",
            build.id,
            status_badge(build.lifecycle()),
            describe_start_time(&build.start_time, now)
        )?;
    }
    Ok(())
}

/// Write the header of a build's log pane
pub fn write_build_header(
    out: &mut impl Write,
    build: &BuildRecord,
    now: DateTime<Utc>,
) -> io::Result<()> {
    writeln!(
        out,
        "Build #{} Logs [{}] {}",
        build.id,
        status_badge(build.lifecycle()),
        describe_start_time(&build.start_time, now)
    )
}

/// Streams a log pane to a terminal.
///
/// Snapshots carry the whole log; only the part not printed yet is written.
#[derive(Debug, Default)]
pub struct LogPrinter {
    printed: String,
    last_outcome: Option<FetchOutcome>,
}

impl LogPrinter {
    /// Forget what was printed, e.g. when a new build is shown
    pub fn reset(&mut self) {
        self.printed.clear();
        self.last_outcome = None;
    }

    /// Print whatever `snapshot` adds to the pane
    pub fn print(&mut self, out: &mut impl Write, snapshot: &LogSnapshot) -> io::Result<()> {
        let changed = self.last_outcome != snapshot.outcome;
        match snapshot.outcome {
            None => {}
            Some(FetchOutcome::Ok) => {
                match snapshot.text.strip_prefix(self.printed.as_str()) {
                    Some(rest) => out.write_all(rest.as_bytes())?,
                    None => {
                        writeln!(out, "{}", "--- log rewritten ---".dimmed())?;
                        out.write_all(snapshot.text.as_bytes())?;
                    }
                }
                if snapshot.text.is_empty() && changed {
                    writeln!(out, "{}", EMPTY_PLACEHOLDER.dimmed())?;
                }
                self.printed = snapshot.text.clone();
            }
            Some(FetchOutcome::NotFound) => {
                if changed {
                    writeln!(out, "{}", NOT_FOUND_PLACEHOLDER.dimmed())?;
                }
            }
            Some(FetchOutcome::Error) => {
                if changed {
                    let message = snapshot.message.as_deref().unwrap_or(RETRY_MESSAGE);
                    writeln!(out, "[{}]", message.yellow())?;
                }
            }
        }
        self.last_outcome = snapshot.outcome;
        out.flush()
    }
}
