//! Typed records returned by the daemon's status procedures.

use serde::Serialize;

use crate::xmlrpc::{FromValue, Members, Value, ValueError};

/// Status of one supervised process, as returned by `getProcessInfo`,
/// `getAllProcessInfo`, and the bulk start/stop procedures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessInfo {
    pub name: String,
    pub group: String,
    /// Human-readable state summary, e.g. `"pid 4821, uptime 0:08:20"`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Epoch seconds the process last started.
    pub start: i64,
    /// Epoch seconds the process last stopped; 0 if never.
    pub stop: i64,
    /// Epoch seconds on the daemon when the record was produced.
    pub now: i64,
    pub state: i64,
    pub statename: String,
    pub spawnerr: String,
    pub exitstatus: i64,
    /// Deprecated alias of `stdout_logfile`, passed through only when the
    /// daemon sends it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logfile: Option<String>,
    pub stdout_logfile: String,
    pub stderr_logfile: String,
    /// 0 when not running.
    pub pid: i64,
}

impl ProcessInfo {
    /// The identifier the daemon accepts back: `group:name`, or the bare
    /// name for a process that is its own group.
    pub fn full_name(&self) -> String {
        if self.group == self.name {
            self.name.clone()
        } else {
            format!("{}:{}", self.group, self.name)
        }
    }

    /// The state code as a known [`ProcessState`], if it is one.
    pub fn process_state(&self) -> Option<ProcessState> {
        ProcessState::from_code(self.state)
    }

    pub fn is_running(&self) -> bool {
        self.process_state()
            .is_some_and(|s| s == ProcessState::Running)
    }
}

impl FromValue for ProcessInfo {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        let mut m = Members::new(value)?;
        Ok(Self {
            name: m.required("name")?,
            group: m.required("group")?,
            description: m.optional("description")?,
            start: m.required("start")?,
            stop: m.required("stop")?,
            now: m.required("now")?,
            state: m.required("state")?,
            statename: m.required("statename")?,
            spawnerr: m.required("spawnerr")?,
            exitstatus: m.required("exitstatus")?,
            logfile: m.optional("logfile")?,
            stdout_logfile: m.required("stdout_logfile")?,
            stderr_logfile: m.required("stderr_logfile")?,
            pid: m.required("pid")?,
        })
    }
}

/// Process states as numbered by the daemon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProcessState {
    Stopped,
    Starting,
    Running,
    Backoff,
    Stopping,
    Exited,
    Fatal,
    Unknown,
}

impl ProcessState {
    pub fn code(self) -> i64 {
        match self {
            ProcessState::Stopped => 0,
            ProcessState::Starting => 10,
            ProcessState::Running => 20,
            ProcessState::Backoff => 30,
            ProcessState::Stopping => 40,
            ProcessState::Exited => 100,
            ProcessState::Fatal => 200,
            ProcessState::Unknown => 1000,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        Some(match code {
            0 => ProcessState::Stopped,
            10 => ProcessState::Starting,
            20 => ProcessState::Running,
            30 => ProcessState::Backoff,
            40 => ProcessState::Stopping,
            100 => ProcessState::Exited,
            200 => ProcessState::Fatal,
            1000 => ProcessState::Unknown,
            _ => return None,
        })
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ProcessState::Stopped => "STOPPED",
            ProcessState::Starting => "STARTING",
            ProcessState::Running => "RUNNING",
            ProcessState::Backoff => "BACKOFF",
            ProcessState::Stopping => "STOPPING",
            ProcessState::Exited => "EXITED",
            ProcessState::Fatal => "FATAL",
            ProcessState::Unknown => "UNKNOWN",
        }
    }
}

impl std::fmt::Display for ProcessState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The daemon's own state, from `supervisor.getState`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SupervisorState {
    /// 2 fatal, 1 running, 0 restarting, -1 shutdown.
    pub statecode: i64,
    pub statename: String,
}

impl FromValue for SupervisorState {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        let mut m = Members::new(value)?;
        Ok(Self {
            statecode: m.required("statecode")?,
            statename: m.required("statename")?,
        })
    }
}
