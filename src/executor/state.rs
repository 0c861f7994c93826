//! Execution state tracking.
//!
//! One [`ExecutionState`] exists per job. Steps running in parallel share it
//! and report their outcome through [`ExecutionState::exit`], the only
//! operation that mutates it. A single mutex guards the build and job records;
//! everything else is immutable after construction.

use super::records::{Build, Job, Repo, System, Workspace};
use super::traits::ContainerClient;
use crate::pipeline::Status;
use parking_lot::Mutex;
use std::fmt;
use std::io::{self, Write};
use std::sync::Arc;

/// Output sink shared by every step of a job
pub type Sink = Box<dyn Write + Send>;

#[derive(Debug, Default)]
struct Records {
    build: Build,
    job: Job,
}

/// State of one job run
pub struct ExecutionState {
    repo: Repo,
    build_last: Option<Build>,
    system: System,
    workspace: Workspace,

    /// Container runtime used to spawn step containers.
    client: Arc<dyn ContainerClient>,

    stdout: Mutex<Sink>,
    stderr: Mutex<Sink>,

    records: Mutex<Records>,
}

impl ExecutionState {
    /// Creates a state for a job run by `client`, writing to the process's
    /// stdout and stderr
    #[must_use]
    pub fn new(client: Arc<dyn ContainerClient>) -> Self {
        Self {
            repo: Repo::default(),
            build_last: None,
            system: System::default(),
            workspace: Workspace::default(),
            client,
            stdout: Mutex::new(Box::new(io::stdout())),
            stderr: Mutex::new(Box::new(io::stderr())),
            records: Mutex::new(Records::default()),
        }
    }

    /// Sets the repository
    #[must_use]
    pub fn with_repo(mut self, repo: Repo) -> Self {
        self.repo = repo;
        self
    }

    /// Sets the current build
    #[must_use]
    pub fn with_build(mut self, build: Build) -> Self {
        self.records.get_mut().build = build;
        self
    }

    /// Sets the previous build of the same branch
    #[must_use]
    pub fn with_build_last(mut self, build: Build) -> Self {
        self.build_last = Some(build);
        self
    }

    /// Sets the current job
    #[must_use]
    pub fn with_job(mut self, job: Job) -> Self {
        self.records.get_mut().job = job;
        self
    }

    /// Sets the system settings
    #[must_use]
    pub fn with_system(mut self, system: System) -> Self {
        self.system = system;
        self
    }

    /// Sets the workspace
    #[must_use]
    pub fn with_workspace(mut self, workspace: Workspace) -> Self {
        self.workspace = workspace;
        self
    }

    /// Redirects step stdout
    #[must_use]
    pub fn with_stdout(mut self, sink: Sink) -> Self {
        self.stdout = Mutex::new(sink);
        self
    }

    /// Redirects step stderr
    #[must_use]
    pub fn with_stderr(mut self, sink: Sink) -> Self {
        self.stderr = Mutex::new(sink);
        self
    }

    /// Records a step's exit code. A non-zero value fails the job and build.
    ///
    /// Zero never clears an earlier failure.
    pub fn exit(&self, code: i32) {
        let mut records = self.records.lock();

        // only persist non-zero exit
        if code != 0 {
            tracing::debug!(code, job = records.job.number, "recording failed exit");
            records.job.exit_code = code;
            records.job.status = Status::Failure;
            records.build.status = Status::Failure;
        }
    }

    /// Exit code of the job, 0 unless a step failed
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        self.records.lock().job.exit_code
    }

    /// Reports whether the job has failed
    #[must_use]
    pub fn failed(&self) -> bool {
        self.exit_code() != 0
    }

    /// Status the job ends with if no further step fails
    #[must_use]
    pub fn final_status(&self) -> Status {
        if self.failed() {
            Status::Failure
        } else {
            Status::Success
        }
    }

    /// Reports whether the outcome differs from the previous build's
    #[must_use]
    pub fn status_changed(&self) -> bool {
        self.build_last
            .as_ref()
            .is_some_and(|last| last.status != self.final_status())
    }

    /// Snapshot of the current build
    #[must_use]
    pub fn build(&self) -> Build {
        self.records.lock().build.clone()
    }

    /// Snapshot of the current job
    #[must_use]
    pub fn job(&self) -> Job {
        self.records.lock().job.clone()
    }

    /// Repository being built
    #[must_use]
    pub fn repo(&self) -> &Repo {
        &self.repo
    }

    /// Previous build, if known
    #[must_use]
    pub fn build_last(&self) -> Option<&Build> {
        self.build_last.as_ref()
    }

    /// System settings
    #[must_use]
    pub fn system(&self) -> &System {
        &self.system
    }

    /// Workspace location
    #[must_use]
    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    /// Container runtime handle
    #[must_use]
    pub fn client(&self) -> &Arc<dyn ContainerClient> {
        &self.client
    }

    /// Writes step output to the stdout sink
    ///
    /// # Errors
    ///
    /// Returns the sink's IO error.
    pub fn write_stdout(&self, buf: &[u8]) -> io::Result<()> {
        let mut sink = self.stdout.lock();
        sink.write_all(buf)?;
        sink.flush()
    }

    /// Writes step output to the stderr sink
    ///
    /// # Errors
    ///
    /// Returns the sink's IO error.
    pub fn write_stderr(&self, buf: &[u8]) -> io::Result<()> {
        let mut sink = self.stderr.lock();
        sink.write_all(buf)?;
        sink.flush()
    }
}

impl fmt::Debug for ExecutionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionState")
            .field("repo", &self.repo.full_name)
            .field("records", &*self.records.lock())
            .field("workspace", &self.workspace)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::executor::traits::HealthStatus;
    use crate::pipeline::{ContainerNode, PipelineError};
    use pretty_assertions::assert_eq;

    /// Client that never runs anything
    pub(crate) struct IdleClient;

    impl ContainerClient for IdleClient {
        fn run(&self, _: &ContainerNode, _: &ExecutionState) -> Result<i32, PipelineError> {
            Ok(0)
        }

        fn health_check(&self) -> HealthStatus {
            HealthStatus::Healthy
        }
    }

    /// Sink whose contents stay readable after the state takes ownership
    #[derive(Clone, Default)]
    pub(crate) struct SharedBuf(pub(crate) Arc<Mutex<Vec<u8>>>);

    impl SharedBuf {
        pub(crate) fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock()).into_owned()
        }
    }

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn running_state() -> ExecutionState {
        ExecutionState::new(Arc::new(IdleClient))
            .with_build(Build {
                number: 7,
                status: Status::Running,
                ..Build::default()
            })
            .with_job(Job {
                number: 1,
                status: Status::Running,
                ..Job::default()
            })
    }

    #[test]
    fn test_new_state_has_not_failed() {
        let state = running_state();
        assert_eq!(state.exit_code(), 0);
        assert!(!state.failed());
        assert_eq!(state.final_status(), Status::Success);
    }

    #[test]
    fn test_exit_zero_is_a_no_op() {
        let state = running_state();
        state.exit(0);

        assert!(!state.failed());
        assert_eq!(state.job().status, Status::Running);
        assert_eq!(state.build().status, Status::Running);
    }

    #[test]
    fn test_exit_non_zero_fails_job_and_build() {
        let state = running_state();
        state.exit(2);

        assert!(state.failed());
        assert_eq!(state.exit_code(), 2);
        assert_eq!(state.job().status, Status::Failure);
        assert_eq!(state.build().status, Status::Failure);
        assert_eq!(state.final_status(), Status::Failure);
    }

    #[test]
    fn test_failure_latches() {
        let state = running_state();
        state.exit(1);
        state.exit(0);

        assert!(state.failed());
        assert_eq!(state.exit_code(), 1);
    }

    #[test]
    fn test_later_failure_overwrites_code() {
        let state = running_state();
        state.exit(1);
        state.exit(137);

        assert_eq!(state.exit_code(), 137);
        assert_eq!(state.job().status, Status::Failure);
    }

    #[test]
    fn test_concurrent_exits_fail_iff_any_non_zero() {
        let state = running_state();

        std::thread::scope(|scope| {
            for i in 0..64 {
                let state = &state;
                scope.spawn(move || {
                    let code = if i == 41 { 3 } else { 0 };
                    state.exit(code);
                    let _ = state.failed();
                });
            }
        });

        assert!(state.failed());
        assert_eq!(state.exit_code(), 3);
        assert_eq!(state.build().status, Status::Failure);
    }

    #[test]
    fn test_concurrent_zero_exits_stay_green() {
        let state = running_state();

        std::thread::scope(|scope| {
            for _ in 0..64 {
                scope.spawn(|| state.exit(0));
            }
        });

        assert!(!state.failed());
        assert_eq!(state.build().status, Status::Running);
    }

    #[test]
    fn test_status_changed_against_previous_build() {
        let state = running_state().with_build_last(Build {
            status: Status::Failure,
            ..Build::default()
        });
        assert!(state.status_changed());

        state.exit(1);
        assert!(!state.status_changed());

        assert!(!running_state().status_changed());
    }

    #[test]
    fn test_output_goes_to_sinks() {
        let out = SharedBuf::default();
        let err = SharedBuf::default();
        let state = running_state()
            .with_stdout(Box::new(out.clone()))
            .with_stderr(Box::new(err.clone()));

        state.write_stdout(b"hello\n").unwrap();
        state.write_stderr(b"oops\n").unwrap();

        assert_eq!(out.contents(), "hello\n");
        assert_eq!(err.contents(), "oops\n");
    }

    #[test]
    fn test_accessors() {
        let state = running_state()
            .with_repo(Repo::new("octocat", "hello-world"))
            .with_workspace(Workspace::default());

        assert_eq!(state.repo().full_name, "octocat/hello-world");
        assert_eq!(state.workspace().path, std::path::PathBuf::from("/drone/src"));
        assert!(state.build_last().is_none());
        assert!(state.client().health_check().is_operational());
        assert!(format!("{state:?}").contains("octocat/hello-world"));
    }
}
