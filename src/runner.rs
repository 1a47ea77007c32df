//! Running one test suite executable on a filtered copy of its data file.

use crate::error::{Error, Result};
use crate::filter::Filter;
use crate::stanza::{copy_matching, CopyStats};
use std::ffi::{OsStr, OsString};
use std::fmt;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tempfile::TempPath;
use tracing::{debug, info};

pub const DATAX_EXTENSION: &str = "datax";

/// Settings shared by every executable of a batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunConfig {
    /// Command tokens placed before the executable, e.g. a debugger.
    pub wrapper: Vec<String>,
    /// Flags passed to the executable before the data file name.
    pub extra_args: Vec<String>,
    /// Keep the filtered data files instead of removing them.
    pub keep: bool,
}

/// Directory an executable runs in; `.` for a bare file name.
pub fn executable_dir(executable: &Path) -> &Path {
    match executable.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    }
}

/// Finds `<exe>.datax`, falling back to `<exe-without-extension>.datax`.
pub fn find_data_file(executable: &Path) -> Result<PathBuf> {
    let name = executable
        .file_name()
        .ok_or_else(|| Error::InvalidExecutable(executable.to_path_buf()))?;
    let dir = executable_dir(executable);

    let mut appended = name.to_os_string();
    appended.push(".");
    appended.push(DATAX_EXTENSION);
    let candidates = [
        dir.join(appended),
        dir.join(Path::new(name).with_extension(DATAX_EXTENSION)),
    ];

    for candidate in candidates {
        debug!(candidate = %candidate.display(), "looking for data file");
        if candidate.is_file() {
            return Ok(candidate);
        }
    }

    Err(Error::DataFileNotFound {
        executable: executable.to_path_buf(),
    })
}

/// An executable together with its data file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub executable: PathBuf,
    pub data_file: PathBuf,
}

impl Target {
    pub fn resolve(executable: &Path) -> Result<Self> {
        let data_file = find_data_file(executable)?;
        Ok(Self {
            executable: executable.to_path_buf(),
            data_file,
        })
    }

    pub fn directory(&self) -> &Path {
        executable_dir(&self.executable)
    }

    pub fn name(&self) -> &OsStr {
        self.executable
            .file_name()
            .unwrap_or_else(|| self.executable.as_os_str())
    }
}

#[derive(Debug)]
enum Location {
    Scoped(TempPath),
    Kept(PathBuf),
}

/// Filtered copy of a target's data file, written next to the executable.
///
/// Unless kept, the file is removed when this value is dropped.
#[derive(Debug)]
pub struct FilteredDatax {
    location: Location,
    stats: CopyStats,
}

impl FilteredDatax {
    pub fn create(target: &Target, filter: &Filter, keep: bool) -> Result<Self> {
        let input = BufReader::new(File::open(&target.data_file)?);

        let mut prefix = target.name().to_os_string();
        prefix.push("-");
        let suffix = format!(".{}", DATAX_EXTENSION);
        let mut temp = tempfile::Builder::new()
            .prefix(&prefix)
            .suffix(&suffix)
            .tempfile_in(target.directory())?;

        let stats = copy_matching(input, BufWriter::new(temp.as_file_mut()), |line| {
            filter.matches(line)
        })?;
        debug!(
            data_file = %target.data_file.display(),
            selected = stats.selected,
            stanzas = stats.stanzas,
            "filtered data file"
        );

        let location = if keep {
            let (_, path) = temp.keep().map_err(|e| e.error)?;
            info!(path = %path.display(), "keeping filtered data file");
            Location::Kept(path)
        } else {
            Location::Scoped(temp.into_temp_path())
        };

        Ok(Self { location, stats })
    }

    pub fn path(&self) -> &Path {
        match &self.location {
            Location::Scoped(path) => &**path,
            Location::Kept(path) => path.as_path(),
        }
    }

    pub fn file_name(&self) -> &OsStr {
        let path = self.path();
        path.file_name().unwrap_or_else(|| path.as_os_str())
    }

    pub fn is_kept(&self) -> bool {
        matches!(self.location, Location::Kept(_))
    }

    pub fn stats(&self) -> CopyStats {
        self.stats
    }
}

/// A fully built command line for one test suite run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: OsString,
    pub args: Vec<OsString>,
    pub cwd: PathBuf,
}

impl Invocation {
    /// `wrapper... ./<exe> [extra args...] <datax>`, run in the executable's directory.
    pub fn new(config: &RunConfig, target: &Target, datax_name: &OsStr) -> Self {
        let mut argv: Vec<OsString> = config.wrapper.iter().map(OsString::from).collect();
        argv.push(Path::new(".").join(target.name()).into_os_string());
        argv.extend(config.extra_args.iter().map(OsString::from));
        argv.push(datax_name.to_os_string());

        let program = argv.remove(0);
        Self {
            program,
            args: argv,
            cwd: target.directory().to_path_buf(),
        }
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.to_string_lossy())?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}

/// Starts a test suite process and waits for it.
pub trait Launcher {
    /// Returns the exit status: the exit code, or `-signal` if killed.
    fn launch(&mut self, invocation: &Invocation) -> Result<i32>;
}

/// Launches real child processes.
///
/// Ctrl-C reaches the running suite as well; the launcher only records it
/// and fails with [`Error::Interrupted`] once the suite has exited, so the
/// caller still unwinds and removes the filtered data file.
#[derive(Debug, Default, Clone)]
pub struct SystemLauncher {
    interrupted: Arc<AtomicBool>,
}

impl SystemLauncher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Routes the process-wide Ctrl-C handler to a new launcher.
    pub fn with_interrupt_handler() -> Result<Self> {
        let launcher = Self::new();
        let flag = Arc::clone(&launcher.interrupted);
        ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst))?;
        Ok(launcher)
    }

    pub fn interrupt(&self) {
        self.interrupted.store(true, Ordering::SeqCst);
    }

    fn check_interrupted(&self) -> Result<()> {
        if self.interrupted.load(Ordering::SeqCst) {
            return Err(Error::Interrupted);
        }
        Ok(())
    }
}

impl Launcher for SystemLauncher {
    fn launch(&mut self, invocation: &Invocation) -> Result<i32> {
        self.check_interrupted()?;
        let status = Command::new(&invocation.program)
            .args(&invocation.args)
            .current_dir(&invocation.cwd)
            .status()
            .map_err(|source| Error::Spawn {
                program: invocation.program.to_string_lossy().into_owned(),
                source,
            })?;
        self.check_interrupted()?;
        Ok(exit_status_code(status))
    }
}

pub fn exit_status_code(status: ExitStatus) -> i32 {
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return -signal;
        }
    }
    status.code().unwrap_or(-1)
}

/// Runs one target on a filtered copy of its data file.
pub fn run_target<L>(target: &Target, filter: &Filter, config: &RunConfig, launcher: &mut L) -> Result<i32>
where
    L: Launcher + ?Sized,
{
    let datax = FilteredDatax::create(target, filter, config.keep)?;
    let invocation = Invocation::new(config, target, datax.file_name());
    info!(
        cwd = %invocation.cwd.display(),
        selected = datax.stats().selected,
        "running {}",
        invocation
    );
    launcher.launch(&invocation)
}
