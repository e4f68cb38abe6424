use std::ffi::OsStr;
use std::io::{self, Read as _, Write as _};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, ExitStatus, Stdio};
use std::sync::OnceLock;
use std::thread::JoinHandle;

use crate::foundation::error::{AvError, AvResult};

/// Base name of the external transcoder binary.
pub const TRANSCODER_NAME: &str = "ffmpeg";

/// Handle to a located transcoder binary.
///
/// The encoder listing is queried lazily, at most once per `Transcoder`.
#[derive(Debug)]
pub struct Transcoder {
    bin: PathBuf,
    catalog: OnceLock<EncoderCatalog>,
}

impl Transcoder {
    /// Locate the transcoder: beside the running executable first (self-contained bundles), then
    /// on `PATH`.
    pub fn locate() -> AvResult<Self> {
        Self::locate_with(None)
    }

    /// Like [`Transcoder::locate`], but try `explicit` first when given.
    pub fn locate_with(explicit: Option<&Path>) -> AvResult<Self> {
        let mut tried = Vec::new();
        let candidates = explicit
            .map(Path::to_path_buf)
            .into_iter()
            .chain(bundled_candidate())
            .chain(std::iter::once(PathBuf::from(TRANSCODER_NAME)));
        for bin in candidates {
            if probe(&bin) {
                tracing::debug!(bin = %bin.display(), "located transcoder");
                return Ok(Self {
                    bin,
                    catalog: OnceLock::new(),
                });
            }
            tried.push(bin.display().to_string());
        }
        Err(AvError::transcoder_unavailable(format!(
            "{TRANSCODER_NAME} was not found (tried: {})",
            tried.join(", ")
        )))
    }

    /// Use `bin` as the transcoder without checking that it runs.
    ///
    /// Failures surface on first use: the encoder listing or the spawn.
    pub fn with_binary(bin: impl Into<PathBuf>) -> Self {
        Self {
            bin: bin.into(),
            catalog: OnceLock::new(),
        }
    }

    /// Path of the transcoder binary.
    pub fn binary(&self) -> &Path {
        &self.bin
    }

    /// A fresh command for the transcoder with platform tweaks applied.
    pub fn command(&self) -> Command {
        quiet_command(&self.bin)
    }

    /// Encoders supported by this transcoder build (`-encoders -hide_banner`), queried once.
    pub fn catalog(&self) -> AvResult<&EncoderCatalog> {
        if let Some(catalog) = self.catalog.get() {
            return Ok(catalog);
        }
        let out = self
            .command()
            .args(["-encoders", "-hide_banner"])
            .stdin(Stdio::null())
            .output()
            .map_err(|e| {
                AvError::transcoder_unavailable(format!("failed to list encoders: {e}"))
            })?;
        if !out.status.success() {
            return Err(AvError::transcoder_unavailable(format!(
                "encoder listing exited with {}: {}",
                out.status,
                String::from_utf8_lossy(&out.stderr).trim()
            )));
        }
        let catalog = EncoderCatalog::parse(&String::from_utf8_lossy(&out.stdout));
        tracing::debug!(encoders = catalog.len(), "queried transcoder encoders");
        let _ = self.catalog.set(catalog);
        self.catalog
            .get()
            .ok_or_else(|| AvError::transcoder_unavailable("encoder catalog unavailable"))
    }

    /// Spawn the transcoder with `args`, piping stdin (frames) and stderr (log).
    pub fn spawn<I, S>(&self, args: I) -> AvResult<TranscoderProcess>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut cmd = self.command();
        cmd.args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());

        let mut child = cmd.spawn().map_err(|e| {
            AvError::transcoder_unavailable(format!(
                "failed to spawn '{}': {e}",
                self.bin.display()
            ))
        })?;
        let stdin = child.stdin.take();
        let stderr = child.stderr.take();
        let stderr_drain = stderr.map(|mut stderr| {
            std::thread::spawn(move || {
                let mut bytes = Vec::new();
                stderr.read_to_end(&mut bytes)?;
                Ok(bytes)
            })
        });
        if stdin.is_none() {
            let _ = child.kill();
            let _ = child.wait();
            return Err(AvError::transcoder_unavailable(
                "failed to open transcoder stdin (unexpected)",
            ));
        }
        Ok(TranscoderProcess {
            child,
            stdin,
            stderr_drain,
            reaped: false,
        })
    }
}

/// Exit status plus everything the transcoder wrote to stderr.
#[derive(Debug)]
pub struct TranscoderExit {
    /// Process exit status.
    pub status: ExitStatus,
    /// Captured stderr, lossily decoded.
    pub stderr: String,
}

/// A running transcoder process.
///
/// stdin is always closed before the child is waited on. Dropping an unreaped process kills and
/// reaps it.
#[derive(Debug)]
pub struct TranscoderProcess {
    child: Child,
    stdin: Option<ChildStdin>,
    stderr_drain: Option<JoinHandle<io::Result<Vec<u8>>>>,
    reaped: bool,
}

impl TranscoderProcess {
    /// Write raw bytes to stdin. Blocks while the transcoder's input buffer is full.
    pub fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        match self.stdin.as_mut() {
            Some(stdin) => stdin.write_all(bytes),
            None => Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "transcoder stdin already closed",
            )),
        }
    }

    /// Close stdin, signalling end of stream.
    pub fn close_stdin(&mut self) {
        drop(self.stdin.take());
    }

    /// Send a termination signal. [`TranscoderProcess::wait`] must still be called to reap it.
    pub fn terminate(&mut self) {
        self.close_stdin();
        if let Err(e) = self.child.kill() {
            tracing::debug!(error = %e, "transcoder already exited before terminate");
        }
    }

    /// Close stdin, wait for exit and collect stderr.
    pub fn wait(&mut self) -> AvResult<TranscoderExit> {
        self.close_stdin();
        let status = self.child.wait().map_err(|e| {
            AvError::transcoder_crashed(format!("failed to wait for transcoder: {e}"), "")
        })?;
        self.reaped = true;
        let stderr = self.drain_stderr();
        Ok(TranscoderExit { status, stderr })
    }

    fn drain_stderr(&mut self) -> String {
        match self.stderr_drain.take().map(JoinHandle::join) {
            Some(Ok(Ok(bytes))) => String::from_utf8_lossy(&bytes).into_owned(),
            Some(Ok(Err(e))) => format!("<failed to read transcoder stderr: {e}>"),
            Some(Err(_)) => "<transcoder stderr drain thread panicked>".to_owned(),
            None => String::new(),
        }
    }
}

impl Drop for TranscoderProcess {
    fn drop(&mut self) {
        if !self.reaped {
            self.terminate();
            let _ = self.child.wait();
        }
    }
}

/// Encoder identifiers parsed from the transcoder's `-encoders` listing.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EncoderCatalog {
    names: Vec<String>,
}

impl EncoderCatalog {
    /// Parse an `-encoders` listing.
    ///
    /// Entries follow the `------` separator line and look like ` V....D libx264  description`.
    /// A listing without a separator is parsed line by line.
    pub fn parse(listing: &str) -> Self {
        let body = match listing.find("------") {
            Some(pos) => listing[pos..].split_once('\n').map_or("", |(_, rest)| rest),
            None => listing,
        };
        let names = body
            .lines()
            .filter_map(|line| {
                let mut tokens = line.split_whitespace();
                let flags = tokens.next()?;
                let name = tokens.next()?;
                is_flag_column(flags).then(|| name.to_owned())
            })
            .collect();
        Self { names }
    }

    /// Build a catalog from known encoder names.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Parsed encoder identifiers in listing order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Number of parsed encoders.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// `true` when no encoders were parsed.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// `true` when `id` occurs (as a substring) in some listed encoder name.
    pub fn supports(&self, id: &str) -> bool {
        !id.is_empty() && self.names.iter().any(|n| n.contains(id))
    }

    /// First candidate supported by this catalog.
    pub fn pick<'a>(&self, candidates: &'a [String]) -> Option<&'a str> {
        candidates
            .iter()
            .find(|c| self.supports(c))
            .map(String::as_str)
    }
}

fn is_flag_column(s: &str) -> bool {
    s.len() == 6 && s.chars().all(|c| "VASFXBD.".contains(c))
}

fn bundled_candidate() -> Option<PathBuf> {
    let exe = std::env::current_exe().ok()?;
    let candidate = exe.parent()?.join(binary_file_name());
    candidate.is_file().then_some(candidate)
}

fn binary_file_name() -> String {
    if cfg!(windows) {
        format!("{TRANSCODER_NAME}.exe")
    } else {
        TRANSCODER_NAME.to_owned()
    }
}

fn quiet_command(bin: &Path) -> Command {
    #[allow(unused_mut)]
    let mut cmd = Command::new(bin);
    #[cfg(windows)]
    {
        use std::os::windows::process::CommandExt as _;
        const CREATE_NO_WINDOW: u32 = 0x0800_0000;
        cmd.creation_flags(CREATE_NO_WINDOW);
    }
    cmd
}

fn probe(bin: &Path) -> bool {
    quiet_command(bin)
        .arg("-version")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

#[cfg(test)]
#[path = "../../tests/unit/encode/transcoder.rs"]
mod tests;
