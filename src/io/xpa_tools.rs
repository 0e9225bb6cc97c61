//! Transport driving the XPA command-line tools
//!
//! Each request spawns one of `xpaget`, `xpaset` or `xpaaccess` and waits for
//! it to exit. Server-side failures come back on stderr as `XPA$ERROR` lines
//! and are turned into error replies; a tool that cannot be spawned at all is
//! a `Connection` error.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use std::time::Duration;

use crate::error::Result;
use crate::io::access_point::{Access, AccessPoint, Target};
use crate::io::transport::Transport;
use crate::protocol::decode::decode_scalar;
use crate::protocol::reply::Reply;
use tracing::{debug, trace, warn};

const ERROR_PREFIX: &str = "XPA$ERROR";

/// Transport spawning `xpaget`/`xpaset`/`xpaaccess`
///
/// # Examples
///
/// ```no_run
/// use ds9_rust::io::xpa_tools::XpaToolsTransport;
/// use ds9_rust::io::SessionBuilder;
///
/// let transport = XpaToolsTransport::new().with_program_dir("/opt/xpa/bin");
/// let mut session = SessionBuilder::new().transport(transport).build();
/// println!("{}", session.version()?);
/// # Ok::<(), ds9_rust::Ds9Error>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct XpaToolsTransport {
    program_dir: Option<PathBuf>,
    timeout: Option<Duration>,
}

impl XpaToolsTransport {
    /// Tools resolved through `PATH`
    pub fn new() -> Self {
        Self::default()
    }

    /// Look the tools up in `dir` instead of `PATH`
    pub fn with_program_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.program_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Short and long XPA timeouts (`-t`), whole seconds
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    fn program(&self, tool: &str) -> PathBuf {
        match &self.program_dir {
            Some(dir) => dir.join(tool),
            None => PathBuf::from(tool),
        }
    }

    fn command(&self, tool: &str) -> Command {
        let mut cmd = Command::new(self.program(tool));
        if let Some(timeout) = self.timeout {
            let secs = timeout.as_secs().max(1);
            cmd.arg("-t").arg(format!("{},{}", secs, secs));
        }
        cmd
    }

    fn run(&self, mut cmd: Command, stdin: Option<&[u8]>) -> Result<Output> {
        trace!("Spawning {:?}", cmd);
        cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
        cmd.stdin(if stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        });

        let mut child = cmd.spawn()?;
        let written = match (stdin, child.stdin.take()) {
            // the pipe is closed when it goes out of scope
            (Some(data), Some(mut pipe)) => pipe.write_all(data),
            _ => Ok(()),
        };
        let output = child.wait_with_output()?;
        settle(output, written)
    }

    /// One get against a single target
    fn get_one(&self, target: &str, server: &str, command: &str) -> Result<Option<Reply>> {
        let mut cmd = self.command("xpaget");
        cmd.arg(target).arg(command);
        let output = self.run(cmd, None)?;
        Ok(reply_from_output(server, output))
    }

    /// Access points matching a template, when there is more than one
    fn fan_out(&mut self, target: &str, access: Access) -> Result<Vec<AccessPoint>> {
        match target.parse::<Target>() {
            Ok(Target::Template { .. }) => Ok(self
                .lookup(target)?
                .into_iter()
                .filter(|ap| ap.access.contains(access))
                .collect()),
            _ => Ok(Vec::new()),
        }
    }
}

/// Error text from `XPA$ERROR` lines on stderr
fn xpa_error(stderr: &str) -> Option<String> {
    let messages: Vec<&str> = stderr
        .lines()
        .filter_map(|line| line.trim().strip_prefix(ERROR_PREFIX))
        .map(str::trim)
        .collect();
    if messages.is_empty() {
        None
    } else {
        Some(messages.join("\n"))
    }
}

/// Whether stderr reports that nothing matched the target
fn no_match(stderr: &str) -> bool {
    stderr.contains("no 'xpaget' access points")
        || stderr.contains("no 'xpaset' access points")
        || stderr.contains("no access points")
}

/// Combine a finished tool run with the outcome of writing its stdin
///
/// A tool that rejects a request exits before reading all of its input. The
/// `XPA$ERROR` text it left on stderr is kept in that case; the write failure
/// is reported only when there is none.
fn settle(output: Output, written: std::io::Result<()>) -> Result<Output> {
    match written {
        Ok(()) => Ok(output),
        Err(e) if xpa_error(&String::from_utf8_lossy(&output.stderr)).is_some() => {
            debug!("Tool stopped reading its input ({}), keeping its error", e);
            Ok(output)
        }
        Err(e) => Err(e.into()),
    }
}

fn reply_from_output(server: &str, output: Output) -> Option<Reply> {
    let stderr = String::from_utf8_lossy(&output.stderr);

    if let Some(message) = xpa_error(&stderr) {
        if no_match(&message) {
            debug!("No access point matched {}", server);
            return None;
        }
        return Some(Reply::error(server, message));
    }
    if !output.status.success() {
        if no_match(&stderr) || stderr.trim().is_empty() {
            return None;
        }
        return Some(Reply::error(server, stderr.trim().to_string()));
    }
    Some(Reply::new(server, output.stdout))
}

impl Transport for XpaToolsTransport {
    fn lookup(&mut self, template: &str) -> Result<Vec<AccessPoint>> {
        let target: Target = template.parse()?;
        let mut cmd = self.command("xpaget");
        cmd.arg("xpans");
        let output = self.run(cmd, None)?;

        if !output.status.success() {
            warn!(
                "Name server query failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            );
            return Ok(Vec::new());
        }

        let listing = String::from_utf8_lossy(&output.stdout);
        let mut found = Vec::new();
        for line in listing.lines().filter(|l| !l.trim().is_empty()) {
            match AccessPoint::parse_listing(line) {
                Ok(ap) if ap.matches(&target) => found.push(ap),
                Ok(_) => {}
                Err(e) => debug!("Skipping name server entry: {}", e),
            }
        }
        debug!("{} access points match {}", found.len(), template);
        Ok(found)
    }

    fn is_alive(&mut self, ap: &AccessPoint) -> bool {
        let mut cmd = self.command("xpaaccess");
        cmd.arg(&ap.address);
        match self.run(cmd, None) {
            Ok(output) => {
                decode_scalar::<bool>(&String::from_utf8_lossy(&output.stdout)).unwrap_or(false)
            }
            Err(e) => {
                debug!("xpaaccess failed for {}: {}", ap, e);
                false
            }
        }
    }

    fn request(&mut self, target: &str, command: &str, nmax: usize) -> Result<Vec<Reply>> {
        if nmax > 1 {
            let aps = self.fan_out(target, Access::GET)?;
            if aps.len() > 1 {
                let mut replies = Vec::new();
                for ap in aps.iter().take(nmax) {
                    if let Some(reply) = self.get_one(&ap.address, &ap.id(), command)? {
                        replies.push(reply);
                    }
                }
                return Ok(replies);
            }
        }
        Ok(self.get_one(target, target, command)?.into_iter().collect())
    }

    fn send(
        &mut self,
        target: &str,
        command: &str,
        payload: Option<&[u8]>,
        nmax: usize,
    ) -> Result<Vec<Reply>> {
        let mut cmd = self.command("xpaset");
        if payload.is_none() {
            cmd.arg("-p");
        }
        cmd.arg(target).arg(command);

        let output = self.run(cmd, payload)?;
        let mut replies: Vec<Reply> = reply_from_output(target, output).into_iter().collect();
        replies.truncate(nmax);
        Ok(replies)
    }
}
