//! Engine discovery: executable descriptors and prioritized providers.
//!
//! Providers are consulted in ascending priority (lower value first). The
//! first one that yields an [`Executable`] wins; lower-priority providers are
//! only asked when every higher one declines. The answer is cached for the
//! lifetime of the registry.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::OnceLock;

/// Priority of a provider that should only be used when nothing else is.
pub const PRIORITY_LOWEST: u32 = 999;

/// How to launch an engine: program, fixed leading arguments, and an
/// environment overlay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Executable {
    pub program: PathBuf,
    pub args: Vec<String>,
    /// Variables set for the child process.
    pub env: BTreeMap<String, String>,
    /// Directories prepended to a path-list variable such as `LD_LIBRARY_PATH`.
    pub path_prepend: BTreeMap<String, Vec<PathBuf>>,
}

impl Executable {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: BTreeMap::new(),
            path_prepend: BTreeMap::new(),
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn with_path_entry(mut self, var: impl Into<String>, dir: impl Into<PathBuf>) -> Self {
        self.path_prepend
            .entry(var.into())
            .or_default()
            .push(dir.into());
        self
    }

    /// A command for this executable with the environment overlay applied.
    pub fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        for (key, value) in &self.env {
            cmd.env(key, value);
        }
        for (var, dirs) in &self.path_prepend {
            match prepend_paths(var, dirs) {
                Ok(joined) => {
                    cmd.env(var, joined);
                }
                Err(e) => {
                    tracing::warn!(variable = %var, error = %e, "cannot extend path variable");
                }
            }
        }
        cmd
    }
}

impl fmt::Display for Executable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

fn prepend_paths(var: &str, dirs: &[PathBuf]) -> Result<OsString, std::env::JoinPathsError> {
    let mut paths: Vec<PathBuf> = dirs.to_vec();
    if let Some(existing) = std::env::var_os(var) {
        paths.extend(std::env::split_paths(&existing));
    }
    std::env::join_paths(paths)
}

/// A source of engine executables.
pub trait ExecutableProvider: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Lower runs first.
    fn priority(&self) -> u32 {
        PRIORITY_LOWEST
    }

    /// The executable this provider offers, or `None` to decline.
    fn executable(&self) -> Option<Executable>;
}

/// Finds a command on `PATH` by running it with probe arguments
/// (`--version` by default) and accepting exit status 0.
#[derive(Debug, Clone)]
pub struct PathProbe {
    command: String,
    probe_args: Vec<String>,
    priority: u32,
}

impl PathProbe {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            probe_args: vec!["--version".into()],
            priority: PRIORITY_LOWEST,
        }
    }

    pub fn with_probe_args(mut self, args: Vec<String>) -> Self {
        self.probe_args = args;
        self
    }

    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = priority;
        self
    }
}

impl ExecutableProvider for PathProbe {
    fn name(&self) -> &str {
        &self.command
    }

    fn priority(&self) -> u32 {
        self.priority
    }

    fn executable(&self) -> Option<Executable> {
        let status = Command::new(&self.command)
            .args(&self.probe_args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();
        match status {
            Ok(s) if s.success() => Some(Executable::new(&self.command)),
            Ok(s) => {
                tracing::debug!(command = %self.command, status = %s, "probe declined");
                None
            }
            Err(e) => {
                tracing::debug!(command = %self.command, error = %e, "probe could not run");
                None
            }
        }
    }
}

/// A fixed executable, offered only if its program file exists.
#[derive(Debug, Clone)]
pub struct FixedExecutable {
    executable: Executable,
    priority: u32,
}

impl FixedExecutable {
    pub fn new(executable: Executable, priority: u32) -> Self {
        Self {
            executable,
            priority,
        }
    }

    /// A SWI-Prolog installation rooted at `home`: runs `home/bin/swipl`
    /// with `SWI_HOME_DIR` set and `home/lib` on `LD_LIBRARY_PATH`.
    pub fn swi_installation(home: &Path, priority: u32) -> Self {
        let executable = Executable::new(home.join("bin").join("swipl"))
            .with_env("SWI_HOME_DIR", home.display().to_string())
            .with_path_entry("LD_LIBRARY_PATH", home.join("lib"));
        Self::new(executable, priority)
    }
}

impl ExecutableProvider for FixedExecutable {
    fn name(&self) -> &str {
        "fixed"
    }

    fn priority(&self) -> u32 {
        self.priority
    }

    fn executable(&self) -> Option<Executable> {
        if self.executable.program.is_file() {
            Some(self.executable.clone())
        } else {
            tracing::debug!(
                program = %self.executable.program.display(),
                "configured executable does not exist"
            );
            None
        }
    }
}

/// Providers ordered by priority, with the resolved executable cached.
#[derive(Default)]
pub struct ProviderRegistry {
    providers: Vec<Box<dyn ExecutableProvider>>,
    resolved: OnceLock<Option<Executable>>,
}

impl fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<_> = self
            .providers
            .iter()
            .map(|p| format!("{}@{}", p.name(), p.priority()))
            .collect();
        f.debug_struct("ProviderRegistry")
            .field("providers", &names)
            .field("resolved", &self.resolved.get())
            .finish()
    }
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a provider. Providers of equal priority keep registration order.
    /// Clears any cached resolution.
    pub fn register(&mut self, provider: impl ExecutableProvider + 'static) {
        self.providers.push(Box::new(provider));
        self.providers.sort_by_key(|p| p.priority());
        self.resolved = OnceLock::new();
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// The first executable offered, computed once.
    pub fn resolve(&self) -> Option<&Executable> {
        self.resolved
            .get_or_init(|| {
                for provider in &self.providers {
                    if let Some(exe) = provider.executable() {
                        tracing::info!(
                            provider = provider.name(),
                            priority = provider.priority(),
                            executable = %exe,
                            "resolved engine executable"
                        );
                        return Some(exe);
                    }
                }
                None
            })
            .as_ref()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    struct Stub {
        name: &'static str,
        priority: u32,
        offer: Option<&'static str>,
        calls: Arc<AtomicUsize>,
    }

    impl ExecutableProvider for Stub {
        fn name(&self) -> &str {
            self.name
        }
        fn priority(&self) -> u32 {
            self.priority
        }
        fn executable(&self) -> Option<Executable> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.offer.map(Executable::new)
        }
    }

    fn stub(name: &'static str, priority: u32, offer: Option<&'static str>) -> (Stub, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            Stub {
                name,
                priority,
                offer,
                calls: Arc::clone(&calls),
            },
            calls,
        )
    }

    #[test]
    fn lower_priority_value_wins() {
        let mut reg = ProviderRegistry::new();
        let (low, _) = stub("low", PRIORITY_LOWEST, Some("/usr/bin/low"));
        let (high, _) = stub("high", 10, Some("/opt/high"));
        reg.register(low);
        reg.register(high);
        assert_eq!(reg.resolve().map(|e| e.program.clone()), Some(PathBuf::from("/opt/high")));
    }

    #[test]
    fn declining_provider_falls_through() {
        let mut reg = ProviderRegistry::new();
        let (first, first_calls) = stub("first", 0, None);
        let (second, second_calls) = stub("second", 5, Some("swipl"));
        let (third, third_calls) = stub("third", 9, Some("other"));
        reg.register(third);
        reg.register(second);
        reg.register(first);
        assert_eq!(reg.resolve().map(|e| e.program.clone()), Some(PathBuf::from("swipl")));
        assert_eq!(first_calls.load(Ordering::SeqCst), 1);
        assert_eq!(second_calls.load(Ordering::SeqCst), 1);
        assert_eq!(third_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn resolution_is_cached() {
        let mut reg = ProviderRegistry::new();
        let (only, calls) = stub("only", 1, Some("swipl"));
        reg.register(only);
        reg.resolve();
        reg.resolve();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn nothing_offered() {
        let mut reg = ProviderRegistry::new();
        let (none, _) = stub("none", 1, None);
        reg.register(none);
        assert!(reg.resolve().is_none());
    }

    #[test]
    fn missing_fixed_executable_declines() {
        let dir = tempfile::TempDir::new().unwrap();
        let provider = FixedExecutable::new(Executable::new(dir.path().join("nope")), 0);
        assert!(provider.executable().is_none());
    }

    #[test]
    fn existing_fixed_executable_is_offered() {
        let dir = tempfile::TempDir::new().unwrap();
        let program = dir.path().join("swipl");
        std::fs::write(&program, b"").unwrap();
        let provider = FixedExecutable::new(Executable::new(&program).with_env("SWI_HOME_DIR", "/x"), 0);
        let exe = provider.executable().unwrap();
        assert_eq!(exe.program, program);
        assert_eq!(exe.env.get("SWI_HOME_DIR").map(String::as_str), Some("/x"));
    }

    #[test]
    fn swi_installation_layout() {
        let provider = FixedExecutable::swi_installation(Path::new("/opt/swipl"), 3);
        assert_eq!(provider.priority(), 3);
        assert_eq!(provider.executable.program, PathBuf::from("/opt/swipl/bin/swipl"));
        assert_eq!(
            provider.executable.path_prepend.get("LD_LIBRARY_PATH"),
            Some(&vec![PathBuf::from("/opt/swipl/lib")])
        );
    }

    #[test]
    fn display_includes_args() {
        let exe = Executable::new("python3").with_args(["-m", "problog"]);
        assert_eq!(exe.to_string(), "python3 -m problog");
    }

    #[test]
    fn missing_command_probe_declines() {
        let probe = PathProbe::new("definitely-not-an-engine-binary-4711");
        assert!(probe.executable().is_none());
    }
}
