//! Launcher discovery and environment diagnostics
//!
//! Checks whether the program a server is started with can be found and
//! whether the environment variables it requires are set

use crate::config::{LaunchSource, ResolvedServer};
use path_clean::PathClean;
use serde::Serialize;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Outcome of checking one server
#[derive(Debug, Clone, Serialize)]
pub struct Diagnosis {
    pub name: String,
    pub program: String,
    pub found: Option<PathBuf>,
    pub missing_env: Vec<String>,
}

impl Diagnosis {
    pub fn is_healthy(&self) -> bool {
        self.found.is_some() && self.missing_env.is_empty()
    }
}

/// Locate `program` the way a shell would
pub fn find_in_path(program: &str) -> Option<PathBuf> {
    find_in(program, std::env::var_os("PATH"))
}

fn find_in(program: &str, path_var: Option<OsString>) -> Option<PathBuf> {
    if program.is_empty() {
        return None;
    }

    let candidate = Path::new(program);

    // Anything with a separator is a path, not a name to search for
    if candidate.components().count() > 1 || candidate.is_absolute() {
        let cleaned = candidate.to_path_buf().clean();
        return is_executable(&cleaned).then_some(cleaned);
    }

    let path_var = path_var?;
    for dir in std::env::split_paths(&path_var) {
        for name in executable_names(program) {
            let full = dir.join(&name);
            if is_executable(&full) {
                debug!("Found {} at {}", program, full.display());
                return Some(full);
            }
        }
    }

    None
}

#[cfg(windows)]
fn executable_names(program: &str) -> Vec<String> {
    let mut names = vec![program.to_string()];
    let exts = std::env::var("PATHEXT").unwrap_or_else(|_| ".EXE;.CMD;.BAT".to_string());
    for ext in exts.split(';').filter(|e| !e.is_empty()) {
        names.push(format!("{}{}", program, ext.to_lowercase()));
    }
    names
}

#[cfg(not(windows))]
fn executable_names(program: &str) -> Vec<String> {
    vec![program.to_string()]
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

/// Check a server's launcher and required environment
pub fn diagnose(server: &ResolvedServer, self_exe: &Path) -> Diagnosis {
    let spec = server.package.launch_spec(self_exe);

    let missing_env = server
        .package
        .required_env
        .iter()
        .filter(|key| {
            !spec.env.contains_key(key.as_str())
                && std::env::var_os(key.as_str()).map_or(true, |v| v.is_empty())
        })
        .cloned()
        .collect();

    Diagnosis {
        name: server.name().to_string(),
        found: find_in_path(&spec.program),
        program: spec.program,
        missing_env,
    }
}

/// Human hint for installing the launcher a source relies on
pub fn install_hint(source: &LaunchSource) -> &'static str {
    match source {
        LaunchSource::Builtin { .. } => "Built into cli-mcp.",
        LaunchSource::Npx { .. } => "Install Node.js (https://nodejs.org), which provides npx.",
        LaunchSource::Uvx { .. } => "Install uv (https://docs.astral.sh/uv/), which provides uvx.",
        LaunchSource::Docker { .. } => "Install Docker (https://docs.docker.com/get-docker/).",
        LaunchSource::Command { .. } => "Check the command path in your cli-mcp config.",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Origin, ServerPackage};
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    #[cfg(unix)]
    fn make_executable(dir: &Path, name: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join(name);
        std::fs::write(&path, "#!/bin/sh\n").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    fn server(command: &str, required_env: Vec<String>) -> ResolvedServer {
        ResolvedServer {
            package: ServerPackage {
                name: "demo".to_string(),
                description: "demo".to_string(),
                homepage: None,
                licenses: vec![],
                tags: vec![],
                source: LaunchSource::Command {
                    command: command.to_string(),
                    args: vec![],
                },
                env: BTreeMap::new(),
                required_env,
            },
            origin: Origin::User,
            enabled: true,
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_find_in_custom_path() {
        let dir = TempDir::new().unwrap();
        let exe = make_executable(dir.path(), "my-mcp-server");

        let found = find_in("my-mcp-server", Some(dir.path().as_os_str().to_owned()));
        assert_eq!(found, Some(exe));
    }

    #[cfg(unix)]
    #[test]
    fn test_non_executable_is_ignored() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("plain"), "data").unwrap();

        assert!(find_in("plain", Some(dir.path().as_os_str().to_owned())).is_none());
    }

    #[cfg(unix)]
    #[test]
    fn test_absolute_path_checked_directly() {
        let dir = TempDir::new().unwrap();
        let exe = make_executable(dir.path(), "server");

        assert_eq!(find_in(exe.to_str().unwrap(), None), Some(exe));
    }

    #[test]
    fn test_missing_program() {
        assert!(find_in("definitely-not-a-real-binary-name", Some(OsString::new())).is_none());
        assert!(find_in("", None).is_none());
    }

    #[test]
    fn test_diagnose_reports_missing_env() {
        let server = server(
            "definitely-not-a-real-binary-name",
            vec!["CLI_MCP_TEST_UNSET_VARIABLE".to_string()],
        );

        let diagnosis = diagnose(&server, Path::new("/bin/cli-mcp"));
        assert!(diagnosis.found.is_none());
        assert_eq!(diagnosis.missing_env, vec!["CLI_MCP_TEST_UNSET_VARIABLE"]);
        assert!(!diagnosis.is_healthy());
    }

    #[test]
    fn test_env_from_config_satisfies_requirement() {
        let mut server = server("x", vec!["TOKEN".to_string()]);
        server
            .package
            .env
            .insert("TOKEN".to_string(), "secret".to_string());

        let diagnosis = diagnose(&server, Path::new("/bin/cli-mcp"));
        assert!(diagnosis.missing_env.is_empty());
    }

    #[test]
    fn test_install_hint() {
        let hint = install_hint(&LaunchSource::Uvx {
            package: "x".to_string(),
            version: None,
            args: vec![],
        });
        assert!(hint.contains("uv"));
    }
}
