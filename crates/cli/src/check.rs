//! Local environment check run before starting the stack.
//!
//! Every check is independent. A missing artifact is printed as a failed
//! line and counted; nothing stops the remaining checks from running.

use std::collections::HashSet;
use std::fmt;
use std::path::Path;

/// Env file read by the server at startup through `dotenvy`.
pub const ENV_FILE: &str = ".env";

/// Settings the env file must declare.
pub const REQUIRED_VARS: [&str; 2] = ["NEXAFLOW_DATABASE_PATH", "NEXAFLOW_PUBLIC_URL"];

pub const REQUIRED_FILES: [&str; 5] = [
    "Cargo.toml",
    "crates/shared/src/lib.rs",
    "crates/services/src/lib.rs",
    "crates/server/src/main.rs",
    "crates/cli/src/main.rs",
];

/// Build output holding the compiled dependencies.
pub const DEPENDENCY_DIR: &str = "target";

/// Database driver the workspace manifest must declare.
pub const REQUIRED_PACKAGE: &str = "sqlx";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckResult {
    pub label: String,
    pub passed: bool,
}

impl CheckResult {
    fn new(label: impl Into<String>, passed: bool) -> Self {
        Self {
            label: label.into(),
            passed,
        }
    }
}

impl fmt::Display for CheckResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mark = if self.passed { "✅" } else { "❌" };
        write!(f, "{} {}", mark, self.label)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Report {
    pub results: Vec<CheckResult>,
}

impl Report {
    pub fn failures(&self) -> usize {
        self.results.iter().filter(|r| !r.passed).count()
    }

    pub fn passed(&self) -> bool {
        self.failures() == 0
    }

    pub fn exit_code(&self) -> i32 {
        if self.passed() {
            0
        } else {
            1
        }
    }

    pub fn render(&self) -> String {
        let mut out = String::from("NexaFlow environment check\n\n");
        for result in &self.results {
            out.push_str(&format!("{}\n", result));
        }
        out.push('\n');
        match self.failures() {
            0 => out.push_str("All checks passed"),
            1 => out.push_str("1 check failed"),
            n => out.push_str(&format!("{} checks failed", n)),
        }
        out
    }
}

pub fn run_checks(root: &Path) -> Report {
    let mut results = Vec::new();

    let env_path = root.join(ENV_FILE);
    let env_exists = env_path.is_file();
    results.push(CheckResult::new(
        if env_exists {
            format!("{} found", ENV_FILE)
        } else {
            format!("{} is missing", ENV_FILE)
        },
        env_exists,
    ));

    let declared = if env_exists {
        declared_vars(&env_path)
    } else {
        HashSet::new()
    };
    for var in REQUIRED_VARS {
        let passed = declared.contains(var);
        let label = if passed {
            format!("{} is set", var)
        } else {
            format!("{} is not set in {}", var, ENV_FILE)
        };
        results.push(CheckResult::new(label, passed));
    }

    for file in REQUIRED_FILES {
        let passed = root.join(file).is_file();
        let label = if passed {
            file.to_string()
        } else {
            format!("{} is missing", file)
        };
        results.push(CheckResult::new(label, passed));
    }

    let deps_built = root.join(DEPENDENCY_DIR).is_dir();
    results.push(CheckResult::new(
        if deps_built {
            "dependencies are built".to_string()
        } else {
            format!("{}/ not found, run `cargo build`", DEPENDENCY_DIR)
        },
        deps_built,
    ));

    let declared_package = manifest_declares(&root.join("Cargo.toml"), REQUIRED_PACKAGE);
    results.push(CheckResult::new(
        if declared_package {
            format!("{} is declared in Cargo.toml", REQUIRED_PACKAGE)
        } else {
            format!("{} is not declared in Cargo.toml", REQUIRED_PACKAGE)
        },
        declared_package,
    ));

    for result in results.iter().filter(|r| !r.passed) {
        tracing::debug!(check = %result.label, "environment check failed");
    }

    Report { results }
}

/// Non-empty variables declared in an env file.
fn declared_vars(path: &Path) -> HashSet<String> {
    let Ok(iter) = dotenvy::from_path_iter(path) else {
        return HashSet::new();
    };
    iter.filter_map(Result::ok)
        .filter(|(_, value)| !value.trim().is_empty())
        .map(|(key, _)| key)
        .collect()
}

/// Whether a manifest lists `package` under `[dependencies]` or
/// `[workspace.dependencies]`.
fn manifest_declares(path: &Path, package: &str) -> bool {
    let Ok(content) = std::fs::read_to_string(path) else {
        return false;
    };
    let Ok(manifest) = content.parse::<toml::Table>() else {
        return false;
    };

    let in_table = |table: Option<&toml::Value>| {
        table
            .and_then(|deps| deps.get(package))
            .is_some()
    };

    in_table(manifest.get("dependencies"))
        || in_table(
            manifest
                .get("workspace")
                .and_then(|workspace| workspace.get("dependencies")),
        )
}
