//! Single chokepoint for every tool call, in every mode. Never trust the
//! model: paths are jailed, commands are checked against a deny-list, URLs
//! are checked against an SSRF blocklist, and every result is truncated
//! before it reaches a transcript.

use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use glob::glob;
use regex::Regex;
use serde_json::json;
use tokio::process::Command;
use tokio::time::timeout;
use walkdir::WalkDir;

use crate::error::SandboxError;
use crate::tools::{DependencyMap, ToolOutcome, ToolSpec};

const DEFAULT_BASH_TIMEOUT_SECS: u64 = 10;
const MAX_BASH_TIMEOUT_SECS: u64 = 120;
const DEFAULT_WEBFETCH_TIMEOUT_SECS: u64 = 30;
const MAX_WEBFETCH_TIMEOUT_SECS: u64 = 120;
const DEFAULT_READ_LIMIT: usize = 2000;
const GLOB_MAX_RESULTS: usize = 100;
const GREP_MAX_RESULTS: usize = 50;

const TRUNCATION_CAP_BYTES: usize = 10 * 1024;
const TRUNCATION_HEAD_BYTES: usize = 5 * 1024;
const TRUNCATION_TAIL_BYTES: usize = 2 * 1024;
const TRUNCATION_MARKER: &str = "…[TRUNCATED]…";

const LOG_FIELD_PREVIEW_CHARS: usize = 200;

/// Commands rejected regardless of [`SandboxPolicy::safe_mode`]: destructive
/// filesystem/device operations, privileged shutdown, and anything that
/// pipes a remote fetch straight into a shell.
fn baseline_bash_deny_patterns() -> Vec<&'static str> {
    vec![
        r"rm\s+(-\w*\s+)*-\w*r\w*f|rm\s+(-\w*\s+)*-\w*f\w*r",
        r"rm\s+.*(-r|-R).*(/\s*$|/\*|~\s*$|~/\s*$)",
        r"mkfs(\.\w+)?\s",
        r"dd\s+.*of=/dev/",
        r"\b(shutdown|reboot|halt|poweroff)\b",
        r"(curl|wget)\s+.*\|\s*(sh|bash|zsh)\b",
        r"\bnc\b.*-l\b",
        r"\bnetcat\b.*-l\b",
        r"chmod\s+.*\s+/\s*$",
        r"chown\s+.*\s+/\s*$",
        r"\bsudo\b|\bsu\b\s",
    ]
}

/// Extra deny patterns applied only when [`SandboxPolicy::safe_mode`] is on:
/// network clients and package installers.
fn safe_mode_bash_deny_patterns() -> Vec<&'static str> {
    vec![
        r"\b(curl|wget|nc|netcat|ssh|scp|sftp)\b",
        r"\b(npm|pip|pip3|apt|apt-get|yum|brew)\s+install\b",
    ]
}

/// Hosts rejected regardless of `safe_mode`: loopback, private, link-local,
/// and cloud metadata addresses a sandboxed agent should never be able to
/// reach via `webfetch`.
fn baseline_host_deny_patterns() -> Vec<&'static str> {
    vec![
        r"^localhost$",
        r"^127(\.\d{1,3}){3}$",
        r"^0\.0\.0\.0$",
        r"^10(\.\d{1,3}){3}$",
        r"^172\.(1[6-9]|2\d|3[01])(\.\d{1,3}){2}$",
        r"^192\.168(\.\d{1,3}){2}$",
        r"^169\.254(\.\d{1,3}){2}$",
        r"^::1$",
        r"^fe80:",
        r"^fc00:",
        r"^fd[0-9a-f]{2}:",
        r"^169\.254\.169\.254$",
        r"^metadata\.google\.internal$",
    ]
}

/// Process-scoped policy: deny-lists, a path jail root, and the safe/normal
/// switch. Construction is the only fallible step — compiled regexes are
/// cached for the life of the sandbox.
#[derive(Debug, Clone)]
pub struct SandboxPolicy {
    root_dir: PathBuf,
    safe_mode: bool,
    bash_deny: Vec<Regex>,
    host_deny: Vec<Regex>,
}

impl SandboxPolicy {
    /// Builds a policy rooted at `root_dir` with only the baseline deny
    /// lists active.
    pub fn new(root_dir: impl Into<PathBuf>) -> Result<Self, SandboxError> {
        Self::build(root_dir, false, &[], &[])
    }

    /// Builds a policy with `safe_mode` on: network tools, installers, and
    /// non-standard webfetch ports are additionally rejected.
    pub fn safe_mode(root_dir: impl Into<PathBuf>) -> Result<Self, SandboxError> {
        Self::build(root_dir, true, &[], &[])
    }

    /// Builds a policy with extra caller-supplied deny patterns layered on
    /// top of the baseline (and, if `safe_mode`, the safe-mode) lists.
    pub fn with_extra_patterns(
        root_dir: impl Into<PathBuf>,
        safe_mode: bool,
        extra_bash_deny: &[&str],
        extra_host_deny: &[&str],
    ) -> Result<Self, SandboxError> {
        Self::build(root_dir, safe_mode, extra_bash_deny, extra_host_deny)
    }

    fn build(
        root_dir: impl Into<PathBuf>,
        safe_mode: bool,
        extra_bash_deny: &[&str],
        extra_host_deny: &[&str],
    ) -> Result<Self, SandboxError> {
        let mut bash_patterns = baseline_bash_deny_patterns();
        if safe_mode {
            bash_patterns.extend(safe_mode_bash_deny_patterns());
        }
        bash_patterns.extend(extra_bash_deny.iter().copied());

        let bash_deny = bash_patterns
            .into_iter()
            .map(|pattern| compile_policy_pattern(pattern))
            .collect::<Result<Vec<_>, _>>()?;

        let mut host_patterns = baseline_host_deny_patterns();
        host_patterns.extend(extra_host_deny.iter().copied());

        let host_deny = host_patterns
            .into_iter()
            .map(|pattern| compile_policy_pattern(pattern))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            root_dir: root_dir.into(),
            safe_mode,
            bash_deny,
            host_deny,
        })
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    pub fn safe_mode(&self) -> bool {
        self.safe_mode
    }

    fn bash_command_blocked(&self, command: &str) -> bool {
        self.bash_deny.iter().any(|pattern| pattern.is_match(command))
    }

    fn host_blocked(&self, host: &str) -> bool {
        self.host_deny.iter().any(|pattern| pattern.is_match(host))
    }

    /// Resolves `path` against the sandbox root, canonicalizing through
    /// symlinks. For a not-yet-existing target, the parent directory is
    /// canonicalized instead and the final component appended back on.
    /// Returns an error string (never panics) when the result escapes the
    /// root.
    fn resolve_path(&self, path: impl AsRef<Path>) -> Result<PathBuf, String> {
        let candidate = path.as_ref();
        let unresolved = if candidate.is_absolute() {
            candidate.to_path_buf()
        } else {
            self.root_dir.join(candidate)
        };

        let canonical = match unresolved.canonicalize() {
            Ok(path) => path,
            Err(_) => {
                let parent = unresolved.parent().unwrap_or(&self.root_dir);
                let file_name = unresolved.file_name();
                let canonical_parent = parent
                    .canonicalize()
                    .unwrap_or_else(|_| normalize_lexically(parent));
                match file_name {
                    Some(name) => canonical_parent.join(name),
                    None => canonical_parent,
                }
            }
        };

        let root_canonical = self
            .root_dir
            .canonicalize()
            .unwrap_or_else(|_| normalize_lexically(&self.root_dir));

        if !canonical.starts_with(&root_canonical) {
            return Err(format!(
                "path escapes sandbox root: {}",
                candidate.display()
            ));
        }

        Ok(canonical)
    }
}

fn compile_policy_pattern(pattern: &str) -> Result<Regex, SandboxError> {
    Regex::new(&format!("(?i){pattern}")).map_err(|err| SandboxError::InvalidBashPattern {
        pattern: pattern.to_string(),
        message: err.to_string(),
    })
}

fn normalize_lexically(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(prefix) => normalized.push(prefix.as_os_str()),
            Component::RootDir => normalized.push(Path::new("/")),
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            Component::Normal(part) => normalized.push(part),
        }
    }
    normalized
}

/// Truncates `text` to at most ~10 KiB: first ~5 KiB, a literal marker,
/// then the last ~2 KiB. A no-op below the cap.
pub fn truncate_result(text: &str) -> String {
    if text.len() <= TRUNCATION_CAP_BYTES {
        return text.to_string();
    }

    let head_end = floor_char_boundary(text, TRUNCATION_HEAD_BYTES);
    let tail_start = ceil_char_boundary(text, text.len().saturating_sub(TRUNCATION_TAIL_BYTES));

    format!(
        "{}{}{}",
        &text[..head_end],
        TRUNCATION_MARKER,
        &text[tail_start..]
    )
}

fn floor_char_boundary(text: &str, index: usize) -> usize {
    let mut index = index.min(text.len());
    while index > 0 && !text.is_char_boundary(index) {
        index -= 1;
    }
    index
}

fn ceil_char_boundary(text: &str, index: usize) -> usize {
    let mut index = index.min(text.len());
    while index < text.len() && !text.is_char_boundary(index) {
        index += 1;
    }
    index
}

/// One append-only record of a tool invocation. Queryable for usage
/// statistics; never fed back into an agent's conversation context.
#[derive(Debug, Clone)]
pub struct ToolCallLog {
    entries: Arc<Mutex<Vec<ToolCallLogEntry>>>,
}

#[derive(Debug, Clone)]
pub struct ToolCallLogEntry {
    pub tool: String,
    pub args_preview: String,
    pub result_preview: String,
    pub success: bool,
    pub timestamp: DateTime<Utc>,
}

impl ToolCallLog {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn record(&self, tool: &str, args: &serde_json::Value, result: &str, success: bool) {
        let entry = ToolCallLogEntry {
            tool: tool.to_string(),
            args_preview: clamp_chars(&args.to_string(), LOG_FIELD_PREVIEW_CHARS),
            result_preview: clamp_chars(result, LOG_FIELD_PREVIEW_CHARS),
            success,
            timestamp: Utc::now(),
        };
        self.entries
            .lock()
            .expect("tool call log lock poisoned")
            .push(entry);
    }

    pub fn entries(&self) -> Vec<ToolCallLogEntry> {
        self.entries.lock().expect("tool call log lock poisoned").clone()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().expect("tool call log lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ToolCallLog {
    fn default() -> Self {
        Self::new()
    }
}

fn clamp_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut clamped: String = text.chars().take(max_chars).collect();
    clamped.push('…');
    clamped
}

/// Binds a [`SandboxPolicy`] to a [`ToolCallLog`] and exposes the validated
/// tool set. Process-scoped and shared by every agent; holds no per-agent
/// state beyond the log.
#[derive(Debug, Clone)]
pub struct ToolSandbox {
    policy: Arc<SandboxPolicy>,
    log: ToolCallLog,
}

impl ToolSandbox {
    pub fn new(policy: SandboxPolicy) -> Self {
        Self {
            policy: Arc::new(policy),
            log: ToolCallLog::new(),
        }
    }

    pub fn policy(&self) -> &SandboxPolicy {
        &self.policy
    }

    pub fn log(&self) -> &ToolCallLog {
        &self.log
    }

    /// The full validated tool set: `bash`, `read`, `write`, `edit`, `glob`,
    /// `grep`, `webfetch`.
    pub fn tool_specs(&self) -> Vec<ToolSpec> {
        vec![
            self.bash_tool(),
            self.read_tool(),
            self.write_tool(),
            self.edit_tool(),
            self.glob_tool(),
            self.grep_tool(),
            self.webfetch_tool(),
        ]
    }

    fn logged<F>(&self, name: &'static str, body: F) -> ToolSpec
    where
        F: Fn(serde_json::Value, Arc<SandboxPolicy>) -> futures_util::future::BoxFuture<'static, String>
            + Send
            + Sync
            + 'static,
    {
        let policy = self.policy.clone();
        let log = self.log.clone();
        let name_owned = name.to_string();

        ToolSpec::new(name, tool_description(name))
            .with_schema(tool_schema(name))
            .expect("sandbox tool schema is valid")
            .with_handler(move |args, _deps| {
                let policy = policy.clone();
                let log = log.clone();
                let name = name_owned.clone();
                let body_args = args.clone();
                let fut = body(body_args, policy);
                async move {
                    let result = fut.await;
                    let success = !result.starts_with("Blocked:")
                        && !result.starts_with("Security error:")
                        && !result.starts_with("Invalid regex:");
                    if !success {
                        tracing::warn!(tool = %name, result = %result, "sandbox blocked tool call");
                    }
                    log.record(&name, &args, &result, success);
                    Ok(ToolOutcome::Text(truncate_result(&result)))
                }
            })
    }

    fn bash_tool(&self) -> ToolSpec {
        self.logged("bash", |args, policy| {
            Box::pin(async move {
                let command = args
                    .get("command")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string();

                if policy.bash_command_blocked(&command) {
                    return "Blocked: command matches a denied pattern".to_string();
                }

                let requested_timeout = args.get("timeout").and_then(|v| v.as_u64());
                let timeout_secs = requested_timeout
                    .unwrap_or(DEFAULT_BASH_TIMEOUT_SECS)
                    .min(MAX_BASH_TIMEOUT_SECS);

                let workdir = args
                    .get("workdir")
                    .and_then(|v| v.as_str())
                    .map(|dir| policy.resolve_path(dir))
                    .transpose();

                let workdir = match workdir {
                    Ok(dir) => dir.unwrap_or_else(|| policy.root_dir().to_path_buf()),
                    Err(err) => return format!("Blocked: {err}"),
                };

                let output = timeout(
                    Duration::from_secs(timeout_secs),
                    Command::new("sh")
                        .arg("-c")
                        .arg(&command)
                        .current_dir(&workdir)
                        .output(),
                )
                .await;

                match output {
                    Ok(Ok(out)) => {
                        let stdout = String::from_utf8_lossy(&out.stdout);
                        let stderr = String::from_utf8_lossy(&out.stderr);
                        let combined = format!("{stdout}{stderr}");
                        if combined.trim().is_empty() {
                            "(no output)".to_string()
                        } else {
                            combined
                        }
                    }
                    Ok(Err(err)) => format!("Error: {err}"),
                    Err(_) => format!("Command timed out after {timeout_secs}s"),
                }
            })
        })
    }

    fn read_tool(&self) -> ToolSpec {
        self.logged("read", |args, policy| {
            Box::pin(async move {
                let path_arg = args
                    .get("path")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string();

                let path = match policy.resolve_path(&path_arg) {
                    Ok(path) => path,
                    Err(err) => return format!("Blocked: {err}"),
                };

                if !path.exists() {
                    return format!("File not found: {path_arg}");
                }
                if path.is_dir() {
                    return format!("Path is a directory: {path_arg}");
                }

                let content = match fs::read_to_string(&path) {
                    Ok(content) => content,
                    Err(err) => return format!("Error reading file: {err}"),
                };

                let offset = args.get("offset").and_then(|v| v.as_u64()).unwrap_or(1).max(1) as usize;
                let limit = args
                    .get("limit")
                    .and_then(|v| v.as_u64())
                    .map(|v| v as usize)
                    .unwrap_or(DEFAULT_READ_LIMIT);

                let lines: Vec<&str> = content.lines().collect();
                let start = offset.saturating_sub(1).min(lines.len());
                let end = start.saturating_add(limit).min(lines.len());

                lines[start..end]
                    .iter()
                    .enumerate()
                    .map(|(idx, line)| format!("{:>6}\t{}", start + idx + 1, line))
                    .collect::<Vec<_>>()
                    .join("\n")
            })
        })
    }

    fn write_tool(&self) -> ToolSpec {
        self.logged("write", |args, policy| {
            Box::pin(async move {
                let path_arg = args
                    .get("path")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string();
                let content = args
                    .get("content")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string();

                let path = match policy.resolve_path(&path_arg) {
                    Ok(path) => path,
                    Err(err) => return format!("Blocked: {err}"),
                };

                if let Some(parent) = path.parent() {
                    if let Err(err) = fs::create_dir_all(parent) {
                        return format!("Error writing file: {err}");
                    }
                }

                match fs::write(&path, content.as_bytes()) {
                    Ok(()) => "File written successfully".to_string(),
                    Err(err) => format!("Error writing file: {err}"),
                }
            })
        })
    }

    fn edit_tool(&self) -> ToolSpec {
        self.logged("edit", |args, policy| {
            Box::pin(async move {
                let path_arg = args
                    .get("path")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string();
                let old_string = args
                    .get("oldString")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string();
                let new_string = args
                    .get("newString")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string();
                let replace_all = args
                    .get("replaceAll")
                    .and_then(|v| v.as_bool())
                    .unwrap_or(false);

                let path = match policy.resolve_path(&path_arg) {
                    Ok(path) => path,
                    Err(err) => return format!("Blocked: {err}"),
                };

                if !path.exists() {
                    return format!("File not found: {path_arg}");
                }

                let content = match fs::read_to_string(&path) {
                    Ok(content) => content,
                    Err(err) => return format!("Error editing file: {err}"),
                };

                if !content.contains(&old_string) {
                    return format!("String not found in {path_arg}");
                }

                let (updated, count) = if replace_all {
                    let escaped = regex::escape(&old_string);
                    let pattern = match Regex::new(&escaped) {
                        Ok(pattern) => pattern,
                        Err(err) => return format!("Invalid regex: {err}"),
                    };
                    let count = pattern.find_iter(&content).count();
                    (pattern.replace_all(&content, new_string.as_str()).into_owned(), count)
                } else {
                    (content.replacen(&old_string, &new_string, 1), 1)
                };

                match fs::write(&path, updated.as_bytes()) {
                    Ok(()) => format!("Replaced {count} occurrence(s) in {path_arg}"),
                    Err(err) => format!("Error editing file: {err}"),
                }
            })
        })
    }

    fn glob_tool(&self) -> ToolSpec {
        self.logged("glob", |args, policy| {
            Box::pin(async move {
                let pattern = args
                    .get("pattern")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string();
                let path = args.get("path").and_then(|v| v.as_str()).map(ToString::to_string);

                let search_dir = match path {
                    Some(path) => match policy.resolve_path(path) {
                        Ok(path) => path,
                        Err(err) => return format!("Blocked: {err}"),
                    },
                    None => policy.root_dir().to_path_buf(),
                };

                let query = search_dir.join(&pattern).display().to_string();
                let entries = match glob(&query) {
                    Ok(entries) => entries,
                    Err(err) => return format!("Invalid glob pattern: {err}"),
                };

                let mut matches = Vec::new();
                for entry in entries.flatten() {
                    if !entry.is_file() {
                        continue;
                    }
                    let shown = entry
                        .strip_prefix(policy.root_dir())
                        .unwrap_or(&entry)
                        .display()
                        .to_string();
                    matches.push(shown);
                    if matches.len() >= GLOB_MAX_RESULTS {
                        break;
                    }
                }

                if matches.is_empty() {
                    format!("No files match pattern: {pattern}")
                } else {
                    matches.join("\n")
                }
            })
        })
    }

    fn grep_tool(&self) -> ToolSpec {
        self.logged("grep", |args, policy| {
            Box::pin(async move {
                let pattern = args
                    .get("pattern")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string();
                let path = args.get("path").and_then(|v| v.as_str()).map(ToString::to_string);
                let include = args.get("include").and_then(|v| v.as_str()).map(ToString::to_string);

                let search_dir = match path {
                    Some(path) => match policy.resolve_path(path) {
                        Ok(path) => path,
                        Err(err) => return format!("Blocked: {err}"),
                    },
                    None => policy.root_dir().to_path_buf(),
                };

                let regex = match Regex::new(&pattern) {
                    Ok(regex) => regex,
                    Err(err) => return format!("Invalid regex: {err}"),
                };

                let include_glob = include
                    .as_deref()
                    .and_then(|pattern| glob::Pattern::new(pattern).ok());

                let mut matches = Vec::new();
                'walk: for entry in WalkDir::new(&search_dir).into_iter().flatten() {
                    if !entry.file_type().is_file() {
                        continue;
                    }

                    if let Some(include_glob) = &include_glob {
                        let file_name = entry.file_name().to_string_lossy();
                        if !include_glob.matches(&file_name) {
                            continue;
                        }
                    }

                    let Ok(content) = fs::read_to_string(entry.path()) else {
                        continue;
                    };

                    for (index, line) in content.lines().enumerate() {
                        if regex.is_match(line) {
                            let rel = entry
                                .path()
                                .strip_prefix(policy.root_dir())
                                .unwrap_or(entry.path())
                                .display();
                            matches.push(format!("{rel}:{}:{line}", index + 1));
                            if matches.len() >= GREP_MAX_RESULTS {
                                break 'walk;
                            }
                        }
                    }
                }

                if matches.is_empty() {
                    format!("No matches for: {pattern}")
                } else {
                    matches.join("\n")
                }
            })
        })
    }

    fn webfetch_tool(&self) -> ToolSpec {
        self.logged("webfetch", |args, policy| {
            Box::pin(async move {
                let url_str = args
                    .get("url")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string();

                let url = match reqwest::Url::parse(&url_str) {
                    Ok(url) => url,
                    Err(err) => return format!("Blocked: invalid URL: {err}"),
                };

                if url.scheme() != "http" && url.scheme() != "https" {
                    return "Blocked: only http/https URLs are allowed".to_string();
                }

                let Some(host) = url.host_str() else {
                    return "Blocked: URL has no host".to_string();
                };

                if policy.host_blocked(host) {
                    return format!("Blocked: host '{host}' is not allowed");
                }

                if policy.safe_mode() {
                    if let Some(port) = url.port() {
                        let standard = (url.scheme() == "http" && port == 80)
                            || (url.scheme() == "https" && port == 443);
                        if !standard {
                            return format!("Blocked: non-standard port {port} in safe mode");
                        }
                    }
                }

                let requested_timeout = args.get("timeout").and_then(|v| v.as_u64());
                let timeout_secs = requested_timeout
                    .unwrap_or(DEFAULT_WEBFETCH_TIMEOUT_SECS)
                    .min(MAX_WEBFETCH_TIMEOUT_SECS);

                let client = match reqwest::Client::builder()
                    .timeout(Duration::from_secs(timeout_secs))
                    .build()
                {
                    Ok(client) => client,
                    Err(err) => return format!("Error building client: {err}"),
                };

                match client.get(url).send().await {
                    Ok(response) => match response.text().await {
                        Ok(body) => body,
                        Err(err) => format!("Error reading response body: {err}"),
                    },
                    Err(err) if err.is_timeout() => {
                        format!("Request timed out after {timeout_secs}s")
                    }
                    Err(err) => format!("Error fetching URL: {err}"),
                }
            })
        })
    }
}

fn tool_description(name: &str) -> &'static str {
    match name {
        "bash" => "Execute a shell command inside the sandbox and return its output",
        "read" => "Read a file's contents with 1-indexed line numbers",
        "write" => "Write content to a file, creating parent directories as needed",
        "edit" => "Replace an exact substring within a file",
        "glob" => "Find files matching a glob pattern",
        "grep" => "Search file contents with a regular expression",
        "webfetch" => "Fetch the body of an http/https URL",
        _ => unreachable!("unknown sandbox tool name"),
    }
}

fn tool_schema(name: &str) -> serde_json::Value {
    match name {
        "bash" => json!({
            "type": "object",
            "properties": {
                "command": {"type": "string"},
                "workdir": {"type": "string"},
                "timeout": {"type": "integer"}
            },
            "required": ["command"],
            "additionalProperties": false
        }),
        "read" => json!({
            "type": "object",
            "properties": {
                "path": {"type": "string"},
                "offset": {"type": "integer"},
                "limit": {"type": "integer"}
            },
            "required": ["path"],
            "additionalProperties": false
        }),
        "write" => json!({
            "type": "object",
            "properties": {
                "path": {"type": "string"},
                "content": {"type": "string"}
            },
            "required": ["path", "content"],
            "additionalProperties": false
        }),
        "edit" => json!({
            "type": "object",
            "properties": {
                "path": {"type": "string"},
                "oldString": {"type": "string"},
                "newString": {"type": "string"},
                "replaceAll": {"type": "boolean"}
            },
            "required": ["path", "oldString", "newString"],
            "additionalProperties": false
        }),
        "glob" => json!({
            "type": "object",
            "properties": {
                "pattern": {"type": "string"},
                "path": {"type": "string"}
            },
            "required": ["pattern"],
            "additionalProperties": false
        }),
        "grep" => json!({
            "type": "object",
            "properties": {
                "pattern": {"type": "string"},
                "path": {"type": "string"},
                "include": {"type": "string"}
            },
            "required": ["pattern"],
            "additionalProperties": false
        }),
        "webfetch" => json!({
            "type": "object",
            "properties": {
                "url": {"type": "string"},
                "format": {"type": "string"},
                "timeout": {"type": "integer"}
            },
            "required": ["url", "format"],
            "additionalProperties": false
        }),
        _ => unreachable!("unknown sandbox tool name"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_sandbox() -> (ToolSandbox, PathBuf) {
        let root = std::env::temp_dir().join(format!("crewcode_sandbox_{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&root).expect("mkdir");
        let policy = SandboxPolicy::new(&root).expect("policy builds");
        (ToolSandbox::new(policy), root)
    }

    #[test]
    fn truncate_result_is_noop_below_cap() {
        let text = "short text";
        assert_eq!(truncate_result(text), text);
    }

    #[test]
    fn truncate_result_keeps_head_and_tail() {
        let text = "a".repeat(TRUNCATION_CAP_BYTES + 5000);
        let truncated = truncate_result(&text);
        assert!(truncated.contains(TRUNCATION_MARKER));
        assert!(truncated.len() < text.len());
        assert!(truncated.starts_with('a'));
        assert!(truncated.ends_with('a'));
    }

    #[test]
    fn bash_deny_list_blocks_rm_rf_root() {
        let (_sandbox, root) = test_sandbox();
        let policy = SandboxPolicy::new(&root).unwrap();
        assert!(policy.bash_command_blocked("rm -rf /"));
        assert!(policy.bash_command_blocked("sudo rm important"));
        assert!(!policy.bash_command_blocked("ls -la"));
        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn safe_mode_additionally_blocks_network_tools_and_installers() {
        let policy = SandboxPolicy::safe_mode(std::env::temp_dir()).unwrap();
        assert!(policy.bash_command_blocked("curl https://example.com"));
        assert!(policy.bash_command_blocked("npm install left-pad"));
        let plain = SandboxPolicy::new(std::env::temp_dir()).unwrap();
        assert!(!plain.bash_command_blocked("npm install left-pad"));
    }

    #[test]
    fn host_deny_list_blocks_loopback_and_metadata() {
        let policy = SandboxPolicy::new(std::env::temp_dir()).unwrap();
        assert!(policy.host_blocked("127.0.0.1"));
        assert!(policy.host_blocked("localhost"));
        assert!(policy.host_blocked("169.254.169.254"));
        assert!(policy.host_blocked("192.168.1.5"));
        assert!(!policy.host_blocked("example.com"));
    }

    #[tokio::test]
    async fn read_write_edit_roundtrip_through_sandbox() {
        let (sandbox, root) = test_sandbox();
        let deps = DependencyMap::new();

        let write = sandbox.write_tool();
        let edit = sandbox.edit_tool();
        let read = sandbox.read_tool();

        write
            .execute(json!({"path": "hello.txt", "content": "hello world"}), &deps)
            .await
            .expect("write ok");

        edit.execute(
            json!({"path": "hello.txt", "oldString": "world", "newString": "rust"}),
            &deps,
        )
        .await
        .expect("edit ok");

        let out = read
            .execute(json!({"path": "hello.txt"}), &deps)
            .await
            .expect("read ok");
        assert!(matches!(out, ToolOutcome::Text(ref text) if text.contains("hello rust")));
        assert!(matches!(out, ToolOutcome::Text(ref text) if text.starts_with("     1\t")));

        assert_eq!(sandbox.log().len(), 3);

        let _ = fs::remove_dir_all(&root);
    }

    #[tokio::test]
    async fn read_blocks_path_escaping_root() {
        let (sandbox, root) = test_sandbox();
        let deps = DependencyMap::new();

        let read = sandbox.read_tool();
        let out = read
            .execute(json!({"path": "../../etc/passwd"}), &deps)
            .await
            .expect("handler does not error");
        assert!(matches!(out, ToolOutcome::Text(ref text) if text.starts_with("Blocked:")));

        let _ = fs::remove_dir_all(&root);
    }

    #[tokio::test]
    async fn edit_replace_all_escapes_old_string_as_regex_literal() {
        let (sandbox, root) = test_sandbox();
        let deps = DependencyMap::new();

        let write = sandbox.write_tool();
        let edit = sandbox.edit_tool();

        write
            .execute(
                json!({"path": "dots.txt", "content": "a.b a.b axb"}),
                &deps,
            )
            .await
            .expect("write ok");

        let result = edit
            .execute(
                json!({
                    "path": "dots.txt",
                    "oldString": "a.b",
                    "newString": "X",
                    "replaceAll": true
                }),
                &deps,
            )
            .await
            .expect("edit ok");

        assert!(matches!(result, ToolOutcome::Text(ref text) if text.contains("Replaced 2")));

        let _ = fs::remove_dir_all(&root);
    }

    #[tokio::test]
    async fn grep_reports_invalid_regex_as_text_not_error() {
        let (sandbox, root) = test_sandbox();
        let deps = DependencyMap::new();
        let grep = sandbox.grep_tool();

        let out = grep
            .execute(json!({"pattern": "("}), &deps)
            .await
            .expect("handler does not error");
        assert!(matches!(out, ToolOutcome::Text(ref text) if text.starts_with("Invalid regex")));

        let _ = fs::remove_dir_all(&root);
    }

    #[tokio::test]
    async fn webfetch_blocks_loopback_urls() {
        let (sandbox, root) = test_sandbox();
        let deps = DependencyMap::new();
        let webfetch = sandbox.webfetch_tool();

        let out = webfetch
            .execute(json!({"url": "http://127.0.0.1:8000/", "format": "text"}), &deps)
            .await
            .expect("handler does not error");
        assert!(matches!(out, ToolOutcome::Text(ref text) if text.starts_with("Blocked:")));

        let _ = fs::remove_dir_all(&root);
    }
}
