//! Permission gating for dangerous tools. A gateway is consulted only for
//! `{bash, write, edit}` — read-only tools bypass it entirely.

use std::io::{self, Write as _};

use async_trait::async_trait;

pub const DANGEROUS_TOOLS: &[&str] = &["bash", "write", "edit"];

pub fn is_dangerous_tool(name: &str) -> bool {
    DANGEROUS_TOOLS.contains(&name)
}

/// `(toolName, details) → bool` supplied by the host.
#[async_trait]
pub trait PermissionGateway: Send + Sync {
    async fn allow(&self, tool_name: &str, details: &str) -> bool;
}

/// Unconditionally allows every call. Used by the team channel, where a
/// per-call interactive prompt across N agents would deadlock headless runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoAllowGateway;

#[async_trait]
impl PermissionGateway for AutoAllowGateway {
    async fn allow(&self, _tool_name: &str, _details: &str) -> bool {
        true
    }
}

/// Terminal fallback for single-agent/DM mode: prints the tool and detail
/// summary, reads a Y/N line from stdin. Escape (empty input, EOF, or
/// anything not starting with 'y'/'Y') denies. The full modal rendering
/// belongs to the external terminal UI; this is the minimal runnable
/// implementation the interface requires standalone.
#[derive(Debug, Clone, Copy, Default)]
pub struct InteractiveGateway;

#[async_trait]
impl PermissionGateway for InteractiveGateway {
    async fn allow(&self, tool_name: &str, details: &str) -> bool {
        print!("Allow {tool_name} ({details})? [y/N] ");
        if io::stdout().flush().is_err() {
            return false;
        }

        let mut line = String::new();
        if io::stdin().read_line(&mut line).is_err() {
            return false;
        }

        matches!(line.trim(), "y" | "Y" | "yes" | "Yes")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dangerous_tools_are_exactly_bash_write_edit() {
        assert!(is_dangerous_tool("bash"));
        assert!(is_dangerous_tool("write"));
        assert!(is_dangerous_tool("edit"));
        assert!(!is_dangerous_tool("read"));
        assert!(!is_dangerous_tool("glob"));
    }

    #[tokio::test]
    async fn auto_allow_always_allows() {
        let gateway = AutoAllowGateway;
        assert!(gateway.allow("bash", "rm -rf /tmp/x").await);
    }
}
