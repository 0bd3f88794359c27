use std::env;
use std::error::Error;
use std::fs;

use crewcode::tools::sandbox::{SandboxPolicy, ToolSandbox};
use crewcode::{Agent, AgentEvent, AnthropicModel};
use futures_util::StreamExt;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let prompt = env::args().skip(1).collect::<Vec<_>>().join(" ");
    let prompt = if prompt.trim().is_empty() {
        "List all Rust files in this sandbox and summarize what they do".to_string()
    } else {
        prompt
    };

    let model_name =
        env::var("ANTHROPIC_MODEL").unwrap_or_else(|_| "claude-sonnet-4-5".to_string());
    let model = AnthropicModel::from_env(model_name)?;

    let sandbox_root = env::var("CREWCODE_SANDBOX")
        .map(std::path::PathBuf::from)
        .unwrap_or_else(|_| std::env::temp_dir().join("crewcode_sandbox"));
    fs::create_dir_all(&sandbox_root)?;
    seed_workspace(&sandbox_root)?;

    let safe_mode = env::var("CREWCODE_SAFE_MODE").as_deref() != Ok("0");
    let policy = if safe_mode {
        SandboxPolicy::safe_mode(&sandbox_root)?
    } else {
        SandboxPolicy::new(&sandbox_root)?
    };
    let sandbox = ToolSandbox::new(policy);

    println!("sandbox: {}", sandbox_root.display());
    println!("safe mode: {safe_mode}");

    let mut agent = Agent::builder()
        .model(model)
        .tools(sandbox.tool_specs())
        .system_prompt(format!(
            "You are a coding assistant. Work only inside this sandbox: {}.",
            sandbox_root.display()
        ))
        .max_iterations(64)
        .build()?;

    let stream = agent.query_stream(prompt);
    futures_util::pin_mut!(stream);

    while let Some(event) = stream.next().await {
        match event? {
            AgentEvent::Thinking { content } => {
                println!("thinking: {}", truncate(&content, 160));
            }
            AgentEvent::Text { content } => {
                println!("assistant: {}", truncate(&content, 200));
            }
            AgentEvent::ToolCall {
                tool,
                args_json,
                tool_call_id,
            } => {
                println!(
                    "tool-call [{tool_call_id}] {tool}: {}",
                    truncate(&args_json.to_string(), 160)
                );
            }
            AgentEvent::ToolResult {
                tool,
                result_text,
                tool_call_id,
                is_error,
            } => {
                println!(
                    "tool-result [{tool_call_id}] {tool} (error={is_error}): {}",
                    truncate(&result_text, 240)
                );
            }
            AgentEvent::FinalResponse { content } => {
                println!("\nfinal:\n{content}");
            }
        }
    }

    for entry in sandbox.log().entries() {
        println!(
            "log: {} ok={} args={}",
            entry.tool, entry.success, entry.args_preview
        );
    }

    Ok(())
}

fn seed_workspace(root: &std::path::Path) -> Result<(), Box<dyn Error>> {
    fs::create_dir_all(root.join("src"))?;
    fs::write(
        root.join("src").join("main.rs"),
        "fn main() { println!(\"hello from sandbox\"); }\n",
    )?;
    fs::write(
        root.join("src").join("lib.rs"),
        "pub fn add(a: i64, b: i64) -> i64 { a + b }\n",
    )?;
    Ok(())
}

fn truncate(text: &str, max: usize) -> String {
    if text.len() <= max {
        text.to_string()
    } else {
        format!("{}...", &text[..max])
    }
}
