//! Built-in tools with simulated backends.
//!
//! Every tool sleeps for a fixed latency to mimic a remote call unless
//! latency simulation is disabled through [`BuiltinOptions`].

use std::time::Duration;

use serde_json::{json, Value};

use super::arguments::ToolArguments;
use super::expr;
use super::registry::ToolRegistryBuilder;
use super::tool::AgentTool;
use super::types::ToolParameters;
use crate::error::LoopError;

pub const WEB_SEARCH: &str = "web-search";
pub const GET_WEATHER: &str = "get-weather";
pub const CALCULATE: &str = "calculate";
pub const CODE_INTERPRETER: &str = "code-interpreter";
pub const FILE_SEARCH: &str = "file-search";

const WEATHER_CONDITIONS: [&str; 4] = ["sunny", "cloudy", "rainy", "partly cloudy"];

/// Options for the built-in tool set.
#[derive(Debug, Clone, Copy)]
pub struct BuiltinOptions {
    pub simulate_latency: bool,
}

impl Default for BuiltinOptions {
    fn default() -> Self {
        Self {
            simulate_latency: true,
        }
    }
}

/// Register every built-in tool with default options.
pub fn register_all(builder: ToolRegistryBuilder) -> ToolRegistryBuilder {
    register_all_with(builder, BuiltinOptions::default())
}

pub fn register_all_with(builder: ToolRegistryBuilder, options: BuiltinOptions) -> ToolRegistryBuilder {
    builder
        .tool(web_search(options))
        .tool(get_weather(options))
        .tool(calculate(options))
        .tool(code_interpreter(options))
        .tool(file_search(options))
}

async fn simulate(options: BuiltinOptions, millis: u64) {
    if options.simulate_latency {
        tokio::time::sleep(Duration::from_millis(millis)).await;
    }
}

pub fn web_search(options: BuiltinOptions) -> AgentTool {
    AgentTool::new(
        WEB_SEARCH,
        "Search the web for current information",
        ToolParameters::object()
            .string("query", "The search query", true)
            .build(),
        move |args, _ctx| run_web_search(args, options),
    )
}

async fn run_web_search(args: ToolArguments, options: BuiltinOptions) -> Result<Value, LoopError> {
    let query = args.get_str("query")?;
    simulate(options, 1000).await;
    Ok(json!({
        "results": [
            {
                "title": format!("Result for \"{query}\""),
                "snippet": "This is a simulated search result.",
                "url": "https://example.com",
            },
            {
                "title": format!("More about {query}"),
                "snippet": "Additional information found.",
                "url": "https://example.org",
            },
        ],
    }))
}

pub fn get_weather(options: BuiltinOptions) -> AgentTool {
    AgentTool::new(
        GET_WEATHER,
        "Get current weather for a location",
        ToolParameters::object()
            .string("location", "The city name", true)
            .build(),
        move |args, _ctx| run_get_weather(args, options),
    )
}

async fn run_get_weather(args: ToolArguments, options: BuiltinOptions) -> Result<Value, LoopError> {
    let location = args.get_str("location")?;
    simulate(options, 800).await;
    let seed = pseudo_random(location);
    Ok(json!({
        "location": location,
        "temperature": 50 + seed % 30,
        "condition": WEATHER_CONDITIONS[(seed / 30) as usize % WEATHER_CONDITIONS.len()],
        "humidity": 30 + (seed / 120) % 50,
    }))
}

pub fn calculate(options: BuiltinOptions) -> AgentTool {
    AgentTool::new(
        CALCULATE,
        "Perform mathematical calculations",
        ToolParameters::object()
            .string("expression", "The math expression to evaluate", true)
            .build(),
        move |args, _ctx| run_calculate(args, options),
    )
}

async fn run_calculate(args: ToolArguments, options: BuiltinOptions) -> Result<Value, LoopError> {
    let expression = args.get_str("expression")?;
    simulate(options, 300).await;
    // An unparsable expression is a normal tool answer, not a tool failure.
    Ok(match expr::evaluate(expression) {
        Ok(value) => json!({ "expression": expression, "result": expr::number_to_json(value) }),
        Err(reason) => json!({
            "expression": expression,
            "error": "Could not evaluate expression",
            "reason": reason,
        }),
    })
}

pub fn code_interpreter(options: BuiltinOptions) -> AgentTool {
    AgentTool::new(
        CODE_INTERPRETER,
        "Execute Python code and return results",
        ToolParameters::object()
            .string("code", "The Python code to execute", true)
            .build(),
        move |args, _ctx| run_code_interpreter(args, options),
    )
}

async fn run_code_interpreter(
    args: ToolArguments,
    options: BuiltinOptions,
) -> Result<Value, LoopError> {
    let code = args.get_str("code")?;
    simulate(options, 1500).await;
    let preview: String = code.chars().take(50).collect();
    Ok(json!({
        "code": code,
        "output": format!("Executed code successfully.\nSimulated output for: {preview}..."),
        "executionTime": "0.05s",
    }))
}

pub fn file_search(options: BuiltinOptions) -> AgentTool {
    AgentTool::new(
        FILE_SEARCH,
        "Search through uploaded files",
        ToolParameters::object()
            .string("query", "The search query", true)
            .build(),
        move |args, _ctx| run_file_search(args, options),
    )
}

async fn run_file_search(args: ToolArguments, options: BuiltinOptions) -> Result<Value, LoopError> {
    let query = args.get_str("query")?;
    simulate(options, 600).await;
    Ok(json!({
        "query": query,
        "matches": [
            {
                "filename": "document.pdf",
                "excerpt": format!("Found \"{query}\" in paragraph 3..."),
                "page": 3,
            },
            {
                "filename": "notes.txt",
                "excerpt": format!("Reference to {query} found..."),
                "line": 42,
            },
        ],
    }))
}

/// Pseudo-random value mixed from `salt` and the clock, without pulling in `rand`.
fn pseudo_random(salt: &str) -> u64 {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let mut hasher = DefaultHasher::new();
    salt.hash(&mut hasher);
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos()
        .hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{Tool, ToolExecutionContext};

    const FAST: BuiltinOptions = BuiltinOptions {
        simulate_latency: false,
    };

    async fn run(tool: AgentTool, input: serde_json::Value) -> serde_json::Value {
        tool.execute(&ToolArguments::new(input), &ToolExecutionContext::default())
            .await
            .expect("builtin tool should succeed")
    }

    #[tokio::test]
    async fn calculate_returns_integral_result() {
        let output = run(calculate(FAST), json!({ "expression": "2+2" })).await;
        assert_eq!(output, json!({ "expression": "2+2", "result": 4 }));
    }

    #[tokio::test]
    async fn calculate_reports_unparsable_expression_in_output() {
        let output = run(calculate(FAST), json!({ "expression": "2 +" })).await;
        assert_eq!(output["error"], "Could not evaluate expression");
        assert!(output.get("result").is_none());
    }

    #[tokio::test]
    async fn weather_values_stay_in_range() {
        let output = run(get_weather(FAST), json!({ "location": "Lisbon" })).await;
        let temperature = output["temperature"].as_u64().unwrap();
        let humidity = output["humidity"].as_u64().unwrap();
        assert!((50..80).contains(&temperature));
        assert!((30..80).contains(&humidity));
        assert!(WEATHER_CONDITIONS.contains(&output["condition"].as_str().unwrap()));
    }

    #[tokio::test]
    async fn search_tools_echo_query() {
        let web = run(web_search(FAST), json!({ "query": "rust" })).await;
        assert_eq!(web["results"].as_array().unwrap().len(), 2);

        let files = run(file_search(FAST), json!({ "query": "rust" })).await;
        assert_eq!(files["matches"][1]["line"], 42);
    }

    #[tokio::test(start_paused = true)]
    async fn simulated_latency_uses_tokio_clock() {
        let started = tokio::time::Instant::now();
        run(code_interpreter(BuiltinOptions::default()), json!({ "code": "print(1)" })).await;
        assert!(started.elapsed() >= Duration::from_millis(1500));
    }
}
