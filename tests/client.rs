use cli_mcp::config::{ConfigLoader, LaunchSpec, UserConfig};
use cli_mcp::{CliError, McpClient};
use serde_json::json;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::time::Duration;

const TIMEOUT: Duration = Duration::from_secs(20);

fn self_exe() -> &'static Path {
    Path::new(env!("CARGO_BIN_EXE_cli-mcp"))
}

fn builtin_spec(name: &str) -> LaunchSpec {
    let loader = ConfigLoader::from_parts(
        cli_mcp::config::get_default_configs(),
        HashMap::new(),
        UserConfig::default(),
        PathBuf::from("unused.toml"),
    );
    loader
        .resolve(name)
        .unwrap()
        .package
        .launch_spec(self_exe())
}

#[tokio::test]
async fn test_client_handshake_and_tools() {
    let client = McpClient::spawn("echo", &builtin_spec("echo"), TIMEOUT)
        .await
        .unwrap();

    let info = client.server_info().unwrap();
    assert_eq!(info.name, "echo");
    assert!(client.instructions().is_some());
    assert!(client.capabilities().unwrap().tools.is_some());

    let tools = client.list_tools().await.unwrap();
    let names: Vec<&str> = tools.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["echo", "reverse"]);

    client.ping().await.unwrap();
    client.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_client_calls_tools() {
    let client = McpClient::spawn("calc", &builtin_spec("calc"), TIMEOUT)
        .await
        .unwrap();

    let result = client
        .call_tool("multiply", json!({"a": 6, "b": 7}))
        .await
        .unwrap();
    assert!(!result.is_error());
    assert_eq!(result.text_content(), "42");

    let result = client
        .call_tool("divide", json!({"a": 1, "b": 0}))
        .await
        .unwrap();
    assert!(result.is_error());

    assert!(matches!(
        client.call_tool("add", json!([1, 2])).await,
        Err(CliError::InvalidArgument(_))
    ));

    let result = client.call_tool("add", serde_json::Value::Null).await.unwrap();
    assert!(result.is_error());
    assert!(result.text_content().starts_with("Invalid arguments"));

    client.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_client_missing_program() {
    let spec = LaunchSpec {
        program: "definitely-not-a-real-mcp-server".to_string(),
        args: vec![],
        env: BTreeMap::new(),
    };

    match McpClient::spawn("ghost", &spec, TIMEOUT).await {
        Err(CliError::ServerNotFound(name, _)) => assert_eq!(name, "ghost"),
        Err(other) => panic!("unexpected error: {}", other),
        Ok(_) => panic!("spawn should fail"),
    }
}

#[cfg(unix)]
#[tokio::test]
async fn test_client_server_exits_immediately() {
    let spec = LaunchSpec {
        program: "sh".to_string(),
        args: vec!["-c".to_string(), "exit 0".to_string()],
        env: BTreeMap::new(),
    };

    match McpClient::spawn("quitter", &spec, TIMEOUT).await {
        Err(CliError::ServerCrashed(name)) => assert_eq!(name, "quitter"),
        Err(other) => panic!("unexpected error: {}", other),
        Ok(_) => panic!("handshake should fail"),
    }
}

#[cfg(unix)]
#[tokio::test]
async fn test_client_times_out_on_silent_server() {
    // Reads stdin forever without answering
    let spec = LaunchSpec {
        program: "sh".to_string(),
        args: vec!["-c".to_string(), "cat > /dev/null".to_string()],
        env: BTreeMap::new(),
    };

    match McpClient::spawn("silent", &spec, Duration::from_millis(300)).await {
        Err(CliError::Timeout(d)) => assert_eq!(d, Duration::from_millis(300)),
        Err(other) => panic!("unexpected error: {}", other),
        Ok(_) => panic!("handshake should time out"),
    }
}
