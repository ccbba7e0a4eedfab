//! Fatal token failures terminate the process; the check runs the test binary as a child.

#![cfg(feature = "tracing")]

mod common;

// std
use std::{env, process::Command, sync::Arc};
// self
use common::{CLIENT_ID, CLIENT_SECRET, ScriptedTransport, TOKEN_URL, api_url, credentials};
use dataminer_kit::{auth::Environment, client::ApiClient, config::ClientOptions};

const CHILD_ENV: &str = "DATAMINER_KIT_EXIT_CHILD";
const TEST_NAME: &str = "missing_access_token_exits_with_critical_log";

async fn run_child() {
	tracing_subscriber::fmt().with_writer(std::io::stderr).with_ansi(false).init();

	let transport =
		Arc::new(ScriptedTransport::default().with_token_body("{\"token_type\":\"bearer\"}"));
	let client: ApiClient<ScriptedTransport> =
		ApiClient::with_transport(credentials(TOKEN_URL, Environment::Production), transport)
			.with_options(ClientOptions::default());
	let outcome = client.get(api_url()).await;

	panic!("Process should have exited, got {outcome:?}.");
}

#[tokio::test]
async fn missing_access_token_exits_with_critical_log() {
	if env::var_os(CHILD_ENV).is_some() {
		run_child().await;
	}

	let output = Command::new(env::current_exe().expect("Test binary path should resolve."))
		.args(["--exact", TEST_NAME, "--nocapture", "--test-threads=1"])
		.env(CHILD_ENV, "1")
		.output()
		.expect("Child test process should run.");
	let stderr = String::from_utf8_lossy(&output.stderr);

	assert_eq!(output.status.code(), Some(1), "stderr: {stderr}");
	assert!(stderr.contains("severity=\"critical\""), "stderr: {stderr}");
	assert!(stderr.contains(CLIENT_ID), "stderr: {stderr}");
	assert!(stderr.contains("production=true"), "stderr: {stderr}");
	assert!(stderr.contains("environment=production"), "stderr: {stderr}");
	assert!(!stderr.contains(CLIENT_SECRET), "stderr: {stderr}");
}
