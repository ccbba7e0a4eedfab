//! Pages through a mocked vendor endpoint with the default reqwest transport and writes every
//! page to a JSON output directory.

// std
use std::time::Duration;
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
// self
use dataminer_kit::{
	auth::{Credentials, Environment},
	client::ApiClient,
	config::{ClientOptions, RetryPolicy},
	output::{page_of_name, prepare_output_dirs, write_json_page},
	url::Url,
};

const TOTAL_PAGES: u64 = 3;

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/token").query_param("grant_type", "client_credentials");
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"demo-access\",\"token_type\":\"bearer\",\"expires_in\":5999}",
			);
		})
		.await;
	let mut page_mocks = Vec::new();

	for page in 1..=TOTAL_PAGES {
		let body = serde_json::json!({
			"page": page,
			"totalPages": TOTAL_PAGES,
			"items": [{ "id": page * 10 }, { "id": page * 10 + 1 }],
		});
		let mock = server
			.mock_async(|when, then| {
				when.method(GET)
					.path("/v1/sites")
					.query_param("page", page.to_string())
					.header("authorization", "Bearer demo-access");
				then.status(200).header("content-type", "application/json").json_body(body);
			})
			.await;

		page_mocks.push(mock);
	}

	let credentials = Credentials::builder()
		.client_id("demo-client")
		.client_secret("super-secret")
		.token_url(server.url("/token"))
		.scope("sites.read")
		.environment(Environment::Sandbox)
		.build()?;
	let client = ApiClient::new(credentials).with_options(
		ClientOptions::default()
			.with_timeout(Duration::from_secs(5))
			.with_retry(RetryPolicy::default().with_max_attempts(5)),
	);
	let output = tempfile::tempdir()?;
	let json_dir = output.path().join("json");
	let temp_dir = output.path().join("temp");

	prepare_output_dirs(None, Some(&json_dir), &temp_dir)?;

	for page in 1..=TOTAL_PAGES {
		let mut url = Url::parse(&server.url("/v1/sites"))?;

		url.query_pairs_mut().append_pair("page", &page.to_string());

		let response = client.get(url).await?;
		let body = response.value()?;
		let path = write_json_page(&json_dir, &page_of_name("Site: Export", page, TOTAL_PAGES), &body)?;

		println!("Saved page {page} after {} attempt(s) to {}.", response.attempts, path.display());
	}

	token_mock.assert_async().await;

	for mock in page_mocks {
		mock.assert_async().await;
	}

	Ok(())
}
