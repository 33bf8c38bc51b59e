//! Walks a patient through login, a role-gated dashboard that polls its lab tests, and logout,
//! against a local mock backend.

// std
use std::sync::Arc;
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
use serde_json::json;
use tokio::sync::mpsc;
// self
use portal_client::{
	auth::Role,
	config::ClientConfig,
	flows::ReqwestPortalClient,
	guard::{self, RoleGuard},
	request::RequestDescriptor,
	session::SessionStore,
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(POST).path("/api/auth/login/");
			then.status(200)
				.header("set-cookie", "refresh_token=demo-refresh; Path=/; HttpOnly")
				.json_body(json!({
					"message": "Login successful",
					"access": "demo-access",
					"name": "Asha Rao",
					"phone": "9000000001",
					"role": "PATIENT",
				}));
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(GET).path("/api/patient/tests/").header("authorization", "Bearer demo-access");
			then.status(200).json_body(json!([
				{ "test_name": "CBC", "status": "COMPLETED" },
				{ "test_name": "Lipid panel", "status": "PENDING" },
			]));
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(POST).path("/api/auth/logout/");
			then.status(200).json_body(json!({ "message": "Logout successful" }));
		})
		.await;

	let config = ClientConfig::builder(format!("{}/api/", server.base_url()))
		.polling_interval(time::Duration::milliseconds(200))
		.build()?;
	let store = Arc::new(SessionStore::default());
	let client = ReqwestPortalClient::new(config, store.clone())?;
	let dashboard = RoleGuard::new(Role::Patient).bind(&store);

	dashboard.on_change(|decision| println!("Dashboard guard now says {decision:?}."));

	let identity = client.login("9000000001", "hunter2").await?;

	println!(
		"Signed in as {}; landing on {}.",
		identity.display_name,
		guard::landing_route(&store.snapshot(), &client.config.entry_point)
	);

	let (tx, mut rx) = mpsc::unbounded_channel();
	let poll = client.poll(RequestDescriptor::get("patient/tests/"), move |result| {
		let _ = tx.send(result);
	});

	for tick in 1..=2 {
		if let Some(result) = rx.recv().await {
			println!("Tick {tick}: {}.", result?);
		}
	}

	poll.cancel();
	client.logout().await?;

	println!("Signed out; dashboard admitted: {}.", dashboard.decision().is_admit());

	Ok(())
}
