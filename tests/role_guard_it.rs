mod common;

// std
use std::sync::Arc;
// crates.io
use parking_lot::Mutex;
// self
use common::{FakeBackend, RefreshBehavior, client, sign_in};
use portal_client::{
	auth::{Credential, Identity, Role},
	guard::{GuardDecision, RoleGuard},
	request::RequestDescriptor,
	session::SessionStore,
};

#[test]
fn practitioner_is_redirected_from_patient_area() {
	let store = SessionStore::default();

	store.set_session(
		Identity::new("Ravi Menon", "9000000003", Some(Role::Practitioner)),
		Credential::new("tok"),
	);

	let patient_area = RoleGuard::new(Role::Patient).bind(&store);
	let practitioner_area = RoleGuard::new(Role::Practitioner).bind(&store);

	assert_eq!(patient_area.decision(), GuardDecision::Redirect { to: "/login".into() });
	assert_eq!(practitioner_area.decision(), GuardDecision::Admit);
}

#[test]
fn binding_tracks_login_and_logout() {
	let store = SessionStore::default();
	let binding = RoleGuard::new(Role::Doctor).with_entry_point("/").bind(&store);
	let flips = Arc::new(Mutex::new(Vec::new()));
	let sink = flips.clone();

	binding.on_change(move |decision| sink.lock().push(decision.clone()));

	assert!(!binding.decision().is_admit());

	store.set_session(
		Identity::new("Dr. Meera Iyer", "9000000002", Some(Role::Doctor)),
		Credential::new("tok"),
	);
	store.update_credential(Credential::new("tok-2"));
	store.clear();

	assert_eq!(
		*flips.lock(),
		vec![GuardDecision::Admit, GuardDecision::Redirect { to: "/".into() }],
		"Credential rotation alone must not flip the decision."
	);
	assert_eq!(store.subscriber_count(), 1);
	drop(binding);
	assert_eq!(store.subscriber_count(), 0);
}

#[tokio::test]
async fn failed_refresh_redirects_open_views() {
	let backend = FakeBackend::new("unused").with_refresh(RefreshBehavior::Reject);
	let (client, store) = client(&backend);

	sign_in(&store, "stale");

	let binding = RoleGuard::new(Role::Patient).bind(&store);
	let redirected = Arc::new(Mutex::new(None));
	let sink = redirected.clone();

	binding.on_change(move |decision| *sink.lock() = Some(decision.clone()));

	assert!(binding.decision().is_admit());

	client
		.run(&RequestDescriptor::get("patient/tests/"))
		.await
		.expect_err("Failed refresh should surface the original error.");

	assert_eq!(*redirected.lock(), Some(GuardDecision::Redirect { to: "/login".into() }));
	assert_eq!(binding.decision(), GuardDecision::Redirect { to: "/login".into() });
}

#[tokio::test]
async fn suspended_credential_keeps_view_admitted_during_refresh() {
	let backend = FakeBackend::new("unused").with_refresh(RefreshBehavior::Issue("fresh".into()));
	let (client, store) = client(&backend);

	sign_in(&store, "stale");

	let binding = RoleGuard::new(Role::Patient).bind(&store);
	let flips = Arc::new(Mutex::new(0));
	let counter = flips.clone();

	binding.on_change(move |_| *counter.lock() += 1);
	client.run(&RequestDescriptor::get("patient/tests/")).await.expect("Refresh should recover.");

	assert!(binding.decision().is_admit());
	assert_eq!(*flips.lock(), 0);
}
