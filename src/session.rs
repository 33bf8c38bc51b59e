//! Session store holding the signed-in identity and its bearer credential.
//!
//! The store is the only stateful piece of the pipeline. Every mutation is serialized by a
//! mutation lock and followed by a synchronous fan-out to subscribers, so observers always see
//! whole snapshots in the order the mutations happened. Two counters ride along with each
//! snapshot:
//!
//! - `generation` changes whenever a new identity is installed or a populated session is
//!   cleared; long-running work captures it up front and drops its result when it moved.
//! - `credential_version` changes whenever the credential does, letting the refresh coordinator
//!   tell a stale rejection from a current one.

// self
use crate::{
	_prelude::*,
	auth::{Credential, Identity},
};

type Callback = Arc<dyn Fn(&Session) + Send + Sync>;

/// Point-in-time view of the session.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Session {
	identity: Option<Identity>,
	credential: Option<Credential>,
	credential_suspended: bool,
	generation: u64,
	credential_version: u64,
}
impl Session {
	/// Identity claims, if signed in.
	pub fn identity(&self) -> Option<&Identity> {
		self.identity.as_ref()
	}

	/// Bearer credential, if signed in.
	pub fn credential(&self) -> Option<&Credential> {
		self.credential.as_ref()
	}

	/// Returns `true` when both identity and credential are held.
	pub fn is_authenticated(&self) -> bool {
		self.identity.is_some() && self.credential.is_some()
	}

	/// Returns `true` while a refresh has withdrawn the credential from request decoration.
	pub fn is_credential_suspended(&self) -> bool {
		self.credential_suspended
	}

	/// Counter bumped whenever a new identity is installed or a populated session is cleared.
	pub fn generation(&self) -> u64 {
		self.generation
	}

	/// Counter bumped whenever the credential changes.
	pub fn credential_version(&self) -> u64 {
		self.credential_version
	}

	fn clear_fields(&mut self) -> bool {
		if self.identity.is_none() && self.credential.is_none() {
			return false;
		}

		self.identity = None;
		self.credential = None;
		self.credential_suspended = false;
		self.generation += 1;
		self.credential_version += 1;

		true
	}
}

/// Credential attached to an outgoing request along with the version it was read at.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Bearer {
	/// Credential to send.
	pub credential: Credential,
	/// [`Session::credential_version`] at read time.
	pub version: u64,
}

/// Thread-safe session store with synchronous change notification.
#[derive(Default)]
pub struct SessionStore {
	state: RwLock<Session>,
	mutation: Mutex<()>,
	subscribers: Arc<Mutex<Subscribers>>,
}
impl SessionStore {
	/// Returns a clone of the current session.
	pub fn snapshot(&self) -> Session {
		self.state.read().clone()
	}

	/// Returns the current identity, if any.
	pub fn identity(&self) -> Option<Identity> {
		self.state.read().identity.clone()
	}

	/// Returns the current credential, if any, regardless of suspension.
	pub fn credential(&self) -> Option<Credential> {
		self.state.read().credential.clone()
	}

	/// Returns the current generation counter.
	pub fn generation(&self) -> u64 {
		self.state.read().generation
	}

	/// Returns the credential requests should carry, or `None` when absent or suspended.
	pub fn bearer(&self) -> Option<Bearer> {
		let state = self.state.read();

		if state.credential_suspended {
			return None;
		}

		state
			.credential
			.clone()
			.map(|credential| Bearer { credential, version: state.credential_version })
	}

	/// Replaces identity and credential together.
	pub fn set_session(&self, identity: Identity, credential: Credential) {
		self.mutate(|session| {
			session.identity = Some(identity);
			session.credential = Some(credential);
			session.credential_suspended = false;
			session.generation += 1;
			session.credential_version += 1;

			true
		});
	}

	/// Replaces only the credential.
	///
	/// Without an identity the update would break the identity/credential pairing, so the store
	/// is cleared instead and `false` is returned.
	pub fn update_credential(&self, credential: Credential) -> bool {
		let mut applied = false;

		self.mutate(|session| Self::apply_credential(session, credential, &mut applied));

		applied
	}

	/// Same as [`update_credential`](Self::update_credential) but only while the session is still
	/// at `generation`; otherwise nothing changes and `false` is returned.
	pub fn update_credential_for(&self, generation: u64, credential: Credential) -> bool {
		let mut applied = false;

		self.mutate(|session| {
			session.generation == generation
				&& Self::apply_credential(session, credential, &mut applied)
		});

		applied
	}

	/// Withdraws the credential from request decoration without dropping the identity, but only
	/// while the session is still at `generation`.
	///
	/// Returns `false` when there is nothing to suspend.
	pub fn suspend_credential_for(&self, generation: u64) -> bool {
		self.mutate(|session| {
			if session.generation != generation
				|| session.credential.is_none()
				|| session.credential_suspended
			{
				return false;
			}

			session.credential_suspended = true;

			true
		})
	}

	/// Clears identity and credential. Calling it on an empty session changes nothing.
	pub fn clear(&self) -> bool {
		self.mutate(Session::clear_fields)
	}

	/// Clears the session only while it is still at `generation`.
	pub fn clear_for(&self, generation: u64) -> bool {
		self.mutate(|session| session.generation == generation && session.clear_fields())
	}

	/// Registers `callback` to run synchronously after every mutation.
	///
	/// The callback receives the post-mutation snapshot. It must not mutate the store or call
	/// back into a client sharing it; both would deadlock.
	pub fn subscribe<F>(&self, callback: F) -> Subscription
	where
		F: 'static + Fn(&Session) + Send + Sync,
	{
		let id = self.subscribers.lock().insert(Arc::new(callback));

		Subscription { id, subscribers: Arc::downgrade(&self.subscribers) }
	}

	/// Returns the number of live subscriptions.
	pub fn subscriber_count(&self) -> usize {
		self.subscribers.lock().entries.len()
	}

	fn apply_credential(session: &mut Session, credential: Credential, applied: &mut bool) -> bool {
		if session.identity.is_none() {
			return session.clear_fields();
		}

		session.credential = Some(credential);
		session.credential_suspended = false;
		session.credential_version += 1;
		*applied = true;

		true
	}

	fn mutate(&self, f: impl FnOnce(&mut Session) -> bool) -> bool {
		let _serial = self.mutation.lock();
		let snapshot = {
			let mut state = self.state.write();

			if !f(&mut *state) {
				return false;
			}

			state.clone()
		};
		let callbacks = self.subscribers.lock().callbacks();

		for callback in callbacks {
			callback(&snapshot);
		}

		true
	}
}
impl Debug for SessionStore {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("SessionStore")
			.field("session", &*self.state.read())
			.field("subscribers", &self.subscriber_count())
			.finish()
	}
}

/// Handle keeping a [`SessionStore::subscribe`] callback registered; dropping it unsubscribes.
pub struct Subscription {
	id: u64,
	subscribers: std::sync::Weak<Mutex<Subscribers>>,
}
impl Drop for Subscription {
	fn drop(&mut self) {
		if let Some(subscribers) = self.subscribers.upgrade() {
			subscribers.lock().remove(self.id);
		}
	}
}
impl Debug for Subscription {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("Subscription").field(&self.id).finish()
	}
}

#[derive(Default)]
struct Subscribers {
	next_id: u64,
	entries: Vec<(u64, Callback)>,
}
impl Subscribers {
	fn insert(&mut self, callback: Callback) -> u64 {
		let id = self.next_id;

		self.next_id += 1;
		self.entries.push((id, callback));

		id
	}

	fn remove(&mut self, id: u64) {
		self.entries.retain(|(entry, _)| *entry != id);
	}

	fn callbacks(&self) -> Vec<Callback> {
		self.entries.iter().map(|(_, callback)| callback.clone()).collect()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::auth::Role;

	fn patient() -> Identity {
		Identity::new("Asha Rao", "9000000001", Some(Role::Patient))
	}

	fn assert_paired(store: &SessionStore) {
		let session = store.snapshot();

		assert_eq!(session.identity().is_some(), session.credential().is_some());
	}

	#[test]
	fn pairing_holds_across_every_operation() {
		let store = SessionStore::default();

		assert_paired(&store);
		store.set_session(patient(), Credential::new("a"));
		assert_paired(&store);
		store.suspend_credential_for(store.generation());
		assert_paired(&store);
		store.update_credential(Credential::new("b"));
		assert_paired(&store);
		store.clear();
		assert_paired(&store);
		store.update_credential(Credential::new("c"));
		assert_paired(&store);
		assert!(!store.snapshot().is_authenticated());
	}

	#[test]
	fn clear_is_idempotent() {
		let store = SessionStore::default();
		let notified = Arc::new(Mutex::new(0));
		let counter = notified.clone();
		let _sub = store.subscribe(move |_| *counter.lock() += 1);

		store.set_session(patient(), Credential::new("a"));
		assert!(store.clear());

		let once = store.snapshot();

		assert!(!store.clear());
		assert_eq!(store.snapshot(), once);
		assert_eq!(*notified.lock(), 2);
	}

	#[test]
	fn update_credential_without_identity_is_rejected() {
		let store = SessionStore::default();

		assert!(!store.update_credential(Credential::new("orphan")));
		assert_eq!(store.credential(), None);
		assert_eq!(store.identity(), None);
	}

	#[test]
	fn update_credential_keeps_identity() {
		let store = SessionStore::default();

		store.set_session(patient(), Credential::new("old"));

		let generation = store.generation();

		assert!(store.update_credential(Credential::new("new")));
		assert_eq!(store.identity(), Some(patient()));
		assert_eq!(store.credential(), Some(Credential::new("new")));
		assert_eq!(store.generation(), generation);
	}

	#[test]
	fn subscribers_see_whole_snapshots_synchronously() {
		let store = SessionStore::default();
		let seen = Arc::new(Mutex::new(Vec::new()));
		let sink = seen.clone();
		let _sub = store.subscribe(move |session| {
			sink.lock().push((session.identity().is_some(), session.credential().cloned()));
		});

		store.set_session(patient(), Credential::new("a"));
		assert_eq!(seen.lock().len(), 1);
		store.update_credential(Credential::new("b"));
		store.clear();

		assert_eq!(
			*seen.lock(),
			vec![
				(true, Some(Credential::new("a"))),
				(true, Some(Credential::new("b"))),
				(false, None),
			]
		);
	}

	#[test]
	fn dropping_subscription_unsubscribes() {
		let store = SessionStore::default();
		let notified = Arc::new(Mutex::new(0));
		let counter = notified.clone();
		let sub = store.subscribe(move |_| *counter.lock() += 1);

		assert_eq!(store.subscriber_count(), 1);
		drop(sub);
		assert_eq!(store.subscriber_count(), 0);
		store.set_session(patient(), Credential::new("a"));
		assert_eq!(*notified.lock(), 0);
	}

	#[test]
	fn suspension_hides_bearer_until_credential_is_replaced() {
		let store = SessionStore::default();

		store.set_session(patient(), Credential::new("stale"));

		let before = store.bearer().expect("Bearer should be present after login.");
		let generation = store.generation();

		assert!(!store.suspend_credential_for(generation + 1));
		assert!(store.suspend_credential_for(generation));
		assert!(!store.suspend_credential_for(generation));
		assert_eq!(store.bearer(), None);
		assert_eq!(store.credential(), Some(Credential::new("stale")));

		store.update_credential(Credential::new("fresh"));

		let after = store.bearer().expect("Bearer should be restored after refresh.");

		assert_eq!(after.credential, Credential::new("fresh"));
		assert!(after.version > before.version);
	}

	#[test]
	fn generation_guards_discard_late_updates() {
		let store = SessionStore::default();

		store.set_session(patient(), Credential::new("a"));

		let generation = store.generation();

		store.clear();
		store.set_session(patient(), Credential::new("second-login"));

		assert!(!store.update_credential_for(generation, Credential::new("late")));
		assert!(!store.clear_for(generation));
		assert_eq!(store.credential(), Some(Credential::new("second-login")));
		assert!(store.clear_for(store.generation()));
		assert_eq!(store.identity(), None);
	}
}
