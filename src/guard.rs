//! Role-gated access to protected view subtrees.

// self
use crate::{
	_prelude::*,
	auth::Role,
	config::DEFAULT_ENTRY_POINT,
	session::{Session, SessionStore, Subscription},
};

type DecisionCallback = Box<dyn Fn(&GuardDecision) + Send + Sync>;

/// Returns `true` when `session` holds an identity whose role is exactly `required`.
pub fn can_enter(required: Role, session: &Session) -> bool {
	session.is_authenticated()
		&& session.identity().is_some_and(|identity| identity.has_role(required))
}

/// Route a freshly signed-in session should land on; the entry point when no role matches.
pub fn landing_route<'a>(session: &Session, entry_point: &'a str) -> &'a str {
	match session.identity().and_then(|identity| identity.role) {
		Some(role) if session.is_authenticated() => role.home_route(),
		_ => entry_point,
	}
}

/// Result of evaluating a guard against a session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GuardDecision {
	/// Render the protected subtree.
	Admit,
	/// Navigate away to `to`.
	Redirect {
		/// Target route.
		to: String,
	},
}
impl GuardDecision {
	/// Returns `true` for [`GuardDecision::Admit`].
	pub fn is_admit(&self) -> bool {
		matches!(self, Self::Admit)
	}
}

/// Parametrized guard for one protected subtree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoleGuard {
	/// Role the subtree requires.
	pub required: Role,
	/// Route unauthorized sessions are redirected to.
	pub entry_point: String,
}
impl RoleGuard {
	/// Creates a guard redirecting to the default entry point.
	pub fn new(required: Role) -> Self {
		Self { required, entry_point: DEFAULT_ENTRY_POINT.into() }
	}

	/// Overrides the redirect target.
	pub fn with_entry_point(mut self, route: impl Into<String>) -> Self {
		self.entry_point = route.into();

		self
	}

	/// Evaluates the guard against `session`.
	pub fn evaluate(&self, session: &Session) -> GuardDecision {
		if can_enter(self.required, session) {
			GuardDecision::Admit
		} else {
			GuardDecision::Redirect { to: self.entry_point.clone() }
		}
	}

	/// Binds the guard to `store`, re-evaluating on every session change.
	pub fn bind(self, store: &SessionStore) -> GuardBinding {
		let initial = self.evaluate(&store.snapshot());
		let shared = Arc::new(BindingState {
			guard: self,
			decision: RwLock::new(initial),
			on_change: RwLock::new(None),
		});
		let observer = shared.clone();
		let subscription = store.subscribe(move |session| observer.reevaluate(session));

		GuardBinding { shared, _subscription: subscription }
	}
}

/// Live guard decision kept current by a [`SessionStore`] subscription.
///
/// Dropping the binding unsubscribes.
pub struct GuardBinding {
	shared: Arc<BindingState>,
	_subscription: Subscription,
}
impl GuardBinding {
	/// Latest decision.
	pub fn decision(&self) -> GuardDecision {
		self.shared.decision.read().clone()
	}

	/// Guard being evaluated.
	pub fn guard(&self) -> &RoleGuard {
		&self.shared.guard
	}

	/// Registers a callback fired whenever the decision flips; replaces any previous one.
	pub fn on_change<F>(&self, callback: F)
	where
		F: 'static + Fn(&GuardDecision) + Send + Sync,
	{
		*self.shared.on_change.write() = Some(Box::new(callback));
	}
}
impl Debug for GuardBinding {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("GuardBinding")
			.field("guard", &self.shared.guard)
			.field("decision", &self.decision())
			.finish()
	}
}

struct BindingState {
	guard: RoleGuard,
	decision: RwLock<GuardDecision>,
	on_change: RwLock<Option<DecisionCallback>>,
}
impl BindingState {
	fn reevaluate(&self, session: &Session) {
		let next = self.guard.evaluate(session);
		let changed = {
			let mut current = self.decision.write();

			if *current == next {
				false
			} else {
				*current = next.clone();

				true
			}
		};

		if !changed {
			return;
		}
		if let Some(callback) = self.on_change.read().as_ref() {
			callback(&next);
		}
	}
}
