//! Test helpers for inbound HTTP components.

use std::sync::{Arc, Mutex};

use actix_http::Request;
use actix_session::{SessionMiddleware, storage::CookieSessionStore};
use actix_web::body::MessageBody;
use actix_web::cookie::{Cookie, Key};
use actix_web::dev::{Service, ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{App, test, web};
use async_trait::async_trait;

use crate::domain::ports::{
    EmailMessage, Notifier, NotifierError, PasswordHashError, PasswordHasher,
};
use crate::domain::test_fixtures::{fixture_clock, registration};
use crate::domain::{
    AccountLoginService, ApprovalVersion, ApprovalWorkflowService, EmailAddress, JobService,
    NotificationDispatcher, PasswordDigest, ProblemId, Role, UserId,
};
use crate::inbound::http::error::{json_config, path_config, query_config};
use crate::inbound::http::state::HttpState;
use crate::inbound::http::configure_api;
use crate::outbound::memory::InMemoryStore;

/// Build a session middleware configured for tests.
///
/// - Generates a fresh signing/encryption key per invocation.
/// - Sets the cookie name to `session` and disables the `Secure` flag for
///   local HTTP tests.
pub fn test_session_middleware() -> SessionMiddleware<CookieSessionStore> {
    SessionMiddleware::builder(CookieSessionStore::default(), Key::generate())
        .cookie_name("session".to_owned())
        .cookie_secure(false)
        .build()
}

/// Extract the session cookie set by a response.
pub fn session_cookie<B>(response: &ServiceResponse<B>) -> Cookie<'static> {
    response
        .response()
        .cookies()
        .find(|cookie| cookie.name() == "session")
        .map(Cookie::into_owned)
        .expect("session cookie set")
}

/// Reversible hasher so handler tests avoid Argon2 work.
#[derive(Debug, Default)]
pub struct FixtureHasher;

impl PasswordHasher for FixtureHasher {
    fn hash(&self, plain: &str) -> Result<PasswordDigest, PasswordHashError> {
        Ok(PasswordDigest::new(format!("fixture${plain}")))
    }

    fn verify(&self, plain: &str, digest: &PasswordDigest) -> bool {
        digest.as_str() == format!("fixture${plain}")
    }
}

/// Notifier that keeps every message it was asked to send.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<EmailMessage>>,
}

impl RecordingNotifier {
    pub fn subjects(&self) -> Vec<String> {
        self.sent
            .lock()
            .expect("notifier lock")
            .iter()
            .map(|message| message.subject.clone())
            .collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, message: &EmailMessage) -> Result<(), NotifierError> {
        self.sent.lock().expect("notifier lock").push(message.clone());
        Ok(())
    }
}

/// Handler state wired to a shared in-memory store.
pub struct TestHarness {
    pub store: Arc<InMemoryStore>,
    pub notifier: Arc<RecordingNotifier>,
    pub state: HttpState,
}

impl TestHarness {
    pub fn new() -> Self {
        let store = Arc::new(InMemoryStore::new());
        let notifier = Arc::new(RecordingNotifier::default());
        let hasher: Arc<dyn PasswordHasher> = Arc::new(FixtureHasher);
        let clock = fixture_clock();
        let admin = EmailAddress::new("admin@example.org").expect("admin email");
        let notifications = NotificationDispatcher::new(notifier.clone(), Some(admin));
        let state = HttpState::from_services(
            Arc::new(ApprovalWorkflowService::new(
                store.clone(),
                hasher.clone(),
                notifications,
                clock.clone(),
            )),
            Arc::new(AccountLoginService::new(
                store.clone(),
                store.clone(),
                hasher,
                clock.clone(),
            )),
            Arc::new(JobService::new(store.clone(), clock)),
        );
        Self {
            store,
            notifier,
            state,
        }
    }
}

impl TestHarness {
    /// Register and approve an account with password `wonderland`.
    pub async fn seed_account(&self, username: &str, role: Role) -> UserId {
        let email = format!("{username}@x.com");
        let outcome = self
            .state
            .accounts
            .register(registration(username, &email))
            .await
            .expect("registration succeeds");
        self.state
            .accounts
            .approve(outcome.user_id, "seed", ApprovalVersion::initial())
            .await
            .expect("approval succeeds");
        if role == Role::Admin {
            self.state
                .accounts
                .promote_to_admin(outcome.user_id)
                .await
                .expect("promotion succeeds");
        }
        outcome.user_id
    }

    pub fn seed_problem(&self) -> ProblemId {
        let problem = ProblemId::random();
        self.store.seed_problem(problem);
        problem
    }

    /// Application exposing every API handler under `/api/v1`.
    pub fn app(
        &self,
    ) -> App<
        impl ServiceFactory<
            ServiceRequest,
            Config = (),
            Response = ServiceResponse,
            Error = actix_web::Error,
            InitError = (),
        > + use<>,
    > {
        App::new()
            .app_data(web::Data::new(self.state.clone()))
            .app_data(json_config())
            .app_data(query_config())
            .app_data(path_config())
            .wrap(test_session_middleware())
            .service(web::scope("/api/v1").configure(configure_api))
    }
}

/// Log in through the HTTP API and return the session cookie.
pub async fn login_cookie<S, B>(app: &S, username: &str) -> Cookie<'static>
where
    S: Service<Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    let request = test::TestRequest::post()
        .uri("/api/v1/auth/login")
        .set_json(serde_json::json!({ "username": username, "password": "wonderland" }))
        .to_request();
    let response = test::call_service(app, request).await;
    assert!(response.status().is_success(), "login for {username} succeeds");
    session_cookie(&response)
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}
