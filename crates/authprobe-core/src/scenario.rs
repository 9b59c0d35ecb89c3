//! Scripted admin workflow.
//!
//! A `Scenario` replays the usual manual test run against a development
//! server: log in as an admin, then optionally check the session, create a
//! scope, create a user, clean server state, and finally log in as a second
//! actor on a fresh session. Each step is selected explicitly; responses
//! never change which later steps run.

use std::fmt;

use anyhow::{Context, Result};
use tracing::info;

use crate::api::ApiClient;
use crate::config::Config;
use crate::models::{Envelope, DEFAULT_USER_LIFE_SECS};

/// Account credentials plus the scopes to request or grant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub name: String,
    pub secret: String,
    pub scopes: Vec<String>,
}

impl Account {
    pub fn new(name: &str, secret: &str, scopes: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            secret: secret.to_string(),
            scopes: scopes.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// The bootstrap administrator of a fresh development server
    pub fn default_admin() -> Self {
        Self::new("admin", "adminadmin", &["authadmin"])
    }

    /// The throwaway account the workflow creates and logs in with
    pub fn default_test_user() -> Self {
        Self::new("test", "testpw", &["user"])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    AdminLogin,
    Check,
    CreateScope,
    CreateUser,
    Clean,
    SecondLogin,
}

impl Step {
    pub fn name(&self) -> &'static str {
        match self {
            Step::AdminLogin => "admin-login",
            Step::Check => "check",
            Step::CreateScope => "create-scope",
            Step::CreateUser => "create-user",
            Step::Clean => "clean",
            Step::SecondLogin => "second-login",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StepOutcome {
    pub step: Step,
    pub response: Envelope,
}

#[derive(Debug, Clone)]
pub struct Scenario {
    pub admin: Account,
    pub check: bool,
    pub create_scope: Option<String>,
    pub create_user: Option<(Account, u64)>,
    pub clean: bool,
    pub second_login: Option<Account>,
}

impl Default for Scenario {
    fn default() -> Self {
        Self {
            admin: Account::default_admin(),
            check: true,
            create_scope: None,
            create_user: None,
            clean: true,
            second_login: None,
        }
    }
}

impl Scenario {
    /// Also create the default test user with a five-year lifetime
    pub fn with_default_test_user(mut self) -> Self {
        self.create_user = Some((Account::default_test_user(), DEFAULT_USER_LIFE_SECS));
        self
    }

    /// Steps that will run, in order
    pub fn steps(&self) -> Vec<Step> {
        let mut steps = vec![Step::AdminLogin];
        if self.check {
            steps.push(Step::Check);
        }
        if self.create_scope.is_some() {
            steps.push(Step::CreateScope);
        }
        if self.create_user.is_some() {
            steps.push(Step::CreateUser);
        }
        if self.clean {
            steps.push(Step::Clean);
        }
        if self.second_login.is_some() {
            steps.push(Step::SecondLogin);
        }
        steps
    }

    /// Run every selected step in order. Stops early only on fatal errors;
    /// "error" envelopes are recorded and the run continues.
    pub async fn run(&self, config: &Config) -> Result<Vec<StepOutcome>> {
        let mut outcomes = Vec::new();
        let mut admin = ApiClient::from_config(config)?;

        let response = admin
            .login(&self.admin.name, &self.admin.secret, &self.admin.scopes)
            .await
            .context("Admin login failed")?;
        record(&mut outcomes, Step::AdminLogin, response);

        if self.check {
            let response = admin.check().await.context("Session check failed")?;
            record(&mut outcomes, Step::Check, response);
        }

        if let Some(ref scope) = self.create_scope {
            let response = admin
                .create_scope(scope.as_str())
                .await
                .context("Scope creation failed")?;
            record(&mut outcomes, Step::CreateScope, response);
        }

        if let Some((ref user, life)) = self.create_user {
            let response = admin
                .create_user(&user.name, &user.secret, life, &user.scopes)
                .await
                .context("User creation failed")?;
            record(&mut outcomes, Step::CreateUser, response);
        }

        if self.clean {
            let response = admin.clean().await.context("Clean failed")?;
            record(&mut outcomes, Step::Clean, response);
        }

        if let Some(ref account) = self.second_login {
            let mut session = ApiClient::from_config(config)?;
            let response = session
                .login(&account.name, &account.secret, &account.scopes)
                .await
                .with_context(|| format!("Login as {} failed", account.name))?;
            record(&mut outcomes, Step::SecondLogin, response);
        }

        Ok(outcomes)
    }
}

fn record(outcomes: &mut Vec<StepOutcome>, step: Step, response: Envelope) {
    info!(step = %step, status = %response.status, "Step finished");
    outcomes.push(StepOutcome { step, response });
}
