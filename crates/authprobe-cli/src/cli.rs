//! Command-line definitions.

use clap::{Args, Parser, Subcommand};

use authprobe_core::{Account, Scenario, DEFAULT_USER_LIFE_SECS};

#[derive(Parser, Debug)]
#[command(name = "authprobe", version, about = "Exercise a token-based HTTP authentication service")]
pub struct Cli {
    /// Base URL of the service (overrides AUTHPROBE_URL and the config file)
    #[arg(long, global = true, value_name = "URL")]
    pub url: Option<String>,

    /// Per-request timeout in seconds (default: wait indefinitely)
    #[arg(long, global = true, value_name = "SECS")]
    pub timeout: Option<u64>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Log in and print the login response
    Login {
        #[arg(long)]
        user: String,
        /// Prompted for when omitted
        #[arg(long)]
        secret: Option<String>,
        /// Scope to request (repeatable)
        #[arg(long = "scope", value_name = "SCOPE")]
        scopes: Vec<String>,
    },

    /// Show who the session is authenticated as
    Check {
        #[command(flatten)]
        session: SessionArgs,
    },

    /// Define a new scope
    CreateScope {
        #[command(flatten)]
        session: SessionArgs,
        scope: String,
        /// Send SCOPE as raw JSON instead of a JSON string
        #[arg(long)]
        raw: bool,
    },

    /// Create a user account
    CreateUser {
        #[command(flatten)]
        session: SessionArgs,
        name: String,
        /// Prompted for when omitted
        #[arg(long)]
        secret: Option<String>,
        /// Account lifetime in seconds
        #[arg(long, default_value_t = DEFAULT_USER_LIFE_SECS)]
        life: u64,
        /// Scope to grant (repeatable)
        #[arg(long = "scope", value_name = "SCOPE")]
        scopes: Vec<String>,
    },

    /// Reset server-side caches and tokens
    Clean {
        #[command(flatten)]
        session: SessionArgs,
    },

    /// Query the plain-text health route of a server running test routes
    Health,

    /// Replay the admin workflow step by step
    Scenario(ScenarioArgs),
}

/// How an authenticated command obtains its bearer token.
#[derive(Args, Debug, Default)]
pub struct SessionArgs {
    /// Log in as this user before running the command
    #[arg(long, value_name = "USER", conflicts_with = "token")]
    pub login_user: Option<String>,

    /// Secret for --login-user (prompted for when omitted)
    #[arg(long, value_name = "SECRET", requires = "login_user")]
    pub login_secret: Option<String>,

    /// Scope to request at login (repeatable)
    #[arg(long = "login-scope", value_name = "SCOPE", requires = "login_user")]
    pub login_scopes: Vec<String>,

    /// Use an already issued bearer token
    #[arg(long, value_name = "TOKEN")]
    pub token: Option<String>,
}

#[derive(Args, Debug)]
pub struct ScenarioArgs {
    #[arg(long, default_value = "admin")]
    pub admin_user: String,

    #[arg(long, default_value = "adminadmin")]
    pub admin_secret: String,

    /// Scope requested by the admin login (repeatable)
    #[arg(long = "admin-scope", value_name = "SCOPE", default_values_t = vec!["authadmin".to_string()])]
    pub admin_scopes: Vec<String>,

    /// Skip the session check after login
    #[arg(long)]
    pub no_check: bool,

    /// Create this scope
    #[arg(long, value_name = "SCOPE")]
    pub scope: Option<String>,

    /// Create the test user (test/testpw, scope "user", five years)
    #[arg(long)]
    pub create_user: bool,

    /// Skip the final clean
    #[arg(long)]
    pub no_clean: bool,

    /// Log in as the test user on a fresh session at the end
    #[arg(long)]
    pub test_login: bool,
}

impl From<ScenarioArgs> for Scenario {
    fn from(args: ScenarioArgs) -> Self {
        let scenario = Scenario {
            admin: Account {
                name: args.admin_user,
                secret: args.admin_secret,
                scopes: args.admin_scopes,
            },
            check: !args.no_check,
            create_scope: args.scope,
            create_user: None,
            clean: !args.no_clean,
            second_login: args.test_login.then(Account::default_test_user),
        };
        if args.create_user {
            scenario.with_default_test_user()
        } else {
            scenario
        }
    }
}
