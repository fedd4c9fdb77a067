use clap::builder::TypedValueParser as _;
use clap::Parser;
use dotenvy::dotenv;
use log::LevelFilter;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Navigation patterns the access gate runs for when `GATED_PATHS` is not set.
pub const DEFAULT_GATED_PATHS: &str =
    "/signin,/signup,/,/admin/:path*,/user/:path*,/profile/products/:path*,/profile/teams";

/// Auth pages a signed-out client may visit.
pub const DEFAULT_PUBLIC_PATHS: &str = "/signin,/signup,/forgot-password,/system/signin";

/// Role-restricted prefixes in `PREFIX=ROLE|ROLE` form.
pub const DEFAULT_RESTRICTED_PREFIXES: &str = "/admin=SUPER_ADMIN|ADMIN";

#[derive(Clone, Debug, PartialEq)]
pub enum RustEnv {
    Development,
    Production,
    Staging,
}

#[derive(Debug, PartialEq, Eq)]
pub struct RustEnvParseError;

impl FromStr for RustEnv {
    type Err = RustEnvParseError;
    fn from_str(level: &str) -> Result<RustEnv, Self::Err> {
        match level.to_lowercase().as_str() {
            "development" => Ok(RustEnv::Development),
            "production" => Ok(RustEnv::Production),
            "staging" => Ok(RustEnv::Staging),
            _ => Err(RustEnvParseError),
        }
    }
}

impl fmt::Display for RustEnv {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RustEnv::Development => write!(f, "development"),
            RustEnv::Production => write!(f, "production"),
            RustEnv::Staging => write!(f, "staging"),
        }
    }
}

#[derive(Clone, Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// A list of full CORS origin URLs that allowed to receive server responses.
    #[arg(
        long,
        env,
        value_delimiter = ',',
        use_value_delimiter = true,
        default_value = "http://localhost:3000,https://localhost:3000"
    )]
    pub allowed_origins: Vec<String>,

    /// The host interface to listen for incoming connections
    #[arg(short, long, env, default_value = "127.0.0.1")]
    pub interface: Option<String>,

    /// The host TCP port to listen for incoming connections
    #[arg(short, long, env, default_value_t = 4000)]
    pub port: u16,

    /// Set the log level verbosity threshold (level) to control what gets displayed on console output
    #[arg(
        short,
        long,
        env,
        default_value_t = LevelFilter::Info,
        value_parser = clap::builder::PossibleValuesParser::new(["OFF", "ERROR", "WARN", "INFO", "DEBUG", "TRACE"])
            .map(|s| s.parse::<LevelFilter>().unwrap()),
        )]
    pub log_level_filter: LevelFilter,

    /// Set the Rust runtime environment to use.
    #[arg(
    short,
    long,
    env,
    default_value_t = RustEnv::Development,
    value_parser = clap::builder::PossibleValuesParser::new([
        "DEVELOPMENT", "PRODUCTION", "STAGING",
        "development", "production", "staging"
    ])
        .map(|s| s.parse::<RustEnv>().unwrap()),
    )]
    pub runtime_env: RustEnv,

    /// Lifetime in seconds of the token and role cookies (default: 24 hours = 86400 seconds)
    #[arg(long, env, default_value_t = 86400)]
    pub session_expiry_seconds: u64,

    /// Directory holding the built page tree served behind the access gate
    #[arg(long, env, default_value = "./public")]
    pub static_dir: String,

    /// Where signed-out clients are sent
    #[arg(long, env, default_value = "/signin")]
    pub sign_in_path: String,

    /// Landing page for SUPER_ADMIN and ADMIN sessions
    #[arg(long, env, default_value = "/admin/dashboard")]
    pub admin_home_path: String,

    /// Landing page for USER sessions (the primary search page)
    #[arg(long, env, default_value = "/protein-search")]
    pub user_home_path: String,

    /// Exact paths reachable without a session. Signed-in clients are bounced off them.
    #[arg(
        long,
        env,
        value_delimiter = ',',
        use_value_delimiter = true,
        default_value = DEFAULT_PUBLIC_PATHS
    )]
    pub public_paths: Vec<String>,

    /// Role-restricted path prefixes, each as `PREFIX=ROLE|ROLE`
    #[arg(
        long,
        env,
        value_delimiter = ',',
        use_value_delimiter = true,
        default_value = DEFAULT_RESTRICTED_PREFIXES
    )]
    pub restricted_prefixes: Vec<String>,

    /// Navigation patterns the access gate runs for. `/x/:path*` (or `/x/*`) matches
    /// `/x` and everything below it. Anything else bypasses the gate.
    #[arg(
        long,
        env,
        value_delimiter = ',',
        use_value_delimiter = true,
        default_value = DEFAULT_GATED_PATHS
    )]
    pub gated_paths: Vec<String>,

    /// Shared secret the upstream API sends in `x-hook-secret` when announcing events.
    /// When unset, event hooks are accepted without a secret.
    #[arg(long, env)]
    event_hook_secret: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        // Defaults plus environment; process arguments are ignored.
        Config::parse_from(["portal_rs"])
    }
}

impl Config {
    pub fn new() -> Self {
        // Load .env file first
        dotenv().ok();
        // Then parse the command line parameters and flags
        Config::parse()
    }

    pub fn runtime_env(&self) -> RustEnv {
        self.runtime_env.clone()
    }

    pub fn is_production(&self) -> bool {
        self.runtime_env() == RustEnv::Production
    }

    /// Session cookie lifetime.
    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_expiry_seconds)
    }

    /// Returns the event hook secret, if configured.
    pub fn event_hook_secret(&self) -> Option<&str> {
        self.event_hook_secret.as_deref()
    }

    pub fn set_event_hook_secret(mut self, secret: String) -> Self {
        self.event_hook_secret = Some(secret);
        self
    }

    /// `interface:port` to bind the listener to.
    pub fn listen_address(&self) -> String {
        format!(
            "{}:{}",
            self.interface.as_deref().unwrap_or("127.0.0.1"),
            self.port
        )
    }
}
