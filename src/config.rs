//! Checker configuration from the command line and the environment.
//!
//! Connection flags come from [`CliArgs`] (each with an environment
//! fallback; a `.env` file is loaded first via `dotenvy`). Poll budgets
//! and the connect timeout are tuned through `CHECKER_*` environment
//! variables. The result is one immutable [`CheckerConfig`], built once at
//! startup and passed down by reference.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Parser};

use crate::domain::PollPolicy;
use crate::error::CheckerError;
use crate::service::verifier::{DEFAULT_TARGET_VERSION, VerifierPlan};

/// Log file used when `--log-file` is not given.
pub const DEFAULT_LOG_FILE: &str = "upgrade_post_checker.log";

/// Connect timeout used when `CHECKER_CONNECT_TIMEOUT_SECS` is not set.
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Command-line options.
///
/// `-h` is taken by `--host`, so help lives on `-I/--help`.
#[derive(Debug, Parser)]
#[command(
    name = "upgrade-post-checker",
    version,
    about = "Verifies an upgraded OceanBase cluster and re-enables DDL, rebalance, rereplication and major freeze",
    disable_help_flag = true,
    disable_version_flag = true,
    after_help = "Maybe you want to run cmd like that:\n  upgrade-post-checker -h 127.0.0.1 -P 3306 -u admin -p admin"
)]
pub struct CliArgs {
    /// Display this help and exit.
    #[arg(short = 'I', long = "help", action = ArgAction::Help)]
    help: Option<bool>,

    /// Output version information and exit.
    #[arg(short = 'V', long = "version", action = ArgAction::Version)]
    version: Option<bool>,

    /// Connect to host.
    #[arg(short = 'h', long, env = "OB_HOST")]
    pub host: String,

    /// Port number to use for connection.
    #[arg(short = 'P', long, env = "OB_PORT")]
    pub port: u16,

    /// User for login.
    #[arg(short = 'u', long, env = "OB_USER")]
    pub user: String,

    /// Password to use when connecting to server. Empty when not given.
    #[arg(short = 'p', long, env = "OB_PASSWORD", default_value = "", hide_env_values = true)]
    pub password: String,

    /// Modules to run, separated by ",". Accepted for compatibility; every
    /// check always runs.
    #[arg(short = 'm', long, default_value = "all", value_delimiter = ',')]
    pub module: Vec<String>,

    /// Log file path. Truncated on start.
    #[arg(short = 'l', long = "log-file", default_value = DEFAULT_LOG_FILE)]
    pub log_file: PathBuf,

    /// Expected min_observer_version after the upgrade.
    #[arg(short = 't', long, env = "OB_TARGET_VERSION", default_value = DEFAULT_TARGET_VERSION)]
    pub target_version: String,
}

/// Where and how to reach the cluster coordinator.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionSettings {
    /// Coordinator host.
    pub host: String,
    /// Coordinator MySQL-protocol port.
    pub port: u16,
    /// Login user.
    pub user: String,
    /// Login password, possibly empty.
    pub password: String,
    /// Upper bound on the connection handshake.
    pub connect_timeout: Duration,
}

impl fmt::Debug for ConnectionSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("connect_timeout", &self.connect_timeout)
            .finish()
    }
}

/// Top-level checker configuration.
#[derive(Debug, Clone)]
pub struct CheckerConfig {
    /// Coordinator connection.
    pub connection: ConnectionSettings,
    /// Modules named on the command line. Logged only.
    pub modules: Vec<String>,
    /// Log file path.
    pub log_file: PathBuf,
    /// Target version and poll budgets.
    pub plan: VerifierPlan,
}

impl CheckerConfig {
    /// Loads `.env`, parses the process arguments and reads the `CHECKER_*`
    /// environment variables.
    ///
    /// `--help`, `--version` and argument errors are handled by `clap`,
    /// which prints and exits the process before this returns.
    ///
    /// # Errors
    ///
    /// Returns [`CheckerError::InvalidPolicy`] if an environment override
    /// yields a zero interval or zero attempts.
    pub fn load() -> Result<Self, CheckerError> {
        dotenvy::dotenv().ok();
        Self::from_args(CliArgs::parse())
    }

    /// Builds the configuration from parsed arguments and the process
    /// environment.
    ///
    /// # Errors
    ///
    /// See [`CheckerConfig::load`].
    pub fn from_args(args: CliArgs) -> Result<Self, CheckerError> {
        Self::from_args_with(args, |key| std::env::var(key).ok())
    }

    /// Builds the configuration, resolving `CHECKER_*` keys through `lookup`.
    ///
    /// # Errors
    ///
    /// See [`CheckerConfig::load`].
    pub fn from_args_with(
        args: CliArgs,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, CheckerError> {
        let connect_timeout = Duration::from_secs(parse_env(
            &lookup,
            "CHECKER_CONNECT_TIMEOUT_SECS",
            DEFAULT_CONNECT_TIMEOUT_SECS,
        ));

        let plan = VerifierPlan {
            target_version: args.target_version,
            version_policy: policy_from_env(&lookup, "VERSION", PollPolicy::version_check())?,
            inspection_policy: policy_from_env(
                &lookup,
                "INSPECTION",
                PollPolicy::inspection_check(),
            )?,
            sync_policy: policy_from_env(&lookup, "SYNC", PollPolicy::parameter_sync())?,
        };

        Ok(Self {
            connection: ConnectionSettings {
                host: args.host,
                port: args.port,
                user: args.user,
                password: args.password,
                connect_timeout,
            },
            modules: args.module,
            log_file: args.log_file,
            plan,
        })
    }
}

/// Reads `CHECKER_<name>_INTERVAL_SECS` and `CHECKER_<name>_MAX_ATTEMPTS`
/// over `default`.
fn policy_from_env(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: PollPolicy,
) -> Result<PollPolicy, CheckerError> {
    let interval = parse_env(
        lookup,
        &format!("CHECKER_{name}_INTERVAL_SECS"),
        default.interval().as_secs(),
    );
    let max_attempts = parse_env(
        lookup,
        &format!("CHECKER_{name}_MAX_ATTEMPTS"),
        default.max_attempts(),
    );
    PollPolicy::new(Duration::from_secs(interval), max_attempts)
}

/// Parses a variable as `T`, returning `default` on missing or invalid
/// values.
fn parse_env<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> T {
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}
