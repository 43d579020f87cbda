//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! Every input is a long flag with an environment-variable fallback named
//! after the CI step input (`package_name`, `app_path`, ...). Boolean inputs
//! take `true`/`false` (or `yes`/`no`, `1`/`0`); a bare flag means `true`.

use clap::builder::BoolishValueParser;
use clap::{ArgAction, Parser};

use crate::core::config::RawInputs;

/// play-deploy - Publish APKs and App Bundles to Google Play
#[derive(Parser, Debug)]
#[command(name = "play-deploy")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Service account key: a local path, file://, http:// or https:// URL
    #[arg(long, env = "service_account_json_key_path", default_value = "", hide_env_values = true)]
    pub service_account_json_key_path: String,

    /// Application id, e.g. com.example.app
    #[arg(long, env = "package_name", default_value = "")]
    pub package_name: String,

    /// APK or App Bundle paths, separated by `|` or newlines
    #[arg(long, env = "app_path", default_value = "")]
    pub app_path: String,

    /// Deprecated: APK paths, use --app-path
    #[arg(long, env = "apk_path")]
    pub apk_path: Option<String>,

    /// Expansion files, `main:<path>` or `patch:<path>`, one per app, separated by `|`
    #[arg(long, env = "expansionfile_path", default_value = "")]
    pub expansionfile_path: String,

    /// Deobfuscation mapping files: one for all apps, or one per app
    #[arg(long, env = "mapping_file", default_value = "")]
    pub mapping_file: String,

    /// Native debug symbol archives: one for all apps, or one per app
    #[arg(long, env = "native_symbols_file", default_value = "")]
    pub native_symbols_file: String,

    /// Target track
    #[arg(long, env = "track", default_value = "internal")]
    pub track: String,

    /// Staged rollout fraction, 0 < f < 1; 0 or empty means full rollout
    #[arg(long, env = "user_fraction")]
    pub user_fraction: Option<String>,

    /// Release status: draft, inProgress, halted or completed
    #[arg(long, env = "status")]
    pub status: Option<String>,

    /// Release name
    #[arg(long, env = "release_name")]
    pub release_name: Option<String>,

    /// In-app update priority, 0 to 5
    #[arg(long, env = "update_priority")]
    pub update_priority: Option<String>,

    /// Directory with whatsnew-<locale> release notes files
    #[arg(long, env = "whatsnews_dir")]
    pub whatsnews_dir: Option<String>,

    /// Replace version codes that would shadow the new ones
    #[arg(long, env = "untrack_blocking_versions", action = ArgAction::Set, num_args = 0..=1,
          default_value = "false", default_missing_value = "true",
          value_parser = BoolishValueParser::new())]
    pub untrack_blocking_versions: bool,

    /// Commit without sending for review when review submission is refused
    #[arg(long, env = "retry_without_sending_to_review", action = ArgAction::Set, num_args = 0..=1,
          default_value = "false", default_missing_value = "true",
          value_parser = BoolishValueParser::new())]
    pub retry_without_sending_to_review: bool,

    /// Acknowledge the app bundle installation size warning
    #[arg(long, env = "ack_bundle_installation_warning", action = ArgAction::Set, num_args = 0..=1,
          default_value = "false", default_missing_value = "true",
          value_parser = BoolishValueParser::new())]
    pub ack_bundle_installation_warning: bool,

    /// Validate the edit instead of committing it
    #[arg(long, env = "dry_run", action = ArgAction::Set, num_args = 0..=1,
          default_value = "false", default_missing_value = "true",
          value_parser = BoolishValueParser::new())]
    pub dry_run: bool,

    /// Enable debug logging
    #[arg(long, env = "verbose_log", action = ArgAction::Set, num_args = 0..=1,
          default_value = "false", default_missing_value = "true",
          value_parser = BoolishValueParser::new())]
    pub verbose_log: bool,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }

    /// Hand the inputs to configuration validation.
    pub fn into_raw_inputs(self) -> RawInputs {
        RawInputs {
            service_account_json_key_path: self.service_account_json_key_path,
            package_name: self.package_name,
            app_path: self.app_path,
            apk_path: self.apk_path,
            expansionfile_path: self.expansionfile_path,
            mapping_file: self.mapping_file,
            native_symbols_file: self.native_symbols_file,
            track: self.track,
            user_fraction: self.user_fraction,
            status: self.status,
            release_name: self.release_name,
            update_priority: self.update_priority,
            whatsnews_dir: self.whatsnews_dir,
            untrack_blocking_versions: self.untrack_blocking_versions,
            retry_without_sending_to_review: self.retry_without_sending_to_review,
            ack_bundle_installation_warning: self.ack_bundle_installation_warning,
            dry_run: self.dry_run,
            verbose_log: self.verbose_log,
        }
    }
}
