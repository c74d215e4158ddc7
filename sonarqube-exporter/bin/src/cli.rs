use std::{
    io::{self, Write},
    net::SocketAddr,
    path::PathBuf,
};

use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use snafu::ResultExt;

use crate::{command::run_server, config::Config, error, shadow};

#[derive(Debug, Parser)]
#[command(author,
    version,
    long_version = shadow::CLAP_LONG_VERSION,
    about,
    long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[clap(
        long = "config",
        short = 'c',
        env = "SONARQUBE_EXPORTER_CONFIG_FILE_PATH",
        global = true,
        help = "Specify a configuration file"
    )]
    config_file_path: Option<PathBuf>,

    #[command(flatten)]
    overrides: ConfigOverrides,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    #[clap(about = "Print version information")]
    Version,

    #[clap(about = "Output shell completion code for the specified shell (bash, zsh, fish)")]
    Completion { shell: Shell },

    #[clap(about = "Output default configuration")]
    DefaultConfig,

    #[clap(about = "Run server")]
    #[command(visible_alias = "run")]
    Server,
}

/// Settings given on the command line take precedence over the file.
#[derive(Debug, Default, Args)]
pub struct ConfigOverrides {
    #[clap(
        long = "sonarqube-url",
        env = "SONARQUBE_EXPORTER_SONARQUBE_URL",
        global = true,
        help = "Base URL of the SonarQube instance"
    )]
    sonarqube_url: Option<String>,

    #[clap(
        long = "sonarqube-username",
        env = "SONARQUBE_EXPORTER_SONARQUBE_USERNAME",
        global = true,
        help = "User name for HTTP basic authentication"
    )]
    sonarqube_username: Option<String>,

    #[clap(
        long = "sonarqube-password",
        env = "SONARQUBE_EXPORTER_SONARQUBE_PASSWORD",
        global = true,
        hide_env_values = true,
        help = "Password for HTTP basic authentication"
    )]
    sonarqube_password: Option<String>,

    #[clap(
        long = "project-filter",
        env = "SONARQUBE_EXPORTER_PROJECT_FILTER",
        global = true,
        help = "Regular expression selecting the project keys to export"
    )]
    project_filter: Option<String>,

    #[clap(
        long = "listen-address",
        env = "SONARQUBE_EXPORTER_LISTEN_ADDRESS",
        global = true,
        help = "Address on which to expose metrics"
    )]
    listen_address: Option<SocketAddr>,

    #[clap(
        long = "telemetry-path",
        env = "SONARQUBE_EXPORTER_TELEMETRY_PATH",
        global = true,
        help = "Path under which to expose metrics"
    )]
    telemetry_path: Option<String>,

    #[clap(
        long = "log-level",
        env = "SONARQUBE_EXPORTER_LOG_LEVEL",
        global = true,
        help = "Log filter directives, e.g. `debug` or `info,sonarqube_exporter_server=debug`"
    )]
    log_level: Option<String>,
}

impl ConfigOverrides {
    pub fn apply(self, config: &mut Config) {
        let Self {
            sonarqube_url,
            sonarqube_username,
            sonarqube_password,
            project_filter,
            listen_address,
            telemetry_path,
            log_level,
        } = self;

        if let Some(url) = sonarqube_url {
            config.sonarqube.url = url;
        }
        if let Some(username) = sonarqube_username {
            config.sonarqube.username = username;
        }
        if let Some(password) = sonarqube_password {
            config.sonarqube.password = password;
        }
        if let Some(project_filter) = project_filter {
            config.sonarqube.project_filter = project_filter;
        }
        if let Some(listen_address) = listen_address {
            config.metrics.host = listen_address.ip();
            config.metrics.port = listen_address.port();
        }
        if let Some(telemetry_path) = telemetry_path {
            config.metrics.telemetry_path = telemetry_path;
        }
        if let Some(log_level) = log_level {
            config.log.override_filters(log_level);
        }
    }
}

impl Cli {
    pub fn run(self) -> Result<(), Box<error::Error>> {
        match self.command {
            Command::Version => {
                io::stdout()
                    .write_all(Self::command().render_long_version().as_bytes())
                    .context(error::WriteStdoutSnafu)?;
            }
            Command::Completion { shell } => {
                let mut command = Self::command();
                let bin_name = command.get_name().to_string();
                clap_complete::generate(shell, &mut command, bin_name, &mut io::stdout());
            }
            Command::DefaultConfig => {
                let config_text = serde_yaml::to_string(&Config::default())
                    .context(error::SerializeConfigSnafu)?;
                io::stdout().write_all(config_text.as_bytes()).context(error::WriteStdoutSnafu)?;
            }
            Command::Server => {
                let config = self.load_config()?;
                run_server(config)?;
            }
        }

        Ok(())
    }

    #[allow(clippy::result_large_err)]
    fn load_config(self) -> Result<Config, error::Error> {
        let mut config = match self.config_file_path {
            Some(ref path) => Config::load(path)?,
            None => Config::search()?,
        };
        self.overrides.apply(&mut config);
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("sonarqube-exporter").chain(args.iter().copied()))
            .unwrap()
    }

    #[test]
    fn test_verify_command() { Cli::command().debug_assert(); }

    #[test]
    fn test_run_is_an_alias_of_server() {
        assert!(matches!(parse(&["run"]).command, Command::Server));
        assert!(matches!(parse(&["server"]).command, Command::Server));
    }

    #[test]
    fn test_overrides_take_precedence() {
        let cli = parse(&[
            "server",
            "--sonarqube-url",
            "https://sonar.example.com",
            "--sonarqube-username",
            "admin",
            "--sonarqube-password",
            "secret",
            "--project-filter",
            "^team-a:",
            "--listen-address",
            "127.0.0.1:9000",
            "--telemetry-path",
            "/sonar",
            "--log-level",
            "debug",
        ]);

        let mut config = Config::default();
        cli.overrides.apply(&mut config);

        assert_eq!(config.sonarqube.url, "https://sonar.example.com");
        assert_eq!(config.sonarqube.username, "admin");
        assert_eq!(config.sonarqube.password, "secret");
        assert_eq!(config.sonarqube.project_filter, "^team-a:");
        assert_eq!(
            config.metrics.socket_address(),
            "127.0.0.1:9000".parse::<SocketAddr>().unwrap()
        );
        assert_eq!(config.metrics.telemetry_path, "/sonar");
        assert_eq!(config.log.log_filters, "debug");
    }

    #[test]
    fn test_absent_overrides_keep_configuration() {
        let mut config = Config::default();
        config.sonarqube.project_filter = "^keep$".to_string();

        ConfigOverrides::default().apply(&mut config);

        assert_eq!(config.sonarqube.project_filter, "^keep$");
        assert_eq!(config.metrics.telemetry_path, "/metrics");
    }

    #[test]
    fn test_reject_invalid_listen_address() {
        let result = Cli::try_parse_from(["sonarqube-exporter", "server", "--listen-address", ":"]);
        assert!(result.is_err());
    }
}
