use std::{io, io::Write, path::PathBuf};

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use snafu::ResultExt;

use crate::{
    command::{run_scrape, run_server},
    config::Config,
    error, shadow,
};

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
        global = true,
        env = "OPENVPNAS_EXPORTER_CONFIG_FILE_PATH",
        help = "Specify a configuration file"
    )]
    config_file_path: Option<PathBuf>,

    #[clap(
        long = "xmlrpc-path",
        global = true,
        env = "OPENVPNAS_EXPORTER_XMLRPC_PATH",
        help = "Path of the OpenVPN AS XML-RPC Unix socket"
    )]
    xmlrpc_path: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    #[clap(about = "Print version information")]
    Version,

    #[clap(about = "Output shell completion code for the specified shell (bash, zsh, fish)")]
    Completion { shell: Shell },

    #[clap(about = "Output default configuration")]
    DefaultConfig,

    #[clap(about = "Run exporter")]
    #[command(visible_alias = "server")]
    Run,

    #[clap(about = "Query the XML-RPC endpoint once and print the metrics")]
    Scrape,
}

impl Cli {
    pub fn run(self) -> Result<(), error::Error> {
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
                let config_text =
                    serde_yaml::to_string(&Config::default()).context(error::SerializeConfigSnafu)?;
                io::stdout().write_all(config_text.as_bytes()).context(error::WriteStdoutSnafu)?;
            }
            Command::Run => {
                let config = self.load_config()?;
                run_server(config)?;
            }
            Command::Scrape => {
                let config = self.load_config()?;
                run_scrape(config)?;
            }
        }

        Ok(())
    }

    // An explicitly given file must exist; the default location is optional.
    fn load_config(&self) -> Result<Config, error::Error> {
        let mut config = match self.config_file_path {
            Some(ref path) => Config::load(path)?,
            None => Config::load_or_default(Config::default_path())?,
        };

        if let Some(ref xmlrpc_path) = self.xmlrpc_path {
            config.xmlrpc.socket_path.clone_from(xmlrpc_path);
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use clap::{CommandFactory, Parser};

    use crate::cli::{Cli, Command};

    #[test]
    fn test_command_definition() { Cli::command().debug_assert(); }

    #[test]
    fn test_server_alias() {
        let cli = Cli::parse_from(["openvpnas-exporter", "server"]);
        assert!(matches!(cli.command, Command::Run));
    }

    #[test]
    fn test_xmlrpc_path_overrides_config() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("openvpnas-exporter.yaml");
        std::fs::write(&config_path, "xmlrpc:\n  socket_path: /tmp/from-config.sock\n").unwrap();

        let cli = Cli::parse_from([
            "openvpnas-exporter",
            "scrape",
            "--config",
            config_path.to_str().unwrap(),
            "--xmlrpc-path",
            "/run/sagent.sock",
        ]);
        let config = cli.load_config().unwrap();

        assert_eq!(config.xmlrpc.socket_path, Path::new("/run/sagent.sock"));
    }

    #[test]
    fn test_explicit_config_file_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("absent.yaml");

        let cli = Cli::parse_from([
            "openvpnas-exporter",
            "run",
            "--config",
            config_path.to_str().unwrap(),
        ]);
        assert!(cli.load_config().is_err());
    }
}
