// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2025-present Datadog, Inc.

use std::ffi::OsString;
use std::path::PathBuf;

use clap::Parser;

use crate::config::{self, Config};

#[derive(Parser, Debug)]
#[command(name = "find-roots")]
#[command(version)]
#[command(about = "Trace the garbage collector roots of the store and serve them over a Unix socket", long_about = None)]
pub struct Args {
    /// Log every path considered to stderr
    #[arg(short, long)]
    pub verbose: bool,

    /// Path of the Unix socket to listen on [default: <state dir>/gc-socket/socket]
    #[arg(short = 'l', long, alias = "socket_path", value_name = "PATH")]
    pub socket_path: Option<PathBuf>,

    /// Store directory
    #[arg(short = 's', long, alias = "store_dir", value_name = "DIR", default_value = config::DEFAULT_STORE_DIR)]
    pub store_dir: PathBuf,

    /// State directory holding the `profiles` and `gcroots` roots
    #[arg(short = 'd', long, alias = "state_dir", value_name = "DIR", default_value = config::DEFAULT_STATE_DIR)]
    pub state_dir: PathBuf,

    /// Mount point of the process-information filesystem
    #[arg(long, env = "HOST_PROC", value_name = "DIR", default_value = config::DEFAULT_PROC_ROOT)]
    pub proc_dir: PathBuf,
}

impl Args {
    /// Parses `args`, exiting on invalid input.
    ///
    /// Usage errors go to stderr with exit status 1. `--help` and `--version`
    /// go to stdout with exit status 0.
    pub fn parse_or_exit<I, T>(args: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        match Self::try_parse_from(args) {
            Ok(args) => args,
            Err(err) => {
                let code = if err.use_stderr() { 1 } else { 0 };
                let _ = err.print();
                std::process::exit(code);
            }
        }
    }
}

impl From<Args> for Config {
    fn from(args: Args) -> Self {
        let socket_path = args
            .socket_path
            .unwrap_or_else(|| config::default_socket_path(&args.state_dir));

        Config {
            store_dir: args.store_dir,
            state_dir: args.state_dir,
            socket_path,
            proc_root: args.proc_dir,
            verbose: args.verbose,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    fn parse(args: &[&str]) -> Result<Args, clap::Error> {
        Args::try_parse_from(std::iter::once("find-roots").chain(args.iter().copied()))
    }

    #[test]
    fn test_no_arguments_uses_defaults() {
        let config = Config::from(parse(&[]).unwrap());

        assert_eq!(config.store_dir, PathBuf::from("/nix/store"));
        assert_eq!(config.state_dir, PathBuf::from("/nix/var/nix"));
        assert_eq!(
            config.socket_path,
            PathBuf::from("/nix/var/nix/gc-socket/socket")
        );
        assert!(!config.verbose);
    }

    #[test]
    fn test_short_flags() {
        let config = Config::from(
            parse(&[
                "-v",
                "-s",
                "/tmp/store",
                "-d",
                "/tmp/state",
                "-l",
                "/tmp/roots.sock",
            ])
            .unwrap(),
        );

        assert!(config.verbose);
        assert_eq!(config.store_dir, PathBuf::from("/tmp/store"));
        assert_eq!(config.state_dir, PathBuf::from("/tmp/state"));
        assert_eq!(config.socket_path, PathBuf::from("/tmp/roots.sock"));
    }

    #[test]
    fn test_underscore_aliases() {
        let config = Config::from(
            parse(&[
                "--verbose",
                "--store_dir=/tmp/store",
                "--state_dir",
                "/tmp/state",
                "--socket_path",
                "/tmp/roots.sock",
            ])
            .unwrap(),
        );

        assert!(config.verbose);
        assert_eq!(config.store_dir, PathBuf::from("/tmp/store"));
        assert_eq!(config.state_dir, PathBuf::from("/tmp/state"));
        assert_eq!(config.socket_path, PathBuf::from("/tmp/roots.sock"));
    }

    #[test]
    fn test_socket_defaults_under_state_dir() {
        let config = Config::from(parse(&["--state-dir", "/srv/state"]).unwrap());
        assert_eq!(
            config.socket_path,
            PathBuf::from("/srv/state/gc-socket/socket")
        );
    }

    #[test]
    fn test_unknown_flag_is_rejected() {
        let err = parse(&["--frobnicate"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownArgument);
        assert!(err.use_stderr());
    }

    #[test]
    fn test_positional_arguments_are_rejected() {
        assert!(parse(&["serve"]).is_err());
    }
}
