//! A git subcommand to check out a recent commit whose Evergreen builds meet your criteria.
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

use camino::Utf8PathBuf;
use goodbase_lib::{Host, Result, run};
use ohno::{IntoAppError, app_err};
use std::io::Write;
use std::io::{stderr, stdout};

/// Default host that talks to the real terminal and process.
#[derive(Debug, Clone, Default)]
pub struct RealHost;

#[cfg_attr(coverage_nightly, coverage(off))]
impl Host for RealHost {
    fn output(&mut self) -> impl Write {
        stdout()
    }

    fn error(&mut self) -> impl Write {
        stderr()
    }

    fn exit(&mut self, code: i32) {
        std::process::exit(code);
    }

    fn working_dir(&self) -> Result<Utf8PathBuf> {
        let dir = std::env::current_dir().into_app_err("determining the current directory")?;
        Utf8PathBuf::from_path_buf(dir).map_err(|dir| app_err!("current directory '{}' is not valid UTF-8", dir.display()))
    }
}

#[tokio::main]
#[cfg_attr(coverage_nightly, coverage(off))]
async fn main() -> Result<(), ohno::AppError> {
    run(&mut RealHost, std::env::args()).await
}
