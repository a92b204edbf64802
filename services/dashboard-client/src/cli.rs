//! Command-line parsing
//!
//! Deliberately small: one optional `--config <path>` flag anywhere on the
//! line, then a subcommand with positional arguments.

use std::path::PathBuf;

use crate::error::{Error, Result};

const DEFAULT_PAGE: u32 = 1;
const DEFAULT_PAGE_SIZE: u32 = 200;

pub const USAGE: &str = "\
usage: dashboard-cli [--config <path>] <command>

commands:
  login [username]
  signup <username> <email>
  logout
  upload <csv-file>
  datasets
  summary <dataset-id>
  table <dataset-id> [page] [page-size]
  report <dataset-id> <dest>
  clean-csv <dataset-id> <dest>";

#[derive(Debug, PartialEq, Eq)]
pub enum Command {
    Login { username: Option<String> },
    Signup { username: String, email: String },
    Logout,
    Upload { file: PathBuf },
    Datasets,
    Summary { dataset_id: String },
    Table { dataset_id: String, page: u32, page_size: u32 },
    Report { dataset_id: String, dest: PathBuf },
    CleanCsv { dataset_id: String, dest: PathBuf },
}

#[derive(Debug, PartialEq, Eq)]
pub struct Args {
    pub config: Option<String>,
    pub command: Command,
}

impl Args {
    /// Parse process arguments, excluding the program name.
    pub fn parse<I>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = String>,
    {
        let mut config = None;
        let mut positional = Vec::new();
        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            if arg == "--config" {
                config = Some(args.next().ok_or_else(|| missing("--config <path>"))?);
            } else {
                positional.push(arg);
            }
        }

        let mut positional = positional.into_iter();
        let name = positional.next().ok_or_else(|| missing("command"))?;
        let mut next = |what: &str| positional.next().ok_or_else(|| missing(what));

        let command = match name.as_str() {
            "login" => Command::Login {
                username: next("username").ok(),
            },
            "signup" => Command::Signup {
                username: next("username")?,
                email: next("email")?,
            },
            "logout" => Command::Logout,
            "upload" => Command::Upload {
                file: next("csv-file")?.into(),
            },
            "datasets" => Command::Datasets,
            "summary" => Command::Summary {
                dataset_id: next("dataset-id")?,
            },
            "table" => Command::Table {
                dataset_id: next("dataset-id")?,
                page: number(next("page").ok(), "page", DEFAULT_PAGE)?,
                page_size: number(next("page-size").ok(), "page-size", DEFAULT_PAGE_SIZE)?,
            },
            "report" => Command::Report {
                dataset_id: next("dataset-id")?,
                dest: next("dest")?.into(),
            },
            "clean-csv" => Command::CleanCsv {
                dataset_id: next("dataset-id")?,
                dest: next("dest")?.into(),
            },
            other => {
                return Err(Error::MissingInput(format!("unknown command: {other}")));
            }
        };

        Ok(Self { config, command })
    }
}

fn missing(what: &str) -> Error {
    Error::MissingInput(what.to_string())
}

fn number(value: Option<String>, name: &str, default: u32) -> Result<u32> {
    match value {
        None => Ok(default),
        Some(v) => match v.parse() {
            Ok(n) if n > 0 => Ok(n),
            _ => Err(Error::MissingInput(format!(
                "{name} must be a positive integer, got: {v}"
            ))),
        },
    }
}
