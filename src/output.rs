use std::io::{self, Write};

use serde::Serialize;

use crate::app::{InitializeResult, ProjectList, VerifyResult};
use crate::lifecycle::LoadSummary;

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_load(result: &LoadSummary) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_projects(result: &ProjectList) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_verify(result: &VerifyResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_initialize(result: &InitializeResult) -> io::Result<()> {
        Self::print_json(result)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}
