//! Command execution.

mod clean;
mod pack;

use crate::bundler::{Settings, SettingsBuilder};
use crate::cli::{Args, Command, OutputManager};
use crate::env::EnvOverlay;
use crate::error::Result;
use crate::model::{Crate, Package};

use clean::execute_clean;
use pack::execute_pack;

/// Execute the command named by `args` and return the process exit code.
pub fn execute_command(args: Args) -> Result<i32> {
    let output = OutputManager::new(args.verbose);

    if let Err(validation_error) = args.validate() {
        output.error(&format!("Invalid arguments: {}", validation_error));
        return Ok(1);
    }

    let result = match &args.command {
        Command::Pack(pack) => execute_pack(&args, pack, &output),
        Command::Clean(clean) => execute_clean(&args, clean, &output),
    };

    match result {
        Ok(code) => Ok(code),
        Err(e) => {
            output.error(&format!("Command '{}' failed: {}", args.command.name(), e));
            Ok(1)
        }
    }
}

/// Settings shared by both commands.
fn settings_builder(args: &Args, env: EnvOverlay) -> SettingsBuilder {
    let mut builder = SettingsBuilder::new().project_dir(args.project_dir()).env(env);
    if let Some(out) = &args.out {
        builder = builder.out_dir(out);
    }
    builder
}

/// Loads the project manifest and every crate it lists.
fn load_project(settings: &Settings) -> Result<(Package, Vec<Crate>)> {
    let package = Package::load(settings.project_dir(), settings.env())?;
    let env = settings
        .env()
        .with(crate::env::BUILD_VERSION, package.version.as_str());
    let crates = package
        .crates
        .iter()
        .map(|location| Crate::load(settings.project_dir(), location, &env))
        .collect::<Result<Vec<_>>>()?;
    Ok((package, crates))
}
