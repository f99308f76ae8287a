//! Run command - launch a package

use crate::archive::{self, PACKAGE_EXTENSION};
use crate::cli::args::RunArgs;
use crate::config::Config;
use crate::error::{LauncherError, LauncherResult};
use crate::launcher::{LaunchSettings, Launcher};
use crate::runtime::{PythonRuntime, ScriptRuntime};
use crate::ui::{self, UiContext};
use std::env;
use std::path::PathBuf;
use tracing::debug;

/// Execute the run command
pub async fn execute(args: RunArgs, config: &Config) -> LauncherResult<()> {
    let ctx = UiContext::detect();
    ui::intro(&ctx, "pyp");

    let package = resolve_package(args, config, &ctx).await?;
    debug!("Package: {}", package.display());

    let settings = LaunchSettings::from_config(config)?;
    let runtime = PythonRuntime::from_config(config);
    debug!("Using runtime: {} ({})", runtime.runtime_name(), runtime.interpreter());

    let launcher = Launcher::new(settings, Box::new(runtime)).with_ui(ctx.clone());
    let report = launcher.launch(&package).await?;

    if let Some(ref dir) = report.cache_dir {
        ui::remark(&ctx, &format!("Side-file cache: {}", dir.display()));
    }

    if report.outcome.is_success() {
        ui::outro_success(&ctx, "Done");
    } else {
        ui::outro_warn(&ctx, &format!("Script {}", report.outcome));
    }
    Ok(())
}

/// Use the given path, or let the user pick one
async fn resolve_package(
    args: RunArgs,
    config: &Config,
    ctx: &UiContext,
) -> LauncherResult<PathBuf> {
    if let Some(path) = args.package {
        if !path.exists() {
            return Err(LauncherError::PathNotFound(path));
        }
        if path.is_dir() {
            return Err(LauncherError::NotAPackage(path));
        }
        if !archive::has_extension(&path, PACKAGE_EXTENSION) {
            debug!("{} lacks the .{} extension", path.display(), PACKAGE_EXTENSION);
        }
        return Ok(path);
    }

    let start = env::current_dir()
        .map_err(|e| LauncherError::io("getting current directory", e))?;
    ui::browse(ctx, &start, config.launcher.page_size)
        .await?
        .ok_or(LauncherError::SelectionCancelled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn missing_package_is_path_not_found() {
        let temp = TempDir::new().unwrap();
        let args = RunArgs {
            package: Some(temp.path().join("absent.pyp")),
        };

        let err = resolve_package(args, &Config::default(), &UiContext::non_interactive())
            .await
            .unwrap_err();
        assert!(matches!(err, LauncherError::PathNotFound(_)));
    }

    #[tokio::test]
    async fn directory_is_not_a_package() {
        let temp = TempDir::new().unwrap();
        let args = RunArgs {
            package: Some(temp.path().to_path_buf()),
        };

        let err = resolve_package(args, &Config::default(), &UiContext::non_interactive())
            .await
            .unwrap_err();
        assert!(matches!(err, LauncherError::NotAPackage(_)));
    }

    #[tokio::test]
    async fn no_package_without_terminal_cancels() {
        let err = resolve_package(
            RunArgs::default(),
            &Config::default(),
            &UiContext::non_interactive(),
        )
        .await
        .unwrap_err();
        assert!(err.is_cancellation());
    }
}
