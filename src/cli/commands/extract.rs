use std::fs;

use anyhow::{Context, Result};
use glob::Pattern;
use tracing::info;

use super::super::args::ExtractCommand;
use super::super::report::render;
use super::{CommandResult, CommandSummary, ExtractSummary, OutputFormat};
use crate::core::{ExtractContext, ReadFilter};

pub fn extract(cmd: ExtractCommand) -> Result<CommandResult> {
    let ctx = ExtractContext::new(&cmd.common)?;
    let filter = read_filter(&cmd, &ctx)?;

    let extraction = ctx.run()?;
    let report = extraction.report.filtered(&filter);

    let format = if cmd.json {
        OutputFormat::Json
    } else if cmd.locations {
        OutputFormat::Locations
    } else {
        OutputFormat::Flags
    };
    let rendered = render(&report, format, &ctx.root_dir)?;

    if let Some(path) = &cmd.output {
        fs::write(path, &rendered)
            .with_context(|| format!("Failed to write report: {}", path.display()))?;
        info!(path = %path.display(), "wrote report");
    }

    Ok(CommandResult {
        summary: CommandSummary::Extract(ExtractSummary {
            report,
            format,
            rendered,
            output: cmd.output,
            files_analyzed: extraction.files_analyzed,
        }),
        diagnostics: extraction.diagnostics,
        root_dir: ctx.root_dir,
        strict: cmd.strict,
    })
}

/// Build the output filter. `--path` globs are relative to the source root.
fn read_filter(cmd: &ExtractCommand, ctx: &ExtractContext) -> Result<ReadFilter> {
    let path = cmd
        .path
        .as_deref()
        .map(|glob| {
            let root = Pattern::escape(&ctx.root_dir.to_string_lossy());
            Pattern::new(&format!("{}/{}", root, glob.trim_start_matches("./")))
                .with_context(|| format!("Invalid glob pattern in '--path': \"{}\"", glob))
        })
        .transpose()?;

    Ok(ReadFilter {
        flags: cmd.flags.clone(),
        source: cmd.source.map(Into::into),
        path,
    })
}
