use std::process::ExitCode;

/// Exit status for CLI commands, following common conventions for analysis tools.
///
/// - `Success` (0): Command completed
/// - `Failure` (1): `--strict` run that produced warnings
/// - `Error` (2): Command failed (config error, malformed template, I/O error)
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ExitStatus {
    /// Command completed; warnings, if any, were only printed.
    Success,
    /// A `--strict` run produced warnings.
    Failure,
    /// Command failed with a fatal error.
    Error,
}

impl From<ExitStatus> for ExitCode {
    fn from(status: ExitStatus) -> Self {
        match status {
            ExitStatus::Success => ExitCode::from(0),
            ExitStatus::Failure => ExitCode::from(1),
            ExitStatus::Error => ExitCode::from(2),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_code_values() {
        assert_eq!(ExitCode::from(ExitStatus::Success), ExitCode::from(0));
        assert_eq!(ExitCode::from(ExitStatus::Failure), ExitCode::from(1));
        assert_eq!(ExitCode::from(ExitStatus::Error), ExitCode::from(2));
    }
}
