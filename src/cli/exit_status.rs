use std::process::ExitCode;

/// Exit status following common conventions for scanner tools.
///
/// - `Success` (0): scan completed, no issues survived the filters
/// - `Failure` (1): scan completed and issues were found
/// - `Error` (2): usage or IO error before results could be produced
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ExitStatus {
    Success,
    Failure,
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
