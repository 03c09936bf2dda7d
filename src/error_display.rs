//! User-facing error message formatting.
//!
//! Uses typed error matching (PipelineError, PolarsError variants,
//! io::ErrorKind) rather than string parsing to produce one actionable line.

use crate::error::PipelineError;
use polars::prelude::PolarsError;
use std::io;

/// Format a PipelineError as a user-facing message by matching on its variant.
pub fn user_message_from_pipeline(err: &PipelineError) -> String {
    match err {
        PipelineError::SourceUnavailable { path, source } => format!(
            "Cannot read {}: {} Run `airsent clean` first if the snapshot has not been created yet.",
            path.display(),
            user_message_from_io(source, None)
        ),
        PipelineError::MissingColumn { column } => format!(
            "The raw export has no '{}' column. Set the column name under [columns] in the config file.",
            column
        ),
        PipelineError::InvalidSnapshot { row, reason } => format!(
            "Snapshot row {} is not clean ({}). Re-run `airsent clean` to rebuild it.",
            row, reason
        ),
        PipelineError::Polars(pe) => user_message_from_polars(pe),
        PipelineError::Io(io_err) => user_message_from_io(io_err, None),
    }
}

/// Format a PolarsError as a user-facing message by matching on its variant.
pub fn user_message_from_polars(err: &PolarsError) -> String {
    use polars::prelude::PolarsError as PE;

    match err {
        PE::ColumnNotFound(msg) => format!(
            "Column not found: {}. Check spelling and that the column exists.",
            msg
        ),
        PE::IO { error, msg } => {
            user_message_from_io(error.as_ref(), msg.as_ref().map(|m| m.as_ref()))
        }
        PE::NoData(msg) => format!("No data: {}", msg),
        PE::SchemaMismatch(msg) => format!("Schema mismatch: {}", msg),
        PE::ShapeMismatch(msg) => format!("Row shape mismatch: {}", msg),
        PE::InvalidOperation(msg) => format!("Operation not allowed: {}", msg),
        PE::OutOfBounds(msg) => format!("Index or row out of bounds: {}", msg),
        PE::ComputeError(msg) => first_line(msg),
        PE::Context { error, msg } => {
            let inner = user_message_from_polars(error);
            format!("{}: {}", msg, inner)
        }
        #[allow(unreachable_patterns)]
        _ => err.to_string(),
    }
}

/// Format an io::Error as a user-facing message by matching on ErrorKind.
pub fn user_message_from_io(err: &io::Error, context: Option<&str>) -> String {
    use std::io::ErrorKind;

    let base: String = match err.kind() {
        ErrorKind::NotFound => "File or directory not found.".to_string(),
        ErrorKind::PermissionDenied => "Permission denied. Check read access.".to_string(),
        ErrorKind::InvalidData | ErrorKind::InvalidInput => {
            "Invalid or corrupted data.".to_string()
        }
        ErrorKind::UnexpectedEof => "Unexpected end of file.".to_string(),
        ErrorKind::Interrupted => "Operation interrupted.".to_string(),
        ErrorKind::OutOfMemory => "Out of memory.".to_string(),
        ErrorKind::Other => {
            let msg = err.to_string();
            if msg.contains("No space left") || msg.contains("space left") {
                return "No space left on device. Free up disk space and try again.".to_string();
            }
            if msg.contains("Is a directory") {
                return "Path is a directory, not a file.".to_string();
            }
            return if context.is_some() {
                format!("I/O error: {}", msg)
            } else {
                msg
            };
        }
        _ => err.to_string(),
    };

    match context {
        Some(ctx) if !ctx.is_empty() => format!("{} {}", base, ctx),
        _ => base,
    }
}

/// Format a color_eyre Report by downcasting to known error types.
/// Walks the cause chain to find PipelineError, PolarsError or io::Error.
pub fn user_message_from_report(report: &color_eyre::eyre::Report) -> String {
    for cause in report.chain() {
        if let Some(err) = cause.downcast_ref::<PipelineError>() {
            return user_message_from_pipeline(err);
        }
        if let Some(pe) = cause.downcast_ref::<PolarsError>() {
            return user_message_from_polars(pe);
        }
        if let Some(io_err) = cause.downcast_ref::<io::Error>() {
            return user_message_from_io(io_err, None);
        }
    }

    // Fallback: use first line of display to avoid long tracebacks
    first_line(&report.to_string())
}

fn first_line(msg: &str) -> String {
    msg.lines()
        .next()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .unwrap_or("An error occurred")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_user_message_from_io_not_found() {
        let err = io::Error::new(io::ErrorKind::NotFound, "No such file");
        let msg = user_message_from_io(&err, None);
        assert!(
            msg.contains("not found"),
            "expected 'not found', got: {}",
            msg
        );
    }

    #[test]
    fn test_user_message_from_polars_column_not_found() {
        let err = PolarsError::ColumnNotFound("foo".into());
        let msg = user_message_from_polars(&err);
        assert!(msg.contains("foo"), "expected 'foo', got: {}", msg);
        assert!(
            msg.contains("Column not found"),
            "expected column not found, got: {}",
            msg
        );
    }

    #[test]
    fn test_source_unavailable_names_path_and_hint() {
        let err = PipelineError::SourceUnavailable {
            path: PathBuf::from("tweets_clean.csv"),
            source: io::Error::new(io::ErrorKind::NotFound, "No such file"),
        };
        let msg = user_message_from_pipeline(&err);
        assert!(msg.contains("tweets_clean.csv"), "got: {}", msg);
        assert!(msg.contains("airsent clean"), "got: {}", msg);
    }

    #[test]
    fn test_report_chain_finds_pipeline_error() {
        let err = PipelineError::MissingColumn {
            column: "airline".to_string(),
        };
        let report = color_eyre::eyre::Report::new(err).wrap_err("cleaning failed");
        let msg = user_message_from_report(&report);
        assert!(msg.contains("'airline'"), "got: {}", msg);
        assert!(msg.contains("[columns]"), "got: {}", msg);
    }

    #[test]
    fn test_report_fallback_uses_first_line() {
        let report = color_eyre::eyre::eyre!("first line\nsecond line");
        assert_eq!(user_message_from_report(&report), "first line");
    }
}
