//! Reading raw exports and snapshots from disk, and writing compressed output.
//!
//! Every read is one-shot: open, decompress and read fully into memory, close.
//! A file that cannot be opened or read is a [`PipelineError::SourceUnavailable`].

use crate::config::AppConfig;
use crate::error::{PipelineError, PipelineResult};
use airsent_cli::{CleanArgs, CompressionFormat};
use polars::prelude::*;
use std::fs::File;
use std::io::{BufReader, Cursor, Read, Write};
use std::path::Path;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ReadOptions {
    pub delimiter: Option<u8>,
    pub skip_lines: Option<usize>,
    pub skip_rows: Option<usize>,
    pub compression: Option<CompressionFormat>,
    /// When true, malformed CSV lines are skipped instead of failing the read.
    pub ignore_errors: bool,
}

impl ReadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = Some(delimiter);
        self
    }

    pub fn with_skip_lines(mut self, skip_lines: usize) -> Self {
        self.skip_lines = Some(skip_lines);
        self
    }

    pub fn with_skip_rows(mut self, skip_rows: usize) -> Self {
        self.skip_rows = Some(skip_rows);
        self
    }

    pub fn with_compression(mut self, compression: CompressionFormat) -> Self {
        self.compression = Some(compression);
        self
    }

    /// Create ReadOptions from CLI args and config, with CLI args taking precedence
    pub fn from_args_and_config(args: &CleanArgs, config: &AppConfig) -> Self {
        Self {
            delimiter: args.delimiter.or(config.file_loading.delimiter),
            skip_lines: args.skip_lines.or(config.file_loading.skip_lines),
            skip_rows: args.skip_rows.or(config.file_loading.skip_rows),
            compression: args.compression,
            ignore_errors: args
                .ignore_errors
                .or(config.file_loading.ignore_errors)
                .unwrap_or(false),
        }
    }

    /// Compression to use for `path`: explicit option first, then the file extension.
    pub fn compression_for(&self, path: &Path) -> Option<CompressionFormat> {
        self.compression
            .or_else(|| CompressionFormat::from_extension(path))
    }
}

/// Reads the whole file into memory, decompressing when `compression` is set.
pub(crate) fn read_all(
    path: &Path,
    compression: Option<CompressionFormat>,
) -> PipelineResult<Vec<u8>> {
    let file = File::open(path).map_err(|e| PipelineError::source_unavailable(path, e))?;
    let reader = BufReader::new(file);
    let mut decoder: Box<dyn Read> = match compression {
        None => Box::new(reader),
        Some(CompressionFormat::Gzip) => Box::new(flate2::read::MultiGzDecoder::new(reader)),
        Some(CompressionFormat::Zstd) => Box::new(
            zstd::Decoder::with_buffer(reader)
                .map_err(|e| PipelineError::source_unavailable(path, e))?,
        ),
        Some(CompressionFormat::Bzip2) => Box::new(bzip2::read::BzDecoder::new(reader)),
        Some(CompressionFormat::Xz) => Box::new(xz2::read::XzDecoder::new(reader)),
    };
    let mut bytes = Vec::new();
    decoder
        .read_to_end(&mut bytes)
        .map_err(|e| PipelineError::source_unavailable(path, e))?;
    Ok(bytes)
}

/// Encoder for snapshot output. Call [`CompressedWriter::finish`] once all
/// bytes are written: it writes the trailer and reports its I/O errors.
pub(crate) enum CompressedWriter<W: Write> {
    Plain(W),
    Gzip(flate2::write::GzEncoder<W>),
    Zstd(zstd::Encoder<'static, W>),
    Bzip2(bzip2::write::BzEncoder<W>),
    Xz(xz2::write::XzEncoder<W>),
}

impl<W: Write> CompressedWriter<W> {
    pub(crate) fn new(inner: W, compression: Option<CompressionFormat>) -> std::io::Result<Self> {
        Ok(match compression {
            None => Self::Plain(inner),
            Some(CompressionFormat::Gzip) => Self::Gzip(flate2::write::GzEncoder::new(
                inner,
                flate2::Compression::default(),
            )),
            Some(CompressionFormat::Zstd) => Self::Zstd(zstd::Encoder::new(inner, 0)?),
            Some(CompressionFormat::Bzip2) => Self::Bzip2(bzip2::write::BzEncoder::new(
                inner,
                bzip2::Compression::default(),
            )),
            Some(CompressionFormat::Xz) => Self::Xz(xz2::write::XzEncoder::new(inner, 6)),
        })
    }

    /// Completes the stream and returns the inner writer, flushed.
    pub(crate) fn finish(self) -> std::io::Result<W> {
        let mut inner = match self {
            Self::Plain(w) => w,
            Self::Gzip(e) => e.finish()?,
            Self::Zstd(e) => e.finish()?,
            Self::Bzip2(e) => e.finish()?,
            Self::Xz(e) => e.finish()?,
        };
        inner.flush()?;
        Ok(inner)
    }
}

impl<W: Write> Write for CompressedWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match self {
            Self::Plain(w) => w.write(buf),
            Self::Gzip(e) => e.write(buf),
            Self::Zstd(e) => e.write(buf),
            Self::Bzip2(e) => e.write(buf),
            Self::Xz(e) => e.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match self {
            Self::Plain(w) => w.flush(),
            Self::Gzip(e) => e.flush(),
            Self::Zstd(e) => e.flush(),
            Self::Bzip2(e) => e.flush(),
            Self::Xz(e) => e.flush(),
        }
    }
}

/// Parses CSV bytes with every column read as a string, so that type coercion
/// stays with the normalizer instead of CSV schema inference.
pub(crate) fn parse_csv_as_strings(
    bytes: Vec<u8>,
    options: &ReadOptions,
) -> PipelineResult<DataFrame> {
    let mut read_options = CsvReadOptions::default();
    read_options.has_header = true;
    read_options.infer_schema_length = Some(0);
    if let Some(skip_lines) = options.skip_lines {
        read_options.skip_lines = skip_lines;
    }
    if let Some(skip_rows) = options.skip_rows {
        read_options.skip_rows = skip_rows;
    }
    read_options.ignore_errors = options.ignore_errors;
    let separator = options.delimiter.unwrap_or(b',');
    read_options = read_options.map_parse_options(|opts| opts.with_separator(separator));

    let df = CsvReader::new(Cursor::new(bytes))
        .with_options(read_options)
        .finish()?;
    Ok(df)
}

/// Returns `name` as a string column, or `None` when the frame has no such column.
pub(crate) fn string_column(df: &DataFrame, name: &str) -> PipelineResult<Option<StringChunked>> {
    match df.column(name) {
        Ok(column) => Ok(Some(column.cast(&DataType::String)?.str()?.clone())),
        Err(_) => Ok(None),
    }
}

/// Like [`string_column`], but a missing column is a [`PipelineError::MissingColumn`].
pub(crate) fn required_string_column(df: &DataFrame, name: &str) -> PipelineResult<StringChunked> {
    string_column(df, name)?.ok_or_else(|| PipelineError::MissingColumn {
        column: name.to_string(),
    })
}

/// Reads a raw export into a string-typed frame.
pub fn read_raw(path: &Path, options: &ReadOptions) -> PipelineResult<DataFrame> {
    let bytes = read_all(path, options.compression_for(path))?;
    tracing::debug!(path = %path.display(), bytes = bytes.len(), "read raw export");
    let df = parse_csv_as_strings(bytes, options)?;
    tracing::debug!(rows = df.height(), columns = df.width(), "parsed raw export");
    Ok(df)
}
