pub mod classification;
pub mod config;
pub mod errors;
pub mod mocks;
pub mod model;
pub mod traits;

mod progress_tracker;

use std::io;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, WriterBuilder};

pub use classification::{format_confidence, Classification, Classifications};
pub use config::{Config, CsvOptions, Engine, OutputQuoting};
pub use errors::{Result, SentimentCsvError};
pub use model::{ModelOptions, OnnxSentimentModel, Task};
pub use traits::*;

use progress_tracker::ProgressTracker;

pub const SENTIMENT_COLUMN: &str = "Sentiment";
pub const CONFIDENCE_COLUMN: &str = "Confidence";

const INPUT_STREAM: &str = "<input stream>";
const OUTPUT_STREAM: &str = "<output stream>";

/// Outcome of a completed run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessingSummary {
    pub header_written: bool,
    pub rows: u64,
}

/// Streams the input table through a sentiment model, one row at a time.
pub struct SentimentProcessor<M: SentimentModel> {
    model: M,
    config: Config,
}

impl<M: SentimentModel> SentimentProcessor<M> {
    pub const fn new(model: M, config: Config) -> Self {
        Self { model, config }
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    /// Scores `config.input` into `config.output`.
    ///
    /// The input is opened first so a missing input never creates the output.
    /// Both files are closed on every exit path; the output is only flushed
    /// explicitly on success.
    pub fn process_file(&mut self) -> Result<ProcessingSummary> {
        let csv_options = self.config.csv_options();
        let input_path = self.config.input.clone();
        let output_path = self.config.output.clone();

        tracing::info!(
            input = %input_path.display(),
            output = %output_path.display(),
            "Scoring rows"
        );

        let reader = reader_builder(csv_options)
            .from_path(&input_path)
            .map_err(input_io(&input_path, "open"))?;
        let mut writer = writer_builder(csv_options)
            .from_path(&output_path)
            .map_err(output_io(&output_path, "create"))?;

        let summary = self.process_records(reader, &mut writer, &input_path, &output_path)?;

        writer
            .flush()
            .map_err(|e| output_io(&output_path, "flush")(e.into()))?;
        Ok(summary)
    }

    /// Scores CSV read from `input` into `output`, flushing it on success.
    ///
    /// Errors name the streams `<input stream>` and `<output stream>`.
    pub fn process_io<R: io::Read, W: io::Write>(
        &mut self,
        input: R,
        output: W,
    ) -> Result<ProcessingSummary> {
        let csv_options = self.config.csv_options();
        let reader = reader_builder(csv_options).from_reader(input);
        let mut writer = writer_builder(csv_options).from_writer(output);

        let input_name = Path::new(INPUT_STREAM);
        let output_name = Path::new(OUTPUT_STREAM);
        let summary = self.process_records(reader, &mut writer, input_name, output_name)?;

        writer
            .flush()
            .map_err(|e| output_io(output_name, "flush")(e.into()))?;
        Ok(summary)
    }

    fn process_records<R: io::Read, W: io::Write>(
        &mut self,
        reader: csv::Reader<R>,
        writer: &mut csv::Writer<W>,
        input_path: &Path,
        output_path: &Path,
    ) -> Result<ProcessingSummary> {
        tracing::info!(labels = ?self.model.labels(), "Classifier labels");
        let progress = ProgressTracker::new(self.config.quiet);
        let result = self.score_rows(reader, writer, &progress, input_path, output_path);
        match &result {
            Ok(summary) => {
                progress.finish();
                tracing::info!(rows = summary.rows, "All rows scored");
            }
            Err(_) => progress.abandon(),
        }
        result
    }

    fn score_rows<R: io::Read, W: io::Write>(
        &mut self,
        reader: csv::Reader<R>,
        writer: &mut csv::Writer<W>,
        progress: &ProgressTracker,
        input_path: &Path,
        output_path: &Path,
    ) -> Result<ProcessingSummary> {
        let mut records = reader.into_records();

        let mut header = match records.next() {
            Some(header) => header.map_err(input_io(input_path, "read header"))?,
            None => {
                tracing::warn!("Input has no header row; nothing to score");
                return Ok(ProcessingSummary {
                    header_written: false,
                    rows: 0,
                });
            }
        };
        header.push_field(SENTIMENT_COLUMN);
        header.push_field(CONFIDENCE_COLUMN);
        writer
            .write_record(&header)
            .map_err(output_io(output_path, "write header"))?;

        let mut rows = 0;
        for record in records {
            let mut record = record.map_err(input_io(input_path, "read row"))?;
            // Header is line 1, so data row n sits on line n + 1 at the earliest.
            let line = record.position().map_or(rows + 2, |p| p.line());

            let (label, confidence) = self.classify_record(&record, line)?;
            progress.row(&record[0], &label, &confidence);

            record.push_field(&label);
            record.push_field(&confidence);
            writer
                .write_record(&record)
                .map_err(output_io(output_path, "write row"))?;
            rows += 1;
        }

        Ok(ProcessingSummary {
            header_written: true,
            rows,
        })
    }

    fn classify_record(&mut self, record: &StringRecord, line: u64) -> Result<(String, String)> {
        let text = record.get(0).ok_or_else(|| SentimentCsvError::MalformedRow {
            line,
            reason: "row has no fields; column 0 must hold the text".to_string(),
        })?;

        let classifications = self.model.classify(text)?;
        let best = classifications.best().ok_or_else(|| {
            SentimentCsvError::inference(
                format!("top classification (line {line})"),
                "classifier returned no labels",
            )
        })?;
        if !(0.0..=1.0).contains(&best.probability) {
            return Err(SentimentCsvError::inference(
                format!("top classification (line {line})"),
                format!(
                    "probability {} for {} is not in [0, 1]",
                    best.probability, best.label
                ),
            ));
        }
        tracing::debug!(
            line,
            label = %best.label,
            probability = best.probability,
            "Row classified"
        );

        Ok((best.label.clone(), best.confidence()))
    }
}

/// Loads the ONNX classifier and scores the configured input.
pub fn run(config: &Config) -> Result<ProcessingSummary> {
    run_with_loader(config, OnnxSentimentModel::load)
}

/// Runs the pipeline with a caller-supplied model loader.
///
/// The model is loaded before any file is opened, so a failed load leaves the
/// output untouched.
pub fn run_with_loader<M, F>(config: &Config, load: F) -> Result<ProcessingSummary>
where
    M: SentimentModel,
    F: FnOnce(&ModelOptions) -> Result<M>,
{
    config.validate()?;
    let model = load(&config.model_options())?;
    SentimentProcessor::new(model, config.clone()).process_file()
}

fn reader_builder(options: CsvOptions) -> ReaderBuilder {
    let mut builder = ReaderBuilder::new();
    builder
        .has_headers(false)
        .flexible(true)
        .delimiter(options.delimiter);
    builder
}

fn writer_builder(options: CsvOptions) -> WriterBuilder {
    let mut builder = WriterBuilder::new();
    builder
        .flexible(true)
        .delimiter(options.delimiter)
        .quote_style(options.quoting.into());
    builder
}

fn input_io<'a>(
    path: &'a Path,
    operation: &'a str,
) -> impl FnOnce(csv::Error) -> SentimentCsvError + 'a {
    move |source| SentimentCsvError::InputIo {
        path: path.to_path_buf(),
        operation: operation.to_string(),
        source,
    }
}

fn output_io<'a>(
    path: &'a Path,
    operation: &'a str,
) -> impl FnOnce(csv::Error) -> SentimentCsvError + 'a {
    move |source| SentimentCsvError::OutputIo {
        path: path.to_path_buf(),
        operation: operation.to_string(),
        source,
    }
}
