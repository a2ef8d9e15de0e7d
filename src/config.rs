use anyhow::ensure;
use clap::{Parser, ValueEnum};
use std::path::{Path, PathBuf};

use crate::errors::Result;
use crate::model::{ModelOptions, Task};

pub const DEFAULT_MODEL: &str = "Xenova/distilbert-base-uncased-finetuned-sst-2-english";
pub const DEFAULT_REVISION: &str = "main";
pub const DEFAULT_ONNX_FILE: &str = "onnx/model.onnx";
pub const DEFAULT_OUTPUT: &str = "output_sentiment_results.csv";
pub const DEFAULT_MAX_LENGTH: usize = 512;

/// Inference engine the classifier session runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Engine {
    /// ONNX Runtime default CPU provider
    #[default]
    Cpu,
    /// ONNX Runtime CUDA provider (requires the `cuda` feature)
    Cuda,
    /// ONNX Runtime TensorRT provider (requires the `tensorrt` feature)
    #[value(name = "tensorrt")]
    TensorRt,
}

impl Engine {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Cpu => "cpu",
            Self::Cuda => "cuda",
            Self::TensorRt => "tensorrt",
        }
    }
}

impl std::fmt::Display for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Quoting applied to fields of the output table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputQuoting {
    /// Quote only fields that contain delimiters, quotes or newlines
    #[default]
    Necessary,
    /// Quote every field
    Always,
}

impl From<OutputQuoting> for csv::QuoteStyle {
    fn from(quoting: OutputQuoting) -> Self {
        match quoting {
            OutputQuoting::Necessary => csv::QuoteStyle::Necessary,
            OutputQuoting::Always => csv::QuoteStyle::Always,
        }
    }
}

/// Dialect shared by the input reader and the output writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CsvOptions {
    pub delimiter: u8,
    pub quoting: OutputQuoting,
}

#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None)]
pub struct Config {
    /// CSV file to score; column 0 of every data row is classified
    #[arg(env = "SENTIMENT_CSV_INPUT")]
    pub input: PathBuf,

    /// CSV file to write, input columns plus Sentiment and Confidence
    #[arg(default_value = DEFAULT_OUTPUT, env = "SENTIMENT_CSV_OUTPUT")]
    pub output: PathBuf,

    /// Local model directory or Hugging Face Hub repository id
    #[arg(short, long, default_value = DEFAULT_MODEL, env = "SENTIMENT_CSV_MODEL")]
    pub model: String,

    /// Hub revision used when the model is fetched from the Hub
    #[arg(long, default_value = DEFAULT_REVISION)]
    pub revision: String,

    /// Path of the ONNX graph inside the model directory
    #[arg(long, default_value = DEFAULT_ONNX_FILE)]
    pub onnx_file: String,

    #[arg(short, long, value_enum, default_value_t = Engine::Cpu, env = "SENTIMENT_CSV_ENGINE")]
    pub engine: Engine,

    #[arg(short, long, default_value_t = 0)]
    pub device_id: i32,

    /// Maximum number of tokens fed to the model; longer texts are truncated
    #[arg(long, default_value_t = DEFAULT_MAX_LENGTH, value_parser = check_max_length)]
    pub max_length: usize,

    /// Field delimiter of both tables
    #[arg(long, default_value = ",", value_parser = check_delimiter)]
    pub delimiter: u8,

    #[arg(long, value_enum, default_value_t = OutputQuoting::Necessary)]
    pub quote_style: OutputQuoting,

    /// Do not print one line per classified row
    #[arg(short, long)]
    pub quiet: bool,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Config {
    /// Configuration with every option at its default value.
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            model: DEFAULT_MODEL.to_string(),
            revision: DEFAULT_REVISION.to_string(),
            onnx_file: DEFAULT_ONNX_FILE.to_string(),
            engine: Engine::Cpu,
            device_id: 0,
            max_length: DEFAULT_MAX_LENGTH,
            delimiter: b',',
            quote_style: OutputQuoting::Necessary,
            quiet: false,
            verbose: false,
        }
    }

    /// Checks constraints that clap cannot express on a single argument.
    pub fn validate(&self) -> Result<()> {
        ensure_distinct_paths(&self.input, &self.output)?;
        Ok(())
    }

    pub fn model_options(&self) -> ModelOptions {
        ModelOptions {
            task: Task::SentimentAnalysis,
            model: self.model.clone(),
            revision: self.revision.clone(),
            onnx_file: self.onnx_file.clone(),
            engine: self.engine,
            device_id: self.device_id,
            max_length: self.max_length,
        }
    }

    pub const fn csv_options(&self) -> CsvOptions {
        CsvOptions {
            delimiter: self.delimiter,
            quoting: self.quote_style,
        }
    }
}

// Opening the output truncates it, which would destroy the input before it is read.
fn ensure_distinct_paths(input: &Path, output: &Path) -> anyhow::Result<()> {
    ensure!(
        input != output,
        "input and output must be different files: {}",
        input.display()
    );
    if let (Ok(input), Ok(output)) = (input.canonicalize(), output.canonicalize()) {
        ensure!(
            input != output,
            "input and output resolve to the same file: {}",
            input.display()
        );
    }
    Ok(())
}

fn check_delimiter(s: &str) -> std::result::Result<u8, String> {
    match s.as_bytes() {
        [b] if b.is_ascii() && *b != b'"' && *b != b'\n' && *b != b'\r' => Ok(*b),
        _ => Err(format!(
            "`{s}` is not a valid delimiter. Use a single ASCII character other than a quote or newline"
        )),
    }
}

fn check_max_length(s: &str) -> std::result::Result<usize, String> {
    let value: usize = s
        .parse()
        .map_err(|e| format!("`{s}` is not a token count: {e}"))?;
    if value == 0 {
        return Err("max length must be greater than zero".to_string());
    }
    Ok(value)
}
