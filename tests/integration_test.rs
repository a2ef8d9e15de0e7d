use std::fs;
use std::path::Path;

use regex::Regex;
use tempfile::TempDir;

use sentiment_csv::{
    mocks::{create_mock_model, MockSentimentModel},
    run_with_loader, Classification, Classifications, Config, OutputQuoting, SentimentModel,
    SentimentProcessor,
};

// A deterministic model defined in the test itself: longer texts are more positive.
#[derive(Debug, Clone)]
struct LengthModel {
    labels: Vec<String>,
}

impl LengthModel {
    fn new() -> Self {
        Self {
            labels: vec!["NEGATIVE".to_string(), "POSITIVE".to_string()],
        }
    }
}

impl SentimentModel for LengthModel {
    fn classify(&mut self, text: &str) -> sentiment_csv::Result<Classifications> {
        let positive = (text.chars().count() % 100) as f32 / 100.0;
        Ok(Classifications::new(vec![
            Classification::new("NEGATIVE", 1.0 - positive),
            Classification::new("POSITIVE", positive),
        ]))
    }

    fn labels(&self) -> &[String] {
        &self.labels
    }
}

fn read_rows(path: &Path) -> Vec<Vec<String>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .unwrap();
    reader
        .records()
        .map(|r| r.unwrap().iter().map(str::to_string).collect())
        .collect()
}

fn write_rows(path: &Path, rows: &[Vec<&str>]) {
    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_path(path)
        .unwrap();
    for row in rows {
        writer.write_record(row).unwrap();
    }
    writer.flush().unwrap();
}

#[test]
fn test_review_scenario_end_to_end() -> Result<(), Box<dyn std::error::Error>> {
    let temp_dir = TempDir::new()?;
    let input = temp_dir.path().join("input_reviews.csv");
    let output = temp_dir.path().join("output_sentiment_results.csv");
    write_rows(
        &input,
        &[
            vec!["text", "id"],
            vec!["great product", "1"],
            vec!["terrible", "2"],
        ],
    );

    let config = Config::new(&input, &output);
    let summary = run_with_loader(&config, |_| Ok(create_mock_model()))?;

    assert_eq!(summary.rows, 2);
    assert_eq!(
        read_rows(&output),
        vec![
            vec!["text", "id", "Sentiment", "Confidence"],
            vec!["great product", "1", "POSITIVE", "97.00%"],
            vec!["terrible", "2", "NEGATIVE", "88.00%"],
        ]
    );
    Ok(())
}

#[test]
fn test_rows_preserved_in_order() -> Result<(), Box<dyn std::error::Error>> {
    let temp_dir = TempDir::new()?;
    let input = temp_dir.path().join("in.csv");
    let output = temp_dir.path().join("out.csv");

    let texts: Vec<String> = (0..25)
        .map(|i| format!("review number {i} {}", "!".repeat(i * 7)))
        .collect();
    let ids: Vec<String> = (0..25).map(|i| i.to_string()).collect();
    let mut rows = vec![vec!["review", "id", "source"]];
    for (text, id) in texts.iter().zip(&ids) {
        rows.push(vec![text.as_str(), id.as_str(), "web"]);
    }
    write_rows(&input, &rows);

    let mut processor = SentimentProcessor::new(LengthModel::new(), Config::new(&input, &output));
    let summary = processor.process_file()?;
    assert_eq!(summary.rows, 25);

    let written = read_rows(&output);
    assert_eq!(written.len(), 26);
    assert_eq!(written[0], vec!["review", "id", "source", "Sentiment", "Confidence"]);

    let confidence = Regex::new(r"^\d{1,3}\.\d{2}%$")?;
    for (input_row, output_row) in rows[1..].iter().zip(&written[1..]) {
        assert_eq!(output_row.len(), input_row.len() + 2);
        assert_eq!(&output_row[..input_row.len()], input_row.as_slice());

        let value = &output_row[input_row.len() + 1];
        assert!(confidence.is_match(value), "bad confidence {value}");
        let numeric: f64 = value.trim_end_matches('%').parse()?;
        assert!((0.0..=100.0).contains(&numeric));
    }
    Ok(())
}

#[test]
fn test_quoted_fields_round_trip() -> Result<(), Box<dyn std::error::Error>> {
    let temp_dir = TempDir::new()?;
    let input = temp_dir.path().join("in.csv");
    let output = temp_dir.path().join("out.csv");
    fs::write(
        &input,
        "text,note\n\"Loved it, would buy again\",\"said \"\"wow\"\"\"\n\"multi\nline\",x\n",
    )?;

    let model = MockSentimentModel::new()
        .with_response("Loved it, would buy again", "POSITIVE", 0.9912)
        .with_response("multi\nline", "NEGATIVE", 0.5);
    let mut processor = SentimentProcessor::new(model, Config::new(&input, &output));
    processor.process_file()?;

    assert_eq!(
        read_rows(&output),
        vec![
            vec!["text", "note", "Sentiment", "Confidence"],
            vec!["Loved it, would buy again", "said \"wow\"", "POSITIVE", "99.12%"],
            vec!["multi\nline", "x", "NEGATIVE", "50.00%"],
        ]
    );
    Ok(())
}

#[test]
fn test_quote_all_and_custom_delimiter() -> Result<(), Box<dyn std::error::Error>> {
    let temp_dir = TempDir::new()?;
    let input = temp_dir.path().join("in.tsv");
    let output = temp_dir.path().join("out.tsv");
    fs::write(&input, "text\tid\ngreat product\t1\n")?;

    let mut config = Config::new(&input, &output);
    config.delimiter = b'\t';
    config.quote_style = OutputQuoting::Always;
    run_with_loader(&config, |_| Ok(create_mock_model()))?;

    assert_eq!(
        fs::read_to_string(&output)?,
        "\"text\"\t\"id\"\t\"Sentiment\"\t\"Confidence\"\n\
         \"great product\"\t\"1\"\t\"POSITIVE\"\t\"97.00%\"\n"
    );
    Ok(())
}

#[test]
fn test_idempotent_output() -> Result<(), Box<dyn std::error::Error>> {
    let temp_dir = TempDir::new()?;
    let input = temp_dir.path().join("in.csv");
    fs::write(
        &input,
        "text,id\ngreat product,1\nterrible,2\nsomething else entirely,3\n",
    )?;

    let mut outputs = Vec::new();
    for name in ["first.csv", "second.csv"] {
        let output = temp_dir.path().join(name);
        run_with_loader(&Config::new(&input, &output), |_| Ok(LengthModel::new()))?;
        outputs.push(fs::read(&output)?);
    }

    assert_eq!(outputs[0], outputs[1]);
    Ok(())
}

#[test]
fn test_empty_input_produces_empty_output() -> Result<(), Box<dyn std::error::Error>> {
    let temp_dir = TempDir::new()?;
    let input = temp_dir.path().join("empty.csv");
    let output = temp_dir.path().join("out.csv");
    fs::write(&input, "")?;

    let model = create_mock_model();
    let mut processor = SentimentProcessor::new(model, Config::new(&input, &output));
    let summary = processor.process_file()?;

    assert!(!summary.header_written);
    assert_eq!(summary.rows, 0);
    assert_eq!(processor.model().calls(), 0);
    assert_eq!(fs::read_to_string(&output)?, "");
    Ok(())
}

#[test]
fn test_each_row_classified_once() -> Result<(), Box<dyn std::error::Error>> {
    let temp_dir = TempDir::new()?;
    let input = temp_dir.path().join("in.csv");
    let output = temp_dir.path().join("out.csv");
    fs::write(&input, "text\na\nb\nc\nd\n")?;

    let mut processor = SentimentProcessor::new(create_mock_model(), Config::new(&input, &output));
    processor.process_file()?;

    assert_eq!(processor.model().calls(), 4);
    Ok(())
}
