use super::ui;
use crate::core::{ConversionResult, Converter, PricePoint, RateSource};
use anyhow::Result;
use chrono::{TimeZone, Utc};
use comfy_table::Cell;

/// Summary of the price series returned with a conversion.
#[derive(Debug, Clone, PartialEq)]
pub struct HistorySummary {
    pub first: PricePoint,
    pub last: PricePoint,
    pub min: f64,
    pub max: f64,
    pub change: Option<f64>,
}

pub fn summarize_history(history: &[PricePoint]) -> Option<HistorySummary> {
    let first = *history.first()?;
    let last = *history.last()?;
    let (min, max) = history
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(min, max), point| {
            (min.min(point.1), max.max(point.1))
        });
    let change = (first.1 > 0.0).then(|| ((last.1 - first.1) / first.1) * 100.0);

    Some(HistorySummary {
        first,
        last,
        min,
        max,
        change,
    })
}

fn format_timestamp(ms: i64) -> String {
    Utc.timestamp_millis_opt(ms)
        .single()
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| ms.to_string())
}

pub fn display_conversion(
    base: &str,
    target: &str,
    amount: &str,
    result: &ConversionResult,
) -> String {
    let base = base.trim().to_lowercase();
    let target = target.trim().to_lowercase();

    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Amount"),
        ui::header_cell("Price"),
        ui::header_cell(&format!("Converted ({target})")),
        ui::header_cell("Source"),
    ]);
    let source = match result.source {
        RateSource::Direct => "direct",
        RateSource::ViaUsd => "via USD",
    };
    table.add_row(vec![
        ui::number_cell(format!("{} {base}", amount.trim())),
        ui::number_cell(format!("{}", result.price)),
        ui::number_cell(format!("{}", result.converted)),
        Cell::new(source),
    ]);

    let mut output = format!(
        "Conversion: {}\n\n",
        ui::style_text(&format!("{base} → {target}"), ui::StyleType::Title)
    );
    output.push_str(&table.to_string());

    match summarize_history(&result.history) {
        Some(summary) => {
            let mut history = ui::new_styled_table();
            history.set_header(vec![
                ui::header_cell("From"),
                ui::header_cell("To"),
                ui::header_cell("Low"),
                ui::header_cell("High"),
                ui::header_cell("Change (7D)"),
            ]);
            history.add_row(vec![
                Cell::new(format_timestamp(summary.first.0)),
                Cell::new(format_timestamp(summary.last.0)),
                ui::number_cell(format!("{}", summary.min)),
                ui::number_cell(format!("{}", summary.max)),
                summary.change.map_or_else(ui::na_cell, ui::change_cell),
            ]);
            output.push_str("\n\n");
            output.push_str(&ui::style_text("History", ui::StyleType::TotalLabel));
            output.push('\n');
            output.push_str(&history.to_string());
        }
        None => {
            output.push_str("\n\n");
            output.push_str(&ui::style_text(
                "No price history available",
                ui::StyleType::Subtle,
            ));
        }
    }

    output.push_str(&format!(
        "\n\nTotal ({}): {}",
        ui::style_text(&target, ui::StyleType::TotalLabel),
        ui::style_text(&result.converted.to_string(), ui::StyleType::TotalValue)
    ));
    output
}

/// One-shot conversion printed to stdout.
pub async fn run(
    converter: &Converter,
    base: &str,
    target: &str,
    amount: &str,
    json: bool,
) -> Result<()> {
    let spinner = (!json).then(|| ui::new_spinner("Fetching prices..."));
    let result = converter.convert(base, target, amount).await;
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }
    let result = result?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("{}", display_conversion(base, target, amount, &result));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summarize_history() {
        let history = vec![
            PricePoint(1_700_000_000_000, 100.0),
            PricePoint(1_700_003_600_000, 90.0),
            PricePoint(1_700_007_200_000, 125.0),
            PricePoint(1_700_010_800_000, 110.0),
        ];

        let summary = summarize_history(&history).unwrap();
        assert_eq!(summary.first, history[0]);
        assert_eq!(summary.last, history[3]);
        assert_eq!(summary.min, 90.0);
        assert_eq!(summary.max, 125.0);
        assert!((summary.change.unwrap() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_summarize_empty_history() {
        assert!(summarize_history(&[]).is_none());
    }

    #[test]
    fn test_summarize_history_zero_start() {
        let summary = summarize_history(&[PricePoint(0, 0.0), PricePoint(1, 5.0)]).unwrap();
        assert!(summary.change.is_none());
    }

    #[test]
    fn test_display_conversion() {
        let result = ConversionResult {
            converted: 100000.0,
            price: 50000.0,
            history: vec![],
            source: RateSource::Direct,
        };

        let output = display_conversion("Bitcoin", "USD", "2", &result);
        assert!(output.contains("bitcoin"));
        assert!(output.contains("Converted (usd)"));
        assert!(output.contains("50000"));
        assert!(output.contains("100000"));
        assert!(output.contains("direct"));
        assert!(output.contains("No price history available"));
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(1_700_000_000_000), "2023-11-14 22:13");
    }
}
