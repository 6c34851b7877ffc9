//! Report tables built from comparison results

use anyhow::Result;
use bdome::constants::{BATTLEDOME_DROPS_PER_DAY, NUMBER_OF_ITEMS_TO_PRINT};
use bdome::{
    dry_chance, items_by_profit, total_profit, Arena, ArenaComparison, ArenaSummary,
    ChallengerComparison, ChallengerKey, ChallengerSummary, CodestoneSummary, Comparison,
    DropClassSummary, DropsAnalysis, ItemDropRate, NormalisedDrops, Outcome, PriceTable,
};

use crate::report::{
    format_float, format_np, format_np_interval, format_percentage, format_percentage_range,
    format_rate_interval, side_by_side, Table,
};

/// Items with a smaller share of a day's profit are left out of drop reports
const MIN_SHARE_TO_PRINT: f64 = 0.01;

/// Days of play the dry chance column looks ahead
const DRY_CHANCE_DAYS: u32 = 30;

const GAP: &str = "  ";

fn indent(lines: Vec<String>) -> Vec<String> {
    lines.into_iter().map(|line| format!("  {}", line)).collect()
}

/// Predicted, actual and difference in mean day profit
fn profit_table(title: String, comparison: &Comparison, with_intervals: bool) -> Result<Table> {
    let describe = |analysis: &DropsAnalysis| {
        if with_intervals {
            format_np_interval(analysis.mean_day(), analysis.day_interval)
        } else {
            format!(
                "{} ± {} NP",
                format_float(analysis.mean_day()),
                format_float(analysis.stdev_day())
            )
        }
    };

    let mut table = Table::named(title, ["Type", "Value"]).with_distinct_last_row();
    table.add_row(["Predicted".to_string(), describe(&comparison.predicted)])?;
    table.add_row(["Actual".to_string(), describe(&comparison.actual)])?;
    table.add_row(["Difference".to_string(), format_np(comparison.difference())])?;
    Ok(table)
}

/// Coefficient of variation and Student-t mean error of day profit
fn spread_table(comparison: &Comparison, alpha: f64) -> Result<Table> {
    let days = BATTLEDOME_DROPS_PER_DAY;
    let mut table = Table::named("Spread", ["Type", "CV", "Mean Error"]);
    let analyses = [
        ("Predicted", &comparison.predicted),
        ("Actual", &comparison.actual),
    ];
    for (label, analysis) in analyses {
        let error = analysis.result.mean_error(days, alpha)?;
        table.add_row([
            label.to_string(),
            format!("{}%", format_percentage(analysis.result.coefficient_of_variation(days))),
            format!("± {}", format_np(error)),
        ])?;
    }
    Ok(table)
}

/// Most profitable items in one analysis
fn profitable_items_table(analysis: &DropsAnalysis, actual: bool, alpha: f64) -> Result<Table> {
    let mut table = if actual {
        Table::named(
            "Actual",
            ["i", "Item Name", "Drop Rate", "Price", "Expectation", "%"],
        )
    } else {
        Table::named(
            "Predicted",
            ["i", "Item Name", "Drop Rate", "Dry Chance", "Price", "Expectation", "%"],
        )
    };

    for (i, item) in analysis.top_by_profit(NUMBER_OF_ITEMS_TO_PRINT).into_iter().enumerate() {
        let index = (i + 1).to_string();
        let price = format_np(item.price);
        let expectation = format_np(item.expectation());
        let share = format!("{}%", format_percentage(item.percentage));

        if actual {
            let interval = analysis.rate_interval(item.name(), alpha)?;
            table.add_row([
                index,
                item.name().to_string(),
                format_rate_interval(item.rate(), interval),
                price,
                expectation,
                share,
            ])?;
        } else {
            let dry = dry_chance(item.rate(), DRY_CHANCE_DAYS * BATTLEDOME_DROPS_PER_DAY);
            table.add_row([
                index,
                item.name().to_string(),
                format!("{}%", format_percentage(item.rate())),
                format!("{}%", format_percentage(dry)),
                price,
                expectation,
                share,
            ])?;
        }
    }
    Ok(table)
}

fn codestone_table(summary: &CodestoneSummary) -> Result<Table> {
    let mut table =
        Table::named(summary.title.clone(), ["Item Name", "Predicted", "Real"])
            .with_distinct_last_row();
    for row in &summary.rows {
        table.add_row([
            row.name.clone(),
            format!("{}%", format_percentage(row.predicted_rate)),
            format_rate_interval(row.actual_rate, row.actual_interval),
        ])?;
    }
    let (lo, hi) = summary.actual_total_interval;
    table.add_row([
        "Sum".to_string(),
        format!("{}%", format_percentage(summary.predicted_total)),
        format!("{}%", format_percentage_range(lo, hi)),
    ])?;
    Ok(table)
}

fn drop_class_table(title: &str, summary: &DropClassSummary) -> Result<Table> {
    let mut table = Table::named(
        title,
        ["i", "Item Name", "Drop Rate", "Price", "Expectation", "%"],
    )
    .with_distinct_last_row();

    for (i, row) in summary.rows.iter().take(NUMBER_OF_ITEMS_TO_PRINT).enumerate() {
        let (lo, hi) = row.rate_interval;
        table.add_row([
            (i + 1).to_string(),
            row.name.clone(),
            format!("{}%", format_percentage_range(lo, hi)),
            format_np(row.price),
            format_np(row.expectation),
            format!("{}%", format_percentage(row.share)),
        ])?;
    }

    let (lo, hi) = summary.rate_interval;
    table.add_row([
        String::new(),
        "Total".to_string(),
        format!("{}%", format_percentage_range(lo, hi)),
        String::new(),
        format_np(summary.expectation),
        format!("{}%", format_percentage(summary.share)),
    ])?;
    Ok(table)
}

/// Full report for one arena
pub fn arena_report(result: &ArenaComparison, alpha: f64) -> Result<Vec<String>> {
    let arena = result.arena;
    let profit = profit_table(format!("Profit in {}", arena), &result.comparison, true)?;
    let predicted = profitable_items_table(&result.comparison.predicted, false, alpha)?;
    let actual = profitable_items_table(&result.comparison.actual, true, alpha)?;

    let mut lines = profit.lines();
    lines.push(String::new());
    lines.push(format!(
        "Top {} most profitable items in {}",
        NUMBER_OF_ITEMS_TO_PRINT, arena
    ));
    lines.extend(side_by_side(&predicted, &actual, GAP));
    lines.push(String::new());
    lines.push(format!("Codestone drop rates in {}", arena));
    lines.extend(side_by_side(
        &codestone_table(&result.brown)?,
        &codestone_table(&result.red)?,
        GAP,
    ));
    Ok(lines)
}

/// Full reports for several arenas, numbered in the order given
pub fn arena_reports(
    outcomes: &[Outcome<Arena, ArenaComparison>],
    alpha: f64,
) -> Result<Vec<String>> {
    let mut lines = Vec::new();
    for (i, outcome) in outcomes.iter().enumerate() {
        match &outcome.result {
            Ok(result) => {
                lines.push(format!(
                    "{}. {} ({} samples)",
                    i + 1,
                    outcome.key,
                    result.comparison.actual.samples()
                ));
                lines.extend(indent(arena_report(result, alpha)?));
            }
            Err(e) => {
                lines.push(format!("{}. {} (0 NP: {})", i + 1, outcome.key, e));
            }
        }
        lines.push(String::new());
    }
    Ok(lines)
}

/// Full report for one challenger
pub fn challenger_report(result: &ChallengerComparison, alpha: f64) -> Result<Vec<String>> {
    let key = &result.key;
    let profit = profit_table(
        format!("{} {} in {}", key.difficulty, key.challenger, key.arena),
        &result.comparison,
        false,
    )?;
    let spread = spread_table(&result.comparison, alpha)?;
    let predicted = profitable_items_table(&result.comparison.predicted, false, alpha)?;
    let actual = profitable_items_table(&result.comparison.actual, true, alpha)?;

    let mut lines = side_by_side(&profit, &spread, GAP);
    lines.push(String::new());
    lines.push(format!("Top {} most profitable items", NUMBER_OF_ITEMS_TO_PRINT));
    lines.extend(side_by_side(&predicted, &actual, GAP));
    lines.push(String::new());
    lines.extend(side_by_side(
        &codestone_table(&result.brown)?,
        &codestone_table(&result.red)?,
        GAP,
    ));
    lines.push(String::new());
    lines.extend(side_by_side(
        &drop_class_table("Arena-specific drops", &result.split.arena_specific)?,
        &drop_class_table("Challenger-specific drops", &result.split.challenger_specific)?,
        GAP,
    ));
    Ok(lines)
}

/// Profit and arena/challenger drop split for every challenger
pub fn challenger_summaries(
    outcomes: &[Outcome<ChallengerKey, ChallengerSummary>],
) -> Result<Vec<String>> {
    let failed = outcomes.iter().any(|o| o.result.is_err());
    let mut profit_headers = vec![
        "i",
        "Arena",
        "Challenger",
        "Difficulty",
        "Samples",
        "Actual Profit",
        "Predicted Profit",
    ];
    if failed {
        profit_headers.push("Error");
    }
    let mut profit = Table::named("Challenger profit comparison", profit_headers);
    let mut rates = Table::named(
        "Arena/challenger-specific drop rate comparison",
        [
            "i",
            "Arena",
            "Challenger",
            "Difficulty",
            "Arena Drop Rate",
            "Challenger Drop Rate",
        ],
    );

    for (i, outcome) in outcomes.iter().enumerate() {
        let key = &outcome.key;
        let mut row = vec![
            (i + 1).to_string(),
            key.arena.to_string(),
            key.challenger.clone(),
            key.difficulty.clone(),
        ];
        let (arena_rate, challenger_rate) = match &outcome.result {
            Ok(summary) => {
                row.push(format_float(summary.samples as f64));
                row.push(format_np_interval(summary.actual_mean, summary.actual_interval));
                row.push(format_np_interval(summary.predicted_mean, summary.predicted_interval));
                if failed {
                    row.push(String::new());
                }
                (summary.arena_rate, summary.challenger_rate)
            }
            Err(e) => {
                row.extend(["0".to_string(), format_np(0.0), format_np(0.0), e.to_string()]);
                (0.0, 0.0)
            }
        };
        profit.add_row(row)?;
        rates.add_row([
            (i + 1).to_string(),
            key.arena.to_string(),
            key.challenger.clone(),
            key.difficulty.clone(),
            format!("{}%", format_percentage(arena_rate)),
            format!("{}%", format_percentage(challenger_rate)),
        ])?;
    }

    let mut lines = profit.lines();
    lines.push(String::new());
    lines.extend(rates.lines());
    Ok(lines)
}

/// One row per arena, most profitable first
pub fn brief_arenas(outcomes: &[Outcome<Arena, ArenaSummary>]) -> Result<Vec<String>> {
    let failed = outcomes.iter().any(|o| o.result.is_err());
    let mut headers = vec!["i", "Arena", "Samples", "Predicted", "Actual"];
    if failed {
        headers.push("Error");
    }
    let mut table = Table::named("Profit", headers);

    for (i, outcome) in outcomes.iter().enumerate() {
        let mut row = vec![(i + 1).to_string(), outcome.key.to_string()];
        match &outcome.result {
            Ok(summary) => {
                row.push(format_float(summary.samples as f64));
                row.push(format_np_interval(summary.predicted_mean, summary.predicted_interval));
                row.push(format_np_interval(summary.actual_mean, summary.actual_interval));
                if failed {
                    row.push(String::new());
                }
            }
            Err(e) => row.extend(["0".to_string(), format_np(0.0), format_np(0.0), e.to_string()]),
        }
        table.add_row(row)?;
    }
    Ok(table.lines())
}

/// Profit breakdown of a single day's drops
pub fn drops_table(drops: &NormalisedDrops, prices: &PriceTable) -> Result<Table> {
    let mut table = Table::new(["i", "Item Name", "Qty", "Price", "Profit", "%-age"])
        .with_distinct_last_row();
    let total = total_profit(drops, prices);

    for (i, item) in items_by_profit(drops, prices).into_iter().enumerate() {
        let price = prices.get(&item.name);
        let profit = item.quantity as f64 * price;
        let share = if total > 0.0 { profit / total } else { 0.0 };
        if share < MIN_SHARE_TO_PRINT {
            continue;
        }
        table.add_row([
            (i + 1).to_string(),
            item.name.clone(),
            item.quantity.to_string(),
            format_np(price),
            format_np(profit),
            format!("{}%", format_percentage(share)),
        ])?;
    }

    table.add_row([
        String::new(),
        "Total".to_string(),
        format_float(drops.total_quantity() as f64),
        String::new(),
        format_np(total),
        String::new(),
    ])?;
    Ok(table)
}

/// Predicted drop rates for a freshly generated arena sample
pub fn generated_rates_table(arena: Arena, rates: &[&ItemDropRate]) -> Result<Table> {
    let mut table = Table::named(
        format!("Predicted drop rates in {}", arena),
        ["i", "Item Name", "Drop Rate", "Dry Chance"],
    );
    for (i, rate) in rates.iter().enumerate() {
        table.add_row([
            (i + 1).to_string(),
            rate.name.clone(),
            format!("{}%", format_percentage(rate.rate)),
            format!(
                "{}%",
                format_percentage(dry_chance(rate.rate, DRY_CHANCE_DAYS * BATTLEDOME_DROPS_PER_DAY))
            ),
        ])?;
    }
    Ok(table)
}
