use std::io::Write;
use std::path::{Path, PathBuf};

use crate::models::ReconciliationSummary;

/// 把日结汇总写成 CSV: 每个票箱一行, 最后一行为合计
pub fn write_summary_csv<W: Write>(
    summary: &ReconciliationSummary,
    writer: W,
) -> Result<(), csv::Error> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record([
        "business_day",
        "bin_number",
        "game_name",
        "pack_number",
        "starting_serial",
        "closing_serial",
        "game_price",
        "tickets_sold",
        "sales_amount",
    ])?;

    let day = summary.business_day.format("%Y-%m-%d").to_string();
    for bin in &summary.bins_closed {
        wtr.write_record([
            day.clone(),
            bin.bin_number.to_string(),
            bin.game_name.clone(),
            bin.pack_number.clone(),
            bin.starting_serial.clone(),
            bin.closing_serial.clone(),
            bin.game_price.to_string(),
            bin.tickets_sold.to_string(),
            bin.sales_amount.to_string(),
        ])?;
    }

    wtr.write_record([
        day,
        "TOTAL".to_string(),
        String::new(),
        String::new(),
        String::new(),
        String::new(),
        String::new(),
        summary.total_tickets_sold().to_string(),
        summary.lottery_total.to_string(),
    ])?;
    wtr.flush()?;
    Ok(())
}

/// 写到 `dir/day-close-{business_day}.csv`, 返回文件路径
pub fn export_summary(summary: &ReconciliationSummary, dir: &Path) -> Result<PathBuf, csv::Error> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(format!("day-close-{}.csv", summary.business_day.format("%Y-%m-%d")));
    let file = std::fs::File::create(&path)?;
    write_summary_csv(summary, file)?;
    tracing::info!("Day-close report written to {}", path.display());
    Ok(path)
}
