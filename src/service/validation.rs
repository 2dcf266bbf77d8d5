use crate::error::ScanError;
use crate::models::{ParsedSerial, ScannedClosing};

use super::index::IndexedPack;

/// 校验结论
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    NotFound {
        game_code: String,
        pack_number: String,
    },
    Duplicate {
        bin_id: String,
        bin_number: u32,
        closing_serial: String,
    },
    RangeViolation {
        bin_id: String,
        bin_number: u32,
        closing_serial: String,
        starting_serial: String,
        serial_end: String,
    },
    Accepted(ScannedClosing),
}

impl Verdict {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Verdict::Accepted(_))
    }

    pub fn into_result(self) -> Result<ScannedClosing, ScanError> {
        match self {
            Verdict::Accepted(closing) => Ok(closing),
            Verdict::NotFound {
                game_code,
                pack_number,
            } => Err(ScanError::NotFound {
                game_code,
                pack_number,
            }),
            Verdict::Duplicate {
                bin_id,
                bin_number,
                closing_serial,
            } => Err(ScanError::Duplicate {
                bin_id,
                bin_number,
                closing_serial,
            }),
            Verdict::RangeViolation {
                bin_id,
                bin_number,
                closing_serial,
                starting_serial,
                serial_end,
            } => Err(ScanError::RangeViolation {
                bin_id,
                bin_number,
                closing_serial,
                starting_serial,
                serial_end,
            }),
        }
    }
}

/// 校验一次扫描
///
/// `lookup` 为索引命中结果, `existing` 为该票箱已有的收盘记录。
/// 序号按数值比较, 输出保留原始补零文本。
pub fn validate(
    parsed: &ParsedSerial,
    lookup: Option<IndexedPack<'_>>,
    existing: Option<&ScannedClosing>,
) -> Verdict {
    let Some(IndexedPack { bin, pack }) = lookup else {
        return Verdict::NotFound {
            game_code: parsed.game_code.clone(),
            pack_number: parsed.pack_number.clone(),
        };
    };

    if existing.is_some_and(|e| e.closing_serial == parsed.closing_serial) {
        return Verdict::Duplicate {
            bin_id: bin.bin_id.clone(),
            bin_number: bin.bin_number,
            closing_serial: parsed.closing_serial.clone(),
        };
    }

    let closing = serial_value(&parsed.closing_serial);
    let start = serial_value(&pack.starting_serial);
    let end = serial_value(&pack.serial_end);

    let in_range = match (closing, start, end) {
        (Some(c), Some(s), Some(e)) => s <= c && c <= e,
        _ => false,
    };

    if !in_range {
        return Verdict::RangeViolation {
            bin_id: bin.bin_id.clone(),
            bin_number: bin.bin_number,
            closing_serial: parsed.closing_serial.clone(),
            starting_serial: pack.starting_serial.clone(),
            serial_end: pack.serial_end.clone(),
        };
    }

    Verdict::Accepted(ScannedClosing {
        bin_id: bin.bin_id.clone(),
        pack_id: pack.pack_id.clone(),
        closing_serial: parsed.closing_serial.clone(),
    })
}

fn serial_value(serial: &str) -> Option<u32> {
    let serial = serial.trim();
    if serial.is_empty() || !serial.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    serial.parse().ok()
}
