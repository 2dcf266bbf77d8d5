use std::collections::HashMap;

use crate::models::{Bin, Pack};

/// 索引键: (游戏代码 4 位, 票本号 7 位), 均左补零
pub type PackKey = (String, String);

pub fn pack_key(game_code: &str, pack_number: &str) -> PackKey {
    (format!("{:0>4}", game_code), format!("{:0>7}", pack_number))
}

/// 索引命中的票箱及其票本
#[derive(Debug, Clone, Copy)]
pub struct IndexedPack<'a> {
    pub bin: &'a Bin,
    pub pack: &'a Pack,
}

/// 票箱索引 - 会话开始时构建一次，之后只读
#[derive(Debug, Clone)]
pub struct BinIndex {
    bins: Vec<Bin>,
    /// (game_code, pack_number) -> bins 下标
    by_pack: HashMap<PackKey, usize>,
    /// bin_id -> bins 下标
    by_bin_id: HashMap<String, usize>,
}

impl BinIndex {
    /// 从启用票箱快照构建; 同一票本出现在多个票箱时只保留第一个
    pub fn build(bins: &[Bin]) -> Self {
        let bins: Vec<Bin> = bins.to_vec();
        let mut by_pack = HashMap::with_capacity(bins.len());
        let mut by_bin_id = HashMap::with_capacity(bins.len());

        for (idx, bin) in bins.iter().enumerate() {
            by_bin_id.insert(bin.bin_id.clone(), idx);

            let Some(pack) = bin.pack.as_ref().filter(|_| bin.is_active) else {
                continue;
            };

            let key = pack_key(&pack.game_code, &pack.pack_number);
            if let Some(&first) = by_pack.get(&key) {
                let first: &Bin = &bins[first];
                tracing::warn!(
                    "Pack {}/{} appears in bin {} and bin {}, keeping bin {}",
                    key.0, key.1, first.bin_number, bin.bin_number, first.bin_number
                );
                continue;
            }
            by_pack.insert(key, idx);
        }

        tracing::info!(
            "Bin index built: {} bins, {} scannable packs",
            bins.len(),
            by_pack.len()
        );

        Self {
            bins,
            by_pack,
            by_bin_id,
        }
    }

    /// O(1) 查找
    pub fn lookup(&self, game_code: &str, pack_number: &str) -> Option<IndexedPack<'_>> {
        let idx = *self.by_pack.get(&pack_key(game_code, pack_number))?;
        let bin = &self.bins[idx];
        bin.pack.as_ref().map(|pack| IndexedPack { bin, pack })
    }

    pub fn bin(&self, bin_id: &str) -> Option<&Bin> {
        self.by_bin_id.get(bin_id).map(|&idx| &self.bins[idx])
    }

    /// 快照中的所有票箱 (保持原顺序)
    pub fn bins(&self) -> &[Bin] {
        &self.bins
    }

    /// 需要扫描的票箱 (启用且有票本)
    pub fn scannable(&self) -> impl Iterator<Item = &Bin> {
        self.bins.iter().filter(|b| b.is_scannable())
    }

    pub fn scannable_count(&self) -> usize {
        self.scannable().count()
    }
}
