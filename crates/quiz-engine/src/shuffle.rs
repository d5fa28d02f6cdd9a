//! 乱序算法
//!
//! 题目排列只由 (原始顺序, 种子) 决定：用种子初始化 `StdRng`，再做一次 Fisher-Yates 洗牌。
//! 同样的输入在任何时候重放都得到同样的排列，便于审计。

use std::collections::HashMap;
use std::ops::Range;

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::models::RandomSeed;

/// 按种子打乱题目顺序
pub fn shuffle_questions(original: &[String], seed: RandomSeed) -> Vec<String> {
    let mut ordering = original.to_vec();
    let mut rng = StdRng::seed_from_u64(seed.value() as u64);
    ordering.shuffle(&mut rng);
    ordering
}

/// 两个序列是否互为排列（多重集合相等）
pub fn is_permutation_of(candidate: &[String], original: &[String]) -> bool {
    if candidate.len() != original.len() {
        return false;
    }

    let mut counts: HashMap<&str, i64> = HashMap::with_capacity(original.len());
    for id in original {
        *counts.entry(id.as_str()).or_default() += 1;
    }
    for id in candidate {
        match counts.get_mut(id.as_str()) {
            Some(n) if *n > 0 => *n -= 1,
            _ => return false,
        }
    }
    true
}

/// 把 `[from, to)` 收敛到 `[0, len]` 之内，越界时截断而不是报错
pub fn clamp_window(len: usize, from: i64, to: i64) -> Range<usize> {
    let clamp = |v: i64| v.clamp(0, len as i64) as usize;
    let start = clamp(from);
    let end = clamp(to).max(start);
    start..end
}

/// 取乱序顺序中的 `[from, to)` 窗口
pub fn window(ordering: &[String], from: i64, to: i64) -> &[String] {
    &ordering[clamp_window(ordering.len(), from, to)]
}

/// 某道题的选项排列
///
/// 以 `seed + position` 作为子种子，同一作答内每次读取得到相同的选项顺序
pub fn option_order(seed: RandomSeed, position: usize, option_count: usize) -> Vec<usize> {
    let mut order: Vec<usize> = (0..option_count).collect();
    let sub_seed = seed.value().wrapping_add(position as i64);
    let mut rng = StdRng::seed_from_u64(sub_seed as u64);
    order.shuffle(&mut rng);
    order
}
