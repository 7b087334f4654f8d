//! 取消抽签的随机源
//!
//! 取消调度器只通过 DecisionSource 抽签，运行时用可设种子的 StdRng，测试用预置序列。

use std::collections::VecDeque;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::CancelSection;

/// 在 0..=max 上均匀抽取整数
pub trait DecisionSource: Send {
    fn draw(&mut self, max: u32) -> u32;
}

/// 基于 StdRng 的随机源
pub struct RandomDecisions {
    rng: StdRng,
}

impl RandomDecisions {
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// 配置了 seed 时可复现
    pub fn from_config(cfg: &CancelSection) -> Self {
        match cfg.seed {
            Some(seed) => Self::seeded(seed),
            None => Self::from_entropy(),
        }
    }
}

impl DecisionSource for RandomDecisions {
    fn draw(&mut self, max: u32) -> u32 {
        self.rng.gen_range(0..=max)
    }
}

/// 按预置序列返回抽签结果；序列耗尽后一直返回 `exhausted`
#[derive(Debug, Clone)]
pub struct ScriptedDecisions {
    draws: VecDeque<u32>,
    exhausted: u32,
}

impl ScriptedDecisions {
    pub fn new(draws: impl IntoIterator<Item = u32>, exhausted: u32) -> Self {
        Self {
            draws: draws.into_iter().collect(),
            exhausted,
        }
    }

    /// 永远抽到 0（总是决定取消）
    pub fn always_cancel() -> Self {
        Self::new([], 0)
    }

    /// 永远抽到上界（从不取消）
    pub fn never_cancel() -> Self {
        Self::new([], u32::MAX)
    }
}

impl DecisionSource for ScriptedDecisions {
    fn draw(&mut self, max: u32) -> u32 {
        self.draws.pop_front().unwrap_or(self.exhausted).min(max)
    }
}
