//! 金额值类型
//!
//! 以分（minor units）为单位的整数金额，避免浮点误差在账本中累积。
//! 对外展示（HTTP、积分计算系统）时才换算为元（major units）。

use std::fmt;

/// 每元对应的分数
const MINOR_PER_MAJOR: i64 = 100;

/// 单笔金额上限（分），即 100 亿元
///
/// 超过上限的外部金额一律拒绝，保证 BIGINT 上的 SUM 不会溢出
pub const MAX_AMOUNT_MINOR: i64 = 1_000_000_000_000;

/// 精确金额（单位：分）
///
/// 只提供账本需要的能力：构造、换算、比较。聚合统一在数据库中用 SUM 完成。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Money {
    amount_minor: i64,
}

impl Money {
    pub const ZERO: Money = Money { amount_minor: 0 };

    /// 以分为单位构造
    pub const fn from_minor(amount_minor: i64) -> Self {
        Self { amount_minor }
    }

    /// 以元为单位构造，按分四舍五入（.5 远离零）
    ///
    /// 非有限值或绝对值超过 [`MAX_AMOUNT_MINOR`] 时返回 `None`
    pub fn try_from_major(amount_major: f64) -> Option<Self> {
        let minor = (amount_major * MINOR_PER_MAJOR as f64).round();
        if !minor.is_finite() || minor.abs() > MAX_AMOUNT_MINOR as f64 {
            return None;
        }
        Some(Self {
            amount_minor: minor as i64,
        })
    }

    pub const fn minor(&self) -> i64 {
        self.amount_minor
    }

    /// 换算为元
    pub fn major(&self) -> f64 {
        self.amount_minor as f64 / MINOR_PER_MAJOR as f64
    }

    /// 可空金额换算为元，用于尚未产生积分的订单
    pub fn nullable_major(value: Option<Money>) -> Option<f64> {
        value.map(|m| m.major())
    }

    pub const fn is_positive(&self) -> bool {
        self.amount_minor > 0
    }

    pub const fn is_negative(&self) -> bool {
        self.amount_minor < 0
    }

    /// 取绝对值，用于把提现流水（负数）展示为正数金额
    pub const fn abs(&self) -> Self {
        Self {
            amount_minor: self.amount_minor.abs(),
        }
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.amount_minor < 0 { "-" } else { "" };
        let abs = self.amount_minor.unsigned_abs();
        write!(
            f,
            "{}{}.{:02}",
            sign,
            abs / MINOR_PER_MAJOR as u64,
            abs % MINOR_PER_MAJOR as u64
        )
    }
}
