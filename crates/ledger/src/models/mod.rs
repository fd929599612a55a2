//! 积分账本领域模型

pub mod enums;
pub mod money;
pub mod order;
pub mod transaction;
pub mod user;

pub use enums::{AccrualStatus, OrderStatus};
pub use money::{MAX_AMOUNT_MINOR, Money};
pub use order::{MAX_ORDER_NUMBER_LEN, Order, OrderOwner, OrderRow};
pub use transaction::{BalanceRow, UserBalance, Withdrawal, WithdrawalRow};
pub use user::UserCredentials;
