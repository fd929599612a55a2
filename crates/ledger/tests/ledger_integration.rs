//! 账本集成测试
//!
//! 使用真实 PostgreSQL 验证领取互斥、超时重新领取、结算、提现并发与余额不变式。
//!
//! ## 运行方式
//!
//! ```bash
//! DATABASE_URL=postgres://... cargo test -p loyalty-ledger --test ledger_integration -- --ignored
//! ```

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use loyalty_ledger::accrual::{AccrualError, AccrualOracle, AccrualResponse};
use loyalty_ledger::models::{AccrualStatus, Money, OrderStatus};
use loyalty_ledger::processor::{OrderProcessor, ProcessOutcome};
use loyalty_ledger::repository::{
    MIGRATOR, OrderRepository, TransactionRepository, UserRepository,
};
use loyalty_ledger::LedgerError;
use sqlx::PgPool;
use tokio::sync::Mutex;
use tokio_test::{assert_err, assert_ok};

/// 领取按全表 FIFO 进行，涉及订单的测试需要串行执行
static ORDERS_LOCK: Mutex<()> = Mutex::const_new(());

const STALENESS: Duration = Duration::from_secs(30);

// ==================== 辅助函数 ====================

fn database_url() -> String {
    std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for integration tests")
}

async fn setup_pool() -> PgPool {
    let pool = PgPool::connect(&database_url())
        .await
        .expect("Failed to connect to database");
    MIGRATOR.run(&pool).await.expect("Failed to run migrations");
    pool
}

/// 生成一个通过 Luhn 校验的随机订单号
fn luhn_number() -> String {
    let seed = uuid::Uuid::new_v4().as_u128() % 1_000_000_000_000_000;
    let body = format!("{seed:015}");

    let mut sum = 0;
    for (i, c) in body.chars().rev().enumerate() {
        let mut digit = c.to_digit(10).unwrap();
        if i % 2 == 0 {
            digit *= 2;
            if digit > 9 {
                digit -= 9;
            }
        }
        sum += digit;
    }
    format!("{body}{}", (10 - sum % 10) % 10)
}

async fn create_user(pool: &PgPool) -> i64 {
    let login = format!("integ_{}", uuid::Uuid::new_v4().simple());
    UserRepository::new(pool.clone())
        .create_user(&login, "$2b$04$integration")
        .await
        .unwrap()
}

/// 直接写入一条积分入账流水
async fn credit(pool: &PgPool, user_id: i64, minor: i64) {
    sqlx::query("INSERT INTO transactions (user_id, order_number, amount) VALUES ($1, $2, $3)")
        .bind(user_id)
        .bind(luhn_number())
        .bind(minor)
        .execute(pool)
        .await
        .unwrap();
}

async fn transaction_count(pool: &PgPool, user_id: i64) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM transactions WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(pool)
        .await
        .unwrap()
}

/// 把所有可领取订单置为终态，避免历史数据影响 FIFO 断言
async fn drain_claimable(pool: &PgPool) {
    sqlx::query("UPDATE orders SET status = 'INVALID' WHERE status IN ('NEW', 'PROCESSING')")
        .execute(pool)
        .await
        .unwrap();
}

/// 返回固定结果的积分计算系统
struct FixedOracle {
    status: AccrualStatus,
    accrual: Option<f64>,
}

#[async_trait]
impl AccrualOracle for FixedOracle {
    async fn fetch_accrual(&self, order_number: &str) -> Result<AccrualResponse, AccrualError> {
        Ok(AccrualResponse {
            order: order_number.to_string(),
            status: self.status,
            accrual: self.accrual,
        })
    }
}

// ==================== 领取 ====================

#[tokio::test]
#[ignore = "需要 PostgreSQL 数据库连接"]
async fn test_concurrent_claims_are_exclusive() {
    let _guard = ORDERS_LOCK.lock().await;
    let pool = setup_pool().await;
    drain_claimable(&pool).await;

    let user_id = create_user(&pool).await;
    let orders = Arc::new(OrderRepository::new(pool.clone()));
    let mut expected = HashSet::new();
    for _ in 0..20 {
        let number = luhn_number();
        orders.create_order(user_id, &number).await.unwrap();
        expected.insert(number);
    }

    let mut handles = Vec::new();
    for _ in 0..8 {
        let orders = Arc::clone(&orders);
        handles.push(tokio::spawn(async move {
            let mut claimed = Vec::new();
            while let Some(number) = orders.claim_next_order(STALENESS).await.unwrap() {
                claimed.push(number);
            }
            claimed
        }));
    }

    let mut all = Vec::new();
    for handle in handles {
        all.extend(handle.await.unwrap());
    }

    let unique: HashSet<_> = all.iter().cloned().collect();
    assert_eq!(all.len(), unique.len(), "an order was claimed twice");
    assert_eq!(unique, expected);
}

#[tokio::test]
#[ignore = "需要 PostgreSQL 数据库连接"]
async fn test_claim_is_fifo_and_reclaims_stale_orders() {
    let _guard = ORDERS_LOCK.lock().await;
    let pool = setup_pool().await;
    drain_claimable(&pool).await;

    let user_id = create_user(&pool).await;
    let orders = OrderRepository::new(pool.clone());
    let first = luhn_number();
    let second = luhn_number();
    orders.create_order(user_id, &first).await.unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;
    orders.create_order(user_id, &second).await.unwrap();

    assert_eq!(orders.claim_next_order(STALENESS).await.unwrap(), Some(first.clone()));
    assert_eq!(orders.claim_next_order(STALENESS).await.unwrap(), Some(second.clone()));
    assert_eq!(orders.claim_next_order(STALENESS).await.unwrap(), None);

    // 让第一个订单的处理超时
    sqlx::query(
        "UPDATE orders SET processing_since = NOW() - INTERVAL '60 seconds' WHERE number = $1",
    )
    .bind(&first)
    .execute(&pool)
    .await
    .unwrap();

    assert_eq!(orders.claim_next_order(STALENESS).await.unwrap(), Some(first.clone()));
    assert_eq!(orders.claim_next_order(STALENESS).await.unwrap(), None);

    let since_refreshed: bool = sqlx::query_scalar(
        "SELECT processing_since > NOW() - INTERVAL '5 seconds' FROM orders WHERE number = $1",
    )
    .bind(&first)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert!(since_refreshed);
}

// ==================== 结算 ====================

#[tokio::test]
#[ignore = "需要 PostgreSQL 数据库连接"]
async fn test_processed_order_credits_owner() {
    const NUMBER: &str = "79927398713";

    let _guard = ORDERS_LOCK.lock().await;
    let pool = setup_pool().await;
    drain_claimable(&pool).await;
    sqlx::query("DELETE FROM transactions WHERE order_number = $1")
        .bind(NUMBER)
        .execute(&pool)
        .await
        .unwrap();
    sqlx::query("DELETE FROM orders WHERE number = $1")
        .bind(NUMBER)
        .execute(&pool)
        .await
        .unwrap();

    let user_id = create_user(&pool).await;
    let orders = Arc::new(OrderRepository::new(pool.clone()));
    orders.create_order(user_id, NUMBER).await.unwrap();

    let processor = OrderProcessor::new(
        orders.clone(),
        Arc::new(FixedOracle {
            status: AccrualStatus::Processed,
            accrual: Some(500.0),
        }),
        STALENESS,
    );

    assert_eq!(
        processor.process_one_order().await,
        ProcessOutcome::Settled {
            number: NUMBER.to_string(),
            accrual: Money::from_minor(50000),
        }
    );

    let listed = orders.list_user_orders(user_id).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].status, OrderStatus::Processed);
    assert_eq!(listed[0].accrual, Some(Money::from_minor(50000)));

    let balance = TransactionRepository::new(pool.clone())
        .get_user_balance(user_id)
        .await
        .unwrap();
    assert_eq!(balance.current.to_string(), "500.00");
    assert_eq!(balance.withdrawn, Money::ZERO);

    // 终态订单不能再次结算
    let err = orders
        .apply_settled_accrual(NUMBER, Money::from_minor(50000))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::NoOrdersToUpdate(_)));
    assert_eq!(transaction_count(&pool, user_id).await, 1);
}

#[tokio::test]
#[ignore = "需要 PostgreSQL 数据库连接"]
async fn test_invalid_order_writes_no_ledger_entry() {
    let _guard = ORDERS_LOCK.lock().await;
    let pool = setup_pool().await;
    drain_claimable(&pool).await;

    let user_id = create_user(&pool).await;
    let number = luhn_number();
    let orders = Arc::new(OrderRepository::new(pool.clone()));
    orders.create_order(user_id, &number).await.unwrap();

    let processor = OrderProcessor::new(
        orders.clone(),
        Arc::new(FixedOracle {
            status: AccrualStatus::Invalid,
            accrual: None,
        }),
        STALENESS,
    );
    assert_eq!(
        processor.process_one_order().await,
        ProcessOutcome::Invalidated {
            number: number.clone()
        }
    );

    let listed = orders.list_user_orders(user_id).await.unwrap();
    assert_eq!(listed[0].status, OrderStatus::Invalid);
    assert!(listed[0].accrual.is_none());
    assert_eq!(transaction_count(&pool, user_id).await, 0);
}

#[tokio::test]
#[ignore = "需要 PostgreSQL 数据库连接"]
async fn test_pending_order_stays_processing() {
    let _guard = ORDERS_LOCK.lock().await;
    let pool = setup_pool().await;
    drain_claimable(&pool).await;

    let user_id = create_user(&pool).await;
    let number = luhn_number();
    let orders = Arc::new(OrderRepository::new(pool.clone()));
    orders.create_order(user_id, &number).await.unwrap();

    let processor = OrderProcessor::new(
        orders.clone(),
        Arc::new(FixedOracle {
            status: AccrualStatus::Registered,
            accrual: None,
        }),
        STALENESS,
    );
    assert_eq!(
        processor.process_one_order().await,
        ProcessOutcome::Pending {
            number: number.clone()
        }
    );
    // 尚未超时，不会被再次领取
    assert_eq!(processor.process_one_order().await, ProcessOutcome::Idle);

    let listed = orders.list_user_orders(user_id).await.unwrap();
    assert_eq!(listed[0].status, OrderStatus::Processing);
}

// ==================== 订单上传 ====================

#[tokio::test]
#[ignore = "需要 PostgreSQL 数据库连接"]
async fn test_duplicate_order_submission() {
    let _guard = ORDERS_LOCK.lock().await;
    let pool = setup_pool().await;
    let owner = create_user(&pool).await;
    let other = create_user(&pool).await;
    let orders = OrderRepository::new(pool.clone());
    let number = luhn_number();

    assert_ok!(orders.create_order(owner, &number).await);

    let err = orders.create_order(owner, &number).await.unwrap_err();
    assert!(matches!(err, LedgerError::OrderAlreadyUploaded(_)));

    let err = orders.create_order(other, &number).await.unwrap_err();
    assert!(matches!(err, LedgerError::OrderUploadedByAnotherUser(_)));

    assert!(orders.list_user_orders(other).await.unwrap().is_empty());
    drain_claimable(&pool).await;
}

// ==================== 提现 ====================

#[tokio::test]
#[ignore = "需要 PostgreSQL 数据库连接"]
async fn test_insufficient_balance_writes_nothing() {
    let pool = setup_pool().await;
    let user_id = create_user(&pool).await;
    credit(&pool, user_id, 50000).await;
    let transactions = TransactionRepository::new(pool.clone());

    let before = transaction_count(&pool, user_id).await;
    let err = transactions
        .create_withdrawal(user_id, &luhn_number(), Money::from_minor(75100))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        LedgerError::InsufficientBalance { required, available }
            if required.minor() == 75100 && available.minor() == 50000
    ));
    assert_eq!(transaction_count(&pool, user_id).await, before);
}

#[tokio::test]
#[ignore = "需要 PostgreSQL 数据库连接"]
async fn test_concurrent_duplicate_withdrawal_succeeds_once() {
    let pool = setup_pool().await;
    let user_id = create_user(&pool).await;
    credit(&pool, user_id, 100000).await;
    let transactions = Arc::new(TransactionRepository::new(pool.clone()));
    let number = luhn_number();

    let mut handles = Vec::new();
    for _ in 0..10 {
        let transactions = Arc::clone(&transactions);
        let number = number.clone();
        handles.push(tokio::spawn(async move {
            transactions
                .create_withdrawal(user_id, &number, Money::from_minor(10000))
                .await
        }));
    }

    let mut ok = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(()) => ok += 1,
            Err(LedgerError::WithdrawalAlreadyExists(_)) => {}
            Err(e) => panic!("unexpected error: {e}"),
        }
    }
    assert_eq!(ok, 1);

    let balance = transactions.get_user_balance(user_id).await.unwrap();
    assert_eq!(balance.current.minor(), 90000);
    assert_eq!(balance.withdrawn.minor(), 10000);
}

#[tokio::test]
#[ignore = "需要 PostgreSQL 数据库连接"]
async fn test_duplicate_withdrawal_wins_over_insufficient_balance() {
    let pool = setup_pool().await;
    let user_id = create_user(&pool).await;
    credit(&pool, user_id, 10000).await;
    let transactions = Arc::new(TransactionRepository::new(pool.clone()));
    let number = luhn_number();

    // 余额只够一次提现，第二次请求仍应报告重复
    let first = {
        let transactions = Arc::clone(&transactions);
        let number = number.clone();
        tokio::spawn(async move {
            transactions
                .create_withdrawal(user_id, &number, Money::from_minor(10000))
                .await
        })
    };
    let second = {
        let transactions = Arc::clone(&transactions);
        let number = number.clone();
        tokio::spawn(async move {
            transactions
                .create_withdrawal(user_id, &number, Money::from_minor(10000))
                .await
        })
    };

    let results = [first.await.unwrap(), second.await.unwrap()];
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results.iter().any(|r| matches!(r, Err(LedgerError::WithdrawalAlreadyExists(_)))));

    let err = transactions
        .create_withdrawal(user_id, &number, Money::from_minor(10000))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::WithdrawalAlreadyExists(_)));
    assert_eq!(transaction_count(&pool, user_id).await, 2);
}

#[tokio::test]
#[ignore = "需要 PostgreSQL 数据库连接"]
async fn test_concurrent_withdrawals_never_overdraw() {
    let pool = setup_pool().await;
    let user_id = create_user(&pool).await;
    credit(&pool, user_id, 50000).await;
    let transactions = Arc::new(TransactionRepository::new(pool.clone()));

    let mut handles = Vec::new();
    for _ in 0..10 {
        let transactions = Arc::clone(&transactions);
        handles.push(tokio::spawn(async move {
            transactions
                .create_withdrawal(user_id, &luhn_number(), Money::from_minor(10000))
                .await
        }));
    }

    let mut ok = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(()) => ok += 1,
            Err(e) => assert!(matches!(e, LedgerError::InsufficientBalance { .. })),
        }
    }
    assert_eq!(ok, 5);

    let balance = transactions.get_user_balance(user_id).await.unwrap();
    assert_eq!(balance.current, Money::ZERO);
    assert_eq!(balance.withdrawn.minor(), 50000);
}

#[tokio::test]
#[ignore = "需要 PostgreSQL 数据库连接"]
async fn test_balance_matches_ledger_after_interleaving() {
    let pool = setup_pool().await;
    let user_id = create_user(&pool).await;
    let transactions = TransactionRepository::new(pool.clone());

    credit(&pool, user_id, 30000).await;
    assert_ok!(
        transactions
            .create_withdrawal(user_id, &luhn_number(), Money::from_minor(12345))
            .await
    );
    credit(&pool, user_id, 2000).await;
    assert_ok!(
        transactions
            .create_withdrawal(user_id, &luhn_number(), Money::from_minor(655))
            .await
    );
    assert_err!(
        transactions
            .create_withdrawal(user_id, &luhn_number(), Money::from_minor(1_000_000))
            .await
    );

    let balance = transactions.get_user_balance(user_id).await.unwrap();
    let withdrawals = transactions.list_user_withdrawals(user_id).await.unwrap();

    assert_eq!(withdrawals.len(), 2);
    let withdrawn: i64 = withdrawals.iter().map(|w| w.sum.minor()).sum();
    assert_eq!(balance.withdrawn.minor(), withdrawn);
    assert_eq!(balance.current.minor(), 32000 - withdrawn);
    assert!(balance.current.minor() >= 0);

    // 最新的提现排在最前
    assert_eq!(withdrawals[0].sum.minor(), 655);
    assert!(withdrawals[0].processed_at >= withdrawals[1].processed_at);
}

#[tokio::test]
#[ignore = "需要 PostgreSQL 数据库连接"]
async fn test_concurrent_settlement_and_withdrawal_keep_invariant() {
    const ORDERS: usize = 10;
    const WITHDRAWALS: usize = 15;

    let _guard = ORDERS_LOCK.lock().await;
    let pool = setup_pool().await;
    drain_claimable(&pool).await;

    let user_id = create_user(&pool).await;
    let orders = Arc::new(OrderRepository::new(pool.clone()));
    for _ in 0..ORDERS {
        orders.create_order(user_id, &luhn_number()).await.unwrap();
    }

    let processor = Arc::new(OrderProcessor::new(
        orders.clone(),
        Arc::new(FixedOracle {
            status: AccrualStatus::Processed,
            accrual: Some(10.0),
        }),
        STALENESS,
    ));
    let transactions = Arc::new(TransactionRepository::new(pool.clone()));

    let mut settlements = Vec::new();
    let mut withdrawals = Vec::new();
    for i in 0..ORDERS.max(WITHDRAWALS) {
        if i < ORDERS {
            let processor = Arc::clone(&processor);
            settlements.push(tokio::spawn(async move { processor.process_one_order().await }));
        }
        if i < WITHDRAWALS {
            let transactions = Arc::clone(&transactions);
            withdrawals.push(tokio::spawn(async move {
                transactions
                    .create_withdrawal(user_id, &luhn_number(), Money::from_minor(1000))
                    .await
            }));
        }
    }

    for handle in settlements {
        let outcome = handle.await.unwrap();
        assert_eq!(outcome.as_str(), "settled", "{outcome:?}");
    }
    let mut withdrawn_ok = 0;
    for handle in withdrawals {
        match handle.await.unwrap() {
            Ok(()) => withdrawn_ok += 1,
            Err(e) => assert!(matches!(e, LedgerError::InsufficientBalance { .. }), "{e}"),
        }
    }

    let credits: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM transactions WHERE user_id = $1 AND amount >= 0",
    )
    .bind(user_id)
    .fetch_one(&pool)
    .await
    .unwrap();
    let sum: i64 =
        sqlx::query_scalar("SELECT COALESCE(SUM(amount), 0)::BIGINT FROM transactions WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&pool)
            .await
            .unwrap();
    let balance = transactions.get_user_balance(user_id).await.unwrap();

    assert_eq!(credits, ORDERS as i64);
    assert_eq!(balance.current.minor(), sum);
    assert!(balance.current.minor() >= 0);
    assert_eq!(balance.withdrawn.minor(), withdrawn_ok * 1000);
    assert_eq!(balance.current.minor(), ORDERS as i64 * 1000 - withdrawn_ok * 1000);
    assert!(withdrawn_ok <= ORDERS as i64);

    for order in orders.list_user_orders(user_id).await.unwrap() {
        assert_eq!(order.status, OrderStatus::Processed);
    }
}
