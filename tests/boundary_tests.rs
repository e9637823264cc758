use payserve::domain::payment::{Outcome, PaymentStatus};
use payserve::error::PaymentError;
use payserve::infrastructure::gateway::SimulatedGateway;
use rust_decimal_macros::dec;

mod common;

#[tokio::test(start_paused = true)]
async fn test_ceiling_boundary_through_engine() {
    let engine = common::engine(Box::new(SimulatedGateway::default()));

    assert_eq!(
        engine.process_payment("at", dec!(10000)).await.unwrap(),
        Outcome::Success
    );
    assert_eq!(
        engine.process_payment("over", dec!(10001)).await.unwrap(),
        Outcome::Failed
    );
    let over = engine.payment("over").await.unwrap().unwrap();
    assert_eq!(over.status, PaymentStatus::Failed);
    assert_eq!(over.retry_count, 3);
}

#[tokio::test]
async fn test_zero_amount_is_accepted() {
    let engine = common::engine(Box::new(SimulatedGateway::default()));
    assert_eq!(
        engine.process_payment("zero", dec!(0)).await.unwrap(),
        Outcome::Success
    );
}

#[tokio::test]
async fn test_extreme_decimal_precision() {
    let engine = common::engine(Box::new(SimulatedGateway::default()));
    engine.process_payment("tiny", dec!(0.0001)).await.unwrap();
    let record = engine.payment("tiny").await.unwrap().unwrap();
    assert_eq!(record.amount.value(), dec!(0.0001));
}

#[tokio::test]
async fn test_negative_amount_is_invalid() {
    let engine = common::engine(Box::new(SimulatedGateway::default()));
    assert!(matches!(
        engine.process_payment("neg", dec!(-50)).await,
        Err(PaymentError::InvalidAmount(_))
    ));
    assert!(engine.payment("neg").await.unwrap().is_none());
}
